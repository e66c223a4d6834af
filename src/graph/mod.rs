//! Graph representation and algorithms module

pub mod builder;
pub mod centrality;
pub mod compressed;

pub use builder::{build_graph, build_graph_parallel, GraphBuilder};
pub use centrality::{compute_centrality, CentralityTable};
pub use compressed::{CoOccurrenceEdge, CompressedGraph};
