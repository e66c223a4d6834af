//! Candidate disaster-spread corridors

use std::collections::BTreeSet;

use log;
use serde::{Deserialize, Serialize};

use crate::graph::{CentralityTable, CompressedGraph};

/// An edge whose endpoints together carry many shortest paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadPathEntry {
    pub from: String,
    pub to: String,

    /// Sum of the endpoints' betweenness
    pub betweenness: f64,

    /// Disaster types the endpoints share
    pub shared_disasters: BTreeSet<String>,

    /// Edge weight
    pub connection_strength: u32,
}

/// Rank edges by summed endpoint betweenness, keeping those above `threshold`
pub fn detect_spread_paths(
    graph: &CompressedGraph,
    centrality: &CentralityTable,
    threshold: f64,
) -> Vec<SpreadPathEntry> {
    let mut paths: Vec<SpreadPathEntry> = graph
        .edges
        .iter()
        .filter_map(|edge| {
            let (u, v) = (edge.source as usize, edge.target as usize);
            let betweenness = centrality.betweenness[u] + centrality.betweenness[v];
            (betweenness > threshold).then(|| SpreadPathEntry {
                from: graph.location(u).to_string(),
                to: graph.location(v).to_string(),
                betweenness,
                shared_disasters: edge.disaster_types.clone(),
                connection_strength: edge.weight,
            })
        })
        .collect();

    paths.sort_by(|a, b| b.betweenness.total_cmp(&a.betweenness));

    log::info!(
        "Found {} potential spread paths above threshold {}",
        paths.len(),
        threshold
    );

    paths
}
