//! Compressed sparse representation of the location co-occurrence graph

use std::collections::{BTreeSet, HashMap};
use std::mem;

use serde::Serialize;

use crate::error::{EngineError, Result};

/// An undirected edge between two locations that share disaster types
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoOccurrenceEdge {
    /// Lower node index
    pub source: u32,

    /// Higher node index
    pub target: u32,

    /// Number of distinct disaster types linking the endpoints
    pub weight: u32,

    /// The disaster types linking the endpoints
    pub disaster_types: BTreeSet<String>,
}

/// Undirected, simple graph over locations in CSR form.
///
/// Every edge appears in the adjacency of both endpoints; `edge_slots`
/// runs parallel to `adjacency` and points into `edges`.
#[derive(Debug, Clone, Serialize)]
pub struct CompressedGraph {
    /// Number of nodes in the graph
    pub node_count: usize,

    /// Offset array: offsets[i] to offsets[i+1] is the neighbour range of node i
    pub offsets: Vec<u32>,

    /// Concatenated, per-node sorted neighbour lists
    pub adjacency: Vec<u32>,

    /// Edge index for each adjacency slot
    pub edge_slots: Vec<u32>,

    /// Edge records, each undirected edge once with source < target
    pub edges: Vec<CoOccurrenceEdge>,

    /// Location name for each node index
    pub node_ids: Vec<String>,

    #[serde(skip)]
    pub(crate) id_to_index: HashMap<String, u32>,
}

impl CompressedGraph {
    /// A graph with no nodes
    pub fn empty() -> Self {
        Self {
            node_count: 0,
            offsets: vec![0],
            adjacency: Vec::new(),
            edge_slots: Vec::new(),
            edges: Vec::new(),
            node_ids: Vec::new(),
            id_to_index: HashMap::new(),
        }
    }

    /// Neighbours of a node
    pub fn neighbors(&self, node: usize) -> &[u32] {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        &self.adjacency[start..end]
    }

    /// Neighbours of a node paired with the connecting edge
    pub fn incident_edges(
        &self,
        node: usize,
    ) -> impl Iterator<Item = (u32, &CoOccurrenceEdge)> + '_ {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        self.adjacency[start..end]
            .iter()
            .zip(&self.edge_slots[start..end])
            .map(move |(&nbr, &slot)| (nbr, &self.edges[slot as usize]))
    }

    /// Unweighted degree of a node
    pub fn degree(&self, node: usize) -> usize {
        (self.offsets[node + 1] - self.offsets[node]) as usize
    }

    /// Sum of edge weights incident to a node
    pub fn weighted_degree(&self, node: usize) -> f64 {
        self.incident_edges(node).map(|(_, e)| e.weight as f64).sum()
    }

    /// Sum of all edge weights, each edge counted once
    pub fn total_weight(&self) -> f64 {
        self.edges.iter().map(|e| e.weight as f64).sum()
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Node index of a location
    pub fn node_index(&self, location: &str) -> Option<usize> {
        self.id_to_index.get(location).map(|&idx| idx as usize)
    }

    /// Location name of a node
    pub fn location(&self, node: usize) -> &str {
        &self.node_ids[node]
    }

    /// Check if the two nodes are adjacent
    pub fn has_edge(&self, a: usize, b: u32) -> bool {
        self.neighbors(a).binary_search(&b).is_ok()
    }

    /// The edge between two locations, if any
    pub fn edge_between(&self, a: &str, b: &str) -> Option<&CoOccurrenceEdge> {
        let a = self.node_index(a)?;
        let b = self.node_index(b)? as u32;
        let pos = self.neighbors(a).binary_search(&b).ok()?;
        let slot = self.edge_slots[self.offsets[a] as usize + pos];
        Some(&self.edges[slot as usize])
    }

    /// Check structural invariants.
    ///
    /// Weight equals the number of disaster types, there are no self-loops or
    /// duplicate pairs, and adjacency is symmetric.
    pub fn validate(&self) -> Result<()> {
        if self.offsets.len() != self.node_count + 1 || self.node_ids.len() != self.node_count {
            return Err(EngineError::Computation(format!(
                "node arrays disagree with node count {}",
                self.node_count
            )));
        }
        if self.adjacency.len() != 2 * self.edges.len()
            || self.edge_slots.len() != self.adjacency.len()
        {
            return Err(EngineError::Computation(format!(
                "adjacency holds {} slots for {} edges",
                self.adjacency.len(),
                self.edges.len()
            )));
        }

        for (idx, edge) in self.edges.iter().enumerate() {
            if edge.weight as usize != edge.disaster_types.len() {
                return Err(EngineError::Computation(format!(
                    "edge {}-{} has weight {} but {} disaster types",
                    self.location(edge.source as usize),
                    self.location(edge.target as usize),
                    edge.weight,
                    edge.disaster_types.len()
                )));
            }
            if edge.source >= edge.target {
                return Err(EngineError::Computation(format!(
                    "edge {} is a self-loop or not normalized ({} -> {})",
                    idx, edge.source, edge.target
                )));
            }
            if !self.has_edge(edge.source as usize, edge.target)
                || !self.has_edge(edge.target as usize, edge.source)
            {
                return Err(EngineError::Computation(format!(
                    "edge {}-{} missing from adjacency",
                    edge.source, edge.target
                )));
            }
        }

        for node in 0..self.node_count {
            let nbrs = self.neighbors(node);
            if nbrs.windows(2).any(|w| w[0] >= w[1]) {
                return Err(EngineError::Computation(format!(
                    "node {} has unsorted or duplicate neighbours",
                    self.location(node)
                )));
            }
        }

        Ok(())
    }

    /// Estimate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        let base = mem::size_of::<Self>();
        let offsets = self.offsets.capacity() * mem::size_of::<u32>();
        let adjacency =
            (self.adjacency.capacity() + self.edge_slots.capacity()) * mem::size_of::<u32>();
        let edges = self.edges.capacity() * mem::size_of::<CoOccurrenceEdge>()
            + self
                .edges
                .iter()
                .flat_map(|e| e.disaster_types.iter())
                .map(|t| t.capacity())
                .sum::<usize>();
        let ids = self.node_ids.iter().map(|s| s.capacity()).sum::<usize>();

        base + offsets + adjacency + edges + ids
    }
}
