//! Co-occurrence graph construction

use std::collections::{BTreeMap, BTreeSet, HashMap};

use dashmap::DashMap;
use itertools::Itertools;
use log;
use rayon::prelude::*;

use crate::data::IncidentRecord;
use crate::error::Result;
use crate::graph::compressed::{CoOccurrenceEdge, CompressedGraph};

/// Weight and type set accumulated for one location pair
#[derive(Debug, Clone, Default)]
struct EdgeAccumulator {
    weight: u32,
    disaster_types: BTreeSet<String>,
}

/// Builder for incrementally constructing a CompressedGraph
pub struct GraphBuilder {
    /// Mapping from location names to node indices
    id_to_index: HashMap<String, u32>,

    /// Location name per node index
    node_ids: Vec<String>,

    /// Edges keyed by (lower, higher) node index
    edges: HashMap<(u32, u32), EdgeAccumulator>,
}

impl GraphBuilder {
    /// Create a new graph builder with the given node capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id_to_index: HashMap::with_capacity(capacity),
            node_ids: Vec::with_capacity(capacity),
            edges: HashMap::new(),
        }
    }

    /// Get or create the node for a location
    pub fn get_or_create_node(&mut self, location: &str) -> u32 {
        if let Some(&idx) = self.id_to_index.get(location) {
            return idx;
        }

        let idx = self.node_ids.len() as u32;
        self.id_to_index.insert(location.to_string(), idx);
        self.node_ids.push(location.to_string());

        idx
    }

    /// Record that two nodes share a disaster type.
    ///
    /// A type already recorded for the pair leaves the edge unchanged.
    pub fn add_co_occurrence(&mut self, a: u32, b: u32, disaster_type: &str) {
        if a == b {
            return;
        }
        let key = if a < b { (a, b) } else { (b, a) };

        let edge = self.edges.entry(key).or_default();
        if edge.disaster_types.insert(disaster_type.to_string()) {
            edge.weight += 1;
        }
    }

    /// Merge a set of disaster types into a pair
    fn merge_edge_types(&mut self, key: (u32, u32), disaster_types: BTreeSet<String>) {
        let edge = self.edges.entry(key).or_default();
        for disaster_type in disaster_types {
            if edge.disaster_types.insert(disaster_type) {
                edge.weight += 1;
            }
        }
    }

    fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    /// Build the compressed graph
    pub fn build(self) -> CompressedGraph {
        let node_count = self.node_count();

        let mut edges: Vec<CoOccurrenceEdge> = self
            .edges
            .into_iter()
            .map(|((source, target), acc)| CoOccurrenceEdge {
                source,
                target,
                weight: acc.weight,
                disaster_types: acc.disaster_types,
            })
            .collect();
        edges.sort_unstable_by_key(|e| (e.source, e.target));

        // Both directions are stored
        let mut degrees = vec![0u32; node_count];
        for edge in &edges {
            degrees[edge.source as usize] += 1;
            degrees[edge.target as usize] += 1;
        }

        let mut offsets = Vec::with_capacity(node_count + 1);
        offsets.push(0);
        let mut offset = 0;
        for &degree in &degrees {
            offset += degree;
            offsets.push(offset);
        }

        let mut slots: Vec<Vec<(u32, u32)>> = degrees
            .iter()
            .map(|&d| Vec::with_capacity(d as usize))
            .collect();
        for (idx, edge) in edges.iter().enumerate() {
            slots[edge.source as usize].push((edge.target, idx as u32));
            slots[edge.target as usize].push((edge.source, idx as u32));
        }

        let mut adjacency = Vec::with_capacity(offset as usize);
        let mut edge_slots = Vec::with_capacity(offset as usize);
        for list in &mut slots {
            // Sort for binary search efficiency
            list.sort_unstable();
            for &(nbr, slot) in list.iter() {
                adjacency.push(nbr);
                edge_slots.push(slot);
            }
        }

        CompressedGraph {
            node_count,
            offsets,
            adjacency,
            edge_slots,
            edges,
            node_ids: self.node_ids,
            id_to_index: self.id_to_index,
        }
    }
}

/// Create a builder holding every location in first-appearance order, and
/// the distinct locations of each disaster type
fn collect_nodes(records: &[IncidentRecord]) -> (GraphBuilder, BTreeMap<&str, BTreeSet<u32>>) {
    let mut builder = GraphBuilder::with_capacity(records.len());
    let mut groups: BTreeMap<&str, BTreeSet<u32>> = BTreeMap::new();

    for record in records {
        let node = builder.get_or_create_node(&record.location);
        groups
            .entry(record.disaster_type.as_str())
            .or_default()
            .insert(node);
    }

    (builder, groups)
}

fn finish(builder: GraphBuilder) -> Result<CompressedGraph> {
    let graph = builder.build();
    graph.validate()?;

    log::info!(
        "Graph built with {} nodes and {} edges",
        graph.node_count,
        graph.edge_count()
    );

    Ok(graph)
}

/// Build the co-occurrence graph: every disaster type contributes a clique
/// over the locations it affected
pub fn build_graph(records: &[IncidentRecord]) -> Result<CompressedGraph> {
    log::info!("Building location graph from {} records", records.len());

    let (mut builder, groups) = collect_nodes(records);

    for (disaster_type, locations) in &groups {
        log::debug!("{}: {} locations", disaster_type, locations.len());
        for (&a, &b) in locations.iter().tuple_combinations() {
            builder.add_co_occurrence(a, b, disaster_type);
        }
    }

    finish(builder)
}

/// Same as [`build_graph`], expanding the per-type cliques in parallel
pub fn build_graph_parallel(records: &[IncidentRecord]) -> Result<CompressedGraph> {
    log::info!(
        "Building location graph from {} records using parallel implementation",
        records.len()
    );

    let (mut builder, groups) = collect_nodes(records);

    let pairs: DashMap<(u32, u32), BTreeSet<String>> = DashMap::new();
    groups.par_iter().for_each(|(disaster_type, locations)| {
        for (&a, &b) in locations.iter().tuple_combinations() {
            pairs
                .entry((a, b))
                .or_default()
                .insert(disaster_type.to_string());
        }
    });

    for (key, disaster_types) in pairs {
        builder.merge_edge_types(key, disaster_types);
    }

    finish(builder)
}
