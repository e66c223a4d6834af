//! Cluster statistics and metrics

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::cluster::{ClusterSummary, Partition};
use crate::graph::CompressedGraph;

/// Weighted modularity of a node-to-community assignment
pub fn modularity(graph: &CompressedGraph, membership: &[usize]) -> f64 {
    let m = graph.total_weight();
    if m == 0.0 {
        return 0.0;
    }

    let count = membership.iter().copied().max().map_or(0, |c| c + 1);
    let mut inside = vec![0.0; count];
    let mut totals = vec![0.0; count];

    for node in 0..graph.node_count {
        totals[membership[node]] += graph.weighted_degree(node);
    }
    for edge in &graph.edges {
        let c = membership[edge.source as usize];
        if c == membership[edge.target as usize] {
            inside[c] += edge.weight as f64;
        }
    }

    inside
        .iter()
        .zip(&totals)
        .map(|(&l, &k)| l / m - (k / (2.0 * m)).powi(2))
        .sum()
}

/// Calculate density (actual edges / potential edges) of an undirected cluster
pub fn calculate_density(graph: &CompressedGraph, members: &[u32]) -> f64 {
    let n = members.len();
    if n <= 1 {
        return 1.0; // By convention, singleton clusters have density 1
    }

    let potential_edges = n * (n - 1) / 2;
    let member_set: HashSet<u32> = members.iter().copied().collect();

    // Each internal edge is seen from both endpoints
    let mut endpoints = 0;
    for &node in members {
        endpoints += graph
            .neighbors(node as usize)
            .iter()
            .filter(|nbr| member_set.contains(nbr))
            .count();
    }

    (endpoints / 2) as f64 / potential_edges as f64
}

/// Summaries of every community with more than one location, largest and
/// most severe first.
///
/// Members without an alert level contribute 0 to the average.
pub fn summarize_clusters(
    partition: &Partition,
    graph: &CompressedGraph,
    alert_levels: &BTreeMap<String, f64>,
) -> Vec<ClusterSummary> {
    let mut clusters: Vec<ClusterSummary> = partition
        .communities()
        .into_iter()
        .enumerate()
        .filter(|(_, members)| members.len() > 1)
        .map(|(id, members)| {
            let locations: Vec<String> = members
                .iter()
                .map(|&node| graph.location(node as usize).to_string())
                .collect();
            let total: f64 = locations
                .iter()
                .map(|loc| alert_levels.get(loc).copied().unwrap_or(0.0))
                .sum();

            ClusterSummary {
                id: id as u32,
                size: locations.len(),
                avg_alert_level: total / locations.len() as f64,
                density: calculate_density(graph, &members),
                locations,
            }
        })
        .collect();

    clusters.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| {
                b.avg_alert_level
                    .partial_cmp(&a.avg_alert_level)
                    .unwrap_or(Ordering::Equal)
            })
    });

    clusters
}
