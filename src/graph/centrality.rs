//! Degree and betweenness centrality

use std::collections::VecDeque;

use log;
use rayon::prelude::*;
use serde::Serialize;

use crate::graph::CompressedGraph;

/// Number of source chunks, each owning one partial buffer
const SOURCE_CHUNKS: usize = 64;

/// Per-node centrality scores, indexed like the graph's nodes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CentralityTable {
    /// Normalized degree centrality in [0, 1]
    pub degree: Vec<f64>,

    /// Raw shortest-path betweenness (undirected, unnormalized)
    pub betweenness: Vec<f64>,
}

impl CentralityTable {
    /// Degree centrality of a location
    pub fn degree_of(&self, graph: &CompressedGraph, location: &str) -> Option<f64> {
        graph.node_index(location).map(|idx| self.degree[idx])
    }

    /// Betweenness centrality of a location
    pub fn betweenness_of(&self, graph: &CompressedGraph, location: &str) -> Option<f64> {
        graph.node_index(location).map(|idx| self.betweenness[idx])
    }
}

/// Compute degree and betweenness centrality for every node
pub fn compute_centrality(graph: &CompressedGraph) -> CentralityTable {
    log::info!("Computing centrality for {} nodes", graph.node_count);

    let table = CentralityTable {
        degree: degree_centrality(graph),
        betweenness: betweenness_centrality(graph),
    };

    log::debug!(
        "Max betweenness {:.4}",
        table.betweenness.iter().cloned().fold(0.0, f64::max)
    );

    table
}

/// degree(v) / (n - 1), or 0 for graphs with fewer than two nodes
pub fn degree_centrality(graph: &CompressedGraph) -> Vec<f64> {
    let n = graph.node_count;
    if n <= 1 {
        return vec![0.0; n];
    }

    let scale = 1.0 / (n - 1) as f64;
    (0..n).map(|v| graph.degree(v) as f64 * scale).collect()
}

/// Sources per chunk so that at most `SOURCE_CHUNKS` partial buffers exist
fn source_chunk_len(n: usize) -> usize {
    n.div_ceil(SOURCE_CHUNKS).max(1)
}

/// Brandes betweenness over unweighted shortest paths.
///
/// Sources are split into at most `SOURCE_CHUNKS` chunks whose partial sums
/// are reduced in chunk order, so the result does not depend on thread
/// scheduling and partial buffers take O(SOURCE_CHUNKS * n) memory.
pub fn betweenness_centrality(graph: &CompressedGraph) -> Vec<f64> {
    let n = graph.node_count;
    if n == 0 {
        return Vec::new();
    }

    let sources: Vec<usize> = (0..n).collect();
    let partials: Vec<Vec<f64>> = sources
        .par_chunks(source_chunk_len(n))
        .map(|chunk| {
            let mut workspace = BrandesWorkspace::new(n);
            let mut acc = vec![0.0; n];
            for &s in chunk {
                workspace.accumulate_from(graph, s, &mut acc);
            }
            acc
        })
        .collect();

    let mut betweenness = vec![0.0; n];
    for partial in partials {
        for (total, value) in betweenness.iter_mut().zip(partial) {
            *total += value;
        }
    }

    // Each pair was counted from both endpoints
    for value in &mut betweenness {
        *value /= 2.0;
    }

    betweenness
}

/// Scratch buffers reused across sources
struct BrandesWorkspace {
    sigma: Vec<f64>,
    dist: Vec<i64>,
    delta: Vec<f64>,
    predecessors: Vec<Vec<u32>>,
    order: Vec<u32>,
    queue: VecDeque<u32>,
}

impl BrandesWorkspace {
    fn new(n: usize) -> Self {
        Self {
            sigma: vec![0.0; n],
            dist: vec![-1; n],
            delta: vec![0.0; n],
            predecessors: vec![Vec::new(); n],
            order: Vec::with_capacity(n),
            queue: VecDeque::with_capacity(n),
        }
    }

    fn reset(&mut self) {
        self.sigma.fill(0.0);
        self.dist.fill(-1);
        self.delta.fill(0.0);
        for preds in &mut self.predecessors {
            preds.clear();
        }
        self.order.clear();
        self.queue.clear();
    }

    /// Add the dependencies of source `s` into `acc`
    fn accumulate_from(&mut self, graph: &CompressedGraph, s: usize, acc: &mut [f64]) {
        self.reset();

        self.sigma[s] = 1.0;
        self.dist[s] = 0;
        self.queue.push_back(s as u32);

        while let Some(v) = self.queue.pop_front() {
            let v = v as usize;
            self.order.push(v as u32);
            for &w in graph.neighbors(v) {
                let w = w as usize;
                if self.dist[w] < 0 {
                    self.dist[w] = self.dist[v] + 1;
                    self.queue.push_back(w as u32);
                }
                if self.dist[w] == self.dist[v] + 1 {
                    self.sigma[w] += self.sigma[v];
                    self.predecessors[w].push(v as u32);
                }
            }
        }

        // Farthest nodes first
        while let Some(w) = self.order.pop() {
            let w = w as usize;
            let coefficient = (1.0 + self.delta[w]) / self.sigma[w];
            for &v in &self.predecessors[w] {
                let v = v as usize;
                self.delta[v] += self.sigma[v] * coefficient;
            }
            if w != s {
                acc[w] += self.delta[w];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::IncidentRecord;
    use crate::graph::builder::build_graph;

    const EPS: f64 = 1e-9;

    /// Path a0 - a1 - ... - a(n-1), one disaster type per consecutive pair
    fn path_graph(n: usize) -> CompressedGraph {
        let mut records = Vec::new();
        for i in 0..n - 1 {
            let t = format!("link{}", i);
            records.push(IncidentRecord::new(format!("a{}", i), t.clone(), 1.0));
            records.push(IncidentRecord::new(format!("a{}", i + 1), t, 1.0));
        }
        build_graph(&records).unwrap()
    }

    #[test]
    fn path_graph_betweenness_matches_closed_form() {
        for n in 3..9 {
            let graph = path_graph(n);
            let bc = betweenness_centrality(&graph);
            for i in 0..n {
                let idx = graph.node_index(&format!("a{}", i)).unwrap();
                let expected = (i * (n - 1 - i)) as f64;
                assert!(
                    (bc[idx] - expected).abs() < EPS,
                    "n={} i={} got {} expected {}",
                    n,
                    i,
                    bc[idx],
                    expected
                );
            }
        }
    }

    #[test]
    fn star_center_carries_all_paths() {
        // Hub shares a distinct type with each leaf
        let mut records = Vec::new();
        for leaf in 0..4 {
            let t = format!("t{}", leaf);
            records.push(IncidentRecord::new("hub", t.clone(), 1.0));
            records.push(IncidentRecord::new(format!("leaf{}", leaf), t, 1.0));
        }
        let graph = build_graph(&records).unwrap();
        let table = compute_centrality(&graph);

        // C(4, 2) leaf pairs all route through the hub
        assert!((table.betweenness_of(&graph, "hub").unwrap() - 6.0).abs() < EPS);
        assert!((table.degree_of(&graph, "hub").unwrap() - 1.0).abs() < EPS);
        assert!((table.degree_of(&graph, "leaf0").unwrap() - 0.25).abs() < EPS);
        assert!(table.betweenness_of(&graph, "leaf0").unwrap().abs() < EPS);
    }

    #[test]
    fn split_shortest_paths_share_credit() {
        // Square a-b-d-c-a: two shortest paths between a and d
        let records = vec![
            IncidentRecord::new("a", "t1", 1.0),
            IncidentRecord::new("b", "t1", 1.0),
            IncidentRecord::new("b", "t2", 1.0),
            IncidentRecord::new("d", "t2", 1.0),
            IncidentRecord::new("d", "t3", 1.0),
            IncidentRecord::new("c", "t3", 1.0),
            IncidentRecord::new("c", "t4", 1.0),
            IncidentRecord::new("a", "t4", 1.0),
        ];
        let graph = build_graph(&records).unwrap();
        let bc = betweenness_centrality(&graph);

        for value in bc {
            assert!((value - 0.5).abs() < EPS);
        }
    }

    #[test]
    fn isolated_nodes_score_zero() {
        let records = vec![
            IncidentRecord::new("A", "flood", 1.0),
            IncidentRecord::new("B", "flood", 1.0),
            IncidentRecord::new("C", "flood", 1.0),
            IncidentRecord::new("Z", "tsunami", 1.0),
        ];
        let graph = build_graph(&records).unwrap();
        let table = compute_centrality(&graph);
        let z = graph.node_index("Z").unwrap();

        assert_eq!(table.degree[z], 0.0);
        assert_eq!(table.betweenness[z], 0.0);
        for node in 0..graph.node_count {
            assert!((0.0..=1.0).contains(&table.degree[node]));
            assert_eq!(table.degree[node] == 0.0, graph.degree(node) == 0);
        }
    }

    #[test]
    fn single_node_graph_has_zero_centrality() {
        let graph = build_graph(&[IncidentRecord::new("A", "flood", 3.0)]).unwrap();
        let table = compute_centrality(&graph);
        assert_eq!(table.degree, vec![0.0]);
        assert_eq!(table.betweenness, vec![0.0]);
    }

    #[test]
    fn large_graph_result_is_reproducible() {
        // Spans several source chunks
        let types = ["flood", "earthquake", "storm", "fire", "slide", "surge"];
        let records: Vec<IncidentRecord> = (0..400)
            .map(|i| {
                let location = format!("loc{}", (i * 13) % 150);
                IncidentRecord::new(location, types[(i / 3) % types.len()], 1.0)
            })
            .collect();
        let graph = build_graph(&records).unwrap();

        assert_eq!(betweenness_centrality(&graph), betweenness_centrality(&graph));
    }

    #[test]
    fn partial_buffer_count_is_bounded() {
        for n in [1, 2, 63, 64, 65, 150, 4_097, 100_000, 1_000_003] {
            let len = source_chunk_len(n);
            let chunks = n.div_ceil(len);
            assert!(chunks <= SOURCE_CHUNKS, "n={} gives {} chunks", n, chunks);
            assert!(len * chunks >= n);
        }
    }

    #[test]
    fn chunking_matches_single_pass() {
        // 150 nodes span many chunks; compare against one sequential sweep
        let types = ["flood", "earthquake", "storm", "fire", "slide", "surge"];
        let records: Vec<IncidentRecord> = (0..400)
            .map(|i| {
                let location = format!("loc{}", (i * 13) % 150);
                IncidentRecord::new(location, types[(i / 3) % types.len()], 1.0)
            })
            .collect();
        let graph = build_graph(&records).unwrap();
        let n = graph.node_count;

        let mut workspace = BrandesWorkspace::new(n);
        let mut expected = vec![0.0; n];
        for s in 0..n {
            workspace.accumulate_from(&graph, s, &mut expected);
        }

        for (got, want) in betweenness_centrality(&graph).iter().zip(&expected) {
            assert!((got - want / 2.0).abs() < 1e-6);
        }
    }
}
