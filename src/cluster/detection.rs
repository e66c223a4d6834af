//! Louvain community detection
//!
//! Multilevel modularity optimization (Blondel et al. 2008):
//!
//! 1. **Local moving**: every node starts in its own community and is
//!    repeatedly moved to the neighbouring community with the largest
//!    modularity gain until no move improves the partition.
//! 2. **Aggregation**: each community collapses into a super-node. Edges
//!    between communities are summed; intra-community weight is kept on the
//!    super-node so its strength is preserved, but it is never a move target.
//!
//! The two phases repeat until a cycle merges nothing.
//!
//! Ties are broken deterministically: nodes are visited in index order,
//! candidate communities in ascending id, and a candidate must beat the
//! current best by more than `min_gain` to replace it.

use std::collections::BTreeMap;

use log;
use serde::{Deserialize, Serialize};

use crate::cluster::Partition;
use crate::error::{EngineError, Result};
use crate::graph::CompressedGraph;

/// Iteration caps and convergence tolerance for Louvain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LouvainOptions {
    /// Maximum sweeps over all nodes in one local moving phase
    pub max_passes: usize,

    /// Maximum aggregation levels
    pub max_levels: usize,

    /// Smallest gain counted as an improvement
    pub min_gain: f64,
}

impl Default for LouvainOptions {
    fn default() -> Self {
        Self {
            max_passes: 100,
            max_levels: 32,
            min_gain: 1e-10,
        }
    }
}

impl LouvainOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_passes == 0 {
            return Err(EngineError::invalid_config("max_passes", "must be at least 1"));
        }
        if self.max_levels == 0 {
            return Err(EngineError::invalid_config("max_levels", "must be at least 1"));
        }
        if !self.min_gain.is_finite() || self.min_gain < 0.0 {
            return Err(EngineError::invalid_config(
                "min_gain",
                format!("must be a non-negative number, got {}", self.min_gain),
            ));
        }
        Ok(())
    }
}

/// Weighted graph at one aggregation level
#[derive(Debug, Clone)]
struct LevelGraph {
    /// Neighbour lists sorted by node, without self-loops
    adjacency: Vec<Vec<(usize, f64)>>,

    /// Weight internal to each node (edges collapsed into it)
    internal: Vec<f64>,
}

impl LevelGraph {
    fn from_graph(graph: &CompressedGraph) -> Self {
        let adjacency = (0..graph.node_count)
            .map(|node| {
                graph
                    .incident_edges(node)
                    .map(|(nbr, edge)| (nbr as usize, edge.weight as f64))
                    .collect()
            })
            .collect();

        Self {
            adjacency,
            internal: vec![0.0; graph.node_count],
        }
    }

    fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Weighted degree; internal weight counts twice
    fn strengths(&self) -> Vec<f64> {
        self.adjacency
            .iter()
            .zip(&self.internal)
            .map(|(nbrs, &internal)| nbrs.iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * internal)
            .collect()
    }

    /// Total edge weight, each edge once
    fn total_weight(&self) -> f64 {
        let between: f64 = self
            .adjacency
            .iter()
            .flat_map(|nbrs| nbrs.iter().map(|&(_, w)| w))
            .sum::<f64>()
            / 2.0;
        between + self.internal.iter().sum::<f64>()
    }

    fn modularity(&self, communities: &[usize]) -> f64 {
        let m = self.total_weight();
        if m == 0.0 {
            return 0.0;
        }

        let count = communities.iter().copied().max().map_or(0, |c| c + 1);
        let mut inside = vec![0.0; count];
        let mut totals = vec![0.0; count];

        for (node, (nbrs, strength)) in self.adjacency.iter().zip(self.strengths()).enumerate() {
            let c = communities[node];
            totals[c] += strength;
            inside[c] += self.internal[node];
            for &(nbr, w) in nbrs {
                if nbr > node && communities[nbr] == c {
                    inside[c] += w;
                }
            }
        }

        inside
            .iter()
            .zip(&totals)
            .map(|(&l, &k)| l / m - (k / (2.0 * m)).powi(2))
            .sum()
    }

    /// Phase 1. Returns dense community ids, their count, and whether any
    /// node moved.
    fn local_moving(&self, options: &LouvainOptions) -> (Vec<usize>, usize, bool) {
        let n = self.len();
        let m = self.total_weight();
        if m == 0.0 {
            return ((0..n).collect(), n, false);
        }

        let strengths = self.strengths();
        let mut communities: Vec<usize> = (0..n).collect();
        let mut community_totals = strengths.clone();
        let mut moved = false;

        for pass in 0..options.max_passes {
            let mut improved = false;

            for node in 0..n {
                let current = communities[node];
                let ki = strengths[node];

                community_totals[current] -= ki;

                let mut links: BTreeMap<usize, f64> = BTreeMap::new();
                for &(nbr, w) in &self.adjacency[node] {
                    *links.entry(communities[nbr]).or_insert(0.0) += w;
                }

                let gain = |community: usize, ki_in: f64| {
                    ki_in / m - community_totals[community] * ki / (2.0 * m * m)
                };

                let mut best = current;
                let mut best_gain = gain(current, links.get(&current).copied().unwrap_or(0.0));
                for (&community, &ki_in) in &links {
                    let g = gain(community, ki_in);
                    if g > best_gain + options.min_gain {
                        best = community;
                        best_gain = g;
                    }
                }

                community_totals[best] += ki;
                if best != current {
                    communities[node] = best;
                    improved = true;
                    moved = true;
                }
            }

            if !improved {
                log::debug!("Local moving converged after {} passes", pass + 1);
                break;
            }
            if pass + 1 == options.max_passes {
                log::warn!("Local moving stopped at pass cap of {}", options.max_passes);
            }
        }

        let (dense, count) = renumber(&communities);
        (dense, count, moved)
    }

    /// Phase 2: collapse communities into super-nodes
    fn aggregate(&self, communities: &[usize], count: usize) -> LevelGraph {
        let mut links: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); count];
        let mut internal = vec![0.0; count];

        for (node, nbrs) in self.adjacency.iter().enumerate() {
            let c = communities[node];
            internal[c] += self.internal[node];
            for &(nbr, w) in nbrs {
                if nbr < node {
                    continue;
                }
                let d = communities[nbr];
                if c == d {
                    internal[c] += w;
                } else {
                    *links[c].entry(d).or_insert(0.0) += w;
                    *links[d].entry(c).or_insert(0.0) += w;
                }
            }
        }

        LevelGraph {
            adjacency: links.into_iter().map(|m| m.into_iter().collect()).collect(),
            internal,
        }
    }
}

/// Relabel communities densely in order of first appearance
fn renumber(communities: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping: BTreeMap<usize, usize> = BTreeMap::new();
    let mut order = Vec::new();
    for &c in communities {
        if !mapping.contains_key(&c) {
            mapping.insert(c, order.len());
            order.push(c);
        }
    }
    let dense = communities.iter().map(|c| mapping[c]).collect();
    (dense, order.len())
}

/// Partition the graph's nodes into communities maximizing modularity
pub fn detect_communities(graph: &CompressedGraph, options: &LouvainOptions) -> Result<Partition> {
    options.validate()?;
    log::info!(
        "Detecting communities on {} nodes and {} edges",
        graph.node_count,
        graph.edge_count()
    );

    let n = graph.node_count;
    let mut level = LevelGraph::from_graph(graph);
    let mut membership: Vec<usize> = (0..n).collect();
    let mut modularity = level.modularity(&membership);
    let mut level_modularity = vec![modularity];

    for depth in 0..options.max_levels {
        let (communities, count, moved) = level.local_moving(options);
        if !moved || count == level.len() {
            log::debug!("No merges at level {}", depth);
            break;
        }

        let q = level.modularity(&communities);
        if q - modularity < options.min_gain {
            log::debug!(
                "Modularity gain {:.3e} below tolerance at level {}",
                q - modularity,
                depth
            );
            break;
        }

        membership = membership.iter().map(|&c| communities[c]).collect();
        level = level.aggregate(&communities, count);
        modularity = q;
        level_modularity.push(q);

        log::debug!("Level {}: {} communities, modularity {:.4}", depth, count, q);
    }

    let (membership, community_count) = renumber(&membership);

    log::info!(
        "Found {} communities with modularity {:.4}",
        community_count,
        modularity
    );

    Ok(Partition {
        membership,
        community_count,
        modularity,
        level_modularity,
    })
}
