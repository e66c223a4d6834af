//! Community detection and cluster summaries

pub mod detection;
pub mod metrics;

use serde::{Deserialize, Serialize};

pub use detection::{detect_communities, LouvainOptions};
pub use metrics::{modularity, summarize_clusters};

/// Assignment of every graph node to exactly one community
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Partition {
    /// Community id per node index; ids are dense and ordered by each
    /// community's lowest node index
    pub membership: Vec<usize>,

    /// Number of communities
    pub community_count: usize,

    /// Modularity of the final partition
    pub modularity: f64,

    /// Modularity after each aggregation level, starting from singletons
    pub level_modularity: Vec<f64>,
}

impl Partition {
    /// Node indices of each community, ascending
    pub fn communities(&self) -> Vec<Vec<u32>> {
        let mut members = vec![Vec::new(); self.community_count];
        for (node, &community) in self.membership.iter().enumerate() {
            members[community].push(node as u32);
        }
        members
    }
}

/// A correlated disaster zone: a community of more than one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Community ordinal
    pub id: u32,

    /// Member locations
    pub locations: Vec<String>,

    /// Number of member locations
    pub size: usize,

    /// Mean of the members' average alert levels
    pub avg_alert_level: f64,

    /// Internal edges over possible internal edges
    pub density: f64,
}
