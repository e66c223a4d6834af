//! High-risk location scoring

use std::collections::BTreeMap;

use log;
use serde::{Deserialize, Serialize};

use crate::graph::{CentralityTable, CompressedGraph};

/// A location whose centrality and severity together exceed the risk threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEntry {
    pub location: String,

    /// Degree centrality
    pub centrality: f64,

    /// Mean alert level across the location's records
    pub alert_level: f64,

    /// centrality × alert_level
    pub risk_score: f64,
}

/// Risk score of a location
pub fn risk_score(centrality: f64, alert_level: f64) -> f64 {
    centrality * alert_level
}

/// Score every location with both a centrality and an alert level, keep
/// those above `threshold`, highest first. Equal scores keep node order.
pub fn score_risk(
    graph: &CompressedGraph,
    centrality: &CentralityTable,
    alert_levels: &BTreeMap<String, f64>,
    threshold: f64,
) -> Vec<RiskEntry> {
    let mut entries: Vec<RiskEntry> = graph
        .node_ids
        .iter()
        .zip(&centrality.degree)
        .filter_map(|(location, &degree)| {
            let alert_level = *alert_levels.get(location)?;
            let score = risk_score(degree, alert_level);
            (score > threshold).then(|| RiskEntry {
                location: location.clone(),
                centrality: degree,
                alert_level,
                risk_score: score,
            })
        })
        .collect();

    entries.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));

    log::info!(
        "Identified {} high-risk locations above threshold {}",
        entries.len(),
        threshold
    );

    entries
}
