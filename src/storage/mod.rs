//! Results persistence module

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{json, to_string_pretty};

use crate::report::Analysis;

/// Save the report, a summary and the raw graph to the specified directory
pub fn save_results(analysis: &Analysis, output_dir: &Path) -> Result<()> {
    log::info!("Saving analysis results to {}", output_dir.display());

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    save_report(analysis, output_dir)?;
    save_summary(analysis, output_dir)?;
    save_graph(analysis, output_dir)?;

    log::info!("Results saved successfully");

    Ok(())
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(to_string_pretty(value)?.as_bytes())?;
    Ok(())
}

/// Save the report exactly as downstream consumers read it
fn save_report(analysis: &Analysis, output_dir: &Path) -> Result<()> {
    let path = output_dir.join("report.json");
    write_json(&path, &serde_json::to_value(&analysis.report)?)
}

/// Save graph and cluster statistics
fn save_summary(analysis: &Analysis, output_dir: &Path) -> Result<()> {
    log::info!("Saving summary information");

    let graph = &analysis.graph;
    let clusters = &analysis.report.disaster_clusters;
    let avg_degree = if graph.node_count == 0 {
        0.0
    } else {
        2.0 * graph.edge_count() as f64 / graph.node_count as f64
    };

    let summary = json!({
        "graph_stats": {
            "node_count": graph.node_count,
            "edge_count": graph.edge_count(),
            "total_weight": graph.total_weight(),
            "avg_degree": avg_degree,
            "isolated_nodes": (0..graph.node_count).filter(|&n| graph.degree(n) == 0).count(),
        },
        "cluster_stats": {
            "community_count": analysis.partition.community_count,
            "cluster_count": clusters.len(),
            "total_clustered_locations": clusters.iter().map(|c| c.size).sum::<usize>(),
            "largest_cluster_size": clusters.first().map_or(0, |c| c.size),
            "modularity": analysis.partition.modularity,
        },
        "records": {
            "analyzed": analysis.report.records_analyzed,
            "skipped": analysis.report.skipped_records,
        }
    });

    write_json(&output_dir.join("summary.json"), &summary)
}

/// Save nodes with their scores and edges with their disaster types
fn save_graph(analysis: &Analysis, output_dir: &Path) -> Result<()> {
    log::info!("Saving graph data");

    let graph = &analysis.graph;
    let nodes: Vec<serde_json::Value> = (0..graph.node_count)
        .map(|node| {
            json!({
                "id": node,
                "location": graph.location(node),
                "degree": graph.degree(node),
                "degree_centrality": analysis.centrality.degree[node],
                "betweenness": analysis.centrality.betweenness[node],
                "community": analysis.partition.membership[node],
            })
        })
        .collect();

    let edges: Vec<serde_json::Value> = graph
        .edges
        .iter()
        .map(|edge| {
            json!({
                "source": graph.location(edge.source as usize),
                "target": graph.location(edge.target as usize),
                "weight": edge.weight,
                "disaster_types": edge.disaster_types,
            })
        })
        .collect();

    write_json(
        &output_dir.join("graph.json"),
        &json!({ "nodes": nodes, "edges": edges }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::data::IncidentRecord;
    use crate::report::analyze;

    #[test]
    fn writes_report_summary_and_graph() {
        let records = vec![
            IncidentRecord::new("A", "flood", 3.0),
            IncidentRecord::new("B", "flood", 4.0),
            IncidentRecord::new("A", "earthquake", 2.0),
            IncidentRecord::new("C", "earthquake", 5.0),
        ];
        let analysis = analyze(&records, &AnalysisConfig::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();

        save_results(&analysis, dir.path()).unwrap();

        let graph: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("graph.json")).unwrap())
                .unwrap();
        assert_eq!(graph["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(graph["edges"].as_array().unwrap().len(), 2);
        assert_eq!(graph["edges"][0]["disaster_types"][0], "flood");

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(summary["graph_stats"]["node_count"], 3);

        assert!(dir.path().join("report.json").exists());
    }

    #[test]
    fn empty_analysis_is_saved() {
        let analysis = analyze(&[], &AnalysisConfig::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();

        save_results(&analysis, dir.path()).unwrap();

        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap())
                .unwrap();
        assert_eq!(report["locations_analyzed"], 0);
    }
}
