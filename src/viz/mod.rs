//! Graph export for external visualization tools
//!
//! Nothing here renders or lays out the network; it only writes node and
//! edge data in formats renderers understand.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use petgraph::dot::Dot;
use petgraph::graph::UnGraph;

use crate::cluster::ClusterSummary;
use crate::graph::CompressedGraph;
use crate::report::Analysis;

/// Write GraphML, DOT and cluster statistics into `<output_dir>/visualizations`
pub fn export_graph(analysis: &Analysis, output_dir: &Path) -> Result<PathBuf> {
    log::info!(
        "Exporting network with {} nodes for visualization",
        analysis.graph.node_count
    );

    let viz_dir = output_dir.join("visualizations");
    fs::create_dir_all(&viz_dir)
        .with_context(|| format!("Failed to create {}", viz_dir.display()))?;

    write_graphml(analysis, &viz_dir.join("disaster_network.graphml"))?;
    write_dot(&analysis.graph, &viz_dir.join("disaster_network.dot"))?;
    write_cluster_stats(&analysis.report.disaster_clusters, &viz_dir.join("cluster_stats.csv"))?;

    log::info!("Network export written to {}", viz_dir.display());

    Ok(viz_dir)
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Undirected GraphML with community, betweenness and edge type data
fn write_graphml(analysis: &Analysis, path: &Path) -> Result<()> {
    let graph = &analysis.graph;
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    writeln!(file, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(file, "<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">")?;
    writeln!(file, "  <key id=\"label\" for=\"node\" attr.name=\"label\" attr.type=\"string\"/>")?;
    writeln!(
        file,
        "  <key id=\"community\" for=\"node\" attr.name=\"community\" attr.type=\"int\"/>"
    )?;
    writeln!(
        file,
        "  <key id=\"betweenness\" for=\"node\" attr.name=\"betweenness\" attr.type=\"double\"/>"
    )?;
    writeln!(file, "  <key id=\"weight\" for=\"edge\" attr.name=\"weight\" attr.type=\"int\"/>")?;
    writeln!(
        file,
        "  <key id=\"disaster_types\" for=\"edge\" attr.name=\"disaster_types\" attr.type=\"string\"/>"
    )?;
    writeln!(file, "  <graph id=\"G\" edgedefault=\"undirected\">")?;

    for node in 0..graph.node_count {
        writeln!(file, "    <node id=\"n{}\">", node)?;
        writeln!(file, "      <data key=\"label\">{}</data>", escape_xml(graph.location(node)))?;
        writeln!(
            file,
            "      <data key=\"community\">{}</data>",
            analysis.partition.membership[node]
        )?;
        writeln!(
            file,
            "      <data key=\"betweenness\">{}</data>",
            analysis.centrality.betweenness[node]
        )?;
        writeln!(file, "    </node>")?;
    }

    for (edge_id, edge) in graph.edges.iter().enumerate() {
        let types: Vec<&str> = edge.disaster_types.iter().map(String::as_str).collect();
        writeln!(
            file,
            "    <edge id=\"e{}\" source=\"n{}\" target=\"n{}\">",
            edge_id, edge.source, edge.target
        )?;
        writeln!(file, "      <data key=\"weight\">{}</data>", edge.weight)?;
        writeln!(
            file,
            "      <data key=\"disaster_types\">{}</data>",
            escape_xml(&types.join(","))
        )?;
        writeln!(file, "    </edge>")?;
    }

    writeln!(file, "  </graph>")?;
    writeln!(file, "</graphml>")?;

    Ok(())
}

/// Convert to a petgraph graph labelled with locations and edge weights
pub fn to_petgraph(graph: &CompressedGraph) -> UnGraph<String, u32> {
    let mut out = UnGraph::with_capacity(graph.node_count, graph.edge_count());
    let indices: Vec<_> = graph
        .node_ids
        .iter()
        .map(|location| out.add_node(location.clone()))
        .collect();

    for edge in &graph.edges {
        out.add_edge(indices[edge.source as usize], indices[edge.target as usize], edge.weight);
    }

    out
}

fn write_dot(graph: &CompressedGraph, path: &Path) -> Result<()> {
    let pg = to_petgraph(graph);
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write!(file, "{}", Dot::new(&pg))?;
    Ok(())
}

/// Cluster statistics as CSV
fn write_cluster_stats(clusters: &[ClusterSummary], path: &Path) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    writeln!(file, "cluster_id,size,avg_alert_level,density")?;
    for cluster in clusters {
        writeln!(
            file,
            "{},{},{:.6},{:.6}",
            cluster.id, cluster.size, cluster.avg_alert_level, cluster.density
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::data::IncidentRecord;
    use crate::report::analyze;

    fn analysis() -> Analysis {
        let records = vec![
            IncidentRecord::new("A & Co", "flood", 3.0),
            IncidentRecord::new("B", "flood", 4.0),
            IncidentRecord::new("A & Co", "earthquake", 2.0),
            IncidentRecord::new("C", "earthquake", 5.0),
        ];
        analyze(&records, &AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn petgraph_conversion_preserves_structure() {
        let analysis = analysis();
        let pg = to_petgraph(&analysis.graph);

        assert_eq!(pg.node_count(), 3);
        assert_eq!(pg.edge_count(), 2);
    }

    #[test]
    fn export_writes_all_files() {
        let analysis = analysis();
        let dir = tempfile::tempdir().unwrap();

        let viz_dir = export_graph(&analysis, dir.path()).unwrap();

        let graphml = fs::read_to_string(viz_dir.join("disaster_network.graphml")).unwrap();
        assert!(graphml.contains("edgedefault=\"undirected\""));
        assert!(graphml.contains("A &amp; Co"));
        assert_eq!(graphml.matches("<edge ").count(), 2);

        let dot = fs::read_to_string(viz_dir.join("disaster_network.dot")).unwrap();
        assert!(dot.starts_with("graph {"));
        assert!(dot.contains("--"));

        let stats = fs::read_to_string(viz_dir.join("cluster_stats.csv")).unwrap();
        assert!(stats.starts_with("cluster_id,size,avg_alert_level,density"));
    }
}
