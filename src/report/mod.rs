//! Report assembly and the end-to-end analysis pipeline

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use log;
use serde::{Deserialize, Serialize};

use crate::analysis::{detect_spread_paths, score_risk, RiskEntry, SpreadPathEntry};
use crate::cluster::{detect_communities, summarize_clusters, ClusterSummary, Partition};
use crate::config::AnalysisConfig;
use crate::data::preprocessing::{disaster_types, filter_recent, ingest, mean_alert_levels};
use crate::data::{IncidentRecord, RawIncidentRecord};
use crate::error::Result;
use crate::graph::{
    build_graph, build_graph_parallel, compute_centrality, CentralityTable, CompressedGraph,
};

/// Outcome of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "timestamp")]
    pub generated_at: DateTime<Utc>,

    /// Distinct locations in the graph
    pub locations_analyzed: usize,

    pub disaster_types_analyzed: BTreeSet<String>,

    /// Valid records that entered the graph
    pub records_analyzed: usize,

    /// Records dropped for missing required fields
    pub skipped_records: usize,

    /// Modularity of the community partition
    pub modularity: f64,

    pub high_risk_locations: Vec<RiskEntry>,
    pub disaster_clusters: Vec<ClusterSummary>,
    pub potential_spread_paths: Vec<SpreadPathEntry>,
}

impl Report {
    /// Report for a batch with no usable records
    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            locations_analyzed: 0,
            disaster_types_analyzed: BTreeSet::new(),
            records_analyzed: 0,
            skipped_records: 0,
            modularity: 0.0,
            high_risk_locations: Vec::new(),
            disaster_clusters: Vec::new(),
            potential_spread_paths: Vec::new(),
        }
    }

    /// True if no records were analyzed
    pub fn is_empty(&self) -> bool {
        self.records_analyzed == 0
    }
}

/// Everything produced by one run: the graph snapshot, its centrality, the
/// community partition and the report composed from them
#[derive(Debug, Clone)]
pub struct Analysis {
    pub graph: CompressedGraph,
    pub centrality: CentralityTable,
    pub partition: Partition,
    pub report: Report,
}

/// Compose stage outputs into a report, truncating the ranked lists
pub fn assemble_report(
    graph: &CompressedGraph,
    records: &[IncidentRecord],
    partition: &Partition,
    mut high_risk_locations: Vec<RiskEntry>,
    disaster_clusters: Vec<ClusterSummary>,
    mut potential_spread_paths: Vec<SpreadPathEntry>,
    config: &AnalysisConfig,
) -> Report {
    high_risk_locations.truncate(config.top_risk_locations);
    potential_spread_paths.truncate(config.top_spread_paths);

    Report {
        generated_at: Utc::now(),
        locations_analyzed: graph.node_count,
        disaster_types_analyzed: disaster_types(records),
        records_analyzed: records.len(),
        skipped_records: 0,
        modularity: partition.modularity,
        high_risk_locations,
        disaster_clusters,
        potential_spread_paths,
    }
}

/// Run the full pipeline over validated records
pub fn analyze(records: &[IncidentRecord], config: &AnalysisConfig) -> Result<Analysis> {
    config.validate()?;

    if records.is_empty() {
        log::warn!("No disaster data available for analysis");
        return Ok(Analysis {
            graph: CompressedGraph::empty(),
            centrality: compute_centrality(&CompressedGraph::empty()),
            partition: Partition {
                membership: Vec::new(),
                community_count: 0,
                modularity: 0.0,
                level_modularity: vec![0.0],
            },
            report: Report::empty(Utc::now()),
        });
    }

    log::info!("Processing {} records", records.len());

    let graph = if config.parallel {
        build_graph_parallel(records)?
    } else {
        build_graph(records)?
    };
    log::debug!("Graph uses ~{} bytes", graph.memory_usage());

    let centrality = compute_centrality(&graph);
    let alert_levels = mean_alert_levels(records);

    let partition = detect_communities(&graph, &config.louvain)?;
    let clusters = summarize_clusters(&partition, &graph, &alert_levels);
    let risk = score_risk(&graph, &centrality, &alert_levels, config.risk_threshold);
    let paths = detect_spread_paths(&graph, &centrality, config.spread_threshold);

    let report = assemble_report(&graph, records, &partition, risk, clusters, paths, config);

    log::info!(
        "Link analysis report generated with {} high-risk locations, {} clusters, {} spread paths",
        report.high_risk_locations.len(),
        report.disaster_clusters.len(),
        report.potential_spread_paths.len()
    );

    Ok(Analysis {
        graph,
        centrality,
        partition,
        report,
    })
}

/// Validate raw records, apply the configured time window, and analyze
pub fn analyze_raw(raw: Vec<RawIncidentRecord>, config: &AnalysisConfig) -> Result<Analysis> {
    config.validate()?;

    let ingested = ingest(raw)?;
    let records = match config.days_back {
        Some(days) => filter_recent(ingested.records, days, Utc::now()),
        None => ingested.records,
    };

    let mut analysis = analyze(&records, config)?;
    analysis.report.skipped_records = ingested.skipped;
    Ok(analysis)
}
