use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use disaster_link_analyzer::data::loader;
use disaster_link_analyzer::{analyze_raw, storage, viz, AnalysisConfig, Report};

#[derive(Parser, Debug)]
#[clap(
    name = "disaster-link-analyzer",
    about = "Co-occurrence graph analysis of disaster incident records"
)]
struct Cli {
    /// Path to input records (.csv, .parquet, .json, .ndjson)
    #[clap(long)]
    input: PathBuf,

    /// Output directory for results
    #[clap(long, default_value = "analysis_results")]
    output_dir: PathBuf,

    /// JSON file with analysis settings
    #[clap(long)]
    config: Option<PathBuf>,

    /// Only analyze records from the last N days
    #[clap(long, default_value = "7")]
    days_back: u32,

    /// Analyze all records regardless of timestamp
    #[clap(long)]
    all_time: bool,

    /// Minimum risk score for a high-risk location
    #[clap(long)]
    risk_threshold: Option<f64>,

    /// Minimum summed endpoint betweenness for a spread path
    #[clap(long)]
    spread_threshold: Option<f64>,

    /// Number of high-risk locations to report
    #[clap(long)]
    top_risk: Option<usize>,

    /// Number of spread paths to report
    #[clap(long)]
    top_paths: Option<usize>,

    /// Cap on local moving passes per Louvain level
    #[clap(long)]
    max_louvain_passes: Option<usize>,

    /// Build the graph on a single thread
    #[clap(long)]
    sequential: bool,

    /// Skip graph export files
    #[clap(long)]
    skip_export: bool,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, default_value = "0")]
    threads: usize,

    /// Verbose logging
    #[clap(long, short)]
    verbose: bool,
}

impl Cli {
    /// File settings overridden by any flags given
    fn analysis_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path)?,
            None => AnalysisConfig::default(),
        };

        config.days_back = if self.all_time { None } else { Some(self.days_back) };
        if let Some(v) = self.risk_threshold {
            config.risk_threshold = v;
        }
        if let Some(v) = self.spread_threshold {
            config.spread_threshold = v;
        }
        if let Some(v) = self.top_risk {
            config.top_risk_locations = v;
        }
        if let Some(v) = self.top_paths {
            config.top_spread_paths = v;
        }
        if let Some(v) = self.max_louvain_passes {
            config.louvain.max_passes = v;
        }
        if self.sequential {
            config.parallel = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn print_summary(report: &Report) {
    println!("{}", "=".repeat(50));
    println!("DISASTER LINK ANALYSIS SUMMARY:");
    println!("{}", "=".repeat(50));
    println!("Analysis completed at: {}", report.generated_at);
    println!(
        "Analyzed {} locations and {} disaster types ({} records, {} skipped)",
        report.locations_analyzed,
        report.disaster_types_analyzed.len(),
        report.records_analyzed,
        report.skipped_records
    );

    if report.high_risk_locations.is_empty() {
        println!("\nNo high-risk locations identified");
    } else {
        println!("\nTop High-Risk Locations:");
        for entry in &report.high_risk_locations {
            println!(
                "- {}: Risk Score {:.2}, Alert Level {:.1}",
                entry.location, entry.risk_score, entry.alert_level
            );
        }
    }

    println!("\nIdentified {} disaster clusters", report.disaster_clusters.len());
    println!(
        "Found {} potential spread paths between locations",
        report.potential_spread_paths.len()
    );
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Configure logging
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    // Set number of threads
    let num_threads = if args.threads > 0 {
        args.threads
    } else {
        // If threads = 0, use all available cores
        num_cpus::get()
    };

    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    let config = args.analysis_config()?;

    log::info!("Starting disaster link analysis");
    log::info!("Input: {}", args.input.display());
    log::info!("Output: {}", args.output_dir.display());

    // 1. Load records
    let raw = loader::load_records(&args.input)?;

    // 2. Build graph and analyze
    let analysis = analyze_raw(raw, &config)?;

    // 3. Save results
    storage::save_results(&analysis, &args.output_dir)?;

    // 4. Export network data for external rendering
    if !args.skip_export {
        viz::export_graph(&analysis, &args.output_dir)?;
    }

    print_summary(&analysis.report);

    log::info!("Analysis complete. Results saved to {}", args.output_dir.display());

    Ok(())
}
