//! CLI: look up stations, download their measurement reports and export antenna azimuths

use anyhow::{Context, Result};
use azimuth_inspector::{
    ExtractedRecord, HttpClient, PipelineConfig, ResultSink, StationId, StationPipeline,
};
use clap::Parser;
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "azimuths")]
#[command(about = "Extract antenna azimuths from base-station measurement reports")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Base-station identifiers to process
    #[arg(value_name = "STATION_ID", required = true)]
    station_ids: Vec<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV output file (overrides the configuration)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for downloaded PDFs (overrides the configuration)
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Maximum number of simultaneous downloads
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn load_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(dir) = &self.download_dir {
            config.download_dir = dir.clone();
        }
        if let Some(n) = self.concurrency {
            config.max_concurrent_downloads = n;
        }
        if let Some(secs) = self.timeout {
            config.request_timeout_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }
}

fn print_record(record: &ExtractedRecord) {
    println!();
    println!("Station ID: {}", record.station_id);
    println!("PDF File: {}", record.pdf_file);
    println!("Azymuts:");
    match record.azimuths() {
        Some(azimuths) => {
            for az in azimuths {
                println!("  - {}", az);
            }
        }
        None => println!("  {}", record.azimuth_column()),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let ids = args
        .station_ids
        .iter()
        .map(StationId::new)
        .collect::<Result<Vec<_>, _>>()
        .context("invalid station identifier")?;

    let config = args.load_config()?;
    let http = HttpClient::new(&config)?;
    let sink = ResultSink::new(config.output_path.clone());
    let pipeline = StationPipeline::new(http, config)?;

    let mut records = Vec::new();
    let mut failed = 0;
    for (id, outcome) in pipeline.run_batch(&ids) {
        match outcome {
            Ok(set) => {
                if set.is_empty() {
                    println!("\nStation {}: no reports found", id);
                }
                records.extend(set.records);
            }
            Err(e) => {
                eprintln!("\nStation {}: {}", id, e);
                failed += 1;
            }
        }
    }

    for record in &records {
        print_record(record);
    }

    sink.export(&records)
        .with_context(|| format!("failed to write {}", sink.path().display()))?;
    if !records.is_empty() {
        println!("\nResults saved to {}", sink.path().display());
    }

    if failed == ids.len() {
        process::exit(1);
    }
    Ok(())
}
