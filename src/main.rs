use anyhow::{bail, Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tracklist_reconcile::progress::{create_progress_bar, create_spinner, format_duration, log_progress};
use tracklist_reconcile::safety::{reconciled_file_name, validate_output_path};
use tracklist_reconcile::{reconcile_request, ImportRequest, ReconcileConfig, ReconcileOutput, ReconcileStats};

#[derive(Parser)]
#[command(name = "tracklist-reconcile")]
#[command(about = "Reconcile extracted track mentions into a canonical tracklist")]
struct Args {
    /// Import JSON file, or a directory of them
    input: PathBuf,

    /// Output file (single import) or directory (batch); name must contain "reconciled"
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file overriding default thresholds
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write run statistics to this JSON file
    #[arg(long)]
    stats: Option<PathBuf>,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Hide progress bars, log progress lines instead
    #[arg(long)]
    log_only: bool,
}

const OUTPUT_PATTERN: &str = "reconciled";
const LOG_INTERVAL: u64 = 100;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_request(path: &Path) -> Result<ImportRequest> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse import {}", path.display()))
}

fn write_output(path: &Path, output: &ReconcileOutput) -> Result<()> {
    let json = serde_json::to_string_pretty(output)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

fn reconcile_file(input: &Path, output: &Path, config: &ReconcileConfig) -> Result<ReconcileStats> {
    let request = load_request(input)?;
    let (result, stats) = reconcile_request(request, config);
    write_output(output, &result)?;
    Ok(stats)
}

fn run_single(args: &Args, config: &ReconcileConfig) -> Result<ReconcileStats> {
    let request = load_request(&args.input)?;
    let (result, stats) = reconcile_request(request, config);

    match &args.output {
        Some(path) => {
            validate_output_path(path, OUTPUT_PATTERN, &[args.input.as_path()])?;
            write_output(path, &result)?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    Ok(stats)
}

fn list_imports(dir: &Path, log_only: bool) -> Result<Vec<PathBuf>> {
    let spinner = create_spinner("Scanning imports", log_only);
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if path.is_file() && is_json && !name.contains(OUTPUT_PATTERN) {
            files.push(path);
        }
    }
    files.sort();
    spinner.finish_with_message(format!("Found {} imports", files.len()));
    Ok(files)
}

fn default_batch_dir(input: &Path) -> PathBuf {
    let name = input.file_name().and_then(|n| n.to_str()).unwrap_or("imports");
    input.with_file_name(format!("{}-{}", name, OUTPUT_PATTERN))
}

fn run_batch(args: &Args, config: &ReconcileConfig) -> Result<ReconcileStats> {
    let out_dir = args.output.clone().unwrap_or_else(|| default_batch_dir(&args.input));
    validate_output_path(&out_dir, OUTPUT_PATTERN, &[args.input.as_path()])?;
    std::fs::create_dir_all(&out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let files = list_imports(&args.input, args.log_only)?;
    let total = files.len() as u64;
    let pb = create_progress_bar(total, "Reconciling", args.log_only);
    let done = AtomicU64::new(0);

    let results: Vec<(PathBuf, Result<ReconcileStats>)> = files
        .into_par_iter()
        .map(|input| {
            let output = out_dir.join(reconciled_file_name(&input));
            let result = reconcile_file(&input, &output, config);
            pb.inc(1);
            let current = done.fetch_add(1, Ordering::Relaxed) + 1;
            log_progress("Reconciling", current, total, LOG_INTERVAL, args.log_only);
            (input, result)
        })
        .collect();

    let mut totals = ReconcileStats::default();
    let mut failed = 0;
    for (input, result) in &results {
        match result {
            Ok(stats) => totals.absorb(stats),
            Err(err) => {
                failed += 1;
                tracing::warn!("Skipped {}: {:#}", input.display(), err);
            }
        }
    }
    pb.finish_with_message(format!("Reconciled {} imports", results.len() - failed));

    if failed > 0 && failed == results.len() {
        bail!("All {} imports failed", failed);
    }
    Ok(totals)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let config = match &args.config {
        Some(path) => ReconcileConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ReconcileConfig::default(),
    };

    let start = Instant::now();
    let stats = if args.input.is_dir() {
        run_batch(&args, &config)?
    } else {
        run_single(&args, &config)?
    };

    stats.log_phase("reconcile");
    if let Some(path) = &args.stats {
        stats
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats {}", path.display()))?;
    }

    tracing::info!(
        "Done in {}: {} tracks, {} conflicts ({:.1}% of segments), {} gaps",
        format_duration(start.elapsed()),
        stats.final_tracks,
        stats.conflicts,
        stats.conflict_rate(),
        stats.gaps
    );
    Ok(())
}
