//! carrier-enrich CLI
//!
//! Enrich a phone-number table with province, city and carrier from a reference file.
//!
//! ## Examples
//!
//! Write the enriched table to stdout:
//!   carrier-enrich -i numbers.csv -r segments.json
//!
//! Keep every original column, four workers, save metrics:
//!   carrier-enrich -i numbers.csv -r segments.csv -o out.csv --layout insert -w 4 --metrics m.json

use anyhow::{bail, Context, Result};
use carrier_enrich::{
    ColumnLayout, CsvReferenceStore, EnrichConfig, JsonReferenceStore, ReferenceStore, Runner,
};
use clap::{Parser, ValueEnum};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "carrier-enrich", version, about, long_about = None)]
struct Cli {
    /// Input table (first line is the header)
    #[arg(short, long)]
    input: PathBuf,

    /// Reference data: `.csv` (key,province,city,isp[,deleted_at]) or `.json`
    #[arg(short, long)]
    reference: PathBuf,

    /// Output path; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of workers (default: number of CPUs)
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    workers: Option<u64>,

    /// Where the province/city/carrier columns go
    #[arg(long, value_enum)]
    layout: Option<LayoutArg>,

    /// Skip data rows whose field count differs from the header's
    #[arg(long)]
    strict_columns: bool,

    /// Run on the calling thread only
    #[arg(long)]
    sequential: bool,

    /// Save batch metrics as JSON
    #[arg(long)]
    metrics: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LayoutArg {
    Replace,
    Insert,
}

impl From<LayoutArg> for ColumnLayout {
    fn from(value: LayoutArg) -> Self {
        match value {
            LayoutArg::Replace => Self::Replace,
            LayoutArg::Insert => Self::Insert,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

fn init_logging(level: LogLevel) -> Result<()> {
    // stderr keeps stdout clean for the output table
    tracing_subscriber::fmt()
        .with_max_level(Level::from(level))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install log subscriber: {e}"))
}

fn open_store(path: &Path) -> Result<Box<dyn ReferenceStore>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let store: Box<dyn ReferenceStore> = match ext.as_deref() {
        Some("csv") => Box::new(CsvReferenceStore::open(path)?),
        Some("json") => Box::new(JsonReferenceStore::open(path)?),
        _ => bail!(
            "cannot tell reference format of {}; use a .csv or .json file",
            path.display()
        ),
    };
    Ok(store)
}

fn build_config(args: &Cli) -> Result<EnrichConfig> {
    let mut cfg = match &args.config {
        Some(path) => EnrichConfig::from_json_file(path)?,
        None => EnrichConfig::default(),
    };
    if let Some(w) = args.workers {
        cfg.workers = Some(usize::try_from(w).context("worker count out of range")?);
    }
    if let Some(layout) = args.layout {
        cfg.layout = layout.into();
    }
    if args.strict_columns {
        cfg.strict_columns = true;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_logging(args.log_level)?;

    let config = build_config(&args)?;
    let runner = if args.sequential {
        Runner::sequential(config)?
    } else {
        Runner::new(config)?
    };

    let input = fs::read(&args.input).with_context(|| format!("read {}", args.input.display()))?;
    let store = open_store(&args.reference)?;
    let snapshot = carrier_enrich::load_snapshot(&store)?;
    let out = runner.run(&input, &snapshot)?;

    match &args.output {
        Some(path) => {
            fs::write(path, &out.bytes).with_context(|| format!("write {}", path.display()))?
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&out.bytes)?;
            stdout.flush()?;
        }
    }
    if let Some(path) = &args.metrics {
        out.report.save_to_file(path)?;
    }

    eprintln!(
        "Enriched {} rows ({} matched, {} skipped) in {} ms",
        out.report.rows_written(),
        out.report.rows_matched,
        out.report.rows_skipped,
        out.report.elapsed_ms
    );
    Ok(())
}
