//! gyoukaku-build: Reconcile normalized review sheets into master tables
//!
//! Usage:
//!   # Build every table from a directory of normalized sheets
//!   gyoukaku-build normalized/ --output-dir masters/
//!
//!   # Follow one program across years, as JSON lines
//!   gyoukaku-build normalized/ -o trace/ --program "IT推進経費" --format jsonl
//!
//!   # Sheets that were never normalized
//!   gyoukaku-build raw/ -o masters/ --raw

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use gyoukaku::logging::{self, LogFormat};
use gyoukaku::reconcile::{BuildOptions, MasterBuilder, OutputFormat, TableWriter};
use gyoukaku::{FailureKind, ReferenceTables, TextNormalizer};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gyoukaku-build")]
#[command(about = "Reconcile normalized review sheets into master tables", long_about = None)]
struct Args {
    /// Directory holding the normalized sheets
    #[arg(value_name = "DIR")]
    input_dir: PathBuf,

    /// Directory for the output tables
    #[arg(long, short = 'o')]
    output_dir: PathBuf,

    /// Keep only the first row per file whose 事業名 equals this
    #[arg(long)]
    program: Option<String>,

    /// Output format: csv or jsonl
    #[arg(long, default_value = "csv")]
    format: OutputFormat,

    /// Normalize cell text while reading (input was not normalized beforehand)
    #[arg(long)]
    raw: bool,

    /// Reference tables (TOML) replacing the built-in ones
    #[arg(long, value_name = "FILE")]
    reference: Option<PathBuf>,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format: text or json
    #[arg(long, default_value = "text")]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose, args.log_format);

    let tables = match &args.reference {
        Some(path) => ReferenceTables::from_file(path)
            .with_context(|| format!("Failed to load reference tables: {}", path.display()))?,
        None => ReferenceTables::builtin().context("Built-in reference tables are invalid")?,
    };
    let normalizer = TextNormalizer::new(&tables.katakana)?;

    let options = BuildOptions {
        program: args.program,
        normalize_on_read: args.raw,
    };
    let builder = MasterBuilder::new(&tables, &normalizer, options);

    let (masters, report) = builder
        .build_dir(&args.input_dir)
        .with_context(|| format!("Failed to read {}", args.input_dir.display()))?;

    let writer = TableWriter::new(&args.output_dir, args.format)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;
    writer.write_table("ministry_master", &builder.ministry_master())?;
    writer.write_table("business_master", &masters.business)?;
    writer.write_table("budget_execution", &masters.budget)?;
    writer.write_table("expense_details", &masters.expense)?;
    writer.write_report(&report)?;

    tracing::info!(
        files = report.processed.len(),
        rows = masters.business.len(),
        budget_facts = masters.budget.len(),
        expense_facts = masters.expense.len(),
        not_selected = report.not_selected.len(),
        unrecognized = report.failures_of(FailureKind::UnrecognizedLayout).count(),
        malformed = report.failures_of(FailureKind::MalformedSource).count(),
        missing_column = report.failures_of(FailureKind::MissingColumn).count(),
        output = %args.output_dir.display(),
        "Done"
    );
    Ok(())
}
