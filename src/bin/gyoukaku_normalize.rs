//! gyoukaku-normalize: Normalize the text of review sheet CSVs
//!
//! Usage:
//!   # Normalize every CSV in a directory
//!   gyoukaku-normalize raw/ --output-dir normalized/
//!
//!   # Include subdirectories, with custom reference tables
//!   gyoukaku-normalize raw/ -o normalized/ --recursive --reference tables.toml

use anyhow::{Context, Result};
use clap::Parser;
use gyoukaku::logging::{self, LogFormat};
use gyoukaku::{normalize_csv, ReferenceTables, TextNormalizer};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(name = "gyoukaku-normalize")]
#[command(about = "Normalize the text of review sheet CSVs", long_about = None)]
struct Args {
    /// Directory holding the raw CSV files
    #[arg(value_name = "DIR")]
    input_dir: PathBuf,

    /// Directory for the normalized copies (same file names)
    #[arg(long, short = 'o')]
    output_dir: PathBuf,

    /// Descend into subdirectories, mirroring them under the output directory
    #[arg(long)]
    recursive: bool,

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

    let inputs = collect_csv_files(&args.input_dir, args.recursive)?;
    tracing::info!(files = inputs.len(), input = %args.input_dir.display(), "Normalizing");

    let mut converted = 0;
    let mut failed = 0;
    for input in &inputs {
        let relative = input.strip_prefix(&args.input_dir).unwrap_or(input);
        let output = args.output_dir.join(relative);
        match normalize_file(input, &output, &normalizer) {
            Ok(rows) => {
                converted += 1;
                tracing::debug!(file = %relative.display(), rows, "Normalized");
            }
            Err(e) => {
                failed += 1;
                tracing::error!(file = %relative.display(), "{:#}", e);
            }
        }
    }

    tracing::info!(converted, failed, output = %args.output_dir.display(), "Done");
    if failed > 0 {
        anyhow::bail!("{} of {} files failed", failed, inputs.len());
    }
    Ok(())
}

fn collect_csv_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(dir).min_depth(1);
    let walker = if recursive { walker } else { walker.max_depth(1) };

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn normalize_file(input: &Path, output: &Path, normalizer: &TextNormalizer) -> Result<usize> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let reader = BufReader::new(
        File::open(input).with_context(|| format!("Failed to open: {}", input.display()))?,
    );
    let writer = BufWriter::new(
        File::create(output).with_context(|| format!("Failed to create: {}", output.display()))?,
    );
    let rows = normalize_csv(reader, writer, normalizer)
        .with_context(|| format!("Failed to normalize: {}", input.display()))?;
    Ok(rows)
}
