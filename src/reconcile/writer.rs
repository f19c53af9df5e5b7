use crate::error::{Error, Result};
use crate::reconcile::master::RunReport;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// UTF-8 byte order mark; spreadsheet tools need it to detect the encoding.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One BOM-prefixed CSV per table
    #[default]
    Csv,
    /// One JSON object per line, one file per table
    Jsonl,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Jsonl => "jsonl",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "jsonl" | "json" => Ok(Self::Jsonl),
            other => Err(Error::Config(format!("unknown output format: {}", other))),
        }
    }
}

/// Writes each output table to its own file in a directory.
pub struct TableWriter {
    dir: PathBuf,
    format: OutputFormat,
}

impl TableWriter {
    pub fn new<P: AsRef<Path>>(dir: P, format: OutputFormat) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(TableWriter {
            dir: dir.as_ref().to_path_buf(),
            format,
        })
    }

    /// Write `rows` to `{dir}/{name}.{ext}`, replacing any previous file.
    pub fn write_table<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<PathBuf> {
        let path = self.dir.join(format!("{}.{}", name, self.format.extension()));
        let file = BufWriter::new(File::create(&path)?);
        match self.format {
            OutputFormat::Csv => write_csv(file, rows)?,
            OutputFormat::Jsonl => write_jsonl(file, rows)?,
        }
        tracing::debug!(table = name, rows = rows.len(), path = %path.display(), "Wrote table");
        Ok(path)
    }

    pub fn write_report(&self, report: &RunReport) -> Result<PathBuf> {
        let path = self.dir.join("run_report.json");
        let mut file = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut file, report)?;
        writeln!(file)?;
        file.flush()?;
        Ok(path)
    }
}

/// Header and rows as CSV behind a BOM. With no rows only the BOM is
/// written, since the header comes from the first serialized record.
pub fn write_csv<W: Write, T: Serialize>(mut writer: W, rows: &[T]) -> Result<()> {
    writer.write_all(UTF8_BOM)?;
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_jsonl<W: Write, T: Serialize>(mut writer: W, rows: &[T]) -> Result<()> {
    for row in rows {
        let json = serde_json::to_string(row)?;
        writeln!(writer, "{}", json)?;
    }
    writer.flush()?;
    Ok(())
}
