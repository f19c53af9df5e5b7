//! # Gyoukaku - administrative review sheet toolkit
//!
//! Cleans the CSV exports of Japan's administrative project review sheets
//! (行政事業レビューシート) and reconciles them across fiscal years into
//! master and fact tables.
//!
//! ## Modules
//!
//! - **normalize**: Cell text normalization (width folding, era dates, katakana hyphens)
//! - **reconcile**: Layout resolution, ministry mapping, composite ids, wide-to-long facts
//! - **config**: Reference tables (org master, aliases, filename years, katakana rules)
//!
//! ## Quick Start
//!
//! ### Text normalization
//!
//! ```rust
//! use gyoukaku::{ReferenceTables, TextNormalizer};
//!
//! # fn main() -> gyoukaku::Result<()> {
//! let tables = ReferenceTables::builtin()?;
//! let normalizer = TextNormalizer::new(&tables.katakana)?;
//!
//! assert_eq!(normalizer.normalize("平成２９年度"), "2017年度");
//! assert_eq!(normalizer.normalize("ｻ-ﾋﾞｽ"), "サービス");
//! # Ok(())
//! # }
//! ```
//!
//! ### Building masters
//!
//! ```rust,no_run
//! use gyoukaku::reconcile::{BuildOptions, MasterBuilder};
//! use gyoukaku::{ReferenceTables, TextNormalizer};
//! use std::path::Path;
//!
//! # fn main() -> gyoukaku::Result<()> {
//! let tables = ReferenceTables::builtin()?;
//! let normalizer = TextNormalizer::new(&tables.katakana)?;
//! let builder = MasterBuilder::new(&tables, &normalizer, BuildOptions::default());
//!
//! let (masters, report) = builder.build_dir(Path::new("normalized"))?;
//! println!("{} rows, {} failed files", masters.business.len(), report.failures.len());
//! # Ok(())
//! # }
//! ```

use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use std::io::{Read, Write};

pub mod config;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod reconcile;

// Re-export commonly used types for convenience
pub use config::ReferenceTables;
pub use error::{Error, FailureKind, FileFailure, Result};
pub use normalize::TextNormalizer;
pub use reconcile::writer::UTF8_BOM;

/// Normalize every header and data cell of a CSV stream.
///
/// The output is BOM-prefixed with every field quoted. Ragged rows are kept
/// as they are. Returns the number of data rows written.
pub fn normalize_csv<R: Read, W: Write>(
    reader: R,
    mut writer: W,
    normalizer: &TextNormalizer,
) -> Result<usize> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    writer.write_all(UTF8_BOM)?;
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .flexible(true)
        .from_writer(writer);

    let mut rows = 0;
    for (index, record) in rdr.records().enumerate() {
        let record = record?;
        let cells: Vec<String> = record
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let cell = if index == 0 && i == 0 {
                    cell.trim_start_matches('\u{feff}')
                } else {
                    cell
                };
                normalizer.normalize(cell)
            })
            .collect();
        wtr.write_record(&cells)?;
        if index > 0 {
            rows += 1;
        }
    }

    wtr.flush()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> TextNormalizer {
        let tables = ReferenceTables::builtin().unwrap();
        TextNormalizer::new(&tables.katakana).unwrap()
    }

    #[test]
    fn test_normalize_csv_quotes_everything() {
        let input = "\u{feff}事業名,事業開始・終了(予定)年度\nｻ-ﾋﾞｽ推進,平成25年度～平成30年度\n";
        let mut output = Vec::new();
        let rows = normalize_csv(input.as_bytes(), &mut output, &normalizer()).unwrap();

        assert_eq!(rows, 1);
        assert!(output.starts_with(UTF8_BOM));
        let text = String::from_utf8(output[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "\"事業名\",\"事業開始・終了(予定)年度\"");
        assert_eq!(lines[1], "\"サービス推進\",\"2013年度〜2018年度\"");
    }

    #[test]
    fn test_normalize_csv_keeps_ragged_rows() {
        let input = "a,b\n1\n1,2,3\n";
        let mut output = Vec::new();
        let rows = normalize_csv(input.as_bytes(), &mut output, &normalizer()).unwrap();
        assert_eq!(rows, 2);
        let text = String::from_utf8(output[UTF8_BOM.len()..].to_vec()).unwrap();
        assert!(text.contains("\"1\",\"2\",\"3\""));
    }

    #[test]
    fn test_normalize_csv_is_idempotent() {
        let input = "府省庁,事業名\n内閣府,①調査 〜 ②分析\n";
        let n = normalizer();
        let mut once = Vec::new();
        normalize_csv(input.as_bytes(), &mut once, &n).unwrap();
        let mut twice = Vec::new();
        normalize_csv(&once[..], &mut twice, &n).unwrap();
        assert_eq!(once, twice);
    }
}
