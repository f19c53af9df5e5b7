//! Reading one normalized review sheet from CSV.

use crate::error::Result;
use crate::normalize::TextNormalizer;
use crate::reconcile::types::{Header, Row, RowOrigin};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

const BOM: char = '\u{feff}';

/// All rows of one sheet, sharing one header.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub file_name: Arc<str>,
    pub header: Arc<Header>,
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn open(path: &Path, normalizer: Option<&TextNormalizer>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_reader(file, &file_name, normalizer)
    }

    /// Read a sheet. Empty cells are null. With a normalizer, header and cell
    /// text are normalized on the way in, and a cell that normalizes to
    /// nothing is null too.
    pub fn from_reader<R: Read>(
        reader: R,
        file_name: &str,
        normalizer: Option<&TextNormalizer>,
    ) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let clean = |text: &str| -> String {
            match normalizer {
                Some(n) => n.normalize(text),
                None => text.to_string(),
            }
        };

        let file_name: Arc<str> = Arc::from(file_name);
        let mut records = rdr.records();

        let header = match records.next() {
            Some(record) => {
                let record = record?;
                Header::new(record.iter().enumerate().map(|(i, name)| {
                    let name = if i == 0 { name.trim_start_matches(BOM) } else { name };
                    clean(name)
                }))
            }
            None => Header::new(Vec::<String>::new()),
        };
        let header = Arc::new(header);

        let mut rows = Vec::new();
        for (index, record) in records.enumerate() {
            let record = record?;
            let cells = record
                .iter()
                .map(|cell| Some(clean(cell)).filter(|cell| !cell.is_empty()))
                .collect();
            let origin = RowOrigin {
                file: Arc::clone(&file_name),
                index,
            };
            rows.push(Row::new(Arc::clone(&header), cells, origin));
        }

        Ok(Sheet {
            file_name,
            header,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KatakanaRules;

    #[test]
    fn test_read_sheet_with_bom_and_ragged_rows() {
        let data = "\u{feff}府省庁,事業名,事業名\n内閣府,調査,\n総務省\n";
        let sheet = Sheet::from_reader(data.as_bytes(), "database2014.csv", None).unwrap();

        assert_eq!(sheet.header.names(), &["府省庁", "事業名", "事業名.1"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].get("事業名"), Some("調査"));
        assert_eq!(sheet.rows[0].column("事業名.1"), Some(None));
        assert_eq!(sheet.rows[1].get("府省庁"), Some("総務省"));
        assert_eq!(sheet.rows[1].origin.index, 1);
    }

    #[test]
    fn test_normalize_on_read() {
        let normalizer = TextNormalizer::new(&KatakanaRules::default()).unwrap();
        let data = "事業名,事業開始・終了(予定)年度\nｻ-ﾋﾞｽ,平成25年度\n";
        let sheet = Sheet::from_reader(data.as_bytes(), "x.csv", Some(&normalizer)).unwrap();
        assert_eq!(sheet.rows[0].get("事業名"), Some("サービス"));
        assert_eq!(sheet.rows[0].get("事業開始・終了(予定)年度"), Some("2013年度"));
    }

    #[test]
    fn test_empty_input() {
        let sheet = Sheet::from_reader("".as_bytes(), "empty.csv", None).unwrap();
        assert!(sheet.header.is_empty());
        assert!(sheet.rows.is_empty());
    }
}
