use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Column names of one sheet, with repeated names made unique.
///
/// A name that appears again is suffixed `.1`, `.2`, ... in order of
/// appearance and a blank name becomes `Unnamed: {position}`, the same
/// convention spreadsheet exports use for duplicated headers. The expense
/// family depends on it: its per-line columns share one label.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Header {
    pub fn new<I, S>(raw_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        let mut index = HashMap::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (position, raw) in raw_names.into_iter().enumerate() {
            let raw: String = raw.into();
            let base = if raw.is_empty() {
                format!("Unnamed: {}", position)
            } else {
                raw
            };

            let mut name = base.clone();
            if let Some(count) = seen.get_mut(&base) {
                let mut k = *count;
                loop {
                    name = format!("{}.{}", base, k);
                    k += 1;
                    if !index.contains_key(&name) {
                        break;
                    }
                }
                *count = k;
            } else {
                seen.insert(base, 1);
            }

            index.insert(name.clone(), names.len());
            names.push(name);
        }

        Header { names, index }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Where a row came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowOrigin {
    pub file: Arc<str>,
    /// 0-based data row index (header excluded)
    pub index: usize,
}

/// One data row: a mapping from column name to a nullable cell.
#[derive(Debug, Clone)]
pub struct Row {
    header: Arc<Header>,
    cells: Vec<Option<String>>,
    pub origin: RowOrigin,
}

impl Row {
    /// Cells beyond the header are dropped, missing trailing cells are null.
    pub fn new(header: Arc<Header>, mut cells: Vec<Option<String>>, origin: RowOrigin) -> Self {
        cells.resize(header.len(), None);
        Row {
            header,
            cells,
            origin,
        }
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs(pairs: &[(&str, Option<&str>)]) -> Self {
        let header = Arc::new(Header::new(pairs.iter().map(|(name, _)| *name)));
        let cells = pairs.iter().map(|(_, v)| v.map(str::to_string)).collect();
        Row::new(
            header,
            cells,
            RowOrigin {
                file: Arc::from(""),
                index: 0,
            },
        )
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// `None` when the column is absent, `Some(None)` when the cell is null.
    pub fn column(&self, name: &str) -> Option<Option<&str>> {
        self.header
            .position(name)
            .map(|i| self.cells[i].as_deref())
    }

    /// Non-null value of a column, absent and null alike give `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.column(name).flatten()
    }

    /// Columns in sheet order with their cells.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.header
            .names()
            .iter()
            .zip(self.cells.iter())
            .map(|(name, cell)| (name.as_str(), cell.as_deref()))
    }
}

/// Synthetic key linking one program across yearly sheets:
/// `{year}-{orgCode}-{primaryCode}-{branchCode}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositeRecordId(pub String);

impl fmt::Display for CompositeRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-file sequential row key `{fileYear}-{row:05}`. Only meaningful inside
/// one file's output; never a substitute for [`CompositeRecordId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BulkRowId(pub String);

impl fmt::Display for BulkRowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The repeating dimension a wide column encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxisKey {
    /// Fiscal year of a budget column
    Year(i32),
    /// Payment block letter and 1-based line number of an expense column
    Block { block: char, sequence: u32 },
}

/// One long-format fact taken from a wide column group.
#[derive(Debug, Clone, PartialEq)]
pub struct WideFact {
    pub record_id: CompositeRecordId,
    pub axis: AxisKey,
    /// Budget item, or expense category
    pub item_label: String,
    /// Budget amount, or expense amount
    pub value: Option<String>,
    /// Expense purpose; always `None` for budget facts
    pub purpose: Option<String>,
}

/// `budget_execution` table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetRecord {
    pub business_id: String,
    #[serde(rename = "年度")]
    pub year: i32,
    #[serde(rename = "予算項目")]
    pub item: String,
    #[serde(rename = "金額")]
    pub amount: Option<String>,
}

/// `expense_details` table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseRecord {
    pub business_id: String,
    #[serde(rename = "支払ブロックID")]
    pub block: String,
    #[serde(rename = "明細連番")]
    pub sequence: u32,
    #[serde(rename = "費目")]
    pub category: String,
    #[serde(rename = "使途")]
    pub purpose: Option<String>,
    #[serde(rename = "金額")]
    pub amount: Option<String>,
}

impl WideFact {
    pub fn budget_record(&self) -> Option<BudgetRecord> {
        match self.axis {
            AxisKey::Year(year) => Some(BudgetRecord {
                business_id: self.record_id.0.clone(),
                year,
                item: self.item_label.clone(),
                amount: self.value.clone(),
            }),
            AxisKey::Block { .. } => None,
        }
    }

    pub fn expense_record(&self) -> Option<ExpenseRecord> {
        match self.axis {
            AxisKey::Block { block, sequence } => Some(ExpenseRecord {
                business_id: self.record_id.0.clone(),
                block: block.to_string(),
                sequence,
                category: self.item_label.clone(),
                purpose: self.purpose.clone(),
                amount: self.value.clone(),
            }),
            AxisKey::Year(_) => None,
        }
    }
}

/// `business_master` table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MasterRecord {
    pub id: BulkRowId,
    pub business_id: CompositeRecordId,
    pub file_year: i32,
    pub ministry_id: Option<u32>,
    #[serde(rename = "府省庁")]
    pub ministry_name: Option<String>,
    #[serde(rename = "事業番号")]
    pub code: Option<String>,
    #[serde(rename = "事業番号-1")]
    pub code_1: Option<String>,
    #[serde(rename = "事業番号-2")]
    pub code_2: Option<String>,
    #[serde(rename = "事業番号-3")]
    pub code_3: Option<String>,
    #[serde(rename = "事業番号-4")]
    pub code_4: Option<String>,
    #[serde(rename = "事業番号-5")]
    pub code_5: Option<String>,
    #[serde(rename = "事業名")]
    pub name: Option<String>,
    #[serde(rename = "事業開始年度")]
    pub start_year: Option<String>,
    #[serde(rename = "事業終了(予定)年度")]
    pub end_year: Option<String>,
}

/// `ministry_master` table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinistryRecord {
    pub ministry_id: u32,
    pub ministry_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_headers_get_suffixes() {
        let header = Header::new(["a", "b", "a", "a", ""]);
        assert_eq!(header.names(), &["a", "b", "a.1", "a.2", "Unnamed: 4"]);
        assert_eq!(header.position("a.2"), Some(3));
    }

    #[test]
    fn test_suffix_skips_existing_name() {
        let header = Header::new(["a", "a.1", "a"]);
        assert_eq!(header.names(), &["a", "a.1", "a.2"]);
    }

    #[test]
    fn test_absent_versus_null_column() {
        let row = Row::from_pairs(&[("事業名", Some("調査")), ("府省庁", None)]);
        assert_eq!(row.column("事業名"), Some(Some("調査")));
        assert_eq!(row.column("府省庁"), Some(None));
        assert_eq!(row.column("事業番号"), None);
        assert_eq!(row.get("府省庁"), None);
    }

    #[test]
    fn test_ragged_row_is_padded() {
        let header = Arc::new(Header::new(["a", "b", "c"]));
        let origin = RowOrigin {
            file: Arc::from("x.csv"),
            index: 0,
        };
        let row = Row::new(header, vec![Some("1".into())], origin);
        assert_eq!(row.column("c"), Some(None));
        assert_eq!(row.iter().count(), 3);
    }

    #[test]
    fn test_fact_records_by_axis() {
        let fact = WideFact {
            record_id: CompositeRecordId("2014-0003-0012-0000".into()),
            axis: AxisKey::Block {
                block: 'B',
                sequence: 2,
            },
            item_label: "委託費".into(),
            value: Some("12".into()),
            purpose: Some("調査".into()),
        };
        assert!(fact.budget_record().is_none());
        let record = fact.expense_record().unwrap();
        assert_eq!(record.block, "B");
        assert_eq!(record.sequence, 2);
        assert_eq!(record.purpose.as_deref(), Some("調査"));
    }
}
