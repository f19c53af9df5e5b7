//! Composite record ids and per-file bulk row ids.
//!
//! The composite id follows one program across yearly sheets; the bulk id
//! only numbers rows inside one file. They answer different questions and
//! are kept as different types.

use crate::reconcile::layout::{IdRule, LayoutVersion};
use crate::reconcile::types::{BulkRowId, CompositeRecordId, Row};

/// Org code used when the ministry name did not resolve.
pub const UNRESOLVED_ORG: &str = "XXXX";

const NO_BRANCH: &str = "0000";

/// Build the composite id of a row. Total: missing columns read as empty
/// codes and an unresolved org becomes [`UNRESOLVED_ORG`].
pub fn build_id(row: &Row, layout: &LayoutVersion, org_id: Option<u32>) -> CompositeRecordId {
    let org = match org_id {
        Some(id) => format!("{:04}", id),
        None => UNRESOLVED_ORG.to_string(),
    };

    let id = match &layout.id_rule {
        IdRule::SingleCode { code } => {
            format!("{}-{}-{}-{}", layout.year, org, zfill(&code_text(row, code), 4), NO_BRANCH)
        }
        IdRule::SplitCode { primary, branch } => format!(
            "{}-{}-{}-{}",
            layout.year,
            org,
            zfill(&code_text(row, primary), 4),
            branch_code(row, branch)
        ),
        IdRule::Structured {
            year,
            sub_codes,
            branch,
        } => {
            let effective_year = code_text(row, year)
                .parse::<i32>()
                .unwrap_or(layout.year);
            let primary = format!(
                "{}{}",
                zfill(&code_text(row, &sub_codes[0]), 2),
                zfill(&code_text(row, &sub_codes[1]), 2)
            );
            format!(
                "{}-{}-{}-{}",
                effective_year,
                org,
                zfill(&primary, 4),
                branch_code(row, branch)
            )
        }
    };

    CompositeRecordId(id)
}

/// Sequential id of the `row_index`-th (0-based) data row of a file.
pub fn bulk_id(file_year: i32, row_index: usize) -> BulkRowId {
    BulkRowId(format!("{}-{:05}", file_year, row_index + 1))
}

fn branch_code(row: &Row, column: &str) -> String {
    match row.get(column) {
        Some(_) => zfill(&code_text(row, column), 4),
        None => NO_BRANCH.to_string(),
    }
}

/// Text of a code cell. Spreadsheet exports write integer codes as floats
/// (`12.0`); those read back as `12`. Absent or null cells are empty.
pub fn code_text(row: &Row, column: &str) -> String {
    let Some(raw) = row.get(column) else {
        return String::new();
    };
    let raw = raw.trim();
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 && raw.contains('.') => {
            format!("{}", v as i64)
        }
        _ => raw.to_string(),
    }
}

/// Left-pad with zeros to `width` characters; longer text is kept whole.
pub fn zfill(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    format!("{}{}", "0".repeat(width - len), text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(year: i32) -> LayoutVersion {
        LayoutVersion::for_year(year).unwrap()
    }

    #[test]
    fn test_2014_ids_have_no_branch() {
        let row = Row::from_pairs(&[("事業番号", Some("12")), ("事業番号-3", Some("7"))]);
        let id = build_id(&row, &layout(2014), Some(3));
        assert_eq!(id.0, "2014-0003-0012-0000");
        assert!(id.0.ends_with("-0000"));
    }

    #[test]
    fn test_split_code_years() {
        let row = Row::from_pairs(&[
            ("事業番号-1", Some("内閣府")),
            ("事業番号-2", Some("45.0")),
            ("事業番号-3", Some("2")),
        ]);
        assert_eq!(build_id(&row, &layout(2017), Some(2)).0, "2017-0002-0045-0002");

        let no_branch = Row::from_pairs(&[("事業番号-2", Some("45")), ("事業番号-3", None)]);
        assert_eq!(build_id(&no_branch, &layout(2015), Some(2)).0, "2015-0002-0045-0000");
    }

    #[test]
    fn test_structured_ids_use_effective_year() {
        let row = Row::from_pairs(&[
            ("事業番号-1", Some("2020")),
            ("事業番号-2", Some("1")),
            ("事業番号-3", Some("23")),
            ("事業番号-4", Some("5")),
            ("事業番号-5", Some("1")),
        ]);
        assert_eq!(build_id(&row, &layout(2021), Some(11)).0, "2020-0011-0123-0001");
    }

    #[test]
    fn test_structured_falls_back_to_file_year() {
        let row = Row::from_pairs(&[("事業番号-2", Some("4"))]);
        assert_eq!(build_id(&row, &layout(2022), Some(1)).0, "2022-0001-0400-0000");
    }

    #[test]
    fn test_unresolved_org_uses_sentinel() {
        let row = Row::from_pairs(&[("事業番号", Some("9"))]);
        let id = build_id(&row, &layout(2014), None);
        assert_eq!(id.0, "2014-XXXX-0009-0000");
    }

    #[test]
    fn test_missing_columns_pad_to_zeros() {
        let row = Row::from_pairs(&[]);
        assert_eq!(build_id(&row, &layout(2016), None).0, "2016-XXXX-0000-0000");
    }

    #[test]
    fn test_build_id_is_pure() {
        let row = Row::from_pairs(&[("事業番号-2", Some("8")), ("事業番号-3", Some("1"))]);
        let layout = layout(2018);
        assert_eq!(build_id(&row, &layout, Some(4)), build_id(&row, &layout, Some(4)));
    }

    #[test]
    fn test_bulk_ids() {
        assert_eq!(bulk_id(2016, 0).0, "2016-00001");
        assert_eq!(bulk_id(2023, 12344).0, "2023-12345");
    }

    #[test]
    fn test_code_text_and_zfill() {
        let row = Row::from_pairs(&[("a", Some("12.0")), ("b", Some("A-3")), ("c", Some("007"))]);
        assert_eq!(code_text(&row, "a"), "12");
        assert_eq!(code_text(&row, "b"), "A-3");
        assert_eq!(code_text(&row, "c"), "007");
        assert_eq!(code_text(&row, "missing"), "");
        assert_eq!(zfill("12345", 4), "12345");
        assert_eq!(zfill("", 2), "00");
    }
}
