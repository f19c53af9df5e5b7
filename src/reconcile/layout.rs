//! Year-dependent sheet layouts and how a file name selects one.
//!
//! Sheets changed shape over the years. Each [`LayoutVersion`] carries, as
//! data, the id-assembly rule and the wide-column naming templates for its
//! year range, so nothing downstream branches on the year again.

use crate::config::FilenameYear;

/// How a composite record id is assembled from the code columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdRule {
    /// 2014: one code column and no branch
    SingleCode { code: String },
    /// 2015 to 2020: primary and branch taken from parts of a split code
    SplitCode { primary: String, branch: String },
    /// 2021 onwards: the sheet carries its own effective year, and the
    /// primary code is two 2-digit sub-codes side by side
    Structured {
        year: String,
        sub_codes: [String; 2],
        branch: String,
    },
}

/// Column naming of the expense family:
/// `{base}{block}.{label}` for line 0 and `{base}{block}.{label}.{line}` after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseTemplate {
    pub base: String,
    pub category_label: String,
    pub purpose_label: String,
    pub amount_label: String,
    pub blocks: Vec<char>,
    pub max_lines: usize,
}

impl ExpenseTemplate {
    pub fn column(&self, block: char, label: &str, line: usize) -> String {
        if line == 0 {
            format!("{}{}.{}", self.base, block, label)
        } else {
            format!("{}{}.{}.{}", self.base, block, label, line)
        }
    }
}

/// Naming templates for the wide column families.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideTemplates {
    /// Budget columns start with this and embed `-{yy|yyyy}年度`
    pub budget_prefix: String,
    pub expense: ExpenseTemplate,
}

impl Default for WideTemplates {
    fn default() -> Self {
        WideTemplates {
            budget_prefix: "予算額".to_string(),
            expense: ExpenseTemplate {
                base: "費目・使途(「資金の流れ」においてブロックごとに最大の金額が支出されている者について記載する。費目と使途の双方で実情が分かるように記載)-".to_string(),
                category_label: "支払先費目".to_string(),
                purpose_label: "支払先使途".to_string(),
                amount_label: "支払先金額(百万円)".to_string(),
                blocks: ('A'..='Z').collect(),
                max_lines: 10,
            },
        }
    }
}

/// The layout of one source file. Derived once per file, read-only after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutVersion {
    pub year: i32,
    pub id_rule: IdRule,
    pub wide: WideTemplates,
}

impl LayoutVersion {
    /// The layout in force for a fiscal year, if any.
    pub fn for_year(year: i32) -> Option<Self> {
        let id_rule = match year {
            2014 => IdRule::SingleCode {
                code: "事業番号".to_string(),
            },
            2015..=2020 => IdRule::SplitCode {
                primary: "事業番号-2".to_string(),
                branch: "事業番号-3".to_string(),
            },
            y if y >= 2021 => IdRule::Structured {
                year: "事業番号-1".to_string(),
                sub_codes: ["事業番号-2".to_string(), "事業番号-3".to_string()],
                branch: "事業番号-5".to_string(),
            },
            _ => return None,
        };

        Some(LayoutVersion {
            year,
            id_rule,
            wide: WideTemplates::default(),
        })
    }
}

/// Maps file names to layouts through an ordered token table.
#[derive(Debug, Clone, Copy)]
pub struct SchemaYearResolver<'a> {
    table: &'a [FilenameYear],
}

impl<'a> SchemaYearResolver<'a> {
    pub fn new(table: &'a [FilenameYear]) -> Self {
        SchemaYearResolver { table }
    }

    /// Year of the first table token contained in `file_name`.
    pub fn year_of(&self, file_name: &str) -> Option<i32> {
        self.table
            .iter()
            .find(|entry| file_name.contains(entry.token.as_str()))
            .map(|entry| entry.year)
    }

    /// `None` when no token matches or the year has no layout; the caller
    /// skips the file and reports it.
    pub fn resolve(&self, file_name: &str) -> Option<LayoutVersion> {
        self.year_of(file_name).and_then(LayoutVersion::for_year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReferenceTables;

    fn entry(token: &str, year: i32) -> FilenameYear {
        FilenameYear {
            token: token.to_string(),
            year,
        }
    }

    #[test]
    fn test_builtin_table_resolves_each_year() {
        let tables = ReferenceTables::builtin().unwrap();
        let resolver = SchemaYearResolver::new(&tables.filename_years);

        assert_eq!(resolver.year_of("database2014_Sheet1.csv"), Some(2014));
        assert_eq!(resolver.year_of("database2019_220427_レビューシート.csv"), Some(2019));
        assert_eq!(resolver.year_of("database_220427_レビューシート.csv"), Some(2020));
        assert_eq!(resolver.year_of("database240918_データベース.csv"), Some(2023));
        assert_eq!(resolver.resolve("readme.csv"), None);
    }

    #[test]
    fn test_first_match_wins() {
        let table = vec![entry("db2019_x", 2019), entry("db2019", 2000)];
        let resolver = SchemaYearResolver::new(&table);
        assert_eq!(resolver.year_of("db2019_x.csv"), Some(2019));
        assert_eq!(resolver.year_of("db2019.csv"), Some(2000));
    }

    #[test]
    fn test_layout_variants_by_year() {
        assert!(matches!(
            LayoutVersion::for_year(2014).unwrap().id_rule,
            IdRule::SingleCode { .. }
        ));
        assert!(matches!(
            LayoutVersion::for_year(2020).unwrap().id_rule,
            IdRule::SplitCode { .. }
        ));
        assert!(matches!(
            LayoutVersion::for_year(2023).unwrap().id_rule,
            IdRule::Structured { .. }
        ));
        assert_eq!(LayoutVersion::for_year(2013), None);
    }

    #[test]
    fn test_year_without_layout_is_unresolved() {
        let table = vec![entry("database2012", 2012)];
        let resolver = SchemaYearResolver::new(&table);
        assert_eq!(resolver.year_of("database2012.csv"), Some(2012));
        assert_eq!(resolver.resolve("database2012.csv"), None);
    }

    #[test]
    fn test_expense_column_names() {
        let template = WideTemplates::default().expense;
        assert!(template.column('A', "支払先費目", 0).ends_with("-A.支払先費目"));
        assert!(template.column('C', "支払先使途", 3).ends_with("-C.支払先使途.3"));
    }
}
