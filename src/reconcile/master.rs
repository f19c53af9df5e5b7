//! Builds master and fact tables from a directory of normalized sheets.
//!
//! Per file: select by name, resolve the layout, read the sheet, then per row
//! reconcile the ministry, assemble the composite id, and expand the wide
//! column families into facts keyed by that id. A file that cannot be used is
//! recorded in the [`RunReport`] and the run moves on.

use crate::config::ReferenceTables;
use crate::error::{FailureKind, FileFailure, Result};
use crate::normalize::text::RANGE_SEPARATOR;
use crate::normalize::TextNormalizer;
use crate::reconcile::identity::{build_id, bulk_id, code_text};
use crate::reconcile::layout::{LayoutVersion, SchemaYearResolver};
use crate::reconcile::org::NameReconciler;
use crate::reconcile::sheet::Sheet;
use crate::reconcile::types::{
    BudgetRecord, ExpenseRecord, MasterRecord, MinistryRecord, Row, WideFact,
};
use crate::reconcile::wide::WideColumnPatternExtractor;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const ORG_COLUMN: &str = "府省庁";
/// Older sheets name the ministry column this way.
pub const ORG_COLUMN_LEGACY: &str = "府省";
pub const NAME_COLUMN: &str = "事業名";
pub const PERIOD_COLUMN: &str = "事業開始・終了(予定)年度";
pub const NO_END_YEAR: &str = "終了(予定)なし";

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Keep only the first row per file whose 事業名 equals this
    pub program: Option<String>,

    /// Normalize header and cells while reading (for raw, unnormalized CSVs)
    pub normalize_on_read: bool,
}

/// Rows and facts contributed by one file.
#[derive(Debug, Clone, Default)]
pub struct FileOutput {
    pub masters: Vec<MasterRecord>,
    pub facts: Vec<WideFact>,
}

/// What happened to one input file.
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Built { year: i32, output: FileOutput },
    NotSelected,
    Failed(FileFailure),
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub file: String,
    pub year: i32,
    pub rows: usize,
    pub budget_facts: usize,
    pub expense_facts: usize,
}

/// End-of-run account of every file considered.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub processed: Vec<FileSummary>,
    pub not_selected: Vec<String>,
    pub failures: Vec<FileFailure>,
}

impl RunReport {
    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &FileFailure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }
}

/// The merged output tables.
#[derive(Debug, Clone, Default)]
pub struct MasterTables {
    pub business: Vec<MasterRecord>,
    pub budget: Vec<BudgetRecord>,
    pub expense: Vec<ExpenseRecord>,
}

impl MasterTables {
    /// Add one file's rows and route its facts to the budget or expense table.
    pub fn append(&mut self, output: FileOutput) {
        self.business.extend(output.masters);
        for fact in &output.facts {
            if let Some(record) = fact.budget_record() {
                self.budget.push(record);
            } else if let Some(record) = fact.expense_record() {
                self.expense.push(record);
            }
        }
    }

    pub fn sort(&mut self) {
        self.business.sort_by(|a, b| a.id.cmp(&b.id));
    }
}

pub struct MasterBuilder<'a> {
    tables: &'a ReferenceTables,
    normalizer: &'a TextNormalizer,
    resolver: SchemaYearResolver<'a>,
    reconciler: NameReconciler,
    options: BuildOptions,
}

impl<'a> MasterBuilder<'a> {
    pub fn new(
        tables: &'a ReferenceTables,
        normalizer: &'a TextNormalizer,
        options: BuildOptions,
    ) -> Self {
        MasterBuilder {
            tables,
            normalizer,
            resolver: SchemaYearResolver::new(&tables.filename_years),
            reconciler: NameReconciler::new(tables),
            options,
        }
    }

    /// The org master as an output table.
    pub fn ministry_master(&self) -> Vec<MinistryRecord> {
        self.tables
            .orgs
            .iter()
            .map(|org| MinistryRecord {
                ministry_id: org.org_id,
                ministry_name: org.org_name.clone(),
            })
            .collect()
    }

    /// Process every `.csv` directly inside `dir`, in name order.
    pub fn build_dir(&self, dir: &Path) -> Result<(MasterTables, RunReport)> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(std::io::Error::from)?;
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "csv") {
                paths.push(path.to_path_buf());
            }
        }
        paths.sort();
        self.build_files(&paths)
    }

    /// Process files in the given order and merge their output.
    pub fn build_files(&self, paths: &[PathBuf]) -> Result<(MasterTables, RunReport)> {
        let mut tables = MasterTables::default();
        let mut report = RunReport::default();

        for path in paths {
            let file = file_name_of(path);
            match self.process_file(path)? {
                FileOutcome::Built { year, output } => {
                    let summary = summarize(&file, year, &output);
                    tracing::info!(
                        file = %file,
                        year,
                        rows = summary.rows,
                        budget_facts = summary.budget_facts,
                        expense_facts = summary.expense_facts,
                        "Processed sheet"
                    );
                    report.processed.push(summary);
                    tables.append(output);
                }
                FileOutcome::NotSelected => {
                    tracing::debug!(file = %file, "Not a review sheet, skipping");
                    report.not_selected.push(file);
                }
                FileOutcome::Failed(failure) => {
                    tracing::warn!(file = %failure.file, kind = %failure.kind, "{}", failure.message);
                    report.failures.push(failure);
                }
            }
        }

        tables.sort();
        Ok((tables, report))
    }

    /// Outcome for one file. Only configuration problems are errors; anything
    /// wrong with the file itself is a [`FileOutcome::Failed`].
    pub fn process_file(&self, path: &Path) -> Result<FileOutcome> {
        let file = file_name_of(path);
        if !self.tables.sheets.accepts(&file) {
            return Ok(FileOutcome::NotSelected);
        }

        let Some(layout) = self.resolver.resolve(&file) else {
            let message = match self.resolver.year_of(&file) {
                Some(year) => format!("file name maps to {}, which has no known layout", year),
                None => "no filename token maps this file to a year".to_string(),
            };
            return Ok(FileOutcome::Failed(FileFailure::new(
                file,
                FailureKind::UnrecognizedLayout,
                message,
            )));
        };

        let normalizer = self.options.normalize_on_read.then_some(self.normalizer);
        let sheet = match Sheet::open(path, normalizer) {
            Ok(sheet) => sheet,
            Err(e) => {
                return Ok(FileOutcome::Failed(FileFailure::new(
                    file,
                    FailureKind::MalformedSource,
                    e.to_string(),
                )))
            }
        };

        let year = layout.year;
        Ok(match self.process_sheet(&sheet, &layout)? {
            Ok(output) => FileOutcome::Built { year, output },
            Err(failure) => FileOutcome::Failed(failure),
        })
    }

    /// Master rows and facts of one sheet under `layout`.
    pub fn process_sheet(
        &self,
        sheet: &Sheet,
        layout: &LayoutVersion,
    ) -> Result<std::result::Result<FileOutput, FileFailure>> {
        let extractor = WideColumnPatternExtractor::new(&layout.wide)?;
        let mut output = FileOutput::default();

        let rows: Vec<&Row> = match &self.options.program {
            Some(program) => {
                if !sheet.header.contains(NAME_COLUMN) {
                    return Ok(Err(FileFailure::new(
                        &*sheet.file_name,
                        FailureKind::MissingColumn,
                        format!("column {} is required to track a program", NAME_COLUMN),
                    )));
                }
                let program = self.normalizer.normalize(program);
                let found = sheet
                    .rows
                    .iter()
                    .find(|row| row.get(NAME_COLUMN) == Some(program.as_str()));
                if found.is_none() {
                    tracing::info!(file = %sheet.file_name, program = %program, "Program not found in sheet");
                }
                found.into_iter().collect()
            }
            None => sheet.rows.iter().collect(),
        };

        if !sheet.header.contains(ORG_COLUMN) && !sheet.header.contains(ORG_COLUMN_LEGACY) {
            tracing::debug!(file = %sheet.file_name, "No ministry column, org ids will be null");
        }

        for (done, row) in rows.into_iter().enumerate() {
            let (master, facts) = self.process_row(row, layout, &extractor);
            output.masters.push(master);
            output.facts.extend(facts);
            if (done + 1) % 500 == 0 {
                tracing::debug!(file = %sheet.file_name, rows = done + 1, "Processed rows");
            }
        }

        Ok(Ok(output))
    }

    fn process_row(
        &self,
        row: &Row,
        layout: &LayoutVersion,
        extractor: &WideColumnPatternExtractor,
    ) -> (MasterRecord, Vec<WideFact>) {
        let ministry_name = row.get(ORG_COLUMN).or_else(|| row.get(ORG_COLUMN_LEGACY));
        let ministry_id = ministry_name.and_then(|name| self.reconciler.canonicalize(name));
        let business_id = build_id(row, layout, ministry_id);
        let (start_year, end_year) = split_start_end(row.get(PERIOD_COLUMN), self.normalizer);

        let code = |column: &str| row.get(column).map(|_| code_text(row, column));
        let master = MasterRecord {
            id: bulk_id(layout.year, row.origin.index),
            business_id: business_id.clone(),
            file_year: layout.year,
            ministry_id,
            ministry_name: ministry_name.map(str::to_string),
            code: code("事業番号"),
            code_1: code("事業番号-1"),
            code_2: code("事業番号-2"),
            code_3: code("事業番号-3"),
            code_4: code("事業番号-4"),
            code_5: code("事業番号-5"),
            name: row.get(NAME_COLUMN).map(str::to_string),
            start_year,
            end_year,
        };

        let facts = extractor.extract(row, &business_id);
        (master, facts)
    }
}

/// Split `事業開始・終了(予定)年度` into start and end year text. The cell is
/// normalized first so an era range converts with its shared era.
pub fn split_start_end(
    raw: Option<&str>,
    normalizer: &TextNormalizer,
) -> (Option<String>, Option<String>) {
    let Some(raw) = raw else {
        return (None, None);
    };
    let text = normalizer.normalize(raw);
    if text == NO_END_YEAR {
        return (None, Some(text));
    }

    let (start, end) = match text.split_once(|c: char| c == RANGE_SEPARATOR || c == '・') {
        Some((start, end)) => (start, Some(end)),
        None => (text.as_str(), None),
    };
    let clean = |part: &str| {
        let part = part.trim();
        (!part.is_empty()).then(|| part.to_string())
    };
    (clean(start), end.and_then(clean))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn summarize(file: &str, year: i32, output: &FileOutput) -> FileSummary {
    let budget_facts = output
        .facts
        .iter()
        .filter(|f| f.budget_record().is_some())
        .count();
    FileSummary {
        file: file.to_string(),
        year,
        rows: output.masters.len(),
        budget_facts,
        expense_facts: output.facts.len() - budget_facts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::types::AxisKey;

    fn fixtures() -> (ReferenceTables, TextNormalizer) {
        let tables = ReferenceTables::builtin().unwrap();
        let normalizer = TextNormalizer::new(&tables.katakana).unwrap();
        (tables, normalizer)
    }

    fn sheet(csv: &str, name: &str) -> Sheet {
        Sheet::from_reader(csv.as_bytes(), name, None).unwrap()
    }

    #[test]
    fn test_split_start_end() {
        let (_, n) = fixtures();
        assert_eq!(
            split_start_end(Some("平成25年度〜平成30年度"), &n),
            (Some("2013年度".into()), Some("2018年度".into()))
        );
        assert_eq!(
            split_start_end(Some("終了(予定)なし"), &n),
            (None, Some("終了(予定)なし".into()))
        );
        assert_eq!(
            split_start_end(Some("2010年度・終了(予定)なし"), &n),
            (Some("2010年度".into()), Some("終了(予定)なし".into()))
        );
        assert_eq!(
            split_start_end(Some("平成9〜25年度"), &n),
            (Some("1997".into()), Some("2013年度".into()))
        );
        assert_eq!(split_start_end(Some("2012年度"), &n), (Some("2012年度".into()), None));
        assert_eq!(split_start_end(None, &n), (None, None));
    }

    #[test]
    fn test_rows_become_masters_and_facts() {
        let (tables, n) = fixtures();
        let builder = MasterBuilder::new(&tables, &n, BuildOptions::default());
        let csv = "府省,事業番号,事業名,予算額・執行額-25年度当初予算\n\
                   内閣府本府,12,調査事業,100\n\
                   架空省,3,別事業,\n";
        let sheet = sheet(csv, "database2014_Sheet1.csv");
        let layout = LayoutVersion::for_year(2014).unwrap();
        let output = builder.process_sheet(&sheet, &layout).unwrap().unwrap();

        assert_eq!(output.masters.len(), 2);
        let first = &output.masters[0];
        assert_eq!(first.id.0, "2014-00001");
        assert_eq!(first.ministry_id, builder.reconciler.canonicalize("内閣府"));
        assert!(first.business_id.0.ends_with("-0012-0000"));

        // unresolved ministry keeps the row with a sentinel org code
        let second = &output.masters[1];
        assert_eq!(second.ministry_id, None);
        assert_eq!(second.business_id.0, "2014-XXXX-0003-0000");

        assert_eq!(output.facts.len(), 1);
        assert_eq!(output.facts[0].record_id, first.business_id);
        assert_eq!(output.facts[0].axis, AxisKey::Year(2013));
    }

    #[test]
    fn test_program_tracking_keeps_first_match() {
        let (tables, n) = fixtures();
        let options = BuildOptions {
            program: Some("ＩＴ推進経費".into()),
            normalize_on_read: false,
        };
        let builder = MasterBuilder::new(&tables, &n, options);
        let csv = "府省庁,事業番号-2,事業名\n総務省,1,別事業\n総務省,2,IT推進経費\n総務省,3,IT推進経費\n";
        let sheet = sheet(csv, "database2016_レビューシート.csv");
        let layout = LayoutVersion::for_year(2016).unwrap();
        let output = builder.process_sheet(&sheet, &layout).unwrap().unwrap();

        assert_eq!(output.masters.len(), 1);
        assert_eq!(output.masters[0].id.0, "2016-00002");
    }

    #[test]
    fn test_program_tracking_needs_name_column() {
        let (tables, n) = fixtures();
        let options = BuildOptions {
            program: Some("調査".into()),
            normalize_on_read: false,
        };
        let builder = MasterBuilder::new(&tables, &n, options);
        let sheet = sheet("府省庁\n総務省\n", "database2016_レビューシート.csv");
        let layout = LayoutVersion::for_year(2016).unwrap();
        let failure = builder.process_sheet(&sheet, &layout).unwrap().unwrap_err();
        assert_eq!(failure.kind, FailureKind::MissingColumn);
    }

    #[test]
    fn test_unrecognized_layout_says_why() {
        let (mut tables, n) = fixtures();
        tables.filename_years.push(crate::config::FilenameYear {
            token: "database2012".into(),
            year: 2012,
        });
        let builder = MasterBuilder::new(&tables, &n, BuildOptions::default());

        // layout resolution happens before the file is opened
        let outcome = builder
            .process_file(Path::new("database2012_レビューシート.csv"))
            .unwrap();
        let failure = match outcome {
            FileOutcome::Failed(failure) => failure,
            other => panic!("expected a failure, got {:?}", other),
        };
        assert_eq!(failure.kind, FailureKind::UnrecognizedLayout);
        assert!(failure.message.contains("2012"));

        let outcome = builder
            .process_file(Path::new("other_レビューシート.csv"))
            .unwrap();
        let failure = match outcome {
            FileOutcome::Failed(failure) => failure,
            other => panic!("expected a failure, got {:?}", other),
        };
        assert!(failure.message.contains("no filename token"));
    }

    #[test]
    fn test_ministry_master_mirrors_org_set() {
        let (tables, n) = fixtures();
        let builder = MasterBuilder::new(&tables, &n, BuildOptions::default());
        let master = builder.ministry_master();
        assert_eq!(master.len(), tables.orgs.len());
        assert_eq!(master[0].ministry_id, tables.orgs[0].org_id);
    }

    #[test]
    fn test_tables_route_facts_by_axis() {
        let mut tables = MasterTables::default();
        let id = crate::reconcile::types::CompositeRecordId("2016-0001-0001-0000".into());
        tables.append(FileOutput {
            masters: vec![],
            facts: vec![
                WideFact {
                    record_id: id.clone(),
                    axis: AxisKey::Year(2016),
                    item_label: "当初予算".into(),
                    value: Some("1".into()),
                    purpose: None,
                },
                WideFact {
                    record_id: id,
                    axis: AxisKey::Block {
                        block: 'A',
                        sequence: 1,
                    },
                    item_label: "委託費".into(),
                    value: None,
                    purpose: None,
                },
            ],
        });
        assert_eq!(tables.budget.len(), 1);
        assert_eq!(tables.expense.len(), 1);
    }
}
