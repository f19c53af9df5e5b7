//! Wide column families to long-format facts.
//!
//! Two families carry a repeating dimension in their column names:
//!
//! - budget columns embed a fiscal year (`予算額...-25年度当初予算`); a 2-digit
//!   year is Heisei-relative (`1988 + yy`) as the sheets write it
//! - expense columns embed a payment block letter and a line index, with the
//!   category, purpose and amount of one line in three sibling columns
//!
//! Extraction is a pure function of one row; nothing carries over between rows.

use crate::error::{Error, Result};
use crate::reconcile::layout::{ExpenseTemplate, WideTemplates};
use crate::reconcile::types::{AxisKey, CompositeRecordId, Row, WideFact};
use regex::Regex;

const HEISEI_BASE: i32 = 1988;

/// Leading words of a budget label that name the section, not the item.
const BUDGET_LABEL_NOISE: [&str; 2] = ["予算の状況", "状況"];

#[derive(Debug, Clone)]
pub struct WideColumnPatternExtractor {
    budget_column: Regex,
    expense: ExpenseTemplate,
}

impl WideColumnPatternExtractor {
    pub fn new(templates: &WideTemplates) -> Result<Self> {
        let pattern = format!(
            r"^{}.*?-([0-9]{{4}}|[0-9]{{2}})年度(.*)$",
            regex::escape(&templates.budget_prefix)
        );
        let budget_column = Regex::new(&pattern)
            .map_err(|e| Error::Config(format!("bad budget prefix: {}", e)))?;

        Ok(WideColumnPatternExtractor {
            budget_column,
            expense: templates.expense.clone(),
        })
    }

    /// Budget facts followed by expense facts for one row.
    pub fn extract(&self, row: &Row, record_id: &CompositeRecordId) -> Vec<WideFact> {
        let mut facts = self.budget_facts(row, record_id);
        facts.extend(self.expense_facts(row, record_id));
        facts
    }

    /// One fact per non-null budget cell, in column order.
    pub fn budget_facts(&self, row: &Row, record_id: &CompositeRecordId) -> Vec<WideFact> {
        let mut facts = Vec::new();
        for (column, value) in row.iter() {
            let Some(value) = value else { continue };
            let Some((year, label)) = self.parse_budget_column(column) else {
                continue;
            };
            facts.push(WideFact {
                record_id: record_id.clone(),
                axis: AxisKey::Year(year),
                item_label: label,
                value: Some(value.to_string()),
                purpose: None,
            });
        }
        facts
    }

    /// Year and item label of a budget column name.
    pub fn parse_budget_column(&self, column: &str) -> Option<(i32, String)> {
        let caps = self.budget_column.captures(column)?;
        let token = caps.get(1)?.as_str();
        let year: i32 = token.parse().ok()?;
        let year = if token.len() == 4 { year } else { HEISEI_BASE + year };

        let mut label = caps.get(2).map_or("", |m| m.as_str()).trim_start_matches('-');
        for noise in BUDGET_LABEL_NOISE {
            if let Some(rest) = label.strip_prefix(noise) {
                label = rest.trim_start_matches('-');
                break;
            }
        }
        Some((year, label.replace("要求", "")))
    }

    /// Expense lines per block. A block is read line by line from 0 and stops
    /// at the first line whose category column is absent, so a later line
    /// after a gap is never reached. Lines whose category cell is null are
    /// skipped without stopping.
    pub fn expense_facts(&self, row: &Row, record_id: &CompositeRecordId) -> Vec<WideFact> {
        let t = &self.expense;
        let mut facts = Vec::new();
        for &block in &t.blocks {
            for line in 0..t.max_lines {
                let category = match row.column(&t.column(block, &t.category_label, line)) {
                    None => break,
                    Some(None) => continue,
                    Some(Some(category)) => category,
                };
                let purpose = row.get(&t.column(block, &t.purpose_label, line));
                let amount = row.get(&t.column(block, &t.amount_label, line));
                facts.push(WideFact {
                    record_id: record_id.clone(),
                    axis: AxisKey::Block {
                        block,
                        sequence: line as u32 + 1,
                    },
                    item_label: category.to_string(),
                    value: amount.map(str::to_string),
                    purpose: purpose.map(str::to_string),
                });
            }
        }
        facts
    }
}
