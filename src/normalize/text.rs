//! The cell text normalization pipeline.
//!
//! Stages run in a fixed order and the order matters:
//!
//! 1. circled digits (①..⑳) become `"1. "` list markers, before width folding
//!    would turn them into bare digits
//! 2. NFKC compatibility folding
//! 3. whitespace-padded tilde variants collapse to `〜`
//! 4. era ranges (`平成9〜25年度`) and
//! 5. single era years (`平成29年`, `R3`, `H元年`) in one scan, the range
//!    form tried first so a single era never eats the first year of a range
//! 6. katakana long-vowel / hyphen rewrite (see [`katakana`](super::katakana))
//! 7. trim
//!
//! Stages 4 to 6 repeat while they still change the text.
//!
//! The result is idempotent: normalizing normalized text changes nothing.

use crate::config::KatakanaRules;
use crate::error::Result;
use crate::normalize::era::{self, era_token_pattern};
use crate::normalize::katakana::HyphenRewriter;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;

pub const RANGE_SEPARATOR: char = '〜';

const MAX_REWRITE_PASSES: usize = 4;

static TILDE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[~\x{223C}\x{301C}\x{FF5E}]\s*").unwrap());

/// An era year, optionally followed by `〜` and a second year of the same era.
static ERA_REGEX: Lazy<Regex> = Lazy::new(|| {
    let era = era_token_pattern();
    Regex::new(&format!(
        r"({era})([0-9]+|元)(年度|年)?(?:〜([0-9]+|元)(年度|年)?)?"
    ))
    .unwrap()
});

/// Normalizes one cell of sheet text.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    hyphens: HyphenRewriter,
}

impl TextNormalizer {
    pub fn new(rules: &KatakanaRules) -> Result<Self> {
        Ok(TextNormalizer {
            hyphens: HyphenRewriter::new(rules)?,
        })
    }

    /// Run the full pipeline over `text`.
    pub fn normalize(&self, text: &str) -> String {
        let text = expand_circled_digits(text);
        let text: String = text.nfkc().collect();
        let mut text = TILDE_REGEX.replace_all(&text, "〜").into_owned();

        // Deleting a stray hyphen can join a split era token (平-成29), so the
        // date and hyphen stages repeat until the text stops changing.
        for _ in 0..MAX_REWRITE_PASSES {
            let next = convert_eras(&text);
            let next = self.hyphens.rewrite(&next);
            if next == text {
                break;
            }
            text = next;
        }
        text.trim().to_string()
    }

    /// Null cells pass through untouched.
    pub fn normalize_cell(&self, cell: Option<&str>) -> Option<String> {
        cell.map(|text| self.normalize(text))
    }
}

/// ① .. ⑳ become "1. " .. "20. ".
fn expand_circled_digits(text: &str) -> String {
    if !text.chars().any(is_circled_digit) {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if is_circled_digit(c) {
            let n = c as u32 - 0x2460 + 1;
            out.push_str(&format!("{}. ", n));
        } else {
            out.push(c);
        }
    }
    out
}

fn is_circled_digit(c: char) -> bool {
    ('\u{2460}'..='\u{2473}').contains(&c)
}

/// A Latin era letter glued to surrounding ASCII (`CH2`, `H2O`) is part of a
/// word or code, not a date.
fn latin_era_is_embedded(text: &str, era: &regex::Match, year_end: usize, has_suffix: bool) -> bool {
    if !era.as_str().is_ascii() {
        return false;
    }
    let before = text[..era.start()].chars().next_back();
    let after = text[year_end..].chars().next();
    before.map_or(false, |c| c.is_ascii_alphanumeric())
        || (!has_suffix && after.map_or(false, |c| c.is_ascii_alphanumeric()))
}

/// `年度` survives conversion, a bare `年` is absorbed into the year.
fn suffix_after(caps: &Captures, group: usize) -> &'static str {
    match caps.get(group).map(|m| m.as_str()) {
        Some("年度") => "年度",
        _ => "",
    }
}

/// Ranges and single years in one pass. A range whose either end does not
/// resolve is left whole; its first year is not converted on its own.
fn convert_eras(text: &str) -> String {
    ERA_REGEX
        .replace_all(text, |caps: &Captures| {
            let whole = caps[0].to_string();
            let (Some(era_match), Some(year1)) = (caps.get(1), caps.get(2)) else {
                return whole;
            };
            let (year_end, has_suffix) = match caps.get(4) {
                Some(year2) => (year2.end(), caps.get(5).is_some()),
                None => (year1.end(), caps.get(3).is_some()),
            };
            if latin_era_is_embedded(text, &era_match, year_end, has_suffix) {
                return whole;
            }

            let Some(start) = era::to_gregorian(era_match.as_str(), year1.as_str()) else {
                return whole;
            };
            let Some(year2) = caps.get(4) else {
                return format!("{}{}", start, suffix_after(caps, 3));
            };
            match era::to_gregorian(era_match.as_str(), year2.as_str()) {
                Some(end) => format!(
                    "{}{}{}{}{}",
                    start,
                    suffix_after(caps, 3),
                    RANGE_SEPARATOR,
                    end,
                    suffix_after(caps, 5)
                ),
                None => whole,
            }
        })
        .into_owned()
}
