//! Katakana long-vowel / hyphen disambiguation.
//!
//! Sheets mix the katakana long-vowel mark (ー) with a zoo of hyphen and dash
//! glyphs. Between two katakana the glyph is almost always a long vowel, except
//! for a configured list of phrases where it really is a hyphen. Those phrases
//! are protected as spans: the rewrite rules only ever see the text between
//! them, and the spans are copied back verbatim at the end.

use crate::config::KatakanaRules;
use crate::error::{Error, Result};
use regex::{NoExpand, Regex};

/// Every glyph treated as a hyphen.
pub const HYPHEN_LIKE: [char; 9] = [
    '\u{002D}', '\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}', '\u{2014}', '\u{2015}', '\u{2212}',
    '\u{FF0D}',
];

pub const LONG_VOWEL_MARK: char = 'ー';

const HYPHEN_CLASS: &str = r"[\x{2D}\x{2010}\x{2011}\x{2012}\x{2013}\x{2014}\x{2015}\x{2212}\x{FF0D}]";

pub fn is_hyphen_like(c: char) -> bool {
    HYPHEN_LIKE.contains(&c)
}

fn is_katakana(c: char) -> bool {
    ('ァ'..='ヴ').contains(&c)
}

/// Hiragana, katakana or kanji.
fn is_native(c: char) -> bool {
    ('ぁ'..='ん').contains(&c) || is_katakana(c) || ('一'..='龠').contains(&c)
}

/// Compile a phrase whose ASCII hyphens stand for any hyphen-like glyph.
fn phrase_pattern(phrase: &str) -> Result<Regex> {
    let parts: Vec<String> = phrase.split('-').map(regex::escape).collect();
    Regex::new(&parts.join(HYPHEN_CLASS))
        .map_err(|e| Error::Config(format!("bad katakana phrase {:?}: {}", phrase, e)))
}

/// A stretch of text that the rewrite rules must not touch.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProtectedSpan {
    start: usize,
    end: usize,
    original: String,
}

/// Compiled form of [`KatakanaRules`].
#[derive(Debug, Clone)]
pub struct HyphenRewriter {
    corrections: Vec<(Regex, String)>,
    exclusions: Vec<Regex>,
}

impl HyphenRewriter {
    pub fn new(rules: &KatakanaRules) -> Result<Self> {
        let corrections = rules
            .pre_normalization
            .iter()
            .map(|c| Ok((phrase_pattern(&c.from)?, c.to.clone())))
            .collect::<Result<Vec<_>>>()?;
        let exclusions = rules
            .exclusions
            .iter()
            .map(|phrase| phrase_pattern(phrase))
            .collect::<Result<Vec<_>>>()?;

        Ok(HyphenRewriter {
            corrections,
            exclusions,
        })
    }

    /// Apply corrections, protect exclusions, rewrite hyphens, restore.
    pub fn rewrite(&self, text: &str) -> String {
        let mut text = text.to_string();
        for (pattern, replacement) in &self.corrections {
            if pattern.is_match(&text) {
                text = pattern
                    .replace_all(&text, NoExpand(replacement.as_str()))
                    .into_owned();
            }
        }

        let spans = self.protected_spans(&text);
        restore(&text, &spans)
    }

    /// Exclusion matches in text order. Earlier exclusions claim text first;
    /// later ones never overlap a claimed span.
    fn protected_spans(&self, text: &str) -> Vec<ProtectedSpan> {
        let mut spans: Vec<ProtectedSpan> = Vec::new();
        for pattern in &self.exclusions {
            for m in pattern.find_iter(text) {
                let overlaps = spans
                    .iter()
                    .any(|s| m.start() < s.end && s.start < m.end());
                if !overlaps {
                    spans.push(ProtectedSpan {
                        start: m.start(),
                        end: m.end(),
                        original: m.as_str().to_string(),
                    });
                }
            }
        }
        spans.sort_by_key(|s| s.start);
        spans
    }
}

/// Rewrite the gaps between spans, then splice each recorded original back in.
fn restore(text: &str, spans: &[ProtectedSpan]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in spans {
        out.push_str(&rewrite_unprotected(&text[cursor..span.start]));
        out.push_str(&span.original);
        cursor = span.end;
    }
    out.push_str(&rewrite_unprotected(&text[cursor..]));
    out
}

/// Hyphen rules for text outside protected spans. The edges of the slice have
/// no neighbours, so a glyph touching a protected span is never treated as
/// sitting between two native characters.
fn rewrite_unprotected(segment: &str) -> String {
    if !segment.chars().any(is_hyphen_like) {
        return segment.to_string();
    }
    let chars: Vec<char> = segment.chars().collect();

    // katakana-hyphen-katakana becomes a long vowel; other hyphens fold to '-'
    let folded: Vec<char> = chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            if !is_hyphen_like(c) {
                return c;
            }
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            match (prev, next) {
                (Some(p), Some(n)) if is_katakana(p) && is_katakana(n) => LONG_VOWEL_MARK,
                _ => '-',
            }
        })
        .collect();

    // drop '-' wedged between two native-script characters
    folded
        .iter()
        .enumerate()
        .filter(|&(i, &c)| {
            if c != '-' {
                return true;
            }
            let prev = i.checked_sub(1).map(|p| folded[p]);
            let next = folded.get(i + 1).copied();
            !matches!((prev, next), (Some(p), Some(n)) if is_native(p) && is_native(n))
        })
        .map(|(_, &c)| c)
        .collect()
}
