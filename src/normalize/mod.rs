//! Cell text normalization
//!
//! Canonicalizes era dates, width variants, list markers and the katakana
//! long-vowel / hyphen ambiguity so that the same value written differently in
//! different years compares equal.

pub mod era;
pub mod katakana;
pub mod text;

pub use era::{to_gregorian, Era};
pub use katakana::HyphenRewriter;
pub use text::TextNormalizer;
