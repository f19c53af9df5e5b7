//! Reference tables for normalization and reconciliation.
//!
//! Tables are loaded once from TOML (the built-in `config/reference.toml` or a
//! user file), validated, and then passed by reference into every component.
//! Nothing here is mutated after load.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const BUILTIN_REFERENCE: &str = include_str!("../config/reference.toml");

/// All static reference data for a run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReferenceTables {
    /// Ordered org master list
    pub orgs: Vec<OrgEntity>,

    /// Variant spellings of org names
    #[serde(default)]
    pub aliases: Vec<OrgAlias>,

    /// Ordered filename token to year table (first match wins)
    pub filename_years: Vec<FilenameYear>,

    /// Katakana long-vowel corrections and hyphen exclusions
    #[serde(default)]
    pub katakana: KatakanaRules,

    /// Which normalized files count as review sheets
    #[serde(default)]
    pub sheets: SheetSelection,
}

/// A ministry or agency in the org master.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrgEntity {
    pub org_id: u32,
    pub org_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrgAlias {
    pub variant: String,
    pub canonical: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FilenameYear {
    pub token: String,
    pub year: i32,
}

/// A literal rewrite applied before hyphen handling. Hyphens in `from` match
/// any hyphen-like glyph.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Correction {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KatakanaRules {
    #[serde(default = "default_pre_normalization")]
    pub pre_normalization: Vec<Correction>,

    /// Phrases whose hyphen between katakana is a real hyphen
    #[serde(default = "default_exclusions")]
    pub exclusions: Vec<String>,
}

impl Default for KatakanaRules {
    fn default() -> Self {
        KatakanaRules {
            pre_normalization: default_pre_normalization(),
            exclusions: default_exclusions(),
        }
    }
}

fn default_pre_normalization() -> Vec<Correction> {
    vec![Correction {
        from: "リスト-グル-プ".to_string(),
        to: "リスト-グループ".to_string(),
    }]
}

fn default_exclusions() -> Vec<String> {
    vec!["リスト-グループ".to_string()]
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SheetSelection {
    /// A file is a review sheet if its name ends with one of these
    #[serde(default = "default_include_suffixes")]
    pub include_suffixes: Vec<String>,

    /// Files whose name contains one of these are never review sheets
    #[serde(default = "default_exclude_tokens")]
    pub exclude_tokens: Vec<String>,
}

impl Default for SheetSelection {
    fn default() -> Self {
        SheetSelection {
            include_suffixes: default_include_suffixes(),
            exclude_tokens: default_exclude_tokens(),
        }
    }
}

fn default_include_suffixes() -> Vec<String> {
    ["レビューシート.csv", "データベース.csv", "_Sheet1.csv"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_exclude_tokens() -> Vec<String> {
    vec!["セグメント".to_string()]
}

impl SheetSelection {
    pub fn accepts(&self, file_name: &str) -> bool {
        if self.exclude_tokens.iter().any(|t| file_name.contains(t.as_str())) {
            return false;
        }
        self.include_suffixes
            .iter()
            .any(|s| file_name.ends_with(s.as_str()))
    }
}

impl ReferenceTables {
    /// The tables compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_REFERENCE)
    }

    /// Load tables from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let tables: ReferenceTables = toml::from_str(content)?;
        tables.validate()?;
        Ok(tables)
    }

    /// Reject tables that would make lookups ambiguous.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for org in &self.orgs {
            if !ids.insert(org.org_id) {
                return Err(Error::Config(format!("duplicate org id {}", org.org_id)));
            }
            if !names.insert(org.org_name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate org name {}",
                    org.org_name
                )));
            }
        }

        for (i, earlier) in self.filename_years.iter().enumerate() {
            if earlier.token.is_empty() {
                return Err(Error::Config("empty filename token".into()));
            }
            // A later token containing an earlier one could never be reached.
            if let Some(later) = self.filename_years[i + 1..]
                .iter()
                .find(|later| later.token.contains(earlier.token.as_str()))
            {
                return Err(Error::Config(format!(
                    "filename token {:?} shadows later token {:?}",
                    earlier.token, later.token
                )));
            }
        }

        for alias in &self.aliases {
            if !names.contains(alias.canonical.as_str()) {
                tracing::warn!(
                    variant = %alias.variant,
                    canonical = %alias.canonical,
                    "Alias points at a name missing from the org master"
                );
            }
        }

        Ok(())
    }
}
