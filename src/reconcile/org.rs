//! Free-text ministry names to org master ids.

use crate::config::ReferenceTables;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct NameReconciler {
    aliases: HashMap<String, String>,
    ids: HashMap<String, u32>,
}

impl NameReconciler {
    pub fn new(tables: &ReferenceTables) -> Self {
        let aliases = tables
            .aliases
            .iter()
            .map(|a| (a.variant.clone(), a.canonical.clone()))
            .collect();
        let ids = tables
            .orgs
            .iter()
            .map(|o| (o.org_name.clone(), o.org_id))
            .collect();
        NameReconciler { aliases, ids }
    }

    /// Canonical name for a raw name: its alias target, or the name itself.
    pub fn canonical_name<'a>(&'a self, raw_name: &'a str) -> &'a str {
        let name = raw_name.trim();
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Org id for a raw name, `None` when neither the alias table nor the
    /// master knows it. Callers keep the record with a null org id.
    pub fn canonicalize(&self, raw_name: &str) -> Option<u32> {
        self.ids.get(self.canonical_name(raw_name)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconciler() -> NameReconciler {
        NameReconciler::new(&ReferenceTables::builtin().unwrap())
    }

    #[test]
    fn test_direct_and_alias_lookup() {
        let r = reconciler();
        let direct = r.canonicalize("内閣府").unwrap();
        assert_eq!(r.canonicalize("内閣府本府"), Some(direct));
        assert_eq!(r.canonicalize(" 内閣府 "), Some(direct));
        assert_eq!(r.canonical_name("厚労省"), "厚生労働省");
    }

    #[test]
    fn test_unknown_name_is_none() {
        let r = reconciler();
        assert_eq!(r.canonicalize("架空省"), None);
        assert_eq!(r.canonical_name("架空省"), "架空省");
    }

    #[test]
    fn test_alias_to_missing_canonical_is_none() {
        let toml = r#"
            filename_years = []

            [[orgs]]
            org_id = 1
            org_name = "内閣府"

            [[aliases]]
            variant = "旧庁"
            canonical = "廃止庁"
        "#;
        let tables = ReferenceTables::from_toml_str(toml).unwrap();
        assert_eq!(NameReconciler::new(&tables).canonicalize("旧庁"), None);
    }
}
