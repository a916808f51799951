// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Import bookkeeping for one generated file.

use std::collections::{BTreeMap, HashSet};

use crate::golang::{guess_package_name, is_identifier, path_base};

/// Identifiers used by generated code that must not be taken by an import.
pub const RESERVED_IDENTS: &[&str] = &["_d", "_cfg", "span", "ctx", "err", "base", "opts"];

#[derive(Debug, Clone, PartialEq, Eq)]
struct ImportEntry {
    local: String,
    package_name: String,
}

/// Imports of a generated file, each with a unique local name.
#[derive(Debug, Clone)]
pub struct ImportSet {
    by_path: BTreeMap<String, ImportEntry>,
    taken: HashSet<String>,
}

impl Default for ImportSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportSet {
    pub fn new() -> Self {
        Self {
            by_path: BTreeMap::new(),
            taken: RESERVED_IDENTS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Keep `name` from being used as a qualifier.
    pub fn reserve(&mut self, name: &str) {
        self.taken.insert(name.to_string());
    }

    /// Add an import and return the qualifier to use for it.
    ///
    /// A package whose name is already taken gets a numbered alias.
    pub fn add(&mut self, import_path: &str, package_name: &str) -> String {
        if let Some(entry) = self.by_path.get(import_path) {
            return entry.local.clone();
        }

        let base = if is_identifier(package_name) {
            package_name.to_string()
        } else {
            guess_package_name(import_path)
        };
        let mut local = base.clone();
        let mut n = 2;
        while self.taken.contains(&local) {
            local = format!("{base}{n}");
            n += 1;
        }

        self.taken.insert(local.clone());
        self.by_path.insert(
            import_path.to_string(),
            ImportEntry {
                local: local.clone(),
                package_name: base,
            },
        );
        local
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// Import specs, one per line, aliased where the local name differs
    /// from what the path implies.
    pub fn specs(&self) -> Vec<String> {
        self.by_path
            .iter()
            .map(|(path, entry)| {
                if entry.local == entry.package_name && entry.local == path_base(path) {
                    format!("\"{path}\"")
                } else {
                    format!("{} \"{}\"", entry.local, path)
                }
            })
            .collect()
    }

    /// An `import ( ... )` declaration, or nothing when empty.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut out = String::from("import (\n");
        for spec in self.specs() {
            out.push('\t');
            out.push_str(&spec);
            out.push('\n');
        }
        out.push_str(")\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent_per_path() {
        let mut imports = ImportSet::new();
        assert_eq!(imports.add("context", "context"), "context");
        assert_eq!(imports.add("context", "context"), "context");
        assert_eq!(imports.len(), 1);
    }

    #[test]
    fn test_collisions_get_numbered_aliases() {
        let mut imports = ImportSet::new();
        assert_eq!(imports.add("example.com/a/model", "model"), "model");
        assert_eq!(imports.add("example.com/b/model", "model"), "model2");
        assert_eq!(imports.add("example.com/c/span", "span"), "span2");
        assert_eq!(
            imports.specs(),
            vec![
                "\"example.com/a/model\"".to_string(),
                "model2 \"example.com/b/model\"".to_string(),
                "span2 \"example.com/c/span\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_alias_when_name_differs_from_path() {
        let mut imports = ImportSet::new();
        imports.add("example.com/app/model", "models");
        imports.add("gopkg.in/yaml.v3", "yaml");
        imports.reserve("T");
        let rendered = imports.render();
        assert!(rendered.contains("\tmodels \"example.com/app/model\"\n"));
        assert!(rendered.contains("\t\"gopkg.in/yaml.v3\"\n"));
        assert!(ImportSet::new().render().is_empty());
    }
}
