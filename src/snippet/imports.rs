//! Collection, classification and ordering of import statements.

use super::parser::{ImportStmt, parse_module};
use super::stdlib::is_standard_library;
use crate::error::SyntaxError;
use itertools::Itertools;

/// Import statements split into standard-library and third-party classes,
/// each deduplicated and sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSet {
    pub builtin: Vec<String>,
    pub third_party: Vec<String>,
}

impl ImportSet {
    pub fn is_empty(&self) -> bool {
        self.builtin.is_empty() && self.third_party.is_empty()
    }

    /// Every statement, builtin first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.builtin
            .iter()
            .chain(self.third_party.iter())
            .map(String::as_str)
    }
}

/// Accumulates import statements from many snippets.
#[derive(Debug, Clone, Default)]
pub struct ImportAggregator {
    builtin: Vec<String>,
    third_party: Vec<String>,
}

impl ImportAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `code` and records its module-level imports.
    pub fn add_snippet(&mut self, code: &str) -> Result<&mut Self, SyntaxError> {
        let module = parse_module(code)?;
        for import in &module.imports {
            self.add_import(import);
        }
        Ok(self)
    }

    pub fn add_import(&mut self, import: &ImportStmt) -> &mut Self {
        if is_standard_library(&import.module) {
            self.builtin.push(import.statement.clone());
        } else {
            self.third_party.push(import.statement.clone());
        }
        self
    }

    /// Adds a third-party statement unless it is already present.
    pub fn force(&mut self, statement: &str) -> &mut Self {
        if !self.third_party.iter().any(|s| s == statement) {
            self.third_party.push(statement.to_string());
        }
        self
    }

    pub fn finish(&self) -> ImportSet {
        ImportSet {
            builtin: sort_imports(self.builtin.iter().map(String::as_str)),
            third_party: sort_imports(self.third_party.iter().map(String::as_str)),
        }
    }
}

/// Deduplicates and orders statements: every `import x` (alphabetically)
/// before every `from x import y` (alphabetically).
pub fn sort_imports<'a>(statements: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let (plain, from): (Vec<&str>, Vec<&str>) = statements
        .into_iter()
        .unique()
        .partition(|s| !s.starts_with("from "));
    plain
        .into_iter()
        .sorted()
        .chain(from.into_iter().sorted())
        .map(str::to_string)
        .collect()
}

/// Classifies and merges the imports of every snippet, then appends
/// `force_entries` to the third-party class when missing.
pub fn classify_and_merge<'a>(
    snippets: impl IntoIterator<Item = &'a str>,
    force_entries: &[&str],
) -> Result<ImportSet, SyntaxError> {
    let mut aggregator = ImportAggregator::new();
    for snippet in snippets {
        aggregator.add_snippet(snippet)?;
    }
    for entry in force_entries {
        aggregator.force(entry);
    }
    Ok(aggregator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_tier_order() {
        let sorted = sort_imports([
            "from typing import Any",
            "import sys",
            "from collections import OrderedDict",
            "import os",
            "import sys",
        ]);
        assert_eq!(
            sorted,
            vec![
                "import os",
                "import sys",
                "from collections import OrderedDict",
                "from typing import Any",
            ]
        );
    }

    #[test]
    fn test_classification_and_force() {
        let set = classify_and_merge(
            ["import os\nimport requests\nfrom autogen import ConversableAgent\n"],
            &["from autogen.interop import Interoperability"],
        )
        .unwrap();
        assert_eq!(set.builtin, vec!["import os"]);
        assert_eq!(
            set.third_party,
            vec![
                "import requests",
                "from autogen import ConversableAgent",
                "from autogen.interop import Interoperability",
            ]
        );
    }

    #[test]
    fn test_force_does_not_duplicate() {
        let set = classify_and_merge(
            ["from autogen.interop import Interoperability\n"],
            &["from autogen.interop import Interoperability"],
        )
        .unwrap();
        assert_eq!(set.third_party.len(), 1);
    }

    #[test]
    fn test_nested_imports_are_ignored() {
        let set = classify_and_merge(["def f():\n    import json\n    return json\n"], &[]).unwrap();
        assert!(set.is_empty());
    }
}
