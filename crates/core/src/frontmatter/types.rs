//! Frontmatter types and data structures.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Parsed YAML frontmatter from a markdown document.
///
/// Fields are kept in a [`serde_yaml::Mapping`] rather than a hash map so
/// that key order is preserved exactly as written. Values are the YAML
/// tagged union (scalar / sequence / mapping), which accepts arbitrary
/// user-defined keys while staying type-checkable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    /// Fields as ordered key-value pairs.
    #[serde(flatten)]
    pub fields: Mapping,
}

impl Frontmatter {
    /// Look up a field by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(Value::from(key))
    }

    /// The `title:` field, if present and a string.
    pub fn title(&self) -> Option<&str> {
        self.get("title").and_then(Value::as_str)
    }

    /// Tags declared in the `tags:` field. Accepts a single scalar or a
    /// list of scalars; anything else yields no tags.
    pub fn tags(&self) -> Vec<String> {
        match self.get("tags") {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Sequence(seq)) => seq
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Result of splitting frontmatter from markdown.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Parsed frontmatter (if present).
    pub frontmatter: Option<Frontmatter>,
    /// The markdown body (everything after frontmatter).
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_accept_scalar_and_list() {
        let fm: Frontmatter = serde_yaml::from_str("tags: solo").unwrap();
        assert_eq!(fm.tags(), vec!["solo".to_string()]);

        let fm: Frontmatter = serde_yaml::from_str("tags:\n  - a\n  - b").unwrap();
        assert_eq!(fm.tags(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn key_order_is_preserved() {
        let fm: Frontmatter =
            serde_yaml::from_str("zebra: 1\nalpha: 2\nmiddle: 3").unwrap();
        let keys: Vec<_> =
            fm.fields.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["zebra", "alpha", "middle"]);
    }
}
