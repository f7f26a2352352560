use std::collections::HashMap;

use tracing::trace;

use crate::ast::Ast;
use crate::ast::NodeKind;

/// Label to destination mapping for reference-style links.
///
/// Labels are compared exactly as written: no case folding, no whitespace collapsing. A table is
/// built fresh for each render pass and never carried over.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceLinks {
    links: HashMap<String, Option<String>>,
}

impl ReferenceLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-scans the whole tree for link definitions, so references resolve regardless of
    /// whether they appear before or after their definition.
    pub fn collect(ast: &Ast) -> Self {
        let mut table = Self::new();
        for id in ast.descendants(ast.root()) {
            if let NodeKind::LinkDefinition {
                label, destination, ..
            } = ast.kind(id)
            {
                let destination = (!destination.is_empty()).then(|| destination.clone());
                table.store(label.clone(), destination);
            }
        }
        table
    }

    /// Overwrites any previous mapping for `label`.
    pub fn store(&mut self, label: impl Into<String>, destination: Option<String>) {
        let label = label.into();
        trace!(label = %label, destination = ?destination, "store reference link");
        self.links.insert(label, destination);
    }

    /// Destination for `label`, or the label itself when nothing usable is stored.
    pub fn find(&self, label: &str) -> String {
        self.lookup(label).unwrap_or(label).to_string()
    }

    pub fn lookup(&self, label: &str) -> Option<&str> {
        self.links.get(label).and_then(|d| d.as_deref())
    }

    /// Entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.links.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn last_write_wins() {
        let mut refs = ReferenceLinks::new();
        refs.store("foo", Some("https://a".into()));
        refs.store("foo", Some("https://b".into()));
        assert_eq!(refs.find("foo"), "https://b");
    }

    #[test]
    fn missing_label_resolves_to_itself() {
        let mut refs = ReferenceLinks::new();
        assert_eq!(refs.find("missing"), "missing");
        refs.store("empty", None);
        assert_eq!(refs.find("empty"), "empty");
        assert_eq!(refs.lookup("empty"), None);
    }

    #[test]
    fn labels_are_case_sensitive() {
        let mut refs = ReferenceLinks::new();
        refs.store("Foo", Some("https://a".into()));
        assert_eq!(refs.lookup("foo"), None);
        assert_eq!(refs.lookup("Foo "), None);
        assert_eq!(refs.lookup("Foo"), Some("https://a"));
    }

    #[test]
    fn collect_scans_nested_definitions() {
        let mut ast = Ast::new(NodeKind::Document, 0..20);
        let quote = ast.push(ast.root(), NodeKind::BlockQuote, 0..20);
        ast.push(
            quote,
            NodeKind::LinkDefinition {
                label: "a".into(),
                destination: "https://a".into(),
                title: None,
            },
            2..20,
        );
        let refs = ReferenceLinks::collect(&ast);
        assert_eq!(refs.lookup("a"), Some("https://a"));
        assert_eq!(refs.len(), 1);
    }
}
