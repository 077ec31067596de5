//! # Statement Catalog
//!
//! Schema facts recovered from one statement: which labels and relationship
//! types it mentions, how they connect, and which properties they carry.
//! A catalog is built once by [`CatalogVisitor`] and read-only afterwards.

mod scope;
mod visitor;

pub use scope::{Binding, ScopeChain};
pub use visitor::{build_catalog, CatalogVisitor, VisitState};

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Map, Value};

use crate::cypher::ast::PatternDirection;
use crate::model::{Property, Token};

static EMPTY: BTreeSet<Token> = BTreeSet::new();

/// Schema summary of a statement.
///
/// Every lookup returns an empty set for a token the statement never
/// mentioned; none of them fail.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatementCatalog {
    node_labels: BTreeSet<Token>,
    relationship_types: BTreeSet<Token>,
    properties: BTreeSet<Property>,
    parameter_names: BTreeSet<String>,
    outgoing: BTreeMap<Token, BTreeSet<Token>>,
    incoming: BTreeMap<Token, BTreeSet<Token>>,
    undirected: BTreeMap<Token, BTreeSet<Token>>,
    sources: BTreeMap<Token, BTreeSet<Token>>,
    targets: BTreeMap<Token, BTreeSet<Token>>,
}

impl StatementCatalog {
    pub fn node_labels(&self) -> &BTreeSet<Token> {
        &self.node_labels
    }

    pub fn relationship_types(&self) -> &BTreeSet<Token> {
        &self.relationship_types
    }

    pub fn properties(&self) -> &BTreeSet<Property> {
        &self.properties
    }

    /// Names of the named parameters (`$name`) the statement uses.
    pub fn parameter_names(&self) -> &BTreeSet<String> {
        &self.parameter_names
    }

    /// Relationship types leaving nodes with `label`.
    pub fn outgoing_types(&self, label: &Token) -> &BTreeSet<Token> {
        self.outgoing.get(label).unwrap_or(&EMPTY)
    }

    /// Relationship types arriving at nodes with `label`.
    pub fn incoming_types(&self, label: &Token) -> &BTreeSet<Token> {
        self.incoming.get(label).unwrap_or(&EMPTY)
    }

    /// Relationship types matched without direction from or to `label`.
    pub fn undirected_types(&self, label: &Token) -> &BTreeSet<Token> {
        self.undirected.get(label).unwrap_or(&EMPTY)
    }

    /// Labels at the start of directed relationships of `rel_type`.
    pub fn source_labels(&self, rel_type: &Token) -> &BTreeSet<Token> {
        self.sources.get(rel_type).unwrap_or(&EMPTY)
    }

    /// Labels at the end of directed relationships of `rel_type`.
    pub fn target_labels(&self, rel_type: &Token) -> &BTreeSet<Token> {
        self.targets.get(rel_type).unwrap_or(&EMPTY)
    }

    /// Properties whose owning set includes `token`.
    pub fn properties_of<'a>(&'a self, token: &'a Token) -> impl Iterator<Item = &'a Property> + 'a {
        self.properties.iter().filter(move |p| p.owning_tokens().contains(token))
    }

    pub fn is_empty(&self) -> bool {
        self.node_labels.is_empty() && self.relationship_types.is_empty() && self.properties.is_empty()
    }

    /// JSON export for downstream generators.
    ///
    /// Tokens cannot be object keys, so adjacency maps become arrays of
    /// `{"token": .., "types"|"labels": [..]}` entries.
    pub fn to_json(&self) -> Value {
        json!({
            "node_labels": tokens_json(&self.node_labels),
            "relationship_types": tokens_json(&self.relationship_types),
            "properties": self.properties.iter().map(property_json).collect::<Vec<_>>(),
            "parameter_names": self.parameter_names.iter().collect::<Vec<_>>(),
            "outgoing": adjacency_json(&self.outgoing, "types"),
            "incoming": adjacency_json(&self.incoming, "types"),
            "undirected": adjacency_json(&self.undirected, "types"),
            "sources": adjacency_json(&self.sources, "labels"),
            "targets": adjacency_json(&self.targets, "labels"),
        })
    }
}

fn token_json(token: &Token) -> Value {
    let mut map = Map::new();
    map.insert("value".into(), Value::String(token.value().to_owned()));
    map.insert("kind".into(), Value::String(token.kind().as_str().to_owned()));
    Value::Object(map)
}

fn tokens_json(tokens: &BTreeSet<Token>) -> Value {
    Value::Array(tokens.iter().map(token_json).collect())
}

fn property_json(property: &Property) -> Value {
    json!({
        "name": property.name(),
        "owning_tokens": tokens_json(property.owning_tokens()),
        "container": property.container().as_str(),
    })
}

fn adjacency_json(map: &BTreeMap<Token, BTreeSet<Token>>, field: &str) -> Value {
    Value::Array(
        map.iter()
            .map(|(token, related)| {
                let mut entry = Map::new();
                entry.insert("token".into(), token_json(token));
                entry.insert(field.into(), tokens_json(related));
                Value::Object(entry)
            })
            .collect(),
    )
}

// ============================================================================
// Accumulation
// ============================================================================

/// Mutable side of a catalog, private to the visitor.
#[derive(Debug, Default)]
pub(crate) struct CatalogBuilder {
    catalog: StatementCatalog,
}

impl CatalogBuilder {
    pub(crate) fn add_label(&mut self, label: &Token) {
        self.catalog.node_labels.insert(label.clone());
    }

    pub(crate) fn add_type(&mut self, rel_type: &Token) {
        self.catalog.relationship_types.insert(rel_type.clone());
    }

    fn add_token(&mut self, token: &Token) {
        if token.is_label() {
            self.add_label(token);
        } else {
            self.add_type(token);
        }
    }

    pub(crate) fn add_property(&mut self, property: Property) {
        for token in property.owning_tokens() {
            self.add_token(token);
        }
        self.catalog.properties.insert(property);
    }

    pub(crate) fn add_parameter(&mut self, name: &str) {
        self.catalog.parameter_names.insert(name.to_owned());
    }

    /// Record one relationship type between the labels written on its left
    /// and right as seen in the pattern text.
    pub(crate) fn add_relationship(
        &mut self,
        rel_type: &Token,
        direction: PatternDirection,
        left: &BTreeSet<Token>,
        right: &BTreeSet<Token>,
    ) {
        self.add_type(rel_type);
        for label in left.iter().chain(right) {
            self.add_label(label);
        }
        let (start, end) = match direction {
            PatternDirection::Outgoing => (left, right),
            PatternDirection::Incoming => (right, left),
            PatternDirection::Undirected => {
                for label in left.iter().chain(right) {
                    link(&mut self.catalog.undirected, label, rel_type);
                }
                return;
            }
        };
        for label in start {
            link(&mut self.catalog.outgoing, label, rel_type);
            link(&mut self.catalog.sources, rel_type, label);
        }
        for label in end {
            link(&mut self.catalog.incoming, label, rel_type);
            link(&mut self.catalog.targets, rel_type, label);
        }
    }

    pub(crate) fn build(self) -> StatementCatalog {
        self.catalog
    }
}

fn link(map: &mut BTreeMap<Token, BTreeSet<Token>>, key: &Token, value: &Token) {
    map.entry(key.clone()).or_default().insert(value.clone());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(v: &str) -> Token {
        Token::label(v).unwrap()
    }

    fn rel(v: &str) -> Token {
        Token::relationship_type(v).unwrap()
    }

    #[test]
    fn test_unknown_tokens_return_empty() {
        let catalog = StatementCatalog::default();
        assert!(catalog.outgoing_types(&label("Nope")).is_empty());
        assert!(catalog.source_labels(&rel("NOPE")).is_empty());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_directed_relationship_populates_both_sides() {
        let mut b = CatalogBuilder::default();
        let left = BTreeSet::from([label("Movie")]);
        let right = BTreeSet::from([label("Person")]);
        b.add_relationship(&rel("ACTED_IN"), PatternDirection::Incoming, &left, &right);
        let c = b.build();
        assert!(c.outgoing_types(&label("Person")).contains(&rel("ACTED_IN")));
        assert!(c.incoming_types(&label("Movie")).contains(&rel("ACTED_IN")));
        assert_eq!(c.source_labels(&rel("ACTED_IN")), &BTreeSet::from([label("Person")]));
        assert_eq!(c.target_labels(&rel("ACTED_IN")), &BTreeSet::from([label("Movie")]));
        assert_eq!(c.node_labels().len(), 2);
    }

    #[test]
    fn test_undirected_skips_sources_and_targets() {
        let mut b = CatalogBuilder::default();
        let x = BTreeSet::from([label("X")]);
        let y = BTreeSet::from([label("Y")]);
        b.add_relationship(&rel("U"), PatternDirection::Undirected, &x, &y);
        let c = b.build();
        assert!(c.undirected_types(&label("X")).contains(&rel("U")));
        assert!(c.undirected_types(&label("Y")).contains(&rel("U")));
        assert!(c.source_labels(&rel("U")).is_empty());
        assert!(c.target_labels(&rel("U")).is_empty());
    }

    #[test]
    fn test_property_tokens_join_top_level_sets() {
        let mut b = CatalogBuilder::default();
        b.add_property(Property::on_relationship("since", [rel("KNOWS")]).unwrap());
        let c = b.build();
        assert!(c.relationship_types().contains(&rel("KNOWS")));
        assert_eq!(c.properties_of(&rel("KNOWS")).count(), 1);
    }

    #[test]
    fn test_json_export() {
        let mut b = CatalogBuilder::default();
        b.add_property(Property::on_node("title", [label("Movie")]).unwrap());
        b.add_parameter("born");
        let json = b.build().to_json();
        assert_eq!(json["node_labels"][0]["value"], "Movie");
        assert_eq!(json["node_labels"][0]["kind"], "NODE_LABEL");
        assert_eq!(json["properties"][0]["name"], "title");
        assert_eq!(json["properties"][0]["container"], "node");
        assert_eq!(json["parameter_names"][0], "born");
    }
}
