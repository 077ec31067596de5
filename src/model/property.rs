//! Properties as seen by the catalog: a name owned by a set of tokens.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Token;
use crate::{Error, Result};

/// Whether a property lives on nodes or on relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyContainer {
    Node,
    Relationship,
}

impl PropertyContainer {
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyContainer::Node => "node",
            PropertyContainer::Relationship => "relationship",
        }
    }
}

/// A property name together with the whole token set that owns it.
///
/// `(p:Person|Actor {b: true})` yields one property `b` owned by
/// `{Actor, Person}`, not one property per label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Property {
    name: String,
    owning_tokens: BTreeSet<Token>,
    container: PropertyContainer,
}

impl Property {
    pub fn new(
        name: impl Into<String>,
        owning_tokens: impl IntoIterator<Item = Token>,
        container: PropertyContainer,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidIdentifier { kind: "property name".into(), value: name });
        }
        Ok(Self { name, owning_tokens: owning_tokens.into_iter().collect(), container })
    }

    /// A node property owned by the given labels.
    pub fn on_node(name: impl Into<String>, labels: impl IntoIterator<Item = Token>) -> Result<Self> {
        Self::new(name, labels, PropertyContainer::Node)
    }

    /// A relationship property owned by the given types.
    pub fn on_relationship(
        name: impl Into<String>,
        types: impl IntoIterator<Item = Token>,
    ) -> Result<Self> {
        Self::new(name, types, PropertyContainer::Relationship)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owning_tokens(&self) -> &BTreeSet<Token> {
        &self.owning_tokens
    }

    pub fn container(&self) -> PropertyContainer {
        self.container
    }
}
