//! Schema tokens: node labels and relationship types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// What a [`Token`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    NodeLabel,
    RelationshipType,
}

impl TokenKind {
    /// Serialized name, as used in JSON exports.
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::NodeLabel => "NODE_LABEL",
            TokenKind::RelationshipType => "RELATIONSHIP_TYPE",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::NodeLabel => write!(f, "node label"),
            TokenKind::RelationshipType => write!(f, "relationship type"),
        }
    }
}

/// A label or relationship type, keyed by its raw (unescaped) name.
///
/// Ordering is lexicographic on the value first and the kind second, which is
/// what every sorted view of a catalog relies on. Field order matters for the
/// derived `Ord`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Token {
    value: String,
    kind: TokenKind,
}

impl Token {
    /// Create a token of the given kind. Empty names are rejected.
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(Error::InvalidIdentifier { kind: kind.to_string(), value });
        }
        Ok(Self { value, kind })
    }

    /// A node label token.
    pub fn label(value: impl Into<String>) -> Result<Self> {
        Self::new(TokenKind::NodeLabel, value)
    }

    /// A relationship type token.
    pub fn relationship_type(value: impl Into<String>) -> Result<Self> {
        Self::new(TokenKind::RelationshipType, value)
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_label(&self) -> bool {
        self.kind == TokenKind::NodeLabel
    }

    pub fn is_relationship_type(&self) -> bool {
        self.kind == TokenKind::RelationshipType
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
