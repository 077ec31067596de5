//! # cypher-dsl: Cypher Query Model
//!
//! An immutable model of Cypher's abstract syntax, a renderer that turns it
//! back into canonical query text, and an analysis pass that recovers a
//! schema catalog (labels, relationship types, how they connect, and which
//! properties they carry) from a finished statement.
//!
//! ## Design Principles
//!
//! 1. **Closed taxonomy**: the AST is a set of enums; renderer and catalog
//!    visitor match on them exhaustively
//! 2. **Write-once trees**: builder steps return new values, a finalized
//!    statement is never mutated
//! 3. **Pure functions**: building, rendering and cataloging do no I/O and
//!    hold no global state
//! 4. **Parser at arm's length**: text goes in through the event bridge, driven
//!    by any external grammar
//!
//! ## Quick Start
//!
//! ```rust
//! use cypher_dsl::cypher::builder::{node, StatementBuilder};
//! use cypher_dsl::{Expr, Token};
//!
//! # fn example() -> cypher_dsl::Result<()> {
//! let movie = node("Movie")?.named("m")?.with_property("title", "The Matrix")?;
//! let person = node("Person")?.named("p")?;
//! let statement = StatementBuilder::new()
//!     .matching([movie.relationship_from(person, ["ACTED_IN"])?])?
//!     .where_(Expr::var("p")?.property("born")?.gte(Expr::param("born")?))?
//!     .returning([Expr::var("p")?])?
//!     .build()?;
//!
//! assert_eq!(
//!     statement.cypher()?,
//!     "MATCH (m:Movie {title: 'The Matrix'})<-[:ACTED_IN]-(p:Person) WHERE p.born >= $born RETURN p",
//! );
//!
//! let catalog = statement.catalog()?;
//! assert!(catalog.outgoing_types(&Token::label("Person")?).contains(&Token::relationship_type("ACTED_IN")?));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod cypher;
pub mod catalog;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{Property, PropertyContainer, SymbolicName, Token, TokenKind};

pub use cypher::ast::{
    Clause, Expr, Literal, MapExpr, NodePattern, Parameter, Pattern, PatternDirection,
    PatternElement, RelPattern, Statement,
};
pub use cypher::builder::StatementBuilder;
pub use cypher::render::{RenderConfig, Renderer};
pub use cypher::bridge::{Event, EventSink, TreeBuilder};

pub use catalog::{CatalogVisitor, StatementCatalog};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Invalid {kind}: {value:?}")]
    InvalidIdentifier { kind: String, value: String },

    #[error("Statement builder has already been finalized")]
    BuilderAlreadyFinalized,

    #[error("No precedence defined for operator '{operator}'")]
    AmbiguousPrecedence { operator: String },

    #[error("Unsupported node kind: {0}")]
    UnsupportedNodeKind(String),

    #[error("Misplaced clause: {0}")]
    MisplacedClause(String),

    #[error("No symbolic name present on {0}")]
    NoSymbolicName(String),
}

pub type Result<T> = std::result::Result<T, Error>;
