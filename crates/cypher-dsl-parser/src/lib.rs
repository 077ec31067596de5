//! # cypher-dsl-parser
//!
//! Reads Cypher text and drives the `cypher-dsl` event bridge, so parsed
//! statements come out as the same [`Statement`] trees the builder produces
//! and can be rendered or cataloged like any other.
//!
//! ```
//! use cypher_dsl::Token;
//!
//! let statement = cypher_dsl_parser::parse(
//!     "MATCH (m:Movie)<-[:ACTED_IN]-(p:Person) WHERE p.born >= $born RETURN p",
//! )?;
//! let catalog = statement.catalog()?;
//! assert!(catalog.source_labels(&Token::relationship_type("ACTED_IN")?).contains(&Token::label("Person")?));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod lexer;
mod parser;

pub use lexer::{tokenize, Span, Token, TokenKind};

use cypher_dsl::{EventSink, Statement, TreeBuilder};
use tracing::debug;

/// Parser error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// The sink rejected an event.
    #[error(transparent)]
    Tree(#[from] cypher_dsl::Error),
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Parse one statement into an AST.
pub fn parse(query: &str) -> Result<Statement> {
    let mut builder = TreeBuilder::new();
    parse_into(query, &mut builder)?;
    Ok(builder.finish()?)
}

/// Parse one statement, reporting it to `sink` as bridge events.
pub fn parse_into<S: EventSink>(query: &str, sink: &mut S) -> Result<()> {
    let tokens = tokenize(query)?;
    debug!(tokens = tokens.len(), "parsing statement");
    parser::parse_tokens(&tokens, sink)
}
