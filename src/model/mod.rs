//! # Schema Model
//!
//! Value objects shared by the AST, the renderer and the catalog: schema
//! tokens, symbolic names and properties.
//!
//! Design rule: pure data, structural equality, no references into any AST.

pub mod name;
pub mod property;
pub mod token;

pub use name::SymbolicName;
pub use property::{Property, PropertyContainer};
pub use token::{Token, TokenKind};
