//! # Cypher Language
//!
//! AST, builder, renderer and the event bridge for external parsers.
//! Pure functions: no I/O, no global state.

pub mod ast;
pub mod bridge;
pub mod builder;
pub mod keywords;
pub mod precedence;
pub mod render;

pub use render::render;
