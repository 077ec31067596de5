//! Reserved words and identifier quoting.

use std::borrow::Cow;

/// Words that cannot appear bare as a label, type, variable or key.
/// Matched case-insensitively.
const RESERVED: &[&str] = &[
    "ALL", "AND", "ANY", "AS", "ASC", "ASCENDING", "BY", "CALL", "CASE", "CONSTRAINT",
    "CONTAINS", "CREATE", "DELETE", "DESC", "DESCENDING", "DETACH", "DISTINCT", "DROP",
    "ELSE", "END", "ENDS", "EXISTS", "FALSE", "FOR", "IN", "INDEX", "IS", "LIMIT", "MATCH",
    "MERGE", "NONE", "NOT", "NULL", "ON", "OPTIONAL", "OR", "ORDER", "REMOVE", "RETURN",
    "SET", "SINGLE", "SKIP", "STARTS", "THEN", "TRUE", "UNION", "UNWIND", "WHEN", "WHERE",
    "WITH", "XOR", "YIELD",
];

/// True if `word` is a reserved word in any letter case.
pub fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(word))
}

/// Bare identifiers that read back as float literals.
const FLOAT_WORDS: &[&str] = &["NaN", "Infinity"];

/// True if `name` cannot be written bare.
pub fn needs_escaping(name: &str) -> bool {
    if FLOAT_WORDS.contains(&name) {
        return true;
    }
    let mut chars = name.chars();
    match chars.next() {
        None => true,
        Some(first) if first.is_ascii_digit() => true,
        Some(_) => {
            !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') || is_reserved(name)
        }
    }
}

/// Render `name` as an identifier, backtick-quoting it when required or when
/// `always` is set. Embedded backticks are doubled.
pub fn escape_name(name: &str, always: bool) -> Cow<'_, str> {
    if always || needs_escaping(name) {
        Cow::Owned(format!("`{}`", name.replace('`', "``")))
    } else {
        Cow::Borrowed(name)
    }
}

/// Like [`escape_name`] for a name written after `$`, where float words
/// cannot be mistaken for literals.
pub fn escape_parameter(name: &str) -> Cow<'_, str> {
    if FLOAT_WORDS.contains(&name) {
        Cow::Borrowed(name)
    } else {
        escape_name(name, false)
    }
}
