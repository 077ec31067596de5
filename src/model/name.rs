//! Symbolic names (variables) used to identify pattern elements and values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A variable name such as `n` in `MATCH (n)`. Stored unescaped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolicName(String);

impl SymbolicName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidIdentifier { kind: "symbolic name".into(), value: name });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SymbolicName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(SymbolicName::new(""), Err(Error::InvalidIdentifier { .. })));
    }

    #[test]
    fn test_name_keeps_raw_text() {
        let n = SymbolicName::new("my var").unwrap();
        assert_eq!(n.as_str(), "my var");
    }
}
