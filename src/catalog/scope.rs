//! Lexical scopes of variable bindings.

use std::collections::BTreeSet;

use hashbrown::HashMap;

use crate::model::{PropertyContainer, Token};

/// What the catalog knows about one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Whether the variable names nodes or relationships. Fixed by the first
    /// binding site.
    pub kind: PropertyContainer,
    /// Union of every label or type written on the variable so far.
    pub tokens: BTreeSet<Token>,
}

/// Stack of scopes, innermost last. The root scope lives as long as the
/// chain.
#[derive(Debug, Clone)]
pub struct ScopeChain {
    scopes: Vec<HashMap<String, Binding>>,
}

impl Default for ScopeChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeChain {
    pub fn new() -> Self {
        Self { scopes: vec![HashMap::new()] }
    }

    /// Number of open scopes, root included.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Drop the innermost scope and every name introduced in it. Returns
    /// `false` at the root, which is never dropped.
    pub fn pop(&mut self) -> bool {
        if self.scopes.len() == 1 {
            return false;
        }
        self.scopes.pop();
        true
    }

    /// Look `name` up from the innermost scope outwards.
    pub fn resolve(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Union `tokens` into the visible binding of `name`, or introduce the
    /// name in the innermost scope if nothing binds it yet.
    pub fn bind(
        &mut self,
        name: &str,
        kind: PropertyContainer,
        tokens: impl IntoIterator<Item = Token>,
    ) -> &Binding {
        let last = self.scopes.len() - 1;
        let at = self.scopes.iter().rposition(|scope| scope.contains_key(name)).unwrap_or(last);
        let binding = self.scopes[at]
            .entry_ref(name)
            .or_insert_with(|| Binding { kind, tokens: BTreeSet::new() });
        binding.tokens.extend(tokens);
        binding
    }
}
