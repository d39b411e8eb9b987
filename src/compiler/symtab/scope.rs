//! Lexical scope stack

use super::GLOBAL_SCOPE;

/// LIFO stack of scope names; the top is the current scope
#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    names: Vec<String>,
}

impl ScopeStack {
    /// Creates an empty stack (current scope is global)
    pub fn new() -> Self {
        Self { names: Vec::new() }
    }

    /// Enter a named scope
    pub fn push(&mut self, name: &str) {
        self.names.push(name.to_string());
    }

    /// Leave the current scope; popping an empty stack is reported and ignored
    pub fn pop(&mut self) -> Option<String> {
        let popped = self.names.pop();
        if popped.is_none() {
            tracing::warn!("scope stack underflow: pop on empty stack ignored");
        }
        popped
    }

    /// Name of the innermost scope, or the global sentinel when empty
    pub fn current(&self) -> &str {
        self.names.last().map(String::as_str).unwrap_or(GLOBAL_SCOPE)
    }

    /// Number of open scopes
    pub fn depth(&self) -> usize {
        self.names.len()
    }

    /// True when only the global scope is active
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
