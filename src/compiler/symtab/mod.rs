//! # Scope & Symbol Table
//!
//! Entries are keyed by `(name, scope)`. Each name owns a chain of entries in
//! insertion order, one per scope that declared it; the chain head is the most
//! recently inserted entry.
//!
//! ```text
//! "x" → [ (x, global) , (x, foo) ]      lookup("x")             → (x, foo)
//!                                        lookup_in_scope("x", g) → (x, global)
//! ```
//!
//! [`SymbolTable::lookup`] keeps the head-of-chain behavior: it answers the
//! newest declaration of a name anywhere, not the innermost enclosing one.
//! Name resolution inside a function goes through [`SymbolTable::resolve`].

mod builder;
mod scope;

pub use builder::SymbolTableBuilder;
pub use scope::ScopeStack;

use crate::parser::TypeSpec;
use std::collections::HashMap;
use std::fmt;

/// Name of the outermost scope
pub const GLOBAL_SCOPE: &str = "global";

/// What a symbol names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Global or local variable
    Variable,
    /// Function parameter
    Parameter,
    /// Function
    Function,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Variable => write!(f, "variable"),
            SymbolKind::Parameter => write!(f, "parameter"),
            SymbolKind::Function => write!(f, "function"),
        }
    }
}

/// Type and array-ness of one declared parameter position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSig {
    /// Element type
    pub ty: TypeSpec,
    /// Passed as an array reference
    pub is_array: bool,
}

/// One symbol table entry, unique per `(name, scope)`
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolEntry {
    /// Declared name
    pub name: String,
    /// Owning scope name
    pub scope: String,
    /// Variable, parameter or function
    pub kind: SymbolKind,
    /// Declared type (result type for functions)
    pub data_type: TypeSpec,
    /// Memory slot, assigned once from the table's counter
    pub slot: usize,
    /// Declared as array
    pub is_array: bool,
    /// Declared array length (0 for scalars and array parameters)
    pub array_size: i64,
    /// Source lines of the declaration followed by every use, never empty
    pub lines: Vec<usize>,
    /// Parameter signature, only populated for functions
    pub params: Vec<ParamSig>,
}

impl SymbolEntry {
    /// Line of the first insertion (the declaration)
    pub fn declared_line(&self) -> usize {
        self.lines[0]
    }
}

/// Hash-chained symbol table keyed by `(name, scope)`
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    /// Entries in insertion order
    entries: Vec<SymbolEntry>,
    /// Name -> entry indices, oldest first
    chains: HashMap<String, Vec<usize>>,
    /// Next memory slot
    next_slot: usize,
}

impl SymbolTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a declaration or record a use.
    ///
    /// A new `(name, scope)` pair gets the next memory slot and a single-line
    /// history. An existing pair gets `line` appended and its array flag and
    /// size overwritten; kind and type are kept. Returns the entry's slot, or
    /// `None` when `name` or `scope` is empty.
    #[allow(clippy::too_many_arguments)]
    pub fn insert(
        &mut self,
        name: &str,
        line: usize,
        scope: &str,
        kind: SymbolKind,
        data_type: TypeSpec,
        is_array: bool,
        array_size: i64,
    ) -> Option<usize> {
        if name.is_empty() || scope.is_empty() {
            tracing::warn!(
                name,
                scope,
                line,
                "rejected symbol insertion with missing name or scope"
            );
            return None;
        }

        if let Some(idx) = self.index_in_scope(name, scope) {
            let entry = &mut self.entries[idx];
            entry.lines.push(line);
            entry.is_array = is_array;
            entry.array_size = array_size;
            return Some(entry.slot);
        }

        let slot = self.next_slot;
        self.next_slot += 1;
        let idx = self.entries.len();
        self.entries.push(SymbolEntry {
            name: name.to_string(),
            scope: scope.to_string(),
            kind,
            data_type,
            slot,
            is_array,
            array_size,
            lines: vec![line],
            params: Vec::new(),
        });
        self.chains.entry(name.to_string()).or_default().push(idx);
        Some(slot)
    }

    /// Insert a global function with its parameter signature.
    ///
    /// The signature is recorded only when the entry is created.
    pub fn insert_function(
        &mut self,
        name: &str,
        line: usize,
        return_type: TypeSpec,
        params: Vec<ParamSig>,
    ) -> Option<usize> {
        let existed = self.index_in_scope(name, GLOBAL_SCOPE).is_some();
        let slot = self.insert(
            name,
            line,
            GLOBAL_SCOPE,
            SymbolKind::Function,
            return_type,
            false,
            0,
        )?;
        if !existed {
            if let Some(idx) = self.index_in_scope(name, GLOBAL_SCOPE) {
                self.entries[idx].params = params;
            }
        }
        Some(slot)
    }

    /// Newest entry for `name` in any scope (head of its chain)
    pub fn lookup(&self, name: &str) -> Option<&SymbolEntry> {
        self.chains
            .get(name)
            .and_then(|chain| chain.last())
            .map(|&idx| &self.entries[idx])
    }

    /// Entry for exactly `(name, scope)`
    pub fn lookup_in_scope(&self, name: &str, scope: &str) -> Option<&SymbolEntry> {
        self.index_in_scope(name, scope).map(|idx| &self.entries[idx])
    }

    /// Innermost visible entry from `scope`: the scope itself, then global
    pub fn resolve(&self, name: &str, scope: &str) -> Option<&SymbolEntry> {
        self.lookup_in_scope(name, scope)
            .or_else(|| self.lookup_in_scope(name, GLOBAL_SCOPE))
    }

    /// Global function entry named `name`
    pub fn function(&self, name: &str) -> Option<&SymbolEntry> {
        self.lookup_in_scope(name, GLOBAL_SCOPE)
            .filter(|e| e.kind == SymbolKind::Function)
    }

    /// Entries in insertion order
    pub fn entries(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was inserted
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn index_in_scope(&self, name: &str, scope: &str) -> Option<usize> {
        self.chains
            .get(name)?
            .iter()
            .rev()
            .copied()
            .find(|&idx| self.entries[idx].scope == scope)
    }
}
