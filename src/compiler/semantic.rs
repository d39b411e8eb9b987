//! # Semantic Analyzer
//!
//! One traversal over the AST against a built [`SymbolTable`], applying the
//! declaration, typing, call and program-shape rules. Analysis never stops at
//! the first problem: every subtree is visited so independent errors surface
//! in the same run. Errors naming an identifier are reported once per name per
//! run.

use super::symtab::{ScopeStack, SymbolEntry, SymbolKind, SymbolTable, GLOBAL_SCOPE};
use crate::parser::{
    Block, Call, Declaration, Expr, FunDecl, Param, Program, Statement, TypeSpec, VarDecl, VarRef,
};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Static type of an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExprType {
    /// Ground type
    pub base: TypeSpec,
    /// Whole-array value (an unindexed array name)
    pub is_array: bool,
}

impl ExprType {
    /// Scalar `int`
    pub const INT: ExprType = ExprType {
        base: TypeSpec::Int,
        is_array: false,
    };

    fn scalar(base: TypeSpec) -> Self {
        Self {
            base,
            is_array: false,
        }
    }

    fn of_entry(entry: &SymbolEntry) -> Self {
        Self {
            base: entry.data_type,
            is_array: entry.is_array && entry.kind != SymbolKind::Function,
        }
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_array {
            write!(f, "{}[]", self.base)
        } else {
            write!(f, "{}", self.base)
        }
    }
}

/// Semantic rule violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticError {
    /// Same name declared twice in one scope
    #[error("line {line}: '{name}' already declared (first declared at line {first_line})")]
    AlreadyDeclared {
        /// Identifier
        name: String,
        /// Line of the repeated declaration
        line: usize,
        /// Line of the original declaration
        first_line: usize,
    },

    /// Variable shares its name with a global function
    #[error("line {line}: '{name}' declared with function's name")]
    FunctionNameClash {
        /// Identifier
        name: String,
        /// Declaration line
        line: usize,
    },

    /// Variable or parameter declared `void`
    #[error("line {line}: '{name}' declared as void")]
    VoidVariable {
        /// Identifier
        name: String,
        /// Declaration line
        line: usize,
    },

    /// Array declared with a size below one
    #[error("line {line}: array '{name}' declared with invalid size {size}")]
    InvalidArraySize {
        /// Identifier
        name: String,
        /// Declaration line
        line: usize,
        /// Declared size
        size: i64,
    },

    /// Use of a name with no visible declaration
    #[error("line {line}: '{name}' undeclared")]
    Undeclared {
        /// Identifier
        name: String,
        /// Use line
        line: usize,
    },

    /// Assignment between different static types
    #[error("line {line}: incompatible types in assignment to '{name}' ({target} = {value})")]
    IncompatibleTypes {
        /// Assigned identifier
        name: String,
        /// Assignment line
        line: usize,
        /// Type of the left side
        target: String,
        /// Type of the right side
        value: String,
    },

    /// Indexing something that is not an array
    #[error("line {line}: '{name}' is not an array")]
    NotAnArray {
        /// Identifier
        name: String,
        /// Access line
        line: usize,
    },

    /// Index expression that is not a scalar `int`
    #[error("line {line}: index of '{name}' is not an int")]
    NonIntegerIndex {
        /// Identifier
        name: String,
        /// Access line
        line: usize,
    },

    /// Constant index outside `0..size`
    #[error("line {line}: index {index} out of bounds for '{name}' of size {size}")]
    IndexOutOfBounds {
        /// Identifier
        name: String,
        /// Access line
        line: usize,
        /// Literal index
        index: i64,
        /// Declared size
        size: i64,
    },

    /// Calling a name that is not a function
    #[error("line {line}: '{name}' is not a function")]
    NotAFunction {
        /// Identifier
        name: String,
        /// Call line
        line: usize,
    },

    /// Wrong number of arguments
    #[error("line {line}: '{name}' called with {called} argument(s) but declared with {declared}")]
    ArityMismatch {
        /// Callee
        name: String,
        /// Call line
        line: usize,
        /// Arguments supplied
        called: usize,
        /// Parameters declared
        declared: usize,
    },

    /// Argument type or array-ness differs from the parameter
    #[error("line {line}: argument {position} of '{name}' has type {found}, expected {expected}")]
    ArgumentMismatch {
        /// Callee
        name: String,
        /// Call line
        line: usize,
        /// One-based argument position
        position: usize,
        /// Declared parameter type
        expected: String,
        /// Supplied argument type
        found: String,
    },

    /// Program without any declaration
    #[error("program has no declarations")]
    NoDeclarations,

    /// No function named `main`
    #[error("main not declared")]
    MainNotDeclared,

    /// `main` exists but another function follows it
    #[error("last declared function is '{last}', expected main")]
    MainNotLast {
        /// Name of the last declared function
        last: String,
    },
}

impl SemanticError {
    /// Identifier used to suppress repeated reports in one run
    pub fn dedup_key(&self) -> Option<&str> {
        match self {
            SemanticError::AlreadyDeclared { name, .. }
            | SemanticError::FunctionNameClash { name, .. }
            | SemanticError::VoidVariable { name, .. }
            | SemanticError::InvalidArraySize { name, .. }
            | SemanticError::Undeclared { name, .. }
            | SemanticError::IncompatibleTypes { name, .. }
            | SemanticError::NotAnArray { name, .. }
            | SemanticError::NonIntegerIndex { name, .. }
            | SemanticError::IndexOutOfBounds { name, .. }
            | SemanticError::NotAFunction { name, .. }
            | SemanticError::ArityMismatch { name, .. } => Some(name),
            SemanticError::ArgumentMismatch { .. }
            | SemanticError::NoDeclarations
            | SemanticError::MainNotDeclared
            | SemanticError::MainNotLast { .. } => None,
        }
    }
}

/// Errors collected by one analysis run
#[derive(Debug, Clone, Default)]
pub struct SemanticReport {
    /// Reported errors in discovery order
    pub errors: Vec<SemanticError>,
}

impl SemanticReport {
    /// Number of reported errors
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// True when the program passed every rule
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of errors matching `pred`
    pub fn count(&self, pred: impl Fn(&SemanticError) -> bool) -> usize {
        self.errors.iter().filter(|e| pred(e)).count()
    }
}

/// Semantic analysis pass
pub struct SemanticAnalyzer<'t> {
    table: &'t SymbolTable,
    scopes: ScopeStack,
    /// Names that already produced an error this run
    reported: HashSet<String>,
    report: SemanticReport,
}

impl<'t> SemanticAnalyzer<'t> {
    /// Analyzer over a table built for the same program
    pub fn new(table: &'t SymbolTable) -> Self {
        Self {
            table,
            scopes: ScopeStack::new(),
            reported: HashSet::new(),
            report: SemanticReport::default(),
        }
    }

    /// Run every rule over `program`
    pub fn analyze(&mut self, program: &Program) -> SemanticReport {
        self.reported.clear();
        self.report = SemanticReport::default();

        for decl in &program.declarations {
            match decl {
                Declaration::Variable(var) => self.check_var_decl(var),
                Declaration::Function(fun) => self.check_function(fun),
            }
        }
        self.check_program(program);

        tracing::debug!(errors = self.report.error_count(), "semantic analysis done");
        std::mem::take(&mut self.report)
    }

    fn report(&mut self, error: SemanticError) {
        if let Some(key) = error.dedup_key() {
            if !self.reported.insert(key.to_string()) {
                return;
            }
        }
        tracing::error!("semantic error: {}", error);
        self.report.errors.push(error);
    }

    fn with_scope<R>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.scopes.push(name);
        let result = f(self);
        self.scopes.pop();
        result
    }

    fn resolve(&self, name: &str) -> Option<&'t SymbolEntry> {
        self.table.resolve(name, self.scopes.current())
    }

    // =========================================================================
    // DECLARATIONS
    // =========================================================================

    fn check_var_decl(&mut self, var: &VarDecl) {
        self.check_declared_name(&var.name, var.ty, var.line);
        if let Some(size) = var.array_size {
            if size <= 0 {
                self.report(SemanticError::InvalidArraySize {
                    name: var.name.clone(),
                    line: var.line,
                    size,
                });
            }
        }
    }

    fn check_param(&mut self, param: &Param) {
        self.check_declared_name(&param.name, param.ty, param.line);
    }

    /// Rules shared by variables and parameters
    fn check_declared_name(&mut self, name: &str, ty: TypeSpec, line: usize) {
        let scope = self.scopes.current().to_string();
        if scope != GLOBAL_SCOPE && self.table.function(name).is_some() {
            self.report(SemanticError::FunctionNameClash {
                name: name.to_string(),
                line,
            });
        }

        if let Some(entry) = self.table.lookup_in_scope(name, &scope) {
            if entry.kind == SymbolKind::Function {
                self.report(SemanticError::FunctionNameClash {
                    name: name.to_string(),
                    line,
                });
            } else if entry.declared_line() != line {
                self.report(SemanticError::AlreadyDeclared {
                    name: name.to_string(),
                    line,
                    first_line: entry.declared_line(),
                });
            }
        }

        if ty == TypeSpec::Void {
            self.report(SemanticError::VoidVariable {
                name: name.to_string(),
                line,
            });
        }
    }

    fn check_function(&mut self, fun: &FunDecl) {
        if let Some(entry) = self.table.lookup_in_scope(&fun.name, GLOBAL_SCOPE) {
            if entry.declared_line() != fun.line {
                self.report(SemanticError::AlreadyDeclared {
                    name: fun.name.clone(),
                    line: fun.line,
                    first_line: entry.declared_line(),
                });
            }
        }

        self.with_scope(&fun.name, |a| {
            for param in &fun.params {
                a.check_param(param);
            }
            a.check_block(&fun.body);
        });
    }

    fn check_block(&mut self, block: &Block) {
        let scope = self.scopes.current().to_string();
        self.with_scope(&scope, |a| {
            for local in &block.locals {
                a.check_var_decl(local);
            }
            for stmt in &block.statements {
                a.check_statement(stmt);
            }
        });
    }

    // =========================================================================
    // STATEMENTS
    // =========================================================================

    fn check_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Block(block) => self.check_block(block),
            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.check_expr(condition);
                self.check_statement(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_statement(else_branch);
                }
            }
            Statement::While {
                condition, body, ..
            } => {
                self.check_expr(condition);
                self.check_statement(body);
            }
            Statement::Return { value, .. } => {
                if let Some(value) = value {
                    self.check_expr(value);
                }
            }
            Statement::Assign { target, value, line } => self.check_assign(target, value, *line),
            Statement::Call(call) => {
                self.check_call(call);
            }
            Statement::Empty { .. } => {}
        }
    }

    fn check_assign(&mut self, target: &VarRef, value: &Expr, line: usize) {
        let target_ty = self.check_var_ref(target);
        let value_ty = self.check_expr(value);

        // An unresolved side has already been reported as undeclared.
        if let (Some(target_ty), Some(value_ty)) = (target_ty, value_ty) {
            if target_ty != value_ty {
                self.report(SemanticError::IncompatibleTypes {
                    name: target.name.clone(),
                    line,
                    target: target_ty.to_string(),
                    value: value_ty.to_string(),
                });
            }
        }
    }

    // =========================================================================
    // EXPRESSIONS
    // =========================================================================

    /// Static type of `expr`, reporting every problem inside it.
    /// `None` means some identifier could not be resolved.
    fn check_expr(&mut self, expr: &Expr) -> Option<ExprType> {
        match expr {
            Expr::Number { .. } => Some(ExprType::INT),
            Expr::Var(var) => self.check_var_ref(var),
            Expr::Call(call) => self.check_call(call),
            Expr::Binary { lhs, rhs, .. } => {
                self.check_expr(lhs);
                self.check_expr(rhs);
                Some(ExprType::INT)
            }
        }
    }

    fn check_var_ref(&mut self, var: &VarRef) -> Option<ExprType> {
        if var.index.is_some() {
            return self.check_array_access(var);
        }
        match self.resolve(&var.name) {
            Some(entry) => Some(ExprType::of_entry(entry)),
            None => {
                self.report(SemanticError::Undeclared {
                    name: var.name.clone(),
                    line: var.line,
                });
                None
            }
        }
    }

    fn check_array_access(&mut self, var: &VarRef) -> Option<ExprType> {
        let entry = self.resolve(&var.name);
        let index_ty = var.index.as_deref().and_then(|index| self.check_expr(index));

        let Some(entry) = entry else {
            self.report(SemanticError::Undeclared {
                name: var.name.clone(),
                line: var.line,
            });
            return None;
        };

        if !entry.is_array {
            self.report(SemanticError::NotAnArray {
                name: var.name.clone(),
                line: var.line,
            });
        }

        if let Some(index_ty) = index_ty {
            if index_ty != ExprType::INT {
                self.report(SemanticError::NonIntegerIndex {
                    name: var.name.clone(),
                    line: var.line,
                });
            }
        }

        if let Some(Expr::Number { value, .. }) = var.index.as_deref() {
            let size = entry.array_size;
            let out_of_range = *value < 0 || (entry.is_array && size > 0 && *value >= size);
            if out_of_range {
                self.report(SemanticError::IndexOutOfBounds {
                    name: var.name.clone(),
                    line: var.line,
                    index: *value,
                    size,
                });
            }
        }

        Some(ExprType::scalar(entry.data_type))
    }

    fn check_call(&mut self, call: &Call) -> Option<ExprType> {
        let arg_types: Vec<Option<ExprType>> =
            call.args.iter().map(|arg| self.check_expr(arg)).collect();

        let Some(entry) = self.table.lookup_in_scope(&call.callee, GLOBAL_SCOPE) else {
            self.report(SemanticError::Undeclared {
                name: call.callee.clone(),
                line: call.line,
            });
            return None;
        };

        if entry.kind != SymbolKind::Function {
            self.report(SemanticError::NotAFunction {
                name: call.callee.clone(),
                line: call.line,
            });
            return None;
        }

        if arg_types.len() != entry.params.len() {
            self.report(SemanticError::ArityMismatch {
                name: call.callee.clone(),
                line: call.line,
                called: arg_types.len(),
                declared: entry.params.len(),
            });
        } else {
            for (position, (arg_ty, param)) in arg_types.iter().zip(&entry.params).enumerate() {
                let expected = ExprType {
                    base: param.ty,
                    is_array: param.is_array,
                };
                if let Some(found) = arg_ty {
                    if *found != expected {
                        self.report(SemanticError::ArgumentMismatch {
                            name: call.callee.clone(),
                            line: call.line,
                            position: position + 1,
                            expected: expected.to_string(),
                            found: found.to_string(),
                        });
                    }
                }
            }
        }

        Some(ExprType::scalar(entry.data_type))
    }

    // =========================================================================
    // PROGRAM SHAPE
    // =========================================================================

    fn check_program(&mut self, program: &Program) {
        if program.declarations.is_empty() {
            self.report(SemanticError::NoDeclarations);
        }

        if self.table.function("main").is_none() {
            self.report(SemanticError::MainNotDeclared);
            return;
        }

        if let Some(last) = program.functions().last() {
            if last.name != "main" {
                self.report(SemanticError::MainNotLast {
                    last: last.name.clone(),
                });
            }
        }
    }
}
