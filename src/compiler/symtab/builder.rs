//! Symbol table construction pass

use super::{ParamSig, ScopeStack, SymbolKind, SymbolTable, GLOBAL_SCOPE};
use crate::parser::{Block, Call, Declaration, Expr, FunDecl, Program, Statement, TypeSpec, VarDecl, VarRef};

/// Built-in `input(): int`
pub const INPUT_INTRINSIC: &str = "input";
/// Built-in `output(int): void`
pub const OUTPUT_INTRINSIC: &str = "output";

/// Walks the AST once, inserting every declaration and recording every use line
pub struct SymbolTableBuilder {
    table: SymbolTable,
    scopes: ScopeStack,
}

impl SymbolTableBuilder {
    /// Builder with the intrinsics pre-registered at line 0
    pub fn new() -> Self {
        let mut table = SymbolTable::new();
        table.insert_function(INPUT_INTRINSIC, 0, TypeSpec::Int, vec![]);
        table.insert_function(
            OUTPUT_INTRINSIC,
            0,
            TypeSpec::Void,
            vec![ParamSig {
                ty: TypeSpec::Int,
                is_array: false,
            }],
        );
        Self {
            table,
            scopes: ScopeStack::new(),
        }
    }

    /// Build the table for `program`
    pub fn build(mut self, program: &Program) -> SymbolTable {
        for decl in &program.declarations {
            match decl {
                Declaration::Variable(var) => self.declare_variable(var, SymbolKind::Variable),
                Declaration::Function(fun) => self.declare_function(fun),
            }
        }
        debug_assert!(self.scopes.is_empty());
        tracing::debug!(entries = self.table.len(), "symbol table built");
        self.table
    }

    fn with_scope<R>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.scopes.push(name);
        let result = f(self);
        self.scopes.pop();
        result
    }

    fn declare_variable(&mut self, var: &VarDecl, kind: SymbolKind) {
        let scope = self.scopes.current().to_string();
        self.table.insert(
            &var.name,
            var.line,
            &scope,
            kind,
            var.ty,
            var.array_size.is_some(),
            var.array_size.unwrap_or(0),
        );
    }

    fn declare_function(&mut self, fun: &FunDecl) {
        let signature = fun
            .params
            .iter()
            .map(|p| ParamSig {
                ty: p.ty,
                is_array: p.is_array,
            })
            .collect();
        self.table
            .insert_function(&fun.name, fun.line, fun.return_type, signature);

        self.with_scope(&fun.name, |b| {
            for param in &fun.params {
                b.table.insert(
                    &param.name,
                    param.line,
                    &fun.name,
                    SymbolKind::Parameter,
                    param.ty,
                    param.is_array,
                    0,
                );
            }
            b.block(&fun.body);
        });
    }

    fn block(&mut self, block: &Block) {
        let scope = self.scopes.current().to_string();
        self.with_scope(&scope, |b| {
            for local in &block.locals {
                b.declare_variable(local, SymbolKind::Variable);
            }
            for stmt in &block.statements {
                b.statement(stmt);
            }
        });
    }

    fn statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Block(block) => self.block(block),
            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.expr(condition);
                self.statement(then_branch);
                if let Some(else_branch) = else_branch {
                    self.statement(else_branch);
                }
            }
            Statement::While {
                condition, body, ..
            } => {
                self.expr(condition);
                self.statement(body);
            }
            Statement::Return { value, .. } => {
                if let Some(value) = value {
                    self.expr(value);
                }
            }
            Statement::Assign { target, value, .. } => {
                self.var_ref(target);
                self.expr(value);
            }
            Statement::Call(call) => self.call(call),
            Statement::Empty { .. } => {}
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Number { .. } => {}
            Expr::Var(var) => self.var_ref(var),
            Expr::Call(call) => self.call(call),
            Expr::Binary { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
            }
        }
    }

    fn var_ref(&mut self, var: &VarRef) {
        self.record_use(&var.name, var.line);
        if let Some(index) = &var.index {
            self.expr(index);
        }
    }

    fn call(&mut self, call: &Call) {
        self.record_use(&call.callee, call.line);
        for arg in &call.args {
            self.expr(arg);
        }
    }

    /// Append `line` to the visible entry for `name`; unresolved names are left
    /// for the analyzer to report.
    fn record_use(&mut self, name: &str, line: usize) {
        let Some(entry) = self.table.resolve(name, self.scopes.current()) else {
            return;
        };
        let (scope, kind, ty, is_array, size) = (
            entry.scope.clone(),
            entry.kind,
            entry.data_type,
            entry.is_array,
            entry.array_size,
        );
        self.table
            .insert(name, line, &scope, kind, ty, is_array, size);
    }
}

impl Default for SymbolTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}
