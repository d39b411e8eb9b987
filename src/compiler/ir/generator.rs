//! IR Generator - transforms a checked AST into quadruples
//!
//! Expressions are generated target-first: the caller names the operand that
//! must hold the value and the expression fills it. Statements only emit at
//! their leaves and at control-flow decisions.
//!
//! ```text
//! if (c) s1 else s2          while (c) s
//!   <c -> t>                   LABEL Lc
//!   JUMPFALSE t, Le            <c -> t>
//!   <s1>                       JUMPTRUE t, Lb
//!   JUMP Lend                  JUMP Lend
//!   LABEL Le                   LABEL Lb
//!   <s2>                       <s>
//!   LABEL Lend                 JUMP Lc
//!                              LABEL Lend
//! ```

use super::instruction::{Opcode, Operand};
use super::program::IrProgram;
use crate::parser::{BinaryOp, Block, Call, Declaration, Expr, FunDecl, Program, Statement, VarRef};

/// AST-to-IR transformer; one instance per compilation unit
pub struct IrGenerator {
    /// Program under construction (owns the temp/label counters)
    program: IrProgram,
    /// Source line stamped on emitted quadruples
    current_line: usize,
}

impl IrGenerator {
    /// Create a generator with fresh counters
    pub fn new() -> Self {
        Self {
            program: IrProgram::new(),
            current_line: 0,
        }
    }

    /// Generate IR for every function of `program`.
    ///
    /// Global variables need no code. The generator is left empty afterwards.
    pub fn generate(&mut self, program: &Program) -> IrProgram {
        for decl in &program.declarations {
            if let Declaration::Function(fun) = decl {
                self.gen_function(fun);
            }
        }
        tracing::debug!(
            quads = self.program.len(),
            temps = self.program.temp_count(),
            labels = self.program.label_count(),
            "IR generated"
        );
        self.current_line = 0;
        std::mem::take(&mut self.program)
    }

    fn emit(
        &mut self,
        op: Opcode,
        arg1: Option<Operand>,
        arg2: Option<Operand>,
        result: Option<Operand>,
    ) {
        self.program.push(op, arg1, arg2, result, self.current_line);
    }

    fn at_line(&mut self, line: usize) {
        if line > 0 {
            self.current_line = line;
        }
    }

    // =========================================================================
    // STATEMENTS
    // =========================================================================

    fn gen_function(&mut self, fun: &FunDecl) {
        self.at_line(fun.line);
        self.emit(Opcode::Function, Some(Operand::name(&fun.name)), None, None);
        self.gen_block(&fun.body);
        self.emit(Opcode::End, Some(Operand::name(&fun.name)), None, None);
    }

    fn gen_block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.gen_statement(stmt);
        }
    }

    fn gen_statement(&mut self, stmt: &Statement) {
        self.at_line(stmt.line());
        match stmt {
            Statement::Block(block) => self.gen_block(block),

            Statement::Assign { target, value, .. } => self.gen_assign(target, value),

            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let cond = self.program.new_temp();
                self.gen_expr(condition, cond.clone());

                let else_label = self.program.new_label();
                let end_label = self.program.new_label();

                self.emit(Opcode::JumpFalse, Some(cond), None, Some(else_label.clone()));
                self.gen_statement(then_branch);
                self.emit(Opcode::Jump, None, None, Some(end_label.clone()));

                self.emit(Opcode::Label, Some(else_label), None, None);
                if let Some(else_branch) = else_branch {
                    self.gen_statement(else_branch);
                }
                self.emit(Opcode::Label, Some(end_label), None, None);
            }

            Statement::While {
                condition, body, ..
            } => {
                let cond_label = self.program.new_label();
                let body_label = self.program.new_label();
                let end_label = self.program.new_label();

                self.emit(Opcode::Label, Some(cond_label.clone()), None, None);
                let cond = self.program.new_temp();
                self.gen_expr(condition, cond.clone());
                self.emit(Opcode::JumpTrue, Some(cond), None, Some(body_label.clone()));
                self.emit(Opcode::Jump, None, None, Some(end_label.clone()));

                self.emit(Opcode::Label, Some(body_label), None, None);
                self.gen_statement(body);
                self.emit(Opcode::Jump, None, None, Some(cond_label));
                self.emit(Opcode::Label, Some(end_label), None, None);
            }

            Statement::Return { value, .. } => match value {
                Some(value) => {
                    let temp = self.program.new_temp();
                    self.gen_expr(value, temp.clone());
                    self.emit(Opcode::Return, Some(temp), None, None);
                }
                None => self.emit(Opcode::Return, None, None, None),
            },

            Statement::Call(call) => self.gen_call(call, None),

            Statement::Empty { .. } => {}
        }
    }

    fn gen_assign(&mut self, target: &VarRef, value: &Expr) {
        match &target.index {
            Some(index) => {
                let index_temp = self.program.new_temp();
                self.gen_expr(index, index_temp.clone());
                let value_temp = self.program.new_temp();
                self.gen_expr(value, value_temp.clone());
                self.emit(
                    Opcode::ArrayStore,
                    Some(value_temp),
                    Some(index_temp),
                    Some(Operand::name(&target.name)),
                );
            }
            None => {
                let value_temp = self.program.new_temp();
                self.gen_expr(value, value_temp.clone());
                self.emit(
                    Opcode::Assign,
                    Some(value_temp),
                    None,
                    Some(Operand::name(&target.name)),
                );
            }
        }
    }

    // =========================================================================
    // EXPRESSIONS
    // =========================================================================

    /// Generate `expr` so that its value ends up in `target`
    fn gen_expr(&mut self, expr: &Expr, target: Operand) {
        self.at_line(expr.line());
        match expr {
            Expr::Number { value, .. } => {
                self.emit(Opcode::Assign, Some(Operand::Const(*value)), None, Some(target));
            }

            Expr::Var(var) => match &var.index {
                Some(index) => {
                    let index_temp = self.program.new_temp();
                    self.gen_expr(index, index_temp.clone());
                    self.emit(
                        Opcode::ArrayLoad,
                        Some(Operand::name(&var.name)),
                        Some(index_temp),
                        Some(target),
                    );
                }
                None => {
                    self.emit(Opcode::Assign, Some(Operand::name(&var.name)), None, Some(target));
                }
            },

            Expr::Call(call) => self.gen_call(call, Some(target)),

            Expr::Binary { op, lhs, rhs, .. } => {
                let left = self.program.new_temp();
                let right = self.program.new_temp();
                self.gen_expr(lhs, left.clone());
                self.gen_expr(rhs, right.clone());
                self.emit(binary_opcode(*op), Some(left), Some(right), Some(target));
            }
        }
    }

    /// Evaluate arguments left to right, then pass them all and call.
    /// Without a target the result goes to a discard slot.
    fn gen_call(&mut self, call: &Call, target: Option<Operand>) {
        self.at_line(call.line);
        let mut arg_temps = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            let arg_temp = self.program.new_temp();
            self.gen_expr(arg, arg_temp.clone());
            arg_temps.push(arg_temp);
        }

        self.at_line(call.line);
        for (position, arg_temp) in arg_temps.into_iter().enumerate() {
            self.emit(
                Opcode::Param,
                Some(arg_temp),
                Some(Operand::Const(position as i64)),
                None,
            );
        }

        let result = target.unwrap_or_else(|| self.program.new_discard());
        self.emit(
            Opcode::Call,
            Some(Operand::name(&call.callee)),
            Some(Operand::Const(call.args.len() as i64)),
            Some(result),
        );
    }
}

impl Default for IrGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn binary_opcode(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Div,
        BinaryOp::Lt => Opcode::Lt,
        BinaryOp::LtEq => Opcode::Le,
        BinaryOp::Gt => Opcode::Gt,
        BinaryOp::GtEq => Opcode::Ge,
        BinaryOp::Eq => Opcode::Eq,
        BinaryOp::NotEq => Opcode::Ne,
    }
}
