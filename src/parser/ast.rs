//! Abstract syntax tree handed over by the C-Minus front end

use serde::{Deserialize, Serialize};
use std::fmt;

/// Complete C-Minus program: an ordered list of global declarations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Program {
    /// Global variable and function declarations in source order
    pub declarations: Vec<Declaration>,
}

/// Declared type of a variable, parameter or function result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeSpec {
    /// Machine integer
    Int,
    /// No value
    Void,
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Int => write!(f, "int"),
            TypeSpec::Void => write!(f, "void"),
        }
    }
}

/// Top-level declarations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Declaration {
    /// Global variable: `int x;` / `int a[10];`
    Variable(VarDecl),
    /// Function definition
    Function(FunDecl),
}

/// Variable declaration (global or local)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    /// Variable name
    pub name: String,
    /// Declared element type
    pub ty: TypeSpec,
    /// Declared array length, `None` for scalars
    pub array_size: Option<i64>,
    /// Source line
    pub line: usize,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Declared element type
    pub ty: TypeSpec,
    /// `int a[]` parameters are passed by reference and carry no length
    pub is_array: bool,
    /// Source line
    pub line: usize,
}

/// Function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunDecl {
    /// Function name
    pub name: String,
    /// Declared result type
    pub return_type: TypeSpec,
    /// Parameters in positional order (`(void)` is an empty list)
    pub params: Vec<Param>,
    /// Function body
    pub body: Block,
    /// Source line
    pub line: usize,
}

/// Compound statement: local declarations followed by statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Block {
    /// Local declarations
    pub locals: Vec<VarDecl>,
    /// Statements in order
    pub statements: Vec<Statement>,
    /// Source line of the opening brace
    pub line: usize,
}

/// Statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Nested compound statement
    Block(Block),

    /// `if (condition) then_branch [else else_branch]`
    If {
        /// Condition expression
        condition: Expr,
        /// Statement executed when the condition is non-zero
        then_branch: Box<Statement>,
        /// Optional statement executed otherwise
        else_branch: Option<Box<Statement>>,
        /// Source line
        line: usize,
    },

    /// `while (condition) body`
    While {
        /// Loop condition
        condition: Expr,
        /// Loop body
        body: Box<Statement>,
        /// Source line
        line: usize,
    },

    /// `return [value];`
    Return {
        /// Returned expression, if any
        value: Option<Expr>,
        /// Source line
        line: usize,
    },

    /// `target = value;`
    Assign {
        /// Assigned variable or array element
        target: VarRef,
        /// Assigned expression
        value: Expr,
        /// Source line
        line: usize,
    },

    /// Call evaluated for its side effects
    Call(Call),

    /// `;`
    Empty {
        /// Source line
        line: usize,
    },
}

/// Variable reference, optionally indexed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarRef {
    /// Referenced name
    pub name: String,
    /// Index expression for `a[i]`
    pub index: Option<Box<Expr>>,
    /// Source line
    pub line: usize,
}

/// Function call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    /// Called function name
    pub callee: String,
    /// Arguments in positional order
    pub args: Vec<Expr>,
    /// Source line
    pub line: usize,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Sub,
    /// Multiplication (*)
    Mul,
    /// Division (/)
    Div,

    // Relational
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    LtEq,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    GtEq,
    /// Equal (==)
    Eq,
    /// Not equal (!=)
    NotEq,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
        };
        write!(f, "{}", s)
    }
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Integer literal
    Number {
        /// Literal value
        value: i64,
        /// Source line
        line: usize,
    },

    /// Variable or array element read
    Var(VarRef),

    /// Call used for its result
    Call(Call),

    /// Arithmetic or relational operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
        /// Source line
        line: usize,
    },
}

impl Expr {
    /// Integer literal
    pub fn number(value: i64, line: usize) -> Self {
        Expr::Number { value, line }
    }

    /// Plain variable read
    pub fn var(name: &str, line: usize) -> Self {
        Expr::Var(VarRef::scalar(name, line))
    }

    /// Array element read
    pub fn index(name: &str, index: Expr, line: usize) -> Self {
        Expr::Var(VarRef::element(name, index, line))
    }

    /// Call expression
    pub fn call(callee: &str, args: Vec<Expr>, line: usize) -> Self {
        Expr::Call(Call::new(callee, args, line))
    }

    /// Binary expression
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, line: usize) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            line,
        }
    }

    /// Source line of the expression
    pub fn line(&self) -> usize {
        match self {
            Expr::Number { line, .. } | Expr::Binary { line, .. } => *line,
            Expr::Var(v) => v.line,
            Expr::Call(c) => c.line,
        }
    }
}

impl VarRef {
    /// Unindexed reference
    pub fn scalar(name: &str, line: usize) -> Self {
        Self {
            name: name.to_string(),
            index: None,
            line,
        }
    }

    /// Indexed reference `name[index]`
    pub fn element(name: &str, index: Expr, line: usize) -> Self {
        Self {
            name: name.to_string(),
            index: Some(Box::new(index)),
            line,
        }
    }
}

impl Call {
    /// Build a call node
    pub fn new(callee: &str, args: Vec<Expr>, line: usize) -> Self {
        Self {
            callee: callee.to_string(),
            args,
            line,
        }
    }
}

impl Statement {
    /// `target = value;`
    pub fn assign(target: VarRef, value: Expr, line: usize) -> Self {
        Statement::Assign {
            target,
            value,
            line,
        }
    }

    /// `if` statement
    pub fn if_else(
        condition: Expr,
        then_branch: Statement,
        else_branch: Option<Statement>,
        line: usize,
    ) -> Self {
        Statement::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
            line,
        }
    }

    /// `while` statement
    pub fn while_loop(condition: Expr, body: Statement, line: usize) -> Self {
        Statement::While {
            condition,
            body: Box::new(body),
            line,
        }
    }

    /// `return` statement
    pub fn ret(value: Option<Expr>, line: usize) -> Self {
        Statement::Return { value, line }
    }

    /// Source line of the statement
    pub fn line(&self) -> usize {
        match self {
            Statement::Block(b) => b.line,
            Statement::Call(c) => c.line,
            Statement::If { line, .. }
            | Statement::While { line, .. }
            | Statement::Return { line, .. }
            | Statement::Assign { line, .. }
            | Statement::Empty { line } => *line,
        }
    }
}

impl VarDecl {
    /// Scalar declaration
    pub fn scalar(name: &str, ty: TypeSpec, line: usize) -> Self {
        Self {
            name: name.to_string(),
            ty,
            array_size: None,
            line,
        }
    }

    /// Array declaration `ty name[size]`
    pub fn array(name: &str, ty: TypeSpec, size: i64, line: usize) -> Self {
        Self {
            name: name.to_string(),
            ty,
            array_size: Some(size),
            line,
        }
    }
}

impl Param {
    /// Scalar parameter
    pub fn scalar(name: &str, ty: TypeSpec, line: usize) -> Self {
        Self {
            name: name.to_string(),
            ty,
            is_array: false,
            line,
        }
    }

    /// Array parameter `ty name[]`
    pub fn array(name: &str, ty: TypeSpec, line: usize) -> Self {
        Self {
            name: name.to_string(),
            ty,
            is_array: true,
            line,
        }
    }
}

impl Block {
    /// Build a compound statement
    pub fn new(locals: Vec<VarDecl>, statements: Vec<Statement>, line: usize) -> Self {
        Self {
            locals,
            statements,
            line,
        }
    }
}

impl Program {
    /// Program from its declarations
    pub fn new(declarations: Vec<Declaration>) -> Self {
        Self { declarations }
    }

    /// Function definitions in declaration order
    pub fn functions(&self) -> impl Iterator<Item = &FunDecl> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Function(f) => Some(f),
            Declaration::Variable(_) => None,
        })
    }
}
