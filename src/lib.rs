//! # cminus - Backend for the C-Minus Teaching Language
//!
//! Takes the abstract syntax tree built by a C-Minus front end and carries it
//! the rest of the way: symbol table, semantic checks, three-address code,
//! register-allocated assembly for a small abstract machine, and a
//! label-resolved text artifact ready for a binary encoder.
//!
//! ## Pipeline
//!
//! ```text
//! Program (AST) ─► SymbolTableBuilder ─► SemanticAnalyzer ─► IrGenerator
//!                                                                │
//!          PostProcessor ◄─ CodeGenerator ◄───── quadruples ◄────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use cminus::{Compiler, CompileOptions, Program};
//! use cminus::parser::{BinaryOp, Block, Declaration, Expr, FunDecl, Statement, TypeSpec, VarDecl, VarRef};
//!
//! # fn main() -> cminus::Result<()> {
//! // int x; void main(void) { x = 1 + 2; }
//! let program = Program::new(vec![
//!     Declaration::Variable(VarDecl::scalar("x", TypeSpec::Int, 1)),
//!     Declaration::Function(FunDecl {
//!         name: "main".to_string(),
//!         return_type: TypeSpec::Void,
//!         params: vec![],
//!         body: Block::new(
//!             vec![],
//!             vec![Statement::assign(
//!                 VarRef::scalar("x", 2),
//!                 Expr::binary(BinaryOp::Add, Expr::number(1, 2), Expr::number(2, 2), 2),
//!                 2,
//!             )],
//!             2,
//!         ),
//!         line: 2,
//!     }),
//! ]);
//!
//! let result = Compiler::new(CompileOptions::default()).compile(&program)?;
//! assert_eq!(result.error_count(), 0);
//! assert!(result.asm.to_string().starts_with("0 - j main"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`parser`] - AST types and JSON loading
//! - [`compiler`] - every backend stage and the [`Compiler`] driver
//! - [`error`] - crate error type

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod compiler;
pub mod error;
pub mod parser;

pub use compiler::{CompileOptions, CompileResult, Compiler};
pub use error::{Error, Result};
pub use parser::Program;
