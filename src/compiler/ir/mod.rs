//! # Intermediate Representation (IR)
//!
//! Checked C-Minus programs are lowered to a flat sequence of quadruples
//! (three-address code) that the code generator turns into assembly text.
//!
//! ## Module Structure
//!
//! ```text
//! ir/
//! ├── mod.rs          # This file - module definition and re-exports
//! ├── instruction.rs  # Operand, Opcode, Quadruple
//! ├── program.rs      # IrProgram (quadruples + temp/label counters)
//! └── generator.rs    # IrGenerator (AST -> quadruples)
//! ```
//!
//! ## Key Types
//!
//! - [`Operand`] - Temporary, discard slot, label, identifier or literal
//! - [`Quadruple`] - One instruction: opcode, two sources, one result
//! - [`IrProgram`] - Append-only quadruple sequence, indices start at 1
//! - [`IrGenerator`] - AST-to-IR transformer

mod generator;
mod instruction;
mod program;

pub use generator::IrGenerator;
pub use instruction::{Opcode, Operand, Quadruple};
pub use program::IrProgram;
