//! IR instruction definitions

use std::fmt;

/// Quadruple operand.
///
/// Temporaries, discard slots and labels are interned as counters and only
/// turned into text when printed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Compiler temporary `tN`
    Temp(u32),
    /// Sink for an unused call result `_tN`
    Discard(u32),
    /// Jump target `LN`
    Label(u32),
    /// Source-level identifier (variable, array or function)
    Name(String),
    /// Integer literal
    Const(i64),
}

impl Operand {
    /// Identifier operand
    pub fn name(name: &str) -> Self {
        Operand::Name(name.to_string())
    }

    /// True for temporaries and discard slots
    pub fn is_temp(&self) -> bool {
        matches!(self, Operand::Temp(_) | Operand::Discard(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Temp(n) => write!(f, "t{}", n),
            Operand::Discard(n) => write!(f, "_t{}", n),
            Operand::Label(n) => write!(f, "L{}", n),
            Operand::Name(name) => write!(f, "{}", name),
            Operand::Const(value) => write!(f, "{}", value),
        }
    }
}

/// Quadruple operation.
///
/// Operand layout per opcode (`arg1`, `arg2`, `result`):
///
/// | Opcode | arg1 | arg2 | result |
/// |--------|------|------|--------|
/// | `Assign` | source | - | destination |
/// | arithmetic / relational | lhs | rhs | destination |
/// | `ArrayLoad` | array | index | destination |
/// | `ArrayStore` | value | index | array |
/// | `Label` | label | - | - |
/// | `Jump` | - | - | label |
/// | `JumpTrue` / `JumpFalse` | condition | - | label |
/// | `Param` | argument | position | - |
/// | `Call` | callee | argument count | destination or discard |
/// | `Return` | value (optional) | - | - |
/// | `Function` / `End` | function name | - | - |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// dst = src
    Assign,
    /// dst = lhs + rhs
    Add,
    /// dst = lhs - rhs
    Sub,
    /// dst = lhs * rhs
    Mul,
    /// dst = lhs / rhs
    Div,
    /// dst = lhs < rhs
    Lt,
    /// dst = lhs <= rhs
    Le,
    /// dst = lhs > rhs
    Gt,
    /// dst = lhs >= rhs
    Ge,
    /// dst = lhs == rhs
    Eq,
    /// dst = lhs != rhs
    Ne,
    /// dst = array[index]
    ArrayLoad,
    /// array[index] = value
    ArrayStore,
    /// Jump target definition
    Label,
    /// Unconditional jump
    Jump,
    /// Jump if condition is non-zero
    JumpTrue,
    /// Jump if condition is zero
    JumpFalse,
    /// Pass one call argument
    Param,
    /// Call a function
    Call,
    /// Return from the current function
    Return,
    /// Function body start marker
    Function,
    /// Function body end marker
    End,
    /// No operation
    Nop,
}

impl Opcode {
    /// Upper-case name used in listings
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Assign => "ASSIGN",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Lt => "LT",
            Opcode::Le => "LE",
            Opcode::Gt => "GT",
            Opcode::Ge => "GE",
            Opcode::Eq => "EQ",
            Opcode::Ne => "NE",
            Opcode::ArrayLoad => "ARRAY_LOAD",
            Opcode::ArrayStore => "ARRAY_STORE",
            Opcode::Label => "LABEL",
            Opcode::Jump => "JUMP",
            Opcode::JumpTrue => "JUMPTRUE",
            Opcode::JumpFalse => "JUMPFALSE",
            Opcode::Param => "PARAM",
            Opcode::Call => "CALL",
            Opcode::Return => "RETURN",
            Opcode::Function => "FUNCTION",
            Opcode::End => "END",
            Opcode::Nop => "NOP",
        }
    }

    /// Infix symbol for binary operations
    pub fn symbol(self) -> Option<&'static str> {
        Some(match self {
            Opcode::Add => "+",
            Opcode::Sub => "-",
            Opcode::Mul => "*",
            Opcode::Div => "/",
            Opcode::Lt => "<",
            Opcode::Le => "<=",
            Opcode::Gt => ">",
            Opcode::Ge => ">=",
            Opcode::Eq => "==",
            Opcode::Ne => "!=",
            _ => return None,
        })
    }

    /// True for opcodes that transfer control to a label
    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::Jump | Opcode::JumpTrue | Opcode::JumpFalse)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// One three-address instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quadruple {
    /// Position in the program, starting at 1
    pub index: usize,
    /// Source line active when the quadruple was emitted (diagnostics only)
    pub line: usize,
    /// Operation
    pub op: Opcode,
    /// First source operand
    pub arg1: Option<Operand>,
    /// Second source operand
    pub arg2: Option<Operand>,
    /// Destination or jump target
    pub result: Option<Operand>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_display() {
        assert_eq!(Operand::Temp(3).to_string(), "t3");
        assert_eq!(Operand::Discard(0).to_string(), "_t0");
        assert_eq!(Operand::Label(2).to_string(), "L2");
        assert_eq!(Operand::name("x").to_string(), "x");
        assert_eq!(Operand::Const(-4).to_string(), "-4");
    }

    #[test]
    fn test_opcode_classification() {
        assert_eq!(Opcode::Le.symbol(), Some("<="));
        assert_eq!(Opcode::Assign.symbol(), None);
        assert!(Opcode::JumpFalse.is_jump());
        assert!(!Opcode::Label.is_jump());
        assert_eq!(Opcode::ArrayStore.to_string(), "ARRAY_STORE");
    }
}
