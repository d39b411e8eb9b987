//! # Code Generator
//!
//! Lowers quadruples to assembly text for a small abstract register machine.
//!
//! ## Register File
//!
//! | Class | Names | Holds |
//! |-------|-------|-------|
//! | Parameter | `$a0..` | incoming parameters, outgoing arguments |
//! | Local | `$s0..` | named variables (locals and globals) |
//! | Scratch | `$t0..` | temporaries and literals |
//! | Return | `$v0..` | call results |
//!
//! Plus the fixed registers `$zero`, `$sp`, `$ra` and the reserved fallback `$at`.
//!
//! All four classes are cleared at every `FUNCTION` marker. When a class runs
//! out of slots, slot 0 is rebound: values can alias. Every binding is logged
//! in [`CodeGenerator::bindings`] with an `aliased` flag so callers can see it.

use super::ir::{IrProgram, Opcode, Operand, Quadruple};
use super::symtab::{SymbolKind, SymbolTable};
use std::fmt;

/// Name of the entry function
pub const ENTRY_FUNCTION: &str = "main";

/// Intrinsic that reads one integer
const INPUT: &str = "input";
/// Intrinsic that writes one integer
const OUTPUT: &str = "output";

/// Stack slot size in bytes
const WORD: i64 = 4;

// =============================================================================
// REGISTERS
// =============================================================================

/// One of the four allocatable register classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterClass {
    /// `$aN`
    Parameter,
    /// `$sN`
    Local,
    /// `$tN`
    Scratch,
    /// `$vN`
    Return,
}

impl RegisterClass {
    fn prefix(self) -> &'static str {
        match self {
            RegisterClass::Parameter => "$a",
            RegisterClass::Local => "$s",
            RegisterClass::Scratch => "$t",
            RegisterClass::Return => "$v",
        }
    }
}

/// Concrete register of the abstract machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Allocatable register `class` slot `index`
    Class(RegisterClass, usize),
    /// Always zero
    Zero,
    /// Stack pointer
    StackPointer,
    /// Return address
    ReturnAddress,
    /// Fallback for operands no class accepts
    Reserved,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::Class(class, index) => write!(f, "{}{}", class.prefix(), index),
            Register::Zero => write!(f, "$zero"),
            Register::StackPointer => write!(f, "$sp"),
            Register::ReturnAddress => write!(f, "$ra"),
            Register::Reserved => write!(f, "$at"),
        }
    }
}

/// Capacity of each register class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterConfig {
    /// Parameter registers
    pub params: usize,
    /// Local registers
    pub locals: usize,
    /// Scratch registers
    pub scratch: usize,
    /// Return registers
    pub returns: usize,
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            params: 4,
            locals: 8,
            scratch: 10,
            returns: 2,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    bound: Option<Operand>,
    used: bool,
}

/// Fixed-capacity table of one register class
#[derive(Debug, Clone)]
struct RegisterTable {
    class: RegisterClass,
    slots: Vec<Slot>,
}

impl RegisterTable {
    fn new(class: RegisterClass, capacity: usize) -> Self {
        Self {
            class,
            slots: vec![Slot::default(); capacity.max(1)],
        }
    }

    fn reset(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = Slot::default());
    }

    fn find(&self, operand: &Operand) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.bound.as_ref() == Some(operand))
    }

    /// First unused slot, or slot 0 when the class is exhausted.
    /// The flag is true when a live binding was overwritten.
    fn claim_next_free(&mut self, operand: &Operand) -> (usize, bool) {
        match self.slots.iter().position(|s| !s.used) {
            Some(index) => {
                self.bind(index, operand);
                (index, false)
            }
            None => {
                tracing::trace!(class = ?self.class, %operand, "register class exhausted, reusing slot 0");
                self.bind(0, operand);
                (0, true)
            }
        }
    }

    /// Bind a fixed slot; true when it held a different operand
    fn claim_slot(&mut self, index: usize, operand: &Operand) -> bool {
        let index = index % self.slots.len();
        let aliased = matches!(&self.slots[index].bound, Some(prev) if prev != operand);
        self.bind(index, operand);
        aliased
    }

    fn bind(&mut self, index: usize, operand: &Operand) {
        let slot = &mut self.slots[index];
        slot.bound = Some(operand.clone());
        slot.used = true;
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }
}

/// One name-to-register binding made while lowering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterBinding {
    /// Function being lowered
    pub function: String,
    /// Bound operand
    pub operand: Operand,
    /// Register it was bound to
    pub register: Register,
    /// The register previously held another live operand
    pub aliased: bool,
}

/// Per-function register allocator over the four classes
#[derive(Debug, Clone)]
pub struct RegisterAllocator {
    params: RegisterTable,
    locals: RegisterTable,
    scratch: RegisterTable,
    returns: RegisterTable,
}

impl RegisterAllocator {
    /// Create an allocator with the given class capacities
    pub fn new(config: RegisterConfig) -> Self {
        Self {
            params: RegisterTable::new(RegisterClass::Parameter, config.params),
            locals: RegisterTable::new(RegisterClass::Local, config.locals),
            scratch: RegisterTable::new(RegisterClass::Scratch, config.scratch),
            returns: RegisterTable::new(RegisterClass::Return, config.returns),
        }
    }

    /// Forget every binding
    pub fn reset(&mut self) {
        self.params.reset();
        self.locals.reset();
        self.scratch.reset();
        self.returns.reset();
    }

    fn table_mut(&mut self, class: RegisterClass) -> &mut RegisterTable {
        match class {
            RegisterClass::Parameter => &mut self.params,
            RegisterClass::Local => &mut self.locals,
            RegisterClass::Scratch => &mut self.scratch,
            RegisterClass::Return => &mut self.returns,
        }
    }

    /// Register already holding `operand`, if any
    pub fn lookup(&self, operand: &Operand) -> Option<Register> {
        [&self.params, &self.locals, &self.scratch, &self.returns]
            .into_iter()
            .find_map(|table| {
                table
                    .find(operand)
                    .map(|index| Register::Class(table.class, index))
            })
    }

    /// Bind `operand` to the next free slot of `class`
    pub fn allocate(&mut self, class: RegisterClass, operand: &Operand) -> (Register, bool) {
        let (index, aliased) = self.table_mut(class).claim_next_free(operand);
        (Register::Class(class, index), aliased)
    }

    /// Bind temporary `n` to scratch slot `n mod capacity`
    fn allocate_temp(&mut self, n: u32, operand: &Operand) -> (Register, bool) {
        let index = n as usize % self.scratch.capacity();
        let aliased = self.scratch.claim_slot(index, operand);
        (Register::Class(RegisterClass::Scratch, index), aliased)
    }

    /// Number of parameter registers
    pub fn param_capacity(&self) -> usize {
        self.params.capacity()
    }

    /// Operand currently held by parameter register `index`
    fn param_at(&self, index: usize) -> Option<&Operand> {
        self.params.slots.get(index).and_then(|s| s.bound.as_ref())
    }

    /// Drop the binding of parameter register `index`; the slot stays claimed
    fn release_param(&mut self, index: usize) {
        if let Some(slot) = self.params.slots.get_mut(index) {
            slot.bound = None;
        }
    }
}

// =============================================================================
// ASSEMBLY
// =============================================================================

/// One indexed assembly line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmLine {
    /// Sequential index, starting at 0
    pub index: usize,
    /// Instruction, label definition or comment
    pub text: String,
}

impl fmt::Display for AsmLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.index, self.text)
    }
}

/// Assembly listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AsmProgram {
    lines: Vec<AsmLine>,
}

impl AsmProgram {
    fn push(&mut self, text: String) {
        let index = self.lines.len();
        self.lines.push(AsmLine { index, text });
    }

    /// Lines in order
    pub fn lines(&self) -> &[AsmLine] {
        &self.lines
    }

    /// Number of lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True if nothing was emitted
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for AsmProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

// =============================================================================
// CODE GENERATOR
// =============================================================================

/// Quadruple-to-assembly lowering for one compilation unit
pub struct CodeGenerator<'t> {
    table: &'t SymbolTable,
    regs: RegisterAllocator,
    asm: AsmProgram,
    current_function: String,
    bindings: Vec<RegisterBinding>,
}

impl<'t> CodeGenerator<'t> {
    /// Create a generator resolving names through `table`
    pub fn new(table: &'t SymbolTable, config: RegisterConfig) -> Self {
        Self {
            table,
            regs: RegisterAllocator::new(config),
            asm: AsmProgram::default(),
            current_function: String::new(),
            bindings: Vec::new(),
        }
    }

    /// Lower `ir` to assembly. State from a previous run is discarded.
    pub fn generate(&mut self, ir: &IrProgram) -> AsmProgram {
        self.regs.reset();
        self.bindings.clear();
        self.current_function.clear();
        self.asm = AsmProgram::default();

        self.emit(format!("j {}", ENTRY_FUNCTION));
        for quad in ir {
            if self.lower(quad).is_none() {
                tracing::warn!(index = quad.index, op = %quad.op, "quadruple is missing an operand");
                self.emit(format!("# malformed quadruple {}: {}", quad.index, quad.op));
            }
        }
        self.emit("halt".to_string());

        tracing::debug!(lines = self.asm.len(), bindings = self.bindings.len(), "assembly generated");
        std::mem::take(&mut self.asm)
    }

    /// Every binding made by the last [`generate`](Self::generate) call
    pub fn bindings(&self) -> &[RegisterBinding] {
        &self.bindings
    }

    fn emit(&mut self, text: String) {
        self.asm.push(text);
    }

    fn in_entry(&self) -> bool {
        self.current_function == ENTRY_FUNCTION
    }

    // -------------------------------------------------------------------------
    // Register resolution
    // -------------------------------------------------------------------------

    fn resolve(&mut self, operand: &Operand) -> Register {
        if let Some(reg) = self.regs.lookup(operand) {
            return reg;
        }

        let (register, aliased) = match operand {
            Operand::Const(_) => self.regs.allocate(RegisterClass::Scratch, operand),
            Operand::Name(name) => {
                let kind = self
                    .table
                    .resolve(name, &self.current_function)
                    .map(|entry| entry.kind);
                match kind {
                    Some(SymbolKind::Parameter) => {
                        self.regs.allocate(RegisterClass::Parameter, operand)
                    }
                    Some(SymbolKind::Variable) => self.regs.allocate(RegisterClass::Local, operand),
                    _ => (Register::Reserved, false),
                }
            }
            Operand::Temp(n) => self.regs.allocate_temp(*n, operand),
            Operand::Discard(_) => self.regs.allocate(RegisterClass::Return, operand),
            Operand::Label(_) => (Register::Reserved, false),
        };

        tracing::trace!(%operand, %register, aliased, "bound register");
        self.bindings.push(RegisterBinding {
            function: self.current_function.clone(),
            operand: operand.clone(),
            register,
            aliased,
        });
        register
    }

    /// Resolve a source operand, loading literals first
    fn source(&mut self, operand: &Operand) -> Register {
        let reg = self.resolve(operand);
        if let Operand::Const(value) = operand {
            self.emit(format!("li {}, {}", reg, value));
        }
        reg
    }

    // -------------------------------------------------------------------------
    // Lowering
    // -------------------------------------------------------------------------

    fn lower(&mut self, quad: &Quadruple) -> Option<()> {
        let arg1 = quad.arg1.as_ref();
        let arg2 = quad.arg2.as_ref();
        let result = quad.result.as_ref();

        match quad.op {
            Opcode::Assign => {
                let src = arg1?;
                let dst = self.resolve(result?);
                match src {
                    Operand::Const(value) => self.emit(format!("li {}, {}", dst, value)),
                    _ => {
                        let src = self.resolve(src);
                        self.emit(format!("move {}, {}", dst, src));
                    }
                }
            }

            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Lt
            | Opcode::Le
            | Opcode::Gt
            | Opcode::Ge
            | Opcode::Eq
            | Opcode::Ne => {
                let (lhs, rhs, dst) = (arg1?, arg2?, result?);
                let lhs = self.source(lhs);
                let rhs = self.source(rhs);
                let dst = self.resolve(dst);
                self.emit(format!("{} {}, {}, {}", binary_mnemonic(quad.op), dst, lhs, rhs));
            }

            Opcode::ArrayLoad => {
                let (array, index, dst) = (arg1?, arg2?, result?);
                let index = self.source(index);
                let dst = self.resolve(dst);
                self.emit(format!("lw {}, {}({})", dst, array, index));
            }

            Opcode::ArrayStore => {
                let (value, index, array) = (arg1?, arg2?, result?);
                let value = self.source(value);
                let index = self.source(index);
                self.emit(format!("sw {}, {}({})", value, array, index));
            }

            Opcode::Label => self.emit(format!("{}:", arg1?)),

            Opcode::Jump => self.emit(format!("j {}", result?)),

            Opcode::JumpFalse | Opcode::JumpTrue => {
                let cond = self.source(arg1?);
                let mnemonic = if quad.op == Opcode::JumpFalse { "beq" } else { "bne" };
                self.emit(format!("{} {}, {}, {}", mnemonic, cond, Register::Zero, result?));
            }

            Opcode::Param => {
                let position = match arg2? {
                    Operand::Const(p) if *p >= 0 => *p as usize,
                    _ => return None,
                };
                let value = arg1?;
                let src = self.source(value);
                if position < self.regs.param_capacity() {
                    let dst = Register::Class(RegisterClass::Parameter, position);
                    self.preserve_param(position, value);
                    self.emit(format!("move {}, {}", dst, src));
                } else {
                    self.push_word(src);
                }
            }

            Opcode::Call => self.lower_call(arg1?, arg2?, result?)?,

            Opcode::Return => {
                if let Some(value) = arg1 {
                    let src = self.source(value);
                    let ret = Register::Class(RegisterClass::Return, 0);
                    self.emit(format!("move {}, {}", ret, src));
                }
                if self.in_entry() {
                    self.emit("halt".to_string());
                } else {
                    self.epilogue();
                }
            }

            Opcode::Function => {
                let name = arg1?.to_string();
                self.regs.reset();
                self.current_function = name.clone();
                self.emit(format!("{}: # function {}", name, name));
                self.bind_parameters(&name);
                self.emit(format!("addi {}, {}, {}", Register::StackPointer, Register::StackPointer, -WORD));
                self.emit(format!("sw {}, 0({})", Register::ReturnAddress, Register::StackPointer));
            }

            Opcode::End => {
                if !self.in_entry() {
                    self.epilogue();
                }
            }

            Opcode::Nop => self.emit(format!("# not implemented: {}", quad.op)),
        }
        Some(())
    }

    fn lower_call(&mut self, callee: &Operand, argc: &Operand, result: &Operand) -> Option<()> {
        let argc = match argc {
            Operand::Const(n) if *n >= 0 => *n as usize,
            _ => return None,
        };
        match callee {
            Operand::Name(name) if name == INPUT => {
                let dst = self.resolve(result);
                self.emit(format!("in {}", dst));
            }
            Operand::Name(name) if name == OUTPUT => {
                self.emit(format!("out {}", Register::Class(RegisterClass::Parameter, 0)));
            }
            _ => {
                self.emit(format!("jal {}", callee));
                let stacked = argc.saturating_sub(self.regs.param_capacity());
                if stacked > 0 {
                    self.emit(format!(
                        "addi {}, {}, {}",
                        Register::StackPointer,
                        Register::StackPointer,
                        stacked as i64 * WORD
                    ));
                }
                if !matches!(result, Operand::Discard(_)) {
                    let dst = self.resolve(result);
                    let ret = Register::Class(RegisterClass::Return, 0);
                    self.emit(format!("move {}, {}", dst, ret));
                }
            }
        }
        Some(())
    }

    /// Parameters take `$a0..` in declaration order, matching how callers pass them
    fn bind_parameters(&mut self, function: &str) {
        let params: Vec<Operand> = self
            .table
            .entries()
            .filter(|e| e.scope == function && e.kind == SymbolKind::Parameter)
            .map(|e| Operand::name(&e.name))
            .collect();
        for param in &params {
            self.resolve(param);
        }
    }

    /// Move the operand living in `$a<position>` into a local register
    /// before an outgoing argument overwrites it
    fn preserve_param(&mut self, position: usize, outgoing: &Operand) {
        let held = match self.regs.param_at(position) {
            Some(held) if held != outgoing => held.clone(),
            _ => return,
        };
        let from = Register::Class(RegisterClass::Parameter, position);
        self.regs.release_param(position);
        let (to, aliased) = self.regs.allocate(RegisterClass::Local, &held);
        self.emit(format!("move {}, {}", to, from));

        tracing::trace!(operand = %held, %from, %to, aliased, "parameter moved out of argument register");
        self.bindings.push(RegisterBinding {
            function: self.current_function.clone(),
            operand: held,
            register: to,
            aliased,
        });
    }

    fn push_word(&mut self, src: Register) {
        self.emit(format!("addi {}, {}, {}", Register::StackPointer, Register::StackPointer, -WORD));
        self.emit(format!("sw {}, 0({})", src, Register::StackPointer));
    }

    fn epilogue(&mut self) {
        self.emit(format!("lw {}, 0({})", Register::ReturnAddress, Register::StackPointer));
        self.emit(format!("addi {}, {}, {}", Register::StackPointer, Register::StackPointer, WORD));
        self.emit(format!("jr {}", Register::ReturnAddress));
    }
}

fn binary_mnemonic(op: Opcode) -> &'static str {
    match op {
        Opcode::Add => "add",
        Opcode::Sub => "sub",
        Opcode::Mul => "mul",
        Opcode::Div => "div",
        Opcode::Lt => "slt",
        Opcode::Le => "sle",
        Opcode::Gt => "sgt",
        Opcode::Ge => "sge",
        Opcode::Eq => "seq",
        Opcode::Ne => "sne",
        _ => "nop",
    }
}
