//! Listings for inspecting each compilation stage
//!
//! Symbol table, quadruples, three-address code and register bindings.

use super::codegen::RegisterBinding;
use super::ir::{IrProgram, Opcode, Operand, Quadruple};
use super::symtab::SymbolTable;
use std::fmt::Write;

/// Symbol table listing, one entry per row in insertion order
pub fn format_symbol_table(table: &SymbolTable) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:<12} {:<10} {:<6} {:>8} {:<5} {:>4}  Lines",
        "Name", "Scope", "Kind", "Type", "Location", "Array", "Size"
    );
    let _ = writeln!(out, "{}", "-".repeat(72));
    for entry in table.entries() {
        let lines: Vec<String> = entry.lines.iter().map(|l| l.to_string()).collect();
        let _ = writeln!(
            out,
            "{:<12} {:<12} {:<10} {:<6} {:>8} {:<5} {:>4}  {}",
            entry.name,
            entry.scope,
            entry.kind,
            entry.data_type,
            entry.slot,
            if entry.is_array { "yes" } else { "no" },
            entry.array_size,
            lines.join(" ")
        );
    }
    out
}

/// Fixed-width quadruple listing; `-` marks an absent operand
pub fn format_quadruples(program: &IrProgram) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4} {:>5} {:<12} {:<10} {:<10} {:<10}",
        "#", "Line", "Op", "Arg1", "Arg2", "Result"
    );
    for quad in program {
        let _ = writeln!(
            out,
            "{:>4} {:>5} {:<12} {:<10} {:<10} {:<10}",
            quad.index,
            quad.line,
            quad.op.mnemonic(),
            column(&quad.arg1),
            column(&quad.arg2),
            column(&quad.result)
        );
    }
    out
}

fn column(operand: &Option<Operand>) -> String {
    operand
        .as_ref()
        .map(|o| o.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Three-address listing, one statement per quadruple
pub fn format_three_address(program: &IrProgram) -> String {
    program
        .iter()
        .map(|quad| format!("{}\n", format_quad(quad)))
        .collect()
}

/// Format a single quadruple as a three-address statement
pub fn format_quad(quad: &Quadruple) -> String {
    let a1 = column(&quad.arg1);
    let a2 = column(&quad.arg2);
    let res = column(&quad.result);

    match quad.op {
        Opcode::Assign => format!("{} = {}", res, a1),
        op if op.symbol().is_some() => {
            format!("{} = {} {} {}", res, a1, op.symbol().unwrap_or("?"), a2)
        }
        Opcode::ArrayLoad => format!("{} = {}[{}]", res, a1, a2),
        Opcode::ArrayStore => format!("{}[{}] = {}", res, a2, a1),
        Opcode::Label => format!("{}:", a1),
        Opcode::Jump => format!("goto {}", res),
        Opcode::JumpFalse => format!("if (!{}) goto {}", a1, res),
        Opcode::JumpTrue => format!("if ({}) goto {}", a1, res),
        Opcode::Param => format!("param {}", a1),
        Opcode::Call => match &quad.result {
            Some(Operand::Discard(_)) | None => format!("call {}, {}", a1, a2),
            Some(dst) => format!("{} = call {}, {}", dst, a1, a2),
        },
        Opcode::Return => match &quad.arg1 {
            Some(value) => format!("return {}", value),
            None => "return".to_string(),
        },
        Opcode::Function => format!("function {}:", a1),
        Opcode::End => format!("end {}", a1),
        _ => "nop".to_string(),
    }
}

/// Register bindings grouped by function
pub fn format_bindings(bindings: &[RegisterBinding]) -> String {
    let mut out = String::new();
    let mut current: Option<&str> = None;
    for binding in bindings {
        if current != Some(binding.function.as_str()) {
            let _ = writeln!(out, "{}:", binding.function);
            current = Some(binding.function.as_str());
        }
        let _ = writeln!(
            out,
            "  {:<10} -> {}{}",
            binding.operand.to_string(),
            binding.register,
            if binding.aliased { "  (aliased)" } else { "" }
        );
    }
    out
}
