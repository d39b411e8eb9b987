//! Register allocation and emission tests
//!
//! The allocator reuses slot 0 when a class runs out and maps temporaries
//! cyclically into the scratch class. Those aliasing cases are flagged on the
//! binding log; the tests check that the flag is set where it must be and that
//! every unflagged binding is unique within its function.

use cminus::compiler::{
    CodeGenerator, IrGenerator, IrProgram, Opcode, Operand, Register, RegisterBinding,
    RegisterClass, RegisterConfig, SymbolTable, SymbolTableBuilder,
};
use cminus::parser::{
    BinaryOp, Block, Call, Declaration, Expr, FunDecl, Param, Statement, TypeSpec, VarDecl, VarRef,
};
use cminus::Program;
use std::collections::HashMap;

fn lower(program: &Program, config: RegisterConfig) -> (Vec<String>, Vec<RegisterBinding>) {
    let table = SymbolTableBuilder::new().build(program);
    let ir = IrGenerator::new().generate(program);
    lower_ir(&table, &ir, config)
}

fn lower_ir(
    table: &SymbolTable,
    ir: &IrProgram,
    config: RegisterConfig,
) -> (Vec<String>, Vec<RegisterBinding>) {
    let mut codegen = CodeGenerator::new(table, config);
    let asm = codegen.generate(ir);
    let lines = asm.lines().iter().map(|l| l.text.clone()).collect();
    (lines, codegen.bindings().to_vec())
}

fn main_only(locals: Vec<VarDecl>, statements: Vec<Statement>) -> Program {
    Program::new(vec![Declaration::Function(FunDecl {
        name: "main".to_string(),
        return_type: TypeSpec::Void,
        params: vec![],
        body: Block::new(locals, statements, 1),
        line: 1,
    })])
}

fn set(name: &str, value: Expr, line: usize) -> Statement {
    Statement::assign(VarRef::scalar(name, line), value, line)
}

/// Unflagged bindings never share a register with a different operand
/// inside one function
fn assert_no_unflagged_aliasing(bindings: &[RegisterBinding]) {
    let mut owners: HashMap<(String, Register), Operand> = HashMap::new();
    for binding in bindings.iter().filter(|b| !b.aliased) {
        if let Register::Class(..) = binding.register {
            let key = (binding.function.clone(), binding.register);
            if let Some(owner) = owners.get(&key) {
                assert_eq!(
                    owner, &binding.operand,
                    "{} shared by {} and {} in {}",
                    binding.register, owner, binding.operand, binding.function
                );
            }
            owners.insert(key, binding.operand.clone());
        }
    }
}

#[test]
fn test_program_starts_with_jump_and_ends_with_halt() {
    let (lines, _) = lower(&main_only(vec![], vec![]), RegisterConfig::default());
    assert_eq!(lines.first().map(String::as_str), Some("j main"));
    assert_eq!(lines.last().map(String::as_str), Some("halt"));
}

#[test]
fn test_locals_get_local_registers() {
    let program = main_only(
        vec![
            VarDecl::scalar("a", TypeSpec::Int, 2),
            VarDecl::scalar("b", TypeSpec::Int, 2),
        ],
        vec![
            set("a", Expr::number(1, 3), 3),
            set("b", Expr::var("a", 4), 4),
        ],
    );
    let (lines, bindings) = lower(&program, RegisterConfig::default());

    assert!(lines.contains(&"move $s0, $t0".to_string()));
    assert!(lines.contains(&"move $t1, $s0".to_string()));
    assert!(lines.contains(&"move $s1, $t1".to_string()));
    assert_no_unflagged_aliasing(&bindings);
    assert!(bindings.iter().all(|b| !b.aliased));
}

#[test]
fn test_relational_and_branch_mnemonics() {
    let program = main_only(
        vec![VarDecl::scalar("i", TypeSpec::Int, 2)],
        vec![
            set("i", Expr::number(0, 3), 3),
            Statement::while_loop(
                Expr::binary(BinaryOp::LtEq, Expr::var("i", 4), Expr::number(9, 4), 4),
                set(
                    "i",
                    Expr::binary(BinaryOp::Add, Expr::var("i", 5), Expr::number(1, 5), 5),
                    5,
                ),
                4,
            ),
        ],
    );
    let (lines, bindings) = lower(&program, RegisterConfig::default());

    assert!(lines.iter().any(|l| l.starts_with("sle ")));
    assert!(lines.iter().any(|l| l.starts_with("bne ") && l.ends_with(", $zero, L1")));
    assert!(lines.contains(&"j L2".to_string()));
    assert!(lines.contains(&"j L0".to_string()));
    assert!(lines.contains(&"L0:".to_string()));
    assert_no_unflagged_aliasing(&bindings);
}

#[test]
fn test_array_access_lowering() {
    let program = Program::new(vec![
        Declaration::Variable(VarDecl::array("buf", TypeSpec::Int, 4, 1)),
        Declaration::Function(FunDecl {
            name: "main".to_string(),
            return_type: TypeSpec::Void,
            params: vec![],
            body: Block::new(
                vec![],
                vec![Statement::assign(
                    VarRef::element("buf", Expr::number(0, 3), 3),
                    Expr::index("buf", Expr::number(1, 3), 3),
                    3,
                )],
                2,
            ),
            line: 2,
        }),
    ]);
    let (lines, _) = lower(&program, RegisterConfig::default());
    assert!(lines.contains(&"lw $t1, buf($t2)".to_string()));
    assert!(lines.contains(&"sw $t1, buf($t0)".to_string()));
}

#[test]
fn test_function_frame_and_return() {
    let program = Program::new(vec![
        Declaration::Function(FunDecl {
            name: "twice".to_string(),
            return_type: TypeSpec::Int,
            params: vec![Param::scalar("n", TypeSpec::Int, 1)],
            body: Block::new(
                vec![],
                vec![Statement::ret(
                    Some(Expr::binary(BinaryOp::Mul, Expr::var("n", 2), Expr::number(2, 2), 2)),
                    2,
                )],
                1,
            ),
            line: 1,
        }),
        Declaration::Function(FunDecl {
            name: "main".to_string(),
            return_type: TypeSpec::Void,
            params: vec![],
            body: Block::new(
                vec![],
                vec![Statement::Call(Call::new(
                    "output",
                    vec![Expr::call("twice", vec![Expr::number(21, 5)], 5)],
                    5,
                ))],
                4,
            ),
            line: 4,
        }),
    ]);
    let (lines, _) = lower(&program, RegisterConfig::default());

    let start = lines
        .iter()
        .position(|l| l == "twice: # function twice")
        .expect("twice label");
    assert_eq!(lines[start + 1], "addi $sp, $sp, -4");
    assert_eq!(lines[start + 2], "sw $ra, 0($sp)");
    assert!(lines.contains(&"move $t1, $a0".to_string()));
    assert!(lines.contains(&"mul $t0, $t1, $t2".to_string()));
    assert!(lines.iter().any(|l| l.starts_with("move $v0, ")));

    let ret = lines.iter().position(|l| l == "jr $ra").expect("return");
    assert_eq!(lines[ret - 2], "lw $ra, 0($sp)");
    assert_eq!(lines[ret - 1], "addi $sp, $sp, 4");

    let main = lines
        .iter()
        .position(|l| l == "main: # function main")
        .expect("main label");
    assert!(lines[main..].contains(&"jal twice".to_string()));
    assert!(lines[main..].contains(&"out $a0".to_string()));
    assert!(!lines[main..].contains(&"jr $ra".to_string()));
}

#[test]
fn test_registers_reset_per_function() {
    let program = Program::new(vec![
        Declaration::Function(FunDecl {
            name: "f".to_string(),
            return_type: TypeSpec::Void,
            params: vec![],
            body: Block::new(
                vec![VarDecl::scalar("p", TypeSpec::Int, 2)],
                vec![set("p", Expr::number(1, 3), 3)],
                1,
            ),
            line: 1,
        }),
        Declaration::Function(FunDecl {
            name: "main".to_string(),
            return_type: TypeSpec::Void,
            params: vec![],
            body: Block::new(
                vec![VarDecl::scalar("q", TypeSpec::Int, 6)],
                vec![set("q", Expr::number(2, 7), 7)],
                5,
            ),
            line: 5,
        }),
    ]);
    let (_, bindings) = lower(&program, RegisterConfig::default());
    let local_of = |name: &str| {
        bindings
            .iter()
            .find(|b| b.operand == Operand::name(name))
            .map(|b| b.register)
    };
    assert_eq!(local_of("p"), Some(Register::Class(RegisterClass::Local, 0)));
    assert_eq!(local_of("q"), Some(Register::Class(RegisterClass::Local, 0)));
}

#[test]
fn test_local_exhaustion_is_flagged() {
    let names = ["a", "b", "c"];
    let program = main_only(
        names
            .iter()
            .map(|n| VarDecl::scalar(n, TypeSpec::Int, 2))
            .collect(),
        names
            .iter()
            .enumerate()
            .map(|(i, n)| set(n, Expr::number(i as i64, 3 + i), 3 + i))
            .collect(),
    );
    let config = RegisterConfig {
        locals: 2,
        ..RegisterConfig::default()
    };
    let (lines, bindings) = lower(&program, config);

    let c = bindings
        .iter()
        .find(|b| b.operand == Operand::name("c"))
        .expect("binding for c");
    assert_eq!(c.register, Register::Class(RegisterClass::Local, 0));
    assert!(c.aliased, "reuse of $s0 must be flagged");
    assert!(lines.contains(&"move $s0, $t2".to_string()));
    assert_no_unflagged_aliasing(&bindings);
}

#[test]
fn test_scratch_wraparound_is_flagged() {
    // Twelve nested additions need more temporaries than the scratch class holds.
    let mut expr = Expr::number(0, 2);
    for i in 1..=12 {
        expr = Expr::binary(BinaryOp::Add, expr, Expr::number(i, 2), 2);
    }
    let program = main_only(
        vec![VarDecl::scalar("r", TypeSpec::Int, 2)],
        vec![set("r", expr, 2)],
    );
    let (_, bindings) = lower(&program, RegisterConfig::default());

    assert!(bindings.iter().any(|b| b.aliased));
    assert!(bindings
        .iter()
        .filter(|b| b.aliased)
        .all(|b| matches!(b.register, Register::Class(RegisterClass::Scratch, _))));
    assert_no_unflagged_aliasing(&bindings);
}

#[test]
fn test_literal_operands_are_loaded_first() {
    let table = SymbolTable::new();
    let mut ir = IrProgram::new();
    ir.push(Opcode::Function, Some(Operand::name("main")), None, None, 1);
    ir.push(
        Opcode::Sub,
        Some(Operand::Const(7)),
        Some(Operand::Const(3)),
        Some(Operand::Temp(5)),
        2,
    );
    let (lines, _) = lower_ir(&table, &ir, RegisterConfig::default());

    let sub = lines.iter().position(|l| l.starts_with("sub ")).expect("sub");
    assert_eq!(lines[sub - 2], "li $t0, 7");
    assert_eq!(lines[sub - 1], "li $t1, 3");
    assert_eq!(lines[sub], "sub $t5, $t0, $t1");
}

#[test]
fn test_extra_arguments_go_on_the_stack() {
    let params: Vec<Param> = (0..5)
        .map(|i| Param::scalar(&format!("p{}", i), TypeSpec::Int, 1))
        .collect();
    let program = Program::new(vec![
        Declaration::Function(FunDecl {
            name: "wide".to_string(),
            return_type: TypeSpec::Void,
            params,
            body: Block::default(),
            line: 1,
        }),
        Declaration::Function(FunDecl {
            name: "main".to_string(),
            return_type: TypeSpec::Void,
            params: vec![],
            body: Block::new(
                vec![],
                vec![Statement::Call(Call::new(
                    "wide",
                    (0..5).map(|i| Expr::number(i, 3)).collect(),
                    3,
                ))],
                2,
            ),
            line: 2,
        }),
    ]);
    let (lines, _) = lower(&program, RegisterConfig::default());

    assert!(lines.iter().any(|l| l.starts_with("move $a3, ")));
    assert!(!lines.iter().any(|l| l.starts_with("move $a4")));
    let jal = lines.iter().position(|l| l == "jal wide").expect("call");
    assert_eq!(lines[jal - 2], "addi $sp, $sp, -4");
    assert!(lines[jal - 1].starts_with("sw $t"));
    assert_eq!(lines[jal + 1], "addi $sp, $sp, 4");
}

#[test]
fn test_outgoing_arguments_do_not_clobber_own_parameters() {
    // void f(int a, int b) { output(b); output(a); }  void main(void) { f(1, 2); }
    let program = Program::new(vec![
        Declaration::Function(FunDecl {
            name: "f".to_string(),
            return_type: TypeSpec::Void,
            params: vec![
                Param::scalar("a", TypeSpec::Int, 1),
                Param::scalar("b", TypeSpec::Int, 1),
            ],
            body: Block::new(
                vec![],
                vec![
                    Statement::Call(Call::new("output", vec![Expr::var("b", 2)], 2)),
                    Statement::Call(Call::new("output", vec![Expr::var("a", 3)], 3)),
                ],
                1,
            ),
            line: 1,
        }),
        Declaration::Function(FunDecl {
            name: "main".to_string(),
            return_type: TypeSpec::Void,
            params: vec![],
            body: Block::new(
                vec![],
                vec![Statement::Call(Call::new(
                    "f",
                    vec![Expr::number(1, 6), Expr::number(2, 6)],
                    6,
                ))],
                5,
            ),
            line: 5,
        }),
    ]);
    let (lines, bindings) = lower(&program, RegisterConfig::default());

    let saved = lines
        .iter()
        .position(|l| l == "move $s0, $a0")
        .expect("a saved before $a0 is overwritten");
    let first_arg = lines
        .iter()
        .position(|l| l == "move $a0, $t0")
        .expect("first output argument");
    assert!(saved < first_arg);
    assert!(lines.contains(&"move $t1, $s0".to_string()));
    assert!(!lines.contains(&"move $t1, $a0".to_string()));

    assert!(bindings.iter().any(|b| b.function == "f"
        && b.operand == Operand::name("a")
        && b.register == Register::Class(RegisterClass::Local, 0)
        && !b.aliased));
    assert_no_unflagged_aliasing(&bindings);
}
