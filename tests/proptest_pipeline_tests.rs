//! Property-based tests for the backend pipeline
//!
//! These tests use proptest to generate random well-formed programs and verify that:
//! 1. Quadruple indices are contiguous from 1
//! 2. Every jump-family label is recorded by post-processing pass 1
//! 3. Valid programs pass semantic analysis
//! 4. Compilation is deterministic

use cminus::compiler::{CompileOptions, Compiler, IrGenerator, Opcode, PostProcessor};
use cminus::parser::{
    BinaryOp, Block, Call, Declaration, Expr, FunDecl, Statement, TypeSpec, VarDecl, VarRef,
};
use cminus::Program;
use proptest::prelude::*;

// =============================================================================
// STRATEGY GENERATORS
// =============================================================================

const VARS: &[&str] = &["a", "b", "c"];

fn binary_op() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![
        Just(BinaryOp::Add),
        Just(BinaryOp::Sub),
        Just(BinaryOp::Mul),
        Just(BinaryOp::Div),
        Just(BinaryOp::Lt),
        Just(BinaryOp::LtEq),
        Just(BinaryOp::Gt),
        Just(BinaryOp::GtEq),
        Just(BinaryOp::Eq),
        Just(BinaryOp::NotEq),
    ]
}

/// Integer expressions over the declared scalars
fn expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (-50i64..50).prop_map(|n| Expr::number(n, 3)),
        prop::sample::select(VARS).prop_map(|v| Expr::var(v, 3)),
        (0i64..4).prop_map(|i| Expr::index("arr", Expr::number(i, 3), 3)),
        Just(Expr::call("input", vec![], 3)),
    ];
    leaf.prop_recursive(4, 24, 2, |inner| {
        (binary_op(), inner.clone(), inner)
            .prop_map(|(op, lhs, rhs)| Expr::binary(op, lhs, rhs, 3))
    })
}

fn statement() -> impl Strategy<Value = Statement> {
    let leaf = prop_oneof![
        (prop::sample::select(VARS), expr())
            .prop_map(|(v, e)| Statement::assign(VarRef::scalar(v, 3), e, 3)),
        ((0i64..4), expr()).prop_map(|(i, e)| Statement::assign(
            VarRef::element("arr", Expr::number(i, 3), 3),
            e,
            3
        )),
        expr().prop_map(|e| Statement::Call(Call::new("output", vec![e], 3))),
        Just(Statement::Empty { line: 3 }),
    ];
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            (expr(), inner.clone(), prop::option::of(inner.clone()))
                .prop_map(|(c, t, e)| Statement::if_else(c, t, e, 3)),
            (expr(), inner.clone()).prop_map(|(c, b)| Statement::while_loop(c, b, 3)),
            prop::collection::vec(inner, 0..4)
                .prop_map(|stmts| Statement::Block(Block::new(vec![], stmts, 3))),
        ]
    })
}

/// `int arr[4]; void main(void) { int a; int b; int c; <statements> }`
fn program() -> impl Strategy<Value = Program> {
    prop::collection::vec(statement(), 0..6).prop_map(|statements| {
        Program::new(vec![
            Declaration::Variable(VarDecl::array("arr", TypeSpec::Int, 4, 1)),
            Declaration::Function(FunDecl {
                name: "main".to_string(),
                return_type: TypeSpec::Void,
                params: vec![],
                body: Block::new(
                    VARS.iter()
                        .map(|v| VarDecl::scalar(v, TypeSpec::Int, 2))
                        .collect(),
                    statements,
                    2,
                ),
                line: 2,
            }),
        ])
    })
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn quadruple_indices_are_contiguous(program in program()) {
        let ir = IrGenerator::new().generate(&program);
        for (i, quad) in ir.iter().enumerate() {
            prop_assert_eq!(quad.index, i + 1);
        }
    }

    #[test]
    fn every_label_is_placed_exactly_once(program in program()) {
        let ir = IrGenerator::new().generate(&program);
        let placed: Vec<_> = ir.iter().filter(|q| q.op == Opcode::Label).map(|q| q.arg1.clone()).collect();
        let targets: Vec<_> = ir.iter().filter(|q| q.op.is_jump()).map(|q| q.result.clone()).collect();
        for target in &targets {
            prop_assert_eq!(placed.iter().filter(|p| *p == target).count(), 1);
        }
        let mut unique = placed.clone();
        unique.sort_by_key(|p| p.as_ref().map(|o| o.to_string()));
        unique.dedup();
        prop_assert_eq!(unique.len(), placed.len());
    }

    #[test]
    fn generated_programs_are_semantically_valid(program in program()) {
        let result = Compiler::default().compile(&program);
        prop_assert!(result.is_ok(), "{:?}", result.err());
    }

    #[test]
    fn every_jump_target_is_recorded(program in program()) {
        let result = Compiler::new(CompileOptions::default()).compile(&program).unwrap();
        prop_assert!(result.post.unresolved_references().is_empty());
        prop_assert_eq!(result.post.lines.len(), result.asm.len());

        let map = PostProcessor::new().collect_labels(&result.asm.to_string());
        prop_assert_eq!(map, result.post.label_map);
    }

    #[test]
    fn compilation_is_deterministic(program in program()) {
        let compiler = Compiler::default();
        let first = compiler.compile(&program).unwrap();
        let second = compiler.compile(&program).unwrap();
        prop_assert_eq!(first.asm, second.asm);
    }
}
