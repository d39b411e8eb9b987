//! AST handed over by the C-Minus front end
//!
//! Lexing and parsing live outside this crate. The front end serializes the
//! tree it builds and the backend loads it through [`Program::from_json`].

pub mod ast;

pub use ast::{
    BinaryOp, Block, Call, Declaration, Expr, FunDecl, Param, Program, Statement, TypeSpec,
    VarDecl, VarRef,
};

use crate::Result;
use std::path::Path;

impl Program {
    /// Parse a serialized AST
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a serialized AST from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serialize the AST for hand-off or fixtures
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip_preserves_tree() {
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
                        Expr::number(7, 3),
                        3,
                    )],
                    2,
                ),
                line: 2,
            }),
        ]);

        let json = program.to_json().unwrap();
        assert!(json.contains("\"int\""));
        assert_eq!(Program::from_json(&json).unwrap(), program);
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(Program::from_json("{\"declarations\": 3}").is_err());
    }
}
