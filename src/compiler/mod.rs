//! # C-Minus Backend - AST to Label-Resolved Assembly
//!
//! This module takes the AST produced by an external C-Minus front end through
//! semantic analysis, IR generation, register allocation and label resolution.
//!
//! ## Architecture
//!
//! ```text
//! AST → Symbol Table → Semantic Check → Quadruples → Assembly → Post-Processed Text
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use cminus::compiler::{Compiler, CompileOptions};
//! use cminus::Program;
//!
//! let program = Program::from_json_file("program.ast.json")?;
//! let compiler = Compiler::new(CompileOptions::default());
//! let result = compiler.compile(&program)?;
//! result.write_artifacts(&CompileOptions::default().artifacts)?;
//! ```

pub mod codegen;
pub mod debug;
pub mod ir;
pub mod postprocess;
pub mod semantic;
pub mod symtab;

pub use codegen::{
    AsmLine, AsmProgram, CodeGenerator, Register, RegisterAllocator, RegisterBinding,
    RegisterClass, RegisterConfig,
};
pub use debug::{format_bindings, format_quadruples, format_symbol_table, format_three_address};
pub use ir::{IrGenerator, IrProgram, Opcode, Operand, Quadruple};
pub use postprocess::{LabelMap, PostProcessed, PostProcessor};
pub use semantic::{ExprType, SemanticAnalyzer, SemanticError, SemanticReport};
pub use symtab::{ScopeStack, SymbolEntry, SymbolKind, SymbolTable, SymbolTableBuilder};

use crate::{Error, Program, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the textual listings are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Output directory
    pub dir: PathBuf,
}

impl ArtifactPaths {
    /// Listings under `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Symbol table listing
    pub fn symbol_table(&self) -> PathBuf {
        self.dir.join("symtab.txt")
    }

    /// Quadruple listing
    pub fn quadruples(&self) -> PathBuf {
        self.dir.join("quadruples.txt")
    }

    /// Three-address listing
    pub fn three_address(&self) -> PathBuf {
        self.dir.join("tac.txt")
    }

    /// Indexed assembly
    pub fn assembly(&self) -> PathBuf {
        self.dir.join("program.asm")
    }

    /// Post-processed assembly
    pub fn binary_text(&self) -> PathBuf {
        self.dir.join("program.bin.txt")
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::new("output")
    }
}

/// Compilation options
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Register class capacities
    pub registers: RegisterConfig,
    /// Stop after semantic analysis when it reports errors
    pub halt_on_semantic_errors: bool,
    /// Listing locations
    pub artifacts: ArtifactPaths,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            registers: RegisterConfig::default(),
            halt_on_semantic_errors: true,
            artifacts: ArtifactPaths::default(),
        }
    }
}

/// Compilation result with every intermediate artifact
#[derive(Debug)]
pub struct CompileResult {
    /// Symbol table built from the AST
    pub symbol_table: SymbolTable,
    /// Semantic errors (empty for a valid program)
    pub report: SemanticReport,
    /// Quadruples
    pub ir: IrProgram,
    /// Indexed assembly
    pub asm: AsmProgram,
    /// Label-resolved text
    pub post: PostProcessed,
}

impl CompileResult {
    /// Number of semantic errors
    pub fn error_count(&self) -> usize {
        self.report.error_count()
    }

    /// Write the five listings, creating the directory if needed
    pub fn write_artifacts(&self, paths: &ArtifactPaths) -> Result<()> {
        fs::create_dir_all(&paths.dir)?;
        write_listing(&paths.symbol_table(), &format_symbol_table(&self.symbol_table))?;
        write_listing(&paths.quadruples(), &format_quadruples(&self.ir))?;
        write_listing(&paths.three_address(), &format_three_address(&self.ir))?;
        write_listing(&paths.assembly(), &self.asm.to_string())?;
        write_listing(&paths.binary_text(), &self.post.to_string())?;
        tracing::debug!(dir = %paths.dir.display(), "artifacts written");
        Ok(())
    }
}

fn write_listing(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(Error::from)
}

/// Every jump target in `post` must have a recorded definition
fn ensure_labels_resolved(post: &PostProcessed) -> Result<()> {
    let unresolved = post.unresolved_references();
    if unresolved.is_empty() {
        return Ok(());
    }
    Err(Error::compiler(format!(
        "unresolved labels after code generation: {}",
        unresolved.join(", ")
    )))
}

/// C-Minus backend driver
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Create a new compiler with options
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Options in use
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Run every stage over `program`.
    ///
    /// Each call builds fresh stage state, so compiling the same program twice
    /// yields identical results.
    pub fn compile(&self, program: &Program) -> Result<CompileResult> {
        // Phase 1: Symbol table
        let symbol_table = SymbolTableBuilder::new().build(program);

        // Phase 2: Semantic analysis
        let report = SemanticAnalyzer::new(&symbol_table).analyze(program);
        if !report.is_ok() && self.options.halt_on_semantic_errors {
            return Err(Error::SemanticErrors {
                count: report.error_count(),
            });
        }

        // Phase 3: IR
        let ir = IrGenerator::new().generate(program);

        // Phase 4: Assembly
        let asm = CodeGenerator::new(&symbol_table, self.options.registers).generate(&ir);

        // Phase 5: Label resolution
        let post = PostProcessor::new().run(&asm.to_string());
        if report.is_ok() {
            ensure_labels_resolved(&post)?;
        }

        Ok(CompileResult {
            symbol_table,
            report,
            ir,
            asm,
            post,
        })
    }

    /// Parse a JSON AST and compile it
    pub fn compile_json(&self, json: &str) -> Result<CompileResult> {
        let program = Program::from_json(json)?;
        self.compile(&program)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}
