//! Error types for the C-Minus backend

use thiserror::Error;

/// Backend errors
///
/// Semantic diagnostics are not reported through this type one by one; they
/// accumulate in a [`crate::compiler::SemanticReport`] and only the aggregate
/// count surfaces here when the pipeline refuses to continue.
#[derive(Error, Debug)]
pub enum Error {
    /// Semantic analysis reported errors and the pipeline was configured to halt
    ///
    /// **Triggered by:** any rule violation found by the analyzer
    /// **Example:** a program without `main`
    #[error("Semantic analysis failed with {count} error(s)")]
    SemanticErrors {
        /// Number of reported errors
        count: usize,
    },

    /// Compiler error
    #[error("Compiler error: {0}")]
    CompilerError(String),

    /// Reading the AST or writing an artifact failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The AST handed over by the front end is not valid JSON for [`crate::Program`]
    #[error("Malformed AST: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a compiler error with a message
    pub fn compiler(msg: impl Into<String>) -> Self {
        Error::CompilerError(msg.into())
    }
}

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, Error>;
