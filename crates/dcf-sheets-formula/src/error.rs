//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing or evaluation
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Formula evaluation error
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// A formula depends on its own value
    #[error("Circular reference through {0}")]
    CircularReference(String),

    /// A dependency chain went past the nesting limit without resolving
    #[error("Formula nesting too deep at {0}")]
    NestingTooDeep(String),

    /// Reference to an unknown name or cell
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Store error raised while looking up a cell
    #[error(transparent)]
    Core(#[from] dcf_sheets_core::Error),
}
