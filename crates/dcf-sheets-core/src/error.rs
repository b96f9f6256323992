//! Error types for dcf-sheets-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the address codec, the `Cell` value object and the workbook store
#[derive(Debug, Error)]
pub enum Error {
    /// Position string is not `[A-Z]+[0-9]+`
    #[error("Malformed cell address: '{0}'")]
    MalformedAddress(String),

    /// Column arithmetic produced an index below 1
    #[error("Column {column} shifted by {delta} is out of range")]
    ColumnOutOfRange { column: String, delta: i64 },

    /// Relational comparison between cells of different sheets
    #[error("Cannot compare cells from different sheets: '{left}' vs '{right}'")]
    IncomparableSheets { left: String, right: String },

    /// Index is neither a sheet, a named range nor a valid address
    #[error("Address not found: '{0}'")]
    AddressNotFound(String),

    /// `range` needs exactly one output mode
    #[error("Exactly one range mode must be requested, got {0}")]
    AmbiguousRangeMode(usize),

    /// Write attempted through a session that lacks the capability
    #[error("{operation} is not permitted in {mode} mode")]
    CapabilityDenied {
        operation: &'static str,
        mode: &'static str,
    },

    /// Save requested without an explicit or remembered path
    #[error("No path was found to save the workbook")]
    NoPath,

    /// The underlying value operation failed
    #[error("Cannot {operation} {other_type} to a cell holding {self_type}")]
    CellArithmetic {
        operation: &'static str,
        self_type: &'static str,
        other_type: &'static str,
    },

    /// A sheet name was used where a cell is required
    #[error("'{0}' refers to a sheet, not a cell")]
    NotACell(String),

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u32, u16),

    /// Sheet not found by name
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Invalid sheet name
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Duplicate sheet name
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// Invalid named range
    #[error("Invalid named range: {0}")]
    InvalidName(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    pub(crate) fn malformed<S: Into<String>>(position: S) -> Self {
        Error::MalformedAddress(position.into())
    }
}
