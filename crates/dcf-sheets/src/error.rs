//! Error types for sessions and file dispatch

use std::path::PathBuf;
use thiserror::Error;

/// Result type for dcf-sheets operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by sessions, file dispatch and the formula bridge
#[derive(Debug, Error)]
pub enum Error {
    /// Store error: addressing, capability checks, missing save path
    #[error(transparent)]
    Core(#[from] dcf_sheets_core::Error),

    /// Formula parse or evaluation error
    #[error(transparent)]
    Formula(#[from] dcf_sheets_formula::FormulaError),

    /// XLSX read or write error
    #[cfg(feature = "xlsx")]
    #[error(transparent)]
    Xlsx(#[from] dcf_sheets_xlsx::XlsxError),

    /// CSV read or write error
    #[cfg(feature = "csv")]
    #[error(transparent)]
    Csv(#[from] dcf_sheets_csv::CsvError),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The mode string names no access mode
    #[error("Mode '{0}' is not defined; expected read, modify or write")]
    UnknownMode(String),

    /// Creating a missing workbook was not confirmed
    #[error("Creating a new workbook at {} was declined", .0.display())]
    Declined(PathBuf),

    /// No reader or writer handles this file extension
    #[error("Unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

impl Error {
    /// The store error behind this one, if any
    pub fn as_core(&self) -> Option<&dcf_sheets_core::Error> {
        match self {
            Error::Core(e) => Some(e),
            Error::Formula(dcf_sheets_formula::FormulaError::Core(e)) => Some(e),
            _ => None,
        }
    }
}
