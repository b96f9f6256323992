//! # dcf-sheets
//!
//! Workbook sessions for spreadsheet-driven valuation models.
//!
//! A workbook file is opened in one of three access modes:
//!
//! - `read` ([`Mode::ReadOnly`]): query only
//! - `modify` ([`Mode::Mutable`]): in-memory edits, never written back
//! - `write` ([`Mode::Persistent`]): edits, `save`, and auto-save on a clean close
//!
//! Formula cells are computed by the [`FormulaBridge`] against the saved
//! file; a write session saves before each evaluation.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dcf_sheets::prelude::*;
//!
//! Session::scope("valuation.xlsx", Mode::Persistent, |book| {
//!     book.set("Ticker", "ACME")?;
//!     book.set("A3", 3)?;
//!     book.set("A4", 4)?;
//!     book.set("A5", "=SUM(A3:A4)")?;
//!     assert_eq!(book.evaluate_formula("A5")?, CellValue::Number(7.0));
//!     Ok(())
//! })?;
//! # Ok::<(), dcf_sheets::Error>(())
//! ```

pub mod bridge;
pub mod error;
pub mod io;
pub mod mode;
pub mod options;
pub mod prelude;
pub mod session;

use std::path::Path;

pub use bridge::{evaluate_stored, FormulaBridge};
pub use error::{Error, Result};
pub use io::{FileFormat, WorkbookExt};
pub use mode::Mode;
pub use options::{CreatePolicy, OpenOptions};
pub use session::Session;

// Re-export core types
pub use dcf_sheets_core::{
    Alignment, ArithOp, Border, BorderEdge, BorderLineStyle, Cell, CellAddress, CellComment,
    CellError, CellRange, CellValue, Color, Fill, Font, HorizontalAlignment, Hyperlink, Index,
    Lookup, MergeReport, NameScope, NamedRange, Protection, RangeItem, RangeMode, RangeRequest,
    RowWindow, Style, Table, Target, VerticalAlignment, Workbook, Worksheet, MAX_COLS, MAX_ROWS,
    MAX_SHEET_NAME_LEN,
};

// Re-export formula types
pub use dcf_sheets_formula::{
    evaluate, evaluate_cell, parse_formula, EvaluationContext, FormulaError, FormulaExpr,
    FormulaResult, FormulaValue,
};

// Re-export I/O types
#[cfg(feature = "csv")]
pub use dcf_sheets_csv::{CsvError, CsvReadOptions, CsvReader, CsvWriteOptions, CsvWriter};
#[cfg(feature = "xlsx")]
pub use dcf_sheets_xlsx::{XlsxError, XlsxReader, XlsxWriter};

/// Open `path` in the mode named by `mode` (`r`/`read`, `m`/`modify`,
/// `w`/`write`)
///
/// Unknown modes fail with [`Error::UnknownMode`]. Missing files are not
/// created; use [`OpenOptions`] for that.
pub fn open<P: AsRef<Path>>(path: P, mode: &str) -> Result<Session> {
    let mode: Mode = mode.parse()?;
    OpenOptions::new().open(path, mode)
}
