//! # dcf-sheets-xlsx
//!
//! XLSX (Office Open XML) reader and writer for dcf-sheets.
//!
//! Values, formulas with their cached results, per-cell styles, column
//! widths, comments, hyperlinks and defined names survive a write/read
//! cycle. Anything else found in a package is skipped with a debug log.

pub mod error;
pub mod reader;
pub mod writer;

mod styles;
mod xml;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxReader;
pub use writer::XlsxWriter;
