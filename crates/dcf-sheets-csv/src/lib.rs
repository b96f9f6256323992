//! # dcf-sheets-csv
//!
//! CSV reader and writer for dcf-sheets.
//!
//! Provider data (financial statements, price histories) usually arrives as
//! CSV. [`CsvReader`] turns it into a [`Table`](dcf_sheets_core::Table) that
//! can be written into a sheet as a tabular block; [`CsvWriter`] does the
//! reverse for tables and whole worksheets.

mod error;
mod options;
mod reader;
mod writer;

pub use error::{CsvError, CsvResult};
pub use options::{CsvReadOptions, CsvWriteOptions, LineTerminator};
pub use reader::CsvReader;
pub use writer::CsvWriter;
