//! # dcf-sheets-core
//!
//! Core data structures for the dcf-sheets workbook layer.
//!
//! - [`cell`]: the bijective base-26 address codec, [`CellValue`], and the
//!   [`Cell`] value object with its ordering and arithmetic
//! - [`Style`]: per-cell formatting (font, fill, border, alignment, number
//!   format, protection)
//! - [`Workbook`] and [`Worksheet`]: the in-memory store, with index
//!   resolution, range traversal, sheet lifecycle, merge and tabular blocks
//!
//! ## Example
//!
//! ```rust
//! use dcf_sheets_core::{CellValue, Workbook};
//!
//! let mut workbook = Workbook::new();
//! workbook.set("A2", 3).unwrap();
//!
//! let mut cell = workbook.cell("A2").unwrap();
//! cell.add_assign(3).unwrap();
//! workbook.set("A2", &cell).unwrap();
//!
//! assert_eq!(workbook.value("A2").unwrap(), CellValue::Number(6.0));
//! ```

pub mod annotation;
pub mod cell;
pub mod error;
pub mod index;
pub mod merge;
pub mod named_range;
pub mod range;
pub mod style;
pub mod table;
pub mod workbook;
pub mod worksheet;

pub use annotation::{CellComment, Hyperlink};
pub use cell::{
    ArithOp, Cell, CellAddress, CellData, CellError, CellRange, CellValue, SharedString,
};
pub use error::{Error, Result};
pub use index::{Index, Lookup, Target};
pub use merge::MergeReport;
pub use named_range::{Destination, NameScope, NamedRange, NamedRangeCollection};
pub use range::{RangeItem, RangeIter, RangeMode, RangeRequest, RowWindow};
pub use style::{
    Alignment, Border, BorderEdge, BorderLineStyle, Color, Fill, Font, HorizontalAlignment,
    Protection, Style, StylePool, VerticalAlignment,
};
pub use table::Table;
pub use workbook::{Workbook, DEFAULT_SHEET_NAME};
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
