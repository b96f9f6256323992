//! Prelude module - common imports for dcf-sheets users
//!
//! ```rust
//! use dcf_sheets::prelude::*;
//! ```

pub use crate::{
    open,
    Cell,
    CellAddress,
    CellRange,
    CellValue,
    CreatePolicy,
    Error,
    Index,
    Lookup,
    MergeReport,
    Mode,
    OpenOptions,
    RangeMode,
    Result,
    Session,
    Style,
    Table,
    Workbook,
    WorkbookExt,
    Worksheet,
};
