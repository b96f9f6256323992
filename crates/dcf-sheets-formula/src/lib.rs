//! # dcf-sheets-formula
//!
//! Formula parser and evaluator for dcf-sheets workbooks.
//!
//! - Formula parsing (text → AST), with sheet-qualified and quoted references
//! - Evaluation against a [`Workbook`](dcf_sheets_core::Workbook), following
//!   references into other formula cells and rejecting cycles
//! - Built-in functions for aggregates, logic and discounting
//!
//! ## Example
//!
//! ```rust
//! use dcf_sheets_core::{CellAddress, Workbook};
//! use dcf_sheets_formula::{evaluate_cell, FormulaValue};
//!
//! let mut workbook = Workbook::new();
//! workbook.set("A3", 3).unwrap();
//! workbook.set("A4", 4).unwrap();
//! workbook.set("A5", "=SUM(A3:A4)").unwrap();
//!
//! let a5 = CellAddress::parse("A5").unwrap();
//! assert_eq!(evaluate_cell(&workbook, None, a5).unwrap(), FormulaValue::Number(7.0));
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;

pub use ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{evaluate, evaluate_cell, EvaluationContext, FormulaValue};
pub use parser::parse_formula;
