//! Formula Bridge
//!
//! Formula cells are computed against the workbook file on disk, never
//! against unsaved in-memory edits. Every call re-reads the file, so a value
//! that was changed and saved is seen by the next evaluation of anything
//! depending on it. Flushing pending edits first is the caller's step; a
//! [`Session`](crate::Session) in write mode does it before each evaluation.

use std::path::{Path, PathBuf};

use dcf_sheets_core::{CellAddress, CellValue, Workbook};
use dcf_sheets_formula::{evaluate, evaluate_cell, parse_formula, EvaluationContext};

use crate::error::Result;
use crate::io::WorkbookExt;

/// Evaluates cells of a saved workbook
#[derive(Debug, Clone)]
pub struct FormulaBridge {
    path: PathBuf,
}

impl FormulaBridge {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file and compute the value at `address` on `sheet`
    /// (the active sheet when `None`)
    pub fn evaluate(&self, sheet: Option<&str>, address: CellAddress) -> Result<CellValue> {
        log::debug!(
            "re-reading {} to evaluate {}",
            self.path.display(),
            address.position()
        );
        let workbook = Workbook::open(&self.path)?;
        evaluate_stored(&workbook, sheet, address)
    }
}

/// Compute the value stored at `address`
///
/// Formulas and `=`-prefixed text are evaluated. Text containing `+` is
/// evaluated as if it started with `=`, and stays literal when it does not
/// parse or evaluate as a formula. Anything else is returned as stored.
pub fn evaluate_stored(
    workbook: &Workbook,
    sheet: Option<&str>,
    address: CellAddress,
) -> Result<CellValue> {
    let ws = workbook.sheet_or_active(sheet)?;
    match ws.get_value_at(address.row, address.col) {
        CellValue::String(text)
            if !text.as_str().starts_with('=') && text.as_str().contains('+') =>
        {
            let ctx = EvaluationContext::new(workbook, ws.name());
            let computed = parse_formula(&format!("={}", text.as_str()))
                .and_then(|expr| evaluate(&expr, &ctx));
            match computed {
                Ok(value) => Ok(value.into()),
                Err(e) => {
                    log::debug!("keeping '{}' as text: {}", text.as_str(), e);
                    Ok(CellValue::String(text))
                }
            }
        }
        _ => Ok(evaluate_cell(workbook, Some(ws.name()), address)?.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(position: &str) -> CellAddress {
        CellAddress::parse(position).unwrap()
    }

    #[test]
    fn test_evaluate_stored_values() {
        let mut wb = Workbook::new();
        wb.set("A1", 3).unwrap();
        wb.set("A2", 4).unwrap();
        wb.set("A3", "=A1*A2").unwrap();
        wb.set("B1", CellValue::string("A1+A2")).unwrap();
        wb.set("B2", CellValue::string("Revenue + growth")).unwrap();
        wb.set("B3", "Revenue").unwrap();

        assert_eq!(evaluate_stored(&wb, None, at("A3")).unwrap(), CellValue::Number(12.0));
        assert_eq!(evaluate_stored(&wb, None, at("B1")).unwrap(), CellValue::Number(7.0));
        assert_eq!(
            evaluate_stored(&wb, None, at("B2")).unwrap(),
            CellValue::string("Revenue + growth")
        );
        assert_eq!(evaluate_stored(&wb, None, at("B3")).unwrap(), CellValue::string("Revenue"));
        assert_eq!(evaluate_stored(&wb, None, at("A1")).unwrap(), CellValue::Number(3.0));
    }

    #[test]
    fn test_evaluate_on_named_sheet() {
        let mut wb = Workbook::new();
        wb.new_sheet("Inputs").unwrap();
        wb.set("'Inputs'!A1", 2).unwrap();
        wb.set("'Inputs'!A2", "=A1^3").unwrap();

        assert_eq!(
            evaluate_stored(&wb, Some("Inputs"), at("A2")).unwrap(),
            CellValue::Number(8.0)
        );
    }
}
