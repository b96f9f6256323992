//! Formula evaluation through saved files

use dcf_sheets::prelude::*;
use dcf_sheets::{CellError, Error, FormulaError};
use dcf_sheets_core::Error as CoreError;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn new_book(dir: &TempDir, name: &str) -> Session {
    OpenOptions::new()
        .create(CreatePolicy::Always)
        .open(dir.path().join(name), Mode::Persistent)
        .unwrap()
}

#[test]
fn test_sum_tracks_saved_edits() {
    let dir = TempDir::new().unwrap();
    let mut book = new_book(&dir, "sum.xlsx");

    book.set("A3", 3).unwrap();
    book.set("A4", 4).unwrap();
    book.set("A5", "=SUM(A3:A4)").unwrap();
    assert_eq!(book.evaluate_formula("A5").unwrap(), CellValue::Number(7.0));

    book.set("A4", 5).unwrap();
    assert_eq!(book.evaluate_formula("A5").unwrap(), CellValue::Number(8.0));

    // evaluation flushed the edit to disk
    let path = book.path().unwrap().to_path_buf();
    assert_eq!(Workbook::open(&path).unwrap().value("A4").unwrap(), CellValue::Number(5.0));
    book.close().unwrap();
}

#[test]
fn test_csv_backed_session_evaluates() {
    let dir = TempDir::new().unwrap();
    let mut book = new_book(&dir, "m.csv");
    assert_eq!(book.active_sheet(), "m");

    book.set("A3", 3).unwrap();
    book.set("A4", 4).unwrap();
    book.set("A5", "=SUM(A3:A4)").unwrap();
    assert_eq!(book.evaluate_formula("A5").unwrap(), CellValue::Number(7.0));

    book.set("A4", 5).unwrap();
    assert_eq!(book.get_evaluated("A5").unwrap(), CellValue::Number(8.0));
    book.close().unwrap();

    let reopened = open(dir.path().join("m.csv"), "r").unwrap();
    assert_eq!(reopened.sheets(), vec!["m"]);
    assert_eq!(reopened.value("A5").unwrap(), CellValue::formula("=SUM(A3:A4)"));
}

#[test]
fn test_csv_session_evaluates_after_rename() {
    let dir = TempDir::new().unwrap();
    let mut book = new_book(&dir, "prices.csv");
    book.rename_sheet("prices", "Close").unwrap();
    book.set("B1", 2).unwrap();
    book.set("B2", "=B1*10").unwrap();

    assert_eq!(book.evaluate_formula("B2").unwrap(), CellValue::Number(20.0));
}

#[test]
fn test_get_evaluated_routes_formula_text() {
    let dir = TempDir::new().unwrap();
    let mut book = new_book(&dir, "route.xlsx");

    book.set("A1", 10).unwrap();
    book.set("A2", 2.5).unwrap();
    book.set("B1", "=A1*A2").unwrap();
    book.set("B2", CellValue::string("A1+A2")).unwrap();
    book.set("B3", "Net debt").unwrap();

    assert_eq!(book.get_evaluated("B1").unwrap(), CellValue::Number(25.0));
    assert_eq!(book.get_evaluated("B2").unwrap(), CellValue::Number(12.5));
    assert_eq!(book.get_evaluated("B3").unwrap(), CellValue::string("Net debt"));
    assert_eq!(book.get_evaluated("A1").unwrap(), CellValue::Number(10.0));

    // plain reads return what is stored
    assert_eq!(book.value("B1").unwrap(), CellValue::formula("A1*A2"));
    book.close().unwrap();
}

#[test]
fn test_named_ranges_and_sheet_references() {
    let dir = TempDir::new().unwrap();
    let mut book = new_book(&dir, "names.xlsx");

    book.new_sheet("Free Cash Flow").unwrap();
    book.name("B2", "Growth", Some("Free Cash Flow")).unwrap();
    book.set("Growth", 0.05).unwrap();
    book.set("'Free Cash Flow'!B3", 200).unwrap();

    book.set("C1", "=Growth*2").unwrap();
    book.set("C2", "='Free Cash Flow'!B3*(1+Growth)").unwrap();
    book.set("C3", "=NoSuchSheet!A1").unwrap();

    assert_eq!(book.evaluate_formula("C1").unwrap(), CellValue::Number(0.1));
    let grown = book.evaluate_formula("C2").unwrap().as_number().unwrap();
    assert!((grown - 210.0).abs() < 1e-9);
    assert_eq!(
        book.evaluate_formula("C3").unwrap(),
        CellValue::Error(CellError::Ref)
    );
    book.close().unwrap();
}

#[test]
fn test_modify_mode_reads_the_opened_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("saved.xlsx");
    let mut wb = Workbook::new();
    wb.set("A1", 2).unwrap();
    wb.set("A2", "=A1*10").unwrap();
    wb.save(&path).unwrap();

    let mut book = open(&path, "m").unwrap();
    book.set("A1", 3).unwrap();

    assert_eq!(book.evaluate_formula("A2").unwrap(), CellValue::Number(20.0));
    assert_eq!(book.get_evaluated("A2").unwrap(), CellValue::Number(20.0));
}

#[test]
fn test_read_mode_does_not_evaluate() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("read.xlsx");
    let mut wb = Workbook::new();
    wb.set("A1", "=1+2").unwrap();
    wb.save(&path).unwrap();

    let mut book = open(&path, "r").unwrap();
    assert_eq!(book.get_evaluated("A1").unwrap(), CellValue::formula("1+2"));
    assert!(matches!(
        book.evaluate_formula("A1").unwrap_err().as_core(),
        Some(CoreError::CapabilityDenied { operation: "evaluate", mode: "read" })
    ));
}

#[test]
fn test_circular_reference_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut book = new_book(&dir, "cycle.xlsx");

    book.set("A1", "=B1+1").unwrap();
    book.set("B1", "=A1+1").unwrap();

    assert!(matches!(
        book.evaluate_formula("A1"),
        Err(Error::Formula(FormulaError::CircularReference(_)))
    ));
    book.close().unwrap();
}

#[test]
fn test_dcf_functions() {
    let dir = TempDir::new().unwrap();
    let mut book = new_book(&dir, "dcf.xlsx");

    book.set("A1", -100).unwrap();
    book.set("A2", 60).unwrap();
    book.set("A3", 60).unwrap();
    book.set("B1", "=NPV(0.1,A2:A3)+A1").unwrap();
    book.set("B2", "=ROUND(IRR(A1:A3),4)").unwrap();

    let npv = book.evaluate_formula("B1").unwrap().as_number().unwrap();
    assert!((npv - 4.132_231_404_958_68).abs() < 1e-9);
    assert_eq!(book.evaluate_formula("B2").unwrap(), CellValue::Number(0.1307));
    book.close().unwrap();
}
