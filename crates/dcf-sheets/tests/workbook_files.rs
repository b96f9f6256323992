//! Merging, tabular ingestion and CSV-backed sessions

use dcf_sheets::prelude::*;
use dcf_sheets::{CsvReadOptions, CsvReader};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tempfile::TempDir;

fn rows_file(dir: &TempDir, file: &str, sheet: &str, first: i32, count: i32) -> PathBuf {
    let path = dir.path().join(file);
    let mut wb = Workbook::from_worksheets(vec![Worksheet::new(sheet)]).unwrap();
    for i in 0..count {
        let row = i + 1;
        wb.set(format!("A{}", row).as_str(), first + i).unwrap();
        wb.set(format!("B{}", row).as_str(), format!("row {}", first + i)).unwrap();
    }
    wb.save(&path).unwrap();
    path
}

#[test]
fn test_merge_appends_rows() {
    let dir = TempDir::new().unwrap();
    let left = rows_file(&dir, "left.xlsx", "X", 1, 2);
    let right = rows_file(&dir, "right.xlsx", "X", 10, 3);

    let mut book = open(&left, "w").unwrap();
    let report = book.merge_file(&right).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.appended, vec!["X"]);

    let x = book.worksheet("X").unwrap();
    assert_eq!(x.max_row(), 5);
    let firsts: Vec<CellValue> = (1..=5)
        .map(|r| book.value(format!("A{}", r).as_str()).unwrap())
        .collect();
    assert_eq!(
        firsts,
        [1.0, 2.0, 10.0, 11.0, 12.0].map(CellValue::Number).to_vec()
    );
    assert_eq!(book.value("B3").unwrap(), CellValue::string("row 10"));
    book.close().unwrap();

    let on_disk = Workbook::open(&left).unwrap();
    assert_eq!(on_disk.worksheet("X").unwrap().max_row(), 5);
}

#[test]
fn test_merge_creates_missing_sheets() {
    let dir = TempDir::new().unwrap();
    let left = rows_file(&dir, "left.xlsx", "X", 1, 2);
    let right = rows_file(&dir, "right.xlsx", "Y", 5, 1);

    let mut book = open(&left, "m").unwrap();
    let report = book.merge_file(&right).unwrap();
    assert_eq!(report.created, vec!["Y"]);
    assert_eq!(book.sheets(), vec!["X", "Y"]);
    assert_eq!(book.value("'Y'!A1").unwrap(), CellValue::Number(5.0));
}

#[test]
fn test_merge_denied_in_read_mode() {
    let dir = TempDir::new().unwrap();
    let left = rows_file(&dir, "left.xlsx", "X", 1, 2);
    let right = rows_file(&dir, "right.xlsx", "X", 10, 3);

    let mut book = open(&left, "r").unwrap();
    assert!(book.merge_file(&right).is_err());
    assert_eq!(book.worksheet("X").unwrap().max_row(), 2);
}

#[test]
fn test_provider_table_into_template() {
    let dir = TempDir::new().unwrap();
    let template = rows_file(&dir, "template.xlsx", "Financials", 0, 0);
    let csv = "Year,Revenue,EBIT\n2023,1000,150.5\n2024,1100,171\n";
    let table = CsvReader::read_table(csv.as_bytes(), &CsvReadOptions::default()).unwrap();

    Session::scope(&template, Mode::Persistent, |book| {
        book.set_tabular_block("C5", "Financials", &table, true)?;
        book.set_tabular_block_with_index(
            "C10",
            "Financials",
            &table,
            false,
            &[CellValue::string("FY23"), CellValue::string("FY24")],
        )
    })
    .unwrap();

    let wb = Workbook::open(&template).unwrap();
    assert_eq!(wb.value("'Financials'!C5").unwrap(), CellValue::string("Year"));
    assert_eq!(wb.value("'Financials'!E6").unwrap(), CellValue::Number(150.5));
    assert_eq!(wb.value("'Financials'!C7").unwrap(), CellValue::Number(2024.0));
    assert_eq!(wb.value("'Financials'!C10").unwrap(), CellValue::string("FY23"));
    assert_eq!(wb.value("'Financials'!D11").unwrap(), CellValue::Number(2024.0));
}

#[test]
fn test_csv_backed_session() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("prices.csv");

    let mut book = OpenOptions::new()
        .create(CreatePolicy::Always)
        .open(&path, Mode::Persistent)
        .unwrap();
    book.set("A1", "Ticker").unwrap();
    book.set("B1", "Close").unwrap();
    book.set("A2", "ACME").unwrap();
    book.set("B2", 41.5).unwrap();
    book.close().unwrap();

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "Ticker,Close\r\nACME,41.5\r\n"
    );

    let book = open(&path, "r").unwrap();
    assert_eq!(book.value("B2").unwrap(), CellValue::Number(41.5));
    assert_eq!(book.active_sheet(), "prices");
}

#[test]
fn test_unsupported_format() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.ods");
    std::fs::write(&path, b"not a workbook").unwrap();

    assert!(matches!(
        open(&path, "r"),
        Err(dcf_sheets::Error::UnsupportedFormat(_))
    ));
}
