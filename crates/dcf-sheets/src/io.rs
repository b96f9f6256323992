//! File-format dispatch by extension

use std::path::{Path, PathBuf};

use dcf_sheets_core::Workbook;

use crate::error::{Error, Result};

/// Storage formats a workbook can be loaded from and saved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Office Open XML (`.xlsx`, `.xlsm`, `.xltm`)
    #[cfg(feature = "xlsx")]
    Xlsx,
    /// Comma-separated values; one sheet, positions anchored at A1
    #[cfg(feature = "csv")]
    Csv,
}

impl FileFormat {
    /// Pick the format from the file extension, ignoring case
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            #[cfg(feature = "xlsx")]
            Some("xlsx") | Some("xlsm") | Some("xltm") => Ok(FileFormat::Xlsx),
            #[cfg(feature = "csv")]
            Some("csv") => Ok(FileFormat::Csv),
            _ => Err(Error::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

impl FileFormat {
    /// Whether files of this format store a single, unnamed sheet
    pub fn holds_one_sheet(self) -> bool {
        match self {
            #[cfg(feature = "xlsx")]
            FileFormat::Xlsx => false,
            #[cfg(feature = "csv")]
            FileFormat::Csv => true,
        }
    }
}

/// Empty workbook for a new file at `path`
///
/// A CSV file loads as a sheet named after its stem, so the new workbook's
/// sheet is named the same way.
pub(crate) fn new_workbook_for(path: &Path) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    match FileFormat::from_path(path)? {
        #[cfg(feature = "csv")]
        FileFormat::Csv => {
            let current = workbook.active_sheet_name().to_string();
            let name = dcf_sheets_csv::CsvReader::sheet_name(path);
            if name != current {
                workbook.rename_sheet(&current, &name)?;
            }
        }
        #[cfg(feature = "xlsx")]
        FileFormat::Xlsx => {}
    }
    Ok(workbook)
}

/// Extension trait for Workbook to add file I/O
pub trait WorkbookExt: Sized {
    /// Load a workbook from a file
    fn open<P: AsRef<Path>>(path: P) -> Result<Self>;

    /// Save the workbook to a file
    ///
    /// CSV keeps only the active sheet's values.
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>;
}

impl WorkbookExt for Workbook {
    fn open<P: AsRef<Path>>(path: P) -> Result<Workbook> {
        let path = path.as_ref();
        let workbook = match FileFormat::from_path(path)? {
            #[cfg(feature = "xlsx")]
            FileFormat::Xlsx => dcf_sheets_xlsx::XlsxReader::read_file(path)?,
            #[cfg(feature = "csv")]
            FileFormat::Csv => {
                let options = dcf_sheets_csv::CsvReadOptions::default().with_header(false);
                let worksheet = dcf_sheets_csv::CsvReader::read_file(path, &options)?;
                Workbook::from_worksheets(vec![worksheet])?
            }
        };
        log::debug!("loaded {} ({} sheet(s))", path.display(), workbook.sheet_count());
        Ok(workbook)
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        match FileFormat::from_path(path)? {
            #[cfg(feature = "xlsx")]
            FileFormat::Xlsx => dcf_sheets_xlsx::XlsxWriter::write_file(self, path)?,
            #[cfg(feature = "csv")]
            FileFormat::Csv => {
                if self.sheet_count() > 1 {
                    log::warn!(
                        "{} holds one sheet; only '{}' is written",
                        path.display(),
                        self.active_sheet_name()
                    );
                }
                dcf_sheets_csv::CsvWriter::write_file(
                    self.active_sheet(),
                    path,
                    &dcf_sheets_csv::CsvWriteOptions::default(),
                )?
            }
        }
        log::debug!("wrote {}", path.display());
        Ok(())
    }
}

/// Absolute form of `path`, falling back to the path as given
pub(crate) fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(all(test, feature = "xlsx", feature = "csv"))]
mod tests {
    use super::*;
    use dcf_sheets_core::CellValue;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("model.XLSX")).unwrap(), FileFormat::Xlsx);
        assert_eq!(FileFormat::from_path(Path::new("macro.xlsm")).unwrap(), FileFormat::Xlsx);
        assert_eq!(FileFormat::from_path(Path::new("prices.csv")).unwrap(), FileFormat::Csv);
        assert!(matches!(
            FileFormat::from_path(Path::new("model.ods")),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(FileFormat::from_path(Path::new("no_extension")).is_err());
    }

    #[test]
    fn test_csv_keeps_positions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.csv");

        let mut wb = Workbook::new();
        wb.set("B2", 10).unwrap();
        wb.set("C3", "x").unwrap();
        wb.save(&path).unwrap();

        let loaded = Workbook::open(&path).unwrap();
        assert_eq!(loaded.sheets(), vec!["prices"]);
        assert_eq!(loaded.value("B2").unwrap(), CellValue::Number(10.0));
        assert_eq!(loaded.value("C3").unwrap(), CellValue::string("x"));
        assert_eq!(loaded.value("A1").unwrap(), CellValue::Empty);
    }

    #[test]
    fn test_csv_keeps_formula_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.csv");

        let mut wb = new_workbook_for(&path).unwrap();
        assert_eq!(wb.sheets(), vec!["m"]);
        wb.set("A3", 3).unwrap();
        wb.set("A4", 4).unwrap();
        wb.set("A5", "=SUM(A3:A4)").unwrap();
        wb.save(&path).unwrap();

        let loaded = Workbook::open(&path).unwrap();
        assert_eq!(loaded.sheets(), vec!["m"]);
        assert_eq!(loaded.value("A5").unwrap(), CellValue::formula("=SUM(A3:A4)"));
    }

    #[test]
    fn test_new_workbook_for_xlsx_keeps_default_sheet() {
        let wb = new_workbook_for(Path::new("model.xlsx")).unwrap();
        assert_eq!(wb.sheets(), vec!["Sheet1"]);
        assert!(!FileFormat::Xlsx.holds_one_sheet());
        assert!(FileFormat::Csv.holds_one_sheet());
    }
}
