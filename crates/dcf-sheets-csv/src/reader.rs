//! CSV reader

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;

use crate::error::{CsvError, CsvResult};
use crate::options::CsvReadOptions;
use dcf_sheets_core::{CellValue, Table, Worksheet};

/// CSV file reader
pub struct CsvReader;

impl CsvReader {
    /// Read a CSV file into a table
    pub fn read_table_file<P: AsRef<Path>>(path: P, options: &CsvReadOptions) -> CsvResult<Table> {
        let path = path.as_ref();
        log::debug!("reading csv table from {}", path.display());
        let file = File::open(path)?;
        Self::read_table(file, options)
    }

    /// Read CSV from a reader into a table
    ///
    /// Without a header row the table has no headers and every record is a
    /// data row.
    pub fn read_table<R: Read>(reader: R, options: &CsvReadOptions) -> CsvResult<Table> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .has_headers(options.has_header)
            .flexible(options.flexible)
            .from_reader(reader);

        let mut table = if options.has_header {
            Table::new(csv_reader.headers()?.iter().map(str::trim))
        } else {
            Table::default()
        };

        for result in csv_reader.records() {
            let record = result?;
            let row = record
                .iter()
                .map(|field| {
                    if options.auto_detect_types {
                        Self::detect_type(field, &options.date_formats)
                    } else {
                        CellValue::string(field)
                    }
                })
                .collect();
            table.push_row(row);
        }

        log::debug!(
            "read {} rows x {} columns of csv",
            table.len(),
            table.width()
        );
        Ok(table)
    }

    /// Read a CSV file into a worksheet named by [`CsvReader::sheet_name`]
    pub fn read_file<P: AsRef<Path>>(path: P, options: &CsvReadOptions) -> CsvResult<Worksheet> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::read(file, Self::sheet_name(path), options)
    }

    /// Sheet name for a CSV file: its stem, or `Sheet1` when it has none
    pub fn sheet_name<P: AsRef<Path>>(path: P) -> String {
        path.as_ref()
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("Sheet1")
            .to_string()
    }

    /// Read CSV into a worksheet: the header (if any) in row 1, records below
    pub fn read<R: Read>(
        reader: R,
        name: impl Into<String>,
        options: &CsvReadOptions,
    ) -> CsvResult<Worksheet> {
        let table = Self::read_table(reader, options)?;
        let mut worksheet = Worksheet::new(name);

        let header = (!table.headers.is_empty())
            .then(|| table.headers.iter().map(CellValue::string).collect::<Vec<_>>());
        for (row_idx, row) in header.iter().chain(table.rows.iter()).enumerate() {
            let row_u32 = u32::try_from(row_idx).map_err(|_| CsvError::Parse {
                row: row_idx,
                column: 0,
                message: "too many rows".to_string(),
            })?;
            for (col_idx, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let col = u16::try_from(col_idx).map_err(|_| CsvError::Parse {
                    row: row_idx,
                    column: col_idx,
                    message: "too many columns".to_string(),
                })?;
                worksheet.set_value_at(row_u32, col, value.clone())?;
            }
        }

        Ok(worksheet)
    }

    /// Detect the type of a field value
    fn detect_type(field: &str, date_formats: &[String]) -> CellValue {
        let field = field.trim();

        if field.is_empty() {
            return CellValue::Empty;
        }

        if field.len() > 1 && field.starts_with('=') {
            return CellValue::formula(field);
        }

        if field.eq_ignore_ascii_case("true") {
            return CellValue::Boolean(true);
        }
        if field.eq_ignore_ascii_case("false") {
            return CellValue::Boolean(false);
        }

        // "inf" and "NaN" parse as floats but are tickers or labels here
        if let Ok(n) = field.parse::<f64>() {
            if n.is_finite() {
                return CellValue::Number(n);
            }
        }

        if let Some(date) = date_formats
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(field, fmt).ok())
        {
            return CellValue::from_date(date);
        }

        CellValue::string(field)
    }
}
