//! CSV writer

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::CsvResult;
use crate::options::{CsvWriteOptions, LineTerminator};
use dcf_sheets_core::{CellValue, Table, Worksheet};

/// CSV file writer
pub struct CsvWriter;

impl CsvWriter {
    /// Write a table to a CSV file
    pub fn write_table_file<P: AsRef<Path>>(
        table: &Table,
        path: P,
        options: &CsvWriteOptions,
    ) -> CsvResult<()> {
        let file = File::create(path)?;
        Self::write_table(table, file, options)
    }

    /// Write a table to a writer
    pub fn write_table<W: Write>(
        table: &Table,
        writer: W,
        options: &CsvWriteOptions,
    ) -> CsvResult<()> {
        let mut csv_writer = Self::builder(options).from_writer(writer);

        if options.write_header && !table.headers.is_empty() {
            csv_writer.write_record(&table.headers)?;
        }
        for row in &table.rows {
            csv_writer.write_record(row.iter().map(|v| field_text(v, options)))?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Write a worksheet to a CSV file
    pub fn write_file<P: AsRef<Path>>(
        worksheet: &Worksheet,
        path: P,
        options: &CsvWriteOptions,
    ) -> CsvResult<()> {
        let file = File::create(path)?;
        Self::write(worksheet, file, options)
    }

    /// Write a worksheet to a writer
    ///
    /// Rows and columns start at A1 so positions survive a read back;
    /// `write_header` does not apply since the sheet has no header concept.
    pub fn write<W: Write>(
        worksheet: &Worksheet,
        writer: W,
        options: &CsvWriteOptions,
    ) -> CsvResult<()> {
        let mut csv_writer = Self::builder(options).from_writer(writer);

        for row in worksheet.value_rows() {
            csv_writer.write_record(row.iter().map(|v| field_text(v, options)))?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    fn builder(options: &CsvWriteOptions) -> csv::WriterBuilder {
        let terminator = match options.line_terminator {
            LineTerminator::LF => csv::Terminator::Any(b'\n'),
            LineTerminator::CRLF => csv::Terminator::CRLF,
        };

        let mut builder = csv::WriterBuilder::new();
        builder
            .delimiter(options.delimiter)
            .quote(options.quote)
            .terminator(terminator)
            .flexible(true);
        builder
    }
}

/// Text for one field
///
/// Without `write_formulas`, formulas export their last calculated value
/// when known.
fn field_text(value: &CellValue, options: &CsvWriteOptions) -> String {
    match value {
        CellValue::Formula { text, .. } if options.write_formulas => text.clone(),
        CellValue::Formula {
            cached_value: Some(cached),
            ..
        } => cached.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_table() {
        let table = Table::new(["Year", "Note"])
            .with_row([CellValue::Number(2024.0), CellValue::string("a, b")])
            .with_row([CellValue::Number(2025.5), CellValue::Boolean(true)]);

        let options = CsvWriteOptions {
            line_terminator: LineTerminator::LF,
            ..CsvWriteOptions::default()
        };
        let mut out = Vec::new();
        CsvWriter::write_table(&table, &mut out, &options).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Year,Note\n2024,\"a, b\"\n2025.5,TRUE\n"
        );
    }

    #[test]
    fn test_file_round_trip_keeps_formula_text() {
        use crate::{CsvReadOptions, CsvReader};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fcf.csv");

        let mut ws = Worksheet::new("ignored");
        ws.set_value("A1", "Year").unwrap();
        ws.set_value("B1", "FCF").unwrap();
        ws.set_value("A2", 2024).unwrap();
        ws.set_value("B2", 12.5).unwrap();
        ws.set_value("B3", "=SUM(B2:B2)").unwrap();
        CsvWriter::write_file(&ws, &path, &CsvWriteOptions::default()).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Year,FCF\r\n2024,12.5\r\n,=SUM(B2:B2)\r\n"
        );

        let back = CsvReader::read_file(&path, &CsvReadOptions::default().with_header(false)).unwrap();
        assert_eq!(back.name(), "fcf");
        assert_eq!(back.get_value("A2").unwrap(), CellValue::Number(2024.0));
        assert_eq!(back.get_value("B3").unwrap(), CellValue::formula("=SUM(B2:B2)"));

        let raw = CsvReader::read_file(&path, &CsvReadOptions::default().with_header(false).raw()).unwrap();
        assert_eq!(raw.get_value("B3").unwrap(), CellValue::string("=SUM(B2:B2)"));
    }

    #[test]
    fn test_table_file_round_trip() {
        use crate::{CsvReadOptions, CsvReader};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.csv");
        let table = Table::new(["Ticker", "Close"])
            .with_row([CellValue::string("ACME"), CellValue::Number(41.5)])
            .with_row([CellValue::string("GLOBEX"), CellValue::Number(7.25)]);

        CsvWriter::write_table_file(&table, &path, &CsvWriteOptions::default()).unwrap();
        let back = CsvReader::read_table_file(&path, &CsvReadOptions::default()).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_write_worksheet_anchors_at_a1() {
        let mut ws = Worksheet::new("S");
        ws.set_value("B2", 1).unwrap();
        ws.set_value("C3", "=B2*2").unwrap();
        ws.set_formula_result(2, 2, CellValue::Number(2.0)).unwrap();

        let mut out = Vec::new();
        let options = CsvWriteOptions {
            line_terminator: LineTerminator::LF,
            write_formulas: false,
            ..CsvWriteOptions::default()
        };
        CsvWriter::write(&ws, &mut out, &options).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), ",,\n,1,\n,,2\n");

        let mut out = Vec::new();
        let options = CsvWriteOptions {
            line_terminator: LineTerminator::LF,
            ..CsvWriteOptions::default()
        };
        CsvWriter::write(&ws, &mut out, &options).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), ",,\n,1,\n,,=B2*2\n");
    }
}
