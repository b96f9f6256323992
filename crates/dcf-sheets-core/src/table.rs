//! Tabular snapshots of sheets
//!
//! A [`Table`] is what `to_tables` hands out and what `save(table)` and the
//! CSV reader take in: a header row plus value rows.

use std::fmt;

use crate::cell::CellValue;

/// Header row plus value rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Create an empty table with the given headers
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; short rows are padded with empty values
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        if row.len() < self.headers.len() {
            row.resize(self.headers.len(), CellValue::Empty);
        }
        self.rows.push(row);
    }

    /// Builder form of [`Table::push_row`]
    pub fn with_row<I, V>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        self.push_row(row.into_iter().map(Into::into).collect());
        self
    }

    /// No headers and no rows
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    /// Number of value rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns (the widest of headers and rows)
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    /// Values of the column with the given header
    pub fn column(&self, header: &str) -> Option<Vec<&CellValue>> {
        let idx = self.headers.iter().position(|h| h == header)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).unwrap_or(&CellValue::Empty))
                .collect(),
        )
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.width();
        let cell_text = |row: &[CellValue], i: usize| row.get(i).map(|v| v.to_string()).unwrap_or_default();

        let mut widths: Vec<usize> = (0..width)
            .map(|i| self.headers.get(i).map_or(0, |h| h.chars().count()))
            .collect();
        for row in &self.rows {
            for (i, w) in widths.iter_mut().enumerate() {
                *w = (*w).max(cell_text(row, i).chars().count());
            }
        }

        let headers: Vec<String> = (0..width)
            .map(|i| format!("{:<w$}", self.headers.get(i).map_or("", String::as_str), w = widths[i]))
            .collect();
        writeln!(f, "{}", headers.join("  ").trim_end())?;

        for row in &self.rows {
            let cells: Vec<String> = (0..width)
                .map(|i| format!("{:<w$}", cell_text(row, i), w = widths[i]))
                .collect();
            writeln!(f, "{}", cells.join("  ").trim_end())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rows_are_padded() {
        let mut table = Table::new(["Year", "Revenue", "Margin"]);
        table.push_row(vec![CellValue::Number(2024.0)]);
        assert_eq!(table.rows[0].len(), 3);
        assert_eq!(table.len(), 1);
        assert!(!table.is_empty());
        assert!(Table::default().is_empty());
    }

    #[test]
    fn test_column_lookup() {
        let table = Table::new(["Year", "Revenue"])
            .with_row([2024.0, 10.0])
            .with_row([2025.0, 12.5]);

        let revenue = table.column("Revenue").unwrap();
        assert_eq!(revenue, [&CellValue::Number(10.0), &CellValue::Number(12.5)]);
        assert!(table.column("Missing").is_none());
    }

    #[test]
    fn test_display() {
        let table = Table::new(["Name", "Value"]).with_row(["Beta", "1.2"]);
        assert_eq!(table.to_string(), "Name  Value\nBeta  1.2\n");
    }
}
