//! Worksheet type

use std::collections::HashMap;

use crate::annotation::{CellComment, Hyperlink};
use crate::cell::{CellAddress, CellData, CellRange, CellStorage, CellValue};
use crate::error::{Error, Result};
use crate::style::{Style, StylePool};
use crate::table::Table;
use crate::{MAX_COLS, MAX_ROWS};

/// A single sheet: a sparse grid of values and styles plus per-cell notes and links
#[derive(Debug, Clone)]
pub struct Worksheet {
    name: String,
    cells: CellStorage,
    comments: HashMap<(u32, u16), CellComment>,
    hyperlinks: HashMap<(u32, u16), Hyperlink>,
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: CellStorage::new(),
            comments: HashMap::new(),
            hyperlinks: HashMap::new(),
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    // === Cell Access ===

    /// Get a cell by row and column indices
    pub fn cell_at(&self, row: u32, col: u16) -> Option<&CellData> {
        self.cells.get(row, col)
    }

    /// Get cell value by address string (e.g., "A1")
    pub fn get_value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.get_value_at(addr.row, addr.col))
    }

    /// Get cell value by indices
    pub fn get_value_at(&self, row: u32, col: u16) -> CellValue {
        self.cells
            .get(row, col)
            .map(|c| c.value.clone())
            .unwrap_or_default()
    }

    /// Formula text at a cell position, if the cell holds a formula
    pub fn formula_at(&self, row: u32, col: u16) -> Option<&str> {
        self.cells.get(row, col).and_then(|c| c.value.formula_text())
    }

    /// Set a cell value by address string
    pub fn set_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_value_at(addr.row, addr.col, value)
    }

    /// Set a cell value by row and column indices
    pub fn set_value_at<V: Into<CellValue>>(&mut self, row: u32, col: u16, value: V) -> Result<()> {
        validate_cell_position(row, col)?;
        self.cells.set_value(row, col, value.into());
        Ok(())
    }

    /// Store the last calculated result of a formula cell
    pub fn set_formula_result(&mut self, row: u32, col: u16, result: CellValue) -> Result<()> {
        match self.cells.get(row, col).map(|c| &c.value) {
            Some(CellValue::Formula { text, .. }) => {
                let value = CellValue::Formula {
                    text: text.clone(),
                    cached_value: Some(Box::new(result)),
                };
                self.cells.set_value(row, col, value);
                Ok(())
            }
            _ => Err(Error::other(format!(
                "{} does not hold a formula",
                CellAddress::new(row, col).position()
            ))),
        }
    }

    // === Styles ===

    /// Get the non-default style applied to a cell, if any
    pub fn style_at(&self, row: u32, col: u16) -> Option<&Style> {
        match self.cells.get(row, col) {
            Some(cell) if cell.has_style() => self.cells.style_pool().get(cell.style_index),
            _ => None,
        }
    }

    /// Set a cell style by row and column indices
    pub fn set_style_at(&mut self, row: u32, col: u16, style: &Style) -> Result<()> {
        validate_cell_position(row, col)?;
        let style_index = if style.is_default() {
            0
        } else {
            self.cells.style_pool.get_or_insert(style.clone())
        };
        self.cells.set_style_index(row, col, style_index);
        Ok(())
    }

    /// Set a cell style by address string
    pub fn set_style(&mut self, address: &str, style: &Style) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_style_at(addr.row, addr.col, style)
    }

    /// Styles used by this sheet
    pub fn style_pool(&self) -> &StylePool {
        self.cells.style_pool()
    }

    /// Custom column width, if one was set
    pub fn column_width(&self, col: u16) -> Option<f64> {
        self.cells.column_width(col)
    }

    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.cells.set_column_width(col, width);
    }

    pub fn column_widths(&self) -> impl Iterator<Item = (u16, f64)> + '_ {
        self.cells.column_widths().iter().map(|(&c, &w)| (c, w))
    }

    // === Comments and hyperlinks ===

    pub fn set_comment_at(&mut self, row: u32, col: u16, comment: CellComment) {
        self.comments.insert((row, col), comment);
    }

    pub fn comment_at(&self, row: u32, col: u16) -> Option<&CellComment> {
        self.comments.get(&(row, col))
    }

    /// All comments in row-major order
    pub fn comments(&self) -> Vec<((u32, u16), &CellComment)> {
        let mut all: Vec<_> = self.comments.iter().map(|(&k, v)| (k, v)).collect();
        all.sort_by_key(|(k, _)| *k);
        all
    }

    pub fn set_hyperlink_at(&mut self, row: u32, col: u16, link: Hyperlink) {
        self.hyperlinks.insert((row, col), link);
    }

    pub fn hyperlink_at(&self, row: u32, col: u16) -> Option<&Hyperlink> {
        self.hyperlinks.get(&(row, col))
    }

    /// All hyperlinks in row-major order
    pub fn hyperlinks(&self) -> Vec<((u32, u16), &Hyperlink)> {
        let mut all: Vec<_> = self.hyperlinks.iter().map(|(&k, v)| (k, v)).collect();
        all.sort_by_key(|(k, _)| *k);
        all
    }

    // === Range Operations ===

    /// Get the used range (bounds of all stored cells)
    pub fn used_range(&self) -> Option<CellRange> {
        self.cells
            .used_bounds()
            .map(|(min_row, min_col, max_row, max_col)| {
                CellRange::from_indices(min_row, min_col, max_row, max_col)
            })
    }

    /// Last used row, 1-based; 0 for an empty sheet
    pub fn max_row(&self) -> u32 {
        self.cells.used_bounds().map_or(0, |(_, _, r, _)| r + 1)
    }

    /// Last used column, 1-based; 0 for an empty sheet
    pub fn max_col(&self) -> u16 {
        self.cells.used_bounds().map_or(0, |(_, _, _, c)| c + 1)
    }

    /// The block from `A1` to the last used row and column, if anything is stored
    pub fn full_range(&self) -> Option<CellRange> {
        self.cells
            .used_bounds()
            .map(|(_, _, max_row, max_col)| CellRange::from_indices(0, 0, max_row, max_col))
    }

    /// Empty every value in `range` (the whole sheet when `None`), keeping styles
    pub fn clear_values(&mut self, range: Option<&CellRange>) {
        let targets: Vec<(u32, u16)> = match range {
            Some(range) => range.cells().map(|a| (a.row, a.col)).collect(),
            None => self.cells.iter().map(|(r, c, _)| (r, c)).collect(),
        };
        for (row, col) in targets {
            self.cells.set_value(row, col, CellValue::Empty);
        }
    }

    /// Values of every row from `A1` to the used extent, gaps included
    pub fn value_rows(&self) -> Vec<Vec<CellValue>> {
        let (rows, cols) = (self.max_row(), self.max_col());
        (0..rows)
            .map(|r| (0..cols).map(|c| self.get_value_at(r, c)).collect())
            .collect()
    }

    /// Write `values` into the first row below the used range, starting at column A
    ///
    /// Returns the 0-based row that was written.
    pub fn append_row(&mut self, values: &[CellValue]) -> Result<u32> {
        let row = self.max_row();
        for (col, value) in values.iter().enumerate() {
            let col = u16::try_from(col).map_err(|_| Error::ColumnOutOfBounds(col as u32, MAX_COLS - 1))?;
            self.set_value_at(row, col, value.clone())?;
        }
        Ok(row)
    }

    /// Deep-copy every populated cell of `source` into this sheet
    ///
    /// Values, styles, hyperlinks and comments land at the same coordinates.
    /// A style is only copied when the source cell has one set.
    pub fn copy_contents_from(&mut self, source: &Worksheet) -> Result<()> {
        for (row, col, data) in source.cells.iter() {
            self.set_value_at(row, col, data.value.clone())?;
            if let Some(style) = source.style_at(row, col) {
                self.set_style_at(row, col, style)?;
            }
        }
        for (&(row, col), link) in &source.hyperlinks {
            self.set_hyperlink_at(row, col, link.clone());
        }
        for (&(row, col), comment) in &source.comments {
            self.set_comment_at(row, col, comment.clone());
        }
        for (col, width) in source.column_widths() {
            self.set_column_width(col, width);
        }
        Ok(())
    }

    /// Tabular snapshot: first row as headers, the rest as records
    pub fn to_table(&self) -> Table {
        let mut rows = self.value_rows().into_iter();
        let Some(header_row) = rows.next() else {
            return Table::default();
        };
        Table {
            headers: header_row.iter().map(ToString::to_string).collect(),
            rows: rows.collect(),
        }
    }

    /// Get the number of stored cells
    pub fn cell_count(&self) -> usize {
        self.cells.cell_count()
    }

    /// Check if the worksheet is empty
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over all stored cells in row order
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u16, &CellData)> {
        self.cells.iter()
    }
}

fn validate_cell_position(row: u32, col: u16) -> Result<()> {
    if row >= MAX_ROWS {
        return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
    }
    if col >= MAX_COLS {
        return Err(Error::ColumnOutOfBounds(u32::from(col), MAX_COLS - 1));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;
    use pretty_assertions::assert_eq;

    fn n(v: f64) -> CellValue {
        CellValue::Number(v)
    }

    #[test]
    fn test_set_and_get() {
        let mut ws = Worksheet::new("Inputs");
        ws.set_value("C5", "AAPL").unwrap();
        ws.set_value_at(0, 0, 1.5).unwrap();

        assert_eq!(ws.get_value("C5").unwrap().as_string(), Some("AAPL"));
        assert_eq!(ws.get_value_at(0, 0), n(1.5));
        assert_eq!(ws.get_value("Z99").unwrap(), CellValue::Empty);
        assert!(ws.set_value_at(MAX_ROWS, 0, 1).is_err());
    }

    #[test]
    fn test_extent_and_value_rows() {
        let mut ws = Worksheet::new("S");
        assert_eq!((ws.max_row(), ws.max_col()), (0, 0));
        assert!(ws.full_range().is_none());

        ws.set_value("B1", 1).unwrap();
        ws.set_value("A3", 3).unwrap();
        assert_eq!((ws.max_row(), ws.max_col()), (3, 2));
        assert_eq!(ws.full_range().unwrap().to_string(), "A1:B3");
        assert_eq!(
            ws.value_rows(),
            vec![
                vec![CellValue::Empty, n(1.0)],
                vec![CellValue::Empty, CellValue::Empty],
                vec![n(3.0), CellValue::Empty],
            ]
        );
    }

    #[test]
    fn test_append_row() {
        let mut ws = Worksheet::new("S");
        assert_eq!(ws.append_row(&[n(1.0), n(2.0)]).unwrap(), 0);
        assert_eq!(ws.append_row(&[n(3.0)]).unwrap(), 1);
        assert_eq!(ws.get_value("A2").unwrap(), n(3.0));
    }

    #[test]
    fn test_clear_values_keeps_styles() {
        let mut ws = Worksheet::new("S");
        ws.set_value("A1", 1).unwrap();
        ws.set_value("B2", 2).unwrap();
        ws.set_style("B2", &Style::new().bold(true)).unwrap();

        ws.clear_values(Some(&CellRange::parse("A1").unwrap()));
        assert!(ws.get_value("A1").unwrap().is_empty());
        assert_eq!(ws.get_value("B2").unwrap(), n(2.0));

        ws.clear_values(None);
        assert!(ws.get_value("B2").unwrap().is_empty());
        assert!(ws.style_at(1, 1).is_some_and(|s| s.font.bold));
    }

    #[test]
    fn test_copy_contents_from() {
        let mut src = Worksheet::new("Src");
        src.set_value("A1", "Revenue").unwrap();
        src.set_value("B1", 100).unwrap();
        src.set_style("B1", &Style::new().fill_color(Color::rgb(255, 255, 0)))
            .unwrap();
        src.set_comment_at(0, 1, CellComment::new("Analyst", "FY24"));
        src.set_hyperlink_at(0, 0, Hyperlink::new("https://example.com"));
        src.set_column_width(0, 18.0);

        let mut dst = Worksheet::new("Dst");
        dst.copy_contents_from(&src).unwrap();

        assert_eq!(dst.get_value("B1").unwrap(), n(100.0));
        assert_eq!(dst.style_at(0, 1), src.style_at(0, 1));
        assert!(dst.style_at(0, 0).is_none());
        assert_eq!(dst.comment_at(0, 1).map(|c| c.text.as_str()), Some("FY24"));
        assert!(dst.hyperlink_at(0, 0).is_some());
        assert_eq!(dst.column_width(0), Some(18.0));
    }

    #[test]
    fn test_to_table() {
        let mut ws = Worksheet::new("S");
        assert!(ws.to_table().is_empty());

        ws.set_value("A1", "Year").unwrap();
        ws.set_value("B1", "FCF").unwrap();
        ws.set_value("A2", 2024).unwrap();
        ws.set_value("B2", 12.5).unwrap();

        let table = ws.to_table();
        assert_eq!(table.headers, ["Year", "FCF"]);
        assert_eq!(table.rows, vec![vec![n(2024.0), n(12.5)]]);
    }

    #[test]
    fn test_formula_result() {
        let mut ws = Worksheet::new("S");
        ws.set_value("A1", "=1+1").unwrap();
        ws.set_formula_result(0, 0, n(2.0)).unwrap();
        assert_eq!(ws.get_value_at(0, 0).as_number(), Some(2.0));
        assert_eq!(ws.formula_at(0, 0), Some("=1+1"));
        assert!(ws.set_formula_result(5, 5, n(1.0)).is_err());
    }
}
