//! Sparse cell storage
//!
//! Only populated cells are stored, in a row-major `BTreeMap` so that writers
//! and table snapshots can stream rows in order.

use std::collections::BTreeMap;

use super::CellValue;
use crate::style::StylePool;

/// Value and style reference of a single cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellData {
    /// The cell's value
    pub value: CellValue,
    /// Index into the worksheet's style pool (0 = no style set)
    pub style_index: u32,
}

impl CellData {
    /// Create a new cell with a value and no style
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            style_index: 0,
        }
    }

    /// Whether a style other than the default is attached
    pub fn has_style(&self) -> bool {
        self.style_index != 0
    }

    /// Check if this cell is effectively empty (no value and default style)
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.style_index == 0
    }
}

/// Structure: `BTreeMap<row_index, BTreeMap<col_index, CellData>>`
#[derive(Debug, Clone, Default)]
pub struct CellStorage {
    rows: BTreeMap<u32, BTreeMap<u16, CellData>>,
    pub(crate) style_pool: StylePool,
    column_widths: BTreeMap<u16, f64>,
}

impl CellStorage {
    /// Create a new empty cell storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cell
    pub fn get(&self, row: u32, col: u16) -> Option<&CellData> {
        self.rows.get(&row).and_then(|r| r.get(&col))
    }

    fn get_mut(&mut self, row: u32, col: u16) -> Option<&mut CellData> {
        self.rows.get_mut(&row).and_then(|r| r.get_mut(&col))
    }

    /// Set just the cell value, preserving its style
    pub fn set_value(&mut self, row: u32, col: u16, value: CellValue) {
        match self.get_mut(row, col) {
            Some(cell) => {
                cell.value = value;
                if cell.is_empty() {
                    self.remove(row, col);
                }
            }
            None if !value.is_empty() => {
                self.rows
                    .entry(row)
                    .or_default()
                    .insert(col, CellData::new(value));
            }
            None => {}
        }
    }

    /// Set just the style index, preserving the value
    pub fn set_style_index(&mut self, row: u32, col: u16, style_index: u32) {
        match self.get_mut(row, col) {
            Some(cell) => {
                cell.style_index = style_index;
                if cell.is_empty() {
                    self.remove(row, col);
                }
            }
            None if style_index != 0 => {
                self.rows.entry(row).or_default().insert(
                    col,
                    CellData {
                        value: CellValue::Empty,
                        style_index,
                    },
                );
            }
            None => {}
        }
    }

    /// Remove a cell
    pub fn remove(&mut self, row: u32, col: u16) -> Option<CellData> {
        let row_map = self.rows.get_mut(&row)?;
        let removed = row_map.remove(&col);
        if row_map.is_empty() {
            self.rows.remove(&row);
        }
        removed
    }

    /// Clear all cells; pooled styles and column widths stay
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Get the number of stored cells
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }

    /// Check if storage is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Bounds of stored cells as (min_row, min_col, max_row, max_col)
    pub fn used_bounds(&self) -> Option<(u32, u16, u32, u16)> {
        let min_row = *self.rows.keys().next()?;
        let max_row = *self.rows.keys().next_back()?;

        let (min_col, max_col) = self
            .rows
            .values()
            .filter_map(|cols| Some((*cols.keys().next()?, *cols.keys().next_back()?)))
            .fold((u16::MAX, 0u16), |(lo, hi), (first, last)| {
                (lo.min(first), hi.max(last))
            });

        Some((min_row, min_col, max_row, max_col))
    }

    /// Iterate over all cells in row order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u16, &CellData)> {
        self.rows
            .iter()
            .flat_map(|(&row, cols)| cols.iter().map(move |(&col, data)| (row, col, data)))
    }

    /// Iterate over cells in a specific row
    pub fn iter_row(&self, row: u32) -> impl Iterator<Item = (u16, &CellData)> {
        self.rows
            .get(&row)
            .into_iter()
            .flat_map(|cols| cols.iter().map(|(&col, data)| (col, data)))
    }

    /// Get the style pool
    pub fn style_pool(&self) -> &StylePool {
        &self.style_pool
    }

    /// Custom column width, if one was set
    pub fn column_width(&self, col: u16) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    /// Set a custom column width in characters
    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.column_widths.insert(col, width);
    }

    /// All custom column widths
    pub fn column_widths(&self) -> &BTreeMap<u16, f64> {
        &self.column_widths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut storage = CellStorage::new();
        storage.set_value(0, 0, CellValue::Number(42.0));
        storage.set_value(5, 3, CellValue::string("x"));

        assert_eq!(storage.get(0, 0).map(|c| &c.value), Some(&CellValue::Number(42.0)));
        assert_eq!(storage.cell_count(), 2);
        assert_eq!(storage.used_bounds(), Some((0, 0, 5, 3)));
    }

    #[test]
    fn test_empty_value_removes_unstyled_cell() {
        let mut storage = CellStorage::new();
        storage.set_value(1, 1, CellValue::Number(1.0));
        storage.set_value(1, 1, CellValue::Empty);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_style_keeps_empty_cell() {
        let mut storage = CellStorage::new();
        storage.set_style_index(2, 2, 3);
        storage.set_value(2, 2, CellValue::Empty);

        let cell = storage.get(2, 2).unwrap();
        assert!(cell.has_style());
        assert!(cell.value.is_empty());

        storage.set_style_index(2, 2, 0);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_iteration_is_row_major() {
        let mut storage = CellStorage::new();
        storage.set_value(1, 0, CellValue::Number(3.0));
        storage.set_value(0, 1, CellValue::Number(2.0));
        storage.set_value(0, 0, CellValue::Number(1.0));

        let order: Vec<(u32, u16)> = storage.iter().map(|(r, c, _)| (r, c)).collect();
        assert_eq!(order, [(0, 0), (0, 1), (1, 0)]);
    }
}
