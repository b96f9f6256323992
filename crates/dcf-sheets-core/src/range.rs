//! Lazy traversal of rectangular blocks
//!
//! [`Workbook::range`] walks a block column by column (`A1, A2, .., B1, ..`)
//! and yields one of four shapes per cell, chosen by [`RangeMode`].

use crate::cell::{index_to_column, Cell, CellAddress, CellData, CellRange, CellRangeIter, CellValue};
use crate::error::{Error, Result};
use crate::workbook::Workbook;
use crate::worksheet::Worksheet;
use crate::{MAX_COLS, MAX_ROWS};

/// What each step of a range traversal yields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeMode {
    /// Position strings such as `"B3"`
    #[default]
    Positions,
    /// The stored cell record together with its address
    Raw,
    /// Values only
    Values,
    /// [`Cell`] snapshots
    Cells,
}

/// Flag-style request for a range mode
///
/// Exactly one flag may be set; anything else fails with
/// [`Error::AmbiguousRangeMode`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeRequest {
    pub positions: bool,
    pub raw: bool,
    pub values: bool,
    pub cells: bool,
}

impl RangeRequest {
    /// The single mode this request names
    pub fn mode(&self) -> Result<RangeMode> {
        let chosen: Vec<RangeMode> = [
            (self.positions, RangeMode::Positions),
            (self.raw, RangeMode::Raw),
            (self.values, RangeMode::Values),
            (self.cells, RangeMode::Cells),
        ]
        .into_iter()
        .filter_map(|(flag, mode)| flag.then_some(mode))
        .collect();

        match chosen.as_slice() {
            [mode] => Ok(*mode),
            _ => Err(Error::AmbiguousRangeMode(chosen.len())),
        }
    }
}

/// One step of a range traversal
#[derive(Debug, Clone, PartialEq)]
pub enum RangeItem<'a> {
    Position(String),
    Raw {
        address: CellAddress,
        data: Option<&'a CellData>,
    },
    Value(CellValue),
    Cell(Cell),
}

/// Lazy iterator returned by [`Workbook::range`]
#[derive(Debug, Clone)]
pub struct RangeIter<'a> {
    sheet: &'a Worksheet,
    addresses: Option<CellRangeIter>,
    mode: RangeMode,
}

impl<'a> Iterator for RangeIter<'a> {
    type Item = Result<RangeItem<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let addr = self.addresses.as_mut()?.next()?;
        let item = match self.mode {
            RangeMode::Positions => Ok(RangeItem::Position(addr.position())),
            RangeMode::Raw => Ok(RangeItem::Raw {
                address: addr,
                data: self.sheet.cell_at(addr.row, addr.col),
            }),
            RangeMode::Values => Ok(RangeItem::Value(self.sheet.get_value_at(addr.row, addr.col))),
            RangeMode::Cells => Cell::new(
                self.sheet.get_value_at(addr.row, addr.col),
                addr.column_letters(),
                addr.row_number(),
                self.sheet.name(),
            )
            .map(RangeItem::Cell),
        };
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.addresses
            .as_ref()
            .map_or((0, Some(0)), Iterator::size_hint)
    }
}

/// Row/column window for [`Workbook::iter_rows`], all bounds 1-based and inclusive
///
/// Missing maxima default to the sheet's used extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowWindow {
    pub min_row: u32,
    pub max_row: Option<u32>,
    pub min_col: u32,
    pub max_col: Option<u32>,
}

impl Default for RowWindow {
    fn default() -> Self {
        Self {
            min_row: 1,
            max_row: None,
            min_col: 1,
            max_col: None,
        }
    }
}

impl Workbook {
    /// Walk a block of `sheet` (the active sheet when `None`)
    ///
    /// Without `reference` the block runs from `A1` to the last used column and
    /// row; an empty sheet yields nothing.
    pub fn range(&self, reference: Option<&str>, sheet: Option<&str>, mode: RangeMode) -> Result<RangeIter<'_>> {
        let sheet = self.range_sheet(sheet)?;
        let block = match reference {
            Some(reference) => Some(CellRange::parse(reference)?),
            None => sheet.full_range(),
        };
        Ok(RangeIter {
            sheet,
            addresses: block.map(|b| b.cells_by_column()),
            mode,
        })
    }

    /// [`Workbook::range`] driven by a flag-style request
    pub fn range_with(&self, reference: Option<&str>, sheet: Option<&str>, request: RangeRequest) -> Result<RangeIter<'_>> {
        self.range(reference, sheet, request.mode()?)
    }

    /// Row-major rows of [`Cell`]s over a window of `sheet` (the active sheet when `None`)
    ///
    /// The window is checked up front; rows are read as the iterator advances.
    pub fn iter_rows(
        &self,
        window: RowWindow,
        sheet: Option<&str>,
    ) -> Result<impl Iterator<Item = Vec<Cell>> + '_> {
        let ws = self.range_sheet(sheet)?;
        let max_row = window.max_row.unwrap_or_else(|| ws.max_row());
        let max_col = window.max_col.unwrap_or_else(|| u32::from(ws.max_col()));
        let min_row = window.min_row.max(1);
        let min_col = window.min_col.max(1);

        if max_row > MAX_ROWS {
            return Err(Error::RowOutOfBounds(max_row - 1, MAX_ROWS - 1));
        }
        if max_col > u32::from(MAX_COLS) {
            return Err(Error::ColumnOutOfBounds(max_col - 1, MAX_COLS - 1));
        }
        let columns = (min_col..=max_col)
            .map(|col| Ok((col as u16 - 1, index_to_column(col)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok((min_row..=max_row).map(move |row| {
            columns
                .iter()
                .map(|(col, letters)| {
                    Cell::from_checked(ws.get_value_at(row - 1, *col), letters.clone(), row, ws.name())
                })
                .collect()
        }))
    }

    /// Sheet a range operation reads; an unknown name is an unresolvable address
    fn range_sheet(&self, sheet: Option<&str>) -> Result<&Worksheet> {
        self.sheet_or_active(sheet).map_err(|e| match e {
            Error::SheetNotFound(name) => Error::AddressNotFound(name),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbook() -> Workbook {
        let mut wb = Workbook::new();
        wb.set("A1", 1).unwrap();
        wb.set("B2", 4).unwrap();
        wb
    }

    #[test]
    fn test_positions_are_column_major() {
        let wb = workbook();
        let positions: Vec<RangeItem> = wb
            .range(Some("A1:B2"), None, RangeMode::Positions)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        let expected: Vec<RangeItem> = ["A1", "A2", "B1", "B2"]
            .into_iter()
            .map(|p| RangeItem::Position(p.to_string()))
            .collect();
        assert_eq!(positions, expected);
    }

    #[test]
    fn test_default_block_covers_used_extent() {
        let wb = workbook();
        let values: Vec<RangeItem> = wb
            .range(None, None, RangeMode::Values)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(values.len(), 4);
        assert_eq!(values[0], RangeItem::Value(CellValue::Number(1.0)));
        assert_eq!(values[3], RangeItem::Value(CellValue::Number(4.0)));

        let mut empty = Workbook::new();
        empty.new_sheet("Blank").unwrap();
        assert_eq!(empty.range(None, Some("Blank"), RangeMode::Values).unwrap().count(), 0);
    }

    #[test]
    fn test_cells_and_raw_modes() {
        let wb = workbook();
        let mut cells = wb.range(Some("B2"), None, RangeMode::Cells).unwrap();
        match cells.next() {
            Some(Ok(RangeItem::Cell(cell))) => {
                assert_eq!(cell.position(), "B2");
                assert_eq!(cell.sheet(), "Sheet1");
                assert_eq!(cell.value, CellValue::Number(4.0));
            }
            other => panic!("unexpected item {other:?}"),
        }

        let raw: Vec<_> = wb
            .range(Some("A1:A2"), None, RangeMode::Raw)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert!(matches!(raw[0], RangeItem::Raw { data: Some(_), .. }));
        assert!(matches!(raw[1], RangeItem::Raw { data: None, .. }));
    }

    #[test]
    fn test_range_request_needs_exactly_one_mode() {
        assert!(matches!(
            RangeRequest::default().mode(),
            Err(Error::AmbiguousRangeMode(0))
        ));
        let both = RangeRequest {
            values: true,
            cells: true,
            ..Default::default()
        };
        assert!(matches!(both.mode(), Err(Error::AmbiguousRangeMode(2))));

        let one = RangeRequest {
            raw: true,
            ..Default::default()
        };
        assert_eq!(one.mode().unwrap(), RangeMode::Raw);

        let wb = workbook();
        assert!(wb.range_with(None, None, both).is_err());
    }

    #[test]
    fn test_iter_rows() {
        let wb = workbook();
        let rows: Vec<Vec<Cell>> = wb.iter_rows(RowWindow::default(), None).unwrap().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].iter().map(Cell::position).collect::<Vec<_>>(), ["A1", "B1"]);
        assert_eq!(rows[1][1].value, CellValue::Number(4.0));

        let window = RowWindow {
            min_row: 2,
            max_col: Some(1),
            ..Default::default()
        };
        let rows: Vec<Vec<Cell>> = wb.iter_rows(window, None).unwrap().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0][0].position(), "A2");
    }

    #[test]
    fn test_iter_rows_reads_lazily() {
        let wb = workbook();
        let window = RowWindow {
            max_row: Some(crate::MAX_ROWS),
            max_col: Some(3),
            ..Default::default()
        };
        let rows: Vec<Vec<Cell>> = wb.iter_rows(window, None).unwrap().skip(1).take(2).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1].value, CellValue::Number(4.0));
        assert_eq!(rows[1][2].position(), "C3");

        let too_tall = RowWindow {
            max_row: Some(crate::MAX_ROWS + 1),
            ..Default::default()
        };
        assert!(matches!(wb.iter_rows(too_tall, None), Err(Error::RowOutOfBounds(..))));
        let too_wide = RowWindow {
            max_col: Some(u32::from(crate::MAX_COLS) + 1),
            ..Default::default()
        };
        assert!(matches!(wb.iter_rows(too_wide, None), Err(Error::ColumnOutOfBounds(..))));
    }

    #[test]
    fn test_unknown_sheet_is_not_found() {
        let wb = workbook();
        assert!(matches!(
            wb.range(None, Some("Nope"), RangeMode::Values),
            Err(Error::AddressNotFound(name)) if name == "Nope"
        ));
        assert!(matches!(
            wb.iter_rows(RowWindow::default(), Some("Nope")),
            Err(Error::AddressNotFound(_))
        ));
    }

    #[test]
    fn test_bad_reference_is_malformed() {
        let wb = workbook();
        assert!(matches!(
            wb.range(Some("A1:"), None, RangeMode::Values),
            Err(Error::MalformedAddress(_))
        ));
    }
}
