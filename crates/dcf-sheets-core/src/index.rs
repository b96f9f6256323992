//! Index resolution for workbook reads and writes
//!
//! An index is either a string key or a [`Cell`]. Keys resolve in a fixed
//! order: sheet name, then defined name, then position (`B7`, `A4:A8`,
//! optionally qualified as `'Sheet'!B7`). Cells resolve to their own position
//! on their own sheet. The result is a [`Target`], and `get`, `set` and
//! `delete` dispatch on it.
//!
//! Column letters in positions match without regard to case, as in Excel's
//! name box: `b7` and `B7` address the same cell, and results always report
//! upper-case positions.

use crate::cell::{Cell, CellAddress, CellRange, CellValue};
use crate::error::{Error, Result};
use crate::named_range::parse_qualified;
use crate::workbook::Workbook;
use crate::worksheet::Worksheet;

/// What a caller used to address the store
#[derive(Debug, Clone, Copy)]
pub enum Index<'a> {
    Key(&'a str),
    Cell(&'a Cell),
}

impl<'a> From<&'a str> for Index<'a> {
    fn from(key: &'a str) -> Self {
        Index::Key(key)
    }
}

impl<'a> From<&'a String> for Index<'a> {
    fn from(key: &'a String) -> Self {
        Index::Key(key.as_str())
    }
}

impl<'a> From<&'a Cell> for Index<'a> {
    fn from(cell: &'a Cell) -> Self {
        Index::Cell(cell)
    }
}

/// A resolved index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A whole sheet
    Sheet(String),
    /// A defined name and its destinations, each on a concrete sheet
    Named {
        name: String,
        destinations: Vec<(String, CellRange)>,
    },
    /// A rectangular block
    Range { sheet: String, range: CellRange },
    /// A single cell
    Cell { sheet: String, address: CellAddress },
}

impl Target {
    /// Every (sheet, block) this target covers; empty for a sheet
    pub fn blocks(&self) -> Vec<(&str, CellRange)> {
        match self {
            Target::Sheet(_) => Vec::new(),
            Target::Named { destinations, .. } => destinations
                .iter()
                .map(|(sheet, range)| (sheet.as_str(), *range))
                .collect(),
            Target::Range { sheet, range } => vec![(sheet.as_str(), *range)],
            Target::Cell { sheet, address } => vec![(sheet.as_str(), CellRange::single(*address))],
        }
    }
}

/// Result of a read
#[derive(Debug, Clone)]
pub enum Lookup<'a> {
    /// The index named a sheet
    Sheet(&'a Worksheet),
    /// The index named a cell, or a defined name whose first destination
    /// starts at this cell
    Cell(Cell),
    /// The index named a block; cells in column-major order
    Range(Vec<Cell>),
}

impl Lookup<'_> {
    /// The single cell this lookup produced
    pub fn into_cell(self) -> Result<Cell> {
        match self {
            Lookup::Cell(cell) => Ok(cell),
            Lookup::Sheet(ws) => Err(Error::NotACell(ws.name().to_string())),
            Lookup::Range(cells) => match cells.first() {
                Some(first) if cells.len() == 1 => Ok(first.clone()),
                _ => Err(Error::NotACell(format!("range of {} cells", cells.len()))),
            },
        }
    }
}

impl Workbook {
    /// Resolve an index into a [`Target`]
    pub fn resolve<'a>(&self, index: impl Into<Index<'a>>) -> Result<Target> {
        match index.into() {
            Index::Cell(cell) => {
                if !self.contains_sheet(cell.sheet()) {
                    return Err(Error::AddressNotFound(format!(
                        "{}!{}",
                        cell.sheet(),
                        cell.position()
                    )));
                }
                Ok(Target::Cell {
                    sheet: cell.sheet().to_string(),
                    address: cell.address()?,
                })
            }
            Index::Key(key) => self.resolve_key(key),
        }
    }

    fn resolve_key(&self, key: &str) -> Result<Target> {
        if self.contains_sheet(key) {
            return Ok(Target::Sheet(key.to_string()));
        }

        if let Some(named) = self.named_range(key) {
            let active = self.active_sheet_name();
            let destinations = named
                .destinations()?
                .into_iter()
                .map(|d| {
                    let sheet = d.sheet.unwrap_or_else(|| active.to_string());
                    if self.contains_sheet(&sheet) {
                        Ok((sheet, d.range))
                    } else {
                        Err(Error::AddressNotFound(format!("{} -> {}", key, sheet)))
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(Target::Named {
                name: named.name.clone(),
                destinations,
            });
        }

        let not_found = || Error::AddressNotFound(key.to_string());
        let (sheet, range) = parse_qualified(key).map_err(|_| not_found())?;
        let sheet = match sheet {
            Some(sheet) if self.contains_sheet(&sheet) => sheet,
            Some(_) => return Err(not_found()),
            None => self.active_sheet_name().to_string(),
        };

        if key.contains(':') {
            Ok(Target::Range { sheet, range })
        } else {
            Ok(Target::Cell {
                sheet,
                address: range.start,
            })
        }
    }

    /// Read through an index
    ///
    /// A defined name reads its first destination's top-left cell.
    pub fn get<'a>(&self, index: impl Into<Index<'a>>) -> Result<Lookup<'_>> {
        match self.resolve(index)? {
            Target::Sheet(name) => Ok(Lookup::Sheet(self.worksheet(&name)?)),
            Target::Cell { sheet, address } => Ok(Lookup::Cell(self.cell_at(&sheet, address)?)),
            Target::Named { name, destinations } => {
                let (sheet, range) = destinations
                    .first()
                    .ok_or_else(|| Error::AddressNotFound(name.clone()))?;
                Ok(Lookup::Cell(self.cell_at(sheet, range.start)?))
            }
            Target::Range { sheet, range } => range
                .cells_by_column()
                .map(|addr| self.cell_at(&sheet, addr))
                .collect::<Result<Vec<_>>>()
                .map(Lookup::Range),
        }
    }

    /// Read a single cell; sheet names fail with [`Error::NotACell`]
    pub fn cell<'a>(&self, index: impl Into<Index<'a>>) -> Result<Cell> {
        self.get(index)?.into_cell()
    }

    /// Read a single cell's value
    pub fn value<'a>(&self, index: impl Into<Index<'a>>) -> Result<CellValue> {
        Ok(self.cell(index)?.value)
    }

    /// Build a [`Cell`] snapshot of one stored cell
    pub fn cell_at(&self, sheet: &str, address: CellAddress) -> Result<Cell> {
        let ws = self.worksheet(sheet)?;
        Cell::new(
            ws.get_value_at(address.row, address.col),
            address.column_letters(),
            address.row_number(),
            sheet,
        )
    }

    /// Write through an index
    ///
    /// Ranges and every destination of a defined name receive the same value.
    /// Passing a [`Cell`] as the value stores only its value; text starting
    /// with `=` is stored as a formula.
    pub fn set<'a>(&mut self, index: impl Into<Index<'a>>, value: impl Into<CellValue>) -> Result<()> {
        let target = self.resolve(index)?;
        if let Target::Sheet(name) = &target {
            return Err(Error::NotACell(name.clone()));
        }
        let value = value.into();
        self.fill(&target, &value)
    }

    /// Clear through an index
    ///
    /// Cells, ranges and named destinations are set to zero; a sheet name
    /// removes the sheet.
    pub fn delete<'a>(&mut self, index: impl Into<Index<'a>>) -> Result<()> {
        match self.resolve(index)? {
            Target::Sheet(name) => self.remove_sheet(&name).map(|_| ()),
            target => self.fill(&target, &CellValue::Number(0.0)),
        }
    }

    fn fill(&mut self, target: &Target, value: &CellValue) -> Result<()> {
        for (sheet, range) in target.blocks() {
            let ws = self.worksheet_mut(sheet)?;
            for addr in range.cells_by_column() {
                ws.set_value_at(addr.row, addr.col, value.clone())?;
            }
        }
        Ok(())
    }

    /// Whether the stored value at `cell`'s address equals the value it carries
    pub fn contains_value(&self, cell: &Cell) -> bool {
        self.worksheet(cell.sheet())
            .ok()
            .zip(cell.address().ok())
            .is_some_and(|(ws, addr)| ws.get_value_at(addr.row, addr.col) == cell.value)
    }
}
