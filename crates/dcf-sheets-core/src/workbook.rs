//! Workbook type - the in-memory store behind every session

use std::fmt;

use crate::cell::{CellAddress, CellRange, CellValue};
use crate::error::{Error, Result};
use crate::named_range::{quote_sheet_name, NamedRange, NamedRangeCollection};
use crate::table::Table;
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// Name given to the sheet that keeps a workbook from ever being sheetless
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// An ordered set of named sheets plus the workbook's defined names
///
/// A workbook always holds at least one sheet: removing the last one puts a
/// fresh [`DEFAULT_SHEET_NAME`] sheet in its place.
#[derive(Debug, Clone)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    active_sheet: usize,
    named_ranges: NamedRangeCollection,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    /// Create a new workbook with one empty `Sheet1`
    pub fn new() -> Self {
        Self {
            worksheets: vec![Worksheet::new(DEFAULT_SHEET_NAME)],
            active_sheet: 0,
            named_ranges: NamedRangeCollection::new(),
        }
    }

    /// Build a workbook from already-populated sheets
    ///
    /// Used by file readers. An empty list yields the default one-sheet
    /// workbook.
    pub fn from_worksheets(worksheets: Vec<Worksheet>) -> Result<Self> {
        let mut wb = Self {
            worksheets: Vec::with_capacity(worksheets.len()),
            active_sheet: 0,
            named_ranges: NamedRangeCollection::new(),
        };
        for ws in worksheets {
            wb.validate_sheet_name(ws.name(), None)?;
            wb.worksheets.push(ws);
        }
        wb.ensure_one_sheet();
        Ok(wb)
    }

    /// Number of sheets
    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Sheet names in workbook order
    pub fn sheets(&self) -> Vec<&str> {
        self.worksheets.iter().map(Worksheet::name).collect()
    }

    /// Iterate over the worksheets in order
    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    /// Position of a sheet by exact name
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets.iter().position(|ws| ws.name() == name)
    }

    pub fn contains_sheet(&self, name: &str) -> bool {
        self.sheet_index(name).is_some()
    }

    /// Get a worksheet by name
    pub fn worksheet(&self, name: &str) -> Result<&Worksheet> {
        self.worksheets
            .iter()
            .find(|ws| ws.name() == name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    /// Get a mutable worksheet by name
    pub fn worksheet_mut(&mut self, name: &str) -> Result<&mut Worksheet> {
        self.worksheets
            .iter_mut()
            .find(|ws| ws.name() == name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    /// The sheet currently designated active
    pub fn active_sheet(&self) -> &Worksheet {
        &self.worksheets[self.active_sheet]
    }

    pub fn active_sheet_mut(&mut self) -> &mut Worksheet {
        &mut self.worksheets[self.active_sheet]
    }

    /// Name of the active sheet
    pub fn active_sheet_name(&self) -> &str {
        self.active_sheet().name()
    }

    /// Make the named sheet active
    pub fn set_active_sheet(&mut self, name: &str) -> Result<()> {
        self.active_sheet = self
            .sheet_index(name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))?;
        Ok(())
    }

    /// Sheet named `sheet`, or the active sheet when `None`
    pub fn sheet_or_active(&self, sheet: Option<&str>) -> Result<&Worksheet> {
        match sheet {
            Some(name) => self.worksheet(name),
            None => Ok(self.active_sheet()),
        }
    }

    // === Sheet lifecycle ===

    /// Append a new empty sheet
    pub fn new_sheet(&mut self, name: &str) -> Result<&mut Worksheet> {
        self.validate_sheet_name(name, None)?;
        self.worksheets.push(Worksheet::new(name));
        log::debug!("created sheet '{}'", name);
        let last = self.worksheets.len() - 1;
        Ok(&mut self.worksheets[last])
    }

    /// Append an already-populated sheet
    pub fn add_worksheet(&mut self, worksheet: Worksheet) -> Result<()> {
        self.validate_sheet_name(worksheet.name(), None)?;
        self.worksheets.push(worksheet);
        Ok(())
    }

    /// Rename a sheet; sheet-scoped names follow it
    ///
    /// Reference text is not rewritten: names, formulas and hyperlinks that
    /// spell out the old sheet name keep pointing at it.
    pub fn rename_sheet(&mut self, old: &str, new: &str) -> Result<()> {
        let index = self
            .sheet_index(old)
            .ok_or_else(|| Error::SheetNotFound(old.to_string()))?;
        self.validate_sheet_name(new, Some(index))?;
        self.worksheets[index].set_name(new);
        self.named_ranges.rename_sheet_scope(old, new);
        Ok(())
    }

    /// Remove a sheet and return it
    ///
    /// Removing the last sheet leaves a fresh [`DEFAULT_SHEET_NAME`] sheet.
    pub fn remove_sheet(&mut self, name: &str) -> Result<Worksheet> {
        let index = self
            .sheet_index(name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))?;
        let removed = self.worksheets.remove(index);
        self.named_ranges.remove_sheet_scope(name);

        if self.active_sheet > index || self.active_sheet >= self.worksheets.len() {
            self.active_sheet = self.active_sheet.saturating_sub(1);
        }
        self.ensure_one_sheet();
        log::debug!("removed sheet '{}'", name);
        Ok(removed)
    }

    /// Empty every value of a sheet, or only of `range` within it
    pub fn clear_sheet(&mut self, sheet: &str, range: Option<&str>) -> Result<()> {
        let range = range.map(CellRange::parse).transpose()?;
        self.worksheet_mut(sheet)?.clear_values(range.as_ref());
        Ok(())
    }

    /// Copy every populated cell of `source` onto `target`
    ///
    /// See [`Worksheet::copy_contents_from`]; cells of `target` outside the
    /// source's populated cells are left alone.
    pub fn copy_sheet_contents(&mut self, source: &str, target: &str) -> Result<()> {
        let source = self.worksheet(source)?.clone();
        self.worksheet_mut(target)?.copy_contents_from(&source)?;
        log::debug!("copied {} cell(s) from '{}' to '{}'", source.cell_count(), source.name(), target);
        Ok(())
    }

    /// Remove the listed sheets, or every sheet when `None`
    ///
    /// Clearing everything recreates `Sheet1`; either way the workbook keeps
    /// at least one sheet. Every listed name must exist; otherwise nothing
    /// is removed.
    pub fn clear_workbook(&mut self, sheets: Option<&[&str]>) -> Result<()> {
        match sheets {
            Some(names) => {
                if let Some(missing) = names.iter().find(|name| !self.contains_sheet(name)) {
                    return Err(Error::SheetNotFound(missing.to_string()));
                }
                for (i, name) in names.iter().enumerate() {
                    if !names[..i].contains(name) {
                        self.remove_sheet(name)?;
                    }
                }
            }
            None => {
                self.worksheets.clear();
                self.named_ranges = NamedRangeCollection::new();
                self.active_sheet = 0;
                self.ensure_one_sheet();
            }
        }
        Ok(())
    }

    fn ensure_one_sheet(&mut self) {
        if self.worksheets.is_empty() {
            self.worksheets.push(Worksheet::new(DEFAULT_SHEET_NAME));
            self.active_sheet = 0;
        }
    }

    fn validate_sheet_name(&self, name: &str, exclude_index: Option<usize>) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            )));
        }

        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name cannot contain '{}'",
                c
            )));
        }
        if name.starts_with('\'') || name.ends_with('\'') {
            return Err(Error::InvalidSheetName(
                "Sheet name cannot start or end with an apostrophe".into(),
            ));
        }

        let name_lower = name.to_lowercase();
        let clash = self
            .worksheets
            .iter()
            .enumerate()
            .any(|(i, ws)| Some(i) != exclude_index && ws.name().to_lowercase() == name_lower);
        if clash {
            return Err(Error::DuplicateSheetName(name.to_string()));
        }
        Ok(())
    }

    // === Named ranges ===

    /// Give `range` on `sheet` (the active sheet when `None`) a workbook-wide name
    ///
    /// `range` may list several blocks separated by commas (`"A1,B2:C3"`).
    pub fn name(&mut self, range: &str, name: &str, sheet: Option<&str>) -> Result<()> {
        let sheet = self.sheet_or_active(sheet)?.name().to_string();
        let quoted = quote_sheet_name(&sheet);

        let parts = range
            .split(',')
            .map(|part| {
                let block = CellRange::parse(part)?;
                Ok(format!("{}!{}", quoted, absolute(&block)))
            })
            .collect::<Result<Vec<String>>>()?;

        self.define_name(NamedRange::workbook_scope(name, parts.join(",")))
    }

    /// Define or replace a named range
    pub fn define_name(&mut self, range: NamedRange) -> Result<()> {
        log::debug!("defining name '{}' -> {}", range.name, range.refers_to);
        self.named_ranges.define(range)
    }

    /// Look up a defined name as seen from the active sheet
    pub fn named_range(&self, name: &str) -> Option<&NamedRange> {
        self.named_ranges.get(name, self.active_sheet_name())
    }

    pub fn named_ranges(&self) -> &NamedRangeCollection {
        &self.named_ranges
    }

    // === Tables ===

    /// Tabular snapshot of every sheet, in workbook order
    ///
    /// Empty sheets map to empty tables.
    pub fn to_tables(&self) -> Vec<(String, Table)> {
        self.worksheets
            .iter()
            .map(|ws| (ws.name().to_string(), ws.to_table()))
            .collect()
    }

    /// Write `table` row-major starting at `start` on `sheet`
    ///
    /// With `include_header` the column headers form the first written row.
    pub fn set_tabular_block(
        &mut self,
        start: &str,
        sheet: &str,
        table: &Table,
        include_header: bool,
    ) -> Result<()> {
        self.write_block(start, sheet, table, include_header, None)
    }

    /// Like [`Workbook::set_tabular_block`], with `index` written as a
    /// leading column left of the data
    pub fn set_tabular_block_with_index(
        &mut self,
        start: &str,
        sheet: &str,
        table: &Table,
        include_header: bool,
        index: &[CellValue],
    ) -> Result<()> {
        self.write_block(start, sheet, table, include_header, Some(index))
    }

    fn write_block(
        &mut self,
        start: &str,
        sheet: &str,
        table: &Table,
        include_header: bool,
        index: Option<&[CellValue]>,
    ) -> Result<()> {
        let origin = CellAddress::parse(start)?;
        let ws = self.worksheet_mut(sheet)?;

        let data_col = i64::from(index.is_some());
        let mut row = 0i64;

        if include_header {
            for (i, header) in table.headers.iter().enumerate() {
                let addr = origin.offset(row, data_col + i as i64)?;
                ws.set_value_at(addr.row, addr.col, CellValue::string(header.as_str()))?;
            }
            row += 1;
        }

        for (r, values) in table.rows.iter().enumerate() {
            if let Some(label) = index.and_then(|idx| idx.get(r)) {
                let addr = origin.offset(row, 0)?;
                ws.set_value_at(addr.row, addr.col, label.clone())?;
            }
            for (i, value) in values.iter().enumerate() {
                let addr = origin.offset(row, data_col + i as i64)?;
                ws.set_value_at(addr.row, addr.col, value.clone())?;
            }
            row += 1;
        }

        log::debug!(
            "wrote {} row(s) x {} column(s) at {}!{}",
            table.len(),
            table.width(),
            sheet,
            start
        );
        Ok(())
    }

    /// Replace the whole store with a single sheet holding `table`
    ///
    /// The sheet keeps the name of the current first sheet. With
    /// `include_header` the headers become row 1.
    pub fn replace_with_table(&mut self, table: &Table, include_header: bool) -> Result<()> {
        let name = self.worksheets[0].name().to_string();
        *self = Workbook::from_worksheets(vec![Worksheet::new(name.as_str())])?;
        self.set_tabular_block("A1", &name, table, include_header)
    }
}

fn absolute(range: &CellRange) -> String {
    let fix = |a: &CellAddress| format!("${}${}", a.column_letters(), a.row_number());
    if range.is_single() {
        fix(&range.start)
    } else {
        format!("{}:{}", fix(&range.start), fix(&range.end))
    }
}

impl fmt::Display for Workbook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const WIDTH: usize = 24;

        writeln!(f)?;
        for (name, table) in self.to_tables() {
            writeln!(f, "{:^w$}", name, w = WIDTH)?;
            writeln!(f, "{}", "_".repeat(WIDTH))?;
            writeln!(f)?;
            if table.is_empty() {
                writeln!(f)?;
            } else {
                write!(f, "{}", table)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
