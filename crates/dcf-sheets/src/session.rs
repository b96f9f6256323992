//! Access-mode sessions
//!
//! A [`Session`] owns one [`Workbook`] store and the path it was loaded
//! from. Its [`Mode`] decides which operations are allowed; anything outside
//! the mode fails with `CapabilityDenied` before touching the store.
//!
//! Sessions are scoped resources. [`Session::close`] ends a session cleanly
//! and saves in write mode; [`Session::finish`] saves only for an `Ok`
//! outcome; dropping a session saves nothing.

use std::fmt;
use std::path::{Path, PathBuf};

use dcf_sheets_core::{
    Cell, CellAddress, CellValue, Error as CoreError, Index, Lookup, MergeReport, NamedRange,
    RangeIter, RangeMode, RangeRequest, RowWindow, Table, Workbook, Worksheet,
};

use crate::bridge::FormulaBridge;
use crate::error::Result;
use crate::io::{absolute, FileFormat, WorkbookExt};
use crate::mode::Mode;
use crate::options::OpenOptions;

/// A workbook opened in one access mode
pub struct Session {
    path: Option<PathBuf>,
    mode: Mode,
    workbook: Workbook,
    safety_copy: Option<Workbook>,
    closed: bool,
}

impl Session {
    pub(crate) fn from_parts(path: Option<PathBuf>, mode: Mode, workbook: Workbook) -> Self {
        Self {
            path,
            mode,
            workbook,
            safety_copy: None,
            closed: false,
        }
    }

    /// Open an existing file with default [`OpenOptions`]
    pub fn open<P: AsRef<Path>>(path: P, mode: Mode) -> Result<Self> {
        OpenOptions::new().open(path, mode)
    }

    /// Wrap an in-memory workbook that has no file behind it
    ///
    /// Saving needs an explicit path, and formula evaluation fails with
    /// `NoPath` until one has been given.
    pub fn detached(workbook: Workbook, mode: Mode) -> Self {
        Self::from_parts(None, mode, workbook)
    }

    /// Open `path`, run `body`, then close; see [`OpenOptions::scope`]
    pub fn scope<P, T, F>(path: P, mode: Mode, body: F) -> Result<T>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut Session) -> Result<T>,
    {
        OpenOptions::new().scope(path, mode, body)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Read access to the store
    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    /// Write access to the store
    pub fn workbook_mut(&mut self) -> Result<&mut Workbook> {
        self.store_mut("workbook_mut")
    }

    fn store_mut(&mut self, operation: &'static str) -> Result<&mut Workbook> {
        self.mode.require(Mode::Mutable, operation)?;
        Ok(&mut self.workbook)
    }

    // === Reads ===

    pub fn sheets(&self) -> Vec<&str> {
        self.workbook.sheets()
    }

    pub fn sheet_count(&self) -> usize {
        self.workbook.sheet_count()
    }

    /// Name of the active sheet
    pub fn active_sheet(&self) -> &str {
        self.workbook.active_sheet_name()
    }

    pub fn worksheet(&self, name: &str) -> Result<&Worksheet> {
        Ok(self.workbook.worksheet(name)?)
    }

    /// Membership test
    ///
    /// A string asks whether a sheet of that name exists. A [`Cell`] asks
    /// whether the store holds the cell's value at the cell's address.
    pub fn contains<'a>(&self, item: impl Into<Index<'a>>) -> bool {
        match item.into() {
            Index::Key(name) => self.workbook.contains_sheet(name),
            Index::Cell(cell) => self.workbook.contains_value(cell),
        }
    }

    /// Read through an index; formulas are returned as stored
    pub fn get<'a>(&self, index: impl Into<Index<'a>>) -> Result<Lookup<'_>> {
        Ok(self.workbook.get(index)?)
    }

    pub fn cell<'a>(&self, index: impl Into<Index<'a>>) -> Result<Cell> {
        Ok(self.workbook.cell(index)?)
    }

    pub fn value<'a>(&self, index: impl Into<Index<'a>>) -> Result<CellValue> {
        Ok(self.workbook.value(index)?)
    }

    pub fn range(
        &self,
        reference: Option<&str>,
        sheet: Option<&str>,
        mode: RangeMode,
    ) -> Result<RangeIter<'_>> {
        Ok(self.workbook.range(reference, sheet, mode)?)
    }

    pub fn range_with(
        &self,
        reference: Option<&str>,
        sheet: Option<&str>,
        request: RangeRequest,
    ) -> Result<RangeIter<'_>> {
        Ok(self.workbook.range_with(reference, sheet, request)?)
    }

    pub fn iter_rows(
        &self,
        window: RowWindow,
        sheet: Option<&str>,
    ) -> Result<impl Iterator<Item = Vec<Cell>> + '_> {
        Ok(self.workbook.iter_rows(window, sheet)?)
    }

    pub fn to_tables(&self) -> Vec<(String, Table)> {
        self.workbook.to_tables()
    }

    pub fn named_range(&self, name: &str) -> Option<&NamedRange> {
        self.workbook.named_range(name)
    }

    // === Writes (modify and write modes) ===

    /// Write through an index; see [`Workbook::set`]
    pub fn set<'a>(
        &mut self,
        index: impl Into<Index<'a>>,
        value: impl Into<CellValue>,
    ) -> Result<()> {
        Ok(self.store_mut("set")?.set(index, value)?)
    }

    /// Clear through an index; see [`Workbook::delete`]
    pub fn delete<'a>(&mut self, index: impl Into<Index<'a>>) -> Result<()> {
        Ok(self.store_mut("delete")?.delete(index)?)
    }

    pub fn new_sheet(&mut self, name: &str) -> Result<&mut Worksheet> {
        Ok(self.store_mut("new_sheet")?.new_sheet(name)?)
    }

    pub fn rename_sheet(&mut self, old: &str, new: &str) -> Result<()> {
        Ok(self.store_mut("rename_sheet")?.rename_sheet(old, new)?)
    }

    pub fn remove_sheet(&mut self, name: &str) -> Result<Worksheet> {
        Ok(self.store_mut("remove_sheet")?.remove_sheet(name)?)
    }

    pub fn set_active_sheet(&mut self, name: &str) -> Result<()> {
        Ok(self.store_mut("set_active_sheet")?.set_active_sheet(name)?)
    }

    /// Define a workbook-scoped name; see [`Workbook::name`]
    pub fn name(&mut self, range: &str, name: &str, sheet: Option<&str>) -> Result<()> {
        Ok(self.store_mut("name")?.name(range, name, sheet)?)
    }

    pub fn define_name(&mut self, range: NamedRange) -> Result<()> {
        Ok(self.store_mut("define_name")?.define_name(range)?)
    }

    pub fn clear_sheet(&mut self, sheet: &str, range: Option<&str>) -> Result<()> {
        Ok(self.store_mut("clear_sheet")?.clear_sheet(sheet, range)?)
    }

    pub fn clear_workbook(&mut self, sheets: Option<&[&str]>) -> Result<()> {
        Ok(self.store_mut("clear_workbook")?.clear_workbook(sheets)?)
    }

    pub fn copy_sheet_contents(&mut self, source: &str, target: &str) -> Result<()> {
        Ok(self
            .store_mut("copy_sheet_contents")?
            .copy_sheet_contents(source, target)?)
    }

    pub fn set_tabular_block(
        &mut self,
        start: &str,
        sheet: &str,
        table: &Table,
        include_header: bool,
    ) -> Result<()> {
        Ok(self
            .store_mut("set_tabular_block")?
            .set_tabular_block(start, sheet, table, include_header)?)
    }

    pub fn set_tabular_block_with_index(
        &mut self,
        start: &str,
        sheet: &str,
        table: &Table,
        include_header: bool,
        index: &[CellValue],
    ) -> Result<()> {
        Ok(self
            .store_mut("set_tabular_block")?
            .set_tabular_block_with_index(start, sheet, table, include_header, index)?)
    }

    /// Merge another workbook into this one; see [`Workbook::merge`]
    pub fn merge(&mut self, other: &Workbook) -> Result<MergeReport> {
        Ok(self.store_mut("merge")?.merge(other))
    }

    /// Load the workbook at `path` and merge it into this one
    pub fn merge_file<P: AsRef<Path>>(&mut self, path: P) -> Result<MergeReport> {
        self.mode.require(Mode::Mutable, "merge")?;
        let other = Workbook::open(path)?;
        self.merge(&other)
    }

    /// Detached session holding this workbook with `other` merged in
    ///
    /// The result has no path and is at least modifiable.
    pub fn merged(&self, other: &Workbook) -> (Session, MergeReport) {
        let (workbook, report) = self.workbook.merged(other);
        let mode = self.mode.max(Mode::Mutable);
        (Session::detached(workbook, mode), report)
    }

    /// A fresh modify-mode session on the same file
    ///
    /// The store is re-read from disk, so unsaved edits of this session are
    /// not carried over. A detached session copies its in-memory store.
    pub fn copy(&self) -> Result<Session> {
        self.copy_with_mode(Mode::Mutable)
    }

    /// Like [`Session::copy`], opening the new session in `mode`
    pub fn copy_with_mode(&self, mode: Mode) -> Result<Session> {
        if !mode.can_modify() {
            return Err(CoreError::CapabilityDenied {
                operation: "copy",
                mode: mode.as_str(),
            }
            .into());
        }
        match &self.path {
            Some(path) => Session::open(path, mode),
            None => Ok(Session::detached(self.workbook.clone(), mode)),
        }
    }

    // === Persistence (write mode) ===

    /// Save the store, or a tabular snapshot in its place
    ///
    /// Without `path` the file the session was opened from is written; with
    /// neither available this fails with `NoPath`. Giving `path` does not
    /// move the session to it.
    ///
    /// With `table`, the file receives a single sheet holding the table (its
    /// headers as row 1) instead of the live workbook, and the store is then
    /// reloaded from the written file so memory matches disk.
    pub fn save(&mut self, path: Option<&Path>, table: Option<&Table>) -> Result<()> {
        self.mode.require(Mode::Persistent, "save")?;
        let target = match path {
            Some(path) => absolute(path),
            None => self.path.clone().ok_or(CoreError::NoPath)?,
        };

        match table {
            Some(table) => {
                let mut snapshot = self.workbook.clone();
                snapshot.replace_with_table(table, true)?;
                snapshot.save(&target)?;
                self.workbook = Workbook::open(&target)?;
                log::info!(
                    "saved table of {} row(s) to {}; store reloaded",
                    table.len(),
                    target.display()
                );
            }
            None => {
                self.workbook.save(&target)?;
                log::info!("saved {}", target.display());
            }
        }
        Ok(())
    }

    /// Keep an in-memory snapshot of the store
    pub fn safety_save(&mut self) -> Result<()> {
        self.mode.require(Mode::Persistent, "safety_save")?;
        self.safety_copy = Some(self.workbook.clone());
        log::debug!("safety copy taken");
        Ok(())
    }

    /// Revert the store to the last safety copy
    ///
    /// Returns `false` when no copy was taken. The copy is kept, so it can be
    /// restored again.
    pub fn restore_safety(&mut self) -> Result<bool> {
        self.mode.require(Mode::Persistent, "restore_safety")?;
        match &self.safety_copy {
            Some(snapshot) => {
                self.workbook = snapshot.clone();
                log::debug!("store restored from safety copy");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // === Formula evaluation ===

    /// Evaluate the cell named by `index` against the saved file
    ///
    /// In write mode pending edits are saved first; in modify mode the file
    /// the session was opened from is used as it is on disk.
    pub fn evaluate_formula<'a>(&mut self, index: impl Into<Index<'a>>) -> Result<CellValue> {
        self.mode.require(Mode::Mutable, "evaluate")?;
        let cell = self.workbook.cell(index)?;
        let address = cell.address()?;
        self.evaluate_at(cell.sheet(), address)
    }

    /// Read a value, routing formula-looking content through the bridge
    ///
    /// Formulas, `=`-prefixed text and text containing `+` are evaluated in
    /// modify and write modes. Read mode returns the stored value.
    pub fn get_evaluated<'a>(&mut self, index: impl Into<Index<'a>>) -> Result<CellValue> {
        let cell = self.workbook.cell(index)?;
        if !self.mode.can_modify() || !cell.value.looks_like_formula() {
            return Ok(cell.value);
        }
        let address = cell.address()?;
        self.evaluate_at(cell.sheet(), address)
    }

    fn evaluate_at(&mut self, sheet: &str, address: CellAddress) -> Result<CellValue> {
        if self.mode.can_persist() {
            log::debug!("flushing before evaluating {}!{}", sheet, address.position());
            self.save(None, None)?;
        }
        let path = self.path.as_deref().ok_or(CoreError::NoPath)?;
        // a one-sheet file holds the active sheet under its own name
        let on_file = if FileFormat::from_path(path)?.holds_one_sheet()
            && sheet == self.workbook.active_sheet_name()
        {
            None
        } else {
            Some(sheet)
        };
        FormulaBridge::new(path).evaluate(on_file, address)
    }

    // === Lifecycle ===

    /// End the session; write mode saves to the session's path
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        if self.mode.can_persist() {
            self.save(None, None)?;
        }
        log::debug!("closed {} session on {}", self.mode, self.describe());
        Ok(())
    }

    /// End the session according to `outcome`
    ///
    /// `Ok` closes (saving in write mode) and passes the value on. `Err`
    /// discards the session's edits without saving and passes the error on.
    pub fn finish<T>(mut self, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => {
                self.close()?;
                Ok(value)
            }
            Err(e) => {
                self.closed = true;
                if self.mode.can_persist() {
                    log::warn!("not saving {}: session ended with an error: {}", self.describe(), e);
                }
                Err(e)
            }
        }
    }

    fn describe(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<detached workbook>".to_string())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed && self.mode.can_persist() {
            log::warn!(
                "write session on {} dropped without close; edits were not saved",
                self.describe()
            );
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("sheets", &self.workbook.sheets())
            .field("safety_copy", &self.safety_copy.is_some())
            .finish()
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.workbook, f)
    }
}
