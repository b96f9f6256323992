//! Whole-workbook merge
//!
//! Sheets are taken from the other workbook in its order. A sheet whose name
//! already exists is appended row-wise below the existing sheet's last used
//! row; any other sheet is deep-copied in as a new sheet. Each sheet is one
//! unit of work: a failing unit is recorded in the [`MergeReport`] and leaves
//! the target sheet as it was, while the remaining sheets still merge.

use crate::error::{Error, Result};
use crate::workbook::Workbook;
use crate::worksheet::Worksheet;

/// Outcome of a merge
#[derive(Debug, Default)]
pub struct MergeReport {
    /// Sheets whose rows were appended to an existing sheet
    pub appended: Vec<String>,
    /// Sheets copied in as new sheets
    pub created: Vec<String>,
    /// Sheets that could not be merged, with the reason
    pub failures: Vec<(String, Error)>,
}

impl MergeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Workbook {
    /// Merge every sheet of `other` into this workbook
    pub fn merge(&mut self, other: &Workbook) -> MergeReport {
        let mut report = MergeReport::default();

        for source in other.worksheets() {
            let name = source.name().to_string();
            let existing = self.contains_sheet(&name);
            let outcome = if existing {
                self.append_sheet_rows(source)
            } else {
                self.copy_in_sheet(source)
            };

            match outcome {
                Ok(()) if existing => report.appended.push(name),
                Ok(()) => report.created.push(name),
                Err(e) => {
                    log::warn!("merging sheet '{}' failed: {}", name, e);
                    report.failures.push((name, e));
                }
            }
        }

        log::debug!(
            "merge finished: {} appended, {} created, {} failed",
            report.appended.len(),
            report.created.len(),
            report.failures.len()
        );
        report
    }

    /// Detached copy of this workbook with `other` merged in
    pub fn merged(&self, other: &Workbook) -> (Workbook, MergeReport) {
        let mut copy = self.clone();
        let report = copy.merge(other);
        (copy, report)
    }

    fn append_sheet_rows(&mut self, source: &Worksheet) -> Result<()> {
        let target = self.worksheet_mut(source.name())?;
        let mut updated = target.clone();

        let base = updated.max_row();
        for (offset, values) in source.value_rows().into_iter().enumerate() {
            let row = u32::try_from(offset)
                .ok()
                .and_then(|o| base.checked_add(o))
                .ok_or_else(|| Error::RowOutOfBounds(base, crate::MAX_ROWS - 1))?;
            for (col, value) in values.into_iter().enumerate() {
                let col = u16::try_from(col)
                    .map_err(|_| Error::ColumnOutOfBounds(col as u32, crate::MAX_COLS - 1))?;
                updated.set_value_at(row, col, value)?;
            }
        }

        *target = updated;
        Ok(())
    }

    fn copy_in_sheet(&mut self, source: &Worksheet) -> Result<()> {
        let mut sheet = Worksheet::new(source.name());
        sheet.copy_contents_from(source)?;
        self.add_worksheet(sheet)
    }
}
