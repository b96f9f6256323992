//! Cell address codec and range types
//!
//! Column letters use bijective base-26: there is no digit for zero, so the
//! column after `Z` is `AA` rather than `Z0`. The free functions in this module
//! work on 1-based column indices; [`CellAddress`] stores 0-based indices the
//! way the grid does.

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Convert column letters to a 1-based index (`A` = 1, `Z` = 26, `AA` = 27)
///
/// ```
/// use dcf_sheets_core::cell::column_to_index;
///
/// assert_eq!(column_to_index("A").unwrap(), 1);
/// assert_eq!(column_to_index("AA").unwrap(), 27);
/// assert!(column_to_index("A1").is_err());
/// ```
pub fn column_to_index(column: &str) -> Result<u32> {
    if column.is_empty() {
        return Err(Error::malformed(column));
    }

    column.bytes().try_fold(0u32, |acc, b| {
        if !b.is_ascii_uppercase() {
            return Err(Error::malformed(column));
        }
        acc.checked_mul(26)
            .and_then(|v| v.checked_add(u32::from(b - b'A') + 1))
            .ok_or_else(|| Error::malformed(column))
    })
}

/// Convert a 1-based column index to letters (`1` = `A`, `27` = `AA`)
pub fn index_to_column(index: u32) -> Result<String> {
    if index == 0 {
        return Err(Error::ColumnOutOfRange {
            column: String::new(),
            delta: 0,
        });
    }

    let mut letters = Vec::with_capacity(4);
    let mut n = index;
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();

    // Only ASCII uppercase bytes were pushed
    Ok(letters.into_iter().map(char::from).collect())
}

/// Apply `delta` to a column's index and return the resulting letters
///
/// Fails with [`Error::ColumnOutOfRange`] when the result would be below `A`.
pub fn shift_column(column: &str, delta: i64) -> Result<String> {
    let index = i64::from(column_to_index(column)?);
    let shifted = index + delta;
    if shifted < 1 || shifted > i64::from(u32::MAX) {
        return Err(Error::ColumnOutOfRange {
            column: column.to_string(),
            delta,
        });
    }
    index_to_column(shifted as u32)
}

/// Split a position like `"AB12"` into its column letters and 1-based row
pub fn split_position(position: &str) -> Result<(String, u32)> {
    let split = position
        .find(|c: char| !c.is_ascii_uppercase())
        .ok_or_else(|| Error::malformed(position))?;
    let (column, row) = position.split_at(split);

    if column.is_empty() || row.is_empty() || !row.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::malformed(position));
    }

    let row: u32 = row.parse().map_err(|_| Error::malformed(position))?;
    if row == 0 {
        return Err(Error::malformed(position));
    }

    Ok((column.to_string(), row))
}

/// Split a position into its 1-based column index and 1-based row
pub fn split_position_index(position: &str) -> Result<(u32, u32)> {
    let (column, row) = split_position(position)?;
    Ok((column_to_index(&column)?, row))
}

/// Inclusive ascending sequence of characters between two bounds
///
/// The returned range is a plain value; cloning it restarts the enumeration.
pub fn char_range(start: char, end: char) -> RangeInclusive<char> {
    start..=end
}

/// A cell address (e.g., "A1", "$B$2")
///
/// Rows and columns are stored 0-based; the A1 form is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, B=1, ..., XFD=16383)
    pub col: u16,
    /// Whether the row reference is absolute ($)
    pub row_absolute: bool,
    /// Whether the column reference is absolute ($)
    pub col_absolute: bool,
}

impl CellAddress {
    /// Create a new cell address with relative references
    pub fn new(row: u32, col: u16) -> Self {
        Self {
            row,
            col,
            row_absolute: false,
            col_absolute: false,
        }
    }

    /// Build an address from column letters and a 1-based row
    pub fn from_position(column: &str, row: u32) -> Result<Self> {
        if row == 0 {
            return Err(Error::malformed(format!("{}{}", column, row)));
        }
        let col = column_to_index(column)? - 1;
        Self::checked(row - 1, col)
    }

    fn checked(row: u32, col: u32) -> Result<Self> {
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }
        if col >= u32::from(MAX_COLS) {
            return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
        }
        Ok(Self::new(row, col as u16))
    }

    /// Parse a cell address from A1-style notation, accepting `$` markers
    ///
    /// # Examples
    /// ```
    /// use dcf_sheets_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("$B$2").unwrap();
    /// assert_eq!((addr.row, addr.col), (1, 1));
    /// assert!(addr.row_absolute && addr.col_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let bytes = s.as_bytes();
        let mut pos = 0;

        let col_absolute = bytes.first() == Some(&b'$');
        if col_absolute {
            pos += 1;
        }

        let col_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        let letters = s[col_start..pos].to_ascii_uppercase();

        let row_absolute = bytes.get(pos) == Some(&b'$');
        if row_absolute {
            pos += 1;
        }

        let digits = &s[pos..];
        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(Error::malformed(s));
        }

        let row: u32 = digits.parse().map_err(|_| Error::malformed(s))?;
        let mut addr = Self::from_position(&letters, row)?;
        addr.row_absolute = row_absolute;
        addr.col_absolute = col_absolute;
        Ok(addr)
    }

    /// Convert a 0-based column index to letters (0 = A, 25 = Z, 26 = AA)
    pub fn column_to_letters(col: u16) -> String {
        let mut result = String::new();
        let mut n = u32::from(col) + 1;

        while n > 0 {
            n -= 1;
            result.insert(0, char::from(b'A' + (n % 26) as u8));
            n /= 26;
        }

        result
    }

    /// Column letters of this address
    pub fn column_letters(&self) -> String {
        Self::column_to_letters(self.col)
    }

    /// 1-based row number
    pub fn row_number(&self) -> u32 {
        self.row + 1
    }

    /// Move the address by a number of columns
    pub fn offset_columns(&self, delta: i64) -> Result<Self> {
        let col = i64::from(self.col) + delta;
        if col < 0 {
            return Err(Error::ColumnOutOfRange {
                column: self.column_letters(),
                delta,
            });
        }
        Self::checked(self.row, col as u32)
    }

    /// Move the address by rows and columns, both of which may be negative
    pub fn offset(&self, rows: i64, cols: i64) -> Result<Self> {
        let row = i64::from(self.row) + rows;
        if row < 0 {
            return Err(Error::RowOutOfBounds(0, MAX_ROWS - 1));
        }
        let shifted = self.offset_columns(cols)?;
        Self::checked(row as u32, u32::from(shifted.col))
    }

    /// Format as A1-style string, keeping `$` markers
    pub fn to_a1_string(&self) -> String {
        let mut result = String::new();

        if self.col_absolute {
            result.push('$');
        }
        result.push_str(&self.column_letters());

        if self.row_absolute {
            result.push('$');
        }
        result.push_str(&self.row_number().to_string());

        result
    }

    /// Format as plain A1 without `$` markers
    pub fn position(&self) -> String {
        format!("{}{}", self.column_letters(), self.row_number())
    }

    /// Create a range from this address to another
    pub fn to(&self, other: CellAddress) -> CellRange {
        CellRange::new(*self, other)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A rectangular block of cells (e.g., "A1:B10")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    /// Start address (top-left)
    pub start: CellAddress,
    /// End address (bottom-right)
    pub end: CellAddress,
}

impl CellRange {
    /// Create a new cell range, normalizing the corners
    pub fn new(start: CellAddress, end: CellAddress) -> Self {
        Self {
            start: CellAddress::new(start.row.min(end.row), start.col.min(end.col)),
            end: CellAddress::new(start.row.max(end.row), start.col.max(end.col)),
        }
    }

    /// Create a range from 0-based row/column indices
    pub fn from_indices(start_row: u32, start_col: u16, end_row: u32, end_col: u16) -> Self {
        Self::new(
            CellAddress::new(start_row, start_col),
            CellAddress::new(end_row, end_col),
        )
    }

    /// Create a single-cell range
    pub fn single(addr: CellAddress) -> Self {
        Self::new(addr, addr)
    }

    /// Parse `A1:B10` or a single `A1`
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        match s.split_once(':') {
            Some((start, end)) => Ok(Self::new(CellAddress::parse(start)?, CellAddress::parse(end)?)),
            None => Ok(Self::single(CellAddress::parse(s)?)),
        }
    }

    /// Check if a cell is within this range
    pub fn contains(&self, addr: &CellAddress) -> bool {
        addr.row >= self.start.row
            && addr.row <= self.end.row
            && addr.col >= self.start.col
            && addr.col <= self.end.col
    }

    /// Number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Number of columns in the range
    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    /// Total number of cells in the range
    pub fn cell_count(&self) -> u64 {
        u64::from(self.row_count()) * u64::from(self.col_count())
    }

    /// Whether the range covers exactly one cell
    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    /// Iterate the cells row by row
    pub fn cells(&self) -> CellRangeIter {
        CellRangeIter::new(*self, Traversal::RowMajor)
    }

    /// Iterate the cells column by column
    pub fn cells_by_column(&self) -> CellRangeIter {
        CellRangeIter::new(*self, Traversal::ColumnMajor)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start.position())
        } else {
            write!(f, "{}:{}", self.start.position(), self.end.position())
        }
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Traversal {
    RowMajor,
    ColumnMajor,
}

/// Iterator over the addresses of a [`CellRange`]
#[derive(Debug, Clone)]
pub struct CellRangeIter {
    range: CellRange,
    traversal: Traversal,
    next: u64,
}

impl CellRangeIter {
    fn new(range: CellRange, traversal: Traversal) -> Self {
        Self {
            range,
            traversal,
            next: 0,
        }
    }
}

impl Iterator for CellRangeIter {
    type Item = CellAddress;

    fn next(&mut self) -> Option<CellAddress> {
        if self.next >= self.range.cell_count() {
            return None;
        }

        let rows = u64::from(self.range.row_count());
        let cols = u64::from(self.range.col_count());
        let (row_off, col_off) = match self.traversal {
            Traversal::RowMajor => (self.next / cols, self.next % cols),
            Traversal::ColumnMajor => (self.next % rows, self.next / rows),
        };
        self.next += 1;

        Some(CellAddress::new(
            self.range.start.row + row_off as u32,
            self.range.start.col + col_off as u16,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.range.cell_count() - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CellRangeIter {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_column_codec() {
        assert_eq!(column_to_index("A").unwrap(), 1);
        assert_eq!(column_to_index("Z").unwrap(), 26);
        assert_eq!(column_to_index("AA").unwrap(), 27);
        assert_eq!(column_to_index("AZ").unwrap(), 52);
        assert_eq!(column_to_index("XFD").unwrap(), 16_384);

        assert_eq!(index_to_column(26).unwrap(), "Z");
        assert_eq!(index_to_column(27).unwrap(), "AA");
        assert_eq!(index_to_column(702).unwrap(), "ZZ");
        assert_eq!(index_to_column(703).unwrap(), "AAA");
    }

    #[test]
    fn test_column_codec_rejects_bad_input() {
        assert!(matches!(column_to_index(""), Err(Error::MalformedAddress(_))));
        assert!(matches!(column_to_index("a"), Err(Error::MalformedAddress(_))));
        assert!(matches!(column_to_index("A1"), Err(Error::MalformedAddress(_))));
        assert!(index_to_column(0).is_err());
    }

    #[test]
    fn test_shift_column() {
        assert_eq!(shift_column("A", 1).unwrap(), "B");
        assert_eq!(shift_column("Z", 1).unwrap(), "AA");
        assert_eq!(shift_column("AA", -1).unwrap(), "Z");
        assert_eq!(shift_column("C", 0).unwrap(), "C");
        assert!(matches!(
            shift_column("A", -1),
            Err(Error::ColumnOutOfRange { delta: -1, .. })
        ));
    }

    #[test]
    fn test_split_position() {
        assert_eq!(split_position("A1").unwrap(), ("A".to_string(), 1));
        assert_eq!(split_position("AB123").unwrap(), ("AB".to_string(), 123));
        assert_eq!(split_position_index("AA10").unwrap(), (27, 10));

        for bad in ["", "A", "12", "1A", "A1B", "a1", "A0", "$A$1", "A 1"] {
            assert!(
                matches!(split_position(bad), Err(Error::MalformedAddress(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_char_range() {
        let range = char_range('A', 'D');
        assert_eq!(range.clone().collect::<String>(), "ABCD");
        assert_eq!(range.collect::<String>(), "ABCD");
        assert_eq!(char_range('C', 'C').count(), 1);
        assert_eq!(char_range('D', 'A').count(), 0);
    }

    #[test]
    fn test_parse_simple() {
        let addr = CellAddress::parse("A1").unwrap();
        assert_eq!((addr.row, addr.col), (0, 0));

        let addr = CellAddress::parse("b2").unwrap();
        assert_eq!((addr.row, addr.col), (1, 1));

        let addr = CellAddress::parse("XFD1048576").unwrap();
        assert_eq!((addr.row, addr.col), (1_048_575, 16_383));
    }

    #[test]
    fn test_parse_absolute() {
        let addr = CellAddress::parse("$A1").unwrap();
        assert!(addr.col_absolute && !addr.row_absolute);
        assert_eq!(addr.to_a1_string(), "$A1");
        assert_eq!(addr.position(), "A1");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(CellAddress::parse("").is_err());
        assert!(CellAddress::parse("A").is_err());
        assert!(CellAddress::parse("1").is_err());
        assert!(CellAddress::parse("A0").is_err());
        assert!(CellAddress::parse("XFE1").is_err());
    }

    #[test]
    fn test_offset_columns() {
        let addr = CellAddress::parse("B3").unwrap();
        assert_eq!(addr.offset_columns(2).unwrap().position(), "D3");
        assert_eq!(addr.offset_columns(-1).unwrap().position(), "A3");
        assert!(addr.offset_columns(-2).is_err());
        assert_eq!(addr.offset(2, 1).unwrap().position(), "C5");
    }

    #[test]
    fn test_range_parse_and_display() {
        let range = CellRange::parse("B3:A1").unwrap();
        assert_eq!(range.to_string(), "A1:B3");
        assert_eq!(range.row_count(), 3);
        assert_eq!(range.col_count(), 2);
        assert_eq!(CellRange::parse("C4").unwrap().to_string(), "C4");
    }

    #[test]
    fn test_range_traversal() {
        let range = CellRange::parse("A1:B2").unwrap();
        let rows: Vec<String> = range.cells().map(|a| a.position()).collect();
        assert_eq!(rows, ["A1", "B1", "A2", "B2"]);

        let cols: Vec<String> = range.cells_by_column().map(|a| a.position()).collect();
        assert_eq!(cols, ["A1", "A2", "B1", "B2"]);
        assert_eq!(range.cells().len(), 4);
    }

    proptest! {
        #[test]
        fn prop_column_codec_round_trip(n in 1u32..=10_000) {
            let letters = index_to_column(n).unwrap();
            prop_assert_eq!(column_to_index(&letters).unwrap(), n);
        }

        #[test]
        fn prop_letters_are_unique(a in 1u32..=10_000, b in 1u32..=10_000) {
            prop_assume!(a != b);
            prop_assert_ne!(index_to_column(a).unwrap(), index_to_column(b).unwrap());
        }
    }

    #[test]
    fn test_column_codec_exhaustive() {
        for n in 1..=10_000u32 {
            assert_eq!(column_to_index(&index_to_column(n).unwrap()).unwrap(), n);
        }
    }
}
