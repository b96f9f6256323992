//! The `Cell` value object handed out by workbook reads

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Div, Mul, Rem, Shl, Shr, Sub};

use super::address::{column_to_index, shift_column, split_position};
use super::arith::ArithOp;
use super::{CellAddress, CellValue};
use crate::error::{Error, Result};

/// A snapshot of one cell: its value plus the position it was read from
///
/// Identity is the `(column, row, sheet)` triple; the value takes no part in
/// equality or hashing. Cells order by column (shorter letter runs first, then
/// alphabetically) and then by row, but only within a single sheet, so the
/// relational helpers return [`Error::IncomparableSheets`] across sheets
/// instead of an answer.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Stored value
    pub value: CellValue,
    /// Formula text when the value came from a formula cell
    pub formula: Option<String>,
    column: String,
    row: u32,
    sheet: String,
}

impl Cell {
    /// Create a cell at `column` / 1-based `row` of `sheet`
    pub fn new<V, C, S>(value: V, column: C, row: u32, sheet: S) -> Result<Self>
    where
        V: Into<CellValue>,
        C: Into<String>,
        S: Into<String>,
    {
        let column = column.into();
        column_to_index(&column)?;
        if row == 0 {
            return Err(Error::malformed(format!("{}{}", column, row)));
        }

        let value = value.into();
        let formula = value.formula_text().map(str::to_string);
        Ok(Self {
            value,
            formula,
            column,
            row,
            sheet: sheet.into(),
        })
    }

    /// Create a cell whose column and row are already known to be valid
    pub(crate) fn from_checked(value: CellValue, column: String, row: u32, sheet: &str) -> Self {
        let formula = value.formula_text().map(str::to_string);
        Self {
            value,
            formula,
            column,
            row,
            sheet: sheet.to_string(),
        }
    }

    /// Create a cell from a position string such as `"B7"`
    pub fn at<V, S>(value: V, position: &str, sheet: S) -> Result<Self>
    where
        V: Into<CellValue>,
        S: Into<String>,
    {
        let (column, row) = split_position(position)?;
        Self::new(value, column, row, sheet)
    }

    /// Column letters
    pub fn column(&self) -> &str {
        &self.column
    }

    /// 1-based row
    pub fn row(&self) -> u32 {
        self.row
    }

    /// Owning sheet name
    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// Column letters followed by the row, e.g. `"B7"`
    pub fn position(&self) -> String {
        format!("{}{}", self.column, self.row)
    }

    /// Grid address of this cell
    pub fn address(&self) -> Result<CellAddress> {
        CellAddress::from_position(&self.column, self.row)
    }

    /// Same value, column moved by `delta`
    pub fn shift_column(&self, delta: i64) -> Result<Cell> {
        let mut shifted = self.clone();
        shifted.column = shift_column(&self.column, delta)?;
        Ok(shifted)
    }

    /// Same value, row moved by `delta`
    pub fn shift_row(&self, delta: i64) -> Result<Cell> {
        let row = i64::from(self.row) + delta;
        if row < 1 || row > i64::from(u32::MAX) {
            return Err(Error::malformed(format!("{}{}", self.column, row)));
        }
        let mut shifted = self.clone();
        shifted.row = row as u32;
        Ok(shifted)
    }

    fn sort_key(&self) -> (usize, &str, u32) {
        (self.column.len(), &self.column, self.row)
    }

    /// Compare positions within one sheet
    pub fn try_cmp(&self, other: &Cell) -> Result<Ordering> {
        if self.sheet != other.sheet {
            return Err(Error::IncomparableSheets {
                left: self.sheet.clone(),
                right: other.sheet.clone(),
            });
        }
        Ok(self.sort_key().cmp(&other.sort_key()))
    }

    pub fn lt(&self, other: &Cell) -> Result<bool> {
        Ok(self.try_cmp(other)? == Ordering::Less)
    }

    pub fn le(&self, other: &Cell) -> Result<bool> {
        Ok(self.try_cmp(other)? != Ordering::Greater)
    }

    pub fn gt(&self, other: &Cell) -> Result<bool> {
        Ok(self.try_cmp(other)? == Ordering::Greater)
    }

    pub fn ge(&self, other: &Cell) -> Result<bool> {
        Ok(self.try_cmp(other)? != Ordering::Less)
    }

    /// `self.value <op> rhs`
    pub fn apply<R: Into<CellValue>>(&self, op: ArithOp, rhs: R) -> Result<CellValue> {
        op.apply(&self.value, &rhs.into())
    }

    /// In-place form of [`Cell::apply`]; the value is untouched on failure
    pub fn apply_assign<R: Into<CellValue>>(&mut self, op: ArithOp, rhs: R) -> Result<()> {
        self.value = self.apply(op, rhs)?;
        self.formula = None;
        Ok(())
    }

    pub fn floor_div<R: Into<CellValue>>(&self, rhs: R) -> Result<CellValue> {
        self.apply(ArithOp::FloorDiv, rhs)
    }

    pub fn pow<R: Into<CellValue>>(&self, rhs: R) -> Result<CellValue> {
        self.apply(ArithOp::Pow, rhs)
    }

    pub fn add_assign<R: Into<CellValue>>(&mut self, rhs: R) -> Result<()> {
        self.apply_assign(ArithOp::Add, rhs)
    }

    pub fn sub_assign<R: Into<CellValue>>(&mut self, rhs: R) -> Result<()> {
        self.apply_assign(ArithOp::Sub, rhs)
    }

    pub fn mul_assign<R: Into<CellValue>>(&mut self, rhs: R) -> Result<()> {
        self.apply_assign(ArithOp::Mul, rhs)
    }

    pub fn div_assign<R: Into<CellValue>>(&mut self, rhs: R) -> Result<()> {
        self.apply_assign(ArithOp::Div, rhs)
    }

    pub fn floor_div_assign<R: Into<CellValue>>(&mut self, rhs: R) -> Result<()> {
        self.apply_assign(ArithOp::FloorDiv, rhs)
    }

    pub fn rem_assign<R: Into<CellValue>>(&mut self, rhs: R) -> Result<()> {
        self.apply_assign(ArithOp::Mod, rhs)
    }

    pub fn pow_assign<R: Into<CellValue>>(&mut self, rhs: R) -> Result<()> {
        self.apply_assign(ArithOp::Pow, rhs)
    }
}

/// Sort cells of one sheet by position
pub fn sort_cells(cells: &mut [Cell]) -> Result<()> {
    if let Some(first) = cells.first() {
        if let Some(other) = cells.iter().find(|c| c.sheet != first.sheet) {
            return Err(Error::IncomparableSheets {
                left: first.sheet.clone(),
                right: other.sheet.clone(),
            });
        }
    }
    cells.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    Ok(())
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.column == other.column && self.row == other.row && self.sheet == other.sheet
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.column.hash(state);
        self.row.hash(state);
        self.sheet.hash(state);
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl From<&Cell> for CellValue {
    fn from(cell: &Cell) -> Self {
        cell.value.clone()
    }
}

impl From<Cell> for CellValue {
    fn from(cell: Cell) -> Self {
        cell.value
    }
}

impl Shr<i64> for &Cell {
    type Output = Result<Cell>;

    fn shr(self, delta: i64) -> Result<Cell> {
        self.shift_column(delta)
    }
}

impl Shl<i64> for &Cell {
    type Output = Result<Cell>;

    fn shl(self, delta: i64) -> Result<Cell> {
        self.shift_column(-delta)
    }
}

impl<R: Into<CellValue>> Add<R> for &Cell {
    type Output = Result<CellValue>;

    fn add(self, rhs: R) -> Result<CellValue> {
        self.apply(ArithOp::Add, rhs)
    }
}

impl<R: Into<CellValue>> Sub<R> for &Cell {
    type Output = Result<CellValue>;

    fn sub(self, rhs: R) -> Result<CellValue> {
        self.apply(ArithOp::Sub, rhs)
    }
}

impl<R: Into<CellValue>> Mul<R> for &Cell {
    type Output = Result<CellValue>;

    fn mul(self, rhs: R) -> Result<CellValue> {
        self.apply(ArithOp::Mul, rhs)
    }
}

impl<R: Into<CellValue>> Div<R> for &Cell {
    type Output = Result<CellValue>;

    fn div(self, rhs: R) -> Result<CellValue> {
        self.apply(ArithOp::Div, rhs)
    }
}

impl<R: Into<CellValue>> Rem<R> for &Cell {
    type Output = Result<CellValue>;

    fn rem(self, rhs: R) -> Result<CellValue> {
        self.apply(ArithOp::Mod, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::index_to_column;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn cell(value: f64, position: &str, sheet: &str) -> Cell {
        Cell::at(value, position, sheet).unwrap()
    }

    #[test]
    fn test_identity_ignores_value() {
        let a = cell(1.0, "B2", "Sheet1");
        let b = cell(99.0, "B2", "Sheet1");
        assert_eq!(a, b);

        let set: HashSet<Cell> = [a, b, cell(1.0, "B2", "Other")].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_ordering_within_sheet() {
        let z9 = cell(0.0, "Z9", "S");
        let aa1 = cell(0.0, "AA1", "S");
        let b1 = cell(0.0, "B1", "S");
        let b2 = cell(0.0, "B2", "S");

        assert!(z9.lt(&aa1).unwrap());
        assert!(b1.lt(&z9).unwrap());
        assert!(b1.lt(&b2).unwrap());
        assert!(b2.ge(&b1).unwrap());
        assert!(b2.le(&b2).unwrap());
        assert!(aa1.gt(&b2).unwrap());

        assert!(b1.le(&b2).unwrap());
        assert!(!b2.le(&b1).unwrap());
        assert!(!b1.gt(&b2).unwrap());
        assert!(!b2.gt(&b2).unwrap());
        assert!(b2.ge(&b2).unwrap());
        assert!(!b1.ge(&b2).unwrap());
        assert!(!b2.lt(&b2).unwrap());
    }

    #[test]
    fn test_cross_sheet_comparison_fails() {
        let a = cell(0.0, "A1", "Sheet1");
        let b = cell(0.0, "A2", "Sheet2");
        assert!(matches!(a.lt(&b), Err(Error::IncomparableSheets { .. })));
        assert!(matches!(a.le(&b), Err(Error::IncomparableSheets { .. })));
        assert!(matches!(a.gt(&b), Err(Error::IncomparableSheets { .. })));
        assert!(matches!(a.ge(&b), Err(Error::IncomparableSheets { .. })));
        assert!(matches!(b.ge(&a), Err(Error::IncomparableSheets { .. })));
        assert!(a.try_cmp(&b).is_err());
        assert_ne!(a, b);

        let mut mixed = vec![b, a];
        assert!(sort_cells(&mut mixed).is_err());
    }

    #[test]
    fn test_sort_cells() {
        let mut cells = vec![cell(0.0, "AA1", "S"), cell(0.0, "B3", "S"), cell(0.0, "B1", "S")];
        sort_cells(&mut cells).unwrap();
        let positions: Vec<String> = cells.iter().map(Cell::position).collect();
        assert_eq!(positions, ["B1", "B3", "AA1"]);
    }

    #[test]
    fn test_in_place_arithmetic() {
        let mut a = cell(3.0, "A2", "Sheet1");
        a.add_assign(3).unwrap();
        assert_eq!(a.value, CellValue::Number(6.0));

        a.pow_assign(2).unwrap();
        assert_eq!(a.value, CellValue::Number(36.0));

        a.rem_assign(5).unwrap();
        assert_eq!(a.value, CellValue::Number(1.0));
    }

    #[test]
    fn test_operators() {
        let a = cell(3.0, "A1", "Sheet1");
        let b = cell(3.0, "A2", "Sheet1");

        assert_eq!((&a + &b).unwrap(), CellValue::Number(6.0));
        assert_eq!((&a - &b).unwrap(), CellValue::Number(0.0));
        assert_eq!((&a * &b).unwrap(), CellValue::Number(9.0));
        assert_eq!((&a / &b).unwrap(), CellValue::Number(1.0));
        assert_eq!(a.floor_div(2).unwrap(), CellValue::Number(1.0));
        assert!((&a / 0).is_err());
    }

    #[test]
    fn test_huge_text_repetition_fails() {
        let mut a = Cell::at("ab", "A1", "Sheet1").unwrap();
        assert!(matches!(&a * 1e18, Err(Error::CellArithmetic { operation: "mul", .. })));
        assert!(a.mul_assign(f64::INFINITY).is_err());
        assert_eq!(a.value, CellValue::string("ab"));

        a.mul_assign(2).unwrap();
        assert_eq!(a.value, CellValue::string("abab"));
    }

    #[test]
    fn test_failed_arithmetic_leaves_value() {
        let mut a = Cell::at("text", "A1", "Sheet1").unwrap();
        let err = a.sub_assign(1).unwrap_err();
        assert!(matches!(err, Error::CellArithmetic { operation: "sub", .. }));
        assert_eq!(a.value, CellValue::string("text"));
    }

    #[test]
    fn test_shift_column() {
        let z = cell(5.0, "Z4", "S");
        let shifted = (&z >> 1).unwrap();
        assert_eq!(shifted.position(), "AA4");
        assert_eq!(shifted.value, CellValue::Number(5.0));
        assert_eq!((&shifted << 1).unwrap().position(), "Z4");

        let a = cell(0.0, "A1", "S");
        assert!(matches!(&a << 1, Err(Error::ColumnOutOfRange { .. })));
        assert!(a.shift_row(-1).is_err());
        assert_eq!(a.shift_row(4).unwrap().position(), "A5");
    }

    #[test]
    fn test_display_shows_value_only() {
        let a = cell(7.5, "C3", "Sheet1");
        assert_eq!(a.to_string(), "7.5");
    }

    #[test]
    fn test_new_rejects_bad_positions() {
        assert!(Cell::at(1, "a1", "S").is_err());
        assert!(Cell::at(1, "A0", "S").is_err());
        assert!(Cell::new(1, "A", 0, "S").is_err());
    }

    #[test]
    fn test_formula_is_recorded() {
        let c = Cell::at("=SUM(A3:A4)", "A5", "S").unwrap();
        assert_eq!(c.formula.as_deref(), Some("=SUM(A3:A4)"));
    }

    fn arb_cell() -> impl Strategy<Value = Cell> {
        (1u32..=800, 1u32..=60).prop_map(|(col, row)| {
            Cell::new(0, index_to_column(col).unwrap(), row, "S").unwrap()
        })
    }

    proptest! {
        #[test]
        fn prop_ordering_is_trichotomous(a in arb_cell(), b in arb_cell()) {
            let outcomes = [a.lt(&b).unwrap(), a == b, b.lt(&a).unwrap()];
            prop_assert_eq!(outcomes.iter().filter(|o| **o).count(), 1);
        }

        #[test]
        fn prop_ordering_is_transitive(a in arb_cell(), b in arb_cell(), c in arb_cell()) {
            if a.lt(&b).unwrap() && b.lt(&c).unwrap() {
                prop_assert!(a.lt(&c).unwrap());
            }
        }

        #[test]
        fn prop_ordering_matches_column_index(a in arb_cell(), b in arb_cell()) {
            let key = |c: &Cell| (column_to_index(c.column()).unwrap(), c.row());
            prop_assert_eq!(a.try_cmp(&b).unwrap(), key(&a).cmp(&key(&b)));
        }
    }
}
