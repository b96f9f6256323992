//! Arithmetic on cell values
//!
//! Every supported binary operation is one [`ArithOp`] variant, implemented
//! once in [`ArithOp::apply`]. Numbers and booleans are numeric operands;
//! text supports concatenation and repetition; everything else fails with
//! [`Error::CellArithmetic`].

use super::CellValue;
use crate::error::{Error, Result};

/// Longest text a repetition may produce, in bytes (the Excel cell limit)
pub const MAX_TEXT_LEN: usize = 32_767;

/// A binary operation on cell values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl ArithOp {
    /// Operation name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
            ArithOp::FloorDiv => "floordiv",
            ArithOp::Mod => "mod",
            ArithOp::Pow => "pow",
        }
    }

    /// Apply the operation to two values
    pub fn apply(self, lhs: &CellValue, rhs: &CellValue) -> Result<CellValue> {
        let fail = || Error::CellArithmetic {
            operation: self.name(),
            self_type: lhs.type_name(),
            other_type: rhs.type_name(),
        };

        match (numeric(lhs), numeric(rhs)) {
            (Some(a), Some(b)) => self.apply_numbers(a, b).map(CellValue::Number).ok_or_else(fail),
            _ => self.apply_text(lhs, rhs).ok_or_else(fail),
        }
    }

    fn apply_numbers(self, a: f64, b: f64) -> Option<f64> {
        let result = match self {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div if b == 0.0 => return None,
            ArithOp::Div => a / b,
            ArithOp::FloorDiv if b == 0.0 => return None,
            ArithOp::FloorDiv => (a / b).floor(),
            ArithOp::Mod if b == 0.0 => return None,
            ArithOp::Mod => {
                // Result takes the sign of the divisor
                let r = a % b;
                if r != 0.0 && (r < 0.0) != (b < 0.0) {
                    r + b
                } else {
                    r
                }
            }
            ArithOp::Pow => a.powf(b),
        };
        result.is_finite().then_some(result)
    }

    fn apply_text(self, lhs: &CellValue, rhs: &CellValue) -> Option<CellValue> {
        match (self, lhs, rhs) {
            (ArithOp::Add, CellValue::String(a), CellValue::String(b)) => {
                Some(CellValue::string(format!("{}{}", a, b)))
            }
            (ArithOp::Mul, CellValue::String(s), CellValue::Number(n))
            | (ArithOp::Mul, CellValue::Number(n), CellValue::String(s)) => {
                if !n.is_finite() || *n < 0.0 || n.fract() != 0.0 || *n > MAX_TEXT_LEN as f64 {
                    return None;
                }
                let times = *n as usize;
                let len = s.as_str().len().checked_mul(times)?;
                if len > MAX_TEXT_LEN {
                    return None;
                }
                Some(CellValue::string(s.as_str().repeat(times)))
            }
            _ => None,
        }
    }
}

fn numeric(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) => Some(*n),
        CellValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}
