//! Logical functions

use super::flatten;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};
use dcf_sheets_core::CellError;

/// IF(condition, value_if_true, [value_if_false])
pub fn fn_if(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (Some(condition), Some(if_true)) = (args.first(), args.get(1)) else {
        return Err(FormulaError::Argument("IF requires at least 2 arguments".into()));
    };

    let condition = match condition {
        FormulaValue::Error(e) => return Ok(FormulaValue::Error(*e)),
        other => match other.as_bool() {
            Some(b) => b,
            None => return Ok(FormulaValue::Error(CellError::Value)),
        },
    };

    if condition {
        Ok(if_true.clone())
    } else {
        Ok(args.get(2).cloned().unwrap_or(FormulaValue::Boolean(false)))
    }
}

/// Truth values of the arguments; text and blanks inside arrays are skipped
fn truth_values(args: &[FormulaValue]) -> Result<Vec<bool>, CellError> {
    let mut out = Vec::new();
    for value in flatten(args) {
        match value {
            FormulaValue::Error(e) => return Err(*e),
            FormulaValue::Boolean(b) => out.push(*b),
            FormulaValue::Number(n) => out.push(*n != 0.0),
            _ => {}
        }
    }
    if out.is_empty() {
        Err(CellError::Value)
    } else {
        Ok(out)
    }
}

pub fn fn_and(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(match truth_values(args) {
        Ok(values) => FormulaValue::Boolean(values.into_iter().all(|b| b)),
        Err(e) => FormulaValue::Error(e),
    })
}

pub fn fn_or(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(match truth_values(args) {
        Ok(values) => FormulaValue::Boolean(values.into_iter().any(|b| b)),
        Err(e) => FormulaValue::Error(e),
    })
}

pub fn fn_not(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let arg = args
        .first()
        .ok_or_else(|| FormulaError::Argument("NOT requires 1 argument".into()))?;

    Ok(match arg {
        FormulaValue::Error(e) => FormulaValue::Error(*e),
        other => other
            .as_bool()
            .map_or(FormulaValue::Error(CellError::Value), |b| FormulaValue::Boolean(!b)),
    })
}

/// IFERROR(value, value_if_error)
pub fn fn_iferror(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (Some(value), Some(fallback)) = (args.first(), args.get(1)) else {
        return Err(FormulaError::Argument("IFERROR requires 2 arguments".into()));
    };

    match value {
        FormulaValue::Error(_) => Ok(fallback.clone()),
        _ => Ok(value.clone()),
    }
}
