//! Math and aggregate functions

use super::{flatten, number_arg, number_result, numbers};
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use dcf_sheets_core::CellError;

pub fn fn_sum(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number_result(numbers(args).map(|ns| ns.iter().sum()))
}

/// AVERAGE of the numeric arguments; `#DIV/0!` when there are none
pub fn fn_average(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number_result(numbers(args).and_then(|ns| {
        if ns.is_empty() {
            Err(CellError::Div0)
        } else {
            Ok(ns.iter().sum::<f64>() / ns.len() as f64)
        }
    }))
}

/// MIN; zero when no argument is numeric
pub fn fn_min(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number_result(numbers(args).map(|ns| ns.into_iter().reduce(f64::min).unwrap_or(0.0)))
}

/// MAX; zero when no argument is numeric
pub fn fn_max(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number_result(numbers(args).map(|ns| ns.into_iter().reduce(f64::max).unwrap_or(0.0)))
}

/// COUNT of numeric values
pub fn fn_count(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = flatten(args)
        .filter(|v| matches!(v, FormulaValue::Number(_)))
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// COUNTA: every non-blank value, errors included
pub fn fn_counta(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = flatten(args)
        .filter(|v| !matches!(v, FormulaValue::Empty))
        .count();
    Ok(FormulaValue::Number(count as f64))
}

pub fn fn_product(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number_result(numbers(args).map(|ns| {
        if ns.is_empty() {
            0.0
        } else {
            ns.iter().product()
        }
    }))
}

pub fn fn_abs(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number_result(number_arg(args.get(0)).map(f64::abs))
}

/// ROUND(number, digits), halves away from zero; negative digits round
/// left of the decimal point
pub fn fn_round(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number_result(number_arg(args.get(0)).and_then(|n| {
        let digits = number_arg(args.get(1))?.trunc() as i32;
        let factor = 10f64.powi(digits);
        Ok((n * factor).round() / factor)
    }))
}

pub fn fn_power(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number_result(number_arg(args.get(0)).and_then(|base| {
        let exponent = number_arg(args.get(1))?;
        if base == 0.0 && exponent < 0.0 {
            return Err(CellError::Div0);
        }
        Ok(base.powf(exponent))
    }))
}

/// SQRT; `#NUM!` for negative input
pub fn fn_sqrt(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number_result(number_arg(args.get(0)).and_then(|n| {
        if n < 0.0 {
            Err(CellError::Num)
        } else {
            Ok(n.sqrt())
        }
    }))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::{evaluate, EvaluationContext, FormulaValue};
    use crate::parser::parse_formula;
    use dcf_sheets_core::{CellError, Workbook};

    fn eval(formula: &str) -> FormulaValue {
        let ast = parse_formula(formula).unwrap();
        evaluate(&ast, &EvaluationContext::simple()).unwrap()
    }

    fn num(n: f64) -> FormulaValue {
        FormulaValue::Number(n)
    }

    #[test]
    fn test_aggregates() {
        assert_eq!(eval("=SUM(1,2,3)"), num(6.0));
        assert_eq!(eval("=SUM({1,2;3,4})"), num(10.0));
        assert_eq!(eval("=AVERAGE(2,4,9)"), num(5.0));
        assert_eq!(eval("=MIN(4,-2,7)"), num(-2.0));
        assert_eq!(eval("=MAX(4,-2,7)"), num(7.0));
        assert_eq!(eval("=PRODUCT(2,3,4)"), num(24.0));
        assert_eq!(eval("=COUNT(1,\"a\",TRUE,2)"), num(2.0));
        assert_eq!(eval("=COUNTA(1,\"a\",TRUE,2)"), num(4.0));
    }

    #[test]
    fn test_aggregates_over_ranges_skip_text_and_blanks() {
        let mut wb = Workbook::new();
        wb.set("A1", 10).unwrap();
        wb.set("A2", "n/a").unwrap();
        wb.set("A4", 30).unwrap();

        let ast = parse_formula("=AVERAGE(A1:A4)").unwrap();
        let ctx = EvaluationContext::for_active_sheet(&wb);
        assert_eq!(evaluate(&ast, &ctx).unwrap(), num(20.0));

        let ast = parse_formula("=COUNTA(A1:A4)").unwrap();
        assert_eq!(evaluate(&ast, &ctx).unwrap(), num(3.0));
    }

    #[test]
    fn test_error_propagation_and_empty_inputs() {
        assert_eq!(eval("=SUM(1,#REF!)"), FormulaValue::Error(CellError::Ref));
        assert_eq!(eval("=AVERAGE(\"a\")"), FormulaValue::Error(CellError::Div0));
        assert_eq!(eval("=MAX(\"a\")"), num(0.0));
    }

    #[test]
    fn test_scalar_functions() {
        assert_eq!(eval("=ABS(-3.5)"), num(3.5));
        assert_eq!(eval("=ROUND(2.5,0)"), num(3.0));
        assert_eq!(eval("=ROUND(-2.5,0)"), num(-3.0));
        assert_eq!(eval("=ROUND(1234,-2)"), num(1200.0));
        assert_eq!(eval("=POWER(2,8)"), num(256.0));
        assert_eq!(eval("=POWER(0,-1)"), FormulaValue::Error(CellError::Div0));
        assert_eq!(eval("=SQRT(81)"), num(9.0));
        assert_eq!(eval("=SQRT(-1)"), FormulaValue::Error(CellError::Num));
        assert_eq!(eval("=ABS(\"x\")"), FormulaValue::Error(CellError::Value));
    }
}
