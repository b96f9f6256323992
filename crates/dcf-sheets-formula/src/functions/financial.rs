//! Discounting functions used by valuation templates

use super::{number_arg, number_result, numbers};
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use dcf_sheets_core::CellError;

const IRR_MAX_ITERATIONS: usize = 100;
const IRR_TOLERANCE: f64 = 1e-10;

/// Present value of `flows` at `rate`, the first flow discounted by `first_period`
fn present_value(rate: f64, flows: &[f64], first_period: i32) -> f64 {
    flows
        .iter()
        .zip(first_period..)
        .map(|(flow, period)| flow / (1.0 + rate).powi(period))
        .sum()
}

/// NPV(rate, value1, ...): flows are discounted from period 1
pub fn fn_npv(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number_result(number_arg(args.first()).and_then(|rate| {
        if rate == -1.0 {
            return Err(CellError::Div0);
        }
        let flows = numbers(args.get(1..).unwrap_or_default())?;
        Ok(present_value(rate, &flows, 1))
    }))
}

/// IRR(values, [guess]) by Newton iteration from `guess` (default 10%)
///
/// The flows need at least one sign change; otherwise, or when the
/// iteration does not settle, the result is `#NUM!`.
pub fn fn_irr(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let flows = match numbers(args.get(..1).unwrap_or_default()) {
        Ok(flows) => flows,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };
    let guess = match args.get(1) {
        Some(value) => number_arg(Some(value)),
        None => Ok(0.1),
    };
    number_result(guess.and_then(|guess| irr(&flows, guess)))
}

fn irr(flows: &[f64], guess: f64) -> Result<f64, CellError> {
    let has_inflow = flows.iter().any(|f| *f > 0.0);
    let has_outflow = flows.iter().any(|f| *f < 0.0);
    if !(has_inflow && has_outflow) {
        return Err(CellError::Num);
    }

    let mut rate = guess;
    for _ in 0..IRR_MAX_ITERATIONS {
        if rate <= -1.0 {
            return Err(CellError::Num);
        }
        let value = present_value(rate, flows, 0);
        let slope: f64 = flows
            .iter()
            .zip(0..)
            .map(|(flow, period)| -f64::from(period) * flow / (1.0 + rate).powi(period + 1))
            .sum();
        if slope == 0.0 || !slope.is_finite() {
            return Err(CellError::Num);
        }

        let next = rate - value / slope;
        if (next - rate).abs() < IRR_TOLERANCE {
            return Ok(next);
        }
        rate = next;
    }
    Err(CellError::Num)
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

    fn assert_close(value: FormulaValue, expected: f64) {
        match value {
            FormulaValue::Number(n) => assert!(
                (n - expected).abs() < 1e-6,
                "expected {expected}, got {n}"
            ),
            other => panic!("expected a number, got {other:?}"),
        }
    }

    #[test]
    fn test_npv() {
        assert_close(eval("=NPV(0.1,110,121)"), 200.0);
        assert_close(eval("=NPV(0,{1,2,3})"), 6.0);
        assert_eq!(eval("=NPV(-1,5)"), FormulaValue::Error(CellError::Div0));
    }

    #[test]
    fn test_irr() {
        assert_close(eval("=IRR({-100,110})"), 0.1);
        assert_close(eval("=IRR({-1000,300,400,500})"), 0.088_963_394_7);
        assert_close(eval("=IRR({-1000,300,400,500},0.2)"), 0.088_963_394_7);
        assert_eq!(eval("=IRR({100,200})"), FormulaValue::Error(CellError::Num));
    }

    #[test]
    fn test_npv_over_a_cash_flow_row() {
        let mut wb = Workbook::new();
        wb.new_sheet("DCF").unwrap();
        for (col, flow) in ["B", "C", "D"].iter().zip([100, 100, 100]) {
            wb.set(format!("DCF!{col}2").as_str(), flow).unwrap();
        }
        wb.set("DCF!A1", 0.1).unwrap();
        wb.name("A1", "WACC", Some("DCF")).unwrap();

        let ast = parse_formula("=NPV(WACC,DCF!B2:D2)").unwrap();
        let ctx = EvaluationContext::for_active_sheet(&wb);
        assert_close(evaluate(&ast, &ctx).unwrap(), 248.685_199_098_422_2);
    }
}
