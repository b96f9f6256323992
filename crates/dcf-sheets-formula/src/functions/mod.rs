//! Built-in spreadsheet functions

pub mod financial;
pub mod logical;
pub mod math;

use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use ahash::AHashMap;
use dcf_sheets_core::CellError;

/// Function implementation signature
pub type FunctionImpl = fn(&[FormulaValue], &EvaluationContext) -> FormulaResult<FormulaValue>;

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    pub implementation: FunctionImpl,
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_math_functions();
        registry.register_logical_functions();
        registry.register_financial_functions();

        registry
    }

    /// Look up a function by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Register a function, replacing any previous one of the same name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.values().map(|def| def.name).collect();
        names.sort_unstable();
        names
    }

    fn add(&mut self, name: &'static str, min_args: usize, max_args: Option<usize>, implementation: FunctionImpl) {
        self.register(FunctionDef {
            name,
            min_args,
            max_args,
            implementation,
        });
    }

    fn register_math_functions(&mut self) {
        self.add("SUM", 1, None, math::fn_sum);
        self.add("AVERAGE", 1, None, math::fn_average);
        self.add("MIN", 1, None, math::fn_min);
        self.add("MAX", 1, None, math::fn_max);
        self.add("COUNT", 1, None, math::fn_count);
        self.add("COUNTA", 1, None, math::fn_counta);
        self.add("PRODUCT", 1, None, math::fn_product);
        self.add("ABS", 1, Some(1), math::fn_abs);
        self.add("ROUND", 2, Some(2), math::fn_round);
        self.add("POWER", 2, Some(2), math::fn_power);
        self.add("SQRT", 1, Some(1), math::fn_sqrt);
    }

    fn register_logical_functions(&mut self) {
        self.add("IF", 2, Some(3), logical::fn_if);
        self.add("AND", 1, None, logical::fn_and);
        self.add("OR", 1, None, logical::fn_or);
        self.add("NOT", 1, Some(1), logical::fn_not);
        self.add("IFERROR", 2, Some(2), logical::fn_iferror);
    }

    fn register_financial_functions(&mut self) {
        self.add("NPV", 2, None, financial::fn_npv);
        self.add("IRR", 1, Some(2), financial::fn_irr);
    }
}

/// Every argument with arrays opened up, in row-major order
pub(crate) fn flatten<'a>(args: &'a [FormulaValue]) -> impl Iterator<Item = &'a FormulaValue> + 'a {
    args.iter().flat_map(|arg| -> Box<dyn Iterator<Item = &'a FormulaValue> + 'a> {
        match arg {
            FormulaValue::Array(rows) => Box::new(rows.iter().flatten()),
            value => Box::new(std::iter::once(value)),
        }
    })
}

/// Numbers among the arguments, skipping text, booleans and blanks
///
/// The first error value found is returned instead.
pub(crate) fn numbers(args: &[FormulaValue]) -> Result<Vec<f64>, CellError> {
    let mut out = Vec::new();
    for value in flatten(args) {
        match value {
            FormulaValue::Number(n) => out.push(*n),
            FormulaValue::Error(e) => return Err(*e),
            _ => {}
        }
    }
    Ok(out)
}

/// A single argument coerced to a number; a missing argument is `#VALUE!`
pub(crate) fn number_arg(value: Option<&FormulaValue>) -> Result<f64, CellError> {
    match value {
        Some(FormulaValue::Error(e)) => Err(*e),
        Some(other) => other.as_number().ok_or(CellError::Value),
        None => Err(CellError::Value),
    }
}

/// Finish a numeric result, mapping NaN and infinities to `#NUM!`
pub(crate) fn number_result(result: Result<f64, CellError>) -> FormulaResult<FormulaValue> {
    Ok(match result {
        Ok(n) if n.is_finite() => FormulaValue::Number(n),
        Ok(_) => FormulaValue::Error(CellError::Num),
        Err(e) => FormulaValue::Error(e),
    })
}
