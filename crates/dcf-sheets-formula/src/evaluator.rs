//! Formula evaluator
//!
//! Evaluates formula ASTs against a [`Workbook`]. References to cells that
//! hold formulas are evaluated in turn, so a chain like `A5 = SUM(A3:A4)`,
//! `A6 = A5*2` resolves without cached results. Re-entering a cell that is
//! already being evaluated fails with [`FormulaError::CircularReference`].
//!
//! Nesting is bounded by [`MAX_NESTING`]. A reference chain deeper than that
//! is evaluated in segments: the cell at the limit is evaluated first from
//! the top, its value is memoized, and the outer evaluation is retried.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::FunctionRegistry;
use crate::parser::parse_formula;
use ahash::{AHashMap, AHashSet};
use dcf_sheets_core::{CellAddress, CellError, CellRange, CellValue, Workbook};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;
use std::sync::OnceLock;

static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

fn get_function_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
    Array(Vec<Vec<FormulaValue>>),
    Empty,
}

impl FormulaValue {
    /// Convert to number, if possible
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            FormulaValue::String(s) => s.trim().parse().ok(),
            FormulaValue::Empty => Some(0.0),
            _ => None,
        }
    }

    /// Convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FormulaValue::Boolean(b) => Some(*b),
            FormulaValue::Number(n) => Some(*n != 0.0),
            FormulaValue::Empty => Some(false),
            FormulaValue::String(s) if s.eq_ignore_ascii_case("TRUE") => Some(true),
            FormulaValue::String(s) if s.eq_ignore_ascii_case("FALSE") => Some(false),
            _ => None,
        }
    }

    /// Convert to display text
    pub fn as_string(&self) -> String {
        match self {
            FormulaValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            FormulaValue::String(s) => s.clone(),
            FormulaValue::Boolean(true) => "TRUE".to_string(),
            FormulaValue::Boolean(false) => "FALSE".to_string(),
            FormulaValue::Error(e) => e.to_string(),
            FormulaValue::Empty => String::new(),
            FormulaValue::Array(_) => CellError::Value.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    pub fn get_error(&self) -> Option<CellError> {
        match self {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }
}

impl From<CellValue> for FormulaValue {
    /// Formula cells convert to their cached result; use an
    /// [`EvaluationContext`] to compute them instead.
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Empty => FormulaValue::Empty,
            CellValue::Number(n) => FormulaValue::Number(n),
            CellValue::String(s) => FormulaValue::String(s.as_str().to_string()),
            CellValue::Boolean(b) => FormulaValue::Boolean(b),
            CellValue::Error(e) => FormulaValue::Error(e),
            CellValue::Formula { cached_value, .. } => cached_value
                .map(|v| (*v).into())
                .unwrap_or(FormulaValue::Empty),
        }
    }
}

impl From<FormulaValue> for CellValue {
    fn from(value: FormulaValue) -> Self {
        match value {
            FormulaValue::Empty => CellValue::Empty,
            FormulaValue::Number(n) => CellValue::Number(n),
            FormulaValue::String(s) => CellValue::string(s),
            FormulaValue::Boolean(b) => CellValue::Boolean(b),
            FormulaValue::Error(e) => CellValue::Error(e),
            FormulaValue::Array(rows) => rows
                .into_iter()
                .flatten()
                .next()
                .map_or(CellValue::Error(CellError::Value), CellValue::from),
        }
    }
}

/// Formula cells (or defined names) evaluated in one nested call stack
pub const MAX_NESTING: usize = 100;

/// A node of the dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Node {
    Cell(String, u32, u16),
    /// Defined name as seen from a sheet
    Name(String, String),
}

impl Node {
    fn describe(&self) -> String {
        match self {
            Node::Cell(sheet, row, col) => format!("{}!{}", sheet, CellAddress::new(*row, *col).position()),
            Node::Name(_, name) => name.clone(),
        }
    }
}

/// Bookkeeping shared by every context derived from one top-level call
#[derive(Default)]
struct Tracker {
    in_progress: AHashSet<Node>,
    memo: AHashMap<Node, FormulaValue>,
    /// Formula cell that hit the nesting limit, with its text
    deferred: Option<(Node, String)>,
}

/// Context for formula evaluation
#[derive(Clone)]
pub struct EvaluationContext<'a> {
    /// Workbook for cell lookups; without one every reference reads as empty
    pub workbook: Option<&'a Workbook>,
    /// Sheet that unqualified references point at
    pub current_sheet: String,
    tracker: Rc<RefCell<Tracker>>,
}

impl<'a> EvaluationContext<'a> {
    /// Context over `workbook` with unqualified references on `sheet`
    pub fn new(workbook: &'a Workbook, sheet: impl Into<String>) -> Self {
        Self {
            workbook: Some(workbook),
            current_sheet: sheet.into(),
            tracker: Rc::default(),
        }
    }

    /// Context over the workbook's active sheet
    pub fn for_active_sheet(workbook: &'a Workbook) -> Self {
        Self::new(workbook, workbook.active_sheet_name())
    }

    /// Context without a workbook, for constant expressions
    pub fn simple() -> Self {
        Self {
            workbook: None,
            current_sheet: String::new(),
            tracker: Rc::default(),
        }
    }

    /// Same workbook and cycle tracking, different current sheet
    fn on_sheet(&self, sheet: &str) -> Self {
        Self {
            workbook: self.workbook,
            current_sheet: sheet.to_string(),
            tracker: Rc::clone(&self.tracker),
        }
    }

    /// Name of the sheet `sheet` refers to, or `None` when it does not exist
    fn sheet_name(&self, sheet: Option<&str>) -> Option<String> {
        let workbook = self.workbook?;
        let name = sheet.unwrap_or(&self.current_sheet);
        workbook
            .worksheets()
            .find(|ws| ws.name().eq_ignore_ascii_case(name))
            .map(|ws| ws.name().to_string())
    }

    /// Value of one cell, evaluating it when it holds a formula
    pub fn get_cell_value(&self, sheet: Option<&str>, row: u32, col: u16) -> FormulaResult<FormulaValue> {
        let Some(workbook) = self.workbook else {
            return Ok(FormulaValue::Empty);
        };
        let Some(sheet) = self.sheet_name(sheet) else {
            return Ok(FormulaValue::Error(CellError::Ref));
        };

        match workbook.worksheet(&sheet)?.get_value_at(row, col) {
            CellValue::Formula { text, .. } => self.evaluate_formula_cell(&sheet, row, col, &text),
            value => Ok(value.into()),
        }
    }

    /// Values of a block as a row-major array
    pub fn get_range_values(&self, sheet: Option<&str>, range: &CellRange) -> FormulaResult<FormulaValue> {
        if self.workbook.is_none() {
            return Ok(FormulaValue::Array(vec![]));
        }
        let Some(sheet) = self.sheet_name(sheet) else {
            return Ok(FormulaValue::Error(CellError::Ref));
        };

        let mut rows = Vec::new();
        for row in range.start.row..=range.end.row {
            let mut cols = Vec::new();
            for col in range.start.col..=range.end.col {
                cols.push(self.get_cell_value(Some(&sheet), row, col)?);
            }
            rows.push(cols);
        }
        Ok(FormulaValue::Array(rows))
    }

    fn evaluate_formula_cell(&self, sheet: &str, row: u32, col: u16, text: &str) -> FormulaResult<FormulaValue> {
        let node = Node::Cell(sheet.to_string(), row, col);
        self.segmented(|| self.evaluate_nested(&node, text))
    }

    /// Run `root`; from an empty call stack, evaluate the cells that hit the
    /// nesting limit first and retry until the whole chain is memoized
    fn segmented(&self, root: impl Fn() -> FormulaResult<FormulaValue>) -> FormulaResult<FormulaValue> {
        if !self.tracker.borrow().in_progress.is_empty() {
            return root();
        }

        let mut pending: Vec<(Node, String)> = Vec::new();
        loop {
            let outcome = match pending.last() {
                Some((node, text)) => self.evaluate_nested(node, text),
                None => root(),
            };
            match outcome {
                Err(FormulaError::NestingTooDeep(at)) => {
                    let deferred = self.tracker.borrow_mut().deferred.take();
                    match deferred {
                        Some((next, _)) if pending.iter().any(|(n, _)| *n == next) => {
                            return Err(FormulaError::CircularReference(next.describe()));
                        }
                        Some(next) => {
                            log::debug!("deferring outer formula until {} is evaluated", next.0.describe());
                            pending.push(next);
                        }
                        None => return Err(FormulaError::NestingTooDeep(at)),
                    }
                }
                Ok(value) if pending.is_empty() => return Ok(value),
                Ok(_) => {
                    pending.pop();
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn evaluate_nested(&self, node: &Node, text: &str) -> FormulaResult<FormulaValue> {
        let Node::Cell(sheet, _, _) = node else {
            return Err(FormulaError::Evaluation(format!("{} is not a cell", node.describe())));
        };
        self.guarded(node, text, || {
            parse_formula(text).and_then(|ast| evaluate(&ast, &self.on_sheet(sheet)))
        })
    }

    /// Run `eval` for `node` with cycle detection, memoization and the nesting limit
    fn guarded(
        &self,
        node: &Node,
        text: &str,
        eval: impl FnOnce() -> FormulaResult<FormulaValue>,
    ) -> FormulaResult<FormulaValue> {
        {
            let mut tracker = self.tracker.borrow_mut();
            if let Some(value) = tracker.memo.get(node) {
                return Ok(value.clone());
            }
            if tracker.in_progress.contains(node) {
                return Err(FormulaError::CircularReference(node.describe()));
            }
            if tracker.in_progress.len() >= MAX_NESTING {
                if matches!(node, Node::Cell(..)) {
                    tracker.deferred = Some((node.clone(), text.to_string()));
                }
                return Err(FormulaError::NestingTooDeep(node.describe()));
            }
            tracker.in_progress.insert(node.clone());
        }

        let result = eval();

        let mut tracker = self.tracker.borrow_mut();
        tracker.in_progress.remove(node);
        if let Ok(value) = &result {
            tracker.memo.insert(node.clone(), value.clone());
        }
        result
    }

    /// Evaluate whatever `address` on `sheet` holds
    ///
    /// Formula cells and text starting with `=` are evaluated; anything else
    /// is returned as stored.
    pub fn evaluate_cell(&self, sheet: Option<&str>, address: CellAddress) -> FormulaResult<FormulaValue> {
        let workbook = self.workbook.ok_or_else(|| {
            FormulaError::InvalidReference("No workbook to read cells from".to_string())
        })?;
        let sheet = self.sheet_name(sheet).ok_or_else(|| {
            FormulaError::InvalidReference(format!(
                "Unknown sheet: {}",
                sheet.unwrap_or(&self.current_sheet)
            ))
        })?;

        log::debug!("evaluating {}!{}", sheet, address.position());
        match workbook.worksheet(&sheet)?.get_value_at(address.row, address.col) {
            CellValue::Formula { text, .. } => {
                self.evaluate_formula_cell(&sheet, address.row, address.col, &text)
            }
            CellValue::String(s) if s.len() > 1 && s.as_str().starts_with('=') => {
                self.evaluate_formula_cell(&sheet, address.row, address.col, s.as_str())
            }
            value => Ok(value.into()),
        }
    }

    /// Resolve a defined name to its value
    ///
    /// Handles constants (`0.0725`, `TRUE`), cell and range references
    /// (including multi-destination names, whose blocks are stacked) and
    /// formulas, which are evaluated.
    pub fn resolve_named_range(&self, name: &str) -> FormulaResult<FormulaValue> {
        let workbook = self.workbook.ok_or_else(|| {
            FormulaError::InvalidReference("No workbook context for named range lookup".to_string())
        })?;
        let named = workbook
            .named_ranges()
            .get(name, &self.current_sheet)
            .ok_or_else(|| FormulaError::InvalidReference(format!("Unknown name: {}", name)))?;

        let expression = named.expression().trim();
        if let Ok(n) = expression.parse::<f64>() {
            return Ok(FormulaValue::Number(n));
        }
        if expression.eq_ignore_ascii_case("TRUE") {
            return Ok(FormulaValue::Boolean(true));
        }
        if expression.eq_ignore_ascii_case("FALSE") {
            return Ok(FormulaValue::Boolean(false));
        }

        let Ok(destinations) = named.destinations() else {
            let node = Node::Name(self.current_sheet.clone(), name.to_ascii_uppercase());
            return self.segmented(|| {
                self.guarded(&node, expression, || {
                    parse_formula(&format!("={}", expression)).and_then(|ast| evaluate(&ast, self))
                })
            });
        };

        if let [only] = destinations.as_slice() {
            if only.range.is_single() {
                let start = only.range.start;
                return self.get_cell_value(only.sheet.as_deref(), start.row, start.col);
            }
        }

        let mut stacked = Vec::new();
        for dest in &destinations {
            match self.get_range_values(dest.sheet.as_deref(), &dest.range)? {
                FormulaValue::Array(rows) => stacked.extend(rows),
                other => return Ok(other),
            }
        }
        Ok(FormulaValue::Array(stacked))
    }
}

/// Evaluate a formula expression
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match expr {
        FormulaExpr::Number(n) => Ok(FormulaValue::Number(*n)),
        FormulaExpr::String(s) => Ok(FormulaValue::String(s.clone())),
        FormulaExpr::Boolean(b) => Ok(FormulaValue::Boolean(*b)),
        FormulaExpr::Error(e) => Ok(FormulaValue::Error(*e)),

        FormulaExpr::CellRef(r) => {
            ctx.get_cell_value(r.sheet.as_deref(), r.address.row, r.address.col)
        }
        FormulaExpr::RangeRef(r) => ctx.get_range_values(r.sheet.as_deref(), &r.range),
        FormulaExpr::NameRef(name) => ctx.resolve_named_range(name),

        FormulaExpr::BinaryOp { op, left, right } => evaluate_binary_op(*op, left, right, ctx),
        FormulaExpr::UnaryOp { op, operand } => evaluate_unary_op(*op, operand, ctx),
        FormulaExpr::Function { name, args } => evaluate_function(name, args, ctx),

        FormulaExpr::Array(rows) => {
            let rows = rows
                .iter()
                .map(|row| row.iter().map(|e| evaluate(e, ctx)).collect())
                .collect::<FormulaResult<_>>()?;
            Ok(FormulaValue::Array(rows))
        }
    }
}

/// Evaluate the formula stored at `address` on `sheet` (the active sheet when `None`)
pub fn evaluate_cell(workbook: &Workbook, sheet: Option<&str>, address: CellAddress) -> FormulaResult<FormulaValue> {
    EvaluationContext::for_active_sheet(workbook).evaluate_cell(sheet, address)
}

/// Collapse a single-cell array to its element
fn scalar(value: FormulaValue) -> FormulaValue {
    match value {
        FormulaValue::Array(rows) if rows.len() == 1 && rows[0].len() == 1 => {
            rows.into_iter().flatten().next().unwrap_or(FormulaValue::Empty)
        }
        FormulaValue::Array(_) => FormulaValue::Error(CellError::Value),
        v => v,
    }
}

fn evaluate_binary_op(
    op: BinaryOperator,
    left: &FormulaExpr,
    right: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    if op == BinaryOperator::Range {
        return Err(FormulaError::Evaluation(
            "Range operator needs cell references on both sides".into(),
        ));
    }

    let left_val = scalar(evaluate(left, ctx)?);
    let right_val = scalar(evaluate(right, ctx)?);

    if let Some(e) = left_val.get_error().or_else(|| right_val.get_error()) {
        return Ok(FormulaValue::Error(e));
    }

    let numbers = left_val.as_number().zip(right_val.as_number());
    let arithmetic = |f: fn(f64, f64) -> f64| match numbers {
        Some((l, r)) => finite(f(l, r)),
        None => FormulaValue::Error(CellError::Value),
    };
    let ordering = compare_values(&left_val, &right_val);

    Ok(match op {
        BinaryOperator::Add => arithmetic(|l, r| l + r),
        BinaryOperator::Subtract => arithmetic(|l, r| l - r),
        BinaryOperator::Multiply => arithmetic(|l, r| l * r),
        BinaryOperator::Divide => match numbers {
            Some((_, r)) if r == 0.0 => FormulaValue::Error(CellError::Div0),
            _ => arithmetic(|l, r| l / r),
        },
        BinaryOperator::Power => arithmetic(f64::powf),

        BinaryOperator::Equal => FormulaValue::Boolean(ordering.is_eq()),
        BinaryOperator::NotEqual => FormulaValue::Boolean(ordering.is_ne()),
        BinaryOperator::LessThan => FormulaValue::Boolean(ordering.is_lt()),
        BinaryOperator::LessEqual => FormulaValue::Boolean(ordering.is_le()),
        BinaryOperator::GreaterThan => FormulaValue::Boolean(ordering.is_gt()),
        BinaryOperator::GreaterEqual => FormulaValue::Boolean(ordering.is_ge()),

        BinaryOperator::Concat => {
            FormulaValue::String(left_val.as_string() + &right_val.as_string())
        }
        BinaryOperator::Range => FormulaValue::Error(CellError::Ref),
    })
}

fn finite(n: f64) -> FormulaValue {
    if n.is_finite() {
        FormulaValue::Number(n)
    } else {
        FormulaValue::Error(CellError::Num)
    }
}

/// Excel-style ordering: numbers < text < booleans, text case-insensitive
fn compare_values(left: &FormulaValue, right: &FormulaValue) -> Ordering {
    fn rank(v: &FormulaValue) -> u8 {
        match v {
            FormulaValue::Number(_) | FormulaValue::Empty => 0,
            FormulaValue::String(_) => 1,
            FormulaValue::Boolean(_) => 2,
            FormulaValue::Error(_) => 3,
            FormulaValue::Array(_) => 4,
        }
    }

    match (left, right) {
        (FormulaValue::String(l), FormulaValue::String(r)) => {
            l.to_lowercase().cmp(&r.to_lowercase())
        }
        (FormulaValue::Boolean(l), FormulaValue::Boolean(r)) => l.cmp(r),
        (FormulaValue::Error(l), FormulaValue::Error(r)) => l.as_str().cmp(r.as_str()),
        (l, r) if rank(l) == 0 && rank(r) == 0 => {
            let l = l.as_number().unwrap_or(0.0);
            let r = r.as_number().unwrap_or(0.0);
            l.partial_cmp(&r).unwrap_or(Ordering::Equal)
        }
        // blank compared to text or a boolean acts as "" / FALSE
        (FormulaValue::Empty, FormulaValue::String(r)) => "".cmp(r.as_str()),
        (FormulaValue::String(l), FormulaValue::Empty) => l.as_str().cmp(""),
        (FormulaValue::Empty, FormulaValue::Boolean(r)) => false.cmp(r),
        (FormulaValue::Boolean(l), FormulaValue::Empty) => l.cmp(&false),
        (l, r) => rank(l).cmp(&rank(r)),
    }
}

fn evaluate_unary_op(
    op: UnaryOperator,
    operand: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let val = scalar(evaluate(operand, ctx)?);

    if let Some(e) = val.get_error() {
        return Ok(FormulaValue::Error(e));
    }
    let Some(n) = val.as_number() else {
        return Ok(FormulaValue::Error(CellError::Value));
    };

    Ok(match op {
        UnaryOperator::Negate => FormulaValue::Number(-n),
        UnaryOperator::Percent => FormulaValue::Number(n / 100.0),
    })
}

fn evaluate_function(
    name: &str,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let func = get_function_registry()
        .get(name)
        .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;

    if args.len() < func.min_args {
        return Err(FormulaError::ArgumentCount {
            function: name.to_string(),
            expected: format!("at least {}", func.min_args),
            actual: args.len(),
        });
    }
    if let Some(max) = func.max_args {
        if args.len() > max {
            return Err(FormulaError::ArgumentCount {
                function: name.to_string(),
                expected: format!("at most {}", max),
                actual: args.len(),
            });
        }
    }

    let evaluated_args = args
        .iter()
        .map(|arg| evaluate(arg, ctx))
        .collect::<FormulaResult<Vec<_>>>()?;

    (func.implementation)(&evaluated_args, ctx)
}
