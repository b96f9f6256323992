//! Formula parser
//!
//! A recursive descent parser with Excel operator precedence. References may
//! be qualified by a plain (`Inputs!B2`) or quoted (`'Free Cash Flow'!B2:F2`)
//! sheet name.

use crate::ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use dcf_sheets_core::{CellAddress, CellError, CellRange};

/// Parse a formula string into an AST
///
/// # Example
/// ```rust
/// use dcf_sheets_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("=SUM(A1:A10)").unwrap();
/// let ast = parse_formula("='Free Cash Flow'!B2*(1+Growth)").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let formula = formula
        .trim()
        .strip_prefix('=')
        .ok_or_else(|| FormulaError::Parse("Formula must start with '='".into()))?;

    let mut parser = FormulaParser::new(formula);
    let expr = parser.parse_expression()?;

    match parser.current_token() {
        Token::Eof => Ok(expr),
        token => Err(FormulaError::Parse(format!(
            "Unexpected {:?} after expression",
            token
        ))),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),

    // Identifiers and references
    Identifier(String), // Function name or defined name
    CellRef(String),    // A1, $A$1
    SheetRef(String),   // Sheet1! or 'My Sheet'! (unquoted)

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Colon,
    Comma,
    Semicolon,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,

    Invalid(String),
    Eof,
}

struct FormulaParser<'a> {
    input: &'a str,
    pos: usize,
    current_token: Token,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str) -> Self {
        let mut parser = Self {
            input,
            pos: 0,
            current_token: Token::Eof,
        };
        parser.current_token = parser.scan_token();
        parser
    }

    // === Token scanning ===

    fn scan_token(&mut self) -> Token {
        self.skip_whitespace();

        let Some(c) = self.peek_char() else {
            return Token::Eof;
        };

        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '%' => Some(Token::Percent),
            '&' => Some(Token::Ampersand),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            '{' => Some(Token::LeftBrace),
            '}' => Some(Token::RightBrace),
            '=' => Some(Token::Equal),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return token;
        }

        match c {
            '<' => {
                self.advance();
                match self.peek_char() {
                    Some('=') => {
                        self.advance();
                        Token::LessEqual
                    }
                    Some('>') => {
                        self.advance();
                        Token::NotEqual
                    }
                    _ => Token::LessThan,
                }
            }
            '>' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    Token::GreaterEqual
                } else {
                    Token::GreaterThan
                }
            }
            '"' => self.scan_string(),
            '\'' => self.scan_quoted_sheet(),
            c if c.is_ascii_digit()
                || (c == '.' && self.peek_char_at(1).is_some_and(|c| c.is_ascii_digit())) =>
            {
                self.scan_number()
            }
            c if c.is_alphabetic() || c == '_' || c == '$' || c == '#' => {
                self.scan_identifier_or_ref()
            }
            other => {
                self.advance();
                Token::Invalid(other.to_string())
            }
        }
    }

    fn scan_string(&mut self) -> Token {
        self.advance();

        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            if c == '"' {
                // "" inside a string is an escaped quote
                if self.peek_char_at(1) == Some('"') {
                    s.push('"');
                    self.advance();
                    self.advance();
                } else {
                    break;
                }
            } else {
                s.push(c);
                self.advance();
            }
        }

        if self.peek_char() == Some('"') {
            self.advance();
            Token::String(s)
        } else {
            Token::Invalid(format!("\"{}", s))
        }
    }

    /// `'Sheet Name'!`, with `''` standing for a single quote
    fn scan_quoted_sheet(&mut self) -> Token {
        self.advance();

        let mut name = String::new();
        loop {
            match self.peek_char() {
                Some('\'') if self.peek_char_at(1) == Some('\'') => {
                    name.push('\'');
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    name.push(c);
                    self.advance();
                }
                None => return Token::Invalid(format!("'{}", name)),
            }
        }

        if self.peek_char() == Some('!') {
            self.advance();
            Token::SheetRef(name)
        } else {
            Token::Invalid(format!("'{}'", name))
        }
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;

        self.skip_digits();
        if self.peek_char() == Some('.') {
            self.advance();
            self.skip_digits();
        }
        if self.peek_char().is_some_and(|c| c == 'e' || c == 'E') {
            self.advance();
            if self.peek_char().is_some_and(|c| c == '+' || c == '-') {
                self.advance();
            }
            self.skip_digits();
        }

        let text = &self.input[start..self.pos];
        match text.parse() {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Invalid(text.to_string()),
        }
    }

    fn scan_identifier_or_ref(&mut self) -> Token {
        let start = self.pos;

        if self.peek_char() == Some('#') {
            self.advance();
            while self
                .peek_char()
                .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '!' | '/' | '?'))
            {
                self.advance();
            }
            let text = &self.input[start..self.pos];
            return match CellError::parse(text) {
                Some(err) => Token::Error(err),
                None => Token::Invalid(text.to_string()),
            };
        }

        while self
            .peek_char()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '.'))
        {
            self.advance();
        }
        let text = &self.input[start..self.pos];

        if self.peek_char() == Some('!') {
            self.advance();
            return Token::SheetRef(text.to_string());
        }

        // TRUE( and FALSE( are function calls
        let is_call = self.peek_char() == Some('(');
        if !is_call {
            if text.eq_ignore_ascii_case("TRUE") {
                return Token::Boolean(true);
            }
            if text.eq_ignore_ascii_case("FALSE") {
                return Token::Boolean(false);
            }
            if Self::is_cell_reference(text) && CellAddress::parse(text).is_ok() {
                return Token::CellRef(text.to_string());
            }
        }

        Token::Identifier(text.to_string())
    }

    /// `[$]letters[$]digits`, with at most three column letters
    fn is_cell_reference(text: &str) -> bool {
        let rest = text.strip_prefix('$').unwrap_or(text);
        let letters = rest.chars().take_while(char::is_ascii_alphabetic).count();
        if letters == 0 || letters > 3 {
            return false;
        }
        let rest = &rest[letters..];
        let digits = rest.strip_prefix('$').unwrap_or(rest);
        !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn current_token(&self) -> &Token {
        &self.current_token
    }

    fn consume(&mut self) -> Token {
        let next = self.scan_token();
        std::mem::replace(&mut self.current_token, next)
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume();
            Ok(())
        } else {
            Err(FormulaError::Parse(format!(
                "Expected {:?}, got {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    // === Expression parsing with precedence ===
    // Lowest to highest:
    // 1. Comparison: =, <>, <, <=, >, >=
    // 2. Concatenation: &
    // 3. Addition/Subtraction: +, -
    // 4. Multiplication/Division: *, /
    // 5. Exponentiation: ^ (right associative)
    // 6. Unary: -, +, postfix %
    // 7. Range: :
    // 8. Primary: literals, references, function calls, parentheses

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_comparison()
    }

    fn binary(op: BinaryOperator, left: FormulaExpr, right: FormulaExpr) -> FormulaExpr {
        FormulaExpr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_concatenation()?;

        loop {
            let op = match self.current_token() {
                Token::Equal => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };
            self.consume();
            let right = self.parse_concatenation()?;
            left = Self::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_concatenation(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_additive()?;

        while matches!(self.current_token(), Token::Ampersand) {
            self.consume();
            let right = self.parse_additive()?;
            left = Self::binary(BinaryOperator::Concat, left, right);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.consume();
            let right = self.parse_multiplicative()?;
            left = Self::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_exponent()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };
            self.consume();
            let right = self.parse_exponent()?;
            left = Self::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_exponent(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_unary()?;

        if matches!(self.current_token(), Token::Caret) {
            self.consume();
            let right = self.parse_exponent()?;
            return Ok(Self::binary(BinaryOperator::Power, left, right));
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.current_token() {
            Token::Minus => {
                self.consume();
                let operand = self.parse_unary()?;
                return Ok(FormulaExpr::UnaryOp {
                    op: UnaryOperator::Negate,
                    operand: Box::new(operand),
                });
            }
            Token::Plus => {
                self.consume();
                return self.parse_unary();
            }
            _ => {}
        }

        let mut expr = self.parse_range()?;

        while matches!(self.current_token(), Token::Percent) {
            self.consume();
            expr = FormulaExpr::UnaryOp {
                op: UnaryOperator::Percent,
                operand: Box::new(expr),
            };
        }

        Ok(expr)
    }

    fn parse_range(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_primary()?;

        if !matches!(self.current_token(), Token::Colon) {
            return Ok(left);
        }
        self.consume();
        let right = self.parse_primary()?;

        if let (FormulaExpr::CellRef(start), FormulaExpr::CellRef(end)) = (&left, &right) {
            // Sheet1!A1:B2 qualifies both corners
            let sheet = match (&start.sheet, &end.sheet) {
                (Some(a), Some(b)) if !a.eq_ignore_ascii_case(b) => {
                    return Err(FormulaError::Parse(
                        "Range references must be on the same sheet".into(),
                    ))
                }
                (sheet, other) => sheet.clone().or_else(|| other.clone()),
            };
            return Ok(FormulaExpr::RangeRef(RangeReference {
                sheet,
                range: CellRange::new(start.address, end.address),
            }));
        }

        Ok(Self::binary(BinaryOperator::Range, left, right))
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.current_token().clone() {
            Token::Number(n) => {
                self.consume();
                Ok(FormulaExpr::Number(n))
            }
            Token::String(s) => {
                self.consume();
                Ok(FormulaExpr::String(s))
            }
            Token::Boolean(b) => {
                self.consume();
                Ok(FormulaExpr::Boolean(b))
            }
            Token::Error(e) => {
                self.consume();
                Ok(FormulaExpr::Error(e))
            }
            Token::LeftParen => {
                self.consume();
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }
            Token::LeftBrace => self.parse_array(),
            Token::SheetRef(sheet) => {
                self.consume();
                self.parse_sheet_reference(sheet)
            }
            Token::CellRef(text) => {
                self.consume();
                Self::cell_reference(None, &text)
            }
            Token::Identifier(name) => {
                self.consume();
                if matches!(self.current_token(), Token::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    Ok(FormulaExpr::NameRef(name))
                }
            }
            token => Err(FormulaError::Parse(format!("Unexpected token: {:?}", token))),
        }
    }

    fn parse_array(&mut self) -> FormulaResult<FormulaExpr> {
        self.expect(&Token::LeftBrace)?;

        let mut rows = Vec::new();
        let mut current_row = Vec::new();

        if !matches!(self.current_token(), Token::RightBrace) {
            current_row.push(self.parse_expression()?);

            loop {
                match self.current_token() {
                    Token::Comma => {
                        self.consume();
                        current_row.push(self.parse_expression()?);
                    }
                    Token::Semicolon => {
                        self.consume();
                        rows.push(std::mem::take(&mut current_row));
                        current_row.push(self.parse_expression()?);
                    }
                    Token::RightBrace => break,
                    _ => {
                        return Err(FormulaError::Parse(
                            "Expected ',' ';' or '}' in array".into(),
                        ))
                    }
                }
            }
        }

        if !current_row.is_empty() {
            rows.push(current_row);
        }

        self.expect(&Token::RightBrace)?;
        Ok(FormulaExpr::Array(rows))
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();
        if !matches!(self.current_token(), Token::RightParen) {
            args.push(self.parse_expression()?);
            while matches!(self.current_token(), Token::Comma) {
                self.consume();
                args.push(self.parse_expression()?);
            }
        }

        self.expect(&Token::RightParen)?;

        Ok(FormulaExpr::Function {
            name: name.to_uppercase(),
            args,
        })
    }

    fn parse_sheet_reference(&mut self, sheet: String) -> FormulaResult<FormulaExpr> {
        match self.current_token().clone() {
            Token::CellRef(text) => {
                self.consume();
                Self::cell_reference(Some(sheet), &text)
            }
            _ => Err(FormulaError::Parse(format!(
                "Expected cell reference after '{}!'",
                sheet
            ))),
        }
    }

    fn cell_reference(sheet: Option<String>, text: &str) -> FormulaResult<FormulaExpr> {
        let address = CellAddress::parse(text).map_err(|e| {
            FormulaError::Parse(format!("Invalid cell reference '{}': {}", text, e))
        })?;
        Ok(FormulaExpr::CellRef(CellReference { sheet, address }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_formula("=42").unwrap(), FormulaExpr::Number(42.0));
        assert_eq!(parse_formula("=.5").unwrap(), FormulaExpr::Number(0.5));
        assert_eq!(parse_formula("=1e3").unwrap(), FormulaExpr::Number(1000.0));
        assert_eq!(parse_formula("=TRUE").unwrap(), FormulaExpr::Boolean(true));
        assert_eq!(
            parse_formula("=\"say \"\"hi\"\"\"").unwrap(),
            FormulaExpr::String("say \"hi\"".into())
        );
        assert_eq!(
            parse_formula("=#DIV/0!").unwrap(),
            FormulaExpr::Error(CellError::Div0)
        );
    }

    #[test]
    fn test_parse_precedence() {
        let ast = parse_formula("=1+2*3").unwrap();
        let FormulaExpr::BinaryOp { op, left, right } = ast else {
            panic!("Expected BinaryOp");
        };
        assert_eq!(op, BinaryOperator::Add);
        assert_eq!(*left, FormulaExpr::Number(1.0));
        assert!(matches!(
            *right,
            FormulaExpr::BinaryOp {
                op: BinaryOperator::Multiply,
                ..
            }
        ));

        let ast = parse_formula("=2^3^2").unwrap();
        let FormulaExpr::BinaryOp { right, .. } = ast else {
            panic!("Expected BinaryOp");
        };
        assert!(matches!(
            *right,
            FormulaExpr::BinaryOp {
                op: BinaryOperator::Power,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_unary_and_percent() {
        assert!(matches!(
            parse_formula("=-A1").unwrap(),
            FormulaExpr::UnaryOp {
                op: UnaryOperator::Negate,
                ..
            }
        ));
        assert!(matches!(
            parse_formula("=8%").unwrap(),
            FormulaExpr::UnaryOp {
                op: UnaryOperator::Percent,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_cell_and_range_references() {
        let FormulaExpr::CellRef(r) = parse_formula("=$B$2").unwrap() else {
            panic!("Expected CellRef");
        };
        assert_eq!((r.address.row, r.address.col), (1, 1));
        assert!(r.sheet.is_none());

        let FormulaExpr::RangeRef(r) = parse_formula("=A1:B10").unwrap() else {
            panic!("Expected RangeRef");
        };
        assert_eq!(r.range, CellRange::from_indices(0, 0, 9, 1));
    }

    #[test]
    fn test_parse_sheet_qualified_references() {
        let FormulaExpr::CellRef(r) = parse_formula("=Inputs!C3").unwrap() else {
            panic!("Expected CellRef");
        };
        assert_eq!(r.sheet.as_deref(), Some("Inputs"));

        let FormulaExpr::RangeRef(r) = parse_formula("='Free Cash Flow'!B2:F2").unwrap() else {
            panic!("Expected RangeRef");
        };
        assert_eq!(r.sheet.as_deref(), Some("Free Cash Flow"));
        assert_eq!(r.range, CellRange::from_indices(1, 1, 1, 5));

        let FormulaExpr::CellRef(r) = parse_formula("='Bob''s'!A1").unwrap() else {
            panic!("Expected CellRef");
        };
        assert_eq!(r.sheet.as_deref(), Some("Bob's"));

        assert!(parse_formula("=S1!A1:S2!B2").is_err());
    }

    #[test]
    fn test_parse_names_and_functions() {
        assert_eq!(
            parse_formula("=WACC").unwrap(),
            FormulaExpr::NameRef("WACC".into())
        );
        // too many letters to be a column
        assert_eq!(
            parse_formula("=Revenue2023").unwrap(),
            FormulaExpr::NameRef("Revenue2023".into())
        );

        let FormulaExpr::Function { name, args } =
            parse_formula("=npv(Rate, B2:F2)").unwrap()
        else {
            panic!("Expected Function");
        };
        assert_eq!(name, "NPV");
        assert_eq!(args.len(), 2);
        assert_eq!(args[0], FormulaExpr::NameRef("Rate".into()));

        let FormulaExpr::Function { args, .. } = parse_formula("=PI()").unwrap() else {
            panic!("Expected Function");
        };
        assert!(args.is_empty());
    }

    #[test]
    fn test_parse_array() {
        let FormulaExpr::Array(rows) = parse_formula("={1,2;3,4}").unwrap() else {
            panic!("Expected Array");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec![FormulaExpr::Number(3.0), FormulaExpr::Number(4.0)]);
    }

    #[test]
    fn test_parse_failures() {
        assert!(parse_formula("1+2").is_err());
        assert!(parse_formula("=1+").is_err());
        assert!(parse_formula("=(1+2").is_err());
        assert!(parse_formula("=1 ~ 2").is_err());
        assert!(parse_formula("=\"open").is_err());
        assert!(parse_formula("=SUM(1,2").is_err());
    }
}
