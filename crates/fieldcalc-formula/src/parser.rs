//! Formula parser
//!
//! A recursive descent parser over the token stream with proper operator
//! precedence.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::lexer::{tokenize, Keyword, Token, TokenKind};
use fieldcalc_core::Value;

/// Parse a formula string into an AST
///
/// # Example
/// ```rust
/// use fieldcalc_formula::parse_formula;
///
/// let ast = parse_formula("1 + 2").unwrap();
/// let ast = parse_formula("price * quantity").unwrap();
/// let ast = parse_formula("round(total / count, 2)").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let tokens = tokenize(formula)?;
    let mut parser = FormulaParser::new(tokens);
    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if !matches!(parser.current_token().kind, TokenKind::Eof) {
        let token = parser.current_token();
        return Err(FormulaError::parse(
            format!("Unexpected {} after expression", token.kind),
            token.position,
        ));
    }

    Ok(expr)
}

/// Deepest nesting of parentheses, prefix operators, exponents, function
/// calls and operator chains accepted in one formula
pub const MAX_NESTING_DEPTH: usize = 256;

/// Formula parser
struct FormulaParser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl FormulaParser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    // === Helper methods ===

    fn current_token(&self) -> &Token {
        // The tokenizer always terminates the stream with Eof
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn consume(&mut self) -> Token {
        let token = self.current_token().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &TokenKind) -> FormulaResult<()> {
        if &self.current_token().kind == expected {
            self.consume();
            Ok(())
        } else {
            let token = self.current_token();
            Err(FormulaError::parse(
                format!("Expected {}, got {}", expected, token.kind),
                token.position,
            ))
        }
    }

    /// Go one level deeper, failing at the current token past the limit
    fn enter(&mut self) -> FormulaResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(FormulaError::parse(
                "Expression nested too deeply",
                self.current_token().position,
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn is_keyword(&self, keyword: Keyword) -> bool {
        self.current_token().kind == TokenKind::Keyword(keyword)
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Logical or
    // 2. Logical and
    // 3. Logical not (prefix)
    // 4. Comparison: ==, !=, <, <=, >, >= (non-associative)
    // 5. Addition/Subtraction: +, -
    // 6. Multiplication/Division/Modulo: *, /, %
    // 7. Unary: -, +
    // 8. Exponentiation: ** (right associative)
    // 9. Primary: literals, field references, function calls, parentheses

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_and()?;
        let depth = self.depth;

        while self.is_keyword(Keyword::Or) {
            self.enter()?;
            self.consume();
            let right = self.parse_and()?;
            left = FormulaExpr::binary(BinaryOperator::Or, left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_and(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_not()?;
        let depth = self.depth;

        while self.is_keyword(Keyword::And) {
            self.enter()?;
            self.consume();
            let right = self.parse_not()?;
            left = FormulaExpr::binary(BinaryOperator::And, left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_not(&mut self) -> FormulaResult<FormulaExpr> {
        if self.is_keyword(Keyword::Not) {
            self.enter()?;
            self.consume();
            let operand = self.parse_not()?;
            self.leave();
            return Ok(FormulaExpr::unary(UnaryOperator::Not, operand));
        }

        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_additive()?;

        let op = match self.current_token().kind {
            TokenKind::EqualEqual => BinaryOperator::Equal,
            TokenKind::NotEqual => BinaryOperator::NotEqual,
            TokenKind::Less => BinaryOperator::LessThan,
            TokenKind::LessEqual => BinaryOperator::LessEqual,
            TokenKind::Greater => BinaryOperator::GreaterThan,
            TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
            _ => return Ok(left),
        };

        // Only one comparison per level; a chained one is left for the caller to reject
        self.consume();
        let right = self.parse_additive()?;
        Ok(FormulaExpr::binary(op, left, right))
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_multiplicative()?;
        let depth = self.depth;

        loop {
            let op = match self.current_token().kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.enter()?;
            self.consume();
            let right = self.parse_multiplicative()?;
            left = FormulaExpr::binary(op, left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_unary()?;
        let depth = self.depth;

        loop {
            let op = match self.current_token().kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::Percent => BinaryOperator::Modulo,
                _ => break,
            };

            self.enter()?;
            self.consume();
            let right = self.parse_unary()?;
            left = FormulaExpr::binary(op, left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        let op = match self.current_token().kind {
            TokenKind::Minus => UnaryOperator::Negate,
            TokenKind::Plus => UnaryOperator::Plus,
            _ => return self.parse_power(),
        };

        self.enter()?;
        self.consume();
        let operand = self.parse_unary()?;
        self.leave();
        Ok(FormulaExpr::unary(op, operand))
    }

    fn parse_power(&mut self) -> FormulaResult<FormulaExpr> {
        let base = self.parse_primary()?;

        if matches!(self.current_token().kind, TokenKind::StarStar) {
            self.enter()?;
            self.consume();
            // Right associative; the exponent may carry its own sign
            let exponent = self.parse_unary()?;
            self.leave();
            return Ok(FormulaExpr::binary(BinaryOperator::Power, base, exponent));
        }

        Ok(base)
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        if matches!(self.current_token().kind, TokenKind::LeftParen) {
            self.enter()?;
            self.consume();
            let expr = self.parse_expression()?;
            self.expect(&TokenKind::RightParen)?;
            self.leave();
            return Ok(expr);
        }

        let token = self.consume();
        match token.kind {
            TokenKind::Number(n) => Ok(FormulaExpr::Literal(Value::Number(n))),

            TokenKind::String(s) => Ok(FormulaExpr::Literal(Value::String(s))),

            TokenKind::Keyword(Keyword::True) => Ok(FormulaExpr::Literal(Value::Boolean(true))),
            TokenKind::Keyword(Keyword::False) => {
                Ok(FormulaExpr::Literal(Value::Boolean(false)))
            }
            TokenKind::Keyword(Keyword::Null) => Ok(FormulaExpr::Literal(Value::Null)),

            TokenKind::Identifier(name) => {
                // Check if it's a function call
                if matches!(self.current_token().kind, TokenKind::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    Ok(FormulaExpr::FieldRef(name))
                }
            }

            other => Err(FormulaError::parse(
                format!("Unexpected {}", other),
                token.position,
            )),
        }
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        self.enter()?;
        self.expect(&TokenKind::LeftParen)?;

        let mut args = Vec::new();

        // Parse arguments
        if !matches!(self.current_token().kind, TokenKind::RightParen) {
            args.push(self.parse_expression()?);

            while matches!(self.current_token().kind, TokenKind::Comma) {
                self.consume();
                args.push(self.parse_expression()?);
            }
        }

        self.expect(&TokenKind::RightParen)?;
        self.leave();

        Ok(FormulaExpr::FunctionCall { name, args })
    }
}
