//! Entry points into the expression grammar: comma -> assignment ->
//! conditional -> (the binary/unary/postfix ladder in `operators.rs`).

use super::Parser;
use crate::ParseError;
use cxx_ast::{BinOp, Expr, TokenStream};

impl<'a, TS: TokenStream> Parser<'a, TS> {
    /// The comma operator: `a, b, c`. This is the widest expression form,
    /// used wherever a full expression (not just an assignment-expression)
    /// is grammatically allowed, e.g. inside a parenthesized expression.
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_assignment()?;
        while self.eat_punct(",") {
            let rhs = self.parse_assignment()?;
            lhs = Expr::Binary { op: BinOp::Comma, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    /// `a = b`, `a += b`, ..., right-associative, one level below the
    /// conditional operator.
    pub(crate) fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.parse_conditional()?;
        let compound = if self.eat_punct("=") {
            None
        } else if self.eat_punct("+=") {
            Some(BinOp::Add)
        } else if self.eat_punct("-=") {
            Some(BinOp::Sub)
        } else if self.eat_punct("*=") {
            Some(BinOp::Mul)
        } else if self.eat_punct("/=") {
            Some(BinOp::Div)
        } else if self.eat_punct("%=") {
            Some(BinOp::Mod)
        } else if self.eat_punct("<<=") {
            Some(BinOp::Shl)
        } else if self.eat_punct(">>=") {
            Some(BinOp::Shr)
        } else if self.eat_punct("&=") {
            Some(BinOp::BitAnd)
        } else if self.eat_punct("|=") {
            Some(BinOp::BitOr)
        } else if self.eat_punct("^=") {
            Some(BinOp::BitXor)
        } else {
            return Ok(lhs);
        };
        let rhs = self.parse_assignment()?;
        Ok(Expr::Assign { compound, lhs: Box::new(lhs), rhs: Box::new(rhs) })
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let cond = self.parse_logical_or()?;
        if self.eat_punct("?") {
            let then_expr = self.parse_assignment()?;
            self.expect_punct(":")?;
            let else_expr = self.parse_assignment()?;
            return Ok(Expr::Conditional {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            });
        }
        Ok(cond)
    }
}
