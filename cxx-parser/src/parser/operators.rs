//! Binary/unary/postfix precedence ladder:
//! logical-or -> logical-and -> bitwise-or -> bitwise-xor -> bitwise-and ->
//! equality -> relational(+spaceship) -> shift -> additive -> multiplicative
//! -> cast -> unary -> postfix -> primary.
//!
//! `a <=> b` has no dedicated `BinOp` variant (`cxx_ast::BinOp` models C's
//! arithmetic/comparison/logical operators only); it is lowered the way the
//! reference implementation represents it, as a call to `operator<=>` through
//! member-access syntax.

use super::Parser;
use crate::ParseError;
use cxx_ast::{BinOp, CastKind, Expr, TokenStream, UnOp};

impl<'a, TS: TokenStream> Parser<'a, TS> {
    pub(crate) fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_logical_and()?;
        while self.eat_punct("||") {
            let rhs = self.parse_logical_and()?;
            lhs = binary(BinOp::LogOr, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_bit_or()?;
        while self.eat_punct("&&") {
            let rhs = self.parse_bit_or()?;
            lhs = binary(BinOp::LogAnd, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bit_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_bit_xor()?;
        while self.at_punct("|") && !self.at_punct("||") {
            self.bump();
            let rhs = self.parse_bit_xor()?;
            lhs = binary(BinOp::BitOr, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bit_xor(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_bit_and()?;
        while self.eat_punct("^") {
            let rhs = self.parse_bit_and()?;
            lhs = binary(BinOp::BitXor, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bit_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_equality()?;
        while self.at_punct("&") && !self.at_punct("&&") {
            self.bump();
            let rhs = self.parse_equality()?;
            lhs = binary(BinOp::BitAnd, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = if self.eat_punct("==") {
                BinOp::Eq
            } else if self.eat_punct("!=") {
                BinOp::Ne
            } else {
                break;
            };
            let rhs = self.parse_relational()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_shift()?;
        loop {
            if self.eat_punct("<=>") {
                let rhs = self.parse_shift()?;
                lhs = spaceship_call(self.interner, lhs, rhs);
                continue;
            }
            let op = if self.eat_punct("<=") {
                BinOp::Le
            } else if self.eat_punct(">=") {
                BinOp::Ge
            } else if self.at_punct("<") {
                self.bump();
                BinOp::Lt
            } else if self.at_punct(">") {
                self.bump();
                BinOp::Gt
            } else {
                break;
            };
            let rhs = self.parse_shift()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = if self.eat_punct("<<") {
                BinOp::Shl
            } else if self.eat_punct(">>") {
                BinOp::Shr
            } else {
                break;
            };
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = if self.eat_punct("+") {
                BinOp::Add
            } else if self.eat_punct("-") {
                BinOp::Sub
            } else {
                break;
            };
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_cast()?;
        loop {
            let op = if self.eat_punct("*") {
                BinOp::Mul
            } else if self.eat_punct("/") {
                BinOp::Div
            } else if self.eat_punct("%") {
                BinOp::Mod
            } else {
                break;
            };
            let rhs = self.parse_cast()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    /// C-style cast: `( type-id ) unary-expr`. Distinguished from a merely
    /// parenthesized expression by whether the parenthesized content parses
    /// as a type-id and is immediately followed by something that can start
    /// a unary-expression.
    fn parse_cast(&mut self) -> Result<Expr, ParseError> {
        if self.at_punct("(") {
            let save = self.stream.save();
            self.bump();
            if let Ok(ty) = self.parse_type() {
                if self.eat_punct(")") && self.can_start_unary_expr() {
                    let expr = self.parse_cast()?;
                    return Ok(Expr::Cast { kind: CastKind::CStyle, target: ty, expr: Box::new(expr) });
                }
            }
            self.stream.restore(save);
        }
        self.parse_unary()
    }

    fn can_start_unary_expr(&self) -> bool {
        !(self.at_punct(";") || self.at_punct(",") || self.at_punct(")") || self.is_at_end())
    }

    pub(crate) fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = if self.eat_punct("++") {
            Some(UnOp::PreInc)
        } else if self.eat_punct("--") {
            Some(UnOp::PreDec)
        } else if self.eat_punct("!") {
            Some(UnOp::Not)
        } else if self.eat_punct("~") {
            Some(UnOp::BitNot)
        } else if self.eat_punct("-") {
            Some(UnOp::Neg)
        } else if self.eat_punct("+") {
            Some(UnOp::Plus)
        } else if self.eat_punct("*") {
            Some(UnOp::Deref)
        } else if self.eat_punct("&") {
            Some(UnOp::AddrOf)
        } else {
            None
        };
        if let Some(op) = op {
            let operand = self.parse_cast()?;
            return Ok(Expr::Unary { op, operand: Box::new(operand) });
        }
        self.parse_postfix()
    }

    pub(crate) fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat_punct("(") {
                let args = self.parse_arguments()?;
                self.expect_punct(")")?;
                expr = Expr::Call { callee: Box::new(expr), args };
            } else if self.eat_punct("[") {
                let index = self.parse_expression()?;
                self.expect_punct("]")?;
                expr = Expr::Index { object: Box::new(expr), index: Box::new(index) };
            } else if self.at_punct(".") || self.at_punct("->") {
                let is_arrow = self.at_punct("->");
                self.bump();
                let member = self.consume_identifier()?;
                let explicit_args = self.try_parse_template_args()?;
                expr = Expr::MemberAccess { object: Box::new(expr), member, is_arrow, explicit_args };
            } else if self.eat_punct("++") {
                expr = Expr::Unary { op: UnOp::PostInc, operand: Box::new(expr) };
            } else if self.eat_punct("--") {
                expr = Expr::Unary { op: UnOp::PostDec, operand: Box::new(expr) };
            } else {
                break;
            }
        }
        Ok(expr)
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
}

fn spaceship_call(interner: &cxx_ast::Interner, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Call {
        callee: Box::new(Expr::MemberAccess {
            object: Box::new(lhs),
            member: interner.intern("operator<=>"),
            is_arrow: false,
            explicit_args: Vec::new(),
        }),
        args: vec![rhs],
    }
}
