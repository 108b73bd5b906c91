//! Primary expressions: literals, names, parenthesized expressions, lambdas,
//! `new`/`delete`, `sizeof`/`typeid`, named casts, `throw`, `requires { }`
//! expressions, and `__is_*` trait intrinsics.

use super::Parser;
use crate::ParseError;
use cxx_ast::{
    CaptureMode, Capture, CastKind, Expr, LambdaParam, Requirement, SizeofOperand, TokenKind,
    TokenStream,
};

impl<'a, TS: TokenStream> Parser<'a, TS> {
    pub(crate) fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.at_punct(")") {
            return Ok(args);
        }
        loop {
            args.push(self.parse_assignment()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(args)
    }

    pub(crate) fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        if let Some(lit) = self.try_parse_literal()? {
            return Ok(lit);
        }
        if self.eat_keyword("true") {
            return Ok(Expr::BoolLiteral(true));
        }
        if self.eat_keyword("false") {
            return Ok(Expr::BoolLiteral(false));
        }
        if self.eat_keyword("nullptr") {
            return Ok(Expr::NullPtr);
        }
        if self.eat_keyword("this") {
            return Ok(Expr::This);
        }
        if self.eat_keyword("throw") {
            let operand = if self.at_punct(";") || self.at_punct(")") || self.at_punct(",") {
                None
            } else {
                Some(Box::new(self.parse_assignment()?))
            };
            return Ok(Expr::Throw(operand));
        }
        if self.eat_keyword("new") {
            return self.parse_new_expr();
        }
        if self.eat_keyword("delete") {
            let is_array = self.eat_punct("[") && self.expect_punct("]").is_ok();
            let expr = self.parse_unary()?;
            return Ok(Expr::Delete { expr: Box::new(expr), is_array });
        }
        if self.eat_keyword("sizeof") {
            return self.parse_sizeof_or_typeid(false);
        }
        if self.at_keyword("typeid") {
            self.bump();
            return self.parse_sizeof_or_typeid(true);
        }
        if let Some(kind) = self.try_parse_named_cast_kind() {
            return self.parse_named_cast(kind);
        }
        if self.at_punct("[") {
            return self.parse_lambda();
        }
        if self.at_keyword("requires") {
            return self.parse_requires_expr();
        }
        if self.at_identifier() && self.peek_lexeme().starts_with("__is_") {
            return self.parse_trait_intrinsic();
        }
        if self.eat_punct("(") {
            let inner = self.parse_expression()?;
            self.expect_punct(")")?;
            return Ok(Expr::Paren(Box::new(inner)));
        }
        if self.at_identifier() {
            let path = self.parse_name_path()?;
            let explicit_args = self.try_parse_template_args()?;
            if path.len() == 1 {
                return Ok(Expr::Name { name: path[0], explicit_args });
            }
            return Ok(Expr::QualifiedName { path, explicit_args });
        }
        Err(self.error("expected an expression"))
    }

    fn peek_lexeme(&self) -> std::sync::Arc<str> {
        let tok = self.peek();
        self.interner.resolve(tok.lexeme)
    }

    fn try_parse_literal(&mut self) -> Result<Option<Expr>, ParseError> {
        let tok = self.peek();
        if tok.kind != TokenKind::Literal {
            return Ok(None);
        }
        let text = self.interner.resolve(tok.lexeme);
        if text.starts_with('"') {
            self.bump();
            let stripped = text.trim_start_matches('"').trim_end_matches('"');
            return Ok(Some(Expr::StringLiteral(self.interner.intern(stripped))));
        }
        if text.starts_with('\'') {
            self.bump();
            let stripped = text.trim_start_matches('\'').trim_end_matches('\'');
            let ch = unescape_char(stripped);
            return Ok(Some(Expr::CharLiteral(ch)));
        }
        if text.contains('.') || ((text.contains('e') || text.contains('E')) && !text.starts_with("0x")) {
            self.bump();
            let trimmed = text.trim_end_matches(['f', 'F', 'l', 'L']);
            let v: f64 = trimmed
                .parse()
                .map_err(|_| self.error("invalid floating-point literal"))?;
            return Ok(Some(Expr::FloatLiteral(v)));
        }
        self.bump();
        let is_unsigned = text.contains('u') || text.contains('U');
        let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
        if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            let v = u64::from_str_radix(hex, 16).map_err(|_| self.error("invalid hex literal"))?;
            return Ok(Some(if is_unsigned {
                Expr::UIntLiteral(v)
            } else {
                Expr::IntLiteral(v as i64)
            }));
        }
        let v: u64 = digits.parse().map_err(|_| self.error("invalid integer literal"))?;
        Ok(Some(if is_unsigned {
            Expr::UIntLiteral(v)
        } else {
            Expr::IntLiteral(v as i64)
        }))
    }

    fn parse_new_expr(&mut self) -> Result<Expr, ParseError> {
        let placement = if self.eat_punct("(") {
            let args = self.parse_arguments()?;
            self.expect_punct(")")?;
            args
        } else {
            Vec::new()
        };
        let paren_type = self.eat_punct("(");
        let ty = self.parse_type()?;
        if paren_type {
            self.expect_punct(")")?;
        }
        let array_size = if self.eat_punct("[") {
            let size = self.parse_expression()?;
            self.expect_punct("]")?;
            Some(Box::new(size))
        } else {
            None
        };
        let ctor_args = if self.eat_punct("(") {
            let args = self.parse_arguments()?;
            self.expect_punct(")")?;
            args
        } else {
            Vec::new()
        };
        Ok(Expr::New { ty, array_size, placement, ctor_args })
    }

    fn parse_sizeof_or_typeid(&mut self, is_typeid: bool) -> Result<Expr, ParseError> {
        self.expect_punct("(")?;
        let save = self.stream.save();
        let operand = if let Ok(ty) = self.parse_type() {
            if self.at_punct(")") {
                SizeofOperand::Type(ty)
            } else {
                self.stream.restore(save);
                SizeofOperand::Expr(Box::new(self.parse_expression()?))
            }
        } else {
            self.stream.restore(save);
            SizeofOperand::Expr(Box::new(self.parse_expression()?))
        };
        self.expect_punct(")")?;
        Ok(if is_typeid { Expr::Typeid { of: operand } } else { Expr::Sizeof { of: operand } })
    }

    fn try_parse_named_cast_kind(&self) -> Option<CastKind> {
        if self.at_keyword("static_cast") {
            Some(CastKind::Static)
        } else if self.at_keyword("dynamic_cast") {
            Some(CastKind::Dynamic)
        } else if self.at_keyword("const_cast") {
            Some(CastKind::Const)
        } else if self.at_keyword("reinterpret_cast") {
            Some(CastKind::Reinterpret)
        } else {
            None
        }
    }

    fn parse_named_cast(&mut self, kind: CastKind) -> Result<Expr, ParseError> {
        self.bump();
        self.expect_punct("<")?;
        let target = self.parse_type()?;
        self.close_template_angle()?;
        self.expect_punct("(")?;
        let expr = self.parse_expression()?;
        self.expect_punct(")")?;
        Ok(Expr::Cast { kind, target, expr: Box::new(expr) })
    }

    fn parse_trait_intrinsic(&mut self) -> Result<Expr, ParseError> {
        let name = self.consume_identifier()?;
        self.expect_punct("(")?;
        let mut type_args = Vec::new();
        if !self.at_punct(")") {
            loop {
                type_args.push(self.parse_type()?);
                if !self.eat_punct(",") {
                    break;
                }
            }
        }
        self.expect_punct(")")?;
        Ok(Expr::TraitIntrinsic { name, type_args })
    }

    fn parse_lambda(&mut self) -> Result<Expr, ParseError> {
        self.expect_punct("[")?;
        let captures = self.parse_capture_list()?;
        self.expect_punct("]")?;

        let mut params = Vec::new();
        if self.eat_punct("(") {
            if !self.at_punct(")") {
                loop {
                    if self.at_keyword("auto") {
                        self.bump();
                        let is_forwarding_ref = self.eat_punct("&&");
                        if !is_forwarding_ref {
                            self.eat_punct("&");
                        }
                        let name = self.consume_identifier()?;
                        params.push(LambdaParam { name, ty: None, is_forwarding_ref });
                    } else {
                        let ty = self.parse_type()?;
                        let name = self.consume_identifier()?;
                        params.push(LambdaParam { name, ty: Some(ty), is_forwarding_ref: false });
                    }
                    if !self.eat_punct(",") {
                        break;
                    }
                }
            }
            self.expect_punct(")")?;
        }

        let is_mutable = self.eat_keyword("mutable");
        let return_type = if self.eat_punct("->") { Some(self.parse_type()?) } else { None };

        self.expect_punct("{")?;
        let body = self.parse_block_stmts()?;
        Ok(Expr::Lambda {
            captures,
            params,
            return_type,
            body: Box::new(cxx_ast::Block { stmts: body }),
            is_mutable,
        })
    }

    fn parse_capture_list(&mut self) -> Result<CaptureMode, ParseError> {
        if self.at_punct("]") {
            return Ok(CaptureMode::None);
        }
        if self.at_punct("=") && self.peek_at(1).kind == TokenKind::Punctuator {
            self.bump();
            return Ok(CaptureMode::AllByValue);
        }
        if self.at_punct("&") && {
            let next = self.peek_at(1);
            next.kind == TokenKind::Punctuator && &*self.interner.resolve(next.lexeme) == "]"
        } {
            self.bump();
            return Ok(CaptureMode::AllByReference);
        }
        let mut captures = Vec::new();
        loop {
            let by_reference = self.eat_punct("&");
            let name = self.consume_identifier()?;
            let init = if self.eat_punct("=") { Some(self.parse_assignment()?) } else { None };
            captures.push(Capture { name, by_reference, init });
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(CaptureMode::Explicit(captures))
    }

    fn parse_requires_expr(&mut self) -> Result<Expr, ParseError> {
        self.bump();
        let mut params = Vec::new();
        if self.eat_punct("(") {
            if !self.at_punct(")") {
                loop {
                    let ty = self.parse_type()?;
                    let name = self.consume_identifier()?;
                    params.push(cxx_ast::Param { name, ty, default: None });
                    if !self.eat_punct(",") {
                        break;
                    }
                }
            }
            self.expect_punct(")")?;
        }
        self.expect_punct("{")?;
        let mut requirements = Vec::new();
        while !self.at_punct("}") && !self.is_at_end() {
            requirements.push(self.parse_requirement()?);
        }
        self.expect_punct("}")?;
        Ok(Expr::Requires { params, requirements })
    }

    fn parse_requirement(&mut self) -> Result<Requirement, ParseError> {
        if self.eat_keyword("typename") {
            let ty = self.parse_type()?;
            self.expect_punct(";")?;
            return Ok(Requirement::Type(ty));
        }
        if self.eat_keyword("requires") {
            let nested = self.parse_expression()?;
            self.expect_punct(";")?;
            return Ok(Requirement::Nested(Box::new(nested)));
        }
        if self.eat_punct("{") {
            let expr = self.parse_expression()?;
            self.expect_punct("}")?;
            let noexcept = self.eat_keyword("noexcept");
            let returns = if self.eat_punct("->") { Some(self.parse_type()?) } else { None };
            self.expect_punct(";")?;
            return Ok(Requirement::Compound { expr, noexcept, returns });
        }
        let expr = self.parse_expression()?;
        self.expect_punct(";")?;
        Ok(Requirement::Simple(expr))
    }
}

fn unescape_char(s: &str) -> char {
    if let Some(rest) = s.strip_prefix('\\') {
        match rest {
            "n" => '\n',
            "t" => '\t',
            "r" => '\r',
            "0" => '\0',
            "\\" => '\\',
            "'" => '\'',
            other => other.chars().next().unwrap_or('\0'),
        }
    } else {
        s.chars().next().unwrap_or('\0')
    }
}
