//! `enum`/`enum class`/`enum struct`, with an optional fixed underlying
//! type and an optional trailing comma in the variant list.

use crate::parser::Parser;
use crate::ParseError;
use cxx_ast::{ConstValue, Decl, DeclId, EnumDecl, Symbol, TokenStream};

impl<'a, TS: TokenStream> Parser<'a, TS> {
    pub(crate) fn parse_enum(&mut self, owner_namespace: &[Symbol]) -> Result<DeclId, ParseError> {
        self.expect_keyword("enum")?;
        let is_scoped = self.eat_keyword("class") || self.eat_keyword("struct");
        let name = self.consume_identifier()?;
        let underlying = if self.eat_punct(":") { Some(self.parse_type()?) } else { None };

        self.expect_punct("{")?;
        let mut variants = Vec::new();
        while !self.at_punct("}") && !self.is_at_end() {
            let variant_name = self.consume_identifier()?;
            let value = if self.eat_punct("=") { Some(self.parse_enum_const_expr()?) } else { None };
            variants.push((variant_name, value));
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct("}")?;
        self.eat_punct(";");

        let (id, _) = self.arena.alloc_decl(Decl::Enum(EnumDecl {
            name,
            owner_namespace: owner_namespace.to_vec(),
            underlying,
            is_scoped,
            variants,
        }));
        Ok(id)
    }

    /// An enumerator initializer is almost always an integer literal, but
    /// may also name a previous enumerator (`B = A`) or a small expression
    /// (`C = A + 1`). Only the literal spelling `ConstValue` models directly
    /// is captured here; anything else is consumed to stay in sync with the
    /// token stream and resolved by sema from the raw expression instead.
    fn parse_enum_const_expr(&mut self) -> Result<ConstValue, ParseError> {
        let negative = self.at_punct("-") && self.peek_at(1).kind == cxx_ast::TokenKind::Literal;
        if negative {
            self.bump();
        }
        let tok = self.peek();
        if tok.kind == cxx_ast::TokenKind::Literal {
            let text = self.interner.resolve(tok.lexeme);
            let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
            if let Ok(v) = digits.parse::<i64>() {
                self.bump();
                return Ok(ConstValue::Int(if negative { -v } else { v }));
            }
        }
        self.parse_assignment()?;
        Ok(ConstValue::Int(0))
    }
}
