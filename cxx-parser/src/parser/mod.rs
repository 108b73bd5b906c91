//! Recursive-descent parser core: cursor helpers shared by every grammar
//! submodule, grounded on `vex-parser`'s `Parser` (`check`/`match_token`/
//! `consume`/`advance`/`parse_block` naming and control flow), retargeted
//! from `vex-lexer`'s rich `Token` enum (one variant per keyword) to
//! `cxx_ast::Token`'s flat `{kind, lexeme}` record: keyword/punctuator/
//! operator lookahead here compares the token's resolved lexeme text
//! against a literal spelling instead of matching an enum discriminant.

use crate::ParseError;
use cxx_ast::{AstArena, Interner, Token, TokenKind, TokenStream};

mod error_recovery;
mod expressions;
mod items;
mod operators;
mod primaries;
mod statements;
mod types;

pub use error_recovery::parse_translation_unit_with_recovery;
pub use items::parse_translation_unit;

/// Bounds re-entrant depth when the template engine re-enters the parser at
/// a saved token position ("guard counter bounds
/// re-entrant depth at 256").
pub const MAX_REENTRY_DEPTH: u32 = 256;

pub struct Parser<'a, TS: TokenStream> {
    pub(crate) stream: &'a mut TS,
    pub(crate) arena: &'a AstArena,
    pub(crate) interner: &'a Interner,
    pub(crate) reentry_depth: u32,
}

impl<'a, TS: TokenStream> Parser<'a, TS> {
    pub fn new(stream: &'a mut TS, arena: &'a AstArena, interner: &'a Interner) -> Self {
        Self {
            stream,
            arena,
            interner,
            reentry_depth: 0,
        }
    }

    // ==================== Cursor primitives ====================

    pub(crate) fn peek(&self) -> Token {
        self.stream.peek(0)
    }

    pub(crate) fn peek_at(&self, offset: usize) -> Token {
        self.stream.peek(offset)
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.stream.is_at_end()
    }

    pub(crate) fn bump(&mut self) -> Token {
        self.stream.bump()
    }

    fn lexeme(&self, tok: Token) -> std::sync::Arc<str> {
        self.interner.resolve(tok.lexeme)
    }

    // ==================== Lookahead by spelling ====================

    pub(crate) fn at_keyword(&self, kw: &str) -> bool {
        let tok = self.peek();
        tok.kind == TokenKind::Keyword && &*self.lexeme(tok) == kw
    }

    pub(crate) fn at_any_keyword(&self, kws: &[&str]) -> bool {
        kws.iter().any(|k| self.at_keyword(k))
    }

    pub(crate) fn at_punct(&self, p: &str) -> bool {
        let tok = self.peek();
        (tok.kind == TokenKind::Punctuator || tok.kind == TokenKind::Operator) && &*self.lexeme(tok) == p
    }

    pub(crate) fn at_identifier(&self) -> bool {
        self.peek().kind == TokenKind::Identifier
    }

    pub(crate) fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.at_keyword(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_punct(&mut self, p: &str) -> bool {
        if self.at_punct(p) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_punct(&mut self, p: &str) -> Result<(), ParseError> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{p}'")))
        }
    }

    pub(crate) fn expect_keyword(&mut self, kw: &str) -> Result<(), ParseError> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{kw}'")))
        }
    }

    pub(crate) fn consume_identifier(&mut self) -> Result<cxx_ast::Symbol, ParseError> {
        let tok = self.peek();
        if tok.kind == TokenKind::Identifier {
            self.bump();
            Ok(tok.lexeme)
        } else {
            Err(self.error("expected identifier"))
        }
    }

    pub(crate) fn error(&self, message: &str) -> ParseError {
        let tok = self.peek();
        ParseError::SyntaxError {
            location: format!("{}:{}", tok.line, tok.column),
            message: message.to_string(),
        }
    }

    /// A qualified-id path: `a::b::c`. Requires at least one identifier.
    pub(crate) fn parse_name_path(&mut self) -> Result<Vec<cxx_ast::Symbol>, ParseError> {
        let mut path = vec![self.consume_identifier()?];
        while self.at_punct("::") && self.peek_at(1).kind == TokenKind::Identifier {
            self.bump();
            path.push(self.consume_identifier()?);
        }
        Ok(path)
    }
}
