//! Statement grammar: the full `Stmt` enum, including `if`/`while`/`do`/
//! `for`/range-`for`/`switch`, `try`/`catch`, and the `__try`/`__except`/
//! `__finally` Windows SEH forms.

use super::Parser;
use crate::ParseError;
use cxx_ast::{Block, CatchClause, LocalVarDecl, Stmt, SwitchCase, SwitchLabel, TokenStream};

impl<'a, TS: TokenStream> Parser<'a, TS> {
    /// `{ stmt... }`, consuming both braces.
    pub(crate) fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.expect_punct("{")?;
        let stmts = self.parse_block_stmts()?;
        Ok(Block { stmts })
    }

    /// The statement sequence up to (and including) a closing brace. Callers
    /// that already consumed the opening brace themselves (a lambda body
    /// that needed its position for something else first) call this
    /// directly instead of `parse_block`.
    pub(crate) fn parse_block_stmts(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        while !self.at_punct("}") && !self.is_at_end() {
            stmts.push(self.parse_statement()?);
        }
        self.expect_punct("}")?;
        Ok(stmts)
    }

    pub(crate) fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        if self.at_punct("{") {
            return Ok(Stmt::Block(self.parse_block()?));
        }
        if self.eat_punct(";") {
            return Ok(Stmt::Empty);
        }
        if self.eat_keyword("if") {
            return self.parse_if();
        }
        if self.eat_keyword("while") {
            return self.parse_while();
        }
        if self.eat_keyword("do") {
            return self.parse_do_while();
        }
        if self.eat_keyword("for") {
            return self.parse_for();
        }
        if self.eat_keyword("return") {
            let value = if self.at_punct(";") { None } else { Some(self.parse_expression()?) };
            self.expect_punct(";")?;
            return Ok(Stmt::Return(value));
        }
        if self.eat_keyword("break") {
            self.expect_punct(";")?;
            return Ok(Stmt::Break);
        }
        if self.eat_keyword("continue") {
            self.expect_punct(";")?;
            return Ok(Stmt::Continue);
        }
        if self.eat_keyword("switch") {
            return self.parse_switch();
        }
        if self.eat_keyword("try") {
            return self.parse_try();
        }
        if self.eat_keyword("__try") {
            return self.parse_seh_try();
        }
        if self.looks_like_local_var_decl() {
            return self.parse_local_var_decl_stmt();
        }
        let expr = self.parse_expression()?;
        self.expect_punct(";")?;
        Ok(Stmt::Expr(expr))
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.expect_punct("(")?;
        let init = if self.looks_like_local_var_decl() {
            Some(Box::new(self.parse_local_var_decl_stmt()?))
        } else {
            None
        };
        let cond = self.parse_expression()?;
        self.expect_punct(")")?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.eat_keyword("else") {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If { init, cond, then_branch, else_branch })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        self.expect_punct("(")?;
        let cond = self.parse_expression()?;
        self.expect_punct(")")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::While { cond, body })
    }

    fn parse_do_while(&mut self) -> Result<Stmt, ParseError> {
        let body = Box::new(self.parse_statement()?);
        self.expect_keyword("while")?;
        self.expect_punct("(")?;
        let cond = self.parse_expression()?;
        self.expect_punct(")")?;
        self.expect_punct(";")?;
        Ok(Stmt::DoWhile { body, cond })
    }

    /// C-style `for` and range-`for` share the same `for (` prefix; they are
    /// disambiguated by whether a `:` follows a single declared binding.
    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        self.expect_punct("(")?;
        if self.looks_like_local_var_decl() {
            let save = self.stream.save();
            let ty = self.parse_type()?;
            let name = self.consume_identifier()?;
            if self.eat_punct(":") {
                let range = self.parse_expression()?;
                self.expect_punct(")")?;
                let body = Box::new(self.parse_statement()?);
                return Ok(Stmt::RangeFor {
                    init: None,
                    binding: name,
                    binding_ty: Some(ty),
                    range,
                    body,
                });
            }
            self.stream.restore(save);
        }

        let init = if self.eat_punct(";") {
            None
        } else if self.looks_like_local_var_decl() {
            Some(Box::new(self.parse_local_var_decl_stmt()?))
        } else {
            let e = self.parse_expression()?;
            self.expect_punct(";")?;
            Some(Box::new(Stmt::Expr(e)))
        };
        let cond = if self.at_punct(";") { None } else { Some(self.parse_expression()?) };
        self.expect_punct(";")?;
        let step = if self.at_punct(")") { None } else { Some(self.parse_expression()?) };
        self.expect_punct(")")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::For { init, cond, step, body })
    }

    fn parse_switch(&mut self) -> Result<Stmt, ParseError> {
        self.expect_punct("(")?;
        let cond = self.parse_expression()?;
        self.expect_punct(")")?;
        self.expect_punct("{")?;
        let mut cases = Vec::new();
        while !self.at_punct("}") && !self.is_at_end() {
            let mut labels = vec![self.parse_switch_label()?];
            while self.at_any_keyword(&["case", "default"]) {
                labels.push(self.parse_switch_label()?);
            }
            let mut stmts = Vec::new();
            while !self.at_any_keyword(&["case", "default"]) && !self.at_punct("}") && !self.is_at_end() {
                stmts.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { labels, stmts });
        }
        self.expect_punct("}")?;
        Ok(Stmt::Switch { cond, cases })
    }

    fn parse_switch_label(&mut self) -> Result<SwitchLabel, ParseError> {
        if self.eat_keyword("case") {
            let value = self.parse_const_value()?;
            self.expect_punct(":")?;
            return Ok(SwitchLabel::Case(value));
        }
        self.expect_keyword("default")?;
        self.expect_punct(":")?;
        Ok(SwitchLabel::Default)
    }

    /// Case labels are restricted to the literal spellings `ConstValue`
    /// models directly (int/uint/bool/char); a named enumerator in a case
    /// label is resolved by sema from the constant-folded expression, not
    /// by the parser.
    fn parse_const_value(&mut self) -> Result<cxx_ast::ConstValue, ParseError> {
        use cxx_ast::ConstValue;
        if self.eat_keyword("true") {
            return Ok(ConstValue::Bool(true));
        }
        if self.eat_keyword("false") {
            return Ok(ConstValue::Bool(false));
        }
        let negative = self.eat_punct("-");
        let tok = self.peek();
        if tok.kind == cxx_ast::TokenKind::Literal {
            let text = self.interner.resolve(tok.lexeme);
            if text.starts_with('\'') {
                self.bump();
                let stripped = text.trim_start_matches('\'').trim_end_matches('\'');
                return Ok(ConstValue::Char(stripped.chars().next().unwrap_or('\0')));
            }
            let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
            if let Ok(v) = digits.parse::<i64>() {
                self.bump();
                return Ok(ConstValue::Int(if negative { -v } else { v }));
            }
        }
        Err(self.error("expected a literal constant in case label"))
    }

    fn parse_try(&mut self) -> Result<Stmt, ParseError> {
        let body = self.parse_block()?;
        let mut handlers = Vec::new();
        while self.eat_keyword("catch") {
            self.expect_punct("(")?;
            let param = if self.eat_punct("...") {
                None
            } else {
                let ty = self.parse_type()?;
                let name = if self.at_identifier() {
                    self.consume_identifier()?
                } else {
                    self.interner.intern("")
                };
                Some((name, ty))
            };
            self.expect_punct(")")?;
            let handler_body = self.parse_block()?;
            handlers.push(CatchClause { param, body: handler_body });
        }
        Ok(Stmt::Try { body, handlers })
    }

    fn parse_seh_try(&mut self) -> Result<Stmt, ParseError> {
        let body = self.parse_block()?;
        let except = if self.eat_keyword("__except") {
            self.expect_punct("(")?;
            let filter = self.parse_expression()?;
            self.expect_punct(")")?;
            let handler = self.parse_block()?;
            Some((filter, handler))
        } else {
            None
        };
        let finally = if self.eat_keyword("__finally") { Some(self.parse_block()?) } else { None };
        Ok(Stmt::SehTry { body, except, finally })
    }

    /// A local variable declaration starts with a type-id; this peeks ahead
    /// far enough to tell it apart from an expression statement that merely
    /// begins with an identifier (e.g. a function call or assignment).
    pub(crate) fn looks_like_local_var_decl(&self) -> bool {
        if self.at_any_keyword(&[
            "void", "bool", "char", "short", "int", "long", "float", "double", "signed",
            "unsigned", "auto", "decltype", "const", "static", "volatile",
        ]) {
            return true;
        }
        if !self.at_identifier() {
            return false;
        }
        let mut offset = 1;
        while self.peek_at(offset).kind == cxx_ast::TokenKind::Punctuator
            && &*self.interner.resolve(self.peek_at(offset).lexeme) == "::"
        {
            offset += 1;
            if self.peek_at(offset).kind != cxx_ast::TokenKind::Identifier {
                return false;
            }
            offset += 1;
        }
        let next = self.peek_at(offset);
        next.kind == cxx_ast::TokenKind::Identifier
            || (next.kind == cxx_ast::TokenKind::Punctuator
                && matches!(&*self.interner.resolve(next.lexeme), "*" | "&" | "&&"))
    }

    fn parse_local_var_decl_stmt(&mut self) -> Result<Stmt, ParseError> {
        let ty = self.parse_type()?;
        let mut decls = Vec::new();
        loop {
            let name = self.consume_identifier()?;
            let init = if self.eat_punct("=") {
                Some(self.parse_assignment()?)
            } else if self.at_punct("(") || self.at_punct("{") {
                Some(self.parse_braced_or_paren_init()?)
            } else {
                None
            };
            decls.push(LocalVarDecl { name, ty: ty.clone(), init });
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(";")?;
        Ok(Stmt::LocalVar(decls))
    }

    pub(crate) fn parse_braced_or_paren_init(&mut self) -> Result<cxx_ast::Expr, ParseError> {
        let close = if self.eat_punct("(") {
            ")"
        } else {
            self.expect_punct("{")?;
            "}"
        };
        let mut elems = Vec::new();
        if !self.at_punct(close) {
            loop {
                elems.push(self.parse_assignment()?);
                if !self.eat_punct(",") {
                    break;
                }
            }
        }
        self.expect_punct(close)?;
        Ok(cxx_ast::Expr::InitializerList(elems))
    }
}
