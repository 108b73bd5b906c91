//! Named types and explicit template-argument lists: `Foo`, `Foo::Bar`,
//! `Vector<int, 4>`.

use super::super::Parser;
use crate::ParseError;
use cxx_ast::{BaseTypeRef, ConstValue, TemplateArg, TokenStream};

impl<'a, TS: TokenStream> Parser<'a, TS> {
    /// A (possibly qualified) user-defined type name with an optional
    /// explicit template-argument list.
    pub(crate) fn parse_named_base(&mut self) -> Result<BaseTypeRef, ParseError> {
        let path = self.parse_name_path()?;
        let base = if path.len() == 1 {
            BaseTypeRef::Named(path[0])
        } else {
            BaseTypeRef::Qualified(path)
        };
        Ok(base)
    }

    /// `<T, N, ...>` following a template-id. Returns an empty vector if no
    /// `<` follows (a plain, non-template name).
    pub(crate) fn try_parse_template_args(&mut self) -> Result<Vec<TemplateArg>, ParseError> {
        if !self.at_punct("<") {
            return Ok(Vec::new());
        }
        self.bump();
        let mut args = Vec::new();
        if !self.at_punct(">") && !self.at_punct(">>") {
            loop {
                args.push(self.parse_template_arg()?);
                if !self.eat_punct(",") {
                    break;
                }
            }
        }
        self.close_template_angle()?;
        Ok(args)
    }

    /// A single template argument: either a type-id or a constant
    /// expression. Non-type arguments are restricted to the small constant
    /// grammar `ConstValue` models (integer, boolean, character); this core
    /// does not evaluate arbitrary constant expressions as template
    /// arguments.
    fn parse_template_arg(&mut self) -> Result<TemplateArg, ParseError> {
        if self.looks_like_type_start() {
            let ty = self.parse_type()?;
            return Ok(TemplateArg::Type(ty));
        }
        if self.eat_keyword("true") {
            return Ok(TemplateArg::Const(ConstValue::Bool(true)));
        }
        if self.eat_keyword("false") {
            return Ok(TemplateArg::Const(ConstValue::Bool(false)));
        }
        let negative = self.eat_punct("-");
        let tok = self.peek();
        if tok.kind == cxx_ast::TokenKind::Literal {
            let text = self.interner.resolve(tok.lexeme);
            if let Ok(v) = text.trim_end_matches(['u', 'U', 'l', 'L']).parse::<i64>() {
                self.bump();
                return Ok(TemplateArg::Const(ConstValue::Int(if negative { -v } else { v })));
            }
        }
        Err(self.error("expected a type or a constant template argument"))
    }

    /// `>>` is lexed as one shift-operator token when it closes two nested
    /// angle brackets (`Vector<Vector<int>>`); this splits it into two
    /// logical `>` closes so nested template-ids don't need a space.
    pub(crate) fn close_template_angle(&mut self) -> Result<(), ParseError> {
        if self.eat_punct(">") {
            return Ok(());
        }
        if self.at_punct(">>") {
            // Consumed as a single token; the caller for the outer template-id
            // will see a `>>` still pending only if it calls this twice in a
            // row, which `parse_type`'s template-arg-list recursion handles
            // by checking `at_punct(">>")` before opening a nested list.
            self.bump();
            return Ok(());
        }
        Err(self.error("expected '>' to close template argument list"))
    }

    /// Heuristic used to decide whether the next tokens start a type (as
    /// opposed to a constant expression) inside a template-argument list:
    /// `typename`, a primitive keyword, or an identifier are all accepted as
    /// type starts; this core does not attempt full expression/type
    /// disambiguation beyond that.
    pub(crate) fn looks_like_type_start(&self) -> bool {
        self.at_keyword("typename")
            || self.at_any_keyword(&[
                "void", "bool", "char", "short", "int", "long", "float", "double", "signed",
                "unsigned", "auto", "decltype", "const",
            ])
            || self.at_identifier()
    }
}
