//! Pointer/reference declarators, array bounds, and cv-qualification: the
//! part of a C++ type-id that comes after the base type keyword.

use super::super::Parser;
use crate::ParseError;
use cxx_ast::{CvQual, PointerLevel, RefQualifier, TokenStream};

impl<'a, TS: TokenStream> Parser<'a, TS> {
    /// Accumulate leading or trailing `const`/`volatile`; callers call this
    /// both before and after the base-type keyword since C++ allows either
    /// order (`const int` and `int const` are equivalent).
    pub(crate) fn parse_cv(&mut self) -> CvQual {
        let mut cv = CvQual::default();
        loop {
            if self.eat_keyword("const") {
                cv.is_const = true;
            } else if self.eat_keyword("volatile") {
                cv.is_volatile = true;
            } else {
                break;
            }
        }
        cv
    }

    /// Zero or more `*`, each with its own trailing cv-qualification
    /// (`T * const *`).
    pub(crate) fn parse_pointer_levels(&mut self) -> Vec<PointerLevel> {
        let mut levels = Vec::new();
        while self.eat_punct("*") {
            levels.push(PointerLevel { cv: self.parse_cv() });
        }
        levels
    }

    /// At most one `&` (lvalue) or `&&` (rvalue/forwarding) reference
    /// qualifier; C++ does not allow stacking references.
    pub(crate) fn parse_reference_qualifier(&mut self) -> Option<RefQualifier> {
        if self.eat_punct("&&") {
            Some(RefQualifier::RValue)
        } else if self.eat_punct("&") {
            Some(RefQualifier::LValue)
        } else {
            None
        }
    }

    /// `[N]` or `[]` repeated after a declarator name, innermost dimension
    /// parsed last in source order and stored in that same order (so
    /// `array_dims.last()` is the innermost bound, matching the field's own
    /// doc comment).
    pub(crate) fn parse_array_dims(&mut self) -> Result<Vec<Option<u64>>, ParseError> {
        let mut dims = Vec::new();
        while self.eat_punct("[") {
            if self.eat_punct("]") {
                dims.push(None);
                continue;
            }
            let tok = self.peek();
            if tok.kind != cxx_ast::TokenKind::Literal {
                return Err(self.error("expected a constant array bound"));
            }
            let text = self.interner.resolve(tok.lexeme);
            let n: u64 = text
                .trim_end_matches(['u', 'U', 'l', 'L'])
                .parse()
                .map_err(|_| self.error("array bound is not an integer constant"))?;
            self.bump();
            self.expect_punct("]")?;
            dims.push(Some(n));
        }
        Ok(dims)
    }
}
