//! `auto` and `decltype(...)`: the two C++ spellings for "a type resolved
//! later by the template/overload engine rather than written out".
//!
//! `cxx_ast::BaseTypeRef` has no dedicated `Decltype` variant (type
//! deduction for either spelling is sema's job, not the parser's); both
//! collapse to `BaseTypeRef::Auto` here, with the `decltype` operand parsed
//! and discarded since this core does not implement decltype's expression
//! type-deduction rules.

use super::super::Parser;
use crate::ParseError;
use cxx_ast::{BaseTypeRef, TokenStream};

impl<'a, TS: TokenStream> Parser<'a, TS> {
    pub(crate) fn try_parse_special_base(&mut self) -> Result<Option<BaseTypeRef>, ParseError> {
        if self.eat_keyword("auto") {
            return Ok(Some(BaseTypeRef::Auto));
        }
        if self.eat_keyword("decltype") {
            self.expect_punct("(")?;
            let _ = self.parse_expression()?;
            self.expect_punct(")")?;
            return Ok(Some(BaseTypeRef::Auto));
        }
        Ok(None)
    }
}
