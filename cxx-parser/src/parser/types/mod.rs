//! Type-id parsing, organized the way `vex-parser` splits this concern:
//! - `primitives`: built-in arithmetic base types
//! - `complex`: pointers, references, arrays, cv-qualification
//! - `generics`: named/qualified types and explicit template-argument lists
//! - `special`: `auto` and `decltype`

mod complex;
mod generics;
mod primitives;
mod special;

use super::Parser;
use crate::ParseError;
use cxx_ast::{FunctionSig, TokenStream, TypeSpec};

impl<'a, TS: TokenStream> Parser<'a, TS> {
    /// Full type-id: `[cv] base [cv] declarator-operators`.
    pub(crate) fn parse_type(&mut self) -> Result<TypeSpec, ParseError> {
        let mut cv = self.parse_cv();
        self.eat_keyword("typename"); // dependent-type hint; resolved by sema.

        let base = if let Some(b) = self.try_parse_special_base()? {
            b
        } else if let Some(b) = self.try_parse_primitive_base() {
            b
        } else if self.at_identifier() {
            self.parse_named_base()?
        } else {
            return Err(self.error("expected a type"));
        };

        let trailing_cv = self.parse_cv();
        cv.is_const |= trailing_cv.is_const;
        cv.is_volatile |= trailing_cv.is_volatile;

        let template_args = if matches!(base, cxx_ast::BaseTypeRef::Named(_) | cxx_ast::BaseTypeRef::Qualified(_)) {
            self.try_parse_template_args()?
        } else {
            Vec::new()
        };

        let pointer_levels = self.parse_pointer_levels();
        let function_sig = self.try_parse_function_pointer_sig(&base, &pointer_levels)?;
        let reference = self.parse_reference_qualifier();
        let array_dims = self.parse_array_dims()?;

        Ok(TypeSpec {
            base,
            pointer_levels,
            reference,
            cv,
            bit_width: None,
            function_sig,
            template_args,
            array_dims,
        })
    }

    /// `ReturnType (*)(ParamTypes...)`: a pointer-to-function declarator,
    /// the one place `TypeSpec::function_sig` gets populated. Recognized
    /// only directly after at least one `*`, which is as far as this core
    /// goes into C's function-pointer declarator grammar (no
    /// pointer-to-pointer-to-function nesting, no abstract declarators).
    fn try_parse_function_pointer_sig(
        &mut self,
        base: &cxx_ast::BaseTypeRef,
        pointer_levels: &[cxx_ast::PointerLevel],
    ) -> Result<Option<FunctionSig>, ParseError> {
        if pointer_levels.is_empty() || !self.at_punct("(") {
            return Ok(None);
        }
        let save = self.stream.save();
        self.bump(); // '('
        if !self.eat_punct("*") {
            self.stream.restore(save);
            return Ok(None);
        }
        // an optional declarator name is allowed here (`(*fp)`); skip it.
        if self.at_identifier() {
            self.bump();
        }
        if !self.eat_punct(")") || !self.at_punct("(") {
            self.stream.restore(save);
            return Ok(None);
        }
        self.bump(); // '('
        let mut params = Vec::new();
        let mut is_variadic = false;
        if !self.at_punct(")") {
            loop {
                if self.eat_punct("...") {
                    is_variadic = true;
                    break;
                }
                params.push(self.parse_type()?);
                if !self.eat_punct(",") {
                    break;
                }
            }
        }
        self.expect_punct(")")?;
        let return_type = TypeSpec {
            base: base.clone(),
            pointer_levels: Vec::new(),
            reference: None,
            cv: cxx_ast::CvQual::default(),
            bit_width: None,
            function_sig: None,
            template_args: Vec::new(),
            array_dims: Vec::new(),
        };
        Ok(Some(FunctionSig {
            params,
            is_variadic,
            return_type: Box::new(return_type),
        }))
    }
}
