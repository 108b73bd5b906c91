//! `using Name = Type;` (alias declarations, including alias templates) and
//! the older `typedef Type Name;` form. `using namespace X;` and
//! inherited-constructor `using Base::ctor;` declarations are not modeled;
//! they are skipped to their terminating `;` and contribute no declaration.

use crate::parser::Parser;
use crate::ParseError;
use cxx_ast::{Decl, DeclId, Symbol, TemplateParam, TokenStream, TypeAliasDecl};

impl<'a, TS: TokenStream> Parser<'a, TS> {
    /// Top-level entry point for a bare `using ...;`, with no enclosing
    /// `template<...>` header. Returns `None` for the forms this core
    /// doesn't model as declarations.
    pub(crate) fn parse_using(&mut self, owner_namespace: &[Symbol]) -> Result<Option<DeclId>, ParseError> {
        self.parse_using_with_template_params(owner_namespace, Vec::new())
    }

    pub(crate) fn parse_using_with_template_params(
        &mut self,
        owner_namespace: &[Symbol],
        template_params: Vec<TemplateParam>,
    ) -> Result<Option<DeclId>, ParseError> {
        self.expect_keyword("using")?;
        if self.eat_keyword("namespace") {
            self.skip_to_semicolon();
            return Ok(None);
        }
        let name = self.consume_identifier()?;
        if !self.eat_punct("=") {
            // `using Base::member;` or similar: not an alias declaration.
            self.skip_to_semicolon();
            return Ok(None);
        }
        let aliased = self.parse_type()?;
        self.expect_punct(";")?;
        let (id, _) = self.arena.alloc_decl(Decl::TypeAlias(TypeAliasDecl {
            name,
            owner_namespace: owner_namespace.to_vec(),
            template_params,
            aliased,
        }));
        Ok(Some(id))
    }

    /// `typedef Type Name;`. Unlike `using`, this form always denotes an
    /// alias declaration.
    pub(crate) fn parse_typedef(&mut self, owner_namespace: &[Symbol]) -> Result<DeclId, ParseError> {
        self.expect_keyword("typedef")?;
        let aliased = self.parse_type()?;
        let name = self.consume_identifier()?;
        self.expect_punct(";")?;
        let (id, _) = self.arena.alloc_decl(Decl::TypeAlias(TypeAliasDecl {
            name,
            owner_namespace: owner_namespace.to_vec(),
            template_params: Vec::new(),
            aliased,
        }));
        Ok(id)
    }

    fn skip_to_semicolon(&mut self) {
        while !self.at_punct(";") && !self.is_at_end() {
            self.bump();
        }
        self.eat_punct(";");
    }
}
