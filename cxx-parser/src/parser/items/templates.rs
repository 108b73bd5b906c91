//! `template<...> ...` item header, shared by free function templates,
//! member function templates, class templates, and alias templates. The
//! header itself (`parse_template_param_list`) lives in `helpers.rs`; this
//! module owns the optional trailing `requires` clause and the dispatch to
//! whichever item grammar follows.

use crate::parser::Parser;
use crate::ParseError;
use cxx_ast::{Access, DeclId, Symbol, TokenStream};

impl<'a, TS: TokenStream> Parser<'a, TS> {
    /// `template<params> [requires constraint] item`. `owner_class`/
    /// `class_name` are `Some` only when parsing a member template inside a
    /// class body; `None` at namespace/global scope.
    pub(crate) fn parse_template_item(
        &mut self,
        owner_namespace: &[Symbol],
        owner_class: Option<DeclId>,
        class_name: Option<Symbol>,
        access: Access,
    ) -> Result<DeclId, ParseError> {
        let template_params = self.parse_template_param_list()?;
        let constraint = if self.eat_keyword("requires") {
            Some(self.parse_logical_or()?)
        } else {
            None
        };

        if self.at_any_keyword(&["class", "struct", "union"]) {
            return self.parse_class(owner_namespace, template_params, constraint);
        }
        if self.at_keyword("using") {
            return self
                .parse_using_with_template_params(owner_namespace, template_params)?
                .ok_or_else(|| self.error("expected an alias-declaration after 'template<...>'"));
        }

        let ids = self.parse_function_or_variable(
            owner_namespace,
            owner_class,
            class_name,
            access,
            template_params,
            constraint,
        )?;
        ids.into_iter()
            .next()
            .ok_or_else(|| self.error("expected a function or variable template"))
    }
}
