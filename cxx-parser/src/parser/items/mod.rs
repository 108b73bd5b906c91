//! Item grammar: namespaces, classes/structs/unions, enums, aliases,
//! templates, and the shared function/variable declaration path. This
//! module owns the top-level entry point (`parse_translation_unit`) and the
//! `parse_item` dispatcher every nested scope (namespace body, template
//! item) funnels through.

mod aliases;
mod classes;
mod enums;
mod functions;
mod helpers;
mod namespaces;
mod templates;

use super::Parser;
use crate::ParseError;
use cxx_ast::{Access, AstArena, Decl, DeclId, Interner, NamespaceDecl, Symbol, TokenStream};
use std::cell::RefCell;

/// Parses an entire translation unit into the arena's anonymous global
/// namespace and returns its `DeclId`.
pub fn parse_translation_unit<TS: TokenStream>(
    stream: &mut TS,
    arena: &AstArena,
    interner: &Interner,
) -> Result<DeclId, ParseError> {
    let (global_id, _) = arena.alloc_decl(Decl::Namespace(NamespaceDecl {
        name: None,
        items: RefCell::new(Vec::new()),
    }));

    let mut parser = Parser::new(stream, arena, interner);
    while !parser.is_at_end() {
        let ids = parser.parse_item(&[])?;
        if let Decl::Namespace(ns) = arena.get(global_id) {
            ns.items.borrow_mut().extend(ids);
        }
    }
    Ok(global_id)
}

impl<'a, TS: TokenStream> Parser<'a, TS> {
    /// Parses one top-level or namespace-scope item. May yield more than one
    /// `DeclId` for a comma-separated variable declaration (`int a, b;`), or
    /// none for a stray `;` or an unmodeled `using namespace X;`.
    pub(crate) fn parse_item(&mut self, owner_namespace: &[Symbol]) -> Result<Vec<DeclId>, ParseError> {
        if self.eat_punct(";") {
            return Ok(Vec::new());
        }
        if self.at_keyword("namespace") {
            return Ok(vec![self.parse_namespace(owner_namespace)?]);
        }
        if self.at_keyword("template") {
            return Ok(vec![self.parse_template_item(owner_namespace, None, None, Access::Public)?]);
        }
        if self.at_any_keyword(&["class", "struct", "union"]) {
            return Ok(vec![self.parse_class(owner_namespace, Vec::new(), None)?]);
        }
        if self.at_keyword("enum") {
            return Ok(vec![self.parse_enum(owner_namespace)?]);
        }
        if self.at_keyword("using") {
            return Ok(self.parse_using(owner_namespace)?.into_iter().collect());
        }
        if self.at_keyword("typedef") {
            return Ok(vec![self.parse_typedef(owner_namespace)?]);
        }
        self.parse_function_or_variable(owner_namespace, None, None, Access::Public, Vec::new(), None)
    }
}
