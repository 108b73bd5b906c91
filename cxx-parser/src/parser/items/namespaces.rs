//! `namespace Name { ... }`. Namespaces have no arena-stable identity of
//! their own across reopenings in this core — each `namespace Name { }`
//! block allocates its own `NamespaceDecl`, and anything inside it carries
//! the full `owner_namespace` path so later phases (symbol table, mangler)
//! can merge same-named namespaces by path rather than by `DeclId`.

use crate::parser::Parser;
use crate::ParseError;
use cxx_ast::{Decl, DeclId, NamespaceDecl, Symbol, TokenStream};
use std::cell::RefCell;

impl<'a, TS: TokenStream> Parser<'a, TS> {
    pub(crate) fn parse_namespace(&mut self, owner_namespace: &[Symbol]) -> Result<DeclId, ParseError> {
        self.expect_keyword("namespace")?;
        let name = self.consume_identifier()?;
        let (id, _) = self.arena.alloc_decl(Decl::Namespace(NamespaceDecl {
            name: Some(name),
            items: RefCell::new(Vec::new()),
        }));

        let mut nested_path = owner_namespace.to_vec();
        nested_path.push(name);

        self.expect_punct("{")?;
        while !self.at_punct("}") && !self.is_at_end() {
            let ids = self.parse_item(&nested_path)?;
            if let Decl::Namespace(ns) = self.arena.get(id) {
                ns.items.borrow_mut().extend(ids);
            }
        }
        self.expect_punct("}")?;
        Ok(id)
    }
}
