//! Recursive-descent parser producing a `cxx_ast` declaration tree from any
//! `cxx_ast::TokenStream` implementation.

use thiserror::Error;

mod parser;
mod reentry;
pub use parser::{parse_translation_unit, parse_translation_unit_with_recovery, Parser, MAX_REENTRY_DEPTH};
pub use reentry::reparse_deferred_body;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Parse error at {location}: {message}")]
    SyntaxError { location: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxx_ast::{AstArena, Decl, Interner, VecTokenStream};

    #[test]
    fn parses_an_empty_translation_unit() {
        let interner = Interner::new();
        let arena = AstArena::new();
        let mut stream = VecTokenStream::new(
            cxx_tokens::tokenize("", cxx_ast::FileId(0), &interner).unwrap(),
        );
        let global = parse_translation_unit(&mut stream, &arena, &interner).unwrap();
        match arena.get(global) {
            Decl::Namespace(ns) => assert!(ns.items.borrow().is_empty()),
            _ => panic!("expected the global namespace"),
        }
    }

    #[test]
    fn parses_a_free_function_declaration() {
        let interner = Interner::new();
        let arena = AstArena::new();
        let mut stream = VecTokenStream::new(
            cxx_tokens::tokenize("int add(int a, int b) { return a + b; }", cxx_ast::FileId(0), &interner)
                .unwrap(),
        );
        let global = parse_translation_unit(&mut stream, &arena, &interner).unwrap();
        match arena.get(global) {
            Decl::Namespace(ns) => assert_eq!(ns.items.borrow().len(), 1),
            _ => panic!("expected the global namespace"),
        }
    }
}
