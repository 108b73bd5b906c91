//! Error recovery: collect diagnostics for every malformed item instead of
//! stopping at the first one, by skipping forward to the next item
//! boundary (a top-level keyword at brace depth zero) and resuming there.

use super::Parser;
use crate::ParseError;
use cxx_ast::{AstArena, Decl, DeclId, Interner, NamespaceDecl, TokenStream};
use cxx_diagnostics::{error_codes, Diagnostic, DiagnosticEngine, Span};
use std::cell::RefCell;

/// Caps the recovery scan so a pathologically unbalanced brace nest (runaway
/// `{` with no matching `}`) can't spin forever.
const RECOVERY_MAX_STEPS: usize = 1_000_000;

/// Item-boundary keywords: anything that can start a namespace-scope item,
/// used to resynchronize after a parse error.
const ITEM_BOUNDARY_KEYWORDS: &[&str] = &[
    "namespace", "template", "class", "struct", "union", "enum", "using", "typedef",
];

/// Parses a whole translation unit, collecting a diagnostic per malformed
/// item and recovering to the next one rather than aborting. Always returns
/// the (possibly partial) global namespace; check `DiagnosticEngine::
/// has_errors` to know whether the tree is complete.
pub fn parse_translation_unit_with_recovery<TS: TokenStream>(
    stream: &mut TS,
    arena: &AstArena,
    interner: &Interner,
) -> (DeclId, DiagnosticEngine) {
    let mut diagnostics = DiagnosticEngine::new();
    let (global_id, _) = arena.alloc_decl(Decl::Namespace(NamespaceDecl {
        name: None,
        items: RefCell::new(Vec::new()),
    }));

    let mut parser = Parser::new(stream, arena, interner);
    while !parser.is_at_end() {
        match parser.parse_item(&[]) {
            Ok(ids) => {
                if let Decl::Namespace(ns) = arena.get(global_id) {
                    ns.items.borrow_mut().extend(ids);
                }
            }
            Err(err) => {
                diagnostics.emit(parser.error_to_diagnostic(&err));
                parser.recover_to_next_item();
            }
        }
    }
    (global_id, diagnostics)
}

impl<'a, TS: TokenStream> Parser<'a, TS> {
    pub(crate) fn error_to_diagnostic(&self, err: &ParseError) -> Diagnostic {
        let ParseError::SyntaxError { message, .. } = err;
        Diagnostic::error(error_codes::SYNTAX_ERROR, message.clone(), self.current_span())
    }

    fn current_span(&self) -> Span {
        let tok = self.peek();
        Span::new(format!("file#{}", tok.file.0), tok.line as usize, tok.column as usize, 1)
    }

    /// Skips tokens until an item-boundary keyword is seen at brace depth
    /// zero, or end of input. Consumes a top-level `;` along the way so a
    /// single missing semicolon doesn't get attributed to the next item.
    pub(crate) fn recover_to_next_item(&mut self) {
        let mut depth = 0u32;
        let mut steps = 0usize;
        while !self.is_at_end() {
            steps += 1;
            if steps > RECOVERY_MAX_STEPS {
                self.bump();
                return;
            }
            if depth == 0 && self.at_any_keyword(ITEM_BOUNDARY_KEYWORDS) {
                return;
            }
            if self.at_punct("{") {
                depth += 1;
                self.bump();
                continue;
            }
            if self.at_punct("}") {
                if depth == 0 {
                    self.bump();
                    return;
                }
                depth -= 1;
                self.bump();
                if depth == 0 {
                    return;
                }
                continue;
            }
            if depth == 0 && self.eat_punct(";") {
                return;
            }
            self.bump();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxx_ast::{AstArena, Interner, VecTokenStream};

    #[test]
    fn recovers_past_a_malformed_item_and_keeps_the_next_one() {
        let interner = Interner::new();
        let arena = AstArena::new();
        let mut stream = VecTokenStream::new(
            cxx_tokens::tokenize(
                "int broken(( ; int add(int a, int b) { return a + b; }",
                cxx_ast::FileId(0),
                &interner,
            )
            .unwrap(),
        );
        let (global, diagnostics) = parse_translation_unit_with_recovery(&mut stream, &arena, &interner);
        assert!(diagnostics.has_errors());
        match arena.get(global) {
            Decl::Namespace(ns) => assert_eq!(ns.items.borrow().len(), 1),
            _ => panic!("expected the global namespace"),
        }
    }
}
