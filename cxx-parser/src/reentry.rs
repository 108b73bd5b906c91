//! The template engine's hook back into the parser: re-parses a function
//! body saved earlier by [`items::functions::skip_function_body`] once
//! concrete template arguments are known. This is the only place a phase
//! downstream of parsing ever drives a `TokenStream` directly.

use crate::parser::{Parser, MAX_REENTRY_DEPTH};
use crate::ParseError;
use cxx_ast::{AstArena, Block, Interner, TokenRange, TokenStream};

/// Re-enters `stream` at `range.begin`, parses one `{ ... }` body with a
/// fresh [`Parser`], and restores the stream's original cursor before
/// returning — success or failure. `depth` is the caller's current
/// instantiation-recursion count (e.g. `SemaContext::reentry_depth`); it is
/// checked against [`MAX_REENTRY_DEPTH`] up front and never mutated here,
/// since bounding recursion across nested instantiations is the caller's
/// responsibility (this call itself is always exactly one reparse).
pub fn reparse_deferred_body<TS: TokenStream>(
    stream: &mut TS,
    arena: &AstArena,
    interner: &Interner,
    range: TokenRange,
    depth: u32,
) -> Result<Block, ParseError> {
    if depth >= MAX_REENTRY_DEPTH {
        return Err(ParseError::SyntaxError {
            location: format!("file#{}", range.file.0),
            message: format!("template instantiation recursion exceeded {MAX_REENTRY_DEPTH} levels"),
        });
    }
    let outer = stream.save();
    stream.restore(range.begin);
    let mut parser = Parser::new(stream, arena, interner);
    parser.reentry_depth = depth + 1;
    let result = parser.parse_block();
    stream.restore(outer);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_translation_unit;
    use cxx_ast::{Decl, VecTokenStream};

    fn body_range(source: &str) -> (TokenRange, AstArena, Interner) {
        let interner = Interner::new();
        let arena = AstArena::new();
        let tokens = cxx_tokens::tokenize(source, cxx_ast::FileId(0), &interner).expect("tokenize");
        let mut stream = VecTokenStream::new(tokens);
        let global = parse_translation_unit(&mut stream, &arena, &interner).expect("parse");
        let func_id = match arena.get(global) {
            Decl::Namespace(ns) => ns.items.borrow()[0],
            _ => unreachable!(),
        };
        let func = arena.get(func_id).as_function().expect("a function");
        (func.body_tokens.expect("template body is deferred"), arena, interner)
    }

    #[test]
    fn reparses_a_deferred_template_body_into_a_real_block() {
        let (range, arena, interner) = body_range("template<typename T> T identity(T x) { return x; }");
        let mut tokens = cxx_tokens::tokenize("template<typename T> T identity(T x) { return x; }", cxx_ast::FileId(0), &interner).expect("tokenize");
        let mut stream = VecTokenStream::new(std::mem::take(&mut tokens));
        let block = reparse_deferred_body(&mut stream, &arena, &interner, range, 0).expect("reparse");
        assert_eq!(block.stmts.len(), 1);
    }

    #[test]
    fn refuses_to_reenter_past_the_recursion_limit() {
        let (range, arena, interner) = body_range("template<typename T> T identity(T x) { return x; }");
        let mut tokens = cxx_tokens::tokenize("template<typename T> T identity(T x) { return x; }", cxx_ast::FileId(0), &interner).expect("tokenize");
        let mut stream = VecTokenStream::new(std::mem::take(&mut tokens));
        let result = reparse_deferred_body(&mut stream, &arena, &interner, range, MAX_REENTRY_DEPTH);
        assert!(result.is_err());
    }
}
