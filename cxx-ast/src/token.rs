//! Shape of the token stream produced by the (external) preprocessor and
//! tokenizer. The core never constructs tokens from raw source text itself;
//! it only consumes a `TokenStream` implementation handed to it by the
//! driver collaborator.

use crate::intern::Symbol;
use serde::{Deserialize, Serialize};

/// Coarse token classification used by the lexer and parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Literal,
    Operator,
    Punctuator,
    Eof,
}

/// A file within the translation unit's `#include` closure. Files are
/// interned the same way identifiers are, so a `FileId` is cheap to carry
/// around on every token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub u32);

/// Immutable token record, `{kind, lexeme-handle, line, column, file-index}`
/// verbatim so later phases can recover the exact source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: Symbol,
    pub line: u32,
    pub column: u32,
    pub file: FileId,
}

impl Token {
    pub fn eof(file: FileId, line: u32, column: u32, empty_lexeme: Symbol) -> Self {
        Self {
            kind: TokenKind::Eof,
            lexeme: empty_lexeme,
            line,
            column,
            file,
        }
    }
}

/// An index into a token stream, captured so a later phase (principally the
/// template engine) can re-parse a range. This is deliberately a plain
/// integer rather than an iterator: cheap to store in a `TemplateDescriptor`,
/// cheap to compare, and trivially `Copy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SaveHandle(pub u32);

/// A contiguous, saved range of the token stream: `(file, begin, end)`.
/// Template descriptors store this instead of raw iterator state, so a
/// deferred re-parse only needs this handle, not a live borrow of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenRange {
    pub file: FileId,
    pub begin: SaveHandle,
    pub end: SaveHandle,
}

/// The external collaborator's interface: a finite, once-consumed sequence
/// of tokens with save/restore positions. The core depends only on this
/// trait; preprocessing, macro expansion, and raw lexing live outside it.
pub trait TokenStream {
    fn peek(&self, offset: usize) -> Token;
    fn save(&self) -> SaveHandle;
    fn restore(&mut self, handle: SaveHandle);
    /// Advance one token and return the token that was current before the
    /// advance (i.e. the token being consumed).
    fn bump(&mut self) -> Token;
    fn is_at_end(&self) -> bool;
}

/// A simple in-memory `TokenStream` over a pre-tokenized `Vec<Token>`, used
/// by the parser's own test fixtures and by `cxx-driver`'s `emit-ast`
/// debugging path when no real tokenizer collaborator is wired in. This is
/// not the production tokenizer (which is out of scope); it exists only so
/// the rest of the pipeline is independently testable.
#[derive(Debug, Clone)]
pub struct VecTokenStream {
    tokens: Vec<Token>,
    cursor: usize,
}

impl VecTokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, cursor: 0 }
    }
}

impl TokenStream for VecTokenStream {
    fn peek(&self, offset: usize) -> Token {
        let idx = (self.cursor + offset).min(self.tokens.len() - 1);
        self.tokens[idx]
    }

    fn save(&self) -> SaveHandle {
        SaveHandle(self.cursor as u32)
    }

    fn restore(&mut self, handle: SaveHandle) {
        self.cursor = handle.0 as usize;
    }

    fn bump(&mut self) -> Token {
        let tok = self.peek(0);
        if !self.is_at_end() {
            self.cursor += 1;
        }
        tok
    }

    fn is_at_end(&self) -> bool {
        self.cursor + 1 >= self.tokens.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interner;

    #[test]
    fn save_restore_round_trips_cursor() {
        let interner = Interner::new();
        let sym = interner.intern("x");
        let file = FileId(0);
        let toks = vec![
            Token { kind: TokenKind::Identifier, lexeme: sym, line: 1, column: 1, file },
            Token { kind: TokenKind::Identifier, lexeme: sym, line: 1, column: 2, file },
            Token::eof(file, 1, 3, sym),
        ];
        let mut stream = VecTokenStream::new(toks);
        let start = stream.save();
        stream.bump();
        stream.bump();
        assert!(stream.is_at_end());
        stream.restore(start);
        assert!(!stream.is_at_end());
    }
}
