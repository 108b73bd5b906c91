//! Lexical fixture tokenizer for the C++ subset this workspace's core
//! crates operate on.
//!
//! Preprocessing, tokenizing, and file I/O form the unglamorous first phase
//! a from-scratch C++ compiler needs.
//! Non-goal: the core (`cxx-parser` onward) consumes a finite
//! [`cxx_ast::TokenStream`] handed to it by an external collaborator and
//! never lexes raw source itself. This crate is that collaborator's
//! stand-in for tests and for `cxx-driver`'s `emit-tokens` debug path --
//! a real preprocessor (macro expansion, `#include` resolution) is out of
//! scope, but something has to turn `.cpp` text into a `Vec<cxx_ast::Token>`
//! for the test suite and the CLI to exercise the rest of the pipeline
//! against real-looking source.
//!
//! Built the same way `vex-lexer` builds its token stream: a `logos`
//! derive enum plus a thin iterator wrapper, carried over unchanged as the
//! lexing approach and retargeted at C++ lexical grammar.

use cxx_ast::{FileId, Interner, Symbol, Token, TokenKind};
use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum RawToken {
    // ---- keywords -------------------------------------------------
    #[token("class")] Class,
    #[token("struct")] Struct,
    #[token("union")] Union,
    #[token("enum")] Enum,
    #[token("namespace")] Namespace,
    #[token("using")] Using,
    #[token("typedef")] Typedef,
    #[token("template")] Template,
    #[token("typename")] Typename,
    #[token("requires")] Requires,
    #[token("concept")] Concept,
    #[token("public")] Public,
    #[token("private")] Private,
    #[token("protected")] Protected,
    #[token("virtual")] Virtual,
    #[token("override")] Override,
    #[token("final")] Final,
    #[token("const")] Const,
    #[token("volatile")] Volatile,
    #[token("static")] Static,
    #[token("explicit")] Explicit,
    #[token("noexcept")] Noexcept,
    #[token("mutable")] Mutable,
    #[token("friend")] Friend,
    #[token("inline")] Inline,
    #[token("constexpr")] Constexpr,
    #[token("consteval")] Consteval,
    #[token("if")] If,
    #[token("else")] Else,
    #[token("while")] While,
    #[token("do")] Do,
    #[token("for")] For,
    #[token("switch")] Switch,
    #[token("case")] Case,
    #[token("default")] Default,
    #[token("break")] Break,
    #[token("continue")] Continue,
    #[token("return")] Return,
    #[token("goto")] Goto,
    #[token("true")] True,
    #[token("false")] False,
    #[token("nullptr")] Nullptr,
    #[token("this")] This,
    #[token("new")] New,
    #[token("delete")] Delete,
    #[token("sizeof")] Sizeof,
    #[token("try")] Try,
    #[token("catch")] Catch,
    #[token("throw")] Throw,
    #[token("operator")] Operator,
    #[token("auto")] Auto,
    #[token("decltype")] Decltype,
    #[token("void")] Void,
    #[token("bool")] Bool,
    #[token("char")] Char,
    #[token("short")] Short,
    #[token("int")] Int,
    #[token("long")] Long,
    #[token("float")] Float,
    #[token("double")] Double,
    #[token("signed")] Signed,
    #[token("unsigned")] Unsigned,

    // ---- punctuation / operators -----------------------------------
    #[token("::")] ColonColon,
    #[token("...")] Ellipsis,
    #[token("->")] Arrow,
    #[token(".")] Dot,
    #[token(",")] Comma,
    #[token(";")] Semicolon,
    #[token(":")] Colon,
    #[token("(")] LParen,
    #[token(")")] RParen,
    #[token("{")] LBrace,
    #[token("}")] RBrace,
    #[token("[")] LBracket,
    #[token("]")] RBracket,
    #[token("<=>")] Spaceship,
    #[token("==")] EqEq,
    #[token("!=")] NotEq,
    #[token("<=")] LtEq,
    #[token(">=")] GtEq,
    #[token("&&")] AndAnd,
    #[token("||")] OrOr,
    #[token("<<=")] ShlEq,
    #[token(">>=")] ShrEq,
    #[token("<<")] Shl,
    #[token(">>")] Shr,
    #[token("<")] Lt,
    #[token(">")] Gt,
    #[token("++")] PlusPlus,
    #[token("--")] MinusMinus,
    #[token("+=")] PlusEq,
    #[token("-=")] MinusEq,
    #[token("*=")] StarEq,
    #[token("/=")] SlashEq,
    #[token("%=")] PercentEq,
    #[token("&=")] AmpEq,
    #[token("|=")] PipeEq,
    #[token("^=")] CaretEq,
    #[token("=")] Eq,
    #[token("+")] Plus,
    #[token("-")] Minus,
    #[token("*")] Star,
    #[token("/")] Slash,
    #[token("%")] Percent,
    #[token("&")] Amp,
    #[token("|")] Pipe,
    #[token("^")] Caret,
    #[token("~")] Tilde,
    #[token("!")] Bang,
    #[token("?")] Question,

    // ---- literals ---------------------------------------------------
    #[regex(r"0[xX][0-9a-fA-F]+[uUlL]*", |lex| lex.slice().to_string())]
    HexLiteral(String),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?[fFlL]?", |lex| lex.slice().to_string())]
    FloatLiteral(String),

    #[regex(r"[0-9]+[uUlL]*", |lex| lex.slice().to_string())]
    IntLiteral(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice().to_string())]
    StringLiteral(String),

    #[regex(r"'([^'\\]|\\.)'", |lex| lex.slice().to_string())]
    CharLiteral(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*([^*]|\*[^/])*\*/", logos::skip)]
    BlockComment,

    #[regex(r"#[^\n]*", logos::skip)]
    PreprocessorDirective,
}

impl RawToken {
    /// Coarse classification used to populate `cxx_ast::TokenKind`.
    fn kind(&self) -> TokenKind {
        use RawToken::*;
        match self {
            Class | Struct | Union | Enum | Namespace | Using | Typedef | Template | Typename
            | Requires | Concept | Public | Private | Protected | Virtual | Override | Final
            | Const | Volatile | Static | Explicit | Noexcept | Mutable | Friend | Inline
            | Constexpr | Consteval | If | Else | While | Do | For | Switch | Case | Default
            | Break | Continue | Return | Goto | True | False | Nullptr | This | New | Delete
            | Sizeof | Try | Catch | Throw | Operator | Auto | Decltype | Void | Bool | Char
            | Short | Int | Long | Float | Double | Signed | Unsigned => TokenKind::Keyword,
            Ident(_) => TokenKind::Identifier,
            HexLiteral(_) | FloatLiteral(_) | IntLiteral(_) | StringLiteral(_) | CharLiteral(_) => {
                TokenKind::Literal
            }
            ColonColon | Ellipsis | Arrow | Dot | Spaceship | EqEq | NotEq | LtEq | GtEq
            | AndAnd | OrOr | ShlEq | ShrEq | Shl | Shr | Lt | Gt | PlusPlus | MinusMinus
            | PlusEq | MinusEq | StarEq | SlashEq | PercentEq | AmpEq | PipeEq | CaretEq | Eq
            | Plus | Minus | Star | Slash | Percent | Amp | Pipe | Caret | Tilde | Bang
            | Question => TokenKind::Operator,
            Comma | Semicolon | Colon | LParen | RParen | LBrace | RBrace | LBracket | RBracket => {
                TokenKind::Punctuator
            }
            LineComment | BlockComment | PreprocessorDirective => {
                unreachable!("skipped by the lexer, never yielded")
            }
        }
    }

    /// The literal spelling to intern as the token's lexeme. Keywords and
    /// punctuators get their source spelling back (`"class"`, `"::"`, ...)
    /// rather than the enum variant's Debug name, so the parser can look a
    /// keyword up by interning the same literal once and comparing symbols.
    fn text(&self) -> String {
        use RawToken::*;
        match self {
            Ident(s) | HexLiteral(s) | FloatLiteral(s) | IntLiteral(s) | StringLiteral(s)
            | CharLiteral(s) => s.clone(),
            Class => "class".into(),
            Struct => "struct".into(),
            Union => "union".into(),
            Enum => "enum".into(),
            Namespace => "namespace".into(),
            Using => "using".into(),
            Typedef => "typedef".into(),
            Template => "template".into(),
            Typename => "typename".into(),
            Requires => "requires".into(),
            Concept => "concept".into(),
            Public => "public".into(),
            Private => "private".into(),
            Protected => "protected".into(),
            Virtual => "virtual".into(),
            Override => "override".into(),
            Final => "final".into(),
            Const => "const".into(),
            Volatile => "volatile".into(),
            Static => "static".into(),
            Explicit => "explicit".into(),
            Noexcept => "noexcept".into(),
            Mutable => "mutable".into(),
            Friend => "friend".into(),
            Inline => "inline".into(),
            Constexpr => "constexpr".into(),
            Consteval => "consteval".into(),
            If => "if".into(),
            Else => "else".into(),
            While => "while".into(),
            Do => "do".into(),
            For => "for".into(),
            Switch => "switch".into(),
            Case => "case".into(),
            Default => "default".into(),
            Break => "break".into(),
            Continue => "continue".into(),
            Return => "return".into(),
            Goto => "goto".into(),
            True => "true".into(),
            False => "false".into(),
            Nullptr => "nullptr".into(),
            This => "this".into(),
            New => "new".into(),
            Delete => "delete".into(),
            Sizeof => "sizeof".into(),
            Try => "try".into(),
            Catch => "catch".into(),
            Throw => "throw".into(),
            Operator => "operator".into(),
            Auto => "auto".into(),
            Decltype => "decltype".into(),
            Void => "void".into(),
            Bool => "bool".into(),
            Char => "char".into(),
            Short => "short".into(),
            Int => "int".into(),
            Long => "long".into(),
            Float => "float".into(),
            Double => "double".into(),
            Signed => "signed".into(),
            Unsigned => "unsigned".into(),
            ColonColon => "::".into(),
            Ellipsis => "...".into(),
            Arrow => "->".into(),
            Dot => ".".into(),
            Comma => ",".into(),
            Semicolon => ";".into(),
            Colon => ":".into(),
            LParen => "(".into(),
            RParen => ")".into(),
            LBrace => "{".into(),
            RBrace => "}".into(),
            LBracket => "[".into(),
            RBracket => "]".into(),
            Spaceship => "<=>".into(),
            EqEq => "==".into(),
            NotEq => "!=".into(),
            LtEq => "<=".into(),
            GtEq => ">=".into(),
            AndAnd => "&&".into(),
            OrOr => "||".into(),
            ShlEq => "<<=".into(),
            ShrEq => ">>=".into(),
            Shl => "<<".into(),
            Shr => ">>".into(),
            Lt => "<".into(),
            Gt => ">".into(),
            PlusPlus => "++".into(),
            MinusMinus => "--".into(),
            PlusEq => "+=".into(),
            MinusEq => "-=".into(),
            StarEq => "*=".into(),
            SlashEq => "/=".into(),
            PercentEq => "%=".into(),
            AmpEq => "&=".into(),
            PipeEq => "|=".into(),
            CaretEq => "^=".into(),
            Eq => "=".into(),
            Plus => "+".into(),
            Minus => "-".into(),
            Star => "*".into(),
            Slash => "/".into(),
            Percent => "%".into(),
            Amp => "&".into(),
            Pipe => "|".into(),
            Caret => "^".into(),
            Tilde => "~".into(),
            Bang => "!".into(),
            Question => "?".into(),
            LineComment | BlockComment | PreprocessorDirective => {
                unreachable!("skipped by the lexer, never yielded")
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("invalid token at byte offset {offset}")]
    InvalidToken { offset: usize },
}

pub struct Lexer<'source> {
    inner: logos::Lexer<'source, RawToken>,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            inner: RawToken::lexer(source),
        }
    }
}

impl<'source> Iterator for Lexer<'source> {
    type Item = Result<(RawToken, std::ops::Range<usize>), LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.inner.next()?;
        let span = self.inner.span();
        match token {
            Ok(tok) => Some(Ok((tok, span))),
            Err(()) => Some(Err(LexError::InvalidToken { offset: span.start })),
        }
    }
}

/// Turn a line/column cursor from a byte offset, 1-based on both axes, the
/// way a diagnostic's `Span` expects it (`cxx_diagnostics::Span`).
fn line_col(source: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;
    for ch in source[..offset].chars() {
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Lex `source` in full, interning every identifier/literal lexeme through
/// `interner` and tagging every token with `file`. Appends a trailing
/// `Token::eof` so callers can hand the result straight to
/// [`cxx_ast::VecTokenStream::new`].
pub fn tokenize(source: &str, file: FileId, interner: &Interner) -> Result<Vec<Token>, LexError> {
    let mut out = Vec::new();
    for item in Lexer::new(source) {
        let (raw, span) = item?;
        let (line, column) = line_col(source, span.start);
        let lexeme: Symbol = interner.intern(&raw.text());
        out.push(Token {
            kind: raw.kind(),
            lexeme,
            line,
            column,
            file,
        });
    }
    let (line, column) = line_col(source, source.len());
    let empty = interner.intern("");
    out.push(Token::eof(file, line, column, empty));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_a_class_declaration() {
        let interner = Interner::new();
        let toks = tokenize("class Widget { int x; };", FileId(0), &interner).unwrap();
        assert_eq!(toks[0].kind, TokenKind::Keyword);
        assert_eq!(&*interner.resolve(toks[0].lexeme), "class");
        assert_eq!(toks[1].kind, TokenKind::Identifier);
        assert_eq!(&*interner.resolve(toks[1].lexeme), "Widget");
        assert_eq!(toks.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn tracks_line_and_column_across_newlines() {
        let interner = Interner::new();
        let toks = tokenize("int a;\nint b;", FileId(0), &interner).unwrap();
        let b_tok = toks
            .iter()
            .find(|t| t.kind == TokenKind::Identifier && &*interner.resolve(t.lexeme) == "b")
            .unwrap();
        assert_eq!(b_tok.line, 2);
    }

    #[test]
    fn skips_comments_and_preprocessor_lines() {
        let interner = Interner::new();
        let toks = tokenize("// comment\n#include <vector>\nint x;", FileId(0), &interner).unwrap();
        assert_eq!(toks[0].kind, TokenKind::Keyword);
        assert_eq!(&*interner.resolve(toks[0].lexeme), "int");
    }

    #[test]
    fn recognizes_spaceship_and_scope_resolution() {
        let interner = Interner::new();
        let toks = tokenize("a <=> b; std::vector", FileId(0), &interner).unwrap();
        assert!(toks.iter().any(|t| t.kind == TokenKind::Operator));
        assert!(toks.iter().any(|t| t.kind == TokenKind::Punctuator));
    }
}
