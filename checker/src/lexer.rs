// Lexer for isoc .adl declaration files.
//
// Tokenizes the declaration language: type declarations, members with
// attributes, and the small statement language used for member bodies.
// Uses the `logos` crate for DFA-based lexing.
//
// Preconditions: input is valid UTF-8.
// Postconditions: returns all tokens with byte-offset spans, plus any lex errors.
// Failure modes: unrecognized characters produce `LexError`; lexing continues.
// Side effects: none.

use logos::Logos;
use std::fmt;

/// Byte-offset span in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A lexer error with location.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

/// Result of lexing: tokens plus any errors (non-fatal).
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<(Token, Span)>,
    pub errors: Vec<LexError>,
}

/// Declaration language tokens.
///
/// Newlines are insignificant: every item, member and statement starts
/// with a keyword, so no terminator is needed.
#[derive(Logos, Debug, Clone, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n]+|#[^\n]*")]
pub enum Token {
    // ── Declaration keywords ──
    #[token("module")]
    Module,
    #[token("actor")]
    Actor,
    #[token("global")]
    Global,
    #[token("class")]
    Class,
    #[token("struct")]
    Struct,
    #[token("protocol")]
    Protocol,
    #[token("extension")]
    Extension,
    #[token("static")]
    Static,
    #[token("async")]
    Async,
    #[token("func")]
    Func,
    #[token("init")]
    Init,
    #[token("deinit")]
    Deinit,
    #[token("subscript")]
    Subscript,
    #[token("let")]
    Let,
    #[token("var")]
    Var,
    #[token("get")]
    Get,

    // ── Closure types ──
    #[token("fn")]
    Fn,
    #[token("escaping")]
    Escaping,
    #[token("concurrent")]
    Concurrent,

    // ── Statement keywords ──
    #[token("read")]
    Read,
    #[token("write")]
    Write,
    #[token("call")]
    Call,
    #[token("await")]
    Await,
    #[token("return")]
    Return,

    // ── Symbols ──
    #[token("@")]
    At,
    #[token("&")]
    Amp,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("=")]
    Equals,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    /// Identifier: `[a-zA-Z_][a-zA-Z0-9_]*`. Keywords win on equal length.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Module => "module",
            Token::Actor => "actor",
            Token::Global => "global",
            Token::Class => "class",
            Token::Struct => "struct",
            Token::Protocol => "protocol",
            Token::Extension => "extension",
            Token::Static => "static",
            Token::Async => "async",
            Token::Func => "func",
            Token::Init => "init",
            Token::Deinit => "deinit",
            Token::Subscript => "subscript",
            Token::Let => "let",
            Token::Var => "var",
            Token::Get => "get",
            Token::Fn => "fn",
            Token::Escaping => "escaping",
            Token::Concurrent => "concurrent",
            Token::Read => "read",
            Token::Write => "write",
            Token::Call => "call",
            Token::Await => "await",
            Token::Return => "return",
            Token::At => "@",
            Token::Amp => "&",
            Token::Colon => ":",
            Token::Comma => ",",
            Token::Dot => ".",
            Token::Equals => "=",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Ident(name) => return write!(f, "{}", name),
        };
        write!(f, "{}", text)
    }
}

// ── Public API ──

/// Lex a declaration source string into tokens.
///
/// Lexing is non-fatal: errors are collected and the lexer continues past
/// bad characters.
pub fn lex(source: &str) -> LexResult {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, range) in lexer.spanned() {
        let span = Span {
            start: range.start,
            end: range.end,
        };
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => errors.push(LexError {
                span,
                message: format!("unexpected character: {:?}", &source[span.start..span.end]),
            }),
        }
    }

    LexResult { tokens, errors }
}

// ── Tests ──
