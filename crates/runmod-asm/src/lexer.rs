//! Lexer for the assembler source format.
//!
//! Produces span-based tokens; text is sliced from source when needed.
//! Whitespace and `;` comments are skipped, newlines are significant since
//! every statement ends at the end of its line.
//!
//! Consecutive characters no token matches are coalesced into one
//! [`TokenKind::Unexpected`] token.

use std::ops::Range;

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip(r"[ \t\r\f]+|;[^\n]*", allow_greedy = true))]
pub enum TokenKind {
    #[token("\n")]
    Newline,

    #[token(":")]
    Colon,

    #[token("(")]
    ParenOpen,

    #[token(")")]
    ParenClose,

    #[token(",")]
    Comma,

    /// Array suffix of `string[]`.
    #[token("[]")]
    Brackets,

    /// `.module`, `.type`, `.routine`, `.locals`, `.end`, `.entry`
    #[regex(r"\.[a-z]+")]
    Directive,

    /// Names, mnemonics, keywords and dotted paths.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*")]
    Ident,

    #[regex(r"-?[0-9]+")]
    Int,

    #[regex(r#""(?:[^"\\\n]|\\.)*""#)]
    Str,

    /// Coalesced run of characters no other token matches.
    Unexpected,
}

impl TokenKind {
    /// Human name for error messages.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Newline => "end of line",
            Self::Colon => "`:`",
            Self::ParenOpen => "`(`",
            Self::ParenClose => "`)`",
            Self::Comma => "`,`",
            Self::Brackets => "`[]`",
            Self::Directive => "directive",
            Self::Ident => "name",
            Self::Int => "integer",
            Self::Str => "string literal",
            Self::Unexpected => "unexpected characters",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl Token {
    #[inline]
    pub fn new(kind: TokenKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }
}

/// Tokenize source into span-based tokens.
pub fn lex(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);
    let mut error_span: Option<Range<usize>> = None;

    loop {
        match lexer.next() {
            Some(Ok(kind)) => {
                if let Some(span) = error_span.take() {
                    tokens.push(Token::new(TokenKind::Unexpected, span));
                }
                tokens.push(Token::new(kind, lexer.span()));
            }
            Some(Err(())) => {
                let span = lexer.span();
                match &mut error_span {
                    Some(open) => open.end = span.end,
                    None => error_span = Some(span),
                }
            }
            None => {
                if let Some(span) = error_span.take() {
                    tokens.push(Token::new(TokenKind::Unexpected, span));
                }
                break;
            }
        }
    }

    tokens
}

/// Text of a token.
#[inline]
pub fn token_text<'src>(source: &'src str, token: &Token) -> &'src str {
    &source[token.span.clone()]
}
