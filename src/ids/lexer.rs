//! Lexer for marker ID specifications using logos

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    #[token("-")]
    Hyphen,
    #[token(",")]
    Comma,

    // Overlong digit runs saturate; they are clamped to the ID range later anyway
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().unwrap_or(u64::MAX))]
    Number(u64),

    // Anything else, whitespace included, is kept as a token so the grammar rejects it
    #[regex(r"[^0-9,\-]+", |lex| lex.slice().to_string())]
    Other(String),
}

/// Lex an ID specification into tokens with spans
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}
