//! ID specification parser using chumsky
//!
//! Accepted forms are a single number (`2`), an inclusive range (`1-5`) and a
//! comma-separated list (`10,12,15`). Out-of-range numbers are clamped into
//! `0..=65535` rather than rejected.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::FormatError;
use crate::ids::lexer::Token;
use crate::ids::set::{MarkerId, MarkerIdSet};

/// Shape of a parsed ID specification before it is expanded into a set
#[derive(Debug, Clone, PartialEq)]
enum IdSpec {
    Range(u64, u64),
    List(Vec<u64>),
}

/// Parse an ID specification into a deduplicated set of marker IDs
pub fn parse_ids(input: &str) -> Result<MarkerIdSet, FormatError> {
    let len = input.len();

    let token_iter = crate::ids::lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    let token_stream = Stream::from_iter(token_iter)
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    let spec = id_spec_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| match errs.into_iter().next() {
            Some(err) => FormatError::from_rich(input, err),
            None => FormatError::new(input, 0..len, "invalid ID specification"),
        })?;

    Ok(expand(spec))
}

fn expand(spec: IdSpec) -> MarkerIdSet {
    match spec {
        // Bounds are clamped independently before ordering
        IdSpec::Range(a, b) => MarkerIdSet::from_range(MarkerId::clamped(a), MarkerId::clamped(b)),
        IdSpec::List(values) => values.into_iter().map(MarkerId::clamped).collect(),
    }
}

fn id_spec_parser<'a, I>() -> impl Parser<'a, I, IdSpec, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let number = select! {
        Token::Number(n) => n,
    };

    let range = number
        .clone()
        .then_ignore(just(Token::Hyphen))
        .then(number.clone())
        .map(|(start, end)| IdSpec::Range(start, end));

    let list = number
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>()
        .map(IdSpec::List);

    // Range is tried first; "5" alone falls through to a one-element list
    choice((range, list)).then_ignore(end())
}
