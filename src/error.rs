//! Error type for marker ID specifications

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::ids::lexer::{Span, Token};

/// Malformed marker ID specification
///
/// Raised before any work starts. The display form names the offending
/// input and the three accepted forms.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("'{input}' is not a range or list of numbers. Expected forms are '2', '0-5' or '0,1,2,3'.")]
pub struct FormatError {
    input: String,
    span: Span,
    message: String,
    expected: Vec<String>,
}

impl FormatError {
    pub fn new(input: impl Into<String>, span: Span, message: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            span,
            message: message.into(),
            expected: Vec::new(),
        }
    }

    pub(crate) fn from_rich(input: &str, err: chumsky::error::Rich<'_, Token>) -> Self {
        use chumsky::error::RichPattern;

        let message = match err.found() {
            Some(tok) => format!("Unexpected {}", format_token(tok)),
            None => "Unexpected end of input".to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                RichPattern::Token(tok) => Some(format_token(tok)),
                RichPattern::EndOfInput => Some("end of input".to_string()),
                _ => None,
            })
            .collect();

        Self {
            input: input.to_string(),
            span: err.span().into_range(),
            message,
            expected,
        }
    }

    /// The specification string that failed to parse
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Byte range of the first offending token
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn expected(&self) -> &[String] {
        &self.expected
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, name: &str) -> String {
        let expected_str = if self.expected.is_empty() {
            String::new()
        } else {
            format!("\nExpected: {}", self.expected.join(", "))
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, name, self.span.start)
            .with_message(self.to_string())
            .with_label(
                Label::new((name, self.span.clone()))
                    .with_message(format!("{}{}", self.message, expected_str))
                    .with_color(Color::Red),
            )
            .finish()
            .write((name, Source::from(self.input.as_str())), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &Token) -> String {
    match tok {
        Token::Number(n) => format!("number {}", n),
        Token::Hyphen => "'-'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Other(s) => format!("'{}'", s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_input_and_forms() {
        let err = FormatError::new("1;2", 1..2, "Unexpected ';'");
        assert_eq!(
            err.to_string(),
            "'1;2' is not a range or list of numbers. Expected forms are '2', '0-5' or '0,1,2,3'."
        );
    }

    #[test]
    fn test_format_includes_label() {
        let err = FormatError::new("1;2", 1..2, "Unexpected ';'");
        let report = err.format("--ids");
        assert!(report.contains("Unexpected ';'"));
    }
}
