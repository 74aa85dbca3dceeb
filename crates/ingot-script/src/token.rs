//! Token types for the query-script tokenizer.
//!
//! The token stream is flat and lossless: every byte of the input is owned
//! by exactly one token, so concatenating `text` across the stream
//! reproduces the source. Trivia (whitespace, newlines, comments) stays in
//! the stream; the parser decides what to skip.

use serde::Serialize;

/// Token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Identifier or keyword (`const`, `for`, `foo`)
    Identifier,
    /// Numeric literal (decimal, hex, fraction, exponent)
    Number,
    /// Quoted string literal, quotes and escapes included
    String,
    /// Template literal with `${...}` segments
    Template,
    /// Regex literal `/pattern/flags`
    Regex,
    /// Operator (`===`, `=>`, `+`, ...)
    Operator,
    /// Punctuation (`(`, `)`, `{`, `}`, `[`, `]`, `,`, `;`)
    Punct,
    /// A single `\n` or `\r\n`
    Newline,
    /// Horizontal whitespace, or an unrecognized character degraded to
    /// trivia so the stream stays total
    Whitespace,
    /// Line or block comment, delimiters included
    Comment,
    /// End-of-stream sentinel (empty text)
    Eof,
}

/// One segment of a template literal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum TemplatePart {
    /// Literal text between `${...}` holes, escapes unresolved
    Text(String),
    /// Raw source of one `${...}` hole, braces stripped
    Expr(String),
}

/// A single token. `text` is the exact source slice, including quotes,
/// comment delimiters, and the backticks of a template literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Template segments, present only for `TokenKind::Template`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<TemplatePart>,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            parts: Vec::new(),
        }
    }

    pub fn template(text: impl Into<String>, parts: Vec<TemplatePart>) -> Self {
        Self {
            kind: TokenKind::Template,
            text: text.into(),
            parts,
        }
    }

    /// Trivia tokens carry no syntactic weight: whitespace, newlines,
    /// comments, and the EOF sentinel.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::Newline | TokenKind::Comment | TokenKind::Eof
        )
    }

    /// True for tokens that end a value position: after one of these a
    /// `/` means division, not the start of a regex literal.
    pub fn ends_value(&self) -> bool {
        match self.kind {
            TokenKind::Identifier | TokenKind::Number => true,
            TokenKind::Punct => self.text == ")" || self.text == "]",
            TokenKind::Operator => self.text == "++" || self.text == "--",
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trivia_classification() {
        assert!(Token::new(TokenKind::Whitespace, " ").is_trivia());
        assert!(Token::new(TokenKind::Newline, "\n").is_trivia());
        assert!(Token::new(TokenKind::Comment, "// hi").is_trivia());
        assert!(!Token::new(TokenKind::Identifier, "x").is_trivia());
    }

    #[test]
    fn test_ends_value() {
        assert!(Token::new(TokenKind::Identifier, "x").ends_value());
        assert!(Token::new(TokenKind::Number, "12").ends_value());
        assert!(Token::new(TokenKind::Punct, ")").ends_value());
        assert!(Token::new(TokenKind::Punct, "]").ends_value());
        assert!(Token::new(TokenKind::Operator, "++").ends_value());
        assert!(!Token::new(TokenKind::Operator, "=").ends_value());
        assert!(!Token::new(TokenKind::Punct, "(").ends_value());
    }
}
