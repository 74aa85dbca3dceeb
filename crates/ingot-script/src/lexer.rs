//! Query-script tokenizer.
//!
//! Total and lossless: `tokenize` never fails, and concatenating the
//! `text` of every token reproduces the input exactly. Unrecognized
//! characters degrade to single-character whitespace tokens instead of
//! aborting, so downstream stages always see a complete stream.

use crate::token::{TemplatePart, Token, TokenKind};
use tracing::trace;

/// Multi-character operators, longest-match-first. Order matters: `===`
/// must win over `==`, `=>` over `=`, `++` over `+`.
const OPERATORS: &[&str] = &[
    "===", "!==", "=>", "&&", "||", "==", "!=", ">=", "<=", "+=", "-=", "++", "--",
];

const SINGLE_OPERATORS: &str = "+-*/%<>=!?:.";

const PUNCTUATION: &str = "(){}[],;";

/// Tokenize a query script into a flat stream terminated by an EOF
/// sentinel.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        tokens: Vec::new(),
    };
    lexer.run();
    trace!(tokens = lexer.tokens.len(), "tokenized query script");
    lexer.tokens
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    fn run(&mut self) {
        while let Some(c) = self.peek(0) {
            match c {
                '\n' => {
                    self.pos += 1;
                    self.push(TokenKind::Newline, "\n");
                }
                '\r' => {
                    if self.peek(1) == Some('\n') {
                        self.pos += 2;
                        self.push(TokenKind::Newline, "\r\n");
                    } else {
                        self.pos += 1;
                        self.push(TokenKind::Newline, "\r");
                    }
                }
                ' ' | '\t' => self.read_whitespace(),
                '/' => self.read_slash(),
                '\'' | '"' => self.read_string(c),
                '`' => self.read_template(),
                c if c.is_ascii_digit() => self.read_number(),
                c if is_ident_start(c) => self.read_identifier(),
                _ => self.read_operator_or_unknown(),
            }
        }
        self.tokens.push(Token::new(TokenKind::Eof, ""));
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<String>) {
        self.tokens.push(Token::new(kind, text));
    }

    fn slice(&self, from: usize) -> String {
        self.chars[from..self.pos].iter().collect()
    }

    fn read_whitespace(&mut self) {
        let start = self.pos;
        while matches!(self.peek(0), Some(' ') | Some('\t')) {
            self.pos += 1;
        }
        let text = self.slice(start);
        self.push(TokenKind::Whitespace, text);
    }

    fn read_identifier(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek(0) {
            if is_ident_continue(c) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = self.slice(start);
        self.push(TokenKind::Identifier, text);
    }

    fn read_number(&mut self) {
        let start = self.pos;
        if self.peek(0) == Some('0') && matches!(self.peek(1), Some('x') | Some('X')) {
            self.pos += 2;
            while matches!(self.peek(0), Some(c) if c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
        } else {
            while matches!(self.peek(0), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
            if self.peek(0) == Some('.') && matches!(self.peek(1), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
                while matches!(self.peek(0), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
            if matches!(self.peek(0), Some('e') | Some('E')) {
                let mut ahead = 1;
                if matches!(self.peek(ahead), Some('+') | Some('-')) {
                    ahead += 1;
                }
                if matches!(self.peek(ahead), Some(c) if c.is_ascii_digit()) {
                    self.pos += ahead;
                    while matches!(self.peek(0), Some(c) if c.is_ascii_digit()) {
                        self.pos += 1;
                    }
                }
            }
        }
        let text = self.slice(start);
        self.push(TokenKind::Number, text);
    }

    /// String literal, quotes and escapes kept verbatim. An unterminated
    /// string (newline or EOF before the closing quote) is emitted as-is;
    /// the parser reports it, the tokenizer stays total.
    fn read_string(&mut self, quote: char) {
        let start = self.pos;
        self.pos += 1;
        while let Some(c) = self.peek(0) {
            if c == '\\' {
                self.pos += 1;
                if self.peek(0).is_some() {
                    self.pos += 1;
                }
            } else if c == quote {
                self.pos += 1;
                break;
            } else if c == '\n' || c == '\r' {
                break;
            } else {
                self.pos += 1;
            }
        }
        let text = self.slice(start);
        self.push(TokenKind::String, text);
    }

    /// Template literal: backtick-delimited, `${...}` holes found by
    /// balanced-brace scanning. Escaped backticks and backslashes are
    /// preserved in the text segments.
    fn read_template(&mut self) {
        let start = self.pos;
        self.pos += 1;
        let mut parts = Vec::new();
        let mut text = String::new();
        while let Some(c) = self.peek(0) {
            if c == '\\' {
                text.push(c);
                self.pos += 1;
                if let Some(next) = self.peek(0) {
                    text.push(next);
                    self.pos += 1;
                }
            } else if c == '`' {
                self.pos += 1;
                break;
            } else if c == '$' && self.peek(1) == Some('{') {
                if !text.is_empty() {
                    parts.push(TemplatePart::Text(std::mem::take(&mut text)));
                }
                self.pos += 2;
                let expr_start = self.pos;
                let mut depth = 1usize;
                while let Some(inner) = self.peek(0) {
                    match inner {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    self.pos += 1;
                }
                let expr = self.slice(expr_start);
                parts.push(TemplatePart::Expr(expr));
                if self.peek(0) == Some('}') {
                    self.pos += 1;
                }
            } else {
                text.push(c);
                self.pos += 1;
            }
        }
        if !text.is_empty() {
            parts.push(TemplatePart::Text(text));
        }
        let raw = self.slice(start);
        self.tokens.push(Token::template(raw, parts));
    }

    /// `/` is a comment opener, a regex literal, or division. Division
    /// wins when the nearest preceding non-trivia token ends a value
    /// position (identifier, number, `)`, `]`, `++`, `--`); the grammar is
    /// ambiguous without this context.
    fn read_slash(&mut self) {
        match self.peek(1) {
            Some('/') => self.read_line_comment(),
            Some('*') => self.read_block_comment(),
            _ => {
                let division = self
                    .tokens
                    .iter()
                    .rev()
                    .find(|t| !t.is_trivia())
                    .is_some_and(|t| t.ends_value());
                if division {
                    self.pos += 1;
                    self.push(TokenKind::Operator, "/");
                } else {
                    self.read_regex();
                }
            }
        }
    }

    fn read_line_comment(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek(0) {
            if c == '\n' || c == '\r' {
                break;
            }
            self.pos += 1;
        }
        let text = self.slice(start);
        self.push(TokenKind::Comment, text);
    }

    fn read_block_comment(&mut self) {
        let start = self.pos;
        self.pos += 2;
        while let Some(c) = self.peek(0) {
            if c == '*' && self.peek(1) == Some('/') {
                self.pos += 2;
                break;
            }
            self.pos += 1;
        }
        let text = self.slice(start);
        self.push(TokenKind::Comment, text);
    }

    /// Regex literal `/pattern/flags`. `/` inside a character class does
    /// not terminate. A newline or EOF before the closing `/` means this
    /// was not a regex after all; the lone slash degrades to an operator.
    fn read_regex(&mut self) {
        let start = self.pos;
        self.pos += 1;
        let mut in_class = false;
        let mut closed = false;
        while let Some(c) = self.peek(0) {
            match c {
                '\\' => {
                    self.pos += 1;
                    if self.peek(0).is_some() {
                        self.pos += 1;
                    }
                    continue;
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => {
                    self.pos += 1;
                    closed = true;
                    break;
                }
                '\n' | '\r' => break,
                _ => {}
            }
            self.pos += 1;
        }
        if !closed {
            self.pos = start + 1;
            self.push(TokenKind::Operator, "/");
            return;
        }
        while matches!(self.peek(0), Some(c) if c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        let text = self.slice(start);
        self.push(TokenKind::Regex, text);
    }

    fn read_operator_or_unknown(&mut self) {
        for op in OPERATORS {
            if self.matches(op) {
                self.pos += op.chars().count();
                self.push(TokenKind::Operator, *op);
                return;
            }
        }
        let c = self.chars[self.pos];
        self.pos += 1;
        if SINGLE_OPERATORS.contains(c) {
            self.push(TokenKind::Operator, c.to_string());
        } else if PUNCTUATION.contains(c) {
            self.push(TokenKind::Punct, c.to_string());
        } else {
            // Unknown byte: degrade to trivia so the stream stays total
            self.push(TokenKind::Whitespace, c.to_string());
        }
    }

    fn matches(&self, op: &str) -> bool {
        op.chars()
            .enumerate()
            .all(|(i, c)| self.peek(i) == Some(c))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}
