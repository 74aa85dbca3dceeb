//! Recursive descent parser for query scripts.
//!
//! Builds the minimal AST from the lossless token stream. Trivia is
//! skipped between significant tokens, with two exceptions that keep the
//! output diff-friendly: comments at statement position become comment
//! statements, and blank-line runs become blank markers.
//!
//! Statement termination follows the dialect's layout rule: a statement
//! ends at `;`, at a newline while no bracket is open (unless the next
//! significant token is `.`, which continues a method chain), or at the
//! enclosing `}`.

mod expr;
mod stmt;

use crate::ast::{Expr, Stmt};
use crate::error::{TranspileError, TranspileResult};
use crate::lexer::tokenize;
use crate::token::{Token, TokenKind};
use tracing::debug;

/// Parse a whole query script into a statement list.
pub fn parse(source: &str) -> TranspileResult<Vec<Stmt>> {
    let tokens = tokenize(source);
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program()?;
    debug!(statements = program.len(), "parsed query script");
    Ok(program)
}

/// Parse a single expression, e.g. the inside of a `${...}` template hole.
pub(crate) fn parse_expression(source: &str) -> TranspileResult<Expr> {
    let tokens = tokenize(source);
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;
    if parser.peek().kind != TokenKind::Eof {
        return Err(TranspileError::unexpected(
            format!("'{}'", parser.peek().text),
            parser.pos,
        ));
    }
    Ok(expr)
}

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Open `(`/`[`/`{` groups within the current statement; newlines only
    /// terminate statements at depth zero
    group_depth: usize,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            group_depth: 0,
        }
    }

    // =========================================================================
    // Token cursor
    // =========================================================================

    /// Index of the next significant (non-trivia) token.
    fn sig_index(&self) -> usize {
        let mut i = self.pos;
        while i < self.tokens.len() && self.tokens[i].is_trivia() {
            if self.tokens[i].kind == TokenKind::Eof {
                break;
            }
            i += 1;
        }
        i.min(self.tokens.len() - 1)
    }

    /// Peek the next significant token without consuming it.
    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.sig_index()]
    }

    /// Consume and return the next significant token.
    pub(crate) fn bump(&mut self) -> Token {
        let i = self.sig_index();
        self.pos = if self.tokens[i].kind == TokenKind::Eof {
            i
        } else {
            i + 1
        };
        self.tokens[i].clone()
    }

    /// Whether a newline separates the cursor from the next significant
    /// token.
    pub(crate) fn newline_before_sig(&self) -> bool {
        self.tokens[self.pos..self.sig_index()]
            .iter()
            .any(|t| t.kind == TokenKind::Newline)
    }

    /// The layout rule: at group depth zero, a newline ends the current
    /// statement unless the chain continues with `.`.
    pub(crate) fn at_statement_boundary(&self) -> bool {
        self.group_depth == 0 && self.newline_before_sig() && !self.at_op(".")
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    pub(crate) fn at_op(&self, op: &str) -> bool {
        let t = self.peek();
        t.kind == TokenKind::Operator && t.text == op
    }

    pub(crate) fn at_punct(&self, punct: &str) -> bool {
        let t = self.peek();
        t.kind == TokenKind::Punct && t.text == punct
    }

    pub(crate) fn at_keyword(&self, word: &str) -> bool {
        let t = self.peek();
        t.kind == TokenKind::Identifier && t.text == word
    }

    pub(crate) fn eat_op(&mut self, op: &str) -> bool {
        if self.at_op(op) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_punct(&mut self, punct: &str) -> bool {
        if self.at_punct(punct) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_punct(&mut self, punct: &str) -> TranspileResult<()> {
        if self.eat_punct(punct) {
            Ok(())
        } else if self.at_eof() {
            Err(TranspileError::eof(format!("expected '{}'", punct)))
        } else {
            Err(self.unexpected())
        }
    }

    pub(crate) fn expect_op(&mut self, op: &str) -> TranspileResult<()> {
        if self.eat_op(op) {
            Ok(())
        } else if self.at_eof() {
            Err(TranspileError::eof(format!("expected '{}'", op)))
        } else {
            Err(self.unexpected())
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> TranspileResult<String> {
        if self.peek().kind == TokenKind::Identifier {
            Ok(self.bump().text)
        } else if self.at_eof() {
            Err(TranspileError::eof("expected identifier"))
        } else {
            Err(self.unexpected())
        }
    }

    pub(crate) fn unexpected(&self) -> TranspileError {
        let i = self.sig_index();
        TranspileError::unexpected(format!("'{}'", self.tokens[i].text), i)
    }

    /// Run `f` with the group depth raised, so newlines inside brackets do
    /// not terminate the statement.
    pub(crate) fn grouped<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> TranspileResult<T>,
    ) -> TranspileResult<T> {
        self.group_depth += 1;
        let result = f(self);
        self.group_depth -= 1;
        result
    }

    // =========================================================================
    // Program / block structure
    // =========================================================================

    pub(crate) fn parse_program(&mut self) -> TranspileResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        self.parse_statements(&mut stmts, None)?;
        Ok(stmts)
    }

    pub(crate) fn parse_block(&mut self) -> TranspileResult<Vec<Stmt>> {
        self.expect_punct("{")?;
        // Statements in a nested body follow the newline rule even when
        // the block sits inside parentheses (callback bodies)
        let saved_depth = std::mem::replace(&mut self.group_depth, 0);
        let mut stmts = Vec::new();
        let result = self.parse_statements(&mut stmts, Some("}"));
        self.group_depth = saved_depth;
        result?;
        self.expect_punct("}")?;
        Ok(stmts)
    }

    /// Statement loop shared by program and block bodies. Handles trivia
    /// explicitly: comments become statements, blank-line runs become
    /// blank markers, stray semicolons disappear.
    fn parse_statements(
        &mut self,
        stmts: &mut Vec<Stmt>,
        terminator: Option<&str>,
    ) -> TranspileResult<()> {
        let mut newline_run = 0usize;
        loop {
            let kind = self.tokens[self.pos].kind;
            let text = self.tokens[self.pos].text.clone();
            match kind {
                TokenKind::Eof => {
                    if let Some(t) = terminator {
                        return Err(TranspileError::eof(format!("block, expected '{}'", t)));
                    }
                    return Ok(());
                }
                TokenKind::Whitespace => self.pos += 1,
                TokenKind::Newline => {
                    newline_run += 1;
                    if newline_run == 2 && !stmts.is_empty() {
                        stmts.push(Stmt::Blank);
                    }
                    self.pos += 1;
                }
                TokenKind::Comment => {
                    stmts.push(comment_stmt(&text));
                    newline_run = 0;
                    self.pos += 1;
                }
                TokenKind::Punct if text == ";" => {
                    self.pos += 1;
                    newline_run = 0;
                }
                TokenKind::Punct if Some(text.as_str()) == terminator => {
                    return Ok(());
                }
                _ => {
                    self.parse_stmt_into(stmts)?;
                    newline_run = 0;
                }
            }
        }
    }

    /// A brace-delimited block, or a single statement body.
    pub(crate) fn parse_body(&mut self) -> TranspileResult<Vec<Stmt>> {
        if self.at_punct("{") {
            self.parse_block()
        } else {
            let mut stmts = Vec::new();
            self.parse_stmt_into(&mut stmts)?;
            Ok(stmts)
        }
    }
}

fn comment_stmt(raw: &str) -> Stmt {
    if let Some(inner) = raw.strip_prefix("//") {
        Stmt::Comment {
            text: inner.to_string(),
            block: false,
        }
    } else {
        let inner = raw
            .strip_prefix("/*")
            .and_then(|s| s.strip_suffix("*/"))
            .unwrap_or(raw);
        Stmt::Comment {
            text: inner.to_string(),
            block: true,
        }
    }
}
