//! Statement-level parsing: declarations, control flow, functions, and
//! the soft-failure paths for constructs outside the supported subset.

use super::Parser;
use crate::ast::Stmt;
use crate::error::{TranspileError, TranspileResult};
use crate::token::TokenKind;
use tracing::trace;

impl Parser {
    /// Parse one source statement, which may expand to several AST
    /// statements (`let a = 1, b = 2` becomes two locals).
    pub(crate) fn parse_stmt_into(&mut self, stmts: &mut Vec<Stmt>) -> TranspileResult<()> {
        let is_declaration = {
            let t = self.peek();
            t.kind == TokenKind::Identifier
                && matches!(t.text.as_str(), "const" | "let" | "var")
        };
        if is_declaration {
            self.parse_declaration(stmts)
        } else {
            let stmt = self.parse_single_stmt()?;
            stmts.push(stmt);
            Ok(())
        }
    }

    fn parse_single_stmt(&mut self) -> TranspileResult<Stmt> {
        let (kind, word) = {
            let t = self.peek();
            (t.kind, t.text.clone())
        };
        if kind == TokenKind::Identifier {
            match word.as_str() {
                "function" => return self.parse_function(),
                "if" => return self.parse_if(),
                "for" => return self.parse_for(),
                "while" => return self.parse_while(),
                "return" => return self.parse_return(),
                "break" => {
                    self.bump();
                    self.eat_punct(";");
                    return Ok(Stmt::Break);
                }
                "continue" => {
                    self.bump();
                    self.eat_punct(";");
                    return Ok(Stmt::Continue);
                }
                "else" => return Err(self.unexpected()),
                _ => {}
            }
        }
        let expr = self.parse_expr()?;
        self.eat_punct(";");
        Ok(Stmt::Expr(expr))
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn parse_declaration(&mut self, stmts: &mut Vec<Stmt>) -> TranspileResult<()> {
        self.bump();
        loop {
            let name = self.expect_identifier()?;
            let init = if self.eat_op("=") {
                Some(self.parse_assign()?)
            } else {
                None
            };
            stmts.push(Stmt::Local { name, init });
            if !self.eat_punct(",") {
                break;
            }
        }
        self.eat_punct(";");
        Ok(())
    }

    fn parse_function(&mut self) -> TranspileResult<Stmt> {
        self.bump();
        let name = self.expect_identifier()?;
        self.expect_punct("(")?;
        let mut params = Vec::new();
        let params_ok = self.grouped(|p| {
            loop {
                if p.at_punct(")") {
                    return Ok(true);
                }
                if p.peek().kind != TokenKind::Identifier {
                    return Ok(false);
                }
                params.push(p.bump().text);
                if !p.eat_punct(",") {
                    return Ok(true);
                }
            }
        })?;
        if !params_ok {
            // Destructuring parameters are outside the subset: skip the
            // rest of the declaration and leave a diagnostic behind. The
            // opening paren is already consumed, so the skip starts one
            // group deep.
            self.skip_group(")", 1)?;
            self.skip_balanced_braces()?;
            trace!(function = %name, "skipped function with unsupported parameters");
            return Ok(Stmt::Unsupported {
                reason: format!("destructuring parameters in function '{}'", name),
            });
        }
        self.expect_punct(")")?;
        let body = self.parse_block()?;
        Ok(Stmt::Function { name, params, body })
    }

    // =========================================================================
    // Control flow
    // =========================================================================

    fn parse_if(&mut self) -> TranspileResult<Stmt> {
        let mut arms = Vec::new();
        let mut otherwise = None;
        loop {
            self.bump(); // `if`
            self.expect_punct("(")?;
            let cond = self.grouped(|p| p.parse_expr())?;
            self.expect_punct(")")?;
            let body = self.parse_body()?;
            arms.push((cond, body));
            if !self.at_keyword("else") {
                break;
            }
            self.bump();
            if !self.at_keyword("if") {
                otherwise = Some(self.parse_body()?);
                break;
            }
        }
        Ok(Stmt::If { arms, otherwise })
    }

    fn parse_while(&mut self) -> TranspileResult<Stmt> {
        self.bump();
        self.expect_punct("(")?;
        let cond = self.grouped(|p| p.parse_expr())?;
        self.expect_punct(")")?;
        let body = self.parse_body()?;
        Ok(Stmt::While { cond, body })
    }

    /// `for (x of e)` and `for (x in e)` are the supported loop forms.
    /// The C-style three-clause `for` is not: it degrades to an inert
    /// comment and its body is skipped entirely.
    fn parse_for(&mut self) -> TranspileResult<Stmt> {
        self.bump();
        if self.header_has_semicolon() {
            self.skip_group(")", 0)?;
            self.skip_loop_body()?;
            return Ok(Stmt::Unsupported {
                reason: "C-style for loop".to_string(),
            });
        }
        self.expect_punct("(")?;
        let (var, keyword, iter) = self.grouped(|p| {
            if p.at_keyword("const") || p.at_keyword("let") || p.at_keyword("var") {
                p.bump();
            }
            let var = p.expect_identifier()?;
            let keyword = p.expect_identifier()?;
            if keyword != "of" && keyword != "in" {
                return Err(TranspileError::unexpected(
                    format!("'{}'", keyword),
                    p.pos,
                ));
            }
            let iter = p.parse_expr()?;
            Ok((var, keyword, iter))
        })?;
        self.expect_punct(")")?;
        let body = self.parse_body()?;
        Ok(if keyword == "of" {
            Stmt::ForOf { var, iter, body }
        } else {
            Stmt::ForIn { var, iter, body }
        })
    }

    fn parse_return(&mut self) -> TranspileResult<Stmt> {
        self.bump();
        if self.newline_before_sig()
            || self.at_punct(";")
            || self.at_punct("}")
            || self.at_eof()
        {
            self.eat_punct(";");
            return Ok(Stmt::Return(None));
        }
        let value = self.parse_expr()?;
        self.eat_punct(";");
        Ok(Stmt::Return(Some(value)))
    }

    // =========================================================================
    // Raw skipping for soft failures
    // =========================================================================

    /// Whether the upcoming `(...)` group contains a `;` at depth one,
    /// the signature of a C-style loop header.
    fn header_has_semicolon(&self) -> bool {
        let mut i = self.sig_index();
        let mut depth = 0usize;
        while i < self.tokens.len() {
            let t = &self.tokens[i];
            match t.kind {
                TokenKind::Eof => return false,
                TokenKind::Punct => match t.text.as_str() {
                    "(" => depth += 1,
                    ")" => {
                        if depth <= 1 {
                            return false;
                        }
                        depth -= 1;
                    }
                    ";" if depth == 1 => return true,
                    _ => {}
                },
                _ => {}
            }
            i += 1;
        }
        false
    }

    /// Consume raw tokens through the matching close of the upcoming
    /// group. `depth` is the number of opens already consumed before the
    /// call (0 when the cursor still sits on the opening token).
    fn skip_group(&mut self, close: &str, mut depth: usize) -> TranspileResult<()> {
        let open = match close {
            ")" => "(",
            "}" => "{",
            _ => "[",
        };
        loop {
            let t = self.bump();
            match t.kind {
                TokenKind::Eof => return Err(TranspileError::eof(format!("expected '{}'", close))),
                TokenKind::Punct if t.text == open => depth += 1,
                TokenKind::Punct if t.text == close => {
                    if depth <= 1 {
                        return Ok(());
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
    }

    /// Skip a loop body without interpreting it: a balanced brace block,
    /// or a single line for unbraced bodies.
    fn skip_loop_body(&mut self) -> TranspileResult<()> {
        if self.at_punct("{") {
            return self.skip_balanced_braces();
        }
        while !self.at_eof() && !self.at_punct(";") && !self.newline_before_sig() {
            self.bump();
        }
        self.eat_punct(";");
        Ok(())
    }

    fn skip_balanced_braces(&mut self) -> TranspileResult<()> {
        self.skip_group("}", 0)
    }
}
