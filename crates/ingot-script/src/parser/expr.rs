//! Expression parsing: precedence climbing plus the lookahead that
//! recognizes arrow functions before committing to a parenthesized
//! expression.

use super::{parse_expression, Parser};
use crate::ast::{ArrowBody, AssignOp, BinaryOp, Expr, PropKey, TemplateSegment, UnaryOp, UpdateOp};
use crate::error::{TranspileError, TranspileResult};
use crate::token::{TemplatePart, TokenKind};

impl Parser {
    pub(crate) fn parse_expr(&mut self) -> TranspileResult<Expr> {
        self.parse_assign()
    }

    /// Assignment is right-associative and lowest-precedence.
    pub(crate) fn parse_assign(&mut self) -> TranspileResult<Expr> {
        let target = self.parse_ternary()?;
        if self.at_statement_boundary() {
            return Ok(target);
        }
        let op = if self.at_op("=") {
            AssignOp::Assign
        } else if self.at_op("+=") {
            AssignOp::AddAssign
        } else if self.at_op("-=") {
            AssignOp::SubAssign
        } else {
            return Ok(target);
        };
        self.bump();
        let value = self.parse_assign()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn parse_ternary(&mut self) -> TranspileResult<Expr> {
        let cond = self.parse_binary(1)?;
        if self.at_statement_boundary() || !self.at_op("?") {
            return Ok(cond);
        }
        self.bump();
        let then = self.parse_assign()?;
        self.expect_op(":")?;
        let otherwise = self.parse_assign()?;
        Ok(Expr::Ternary {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    /// Binary tiers, loosest to tightest: `||` < `&&` < equality <
    /// relational < additive < multiplicative.
    fn parse_binary(&mut self, min_prec: u8) -> TranspileResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            if self.at_statement_boundary() {
                break;
            }
            let Some((op, prec)) = self.peek_binary_op() else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.bump();
            let rhs = self.parse_binary(prec + 1)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn peek_binary_op(&self) -> Option<(BinaryOp, u8)> {
        let t = self.peek();
        if t.kind != TokenKind::Operator {
            return None;
        }
        Some(match t.text.as_str() {
            "||" => (BinaryOp::Or, 1),
            "&&" => (BinaryOp::And, 2),
            "===" | "==" => (BinaryOp::Eq, 3),
            "!==" | "!=" => (BinaryOp::Ne, 3),
            "<" => (BinaryOp::Lt, 4),
            ">" => (BinaryOp::Gt, 4),
            "<=" => (BinaryOp::Le, 4),
            ">=" => (BinaryOp::Ge, 4),
            "+" => (BinaryOp::Add, 5),
            "-" => (BinaryOp::Sub, 5),
            "*" => (BinaryOp::Mul, 6),
            "/" => (BinaryOp::Div, 6),
            "%" => (BinaryOp::Rem, 6),
            _ => return None,
        })
    }

    fn parse_unary(&mut self) -> TranspileResult<Expr> {
        if self.at_op("!") {
            self.bump();
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(self.parse_unary()?),
            });
        }
        if self.at_op("-") {
            self.bump();
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(self.parse_unary()?),
            });
        }
        if self.at_keyword("typeof") {
            self.bump();
            return Ok(Expr::Unary {
                op: UnaryOp::TypeOf,
                expr: Box::new(self.parse_unary()?),
            });
        }
        if self.at_op("++") || self.at_op("--") {
            let op = if self.bump().text == "++" {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            return Ok(Expr::Update {
                op,
                prefix: true,
                target: Box::new(self.parse_unary()?),
            });
        }
        self.parse_postfix()
    }

    /// Postfix chain: member access, calls, indexing, `++`/`--`.
    fn parse_postfix(&mut self) -> TranspileResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.at_statement_boundary() {
                break;
            }
            if self.at_op(".") {
                self.bump();
                let prop = self.expect_identifier()?;
                expr = Expr::Member {
                    obj: Box::new(expr),
                    prop,
                };
            } else if self.at_punct("(") {
                let args = self.parse_args()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else if self.at_punct("[") {
                self.bump();
                let index = self.grouped(|p| p.parse_expr())?;
                self.expect_punct("]")?;
                expr = Expr::Index {
                    obj: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.at_op("++") || self.at_op("--") {
                let op = if self.bump().text == "++" {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                expr = Expr::Update {
                    op,
                    prefix: false,
                    target: Box::new(expr),
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    pub(crate) fn parse_args(&mut self) -> TranspileResult<Vec<Expr>> {
        self.expect_punct("(")?;
        self.grouped(|p| {
            let mut args = Vec::new();
            loop {
                if p.at_punct(")") {
                    break;
                }
                args.push(p.parse_assign()?);
                if !p.eat_punct(",") {
                    break;
                }
            }
            p.expect_punct(")")?;
            Ok(args)
        })
    }

    fn parse_primary(&mut self) -> TranspileResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number => {
                self.bump();
                Ok(Expr::Number(token.text))
            }
            TokenKind::String => {
                let closed = token.text.len() >= 2
                    && token.text.ends_with(token.text.chars().next().unwrap_or('\''))
                    && !token.text.ends_with('\\');
                self.bump();
                if !closed {
                    return Err(TranspileError::UnterminatedLiteral { kind: "string" });
                }
                Ok(Expr::Str(token.text))
            }
            TokenKind::Regex => {
                self.bump();
                Ok(Expr::Regex(token.text))
            }
            TokenKind::Template => {
                self.bump();
                let mut segments = Vec::new();
                for part in &token.parts {
                    match part {
                        TemplatePart::Text(text) => {
                            segments.push(TemplateSegment::Text(text.clone()))
                        }
                        TemplatePart::Expr(src) => {
                            segments.push(TemplateSegment::Expr(parse_expression(src)?))
                        }
                    }
                }
                if !token.text.ends_with('`') || token.text.len() < 2 {
                    return Err(TranspileError::UnterminatedLiteral { kind: "template" });
                }
                Ok(Expr::Template(segments))
            }
            TokenKind::Identifier => self.parse_primary_identifier(token.text),
            TokenKind::Punct if token.text == "(" => {
                if self.paren_arrow_ahead() {
                    self.parse_paren_arrow()
                } else {
                    self.bump();
                    let inner = self.grouped(|p| p.parse_expr())?;
                    self.expect_punct(")")?;
                    Ok(Expr::Paren(Box::new(inner)))
                }
            }
            TokenKind::Punct if token.text == "[" => {
                self.bump();
                self.grouped(|p| {
                    let mut elems = Vec::new();
                    loop {
                        if p.at_punct("]") {
                            break;
                        }
                        elems.push(p.parse_assign()?);
                        if !p.eat_punct(",") {
                            break;
                        }
                    }
                    p.expect_punct("]")?;
                    Ok(Expr::Array(elems))
                })
            }
            TokenKind::Punct if token.text == "{" => self.parse_object_literal(),
            TokenKind::Eof => Err(TranspileError::eof("expression")),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_primary_identifier(&mut self, word: String) -> TranspileResult<Expr> {
        match word.as_str() {
            "true" | "false" => {
                self.bump();
                Ok(Expr::Bool(word == "true"))
            }
            "null" | "undefined" => {
                self.bump();
                Ok(Expr::Nil)
            }
            "new" => {
                self.bump();
                let callee = self.expect_identifier()?;
                let args = if self.at_punct("(") {
                    self.parse_args()?
                } else {
                    Vec::new()
                };
                Ok(Expr::New { callee, args })
            }
            "function" => {
                self.bump();
                // Anonymous function expressions double as callbacks; a
                // name, if present, is dropped.
                if self.peek().kind == TokenKind::Identifier {
                    self.bump();
                }
                let params = self.parse_ident_params()?;
                let body = self.parse_block()?;
                Ok(Expr::Arrow {
                    params,
                    body: ArrowBody::Block(body),
                })
            }
            _ => {
                self.bump();
                // `ident =>` is a one-parameter arrow function
                if self.at_op("=>") && !self.newline_before_sig() {
                    self.bump();
                    let body = self.parse_arrow_body()?;
                    return Ok(Expr::Arrow {
                        params: vec![word],
                        body,
                    });
                }
                Ok(Expr::Ident(word))
            }
        }
    }

    /// Look past a balanced `(...)` group for `=>` without consuming
    /// anything, so `(a, b) => ...` is committed to as an arrow function
    /// before its parameter list is parsed.
    fn paren_arrow_ahead(&self) -> bool {
        let mut i = self.sig_index();
        let mut depth = 0usize;
        while i < self.tokens.len() {
            let t = &self.tokens[i];
            match t.kind {
                TokenKind::Eof => return false,
                TokenKind::Punct if t.text == "(" => depth += 1,
                TokenKind::Punct if t.text == ")" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        let mut j = i + 1;
                        while j < self.tokens.len() - 1 && self.tokens[j].is_trivia() {
                            j += 1;
                        }
                        let after = &self.tokens[j];
                        return after.kind == TokenKind::Operator && after.text == "=>";
                    }
                }
                _ => {}
            }
            i += 1;
        }
        false
    }

    fn parse_paren_arrow(&mut self) -> TranspileResult<Expr> {
        let params = self.parse_ident_params()?;
        self.expect_op("=>")?;
        let body = self.parse_arrow_body()?;
        Ok(Expr::Arrow { params, body })
    }

    /// `(a, b, c)` with identifier parameters only; destructuring
    /// patterns are not part of the supported subset.
    fn parse_ident_params(&mut self) -> TranspileResult<Vec<String>> {
        self.expect_punct("(")?;
        self.grouped(|p| {
            let mut params = Vec::new();
            loop {
                if p.at_punct(")") {
                    break;
                }
                params.push(p.expect_identifier()?);
                if !p.eat_punct(",") {
                    break;
                }
            }
            p.expect_punct(")")?;
            Ok(params)
        })
    }

    fn parse_arrow_body(&mut self) -> TranspileResult<ArrowBody> {
        if self.at_punct("{") {
            Ok(ArrowBody::Block(self.parse_block()?))
        } else {
            Ok(ArrowBody::Expr(Box::new(self.parse_assign()?)))
        }
    }

    fn parse_object_literal(&mut self) -> TranspileResult<Expr> {
        self.expect_punct("{")?;
        self.grouped(|p| {
            let mut props = Vec::new();
            loop {
                if p.at_punct("}") {
                    break;
                }
                let key = match p.peek().kind {
                    TokenKind::Identifier => PropKey::Ident(p.bump().text),
                    TokenKind::String => PropKey::Str(p.bump().text),
                    _ => return Err(p.unexpected()),
                };
                p.expect_op(":")?;
                let value = p.parse_assign()?;
                props.push((key, value));
                if !p.eat_punct(",") {
                    break;
                }
            }
            p.expect_punct("}")?;
            Ok(Expr::Object(props))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    fn expr(src: &str) -> Expr {
        parse_expression(src).unwrap()
    }

    // =========================================================================
    // Precedence
    // =========================================================================

    #[test]
    fn test_precedence_mul_over_add() {
        let e = expr("1 + 2 * 3");
        let Expr::Binary { op, rhs, .. } = e else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(
            *rhs,
            Expr::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_precedence_and_over_or() {
        let e = expr("a || b && c");
        let Expr::Binary { op, rhs, .. } = e else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Or);
        assert!(matches!(
            *rhs,
            Expr::Binary {
                op: BinaryOp::And,
                ..
            }
        ));
    }

    #[test]
    fn test_left_associativity() {
        let e = expr("10 - 4 - 3");
        let Expr::Binary { op, lhs, .. } = e else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Sub);
        assert!(matches!(
            *lhs,
            Expr::Binary {
                op: BinaryOp::Sub,
                ..
            }
        ));
    }

    #[test]
    fn test_strict_and_loose_equality_collapse() {
        assert!(matches!(
            expr("a === b"),
            Expr::Binary {
                op: BinaryOp::Eq,
                ..
            }
        ));
        assert!(matches!(
            expr("a != b"),
            Expr::Binary {
                op: BinaryOp::Ne,
                ..
            }
        ));
    }

    // =========================================================================
    // Arrow functions
    // =========================================================================

    #[test]
    fn test_single_param_arrow() {
        let Expr::Arrow { params, body } = expr("x => x + 1") else {
            panic!("expected arrow");
        };
        assert_eq!(params, vec!["x"]);
        assert!(matches!(body, ArrowBody::Expr(_)));
    }

    #[test]
    fn test_paren_params_arrow() {
        let Expr::Arrow { params, .. } = expr("(a, b) => a - b") else {
            panic!("expected arrow");
        };
        assert_eq!(params, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_params_arrow_with_block() {
        let Expr::Arrow { params, body } = expr("() => { return 1 }") else {
            panic!("expected arrow");
        };
        assert!(params.is_empty());
        assert!(matches!(body, ArrowBody::Block(_)));
    }

    #[test]
    fn test_paren_expression_is_not_arrow() {
        assert!(matches!(expr("(a + b)"), Expr::Paren(_)));
    }

    #[test]
    fn test_function_expression() {
        let Expr::Arrow { params, body } = expr("function(a) { return a }") else {
            panic!("expected function expression");
        };
        assert_eq!(params, vec!["a"]);
        assert!(matches!(body, ArrowBody::Block(_)));
    }

    #[test]
    fn test_destructured_arrow_params_rejected() {
        assert!(parse_expression("([a, b]) => a").is_err());
    }

    // =========================================================================
    // Postfix chains and literals
    // =========================================================================

    #[test]
    fn test_member_call_chain() {
        let Expr::Call { callee, args } = expr("notes.filter(x => x.open)") else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 1);
        assert!(matches!(*callee, Expr::Member { .. }));
    }

    #[test]
    fn test_index_expression() {
        let Expr::Index { index, .. } = expr("arr[i + 1]") else {
            panic!("expected index");
        };
        assert!(matches!(*index, Expr::Binary { .. }));
    }

    #[test]
    fn test_postfix_and_prefix_update() {
        assert!(matches!(
            expr("i++"),
            Expr::Update {
                prefix: false,
                op: UpdateOp::Increment,
                ..
            }
        ));
        assert!(matches!(
            expr("--i"),
            Expr::Update {
                prefix: true,
                op: UpdateOp::Decrement,
                ..
            }
        ));
    }

    #[test]
    fn test_ternary() {
        let Expr::Ternary { .. } = expr("a ? b : c") else {
            panic!("expected ternary");
        };
    }

    #[test]
    fn test_array_and_object_literals() {
        assert!(matches!(expr("[1, 2, 3]"), Expr::Array(v) if v.len() == 3));
        let Expr::Object(props) = expr("{a: 1, \"b c\": 2}") else {
            panic!("expected object");
        };
        assert_eq!(props.len(), 2);
        assert!(matches!(props[1].0, PropKey::Str(_)));
    }

    #[test]
    fn test_new_map() {
        let Expr::New { callee, args } = expr("new Map()") else {
            panic!("expected new");
        };
        assert_eq!(callee, "Map");
        assert!(args.is_empty());
    }

    #[test]
    fn test_typeof() {
        assert!(matches!(
            expr("typeof x"),
            Expr::Unary {
                op: UnaryOp::TypeOf,
                ..
            }
        ));
    }

    #[test]
    fn test_template_hole_parsed() {
        let Expr::Template(segments) = expr("`n: ${a + b}`") else {
            panic!("expected template");
        };
        assert_eq!(segments.len(), 2);
        assert!(matches!(
            &segments[1],
            crate::ast::TemplateSegment::Expr(Expr::Binary { .. })
        ));
    }

    #[test]
    fn test_unterminated_string_rejected() {
        assert!(parse_expression("'abc").is_err());
    }
}
