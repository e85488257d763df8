//! Expression grammar: precedence climbing over the operator table, unary
//! prefixes, postfix call/index/member, and `is`/`as` narrowing.

use crate::cursor::{Cursor, PResult};
use crate::grammar::ty::{parse_member_path, parse_type};
use opal_ir::ast::{Expr, ExprKind};
use opal_ir::{Keyword, Op, Punct, TokenKind};

pub fn parse_expr(cx: &mut Cursor) -> PResult<Expr> {
    parse_binary(cx, 1)
}

fn parse_binary(cx: &mut Cursor, min_prec: u8) -> PResult<Expr> {
    let mut lhs = parse_unary(cx)?;
    loop {
        let TokenKind::Op(op) = cx.peek().kind else {
            break;
        };
        let prec = op.precedence();
        if prec == 0 || prec < min_prec {
            break;
        }
        cx.advance();
        // Left associativity: the right side binds strictly tighter.
        let rhs = parse_binary(cx, prec + 1)?;
        lhs = Expr {
            span: lhs.span.merge(rhs.span),
            kind: ExprKind::Binary(Box::new(lhs), op, Box::new(rhs)),
        };
    }
    Ok(lhs)
}

fn parse_unary(cx: &mut Cursor) -> PResult<Expr> {
    if let TokenKind::Op(op @ (Op::Not | Op::Tilde | Op::Minus)) = cx.peek().kind {
        let start = cx.advance().span;
        let operand = parse_unary(cx)?;
        return Ok(Expr {
            span: start.merge(operand.span),
            kind: ExprKind::Unary(op, Box::new(operand)),
        });
    }
    parse_postfix(cx)
}

fn parse_postfix(cx: &mut Cursor) -> PResult<Expr> {
    let mut expr = parse_primary(cx)?;
    loop {
        if cx.at_punct(Punct::LParen) {
            cx.advance();
            let mut args = Vec::new();
            if !cx.at_punct(Punct::RParen) {
                loop {
                    args.push(parse_expr(cx)?);
                    if !cx.eat_punct(Punct::Comma) {
                        break;
                    }
                }
            }
            let end = cx.expect_punct(Punct::RParen)?;
            expr = Expr {
                span: expr.span.merge(end),
                kind: ExprKind::Call { callee: Box::new(expr), args },
            };
        } else if cx.at_punct(Punct::LBracket) {
            cx.advance();
            let index = parse_expr(cx)?;
            let end = cx.expect_punct(Punct::RBracket)?;
            expr = Expr {
                span: expr.span.merge(end),
                kind: ExprKind::Index { base: Box::new(expr), index: Box::new(index) },
            };
        } else if cx.at_punct(Punct::Dot) {
            cx.advance();
            let (field, fspan) = cx.expect_ident()?;
            expr = Expr {
                span: expr.span.merge(fspan),
                kind: ExprKind::Field { base: Box::new(expr), field },
            };
        } else if cx.at_kw(Keyword::Is) {
            cx.advance();
            let ty = parse_type(cx)?;
            expr = Expr {
                span: expr.span.merge(ty.span),
                kind: ExprKind::Is { base: Box::new(expr), ty },
            };
        } else if cx.at_kw(Keyword::As) {
            cx.advance();
            let ty = parse_type(cx)?;
            expr = Expr {
                span: expr.span.merge(ty.span),
                kind: ExprKind::As { base: Box::new(expr), ty },
            };
        } else {
            break;
        }
    }
    Ok(expr)
}

fn parse_primary(cx: &mut Cursor) -> PResult<Expr> {
    let tok = *cx.peek();
    match tok.kind {
        TokenKind::Int(v) => {
            cx.advance();
            Ok(Expr { kind: ExprKind::Int(v), span: tok.span })
        }
        TokenKind::Float(bits) => {
            cx.advance();
            Ok(Expr { kind: ExprKind::Float(f64::from_bits(bits)), span: tok.span })
        }
        TokenKind::Str(name) => {
            cx.advance();
            Ok(Expr { kind: ExprKind::Str(name), span: tok.span })
        }
        TokenKind::Char(b) => {
            cx.advance();
            Ok(Expr { kind: ExprKind::Char(b), span: tok.span })
        }
        TokenKind::Kw(Keyword::True) => {
            cx.advance();
            Ok(Expr { kind: ExprKind::Bool(true), span: tok.span })
        }
        TokenKind::Kw(Keyword::False) => {
            cx.advance();
            Ok(Expr { kind: ExprKind::Bool(false), span: tok.span })
        }
        TokenKind::Kw(Keyword::This) => {
            cx.advance();
            Ok(Expr { kind: ExprKind::This, span: tok.span })
        }
        TokenKind::Kw(Keyword::Array) => parse_new_array(cx),
        TokenKind::Ident(_) => {
            let path = parse_member_path(cx)?;
            let span = path.span;
            Ok(Expr { kind: ExprKind::Path(path), span })
        }
        TokenKind::Punct(Punct::LParen) => {
            cx.advance();
            let inner = parse_expr(cx)?;
            cx.expect_punct(Punct::RParen)?;
            Ok(inner)
        }
        TokenKind::Punct(Punct::LBracket) => {
            let start = cx.advance().span;
            let mut members = Vec::new();
            if !cx.at_punct(Punct::RBracket) {
                loop {
                    members.push(parse_expr(cx)?);
                    if !cx.eat_punct(Punct::Comma) {
                        break;
                    }
                }
            }
            let end = cx.expect_punct(Punct::RBracket)?;
            Ok(Expr {
                kind: ExprKind::Compound(members),
                span: start.merge(end),
            })
        }
        _ => Err(cx.expected("expression")),
    }
}

/// `array T[e1][e2]...`: allocation with default-filled elements.
fn parse_new_array(cx: &mut Cursor) -> PResult<Expr> {
    let start = cx.expect_kw(Keyword::Array)?;
    let elem = parse_type(cx)?;
    let mut dims = Vec::new();
    let mut span = start.merge(elem.span);
    while cx.at_punct(Punct::LBracket) {
        cx.advance();
        let dim = parse_expr(cx)?;
        span = span.merge(cx.expect_punct(Punct::RBracket)?);
        dims.push(dim);
    }
    if dims.is_empty() {
        return Err(cx.error("array allocation needs at least one dimension"));
    }
    Ok(Expr { kind: ExprKind::NewArray { elem, dims }, span })
}
