//! Statement grammar.

use crate::cursor::{Cursor, PResult};
use crate::grammar::expr::parse_expr;
use crate::grammar::ty::parse_type;
use opal_ir::ast::{Expr, ExprKind, MatchCase, Stmt, StmtKind};
use opal_ir::{Keyword, Op, Punct, Span, TokenKind};

/// `{ stmt* }`; returns the statements and the brace span.
pub fn parse_block(cx: &mut Cursor) -> PResult<(Vec<Stmt>, Span)> {
    let start = cx.expect_punct(Punct::LBrace)?;
    let mut stmts = Vec::new();
    while !cx.at_punct(Punct::RBrace) {
        if cx.at_eof() {
            return Err(cx.expected("}"));
        }
        stmts.push(parse_stmt(cx)?);
    }
    let end = cx.expect_punct(Punct::RBrace)?;
    Ok((stmts, start.merge(end)))
}

pub fn parse_stmt(cx: &mut Cursor) -> PResult<Stmt> {
    let tok = *cx.peek();
    match tok.kind {
        TokenKind::Punct(Punct::LBrace) => {
            let (stmts, span) = parse_block(cx)?;
            Ok(Stmt { kind: StmtKind::Block(stmts), span })
        }
        TokenKind::Kw(Keyword::If) => parse_if(cx),
        TokenKind::Kw(Keyword::While) => parse_while(cx),
        TokenKind::Kw(Keyword::For) => parse_for(cx),
        TokenKind::Kw(Keyword::Switch) => parse_switch(cx),
        TokenKind::Kw(Keyword::Match) => parse_match(cx),
        TokenKind::Kw(Keyword::Break) => {
            let span = cx.advance().span;
            cx.expect_punct(Punct::Semicolon)?;
            Ok(Stmt { kind: StmtKind::Break, span })
        }
        TokenKind::Kw(Keyword::Continue) => {
            let span = cx.advance().span;
            cx.expect_punct(Punct::Semicolon)?;
            Ok(Stmt { kind: StmtKind::Continue, span })
        }
        TokenKind::Kw(Keyword::Return) => {
            let start = cx.advance().span;
            let value = if cx.at_punct(Punct::Semicolon) {
                None
            } else {
                Some(parse_expr(cx)?)
            };
            let end = cx.expect_punct(Punct::Semicolon)?;
            Ok(Stmt { kind: StmtKind::Return(value), span: start.merge(end) })
        }
        TokenKind::Kw(Keyword::Print) => {
            let start = cx.advance().span;
            cx.expect_punct(Punct::LParen)?;
            let mut exprs = Vec::new();
            if !cx.at_punct(Punct::RParen) {
                loop {
                    exprs.push(parse_expr(cx)?);
                    if !cx.eat_punct(Punct::Comma) {
                        break;
                    }
                }
            }
            cx.expect_punct(Punct::RParen)?;
            let end = cx.expect_punct(Punct::Semicolon)?;
            Ok(Stmt { kind: StmtKind::Print(exprs), span: start.merge(end) })
        }
        TokenKind::Kw(Keyword::Assert) => {
            let start = cx.advance().span;
            cx.expect_punct(Punct::LParen)?;
            let asserted = parse_expr(cx)?;
            cx.expect_punct(Punct::RParen)?;
            let end = cx.expect_punct(Punct::Semicolon)?;
            Ok(Stmt { kind: StmtKind::Assert(asserted), span: start.merge(end) })
        }
        _ => {
            let stmt = parse_simple_stmt(cx)?;
            let end = cx.expect_punct(Punct::Semicolon)?;
            Ok(Stmt { span: stmt.span.merge(end), ..stmt })
        }
    }
}

/// A declaration, assignment, or call without its trailing semicolon.
/// Shared by statement position and the for-loop header.
fn parse_simple_stmt(cx: &mut Cursor) -> PResult<Stmt> {
    // Try a variable declaration first: TYPE IDENT followed by `=` or `;`
    // or `)` (for-loop increment position never declares, but the header
    // init does and ends at `;`).
    let snapshot = cx.snapshot();
    if let Ok(ty) = parse_type(cx) {
        if let Ok((name, nspan)) = cx.expect_ident() {
            if cx.at_op(Op::Assign) {
                cx.advance();
                let init = parse_expr(cx)?;
                let span = ty.span.merge(init.span);
                return Ok(Stmt {
                    kind: StmtKind::VarDecl { ty, name, init: Some(init) },
                    span,
                });
            }
            if cx.at_punct(Punct::Semicolon) {
                let span = ty.span.merge(nspan);
                return Ok(Stmt {
                    kind: StmtKind::VarDecl { ty, name, init: None },
                    span,
                });
            }
        }
        cx.restore(snapshot);
    } else {
        cx.restore(snapshot);
    }

    // Otherwise an expression, possibly the target of an assignment.
    let expr = parse_expr(cx)?;
    if let TokenKind::Op(op) = cx.peek().kind {
        if op == Op::Assign {
            cx.advance();
            let rhs = parse_expr(cx)?;
            let span = expr.span.merge(rhs.span);
            return Ok(Stmt { kind: StmtKind::Assign { lhs: expr, op: None, rhs }, span });
        }
        if let Some(base) = op.compound_assign_base() {
            cx.advance();
            let rhs = parse_expr(cx)?;
            let span = expr.span.merge(rhs.span);
            return Ok(Stmt {
                kind: StmtKind::Assign { lhs: expr, op: Some(base), rhs },
                span,
            });
        }
        if op == Op::Inc || op == Op::Dec {
            let end = cx.advance().span;
            let span = expr.span.merge(end);
            let one = Expr { kind: ExprKind::Int(1), span: end };
            let base = if op == Op::Inc { Op::Plus } else { Op::Minus };
            return Ok(Stmt {
                kind: StmtKind::Assign { lhs: expr, op: Some(base), rhs: one },
                span,
            });
        }
    }
    if matches!(expr.kind, ExprKind::Call { .. }) {
        let span = expr.span;
        return Ok(Stmt { kind: StmtKind::Call(expr), span });
    }
    Err(cx.error("expression is not a statement"))
}

fn parse_if(cx: &mut Cursor) -> PResult<Stmt> {
    let start = cx.expect_kw(Keyword::If)?;
    cx.expect_punct(Punct::LParen)?;
    let cond = parse_expr(cx)?;
    cx.expect_punct(Punct::RParen)?;
    let then = Box::new(parse_stmt(cx)?);
    let mut span = start.merge(then.span);
    let els = if cx.eat_kw(Keyword::Else) {
        let e = parse_stmt(cx)?;
        span = span.merge(e.span);
        Some(Box::new(e))
    } else {
        None
    };
    Ok(Stmt { kind: StmtKind::If { cond, then, els }, span })
}

fn parse_while(cx: &mut Cursor) -> PResult<Stmt> {
    let start = cx.expect_kw(Keyword::While)?;
    cx.expect_punct(Punct::LParen)?;
    let cond = parse_expr(cx)?;
    cx.expect_punct(Punct::RParen)?;
    let body = Box::new(parse_stmt(cx)?);
    let span = start.merge(body.span);
    Ok(Stmt { kind: StmtKind::While { cond, body }, span })
}

/// Three loop forms:
/// `for (init; cond; incr) body`: C-style;
/// `for i : begin, end body`: range;
/// `for [c1, ..., it] : arr body`: array iteration.
fn parse_for(cx: &mut Cursor) -> PResult<Stmt> {
    let start = cx.expect_kw(Keyword::For)?;

    if cx.eat_punct(Punct::LParen) {
        let init = if cx.at_punct(Punct::Semicolon) {
            None
        } else {
            Some(Box::new(parse_simple_stmt(cx)?))
        };
        cx.expect_punct(Punct::Semicolon)?;
        let cond = parse_expr(cx)?;
        cx.expect_punct(Punct::Semicolon)?;
        let incr = if cx.at_punct(Punct::RParen) {
            None
        } else {
            Some(Box::new(parse_simple_stmt(cx)?))
        };
        cx.expect_punct(Punct::RParen)?;
        let body = Box::new(parse_stmt(cx)?);
        let span = start.merge(body.span);
        return Ok(Stmt { kind: StmtKind::ForC { init, cond, incr, body }, span });
    }

    if cx.eat_punct(Punct::LBracket) {
        let mut names = Vec::new();
        loop {
            let (name, _) = cx.expect_ident()?;
            names.push(name);
            if !cx.eat_punct(Punct::Comma) {
                break;
            }
        }
        cx.expect_punct(Punct::RBracket)?;
        cx.expect_punct(Punct::Colon)?;
        let arr = parse_expr(cx)?;
        let body = Box::new(parse_stmt(cx)?);
        let span = start.merge(body.span);
        return Ok(Stmt { kind: StmtKind::ForArray { names, arr, body }, span });
    }

    let (counter, _) = cx.expect_ident()?;
    cx.expect_punct(Punct::Colon)?;
    let begin = parse_expr(cx)?;
    cx.expect_punct(Punct::Comma)?;
    let end = parse_expr(cx)?;
    let body = Box::new(parse_stmt(cx)?);
    let span = start.merge(body.span);
    Ok(Stmt { kind: StmtKind::ForRange { counter, begin, end, body }, span })
}

/// `switch (e) { case C: stmt* ... default: stmt* }`: a flat statement
/// list with case labels recorded as statement indices; execution falls
/// through until `break`.
fn parse_switch(cx: &mut Cursor) -> PResult<Stmt> {
    let start = cx.expect_kw(Keyword::Switch)?;
    cx.expect_punct(Punct::LParen)?;
    let scrutinee = parse_expr(cx)?;
    cx.expect_punct(Punct::RParen)?;
    cx.expect_punct(Punct::LBrace)?;

    let mut cases = Vec::new();
    let mut default = None;
    let mut stmts = Vec::new();
    while !cx.at_punct(Punct::RBrace) {
        if cx.at_eof() {
            return Err(cx.expected("}"));
        }
        if cx.eat_kw(Keyword::Case) {
            let value = parse_expr(cx)?;
            cx.expect_punct(Punct::Colon)?;
            cases.push((value, stmts.len()));
        } else if cx.at_kw(Keyword::Default) {
            let dspan = cx.advance().span;
            cx.expect_punct(Punct::Colon)?;
            if default.is_some() {
                return Err(opal_diagnostic::Diagnostic::error(
                    dspan,
                    "switch has more than one default label",
                ));
            }
            default = Some(stmts.len());
        } else {
            stmts.push(parse_stmt(cx)?);
        }
    }
    let end = cx.expect_punct(Punct::RBrace)?;
    Ok(Stmt {
        kind: StmtKind::Switch { scrutinee, cases, default, stmts },
        span: start.merge(end),
    })
}

/// `match (v : e) { TYPE: stmt* ... }`: cases keyed by union option
/// type; `v` is bound to the payload in each case body.
fn parse_match(cx: &mut Cursor) -> PResult<Stmt> {
    let start = cx.expect_kw(Keyword::Match)?;
    cx.expect_punct(Punct::LParen)?;
    let (binding, _) = cx.expect_ident()?;
    cx.expect_punct(Punct::Colon)?;
    let scrutinee = parse_expr(cx)?;
    cx.expect_punct(Punct::RParen)?;
    cx.expect_punct(Punct::LBrace)?;

    let mut cases: Vec<MatchCase> = Vec::new();
    while !cx.at_punct(Punct::RBrace) {
        if cx.at_eof() {
            return Err(cx.expected("}"));
        }
        // A case label is a type followed by `:`; anything else is a
        // statement of the current case body.
        let snapshot = cx.snapshot();
        let label = match parse_type(cx) {
            Ok(ty) if cx.at_punct(Punct::Colon) => {
                cx.advance();
                Some(ty)
            }
            _ => {
                cx.restore(snapshot);
                None
            }
        };
        match label {
            Some(ty) => {
                let span = ty.span;
                cases.push(MatchCase { ty, body: Vec::new(), span });
            }
            None => match cases.last_mut() {
                Some(case) => case.body.push(parse_stmt(cx)?),
                None => return Err(cx.error("match body must start with a type case")),
            },
        }
    }
    let end = cx.expect_punct(Punct::RBrace)?;
    if cases.is_empty() {
        return Err(opal_diagnostic::Diagnostic::error(
            start.merge(end),
            "match must have at least one case",
        ));
    }
    Ok(Stmt {
        kind: StmtKind::Match { binding, scrutinee, cases },
        span: start.merge(end),
    })
}
