//! Declaration grammar: modules, structs, enums, typedefs, subroutines,
//! external subroutines, and variables.

use crate::cursor::{Cursor, PResult};
use crate::grammar::stmt::parse_block;
use crate::grammar::ty::parse_type;
use opal_ir::ast::{Decl, DeclKind, EnumItemDecl, ParamDecl, ParsedType, SubrDecl};
use opal_ir::{Keyword, Name, Op, Punct, Span, TokenKind};

pub fn parse_program(cx: &mut Cursor) -> PResult<Vec<Decl>> {
    let mut decls = Vec::new();
    while !cx.at_eof() {
        decls.push(parse_decl(cx)?);
    }
    Ok(decls)
}

pub fn parse_decl(cx: &mut Cursor) -> PResult<Decl> {
    match cx.peek().kind {
        TokenKind::Kw(Keyword::Module) => parse_module(cx),
        TokenKind::Kw(Keyword::Struct) => parse_struct(cx),
        TokenKind::Kw(Keyword::Enum) => parse_enum(cx),
        TokenKind::Kw(Keyword::Typedef) => parse_typedef(cx),
        TokenKind::Kw(Keyword::Func) => parse_subroutine(cx, true, false),
        TokenKind::Kw(Keyword::Proc) => parse_subroutine(cx, false, false),
        TokenKind::Kw(Keyword::Extern) => {
            cx.advance();
            match cx.peek().kind {
                TokenKind::Kw(Keyword::Func) => parse_subroutine(cx, true, true),
                TokenKind::Kw(Keyword::Proc) => parse_subroutine(cx, false, true),
                _ => Err(cx.expected("func or proc after extern")),
            }
        }
        TokenKind::Kw(Keyword::Static) => {
            let start = cx.advance().span;
            parse_var_decl(cx, start, true)
        }
        _ => {
            let start = cx.span();
            parse_var_decl(cx, start, false)
        }
    }
}

fn parse_module(cx: &mut Cursor) -> PResult<Decl> {
    let start = cx.expect_kw(Keyword::Module)?;
    let (name, _) = cx.expect_ident()?;
    cx.expect_punct(Punct::LBrace)?;
    let mut decls = Vec::new();
    while !cx.at_punct(Punct::RBrace) {
        if cx.at_eof() {
            return Err(cx.expected("}"));
        }
        decls.push(parse_decl(cx)?);
    }
    let end = cx.expect_punct(Punct::RBrace)?;
    Ok(Decl {
        kind: DeclKind::Module { name, decls },
        span: start.merge(end),
    })
}

fn parse_struct(cx: &mut Cursor) -> PResult<Decl> {
    let start = cx.expect_kw(Keyword::Struct)?;
    let (name, _) = cx.expect_ident()?;
    cx.expect_punct(Punct::LBrace)?;
    let mut decls = Vec::new();
    while !cx.at_punct(Punct::RBrace) {
        if cx.at_eof() {
            return Err(cx.expected("}"));
        }
        decls.push(parse_decl(cx)?);
    }
    let end = cx.expect_punct(Punct::RBrace)?;
    Ok(Decl {
        kind: DeclKind::Struct { name, decls },
        span: start.merge(end),
    })
}

fn parse_enum(cx: &mut Cursor) -> PResult<Decl> {
    let start = cx.expect_kw(Keyword::Enum)?;
    let (name, _) = cx.expect_ident()?;
    cx.expect_punct(Punct::LBrace)?;
    let mut items = Vec::new();
    while !cx.at_punct(Punct::RBrace) {
        let (item_name, item_span) = cx.expect_ident()?;
        let value = if cx.eat_op(Op::Assign) {
            let neg = cx.eat_op(Op::Minus);
            match cx.peek().kind {
                TokenKind::Int(v) => {
                    cx.advance();
                    Some((neg, v))
                }
                _ => return Err(cx.expected("integer enum value")),
            }
        } else {
            None
        };
        items.push(EnumItemDecl { name: item_name, value, span: item_span });
        if !cx.eat_punct(Punct::Comma) {
            break;
        }
    }
    let end = cx.expect_punct(Punct::RBrace)?;
    if items.is_empty() {
        return Err(opal_diagnostic::Diagnostic::error(
            start.merge(end),
            "enum must have at least one value",
        ));
    }
    Ok(Decl {
        kind: DeclKind::Enum { name, items },
        span: start.merge(end),
    })
}

fn parse_typedef(cx: &mut Cursor) -> PResult<Decl> {
    let start = cx.expect_kw(Keyword::Typedef)?;
    let ty = parse_type(cx)?;
    let (name, _) = cx.expect_ident()?;
    let end = cx.expect_punct(Punct::Semicolon)?;
    Ok(Decl {
        kind: DeclKind::Typedef { ty, name },
        span: start.merge(end),
    })
}

/// `func`/`proc`, an optional return type (void when omitted), name,
/// parameter list, then a body block, or `;` for externals.
fn parse_subroutine(cx: &mut Cursor, pure: bool, is_extern: bool) -> PResult<Decl> {
    let kw = if pure { Keyword::Func } else { Keyword::Proc };
    let start = cx.expect_kw(kw)?;

    let (ret, name) = parse_ret_and_name(cx)?;

    cx.expect_punct(Punct::LParen)?;
    let mut params = Vec::new();
    if !cx.at_punct(Punct::RParen) {
        loop {
            let ty = parse_type(cx)?;
            let (pname, pspan) = cx.expect_ident()?;
            params.push(ParamDecl { span: ty.span.merge(pspan), ty, name: pname });
            if !cx.eat_punct(Punct::Comma) {
                break;
            }
        }
    }
    cx.expect_punct(Punct::RParen)?;

    let (body, end) = if is_extern {
        (None, cx.expect_punct(Punct::Semicolon)?)
    } else {
        let (stmts, bspan) = parse_block(cx)?;
        (Some(stmts), bspan)
    };

    let span = start.merge(end);
    let subr = SubrDecl { pure, ret, name, params, body, span };
    let kind = if is_extern {
        DeclKind::ExternSubroutine(subr)
    } else {
        DeclKind::Subroutine(subr)
    };
    Ok(Decl { kind, span })
}

/// Disambiguate `func int f(` from `func f(`: try type-then-name, fall
/// back to a bare name with void return.
fn parse_ret_and_name(cx: &mut Cursor) -> PResult<(Option<ParsedType>, Name)> {
    let snapshot = cx.snapshot();
    if let Ok(ty) = parse_type(cx) {
        if let Ok((name, _)) = cx.expect_ident() {
            if cx.at_punct(Punct::LParen) {
                return Ok((Some(ty), name));
            }
        }
        cx.restore(snapshot);
    } else {
        cx.restore(snapshot);
    }
    let (name, _) = cx.expect_ident()?;
    Ok((None, name))
}

fn parse_var_decl(cx: &mut Cursor, start: Span, is_static: bool) -> PResult<Decl> {
    let ty = parse_type(cx)?;
    let (name, _) = cx.expect_ident()?;
    let init = if cx.eat_op(Op::Assign) {
        Some(crate::grammar::expr::parse_expr(cx)?)
    } else {
        None
    };
    let end = cx.expect_punct(Punct::Semicolon)?;
    Ok(Decl {
        kind: DeclKind::Var { ty, name, init, is_static },
        span: start.merge(end),
    })
}
