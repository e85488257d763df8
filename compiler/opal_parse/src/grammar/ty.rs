//! Type grammar.
//!
//! ```text
//! type      := base ('[' ']')*
//! base      := prim | path | '(' compound ')' | callable
//! compound  := type                      (singleton tuple)
//!            | type (',' type)+          (tuple)
//!            | type ('|' type)+          (union)
//!            | type ':' type             (map)
//! callable  := ('functype'|'proctype') type? '(' (type (',' type)*)? ')'
//! ```

use crate::cursor::{Cursor, PResult};
use opal_ir::ast::{MemberPath, ParsedType, ParsedTypeKind, PrimName};
use opal_ir::{Keyword, Op, Punct, TokenKind};

pub fn parse_type(cx: &mut Cursor) -> PResult<ParsedType> {
    let mut ty = parse_base_type(cx)?;
    // Each `[]` pair adds one array dimension.
    while cx.at_punct(Punct::LBracket) && cx.nth(1).kind == TokenKind::Punct(Punct::RBracket) {
        cx.advance();
        let end = cx.advance().span;
        ty = ParsedType {
            span: ty.span.merge(end),
            kind: ParsedTypeKind::Array(Box::new(ty)),
        };
    }
    Ok(ty)
}

fn parse_base_type(cx: &mut Cursor) -> PResult<ParsedType> {
    if let TokenKind::Kw(kw) = cx.peek().kind {
        if let Some(prim) = prim_for_keyword(kw) {
            let span = cx.advance().span;
            return Ok(ParsedType { kind: ParsedTypeKind::Prim(prim), span });
        }
        if kw == Keyword::Functype || kw == Keyword::Proctype {
            return parse_callable_type(cx);
        }
    }

    match cx.peek().kind {
        TokenKind::Ident(_) => {
            let path = parse_member_path(cx)?;
            let span = path.span;
            Ok(ParsedType { kind: ParsedTypeKind::Named(path), span })
        }
        TokenKind::Punct(Punct::LParen) => parse_compound_type(cx),
        _ => Err(cx.expected("type")),
    }
}

/// `(T)` singleton tuple, `(T, U)` tuple, `(T | U)` union, `(K : V)` map.
fn parse_compound_type(cx: &mut Cursor) -> PResult<ParsedType> {
    let start = cx.expect_punct(Punct::LParen)?;
    let first = parse_type(cx)?;

    if cx.eat_punct(Punct::Colon) {
        let value = parse_type(cx)?;
        let end = cx.expect_punct(Punct::RParen)?;
        return Ok(ParsedType {
            kind: ParsedTypeKind::Map(Box::new(first), Box::new(value)),
            span: start.merge(end),
        });
    }

    if cx.at_op(Op::BitOr) {
        let mut options = vec![first];
        while cx.eat_op(Op::BitOr) {
            options.push(parse_type(cx)?);
        }
        let end = cx.expect_punct(Punct::RParen)?;
        return Ok(ParsedType {
            kind: ParsedTypeKind::Union(options),
            span: start.merge(end),
        });
    }

    let mut members = vec![first];
    while cx.eat_punct(Punct::Comma) {
        members.push(parse_type(cx)?);
    }
    let end = cx.expect_punct(Punct::RParen)?;
    Ok(ParsedType {
        kind: ParsedTypeKind::Tuple(members),
        span: start.merge(end),
    })
}

fn parse_callable_type(cx: &mut Cursor) -> PResult<ParsedType> {
    let pure = cx.at_kw(Keyword::Functype);
    let start = cx.advance().span;
    let ret = if cx.at_punct(Punct::LParen) {
        None
    } else {
        Some(Box::new(parse_type(cx)?))
    };
    cx.expect_punct(Punct::LParen)?;
    let mut params = Vec::new();
    if !cx.at_punct(Punct::RParen) {
        loop {
            params.push(parse_type(cx)?);
            if !cx.eat_punct(Punct::Comma) {
                break;
            }
        }
    }
    let end = cx.expect_punct(Punct::RParen)?;
    Ok(ParsedType {
        kind: ParsedTypeKind::Callable { pure, ret, params },
        span: start.merge(end),
    })
}

/// `a`, `a.b`, `a.b.c`: dotted identifier chain.
pub fn parse_member_path(cx: &mut Cursor) -> PResult<MemberPath> {
    let (first, start) = cx.expect_ident()?;
    let mut parts = vec![first];
    let mut span = start;
    while cx.at_punct(Punct::Dot) {
        // Only continue the path when an identifier follows the dot.
        if !matches!(cx.nth(1).kind, TokenKind::Ident(_)) {
            break;
        }
        cx.advance();
        let (part, part_span) = cx.expect_ident()?;
        parts.push(part);
        span = span.merge(part_span);
    }
    Ok(MemberPath { parts, span })
}

fn prim_for_keyword(kw: Keyword) -> Option<PrimName> {
    Some(match kw {
        Keyword::Void => PrimName::Void,
        Keyword::Bool => PrimName::Bool,
        Keyword::Char => PrimName::Char,
        Keyword::Byte => PrimName::Byte,
        Keyword::Ubyte => PrimName::Ubyte,
        Keyword::Short => PrimName::Short,
        Keyword::Ushort => PrimName::Ushort,
        Keyword::Int => PrimName::Int,
        Keyword::Uint => PrimName::Uint,
        Keyword::Long => PrimName::Long,
        Keyword::Ulong => PrimName::Ulong,
        Keyword::Float => PrimName::Float,
        Keyword::Double => PrimName::Double,
        Keyword::ErrorType => PrimName::Error,
        _ => return None,
    })
}
