//! Cooking pass: raw token slices become validated, interned token kinds.

use crate::escape::{decode_escape, unescape_string};
use crate::raw_token::RawToken;
use crate::LexError;
use opal_ir::{Keyword, Span, StringInterner, TokenKind};

/// Convert one raw token into its cooked kind.
pub fn convert_token(
    raw: RawToken,
    slice: &str,
    span: Span,
    interner: &StringInterner,
) -> Result<TokenKind, LexError> {
    match raw {
        RawToken::Ident => {
            if slice.ends_with("__") {
                return Err(LexError::new(
                    span,
                    format!("identifier \"{slice}\" is reserved (trailing double underscore)"),
                ));
            }
            match Keyword::from_str(slice) {
                Some(kw) => Ok(TokenKind::Kw(kw)),
                None => Ok(TokenKind::Ident(interner.intern(slice))),
            }
        }
        RawToken::HexInt => parse_radix(&slice[2..], 16, slice, span),
        RawToken::BinInt => parse_radix(&slice[2..], 2, slice, span),
        RawToken::DecInt => slice
            .parse::<u64>()
            .map(TokenKind::Int)
            .map_err(|_| LexError::new(span, format!("integer literal {slice} is too large"))),
        RawToken::Float => slice
            .parse::<f64>()
            .map(|v| TokenKind::Float(v.to_bits()))
            .map_err(|_| LexError::new(span, format!("malformed float literal {slice}"))),
        RawToken::Str => {
            let body = &slice[1..slice.len() - 1];
            match unescape_string(body) {
                Ok(text) => Ok(TokenKind::Str(interner.intern_owned(text))),
                Err(bad) => Err(LexError::new(
                    span,
                    format!("unknown escape sequence: \\{}", bad as char),
                )),
            }
        }
        RawToken::Char => {
            let body = &slice[1..slice.len() - 1];
            let bytes = body.as_bytes();
            if bytes[0] == b'\\' {
                match decode_escape(bytes[1]) {
                    Some(b) => Ok(TokenKind::Char(b)),
                    None => Err(LexError::new(
                        span,
                        format!("unknown escape sequence: \\{}", bytes[1] as char),
                    )),
                }
            } else if bytes.len() == 1 {
                Ok(TokenKind::Char(bytes[0]))
            } else {
                Err(LexError::new(
                    span,
                    format!("char literal '{body}' is not a single byte"),
                ))
            }
        }
        RawToken::Oper(op) => Ok(TokenKind::Op(op)),
        RawToken::Punctuation(p) => Ok(TokenKind::Punct(p)),
        RawToken::LineComment | RawToken::BlockComment => {
            // Comments are skipped by the caller before conversion.
            Err(LexError::new(span, "comment reached the cooking pass".into()))
        }
    }
}

fn parse_radix(digits: &str, radix: u32, slice: &str, span: Span) -> Result<TokenKind, LexError> {
    u64::from_str_radix(digits, radix)
        .map(TokenKind::Int)
        .map_err(|_| LexError::new(span, format!("integer literal {slice} is too large")))
}
