//! Logos-derived raw tokenizer.
//!
//! The raw layer classifies bytes; the cooking pass in [`crate::convert`]
//! turns slices into interned, validated token kinds. Operators are
//! matched longest-prefix (logos always prefers the longest match), so
//! `<<=` never splits into `<<` `=`.

use logos::{Lexer, Logos};
use opal_ir::{Op, Punct};

/// Consume a nested block comment after the opening `/*`.
///
/// Returns `false` when the comment is unterminated, which surfaces as a
/// lexer error at the opener.
fn block_comment(lex: &mut Lexer<RawToken>) -> bool {
    let bytes = lex.remainder().as_bytes();
    let mut depth = 1usize;
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'*' {
            depth += 1;
            i += 2;
        } else if bytes[i] == b'*' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
            depth -= 1;
            i += 2;
            if depth == 0 {
                lex.bump(i);
                return true;
            }
        } else {
            i += 1;
        }
    }
    lex.bump(i);
    false
}

/// Raw token classes.
#[derive(Logos, Copy, Clone, Debug, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum RawToken {
    #[regex(r"//[^\n]*")]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex(r"0[xX][0-9a-fA-F]+")]
    HexInt,

    #[regex(r"0[bB][01]+")]
    BinInt,

    /// A decimal digit run. A literal is read both as an integer and as a
    /// float; longest match wins, so `15` lands here and `1.5` below.
    #[regex(r"[0-9]+")]
    DecInt,

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+")]
    Float,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,

    #[regex(r"'([^'\\\n]|\\.)'")]
    Char,

    #[token("+", |_| Op::Plus)]
    #[token("+=", |_| Op::PlusEq)]
    #[token("-", |_| Op::Minus)]
    #[token("-=", |_| Op::MinusEq)]
    #[token("*", |_| Op::Star)]
    #[token("*=", |_| Op::StarEq)]
    #[token("/", |_| Op::Slash)]
    #[token("/=", |_| Op::SlashEq)]
    #[token("%", |_| Op::Percent)]
    #[token("%=", |_| Op::PercentEq)]
    #[token("||", |_| Op::LogOr)]
    #[token("|", |_| Op::BitOr)]
    #[token("|=", |_| Op::BitOrEq)]
    #[token("^", |_| Op::Caret)]
    #[token("^=", |_| Op::CaretEq)]
    #[token("!", |_| Op::Not)]
    #[token("~", |_| Op::Tilde)]
    #[token("&&", |_| Op::LogAnd)]
    #[token("&", |_| Op::BitAnd)]
    #[token("&=", |_| Op::BitAndEq)]
    #[token("<<", |_| Op::Shl)]
    #[token("<<=", |_| Op::ShlEq)]
    #[token(">>", |_| Op::Shr)]
    #[token(">>=", |_| Op::ShrEq)]
    #[token("==", |_| Op::CmpEq)]
    #[token("!=", |_| Op::CmpNe)]
    #[token("<", |_| Op::Lt)]
    #[token("<=", |_| Op::Le)]
    #[token(">", |_| Op::Gt)]
    #[token(">=", |_| Op::Ge)]
    #[token("=", |_| Op::Assign)]
    #[token("++", |_| Op::Inc)]
    #[token("--", |_| Op::Dec)]
    #[token("->", |_| Op::Arrow)]
    Oper(Op),

    #[token(";", |_| Punct::Semicolon)]
    #[token(":", |_| Punct::Colon)]
    #[token("(", |_| Punct::LParen)]
    #[token(")", |_| Punct::RParen)]
    #[token("{", |_| Punct::LBrace)]
    #[token("}", |_| Punct::RBrace)]
    #[token("[", |_| Punct::LBracket)]
    #[token("]", |_| Punct::RBracket)]
    #[token(".", |_| Punct::Dot)]
    #[token(",", |_| Punct::Comma)]
    #[token("?", |_| Punct::Question)]
    #[token("$", |_| Punct::Dollar)]
    #[token("#", |_| Punct::Hash)]
    Punctuation(Punct),
}
