//! Token cursor with lookahead and speculative parsing.
//!
//! The token list always ends with an `Eof` sentinel, so `peek` and `nth`
//! never need bounds checks; they clamp to the sentinel.

use opal_diagnostic::Diagnostic;
use opal_ir::{Keyword, Name, Op, Punct, Span, StringInterner, Token, TokenKind};

pub type PResult<T> = Result<T, Diagnostic>;

pub struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
    pub interner: &'a StringInterner,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a [Token], interner: &'a StringInterner) -> Self {
        debug_assert!(matches!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof)));
        Cursor { tokens, pos: 0, interner }
    }

    #[inline]
    pub fn peek(&self) -> &Token {
        self.nth(0)
    }

    #[inline]
    pub fn nth(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    /// Span of the current token.
    #[inline]
    pub fn span(&self) -> Span {
        self.peek().span
    }

    /// Span of the most recently consumed token.
    pub fn prev_span(&self) -> Span {
        if self.pos == 0 {
            self.tokens[0].span
        } else {
            self.tokens[self.pos - 1].span
        }
    }

    pub fn advance(&mut self) -> Token {
        let tok = *self.peek();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    pub fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    // Speculative parsing: save and restore the position.

    pub fn snapshot(&self) -> usize {
        self.pos
    }

    pub fn restore(&mut self, snapshot: usize) {
        self.pos = snapshot;
    }

    // Keyword helpers.

    pub fn at_kw(&self, kw: Keyword) -> bool {
        self.peek().kind == TokenKind::Kw(kw)
    }

    pub fn eat_kw(&mut self, kw: Keyword) -> bool {
        if self.at_kw(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect_kw(&mut self, kw: Keyword) -> PResult<Span> {
        if self.at_kw(kw) {
            Ok(self.advance().span)
        } else {
            Err(self.expected(kw.as_str()))
        }
    }

    // Operator helpers.

    pub fn at_op(&self, op: Op) -> bool {
        self.peek().kind == TokenKind::Op(op)
    }

    pub fn eat_op(&mut self, op: Op) -> bool {
        if self.at_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect_op(&mut self, op: Op) -> PResult<Span> {
        if self.at_op(op) {
            Ok(self.advance().span)
        } else {
            Err(self.expected(op.as_str()))
        }
    }

    // Punctuation helpers.

    pub fn at_punct(&self, p: Punct) -> bool {
        self.peek().kind == TokenKind::Punct(p)
    }

    pub fn eat_punct(&mut self, p: Punct) -> bool {
        if self.at_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect_punct(&mut self, p: Punct) -> PResult<Span> {
        if self.at_punct(p) {
            Ok(self.advance().span)
        } else {
            Err(self.expected(&p.as_char().to_string()))
        }
    }

    pub fn expect_ident(&mut self) -> PResult<(Name, Span)> {
        match self.peek().kind {
            TokenKind::Ident(name) => {
                let span = self.advance().span;
                Ok((name, span))
            }
            _ => Err(self.expected("identifier")),
        }
    }

    /// Error at the current token: `expected <what>, found <category> "<text>"`.
    pub fn expected(&self, what: &str) -> Diagnostic {
        let tok = self.peek();
        let found = tok.kind.source_text(self.interner);
        let category = tok.kind.category();
        if found.is_empty() {
            Diagnostic::error(tok.span, format!("expected {what}, found {category}"))
        } else {
            Diagnostic::error(
                tok.span,
                format!("expected {what}, found {category} \"{found}\""),
            )
        }
    }

    pub fn error(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::error(self.span(), message)
    }
}
