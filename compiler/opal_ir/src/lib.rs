//! Core data structures shared by every phase of the Opal compiler.
//!
//! This crate has no dependency on the rest of the pipeline and hosts:
//!
//! - [`Span`]: compact 8-byte source locations
//! - [`StringInterner`] / [`Name`]: identifier and string-literal interning
//! - id newtypes ([`ExprId`], [`TypeId`], ...) indexing the typed arenas
//! - [`token`]: the token stream representation with the closed keyword,
//!   operator, and punctuation tables
//! - [`ast`]: the surface syntax tree produced by the parser
//! - [`hir`]: the resolved, typed program the interpreter executes

mod ids;
mod interner;
mod span;

pub mod ast;
pub mod hir;
pub mod token;

pub use ids::{
    AliasId, EnumId, ExprId, ExternId, ScopeId, StmtId, StructId, SubrId, TypeId, VarId,
};
pub use interner::{Name, StringInterner};
pub use span::Span;
pub use token::{Keyword, Op, Punct, Token, TokenKind, TokenList};
