//! Surface syntax tree produced by the parser.
//!
//! The surface tree is untyped and name-unresolved; the resolver lowers it
//! into the [`crate::hir`] arenas. Every node carries a [`Span`].

use crate::{Name, Op, Span};

/// A possibly-qualified name path `a.b.c`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberPath {
    pub parts: Vec<Name>,
    pub span: Span,
}

/// Primitive type keywords as written in source.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PrimName {
    Void,
    Bool,
    Char,
    Byte,
    Ubyte,
    Short,
    Ushort,
    Int,
    Uint,
    Long,
    Ulong,
    Float,
    Double,
    Error,
}

/// A parsed (unresolved) type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedType {
    pub kind: ParsedTypeKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedTypeKind {
    Prim(PrimName),
    Named(MemberPath),
    /// One `[]` suffix; nested arrays stack.
    Array(Box<ParsedType>),
    Tuple(Vec<ParsedType>),
    Union(Vec<ParsedType>),
    Map(Box<ParsedType>, Box<ParsedType>),
    Callable {
        pure: bool,
        ret: Option<Box<ParsedType>>,
        params: Vec<ParsedType>,
    },
}

/// A surface expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Int(u64),
    Float(f64),
    Bool(bool),
    Char(u8),
    Str(Name),
    /// Qualified or bare name; resolution decides what it denotes.
    Path(MemberPath),
    /// `[e1, e2, ...]`: array, struct, tuple, and map-pair literal.
    Compound(Vec<Expr>),
    Unary(Op, Box<Expr>),
    Binary(Box<Expr>, Op, Box<Expr>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Field {
        base: Box<Expr>,
        field: Name,
    },
    /// `array T[e1][e2]...`
    NewArray {
        elem: ParsedType,
        dims: Vec<Expr>,
    },
    Is {
        base: Box<Expr>,
        ty: ParsedType,
    },
    As {
        base: Box<Expr>,
        ty: ParsedType,
    },
    This,
}

/// A surface statement.
#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Block(Vec<Stmt>),
    VarDecl {
        ty: ParsedType,
        name: Name,
        init: Option<Expr>,
    },
    /// `lhs = rhs`; compound assignments arrive already split into the
    /// base operator (`a += b` is `op: Some(Plus)`).
    Assign {
        lhs: Expr,
        op: Option<Op>,
        rhs: Expr,
    },
    Call(Expr),
    If {
        cond: Expr,
        then: Box<Stmt>,
        els: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    ForC {
        init: Option<Box<Stmt>>,
        cond: Expr,
        incr: Option<Box<Stmt>>,
        body: Box<Stmt>,
    },
    /// `for i : begin, end { ... }`
    ForRange {
        counter: Name,
        begin: Expr,
        end: Expr,
        body: Box<Stmt>,
    },
    /// `for [c1, ..., it] : arr { ... }`: one counter per iterated
    /// dimension plus the iteration variable.
    ForArray {
        names: Vec<Name>,
        arr: Expr,
        body: Box<Stmt>,
    },
    Switch {
        scrutinee: Expr,
        /// Case value and the statement index execution resumes at.
        cases: Vec<(Expr, usize)>,
        /// Statement index for `default`, if present.
        default: Option<usize>,
        stmts: Vec<Stmt>,
    },
    Match {
        binding: Name,
        scrutinee: Expr,
        cases: Vec<MatchCase>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Print(Vec<Expr>),
    Assert(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchCase {
    pub ty: ParsedType,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// A top-level or nested declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct Decl {
    pub kind: DeclKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeclKind {
    Module {
        name: Name,
        decls: Vec<Decl>,
    },
    Struct {
        name: Name,
        decls: Vec<Decl>,
    },
    Enum {
        name: Name,
        items: Vec<EnumItemDecl>,
    },
    Typedef {
        ty: ParsedType,
        name: Name,
    },
    Subroutine(SubrDecl),
    ExternSubroutine(SubrDecl),
    Var {
        ty: ParsedType,
        name: Name,
        init: Option<Expr>,
        is_static: bool,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumItemDecl {
    pub name: Name,
    /// Explicit value: sign flag plus magnitude, so both signed and
    /// unsigned 64-bit values are representable.
    pub value: Option<(bool, u64)>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SubrDecl {
    pub pure: bool,
    /// `None` means void.
    pub ret: Option<ParsedType>,
    pub name: Name,
    pub params: Vec<ParamDecl>,
    /// `None` for external subroutines.
    pub body: Option<Vec<Stmt>>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParamDecl {
    pub ty: ParsedType,
    pub name: Name,
    pub span: Span,
}
