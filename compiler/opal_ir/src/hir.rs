//! Resolved, typed program representation.
//!
//! The resolver lowers the surface tree into these arenas. Nodes are tagged
//! sums referenced by id; the per-variant operation family (`assignable`,
//! `is_constant`, structural equality/hash/ordering, deep copy) is a set of
//! free functions on [`Hir`], each matching on the tag once.
//!
//! Types are held as [`TypeId`] handles. Because structural types are
//! interned and aliases canonicalized by the type pool, id equality is type
//! equality everywhere below.

use crate::{ExprId, Name, ScopeId, Span, StmtId, StringInterner, SubrId, TypeId, VarId};
use crate::{EnumId, ExternId};
use rustc_hash::FxHasher;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Binary operators after resolution.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinOp {
    LogOr,
    LogAnd,
    BitOr,
    BitAnd,
    BitXor,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    /// Operand order does not matter; used to normalise hashes.
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            BinOp::LogOr
                | BinOp::LogAnd
                | BinOp::BitOr
                | BinOp::BitAnd
                | BinOp::BitXor
                | BinOp::Add
                | BinOp::Mul
                | BinOp::Eq
                | BinOp::Ne
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::LogOr => "||",
            BinOp::LogAnd => "&&",
            BinOp::BitOr => "|",
            BinOp::BitAnd => "&",
            BinOp::BitXor => "^",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        }
    }
}

/// Unary operators after resolution.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    /// Boolean negation `!`.
    Not,
    /// Bitwise complement `~`.
    BitNot,
    /// Numeric negation `-`.
    Neg,
}

/// Reference to a callable entity.
#[derive(Copy, Clone, Debug)]
pub enum SubrRef {
    Free(SubrId),
    /// Member subroutine with its receiver expression.
    Method { receiver: ExprId, subr: SubrId },
    Extern(ExternId),
}

/// A resolved expression. `ty` is always the canonical type of the value
/// the expression produces.
#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeId,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    /// Integer constant. `bits` is the raw two's-complement value: the
    /// signed reading is `bits as i64`, the unsigned reading is `bits`.
    /// Width comes from the node type.
    Int { bits: u64, signed: bool },
    /// Float constant; `wide` selects the double-precision reading.
    Float { fp: f32, dp: f64, wide: bool },
    Bool(bool),
    Char(u8),
    Str(Name),
    /// Ordered member expressions; represents tuple, struct, and array
    /// values uniformly.
    Compound(Vec<ExprId>),
    /// Finite mapping literal, keyed by constant expressions.
    MapLit(Vec<(ExprId, ExprId)>),
    /// Union constant: payload plus the selected option index.
    Union { option: u32, value: ExprId },
    /// Enumerant reference.
    EnumVal { enum_id: EnumId, item: u32 },
    Var(VarId),
    Subr(SubrRef),
    /// Data-member access; `index` is the member position in the struct.
    Member { base: ExprId, index: u32 },
    Index { base: ExprId, index: ExprId },
    ArrayLen(ExprId),
    /// Array allocation; the element type and dimension count come from
    /// the node type.
    NewArray { dims: Vec<ExprId> },
    Unary { op: UnaryOp, operand: ExprId },
    Binary { op: BinOp, lhs: ExprId, rhs: ExprId },
    Call { callee: ExprId, args: Vec<ExprId> },
    /// `base is option`: true when the union's active option matches.
    Is { base: ExprId, option: u32 },
    /// `base as option`: narrows or fails at runtime.
    As { base: ExprId, option: u32 },
    This,
    /// Implicit conversion of `value` to the node type.
    Converted { value: ExprId },
}

/// A resolved statement.
#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum StmtKind {
    Block {
        scope: ScopeId,
        stmts: Vec<StmtId>,
    },
    Assign {
        lhs: ExprId,
        rhs: ExprId,
    },
    Call(ExprId),
    ForC {
        init: Option<StmtId>,
        cond: ExprId,
        incr: Option<StmtId>,
        body: StmtId,
    },
    /// Array-iterating loop: one counter per iterated dimension plus the
    /// iteration variable, executed by depth-first traversal.
    ForArray {
        arr: ExprId,
        counters: Vec<VarId>,
        iter: VarId,
        body: StmtId,
    },
    While {
        cond: ExprId,
        body: StmtId,
    },
    If {
        cond: ExprId,
        then: StmtId,
        els: Option<StmtId>,
    },
    /// Flat statement list with computed jump labels.
    Switch {
        scrutinee: ExprId,
        case_values: Vec<ExprId>,
        case_labels: Vec<u32>,
        /// `stmts.len()` when no default was written.
        default_label: u32,
        stmts: Vec<StmtId>,
    },
    /// One arm per listed union option.
    Match {
        scrutinee: ExprId,
        options: Vec<u32>,
        bindings: Vec<VarId>,
        bodies: Vec<StmtId>,
    },
    Return(Option<ExprId>),
    Break,
    Continue,
    Print(Vec<ExprId>),
    Assert(ExprId),
}

/// A variable binding: parameter, local, global, or static.
#[derive(Clone, Debug)]
pub struct Variable {
    pub name: Name,
    pub ty: TypeId,
    pub scope: ScopeId,
    pub init: Option<ExprId>,
    pub is_param: bool,
    /// Module-level and `static` variables live in global storage.
    pub is_global: bool,
    pub span: Span,
}

/// A function (pure) or procedure (impure).
#[derive(Clone, Debug)]
pub struct Subroutine {
    pub name: Name,
    /// The callable type of this subroutine.
    pub ty: TypeId,
    /// The scope *of* the subroutine (parameters live here).
    pub scope: ScopeId,
    pub params: Vec<VarId>,
    pub ret: TypeId,
    pub pure: bool,
    /// Receiver struct type for member subroutines.
    pub receiver: Option<TypeId>,
    /// Body block; filled in by the resolver's body pass.
    pub body: Option<StmtId>,
    pub span: Span,
}

/// A declared external subroutine. Calling one is a runtime error; the
/// dynamic loading machinery lives outside this system.
#[derive(Clone, Debug)]
pub struct ExternSubroutine {
    pub name: Name,
    pub ty: TypeId,
    pub ret: TypeId,
    pub pure: bool,
    pub span: Span,
}

/// The resolved program: all arenas plus the global variable order and the
/// entry point.
#[derive(Default, Debug)]
pub struct Hir {
    pub exprs: Vec<Expr>,
    pub stmts: Vec<Stmt>,
    pub vars: Vec<Variable>,
    pub subrs: Vec<Subroutine>,
    pub externs: Vec<ExternSubroutine>,
    /// Global variables in declaration order (initialization order).
    pub globals: Vec<VarId>,
    pub main: Option<SubrId>,
}

impl Hir {
    pub fn new() -> Self {
        Hir::default()
    }

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.index()]
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    #[inline]
    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id.index()]
    }

    #[inline]
    pub fn subr(&self, id: SubrId) -> &Subroutine {
        &self.subrs[id.index()]
    }

    #[inline]
    pub fn extern_subr(&self, id: ExternId) -> &ExternSubroutine {
        &self.externs[id.index()]
    }

    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId::from_usize(self.exprs.len());
        self.exprs.push(expr);
        id
    }

    pub fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = StmtId::from_usize(self.stmts.len());
        self.stmts.push(stmt);
        id
    }

    pub fn alloc_var(&mut self, var: Variable) -> VarId {
        let id = VarId::from_usize(self.vars.len());
        self.vars.push(var);
        id
    }

    pub fn alloc_subr(&mut self, subr: Subroutine) -> SubrId {
        let id = SubrId::from_usize(self.subrs.len());
        self.subrs.push(subr);
        id
    }

    pub fn alloc_extern(&mut self, ext: ExternSubroutine) -> ExternId {
        let id = ExternId::from_usize(self.externs.len());
        self.externs.push(ext);
        id
    }

    /// Whether the expression denotes a cell assignment may store into.
    ///
    /// True for non-parameter variables, data members of an assignable
    /// base, indexed expressions with an assignable base, `this`, and
    /// compound literals whose members are all assignable.
    pub fn assignable(&self, e: ExprId) -> bool {
        match &self.expr(e).kind {
            ExprKind::Var(v) => !self.var(*v).is_param,
            ExprKind::Member { base, .. } => self.assignable(*base),
            ExprKind::Index { base, .. } => self.assignable(*base),
            ExprKind::This => true,
            ExprKind::Compound(members) => members.iter().all(|m| self.assignable(*m)),
            ExprKind::Converted { value } => self.assignable(*value),
            _ => false,
        }
    }

    /// Whether the expression is a compile-time constant.
    pub fn is_constant(&self, e: ExprId) -> bool {
        match &self.expr(e).kind {
            ExprKind::Int { .. }
            | ExprKind::Float { .. }
            | ExprKind::Bool(_)
            | ExprKind::Char(_)
            | ExprKind::Str(_)
            | ExprKind::EnumVal { .. } => true,
            ExprKind::Subr(SubrRef::Free(_)) | ExprKind::Subr(SubrRef::Extern(_)) => true,
            ExprKind::Subr(SubrRef::Method { receiver, .. }) => self.is_constant(*receiver),
            ExprKind::Compound(members) => members.iter().all(|m| self.is_constant(*m)),
            ExprKind::MapLit(entries) => entries
                .iter()
                .all(|(k, v)| self.is_constant(*k) && self.is_constant(*v)),
            ExprKind::Union { value, .. } => self.is_constant(*value),
            _ => false,
        }
    }

    /// Structural equality over the arena. Shared handles (types,
    /// variables, subroutines) compare by id.
    pub fn expr_eq(&self, a: ExprId, b: ExprId) -> bool {
        let (ea, eb) = (self.expr(a), self.expr(b));
        match (&ea.kind, &eb.kind) {
            (
                ExprKind::Int { bits: ba, signed: sa },
                ExprKind::Int { bits: bb, signed: sb },
            ) => ba == bb && sa == sb,
            (
                ExprKind::Float { fp: fa, dp: da, wide: wa },
                ExprKind::Float { fp: fb, dp: db, wide: wb },
            ) => {
                wa == wb
                    && if *wa {
                        da.to_bits() == db.to_bits()
                    } else {
                        fa.to_bits() == fb.to_bits()
                    }
            }
            (ExprKind::Bool(a), ExprKind::Bool(b)) => a == b,
            (ExprKind::Char(a), ExprKind::Char(b)) => a == b,
            (ExprKind::Str(a), ExprKind::Str(b)) => a == b,
            (ExprKind::Compound(ma), ExprKind::Compound(mb)) => {
                ma.len() == mb.len() && ma.iter().zip(mb).all(|(x, y)| self.expr_eq(*x, *y))
            }
            (ExprKind::MapLit(ea), ExprKind::MapLit(eb)) => {
                ea.len() == eb.len()
                    && ea.iter().zip(eb).all(|((ka, va), (kb, vb))| {
                        self.expr_eq(*ka, *kb) && self.expr_eq(*va, *vb)
                    })
            }
            (
                ExprKind::Union { option: oa, value: va },
                ExprKind::Union { option: ob, value: vb },
            ) => oa == ob && self.expr_eq(*va, *vb),
            (
                ExprKind::EnumVal { enum_id: na, item: ia },
                ExprKind::EnumVal { enum_id: nb, item: ib },
            ) => na == nb && ia == ib,
            (ExprKind::Var(a), ExprKind::Var(b)) => a == b,
            (ExprKind::Subr(a), ExprKind::Subr(b)) => match (a, b) {
                (SubrRef::Free(x), SubrRef::Free(y)) => x == y,
                (SubrRef::Extern(x), SubrRef::Extern(y)) => x == y,
                (
                    SubrRef::Method { receiver: ra, subr: sa },
                    SubrRef::Method { receiver: rb, subr: sb },
                ) => sa == sb && self.expr_eq(*ra, *rb),
                _ => false,
            },
            (
                ExprKind::Member { base: ba, index: ia },
                ExprKind::Member { base: bb, index: ib },
            ) => ia == ib && self.expr_eq(*ba, *bb),
            (
                ExprKind::Index { base: ba, index: ia },
                ExprKind::Index { base: bb, index: ib },
            ) => self.expr_eq(*ba, *bb) && self.expr_eq(*ia, *ib),
            (ExprKind::ArrayLen(a), ExprKind::ArrayLen(b)) => self.expr_eq(*a, *b),
            (ExprKind::NewArray { dims: da }, ExprKind::NewArray { dims: db }) => {
                ea.ty == eb.ty
                    && da.len() == db.len()
                    && da.iter().zip(db).all(|(x, y)| self.expr_eq(*x, *y))
            }
            (
                ExprKind::Unary { op: oa, operand: xa },
                ExprKind::Unary { op: ob, operand: xb },
            ) => oa == ob && self.expr_eq(*xa, *xb),
            (
                ExprKind::Binary { op: oa, lhs: la, rhs: ra },
                ExprKind::Binary { op: ob, lhs: lb, rhs: rb },
            ) => oa == ob && self.expr_eq(*la, *lb) && self.expr_eq(*ra, *rb),
            (
                ExprKind::Call { callee: ca, args: aa },
                ExprKind::Call { callee: cb, args: ab },
            ) => {
                self.expr_eq(*ca, *cb)
                    && aa.len() == ab.len()
                    && aa.iter().zip(ab).all(|(x, y)| self.expr_eq(*x, *y))
            }
            (
                ExprKind::Is { base: ba, option: oa },
                ExprKind::Is { base: bb, option: ob },
            ) => oa == ob && self.expr_eq(*ba, *bb),
            (
                ExprKind::As { base: ba, option: oa },
                ExprKind::As { base: bb, option: ob },
            ) => oa == ob && self.expr_eq(*ba, *bb),
            (ExprKind::This, ExprKind::This) => true,
            (ExprKind::Converted { value: va }, ExprKind::Converted { value: vb }) => {
                ea.ty == eb.ty && self.expr_eq(*va, *vb)
            }
            _ => false,
        }
    }

    /// Structural hash consistent with [`Hir::expr_eq`]. Commutative binary
    /// operators combine operand hashes order-independently so `a op b`
    /// and `b op a` hash identically.
    pub fn expr_hash<H: Hasher>(&self, e: ExprId, state: &mut H) {
        state.write_u64(self.expr_hash_value(e));
    }

    fn expr_hash_value(&self, e: ExprId) -> u64 {
        let mut h = FxHasher::default();
        match &self.expr(e).kind {
            ExprKind::Int { bits, signed } => {
                1u8.hash(&mut h);
                bits.hash(&mut h);
                signed.hash(&mut h);
            }
            ExprKind::Float { fp, dp, wide } => {
                2u8.hash(&mut h);
                if *wide {
                    dp.to_bits().hash(&mut h);
                } else {
                    fp.to_bits().hash(&mut h);
                }
                wide.hash(&mut h);
            }
            ExprKind::Bool(v) => {
                3u8.hash(&mut h);
                v.hash(&mut h);
            }
            ExprKind::Char(v) => {
                4u8.hash(&mut h);
                v.hash(&mut h);
            }
            ExprKind::Str(name) => {
                5u8.hash(&mut h);
                name.raw().hash(&mut h);
            }
            ExprKind::Compound(members) => {
                6u8.hash(&mut h);
                for m in members {
                    h.write_u64(self.expr_hash_value(*m));
                }
            }
            ExprKind::MapLit(entries) => {
                7u8.hash(&mut h);
                // Key-value pairs hash order-independently; the literal is
                // an unordered mapping.
                let mut acc = 0u64;
                for (k, v) in entries {
                    let mut ph = FxHasher::default();
                    ph.write_u64(self.expr_hash_value(*k));
                    ph.write_u64(self.expr_hash_value(*v));
                    acc = acc.wrapping_add(ph.finish());
                }
                h.write_u64(acc);
            }
            ExprKind::Union { option, value } => {
                8u8.hash(&mut h);
                option.hash(&mut h);
                h.write_u64(self.expr_hash_value(*value));
            }
            ExprKind::EnumVal { enum_id, item } => {
                9u8.hash(&mut h);
                enum_id.raw().hash(&mut h);
                item.hash(&mut h);
            }
            ExprKind::Var(v) => {
                10u8.hash(&mut h);
                v.raw().hash(&mut h);
            }
            ExprKind::Subr(subr) => {
                11u8.hash(&mut h);
                match subr {
                    SubrRef::Free(id) => {
                        0u8.hash(&mut h);
                        id.raw().hash(&mut h);
                    }
                    SubrRef::Method { receiver, subr } => {
                        1u8.hash(&mut h);
                        h.write_u64(self.expr_hash_value(*receiver));
                        subr.raw().hash(&mut h);
                    }
                    SubrRef::Extern(id) => {
                        2u8.hash(&mut h);
                        id.raw().hash(&mut h);
                    }
                }
            }
            ExprKind::Member { base, index } => {
                12u8.hash(&mut h);
                h.write_u64(self.expr_hash_value(*base));
                index.hash(&mut h);
            }
            ExprKind::Index { base, index } => {
                13u8.hash(&mut h);
                h.write_u64(self.expr_hash_value(*base));
                h.write_u64(self.expr_hash_value(*index));
            }
            ExprKind::ArrayLen(a) => {
                14u8.hash(&mut h);
                h.write_u64(self.expr_hash_value(*a));
            }
            ExprKind::NewArray { dims } => {
                15u8.hash(&mut h);
                self.expr(e).ty.raw().hash(&mut h);
                for d in dims {
                    h.write_u64(self.expr_hash_value(*d));
                }
            }
            ExprKind::Unary { op, operand } => {
                16u8.hash(&mut h);
                op.hash(&mut h);
                h.write_u64(self.expr_hash_value(*operand));
            }
            ExprKind::Binary { op, lhs, rhs } => {
                17u8.hash(&mut h);
                op.hash(&mut h);
                let hl = self.expr_hash_value(*lhs);
                let hr = self.expr_hash_value(*rhs);
                if op.is_commutative() {
                    h.write_u64(hl.wrapping_add(hr));
                } else {
                    h.write_u64(hl);
                    h.write_u64(hr);
                }
            }
            ExprKind::Call { callee, args } => {
                18u8.hash(&mut h);
                h.write_u64(self.expr_hash_value(*callee));
                for a in args {
                    h.write_u64(self.expr_hash_value(*a));
                }
            }
            ExprKind::Is { base, option } => {
                19u8.hash(&mut h);
                h.write_u64(self.expr_hash_value(*base));
                option.hash(&mut h);
            }
            ExprKind::As { base, option } => {
                20u8.hash(&mut h);
                h.write_u64(self.expr_hash_value(*base));
                option.hash(&mut h);
            }
            ExprKind::This => {
                21u8.hash(&mut h);
            }
            ExprKind::Converted { value } => {
                22u8.hash(&mut h);
                self.expr(e).ty.raw().hash(&mut h);
                h.write_u64(self.expr_hash_value(*value));
            }
        }
        h.finish()
    }

    /// Total order on constants of comparable type; `None` when either
    /// side is not a constant or the shapes are not comparable.
    pub fn expr_cmp(
        &self,
        interner: &StringInterner,
        a: ExprId,
        b: ExprId,
    ) -> Option<Ordering> {
        let (ea, eb) = (self.expr(a), self.expr(b));
        match (&ea.kind, &eb.kind) {
            (
                ExprKind::Int { bits: ba, signed: sa },
                ExprKind::Int { bits: bb, signed: sb },
            ) => {
                let va = if *sa {
                    i128::from(*ba as i64)
                } else {
                    i128::from(*ba)
                };
                let vb = if *sb {
                    i128::from(*bb as i64)
                } else {
                    i128::from(*bb)
                };
                Some(va.cmp(&vb))
            }
            (ExprKind::Float { .. }, ExprKind::Float { .. }) => {
                let va = float_value(&ea.kind);
                let vb = float_value(&eb.kind);
                Some(va.total_cmp(&vb))
            }
            (ExprKind::Bool(a), ExprKind::Bool(b)) => Some(a.cmp(b)),
            (ExprKind::Char(a), ExprKind::Char(b)) => Some(a.cmp(b)),
            (ExprKind::Str(a), ExprKind::Str(b)) => {
                Some(interner.lookup(*a).cmp(interner.lookup(*b)))
            }
            (ExprKind::Compound(ma), ExprKind::Compound(mb)) => {
                for (x, y) in ma.iter().zip(mb.iter()) {
                    match self.expr_cmp(interner, *x, *y)? {
                        Ordering::Equal => continue,
                        other => return Some(other),
                    }
                }
                Some(ma.len().cmp(&mb.len()))
            }
            (
                ExprKind::Union { option: oa, value: va },
                ExprKind::Union { option: ob, value: vb },
            ) => match oa.cmp(ob) {
                Ordering::Equal => self.expr_cmp(interner, *va, *vb),
                other => Some(other),
            },
            (
                ExprKind::EnumVal { enum_id: na, item: ia },
                ExprKind::EnumVal { enum_id: nb, item: ib },
            ) if na == nb => Some(ia.cmp(ib)),
            _ => None,
        }
    }

    /// Deep structural clone; shared handles stay shared.
    pub fn deep_copy(&mut self, e: ExprId) -> ExprId {
        let Expr { kind, ty, span } = self.expr(e).clone();
        let kind = match kind {
            ExprKind::Compound(members) => {
                let members = members.into_iter().map(|m| self.deep_copy(m)).collect();
                ExprKind::Compound(members)
            }
            ExprKind::MapLit(entries) => {
                let entries = entries
                    .into_iter()
                    .map(|(k, v)| (self.deep_copy(k), self.deep_copy(v)))
                    .collect();
                ExprKind::MapLit(entries)
            }
            ExprKind::Union { option, value } => ExprKind::Union {
                option,
                value: self.deep_copy(value),
            },
            ExprKind::Subr(SubrRef::Method { receiver, subr }) => ExprKind::Subr(SubrRef::Method {
                receiver: self.deep_copy(receiver),
                subr,
            }),
            ExprKind::Member { base, index } => ExprKind::Member {
                base: self.deep_copy(base),
                index,
            },
            ExprKind::Index { base, index } => ExprKind::Index {
                base: self.deep_copy(base),
                index: self.deep_copy(index),
            },
            ExprKind::ArrayLen(a) => ExprKind::ArrayLen(self.deep_copy(a)),
            ExprKind::NewArray { dims } => ExprKind::NewArray {
                dims: dims.into_iter().map(|d| self.deep_copy(d)).collect(),
            },
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op,
                operand: self.deep_copy(operand),
            },
            ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op,
                lhs: self.deep_copy(lhs),
                rhs: self.deep_copy(rhs),
            },
            ExprKind::Call { callee, args } => ExprKind::Call {
                callee: self.deep_copy(callee),
                args: args.into_iter().map(|a| self.deep_copy(a)).collect(),
            },
            ExprKind::Is { base, option } => ExprKind::Is {
                base: self.deep_copy(base),
                option,
            },
            ExprKind::As { base, option } => ExprKind::As {
                base: self.deep_copy(base),
                option,
            },
            ExprKind::Converted { value } => ExprKind::Converted {
                value: self.deep_copy(value),
            },
            leaf => leaf,
        };
        self.alloc_expr(Expr { kind, ty, span })
    }
}

fn float_value(kind: &ExprKind) -> f64 {
    match kind {
        ExprKind::Float { fp, dp, wide } => {
            if *wide {
                *dp
            } else {
                f64::from(*fp)
            }
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_expr(hir: &mut Hir, v: i64) -> ExprId {
        hir.alloc_expr(Expr {
            kind: ExprKind::Int {
                bits: v as u64,
                signed: true,
            },
            ty: TypeId::LONG,
            span: Span::DUMMY,
        })
    }

    fn binary(hir: &mut Hir, op: BinOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        hir.alloc_expr(Expr {
            kind: ExprKind::Binary { op, lhs, rhs },
            ty: TypeId::LONG,
            span: Span::DUMMY,
        })
    }

    fn hash_of(hir: &Hir, e: ExprId) -> u64 {
        let mut h = FxHasher::default();
        hir.expr_hash(e, &mut h);
        h.finish()
    }

    #[test]
    fn eq_implies_equal_hash() {
        let mut hir = Hir::new();
        let a1 = int_expr(&mut hir, 2);
        let b1 = int_expr(&mut hir, 3);
        let e1 = binary(&mut hir, BinOp::Add, a1, b1);

        let a2 = int_expr(&mut hir, 2);
        let b2 = int_expr(&mut hir, 3);
        let e2 = binary(&mut hir, BinOp::Add, a2, b2);

        assert!(hir.expr_eq(e1, e2));
        assert_eq!(hash_of(&hir, e1), hash_of(&hir, e2));
    }

    #[test]
    fn commutative_operands_hash_identically() {
        let mut hir = Hir::new();
        let a = int_expr(&mut hir, 2);
        let b = int_expr(&mut hir, 3);
        let ab = binary(&mut hir, BinOp::Add, a, b);
        let ba = binary(&mut hir, BinOp::Add, b, a);
        assert_eq!(hash_of(&hir, ab), hash_of(&hir, ba));

        let sub_ab = binary(&mut hir, BinOp::Sub, a, b);
        let sub_ba = binary(&mut hir, BinOp::Sub, b, a);
        assert_ne!(hash_of(&hir, sub_ab), hash_of(&hir, sub_ba));
    }

    #[test]
    fn constant_ordering_is_numeric() {
        let mut hir = Hir::new();
        let interner = StringInterner::new();
        let two = int_expr(&mut hir, 2);
        let three = int_expr(&mut hir, 3);
        assert_eq!(
            hir.expr_cmp(&interner, two, three),
            Some(Ordering::Less)
        );

        // Unsigned large value compares above any signed value.
        let big = hir.alloc_expr(Expr {
            kind: ExprKind::Int {
                bits: u64::MAX,
                signed: false,
            },
            ty: TypeId::ULONG,
            span: Span::DUMMY,
        });
        let neg = int_expr(&mut hir, -1);
        assert_eq!(hir.expr_cmp(&interner, neg, big), Some(Ordering::Less));
    }

    #[test]
    fn deep_copy_is_structurally_equal_but_fresh() {
        let mut hir = Hir::new();
        let a = int_expr(&mut hir, 2);
        let b = int_expr(&mut hir, 3);
        let e = binary(&mut hir, BinOp::Mul, a, b);
        let copy = hir.deep_copy(e);
        assert_ne!(e, copy);
        assert!(hir.expr_eq(e, copy));
    }

    #[test]
    fn compound_assignable_requires_all_members() {
        let mut hir = Hir::new();
        let v = hir.alloc_var(Variable {
            name: Name::EMPTY,
            ty: TypeId::INT,
            scope: ScopeId::ROOT,
            init: None,
            is_param: false,
            is_global: false,
            span: Span::DUMMY,
        });
        let var_expr = hir.alloc_expr(Expr {
            kind: ExprKind::Var(v),
            ty: TypeId::INT,
            span: Span::DUMMY,
        });
        let lit = int_expr(&mut hir, 1);
        let all_vars = hir.alloc_expr(Expr {
            kind: ExprKind::Compound(vec![var_expr]),
            ty: TypeId::INT,
            span: Span::DUMMY,
        });
        let mixed = hir.alloc_expr(Expr {
            kind: ExprKind::Compound(vec![var_expr, lit]),
            ty: TypeId::INT,
            span: Span::DUMMY,
        });
        assert!(hir.assignable(all_vars));
        assert!(!hir.assignable(mixed));
    }
}
