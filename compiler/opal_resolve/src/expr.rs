//! Expression resolution: typing, name binding, and implicit conversion
//! insertion.

use crate::{BodyCx, RResult, Resolver, ScopeName};
use opal_diagnostic::Diagnostic;
use opal_ir::ast;
use opal_ir::hir::{BinOp, Expr, ExprKind, SubrRef, UnaryOp};
use opal_ir::{ExprId, Name, Op, ScopeId, Span, TypeId};
use opal_types::{int_fits, IntWidth, TypeData};

impl<'a> Resolver<'a> {
    pub(crate) fn add_expr(&mut self, kind: ExprKind, ty: TypeId, span: Span) -> ExprId {
        self.hir.alloc_expr(Expr { kind, ty, span })
    }

    pub(crate) fn resolve_expr(
        &mut self,
        e: &ast::Expr,
        scope: ScopeId,
        cx: BodyCx,
    ) -> RResult<ExprId> {
        let span = e.span;
        match &e.kind {
            ast::ExprKind::Int(v) => {
                // An integer literal is unsigned; it takes the narrowest
                // of uint/ulong that holds it.
                let ty = if *v > i32::MAX as u64 {
                    TypeId::ULONG
                } else {
                    TypeId::UINT
                };
                Ok(self.add_expr(ExprKind::Int { bits: *v, signed: false }, ty, span))
            }
            ast::ExprKind::Float(v) => Ok(self.add_expr(
                ExprKind::Float { fp: *v as f32, dp: *v, wide: true },
                TypeId::DOUBLE,
                span,
            )),
            ast::ExprKind::Bool(v) => Ok(self.add_expr(ExprKind::Bool(*v), TypeId::BOOL, span)),
            ast::ExprKind::Char(v) => Ok(self.add_expr(ExprKind::Char(*v), TypeId::CHAR, span)),
            ast::ExprKind::Str(name) => {
                Ok(self.add_expr(ExprKind::Str(*name), TypeId::STRING, span))
            }
            ast::ExprKind::This => match cx.receiver {
                Some(ty) => Ok(self.add_expr(ExprKind::This, ty, span)),
                None => Err(Diagnostic::error(
                    span,
                    "this can only be used inside a struct subroutine".to_string(),
                )),
            },
            ast::ExprKind::Path(path) => self.resolve_name_expr(path, scope, cx, span),
            ast::ExprKind::Compound(members) => {
                let mut ids = Vec::with_capacity(members.len());
                for m in members {
                    ids.push(self.resolve_expr(m, scope, cx)?);
                }
                let tys: Vec<TypeId> = ids.iter().map(|id| self.hir.expr(*id).ty).collect();
                let ty = self.types.tuple_type(tys);
                Ok(self.add_expr(ExprKind::Compound(ids), ty, span))
            }
            ast::ExprKind::Unary(op, operand) => {
                let operand = self.resolve_expr(operand, scope, cx)?;
                self.resolve_unary(*op, operand, span)
            }
            ast::ExprKind::Binary(lhs, op, rhs) => {
                let lhs = self.resolve_expr(lhs, scope, cx)?;
                let rhs = self.resolve_expr(rhs, scope, cx)?;
                let Some(op) = binop_from_token(*op) else {
                    return Err(Diagnostic::error(
                        span,
                        format!("{op} is not a binary operator"),
                    ));
                };
                self.make_binary(op, lhs, rhs, span)
            }
            ast::ExprKind::Call { callee, args } => self.resolve_call(callee, args, scope, cx, span),
            ast::ExprKind::Index { base, index } => {
                let base = self.resolve_expr(base, scope, cx)?;
                let index = self.resolve_expr(index, scope, cx)?;
                self.resolve_index(base, index, scope, span)
            }
            ast::ExprKind::Field { base, field } => {
                let base = self.resolve_expr(base, scope, cx)?;
                self.resolve_field(base, *field, span)
            }
            ast::ExprKind::NewArray { elem, dims } => {
                let elem_ty = self.resolve_type(elem, scope)?;
                if self.types.canonicalize(elem_ty) == TypeId::VOID {
                    return Err(Diagnostic::error(
                        elem.span,
                        "array element type cannot be void".to_string(),
                    ));
                }
                let mut dim_ids = Vec::with_capacity(dims.len());
                for d in dims {
                    let id = self.resolve_expr(d, scope, cx)?;
                    if !self.types.is_integer(self.hir.expr(id).ty) {
                        return Err(Diagnostic::error(
                            d.span,
                            "array dimensions must be integers".to_string(),
                        ));
                    }
                    dim_ids.push(id);
                }
                let dims_n = u32::try_from(dim_ids.len()).unwrap_or(u32::MAX);
                let ty = self.types.array_type(elem_ty, dims_n);
                Ok(self.add_expr(ExprKind::NewArray { dims: dim_ids }, ty, span))
            }
            ast::ExprKind::Is { base, ty } => {
                let (base, option) = self.resolve_union_narrow(base, ty, scope, cx)?;
                Ok(self.add_expr(ExprKind::Is { base, option }, TypeId::BOOL, span))
            }
            ast::ExprKind::As { base, ty } => {
                let (base, option) = self.resolve_union_narrow(base, ty, scope, cx)?;
                let base_ty = self.types.canonicalize(self.hir.expr(base).ty);
                let TypeData::Union(options) = self.types.data(base_ty) else {
                    unreachable!("resolve_union_narrow checked the union");
                };
                let option_ty = options[option as usize];
                Ok(self.add_expr(ExprKind::As { base, option }, option_ty, span))
            }
        }
    }

    /// Resolve the common part of `is`/`as`: a union-typed base and an
    /// option type that must be one of its options.
    fn resolve_union_narrow(
        &mut self,
        base: &ast::Expr,
        ty: &ast::ParsedType,
        scope: ScopeId,
        cx: BodyCx,
    ) -> RResult<(ExprId, u32)> {
        let base_id = self.resolve_expr(base, scope, cx)?;
        let base_ty = self.types.canonicalize(self.hir.expr(base_id).ty);
        let TypeData::Union(options) = self.types.data(base_ty) else {
            return Err(Diagnostic::error(
                base.span,
                format!(
                    "is/as requires a union value, not {}",
                    self.type_str(base_ty)
                ),
            ));
        };
        let options = options.to_vec();
        let wanted = self.resolve_type(ty, scope)?;
        let wanted = self.types.canonicalize(wanted);
        match options.iter().position(|o| *o == wanted) {
            Some(idx) => Ok((base_id, u32::try_from(idx).unwrap_or(0))),
            None => Err(Diagnostic::error(
                ty.span,
                format!(
                    "type {} is not a member of union {}",
                    self.type_str(wanted),
                    self.type_str(base_ty)
                ),
            )),
        }
    }

    fn resolve_name_expr(
        &mut self,
        path: &ast::MemberPath,
        scope: ScopeId,
        cx: BodyCx,
        span: Span,
    ) -> RResult<ExprId> {
        let Some((entry, consumed)) = self.scopes.find_name(&self.types, scope, &path.parts)
        else {
            return Err(Diagnostic::error(
                span,
                format!("unknown name {}", self.path_str(path)),
            ));
        };
        let remaining = &path.parts[consumed..];
        match entry {
            ScopeName::Variable(v) => {
                let ty = self.hir.var(v).ty;
                let mut expr = self.add_expr(ExprKind::Var(v), ty, span);
                for part in remaining {
                    expr = self.resolve_field(expr, *part, span)?;
                }
                Ok(expr)
            }
            ScopeName::Subroutine(s) => {
                if !remaining.is_empty() {
                    return Err(Diagnostic::error(
                        span,
                        format!("{} is not a variable", self.path_str(path)),
                    ));
                }
                self.subr_ref_expr(s, cx, span)
            }
            ScopeName::Extern(x) => {
                if !remaining.is_empty() {
                    return Err(Diagnostic::error(
                        span,
                        format!("{} is not a variable", self.path_str(path)),
                    ));
                }
                let ty = self.hir.extern_subr(x).ty;
                Ok(self.add_expr(ExprKind::Subr(SubrRef::Extern(x)), ty, span))
            }
            ScopeName::Enum(ty) => {
                let TypeData::Enum(eid) = self.types.data(self.types.canonicalize(ty)) else {
                    unreachable!("enum name resolves to enum type");
                };
                let eid = *eid;
                if remaining.len() != 1 {
                    return Err(Diagnostic::error(
                        span,
                        format!("{} is not a value", self.path_str(path)),
                    ));
                }
                let def = self.types.enum_def(eid);
                match def.items.iter().position(|i| i.name == remaining[0]) {
                    Some(idx) => {
                        let item = u32::try_from(idx).unwrap_or(0);
                        Ok(self.add_expr(ExprKind::EnumVal { enum_id: eid, item }, ty, span))
                    }
                    None => Err(Diagnostic::error(
                        span,
                        format!(
                            "enum {} has no value named {}",
                            self.name_str(def.name),
                            self.name_str(remaining[0])
                        ),
                    )),
                }
            }
            ScopeName::Module(_) | ScopeName::Struct(_) | ScopeName::Typedef(_) => {
                Err(Diagnostic::error(
                    span,
                    format!("{} is not a variable", self.path_str(path)),
                ))
            }
        }
    }

    /// A bare reference to a subroutine. Member subroutines bind `this`
    /// implicitly, which requires being inside a method of the same
    /// struct.
    fn subr_ref_expr(&mut self, s: opal_ir::SubrId, cx: BodyCx, span: Span) -> RResult<ExprId> {
        let subr = self.hir.subr(s);
        let ty = subr.ty;
        match subr.receiver {
            None => Ok(self.add_expr(ExprKind::Subr(SubrRef::Free(s)), ty, span)),
            Some(recv_ty) => {
                let name = subr.name;
                match cx.receiver {
                    Some(current) if self.types.types_same(current, recv_ty) => {
                        let this = self.add_expr(ExprKind::This, recv_ty, span);
                        Ok(self.add_expr(
                            ExprKind::Subr(SubrRef::Method { receiver: this, subr: s }),
                            ty,
                            span,
                        ))
                    }
                    _ => Err(Diagnostic::error(
                        span,
                        format!("member subroutine {} requires a receiver", self.name_str(name)),
                    )),
                }
            }
        }
    }

    /// `base.field`: array length, struct data member, or bound member
    /// subroutine.
    pub(crate) fn resolve_field(
        &mut self,
        base: ExprId,
        field: Name,
        span: Span,
    ) -> RResult<ExprId> {
        let base_ty = self.types.canonicalize(self.hir.expr(base).ty);
        match self.types.data(base_ty) {
            TypeData::Array { .. } => {
                if self.interner.lookup(field) == "len" {
                    Ok(self.add_expr(ExprKind::ArrayLen(base), TypeId::LONG, span))
                } else {
                    Err(Diagnostic::error(
                        span,
                        format!("arrays have no member named {}", self.name_str(field)),
                    ))
                }
            }
            TypeData::Struct(sid) => {
                let sid = *sid;
                let def = self.types.struct_def(sid);
                if let Some(idx) = def.fields.iter().position(|f| f.name == field) {
                    let ty = def.fields[idx].ty;
                    let index = u32::try_from(idx).unwrap_or(0);
                    return Ok(self.add_expr(ExprKind::Member { base, index }, ty, span));
                }
                if let Some(ScopeName::Subroutine(s)) = self.scopes.lookup(def.scope, field) {
                    let ty = self.hir.subr(s).ty;
                    return Ok(self.add_expr(
                        ExprKind::Subr(SubrRef::Method { receiver: base, subr: s }),
                        ty,
                        span,
                    ));
                }
                Err(Diagnostic::error(
                    span,
                    format!(
                        "type {} has no member named {}",
                        self.type_str(base_ty),
                        self.name_str(field)
                    ),
                ))
            }
            _ => Err(Diagnostic::error(
                span,
                format!(
                    "type {} is not a struct, so cannot access member {}",
                    self.type_str(base_ty),
                    self.name_str(field)
                ),
            )),
        }
    }

    fn resolve_call(
        &mut self,
        callee: &ast::Expr,
        args: &[ast::Expr],
        scope: ScopeId,
        cx: BodyCx,
        span: Span,
    ) -> RResult<ExprId> {
        let callee_id = self.resolve_expr(callee, scope, cx)?;
        let callee_ty = self.types.canonicalize(self.hir.expr(callee_id).ty);
        let TypeData::Callable { pure, params, ret, .. } = self.types.data(callee_ty) else {
            return Err(Diagnostic::error(
                callee.span,
                format!("type {} is not callable", self.type_str(callee_ty)),
            ));
        };
        let (pure, params, ret) = (*pure, params.to_vec(), *ret);

        if cx.pure && !pure {
            return Err(Diagnostic::error(
                span,
                "a pure function cannot call a procedure".to_string(),
            ));
        }
        if args.len() != params.len() {
            return Err(Diagnostic::error(
                span,
                format!(
                    "subroutine expects {} argument{} but {} given",
                    params.len(),
                    if params.len() == 1 { "" } else { "s" },
                    args.len()
                ),
            ));
        }
        let mut arg_ids = Vec::with_capacity(args.len());
        for (arg, param_ty) in args.iter().zip(params) {
            let id = self.resolve_expr(arg, scope, cx)?;
            arg_ids.push(self.coerce(id, param_ty, arg.span)?);
        }
        Ok(self.add_expr(ExprKind::Call { callee: callee_id, args: arg_ids }, ret, span))
    }

    fn resolve_index(
        &mut self,
        base: ExprId,
        index: ExprId,
        _scope: ScopeId,
        span: Span,
    ) -> RResult<ExprId> {
        let base_ty = self.types.canonicalize(self.hir.expr(base).ty);
        match self.types.data(base_ty) {
            TypeData::Tuple(members) => {
                let members = members.to_vec();
                // Tuple subscripts are resolved and bounds-checked now.
                let ExprKind::Int { bits, signed } = self.hir.expr(index).kind else {
                    return Err(Diagnostic::error(
                        span,
                        "tuple subscript must be an integer constant".to_string(),
                    ));
                };
                if signed && (bits as i64) < 0 {
                    return Err(Diagnostic::error(
                        span,
                        "tuple subscript cannot be negative".to_string(),
                    ));
                }
                let idx = bits as usize;
                if idx >= members.len() {
                    return Err(Diagnostic::error(
                        span,
                        format!(
                            "tuple subscript out of bounds: tuple has {} members but member {} requested",
                            members.len(),
                            idx
                        ),
                    ));
                }
                Ok(self.add_expr(ExprKind::Index { base, index }, members[idx], span))
            }
            TypeData::Array { elem, dims } => {
                let (elem, dims) = (*elem, *dims);
                if !self.types.is_integer(self.hir.expr(index).ty) {
                    return Err(Diagnostic::error(
                        span,
                        "array index must be an integer".to_string(),
                    ));
                }
                let ty = if dims == 1 {
                    elem
                } else {
                    self.types.array_type(elem, dims - 1)
                };
                Ok(self.add_expr(ExprKind::Index { base, index }, ty, span))
            }
            TypeData::Map { key, value } => {
                let (key, value) = (*key, *value);
                let index = self.coerce(index, key, span)?;
                Ok(self.add_expr(ExprKind::Index { base, index }, value, span))
            }
            _ => Err(Diagnostic::error(
                span,
                format!("type {} cannot be subscripted", self.type_str(base_ty)),
            )),
        }
    }

    fn resolve_unary(&mut self, op: Op, operand: ExprId, span: Span) -> RResult<ExprId> {
        let operand_ty = self.types.canonicalize(self.hir.expr(operand).ty);
        match op {
            Op::Not => {
                if operand_ty != TypeId::BOOL {
                    return Err(Diagnostic::error(
                        span,
                        "operand to ! must be a bool".to_string(),
                    ));
                }
                Ok(self.add_expr(
                    ExprKind::Unary { op: UnaryOp::Not, operand },
                    TypeId::BOOL,
                    span,
                ))
            }
            Op::Tilde => {
                if !self.types.is_integer(operand_ty) {
                    return Err(Diagnostic::error(
                        span,
                        "operand to ~ must be an integer".to_string(),
                    ));
                }
                Ok(self.add_expr(
                    ExprKind::Unary { op: UnaryOp::BitNot, operand },
                    operand_ty,
                    span,
                ))
            }
            Op::Minus => {
                // Fold constant negation so integer literals become signed
                // constants instead of tripping the unsigned-negation rule.
                match self.hir.expr(operand).kind {
                    ExprKind::Int { bits, signed } => {
                        let value: i128 = if signed {
                            i128::from(bits as i64)
                        } else {
                            i128::from(bits)
                        };
                        let negated = -value;
                        if negated < i128::from(i64::MIN) || negated > i128::from(i64::MAX) {
                            return Err(Diagnostic::error(
                                span,
                                "negated integer constant does not fit in a signed 64-bit integer"
                                    .to_string(),
                            ));
                        }
                        let fits_int = negated >= i128::from(i32::MIN)
                            && negated <= i128::from(i32::MAX);
                        let ty = if fits_int { TypeId::INT } else { TypeId::LONG };
                        return Ok(self.add_expr(
                            ExprKind::Int { bits: (negated as i64) as u64, signed: true },
                            ty,
                            span,
                        ));
                    }
                    ExprKind::Float { fp, dp, wide } => {
                        return Ok(self.add_expr(
                            ExprKind::Float { fp: -fp, dp: -dp, wide },
                            self.hir.expr(operand).ty,
                            span,
                        ));
                    }
                    _ => {}
                }
                if !self.types.is_numeric(operand_ty) {
                    return Err(Diagnostic::error(
                        span,
                        "operand to unary - must be a number".to_string(),
                    ));
                }
                if let Some((_, signed)) = self.types.int_info(operand_ty) {
                    if !signed {
                        return Err(Diagnostic::error(
                            span,
                            "cannot negate a value of unsigned type".to_string(),
                        ));
                    }
                }
                Ok(self.add_expr(
                    ExprKind::Unary { op: UnaryOp::Neg, operand },
                    operand_ty,
                    span,
                ))
            }
            other => Err(Diagnostic::error(
                span,
                format!("{other} is not a unary operator"),
            )),
        }
    }

    /// Apply the binary typing rules and allocate the node.
    pub(crate) fn make_binary(
        &mut self,
        op: BinOp,
        lhs: ExprId,
        rhs: ExprId,
        span: Span,
    ) -> RResult<ExprId> {
        let lt = self.types.canonicalize(self.hir.expr(lhs).ty);
        let rt = self.types.canonicalize(self.hir.expr(rhs).ty);
        let ty = match op {
            BinOp::LogOr | BinOp::LogAnd => {
                if lt != TypeId::BOOL || rt != TypeId::BOOL {
                    return Err(Diagnostic::error(
                        span,
                        "operands to || and && must both be booleans".to_string(),
                    ));
                }
                TypeId::BOOL
            }
            BinOp::BitOr | BinOp::BitAnd | BinOp::BitXor => {
                let Some(ty) = self.wider_integer(lt, rt) else {
                    return Err(Diagnostic::error(
                        span,
                        "operands to bitwise operators must be integers".to_string(),
                    ));
                };
                ty
            }
            BinOp::Shl | BinOp::Shr => {
                if !self.types.is_integer(lt) || !self.types.is_integer(rt) {
                    return Err(Diagnostic::error(
                        span,
                        "operands to bit shifting operators must be integers".to_string(),
                    ));
                }
                lt
            }
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
                if op == BinOp::Add {
                    if let Some(ty) = self.array_plus_type(lt, rt, rhs, lhs)? {
                        let kind = ExprKind::Binary { op, lhs, rhs };
                        return Ok(self.add_expr(kind, ty, span));
                    }
                }
                self.numeric_result(lt, rt).ok_or_else(|| {
                    Diagnostic::error(
                        span,
                        "operands to arithmetic operators must be numbers".to_string(),
                    )
                })?
            }
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let l_to_r = self.can_convert_expr(lhs, rt);
                let r_to_l = self.can_convert_expr(rhs, lt);
                if !l_to_r && !r_to_l {
                    return Err(Diagnostic::error(
                        span,
                        format!(
                            "types {} and {} cannot be compared",
                            self.type_str(lt),
                            self.type_str(rt)
                        ),
                    ));
                }
                TypeId::BOOL
            }
        };
        Ok(self.add_expr(ExprKind::Binary { op, lhs, rhs }, ty, span))
    }

    /// `+` on arrays: concatenation, append, and prepend. Returns the
    /// result type, or `None` when neither side is array-shaped.
    fn array_plus_type(
        &mut self,
        lt: TypeId,
        rt: TypeId,
        rhs: ExprId,
        lhs: ExprId,
    ) -> RResult<Option<TypeId>> {
        let l_is_array = matches!(self.types.data(lt), TypeData::Array { .. });
        let r_is_array = matches!(self.types.data(rt), TypeData::Array { .. });
        if l_is_array {
            if self.types.types_same(lt, rt) || self.types.can_convert(rt, lt) {
                return Ok(Some(lt)); // concatenation
            }
            let TypeData::Array { elem, dims } = *self.types.data(lt) else { unreachable!() };
            let elem_ty = if dims == 1 { elem } else { self.types.array_type(elem, dims - 1) };
            if self.can_convert_expr(rhs, elem_ty) {
                return Ok(Some(lt)); // append
            }
        }
        if r_is_array {
            if self.types.can_convert(lt, rt) {
                return Ok(Some(rt)); // literal-concatenation
            }
            let TypeData::Array { elem, dims } = *self.types.data(rt) else { unreachable!() };
            let elem_ty = if dims == 1 { elem } else { self.types.array_type(elem, dims - 1) };
            if self.can_convert_expr(lhs, elem_ty) {
                return Ok(Some(rt)); // prepend
            }
        }
        Ok(None)
    }

    fn wider_integer(&self, lt: TypeId, rt: TypeId) -> Option<TypeId> {
        let (lw, ls) = self.types.int_info(lt)?;
        let (rw, rs) = self.types.int_info(rt)?;
        Some(if lw > rw {
            self.types.integer_type(lw, ls)
        } else if rw > lw {
            self.types.integer_type(rw, rs)
        } else {
            // Same width: unsigned dominates the tie.
            self.types.integer_type(lw, ls && rs)
        })
    }

    /// Arithmetic result type: float dominates integer, double dominates
    /// float, wider integer dominates narrower, unsigned wins a tie.
    fn numeric_result(&self, lt: TypeId, rt: TypeId) -> Option<TypeId> {
        if !self.types.is_numeric(lt) || !self.types.is_numeric(rt) {
            return None;
        }
        let l_float = self.types.is_float(lt);
        let r_float = self.types.is_float(rt);
        match (l_float, r_float) {
            (true, true) => {
                if lt == TypeId::DOUBLE || rt == TypeId::DOUBLE {
                    Some(TypeId::DOUBLE)
                } else {
                    Some(TypeId::FLOAT)
                }
            }
            (true, false) => Some(lt),
            (false, true) => Some(rt),
            (false, false) => self.wider_integer(lt, rt),
        }
    }

    /// Whether `expr` can be implicitly converted to `target`. Extends the
    /// type-level predicate with the constant-only rule int→enum.
    pub(crate) fn can_convert_expr(&self, expr: ExprId, target: TypeId) -> bool {
        let from = self.hir.expr(expr).ty;
        if self.types.can_convert(from, target) {
            return true;
        }
        if let ExprKind::Int { bits, signed } = self.hir.expr(expr).kind {
            if let TypeData::Enum(eid) = self.types.data(self.types.canonicalize(target)) {
                let value: i128 = if signed {
                    i128::from(bits as i64)
                } else {
                    i128::from(bits)
                };
                return self
                    .types
                    .enum_def(*eid)
                    .items
                    .iter()
                    .any(|i| i.value() == value);
            }
        }
        false
    }

    /// Insert a `Converted` wrapper when types differ; error when the
    /// conversion is not allowed. Integer constants are range-checked
    /// here, at resolution time.
    pub(crate) fn coerce(&mut self, expr: ExprId, target: TypeId, span: Span) -> RResult<ExprId> {
        let from = self.hir.expr(expr).ty;
        if self.types.types_same(from, target) {
            return Ok(expr);
        }
        if !self.can_convert_expr(expr, target) {
            return Err(Diagnostic::error(
                span,
                format!(
                    "cannot convert from {} to {}",
                    self.type_str(from),
                    self.type_str(target)
                ),
            ));
        }
        if let ExprKind::Int { bits, signed } = self.hir.expr(expr).kind {
            if let Some((width, to_signed)) = self.types.int_info(target) {
                if !int_fits(bits, signed, width, to_signed) {
                    return Err(Diagnostic::error(
                        span,
                        format!(
                            "integer constant does not fit in type {}",
                            self.type_str(target)
                        ),
                    ));
                }
            }
            if self.types.canonicalize(target) == TypeId::CHAR
                && !int_fits(bits, signed, IntWidth::W8, false)
            {
                return Err(Diagnostic::error(
                    span,
                    "integer constant does not fit in type char".to_string(),
                ));
            }
        }
        Ok(self.add_expr(ExprKind::Converted { value: expr }, target, span))
    }
}

pub(crate) fn binop_from_token(op: Op) -> Option<BinOp> {
    Some(match op {
        Op::LogOr => BinOp::LogOr,
        Op::LogAnd => BinOp::LogAnd,
        Op::BitOr => BinOp::BitOr,
        Op::BitAnd => BinOp::BitAnd,
        Op::Caret => BinOp::BitXor,
        Op::Plus => BinOp::Add,
        Op::Minus => BinOp::Sub,
        Op::Star => BinOp::Mul,
        Op::Slash => BinOp::Div,
        Op::Percent => BinOp::Rem,
        Op::Shl => BinOp::Shl,
        Op::Shr => BinOp::Shr,
        Op::CmpEq => BinOp::Eq,
        Op::CmpNe => BinOp::Ne,
        Op::Lt => BinOp::Lt,
        Op::Le => BinOp::Le,
        Op::Gt => BinOp::Gt,
        Op::Ge => BinOp::Ge,
        _ => return None,
    })
}
