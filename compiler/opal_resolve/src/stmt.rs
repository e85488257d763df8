//! Statement resolution: scoping, typing checks, and the loop
//! desugarings.

use crate::expr::binop_from_token;
use crate::{BodyCx, RResult, Resolver, ScopeName};
use opal_diagnostic::Diagnostic;
use opal_ir::ast;
use opal_ir::hir::{BinOp, ExprKind, Stmt, StmtKind, Variable};
use opal_ir::{ExprId, Name, ScopeId, Span, StmtId, TypeId, VarId};
use opal_types::TypeData;

impl<'a> Resolver<'a> {
    fn add_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        self.hir.alloc_stmt(Stmt { kind, span })
    }

    pub(crate) fn resolve_global_inits(&mut self) -> RResult<()> {
        let inits = std::mem::take(&mut self.global_inits);
        for (var, init, scope) in inits {
            let cx = BodyCx::global_init();
            let ty = self.hir.var(var).ty;
            let span = self.hir.var(var).span;
            let value = match init {
                Some(e) => {
                    let id = self.resolve_expr(e, scope, cx)?;
                    self.coerce(id, ty, e.span)?
                }
                None => self.default_or_error(ty, span)?,
            };
            self.hir.vars[var.index()].init = Some(value);
        }
        Ok(())
    }

    pub(crate) fn resolve_bodies(&mut self) -> RResult<()> {
        let bodies = std::mem::take(&mut self.queued_bodies);
        for (subr_id, stmts) in bodies {
            let subr = self.hir.subr(subr_id);
            let cx = BodyCx {
                subr: Some(subr_id),
                pure: subr.pure,
                receiver: subr.receiver,
                in_loop: false,
                in_breakable: false,
            };
            let (parent, ret, span) = (subr.scope, subr.ret, subr.span);

            let scope = self.scopes.new_block_scope(parent);
            let mut ids = self.resolve_stmts_into(stmts, scope, cx)?;
            // A void subroutine gets an implicit return when its body
            // does not already end in one.
            if self.types.canonicalize(ret) == TypeId::VOID {
                let ends_in_return = ids
                    .last()
                    .is_some_and(|s| matches!(self.hir.stmt(*s).kind, StmtKind::Return(_)));
                if !ends_in_return {
                    ids.push(self.add_stmt(StmtKind::Return(None), span));
                }
            }
            let block = self.add_stmt(StmtKind::Block { scope, stmts: ids }, span);
            self.hir.subrs[subr_id.index()].body = Some(block);
        }
        Ok(())
    }

    fn default_or_error(&mut self, ty: TypeId, span: Span) -> RResult<ExprId> {
        match self.types.default_expr(ty, &mut self.hir, span) {
            Some(e) => Ok(e),
            None => Err(Diagnostic::error(
                span,
                format!(
                    "type {} has no default value, so an initializer is required",
                    self.type_str(ty)
                ),
            )),
        }
    }

    fn resolve_stmts_into(
        &mut self,
        stmts: &[ast::Stmt],
        scope: ScopeId,
        cx: BodyCx,
    ) -> RResult<Vec<StmtId>> {
        let mut ids = Vec::with_capacity(stmts.len());
        for s in stmts {
            ids.push(self.resolve_stmt(s, scope, cx)?);
        }
        Ok(ids)
    }

    fn resolve_block(
        &mut self,
        stmts: &[ast::Stmt],
        parent: ScopeId,
        cx: BodyCx,
        span: Span,
    ) -> RResult<StmtId> {
        let scope = self.scopes.new_block_scope(parent);
        let ids = self.resolve_stmts_into(stmts, scope, cx)?;
        Ok(self.add_stmt(StmtKind::Block { scope, stmts: ids }, span))
    }

    fn resolve_stmt(&mut self, stmt: &ast::Stmt, scope: ScopeId, cx: BodyCx) -> RResult<StmtId> {
        let span = stmt.span;
        match &stmt.kind {
            ast::StmtKind::Block(stmts) => self.resolve_block(stmts, scope, cx, span),

            ast::StmtKind::VarDecl { ty, name, init } => {
                self.resolve_var_decl(ty, *name, init.as_ref(), scope, cx, span)
            }

            ast::StmtKind::Assign { lhs, op, rhs } => {
                let lhs_id = self.resolve_expr(lhs, scope, cx)?;
                if !self.hir.assignable(lhs_id) {
                    return Err(Diagnostic::error(
                        span,
                        "left-hand side of assignment is immutable".to_string(),
                    ));
                }
                let mut rhs_id = self.resolve_expr(rhs, scope, cx)?;
                if let Some(op) = op {
                    // `a += b` applies the base operator to a copy of the
                    // target and the operand.
                    let Some(bin) = binop_from_token(*op) else {
                        return Err(Diagnostic::error(
                            span,
                            format!("{op} is not a binary operator"),
                        ));
                    };
                    let copy = self.hir.deep_copy(lhs_id);
                    rhs_id = self.make_binary(bin, copy, rhs_id, span)?;
                }
                let target = self.hir.expr(lhs_id).ty;
                let rhs_id = self.coerce(rhs_id, target, span)?;
                Ok(self.add_stmt(StmtKind::Assign { lhs: lhs_id, rhs: rhs_id }, span))
            }

            ast::StmtKind::Call(e) => {
                let id = self.resolve_expr(e, scope, cx)?;
                Ok(self.add_stmt(StmtKind::Call(id), span))
            }

            ast::StmtKind::If { cond, then, els } => {
                let cond_id = self.resolve_bool_cond(cond, scope, cx, "if condition")?;
                let then_id = self.resolve_stmt(then, scope, cx)?;
                let els_id = match els {
                    Some(e) => Some(self.resolve_stmt(e, scope, cx)?),
                    None => None,
                };
                Ok(self.add_stmt(
                    StmtKind::If { cond: cond_id, then: then_id, els: els_id },
                    span,
                ))
            }

            ast::StmtKind::While { cond, body } => {
                let cond_id = self.resolve_bool_cond(cond, scope, cx, "while loop condition")?;
                let body_cx = BodyCx { in_loop: true, in_breakable: true, ..cx };
                let body_id = self.resolve_stmt(body, scope, body_cx)?;
                Ok(self.add_stmt(StmtKind::While { cond: cond_id, body: body_id }, span))
            }

            ast::StmtKind::ForC { init, cond, incr, body } => {
                // Header declarations live in the loop's own scope.
                let loop_scope = self.scopes.new_block_scope(scope);
                let init_id = match init {
                    Some(s) => Some(self.resolve_stmt(s, loop_scope, cx)?),
                    None => None,
                };
                let cond_id = self.resolve_bool_cond(cond, loop_scope, cx, "for loop condition")?;
                let incr_id = match incr {
                    Some(s) => Some(self.resolve_stmt(s, loop_scope, cx)?),
                    None => None,
                };
                let body_cx = BodyCx { in_loop: true, in_breakable: true, ..cx };
                let body_id = self.resolve_stmt(body, loop_scope, body_cx)?;
                Ok(self.add_stmt(
                    StmtKind::ForC { init: init_id, cond: cond_id, incr: incr_id, body: body_id },
                    span,
                ))
            }

            ast::StmtKind::ForRange { counter, begin, end, body } => {
                self.resolve_for_range(*counter, begin, end, body, scope, cx, span)
            }

            ast::StmtKind::ForArray { names, arr, body } => {
                self.resolve_for_array(names, arr, body, scope, cx, span)
            }

            ast::StmtKind::Switch { scrutinee, cases, default, stmts } => {
                self.resolve_switch(scrutinee, cases, *default, stmts, scope, cx, span)
            }

            ast::StmtKind::Match { binding, scrutinee, cases } => {
                self.resolve_match(*binding, scrutinee, cases, scope, cx, span)
            }

            ast::StmtKind::Return(value) => {
                let Some(subr_id) = cx.subr else {
                    return Err(Diagnostic::error(
                        span,
                        "return outside of a subroutine".to_string(),
                    ));
                };
                let ret = self.hir.subr(subr_id).ret;
                let ret_canon = self.types.canonicalize(ret);
                match value {
                    None => {
                        if ret_canon != TypeId::VOID {
                            return Err(Diagnostic::error(
                                span,
                                "non-void subroutine must return a value".to_string(),
                            ));
                        }
                        Ok(self.add_stmt(StmtKind::Return(None), span))
                    }
                    Some(e) => {
                        if ret_canon == TypeId::VOID {
                            return Err(Diagnostic::error(
                                span,
                                "returned a value from a void subroutine".to_string(),
                            ));
                        }
                        let id = self.resolve_expr(e, scope, cx)?;
                        let id = self.coerce(id, ret, e.span)?;
                        Ok(self.add_stmt(StmtKind::Return(Some(id)), span))
                    }
                }
            }

            ast::StmtKind::Break => {
                if !cx.in_breakable {
                    return Err(Diagnostic::error(
                        span,
                        "break is not inside any loop or switch".to_string(),
                    ));
                }
                Ok(self.add_stmt(StmtKind::Break, span))
            }

            ast::StmtKind::Continue => {
                if !cx.in_loop {
                    return Err(Diagnostic::error(
                        span,
                        "continue is not inside any loop".to_string(),
                    ));
                }
                Ok(self.add_stmt(StmtKind::Continue, span))
            }

            ast::StmtKind::Print(exprs) => {
                let mut ids = Vec::with_capacity(exprs.len());
                for e in exprs {
                    ids.push(self.resolve_expr(e, scope, cx)?);
                }
                Ok(self.add_stmt(StmtKind::Print(ids), span))
            }

            ast::StmtKind::Assert(e) => {
                let id = self.resolve_expr(e, scope, cx)?;
                let ty = self.types.canonicalize(self.hir.expr(id).ty);
                if ty != TypeId::BOOL {
                    return Err(Diagnostic::error(
                        span,
                        format!("asserted value has non-bool type {}", self.type_str(ty)),
                    ));
                }
                Ok(self.add_stmt(StmtKind::Assert(id), span))
            }
        }
    }

    fn resolve_bool_cond(
        &mut self,
        cond: &ast::Expr,
        scope: ScopeId,
        cx: BodyCx,
        what: &str,
    ) -> RResult<ExprId> {
        let id = self.resolve_expr(cond, scope, cx)?;
        let ty = self.types.canonicalize(self.hir.expr(id).ty);
        if ty != TypeId::BOOL {
            return Err(Diagnostic::error(
                cond.span,
                format!("{what} must be bool"),
            ));
        }
        Ok(id)
    }

    /// A declaration always lowers to an assignment, defaulting the value
    /// when no initializer was written.
    fn resolve_var_decl(
        &mut self,
        pt: &ast::ParsedType,
        name: Name,
        init: Option<&ast::Expr>,
        scope: ScopeId,
        cx: BodyCx,
        span: Span,
    ) -> RResult<StmtId> {
        let ty = self.resolve_type(pt, scope)?;
        if self.types.canonicalize(ty) == TypeId::VOID {
            return Err(Diagnostic::error(
                span,
                "variable cannot have void type".to_string(),
            ));
        }
        let var = self.hir.alloc_var(Variable {
            name,
            ty,
            scope,
            init: None,
            is_param: false,
            is_global: false,
            span,
        });
        self.scopes
            .insert(scope, name, ScopeName::Variable(var), span, self.interner)?;
        let value = match init {
            Some(e) => {
                let id = self.resolve_expr(e, scope, cx)?;
                self.coerce(id, ty, e.span)?
            }
            None => self.default_or_error(ty, span)?,
        };
        let lhs = self.add_expr(ExprKind::Var(var), ty, span);
        Ok(self.add_stmt(StmtKind::Assign { lhs, rhs: value }, span))
    }

    /// `for i : begin, end` desugars to a C-style loop over a fresh
    /// signed 64-bit counter: initialised to `begin`, tested with
    /// `counter < end`, incremented by one.
    #[allow(clippy::too_many_arguments)]
    fn resolve_for_range(
        &mut self,
        counter: Name,
        begin: &ast::Expr,
        end: &ast::Expr,
        body: &ast::Stmt,
        scope: ScopeId,
        cx: BodyCx,
        span: Span,
    ) -> RResult<StmtId> {
        let loop_scope = self.scopes.new_block_scope(scope);
        let var = self.hir.alloc_var(Variable {
            name: counter,
            ty: TypeId::LONG,
            scope: loop_scope,
            init: None,
            is_param: false,
            is_global: false,
            span,
        });
        self.scopes
            .insert(loop_scope, counter, ScopeName::Variable(var), span, self.interner)?;

        let begin_id = self.resolve_expr(begin, loop_scope, cx)?;
        let begin_id = self.coerce(begin_id, TypeId::LONG, begin.span)?;
        let end_id = self.resolve_expr(end, loop_scope, cx)?;
        let end_id = self.coerce(end_id, TypeId::LONG, end.span)?;

        let counter_init = self.add_expr(ExprKind::Var(var), TypeId::LONG, span);
        let init = self.add_stmt(StmtKind::Assign { lhs: counter_init, rhs: begin_id }, span);

        let counter_cond = self.add_expr(ExprKind::Var(var), TypeId::LONG, span);
        let cond = self.make_binary(BinOp::Lt, counter_cond, end_id, span)?;

        let counter_read = self.add_expr(ExprKind::Var(var), TypeId::LONG, span);
        let one = self.add_expr(ExprKind::Int { bits: 1, signed: true }, TypeId::LONG, span);
        let bumped = self.make_binary(BinOp::Add, counter_read, one, span)?;
        let counter_write = self.add_expr(ExprKind::Var(var), TypeId::LONG, span);
        let incr = self.add_stmt(StmtKind::Assign { lhs: counter_write, rhs: bumped }, span);

        let body_cx = BodyCx { in_loop: true, in_breakable: true, ..cx };
        let body_id = self.resolve_stmt(body, loop_scope, body_cx)?;

        Ok(self.add_stmt(
            StmtKind::ForC {
                init: Some(init),
                cond,
                incr: Some(incr),
                body: body_id,
            },
            span,
        ))
    }

    /// `for [c1, ..., it] : arr`: counters are fresh signed 64-bit
    /// variables, one per iterated dimension; the last name binds the
    /// iteration variable to the element at that depth.
    #[allow(clippy::too_many_arguments)]
    fn resolve_for_array(
        &mut self,
        names: &[Name],
        arr: &ast::Expr,
        body: &ast::Stmt,
        scope: ScopeId,
        cx: BodyCx,
        span: Span,
    ) -> RResult<StmtId> {
        if names.len() < 2 {
            return Err(Diagnostic::error(
                span,
                "for over an array needs at least one counter and an iteration variable"
                    .to_string(),
            ));
        }
        let loop_scope = self.scopes.new_block_scope(scope);
        let mut arr_id = self.resolve_expr(arr, loop_scope, cx)?;
        let mut arr_ty = self.types.canonicalize(self.hir.expr(arr_id).ty);
        // A compound literal iterates as an array of its first member's
        // type (all members must agree).
        if let TypeData::Tuple(members) = self.types.data(arr_ty) {
            let Some(first) = members.first().copied() else {
                return Err(Diagnostic::error(
                    arr.span,
                    "cannot iterate over an empty compound literal".to_string(),
                ));
            };
            let as_array = self.types.array_type(first, 1);
            arr_id = self.coerce(arr_id, as_array, arr.span)?;
            arr_ty = as_array;
        }
        let TypeData::Array { elem, dims } = *self.types.data(arr_ty) else {
            return Err(Diagnostic::error(
                arr.span,
                format!("cannot iterate over non-array type {}", self.type_str(arr_ty)),
            ));
        };
        let depth = u32::try_from(names.len() - 1).unwrap_or(u32::MAX);
        if depth > dims {
            return Err(Diagnostic::error(
                span,
                format!(
                    "loop iterates {depth} dimension{} but the array has {dims}",
                    if depth == 1 { "" } else { "s" }
                ),
            ));
        }

        let mut counters: Vec<VarId> = Vec::with_capacity(names.len() - 1);
        for name in &names[..names.len() - 1] {
            let var = self.hir.alloc_var(Variable {
                name: *name,
                ty: TypeId::LONG,
                scope: loop_scope,
                init: None,
                is_param: false,
                is_global: false,
                span,
            });
            self.scopes
                .insert(loop_scope, *name, ScopeName::Variable(var), span, self.interner)?;
            counters.push(var);
        }

        let iter_ty = if depth == dims {
            elem
        } else {
            self.types.array_type(elem, dims - depth)
        };
        let iter_name = names[names.len() - 1];
        let iter = self.hir.alloc_var(Variable {
            name: iter_name,
            ty: iter_ty,
            scope: loop_scope,
            init: None,
            is_param: false,
            is_global: false,
            span,
        });
        self.scopes
            .insert(loop_scope, iter_name, ScopeName::Variable(iter), span, self.interner)?;

        let body_cx = BodyCx { in_loop: true, in_breakable: true, ..cx };
        let body_id = self.resolve_stmt(body, loop_scope, body_cx)?;

        Ok(self.add_stmt(
            StmtKind::ForArray { arr: arr_id, counters, iter, body: body_id },
            span,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_switch(
        &mut self,
        scrutinee: &ast::Expr,
        cases: &[(ast::Expr, usize)],
        default: Option<usize>,
        stmts: &[ast::Stmt],
        scope: ScopeId,
        cx: BodyCx,
        span: Span,
    ) -> RResult<StmtId> {
        let scr = self.resolve_expr(scrutinee, scope, cx)?;
        let scr_ty = self.hir.expr(scr).ty;

        let mut case_values = Vec::with_capacity(cases.len());
        let mut case_labels = Vec::with_capacity(cases.len());
        for (value, label) in cases {
            let id = self.resolve_expr(value, scope, cx)?;
            if !self.hir.is_constant(id) {
                return Err(Diagnostic::error(
                    value.span,
                    "switch case value must be a constant".to_string(),
                ));
            }
            let id = self.coerce(id, scr_ty, value.span)?;
            case_values.push(id);
            case_labels.push(u32::try_from(*label).unwrap_or(u32::MAX));
        }

        // The flat statement list shares one scope; declarations are
        // rejected because a case jump could skip their initialisation.
        let body_scope = self.scopes.new_block_scope(scope);
        let body_cx = BodyCx { in_breakable: true, ..cx };
        let mut ids = Vec::with_capacity(stmts.len());
        for s in stmts {
            if matches!(s.kind, ast::StmtKind::VarDecl { .. }) {
                return Err(Diagnostic::error(
                    s.span,
                    "switch body cannot declare variables".to_string(),
                ));
            }
            ids.push(self.resolve_stmt(s, body_scope, body_cx)?);
        }

        let default_label = default
            .map(|d| u32::try_from(d).unwrap_or(u32::MAX))
            .unwrap_or(u32::try_from(ids.len()).unwrap_or(u32::MAX));

        Ok(self.add_stmt(
            StmtKind::Switch {
                scrutinee: scr,
                case_values,
                case_labels,
                default_label,
                stmts: ids,
            },
            span,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_match(
        &mut self,
        binding: Name,
        scrutinee: &ast::Expr,
        cases: &[ast::MatchCase],
        scope: ScopeId,
        cx: BodyCx,
        span: Span,
    ) -> RResult<StmtId> {
        let scr = self.resolve_expr(scrutinee, scope, cx)?;
        let scr_ty = self.types.canonicalize(self.hir.expr(scr).ty);
        let TypeData::Union(options) = self.types.data(scr_ty) else {
            return Err(Diagnostic::error(
                scrutinee.span,
                "matched expression must be of union type".to_string(),
            ));
        };
        let options = options.to_vec();

        let mut case_options = Vec::with_capacity(cases.len());
        let mut bindings = Vec::with_capacity(cases.len());
        let mut bodies = Vec::with_capacity(cases.len());
        for case in cases {
            let case_ty = self.resolve_type(&case.ty, scope)?;
            let case_ty = self.types.canonicalize(case_ty);
            let Some(idx) = options.iter().position(|o| *o == case_ty) else {
                return Err(Diagnostic::error(
                    case.span,
                    format!(
                        "match includes type {} which is not a member of union {}",
                        self.type_str(case_ty),
                        self.type_str(scr_ty)
                    ),
                ));
            };
            case_options.push(u32::try_from(idx).unwrap_or(0));

            // Each case gets its own scope holding the payload binding.
            let case_scope = self.scopes.new_block_scope(scope);
            let var = self.hir.alloc_var(Variable {
                name: binding,
                ty: options[idx],
                scope: case_scope,
                init: None,
                is_param: false,
                is_global: false,
                span: case.span,
            });
            self.scopes.insert(
                case_scope,
                binding,
                ScopeName::Variable(var),
                case.span,
                self.interner,
            )?;
            bindings.push(var);

            let ids = self.resolve_stmts_into(&case.body, case_scope, cx)?;
            bodies.push(self.add_stmt(
                StmtKind::Block { scope: case_scope, stmts: ids },
                case.span,
            ));
        }

        Ok(self.add_stmt(
            StmtKind::Match {
                scrutinee: scr,
                options: case_options,
                bindings,
                bodies,
            },
            span,
        ))
    }
}
