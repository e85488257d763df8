//! The tree-walking interpreter.
//!
//! Execution state is a stack of frames (locals plus an optional `this`
//! binding) over a global binding table. Statement execution returns a
//! [`Flow`] signal for non-local control flow; expression evaluation
//! returns owned [`Value`]s, deep-copying whenever it reads through an
//! lvalue so composite data never aliases.

use crate::errors::{self, EResult};
use crate::place::{Place, PlaceRoot, PlaceStep, ThisBinding};
use crate::print_handler::PrintHandler;
use crate::stack::ensure_sufficient_stack;
use crate::value::{default_value, render, IntValue, SubrVal, Value};
use opal_ir::hir::{BinOp, ExprKind, Hir, StmtKind, SubrRef, UnaryOp};
use opal_ir::{ExprId, Span, StmtId, StringInterner, SubrId, TypeId, VarId};
use opal_types::{IntWidth, TypeData, TypePool};
use rustc_hash::FxHashMap;

/// Non-local control flow signal produced by statement execution.
/// At most one signal is in flight at a time.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Flow {
    Normal,
    Break,
    Continue,
    Return,
}

struct Frame {
    this: Option<ThisBinding>,
    locals: FxHashMap<VarId, Value>,
}

impl Frame {
    fn new(this: Option<ThisBinding>) -> Self {
        Frame { this, locals: FxHashMap::default() }
    }
}

/// One program execution. Owns the mutable run state; the resolved
/// program is read immutably.
pub struct Interpreter<'a> {
    hir: &'a Hir,
    types: &'a TypePool,
    interner: &'a StringInterner,
    globals: FxHashMap<VarId, Value>,
    frames: Vec<Frame>,
    /// Return-value slot, filled by `return` and drained by the caller.
    ret: Value,
    handler: PrintHandler,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        hir: &'a Hir,
        types: &'a TypePool,
        interner: &'a StringInterner,
        handler: PrintHandler,
    ) -> Self {
        Interpreter {
            hir,
            types,
            interner,
            globals: FxHashMap::default(),
            frames: Vec::new(),
            ret: Value::Void,
            handler,
        }
    }

    /// Captured print output (buffer handler only).
    pub fn output(&self) -> &str {
        self.handler.output()
    }

    /// Initialize globals in declaration order, then run `main`.
    /// Returns the process exit code.
    pub fn run(&mut self, args: &[String]) -> EResult<i32> {
        // Base frame so evaluation always has a frame to work against.
        self.frames.push(Frame::new(None));

        for var in &self.hir.globals {
            let record = self.hir.var(*var);
            let init = record
                .init
                .ok_or_else(|| errors::ice(record.span, "global without an initializer"))?;
            let value = self.eval(init)?;
            self.globals.insert(*var, value);
        }

        let main = self
            .hir
            .main
            .ok_or_else(|| errors::ice(Span::DUMMY, "program has no entry point"))?;
        let call_args = if self.hir.subr(main).params.is_empty() {
            Vec::new()
        } else {
            vec![self.string_array_value(args)?]
        };
        let result = self.call_subr(main, call_args, None, self.hir.subr(main).span)?;
        Ok(match result {
            Value::Int(i) => i.as_i64() as i32,
            _ => 0,
        })
    }

    fn string_array_value(&self, args: &[String]) -> EResult<Value> {
        let ty = self
            .types
            .array_level(TypeId::CHAR, 2)
            .ok_or_else(|| errors::ice(Span::DUMMY, "string array type not interned"))?;
        let elems = args
            .iter()
            .map(|arg| Value::Compound {
                ty: TypeId::STRING,
                elems: arg.bytes().map(Value::Char).collect(),
            })
            .collect();
        Ok(Value::Compound { ty, elems })
    }

    // ----- Subroutine invocation -----

    fn call_subr(
        &mut self,
        id: SubrId,
        args: Vec<Value>,
        this: Option<ThisBinding>,
        span: Span,
    ) -> EResult<Value> {
        let subr = self.hir.subr(id);
        let body = subr
            .body
            .ok_or_else(|| errors::ice(span, "call of subroutine without a body"))?;

        let mut frame = Frame::new(this);
        for (param, arg) in subr.params.iter().zip(args) {
            frame.locals.insert(*param, arg);
        }
        self.frames.push(frame);
        let flow = ensure_sufficient_stack(|| self.exec(body));
        self.frames.pop();

        match flow? {
            Flow::Return => Ok(std::mem::replace(&mut self.ret, Value::Void)),
            Flow::Normal => {
                if self.types.canonicalize(subr.ret) == TypeId::VOID {
                    Ok(Value::Void)
                } else {
                    Err(errors::missing_return(subr.span))
                }
            }
            Flow::Break | Flow::Continue => {
                Err(errors::ice(subr.span, "loop signal escaped a subroutine body"))
            }
        }
    }

    // ----- Statements -----

    fn exec(&mut self, s: StmtId) -> EResult<Flow> {
        let hir = self.hir;
        let stmt = hir.stmt(s);
        let span = stmt.span;
        match &stmt.kind {
            StmtKind::Block { stmts, .. } => {
                for inner in stmts {
                    match self.exec(*inner)? {
                        Flow::Normal => {}
                        signal => return Ok(signal),
                    }
                }
                Ok(Flow::Normal)
            }

            StmtKind::Assign { lhs, rhs } => {
                let value = self.eval(*rhs)?;
                // A compound-literal target assigns element by element.
                if let ExprKind::Compound(targets) = &hir.expr(*lhs).kind {
                    let Value::Compound { elems, .. } = value else {
                        return Err(errors::ice(span, "compound assignment from non-compound"));
                    };
                    if targets.len() != elems.len() {
                        return Err(errors::ice(span, "compound assignment arity mismatch"));
                    }
                    for (target, elem) in targets.iter().zip(elems) {
                        let place = self.eval_place(*target)?;
                        *self.place_mut(&place, span)? = elem;
                    }
                } else {
                    let place = self.eval_place(*lhs)?;
                    *self.place_mut(&place, span)? = value;
                }
                Ok(Flow::Normal)
            }

            StmtKind::Call(e) => {
                self.eval(*e)?;
                Ok(Flow::Normal)
            }

            StmtKind::ForC { init, cond, incr, body } => {
                if let Some(init) = init {
                    self.exec(*init)?;
                }
                loop {
                    if !self.eval_bool(*cond)? {
                        break;
                    }
                    match self.exec(*body)? {
                        Flow::Break => break,
                        Flow::Return => return Ok(Flow::Return),
                        // `continue` still runs the increment.
                        Flow::Normal | Flow::Continue => {}
                    }
                    if let Some(incr) = incr {
                        self.exec(*incr)?;
                    }
                }
                Ok(Flow::Normal)
            }

            StmtKind::While { cond, body } => {
                loop {
                    if !self.eval_bool(*cond)? {
                        break;
                    }
                    match self.exec(*body)? {
                        Flow::Break => break,
                        Flow::Return => return Ok(Flow::Return),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }

            StmtKind::If { cond, then, els } => {
                if self.eval_bool(*cond)? {
                    self.exec(*then)
                } else if let Some(els) = els {
                    self.exec(*els)
                } else {
                    Ok(Flow::Normal)
                }
            }

            StmtKind::ForArray { arr, counters, iter, body } => {
                self.exec_for_array(*arr, counters, *iter, *body)
            }

            StmtKind::Switch { scrutinee, case_values, case_labels, default_label, stmts } => {
                let scr = self.eval(*scrutinee)?;
                let mut label = *default_label as usize;
                for (i, case) in case_values.iter().enumerate() {
                    let value = self.eval(*case)?;
                    if value.equals(&scr) {
                        label = case_labels[i] as usize;
                        break;
                    }
                }
                // Execution falls through the flat statement list from
                // the label until a break or terminal statement.
                for inner in stmts.iter().skip(label) {
                    match self.exec(*inner)? {
                        Flow::Normal => {}
                        Flow::Break => return Ok(Flow::Normal),
                        Flow::Continue => return Ok(Flow::Continue),
                        Flow::Return => return Ok(Flow::Return),
                    }
                }
                Ok(Flow::Normal)
            }

            StmtKind::Match { scrutinee, options, bindings, bodies } => {
                let scr = self.eval(*scrutinee)?;
                let Value::Union { option, value, .. } = scr else {
                    return Err(errors::ice(span, "match scrutinee is not a union value"));
                };
                if let Some(i) = options.iter().position(|o| *o == option) {
                    self.set_local(bindings[i], *value);
                    match self.exec(bodies[i])? {
                        // Break ends the match, nothing above it.
                        Flow::Normal | Flow::Break => {}
                        Flow::Continue => return Ok(Flow::Continue),
                        Flow::Return => return Ok(Flow::Return),
                    }
                }
                Ok(Flow::Normal)
            }

            StmtKind::Return(value) => {
                self.ret = match value {
                    Some(e) => self.eval(*e)?,
                    None => Value::Void,
                };
                Ok(Flow::Return)
            }

            StmtKind::Break => Ok(Flow::Break),
            StmtKind::Continue => Ok(Flow::Continue),

            StmtKind::Print(exprs) => {
                for e in exprs {
                    let value = self.eval(*e)?;
                    let text = render(&value, self.types, self.hir, self.interner);
                    self.handler.print(&text);
                }
                Ok(Flow::Normal)
            }

            StmtKind::Assert(e) => {
                if self.eval_bool(*e)? {
                    Ok(Flow::Normal)
                } else {
                    Err(errors::assertion_failed(span))
                }
            }
        }
    }

    /// Depth-first traversal of a (possibly ragged) array with explicit
    /// stack items: element nodes tagged with their depth, interleaved
    /// with counter bumps so each per-dimension counter tracks the index
    /// within its dimension.
    fn exec_for_array(
        &mut self,
        arr: ExprId,
        counters: &[VarId],
        iter: VarId,
        body: StmtId,
    ) -> EResult<Flow> {
        enum Item {
            Node(Value, usize),
            Bump(usize),
        }

        let root = self.eval(arr)?;
        let depth_limit = counters.len();
        for counter in counters {
            self.set_local(*counter, long_value(0));
        }

        let span = self.hir.stmt(body).span;
        let mut stack = vec![Item::Node(root, 0)];
        while let Some(item) = stack.pop() {
            match item {
                Item::Bump(dim) => {
                    let current = match self.top_frame().locals.get(&counters[dim]) {
                        Some(Value::Int(i)) => i.as_i64(),
                        _ => return Err(errors::ice(span, "loop counter is not an integer")),
                    };
                    self.set_local(counters[dim], long_value(current.wrapping_add(1)));
                }
                Item::Node(value, depth) => {
                    if depth == depth_limit {
                        // Innermost element: bind and run the body.
                        self.set_local(iter, value);
                        match self.exec(body)? {
                            Flow::Break => return Ok(Flow::Normal),
                            Flow::Return => return Ok(Flow::Return),
                            Flow::Normal | Flow::Continue => {}
                        }
                    } else {
                        self.set_local(counters[depth], long_value(0));
                        let Value::Compound { elems, .. } = value else {
                            return Err(errors::ice(span, "iterated value is not an array"));
                        };
                        for elem in elems.into_iter().rev() {
                            stack.push(Item::Bump(depth));
                            stack.push(Item::Node(elem, depth + 1));
                        }
                    }
                }
            }
        }
        Ok(Flow::Normal)
    }

    // ----- Expressions -----

    fn eval(&mut self, e: ExprId) -> EResult<Value> {
        let hir = self.hir;
        let expr = hir.expr(e);
        let (ty, span) = (expr.ty, expr.span);
        match &expr.kind {
            ExprKind::Int { bits, signed } => {
                let (width, _) = self
                    .types
                    .int_info(ty)
                    .unwrap_or((IntWidth::W64, *signed));
                Ok(Value::Int(IntValue::new(*bits, width, *signed)))
            }
            ExprKind::Float { fp, dp, wide } => Ok(if *wide {
                Value::Double(*dp)
            } else {
                Value::Float(*fp)
            }),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Char(c) => Ok(Value::Char(*c)),
            ExprKind::Str(name) => {
                // Strings become mutable compounds of chars so that
                // assignments to string cells work.
                let elems = self
                    .interner
                    .lookup(*name)
                    .bytes()
                    .map(Value::Char)
                    .collect();
                Ok(Value::Compound { ty: TypeId::STRING, elems })
            }
            ExprKind::EnumVal { enum_id, item } => {
                let item = &self.types.enum_def(*enum_id).items[*item as usize];
                Ok(Value::Int(IntValue::new(item.bits, IntWidth::W64, item.signed)))
            }
            ExprKind::Compound(members) => {
                let mut elems = Vec::with_capacity(members.len());
                for m in members {
                    elems.push(self.eval(*m)?);
                }
                Ok(Value::Compound { ty, elems })
            }
            ExprKind::MapLit(pairs) => {
                let mut entries: Vec<(Value, Value)> = Vec::with_capacity(pairs.len());
                for (k, v) in pairs {
                    let key = self.eval(*k)?;
                    let value = self.eval(*v)?;
                    match entries.iter_mut().find(|(ek, _)| ek.equals(&key)) {
                        Some(entry) => entry.1 = value,
                        None => entries.push((key, value)),
                    }
                }
                Ok(Value::Map { ty, entries })
            }
            ExprKind::Union { option, value } => {
                let inner = self.eval(*value)?;
                Ok(Value::Union { ty, option: *option, value: Box::new(inner) })
            }
            ExprKind::Var(v) => self.read_var(*v, span),
            ExprKind::Subr(subr) => match subr {
                SubrRef::Free(id) => Ok(Value::Subr { subr: SubrVal::Free(*id), bound: None }),
                SubrRef::Extern(id) => {
                    Ok(Value::Subr { subr: SubrVal::Extern(*id), bound: None })
                }
                SubrRef::Method { receiver, subr } => {
                    let bound = self.eval(*receiver)?;
                    Ok(Value::Subr {
                        subr: SubrVal::Free(*subr),
                        bound: Some(Box::new(bound)),
                    })
                }
            },
            ExprKind::Member { .. } | ExprKind::Index { .. } | ExprKind::This
                if hir.assignable(e) =>
            {
                // Reads through lvalues deep-copy, so mutations of the
                // result never alias the original.
                let place = self.eval_place(e)?;
                Ok(self.place_mut(&place, span)?.clone())
            }
            ExprKind::Member { base, index } => {
                let base = self.eval(*base)?;
                let Value::Compound { mut elems, .. } = base else {
                    return Err(errors::ice(span, "member access on non-compound value"));
                };
                let index = *index as usize;
                if index >= elems.len() {
                    return Err(errors::ice(span, "member index out of range"));
                }
                Ok(elems.swap_remove(index))
            }
            ExprKind::Index { base, index } => {
                let base_value = self.eval(*base)?;
                let index_value = self.eval(*index)?;
                self.index_value(base_value, index_value, span)
            }
            ExprKind::This => {
                let binding = self
                    .top_frame()
                    .this
                    .clone()
                    .ok_or_else(|| errors::ice(span, "this outside of a method frame"))?;
                match binding {
                    ThisBinding::Value(v) => Ok(v),
                    ThisBinding::Place(place) => Ok(self.place_mut(&place, span)?.clone()),
                }
            }
            ExprKind::ArrayLen(arr) => {
                let value = self.eval(*arr)?;
                let Value::Compound { elems, .. } = value else {
                    return Err(errors::ice(span, "length of non-array value"));
                };
                Ok(long_value(elems.len() as i64))
            }
            ExprKind::NewArray { dims } => {
                let mut sizes = Vec::with_capacity(dims.len());
                for d in dims {
                    let value = self.eval(*d)?;
                    let Value::Int(i) = value else {
                        return Err(errors::ice(span, "array dimension is not an integer"));
                    };
                    if i.value() < 0 {
                        return Err(errors::negative_array_size(span));
                    }
                    sizes.push(i.value() as u64);
                }
                self.make_array(&sizes, ty, span)
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval(*operand)?;
                self.eval_unary(*op, value, span)
            }
            ExprKind::Binary { op, lhs, rhs } => self.eval_binary(*op, *lhs, *rhs, ty, span),
            ExprKind::Call { callee, args } => self.eval_call(*callee, args, span),
            ExprKind::Is { base, option } => {
                let value = self.eval(*base)?;
                let Value::Union { option: active, .. } = value else {
                    return Err(errors::ice(span, "is-test on non-union value"));
                };
                Ok(Value::Bool(active == *option))
            }
            ExprKind::As { base, option } => {
                let value = self.eval(*base)?;
                let Value::Union { option: active, value: inner, .. } = value else {
                    return Err(errors::ice(span, "as-narrow on non-union value"));
                };
                if active != *option {
                    return Err(errors::union_as_mismatch(span));
                }
                Ok(*inner)
            }
            ExprKind::Converted { value } => {
                let from = hir.expr(*value).ty;
                let inner = self.eval(*value)?;
                self.convert_value(inner, from, ty, span)
            }
        }
    }

    fn eval_bool(&mut self, e: ExprId) -> EResult<bool> {
        match self.eval(e)? {
            Value::Bool(b) => Ok(b),
            _ => Err(errors::ice(self.hir.expr(e).span, "condition is not a bool")),
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, value: Value, span: Span) -> EResult<Value> {
        match op {
            UnaryOp::Not => match value {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                _ => Err(errors::ice(span, "logical not on non-bool")),
            },
            UnaryOp::BitNot => match value {
                Value::Int(i) => Ok(Value::Int(IntValue::new(!i.bits(), i.width, i.signed))),
                _ => Err(errors::ice(span, "bitwise not on non-integer")),
            },
            UnaryOp::Neg => match value {
                Value::Int(i) => {
                    if i.is_signed_minimum() {
                        return Err(errors::negation_overflow(span));
                    }
                    Ok(Value::Int(IntValue::new(
                        (i.as_i64().wrapping_neg()) as u64,
                        i.width,
                        i.signed,
                    )))
                }
                Value::Float(f) => Ok(Value::Float(-f)),
                Value::Double(d) => Ok(Value::Double(-d)),
                _ => Err(errors::ice(span, "negation of non-number")),
            },
        }
    }

    fn eval_binary(
        &mut self,
        op: BinOp,
        lhs: ExprId,
        rhs: ExprId,
        result_ty: TypeId,
        span: Span,
    ) -> EResult<Value> {
        // Short-circuit boolean operators first.
        match op {
            BinOp::LogAnd => {
                if !self.eval_bool(lhs)? {
                    return Ok(Value::Bool(false));
                }
                return Ok(Value::Bool(self.eval_bool(rhs)?));
            }
            BinOp::LogOr => {
                if self.eval_bool(lhs)? {
                    return Ok(Value::Bool(true));
                }
                return Ok(Value::Bool(self.eval_bool(rhs)?));
            }
            _ => {}
        }

        let lv = self.eval(lhs)?;
        let rv = self.eval(rhs)?;

        match op {
            BinOp::Eq => return Ok(Value::Bool(lv.equals(&rv))),
            BinOp::Ne => return Ok(Value::Bool(!lv.equals(&rv))),
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let Some(ordering) = lv.compare(&rv) else {
                    return Err(errors::ice(span, "values cannot be ordered"));
                };
                let result = match op {
                    BinOp::Lt => ordering.is_lt(),
                    BinOp::Le => ordering.is_le(),
                    BinOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                };
                return Ok(Value::Bool(result));
            }
            _ => {}
        }

        let res_canon = self.types.canonicalize(result_ty);
        if op == BinOp::Add {
            if let TypeData::Array { .. } = self.types.data(res_canon) {
                return self.eval_array_add(lv, rv, lhs, rhs, res_canon, span);
            }
        }
        if matches!(op, BinOp::Shl | BinOp::Shr) {
            return self.eval_shift(op, lv, rv, res_canon, span);
        }
        self.eval_numeric(op, lv, rv, res_canon, span)
    }

    /// `+` on arrays: concatenation, append, and prepend, decided by the
    /// operand types the same way the resolver typed them.
    fn eval_array_add(
        &mut self,
        lv: Value,
        rv: Value,
        lhs: ExprId,
        rhs: ExprId,
        result_ty: TypeId,
        span: Span,
    ) -> EResult<Value> {
        let lt = self.types.canonicalize(self.hir.expr(lhs).ty);
        let rt = self.types.canonicalize(self.hir.expr(rhs).ty);
        let TypeData::Array { elem, dims } = *self.types.data(result_ty) else {
            return Err(errors::ice(span, "array concatenation on non-array type"));
        };
        let elem_ty = if dims == 1 {
            elem
        } else {
            self.types
                .array_level(elem, dims - 1)
                .ok_or_else(|| errors::ice(span, "array element type not interned"))?
        };

        if lt == result_ty {
            if self.types.types_same(rt, result_ty) || self.types.can_convert(rt, result_ty) {
                // Concatenation.
                let left = self.convert_value(lv, lt, result_ty, span)?;
                let right = self.convert_value(rv, rt, result_ty, span)?;
                let (Value::Compound { mut elems, .. }, Value::Compound { elems: tail, .. }) =
                    (left, right)
                else {
                    return Err(errors::ice(span, "array concatenation on non-compound"));
                };
                elems.extend(tail);
                return Ok(Value::Compound { ty: result_ty, elems });
            }
            // Append one element on the right.
            let left = self.convert_value(lv, lt, result_ty, span)?;
            let Value::Compound { mut elems, .. } = left else {
                return Err(errors::ice(span, "array append on non-compound"));
            };
            elems.push(self.convert_value(rv, rt, elem_ty, span)?);
            return Ok(Value::Compound { ty: result_ty, elems });
        }

        let right = self.convert_value(rv, rt, result_ty, span)?;
        let Value::Compound { elems: tail, .. } = right else {
            return Err(errors::ice(span, "array prepend on non-compound"));
        };
        if self.types.can_convert(lt, result_ty) {
            // Literal concatenation on the left.
            let left = self.convert_value(lv, lt, result_ty, span)?;
            let Value::Compound { mut elems, .. } = left else {
                return Err(errors::ice(span, "array concatenation on non-compound"));
            };
            elems.extend(tail);
            return Ok(Value::Compound { ty: result_ty, elems });
        }
        // Prepend one element on the left.
        let mut elems = Vec::with_capacity(tail.len() + 1);
        elems.push(self.convert_value(lv, lt, elem_ty, span)?);
        elems.extend(tail);
        Ok(Value::Compound { ty: result_ty, elems })
    }

    fn eval_shift(
        &self,
        op: BinOp,
        lv: Value,
        rv: Value,
        result_ty: TypeId,
        span: Span,
    ) -> EResult<Value> {
        let (Value::Int(l), Value::Int(r)) = (&lv, &rv) else {
            return Err(errors::ice(span, "shift on non-integer"));
        };
        let count = r.value();
        if count < 0 {
            return Err(errors::negative_shift(span));
        }
        let Some((width, signed)) = self.types.int_info(result_ty) else {
            return Err(errors::ice(span, "shift result is not an integer"));
        };
        let bits = if count >= i128::from(width.bits()) {
            match op {
                BinOp::Shl => 0,
                // Arithmetic shift keeps the sign for signed operands.
                _ => {
                    if signed && l.as_i64() < 0 {
                        u64::MAX
                    } else {
                        0
                    }
                }
            }
        } else {
            let count = count as u32;
            match op {
                BinOp::Shl => l.bits() << count,
                _ => {
                    if signed {
                        (l.as_i64() >> count) as u64
                    } else {
                        l.bits() >> count
                    }
                }
            }
        };
        Ok(Value::Int(IntValue::new(bits, width, signed)))
    }

    fn eval_numeric(
        &self,
        op: BinOp,
        lv: Value,
        rv: Value,
        result_ty: TypeId,
        span: Span,
    ) -> EResult<Value> {
        match self.types.data(result_ty) {
            TypeData::Float32 | TypeData::Float64 => {
                let a = to_f64(&lv).ok_or_else(|| errors::ice(span, "non-number operand"))?;
                let b = to_f64(&rv).ok_or_else(|| errors::ice(span, "non-number operand"))?;
                let result = match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::Rem => a % b,
                    _ => return Err(errors::ice(span, "non-arithmetic float operator")),
                };
                Ok(if matches!(self.types.data(result_ty), TypeData::Float32) {
                    Value::Float(result as f32)
                } else {
                    Value::Double(result)
                })
            }
            TypeData::Int { width, signed } => {
                let a = to_i128(&lv).ok_or_else(|| errors::ice(span, "non-integer operand"))?;
                let b = to_i128(&rv).ok_or_else(|| errors::ice(span, "non-integer operand"))?;
                let result = match op {
                    BinOp::Add => a.wrapping_add(b),
                    BinOp::Sub => a.wrapping_sub(b),
                    BinOp::Mul => a.wrapping_mul(b),
                    BinOp::Div => {
                        if b == 0 {
                            return Err(errors::division_by_zero(span));
                        }
                        a.wrapping_div(b)
                    }
                    BinOp::Rem => {
                        if b == 0 {
                            return Err(errors::division_by_zero(span));
                        }
                        a.wrapping_rem(b)
                    }
                    BinOp::BitOr => a | b,
                    BinOp::BitAnd => a & b,
                    BinOp::BitXor => a ^ b,
                    _ => return Err(errors::ice(span, "non-arithmetic integer operator")),
                };
                // Binary arithmetic wraps modularly to the result width.
                Ok(Value::Int(IntValue::new(result as u64, *width, *signed)))
            }
            _ => Err(errors::ice(span, "arithmetic on non-numeric result type")),
        }
    }

    fn eval_call(&mut self, callee: ExprId, args: &[ExprId], span: Span) -> EResult<Value> {
        let hir = self.hir;
        match &hir.expr(callee).kind {
            ExprKind::Subr(SubrRef::Free(id)) => {
                let values = self.eval_args(args)?;
                self.call_subr(*id, values, None, span)
            }
            ExprKind::Subr(SubrRef::Extern(id)) => {
                let name = self.interner.lookup(hir.extern_subr(*id).name);
                Err(errors::extern_not_implemented(span, name))
            }
            ExprKind::Subr(SubrRef::Method { receiver, subr }) => {
                // An assignable receiver binds by place so the method can
                // mutate it; a temporary binds by value.
                let binding = if hir.assignable(*receiver) {
                    ThisBinding::Place(self.eval_place(*receiver)?)
                } else {
                    ThisBinding::Value(self.eval(*receiver)?)
                };
                let values = self.eval_args(args)?;
                self.call_subr(*subr, values, Some(binding), span)
            }
            _ => {
                // A callable-typed value: dispatch on what it holds.
                let value = self.eval(callee)?;
                let Value::Subr { subr, bound } = value else {
                    return Err(errors::ice(span, "call of non-subroutine value"));
                };
                match subr {
                    SubrVal::Free(id) => {
                        let values = self.eval_args(args)?;
                        let this = bound.map(|b| ThisBinding::Value(*b));
                        self.call_subr(id, values, this, span)
                    }
                    SubrVal::Extern(id) => {
                        let name = self.interner.lookup(hir.extern_subr(id).name);
                        Err(errors::extern_not_implemented(span, name))
                    }
                }
            }
        }
    }

    fn eval_args(&mut self, args: &[ExprId]) -> EResult<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for a in args {
            values.push(self.eval(*a)?);
        }
        Ok(values)
    }

    fn index_value(&self, base: Value, index: Value, span: Span) -> EResult<Value> {
        match base {
            Value::Compound { mut elems, .. } => {
                let idx = index_to_offset(&index, span)?;
                if idx >= elems.len() as u64 {
                    return Err(errors::index_out_of_bounds(span, idx, elems.len()));
                }
                Ok(elems.swap_remove(idx as usize))
            }
            Value::Map { ty, entries } => {
                for (k, v) in &entries {
                    if k.equals(&index) {
                        return Ok(v.clone());
                    }
                }
                // Reading a missing key produces the value type's default.
                let TypeData::Map { value, .. } = self.types.data(self.types.canonicalize(ty))
                else {
                    return Err(errors::ice(span, "map value without map type"));
                };
                default_value(self.types, *value).ok_or_else(|| {
                    errors::no_default_value(span, &self.types.display(*value, self.interner))
                })
            }
            _ => Err(errors::ice(span, "subscript of non-indexable value")),
        }
    }

    fn make_array(&self, sizes: &[u64], ty: TypeId, span: Span) -> EResult<Value> {
        let canon = self.types.canonicalize(ty);
        let TypeData::Array { elem, dims } = *self.types.data(canon) else {
            return Err(errors::ice(span, "array allocation of non-array type"));
        };
        let child_ty = if dims == 1 {
            elem
        } else {
            self.types
                .array_level(elem, dims - 1)
                .ok_or_else(|| errors::ice(span, "array element type not interned"))?
        };
        let len = sizes[0];
        let mut elems = Vec::with_capacity(len as usize);
        for _ in 0..len {
            let value = if sizes.len() == 1 {
                default_value(self.types, child_ty).ok_or_else(|| {
                    errors::no_default_value(span, &self.types.display(child_ty, self.interner))
                })?
            } else {
                self.make_array(&sizes[1..], child_ty, span)?
            };
            elems.push(value);
        }
        Ok(Value::Compound { ty: canon, elems })
    }

    // ----- Conversions -----

    /// Convert a value between types, mirroring the conversion predicate:
    /// union injection and projection, numeric coercion with overflow
    /// checks, enum membership, and element-wise compound conversion.
    fn convert_value(&self, v: Value, from: TypeId, to: TypeId, span: Span) -> EResult<Value> {
        let from_c = self.types.canonicalize(from);
        let to_c = self.types.canonicalize(to);
        if from_c == to_c {
            return Ok(v);
        }

        // Injection into a union target.
        if let TypeData::Union(options) = self.types.data(to_c) {
            let options = options.clone();
            let Some(idx) = self.types.union_option_for(from_c, to_c) else {
                return Err(errors::ice(span, "no union option accepts the value"));
            };
            let opt_ty = options[idx as usize];
            let inner = if self.types.types_same(from_c, opt_ty) {
                v
            } else {
                self.convert_value(v, from_c, opt_ty, span)?
            };
            return Ok(Value::Union { ty: to_c, option: idx, value: Box::new(inner) });
        }

        // Projection out of a union source.
        if let TypeData::Union(options) = self.types.data(from_c) {
            let options = options.clone();
            let Value::Union { option, value, .. } = v else {
                return Err(errors::ice(span, "union-typed value is not a union"));
            };
            let opt_ty = options[option as usize];
            return self.convert_value(*value, opt_ty, to_c, span);
        }

        match self.types.data(to_c) {
            TypeData::Int { width, signed } => match &v {
                Value::Int(_) | Value::Char(_) => {
                    let value = match &v {
                        Value::Int(i) => i.value(),
                        Value::Char(c) => i128::from(*c),
                        _ => unreachable!(),
                    };
                    // Narrowing overflow is checked at value conversion.
                    if !fits_value(value, *width, *signed) {
                        return Err(errors::int_conversion_overflow(
                            span,
                            &self.types.display(to_c, self.interner),
                        ));
                    }
                    Ok(Value::Int(IntValue::new(value as i64 as u64, *width, *signed)))
                }
                // Float sources truncate toward zero, saturating.
                Value::Float(f) => Ok(Value::Int(IntValue::new(
                    (f64::from(*f) as i64) as u64,
                    *width,
                    *signed,
                ))),
                Value::Double(d) => {
                    Ok(Value::Int(IntValue::new((*d as i64) as u64, *width, *signed)))
                }
                _ => Err(errors::ice(span, "integer conversion from non-number")),
            },
            TypeData::Char => {
                let value = match &v {
                    Value::Int(i) => i.value(),
                    Value::Char(c) => i128::from(*c),
                    Value::Float(f) => f64::from(*f) as i128,
                    Value::Double(d) => *d as i128,
                    _ => return Err(errors::ice(span, "char conversion from non-number")),
                };
                if !(0..=255).contains(&value) {
                    return Err(errors::int_conversion_overflow(span, "char"));
                }
                Ok(Value::Char(value as u8))
            }
            TypeData::Float32 => {
                let value = to_f64(&v)
                    .ok_or_else(|| errors::ice(span, "float conversion from non-number"))?;
                Ok(Value::Float(value as f32))
            }
            TypeData::Float64 => {
                let value = to_f64(&v)
                    .ok_or_else(|| errors::ice(span, "float conversion from non-number"))?;
                Ok(Value::Double(value))
            }
            TypeData::Enum(eid) => {
                let value = match &v {
                    Value::Int(i) => i.value(),
                    Value::Char(c) => i128::from(*c),
                    _ => return Err(errors::ice(span, "enum conversion from non-integer")),
                };
                let def = self.types.enum_def(*eid);
                match def.items.iter().find(|i| i.value() == value) {
                    Some(item) => Ok(Value::Int(IntValue::new(
                        item.bits,
                        IntWidth::W64,
                        item.signed,
                    ))),
                    None => Err(errors::not_an_enum_value(
                        span,
                        value,
                        self.interner.lookup(def.name),
                    )),
                }
            }
            TypeData::Struct(sid) => {
                let fields = self.types.struct_def(*sid).fields.clone();
                if let TypeData::Tuple(from_members) = self.types.data(from_c) {
                    let from_members = from_members.clone();
                    let Value::Compound { elems, .. } = v else {
                        return Err(errors::ice(span, "struct conversion from non-compound"));
                    };
                    let mut converted = Vec::with_capacity(elems.len());
                    for ((elem, from_ty), field) in
                        elems.into_iter().zip(from_members.iter()).zip(fields.iter())
                    {
                        converted.push(self.convert_value(elem, *from_ty, field.ty, span)?);
                    }
                    return Ok(Value::Compound { ty: to_c, elems: converted });
                }
                // Single-member struct is equivalent to its member.
                let field_ty = fields
                    .first()
                    .map(|f| f.ty)
                    .ok_or_else(|| errors::ice(span, "conversion to empty struct"))?;
                let inner = self.convert_value(v, from_c, field_ty, span)?;
                Ok(Value::Compound { ty: to_c, elems: vec![inner] })
            }
            TypeData::Tuple(to_members) => {
                let to_members = to_members.clone();
                let TypeData::Tuple(from_members) = self.types.data(from_c) else {
                    return Err(errors::ice(span, "tuple conversion from non-tuple"));
                };
                let from_members = from_members.clone();
                let Value::Compound { elems, .. } = v else {
                    return Err(errors::ice(span, "tuple conversion from non-compound"));
                };
                let mut converted = Vec::with_capacity(elems.len());
                for ((elem, from_ty), to_ty) in
                    elems.into_iter().zip(from_members.iter()).zip(to_members.iter())
                {
                    converted.push(self.convert_value(elem, *from_ty, *to_ty, span)?);
                }
                Ok(Value::Compound { ty: to_c, elems: converted })
            }
            TypeData::Array { elem, dims } => {
                let (elem, dims) = (*elem, *dims);
                let to_elem = if dims == 1 {
                    elem
                } else {
                    self.types
                        .array_level(elem, dims - 1)
                        .ok_or_else(|| errors::ice(span, "array element type not interned"))?
                };
                let from_elem_tys: ElemTypes = match self.types.data(from_c) {
                    TypeData::Tuple(ms) => ElemTypes::PerMember(ms.clone()),
                    TypeData::Array { elem: fe, dims: fd } => {
                        let fe = *fe;
                        let fd = *fd;
                        let from_elem = if fd == 1 {
                            fe
                        } else {
                            self.types.array_level(fe, fd - 1).ok_or_else(|| {
                                errors::ice(span, "array element type not interned")
                            })?
                        };
                        ElemTypes::Uniform(from_elem)
                    }
                    _ => return Err(errors::ice(span, "array conversion from non-array")),
                };
                let Value::Compound { elems, .. } = v else {
                    return Err(errors::ice(span, "array conversion from non-compound"));
                };
                let mut converted = Vec::with_capacity(elems.len());
                for (i, elem_value) in elems.into_iter().enumerate() {
                    let from_ty = from_elem_tys.get(i);
                    converted.push(self.convert_value(elem_value, from_ty, to_elem, span)?);
                }
                Ok(Value::Compound { ty: to_c, elems: converted })
            }
            TypeData::Map { key, value } => {
                let (key_ty, value_ty) = (*key, *value);
                let TypeData::Tuple(pair_tys) = self.types.data(from_c) else {
                    return Err(errors::ice(span, "map conversion from non-tuple"));
                };
                let pair_tys = pair_tys.clone();
                let Value::Compound { elems, .. } = v else {
                    return Err(errors::ice(span, "map conversion from non-compound"));
                };
                let mut entries: Vec<(Value, Value)> = Vec::with_capacity(elems.len());
                for (pair, pair_ty) in elems.into_iter().zip(pair_tys.iter()) {
                    let TypeData::Tuple(kv_tys) = self.types.data(self.types.canonicalize(*pair_ty))
                    else {
                        return Err(errors::ice(span, "map entry is not a pair"));
                    };
                    let kv_tys = kv_tys.clone();
                    let Value::Compound { elems: mut kv, .. } = pair else {
                        return Err(errors::ice(span, "map entry is not a pair"));
                    };
                    if kv.len() != 2 {
                        return Err(errors::ice(span, "map entry is not a pair"));
                    }
                    let value_part = kv.pop().unwrap_or(Value::Void);
                    let key_part = kv.pop().unwrap_or(Value::Void);
                    let k = self.convert_value(key_part, kv_tys[0], key_ty, span)?;
                    let val = self.convert_value(value_part, kv_tys[1], value_ty, span)?;
                    match entries.iter_mut().find(|(ek, _)| ek.equals(&k)) {
                        Some(entry) => entry.1 = val,
                        None => entries.push((k, val)),
                    }
                }
                Ok(Value::Map { ty: to_c, entries })
            }
            TypeData::Callable { .. } => Ok(v),
            TypeData::Bool | TypeData::Void | TypeData::ErrorType => {
                Err(errors::ice(span, "conversion to a type with no conversions"))
            }
            TypeData::Alias(_) => unreachable!("canonicalize strips aliases"),
            TypeData::Union(_) => unreachable!("union targets are handled above"),
        }
    }

    // ----- Lvalues -----

    /// Resolve an assignable expression to a stable place.
    fn eval_place(&mut self, e: ExprId) -> EResult<Place> {
        let hir = self.hir;
        let expr = hir.expr(e);
        let span = expr.span;
        match &expr.kind {
            ExprKind::Var(v) => {
                let root = if hir.var(*v).is_global {
                    PlaceRoot::Global(*v)
                } else {
                    PlaceRoot::Local { frame: self.frames.len() - 1, var: *v }
                };
                Ok(Place::new(root))
            }
            ExprKind::Member { base, index } => {
                let mut place = self.eval_place(*base)?;
                place.steps.push(PlaceStep::Member(*index as usize));
                Ok(place)
            }
            ExprKind::Index { base, index } => {
                let mut place = self.eval_place(*base)?;
                let index_value = self.eval(*index)?;
                let base_ty = self.types.canonicalize(hir.expr(*base).ty);
                if let TypeData::Map { .. } = self.types.data(base_ty) {
                    place.steps.push(PlaceStep::Key(index_value));
                } else {
                    let offset = index_to_offset(&index_value, span)?;
                    place.steps.push(PlaceStep::Index(offset as usize));
                }
                Ok(place)
            }
            ExprKind::This => {
                let binding = self
                    .top_frame()
                    .this
                    .clone()
                    .ok_or_else(|| errors::ice(span, "this outside of a method frame"))?;
                match binding {
                    // Forward to the receiver's own storage.
                    ThisBinding::Place(place) => Ok(place),
                    // The receiver was a temporary held in the frame.
                    ThisBinding::Value(_) => {
                        Ok(Place::new(PlaceRoot::FrameThis { frame: self.frames.len() - 1 }))
                    }
                }
            }
            ExprKind::Converted { value } => self.eval_place(*value),
            _ => Err(errors::ice(span, "expression is not an lvalue")),
        }
    }

    /// Walk a place to its storage slot, bounds-checking array steps and
    /// inserting map defaults for missing keys.
    fn place_mut(&mut self, place: &Place, span: Span) -> EResult<&mut Value> {
        let types = self.types;
        let interner = self.interner;
        let mut slot: &mut Value = match &place.root {
            PlaceRoot::Local { frame, var } => self.frames[*frame]
                .locals
                .entry(*var)
                .or_insert(Value::Void),
            PlaceRoot::Global(var) => self.globals.entry(*var).or_insert(Value::Void),
            PlaceRoot::FrameThis { frame } => match &mut self.frames[*frame].this {
                Some(ThisBinding::Value(v)) => v,
                _ => return Err(errors::ice(span, "frame has no by-value this")),
            },
        };
        for step in &place.steps {
            slot = match step {
                PlaceStep::Member(i) => match slot {
                    Value::Compound { elems, .. } => elems
                        .get_mut(*i)
                        .ok_or_else(|| errors::ice(span, "member index out of range"))?,
                    _ => return Err(errors::ice(span, "member step into non-compound")),
                },
                PlaceStep::Index(i) => match slot {
                    Value::Compound { elems, .. } => {
                        let len = elems.len();
                        elems
                            .get_mut(*i)
                            .ok_or_else(|| errors::index_out_of_bounds(span, *i as u64, len))?
                    }
                    _ => return Err(errors::ice(span, "index step into non-compound")),
                },
                PlaceStep::Key(key) => match slot {
                    Value::Map { ty, entries } => {
                        let pos = entries.iter().position(|(k, _)| k.equals(key));
                        let pos = match pos {
                            Some(pos) => pos,
                            None => {
                                let TypeData::Map { value, .. } =
                                    types.data(types.canonicalize(*ty))
                                else {
                                    return Err(errors::ice(span, "map value without map type"));
                                };
                                let default =
                                    default_value(types, *value).ok_or_else(|| {
                                        errors::no_default_value(
                                            span,
                                            &types.display(*value, interner),
                                        )
                                    })?;
                                entries.push((key.clone(), default));
                                entries.len() - 1
                            }
                        };
                        &mut entries[pos].1
                    }
                    _ => return Err(errors::ice(span, "key step into non-map")),
                },
            };
        }
        Ok(slot)
    }

    // ----- Storage helpers -----

    fn top_frame(&self) -> &Frame {
        self.frames.last().expect("frame stack is never empty")
    }

    fn set_local(&mut self, var: VarId, value: Value) {
        self.frames
            .last_mut()
            .expect("frame stack is never empty")
            .locals
            .insert(var, value);
    }

    fn read_var(&mut self, v: VarId, span: Span) -> EResult<Value> {
        if self.hir.var(v).is_global {
            self.globals
                .get(&v)
                .cloned()
                .ok_or_else(|| errors::ice(span, "read of uninitialized global"))
        } else {
            self.top_frame()
                .locals
                .get(&v)
                .cloned()
                .ok_or_else(|| errors::ice(span, "read of unassigned local"))
        }
    }
}

/// A fresh `long` value, the type of loop counters and lengths.
fn long_value(v: i64) -> Value {
    Value::Int(IntValue::new(v as u64, IntWidth::W64, true))
}

fn to_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(i.value() as f64),
        Value::Float(f) => Some(f64::from(*f)),
        Value::Double(d) => Some(*d),
        Value::Char(c) => Some(f64::from(*c)),
        _ => None,
    }
}

fn to_i128(v: &Value) -> Option<i128> {
    match v {
        Value::Int(i) => Some(i.value()),
        Value::Char(c) => Some(i128::from(*c)),
        _ => None,
    }
}

/// Validate an index value: signed negatives are an error; the result is
/// the unsigned offset.
fn index_to_offset(index: &Value, span: Span) -> EResult<u64> {
    match index {
        Value::Int(i) => {
            if i.value() < 0 {
                Err(errors::negative_index(span))
            } else {
                Ok(i.value() as u64)
            }
        }
        _ => Err(errors::ice(span, "index is not an integer")),
    }
}

/// Whether a numeric value is representable in an integer type.
fn fits_value(value: i128, width: IntWidth, signed: bool) -> bool {
    let w = i128::from(width.bits());
    if signed {
        let max = (1i128 << (w - 1)) - 1;
        let min = -(1i128 << (w - 1));
        value >= min && value <= max
    } else {
        value >= 0 && value < (1i128 << w)
    }
}

enum ElemTypes {
    Uniform(TypeId),
    PerMember(Box<[TypeId]>),
}

impl ElemTypes {
    fn get(&self, i: usize) -> TypeId {
        match self {
            ElemTypes::Uniform(t) => *t,
            ElemTypes::PerMember(ts) => ts.get(i).copied().unwrap_or(TypeId::ERROR),
        }
    }
}
