//! Two-phase resolver: surface AST → typed HIR.
//!
//! Pass one walks declarations, building the scope tree and all nominal
//! types while queueing subroutine bodies; parsed type references are
//! *pending* until the whole module tree exists, then a flush pass
//! resolves them (aliases first, in dependency order). Pass two resolves
//! global initializers and the queued bodies, inserting implicit
//! conversions and desugarings, and finally checks the `main` contract.

mod expr;
mod scope;
mod stmt;
mod types;

pub use scope::{Scope, ScopeKind, ScopeName, ScopeTree};

use opal_diagnostic::Diagnostic;
use opal_ir::ast::{self, Decl, DeclKind};
use opal_ir::hir::{ExternSubroutine, Hir, Subroutine, Variable};
use opal_ir::{
    AliasId, ExternId, Name, ScopeId, Span, StringInterner, StructId, SubrId, TypeId, VarId,
};
use opal_types::{AliasDef, EnumDef, EnumItem, StructDef, StructField, TypeData, TypePool};
use rustc_hash::FxHashMap;
use tracing::debug;

type RResult<T> = Result<T, Diagnostic>;

/// The fully resolved program: every later phase reads these, none
/// mutates them.
#[derive(Debug)]
pub struct ResolvedProgram {
    pub hir: Hir,
    pub types: TypePool,
    pub scopes: ScopeTree,
}

/// Resolve a parsed program.
pub fn resolve(decls: &[Decl], interner: &StringInterner) -> RResult<ResolvedProgram> {
    let mut resolver = Resolver::new(interner);
    debug!("resolve: declaration walk");
    resolver.declare_all(ScopeId::ROOT, decls, None)?;
    debug!("resolve: flushing pending types");
    resolver.flush_types()?;
    debug!("resolve: global initializers");
    resolver.resolve_global_inits()?;
    debug!(bodies = resolver.queued_bodies.len(), "resolve: bodies");
    resolver.resolve_bodies()?;
    resolver.check_main()?;
    Ok(ResolvedProgram {
        hir: resolver.hir,
        types: resolver.types,
        scopes: resolver.scopes,
    })
}

#[derive(Copy, Clone, PartialEq)]
enum AliasState {
    Unresolved,
    InProgress,
    Done,
}

struct PendingSubr<'a> {
    subr: SubrId,
    decl: &'a ast::SubrDecl,
    /// The scope *of* the subroutine.
    scope: ScopeId,
    receiver: Option<TypeId>,
}

pub(crate) struct Resolver<'a> {
    pub(crate) interner: &'a StringInterner,
    pub(crate) hir: Hir,
    pub(crate) types: TypePool,
    pub(crate) scopes: ScopeTree,
    pending_aliases: FxHashMap<AliasId, (&'a ast::ParsedType, ScopeId)>,
    pending_fields: Vec<(StructId, usize, &'a ast::ParsedType, ScopeId)>,
    pending_vars: Vec<(VarId, &'a ast::ParsedType, ScopeId)>,
    pending_subrs: Vec<PendingSubr<'a>>,
    pending_externs: Vec<(ExternId, &'a ast::SubrDecl, ScopeId)>,
    global_inits: Vec<(VarId, Option<&'a ast::Expr>, ScopeId)>,
    queued_bodies: Vec<(SubrId, &'a [ast::Stmt])>,
}

/// Context threaded through body resolution.
#[derive(Copy, Clone)]
pub(crate) struct BodyCx {
    pub subr: Option<SubrId>,
    pub pure: bool,
    pub receiver: Option<TypeId>,
    pub in_loop: bool,
    pub in_breakable: bool,
}

impl BodyCx {
    fn global_init() -> Self {
        BodyCx {
            subr: None,
            // Global initializers run before main; treat them as pure
            // context so they cannot call procedures.
            pure: true,
            receiver: None,
            in_loop: false,
            in_breakable: false,
        }
    }
}

impl<'a> Resolver<'a> {
    fn new(interner: &'a StringInterner) -> Self {
        Resolver {
            interner,
            hir: Hir::new(),
            types: TypePool::new(),
            scopes: ScopeTree::new(),
            pending_aliases: FxHashMap::default(),
            pending_fields: Vec::new(),
            pending_vars: Vec::new(),
            pending_subrs: Vec::new(),
            pending_externs: Vec::new(),
            global_inits: Vec::new(),
            queued_bodies: Vec::new(),
        }
    }

    pub(crate) fn name_str(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    pub(crate) fn type_str(&self, ty: TypeId) -> String {
        self.types.display(ty, self.interner)
    }

    // ----- Pass one: declarations -----

    fn declare_all(
        &mut self,
        scope: ScopeId,
        decls: &'a [Decl],
        in_struct: Option<(StructId, TypeId)>,
    ) -> RResult<()> {
        for decl in decls {
            self.declare(scope, decl, in_struct)?;
        }
        Ok(())
    }

    fn declare(
        &mut self,
        scope: ScopeId,
        decl: &'a Decl,
        in_struct: Option<(StructId, TypeId)>,
    ) -> RResult<()> {
        match &decl.kind {
            DeclKind::Module { name, decls } => {
                let mscope = self.scopes.new_scope(ScopeKind::Module(*name), scope);
                self.scopes.insert(
                    scope,
                    *name,
                    ScopeName::Module(mscope),
                    decl.span,
                    self.interner,
                )?;
                self.declare_all(mscope, decls, None)
            }
            DeclKind::Struct { name, decls } => {
                let (sid, ty) = self.types.add_struct(StructDef {
                    name: *name,
                    scope: ScopeId::ROOT, // fixed up below
                    fields: Vec::new(),
                    span: decl.span,
                });
                let sscope = self.scopes.new_scope(ScopeKind::Struct(*name, sid), scope);
                self.types.struct_def_mut(sid).scope = sscope;
                self.scopes.insert(
                    scope,
                    *name,
                    ScopeName::Struct(ty),
                    decl.span,
                    self.interner,
                )?;
                self.declare_all(sscope, decls, Some((sid, ty)))
            }
            DeclKind::Enum { name, items } => {
                let def = self.build_enum(*name, items, scope, decl.span)?;
                let (_, ty) = self.types.add_enum(def);
                self.scopes
                    .insert(scope, *name, ScopeName::Enum(ty), decl.span, self.interner)
            }
            DeclKind::Typedef { ty, name } => {
                let (aid, alias_ty) = self.types.add_alias(AliasDef {
                    name: *name,
                    scope,
                    target: TypeId::ERROR,
                    span: decl.span,
                });
                self.pending_aliases.insert(aid, (ty, scope));
                self.scopes.insert(
                    scope,
                    *name,
                    ScopeName::Typedef(alias_ty),
                    decl.span,
                    self.interner,
                )
            }
            DeclKind::Subroutine(subr) => self.declare_subroutine(scope, subr, in_struct),
            DeclKind::ExternSubroutine(subr) => {
                let ext = self.hir.alloc_extern(ExternSubroutine {
                    name: subr.name,
                    ty: TypeId::ERROR,
                    ret: TypeId::VOID,
                    pure: subr.pure,
                    span: subr.span,
                });
                self.scopes.insert(
                    scope,
                    subr.name,
                    ScopeName::Extern(ext),
                    subr.span,
                    self.interner,
                )?;
                self.pending_externs.push((ext, subr, scope));
                Ok(())
            }
            DeclKind::Var { ty, name, init, is_static } => {
                self.declare_var(scope, decl, ty, *name, init.as_ref(), *is_static, in_struct)
            }
        }
    }

    fn declare_subroutine(
        &mut self,
        scope: ScopeId,
        subr: &'a ast::SubrDecl,
        in_struct: Option<(StructId, TypeId)>,
    ) -> RResult<()> {
        // A struct data member with the same name would silently shadow
        // the subroutine at member-access time.
        if let Some((sid, _)) = in_struct {
            if self
                .types
                .struct_def(sid)
                .fields
                .iter()
                .any(|f| f.name == subr.name)
            {
                return Err(Diagnostic::error(
                    subr.span,
                    format!(
                        "subroutine {} causes scope name conflict",
                        self.name_str(subr.name)
                    ),
                ));
            }
        }
        let id = self.hir.alloc_subr(Subroutine {
            name: subr.name,
            ty: TypeId::ERROR,
            scope: ScopeId::ROOT, // fixed up below
            params: Vec::new(),
            ret: TypeId::VOID,
            pure: subr.pure,
            receiver: in_struct.map(|(_, ty)| ty),
            body: None,
            span: subr.span,
        });
        let sscope = self
            .scopes
            .new_scope(ScopeKind::Subroutine(subr.name, id), scope);
        self.hir.subrs[id.index()].scope = sscope;
        self.scopes.insert(
            scope,
            subr.name,
            ScopeName::Subroutine(id),
            subr.span,
            self.interner,
        )?;

        for param in &subr.params {
            let var = self.hir.alloc_var(Variable {
                name: param.name,
                ty: TypeId::ERROR,
                scope: sscope,
                init: None,
                is_param: true,
                is_global: false,
                span: param.span,
            });
            self.scopes.insert(
                sscope,
                param.name,
                ScopeName::Variable(var),
                param.span,
                self.interner,
            )?;
            self.pending_vars.push((var, &param.ty, sscope));
            self.hir.subrs[id.index()].params.push(var);
        }

        self.pending_subrs.push(PendingSubr {
            subr: id,
            decl: subr,
            scope: sscope,
            receiver: in_struct.map(|(_, ty)| ty),
        });
        if let Some(body) = &subr.body {
            self.queued_bodies.push((id, body));
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn declare_var(
        &mut self,
        scope: ScopeId,
        decl: &'a Decl,
        ty: &'a ast::ParsedType,
        name: Name,
        init: Option<&'a ast::Expr>,
        is_static: bool,
        in_struct: Option<(StructId, TypeId)>,
    ) -> RResult<()> {
        if is_static && in_struct.is_none() {
            return Err(Diagnostic::error(
                decl.span,
                format!(
                    "variable {} declared static but not in struct",
                    self.name_str(name)
                ),
            ));
        }
        if let (Some((sid, _)), false) = (in_struct, is_static) {
            // A non-static struct variable is a data member of the struct
            // type, not an entry in the scope's name table.
            if init.is_some() {
                return Err(Diagnostic::error(
                    decl.span,
                    format!(
                        "struct member {} cannot have an initializer",
                        self.name_str(name)
                    ),
                ));
            }
            let def = self.types.struct_def(sid);
            if def.fields.iter().any(|f| f.name == name) {
                return Err(Diagnostic::error(
                    decl.span,
                    format!("variable {} causes scope name conflict", self.name_str(name)),
                ));
            }
            if self.scopes.lookup(def.scope, name).is_some() {
                return Err(Diagnostic::error(
                    decl.span,
                    format!("variable {} causes scope name conflict", self.name_str(name)),
                ));
            }
            let index = def.fields.len();
            let field_scope = def.scope;
            self.types.struct_def_mut(sid).fields.push(StructField {
                name,
                ty: TypeId::ERROR,
                composed: false,
                span: decl.span,
            });
            self.pending_fields.push((sid, index, ty, field_scope));
            return Ok(());
        }

        // Module-level or static: global storage.
        let var = self.hir.alloc_var(Variable {
            name,
            ty: TypeId::ERROR,
            scope,
            init: None,
            is_param: false,
            is_global: true,
            span: decl.span,
        });
        self.scopes
            .insert(scope, name, ScopeName::Variable(var), decl.span, self.interner)?;
        self.pending_vars.push((var, ty, scope));
        self.global_inits.push((var, init, scope));
        self.hir.globals.push(var);
        Ok(())
    }

    fn build_enum(
        &mut self,
        name: Name,
        items: &[ast::EnumItemDecl],
        scope: ScopeId,
        span: Span,
    ) -> RResult<EnumDef> {
        let mut out = Vec::with_capacity(items.len());
        let mut next: i128 = 0;
        for item in items {
            if out.iter().any(|i: &EnumItem| i.name == item.name) {
                return Err(Diagnostic::error(
                    item.span,
                    format!("enum value {} causes scope name conflict", self.name_str(item.name)),
                ));
            }
            let value: i128 = match item.value {
                Some((neg, magnitude)) => {
                    let v = i128::from(magnitude);
                    if neg {
                        if v > (1i128 << 63) {
                            return Err(Diagnostic::error(
                                item.span,
                                "enum value does not fit in a signed 64-bit integer".to_string(),
                            ));
                        }
                        -v
                    } else {
                        v
                    }
                }
                None => next,
            };
            next = value + 1;
            let signed = value < 0;
            let bits = if signed {
                (value as i64) as u64
            } else {
                value as u64
            };
            out.push(EnumItem { name: item.name, bits, signed });
        }
        Ok(EnumDef { name, scope, items: out, span })
    }

    // ----- Pending-type flush -----

    fn flush_types(&mut self) -> RResult<()> {
        self.flush_aliases()?;

        let fields = std::mem::take(&mut self.pending_fields);
        for (sid, index, pt, scope) in fields {
            let ty = self.resolve_type(pt, scope)?;
            if self.types.canonicalize(ty) == TypeId::VOID {
                return Err(Diagnostic::error(
                    pt.span,
                    "struct member cannot have void type".to_string(),
                ));
            }
            self.types.struct_def_mut(sid).fields[index].ty = ty;
        }

        let vars = std::mem::take(&mut self.pending_vars);
        for (var, pt, scope) in vars {
            let ty = self.resolve_type(pt, scope)?;
            if self.types.canonicalize(ty) == TypeId::VOID {
                return Err(Diagnostic::error(
                    pt.span,
                    "variable cannot have void type".to_string(),
                ));
            }
            self.hir.vars[var.index()].ty = ty;
        }

        let subrs = std::mem::take(&mut self.pending_subrs);
        for pending in subrs {
            let ret = match &pending.decl.ret {
                Some(pt) => self.resolve_type(pt, pending.scope)?,
                None => TypeId::VOID,
            };
            let params: Vec<TypeId> = self.hir.subrs[pending.subr.index()]
                .params
                .iter()
                .map(|p| self.hir.var(*p).ty)
                .collect();
            let ty = self.types.callable_type(
                pending.decl.pure,
                pending.receiver,
                params,
                ret,
            );
            let subr = &mut self.hir.subrs[pending.subr.index()];
            subr.ret = ret;
            subr.ty = ty;
        }

        let externs = std::mem::take(&mut self.pending_externs);
        for (ext, decl, scope) in externs {
            let ret = match &decl.ret {
                Some(pt) => self.resolve_type(pt, scope)?,
                None => TypeId::VOID,
            };
            let mut params = Vec::with_capacity(decl.params.len());
            for p in &decl.params {
                params.push(self.resolve_type(&p.ty, scope)?);
            }
            let ty = self.types.callable_type(decl.pure, None, params, ret);
            let record = &mut self.hir.externs[ext.index()];
            record.ret = ret;
            record.ty = ty;
        }
        Ok(())
    }

    /// Resolve alias targets in dependency order so canonicalization
    /// never reads an unfilled target; cycles are reported at the
    /// offending typedef.
    fn flush_aliases(&mut self) -> RResult<()> {
        let pending = std::mem::take(&mut self.pending_aliases);
        let mut states: FxHashMap<AliasId, AliasState> = pending
            .keys()
            .map(|k| (*k, AliasState::Unresolved))
            .collect();
        let ids: Vec<AliasId> = pending.keys().copied().collect();
        for aid in ids {
            self.flush_alias(aid, &pending, &mut states)?;
        }
        Ok(())
    }

    fn flush_alias(
        &mut self,
        aid: AliasId,
        pending: &FxHashMap<AliasId, (&'a ast::ParsedType, ScopeId)>,
        states: &mut FxHashMap<AliasId, AliasState>,
    ) -> RResult<()> {
        match states.get(&aid).copied() {
            None | Some(AliasState::Done) => return Ok(()),
            Some(AliasState::InProgress) => {
                let def = self.types.alias_def(aid);
                return Err(Diagnostic::error(
                    def.span,
                    format!("typedef {} is circular", self.interner.lookup(def.name)),
                ));
            }
            Some(AliasState::Unresolved) => {}
        }
        states.insert(aid, AliasState::InProgress);
        let (pt, scope) = pending[&aid];
        self.prepare_aliases_in(pt, scope, pending, states)?;
        let target = self.resolve_type(pt, scope)?;
        self.types.alias_def_mut(aid).target = target;
        states.insert(aid, AliasState::Done);
        Ok(())
    }

    /// Pre-resolve every alias a parsed type mentions, so resolving the
    /// type itself only ever canonicalizes filled aliases.
    fn prepare_aliases_in(
        &mut self,
        pt: &'a ast::ParsedType,
        scope: ScopeId,
        pending: &FxHashMap<AliasId, (&'a ast::ParsedType, ScopeId)>,
        states: &mut FxHashMap<AliasId, AliasState>,
    ) -> RResult<()> {
        use ast::ParsedTypeKind as K;
        match &pt.kind {
            K::Prim(_) => Ok(()),
            K::Named(path) => {
                if let Some((ScopeName::Typedef(ty), consumed)) =
                    self.scopes.find_name(&self.types, scope, &path.parts)
                {
                    if consumed == path.parts.len() {
                        if let TypeData::Alias(target) = self.types.data(ty) {
                            let target = *target;
                            return self.flush_alias(target, pending, states);
                        }
                    }
                }
                Ok(())
            }
            K::Array(inner) => self.prepare_aliases_in(inner, scope, pending, states),
            K::Tuple(members) | K::Union(members) => {
                for m in members {
                    self.prepare_aliases_in(m, scope, pending, states)?;
                }
                Ok(())
            }
            K::Map(k, v) => {
                self.prepare_aliases_in(k, scope, pending, states)?;
                self.prepare_aliases_in(v, scope, pending, states)
            }
            K::Callable { ret, params, .. } => {
                if let Some(r) = ret {
                    self.prepare_aliases_in(r, scope, pending, states)?;
                }
                for p in params {
                    self.prepare_aliases_in(p, scope, pending, states)?;
                }
                Ok(())
            }
        }
    }

    fn check_main(&mut self) -> RResult<()> {
        let main_name = self.interner.intern("main");
        let Some(ScopeName::Subroutine(id)) = self.scopes.lookup(ScopeId::ROOT, main_name) else {
            return Err(Diagnostic::error(
                Span::DUMMY,
                "program contains no main procedure".to_string(),
            ));
        };
        let subr = self.hir.subr(id);
        let span = subr.span;
        if subr.pure {
            return Err(Diagnostic::error(span, "main() must be a procedure".to_string()));
        }
        let ret = self.types.canonicalize(subr.ret);
        if ret != TypeId::VOID && ret != TypeId::INT {
            return Err(Diagnostic::error(
                span,
                "proc main must return void or int".to_string(),
            ));
        }
        let params: Vec<TypeId> = subr.params.iter().map(|p| self.hir.var(*p).ty).collect();
        let string_array = self.types.array_type(TypeId::CHAR, 2);
        let ok = params.is_empty()
            || (params.len() == 1 && self.types.types_same(params[0], string_array));
        if !ok {
            return Err(Diagnostic::error(
                span,
                "proc main must take no arguments or only an array of strings".to_string(),
            ));
        }
        self.hir.main = Some(id);
        Ok(())
    }
}
