//! Parsed type references → `TypeId`.

use crate::{RResult, Resolver, ScopeName};
use opal_diagnostic::Diagnostic;
use opal_ir::ast::{self, PrimName};
use opal_ir::{ScopeId, TypeId};

impl<'a> Resolver<'a> {
    pub(crate) fn resolve_type(
        &mut self,
        pt: &ast::ParsedType,
        scope: ScopeId,
    ) -> RResult<TypeId> {
        use ast::ParsedTypeKind as K;
        match &pt.kind {
            K::Prim(p) => Ok(prim_type_id(*p)),
            K::Named(path) => {
                match self.scopes.find_name(&self.types, scope, &path.parts) {
                    Some((entry, consumed)) if consumed == path.parts.len() => match entry {
                        ScopeName::Struct(ty)
                        | ScopeName::Enum(ty)
                        | ScopeName::Typedef(ty) => Ok(ty),
                        other => Err(Diagnostic::error(
                            path.span,
                            format!("{} {} is not a type", other.category(), self.path_str(path)),
                        )),
                    },
                    _ => Err(Diagnostic::error(
                        path.span,
                        format!("unknown type {}", self.path_str(path)),
                    )),
                }
            }
            K::Array(inner) => {
                let elem = self.resolve_type(inner, scope)?;
                if self.types.canonicalize(elem) == TypeId::VOID {
                    return Err(Diagnostic::error(
                        pt.span,
                        "array element type cannot be void".to_string(),
                    ));
                }
                Ok(self.types.array_type(elem, 1))
            }
            K::Tuple(members) => {
                let mut tys = Vec::with_capacity(members.len());
                for m in members {
                    tys.push(self.resolve_type(m, scope)?);
                }
                Ok(self.types.tuple_type(tys))
            }
            K::Union(options) => {
                let mut tys = Vec::with_capacity(options.len());
                for o in options {
                    tys.push(self.resolve_type(o, scope)?);
                }
                Ok(self.types.union_type(tys))
            }
            K::Map(key, value) => {
                let k = self.resolve_type(key, scope)?;
                let v = self.resolve_type(value, scope)?;
                Ok(self.types.map_type(k, v))
            }
            K::Callable { pure, ret, params } => {
                let ret = match ret {
                    Some(r) => self.resolve_type(r, scope)?,
                    None => TypeId::VOID,
                };
                let mut ptys = Vec::with_capacity(params.len());
                for p in params {
                    ptys.push(self.resolve_type(p, scope)?);
                }
                Ok(self.types.callable_type(*pure, None, ptys, ret))
            }
        }
    }

    pub(crate) fn path_str(&self, path: &ast::MemberPath) -> String {
        path.parts
            .iter()
            .map(|p| self.interner.lookup(*p))
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn prim_type_id(p: PrimName) -> TypeId {
    match p {
        PrimName::Void => TypeId::VOID,
        PrimName::Bool => TypeId::BOOL,
        PrimName::Char => TypeId::CHAR,
        PrimName::Byte => TypeId::BYTE,
        PrimName::Ubyte => TypeId::UBYTE,
        PrimName::Short => TypeId::SHORT,
        PrimName::Ushort => TypeId::USHORT,
        PrimName::Int => TypeId::INT,
        PrimName::Uint => TypeId::UINT,
        PrimName::Long => TypeId::LONG,
        PrimName::Ulong => TypeId::ULONG,
        PrimName::Float => TypeId::FLOAT,
        PrimName::Double => TypeId::DOUBLE,
        PrimName::Error => TypeId::ERROR,
    }
}
