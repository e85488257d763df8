//! Canonical default values per type, produced as HIR constants.
//!
//! Used for variables declared without an initializer and for the
//! resolver's default-value placeholders. The interpreter has a parallel
//! runtime-value path for map auto-insertion and array allocation.

use crate::data::TypeData;
use crate::pool::TypePool;
use opal_ir::hir::{Expr, ExprKind, Hir};
use opal_ir::{ExprId, Span, TypeId};

impl TypePool {
    /// Build the default constant for `ty`: zero, `0.0`, `false`, `'\0'`,
    /// empty array/map, all-default tuple/struct, the union's first
    /// option's default, or the enum's first enumerant.
    ///
    /// Returns `None` for types with no default (void, error, callable,
    /// an empty enum).
    pub fn default_expr(&self, ty: TypeId, hir: &mut Hir, span: Span) -> Option<ExprId> {
        let canon = self.canonicalize(ty);
        let kind = match self.data(canon) {
            TypeData::Bool => ExprKind::Bool(false),
            TypeData::Char => ExprKind::Char(0),
            TypeData::Int { signed, .. } => ExprKind::Int { bits: 0, signed: *signed },
            TypeData::Float32 => ExprKind::Float { fp: 0.0, dp: 0.0, wide: false },
            TypeData::Float64 => ExprKind::Float { fp: 0.0, dp: 0.0, wide: true },
            TypeData::Array { .. } => ExprKind::Compound(Vec::new()),
            TypeData::Map { .. } => ExprKind::MapLit(Vec::new()),
            TypeData::Tuple(members) => {
                let members = members.to_vec();
                let mut defaults = Vec::with_capacity(members.len());
                for m in members {
                    defaults.push(self.default_expr(m, hir, span)?);
                }
                ExprKind::Compound(defaults)
            }
            TypeData::Struct(sid) => {
                let field_tys: Vec<TypeId> =
                    self.struct_def(*sid).fields.iter().map(|f| f.ty).collect();
                let mut defaults = Vec::with_capacity(field_tys.len());
                for f in field_tys {
                    defaults.push(self.default_expr(f, hir, span)?);
                }
                ExprKind::Compound(defaults)
            }
            TypeData::Union(options) => {
                let first = options[0];
                let value = self.default_expr(first, hir, span)?;
                ExprKind::Union { option: 0, value }
            }
            TypeData::Enum(eid) => {
                if self.enum_def(*eid).items.is_empty() {
                    return None;
                }
                ExprKind::EnumVal { enum_id: *eid, item: 0 }
            }
            TypeData::Void | TypeData::ErrorType | TypeData::Callable { .. } => return None,
            TypeData::Alias(_) => unreachable!("canonicalize strips aliases"),
        };
        Some(hir.alloc_expr(Expr { kind, ty: canon, span }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_defaults() {
        let pool = TypePool::new();
        let mut hir = Hir::new();
        let d = pool.default_expr(TypeId::INT, &mut hir, Span::DUMMY).unwrap();
        assert!(matches!(
            hir.expr(d).kind,
            ExprKind::Int { bits: 0, signed: true }
        ));
        let b = pool.default_expr(TypeId::BOOL, &mut hir, Span::DUMMY).unwrap();
        assert!(matches!(hir.expr(b).kind, ExprKind::Bool(false)));
    }

    #[test]
    fn compound_defaults() {
        let mut pool = TypePool::new();
        let mut hir = Hir::new();
        let pair = pool.tuple_type(vec![TypeId::INT, TypeId::BOOL]);
        let d = pool.default_expr(pair, &mut hir, Span::DUMMY).unwrap();
        match &hir.expr(d).kind {
            ExprKind::Compound(members) => assert_eq!(members.len(), 2),
            other => panic!("expected compound, got {other:?}"),
        }

        let arr = pool.array_type(TypeId::INT, 1);
        let d = pool.default_expr(arr, &mut hir, Span::DUMMY).unwrap();
        assert!(matches!(&hir.expr(d).kind, ExprKind::Compound(m) if m.is_empty()));
    }

    #[test]
    fn union_defaults_to_first_option() {
        let mut pool = TypePool::new();
        let mut hir = Hir::new();
        let u = pool.union_type(vec![TypeId::INT, TypeId::BOOL]);
        let d = pool.default_expr(u, &mut hir, Span::DUMMY).unwrap();
        match &hir.expr(d).kind {
            ExprKind::Union { option: 0, value } => {
                assert!(matches!(hir.expr(*value).kind, ExprKind::Int { bits: 0, .. }));
            }
            other => panic!("expected union, got {other:?}"),
        }
    }

    #[test]
    fn void_has_no_default() {
        let pool = TypePool::new();
        let mut hir = Hir::new();
        assert!(pool.default_expr(TypeId::VOID, &mut hir, Span::DUMMY).is_none());
    }
}
