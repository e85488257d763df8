//! The interning type pool.
//!
//! Two structurally equal specifications of a tuple, array, map, callable,
//! or union always yield the same [`TypeId`]; nominal types get one id per
//! declaration site. Aliases canonicalize away, so canonical id equality
//! *is* type equality.

use crate::data::{AliasDef, EnumDef, IntWidth, StructDef, TypeData};
use opal_ir::{AliasId, EnumId, StringInterner, StructId, TypeId};
#[cfg(test)]
use opal_ir::Name;
use rustc_hash::FxHashMap;

/// Pool of all types of a compilation.
///
/// Mutated only by the resolver; the interpreter reads it immutably.
#[derive(Debug)]
pub struct TypePool {
    types: Vec<TypeData>,
    dedup: FxHashMap<TypeData, TypeId>,
    structs: Vec<StructDef>,
    enums: Vec<EnumDef>,
    aliases: Vec<AliasDef>,
}

impl TypePool {
    /// Create a pool with the primitives pre-interned at the fixed
    /// [`TypeId`] constants.
    pub fn new() -> Self {
        let mut pool = TypePool {
            types: Vec::with_capacity(64),
            dedup: FxHashMap::default(),
            structs: Vec::new(),
            enums: Vec::new(),
            aliases: Vec::new(),
        };
        // Order must match the TypeId constants.
        let primitives = [
            TypeData::Void,
            TypeData::Bool,
            TypeData::Char,
            TypeData::Int { width: IntWidth::W8, signed: true },
            TypeData::Int { width: IntWidth::W8, signed: false },
            TypeData::Int { width: IntWidth::W16, signed: true },
            TypeData::Int { width: IntWidth::W16, signed: false },
            TypeData::Int { width: IntWidth::W32, signed: true },
            TypeData::Int { width: IntWidth::W32, signed: false },
            TypeData::Int { width: IntWidth::W64, signed: true },
            TypeData::Int { width: IntWidth::W64, signed: false },
            TypeData::Float32,
            TypeData::Float64,
            TypeData::ErrorType,
        ];
        for data in primitives {
            pool.intern(data);
        }
        // string == char[] with one dimension, at TypeId::STRING.
        let string = pool.intern(TypeData::Array { elem: TypeId::CHAR, dims: 1 });
        debug_assert_eq!(string, TypeId::STRING);
        pool
    }

    /// Intern a type, returning the existing id for structurally equal
    /// data.
    pub fn intern(&mut self, data: TypeData) -> TypeId {
        if let Some(&id) = self.dedup.get(&data) {
            return id;
        }
        let id = TypeId::from_usize(self.types.len());
        self.types.push(data.clone());
        self.dedup.insert(data, id);
        id
    }

    #[inline]
    pub fn data(&self, id: TypeId) -> &TypeData {
        &self.types[id.index()]
    }

    /// Look up an already-interned type without interning.
    pub fn find_interned(&self, data: &TypeData) -> Option<TypeId> {
        self.dedup.get(data).copied()
    }

    /// Look up the signed-ness and width of an integer type.
    pub fn int_info(&self, id: TypeId) -> Option<(IntWidth, bool)> {
        match self.data(self.canonicalize(id)) {
            TypeData::Int { width, signed } => Some((*width, *signed)),
            _ => None,
        }
    }

    /// The canonical primitive for a width/sign pair.
    pub fn integer_type(&self, width: IntWidth, signed: bool) -> TypeId {
        match (width, signed) {
            (IntWidth::W8, true) => TypeId::BYTE,
            (IntWidth::W8, false) => TypeId::UBYTE,
            (IntWidth::W16, true) => TypeId::SHORT,
            (IntWidth::W16, false) => TypeId::USHORT,
            (IntWidth::W32, true) => TypeId::INT,
            (IntWidth::W32, false) => TypeId::UINT,
            (IntWidth::W64, true) => TypeId::LONG,
            (IntWidth::W64, false) => TypeId::ULONG,
        }
    }

    /// Intern an array type. Array-of-array folds into the dimension
    /// count, so `getArrayType(char[], 1)` and `getArrayType(char, 2)`
    /// are the same handle. Every lower dimension count is interned too,
    /// so later phases can look up element types without interning.
    pub fn array_type(&mut self, elem: TypeId, dims: u32) -> TypeId {
        let elem = self.canonicalize(elem);
        let (elem, dims) = match *self.data(elem) {
            TypeData::Array { elem: inner, dims: d } => (inner, d + dims),
            _ => (elem, dims),
        };
        let mut id = TypeId::ERROR;
        for level in 1..=dims {
            id = self.intern(TypeData::Array { elem, dims: level });
        }
        id
    }

    /// Already-interned array type with a lower dimension count; exists
    /// for phases that hold the pool immutably.
    pub fn array_level(&self, elem: TypeId, dims: u32) -> Option<TypeId> {
        self.find_interned(&TypeData::Array { elem, dims })
    }

    /// Intern a tuple type. A singleton tuple is *not* equivalent to its
    /// element.
    pub fn tuple_type(&mut self, members: Vec<TypeId>) -> TypeId {
        let members: Box<[TypeId]> = members.iter().map(|m| self.canonicalize(*m)).collect();
        self.intern(TypeData::Tuple(members))
    }

    pub fn map_type(&mut self, key: TypeId, value: TypeId) -> TypeId {
        let key = self.canonicalize(key);
        let value = self.canonicalize(value);
        self.intern(TypeData::Map { key, value })
    }

    pub fn callable_type(
        &mut self,
        pure: bool,
        receiver: Option<TypeId>,
        params: Vec<TypeId>,
        ret: TypeId,
    ) -> TypeId {
        let receiver = receiver.map(|r| self.canonicalize(r));
        let params: Box<[TypeId]> = params.iter().map(|p| self.canonicalize(*p)).collect();
        let ret = self.canonicalize(ret);
        self.intern(TypeData::Callable { pure, receiver, params, ret })
    }

    /// Intern a union type. Options are canonicalized and deduplicated
    /// (written order preserved); a single distinct option collapses to
    /// that option.
    pub fn union_type(&mut self, options: Vec<TypeId>) -> TypeId {
        let mut distinct: Vec<TypeId> = Vec::with_capacity(options.len());
        for opt in options {
            let canon = self.canonicalize(opt);
            if !distinct.contains(&canon) {
                distinct.push(canon);
            }
        }
        if distinct.len() == 1 {
            return distinct[0];
        }
        self.intern(TypeData::Union(distinct.into_boxed_slice()))
    }

    pub fn add_struct(&mut self, def: StructDef) -> (StructId, TypeId) {
        let sid = StructId::from_usize(self.structs.len());
        self.structs.push(def);
        let ty = self.intern(TypeData::Struct(sid));
        (sid, ty)
    }

    pub fn add_enum(&mut self, def: EnumDef) -> (EnumId, TypeId) {
        let eid = EnumId::from_usize(self.enums.len());
        self.enums.push(def);
        let ty = self.intern(TypeData::Enum(eid));
        (eid, ty)
    }

    pub fn add_alias(&mut self, def: AliasDef) -> (AliasId, TypeId) {
        let aid = AliasId::from_usize(self.aliases.len());
        self.aliases.push(def);
        let ty = self.intern(TypeData::Alias(aid));
        (aid, ty)
    }

    pub fn struct_def(&self, id: StructId) -> &StructDef {
        &self.structs[id.index()]
    }

    pub fn struct_def_mut(&mut self, id: StructId) -> &mut StructDef {
        &mut self.structs[id.index()]
    }

    pub fn enum_def(&self, id: EnumId) -> &EnumDef {
        &self.enums[id.index()]
    }

    pub fn enum_def_mut(&mut self, id: EnumId) -> &mut EnumDef {
        &mut self.enums[id.index()]
    }

    pub fn alias_def(&self, id: AliasId) -> &AliasDef {
        &self.aliases[id.index()]
    }

    pub fn alias_def_mut(&mut self, id: AliasId) -> &mut AliasDef {
        &mut self.aliases[id.index()]
    }

    /// Strip alias chains; the resolver guarantees chains are acyclic.
    pub fn canonicalize(&self, mut id: TypeId) -> TypeId {
        while let TypeData::Alias(aid) = self.data(id) {
            id = self.aliases[aid.index()].target;
        }
        id
    }

    /// Equality on canonical handles.
    pub fn types_same(&self, a: TypeId, b: TypeId) -> bool {
        self.canonicalize(a) == self.canonicalize(b)
    }

    pub fn is_integer(&self, id: TypeId) -> bool {
        matches!(self.data(self.canonicalize(id)), TypeData::Int { .. })
    }

    pub fn is_float(&self, id: TypeId) -> bool {
        matches!(
            self.data(self.canonicalize(id)),
            TypeData::Float32 | TypeData::Float64
        )
    }

    pub fn is_numeric(&self, id: TypeId) -> bool {
        self.is_integer(id) || self.is_float(id)
    }

    /// Human-readable type name for diagnostics.
    pub fn display(&self, id: TypeId, interner: &StringInterner) -> String {
        match self.data(id) {
            TypeData::Void => "void".into(),
            TypeData::Bool => "bool".into(),
            TypeData::Char => "char".into(),
            TypeData::ErrorType => "error".into(),
            TypeData::Int { width, signed } => match (width, signed) {
                (IntWidth::W8, true) => "byte".into(),
                (IntWidth::W8, false) => "ubyte".into(),
                (IntWidth::W16, true) => "short".into(),
                (IntWidth::W16, false) => "ushort".into(),
                (IntWidth::W32, true) => "int".into(),
                (IntWidth::W32, false) => "uint".into(),
                (IntWidth::W64, true) => "long".into(),
                (IntWidth::W64, false) => "ulong".into(),
            },
            TypeData::Float32 => "float".into(),
            TypeData::Float64 => "double".into(),
            TypeData::Array { elem, dims } => {
                if *elem == TypeId::CHAR && *dims == 1 {
                    return "string".into();
                }
                let mut s = self.display(*elem, interner);
                for _ in 0..*dims {
                    s.push_str("[]");
                }
                s
            }
            TypeData::Tuple(members) => {
                let inner: Vec<String> =
                    members.iter().map(|m| self.display(*m, interner)).collect();
                format!("({})", inner.join(", "))
            }
            TypeData::Map { key, value } => format!(
                "({}: {})",
                self.display(*key, interner),
                self.display(*value, interner)
            ),
            TypeData::Callable { pure, params, ret, .. } => {
                let inner: Vec<String> =
                    params.iter().map(|p| self.display(*p, interner)).collect();
                let kw = if *pure { "functype" } else { "proctype" };
                format!("{kw} {}({})", self.display(*ret, interner), inner.join(", "))
            }
            TypeData::Union(options) => {
                let inner: Vec<String> =
                    options.iter().map(|o| self.display(*o, interner)).collect();
                format!("({})", inner.join("|"))
            }
            TypeData::Struct(sid) => interner.lookup(self.struct_def(*sid).name).to_string(),
            TypeData::Enum(eid) => interner.lookup(self.enum_def(*eid).name).to_string(),
            TypeData::Alias(aid) => interner.lookup(self.alias_def(*aid).name).to_string(),
        }
    }
}

impl Default for TypePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_land_on_fixed_ids() {
        let pool = TypePool::new();
        assert!(matches!(pool.data(TypeId::VOID), TypeData::Void));
        assert!(matches!(pool.data(TypeId::BOOL), TypeData::Bool));
        assert!(matches!(
            pool.data(TypeId::INT),
            TypeData::Int { width: IntWidth::W32, signed: true }
        ));
        assert!(matches!(
            pool.data(TypeId::ULONG),
            TypeData::Int { width: IntWidth::W64, signed: false }
        ));
        assert!(matches!(
            pool.data(TypeId::STRING),
            TypeData::Array { elem: TypeId::CHAR, dims: 1 }
        ));
    }

    #[test]
    fn array_interning_returns_same_handle() {
        let mut pool = TypePool::new();
        let a = pool.array_type(TypeId::INT, 2);
        let b = pool.array_type(TypeId::INT, 2);
        assert_eq!(a, b);
        assert_ne!(a, pool.array_type(TypeId::INT, 1));
    }

    #[test]
    fn array_of_array_folds_dimensions() {
        let mut pool = TypePool::new();
        let inner = pool.array_type(TypeId::INT, 1);
        let outer = pool.array_type(inner, 1);
        assert_eq!(outer, pool.array_type(TypeId::INT, 2));
    }

    #[test]
    fn string_is_char_array() {
        let mut pool = TypePool::new();
        assert_eq!(pool.array_type(TypeId::CHAR, 1), TypeId::STRING);
    }

    #[test]
    fn singleton_tuple_is_distinct_from_element() {
        let mut pool = TypePool::new();
        let single = pool.tuple_type(vec![TypeId::INT]);
        assert_ne!(single, TypeId::INT);
        assert_eq!(single, pool.tuple_type(vec![TypeId::INT]));
    }

    #[test]
    fn union_dedups_and_collapses() {
        let mut pool = TypePool::new();
        let u = pool.union_type(vec![TypeId::INT, TypeId::BOOL, TypeId::INT]);
        match pool.data(u) {
            TypeData::Union(options) => assert_eq!(&options[..], &[TypeId::INT, TypeId::BOOL]),
            other => panic!("expected union, got {other:?}"),
        }
        assert_eq!(pool.union_type(vec![TypeId::INT, TypeId::INT]), TypeId::INT);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_prim() -> impl Strategy<Value = TypeId> {
            prop_oneof![
                Just(TypeId::BOOL),
                Just(TypeId::CHAR),
                Just(TypeId::INT),
                Just(TypeId::LONG),
                Just(TypeId::ULONG),
                Just(TypeId::DOUBLE),
            ]
        }

        proptest! {
            #[test]
            fn array_interning_is_canonical(elem in arb_prim(), dims in 1u32..4) {
                let mut pool = TypePool::new();
                let a = pool.array_type(elem, dims);
                let b = pool.array_type(elem, dims);
                prop_assert_eq!(a, b);
                prop_assert!(pool.types_same(a, b));
            }

            #[test]
            fn tuple_interning_is_canonical(members in proptest::collection::vec(arb_prim(), 0..4)) {
                let mut pool = TypePool::new();
                let a = pool.tuple_type(members.clone());
                let b = pool.tuple_type(members);
                prop_assert_eq!(a, b);
            }

            #[test]
            fn conversion_reflexive(ty in arb_prim()) {
                let pool = TypePool::new();
                prop_assert!(pool.can_convert(ty, ty));
            }
        }
    }

    #[test]
    fn alias_canonicalizes_away() {
        let mut pool = TypePool::new();
        let (aid, alias_ty) = pool.add_alias(AliasDef {
            name: Name::EMPTY,
            scope: opal_ir::ScopeId::ROOT,
            target: TypeId::ERROR,
            span: opal_ir::Span::DUMMY,
        });
        pool.alias_def_mut(aid).target = TypeId::INT;
        assert_eq!(pool.canonicalize(alias_ty), TypeId::INT);
        assert!(pool.types_same(alias_ty, TypeId::INT));
        // Reflexivity and alias-chain transitivity of conversion.
        assert!(pool.can_convert(alias_ty, TypeId::INT));
        assert!(pool.can_convert(TypeId::INT, alias_ty));
    }
}
