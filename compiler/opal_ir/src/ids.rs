//! Index newtypes for the typed arenas.
//!
//! Every cross-reference in the compiler is a plain `u32` index into one of
//! the arenas (expressions, statements, variables, subroutines, scopes,
//! types, nominal type payloads). Indices are cheap to copy, hashable, and
//! sidestep the ownership cycles a pointer-based tree would create.

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(raw: u32) -> Self {
                $name(raw)
            }

            /// Index of the next arena slot; panics only on arena overflow,
            /// which is an internal invariant violation.
            #[inline]
            pub fn from_usize(index: usize) -> Self {
                $name(u32::try_from(index).expect("arena index exceeds u32"))
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

define_id! {
    /// Index into the expression arena.
    ExprId
}
define_id! {
    /// Index into the statement arena.
    StmtId
}
define_id! {
    /// Index into the variable arena.
    VarId
}
define_id! {
    /// Index into the subroutine arena.
    SubrId
}
define_id! {
    /// Index into the external-subroutine arena.
    ExternId
}
define_id! {
    /// Index into the scope tree.
    ScopeId
}
define_id! {
    /// Handle to an interned type in the type pool.
    TypeId
}
define_id! {
    /// Index into the struct definition table.
    StructId
}
define_id! {
    /// Index into the enum definition table.
    EnumId
}
define_id! {
    /// Index into the alias definition table.
    AliasId
}

impl TypeId {
    // Primitive types are pre-interned at fixed indices; the type pool's
    // constructor must create them in exactly this order.
    pub const VOID: TypeId = TypeId::new(0);
    pub const BOOL: TypeId = TypeId::new(1);
    pub const CHAR: TypeId = TypeId::new(2);
    pub const BYTE: TypeId = TypeId::new(3);
    pub const UBYTE: TypeId = TypeId::new(4);
    pub const SHORT: TypeId = TypeId::new(5);
    pub const USHORT: TypeId = TypeId::new(6);
    pub const INT: TypeId = TypeId::new(7);
    pub const UINT: TypeId = TypeId::new(8);
    pub const LONG: TypeId = TypeId::new(9);
    pub const ULONG: TypeId = TypeId::new(10);
    pub const FLOAT: TypeId = TypeId::new(11);
    pub const DOUBLE: TypeId = TypeId::new(12);
    pub const ERROR: TypeId = TypeId::new(13);
    /// `string` is canonically `char[]` with one dimension.
    pub const STRING: TypeId = TypeId::new(14);
}

impl ScopeId {
    /// The global module scope is always the first scope created.
    pub const ROOT: ScopeId = ScopeId::new(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let id = ExprId::from_usize(42);
        assert_eq!(id.index(), 42);
        assert_eq!(id.raw(), 42);
        assert_eq!(format!("{id:?}"), "ExprId(42)");
    }
}
