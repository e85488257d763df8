//! Internal type representation stored in the pool.
//!
//! Structural types hold `TypeId` children so interned equality is id
//! equality. Nominal types (struct, enum, alias) hold an index into the
//! pool's side tables; their identity is the declaration site.

use opal_ir::{AliasId, EnumId, Name, ScopeId, Span, StructId, TypeId};

/// Width of an integer type in bits.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
        }
    }

    pub fn bytes(self) -> u32 {
        self.bits() / 8
    }
}

/// A type, as stored in the pool.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeData {
    Void,
    Bool,
    /// Unsigned byte holding one character.
    Char,
    /// Error sentinel; produced only on compile errors.
    ErrorType,
    Int {
        width: IntWidth,
        signed: bool,
    },
    Float32,
    Float64,
    /// `elem` is never itself an array; nesting folds into `dims`.
    Array {
        elem: TypeId,
        dims: u32,
    },
    Tuple(Box<[TypeId]>),
    Map {
        key: TypeId,
        value: TypeId,
    },
    Callable {
        pure: bool,
        /// Receiver struct type; `None` for free subroutines.
        receiver: Option<TypeId>,
        params: Box<[TypeId]>,
        ret: TypeId,
    },
    /// Option set; distinct and canonical, written order preserved.
    Union(Box<[TypeId]>),
    Struct(StructId),
    Enum(EnumId),
    Alias(AliasId),
}

/// Nominal struct payload.
#[derive(Clone, Debug)]
pub struct StructDef {
    pub name: Name,
    /// The scope *of* the struct (member subroutines live here).
    pub scope: ScopeId,
    pub fields: Vec<StructField>,
    pub span: Span,
}

/// One data member of a struct.
#[derive(Clone, Debug)]
pub struct StructField {
    pub name: Name,
    pub ty: TypeId,
    pub composed: bool,
    pub span: Span,
}

/// Nominal enum payload.
#[derive(Clone, Debug)]
pub struct EnumDef {
    pub name: Name,
    pub scope: ScopeId,
    pub items: Vec<EnumItem>,
    pub span: Span,
}

/// One enumerant. `signed` is set when the value is negative; the signed
/// reading is `bits as i64`.
#[derive(Clone, Debug)]
pub struct EnumItem {
    pub name: Name,
    pub bits: u64,
    pub signed: bool,
}

impl EnumItem {
    /// Numeric value, sign-aware.
    pub fn value(&self) -> i128 {
        if self.signed {
            i128::from(self.bits as i64)
        } else {
            i128::from(self.bits)
        }
    }
}

/// Nominal alias payload; `target` is filled by the resolver's flush pass.
#[derive(Clone, Debug)]
pub struct AliasDef {
    pub name: Name,
    pub scope: ScopeId,
    pub target: TypeId,
    pub span: Span,
}
