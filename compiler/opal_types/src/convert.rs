//! The conversion predicate and integer fit checks.

use crate::data::{IntWidth, TypeData};
use crate::pool::TypePool;
use opal_ir::TypeId;

impl TypePool {
    /// Whether a value of type `from` converts (implicitly) to `to`.
    ///
    /// Defined by: identity after canonicalization; integer↔integer with
    /// width/sign coercion; integer↔float; integer/char interchange;
    /// enum→integer; tuple-shaped sources into struct/tuple/array/map
    /// when element-wise convertible; any type into a union when it is
    /// (or converts to) exactly one option.
    pub fn can_convert(&self, from: TypeId, to: TypeId) -> bool {
        let from = self.canonicalize(from);
        let to = self.canonicalize(to);
        if from == to {
            return true;
        }
        match (self.data(from), self.data(to)) {
            // Numeric and char interchange (char is an unsigned byte).
            (f, t) if arithmetic(f) && arithmetic(t) => true,
            // Enum converts out to its underlying integer value.
            (TypeData::Enum(_), t) if integer_or_char(t) => true,

            // A union source converts when every option finds exactly one
            // home in the target union.
            (TypeData::Union(from_opts), TypeData::Union(_)) => from_opts
                .iter()
                .all(|opt| self.union_option_for(*opt, to).is_some()),
            // Union injection: exactly one option accepts the source.
            (_, TypeData::Union(_)) => self.union_option_for(from, to).is_some(),

            // Tuple-shaped sources (compound literals resolve to tuples).
            (TypeData::Tuple(members), TypeData::Struct(sid)) => {
                let fields = &self.struct_def(*sid).fields;
                members.len() == fields.len()
                    && members
                        .iter()
                        .zip(fields.iter())
                        .all(|(m, f)| self.can_convert(*m, f.ty))
            }
            (TypeData::Tuple(ms), TypeData::Tuple(ts)) => {
                ms.len() == ts.len()
                    && ms.iter().zip(ts.iter()).all(|(m, t)| self.can_convert(*m, *t))
            }
            (TypeData::Tuple(members), TypeData::Array { elem, dims }) => {
                self.tuple_converts_to_array(members, *elem, *dims)
            }
            (TypeData::Tuple(members), TypeData::Map { key, value }) => {
                members.iter().all(|m| match self.data(self.canonicalize(*m)) {
                    TypeData::Tuple(kv) => {
                        kv.len() == 2
                            && self.can_convert(kv[0], *key)
                            && self.can_convert(kv[1], *value)
                    }
                    _ => false,
                })
            }

            // Arrays of convertible elements with matching dimensions.
            (
                TypeData::Array { elem: fe, dims: fd },
                TypeData::Array { elem: te, dims: td },
            ) => fd == td && self.can_convert(*fe, *te),

            // A single-member struct is equivalent to its member.
            (_, TypeData::Struct(sid)) => {
                let fields = &self.struct_def(*sid).fields;
                fields.len() == 1 && self.can_convert(from, fields[0].ty)
            }

            _ => false,
        }
    }

    /// The option index a source type injects into, when the union accepts
    /// it unambiguously. Exact option matches win over convertible ones.
    pub fn union_option_for(&self, from: TypeId, union: TypeId) -> Option<u32> {
        let from = self.canonicalize(from);
        let TypeData::Union(options) = self.data(self.canonicalize(union)) else {
            return None;
        };
        if let Some(idx) = options.iter().position(|o| *o == from) {
            return u32::try_from(idx).ok();
        }
        let mut found = None;
        for (idx, opt) in options.iter().enumerate() {
            if self.can_convert(from, *opt) {
                if found.is_some() {
                    return None; // ambiguous
                }
                found = u32::try_from(idx).ok();
            }
        }
        found
    }

    /// Element-wise check of a tuple-shaped literal against an array type.
    /// Members of a multi-dimensional target are checked against the
    /// next-lower dimension without requiring that array type to have been
    /// interned.
    fn tuple_converts_to_array(&self, members: &[TypeId], elem: TypeId, dims: u32) -> bool {
        members.iter().all(|m| {
            let m = self.canonicalize(*m);
            if dims == 1 {
                return self.can_convert(m, elem);
            }
            match self.data(m) {
                TypeData::Tuple(inner) => self.tuple_converts_to_array(inner, elem, dims - 1),
                TypeData::Array { elem: me, dims: md } => {
                    *md == dims - 1 && self.can_convert(*me, elem)
                }
                _ => false,
            }
        })
    }
}

fn arithmetic(data: &TypeData) -> bool {
    matches!(
        data,
        TypeData::Int { .. } | TypeData::Char | TypeData::Float32 | TypeData::Float64
    )
}

fn integer_or_char(data: &TypeData) -> bool {
    matches!(data, TypeData::Int { .. } | TypeData::Char)
}

/// Whether the two's-complement value `bits` (read signed or unsigned per
/// `signed`) fits a target integer of `to_width`/`to_signed`.
pub fn int_fits(bits: u64, signed: bool, to_width: IntWidth, to_signed: bool) -> bool {
    let value: i128 = if signed {
        i128::from(bits as i64)
    } else {
        i128::from(bits)
    };
    let w = i128::from(to_width.bits());
    if to_signed {
        let max = (1i128 << (w - 1)) - 1;
        let min = -(1i128 << (w - 1));
        value >= min && value <= max
    } else {
        let max = (1i128 << w) - 1;
        value >= 0 && value <= max
    }
}

/// Truncate a raw value to `width` bits (two's-complement wrap).
pub fn wrap_to_width(bits: u64, width: IntWidth) -> u64 {
    match width {
        IntWidth::W8 => bits & 0xff,
        IntWidth::W16 => bits & 0xffff,
        IntWidth::W32 => bits & 0xffff_ffff,
        IntWidth::W64 => bits,
    }
}

/// Sign-extend a `width`-bit value to 64 bits.
pub fn sign_extend(bits: u64, width: IntWidth) -> i64 {
    match width {
        IntWidth::W8 => bits as u8 as i8 as i64,
        IntWidth::W16 => bits as u16 as i16 as i64,
        IntWidth::W32 => bits as u32 as i32 as i64,
        IntWidth::W64 => bits as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{StructDef, StructField};
    use opal_ir::{Name, ScopeId, Span};

    #[test]
    fn conversion_is_reflexive_on_identity() {
        let pool = TypePool::new();
        for id in [TypeId::INT, TypeId::BOOL, TypeId::STRING, TypeId::DOUBLE] {
            assert!(pool.can_convert(id, id));
        }
    }

    #[test]
    fn numeric_interchange() {
        let pool = TypePool::new();
        assert!(pool.can_convert(TypeId::INT, TypeId::LONG));
        assert!(pool.can_convert(TypeId::LONG, TypeId::BYTE));
        assert!(pool.can_convert(TypeId::INT, TypeId::DOUBLE));
        assert!(pool.can_convert(TypeId::DOUBLE, TypeId::INT));
        assert!(pool.can_convert(TypeId::CHAR, TypeId::UINT));
        assert!(!pool.can_convert(TypeId::BOOL, TypeId::INT));
        assert!(!pool.can_convert(TypeId::INT, TypeId::BOOL));
    }

    #[test]
    fn union_injection_requires_unique_option() {
        let mut pool = TypePool::new();
        let ib = pool.union_type(vec![TypeId::INT, TypeId::BOOL]);
        assert!(pool.can_convert(TypeId::BOOL, ib));
        assert_eq!(pool.union_option_for(TypeId::BOOL, ib), Some(1));
        // An exact option wins even though int also converts to long.
        let il = pool.union_type(vec![TypeId::INT, TypeId::LONG]);
        assert_eq!(pool.union_option_for(TypeId::INT, il), Some(0));
        // Char converts to both int and long: ambiguous.
        assert_eq!(pool.union_option_for(TypeId::CHAR, il), None);
        assert!(!pool.can_convert(TypeId::CHAR, il));
    }

    #[test]
    fn tuple_converts_into_struct_and_array() {
        let mut pool = TypePool::new();
        let pair = pool.tuple_type(vec![TypeId::INT, TypeId::INT]);
        let arr = pool.array_type(TypeId::LONG, 1);
        assert!(pool.can_convert(pair, arr));

        let (sid, struct_ty) = pool.add_struct(StructDef {
            name: Name::EMPTY,
            scope: ScopeId::ROOT,
            fields: vec![
                StructField { name: Name::EMPTY, ty: TypeId::INT, composed: false, span: Span::DUMMY },
                StructField { name: Name::EMPTY, ty: TypeId::DOUBLE, composed: false, span: Span::DUMMY },
            ],
            span: Span::DUMMY,
        });
        let _ = sid;
        assert!(pool.can_convert(pair, struct_ty));

        let triple = pool.tuple_type(vec![TypeId::INT, TypeId::INT, TypeId::INT]);
        assert!(!pool.can_convert(triple, struct_ty));
    }

    #[test]
    fn int_fit_checks() {
        assert!(int_fits(127, false, IntWidth::W8, true));
        assert!(!int_fits(128, false, IntWidth::W8, true));
        assert!(int_fits(255, false, IntWidth::W8, false));
        assert!(!int_fits((-1i64) as u64, true, IntWidth::W8, false));
        assert!(int_fits((-128i64) as u64, true, IntWidth::W8, true));
        assert!(int_fits(u64::MAX, false, IntWidth::W64, false));
        assert!(!int_fits(u64::MAX, false, IntWidth::W64, true));
    }

    #[test]
    fn wrap_and_extend() {
        assert_eq!(wrap_to_width(0x1ff, IntWidth::W8), 0xff);
        assert_eq!(sign_extend(0xff, IntWidth::W8), -1);
        assert_eq!(sign_extend(0x7f, IntWidth::W8), 127);
    }
}
