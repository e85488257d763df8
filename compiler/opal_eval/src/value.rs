//! Runtime values.
//!
//! All composite data is stored inline (`Vec`), so `clone` is a deep copy
//! and the language's value semantics fall out of Rust's ownership:
//! assignments and parameter bindings never alias.

use opal_ir::hir::Hir;
use opal_ir::{ExternId, StringInterner, SubrId, TypeId};
use opal_types::{sign_extend, wrap_to_width, IntWidth, TypeData, TypePool};
use std::cmp::Ordering;

/// A typed integer value: raw bits plus width and signedness, wrapped to
/// the width on construction.
#[derive(Copy, Clone, Debug)]
pub struct IntValue {
    bits: u64,
    pub width: IntWidth,
    pub signed: bool,
}

impl IntValue {
    pub fn new(bits: u64, width: IntWidth, signed: bool) -> Self {
        IntValue {
            bits: wrap_to_width(bits, width),
            width,
            signed,
        }
    }

    pub fn zero(width: IntWidth, signed: bool) -> Self {
        IntValue::new(0, width, signed)
    }

    /// Raw (wrapped) bits; the unsigned reading.
    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Sign-extended reading.
    pub fn as_i64(&self) -> i64 {
        sign_extend(self.bits, self.width)
    }

    /// Numeric value honouring signedness.
    pub fn value(&self) -> i128 {
        if self.signed {
            i128::from(self.as_i64())
        } else {
            i128::from(self.bits)
        }
    }

    /// Whether this is the smallest representable value of a signed
    /// width, whose negation overflows.
    pub fn is_signed_minimum(&self) -> bool {
        if !self.signed {
            return false;
        }
        let min = match self.width {
            IntWidth::W8 => i64::from(i8::MIN),
            IntWidth::W16 => i64::from(i16::MIN),
            IntWidth::W32 => i64::from(i32::MIN),
            IntWidth::W64 => i64::MIN,
        };
        self.as_i64() == min
    }
}

/// Reference to a callable at runtime.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SubrVal {
    Free(SubrId),
    Extern(ExternId),
}

/// A runtime value.
#[derive(Clone, Debug)]
pub enum Value {
    Void,
    Bool(bool),
    Char(u8),
    Int(IntValue),
    Float(f32),
    Double(f64),
    /// Struct, tuple, and array values; strings are compounds of chars.
    Compound { ty: TypeId, elems: Vec<Value> },
    /// Insertion-ordered finite mapping.
    Map { ty: TypeId, entries: Vec<(Value, Value)> },
    /// Union value: the active option index plus its payload.
    Union { ty: TypeId, option: u32, value: Box<Value> },
    /// First-class subroutine reference, possibly with a receiver
    /// captured by value.
    Subr { subr: SubrVal, bound: Option<Box<Value>> },
}

/// Numeric reading shared by equality and ordering.
enum Num {
    I(i128),
    F(f64),
}

impl Value {
    fn as_num(&self) -> Option<Num> {
        match self {
            Value::Int(i) => Some(Num::I(i.value())),
            Value::Char(c) => Some(Num::I(i128::from(*c))),
            Value::Float(f) => Some(Num::F(f64::from(*f))),
            Value::Double(d) => Some(Num::F(*d)),
            _ => None,
        }
    }

    /// Deep equality; mixed numeric representations compare by value.
    pub fn equals(&self, other: &Value) -> bool {
        if let (Some(a), Some(b)) = (self.as_num(), other.as_num()) {
            return match (a, b) {
                (Num::I(x), Num::I(y)) => x == y,
                (Num::F(x), Num::F(y)) => x == y,
                (Num::I(x), Num::F(y)) | (Num::F(y), Num::I(x)) => (x as f64) == y,
            };
        }
        match (self, other) {
            (Value::Void, Value::Void) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Compound { elems: a, .. }, Value::Compound { elems: b, .. }) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(y))
            }
            (Value::Map { entries: a, .. }, Value::Map { entries: b, .. }) => {
                a.len() == b.len()
                    && a.iter().all(|(ka, va)| {
                        b.iter().any(|(kb, vb)| ka.equals(kb) && va.equals(vb))
                    })
            }
            (
                Value::Union { option: oa, value: va, .. },
                Value::Union { option: ob, value: vb, .. },
            ) => oa == ob && va.equals(vb),
            (
                Value::Subr { subr: sa, bound: ba },
                Value::Subr { subr: sb, bound: bb },
            ) => {
                sa == sb
                    && match (ba, bb) {
                        (None, None) => true,
                        (Some(x), Some(y)) => x.equals(y),
                        _ => false,
                    }
            }
            _ => false,
        }
    }

    /// Total order where one exists: numerics by value, bools, chars,
    /// compounds lexicographically, unions by (option, payload).
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (self.as_num(), other.as_num()) {
            return match (a, b) {
                (Num::I(x), Num::I(y)) => Some(x.cmp(&y)),
                (Num::F(x), Num::F(y)) => x.partial_cmp(&y),
                (Num::I(x), Num::F(y)) => (x as f64).partial_cmp(&y),
                (Num::F(x), Num::I(y)) => x.partial_cmp(&(y as f64)),
            };
        }
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Compound { elems: a, .. }, Value::Compound { elems: b, .. }) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        other => return Some(other),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            (
                Value::Union { option: oa, value: va, .. },
                Value::Union { option: ob, value: vb, .. },
            ) => match oa.cmp(ob) {
                Ordering::Equal => va.compare(vb),
                other => Some(other),
            },
            _ => None,
        }
    }
}

/// The canonical runtime default for a type; `None` for void, error, and
/// callable types.
pub fn default_value(pool: &TypePool, ty: TypeId) -> Option<Value> {
    let canon = pool.canonicalize(ty);
    Some(match pool.data(canon) {
        TypeData::Bool => Value::Bool(false),
        TypeData::Char => Value::Char(0),
        TypeData::Int { width, signed } => Value::Int(IntValue::zero(*width, *signed)),
        TypeData::Float32 => Value::Float(0.0),
        TypeData::Float64 => Value::Double(0.0),
        TypeData::Array { .. } => Value::Compound { ty: canon, elems: Vec::new() },
        TypeData::Map { .. } => Value::Map { ty: canon, entries: Vec::new() },
        TypeData::Tuple(members) => {
            let members = members.to_vec();
            let mut elems = Vec::with_capacity(members.len());
            for m in members {
                elems.push(default_value(pool, m)?);
            }
            Value::Compound { ty: canon, elems }
        }
        TypeData::Struct(sid) => {
            let def = pool.struct_def(*sid);
            let mut elems = Vec::with_capacity(def.fields.len());
            for field in &def.fields {
                elems.push(default_value(pool, field.ty)?);
            }
            Value::Compound { ty: canon, elems }
        }
        TypeData::Union(options) => {
            let first = options[0];
            Value::Union {
                ty: canon,
                option: 0,
                value: Box::new(default_value(pool, first)?),
            }
        }
        TypeData::Enum(eid) => {
            let item = pool.enum_def(*eid).items.first()?;
            Value::Int(IntValue::new(item.bits, IntWidth::W64, item.signed))
        }
        TypeData::Void | TypeData::ErrorType | TypeData::Callable { .. } => return None,
        TypeData::Alias(_) => unreachable!("canonicalize strips aliases"),
    })
}

/// Render a value the way `print` writes it.
pub fn render(value: &Value, pool: &TypePool, hir: &Hir, interner: &StringInterner) -> String {
    let mut out = String::new();
    render_into(value, pool, hir, interner, &mut out);
    out
}

fn render_into(
    value: &Value,
    pool: &TypePool,
    hir: &Hir,
    interner: &StringInterner,
    out: &mut String,
) {
    match value {
        Value::Void => out.push_str("void"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Char(b) => render_char(*b, out),
        Value::Int(i) => {
            if i.signed {
                out.push_str(&i.as_i64().to_string());
            } else {
                out.push_str(&i.bits().to_string());
            }
        }
        Value::Float(f) => out.push_str(&f.to_string()),
        Value::Double(d) => out.push_str(&d.to_string()),
        Value::Compound { ty, elems } => match pool.data(pool.canonicalize(*ty)) {
            TypeData::Array { elem, dims } if *elem == TypeId::CHAR && *dims == 1 => {
                // Strings print as their raw byte sequence.
                let bytes: Vec<u8> = elems
                    .iter()
                    .map(|e| match e {
                        Value::Char(b) => *b,
                        _ => b'?',
                    })
                    .collect();
                out.push_str(&String::from_utf8_lossy(&bytes));
            }
            TypeData::Array { .. } => render_list(elems, "[", "]", pool, hir, interner, out),
            TypeData::Tuple(_) => render_list(elems, "(", ")", pool, hir, interner, out),
            TypeData::Struct(sid) => {
                out.push_str(interner.lookup(pool.struct_def(*sid).name));
                render_list(elems, "{", "}", pool, hir, interner, out);
            }
            _ => render_list(elems, "[", "]", pool, hir, interner, out),
        },
        Value::Map { entries, .. } => {
            out.push('{');
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_into(k, pool, hir, interner, out);
                out.push_str(": ");
                render_into(v, pool, hir, interner, out);
            }
            out.push('}');
        }
        Value::Union { value, .. } => render_into(value, pool, hir, interner, out),
        Value::Subr { subr, .. } => {
            let name = match subr {
                SubrVal::Free(id) => hir.subr(*id).name,
                SubrVal::Extern(id) => hir.extern_subr(*id).name,
            };
            out.push_str(interner.lookup(name));
        }
    }
}

fn render_list(
    elems: &[Value],
    open: &str,
    close: &str,
    pool: &TypePool,
    hir: &Hir,
    interner: &StringInterner,
    out: &mut String,
) {
    out.push_str(open);
    for (i, e) in elems.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        render_into(e, pool, hir, interner, out);
    }
    out.push_str(close);
}

fn render_char(b: u8, out: &mut String) {
    match b {
        b'\n' => out.push_str("\\n"),
        b'\t' => out.push_str("\\t"),
        b'\r' => out.push_str("\\r"),
        0 => out.push_str("\\0"),
        0x20..=0x7e => out.push(b as char),
        _ => out.push_str(&format!("\\x{b:02x}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_values_wrap_to_width() {
        let v = IntValue::new(0x1ff, IntWidth::W8, false);
        assert_eq!(v.bits(), 0xff);
        assert_eq!(v.value(), 255);

        let v = IntValue::new(0xff, IntWidth::W8, true);
        assert_eq!(v.as_i64(), -1);
        assert_eq!(v.value(), -1);
    }

    #[test]
    fn numeric_equality_crosses_widths() {
        let a = Value::Int(IntValue::new(5, IntWidth::W8, false));
        let b = Value::Int(IntValue::new(5, IntWidth::W64, true));
        assert!(a.equals(&b));
        assert!(Value::Char(65).equals(&Value::Int(IntValue::new(65, IntWidth::W32, true))));
        assert!(Value::Int(IntValue::new(2, IntWidth::W32, true)).equals(&Value::Double(2.0)));
    }

    #[test]
    fn compound_value_semantics() {
        let pool = TypePool::new();
        let a = Value::Compound {
            ty: TypeId::STRING,
            elems: vec![Value::Char(b'h'), Value::Char(b'i')],
        };
        let mut b = a.clone();
        if let Value::Compound { elems, .. } = &mut b {
            elems[0] = Value::Char(b'x');
        }
        // The copy mutated; the original did not.
        assert!(!a.equals(&b));
        let _ = pool;
    }

    #[test]
    fn ordering_is_lexicographic_on_compounds() {
        let s1 = Value::Compound {
            ty: TypeId::STRING,
            elems: vec![Value::Char(b'a'), Value::Char(b'b')],
        };
        let s2 = Value::Compound {
            ty: TypeId::STRING,
            elems: vec![Value::Char(b'a'), Value::Char(b'c')],
        };
        assert_eq!(s1.compare(&s2), Some(Ordering::Less));
    }

    #[test]
    fn render_scalars() {
        let pool = TypePool::new();
        let hir = Hir::new();
        let interner = StringInterner::new();
        assert_eq!(render(&Value::Bool(true), &pool, &hir, &interner), "true");
        assert_eq!(render(&Value::Void, &pool, &hir, &interner), "void");
        assert_eq!(
            render(&Value::Int(IntValue::new((-7i64) as u64, IntWidth::W64, true)), &pool, &hir, &interner),
            "-7"
        );
        assert_eq!(render(&Value::Double(1.5), &pool, &hir, &interner), "1.5");
        assert_eq!(render(&Value::Char(b'a'), &pool, &hir, &interner), "a");
        assert_eq!(render(&Value::Char(b'\n'), &pool, &hir, &interner), "\\n");
    }

    #[test]
    fn render_string_and_array() {
        let mut pool = TypePool::new();
        let hir = Hir::new();
        let interner = StringInterner::new();
        let s = Value::Compound {
            ty: TypeId::STRING,
            elems: vec![Value::Char(b'o'), Value::Char(b'k')],
        };
        assert_eq!(render(&s, &pool, &hir, &interner), "ok");

        let ints = pool.array_type(TypeId::INT, 1);
        let arr = Value::Compound {
            ty: ints,
            elems: vec![
                Value::Int(IntValue::new(1, IntWidth::W32, true)),
                Value::Int(IntValue::new(2, IntWidth::W32, true)),
            ],
        };
        assert_eq!(render(&arr, &pool, &hir, &interner), "[1, 2]");
    }

    #[test]
    fn default_values_match_types() {
        let mut pool = TypePool::new();
        assert!(matches!(default_value(&pool, TypeId::BOOL), Some(Value::Bool(false))));
        assert!(default_value(&pool, TypeId::VOID).is_none());
        let pair = pool.tuple_type(vec![TypeId::INT, TypeId::BOOL]);
        match default_value(&pool, pair) {
            Some(Value::Compound { elems, .. }) => assert_eq!(elems.len(), 2),
            other => panic!("unexpected default {other:?}"),
        }
    }
}
