//! String interner for identifiers and string literals.
//!
//! Interning gives O(1) equality and hashing on names and lets the token
//! stream stay `Copy`-friendly. The interner uses an internal `RwLock` so
//! that interning works through a shared reference (the lexer and parser
//! only ever hold `&StringInterner`); the compiler itself is
//! single-threaded.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Handle to an interned string.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Name(u32);

impl Name {
    /// The empty string, pre-interned at index 0.
    pub const EMPTY: Name = Name(0);

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Debug for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

struct InternTable {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

/// Interner mapping strings to [`Name`] handles.
///
/// Interned strings are leaked to obtain the `'static` lifetime; they live
/// for the whole compilation, matching the lifetime of the name tables that
/// reference them.
pub struct StringInterner {
    table: RwLock<InternTable>,
}

impl StringInterner {
    pub fn new() -> Self {
        let mut table = InternTable {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(256),
        };
        // Pre-intern the empty string so Name::EMPTY is always valid.
        table.map.insert("", 0);
        table.strings.push("");
        StringInterner {
            table: RwLock::new(table),
        }
    }

    /// Intern a string, returning its handle.
    pub fn intern(&self, s: &str) -> Name {
        {
            let guard = self.table.read();
            if let Some(&idx) = guard.map.get(s) {
                return Name(idx);
            }
        }
        let mut guard = self.table.write();
        // Re-check after acquiring the write lock.
        if let Some(&idx) = guard.map.get(s) {
            return Name(idx);
        }
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let idx = u32::try_from(guard.strings.len()).expect("interner exceeds u32 entries");
        guard.strings.push(leaked);
        guard.map.insert(leaked, idx);
        Name(idx)
    }

    /// Intern an owned string without re-allocating.
    pub fn intern_owned(&self, s: String) -> Name {
        {
            let guard = self.table.read();
            if let Some(&idx) = guard.map.get(s.as_str()) {
                return Name(idx);
            }
        }
        let mut guard = self.table.write();
        if let Some(&idx) = guard.map.get(s.as_str()) {
            return Name(idx);
        }
        let leaked: &'static str = Box::leak(s.into_boxed_str());
        let idx = u32::try_from(guard.strings.len()).expect("interner exceeds u32 entries");
        guard.strings.push(leaked);
        guard.map.insert(leaked, idx);
        Name(idx)
    }

    /// Look up the string for a handle.
    ///
    /// The returned reference is `'static` because interned strings are
    /// never deallocated.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.table.read().strings[name.0 as usize]
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.table.read().strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_and_lookup() {
        let interner = StringInterner::new();
        let a = interner.intern("alpha");
        let b = interner.intern("beta");
        let a2 = interner.intern("alpha");

        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(interner.lookup(a), "alpha");
        assert_eq!(interner.lookup(b), "beta");
    }

    #[test]
    fn empty_string_is_name_empty() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
        assert_eq!(interner.lookup(Name::EMPTY), "");
    }

    #[test]
    fn intern_owned_matches_intern() {
        let interner = StringInterner::new();
        let a = interner.intern("shared");
        let b = interner.intern_owned(String::from("shared"));
        assert_eq!(a, b);
    }
}
