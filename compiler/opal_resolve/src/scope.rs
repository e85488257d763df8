//! The lexical scope tree.
//!
//! Scopes form a tree of name environments: the root module, nested
//! modules, struct scopes, subroutine scopes (parameters), and anonymous
//! block scopes. Each scope owns a map from identifier to a tagged
//! [`ScopeName`] handle.
//!
//! Insertion enforces two rules: no two entries share an identifier in one
//! scope, and a new name may not shadow a binding visible in any ancestor
//! scope.

use opal_diagnostic::Diagnostic;
use opal_ir::{ExternId, Name, ScopeId, Span, StringInterner, StructId, SubrId, TypeId, VarId};
use opal_types::{TypeData, TypePool};
use rustc_hash::FxHashMap;

/// What kind of scope a node is. Named kinds carry their name inline so
/// path construction does not need the type pool.
#[derive(Clone, Debug)]
pub enum ScopeKind {
    Module(Name),
    Struct(Name, StructId),
    Subroutine(Name, SubrId),
    /// Anonymous; auto-indexed `_B<n>`.
    Block(u32),
}

/// A tagged name record: what an identifier denotes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScopeName {
    Module(ScopeId),
    Struct(TypeId),
    Enum(TypeId),
    Typedef(TypeId),
    Subroutine(SubrId),
    Extern(ExternId),
    Variable(VarId),
}

impl ScopeName {
    /// Category word used in collision diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            ScopeName::Module(_) => "module",
            ScopeName::Struct(_) => "struct",
            ScopeName::Enum(_) => "enum",
            ScopeName::Typedef(_) => "typedef",
            ScopeName::Subroutine(_) => "subroutine",
            ScopeName::Extern(_) => "subroutine",
            ScopeName::Variable(_) => "variable",
        }
    }
}

#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    names: FxHashMap<Name, ScopeName>,
}

/// Arena of scopes. [`ScopeId::ROOT`] is the global module scope.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    next_block: u32,
}

impl ScopeTree {
    /// Create the tree with the (unnamed) global module scope.
    pub fn new() -> Self {
        ScopeTree {
            scopes: vec![Scope {
                kind: ScopeKind::Module(Name::EMPTY),
                parent: None,
                children: Vec::new(),
                names: FxHashMap::default(),
            }],
            next_block: 0,
        }
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn new_scope(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let id = ScopeId::from_usize(self.scopes.len());
        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            children: Vec::new(),
            names: FxHashMap::default(),
        });
        self.scopes[parent.index()].children.push(id);
        id
    }

    /// Create an anonymous block scope named `_B<n>`.
    pub fn new_block_scope(&mut self, parent: ScopeId) -> ScopeId {
        let index = self.next_block;
        self.next_block += 1;
        self.new_scope(ScopeKind::Block(index), parent)
    }

    /// Local lookup only.
    pub fn lookup(&self, scope: ScopeId, name: Name) -> Option<ScopeName> {
        self.scope(scope).names.get(&name).copied()
    }

    /// Insert a name, rejecting collisions in this scope and shadowing of
    /// any ancestor binding.
    pub fn insert(
        &mut self,
        scope: ScopeId,
        name: Name,
        entry: ScopeName,
        span: Span,
        interner: &StringInterner,
    ) -> Result<(), Diagnostic> {
        if self.scope(scope).names.contains_key(&name) {
            return Err(Diagnostic::error(
                span,
                format!(
                    "{} {} causes scope name conflict",
                    entry.category(),
                    interner.lookup(name)
                ),
            ));
        }
        self.shadow_check(scope, name, span, interner)?;
        self.scopes[scope.index()].names.insert(name, entry);
        Ok(())
    }

    /// Reject a declaration whose identifier already resolves in this
    /// scope or any ancestor.
    pub fn shadow_check(
        &self,
        scope: ScopeId,
        name: Name,
        span: Span,
        interner: &StringInterner,
    ) -> Result<(), Diagnostic> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            if self.lookup(id, name).is_some() {
                return Err(Diagnostic::error(
                    span,
                    format!(
                        "name {} shadows a previous declaration",
                        interner.lookup(name)
                    ),
                ));
            }
            cursor = self.scope(id).parent;
        }
        Ok(())
    }

    /// Qualified lookup of a member path, resolving the longest prefix to
    /// a name. A prefix that reaches a module or struct scope descends
    /// into it; on failure the search restarts from the parent scope
    /// (lexical lookup). Returns the name record and how many path parts
    /// it consumed; the remainder is a struct-member chain for the
    /// caller.
    pub fn find_name(
        &self,
        pool: &TypePool,
        from: ScopeId,
        parts: &[Name],
    ) -> Option<(ScopeName, usize)> {
        let mut start = Some(from);
        while let Some(scope) = start {
            if let Some(found) = self.resolve_in(pool, scope, parts) {
                return Some(found);
            }
            start = self.scope(scope).parent;
        }
        None
    }

    fn resolve_in(
        &self,
        pool: &TypePool,
        scope: ScopeId,
        parts: &[Name],
    ) -> Option<(ScopeName, usize)> {
        let mut cur = scope;
        let mut consumed = 0;
        loop {
            let entry = self.lookup(cur, parts[consumed])?;
            consumed += 1;
            if consumed == parts.len() {
                return Some((entry, consumed));
            }
            match entry {
                ScopeName::Module(m) => cur = m,
                ScopeName::Struct(ty) => match pool.data(pool.canonicalize(ty)) {
                    TypeData::Struct(sid) => cur = pool.struct_def(*sid).scope,
                    _ => return Some((entry, consumed)),
                },
                // Anything else ends the scope walk; the remaining parts
                // are member accesses on the named entity.
                _ => return Some((entry, consumed)),
            }
        }
    }

    /// Local name of a scope: module/struct/subroutine name, or `_B<n>`
    /// for blocks.
    pub fn local_name(&self, id: ScopeId, interner: &StringInterner) -> String {
        match &self.scope(id).kind {
            ScopeKind::Module(name)
            | ScopeKind::Struct(name, _)
            | ScopeKind::Subroutine(name, _) => interner.lookup(*name).to_string(),
            ScopeKind::Block(index) => format!("_B{index}"),
        }
    }

    /// Underscore-joined path from the root; empty components (the root
    /// module) are skipped, so `main`'s path is exactly `main`.
    pub fn full_path(&self, id: ScopeId, interner: &StringInterner) -> String {
        let local = self.local_name(id, interner);
        match self.scope(id).parent {
            Some(parent) => {
                let prefix = self.full_path(parent, interner);
                if prefix.is_empty() {
                    local
                } else if local.is_empty() {
                    prefix
                } else {
                    format!("{prefix}_{local}")
                }
            }
            None => local,
        }
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (ScopeTree, TypePool, StringInterner) {
        (ScopeTree::new(), TypePool::new(), StringInterner::new())
    }

    #[test]
    fn insert_and_local_lookup() {
        let (mut tree, _pool, interner) = setup();
        let x = interner.intern("x");
        tree.insert(
            ScopeId::ROOT,
            x,
            ScopeName::Variable(VarId::new(0)),
            Span::DUMMY,
            &interner,
        )
        .unwrap();
        assert_eq!(
            tree.lookup(ScopeId::ROOT, x),
            Some(ScopeName::Variable(VarId::new(0)))
        );
    }

    #[test]
    fn collision_names_category() {
        let (mut tree, _pool, interner) = setup();
        let x = interner.intern("x");
        tree.insert(
            ScopeId::ROOT,
            x,
            ScopeName::Variable(VarId::new(0)),
            Span::DUMMY,
            &interner,
        )
        .unwrap();
        let err = tree
            .insert(
                ScopeId::ROOT,
                x,
                ScopeName::Subroutine(SubrId::new(0)),
                Span::DUMMY,
                &interner,
            )
            .unwrap_err();
        assert!(err.message.contains("subroutine x"));
        assert!(err.message.contains("conflict"));
    }

    #[test]
    fn shadowing_is_rejected() {
        let (mut tree, _pool, interner) = setup();
        let x = interner.intern("x");
        tree.insert(
            ScopeId::ROOT,
            x,
            ScopeName::Variable(VarId::new(0)),
            Span::DUMMY,
            &interner,
        )
        .unwrap();
        let inner = tree.new_block_scope(ScopeId::ROOT);
        let err = tree
            .insert(
                inner,
                x,
                ScopeName::Variable(VarId::new(1)),
                Span::DUMMY,
                &interner,
            )
            .unwrap_err();
        assert!(err.message.contains("shadows"));
    }

    #[test]
    fn qualified_lookup_through_module() {
        let (mut tree, pool, interner) = setup();
        let m = interner.intern("m");
        let f = interner.intern("f");
        let mscope = tree.new_scope(ScopeKind::Module(m), ScopeId::ROOT);
        tree.insert(ScopeId::ROOT, m, ScopeName::Module(mscope), Span::DUMMY, &interner)
            .unwrap();
        tree.insert(mscope, f, ScopeName::Subroutine(SubrId::new(7)), Span::DUMMY, &interner)
            .unwrap();

        // Qualified from the root.
        let (entry, consumed) = tree.find_name(&pool, ScopeId::ROOT, &[m, f]).unwrap();
        assert_eq!(entry, ScopeName::Subroutine(SubrId::new(7)));
        assert_eq!(consumed, 2);

        // Lexical fallback: from inside the module, `f` alone resolves.
        let (entry, _) = tree.find_name(&pool, mscope, &[f]).unwrap();
        assert_eq!(entry, ScopeName::Subroutine(SubrId::new(7)));
    }

    #[test]
    fn prefix_resolution_leaves_member_remainder() {
        let (mut tree, pool, interner) = setup();
        let v = interner.intern("v");
        let x = interner.intern("x");
        tree.insert(ScopeId::ROOT, v, ScopeName::Variable(VarId::new(3)), Span::DUMMY, &interner)
            .unwrap();
        let (entry, consumed) = tree.find_name(&pool, ScopeId::ROOT, &[v, x]).unwrap();
        assert_eq!(entry, ScopeName::Variable(VarId::new(3)));
        assert_eq!(consumed, 1);
    }

    #[test]
    fn block_scopes_are_auto_indexed() {
        let (mut tree, _pool, interner) = setup();
        let a = tree.new_block_scope(ScopeId::ROOT);
        let b = tree.new_block_scope(ScopeId::ROOT);
        assert_eq!(tree.local_name(a, &interner), "_B0");
        assert_eq!(tree.local_name(b, &interner), "_B1");
    }

    #[test]
    fn full_path_skips_root() {
        let (mut tree, _pool, interner) = setup();
        let main = interner.intern("main");
        let ms = tree.new_scope(ScopeKind::Subroutine(main, SubrId::new(0)), ScopeId::ROOT);
        assert_eq!(tree.full_path(ms, &interner), "main");
        let inner = tree.new_block_scope(ms);
        assert_eq!(tree.full_path(inner, &interner), "main_B0");
    }
}
