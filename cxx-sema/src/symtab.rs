//! The symbol table: a tree of `{Namespace, Class, Function, Block}` scopes
//! with qualified-path lookup and insertion-ordered overload sets.

use cxx_ast::{DeclId, Symbol};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Namespace,
    Class,
    Function,
    Block,
}

struct Scope {
    kind: ScopeKind,
    name: Option<Symbol>,
    parent: Option<usize>,
    children: HashMap<Symbol, usize>,
    /// Insertion-ordered per the invariant: "overload sets are
    /// insertion-ordered; lookup is stable under re-instantiation."
    names: HashMap<Symbol, Vec<DeclId>>,
}

/// A scope tree plus a cursor (`open`) tracking the scope currently being
/// parsed. The tree itself persists after parsing so qualified lookup
/// (`Foo::Bar::baz`) can be answered long after the parser has moved on.
pub struct SymbolTable {
    scopes: Vec<Scope>,
    open: Vec<usize>,
}

const ROOT: usize = 0;

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                kind: ScopeKind::Namespace,
                name: None,
                parent: None,
                children: HashMap::new(),
                names: HashMap::new(),
            }],
            open: vec![ROOT],
        }
    }

    fn current(&self) -> usize {
        *self.open.last().unwrap_or(&ROOT)
    }

    /// Enter a nested scope, creating it if this is the first visit (e.g. a
    /// namespace reopened across translation-unit fragments shares its
    /// scope; a fresh class or function body never does).
    pub fn push_scope(&mut self, kind: ScopeKind, name: Option<Symbol>) -> usize {
        let parent = self.current();
        if let (ScopeKind::Namespace, Some(n)) = (kind, name) {
            if let Some(&existing) = self.scopes[parent].children.get(&n) {
                if self.scopes[existing].kind == ScopeKind::Namespace {
                    self.open.push(existing);
                    return existing;
                }
            }
        }
        let idx = self.scopes.len();
        self.scopes.push(Scope {
            kind,
            name,
            parent: Some(parent),
            children: HashMap::new(),
            names: HashMap::new(),
        });
        if let Some(n) = name {
            self.scopes[parent].children.insert(n, idx);
        }
        self.open.push(idx);
        idx
    }

    pub fn pop_scope(&mut self) {
        if self.open.len() > 1 {
            self.open.pop();
        }
    }

    /// Declare `name` in the currently-open scope, appending to its
    /// overload set.
    pub fn declare(&mut self, name: Symbol, decl: DeclId) {
        let cur = self.current();
        self.scopes[cur].names.entry(name).or_default().push(decl);
    }

    pub fn declare_in(&mut self, scope: usize, name: Symbol, decl: DeclId) {
        self.scopes[scope].names.entry(name).or_default().push(decl);
    }

    /// Unqualified lookup: walk outward from the currently-open scope,
    /// returning the first non-empty overload set found.
    pub fn lookup(&self, name: Symbol) -> Vec<DeclId> {
        let mut scope = Some(self.current());
        while let Some(idx) = scope {
            if let Some(found) = self.scopes[idx].names.get(&name) {
                return found.clone();
            }
            scope = self.scopes[idx].parent;
        }
        Vec::new()
    }

    /// Qualified lookup following an explicit namespace/class path:
    /// `A::B::name`.
    pub fn lookup_qualified(&self, path: &[Symbol], name: Symbol) -> Vec<DeclId> {
        let mut scope = ROOT;
        for &segment in path {
            match self.scopes[scope].children.get(&segment) {
                Some(&next) => scope = next,
                None => return Vec::new(),
            }
        }
        self.scopes[scope]
            .names
            .get(&name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn current_kind(&self) -> ScopeKind {
        self.scopes[self.current()].kind
    }

    /// The fully-qualified namespace/class path of the scope currently
    /// open, innermost last. Consumed by the mangler's namespace-path
    /// encoding.
    pub fn current_path(&self) -> Vec<Symbol> {
        let mut path = Vec::new();
        let mut scope = Some(self.current());
        while let Some(idx) = scope {
            if let Some(n) = self.scopes[idx].name {
                path.push(n);
            }
            scope = self.scopes[idx].parent;
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxx_ast::Interner;

    #[test]
    fn unqualified_lookup_walks_outward_and_stops_at_first_match() {
        let interner = Interner::new();
        let mut table = SymbolTable::new();
        let ns = interner.intern("app");
        let f = interner.intern("helper");

        table.push_scope(ScopeKind::Namespace, Some(ns));
        table.declare(f, DeclId(1));
        table.push_scope(ScopeKind::Function, None);
        assert_eq!(table.lookup(f), vec![DeclId(1)]);
    }

    #[test]
    fn overload_set_preserves_insertion_order() {
        let interner = Interner::new();
        let mut table = SymbolTable::new();
        let f = interner.intern("overloaded");
        table.declare(f, DeclId(3));
        table.declare(f, DeclId(1));
        table.declare(f, DeclId(2));
        assert_eq!(table.lookup(f), vec![DeclId(3), DeclId(1), DeclId(2)]);
    }

    #[test]
    fn qualified_lookup_follows_namespace_path() {
        let interner = Interner::new();
        let mut table = SymbolTable::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        let f = interner.intern("deep");

        table.push_scope(ScopeKind::Namespace, Some(a));
        table.push_scope(ScopeKind::Namespace, Some(b));
        table.declare(f, DeclId(9));
        assert_eq!(table.current_path(), vec![a, b]);
        table.pop_scope();
        table.pop_scope();

        assert_eq!(table.lookup_qualified(&[a, b], f), vec![DeclId(9)]);
        assert!(table.lookup_qualified(&[a], f).is_empty());
    }

    #[test]
    fn reopening_a_namespace_shares_its_scope() {
        let interner = Interner::new();
        let mut table = SymbolTable::new();
        let ns = interner.intern("app");
        let f = interner.intern("one");
        let g = interner.intern("two");

        table.push_scope(ScopeKind::Namespace, Some(ns));
        table.declare(f, DeclId(1));
        table.pop_scope();

        table.push_scope(ScopeKind::Namespace, Some(ns));
        table.declare(g, DeclId(2));
        table.pop_scope();

        assert_eq!(table.lookup_qualified(&[ns], f), vec![DeclId(1)]);
        assert_eq!(table.lookup_qualified(&[ns], g), vec![DeclId(2)]);
    }
}
