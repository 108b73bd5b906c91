//! String interning for identifiers, mangled names, and file paths.
//!
//! Handles are stable for the process lifetime: equal handles imply equal
//! content, and a handle never moves once assigned (see invariants in
//! SPEC_FULL.md section 3). The `0` bit pattern is unrepresentable because
//! `Symbol` wraps `NonZeroU32`, so `Symbol` has no reserved-invalid value to
//! check for at runtime.

use dashmap::DashMap;
use std::num::NonZeroU32;
use std::sync::Arc;

/// A stable handle to an interned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(NonZeroU32);

impl Symbol {
    /// Only `Interner` may mint symbols; index is 1-based so `0` stays an
    /// unrepresentable `Symbol` rather than a valid-but-reserved one.
    fn from_index(idx: u32) -> Self {
        const ONE: NonZeroU32 = match NonZeroU32::new(1) {
            Some(v) => v,
            None => panic!("1 is never zero"),
        };
        Symbol(NonZeroU32::new(idx.saturating_add(1)).unwrap_or(ONE))
    }

    fn as_index(self) -> u32 {
        self.0.get() - 1
    }
}

/// Concurrent string interner, shared by every phase of the pipeline.
///
/// Kept `DashMap`-backed so a driver running multiple translation units
/// process compiling several translation units on separate threads shares one
/// table instead of duplicating common identifiers per thread.
pub struct Interner {
    by_str: DashMap<Arc<str>, Symbol>,
    by_idx: boxcar::Vec<Arc<str>>,
}

/// Minimal append-only, index-stable vector used by the interner so that
/// `by_idx` entries are never reallocated out from under a concurrently held
/// `Symbol`. We don't take a crate dependency for this; it's a handful of
/// lines and the append discipline is the same one `typed_arena` gives us.
mod boxcar {
    use std::sync::RwLock;

    pub struct Vec<T> {
        inner: RwLock<std::vec::Vec<std::sync::Arc<T>>>,
    }

    impl<T> Vec<T> {
        pub fn new() -> Self {
            Self {
                inner: RwLock::new(std::vec::Vec::new()),
            }
        }

        pub fn push(&self, value: std::sync::Arc<T>) -> u32 {
            let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
            let idx = guard.len() as u32;
            guard.push(value);
            idx
        }

        pub fn get(&self, idx: u32) -> std::sync::Arc<T> {
            let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
            guard[idx as usize].clone()
        }
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    pub fn new() -> Self {
        Self {
            by_str: DashMap::new(),
            by_idx: boxcar::Vec::new(),
        }
    }

    /// Intern `text`, returning the stable symbol for it. Calling this twice
    /// with equal content always returns the same `Symbol`.
    pub fn intern(&self, text: &str) -> Symbol {
        if let Some(existing) = self.by_str.get(text) {
            return *existing;
        }
        let arc: Arc<str> = Arc::from(text);
        let idx = self.by_idx.push(arc.clone());
        let sym = Symbol::from_index(idx);
        // Another thread may have raced us; entry() makes the final mapping
        // consistent regardless of who wins.
        *self.by_str.entry(arc).or_insert(sym)
    }

    /// Resolve a symbol back to its text in O(1).
    pub fn resolve(&self, sym: Symbol) -> Arc<str> {
        self.by_idx.get(sym.as_index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable_and_deduplicates() {
        let interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        let c = interner.intern("bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(&*interner.resolve(a), "foo");
        assert_eq!(&*interner.resolve(c), "bar");
    }

    #[test]
    fn distinct_symbols_never_collide_across_many_entries() {
        let interner = Interner::new();
        let symbols: std::vec::Vec<_> = (0..2000)
            .map(|i| interner.intern(&format!("ident_{i}")))
            .collect();
        let mut dedup = symbols.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), symbols.len());
    }
}
