// src/frontend/intern.rs
//! String interning for names.
//!
//! Every name that flows through the compiler (identifiers, instance
//! names, package names) is interned once and handled as a `NameId`
//! afterwards, so comparisons and map lookups never touch string data.
//! The empty name is interned up front: unnamed symbols (procedural
//! blocks, continuous assigns, defparams) all share `NameId::EMPTY` and
//! never enter any scope's name map.

use rustc_hash::FxHashMap;

/// Unique identifier for an interned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameId(pub u32);

impl NameId {
    /// The pre-interned empty name carried by unnamed symbols.
    pub const EMPTY: NameId = NameId(0);
}

pub struct Interner {
    names: Vec<Box<str>>,
    index: FxHashMap<Box<str>, NameId>,
}

impl Interner {
    pub fn new() -> Self {
        let mut interner = Self {
            names: Vec::new(),
            index: FxHashMap::default(),
        };
        let empty = interner.intern("");
        debug_assert_eq!(empty, NameId::EMPTY);
        interner
    }

    pub fn intern(&mut self, text: &str) -> NameId {
        if let Some(&id) = self.index.get(text) {
            return id;
        }
        let id = NameId(self.names.len() as u32);
        let stored: Box<str> = text.into();
        self.names.push(stored.clone());
        self.index.insert(stored, id);
        id
    }

    /// Look up an already-interned string without inserting.
    pub fn get(&self, text: &str) -> Option<NameId> {
        self.index.get(text).copied()
    }

    pub fn resolve(&self, id: NameId) -> &str {
        &self.names[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over every interned string with its id.
    pub fn iter(&self) -> impl Iterator<Item = (NameId, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, s)| (NameId(i as u32), s.as_ref()))
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Interner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interner")
            .field("names", &self.names.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_preinterned() {
        let mut interner = Interner::new();
        assert_eq!(interner.resolve(NameId::EMPTY), "");
        assert_eq!(interner.intern(""), NameId::EMPTY);
    }

    #[test]
    fn interning_is_idempotent() {
        let mut interner = Interner::new();
        let a = interner.intern("clk");
        let b = interner.intern("clk");
        let c = interner.intern("rst_n");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.resolve(a), "clk");
        assert_eq!(interner.resolve(c), "rst_n");
    }

    #[test]
    fn get_does_not_insert() {
        let mut interner = Interner::new();
        let before = interner.len();
        assert_eq!(interner.get("data"), None);
        assert_eq!(interner.len(), before);
        let id = interner.intern("data");
        assert_eq!(interner.get("data"), Some(id));
    }

    #[test]
    fn iter_walks_in_id_order() {
        let mut interner = Interner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        let collected: Vec<_> = interner.iter().collect();
        assert_eq!(collected[0], (NameId::EMPTY, ""));
        assert_eq!(collected[1], (a, "a"));
        assert_eq!(collected[2], (b, "b"));
    }
}
