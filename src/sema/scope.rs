// src/sema/scope.rs

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::frontend::ast::ModuleItem;
use crate::frontend::{NameId, Span};
use crate::sema::symbol::{DefinitionId, ScopeId, SymbolId};

/// A point in program order used for visibility checks. Members of a scope
/// are numbered from 1; a location with index k sees members with
/// index < k. Ordering is only meaningful within one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupLocation {
    pub scope: Option<ScopeId>,
    pub index: u32,
}

impl LookupLocation {
    /// Compares before any member of any scope.
    pub const MIN: LookupLocation = LookupLocation {
        scope: None,
        index: 0,
    };

    /// Compares after any member of any scope.
    pub const MAX: LookupLocation = LookupLocation {
        scope: None,
        index: u32::MAX,
    };

    pub fn new(scope: ScopeId, index: u32) -> Self {
        Self {
            scope: Some(scope),
            index,
        }
    }

    /// A location just before the given member index.
    pub fn before(scope: ScopeId, member_index: u32) -> Self {
        Self::new(scope, member_index)
    }

    /// A location just after the given member index.
    pub fn after(scope: ScopeId, member_index: u32) -> Self {
        Self::new(scope, member_index + 1)
    }

    /// Whether a member at `member_index` is visible from this location.
    pub fn sees(&self, member_index: u32) -> bool {
        self.index > member_index
    }
}

/// A wildcard import recorded on a scope; consulted on name-map misses.
#[derive(Debug, Clone)]
pub struct WildcardImport {
    pub package: NameId,
    pub span: Span,
    /// Declaration-order position of the import itself
    pub index: u32,
}

/// Member syntax not yet materialized into symbols.
#[derive(Debug, Clone)]
pub enum DeferredMembers {
    /// The non-parameter items of an instance body; parameters are
    /// materialized eagerly because the body cache is keyed on them.
    Body { definition: DefinitionId },
    /// Items of a generate block or other item list.
    Items { items: Arc<Vec<ModuleItem>> },
}

/// An ordered collection of member symbols with a name index.
#[derive(Debug)]
pub struct Scope {
    pub owner: SymbolId,
    pub members: Vec<SymbolId>,
    pub name_map: FxHashMap<NameId, SymbolId>,
    pub imports: Vec<WildcardImport>,
    pub deferred: Option<DeferredMembers>,
    /// Set once the scope is fully elaborated; late inserts are programmer
    /// errors caught by debug assertions.
    pub elaborated: bool,
}

impl Scope {
    pub fn new(owner: SymbolId) -> Self {
        Self {
            owner,
            members: Vec::new(),
            name_map: FxHashMap::default(),
            imports: Vec::new(),
            deferred: None,
            elaborated: false,
        }
    }

    /// Declaration-order index the next member will get.
    pub fn next_index(&self) -> u32 {
        self.members.len() as u32 + 1
    }

    pub fn needs_materialization(&self) -> bool {
        self.deferred.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_location_ordering() {
        let scope = ScopeId(0);
        let loc = LookupLocation::before(scope, 3);
        assert!(loc.sees(1));
        assert!(loc.sees(2));
        assert!(!loc.sees(3));
        assert!(!loc.sees(4));

        let after = LookupLocation::after(scope, 3);
        assert!(after.sees(3));
        assert!(!after.sees(4));

        assert!(LookupLocation::MAX.sees(u32::MAX - 1));
        assert!(!LookupLocation::MIN.sees(0));
    }
}
