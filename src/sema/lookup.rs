// src/sema/lookup.rs
//! Name resolution: unqualified, package-qualified, and hierarchical.

use crate::errors::codes;
use crate::frontend::{NameId, Span};
use crate::sema::compilation::Compilation;
use crate::sema::scope::LookupLocation;
use crate::sema::symbol::{ScopeId, SymbolId, SymbolKind};

/// Additional modifiers for a lookup operation.
pub mod lookup_flags {
    /// No special modifiers.
    pub const NONE: u32 = 0;
    /// Constant context: hierarchical references are not allowed.
    pub const CONSTANT: u32 = 1 << 0;
    /// Type-name lookup: ignores declaration ordering, disallows
    /// hierarchical names.
    pub const TYPE: u32 = 1 << 1;
    /// Ignore declaration ordering.
    pub const ALLOW_DECLARED_AFTER: u32 = 1 << 2;
    /// Don't consult wildcard imports.
    pub const DISALLOW_WILDCARD_IMPORT: u32 = 1 << 3;
}

/// The outcome of resolving a (possibly dotted) name.
#[derive(Debug, Clone, Copy, Default)]
pub struct LookupResult {
    pub found: Option<SymbolId>,
    /// How many path segments were consumed; the binder turns any leftover
    /// segments into member accesses on the found value.
    pub consumed: usize,
    pub was_imported: bool,
    pub is_hierarchical: bool,
}

enum ImportLookup {
    Miss,
    Found(SymbolId),
    Ambiguous,
}

/// The outcome of a single-name lookup. `Poisoned` means a diagnostic was
/// already issued; callers stay quiet.
pub(crate) enum UnqualifiedLookup {
    Found { symbol: SymbolId, imported: bool },
    Miss,
    Poisoned,
}

impl Compilation {
    /// Resolve a single unqualified name by climbing parent scopes from the
    /// given location.
    pub(crate) fn lookup_unqualified(
        &mut self,
        name: NameId,
        location: LookupLocation,
        flags: u32,
        span: Span,
    ) -> UnqualifiedLookup {
        let Some(mut scope) = location.scope else {
            return UnqualifiedLookup::Miss;
        };
        let mut cutoff = location.index;
        loop {
            self.ensure_members(scope);
            if let Some(&sym) = self.scope(scope).name_map.get(&name) {
                if self.member_visible(sym, cutoff, flags) {
                    return UnqualifiedLookup::Found {
                        symbol: sym,
                        imported: false,
                    };
                }
                // Found but not yet declared at this location: report it as
                // such rather than climbing, unless ordering is waived.
                let text = self.interner.resolve(name).to_string();
                self.diag(&codes::LOOKUP_USED_BEFORE_DECLARED, span, vec![text]);
                return UnqualifiedLookup::Found {
                    symbol: sym,
                    imported: false,
                };
            }

            if flags & lookup_flags::DISALLOW_WILDCARD_IMPORT == 0 {
                match self.consult_imports(scope, name, cutoff, span) {
                    ImportLookup::Found(sym) => {
                        return UnqualifiedLookup::Found {
                            symbol: sym,
                            imported: true,
                        }
                    }
                    ImportLookup::Ambiguous => return UnqualifiedLookup::Poisoned,
                    ImportLookup::Miss => {}
                }
            }

            match self.parent_of(scope) {
                Some((parent, owner_index)) => {
                    scope = parent;
                    // In the parent, only members before the owner are
                    // visible.
                    cutoff = owner_index;
                }
                None => return UnqualifiedLookup::Miss,
            }
        }
    }

    fn member_visible(&self, sym: SymbolId, cutoff: u32, flags: u32) -> bool {
        if flags & (lookup_flags::ALLOW_DECLARED_AFTER | lookup_flags::TYPE) != 0 {
            return true;
        }
        self.symbol(sym).index < cutoff
    }

    fn consult_imports(
        &mut self,
        scope: ScopeId,
        name: NameId,
        cutoff: u32,
        span: Span,
    ) -> ImportLookup {
        let imports: Vec<_> = self
            .scope(scope)
            .imports
            .iter()
            .filter(|i| i.index <= cutoff || cutoff == u32::MAX)
            .cloned()
            .collect();
        let mut found: Option<SymbolId> = None;
        for import in imports {
            let Some(pkg) = self.package_names.get(&import.package).copied() else {
                continue;
            };
            let Some(pkg_scope) = self.symbol(pkg).owned_scope() else {
                continue;
            };
            self.ensure_members(pkg_scope);
            if let Some(&sym) = self.scope(pkg_scope).name_map.get(&name) {
                match found {
                    Some(existing) if existing != sym => {
                        let text = self.interner.resolve(name).to_string();
                        self.diag(&codes::LOOKUP_AMBIGUOUS_IMPORT, span, vec![text]);
                        return ImportLookup::Ambiguous;
                    }
                    _ => found = Some(sym),
                }
            }
        }
        match found {
            Some(sym) => ImportLookup::Found(sym),
            None => ImportLookup::Miss,
        }
    }

    /// Resolve a package-qualified name (pkg::member).
    pub(crate) fn lookup_package_member(
        &mut self,
        package: NameId,
        pkg_span: Span,
        member: NameId,
        member_span: Span,
    ) -> Option<SymbolId> {
        let Some(pkg) = self.package_names.get(&package).copied() else {
            let text = self.interner.resolve(package).to_string();
            self.diag(&codes::LOOKUP_UNKNOWN_PACKAGE, pkg_span, vec![text]);
            return None;
        };
        let pkg_scope = self.symbol(pkg).owned_scope()?;
        self.ensure_members(pkg_scope);
        match self.scope(pkg_scope).name_map.get(&member).copied() {
            Some(sym) => Some(sym),
            None => {
                let member_text = self.interner.resolve(member).to_string();
                let pkg_text = self.interner.resolve(package).to_string();
                self.diag(
                    &codes::LOOKUP_UNKNOWN_MEMBER,
                    member_span,
                    vec![member_text, pkg_text],
                );
                None
            }
        }
    }

    /// Resolve a dotted name from the given location. Emits diagnostics on
    /// failure; a `found` of None means the caller should poison.
    pub(crate) fn lookup_name(
        &mut self,
        path: &[(NameId, Span)],
        location: LookupLocation,
        flags: u32,
    ) -> LookupResult {
        debug_assert!(!path.is_empty());
        let (head, head_span) = path[0];

        match self.lookup_unqualified(head, location, flags, head_span) {
            UnqualifiedLookup::Found { symbol, imported } => {
                return self.descend_path(symbol, path, 1, imported, flags);
            }
            UnqualifiedLookup::Poisoned => return LookupResult::default(),
            UnqualifiedLookup::Miss => {}
        }

        // Upward lookup through the instance hierarchy.
        if flags & (lookup_flags::CONSTANT | lookup_flags::TYPE) == 0 {
            if let Some(result) = self.lookup_upward(path, location) {
                return result;
            }
        }

        // Nothing found anywhere; try typo correction before reporting.
        let text = self.interner.resolve(head).to_string();
        if path.len() > 1 && self.options().lint_mode {
            // Hierarchical misses depend on the elaborated design.
            return LookupResult::default();
        }
        if let Some(suggestion) = self.typo_correct(head, location) {
            self.diag(
                &codes::LOOKUP_SUGGEST_SPELLING,
                head_span,
                vec![text, suggestion],
            );
        } else {
            self.diag(&codes::LOOKUP_UNDEFINED_NAME, head_span, vec![text]);
        }
        LookupResult::default()
    }

    // Walk the remaining segments of a dotted name down through child
    // scopes. Stops early when the current symbol is a plain value; the
    // binder handles the rest as member selects.
    fn descend_path(
        &mut self,
        mut current: SymbolId,
        path: &[(NameId, Span)],
        mut consumed: usize,
        was_imported: bool,
        flags: u32,
    ) -> LookupResult {
        let mut is_hierarchical = false;
        while consumed < path.len() {
            let (segment, segment_span) = path[consumed];
            let scope = match &self.symbol(current).kind {
                SymbolKind::Instance { body, .. } => {
                    is_hierarchical = true;
                    *body
                }
                SymbolKind::Package { scope }
                | SymbolKind::InstanceBody { scope, .. }
                | SymbolKind::GenerateBlock { scope }
                | SymbolKind::StatementBlock { scope } => *scope,
                _ => break,
            };
            self.ensure_members(scope);
            match self.scope(scope).name_map.get(&segment).copied() {
                Some(next) => {
                    current = next;
                    consumed += 1;
                }
                None => {
                    if self.options().lint_mode {
                        return LookupResult::default();
                    }
                    let segment_text = self.interner.resolve(segment).to_string();
                    let owner = self.scope(scope).owner;
                    let owner_text = self.interner.resolve(self.symbol(owner).name).to_string();
                    self.diag(
                        &codes::LOOKUP_UNKNOWN_MEMBER,
                        segment_span,
                        vec![segment_text, owner_text],
                    );
                    return LookupResult::default();
                }
            }
        }

        if is_hierarchical && flags & lookup_flags::CONSTANT != 0 {
            let (head, head_span) = path[0];
            let text = self.interner.resolve(head).to_string();
            self.diag(&codes::LOOKUP_HIERARCHICAL_NOT_ALLOWED, head_span, vec![text]);
            return LookupResult::default();
        }

        LookupResult {
            found: Some(current),
            consumed,
            was_imported,
            is_hierarchical,
        }
    }

    // Walk the instance path outward. At each enclosing instance body the
    // head can match a member of that body or the name of an instance that
    // uses the body; the outermost stop is the root scope's top instances.
    // A body's lexical parent is its defining compilation unit, so the walk
    // follows the instantiation sites instead.
    fn lookup_upward(
        &mut self,
        path: &[(NameId, Span)],
        location: LookupLocation,
    ) -> Option<LookupResult> {
        let (head, _) = path[0];
        let mut scope = location.scope;
        while let Some(current) = scope {
            let owner = self.scope(current).owner;
            if matches!(self.symbol(owner).kind, SymbolKind::InstanceBody { .. }) {
                self.ensure_members(current);
                if let Some(&sym) = self.scope(current).name_map.get(&head) {
                    let mut result = self.descend_path(
                        sym,
                        path,
                        1,
                        false,
                        lookup_flags::ALLOW_DECLARED_AFTER,
                    );
                    result.is_hierarchical = true;
                    return Some(result);
                }
                let parents = self
                    .instance_parents
                    .get(&current)
                    .cloned()
                    .unwrap_or_default();
                for &inst in &parents {
                    if self.symbol(inst).name == head {
                        let mut result = self.descend_path(
                            inst,
                            path,
                            1,
                            false,
                            lookup_flags::ALLOW_DECLARED_AFTER,
                        );
                        result.is_hierarchical = true;
                        return Some(result);
                    }
                }
                // Continue through the instantiation site.
                scope = parents.first().and_then(|&i| self.symbol(i).parent);
                continue;
            }
            scope = self.parent_of(current).map(|(p, _)| p);
        }

        // Top instances live in the root scope.
        let root = self.root()?;
        let root_scope = self.symbol(root).owned_scope()?;
        if let Some(&sym) = self.scope(root_scope).name_map.get(&head) {
            let mut result =
                self.descend_path(sym, path, 1, false, lookup_flags::ALLOW_DECLARED_AFTER);
            result.is_hierarchical = true;
            return Some(result);
        }
        None
    }

    pub(crate) fn parent_of(&self, scope: ScopeId) -> Option<(ScopeId, u32)> {
        let owner = self.scope(scope).owner;
        let sym = self.symbol(owner);
        sym.parent.map(|p| (p, sym.index))
    }

    // Bounded edit-distance suggestion over names visible at the failing
    // scope, including wildcard imports.
    fn typo_correct(&mut self, name: NameId, location: LookupLocation) -> Option<String> {
        if self.typo_corrections >= self.options().typo_correction_limit {
            return None;
        }
        self.typo_corrections += 1;

        let target = self.interner.resolve(name).to_string();
        let mut candidates: Vec<NameId> = Vec::new();
        let mut scope = location.scope;
        while let Some(current) = scope {
            candidates.extend(self.scope(current).name_map.keys().copied());
            for import in self.scope(current).imports.clone() {
                if let Some(pkg) = self.package_names.get(&import.package).copied() {
                    if let Some(pkg_scope) = self.symbol(pkg).owned_scope() {
                        self.ensure_members(pkg_scope);
                        candidates.extend(self.scope(pkg_scope).name_map.keys().copied());
                    }
                }
            }
            scope = self.parent_of(current).map(|(p, _)| p);
        }

        let mut best: Option<(usize, String)> = None;
        for candidate in candidates {
            let text = self.interner.resolve(candidate);
            let distance = strsim::levenshtein(&target, text);
            // A useful suggestion shares most of its characters with the
            // name that missed; short names never qualify.
            if distance == 0 || distance > 2 || distance >= target.chars().count() {
                continue;
            }
            match &best {
                Some((d, _)) if *d <= distance => {}
                _ => best = Some((distance, text.to_string())),
            }
        }
        best.map(|(_, text)| text)
    }
}
