// src/sema/compilation.rs
//! The central registry that owns every long-lived semantic object.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::errors::{codes, DiagCode, Diagnostic, Diagnostics};
use crate::frontend::ast::{DefinitionDecl, DefinitionKind, Item, ModuleItem, SourceUnit};
use crate::frontend::{Interner, NameId, Parser, Span};
use crate::sema::scope::{DeferredMembers, LookupLocation, Scope};
use crate::sema::symbol::{DefinitionId, ScopeId, Symbol, SymbolId, SymbolKind};
use crate::sema::type_arena::TypeArena;
use crate::value::ConstantValue;

/// Which set of min:typ:max expressions is used during compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MinTypMax {
    Min,
    #[default]
    Typ,
    Max,
}

/// Options controlling compilation behavior.
#[derive(Debug, Clone)]
pub struct CompilationOptions {
    /// Maximum depth of nested module instances, to catch recursion.
    pub max_instance_depth: u32,
    /// Maximum steps when expanding a single generate construct.
    pub max_generate_steps: u32,
    /// Maximum nested function calls in constant expressions.
    pub max_consteval_depth: u32,
    /// Maximum steps when evaluating a constant expression.
    pub max_consteval_steps: u32,
    /// Maximum call frames shown in constant-evaluation backtraces.
    pub max_consteval_backtrace: u32,
    /// Maximum iterations when resolving defparam values.
    pub max_defparam_steps: u32,
    /// Errors found before tree walking short-circuits.
    pub error_limit: u32,
    /// Attempts at typo correction before giving up.
    pub typo_correction_limit: u32,
    pub min_typ_max: MinTypMax,
    /// Suppress errors that need an elaborated design to be meaningful.
    pub lint_mode: bool,
    /// Suppress warnings about unused code elements.
    pub suppress_unused: bool,
    /// Give every instance its own body instead of sharing.
    pub disable_instance_caching: bool,
    /// Explicit top modules; empty means auto-detect.
    pub top_modules: Vec<String>,
    /// name=value overrides applied to top-level parameters.
    pub param_overrides: Vec<String>,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            max_instance_depth: 512,
            max_generate_steps: 65535,
            max_consteval_depth: 256,
            max_consteval_steps: 100_000,
            max_consteval_backtrace: 10,
            max_defparam_steps: 128,
            error_limit: 64,
            typo_correction_limit: 32,
            min_typ_max: MinTypMax::default(),
            lint_mode: false,
            suppress_unused: true,
            disable_instance_caching: false,
            top_modules: Vec::new(),
            param_overrides: Vec::new(),
        }
    }
}

/// API-level failures; semantic problems are diagnostics, never errors.
#[derive(Debug, Error)]
pub enum CompilationError {
    #[error("cannot add syntax trees after the compilation is finalized")]
    Finalized,
}

/// A tree of parameter overrides assembled from defparams and command-line
/// values. Child nodes are keyed by instance name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamOverrideNode {
    pub overrides: FxHashMap<NameId, ConstantValue>,
    pub children: FxHashMap<NameId, ParamOverrideNode>,
}

impl ParamOverrideNode {
    pub fn child(&self, name: NameId) -> Option<&ParamOverrideNode> {
        self.children.get(&name)
    }

    fn node_at_path_mut(&mut self, path: &[NameId]) -> &mut ParamOverrideNode {
        let mut node = self;
        for name in path {
            node = node.children.entry(*name).or_default();
        }
        node
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty() && self.children.is_empty()
    }
}

/// A module/interface/program template that instances elaborate from.
#[derive(Debug)]
pub struct Definition {
    pub name: NameId,
    pub kind: DefinitionKind,
    pub syntax: Arc<DefinitionDecl>,
    /// The compilation-unit scope this definition was declared in
    pub scope: ScopeId,
}

/// A source file registered with the compilation. `base` offsets the file's
/// spans into one global coordinate space.
#[derive(Debug)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
    pub base: usize,
}

/// A centralized location for creating and caching semantic objects:
/// symbols, scopes, types, definitions, and the diagnostic stream.
pub struct Compilation {
    options: CompilationOptions,
    pub interner: Interner,
    pub(crate) types: TypeArena,
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) scopes: Vec<Scope>,
    pub(crate) definitions: Vec<Definition>,
    pub(crate) definition_names: FxHashMap<NameId, DefinitionId>,
    pub(crate) package_names: FxHashMap<NameId, SymbolId>,
    trees: Vec<Arc<SourceUnit>>,
    sources: Vec<SourceFile>,
    diags: Diagnostics,
    /// Set during defparam discovery rounds so speculative elaboration
    /// does not pollute the diagnostic stream.
    suppress_diags: bool,
    root: Option<SymbolId>,
    finalized: bool,
    finalizing: bool,
    definitions_created: bool,
    pub(crate) typo_corrections: u32,
    pub(crate) instance_cache: FxHashMap<(DefinitionId, Vec<(NameId, ConstantValue)>), ScopeId>,
    pub(crate) instance_parents: FxHashMap<ScopeId, Vec<SymbolId>>,
    pub(crate) global_instantiations: FxHashSet<NameId>,
    pub(crate) param_overrides: ParamOverrideNode,
    semantic_drained: bool,
}

impl Compilation {
    pub fn new(options: CompilationOptions) -> Self {
        let error_limit = options.error_limit as usize;
        Self {
            options,
            interner: Interner::new(),
            types: TypeArena::new(),
            symbols: Vec::new(),
            scopes: Vec::new(),
            definitions: Vec::new(),
            definition_names: FxHashMap::default(),
            package_names: FxHashMap::default(),
            trees: Vec::new(),
            sources: Vec::new(),
            diags: Diagnostics::new(error_limit),
            suppress_diags: false,
            root: None,
            finalized: false,
            finalizing: false,
            definitions_created: false,
            typo_corrections: 0,
            instance_cache: FxHashMap::default(),
            instance_parents: FxHashMap::default(),
            global_instantiations: FxHashSet::default(),
            param_overrides: ParamOverrideNode::default(),
            semantic_drained: false,
        }
    }

    pub fn options(&self) -> &CompilationOptions {
        &self.options
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    // ========================================================================
    // Arenas
    // ========================================================================

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub(crate) fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub(crate) fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    pub fn definition(&self, id: DefinitionId) -> &Definition {
        &self.definitions[id.0 as usize]
    }

    pub fn type_arena(&self) -> &TypeArena {
        &self.types
    }

    pub(crate) fn alloc_symbol(&mut self, kind: SymbolKind, name: NameId, span: Span) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            kind,
            name,
            span,
            parent: None,
            index: 0,
        });
        id
    }

    pub(crate) fn alloc_scope(&mut self, owner: SymbolId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(owner));
        id
    }

    /// Append a member to a scope: sets the parent and declaration index,
    /// then publishes the name. Duplicate names keep the first declaration.
    pub(crate) fn add_member(&mut self, scope_id: ScopeId, member: SymbolId) {
        let index = self.scope(scope_id).next_index();
        {
            let sym = self.symbol_mut(member);
            sym.parent = Some(scope_id);
            sym.index = index;
        }
        let name = self.symbol(member).name;
        let span = self.symbol(member).span;
        let scope = self.scope_mut(scope_id);
        debug_assert!(!scope.elaborated, "member added to finalized scope");
        scope.members.push(member);
        if name != NameId::EMPTY {
            let scope = self.scope_mut(scope_id);
            if scope.name_map.contains_key(&name) {
                let text = self.interner.resolve(name).to_string();
                self.diag(&codes::LOOKUP_DUPLICATE_NAME, span, vec![text]);
            } else {
                scope.name_map.insert(name, member);
            }
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    pub(crate) fn diag(&mut self, code: &'static DiagCode, span: Span, args: Vec<String>) {
        if self.suppress_diags {
            return;
        }
        self.diags.add(code, span, args);
    }

    pub(crate) fn error_limit_exceeded(&self) -> bool {
        self.diags.limit_exceeded()
    }

    /// All diagnostics recorded so far, without forcing elaboration.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diags
    }

    /// Forces the root and drains every lazy binding point, then returns
    /// the deduplicated diagnostics ordered by location.
    pub fn get_semantic_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.get_root();
        if !self.semantic_drained {
            self.semantic_drained = true;
            self.drain_semantic_bindings();
        }
        self.diags.sorted()
    }

    /// Parse and semantic diagnostics together.
    pub fn get_all_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.get_semantic_diagnostics()
    }

    // ========================================================================
    // Sources and trees
    // ========================================================================

    /// Adds an already-parsed syntax tree. Fails once the compilation has
    /// been finalized by `get_root`.
    pub fn add_syntax_tree(&mut self, tree: SourceUnit) -> Result<(), CompilationError> {
        if self.finalized {
            return Err(CompilationError::Finalized);
        }
        self.trees.push(Arc::new(tree));
        Ok(())
    }

    pub fn syntax_trees(&self) -> &[Arc<SourceUnit>] {
        &self.trees
    }

    /// Lex and parse a source file, recording lexer/parser problems in the
    /// diagnostic stream, then register the tree.
    pub fn add_source(&mut self, name: &str, text: &str) -> Result<(), CompilationError> {
        if self.finalized {
            return Err(CompilationError::Finalized);
        }
        let base = self
            .sources
            .last()
            .map(|s| s.base + s.text.len() + 1)
            .unwrap_or(0);

        let mut parser = Parser::with_base(text, base, &mut self.interner);
        let result = parser.parse_unit();
        let lexer_errors = parser.take_lexer_errors();
        for err in &lexer_errors {
            let (code, args) = lexer_error_parts(err);
            let span = span_from_miette(err.span(), text, base);
            self.diags.add(code, span, args);
        }
        match result {
            Ok(unit) => {
                self.trees.push(Arc::new(unit));
            }
            Err(err) => {
                let (code, args) = parser_error_parts(&err.error);
                self.diags.add(code, err.span, args);
            }
        }
        self.sources.push(SourceFile {
            name: name.to_string(),
            text: text.to_string(),
            base,
        });
        Ok(())
    }

    /// The registered source containing the given span, if any.
    pub fn source_for(&self, span: Span) -> Option<&SourceFile> {
        self.sources
            .iter()
            .rev()
            .find(|s| span.start >= s.base && span.start <= s.base + s.text.len())
    }

    pub fn sources(&self) -> &[SourceFile] {
        &self.sources
    }

    // ========================================================================
    // Definitions and packages
    // ========================================================================

    pub fn get_definition(&self, name: NameId) -> Option<DefinitionId> {
        self.definition_names.get(&name).copied()
    }

    pub fn get_package(&self, name: NameId) -> Option<SymbolId> {
        self.package_names.get(&name).copied()
    }

    fn create_definitions(&mut self) {
        if self.definitions_created {
            return;
        }
        self.definitions_created = true;

        let trees: Vec<Arc<SourceUnit>> = self.trees.clone();
        for tree in trees {
            let unit_sym = self.alloc_symbol(
                SymbolKind::CompilationUnit { scope: ScopeId(0) },
                NameId::EMPTY,
                Span::default(),
            );
            let unit_scope = self.alloc_scope(unit_sym);
            if let SymbolKind::CompilationUnit { scope } = &mut self.symbol_mut(unit_sym).kind {
                *scope = unit_scope;
            }

            for item in &tree.items {
                match item {
                    Item::Definition(decl) => {
                        self.create_definition(decl.clone(), unit_scope);
                    }
                    Item::Package(decl) => {
                        let name = decl.name;
                        let pkg_sym = self.alloc_symbol(
                            SymbolKind::Package { scope: ScopeId(0) },
                            name,
                            decl.name_span,
                        );
                        let pkg_scope = self.alloc_scope(pkg_sym);
                        if let SymbolKind::Package { scope } = &mut self.symbol_mut(pkg_sym).kind {
                            *scope = pkg_scope;
                        }
                        self.scope_mut(pkg_scope).deferred = Some(DeferredMembers::Items {
                            items: Arc::new(decl.items.clone()),
                        });
                        self.add_member(unit_scope, pkg_sym);
                        if self.package_names.contains_key(&name) {
                            let text = self.interner.resolve(name).to_string();
                            self.diag(
                                &codes::ELAB_DUPLICATE_DEFINITION,
                                decl.name_span,
                                vec![text],
                            );
                        } else {
                            self.package_names.insert(name, pkg_sym);
                        }
                    }
                }
            }
        }
    }

    fn create_definition(&mut self, decl: Arc<DefinitionDecl>, scope: ScopeId) {
        let name = decl.name;
        collect_instantiations(&decl.items, &mut self.global_instantiations);
        if self.definition_names.contains_key(&name) {
            let text = self.interner.resolve(name).to_string();
            self.diag(&codes::ELAB_DUPLICATE_DEFINITION, decl.name_span, vec![text]);
            return;
        }
        let id = DefinitionId(self.definitions.len() as u32);
        self.definitions.push(Definition {
            name,
            kind: decl.kind,
            syntax: decl,
            scope,
        });
        self.definition_names.insert(name, id);
    }

    // ========================================================================
    // Root elaboration
    // ========================================================================

    /// Gets the root of the design. The first call elaborates every top
    /// instance, resolves defparams to a fixed point, and finalizes the
    /// compilation. Idempotent afterwards.
    pub fn get_root(&mut self) -> SymbolId {
        if let Some(root) = self.root {
            return root;
        }
        assert!(!self.finalizing, "reentrant call to get_root");
        self.finalizing = true;

        self.create_definitions();
        let tops = self.determine_top_modules();
        if !self.options.suppress_unused {
            for i in 0..self.definitions.len() {
                let def = DefinitionId(i as u32);
                let name = self.definitions[i].name;
                if !tops.contains(&def) && !self.global_instantiations.contains(&name) {
                    let span = self.definitions[i].syntax.name_span;
                    let text = self.interner.resolve(name).to_string();
                    self.diag(&codes::LINT_UNUSED_DEFINITION, span, vec![text]);
                }
            }
        }
        self.parse_param_overrides();

        // Packages are shared across elaboration rounds; materialize them
        // now so their diagnostics fire exactly once, unsuppressed.
        let packages: Vec<SymbolId> = self.package_names.values().copied().collect();
        for pkg in packages {
            if let Some(scope) = self.symbol(pkg).owned_scope() {
                self.ensure_members(scope);
            }
        }

        // Discovery rounds: elaborate speculatively until the defparam
        // override tree stops changing, then do the real elaboration.
        let mut steps = 0u32;
        loop {
            self.suppress_diags = true;
            let scratch_root = self.elaborate_design(&tops);
            let defparams = self.collect_defparams(scratch_root);
            self.suppress_diags = false;

            let mut next = self.param_overrides.clone();
            self.apply_defparams(&mut next, &defparams);
            if next == self.param_overrides {
                break;
            }
            self.param_overrides = next;
            self.instance_cache.clear();
            self.instance_parents.clear();

            steps += 1;
            if steps >= self.options.max_defparam_steps {
                self.diag(&codes::ELAB_DEFPARAM_STEPS, Span::default(), vec![]);
                break;
            }
        }

        self.instance_cache.clear();
        self.instance_parents.clear();
        // Discovery rounds consumed lookup budgets speculatively; the real
        // elaboration starts fresh.
        self.typo_corrections = 0;
        let root = self.elaborate_design(&tops);

        self.root = Some(root);
        self.finalizing = false;
        self.finalized = true;
        root
    }

    /// The root symbol, if `get_root` has already run.
    pub fn root(&self) -> Option<SymbolId> {
        self.root
    }

    fn determine_top_modules(&mut self) -> Vec<DefinitionId> {
        let mut tops = Vec::new();
        if !self.options.top_modules.is_empty() {
            let names: Vec<String> = self.options.top_modules.clone();
            for name in names {
                match self
                    .interner
                    .get(&name)
                    .and_then(|id| self.definition_names.get(&id).copied())
                {
                    Some(def) => tops.push(def),
                    None => {
                        self.diag(&codes::ELAB_UNKNOWN_MODULE, Span::default(), vec![name]);
                    }
                }
            }
        } else {
            for (i, def) in self.definitions.iter().enumerate() {
                if def.kind == DefinitionKind::Module
                    && !self.global_instantiations.contains(&def.name)
                {
                    tops.push(DefinitionId(i as u32));
                }
            }
            tops.sort_by_key(|id| {
                self.interner
                    .resolve(self.definitions[id.0 as usize].name)
                    .to_string()
            });
        }
        tracing::debug!(tops = tops.len(), "determined top modules");
        tops
    }

    // Parse "name=value" or "a.b.name=value" overrides from the options.
    fn parse_param_overrides(&mut self) {
        let overrides: Vec<String> = self.options.param_overrides.clone();
        for entry in overrides {
            let Some((path_text, value_text)) = entry.split_once('=') else {
                self.diag(&codes::ELAB_BAD_OVERRIDE, Span::default(), vec![entry]);
                continue;
            };
            let mut parser = Parser::with_base(value_text, 0, &mut self.interner);
            let Ok(expr) = parser.parse_expression() else {
                self.diag(&codes::ELAB_BAD_OVERRIDE, Span::default(), vec![entry]);
                continue;
            };
            let value = match self.eval_standalone_constant(&expr) {
                Some(v) => v,
                None => {
                    self.diag(&codes::ELAB_BAD_OVERRIDE, Span::default(), vec![entry]);
                    continue;
                }
            };
            let segments: Vec<NameId> = path_text
                .split('.')
                .map(|s| self.interner.intern(s.trim()))
                .collect();
            let Some((param, path)) = segments.split_last() else {
                continue;
            };
            let node = self.param_overrides.node_at_path_mut(path);
            node.overrides.insert(*param, value.clone());
        }
    }
}

fn collect_instantiations(items: &[ModuleItem], out: &mut FxHashSet<NameId>) {
    for item in items {
        match item {
            ModuleItem::Instance(inst) => {
                out.insert(inst.module);
            }
            ModuleItem::GenerateFor(g) => collect_instantiations(&g.body, out),
            ModuleItem::GenerateIf(g) => {
                collect_instantiations(&g.then_items, out);
                if let Some(else_items) = &g.else_items {
                    collect_instantiations(else_items, out);
                }
            }
            ModuleItem::GenerateRegion(nested) => collect_instantiations(nested, out),
            _ => {}
        }
    }
}

// Lexer errors carry only byte offsets; recover line/column from the text.
fn span_from_miette(span: miette::SourceSpan, text: &str, base: usize) -> Span {
    let local = span.offset().saturating_sub(base).min(text.len());
    let mut line = 1u32;
    let mut column = 1u32;
    for c in text[..local].chars() {
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    Span::new(span.offset(), span.offset() + span.len(), line, column)
}

fn lexer_error_parts(err: &crate::errors::LexerError) -> (&'static DiagCode, Vec<String>) {
    use crate::errors::LexerError::*;
    match err {
        UnexpectedCharacter { ch, .. } => {
            (&codes::LEXER_UNEXPECTED_CHARACTER, vec![ch.to_string()])
        }
        UnterminatedString { .. } => (&codes::LEXER_UNTERMINATED_STRING, vec![]),
        UnterminatedComment { .. } => (&codes::LEXER_UNTERMINATED_COMMENT, vec![]),
        InvalidNumber { .. } => (&codes::LEXER_INVALID_NUMBER, vec![]),
    }
}

fn parser_error_parts(err: &crate::errors::ParserError) -> (&'static DiagCode, Vec<String>) {
    use crate::errors::ParserError::*;
    match err {
        ExpectedToken {
            expected, found, ..
        } => (
            &codes::PARSER_EXPECTED_TOKEN,
            vec![expected.clone(), found.clone()],
        ),
        ExpectedExpression { found, .. } => {
            (&codes::PARSER_EXPECTED_EXPRESSION, vec![found.clone()])
        }
        UnexpectedToken { token, .. } => (&codes::PARSER_UNEXPECTED_TOKEN, vec![token.clone()]),
        ExpectedType { found, .. } => (&codes::PARSER_EXPECTED_TYPE, vec![found.clone()]),
    }
}

// Convenience lookups used by tests and the JSON walker.
impl Compilation {
    /// Find a member of a scope by source-level name.
    pub fn find_member(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let id = self.interner.get(name)?;
        self.scope(scope).name_map.get(&id).copied()
    }

    /// The scope owned by a symbol, if it owns one.
    pub fn symbol_scope(&self, id: SymbolId) -> Option<ScopeId> {
        self.symbol(id).owned_scope()
    }

    /// Find a top-level instance by name. Forces elaboration.
    pub fn find_top(&mut self, name: &str) -> Option<SymbolId> {
        let root = self.get_root();
        let scope = self.symbol(root).owned_scope()?;
        self.find_member(scope, name)
    }

    /// Resolve a dotted hierarchical path from the root, e.g. "top.u.x".
    /// Forces elaboration.
    pub fn find_hierarchical(&mut self, path: &str) -> Option<SymbolId> {
        let root = self.get_root();
        let mut scope = self.symbol(root).owned_scope()?;
        let mut current = None;
        for segment in path.split('.') {
            self.ensure_members(scope);
            let sym = self.find_member(scope, segment)?;
            current = Some(sym);
            if let Some(next) = self.symbol(sym).owned_scope() {
                scope = next;
            }
        }
        current
    }

    pub(crate) fn location_after_scope(&self, scope: ScopeId) -> LookupLocation {
        LookupLocation::new(scope, u32::MAX)
    }
}
