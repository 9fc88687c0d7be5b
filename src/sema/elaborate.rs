// src/sema/elaborate.rs
//! Elaboration: definitions become instances, generates expand, scopes
//! materialize their deferred members.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::errors::codes;
use crate::frontend::ast::{
    ConnectionSyntax, DefinitionDecl, ModuleItem, ParamDecl, TypeSyntaxKind,
};
use crate::frontend::{NameId, Span};
use crate::sema::bind::{bind_flags, BindContext};
use crate::sema::compilation::{Compilation, ParamOverrideNode};
use crate::sema::expr::eval::EvalContext;
use crate::sema::lookup::lookup_flags;
use crate::sema::scope::{DeferredMembers, LookupLocation, WildcardImport};
use crate::sema::symbol::{DefinitionId, ScopeId, SymbolId, SymbolKind};
use crate::sema::types::TypeKind;
use crate::value::{ConstantValue, SvInt};

/// Where a parameter's value comes from: an already-resolved override, or
/// an expression bound in some context.
enum ParamSource<'a> {
    Value(ConstantValue),
    Expr(&'a crate::frontend::ast::ExprSyntax, BindContext),
}

impl Compilation {
    // ========================================================================
    // Design roots
    // ========================================================================

    pub(crate) fn elaborate_design(&mut self, tops: &[DefinitionId]) -> SymbolId {
        let root_name = self.interner.intern("$root");
        let root_sym = self.alloc_symbol(
            SymbolKind::Root { scope: ScopeId(0) },
            root_name,
            Span::default(),
        );
        let root_scope = self.alloc_scope(root_sym);
        if let SymbolKind::Root { scope } = &mut self.symbol_mut(root_sym).kind {
            *scope = root_scope;
        }

        for &def in tops {
            let name = self.definition(def).name;
            let name_span = self.definition(def).syntax.name_span;
            let _span = tracing::info_span!(
                "elaborate_top",
                module = self.interner.resolve(name)
            )
            .entered();
            self.elaborate_instance(def, name, name_span, &[], &[], root_scope, 1);
        }
        root_sym
    }

    // ========================================================================
    // Instances
    // ========================================================================

    /// Elaborate one instance of a definition into the parent scope.
    /// Parameters are resolved eagerly because the body cache is keyed on
    /// them; the rest of the body stays deferred.
    pub(crate) fn elaborate_instance(
        &mut self,
        def: DefinitionId,
        instance_name: NameId,
        name_span: Span,
        param_conns: &[ConnectionSyntax],
        port_conns: &[ConnectionSyntax],
        parent_scope: ScopeId,
        depth: u32,
    ) -> SymbolId {
        if depth > self.options().max_instance_depth {
            let text = self.interner.resolve(self.definition(def).name).to_string();
            self.diag(&codes::ELAB_MAX_INSTANCE_DEPTH, name_span, vec![text]);
            let dead_body = self.dead_scope();
            let inst = self.alloc_symbol(
                SymbolKind::Instance {
                    definition: def,
                    body: dead_body,
                    connections: Vec::new(),
                },
                instance_name,
                name_span,
            );
            self.add_member(parent_scope, inst);
            return inst;
        }

        let syntax = self.definition(def).syntax.clone();
        let def_scope = self.definition(def).scope;

        // The override subtree for this instance comes from defparams and
        // command-line values, keyed by instance path.
        let mut path = self.instance_path_of_scope(parent_scope);
        path.push(instance_name);
        let overrides = self.override_node_at_path(&path);

        // Build a body and evaluate every overridable parameter into it.
        let body_sym = self.alloc_symbol(
            SymbolKind::InstanceBody {
                definition: def,
                scope: ScopeId(0),
            },
            self.definition(def).name,
            syntax.name_span,
        );
        let body_scope = self.alloc_scope(body_sym);
        {
            // Lookups inside the body climb to the defining compilation
            // unit, never into the instantiating module.
            let sym = self.symbol_mut(body_sym);
            sym.parent = Some(def_scope);
            sym.index = u32::MAX;
        }
        if let SymbolKind::InstanceBody { scope, .. } = &mut self.symbol_mut(body_sym).kind {
            *scope = body_scope;
        }

        let key = self.elaborate_parameters(
            &syntax,
            body_scope,
            param_conns,
            overrides.as_ref(),
            parent_scope,
            name_span,
        );
        self.elaborate_ports(&syntax, body_scope);

        // Share bodies with identical parameter values. Bodies reached by
        // an override subtree never share, regardless of the caching flag.
        let cache_key = (def, key);
        let cacheable = !self.options().disable_instance_caching && overrides.is_none();
        let body_scope = if cacheable {
            match self.instance_cache.get(&cache_key) {
                Some(&cached) => cached,
                None => {
                    self.scope_mut(body_scope).deferred =
                        Some(DeferredMembers::Body { definition: def });
                    self.instance_cache.insert(cache_key, body_scope);
                    body_scope
                }
            }
        } else {
            self.scope_mut(body_scope).deferred = Some(DeferredMembers::Body { definition: def });
            body_scope
        };

        let inst = self.alloc_symbol(
            SymbolKind::Instance {
                definition: def,
                body: body_scope,
                connections: port_conns.to_vec(),
            },
            instance_name,
            name_span,
        );
        self.add_member(parent_scope, inst);
        self.instance_parents.entry(body_scope).or_default().push(inst);
        inst
    }

    fn dead_scope(&mut self) -> ScopeId {
        let sym = self.alloc_symbol(
            SymbolKind::StatementBlock { scope: ScopeId(0) },
            NameId::EMPTY,
            Span::default(),
        );
        let scope = self.alloc_scope(sym);
        if let SymbolKind::StatementBlock { scope: s } = &mut self.symbol_mut(sym).kind {
            *s = scope;
        }
        scope
    }

    // Evaluate parameter ports and overridable body parameters, in order,
    // and return the canonical (name, value) tuple for the body cache.
    fn elaborate_parameters(
        &mut self,
        syntax: &DefinitionDecl,
        body_scope: ScopeId,
        param_conns: &[ConnectionSyntax],
        overrides: Option<&ParamOverrideNode>,
        parent_scope: ScopeId,
        inst_span: Span,
    ) -> Vec<(NameId, ConstantValue)> {
        let mut decls: Vec<ParamDecl> = syntax.param_ports.clone();
        for item in &syntax.items {
            if let ModuleItem::Param(p) = item {
                if !p.is_local {
                    decls.push(p.clone());
                }
            }
        }

        // Match connections to declarations.
        let named = param_conns.iter().any(|c| c.name.is_some());
        if !named && param_conns.len() > decls.len() {
            let text = self.interner.resolve(syntax.name).to_string();
            self.diag(
                &codes::ELAB_TOO_MANY_CONNECTIONS,
                inst_span,
                vec![
                    "parameter".into(),
                    text,
                    decls.len().to_string(),
                ],
            );
        }
        if named {
            for conn in param_conns {
                if let Some((name, span)) = conn.name {
                    if !decls.iter().any(|d| d.name == name) {
                        let def_text = self.interner.resolve(syntax.name).to_string();
                        let name_text = self.interner.resolve(name).to_string();
                        self.diag(&codes::ELAB_UNKNOWN_PARAM, span, vec![def_text, name_text]);
                    }
                }
            }
        }

        let mut key = Vec::with_capacity(decls.len());
        for (position, decl) in decls.iter().enumerate() {
            let conn_expr = if named {
                param_conns
                    .iter()
                    .find(|c| c.name.map(|(n, _)| n) == Some(decl.name))
                    .and_then(|c| c.expr.as_ref())
            } else {
                param_conns.get(position).and_then(|c| c.expr.as_ref())
            };

            let body_ctx = BindContext::constant(
                body_scope,
                LookupLocation::new(body_scope, self.scope(body_scope).next_index()),
            );
            let parent_ctx = BindContext::constant(
                parent_scope,
                LookupLocation::new(parent_scope, self.scope(parent_scope).next_index()),
            );

            // Defparam and command-line overrides win over instantiation
            // connections, which win over defaults.
            let override_value = overrides.and_then(|o| o.overrides.get(&decl.name)).cloned();
            let source = if let Some(v) = override_value {
                ParamSource::Value(v)
            } else if let Some(expr) = conn_expr {
                ParamSource::Expr(expr, parent_ctx)
            } else if let Some(init) = &decl.init {
                ParamSource::Expr(init, body_ctx)
            } else {
                let text = self.interner.resolve(decl.name).to_string();
                self.diag(&codes::ELAB_PARAM_NO_VALUE, decl.span, vec![text]);
                ParamSource::Value(ConstantValue::Err)
            };

            self.add_parameter(decl, source, body_scope, false, true, &mut key);
        }
        key
    }

    // Create one parameter symbol. Expression sources bind against the
    // declared type so context-determined widths apply; untyped parameters
    // take the type of their value.
    fn add_parameter(
        &mut self,
        decl: &ParamDecl,
        source: ParamSource<'_>,
        scope: ScopeId,
        is_local: bool,
        is_port: bool,
        key: &mut Vec<(NameId, ConstantValue)>,
    ) {
        let ctx = BindContext::constant(
            scope,
            LookupLocation::new(scope, self.scope(scope).next_index()),
        );
        let implicit = matches!(decl.ty.kind, TypeSyntaxKind::Implicit)
            && decl.ty.packed_dims.is_empty();
        let (ty, declared_range, value) = if implicit {
            let value = match source {
                ParamSource::Value(v) => v,
                ParamSource::Expr(expr, expr_ctx) => self
                    .bind_constant_value(expr, &expr_ctx)
                    .unwrap_or(ConstantValue::Err),
            };
            (self.type_of_value(&value), None, value)
        } else {
            let resolved = self.resolve_type(&decl.ty, &ctx);
            let value = match source {
                ParamSource::Value(v) => self.convert_value_to(v, resolved.ty),
                ParamSource::Expr(expr, expr_ctx) => {
                    let bound = self.bind_assignment_like(resolved.ty, expr, &expr_ctx);
                    match bound.constant {
                        Some(v) if !v.is_err() => v,
                        _ => ConstantValue::Err,
                    }
                }
            };
            (resolved.ty, resolved.declared_range, value)
        };

        key.push((decl.name, value.clone()));
        let sym = self.alloc_symbol(
            SymbolKind::Parameter {
                ty,
                value,
                is_local,
                is_port,
                declared_range,
            },
            decl.name,
            decl.name_span,
        );
        self.add_member(scope, sym);
    }

    fn type_of_value(&mut self, value: &ConstantValue) -> crate::sema::types::TypeId {
        match value {
            ConstantValue::Int(v) => self.types.integral(
                v.width(),
                crate::sema::types::IntegralFlags::new(v.is_signed(), v.has_unknown()),
            ),
            ConstantValue::Real(_) => self.types.builtins.real,
            ConstantValue::ShortReal(_) => self.types.builtins.short_real,
            ConstantValue::Str(_) => self.types.builtins.string,
            _ => self.types.builtins.error,
        }
    }

    fn convert_value_to(
        &mut self,
        value: ConstantValue,
        ty: crate::sema::types::TypeId,
    ) -> ConstantValue {
        if value.is_err() {
            return value;
        }
        match self.types.get(self.types.canonical(ty)).clone() {
            TypeKind::Integral { width, signed, .. } => match value {
                ConstantValue::Int(v) => ConstantValue::Int(v.resize(width, signed)),
                ConstantValue::Real(r) => ConstantValue::Int(SvInt::from_real(r, width, signed)),
                other => other,
            },
            TypeKind::Real => match value {
                ConstantValue::Int(v) => ConstantValue::Real(v.to_real()),
                other => other,
            },
            _ => value,
        }
    }

    fn elaborate_ports(&mut self, syntax: &DefinitionDecl, body_scope: ScopeId) {
        for port in &syntax.ports {
            let ctx = BindContext::new(
                body_scope,
                LookupLocation::new(body_scope, self.scope(body_scope).next_index()),
            );
            let resolved = self.resolve_type(&port.ty, &ctx);
            let sym = self.alloc_symbol(
                SymbolKind::Port {
                    ty: resolved.ty,
                    direction: port.direction,
                    declared_range: resolved.declared_range,
                },
                port.name,
                port.name_span,
            );
            self.add_member(body_scope, sym);
        }
    }

    // ========================================================================
    // Deferred member materialization
    // ========================================================================

    /// Materialize a scope's deferred members. Idempotent: the slot is
    /// taken on first entry and the diagnostic stream dedups re-reports.
    pub(crate) fn ensure_members(&mut self, scope: ScopeId) {
        let Some(deferred) = self.scope_mut(scope).deferred.take() else {
            return;
        };
        match deferred {
            DeferredMembers::Body { definition } => {
                let syntax = self.definition(definition).syntax.clone();
                self.materialize_items(&syntax.items, scope, true);
            }
            DeferredMembers::Items { items } => {
                self.materialize_items(&items, scope, false);
            }
        }
        self.scope_mut(scope).elaborated = true;
    }

    fn materialize_items(&mut self, items: &[ModuleItem], scope: ScopeId, skip_params: bool) {
        for item in items {
            if self.error_limit_exceeded() {
                return;
            }
            self.materialize_item(item, scope, skip_params);
        }
    }

    fn materialize_item(&mut self, item: &ModuleItem, scope: ScopeId, skip_params: bool) {
        let ctx = BindContext::new(
            scope,
            LookupLocation::new(scope, self.scope(scope).next_index()),
        );
        match item {
            ModuleItem::Param(decl) => {
                // Overridable parameters were materialized eagerly with the
                // body; only localparams remain.
                if skip_params && !decl.is_local {
                    return;
                }
                let source = match &decl.init {
                    Some(init) => {
                        ParamSource::Expr(init, ctx.with_flags(bind_flags::CONSTANT))
                    }
                    None => {
                        let text = self.interner.resolve(decl.name).to_string();
                        self.diag(&codes::ELAB_PARAM_NO_VALUE, decl.span, vec![text]);
                        ParamSource::Value(ConstantValue::Err)
                    }
                };
                let mut key = Vec::new();
                self.add_parameter(decl, source, scope, decl.is_local, false, &mut key);
            }
            ModuleItem::Var(decl) => {
                let resolved = self.resolve_type(&decl.ty, &ctx);
                let mut ty = resolved.ty;
                // Unpacked dimensions wrap the declared type.
                for dim in decl.unpacked_dims.iter().rev() {
                    if let Some((left, right)) = self.resolve_packed_dim(dim, &ctx) {
                        ty = self.types.intern(TypeKind::UnpackedArray {
                            elem: ty,
                            left,
                            right,
                        });
                    }
                }
                let sym = self.alloc_symbol(
                    SymbolKind::Variable {
                        ty,
                        declared_range: resolved.declared_range,
                        initializer: decl.init.clone(),
                    },
                    decl.name,
                    decl.name_span,
                );
                self.add_member(scope, sym);
            }
            ModuleItem::Net(decl) => {
                let resolved = self.resolve_type(&decl.ty, &ctx);
                let sym = self.alloc_symbol(
                    SymbolKind::Net {
                        ty: resolved.ty,
                        declared_range: resolved.declared_range,
                        initializer: decl.init.clone(),
                    },
                    decl.name,
                    decl.name_span,
                );
                self.add_member(scope, sym);
            }
            ModuleItem::Typedef(decl) => {
                let resolved = self.resolve_type(&decl.ty, &ctx);
                let aliased = self.types.intern(TypeKind::Alias {
                    name: decl.name,
                    target: resolved.ty,
                });
                let sym = self.alloc_symbol(
                    SymbolKind::TypeAlias { target: aliased },
                    decl.name,
                    decl.name_span,
                );
                self.add_member(scope, sym);
            }
            ModuleItem::Instance(inst) => {
                let Some(def) = self.get_definition(inst.module) else {
                    if !self.options().lint_mode {
                        let text = self.interner.resolve(inst.module).to_string();
                        self.diag(&codes::ELAB_UNKNOWN_MODULE, inst.module_span, vec![text]);
                    }
                    return;
                };
                let depth = self.instance_depth_of(scope) + 1;
                for hier in &inst.instances {
                    self.elaborate_instance(
                        def,
                        hier.name,
                        hier.name_span,
                        &inst.param_assignments,
                        &hier.connections,
                        scope,
                        depth,
                    );
                }
            }
            ModuleItem::Defparam(decl) => {
                // Members but never named lookups: registered unnamed.
                let sym = self.alloc_symbol(
                    SymbolKind::Defparam {
                        target: decl.target.clone(),
                        value: decl.value.clone(),
                    },
                    NameId::EMPTY,
                    decl.span,
                );
                self.add_member(scope, sym);
            }
            ModuleItem::Genvar(decl) => {
                let ty = self.types.builtins.int;
                let sym = self.alloc_symbol(
                    SymbolKind::Genvar { ty },
                    decl.name,
                    decl.name_span,
                );
                self.add_member(scope, sym);
            }
            ModuleItem::GenerateFor(gen) => self.expand_generate_for(gen, scope),
            ModuleItem::GenerateIf(gen) => self.expand_generate_if(gen, scope),
            ModuleItem::GenerateRegion(items) => {
                self.materialize_items(items, scope, skip_params)
            }
            ModuleItem::Procedural(block) => {
                let sym = self.alloc_symbol(
                    SymbolKind::ProceduralBlock {
                        kind: block.kind,
                        body: block.body.clone(),
                        bound: None,
                    },
                    NameId::EMPTY,
                    block.span,
                );
                self.add_member(scope, sym);
            }
            ModuleItem::Function(decl) => {
                let fn_sym = self.alloc_symbol(
                    SymbolKind::Subroutine {
                        return_type: self.types.builtins.logic,
                        args: Vec::new(),
                        scope: ScopeId(0),
                        syntax: decl.clone(),
                        body: None,
                    },
                    decl.name,
                    decl.name_span,
                );
                let fn_scope = self.alloc_scope(fn_sym);
                self.add_member(scope, fn_sym);

                let fn_ctx = BindContext::new(fn_scope, LookupLocation::new(fn_scope, u32::MAX));
                let return_type = if matches!(decl.return_type.kind, TypeSyntaxKind::Implicit)
                    && decl.return_type.packed_dims.is_empty()
                {
                    self.types.builtins.logic
                } else {
                    self.resolve_type(&decl.return_type, &fn_ctx).ty
                };

                let mut arg_syms = Vec::with_capacity(decl.args.len());
                for arg in &decl.args {
                    let resolved = if matches!(arg.ty.kind, TypeSyntaxKind::Implicit)
                        && arg.ty.packed_dims.is_empty()
                    {
                        (self.types.builtins.logic, None)
                    } else {
                        let r = self.resolve_type(&arg.ty, &fn_ctx);
                        (r.ty, r.declared_range)
                    };
                    let arg_sym = self.alloc_symbol(
                        SymbolKind::FormalArg {
                            ty: resolved.0,
                            declared_range: resolved.1,
                        },
                        arg.name,
                        arg.name_span,
                    );
                    self.add_member(fn_scope, arg_sym);
                    arg_syms.push(arg_sym);
                }

                if let SymbolKind::Subroutine {
                    return_type: rt,
                    args,
                    scope: s,
                    ..
                } = &mut self.symbol_mut(fn_sym).kind
                {
                    *rt = return_type;
                    *args = arg_syms;
                    *s = fn_scope;
                }
            }
            ModuleItem::ContinuousAssign(assign) => {
                let sym = self.alloc_symbol(
                    SymbolKind::ContinuousAssign {
                        target: assign.target.clone(),
                        value: assign.value.clone(),
                    },
                    NameId::EMPTY,
                    assign.span,
                );
                self.add_member(scope, sym);
            }
            ModuleItem::Import(import) => {
                match import.name {
                    None => {
                        let index = self.scope(scope).next_index();
                        self.scope_mut(scope).imports.push(WildcardImport {
                            package: import.package,
                            span: import.span,
                            index,
                        });
                        if self.get_package(import.package).is_none() {
                            let text = self.interner.resolve(import.package).to_string();
                            self.diag(
                                &codes::LOOKUP_UNKNOWN_PACKAGE,
                                import.package_span,
                                vec![text],
                            );
                        }
                    }
                    Some((name, span)) => {
                        // An explicit import publishes one name directly.
                        if let Some(sym) = self.lookup_package_member(
                            import.package,
                            import.package_span,
                            name,
                            span,
                        ) {
                            self.scope_mut(scope).name_map.entry(name).or_insert(sym);
                        }
                    }
                }
            }
        }
    }

    // ========================================================================
    // Generate constructs
    // ========================================================================

    fn expand_generate_for(&mut self, gen: &crate::frontend::ast::GenerateFor, scope: ScopeId) {
        let ctx = BindContext::constant(
            scope,
            LookupLocation::new(scope, self.scope(scope).next_index()),
        );

        // The genvar must already be declared (or be an inline genvar).
        use crate::sema::lookup::UnqualifiedLookup;
        let found = self.lookup_unqualified(
            gen.genvar,
            ctx.location,
            lookup_flags::NONE,
            gen.genvar_span,
        );
        let genvar_sym = match found {
            UnqualifiedLookup::Found { symbol, .. }
                if matches!(self.symbol(symbol).kind, SymbolKind::Genvar { .. }) =>
            {
                symbol
            }
            _ => {
                let ty = self.types.builtins.int;
                let s = self.alloc_symbol(SymbolKind::Genvar { ty }, gen.genvar, gen.genvar_span);
                self.add_member(scope, s);
                s
            }
        };

        let init_expr = self.bind_expression(&gen.init, &ctx);
        let cond_expr = {
            let mut e = self.create_expression(&gen.cond, &ctx, None);
            self.self_determined(&mut e, &ctx);
            e
        };
        let step_expr = {
            let mut e = self.create_expression(&gen.step, &ctx, None);
            self.self_determined(&mut e, &ctx);
            e
        };

        let Some(init) = init_expr.constant.clone() else {
            return;
        };

        let max_steps = self.options().max_generate_steps;
        let base = match gen.label {
            Some(l) => self.interner.resolve(l).to_string(),
            None => format!("genblk{}", self.scope(scope).next_index()),
        };
        let mut value = init;
        let mut iteration = 0u32;
        loop {
            if iteration >= max_steps {
                self.diag(&codes::ELAB_MAX_GENERATE_STEPS, gen.span, vec![]);
                return;
            }

            let proceed = {
                let mut eval = EvalContext::with_local(self, genvar_sym, value.clone());
                let cond = eval.eval(&cond_expr);
                match cond.truth() {
                    crate::value::Logic::One => true,
                    _ => false,
                }
            };
            if !proceed {
                break;
            }

            self.create_generate_block(gen, scope, &base, &value, iteration);

            let next = {
                let mut eval = EvalContext::with_local(self, genvar_sym, value.clone());
                eval.eval(&step_expr)
            };
            if next.is_err() {
                return;
            }
            value = next;
            iteration += 1;
        }
    }

    fn create_generate_block(
        &mut self,
        gen: &crate::frontend::ast::GenerateFor,
        scope: ScopeId,
        base: &str,
        value: &ConstantValue,
        iteration: u32,
    ) {
        let block_name = self.interner.intern(&format!("{}[{}]", base, iteration));
        let block_sym = self.alloc_symbol(
            SymbolKind::GenerateBlock { scope: ScopeId(0) },
            block_name,
            gen.span,
        );
        let block_scope = self.alloc_scope(block_sym);
        if let SymbolKind::GenerateBlock { scope: s } = &mut self.symbol_mut(block_sym).kind {
            *s = block_scope;
        }
        self.add_member(scope, block_sym);

        // Each iteration pins the genvar as a localparam inside the block.
        let ty = self.type_of_value(value);
        let genvar_param = self.alloc_symbol(
            SymbolKind::Parameter {
                ty,
                value: value.clone(),
                is_local: true,
                is_port: false,
                declared_range: None,
            },
            gen.genvar,
            gen.genvar_span,
        );
        self.add_member(block_scope, genvar_param);

        self.scope_mut(block_scope).deferred = Some(DeferredMembers::Items {
            items: gen.body.clone(),
        });
        // Materialize now: generate expansion is part of elaboration.
        self.ensure_members(block_scope);
    }

    fn expand_generate_if(&mut self, gen: &crate::frontend::ast::GenerateIf, scope: ScopeId) {
        let ctx = BindContext::constant(
            scope,
            LookupLocation::new(scope, self.scope(scope).next_index()),
        );
        let Some(cond) = self.bind_constant_value(&gen.cond, &ctx) else {
            return;
        };
        let (items, label) = if cond.truth() == crate::value::Logic::One {
            (gen.then_items.clone(), gen.then_label)
        } else {
            match &gen.else_items {
                Some(items) => (items.clone(), gen.else_label),
                None => return,
            }
        };

        let name = match label {
            Some(l) => l,
            None => {
                let text = format!("genblk{}", self.scope(scope).next_index());
                self.interner.intern(&text)
            }
        };
        let block_sym = self.alloc_symbol(
            SymbolKind::GenerateBlock { scope: ScopeId(0) },
            name,
            gen.span,
        );
        let block_scope = self.alloc_scope(block_sym);
        if let SymbolKind::GenerateBlock { scope: s } = &mut self.symbol_mut(block_sym).kind {
            *s = block_scope;
        }
        self.add_member(scope, block_sym);
        self.scope_mut(block_scope).deferred = Some(DeferredMembers::Items { items });
        self.ensure_members(block_scope);
    }

    // ========================================================================
    // Paths and overrides
    // ========================================================================

    /// The hierarchical instance path of a scope, outermost first. Generate
    /// blocks and statement blocks are transparent here; override trees are
    /// keyed by instance names only.
    pub(crate) fn instance_path_of_scope(&self, scope: ScopeId) -> Vec<NameId> {
        let mut path = VecDeque::new();
        let mut current = Some(scope);
        while let Some(scope_id) = current {
            let owner = self.scope(scope_id).owner;
            match &self.symbol(owner).kind {
                SymbolKind::Root { .. } | SymbolKind::CompilationUnit { .. } => break,
                SymbolKind::InstanceBody { .. } => {
                    let inst = self
                        .instance_parents
                        .get(&scope_id)
                        .and_then(|v| v.first())
                        .copied();
                    match inst {
                        Some(inst) => {
                            path.push_front(self.symbol(inst).name);
                            current = self.symbol(inst).parent;
                        }
                        None => break,
                    }
                }
                _ => {
                    current = self.symbol(owner).parent;
                }
            }
        }
        path.into()
    }

    pub(crate) fn instance_depth_of(&self, scope: ScopeId) -> u32 {
        self.instance_path_of_scope(scope).len() as u32
    }

    /// The override node for an instance path. Root-level plain overrides
    /// apply to every top module.
    pub(crate) fn override_node_at_path(&self, path: &[NameId]) -> Option<ParamOverrideNode> {
        let (top, rest) = path.split_first()?;
        let child = self.param_overrides.child(*top);
        let mut node = if rest.is_empty() {
            // Merge root-level overrides into the top's own node.
            let mut merged = child.cloned().unwrap_or_default();
            for (name, value) in &self.param_overrides.overrides {
                merged.overrides.entry(*name).or_insert_with(|| value.clone());
            }
            if merged.is_empty() {
                return None;
            }
            return Some(merged);
        } else {
            child?.clone()
        };
        for segment in rest {
            node = node.child(*segment)?.clone();
        }
        if node.is_empty() {
            None
        } else {
            Some(node)
        }
    }

    // ========================================================================
    // Defparam resolution
    // ========================================================================

    /// Walk the elaborated tree collecting defparam targets and values,
    /// forcing deferred scopes along the way.
    pub(crate) fn collect_defparams(
        &mut self,
        root: SymbolId,
    ) -> Vec<(Vec<NameId>, ConstantValue)> {
        let mut out = Vec::new();
        let Some(root_scope) = self.symbol(root).owned_scope() else {
            return out;
        };
        let mut visited = FxHashSet::default();
        self.collect_defparams_in(root_scope, &mut visited, &mut out);
        out
    }

    fn collect_defparams_in(
        &mut self,
        scope: ScopeId,
        visited: &mut FxHashSet<ScopeId>,
        out: &mut Vec<(Vec<NameId>, ConstantValue)>,
    ) {
        if !visited.insert(scope) {
            return;
        }
        self.ensure_members(scope);
        let members = self.scope(scope).members.clone();
        for member in members {
            match self.symbol(member).kind.clone() {
                SymbolKind::Defparam { target, value } => {
                    let ctx = BindContext::constant(scope, self.location_after_scope(scope));
                    let Some(v) = self.bind_constant_value(&value, &ctx) else {
                        continue;
                    };
                    let Some(path) = self.resolve_defparam_path(&target, scope) else {
                        continue;
                    };
                    out.push((path, v));
                }
                SymbolKind::Instance { body, .. } => {
                    self.collect_defparams_in(body, visited, out);
                }
                SymbolKind::GenerateBlock { scope: inner } => {
                    self.collect_defparams_in(inner, visited, out);
                }
                _ => {}
            }
        }
    }

    // A defparam target resolves relative to its own scope first, falling
    // back to an absolute path from a top instance.
    fn resolve_defparam_path(
        &mut self,
        target: &[(NameId, Span)],
        scope: ScopeId,
    ) -> Option<Vec<NameId>> {
        let (head, _) = target.first()?;
        let relative = self.scope(scope).name_map.get(head).map_or(false, |&s| {
            matches!(self.symbol(s).kind, SymbolKind::Instance { .. })
        });
        let mut path = if relative {
            self.instance_path_of_scope(scope)
        } else {
            Vec::new()
        };
        path.extend(target.iter().map(|(n, _)| *n));
        Some(path)
    }

    pub(crate) fn apply_defparams(
        &mut self,
        tree: &mut ParamOverrideNode,
        defparams: &[(Vec<NameId>, ConstantValue)],
    ) {
        for (path, value) in defparams {
            let Some((param, parents)) = path.split_last() else {
                continue;
            };
            let mut node = &mut *tree;
            for segment in parents {
                node = node.children.entry(*segment).or_default();
            }
            node.overrides.insert(*param, value.clone());
        }
    }

    // ========================================================================
    // Lazy binding drain
    // ========================================================================

    /// Visit the whole design, binding everything that is still deferred:
    /// initializers, continuous assigns, procedural bodies, function
    /// bodies, and port connections. Shared bodies are visited once.
    pub(crate) fn drain_semantic_bindings(&mut self) {
        let Some(root) = self.root() else {
            return;
        };
        let Some(root_scope) = self.symbol(root).owned_scope() else {
            return;
        };
        let mut visited = FxHashSet::default();
        // Packages first so their members are bound even when unused.
        let packages: Vec<SymbolId> = self.package_names.values().copied().collect();
        for pkg in packages {
            if let Some(scope) = self.symbol(pkg).owned_scope() {
                self.drain_scope(scope, &mut visited);
            }
        }
        self.drain_scope(root_scope, &mut visited);
    }

    fn drain_scope(&mut self, scope: ScopeId, visited: &mut FxHashSet<ScopeId>) {
        if !visited.insert(scope) || self.error_limit_exceeded() {
            return;
        }
        self.ensure_members(scope);

        let members = self.scope(scope).members.clone();
        for member in members {
            if self.error_limit_exceeded() {
                return;
            }
            match self.symbol(member).kind.clone() {
                SymbolKind::Variable {
                    ty, initializer, ..
                }
                | SymbolKind::Net {
                    ty, initializer, ..
                } => {
                    if let Some(init) = initializer {
                        let ctx = BindContext::new(
                            scope,
                            LookupLocation::new(scope, self.symbol(member).index),
                        )
                        .with_flags(bind_flags::NON_PROCEDURAL);
                        let _ = self.bind_assignment_like(ty, &init, &ctx);
                    }
                }
                SymbolKind::ContinuousAssign { target, value } => {
                    let ctx = BindContext::new(
                        scope,
                        LookupLocation::new(scope, self.symbol(member).index),
                    )
                    .with_flags(bind_flags::NON_PROCEDURAL);
                    let mut lhs = self.create_expression(&target, &ctx, None);
                    self.self_determined(&mut lhs, &ctx);
                    if !lhs.bad() && !lhs.is_lvalue() {
                        self.diag(&codes::BIND_NOT_ASSIGNABLE, target.span, vec![]);
                    }
                    let _ = self.bind_assignment_like(lhs.ty, &value, &ctx);
                }
                SymbolKind::ProceduralBlock { body, bound, .. } => {
                    if bound.is_some() {
                        continue;
                    }
                    let ctx = BindContext::new(
                        scope,
                        LookupLocation::new(scope, self.symbol(member).index),
                    );
                    let stmt = self.bind_statement(&body, &ctx, None);
                    if let SymbolKind::ProceduralBlock { bound, .. } =
                        &mut self.symbol_mut(member).kind
                    {
                        *bound = Some(std::sync::Arc::new(stmt));
                    }
                }
                SymbolKind::Subroutine { .. } => {
                    self.ensure_subroutine_body(member);
                }
                SymbolKind::Instance { body, .. } => {
                    self.bind_port_connections(member, scope);
                    self.drain_scope(body, visited);
                }
                SymbolKind::GenerateBlock { scope: inner } => {
                    self.drain_scope(inner, visited);
                }
                _ => {}
            }
        }
    }

    fn bind_port_connections(&mut self, inst: SymbolId, parent_scope: ScopeId) {
        let SymbolKind::Instance {
            definition,
            body,
            connections: conns,
        } = self.symbol(inst).kind.clone()
        else {
            return;
        };
        if conns.is_empty() {
            return;
        }
        let def = self.definition(definition).syntax.clone();
        self.ensure_members(body);

        let ports: Vec<(NameId, SymbolId)> = self
            .scope(body)
            .members
            .iter()
            .filter(|&&m| matches!(self.symbol(m).kind, SymbolKind::Port { .. }))
            .map(|&m| (self.symbol(m).name, m))
            .collect();

        let ctx = BindContext::new(parent_scope, LookupLocation::new(parent_scope, self.symbol(inst).index))
            .with_flags(bind_flags::NON_PROCEDURAL);
        let named = conns.iter().any(|c| c.name.is_some());
        if !named && conns.len() > ports.len() {
            let text = self.interner.resolve(def.name).to_string();
            self.diag(
                &codes::ELAB_TOO_MANY_CONNECTIONS,
                self.symbol(inst).span,
                vec!["port".into(), text, ports.len().to_string()],
            );
            return;
        }
        for (position, conn) in conns.iter().enumerate() {
            let port = if named {
                match conn.name {
                    Some((name, span)) => match ports.iter().find(|(n, _)| *n == name) {
                        Some((_, sym)) => Some(*sym),
                        None => {
                            let def_text = self.interner.resolve(def.name).to_string();
                            let name_text = self.interner.resolve(name).to_string();
                            self.diag(
                                &codes::ELAB_UNKNOWN_PORT,
                                span,
                                vec![def_text, name_text],
                            );
                            None
                        }
                    },
                    None => None,
                }
            } else {
                ports.get(position).map(|(_, sym)| *sym)
            };
            let (Some(port), Some(expr)) = (port, conn.expr.as_ref()) else {
                continue;
            };
            let ty = self
                .symbol(port)
                .value_type()
                .unwrap_or(self.types.builtins.error);
            let _ = self.bind_assignment_like(ty, expr, &ctx);
        }
    }

}
