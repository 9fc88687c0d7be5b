// src/sema/resolve.rs
//! Resolution of type syntax into interned types.

use crate::errors::codes;
use crate::frontend::ast::{RangeSyntax, TypeKeyword, TypeSyntax, TypeSyntaxKind};
use crate::sema::bind::BindContext;
use crate::sema::compilation::Compilation;
use crate::sema::lookup::lookup_flags;
use crate::sema::symbol::{DeclaredRange, SymbolKind};
use crate::sema::types::{IntegralFlags, TypeId, TypeKind};
use crate::value::ConstantValue;

/// A resolved type plus the declared bounds of its first packed dimension,
/// kept for select endianness.
pub struct ResolvedType {
    pub ty: TypeId,
    pub declared_range: DeclaredRange,
}

impl Compilation {
    /// Resolve a type reference in context. Never returns null: failures
    /// produce the error type after reporting.
    pub(crate) fn resolve_type(&mut self, syntax: &TypeSyntax, ctx: &BindContext) -> ResolvedType {
        let (base, base_signed_default) = match &syntax.kind {
            TypeSyntaxKind::Keyword(kw) => {
                let ty = self.types.for_keyword(*kw);
                let default_signed = matches!(
                    kw,
                    TypeKeyword::Byte
                        | TypeKeyword::ShortInt
                        | TypeKeyword::Int
                        | TypeKeyword::LongInt
                        | TypeKeyword::Integer
                );
                (ty, default_signed)
            }
            TypeSyntaxKind::Implicit => {
                // An implicit type with dimensions is a logic vector; a bare
                // implicit type is a single logic bit. Callers that infer
                // from an initializer check for Implicit before calling.
                (self.types.builtins.logic, false)
            }
            TypeSyntaxKind::Named(name) => {
                let result = self.lookup_name(
                    &[(*name, syntax.span)],
                    ctx.location,
                    lookup_flags::TYPE,
                );
                match result.found {
                    Some(sym) => match &self.symbol(sym).kind {
                        SymbolKind::TypeAlias { target } => (*target, false),
                        _ => {
                            let text = self.interner.resolve(*name).to_string();
                            self.diag(&codes::BIND_NOT_A_TYPE, syntax.span, vec![text]);
                            return self.error_resolved();
                        }
                    },
                    None => return self.error_resolved(),
                }
            }
            TypeSyntaxKind::Scoped(pkg, name) => {
                match self.lookup_package_member(*pkg, syntax.span, *name, syntax.span) {
                    Some(sym) => match &self.symbol(sym).kind {
                        SymbolKind::TypeAlias { target } => (*target, false),
                        _ => {
                            let text = self.interner.resolve(*name).to_string();
                            self.diag(&codes::BIND_NOT_A_TYPE, syntax.span, vec![text]);
                            return self.error_resolved();
                        }
                    },
                    None => return self.error_resolved(),
                }
            }
            TypeSyntaxKind::Enum { base, members } => {
                let base_ty = match base {
                    Some(b) => self.resolve_type(b, ctx).ty,
                    None => self.types.builtins.int,
                };
                let enum_ty = self.types.make_enum(base_ty);
                self.materialize_enum_members(enum_ty, base_ty, members, ctx);
                (enum_ty, false)
            }
            TypeSyntaxKind::PackedStruct { members } => {
                let mut fields = Vec::with_capacity(members.len());
                let mut width = 0u32;
                let mut four_state = false;
                let mut ok = true;
                for member in members {
                    let resolved = self.resolve_type(&member.ty, ctx);
                    match self.types.bit_width(resolved.ty) {
                        Some(w) => {
                            width += w;
                            four_state |= self.types.is_four_state(resolved.ty);
                        }
                        None => {
                            if !self.types.is_error(resolved.ty) {
                                let text =
                                    self.types.name(resolved.ty, &self.interner);
                                self.diag(
                                    &codes::BIND_INVALID_CONCAT,
                                    member.ty.span,
                                    vec![text],
                                );
                            }
                            ok = false;
                        }
                    }
                    fields.push((member.name, resolved.ty));
                }
                if !ok {
                    return self.error_resolved();
                }
                let ty = self.types.intern(TypeKind::PackedStruct {
                    members: fields,
                    width: width.max(1),
                    signed: syntax.signing.unwrap_or(false),
                    four_state,
                });
                (ty, false)
            }
        };

        if self.types.is_error(base) {
            return self.error_resolved();
        }

        // Apply signing and packed dimensions over the base type.
        let mut ty = base;
        if let Some(signed) = syntax.signing {
            if let Some(width) = self.types.bit_width(ty) {
                let four_state = self.types.is_four_state(ty);
                ty = self
                    .types
                    .integral(width, IntegralFlags::new(signed, four_state));
            }
        } else if base_signed_default {
            // Predefined integer keywords are inherently signed; nothing to
            // do, the builtin already carries the flag.
        }

        if syntax.packed_dims.is_empty() {
            return ResolvedType {
                ty,
                declared_range: None,
            };
        }

        let Some(mut width) = self.types.bit_width(ty) else {
            let text = self.types.name(ty, &self.interner);
            self.diag(&codes::BIND_DIMS_ON_NON_INTEGRAL, syntax.span, vec![text]);
            return self.error_resolved();
        };
        let signed = self.types.is_signed(ty);
        let four_state = self.types.is_four_state(ty);

        let mut declared_range = None;
        let mut ok = true;
        for (i, dim) in syntax.packed_dims.iter().enumerate() {
            match self.resolve_packed_dim(dim, ctx) {
                Some((left, right)) => {
                    let dim_width = (left - right).unsigned_abs() as u32 + 1;
                    width = width.saturating_mul(dim_width);
                    if i == 0 {
                        declared_range = Some((left, right));
                    }
                }
                None => ok = false,
            }
        }
        if !ok {
            return self.error_resolved();
        }

        ResolvedType {
            ty: self
                .types
                .integral(width, IntegralFlags::new(signed, four_state)),
            declared_range,
        }
    }

    /// Evaluate one packed dimension's bounds as constants.
    pub(crate) fn resolve_packed_dim(
        &mut self,
        dim: &RangeSyntax,
        ctx: &BindContext,
    ) -> Option<(i64, i64)> {
        let left = self.bind_constant_int(&dim.left, ctx)?;
        let right = self.bind_constant_int(&dim.right, ctx)?;
        Some((left, right))
    }

    fn materialize_enum_members(
        &mut self,
        enum_ty: TypeId,
        base_ty: TypeId,
        members: &[crate::frontend::ast::EnumMemberSyntax],
        ctx: &BindContext,
    ) {
        let width = self.types.bit_width(base_ty).unwrap_or(32);
        let signed = self.types.is_signed(base_ty);
        let mut next = crate::value::SvInt::from_u64(width, signed, 0);
        for member in members {
            let value = match &member.init {
                Some(init) => match self.bind_constant_value(init, ctx) {
                    Some(ConstantValue::Int(v)) => v.resize(width, signed),
                    _ => next.clone(),
                },
                None => next.clone(),
            };
            next = value.add(&crate::value::SvInt::from_u64(width, signed, 1));
            let sym = self.alloc_symbol(
                SymbolKind::EnumValue {
                    ty: enum_ty,
                    value: ConstantValue::Int(value),
                },
                member.name,
                member.name_span,
            );
            self.add_member(ctx.scope, sym);
        }
    }

    fn error_resolved(&self) -> ResolvedType {
        ResolvedType {
            ty: self.types.builtins.error,
            declared_range: None,
        }
    }
}
