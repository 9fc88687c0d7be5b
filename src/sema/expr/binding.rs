// src/sema/expr/binding.rs
//! The creation pass: syntax to self-determined expression nodes.

use std::sync::Arc;

use crate::errors::codes;
use crate::frontend::ast::{
    BinaryOpSyntax, CaseKind, ExprSyntax, ExprSyntaxKind, RangeSelectKind, StmtSyntax,
    StmtSyntaxKind, UnaryOpSyntax,
};
use crate::frontend::{NameId, Span};
use crate::sema::bind::{bind_flags, BindContext};
use crate::sema::compilation::Compilation;
use crate::sema::expr::eval::EvalContext;
use crate::sema::expr::{
    BinaryOperator, BoundStmt, Expression, ExpressionKind, RangeSelectionKind, SystemFunction,
    UnaryOperator,
};
use crate::sema::lookup::lookup_flags;
use crate::sema::scope::LookupLocation;
use crate::sema::symbol::{ScopeId, SymbolId, SymbolKind};
use crate::sema::types::{IntegralFlags, TypeId, TypeKind};
use crate::value::{ConstantValue, LiteralBase, Logic, SvInt};

impl Compilation {
    /// Bind an expression tree: creation pass followed by self-determined
    /// propagation. Folds the result when the context demands a constant.
    pub(crate) fn bind_expression(&mut self, syntax: &ExprSyntax, ctx: &BindContext) -> Expression {
        let mut expr = self.create_expression(syntax, ctx, None);
        self.self_determined(&mut expr, ctx);
        if ctx.requires_constant() {
            self.fold_constant(&mut expr, ctx);
        }
        expr
    }

    /// Bind an expression against an assignment target: the right-hand side
    /// of an assignment, a connection, or an initializer.
    pub(crate) fn bind_assignment_like(
        &mut self,
        target: TypeId,
        syntax: &ExprSyntax,
        ctx: &BindContext,
    ) -> Expression {
        let expr = self.create_expression(syntax, ctx, Some(target));
        let mut expr = self.convert_assignment(target, expr, ctx);
        if ctx.requires_constant() {
            self.fold_constant(&mut expr, ctx);
        }
        expr
    }

    /// Bind with the constant flag set and return the folded value.
    pub(crate) fn bind_constant_value(
        &mut self,
        syntax: &ExprSyntax,
        ctx: &BindContext,
    ) -> Option<ConstantValue> {
        let ctx = ctx.with_flags(bind_flags::CONSTANT);
        let expr = self.bind_expression(syntax, &ctx);
        match &expr.constant {
            Some(v) if !v.is_err() => Some(v.clone()),
            _ => None,
        }
    }

    /// A constant that must be an integer; reports through the usual paths.
    pub(crate) fn bind_constant_int(
        &mut self,
        syntax: &ExprSyntax,
        ctx: &BindContext,
    ) -> Option<i64> {
        let value = self.bind_constant_value(syntax, ctx)?;
        value.integer().and_then(|v| v.to_i64())
    }

    /// Evaluate an expression with no surrounding design context; used for
    /// command-line parameter override values.
    pub(crate) fn eval_standalone_constant(&mut self, syntax: &ExprSyntax) -> Option<ConstantValue> {
        let unit = self.alloc_symbol(
            SymbolKind::CompilationUnit {
                scope: ScopeId(0),
            },
            NameId::EMPTY,
            Span::default(),
        );
        let scope = self.alloc_scope(unit);
        if let SymbolKind::CompilationUnit { scope: s } = &mut self.symbol_mut(unit).kind {
            *s = scope;
        }
        let ctx = BindContext::constant(scope, LookupLocation::new(scope, u32::MAX));
        self.bind_constant_value(syntax, &ctx)
    }

    pub(crate) fn fold_constant(&mut self, expr: &mut Expression, _ctx: &BindContext) {
        if expr.bad() {
            return;
        }
        let mut eval = EvalContext::new(self);
        let verified = eval.verify_constant(expr);
        let value = if verified { eval.eval(expr) } else { ConstantValue::Err };
        let reports = eval.take_reports();
        for (code, span, args) in reports {
            self.diag(code, span, args);
        }
        if !value.is_err() {
            expr.constant = Some(value);
        }
    }

    // ========================================================================
    // Creation pass
    // ========================================================================

    pub(crate) fn create_expression(
        &mut self,
        syntax: &ExprSyntax,
        ctx: &BindContext,
        target: Option<TypeId>,
    ) -> Expression {
        let span = syntax.span;
        match &syntax.kind {
            ExprSyntaxKind::IntLiteral(lit) => {
                let base = lit.base.unwrap_or(LiteralBase::Decimal);
                let four_state_literal = lit.base.is_some();
                match SvInt::from_digits(lit.size, lit.signed || lit.base.is_none(), base, &lit.digits)
                {
                    Some(value) => {
                        let flags = IntegralFlags::new(value.is_signed(), four_state_literal);
                        let ty = self.types.integral(value.width(), flags);
                        Expression::new(
                            ExpressionKind::IntegerLiteral {
                                value,
                                declared_unsized: lit.size.is_none(),
                            },
                            ty,
                            span,
                        )
                    }
                    None => {
                        self.diag(&codes::LEXER_INVALID_NUMBER, span, vec![]);
                        self.bad_expr(span)
                    }
                }
            }
            ExprSyntaxKind::UnbasedLiteral(c) => {
                let bit = Logic::from_char(*c).unwrap_or(Logic::X);
                let ty = self.types.builtins.logic;
                Expression::new(ExpressionKind::UnbasedUnsizedLiteral(bit), ty, span)
            }
            ExprSyntaxKind::RealLiteral(v) => {
                Expression::new(ExpressionKind::RealLiteral(*v), self.types.builtins.real, span)
            }
            ExprSyntaxKind::StringLiteral(s) => Expression::new(
                ExpressionKind::StringLiteral(s.clone()),
                self.types.builtins.string,
                span,
            ),
            ExprSyntaxKind::NullLiteral => {
                Expression::new(ExpressionKind::NullLiteral, self.types.builtins.null, span)
            }
            ExprSyntaxKind::UnboundedLiteral => Expression::new(
                ExpressionKind::NullLiteral,
                self.types.builtins.unbounded,
                span,
            ),
            ExprSyntaxKind::Identifier(_) | ExprSyntaxKind::MemberAccess(..) => {
                match syntax.as_name_path() {
                    Some(path) => self.bind_name(&path, ctx, span),
                    None => {
                        // Member access on a non-name base: bind the base
                        // value, then the member selection.
                        let ExprSyntaxKind::MemberAccess(base, member, member_span) = &syntax.kind
                        else {
                            unreachable!()
                        };
                        let mut base = self.create_expression(base, ctx, None);
                        self.self_determined(&mut base, ctx);
                        self.bind_member_access(base, *member, *member_span, span)
                    }
                }
            }
            ExprSyntaxKind::Scoped(pkg, pkg_span, name, name_span) => {
                match self.lookup_package_member(*pkg, *pkg_span, *name, *name_span) {
                    Some(sym) => self.bind_symbol_reference(sym, span),
                    None => self.bad_expr(span),
                }
            }
            ExprSyntaxKind::Paren(inner) => self.create_expression(inner, ctx, target),
            ExprSyntaxKind::Unary(op, operand) => self.bind_unary(*op, operand, ctx, span),
            ExprSyntaxKind::Binary(op, lhs, rhs) => self.bind_binary(*op, lhs, rhs, ctx, span),
            ExprSyntaxKind::Conditional(cond, left, right) => {
                self.bind_conditional(cond, left, right, ctx, span, target)
            }
            ExprSyntaxKind::Concat(operands) => self.bind_concat(operands, ctx, span),
            ExprSyntaxKind::Replication(count, operands) => {
                self.bind_replication(count, operands, ctx, span)
            }
            ExprSyntaxKind::ElementSelect(base, index) => {
                self.bind_element_select(base, index, ctx, span)
            }
            ExprSyntaxKind::RangeSelect(base, kind, left, right) => {
                self.bind_range_select(base, *kind, left, right, ctx, span)
            }
            ExprSyntaxKind::Call(callee, args) => self.bind_call(callee, args, ctx, span),
            ExprSyntaxKind::SystemCall(name, name_span, args) => {
                self.bind_system_call(*name, *name_span, args, ctx, span)
            }
            ExprSyntaxKind::AssignmentPattern(items) => {
                self.bind_assignment_pattern(items, ctx, span, target)
            }
            ExprSyntaxKind::ReplicatedPattern(count, elements) => {
                self.bind_replicated_pattern(count, elements, ctx, span, target)
            }
        }
    }

    pub(crate) fn bad_expr(&self, span: Span) -> Expression {
        Expression::invalid(self.types.builtins.error, span)
    }

    // ========================================================================
    // Names
    // ========================================================================

    fn bind_name(&mut self, path: &[(NameId, Span)], ctx: &BindContext, span: Span) -> Expression {
        let mut flags = lookup_flags::NONE;
        if ctx.requires_constant() {
            flags |= lookup_flags::CONSTANT;
        }
        let result = self.lookup_name(path, ctx.location, flags);
        let Some(sym) = result.found else {
            return self.bad_expr(span);
        };

        let mut expr = self.bind_symbol_reference(sym, span);
        // Leftover segments select members of the found value.
        for &(member, member_span) in &path[result.consumed..] {
            expr = self.bind_member_access(expr, member, member_span, span);
        }
        expr
    }

    fn bind_symbol_reference(&mut self, sym: SymbolId, span: Span) -> Expression {
        let symbol = self.symbol(sym);
        if let Some(ty) = symbol.value_type() {
            return Expression::new(ExpressionKind::NamedValue { symbol: sym }, ty, span);
        }
        match &symbol.kind {
            SymbolKind::TypeAlias { target } => {
                let ty = *target;
                Expression::new(ExpressionKind::DataType(ty), ty, span)
            }
            _ => {
                let text = self.interner.resolve(symbol.name).to_string();
                self.diag(&codes::BIND_NOT_A_VALUE, span, vec![text]);
                self.bad_expr(span)
            }
        }
    }

    fn bind_member_access(
        &mut self,
        base: Expression,
        member: NameId,
        member_span: Span,
        span: Span,
    ) -> Expression {
        if base.bad() {
            return base;
        }
        let Some(members) = self.types.struct_members(base.ty).map(|m| m.to_vec()) else {
            let text = self.types.name(base.ty, &self.interner);
            self.diag(&codes::BIND_INVALID_SELECT, member_span, vec![text]);
            return self.bad_expr(span);
        };
        let Some(position) = members.iter().position(|(name, _)| *name == member) else {
            let member_text = self.interner.resolve(member).to_string();
            let type_text = self.types.name(base.ty, &self.interner);
            self.diag(
                &codes::LOOKUP_UNKNOWN_MEMBER,
                member_span,
                vec![member_text, type_text],
            );
            return self.bad_expr(span);
        };

        // The first declared member sits in the most significant bits.
        let member_ty = members[position].1;
        let bit_width = self.types.bit_width(member_ty).unwrap_or(1);
        let bit_offset: u32 = members[position + 1..]
            .iter()
            .map(|(_, t)| self.types.bit_width(*t).unwrap_or(0))
            .sum();
        Expression::new(
            ExpressionKind::MemberAccess {
                value: Box::new(base),
                member,
                bit_offset,
                bit_width,
            },
            member_ty,
            span,
        )
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn bind_unary(
        &mut self,
        op: UnaryOpSyntax,
        operand_syntax: &ExprSyntax,
        ctx: &BindContext,
        span: Span,
    ) -> Expression {
        let op = convert_unary(op);
        let mut operand = self.create_expression(operand_syntax, ctx, None);
        if operand.bad() {
            return self.bad_expr(span);
        }

        let ty = match op {
            UnaryOperator::Plus | UnaryOperator::Minus | UnaryOperator::BitwiseNot => {
                if op != UnaryOperator::BitwiseNot && self.types.is_real(operand.ty) {
                    operand.ty
                } else if self.types.is_integral(operand.ty) {
                    // Context-determined: keeps the operand's type for now.
                    let width = self.types.bit_width(operand.ty).unwrap_or(1);
                    self.types.integral(
                        width,
                        IntegralFlags::new(
                            self.types.is_signed(operand.ty),
                            self.types.is_four_state(operand.ty),
                        ),
                    )
                } else {
                    return self.bad_unary(op, &operand, span);
                }
            }
            UnaryOperator::LogicalNot => {
                if !self.types.is_numeric(operand.ty) {
                    return self.bad_unary(op, &operand, span);
                }
                self.self_determined(&mut operand, ctx);
                self.one_bit(self.types.is_four_state(operand.ty))
            }
            _ => {
                // Reductions need an integral operand.
                if !self.types.is_integral(operand.ty) {
                    return self.bad_unary(op, &operand, span);
                }
                self.self_determined(&mut operand, ctx);
                self.one_bit(self.types.is_four_state(operand.ty))
            }
        };

        Expression::new(
            ExpressionKind::UnaryOp {
                op,
                operand: Box::new(operand),
            },
            ty,
            span,
        )
    }

    fn bad_unary(&mut self, op: UnaryOperator, operand: &Expression, span: Span) -> Expression {
        let text = self.types.name(operand.ty, &self.interner);
        let op_text = match op {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::BitwiseNot => "~",
            UnaryOperator::LogicalNot => "!",
            _ => "reduction",
        };
        self.diag(
            &codes::BIND_BAD_UNARY_OPERAND,
            span,
            vec![text, op_text.to_string()],
        );
        self.bad_expr(span)
    }

    fn bind_binary(
        &mut self,
        op: BinaryOpSyntax,
        lhs_syntax: &ExprSyntax,
        rhs_syntax: &ExprSyntax,
        ctx: &BindContext,
        span: Span,
    ) -> Expression {
        let op = convert_binary(op);
        let mut lhs = self.create_expression(lhs_syntax, ctx, None);
        let mut rhs = self.create_expression(rhs_syntax, ctx, None);
        if lhs.bad() || rhs.bad() {
            return self.bad_expr(span);
        }

        let ty = if op.is_context_determined() {
            match self.common_numeric_type(&lhs, &rhs) {
                Some(ty) => ty,
                None => return self.bad_binary(op, &lhs, &rhs, span),
            }
        } else if op.is_comparison() {
            let both_strings =
                self.types.is_string(lhs.ty) && self.types.is_string(rhs.ty);
            if !both_strings && self.common_numeric_type(&lhs, &rhs).is_none() {
                return self.bad_binary(op, &lhs, &rhs, span);
            }
            // Operands get their common type during propagation; case
            // equality is always two-state.
            let four_state = !matches!(
                op,
                BinaryOperator::CaseEquality | BinaryOperator::CaseInequality
            ) && (self.types.is_four_state(lhs.ty)
                || self.types.is_four_state(rhs.ty));
            self.one_bit(four_state)
        } else if op.is_logical() {
            if !self.types.is_numeric(lhs.ty) || !self.types.is_numeric(rhs.ty) {
                return self.bad_binary(op, &lhs, &rhs, span);
            }
            self.self_determined(&mut lhs, ctx);
            self.self_determined(&mut rhs, ctx);
            self.one_bit(
                self.types.is_four_state(lhs.ty) || self.types.is_four_state(rhs.ty),
            )
        } else {
            // Shifts and power: the result takes the left operand's type and
            // the right operand is self-determined.
            if !self.types.is_integral(lhs.ty) || !self.types.is_integral(rhs.ty) {
                return self.bad_binary(op, &lhs, &rhs, span);
            }
            self.self_determined(&mut rhs, ctx);
            lhs.ty
        };

        Expression::new(
            ExpressionKind::BinaryOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
            span,
        )
    }

    fn bad_binary(
        &mut self,
        op: BinaryOperator,
        lhs: &Expression,
        rhs: &Expression,
        span: Span,
    ) -> Expression {
        let lt = self.types.name(lhs.ty, &self.interner);
        let rt = self.types.name(rhs.ty, &self.interner);
        self.diag(
            &codes::BIND_BAD_OPERANDS,
            span,
            vec![lt, rt, op.symbol().to_string()],
        );
        self.bad_expr(span)
    }

    /// The combined type of two numeric operands: max width, signed only if
    /// both are signed, four-state if either is. Reals absorb integrals.
    pub(crate) fn common_numeric_type(
        &mut self,
        lhs: &Expression,
        rhs: &Expression,
    ) -> Option<TypeId> {
        if self.types.is_real(lhs.ty) || self.types.is_real(rhs.ty) {
            if self.types.is_numeric(lhs.ty) && self.types.is_numeric(rhs.ty) {
                return Some(self.types.builtins.real);
            }
            return None;
        }
        if !self.types.is_integral(lhs.ty) || !self.types.is_integral(rhs.ty) {
            return None;
        }
        let width = self
            .types
            .bit_width(lhs.ty)?
            .max(self.types.bit_width(rhs.ty)?);
        let signed = self.types.is_signed(lhs.ty) && self.types.is_signed(rhs.ty);
        let four_state =
            self.types.is_four_state(lhs.ty) || self.types.is_four_state(rhs.ty);
        Some(self.types.integral(width, IntegralFlags::new(signed, four_state)))
    }

    pub(crate) fn one_bit(&mut self, four_state: bool) -> TypeId {
        self.types.integral(1, IntegralFlags::new(false, four_state))
    }

    fn bind_conditional(
        &mut self,
        cond_syntax: &ExprSyntax,
        left_syntax: &ExprSyntax,
        right_syntax: &ExprSyntax,
        ctx: &BindContext,
        span: Span,
        target: Option<TypeId>,
    ) -> Expression {
        let mut cond = self.create_expression(cond_syntax, ctx, None);
        self.self_determined(&mut cond, ctx);
        let left = self.create_expression(left_syntax, ctx, target);
        let right = self.create_expression(right_syntax, ctx, target);
        if cond.bad() || left.bad() || right.bad() {
            return self.bad_expr(span);
        }

        let ty = if left.ty == right.ty {
            left.ty
        } else {
            match self.common_numeric_type(&left, &right) {
                Some(ty) => ty,
                None => {
                    let lt = self.types.name(left.ty, &self.interner);
                    let rt = self.types.name(right.ty, &self.interner);
                    self.diag(&codes::BIND_TYPE_MISMATCH, span, vec![lt, rt]);
                    return self.bad_expr(span);
                }
            }
        };

        Expression::new(
            ExpressionKind::ConditionalOp {
                cond: Box::new(cond),
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
            span,
        )
    }

    fn bind_concat(
        &mut self,
        operand_syntax: &[ExprSyntax],
        ctx: &BindContext,
        span: Span,
    ) -> Expression {
        let inner = ctx.with_flags(bind_flags::INSIDE_CONCAT);
        let mut operands = Vec::with_capacity(operand_syntax.len());
        let mut bad = false;
        for syntax in operand_syntax {
            let mut operand = self.create_expression(syntax, &inner, None);
            self.self_determined(&mut operand, &inner);
            if operand.bad() {
                bad = true;
            }
            operands.push(operand);
        }
        if bad {
            return self.bad_expr(span);
        }

        // String concatenation only when every operand is string-convertible;
        // otherwise all operands must be integral.
        let string_concat = !operands.is_empty()
            && operands.iter().all(|o| {
                self.types.is_string(o.ty)
                    || matches!(o.kind, ExpressionKind::StringLiteral(_))
            });
        let mut width = 0u32;
        let mut four_state = false;
        if !string_concat {
            for operand in &operands {
                match self.types.bit_width(operand.ty) {
                    Some(w) => {
                        width += w;
                        four_state |= self.types.is_four_state(operand.ty);
                    }
                    None => {
                        let text = self.types.name(operand.ty, &self.interner);
                        self.diag(&codes::BIND_INVALID_CONCAT, operand.span, vec![text]);
                        bad = true;
                    }
                }
            }
            if bad {
                return self.bad_expr(span);
            }
        }
        let ty = if string_concat {
            self.types.builtins.string
        } else {
            self.types
                .integral(width.max(1), IntegralFlags::new(false, four_state))
        };
        Expression::new(
            ExpressionKind::Concatenation {
                operands,
                string_concat,
            },
            ty,
            span,
        )
    }

    fn bind_replication(
        &mut self,
        count_syntax: &ExprSyntax,
        operand_syntax: &[ExprSyntax],
        ctx: &BindContext,
        span: Span,
    ) -> Expression {
        let Some(count) = self.bind_constant_int(count_syntax, ctx) else {
            return self.bad_expr(span);
        };
        let mut count_expr = self.bind_expression(count_syntax, &ctx.with_flags(bind_flags::CONSTANT));
        count_expr.constant = Some(ConstantValue::Int(SvInt::from_i64(32, count)));

        let concat = self.bind_concat(operand_syntax, ctx, span);
        if concat.bad() || count < 0 {
            return self.bad_expr(span);
        }

        let ty = if self.types.is_string(concat.ty) {
            self.types.builtins.string
        } else {
            let width = self.types.bit_width(concat.ty).unwrap_or(1);
            let four_state = self.types.is_four_state(concat.ty);
            self.types.integral(
                width.saturating_mul(count.max(0) as u32).max(1),
                IntegralFlags::new(false, four_state),
            )
        };
        Expression::new(
            ExpressionKind::Replication {
                count: Box::new(count_expr),
                concat: Box::new(concat),
            },
            ty,
            span,
        )
    }

    // ========================================================================
    // Selects
    // ========================================================================

    /// The declared (left, right) bounds of the dimension being selected.
    fn select_range_of(&self, base: &Expression) -> (i64, i64) {
        if let ExpressionKind::NamedValue { symbol } = &base.kind {
            if let Some(range) = self.symbol(*symbol).declared_range() {
                return range;
            }
        }
        let width = self.types.bit_width(base.ty).unwrap_or(1);
        (width as i64 - 1, 0)
    }

    fn bind_element_select(
        &mut self,
        base_syntax: &ExprSyntax,
        index_syntax: &ExprSyntax,
        ctx: &BindContext,
        span: Span,
    ) -> Expression {
        let mut base = self.create_expression(base_syntax, ctx, None);
        self.self_determined(&mut base, ctx);
        let mut index = self.create_expression(index_syntax, ctx, None);
        self.self_determined(&mut index, ctx);
        if base.bad() || index.bad() {
            return self.bad_expr(span);
        }

        match self.types.get(self.types.canonical(base.ty)).clone() {
            TypeKind::UnpackedArray { elem, left, right } => Expression::new(
                ExpressionKind::ElementSelect {
                    value: Box::new(base),
                    selector: Box::new(index),
                    range: (left, right),
                },
                elem,
                span,
            ),
            TypeKind::Integral { four_state, .. } => {
                let range = self.select_range_of(&base);
                let ty = self.one_bit(four_state);
                Expression::new(
                    ExpressionKind::ElementSelect {
                        value: Box::new(base),
                        selector: Box::new(index),
                        range,
                    },
                    ty,
                    span,
                )
            }
            _ => {
                let text = self.types.name(base.ty, &self.interner);
                self.diag(&codes::BIND_INVALID_SELECT, span, vec![text]);
                self.bad_expr(span)
            }
        }
    }

    fn bind_range_select(
        &mut self,
        base_syntax: &ExprSyntax,
        kind: RangeSelectKind,
        left_syntax: &ExprSyntax,
        right_syntax: &ExprSyntax,
        ctx: &BindContext,
        span: Span,
    ) -> Expression {
        let mut base = self.create_expression(base_syntax, ctx, None);
        self.self_determined(&mut base, ctx);
        if base.bad() {
            return self.bad_expr(span);
        }
        if !self.types.is_integral(base.ty) {
            let text = self.types.name(base.ty, &self.interner);
            self.diag(&codes::BIND_INVALID_SELECT, span, vec![text]);
            return self.bad_expr(span);
        }
        let range = self.select_range_of(&base);
        let four_state = self.types.is_four_state(base.ty);

        let kind = match kind {
            RangeSelectKind::Simple => RangeSelectionKind::Simple,
            RangeSelectKind::IndexedUp => RangeSelectionKind::IndexedUp,
            RangeSelectKind::IndexedDown => RangeSelectionKind::IndexedDown,
        };

        let (left, right, width) = match kind {
            RangeSelectionKind::Simple => {
                let Some(left_val) = self.bind_constant_int(left_syntax, ctx) else {
                    return self.bad_expr(span);
                };
                let Some(right_val) = self.bind_constant_int(right_syntax, ctx) else {
                    return self.bad_expr(span);
                };
                // The select must run in the same direction as the range.
                let descending = range.0 >= range.1;
                if (left_val >= right_val) != descending && left_val != right_val {
                    self.diag(&codes::BIND_REVERSED_RANGE, span, vec![]);
                    return self.bad_expr(span);
                }
                let left_expr = self.bind_expression(left_syntax, &ctx.with_flags(bind_flags::CONSTANT));
                let right_expr =
                    self.bind_expression(right_syntax, &ctx.with_flags(bind_flags::CONSTANT));
                let width = (left_val - right_val).unsigned_abs() as u32 + 1;
                (left_expr, right_expr, width)
            }
            RangeSelectionKind::IndexedUp | RangeSelectionKind::IndexedDown => {
                let mut base_expr = self.create_expression(left_syntax, ctx, None);
                self.self_determined(&mut base_expr, ctx);
                let Some(width_val) = self.bind_constant_int(right_syntax, ctx) else {
                    return self.bad_expr(span);
                };
                if width_val <= 0 {
                    self.diag(&codes::BIND_REVERSED_RANGE, span, vec![]);
                    return self.bad_expr(span);
                }
                let width_expr =
                    self.bind_expression(right_syntax, &ctx.with_flags(bind_flags::CONSTANT));
                (base_expr, width_expr, width_val as u32)
            }
        };

        let ty = self
            .types
            .integral(width, IntegralFlags::new(false, four_state));
        Expression::new(
            ExpressionKind::RangeSelect {
                value: Box::new(base),
                kind,
                left: Box::new(left),
                right: Box::new(right),
                range,
            },
            ty,
            span,
        )
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn bind_call(
        &mut self,
        callee: &ExprSyntax,
        arg_syntax: &[ExprSyntax],
        ctx: &BindContext,
        span: Span,
    ) -> Expression {
        let path = match &callee.kind {
            ExprSyntaxKind::Identifier(_) => callee.as_name_path(),
            ExprSyntaxKind::Scoped(pkg, pkg_span, name, name_span) => {
                let sym = self.lookup_package_member(*pkg, *pkg_span, *name, *name_span);
                return match sym {
                    Some(sym) => self.bind_call_to(sym, arg_syntax, ctx, span),
                    None => self.bad_expr(span),
                };
            }
            _ => None,
        };
        let Some(path) = path else {
            self.diag(&codes::BIND_NOT_CALLABLE, span, vec!["expression".into()]);
            return self.bad_expr(span);
        };

        let mut flags = lookup_flags::NONE;
        if ctx.requires_constant() {
            flags |= lookup_flags::CONSTANT;
        }
        let result = self.lookup_name(&path, ctx.location, flags);
        match result.found {
            Some(sym) => self.bind_call_to(sym, arg_syntax, ctx, span),
            None => self.bad_expr(span),
        }
    }

    fn bind_call_to(
        &mut self,
        sym: SymbolId,
        arg_syntax: &[ExprSyntax],
        ctx: &BindContext,
        span: Span,
    ) -> Expression {
        let SymbolKind::Subroutine {
            return_type, args, ..
        } = &self.symbol(sym).kind
        else {
            let text = self.interner.resolve(self.symbol(sym).name).to_string();
            self.diag(&codes::BIND_NOT_CALLABLE, span, vec![text]);
            return self.bad_expr(span);
        };
        let return_type = *return_type;
        let formals = args.clone();

        if formals.len() != arg_syntax.len() {
            let name = self.interner.resolve(self.symbol(sym).name).to_string();
            self.diag(
                &codes::BIND_CALL_ARG_COUNT,
                span,
                vec![
                    formals.len().to_string(),
                    name,
                    arg_syntax.len().to_string(),
                ],
            );
            return self.bad_expr(span);
        }

        let mut bound_args = Vec::with_capacity(arg_syntax.len());
        for (formal, arg) in formals.iter().zip(arg_syntax) {
            let formal_ty = self
                .symbol(*formal)
                .value_type()
                .unwrap_or(self.types.builtins.error);
            bound_args.push(self.bind_assignment_like(formal_ty, arg, ctx));
        }

        // Constant contexts interpret the body, so it must be bound now.
        if ctx.requires_constant() {
            self.ensure_subroutine_body(sym);
        }

        Expression::new(
            ExpressionKind::Call {
                subroutine: sym,
                args: bound_args,
            },
            return_type,
            span,
        )
    }

    fn bind_system_call(
        &mut self,
        name: NameId,
        name_span: Span,
        arg_syntax: &[ExprSyntax],
        ctx: &BindContext,
        span: Span,
    ) -> Expression {
        let text = self.interner.resolve(name).to_string();
        let function = match text.as_str() {
            "$clog2" => SystemFunction::Clog2,
            "$bits" => SystemFunction::Bits,
            "$signed" => SystemFunction::Signed,
            "$unsigned" => SystemFunction::Unsigned,
            "$display" | "$write" | "$monitor" | "$strobe" | "$error" | "$warning" | "$info"
            | "$fatal" | "$finish" | "$stop" | "$time" => SystemFunction::Display,
            _ => {
                self.diag(&codes::LOOKUP_UNKNOWN_SYSTEM_NAME, name_span, vec![text]);
                return self.bad_expr(span);
            }
        };

        let expected_args: Option<usize> = match function {
            SystemFunction::Clog2 | SystemFunction::Bits | SystemFunction::Signed
            | SystemFunction::Unsigned => Some(1),
            SystemFunction::Display => None,
        };
        if let Some(expected) = expected_args {
            if arg_syntax.len() != expected {
                self.diag(
                    &codes::BIND_CALL_ARG_COUNT,
                    span,
                    vec![expected.to_string(), text, arg_syntax.len().to_string()],
                );
                return self.bad_expr(span);
            }
        }

        let mut args = Vec::with_capacity(arg_syntax.len());
        for arg in arg_syntax {
            let mut bound = self.create_expression(arg, ctx, None);
            self.self_determined(&mut bound, ctx);
            args.push(bound);
        }

        let ty = match function {
            SystemFunction::Clog2 | SystemFunction::Bits => self.types.builtins.integer,
            SystemFunction::Signed | SystemFunction::Unsigned => {
                let operand_ty = args.first().map(|a| a.ty).unwrap_or(self.types.builtins.error);
                match self.types.bit_width(operand_ty) {
                    Some(width) => {
                        let four_state = self.types.is_four_state(operand_ty);
                        let signed = function == SystemFunction::Signed;
                        self.types
                            .integral(width, IntegralFlags::new(signed, four_state))
                    }
                    None => self.types.builtins.error,
                }
            }
            SystemFunction::Display => self.types.builtins.void,
        };

        Expression::new(
            ExpressionKind::SystemCall {
                function,
                name,
                args,
            },
            ty,
            span,
        )
    }

    // ========================================================================
    // Assignment patterns
    // ========================================================================

    fn bind_assignment_pattern(
        &mut self,
        items: &[crate::frontend::ast::AssignmentPatternItem],
        ctx: &BindContext,
        span: Span,
        target: Option<TypeId>,
    ) -> Expression {
        let Some(target) = target else {
            self.diag(&codes::BIND_PATTERN_NO_CONTEXT, span, vec![]);
            return self.bad_expr(span);
        };

        let structured = items.iter().any(|i| i.key.is_some());
        if structured {
            let Some(members) = self.types.struct_members(target).map(|m| m.to_vec()) else {
                let text = self.types.name(target, &self.interner);
                self.diag(&codes::BIND_TYPE_MISMATCH, span, vec!["pattern".into(), text]);
                return self.bad_expr(span);
            };
            let mut bound = Vec::new();
            for item in items {
                let Some((key, key_span)) = item.key else {
                    self.diag(&codes::BIND_PATTERN_NO_CONTEXT, item.value.span, vec![]);
                    return self.bad_expr(span);
                };
                let Some((_, member_ty)) = members.iter().find(|(n, _)| *n == key).copied()
                else {
                    let member_text = self.interner.resolve(key).to_string();
                    let type_text = self.types.name(target, &self.interner);
                    self.diag(
                        &codes::LOOKUP_UNKNOWN_MEMBER,
                        key_span,
                        vec![member_text, type_text],
                    );
                    return self.bad_expr(span);
                };
                let value = self.bind_assignment_like(member_ty, &item.value, ctx);
                bound.push((key, value));
            }
            return Expression::new(
                ExpressionKind::StructuredAssignmentPattern { members: bound },
                target,
                span,
            );
        }

        let element_types: Vec<TypeId> = match self.types.get(self.types.canonical(target)).clone()
        {
            TypeKind::PackedStruct { members, .. } => members.iter().map(|(_, t)| *t).collect(),
            TypeKind::UnpackedArray { elem, left, right } => {
                let count = (left - right).unsigned_abs() as usize + 1;
                vec![elem; count]
            }
            _ => {
                let text = self.types.name(target, &self.interner);
                self.diag(&codes::BIND_TYPE_MISMATCH, span, vec!["pattern".into(), text]);
                return self.bad_expr(span);
            }
        };

        if element_types.len() != items.len() {
            self.diag(
                &codes::BIND_PATTERN_COUNT,
                span,
                vec![element_types.len().to_string(), items.len().to_string()],
            );
            return self.bad_expr(span);
        }

        let mut elements = Vec::with_capacity(items.len());
        for (item, elem_ty) in items.iter().zip(element_types) {
            elements.push(self.bind_assignment_like(elem_ty, &item.value, ctx));
        }
        Expression::new(
            ExpressionKind::SimpleAssignmentPattern { elements },
            target,
            span,
        )
    }

    fn bind_replicated_pattern(
        &mut self,
        count_syntax: &ExprSyntax,
        element_syntax: &[ExprSyntax],
        ctx: &BindContext,
        span: Span,
        target: Option<TypeId>,
    ) -> Expression {
        let Some(target) = target else {
            self.diag(&codes::BIND_PATTERN_NO_CONTEXT, span, vec![]);
            return self.bad_expr(span);
        };
        let Some(count) = self.bind_constant_int(count_syntax, ctx) else {
            return self.bad_expr(span);
        };
        let mut count_expr =
            self.bind_expression(count_syntax, &ctx.with_flags(bind_flags::CONSTANT));
        count_expr.constant = Some(ConstantValue::Int(SvInt::from_i64(32, count)));

        let elem_ty = match self.types.get(self.types.canonical(target)).clone() {
            TypeKind::UnpackedArray { elem, left, right } => {
                let size = (left - right).unsigned_abs() as i64 + 1;
                if count * element_syntax.len() as i64 != size {
                    self.diag(
                        &codes::BIND_PATTERN_COUNT,
                        span,
                        vec![
                            size.to_string(),
                            (count * element_syntax.len() as i64).to_string(),
                        ],
                    );
                    return self.bad_expr(span);
                }
                elem
            }
            _ => {
                let text = self.types.name(target, &self.interner);
                self.diag(&codes::BIND_TYPE_MISMATCH, span, vec!["pattern".into(), text]);
                return self.bad_expr(span);
            }
        };

        let mut elements = Vec::with_capacity(element_syntax.len());
        for elem in element_syntax {
            elements.push(self.bind_assignment_like(elem_ty, elem, ctx));
        }
        Expression::new(
            ExpressionKind::ReplicatedAssignmentPattern {
                count: Box::new(count_expr),
                elements,
            },
            target,
            span,
        )
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// Bind a statement tree for a procedural block or function body.
    pub(crate) fn bind_statement(
        &mut self,
        stmt: &StmtSyntax,
        ctx: &BindContext,
        return_type: Option<TypeId>,
    ) -> BoundStmt {
        match &stmt.kind {
            StmtSyntaxKind::Block { label, stmts } => {
                let scope = self.create_statement_block(ctx, *label, stmt.span);
                let mut bound = Vec::with_capacity(stmts.len());
                for s in stmts {
                    let inner = BindContext {
                        scope,
                        location: LookupLocation::new(scope, self.scope(scope).next_index()),
                        flags: ctx.flags,
                        instance_depth: ctx.instance_depth,
                    };
                    bound.push(self.bind_statement(s, &inner, return_type));
                }
                BoundStmt::Block(bound)
            }
            StmtSyntaxKind::VarDecl(decl) => {
                let resolved = self.resolve_type(&decl.ty, ctx);
                let sym = self.alloc_symbol(
                    SymbolKind::Variable {
                        ty: resolved.ty,
                        declared_range: resolved.declared_range,
                        initializer: None,
                    },
                    decl.name,
                    decl.name_span,
                );
                self.add_member(ctx.scope, sym);
                let init = decl
                    .init
                    .clone()
                    .map(|init| self.bind_assignment_like(resolved.ty, &init, ctx));
                BoundStmt::VarDecl { symbol: sym, init }
            }
            StmtSyntaxKind::Assign {
                target,
                value,
                nonblocking,
            } => {
                let mut lhs = self.create_expression(target, ctx, None);
                self.self_determined(&mut lhs, ctx);
                if !lhs.bad() && !lhs.is_lvalue() {
                    self.diag(&codes::BIND_NOT_ASSIGNABLE, target.span, vec![]);
                }
                let rhs = self.bind_assignment_like(lhs.ty, value, ctx);
                let ty = lhs.ty;
                let span = stmt.span;
                BoundStmt::Expr(Expression::new(
                    ExpressionKind::Assignment {
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                        non_blocking: *nonblocking,
                    },
                    ty,
                    span,
                ))
            }
            StmtSyntaxKind::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                let cond = self.bind_expression(cond, ctx);
                let then_stmt = Box::new(self.bind_statement(then_stmt, ctx, return_type));
                let else_stmt = else_stmt
                    .as_ref()
                    .map(|s| Box::new(self.bind_statement(s, ctx, return_type)));
                BoundStmt::If {
                    cond,
                    then_stmt,
                    else_stmt,
                }
            }
            StmtSyntaxKind::For {
                init,
                cond,
                step,
                body,
            } => {
                // The loop gets its own scope for inline declarations.
                let scope = self.create_statement_block(ctx, None, stmt.span);
                let inner = BindContext {
                    scope,
                    location: LookupLocation::new(scope, u32::MAX),
                    flags: ctx.flags,
                    instance_depth: ctx.instance_depth,
                };
                let init_bound = init
                    .as_ref()
                    .map(|s| vec![self.bind_statement(s, &inner, return_type)])
                    .unwrap_or_default();
                let cond_bound = cond.as_ref().map(|c| self.bind_expression(c, &inner));
                let step_bound = step
                    .as_ref()
                    .map(|s| vec![self.bind_statement(s, &inner, return_type)])
                    .unwrap_or_default();
                let body = Box::new(self.bind_statement(body, &inner, return_type));
                BoundStmt::For {
                    init: init_bound,
                    cond: cond_bound,
                    step: step_bound,
                    body,
                }
            }
            StmtSyntaxKind::Case { kind, expr, items } => {
                self.bind_case_statement(*kind, expr, items, ctx, return_type)
            }
            StmtSyntaxKind::Return(value) => {
                let bound = match (value, return_type) {
                    (Some(v), Some(ty)) => Some(self.bind_assignment_like(ty, v, ctx)),
                    (Some(v), None) => Some(self.bind_expression(v, ctx)),
                    (None, _) => None,
                };
                BoundStmt::Return(bound)
            }
            StmtSyntaxKind::Expr(e) => {
                let bound = self.bind_expression(e, ctx);
                BoundStmt::Expr(bound)
            }
            StmtSyntaxKind::Empty => BoundStmt::Empty,
        }
    }

    fn create_statement_block(
        &mut self,
        ctx: &BindContext,
        label: Option<NameId>,
        span: Span,
    ) -> ScopeId {
        let name = label.unwrap_or(NameId::EMPTY);
        let sym = self.alloc_symbol(SymbolKind::StatementBlock { scope: ScopeId(0) }, name, span);
        let scope = self.alloc_scope(sym);
        if let SymbolKind::StatementBlock { scope: s } = &mut self.symbol_mut(sym).kind {
            *s = scope;
        }
        // Not registered as a member: statement blocks come into being
        // during lazy binding, after the parent scope is finalized. The
        // parent link still makes lookups climb correctly.
        {
            let sym = self.symbol_mut(sym);
            sym.parent = Some(ctx.scope);
            sym.index = ctx.location.index;
        }
        scope
    }

    /// All expressions in a case statement bind together: the controlling
    /// expression and every label share one propagated type.
    fn bind_case_statement(
        &mut self,
        kind: CaseKind,
        control_syntax: &ExprSyntax,
        items: &[crate::frontend::ast::CaseItemSyntax],
        ctx: &BindContext,
        return_type: Option<TypeId>,
    ) -> BoundStmt {
        let mut control = self.create_expression(control_syntax, ctx, None);
        let mut labels: Vec<Expression> = Vec::new();
        for item in items {
            for e in &item.exprs {
                labels.push(self.create_expression(e, ctx, None));
            }
        }

        // Creation pass done for every participant; now find the common
        // type and run propagation uniformly.
        let mut common = control.ty;
        for label in &labels {
            if label.bad() {
                continue;
            }
            let lhs = Expression::new(ExpressionKind::NullLiteral, common, control.span);
            if let Some(ty) = self.common_numeric_type(&lhs, label) {
                common = ty;
            }
        }
        self.context_determined(&mut control, common, ctx);
        for label in &mut labels {
            self.context_determined(label, common, ctx);
        }

        let mut label_iter = labels.into_iter();
        let mut bound_items = Vec::new();
        let mut default = None;
        for item in items {
            let exprs: Vec<Expression> =
                item.exprs.iter().map(|_| label_iter.next().unwrap()).collect();
            let body = self.bind_statement(&item.body, ctx, return_type);
            if exprs.is_empty() {
                default = Some(Box::new(body));
            } else {
                bound_items.push((exprs, body));
            }
        }

        BoundStmt::Case {
            kind,
            expr: control,
            items: bound_items,
            default,
        }
    }

    // ========================================================================
    // Subroutine bodies
    // ========================================================================

    /// Bind a function's statements on first demand. Recursive calls see a
    /// placeholder body while binding is in flight; they fetch the real one
    /// at evaluation time.
    pub(crate) fn ensure_subroutine_body(&mut self, sym: SymbolId) {
        let (scope, syntax, return_type) = match &self.symbol(sym).kind {
            SymbolKind::Subroutine {
                body: Some(_), ..
            } => return,
            SymbolKind::Subroutine {
                scope,
                syntax,
                return_type,
                ..
            } => (*scope, syntax.clone(), *return_type),
            _ => return,
        };

        if let SymbolKind::Subroutine { body, .. } = &mut self.symbol_mut(sym).kind {
            *body = Some(Arc::new(Vec::new()));
        }

        let ctx = BindContext::new(scope, LookupLocation::new(scope, u32::MAX));
        let mut bound = Vec::with_capacity(syntax.body.len());
        for stmt in &syntax.body {
            bound.push(self.bind_statement(stmt, &ctx, Some(return_type)));
        }

        if let SymbolKind::Subroutine { body, .. } = &mut self.symbol_mut(sym).kind {
            *body = Some(Arc::new(bound));
        }
    }
}

fn convert_unary(op: UnaryOpSyntax) -> UnaryOperator {
    match op {
        UnaryOpSyntax::Plus => UnaryOperator::Plus,
        UnaryOpSyntax::Minus => UnaryOperator::Minus,
        UnaryOpSyntax::BitwiseNot => UnaryOperator::BitwiseNot,
        UnaryOpSyntax::LogicalNot => UnaryOperator::LogicalNot,
        UnaryOpSyntax::ReductionAnd => UnaryOperator::ReductionAnd,
        UnaryOpSyntax::ReductionOr => UnaryOperator::ReductionOr,
        UnaryOpSyntax::ReductionXor => UnaryOperator::ReductionXor,
        UnaryOpSyntax::ReductionNand => UnaryOperator::ReductionNand,
        UnaryOpSyntax::ReductionNor => UnaryOperator::ReductionNor,
        UnaryOpSyntax::ReductionXnor => UnaryOperator::ReductionXnor,
    }
}

fn convert_binary(op: BinaryOpSyntax) -> BinaryOperator {
    match op {
        BinaryOpSyntax::Add => BinaryOperator::Add,
        BinaryOpSyntax::Subtract => BinaryOperator::Subtract,
        BinaryOpSyntax::Multiply => BinaryOperator::Multiply,
        BinaryOpSyntax::Divide => BinaryOperator::Divide,
        BinaryOpSyntax::Mod => BinaryOperator::Mod,
        BinaryOpSyntax::Power => BinaryOperator::Power,
        BinaryOpSyntax::BinaryAnd => BinaryOperator::BinaryAnd,
        BinaryOpSyntax::BinaryOr => BinaryOperator::BinaryOr,
        BinaryOpSyntax::BinaryXor => BinaryOperator::BinaryXor,
        BinaryOpSyntax::BinaryXnor => BinaryOperator::BinaryXnor,
        BinaryOpSyntax::Equality => BinaryOperator::Equality,
        BinaryOpSyntax::Inequality => BinaryOperator::Inequality,
        BinaryOpSyntax::CaseEquality => BinaryOperator::CaseEquality,
        BinaryOpSyntax::CaseInequality => BinaryOperator::CaseInequality,
        BinaryOpSyntax::WildcardEquality => BinaryOperator::WildcardEquality,
        BinaryOpSyntax::WildcardInequality => BinaryOperator::WildcardInequality,
        BinaryOpSyntax::GreaterThan => BinaryOperator::GreaterThan,
        BinaryOpSyntax::GreaterThanEqual => BinaryOperator::GreaterThanEqual,
        BinaryOpSyntax::LessThan => BinaryOperator::LessThan,
        BinaryOpSyntax::LessThanEqual => BinaryOperator::LessThanEqual,
        BinaryOpSyntax::LogicalAnd => BinaryOperator::LogicalAnd,
        BinaryOpSyntax::LogicalOr => BinaryOperator::LogicalOr,
        BinaryOpSyntax::LogicalShiftLeft => BinaryOperator::LogicalShiftLeft,
        BinaryOpSyntax::LogicalShiftRight => BinaryOperator::LogicalShiftRight,
        BinaryOpSyntax::ArithmeticShiftLeft => BinaryOperator::ArithmeticShiftLeft,
        BinaryOpSyntax::ArithmeticShiftRight => BinaryOperator::ArithmeticShiftRight,
    }
}
