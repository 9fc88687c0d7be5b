// src/sema/expr/propagate.rs
//! The propagation pass: pushing context types down the tree.
//!
//! Each bound node is visited once with its final type. Context-determined
//! operators adopt the imposed type and push it into their operands;
//! everything else keeps its self-determined type and gets wrapped in an
//! implicit conversion when the context wants something different.

use crate::sema::bind::BindContext;
use crate::sema::compilation::Compilation;
use crate::sema::expr::{Expression, ExpressionKind, UnaryOperator};
use crate::sema::types::TypeId;

impl Compilation {
    /// Propagate a context-imposed type into an expression.
    pub(crate) fn context_determined(
        &mut self,
        expr: &mut Expression,
        ty: TypeId,
        ctx: &BindContext,
    ) {
        self.propagate_type(expr, ty, ctx);
    }

    /// Finalize an expression whose type is fixed by its own operands.
    pub(crate) fn self_determined(&mut self, expr: &mut Expression, ctx: &BindContext) {
        let ty = expr.ty;
        self.propagate_type(expr, ty, ctx);
    }

    fn propagate_type(&mut self, expr: &mut Expression, new_ty: TypeId, ctx: &BindContext) {
        if expr.bad() || self.types.is_error(new_ty) {
            return;
        }

        let adopted = match &mut expr.kind {
            ExpressionKind::IntegerLiteral {
                value,
                declared_unsized,
            } => {
                // Unsized literals adopt the context width.
                if *declared_unsized && self.types.is_integral(new_ty) {
                    let width = self.types.bit_width(new_ty).unwrap_or(value.width());
                    let signed = self.types.is_signed(new_ty);
                    *value = value.resize(width, signed);
                    expr.ty = new_ty;
                    true
                } else {
                    false
                }
            }
            ExpressionKind::UnbasedUnsizedLiteral(_) => {
                // Fills all bits of whatever width the context imposes.
                if self.types.is_integral(new_ty) {
                    expr.ty = new_ty;
                    true
                } else {
                    false
                }
            }
            ExpressionKind::UnaryOp { op, operand } => match op {
                UnaryOperator::Plus | UnaryOperator::Minus | UnaryOperator::BitwiseNot => {
                    if self.types.is_numeric(new_ty) {
                        let mut child = std::mem::replace(
                            operand.as_mut(),
                            Expression::invalid(self.types.builtins.error, expr.span),
                        );
                        self.propagate_type(&mut child, new_ty, ctx);
                        **operand = child;
                        expr.ty = new_ty;
                        true
                    } else {
                        false
                    }
                }
                _ => {
                    // Reductions and logical not already finalized their
                    // operand during creation.
                    false
                }
            },
            ExpressionKind::BinaryOp { op, lhs, rhs } => {
                let op = *op;
                if op.is_context_determined() && self.types.is_numeric(new_ty) {
                    let mut l = take_expr(lhs, self.types.builtins.error);
                    let mut r = take_expr(rhs, self.types.builtins.error);
                    self.propagate_type(&mut l, new_ty, ctx);
                    self.propagate_type(&mut r, new_ty, ctx);
                    **lhs = l;
                    **rhs = r;
                    expr.ty = new_ty;
                    true
                } else if op.is_comparison() {
                    // Operands propagate to their own common type; the
                    // result stays a single bit.
                    let mut l = take_expr(lhs, self.types.builtins.error);
                    let mut r = take_expr(rhs, self.types.builtins.error);
                    if let Some(common) = self.common_numeric_type(&l, &r) {
                        self.propagate_type(&mut l, common, ctx);
                        self.propagate_type(&mut r, common, ctx);
                    } else {
                        let lt = l.ty;
                        let rt = r.ty;
                        self.propagate_type(&mut l, lt, ctx);
                        self.propagate_type(&mut r, rt, ctx);
                    }
                    **lhs = l;
                    **rhs = r;
                    false
                } else if op.is_shift() || op == crate::sema::expr::BinaryOperator::Power {
                    // The left operand carries the context; the right was
                    // finalized self-determined at creation.
                    if self.types.is_integral(new_ty) {
                        let mut l = take_expr(lhs, self.types.builtins.error);
                        self.propagate_type(&mut l, new_ty, ctx);
                        **lhs = l;
                        expr.ty = new_ty;
                        true
                    } else {
                        let lt = lhs.ty;
                        let mut l = take_expr(lhs, self.types.builtins.error);
                        self.propagate_type(&mut l, lt, ctx);
                        **lhs = l;
                        false
                    }
                } else {
                    // Logical operators finalized operands during creation.
                    false
                }
            }
            ExpressionKind::ConditionalOp { left, right, .. } => {
                if self.types.is_numeric(new_ty) || new_ty == left.ty {
                    let mut l = take_expr(left, self.types.builtins.error);
                    let mut r = take_expr(right, self.types.builtins.error);
                    self.propagate_type(&mut l, new_ty, ctx);
                    self.propagate_type(&mut r, new_ty, ctx);
                    **left = l;
                    **right = r;
                    expr.ty = new_ty;
                    true
                } else {
                    false
                }
            }
            // Everything else is self-determined: names, selects, concats,
            // calls, literals with explicit sizes, conversions.
            _ => false,
        };

        if !adopted && expr.ty != new_ty {
            self.insert_conversion(expr, new_ty);
        }
    }

    /// Wrap an expression in an implicit conversion node to the given type.
    pub(crate) fn insert_conversion(&mut self, expr: &mut Expression, ty: TypeId) {
        let span = expr.span;
        let inner = std::mem::replace(expr, Expression::invalid(self.types.builtins.error, span));
        *expr = Expression::new(
            ExpressionKind::Conversion {
                operand: Box::new(inner),
                implicit: true,
            },
            ty,
            span,
        );
    }

    /// Assignment compatibility: returns the expression unchanged, inserts
    /// an implicit conversion, or reports and poisons.
    pub(crate) fn convert_assignment(
        &mut self,
        target: TypeId,
        mut expr: Expression,
        ctx: &BindContext,
    ) -> Expression {
        if expr.bad() || self.types.is_error(target) {
            self.self_determined(&mut expr, ctx);
            return expr;
        }
        if expr.ty == target {
            self.self_determined(&mut expr, ctx);
            return expr;
        }

        let compatible = (self.types.is_numeric(target) && self.types.is_numeric(expr.ty))
            || (self.types.is_string(target)
                && matches!(expr.kind, ExpressionKind::StringLiteral(_)))
            || self.types.canonical(target) == self.types.canonical(expr.ty)
            || matches!(
                expr.kind,
                ExpressionKind::SimpleAssignmentPattern { .. }
                    | ExpressionKind::StructuredAssignmentPattern { .. }
                    | ExpressionKind::ReplicatedAssignmentPattern { .. }
            );
        if !compatible {
            let found = self.types.name(expr.ty, &self.interner);
            let wanted = self.types.name(target, &self.interner);
            self.diag(
                &crate::errors::codes::BIND_TYPE_MISMATCH,
                expr.span,
                vec![found, wanted],
            );
            return self.bad_expr(expr.span);
        }

        self.context_determined(&mut expr, target, ctx);
        if expr.ty != target {
            self.insert_conversion(&mut expr, target);
        }
        expr
    }
}

fn take_expr(slot: &mut Box<Expression>, error_ty: TypeId) -> Expression {
    std::mem::replace(
        slot.as_mut(),
        Expression::invalid(error_ty, crate::frontend::Span::default()),
    )
}
