// src/sema/expr/eval.rs
//! Constant folding and function interpretation.

use rustc_hash::FxHashMap;

use crate::errors::{codes, DiagCode};
use crate::frontend::ast::CaseKind;
use crate::frontend::Span;
use crate::sema::compilation::Compilation;
use crate::sema::expr::{
    BinaryOperator, BoundStmt, Expression, ExpressionKind, LValue, LValueSelector,
    RangeSelectionKind, SystemFunction, UnaryOperator,
};
use crate::sema::symbol::{SymbolId, SymbolKind};
use crate::sema::types::{TypeId, TypeKind};
use crate::value::{ConstantValue, Logic, SvInt};

/// One function invocation's storage.
struct Frame {
    locals: FxHashMap<SymbolId, ConstantValue>,
    subroutine: Option<SymbolId>,
}

enum Control {
    Normal,
    Return(ConstantValue),
}

/// Tracks budgets, call frames, and failure reports for one evaluation.
/// Evaluation is a pure function of the bound tree: reports are collected
/// here and merged into the compilation by the caller.
pub struct EvalContext<'a> {
    comp: &'a Compilation,
    steps: u32,
    max_steps: u32,
    max_depth: u32,
    frames: Vec<Frame>,
    reports: Vec<(&'static DiagCode, Span, Vec<String>)>,
    budget_blown: bool,
}

impl<'a> EvalContext<'a> {
    pub fn new(comp: &'a Compilation) -> Self {
        Self {
            comp,
            steps: 0,
            max_steps: comp.options().max_consteval_steps,
            max_depth: comp.options().max_consteval_depth,
            frames: Vec::new(),
            reports: Vec::new(),
            budget_blown: false,
        }
    }

    /// Seed an outer frame, used for genvar values during generate
    /// expansion.
    pub fn with_local(comp: &'a Compilation, symbol: SymbolId, value: ConstantValue) -> Self {
        let mut ctx = Self::new(comp);
        let mut locals = FxHashMap::default();
        locals.insert(symbol, value);
        ctx.frames.push(Frame {
            locals,
            subroutine: None,
        });
        ctx
    }

    pub fn take_reports(&mut self) -> Vec<(&'static DiagCode, Span, Vec<String>)> {
        std::mem::take(&mut self.reports)
    }

    fn report(&mut self, code: &'static DiagCode, span: Span, args: Vec<String>) {
        self.reports.push((code, span, args));
    }

    fn step(&mut self, span: Span) -> bool {
        self.steps += 1;
        if self.steps > self.max_steps {
            if !self.budget_blown {
                self.budget_blown = true;
                self.report(&codes::EVAL_STEPS_EXCEEDED, span, vec![]);
            }
            return false;
        }
        true
    }

    fn name_of(&self, symbol: SymbolId) -> String {
        self.comp
            .interner
            .resolve(self.comp.symbol(symbol).name)
            .to_string()
    }

    // ========================================================================
    // Expression evaluation
    // ========================================================================

    pub fn eval(&mut self, expr: &Expression) -> ConstantValue {
        if !self.step(expr.span) {
            return ConstantValue::Err;
        }
        match &expr.kind {
            ExpressionKind::Invalid(_) => ConstantValue::Err,
            ExpressionKind::IntegerLiteral { value, .. } => ConstantValue::Int(value.clone()),
            ExpressionKind::RealLiteral(v) => ConstantValue::Real(*v),
            ExpressionKind::StringLiteral(s) => ConstantValue::Str(s.clone()),
            ExpressionKind::NullLiteral => ConstantValue::Null,
            ExpressionKind::UnbasedUnsizedLiteral(bit) => {
                let width = self.comp.type_arena().bit_width(expr.ty).unwrap_or(1);
                ConstantValue::Int(SvInt::replicated(width, *bit))
            }
            ExpressionKind::NamedValue { symbol } => self.eval_named(*symbol, expr.span),
            ExpressionKind::DataType(_) => ConstantValue::Err,
            ExpressionKind::UnaryOp { op, operand } => self.eval_unary(*op, operand, expr),
            ExpressionKind::BinaryOp { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs, expr),
            ExpressionKind::ConditionalOp { cond, left, right } => {
                let cond_val = self.eval(cond);
                if cond_val.is_err() {
                    return ConstantValue::Err;
                }
                match cond_val.truth() {
                    Logic::One => self.eval(left),
                    Logic::Zero => self.eval(right),
                    _ => {
                        // Ambiguous condition: merge the two arms bitwise.
                        let l = self.eval(left);
                        let r = self.eval(right);
                        match (l, r) {
                            (ConstantValue::Int(a), ConstantValue::Int(b)) => {
                                ConstantValue::Int(merge_ambiguous(&a, &b))
                            }
                            _ => ConstantValue::Err,
                        }
                    }
                }
            }
            ExpressionKind::Assignment { lhs, rhs, .. } => {
                let value = self.eval(rhs);
                if value.is_err() {
                    return ConstantValue::Err;
                }
                match self.eval_lvalue(lhs) {
                    Some(lv) => {
                        if self.store(&lv, value.clone(), lhs.span) {
                            value
                        } else {
                            ConstantValue::Err
                        }
                    }
                    None => ConstantValue::Err,
                }
            }
            ExpressionKind::Concatenation {
                operands,
                string_concat,
            } => {
                if *string_concat {
                    let mut out = String::new();
                    for op in operands {
                        match self.eval(op) {
                            ConstantValue::Str(s) => out.push_str(&s),
                            ConstantValue::Int(v) => out.push_str(&v.to_string()),
                            _ => return ConstantValue::Err,
                        }
                    }
                    return ConstantValue::Str(out);
                }
                let mut parts = Vec::with_capacity(operands.len());
                for op in operands {
                    match self.eval(op) {
                        ConstantValue::Int(v) => parts.push(v),
                        _ => return ConstantValue::Err,
                    }
                }
                ConstantValue::Int(SvInt::concat(&parts))
            }
            ExpressionKind::Replication { count, concat } => {
                let Some(n) = self.eval(count).integer().and_then(|v| v.to_u64()) else {
                    return ConstantValue::Err;
                };
                match self.eval(concat) {
                    ConstantValue::Int(v) => {
                        let parts = vec![v; n as usize];
                        if parts.is_empty() {
                            ConstantValue::Int(SvInt::new(1, false))
                        } else {
                            ConstantValue::Int(SvInt::concat(&parts))
                        }
                    }
                    ConstantValue::Str(s) => ConstantValue::Str(s.repeat(n as usize)),
                    _ => ConstantValue::Err,
                }
            }
            ExpressionKind::ElementSelect {
                value,
                selector,
                range,
            } => self.eval_element_select(value, selector, *range, expr),
            ExpressionKind::RangeSelect {
                value,
                kind,
                left,
                right,
                range,
            } => self.eval_range_select(value, *kind, left, right, *range),
            ExpressionKind::MemberAccess {
                value,
                member,
                bit_offset,
                bit_width,
            } => {
                let base = self.eval(value);
                match base {
                    ConstantValue::Int(v) => ConstantValue::Int(v.extract(
                        *bit_offset as i64 + *bit_width as i64 - 1,
                        *bit_offset as i64,
                    )),
                    ConstantValue::Struct(members) => {
                        let name = self.comp.interner.resolve(*member);
                        members
                            .into_iter()
                            .find(|(n, _)| n == name)
                            .map(|(_, v)| v)
                            .unwrap_or(ConstantValue::Err)
                    }
                    _ => ConstantValue::Err,
                }
            }
            ExpressionKind::Call { subroutine, args } => self.eval_call(*subroutine, args, expr),
            ExpressionKind::SystemCall {
                function, args, ..
            } => self.eval_system_call(*function, args, expr),
            ExpressionKind::Conversion { operand, .. } => {
                let inner = self.eval(operand);
                self.convert(inner, operand.ty, expr.ty)
            }
            ExpressionKind::SimpleAssignmentPattern { elements }
            | ExpressionKind::ReplicatedAssignmentPattern { elements, .. } => {
                let repeat = match &expr.kind {
                    ExpressionKind::ReplicatedAssignmentPattern { count, .. } => self
                        .eval(count)
                        .integer()
                        .and_then(|v| v.to_u64())
                        .unwrap_or(1),
                    _ => 1,
                };
                let mut values = Vec::new();
                for _ in 0..repeat {
                    for elem in elements {
                        let v = self.eval(elem);
                        if v.is_err() {
                            return ConstantValue::Err;
                        }
                        values.push(v);
                    }
                }
                self.pattern_value(expr.ty, values)
            }
            ExpressionKind::StructuredAssignmentPattern { members } => {
                let Some(fields) = self.comp.type_arena().struct_members(expr.ty) else {
                    return ConstantValue::Err;
                };
                let fields = fields.to_vec();
                let mut values = Vec::new();
                for (field_name, field_ty) in &fields {
                    let member = members.iter().find(|(n, _)| n == field_name);
                    match member {
                        Some((_, e)) => {
                            let v = self.eval(e);
                            if v.is_err() {
                                return ConstantValue::Err;
                            }
                            values.push(v);
                        }
                        None => values.push(self.default_value(*field_ty)),
                    }
                }
                self.pattern_value(expr.ty, values)
            }
        }
    }

    fn eval_named(&mut self, symbol: SymbolId, span: Span) -> ConstantValue {
        // Function locals live in the innermost frame; genvar loop values
        // may sit in an outer frame.
        if let Some(frame) = self.frames.last() {
            if let Some(v) = frame.locals.get(&symbol) {
                return v.clone();
            }
        }
        if matches!(self.comp.symbol(symbol).kind, SymbolKind::Genvar { .. }) {
            for frame in self.frames.iter().rev() {
                if let Some(v) = frame.locals.get(&symbol) {
                    return v.clone();
                }
            }
        }
        match &self.comp.symbol(symbol).kind {
            SymbolKind::Parameter { value, .. } => value.clone(),
            SymbolKind::EnumValue { value, .. } => value.clone(),
            _ => {
                let name = self.name_of(symbol);
                self.report(&codes::EVAL_NOT_CONSTANT, span, vec![name]);
                ConstantValue::Err
            }
        }
    }

    fn eval_unary(
        &mut self,
        op: UnaryOperator,
        operand: &Expression,
        expr: &Expression,
    ) -> ConstantValue {
        let value = self.eval(operand);
        if value.is_err() {
            return ConstantValue::Err;
        }
        match (op, value) {
            (UnaryOperator::Plus, v) => v,
            (UnaryOperator::Minus, ConstantValue::Real(v)) => ConstantValue::Real(-v),
            (UnaryOperator::Minus, ConstantValue::Int(v)) => ConstantValue::Int(v.negate()),
            (UnaryOperator::BitwiseNot, ConstantValue::Int(v)) => ConstantValue::Int(v.not()),
            (UnaryOperator::LogicalNot, v) => {
                let out = match v.truth() {
                    Logic::One => Logic::Zero,
                    Logic::Zero => Logic::One,
                    _ => Logic::X,
                };
                self.one_bit_result(out, expr.ty)
            }
            (UnaryOperator::ReductionAnd, ConstantValue::Int(v)) => {
                self.one_bit_result(v.reduce_and(), expr.ty)
            }
            (UnaryOperator::ReductionOr, ConstantValue::Int(v)) => {
                self.one_bit_result(v.reduce_or(), expr.ty)
            }
            (UnaryOperator::ReductionXor, ConstantValue::Int(v)) => {
                self.one_bit_result(v.reduce_xor(), expr.ty)
            }
            (UnaryOperator::ReductionNand, ConstantValue::Int(v)) => {
                self.one_bit_result(invert(v.reduce_and()), expr.ty)
            }
            (UnaryOperator::ReductionNor, ConstantValue::Int(v)) => {
                self.one_bit_result(invert(v.reduce_or()), expr.ty)
            }
            (UnaryOperator::ReductionXnor, ConstantValue::Int(v)) => {
                self.one_bit_result(invert(v.reduce_xor()), expr.ty)
            }
            _ => ConstantValue::Err,
        }
    }

    fn eval_binary(
        &mut self,
        op: BinaryOperator,
        lhs: &Expression,
        rhs: &Expression,
        expr: &Expression,
    ) -> ConstantValue {
        if op.is_logical() {
            let l = self.eval(lhs);
            if l.is_err() {
                return ConstantValue::Err;
            }
            let r = self.eval(rhs);
            if r.is_err() {
                return ConstantValue::Err;
            }
            let out = match op {
                BinaryOperator::LogicalAnd => logic_and(l.truth(), r.truth()),
                _ => logic_or(l.truth(), r.truth()),
            };
            return self.one_bit_result(out, expr.ty);
        }

        let l = self.eval(lhs);
        let r = self.eval(rhs);
        if l.is_err() || r.is_err() {
            return ConstantValue::Err;
        }

        // Real arithmetic when either side is real.
        if let (Some(a), Some(b)) = (l.to_real(), r.to_real()) {
            if matches!(l, ConstantValue::Real(_) | ConstantValue::ShortReal(_))
                || matches!(r, ConstantValue::Real(_) | ConstantValue::ShortReal(_))
            {
                return self.eval_real_binary(op, a, b, expr.ty);
            }
        }

        match (l, r) {
            (ConstantValue::Int(a), ConstantValue::Int(b)) => {
                self.eval_int_binary(op, a, b, expr.ty)
            }
            (ConstantValue::Str(a), ConstantValue::Str(b)) => {
                let out = match op {
                    BinaryOperator::Equality => bool_logic(a == b),
                    BinaryOperator::Inequality => bool_logic(a != b),
                    BinaryOperator::LessThan => bool_logic(a < b),
                    BinaryOperator::LessThanEqual => bool_logic(a <= b),
                    BinaryOperator::GreaterThan => bool_logic(a > b),
                    BinaryOperator::GreaterThanEqual => bool_logic(a >= b),
                    _ => return ConstantValue::Err,
                };
                self.one_bit_result(out, expr.ty)
            }
            _ => ConstantValue::Err,
        }
    }

    fn eval_int_binary(
        &mut self,
        op: BinaryOperator,
        a: SvInt,
        b: SvInt,
        result_ty: TypeId,
    ) -> ConstantValue {
        use BinaryOperator::*;
        let result = match op {
            Add => ConstantValue::Int(a.add(&b)),
            Subtract => ConstantValue::Int(a.sub(&b)),
            Multiply => ConstantValue::Int(a.mul(&b)),
            Divide => ConstantValue::Int(a.div(&b)),
            Mod => ConstantValue::Int(a.rem(&b)),
            Power => ConstantValue::Int(a.pow(&b)),
            BinaryAnd => ConstantValue::Int(a.and(&b)),
            BinaryOr => ConstantValue::Int(a.or(&b)),
            BinaryXor => ConstantValue::Int(a.xor(&b)),
            BinaryXnor => ConstantValue::Int(a.xnor(&b)),
            Equality => return self.one_bit_result(a.log_eq(&b), result_ty),
            Inequality => return self.one_bit_result(invert(a.log_eq(&b)), result_ty),
            CaseEquality => return self.one_bit_result(bool_logic(a.case_eq(&b)), result_ty),
            CaseInequality => {
                return self.one_bit_result(bool_logic(!a.case_eq(&b)), result_ty)
            }
            WildcardEquality => return self.one_bit_result(a.wildcard_eq(&b), result_ty),
            WildcardInequality => {
                return self.one_bit_result(invert(a.wildcard_eq(&b)), result_ty)
            }
            LessThan => return self.one_bit_result(a.lt(&b), result_ty),
            GreaterThanEqual => return self.one_bit_result(invert(a.lt(&b)), result_ty),
            GreaterThan => return self.one_bit_result(b.lt(&a), result_ty),
            LessThanEqual => return self.one_bit_result(invert(b.lt(&a)), result_ty),
            LogicalShiftLeft | ArithmeticShiftLeft => match shift_amount(&b) {
                Some(amount) => ConstantValue::Int(a.shl(amount)),
                None => ConstantValue::Int(SvInt::all_x(a.width(), a.is_signed())),
            },
            LogicalShiftRight => match shift_amount(&b) {
                Some(amount) => ConstantValue::Int(a.lshr(amount)),
                None => ConstantValue::Int(SvInt::all_x(a.width(), a.is_signed())),
            },
            ArithmeticShiftRight => match shift_amount(&b) {
                Some(amount) => ConstantValue::Int(a.ashr(amount)),
                None => ConstantValue::Int(SvInt::all_x(a.width(), a.is_signed())),
            },
            LogicalAnd | LogicalOr => unreachable!("handled above"),
        };
        result
    }

    fn eval_real_binary(
        &mut self,
        op: BinaryOperator,
        a: f64,
        b: f64,
        result_ty: TypeId,
    ) -> ConstantValue {
        use BinaryOperator::*;
        match op {
            Add => ConstantValue::Real(a + b),
            Subtract => ConstantValue::Real(a - b),
            Multiply => ConstantValue::Real(a * b),
            Divide => ConstantValue::Real(a / b),
            Power => ConstantValue::Real(a.powf(b)),
            Equality => self.one_bit_result(bool_logic(a == b), result_ty),
            Inequality => self.one_bit_result(bool_logic(a != b), result_ty),
            LessThan => self.one_bit_result(bool_logic(a < b), result_ty),
            LessThanEqual => self.one_bit_result(bool_logic(a <= b), result_ty),
            GreaterThan => self.one_bit_result(bool_logic(a > b), result_ty),
            GreaterThanEqual => self.one_bit_result(bool_logic(a >= b), result_ty),
            _ => ConstantValue::Err,
        }
    }

    fn one_bit_result(&self, bit: Logic, ty: TypeId) -> ConstantValue {
        let width = self.comp.type_arena().bit_width(ty).unwrap_or(1);
        let mut v = SvInt::new(width, false);
        v.set_bit(0, bit);
        ConstantValue::Int(v)
    }

    fn eval_element_select(
        &mut self,
        value: &Expression,
        selector: &Expression,
        range: (i64, i64),
        expr: &Expression,
    ) -> ConstantValue {
        let base = self.eval(value);
        let index = self.eval(selector);
        if base.is_err() || index.is_err() {
            return ConstantValue::Err;
        }

        let idx = index.integer().and_then(|v| v.to_i64());
        match base {
            ConstantValue::Int(v) => {
                let Some(i) = idx else {
                    let width = self.comp.type_arena().bit_width(expr.ty).unwrap_or(1);
                    return ConstantValue::Int(SvInt::all_x(width, false));
                };
                let pos = bit_position(i, range);
                ConstantValue::Int(v.extract(pos, pos))
            }
            ConstantValue::Array(items) => {
                let Some(i) = idx else {
                    return self.default_value(expr.ty);
                };
                let (left, right) = range;
                let offset = if left <= right { i - left } else { left - i };
                if offset < 0 || offset as usize >= items.len() {
                    // Out-of-range reads yield the default (x) value.
                    return self.default_value(expr.ty);
                }
                items[offset as usize].clone()
            }
            _ => ConstantValue::Err,
        }
    }

    fn eval_range_select(
        &mut self,
        value: &Expression,
        kind: RangeSelectionKind,
        left: &Expression,
        right: &Expression,
        range: (i64, i64),
    ) -> ConstantValue {
        let base = self.eval(value);
        if base.is_err() {
            return ConstantValue::Err;
        }
        let ConstantValue::Int(v) = base else {
            return ConstantValue::Err;
        };

        let left_val = self.eval(left).integer().and_then(|x| x.to_i64());
        let right_val = self.eval(right).integer().and_then(|x| x.to_i64());
        let (Some(a), Some(b)) = (left_val, right_val) else {
            return ConstantValue::Int(SvInt::all_x(v.width().max(1), false));
        };

        let descending = range.0 >= range.1;
        let (msb_pos, lsb_pos) = match kind {
            RangeSelectionKind::Simple => {
                if descending {
                    (a - range.1, b - range.1)
                } else {
                    (range.1 - a, range.1 - b)
                }
            }
            RangeSelectionKind::IndexedUp => {
                // [base +: width]
                if descending {
                    let lsb = a - range.1;
                    (lsb + b - 1, lsb)
                } else {
                    let msb = range.1 - a;
                    (msb, msb - b + 1)
                }
            }
            RangeSelectionKind::IndexedDown => {
                // [base -: width]
                if descending {
                    let msb = a - range.1;
                    (msb, msb - b + 1)
                } else {
                    let lsb = range.1 - a;
                    (lsb + b - 1, lsb)
                }
            }
        };
        ConstantValue::Int(v.extract(msb_pos, lsb_pos))
    }

    fn eval_call(
        &mut self,
        subroutine: SymbolId,
        args: &[Expression],
        expr: &Expression,
    ) -> ConstantValue {
        if self.frames.len() as u32 >= self.max_depth {
            // Abbreviate the call stack per the backtrace budget.
            let limit = self.comp.options().max_consteval_backtrace as usize;
            let trace: Vec<String> = self
                .frames
                .iter()
                .rev()
                .take(limit)
                .filter_map(|f| f.subroutine)
                .map(|s| self.name_of(s))
                .collect();
            let mut name = self.name_of(subroutine);
            if !trace.is_empty() {
                name.push_str(&format!(" (called via {})", trace.join(" <- ")));
            }
            self.report(&codes::EVAL_RECURSION, expr.span, vec![name]);
            return ConstantValue::Err;
        }

        let SymbolKind::Subroutine {
            args: formals,
            body,
            return_type,
            ..
        } = &self.comp.symbol(subroutine).kind
        else {
            return ConstantValue::Err;
        };
        let Some(body) = body.clone() else {
            return ConstantValue::Err;
        };
        let formals = formals.clone();
        let return_type = *return_type;

        let mut locals = FxHashMap::default();
        for (formal, arg) in formals.iter().zip(args) {
            let value = self.eval(arg);
            if value.is_err() {
                return ConstantValue::Err;
            }
            locals.insert(*formal, value);
        }

        self.frames.push(Frame {
            locals,
            subroutine: Some(subroutine),
        });
        let mut result = None;
        for stmt in body.iter() {
            match self.exec_stmt(stmt) {
                Some(Control::Normal) => {}
                Some(Control::Return(v)) => {
                    result = Some(v);
                    break;
                }
                None => {
                    self.frames.pop();
                    return ConstantValue::Err;
                }
            }
        }
        self.frames.pop();
        result.unwrap_or_else(|| self.default_value(return_type))
    }

    fn eval_system_call(
        &mut self,
        function: SystemFunction,
        args: &[Expression],
        expr: &Expression,
    ) -> ConstantValue {
        match function {
            SystemFunction::Clog2 => {
                let value = self.eval(&args[0]);
                let Some(v) = value.integer().and_then(|v| v.to_u64()) else {
                    return ConstantValue::Int(SvInt::all_x(32, true));
                };
                let result = if v <= 1 {
                    0
                } else {
                    64 - (v - 1).leading_zeros() as u64
                };
                ConstantValue::Int(SvInt::from_u64(32, true, result))
            }
            SystemFunction::Bits => {
                let width = self
                    .comp
                    .type_arena()
                    .bit_width(args[0].ty)
                    .unwrap_or(0);
                ConstantValue::Int(SvInt::from_u64(32, true, width as u64))
            }
            SystemFunction::Signed | SystemFunction::Unsigned => {
                let value = self.eval(&args[0]);
                let ConstantValue::Int(v) = value else {
                    return ConstantValue::Err;
                };
                let signed = function == SystemFunction::Signed;
                let mut out = v;
                if out.is_signed() != signed {
                    out = out.resize(out.width(), signed);
                }
                ConstantValue::Int(out)
            }
            SystemFunction::Display => {
                self.report(
                    &codes::EVAL_NOT_CONSTANT_CONSTRUCT,
                    expr.span,
                    vec!["a system task".into()],
                );
                ConstantValue::Err
            }
        }
    }

    fn convert(&mut self, value: ConstantValue, _from: TypeId, to: TypeId) -> ConstantValue {
        if value.is_err() {
            return ConstantValue::Err;
        }
        let arena = self.comp.type_arena();
        match arena.get(arena.canonical(to)) {
            TypeKind::Integral { width, signed, .. } => match value {
                ConstantValue::Int(v) => ConstantValue::Int(v.resize(*width, *signed)),
                ConstantValue::Real(r) => ConstantValue::Int(SvInt::from_real(r, *width, *signed)),
                ConstantValue::ShortReal(r) => {
                    ConstantValue::Int(SvInt::from_real(r as f64, *width, *signed))
                }
                other => other,
            },
            TypeKind::Real => match value {
                ConstantValue::Int(v) => ConstantValue::Real(v.to_real()),
                ConstantValue::ShortReal(r) => ConstantValue::Real(r as f64),
                other => other,
            },
            TypeKind::ShortReal => match value {
                ConstantValue::Int(v) => ConstantValue::ShortReal(v.to_real() as f32),
                ConstantValue::Real(r) => ConstantValue::ShortReal(r as f32),
                other => other,
            },
            _ => value,
        }
    }

    fn pattern_value(&self, ty: TypeId, values: Vec<ConstantValue>) -> ConstantValue {
        let arena = self.comp.type_arena();
        match arena.get(arena.canonical(ty)).clone() {
            TypeKind::PackedStruct { .. } => {
                let mut parts = Vec::new();
                for value in &values {
                    match value {
                        ConstantValue::Int(v) => parts.push(v.clone()),
                        _ => return ConstantValue::Err,
                    }
                }
                ConstantValue::Int(SvInt::concat(&parts))
            }
            TypeKind::UnpackedArray { .. } => ConstantValue::Array(values),
            TypeKind::Integral { width, signed, .. } => {
                let mut parts = Vec::new();
                for value in &values {
                    match value {
                        ConstantValue::Int(v) => parts.push(v.clone()),
                        _ => return ConstantValue::Err,
                    }
                }
                ConstantValue::Int(SvInt::concat(&parts).resize(width, signed))
            }
            _ => ConstantValue::Err,
        }
    }

    /// The default (uninitialized) value of a type: x for four-state, zero
    /// for two-state.
    pub fn default_value(&self, ty: TypeId) -> ConstantValue {
        let arena = self.comp.type_arena();
        match arena.get(arena.canonical(ty)).clone() {
            TypeKind::Integral {
                width,
                signed,
                four_state,
            } => {
                if four_state {
                    ConstantValue::Int(SvInt::all_x(width, signed))
                } else {
                    ConstantValue::Int(SvInt::new(width, signed))
                }
            }
            TypeKind::PackedStruct {
                width, four_state, ..
            } => {
                if four_state {
                    ConstantValue::Int(SvInt::all_x(width, false))
                } else {
                    ConstantValue::Int(SvInt::new(width, false))
                }
            }
            TypeKind::Enum { base, .. } => self.default_value(base),
            TypeKind::Real => ConstantValue::Real(0.0),
            TypeKind::ShortReal => ConstantValue::ShortReal(0.0),
            TypeKind::Str => ConstantValue::Str(String::new()),
            TypeKind::UnpackedArray { elem, left, right } => {
                let count = (left - right).unsigned_abs() as usize + 1;
                ConstantValue::Array(vec![self.default_value(elem); count])
            }
            TypeKind::Queue { .. } => ConstantValue::Queue(Vec::new()),
            TypeKind::Associative { .. } => ConstantValue::Map(Vec::new()),
            _ => ConstantValue::Err,
        }
    }

    // ========================================================================
    // Statement interpretation
    // ========================================================================

    fn exec_stmt(&mut self, stmt: &BoundStmt) -> Option<Control> {
        match stmt {
            BoundStmt::Block(stmts) => {
                for s in stmts {
                    match self.exec_stmt(s)? {
                        Control::Normal => {}
                        ret => return Some(ret),
                    }
                }
                Some(Control::Normal)
            }
            BoundStmt::VarDecl { symbol, init } => {
                let value = match init {
                    Some(e) => {
                        let v = self.eval(e);
                        if v.is_err() {
                            return None;
                        }
                        v
                    }
                    None => {
                        let ty = self
                            .comp
                            .symbol(*symbol)
                            .value_type()
                            .unwrap_or(self.comp.type_arena().builtins.error);
                        self.default_value(ty)
                    }
                };
                if let Some(frame) = self.frames.last_mut() {
                    frame.locals.insert(*symbol, value);
                }
                Some(Control::Normal)
            }
            BoundStmt::Expr(e) => {
                if !self.step(e.span) {
                    return None;
                }
                // Assignments store through their lvalue; anything else is
                // evaluated for effect. Failures propagate.
                if self.eval(e).is_err() {
                    return None;
                }
                Some(Control::Normal)
            }
            BoundStmt::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                let c = self.eval(cond);
                if c.is_err() {
                    return None;
                }
                match c.truth() {
                    Logic::One => self.exec_stmt(then_stmt),
                    _ => match else_stmt {
                        Some(s) => self.exec_stmt(s),
                        None => Some(Control::Normal),
                    },
                }
            }
            BoundStmt::For {
                init,
                cond,
                step,
                body,
            } => {
                for s in init {
                    match self.exec_stmt(s)? {
                        Control::Normal => {}
                        ret => return Some(ret),
                    }
                }
                loop {
                    if let Some(c) = cond {
                        if !self.step(c.span) {
                            return None;
                        }
                        let v = self.eval(c);
                        if v.is_err() {
                            return None;
                        }
                        if v.truth() != Logic::One {
                            break;
                        }
                    }
                    match self.exec_stmt(body)? {
                        Control::Normal => {}
                        ret => return Some(ret),
                    }
                    for s in step {
                        match self.exec_stmt(s)? {
                            Control::Normal => {}
                            ret => return Some(ret),
                        }
                    }
                }
                Some(Control::Normal)
            }
            BoundStmt::Case {
                kind,
                expr,
                items,
                default,
            } => {
                let control = self.eval(expr);
                if control.is_err() {
                    return None;
                }
                for (labels, body) in items {
                    for label in labels {
                        let v = self.eval(label);
                        if v.is_err() {
                            return None;
                        }
                        if case_matches(*kind, &control, &v) {
                            return self.exec_stmt(body);
                        }
                    }
                }
                match default {
                    Some(body) => self.exec_stmt(body),
                    None => Some(Control::Normal),
                }
            }
            BoundStmt::Return(value) => {
                let v = match value {
                    Some(e) => {
                        let v = self.eval(e);
                        if v.is_err() {
                            return None;
                        }
                        v
                    }
                    None => ConstantValue::Null,
                };
                Some(Control::Return(v))
            }
            BoundStmt::Empty => Some(Control::Normal),
        }
    }

    // ========================================================================
    // LValues
    // ========================================================================

    /// Resolve an expression to a symbolic address for a store.
    pub fn eval_lvalue(&mut self, expr: &Expression) -> Option<LValue> {
        match &expr.kind {
            ExpressionKind::NamedValue { symbol } => Some(LValue {
                root: *symbol,
                path: Vec::new(),
            }),
            ExpressionKind::ElementSelect {
                value,
                selector,
                range,
            } => {
                let mut lv = self.eval_lvalue(value)?;
                let idx = self.eval(selector).integer().and_then(|v| v.to_i64())?;
                let pos = bit_position(idx, *range);
                lv.path.push(LValueSelector::BitRange { msb: pos, lsb: pos });
                Some(lv)
            }
            ExpressionKind::RangeSelect {
                value,
                kind,
                left,
                right,
                range,
            } => {
                let mut lv = self.eval_lvalue(value)?;
                let a = self.eval(left).integer().and_then(|v| v.to_i64())?;
                let b = self.eval(right).integer().and_then(|v| v.to_i64())?;
                let descending = range.0 >= range.1;
                let (msb, lsb) = match kind {
                    RangeSelectionKind::Simple => {
                        if descending {
                            (a - range.1, b - range.1)
                        } else {
                            (range.1 - a, range.1 - b)
                        }
                    }
                    RangeSelectionKind::IndexedUp => {
                        if descending {
                            let lsb = a - range.1;
                            (lsb + b - 1, lsb)
                        } else {
                            let msb = range.1 - a;
                            (msb, msb - b + 1)
                        }
                    }
                    RangeSelectionKind::IndexedDown => {
                        if descending {
                            let msb = a - range.1;
                            (msb, msb - b + 1)
                        } else {
                            let lsb = range.1 - a;
                            (lsb + b - 1, lsb)
                        }
                    }
                };
                lv.path.push(LValueSelector::BitRange { msb, lsb });
                Some(lv)
            }
            ExpressionKind::MemberAccess {
                value,
                bit_offset,
                bit_width,
                ..
            } => {
                let mut lv = self.eval_lvalue(value)?;
                lv.path.push(LValueSelector::BitRange {
                    msb: *bit_offset as i64 + *bit_width as i64 - 1,
                    lsb: *bit_offset as i64,
                });
                Some(lv)
            }
            _ => {
                self.report(&codes::BIND_NOT_ASSIGNABLE, expr.span, vec![]);
                None
            }
        }
    }

    fn store(&mut self, lv: &LValue, value: ConstantValue, span: Span) -> bool {
        let present = self
            .frames
            .last()
            .map_or(false, |f| f.locals.contains_key(&lv.root));
        if !present {
            let name = self.name_of(lv.root);
            self.report(&codes::EVAL_NOT_CONSTANT, span, vec![name]);
            return false;
        }

        let slot = self
            .frames
            .last_mut()
            .unwrap()
            .locals
            .get_mut(&lv.root)
            .unwrap();
        if lv.path.is_empty() {
            *slot = value;
            return true;
        }

        // Read-modify-write through bit-range selectors.
        let ConstantValue::Int(mut current) = slot.clone() else {
            return false;
        };
        let ConstantValue::Int(incoming) = value else {
            return false;
        };

        // Collapse nested selectors into one absolute bit range; each step
        // is relative to the previous selection's LSB.
        let mut lsb = 0i64;
        let mut msb = current.width() as i64 - 1;
        for selector in &lv.path {
            let LValueSelector::BitRange { msb: m, lsb: l } = selector;
            msb = lsb + m;
            lsb += l;
        }
        let width = (msb - lsb + 1).max(0);
        for i in 0..width {
            let target = lsb + i;
            if target >= 0 && (target as u32) < current.width() {
                current.set_bit(target as u32, incoming.get_bit(i as u32));
            }
        }
        let slot = self
            .frames
            .last_mut()
            .unwrap()
            .locals
            .get_mut(&lv.root)
            .unwrap();
        *slot = ConstantValue::Int(current);
        true
    }

    // ========================================================================
    // Constant verification
    // ========================================================================

    /// Walk the whole tree and report every construct that cannot appear in
    /// a constant expression. Runs to completion so all offenders are
    /// listed, then reports through the usual deduplicated stream.
    pub fn verify_constant(&mut self, expr: &Expression) -> bool {
        let mut ok = true;
        self.verify_inner(expr, &mut ok);
        ok
    }

    fn verify_inner(&mut self, expr: &Expression, ok: &mut bool) {
        match &expr.kind {
            ExpressionKind::Invalid(_) => {
                *ok = false;
            }
            ExpressionKind::NamedValue { symbol } => {
                match &self.comp.symbol(*symbol).kind {
                    SymbolKind::Parameter { .. }
                    | SymbolKind::EnumValue { .. }
                    | SymbolKind::Genvar { .. } => {}
                    _ => {
                        let name = self.name_of(*symbol);
                        self.report(&codes::EVAL_NOT_CONSTANT, expr.span, vec![name]);
                        *ok = false;
                    }
                }
            }
            ExpressionKind::SystemCall {
                function: SystemFunction::Display,
                ..
            } => {
                self.report(
                    &codes::EVAL_NOT_CONSTANT_CONSTRUCT,
                    expr.span,
                    vec!["a system task".into()],
                );
                *ok = false;
            }
            ExpressionKind::SystemCall {
                function: SystemFunction::Bits,
                ..
            } => {
                // $bits reads its argument's type, not its value.
                return;
            }
            ExpressionKind::Assignment { .. } => {
                self.report(
                    &codes::EVAL_NOT_CONSTANT_CONSTRUCT,
                    expr.span,
                    vec!["an assignment".into()],
                );
                *ok = false;
            }
            _ => {}
        }

        for child in children_of(expr) {
            self.verify_inner(child, ok);
        }
    }
}

fn children_of(expr: &Expression) -> Vec<&Expression> {
    match &expr.kind {
        ExpressionKind::UnaryOp { operand, .. } => vec![&**operand],
        ExpressionKind::BinaryOp { lhs, rhs, .. } => vec![&**lhs, &**rhs],
        ExpressionKind::ConditionalOp { cond, left, right } => {
            vec![&**cond, &**left, &**right]
        }
        ExpressionKind::Assignment { lhs, rhs, .. } => vec![&**lhs, &**rhs],
        ExpressionKind::Concatenation { operands, .. } => operands.iter().collect(),
        ExpressionKind::Replication { count, concat } => vec![&**count, &**concat],
        ExpressionKind::ElementSelect {
            value, selector, ..
        } => vec![&**value, &**selector],
        ExpressionKind::RangeSelect {
            value, left, right, ..
        } => vec![&**value, &**left, &**right],
        ExpressionKind::MemberAccess { value, .. } => vec![&**value],
        ExpressionKind::Call { args, .. } => args.iter().collect(),
        ExpressionKind::SystemCall { args, .. } => args.iter().collect(),
        ExpressionKind::Conversion { operand, .. } => vec![&**operand],
        ExpressionKind::SimpleAssignmentPattern { elements }
        | ExpressionKind::ReplicatedAssignmentPattern { elements, .. } => {
            elements.iter().collect()
        }
        ExpressionKind::StructuredAssignmentPattern { members } => {
            members.iter().map(|(_, e)| e).collect()
        }
        _ => Vec::new(),
    }
}

fn invert(bit: Logic) -> Logic {
    match bit {
        Logic::Zero => Logic::One,
        Logic::One => Logic::Zero,
        _ => Logic::X,
    }
}

fn bool_logic(b: bool) -> Logic {
    if b {
        Logic::One
    } else {
        Logic::Zero
    }
}

fn logic_and(a: Logic, b: Logic) -> Logic {
    match (a, b) {
        (Logic::Zero, _) | (_, Logic::Zero) => Logic::Zero,
        (Logic::One, Logic::One) => Logic::One,
        _ => Logic::X,
    }
}

fn logic_or(a: Logic, b: Logic) -> Logic {
    match (a, b) {
        (Logic::One, _) | (_, Logic::One) => Logic::One,
        (Logic::Zero, Logic::Zero) => Logic::Zero,
        _ => Logic::X,
    }
}

fn shift_amount(v: &SvInt) -> Option<u32> {
    if v.has_unknown() {
        return None;
    }
    // Oversized shift amounts just clear the value; saturate them.
    Some(v.to_u64().map(|x| x.min(u32::MAX as u64) as u32).unwrap_or(u32::MAX))
}

/// Bit position of a declared index within [left:right] bounds.
fn bit_position(index: i64, range: (i64, i64)) -> i64 {
    let (left, right) = range;
    if left >= right {
        index - right
    } else {
        right - index
    }
}

// An ambiguous conditional merges arms bitwise: equal bits survive, the
// rest go to x.
fn merge_ambiguous(a: &SvInt, b: &SvInt) -> SvInt {
    let width = a.width().max(b.width());
    let mut out = SvInt::new(width, a.is_signed() && b.is_signed());
    for i in 0..width {
        let pa = a.get_bit(i);
        let pb = b.get_bit(i);
        if pa == pb && !pa.is_unknown() {
            out.set_bit(i, pa);
        } else {
            out.set_bit(i, Logic::X);
        }
    }
    out
}

fn case_matches(kind: CaseKind, control: &ConstantValue, label: &ConstantValue) -> bool {
    match (control, label) {
        (ConstantValue::Int(c), ConstantValue::Int(l)) => {
            // Binding propagated both sides to a common type already.
            let c = c.resize(c.width().max(l.width()), false);
            let l = l.resize(c.width(), false);
            match kind {
                CaseKind::Normal => c.case_eq(&l),
                CaseKind::CaseZ => (0..c.width()).all(|i| {
                    let cb = c.get_bit(i);
                    let lb = l.get_bit(i);
                    cb == Logic::Z || lb == Logic::Z || cb == lb
                }),
                CaseKind::CaseX => (0..c.width()).all(|i| {
                    let cb = c.get_bit(i);
                    let lb = l.get_bit(i);
                    cb.is_unknown() || lb.is_unknown() || cb == lb
                }),
            }
        }
        (a, b) => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_positions_respect_endianness() {
        // Descending [7:0]: index 3 is bit 3.
        assert_eq!(bit_position(3, (7, 0)), 3);
        // Ascending [0:7]: index 0 is the MSB, position 7.
        assert_eq!(bit_position(0, (0, 7)), 7);
        assert_eq!(bit_position(7, (0, 7)), 0);
        // Descending with a nonzero LSB label [11:4].
        assert_eq!(bit_position(4, (11, 4)), 0);
        assert_eq!(bit_position(11, (11, 4)), 7);
    }

    #[test]
    fn ambiguous_merge_keeps_agreeing_bits() {
        let a = SvInt::from_u64(4, false, 0b1010);
        let b = SvInt::from_u64(4, false, 0b1001);
        let merged = merge_ambiguous(&a, &b);
        assert_eq!(merged.get_bit(3), Logic::One);
        assert_eq!(merged.get_bit(2), Logic::Zero);
        assert_eq!(merged.get_bit(1), Logic::X);
        assert_eq!(merged.get_bit(0), Logic::X);
    }
}
