// src/sema/expr/mod.rs
//! The bound expression tree.
//!
//! Binding happens in two passes. The creation pass turns syntax into
//! `Expression` nodes carrying their natural self-determined types. The
//! propagation pass then pushes the final context type down through
//! context-determined operators, resizing literals and inserting implicit
//! conversion nodes where a subexpression cannot adopt the imposed type.

pub mod binding;
pub mod eval;
pub mod propagate;

use crate::frontend::{NameId, Span};
use crate::sema::symbol::SymbolId;
use crate::sema::types::TypeId;
use crate::value::{ConstantValue, Logic, SvInt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
    BitwiseNot,
    ReductionAnd,
    ReductionOr,
    ReductionXor,
    ReductionNand,
    ReductionNor,
    ReductionXnor,
    LogicalNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,
    Power,
    BinaryAnd,
    BinaryOr,
    BinaryXor,
    BinaryXnor,
    Equality,
    Inequality,
    CaseEquality,
    CaseInequality,
    WildcardEquality,
    WildcardInequality,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    LogicalAnd,
    LogicalOr,
    LogicalShiftLeft,
    LogicalShiftRight,
    ArithmeticShiftLeft,
    ArithmeticShiftRight,
}

impl BinaryOperator {
    /// Operators whose operands adopt the width imposed by context.
    pub fn is_context_determined(self) -> bool {
        use BinaryOperator::*;
        matches!(
            self,
            Add | Subtract
                | Multiply
                | Divide
                | Mod
                | BinaryAnd
                | BinaryOr
                | BinaryXor
                | BinaryXnor
        )
    }

    /// Comparison operators: operands widen to their own common type and
    /// the result is a single bit.
    pub fn is_comparison(self) -> bool {
        use BinaryOperator::*;
        matches!(
            self,
            Equality
                | Inequality
                | CaseEquality
                | CaseInequality
                | WildcardEquality
                | WildcardInequality
                | GreaterThan
                | GreaterThanEqual
                | LessThan
                | LessThanEqual
        )
    }

    pub fn is_shift(self) -> bool {
        use BinaryOperator::*;
        matches!(
            self,
            LogicalShiftLeft | LogicalShiftRight | ArithmeticShiftLeft | ArithmeticShiftRight
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr)
    }

    pub fn symbol(self) -> &'static str {
        use BinaryOperator::*;
        match self {
            Add => "+",
            Subtract => "-",
            Multiply => "*",
            Divide => "/",
            Mod => "%",
            Power => "**",
            BinaryAnd => "&",
            BinaryOr => "|",
            BinaryXor => "^",
            BinaryXnor => "~^",
            Equality => "==",
            Inequality => "!=",
            CaseEquality => "===",
            CaseInequality => "!==",
            WildcardEquality => "==?",
            WildcardInequality => "!=?",
            GreaterThan => ">",
            GreaterThanEqual => ">=",
            LessThan => "<",
            LessThanEqual => "<=",
            LogicalAnd => "&&",
            LogicalOr => "||",
            LogicalShiftLeft => "<<",
            LogicalShiftRight => ">>",
            ArithmeticShiftLeft => "<<<",
            ArithmeticShiftRight => ">>>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSelectionKind {
    Simple,
    IndexedUp,
    IndexedDown,
}

/// Known system subroutines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemFunction {
    Clog2,
    Bits,
    Signed,
    Unsigned,
    /// Display-family tasks; never constant
    Display,
}

/// A typed, operator-resolved expression node.
#[derive(Debug, Clone)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub ty: TypeId,
    /// Populated when constant folding succeeded in a context that asked
    /// for it.
    pub constant: Option<ConstantValue>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    /// The poisoned expression; downstream consumers stay quiet.
    Invalid(Option<Box<Expression>>),
    IntegerLiteral {
        value: SvInt,
        declared_unsized: bool,
    },
    RealLiteral(f64),
    UnbasedUnsizedLiteral(Logic),
    NullLiteral,
    StringLiteral(String),
    NamedValue {
        symbol: SymbolId,
    },
    /// A typedef used where an expression is expected ($bits(word_t))
    DataType(TypeId),
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    BinaryOp {
        op: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    ConditionalOp {
        cond: Box<Expression>,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Assignment {
        lhs: Box<Expression>,
        rhs: Box<Expression>,
        non_blocking: bool,
    },
    Concatenation {
        operands: Vec<Expression>,
        /// True when every operand is string-convertible and the result is
        /// a string concatenation instead of a vector one.
        string_concat: bool,
    },
    Replication {
        count: Box<Expression>,
        concat: Box<Expression>,
    },
    ElementSelect {
        value: Box<Expression>,
        selector: Box<Expression>,
        /// Declared (left, right) bounds of the selected dimension
        range: (i64, i64),
    },
    RangeSelect {
        value: Box<Expression>,
        kind: RangeSelectionKind,
        left: Box<Expression>,
        right: Box<Expression>,
        /// Declared (left, right) bounds of the selected dimension
        range: (i64, i64),
    },
    MemberAccess {
        value: Box<Expression>,
        member: NameId,
        /// LSB offset and width of the member within the packed parent
        bit_offset: u32,
        bit_width: u32,
    },
    Call {
        subroutine: SymbolId,
        args: Vec<Expression>,
    },
    SystemCall {
        function: SystemFunction,
        name: NameId,
        args: Vec<Expression>,
    },
    Conversion {
        operand: Box<Expression>,
        implicit: bool,
    },
    SimpleAssignmentPattern {
        elements: Vec<Expression>,
    },
    StructuredAssignmentPattern {
        members: Vec<(NameId, Expression)>,
    },
    ReplicatedAssignmentPattern {
        count: Box<Expression>,
        elements: Vec<Expression>,
    },
}

impl Expression {
    pub fn new(kind: ExpressionKind, ty: TypeId, span: Span) -> Self {
        Self {
            kind,
            ty,
            constant: None,
            span,
        }
    }

    pub fn invalid(ty: TypeId, span: Span) -> Self {
        Self::new(ExpressionKind::Invalid(None), ty, span)
    }

    /// Whether this expression is the poisoned invalid expression, or
    /// carries the error type.
    pub fn bad(&self) -> bool {
        matches!(self.kind, ExpressionKind::Invalid(_))
    }

    /// Whether this expression can appear on the left of an assignment.
    pub fn is_lvalue(&self) -> bool {
        match &self.kind {
            ExpressionKind::NamedValue { .. } => true,
            ExpressionKind::ElementSelect { value, .. }
            | ExpressionKind::RangeSelect { value, .. }
            | ExpressionKind::MemberAccess { value, .. } => value.is_lvalue(),
            ExpressionKind::Concatenation { operands, .. } => {
                operands.iter().all(|o| o.is_lvalue())
            }
            _ => false,
        }
    }
}

/// A bound statement, used for function bodies and procedural blocks.
#[derive(Debug, Clone)]
pub enum BoundStmt {
    Block(Vec<BoundStmt>),
    VarDecl {
        symbol: SymbolId,
        init: Option<Expression>,
    },
    Expr(Expression),
    If {
        cond: Expression,
        then_stmt: Box<BoundStmt>,
        else_stmt: Option<Box<BoundStmt>>,
    },
    For {
        init: Vec<BoundStmt>,
        cond: Option<Expression>,
        step: Vec<BoundStmt>,
        body: Box<BoundStmt>,
    },
    Case {
        kind: crate::frontend::ast::CaseKind,
        expr: Expression,
        items: Vec<(Vec<Expression>, BoundStmt)>,
        default: Option<Box<BoundStmt>>,
    },
    Return(Option<Expression>),
    Empty,
}

/// One selection step applied to an lvalue's root.
#[derive(Debug, Clone)]
pub enum LValueSelector {
    /// Bit positions [left, right] counted from the LSB
    BitRange { msb: i64, lsb: i64 },
}

/// A symbolic address: the target of a store during constant function
/// interpretation.
#[derive(Debug, Clone)]
pub struct LValue {
    pub root: SymbolId,
    pub path: Vec<LValueSelector>,
}
