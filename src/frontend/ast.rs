// src/frontend/ast.rs

use std::sync::Arc;

use crate::frontend::intern::NameId;
use crate::frontend::token::Span;
use crate::value::LiteralBase;

/// A parsed source unit: the top-level declarations of one syntax tree.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone)]
pub enum Item {
    Definition(Arc<DefinitionDecl>),
    Package(Arc<PackageDecl>),
}

/// What kind of instantiable definition a declaration introduces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    Module,
    Interface,
    Program,
}

impl DefinitionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DefinitionKind::Module => "module",
            DefinitionKind::Interface => "interface",
            DefinitionKind::Program => "program",
        }
    }
}

/// module/interface/program declaration
#[derive(Debug, Clone)]
pub struct DefinitionDecl {
    pub kind: DefinitionKind,
    pub name: NameId,
    pub name_span: Span,
    pub param_ports: Vec<ParamDecl>,
    pub ports: Vec<PortDecl>,
    pub items: Vec<ModuleItem>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct PackageDecl {
    pub name: NameId,
    pub name_span: Span,
    pub items: Vec<ModuleItem>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ModuleItem {
    Param(ParamDecl),
    Var(VarDecl),
    Net(NetDecl),
    Typedef(TypedefDecl),
    Instance(InstantiationDecl),
    Defparam(DefparamDecl),
    Genvar(GenvarDecl),
    GenerateFor(GenerateFor),
    GenerateIf(GenerateIf),
    /// generate ... endgenerate region; contents belong to the parent scope
    GenerateRegion(Vec<ModuleItem>),
    Procedural(ProceduralBlock),
    Function(Arc<FunctionDecl>),
    ContinuousAssign(ContinuousAssign),
    Import(ImportDecl),
}

/// parameter or localparam declaration
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub is_local: bool,
    pub ty: TypeSyntax,
    pub name: NameId,
    pub name_span: Span,
    pub init: Option<ExprSyntax>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub ty: TypeSyntax,
    pub name: NameId,
    pub name_span: Span,
    pub unpacked_dims: Vec<RangeSyntax>,
    pub init: Option<ExprSyntax>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct NetDecl {
    pub ty: TypeSyntax,
    pub name: NameId,
    pub name_span: Span,
    pub init: Option<ExprSyntax>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TypedefDecl {
    pub ty: TypeSyntax,
    pub name: NameId,
    pub name_span: Span,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
    Inout,
}

impl PortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            PortDirection::Input => "input",
            PortDirection::Output => "output",
            PortDirection::Inout => "inout",
        }
    }
}

/// ANSI port declaration
#[derive(Debug, Clone)]
pub struct PortDecl {
    pub direction: PortDirection,
    pub is_net: bool,
    pub ty: TypeSyntax,
    pub name: NameId,
    pub name_span: Span,
    pub span: Span,
}

/// One `name #(...) inst(...), inst2(...);` item
#[derive(Debug, Clone)]
pub struct InstantiationDecl {
    pub module: NameId,
    pub module_span: Span,
    pub param_assignments: Vec<ConnectionSyntax>,
    pub instances: Vec<HierInstance>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct HierInstance {
    pub name: NameId,
    pub name_span: Span,
    pub connections: Vec<ConnectionSyntax>,
    pub span: Span,
}

/// Named (.P(x)) or ordered parameter/port connection
#[derive(Debug, Clone)]
pub struct ConnectionSyntax {
    pub name: Option<(NameId, Span)>,
    pub expr: Option<ExprSyntax>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct DefparamDecl {
    pub target: Vec<(NameId, Span)>,
    pub value: ExprSyntax,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct GenvarDecl {
    pub name: NameId,
    pub name_span: Span,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct GenerateFor {
    pub genvar: NameId,
    pub genvar_span: Span,
    pub init: ExprSyntax,
    pub cond: ExprSyntax,
    pub step: ExprSyntax,
    pub label: Option<NameId>,
    pub body: Arc<Vec<ModuleItem>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct GenerateIf {
    pub cond: ExprSyntax,
    pub then_label: Option<NameId>,
    pub then_items: Arc<Vec<ModuleItem>>,
    pub else_label: Option<NameId>,
    pub else_items: Option<Arc<Vec<ModuleItem>>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProceduralKind {
    Initial,
    Always,
    AlwaysComb,
    AlwaysFF,
    AlwaysLatch,
}

#[derive(Debug, Clone)]
pub struct ProceduralBlock {
    pub kind: ProceduralKind,
    pub body: Arc<StmtSyntax>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub return_type: TypeSyntax,
    pub name: NameId,
    pub name_span: Span,
    pub args: Vec<FunctionArg>,
    pub body: Vec<StmtSyntax>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionArg {
    pub ty: TypeSyntax,
    pub name: NameId,
    pub name_span: Span,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ContinuousAssign {
    pub target: ExprSyntax,
    pub value: ExprSyntax,
    pub span: Span,
}

/// import pkg::* or import pkg::name
#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub package: NameId,
    pub package_span: Span,
    pub name: Option<(NameId, Span)>,
    pub span: Span,
}

// ============================================================================
// Types
// ============================================================================

/// Built-in type keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKeyword {
    Bit,
    Logic,
    Reg,
    Byte,
    ShortInt,
    Int,
    LongInt,
    Integer,
    Time,
    Real,
    RealTime,
    ShortReal,
    String,
    Chandle,
    Event,
    Void,
}

#[derive(Debug, Clone)]
pub enum TypeSyntaxKind {
    Keyword(TypeKeyword),
    Named(NameId),
    Scoped(NameId, NameId),
    Enum {
        base: Option<Box<TypeSyntax>>,
        members: Vec<EnumMemberSyntax>,
    },
    PackedStruct {
        members: Vec<StructMemberSyntax>,
    },
    /// No explicit type; width and sign come from context
    Implicit,
}

#[derive(Debug, Clone)]
pub struct TypeSyntax {
    pub kind: TypeSyntaxKind,
    /// Some(true) = signed, Some(false) = unsigned, None = default
    pub signing: Option<bool>,
    pub packed_dims: Vec<RangeSyntax>,
    pub span: Span,
}

impl TypeSyntax {
    pub fn implicit(span: Span) -> Self {
        Self {
            kind: TypeSyntaxKind::Implicit,
            signing: None,
            packed_dims: Vec::new(),
            span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnumMemberSyntax {
    pub name: NameId,
    pub name_span: Span,
    pub init: Option<ExprSyntax>,
}

#[derive(Debug, Clone)]
pub struct StructMemberSyntax {
    pub ty: TypeSyntax,
    pub name: NameId,
    pub name_span: Span,
}

/// [left : right]
#[derive(Debug, Clone)]
pub struct RangeSyntax {
    pub left: ExprSyntax,
    pub right: ExprSyntax,
    pub span: Span,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseKind {
    Normal,
    CaseZ,
    CaseX,
}

#[derive(Debug, Clone)]
pub struct CaseItemSyntax {
    /// Empty for the default item
    pub exprs: Vec<ExprSyntax>,
    pub body: StmtSyntax,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StmtSyntax {
    pub kind: StmtSyntaxKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtSyntaxKind {
    Block {
        label: Option<NameId>,
        stmts: Vec<StmtSyntax>,
    },
    VarDecl(VarDecl),
    Assign {
        target: ExprSyntax,
        value: ExprSyntax,
        nonblocking: bool,
    },
    If {
        cond: ExprSyntax,
        then_stmt: Box<StmtSyntax>,
        else_stmt: Option<Box<StmtSyntax>>,
    },
    For {
        init: Option<Box<StmtSyntax>>,
        cond: Option<ExprSyntax>,
        step: Option<Box<StmtSyntax>>,
        body: Box<StmtSyntax>,
    },
    Case {
        kind: CaseKind,
        expr: ExprSyntax,
        items: Vec<CaseItemSyntax>,
    },
    Return(Option<ExprSyntax>),
    Expr(ExprSyntax),
    Empty,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOpSyntax {
    Plus,
    Minus,
    BitwiseNot,
    LogicalNot,
    ReductionAnd,
    ReductionOr,
    ReductionXor,
    ReductionNand,
    ReductionNor,
    ReductionXnor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOpSyntax {
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSelectKind {
    /// [msb:lsb]
    Simple,
    /// [base +: width]
    IndexedUp,
    /// [base -: width]
    IndexedDown,
}

/// An integer literal as written: `4'sb10x1` keeps its size, signing, base
/// and raw digits until binding converts it to an SvInt.
#[derive(Debug, Clone)]
pub struct IntegerLiteralSyntax {
    pub size: Option<u32>,
    pub signed: bool,
    pub base: Option<LiteralBase>,
    pub digits: String,
}

#[derive(Debug, Clone)]
pub struct ExprSyntax {
    pub kind: ExprSyntaxKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprSyntaxKind {
    IntLiteral(IntegerLiteralSyntax),
    UnbasedLiteral(char),
    RealLiteral(f64),
    StringLiteral(String),
    NullLiteral,
    /// $ in a queue/range context
    UnboundedLiteral,
    Identifier(NameId),
    /// pkg::name
    Scoped(NameId, Span, NameId, Span),
    Unary(UnaryOpSyntax, Box<ExprSyntax>),
    Binary(BinaryOpSyntax, Box<ExprSyntax>, Box<ExprSyntax>),
    Conditional(Box<ExprSyntax>, Box<ExprSyntax>, Box<ExprSyntax>),
    Concat(Vec<ExprSyntax>),
    Replication(Box<ExprSyntax>, Vec<ExprSyntax>),
    ElementSelect(Box<ExprSyntax>, Box<ExprSyntax>),
    RangeSelect(Box<ExprSyntax>, RangeSelectKind, Box<ExprSyntax>, Box<ExprSyntax>),
    MemberAccess(Box<ExprSyntax>, NameId, Span),
    Call(Box<ExprSyntax>, Vec<ExprSyntax>),
    SystemCall(NameId, Span, Vec<ExprSyntax>),
    Paren(Box<ExprSyntax>),
    /// '{ expr, ... }
    AssignmentPattern(Vec<AssignmentPatternItem>),
    /// '{ N { expr } }
    ReplicatedPattern(Box<ExprSyntax>, Vec<ExprSyntax>),
}

#[derive(Debug, Clone)]
pub struct AssignmentPatternItem {
    /// Some for structured patterns ('{ member: value })
    pub key: Option<(NameId, Span)>,
    pub value: ExprSyntax,
}

impl ExprSyntax {
    /// Collect a dotted name path (a.b.c) if this expression is one.
    pub fn as_name_path(&self) -> Option<Vec<(NameId, Span)>> {
        match &self.kind {
            ExprSyntaxKind::Identifier(name) => Some(vec![(*name, self.span)]),
            ExprSyntaxKind::MemberAccess(base, name, span) => {
                let mut path = base.as_name_path()?;
                path.push((*name, *span));
                Some(path)
            }
            _ => None,
        }
    }
}
