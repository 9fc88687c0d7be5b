// src/sema/symbol.rs

use std::sync::Arc;

use crate::frontend::ast::{
    ConnectionSyntax, ExprSyntax, FunctionDecl, PortDirection, ProceduralKind, StmtSyntax,
};
use crate::frontend::{NameId, Span};
use crate::sema::expr::BoundStmt;
use crate::sema::types::TypeId;
use crate::value::ConstantValue;

/// Index of a symbol in the compilation's symbol arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

/// Index of a scope in the compilation's scope arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

/// Index of a module/interface/program definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefinitionId(pub u32);

/// A named entity placed in some scope at an ordered index.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: NameId,
    pub span: Span,
    /// Set before the symbol becomes visible to lookups
    pub parent: Option<ScopeId>,
    /// Declaration order within the parent scope; the first member gets 1,
    /// so a LookupLocation with index 0 sees nothing.
    pub index: u32,
}

/// The declared packed range of a value, kept for select endianness.
pub type DeclaredRange = Option<(i64, i64)>;

#[derive(Debug, Clone)]
pub enum SymbolKind {
    /// The root of the elaborated design; members are the top instances.
    Root { scope: ScopeId },
    /// One per syntax tree added to the compilation.
    CompilationUnit { scope: ScopeId },
    Package {
        scope: ScopeId,
    },
    /// A placed instance with a hierarchical name. The body may be shared
    /// with other instances that have identical parameter values.
    Instance {
        definition: DefinitionId,
        body: ScopeId,
        connections: Vec<ConnectionSyntax>,
    },
    /// The elaborated contents of an instance, parameters resolved.
    InstanceBody {
        definition: DefinitionId,
        scope: ScopeId,
    },
    Parameter {
        ty: TypeId,
        value: ConstantValue,
        is_local: bool,
        is_port: bool,
        declared_range: DeclaredRange,
    },
    Variable {
        ty: TypeId,
        declared_range: DeclaredRange,
        initializer: Option<ExprSyntax>,
    },
    Net {
        ty: TypeId,
        declared_range: DeclaredRange,
        initializer: Option<ExprSyntax>,
    },
    Port {
        ty: TypeId,
        direction: PortDirection,
        declared_range: DeclaredRange,
    },
    Subroutine {
        return_type: TypeId,
        args: Vec<SymbolId>,
        scope: ScopeId,
        syntax: Arc<FunctionDecl>,
        /// Bound lazily on first call binding; None until then.
        body: Option<Arc<Vec<BoundStmt>>>,
    },
    FormalArg {
        ty: TypeId,
        declared_range: DeclaredRange,
    },
    GenerateBlock {
        scope: ScopeId,
    },
    StatementBlock {
        scope: ScopeId,
    },
    ProceduralBlock {
        kind: ProceduralKind,
        body: Arc<StmtSyntax>,
        /// Set when the lazy binding drain reaches this block.
        bound: Option<Arc<BoundStmt>>,
    },
    ContinuousAssign {
        target: ExprSyntax,
        value: ExprSyntax,
    },
    TypeAlias {
        target: TypeId,
    },
    Genvar {
        ty: TypeId,
    },
    EnumValue {
        ty: TypeId,
        value: ConstantValue,
    },
    Defparam {
        target: Vec<(NameId, Span)>,
        value: ExprSyntax,
    },
}

impl Symbol {
    /// True for symbols that denote a value usable in expressions.
    pub fn is_value(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Parameter { .. }
                | SymbolKind::Variable { .. }
                | SymbolKind::Net { .. }
                | SymbolKind::Port { .. }
                | SymbolKind::FormalArg { .. }
                | SymbolKind::EnumValue { .. }
                | SymbolKind::Genvar { .. }
        )
    }

    /// The declared type of a value symbol.
    pub fn value_type(&self) -> Option<TypeId> {
        match &self.kind {
            SymbolKind::Parameter { ty, .. }
            | SymbolKind::Variable { ty, .. }
            | SymbolKind::Net { ty, .. }
            | SymbolKind::Port { ty, .. }
            | SymbolKind::FormalArg { ty, .. }
            | SymbolKind::EnumValue { ty, .. }
            | SymbolKind::Genvar { ty } => Some(*ty),
            _ => None,
        }
    }

    /// The declared packed range for select translation, when one exists.
    pub fn declared_range(&self) -> DeclaredRange {
        match &self.kind {
            SymbolKind::Parameter { declared_range, .. }
            | SymbolKind::Variable { declared_range, .. }
            | SymbolKind::Net { declared_range, .. }
            | SymbolKind::Port { declared_range, .. }
            | SymbolKind::FormalArg { declared_range, .. } => *declared_range,
            _ => None,
        }
    }

    /// The child scope this symbol owns, if it is a scope owner.
    pub fn owned_scope(&self) -> Option<ScopeId> {
        match &self.kind {
            SymbolKind::Root { scope }
            | SymbolKind::CompilationUnit { scope }
            | SymbolKind::Package { scope }
            | SymbolKind::InstanceBody { scope, .. }
            | SymbolKind::Subroutine { scope, .. }
            | SymbolKind::GenerateBlock { scope }
            | SymbolKind::StatementBlock { scope } => Some(*scope),
            SymbolKind::Instance { body, .. } => Some(*body),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            SymbolKind::Root { .. } => "root",
            SymbolKind::CompilationUnit { .. } => "compilation unit",
            SymbolKind::Package { .. } => "package",
            SymbolKind::Instance { .. } => "instance",
            SymbolKind::InstanceBody { .. } => "instance body",
            SymbolKind::Parameter { .. } => "parameter",
            SymbolKind::Variable { .. } => "variable",
            SymbolKind::Net { .. } => "net",
            SymbolKind::Port { .. } => "port",
            SymbolKind::Subroutine { .. } => "function",
            SymbolKind::FormalArg { .. } => "argument",
            SymbolKind::GenerateBlock { .. } => "generate block",
            SymbolKind::StatementBlock { .. } => "block",
            SymbolKind::ProceduralBlock { .. } => "procedural block",
            SymbolKind::ContinuousAssign { .. } => "continuous assignment",
            SymbolKind::TypeAlias { .. } => "typedef",
            SymbolKind::Genvar { .. } => "genvar",
            SymbolKind::EnumValue { .. } => "enum member",
            SymbolKind::Defparam { .. } => "defparam",
        }
    }
}
