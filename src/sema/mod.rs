// src/sema/mod.rs
pub mod bind;
pub mod compilation;
pub mod elaborate;
pub mod expr;
pub mod lookup;
pub mod resolve;
pub mod scope;
pub mod serialize;
pub mod symbol;
pub mod type_arena;
pub mod types;

pub use bind::{bind_flags, BindContext};
pub use compilation::{
    Compilation, CompilationError, CompilationOptions, Definition, MinTypMax, ParamOverrideNode,
};
pub use expr::{BinaryOperator, Expression, ExpressionKind, UnaryOperator};
pub use lookup::{lookup_flags, LookupResult};
pub use scope::{LookupLocation, Scope};
pub use symbol::{DefinitionId, ScopeId, Symbol, SymbolId, SymbolKind};
pub use type_arena::TypeArena;
pub use types::{IntegralFlags, TypeId, TypeKind};
