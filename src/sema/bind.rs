// src/sema/bind.rs

use crate::sema::scope::LookupLocation;
use crate::sema::symbol::ScopeId;

/// Modifier flags carried through expression binding.
pub mod bind_flags {
    /// No special behavior.
    pub const NONE: u32 = 0;
    /// The expression must be constant; hierarchical references are
    /// disallowed and the result is folded after binding.
    pub const CONSTANT: u32 = 1 << 0;
    /// Binding happens outside any procedural block (continuous assigns,
    /// parameter initializers, port connections).
    pub const NON_PROCEDURAL: u32 = 1 << 1;
    /// The expression is an operand of a concatenation.
    pub const INSIDE_CONCAT: u32 = 1 << 2;
    /// The $ unbounded marker is allowed here.
    pub const ALLOW_UNBOUNDED: u32 = 1 << 3;
}

/// Everything expression binding needs to know about where it is: the scope
/// names resolve in, the visibility cutoff, the flag set, and how deep in
/// the instance hierarchy the surrounding elaboration is.
#[derive(Debug, Clone, Copy)]
pub struct BindContext {
    pub scope: ScopeId,
    pub location: LookupLocation,
    pub flags: u32,
    pub instance_depth: u32,
}

impl BindContext {
    pub fn new(scope: ScopeId, location: LookupLocation) -> Self {
        Self {
            scope,
            location,
            flags: bind_flags::NONE,
            instance_depth: 0,
        }
    }

    pub fn constant(scope: ScopeId, location: LookupLocation) -> Self {
        Self {
            scope,
            location,
            flags: bind_flags::CONSTANT | bind_flags::NON_PROCEDURAL,
            instance_depth: 0,
        }
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags |= flags;
        self
    }

    pub fn requires_constant(&self) -> bool {
        self.flags & bind_flags::CONSTANT != 0
    }

    pub fn non_procedural(&self) -> bool {
        self.flags & bind_flags::NON_PROCEDURAL != 0
    }
}
