// src/sema/type_arena.rs
//
// Interned type storage using TypeId handles for O(1) equality.

use hashbrown::HashMap;

use crate::frontend::ast::TypeKeyword;
use crate::frontend::{Interner, NameId};
use crate::sema::types::{IntegralFlags, TypeId, TypeKind};

/// Pre-interned built-in types for O(1) access
#[derive(Debug, Clone, Copy)]
pub struct Builtins {
    // Scalars
    pub bit: TypeId,
    pub logic: TypeId,
    pub signed_bit: TypeId,
    pub signed_logic: TypeId,
    // Predefined integer types
    pub byte: TypeId,
    pub short_int: TypeId,
    pub int: TypeId,
    pub long_int: TypeId,
    pub integer: TypeId,
    pub time: TypeId,
    pub unsigned_int: TypeId,
    // Real family
    pub real: TypeId,
    pub short_real: TypeId,
    // Other built-ins
    pub string: TypeId,
    pub chandle: TypeId,
    pub event: TypeId,
    pub void: TypeId,
    pub null: TypeId,
    pub unbounded: TypeId,
    pub error: TypeId,
}

/// Per-compilation type arena with automatic interning.
///
/// Identical canonical forms always return the same `TypeId`, which is what
/// makes type equality a pointer (well, index) comparison everywhere else.
pub struct TypeArena {
    types: Vec<TypeKind>,
    intern_map: HashMap<TypeKind, TypeId>,
    pub builtins: Builtins,
    next_enum_id: u32,
}

impl TypeArena {
    pub fn new() -> Self {
        let mut arena = Self {
            types: Vec::new(),
            intern_map: HashMap::new(),
            builtins: Builtins {
                bit: TypeId(0),
                logic: TypeId(0),
                signed_bit: TypeId(0),
                signed_logic: TypeId(0),
                byte: TypeId(0),
                short_int: TypeId(0),
                int: TypeId(0),
                long_int: TypeId(0),
                integer: TypeId(0),
                time: TypeId(0),
                unsigned_int: TypeId(0),
                real: TypeId(0),
                short_real: TypeId(0),
                string: TypeId(0),
                chandle: TypeId(0),
                event: TypeId(0),
                void: TypeId(0),
                null: TypeId(0),
                unbounded: TypeId(0),
                error: TypeId(0),
            },
            next_enum_id: 1,
        };

        // Error must be first so is_error() can check the raw index.
        arena.builtins.error = arena.intern(TypeKind::Error);
        debug_assert_eq!(arena.builtins.error.0, 0);

        arena.builtins.bit = arena.integral(1, IntegralFlags::new(false, false));
        arena.builtins.logic = arena.integral(1, IntegralFlags::new(false, true));
        arena.builtins.signed_bit = arena.integral(1, IntegralFlags::new(true, false));
        arena.builtins.signed_logic = arena.integral(1, IntegralFlags::new(true, true));
        arena.builtins.byte = arena.integral(8, IntegralFlags::new(true, false));
        arena.builtins.short_int = arena.integral(16, IntegralFlags::new(true, false));
        arena.builtins.int = arena.integral(32, IntegralFlags::new(true, false));
        arena.builtins.long_int = arena.integral(64, IntegralFlags::new(true, false));
        arena.builtins.integer = arena.integral(32, IntegralFlags::new(true, true));
        arena.builtins.time = arena.integral(64, IntegralFlags::new(false, true));
        arena.builtins.unsigned_int = arena.integral(32, IntegralFlags::new(false, false));
        arena.builtins.real = arena.intern(TypeKind::Real);
        arena.builtins.short_real = arena.intern(TypeKind::ShortReal);
        arena.builtins.string = arena.intern(TypeKind::Str);
        arena.builtins.chandle = arena.intern(TypeKind::Chandle);
        arena.builtins.event = arena.intern(TypeKind::Event);
        arena.builtins.void = arena.intern(TypeKind::Void);
        arena.builtins.null = arena.intern(TypeKind::Null);
        arena.builtins.unbounded = arena.intern(TypeKind::Unbounded);

        arena
    }

    /// Intern a type, returning the existing TypeId if already interned
    pub fn intern(&mut self, kind: TypeKind) -> TypeId {
        let next_id = TypeId(self.types.len() as u32);
        *self.intern_map.entry(kind.clone()).or_insert_with(|| {
            self.types.push(kind);
            next_id
        })
    }

    pub fn get(&self, id: TypeId) -> &TypeKind {
        &self.types[id.0 as usize]
    }

    pub fn is_error(&self, id: TypeId) -> bool {
        id.0 == 0
    }

    /// The canonical integral type for a width and flag set.
    pub fn integral(&mut self, width: u32, flags: IntegralFlags) -> TypeId {
        self.intern(TypeKind::Integral {
            width: width.max(1),
            signed: flags.signed,
            four_state: flags.four_state,
        })
    }

    /// The built-in type for a type keyword, ignoring dimensions.
    pub fn for_keyword(&self, kw: TypeKeyword) -> TypeId {
        match kw {
            TypeKeyword::Bit => self.builtins.bit,
            TypeKeyword::Logic | TypeKeyword::Reg => self.builtins.logic,
            TypeKeyword::Byte => self.builtins.byte,
            TypeKeyword::ShortInt => self.builtins.short_int,
            TypeKeyword::Int => self.builtins.int,
            TypeKeyword::LongInt => self.builtins.long_int,
            TypeKeyword::Integer => self.builtins.integer,
            TypeKeyword::Time => self.builtins.time,
            TypeKeyword::Real | TypeKeyword::RealTime => self.builtins.real,
            TypeKeyword::ShortReal => self.builtins.short_real,
            TypeKeyword::String => self.builtins.string,
            TypeKeyword::Chandle => self.builtins.chandle,
            TypeKeyword::Event => self.builtins.event,
            TypeKeyword::Void => self.builtins.void,
        }
    }

    /// A fresh enum type; each declaration gets its own identity.
    pub fn make_enum(&mut self, base: TypeId) -> TypeId {
        let system_id = self.next_enum_id;
        self.next_enum_id += 1;
        self.intern(TypeKind::Enum { base, system_id })
    }

    /// Resolve alias chains to the canonical type.
    pub fn canonical(&self, id: TypeId) -> TypeId {
        let mut current = id;
        loop {
            match self.get(current) {
                TypeKind::Alias { target, .. } => current = *target,
                _ => return current,
            }
        }
    }

    /// Bit width of a packed type; None for unpacked types.
    pub fn bit_width(&self, id: TypeId) -> Option<u32> {
        match self.get(self.canonical(id)) {
            TypeKind::Integral { width, .. } => Some(*width),
            TypeKind::PackedStruct { width, .. } => Some(*width),
            TypeKind::Enum { base, .. } => self.bit_width(*base),
            _ => None,
        }
    }

    pub fn is_integral(&self, id: TypeId) -> bool {
        self.bit_width(id).is_some()
    }

    pub fn is_signed(&self, id: TypeId) -> bool {
        match self.get(self.canonical(id)) {
            TypeKind::Integral { signed, .. } => *signed,
            TypeKind::PackedStruct { signed, .. } => *signed,
            TypeKind::Enum { base, .. } => self.is_signed(*base),
            _ => false,
        }
    }

    pub fn is_four_state(&self, id: TypeId) -> bool {
        match self.get(self.canonical(id)) {
            TypeKind::Integral { four_state, .. } => *four_state,
            TypeKind::PackedStruct { four_state, .. } => *four_state,
            TypeKind::Enum { base, .. } => self.is_four_state(*base),
            _ => false,
        }
    }

    pub fn is_real(&self, id: TypeId) -> bool {
        matches!(
            self.get(self.canonical(id)),
            TypeKind::Real | TypeKind::ShortReal
        )
    }

    pub fn is_numeric(&self, id: TypeId) -> bool {
        self.is_integral(id) || self.is_real(id)
    }

    pub fn is_string(&self, id: TypeId) -> bool {
        matches!(self.get(self.canonical(id)), TypeKind::Str)
    }

    /// Struct member list when the canonical type is a packed struct.
    pub fn struct_members(&self, id: TypeId) -> Option<&[(NameId, TypeId)]> {
        match self.get(self.canonical(id)) {
            TypeKind::PackedStruct { members, .. } => Some(members),
            _ => None,
        }
    }

    /// Human-readable type name for diagnostics
    pub fn name(&self, id: TypeId, interner: &Interner) -> String {
        match self.get(id) {
            TypeKind::Integral {
                width,
                signed,
                four_state,
            } => {
                match (width, signed, four_state) {
                    (1, false, false) => return "bit".into(),
                    (1, false, true) => return "logic".into(),
                    (8, true, false) => return "byte".into(),
                    (16, true, false) => return "shortint".into(),
                    (32, true, false) => return "int".into(),
                    (64, true, false) => return "longint".into(),
                    (32, true, true) => return "integer".into(),
                    (64, false, true) => return "time".into(),
                    _ => {}
                }
                let base = if *four_state { "logic" } else { "bit" };
                let sign = if *signed { " signed" } else { "" };
                format!("{}{}[{}:0]", base, sign, width - 1)
            }
            TypeKind::Real => "real".into(),
            TypeKind::ShortReal => "shortreal".into(),
            TypeKind::Str => "string".into(),
            TypeKind::Chandle => "chandle".into(),
            TypeKind::Event => "event".into(),
            TypeKind::Void => "void".into(),
            TypeKind::Null => "null".into(),
            TypeKind::Unbounded => "$".into(),
            TypeKind::Enum { base, .. } => format!("enum {}", self.name(*base, interner)),
            TypeKind::PackedStruct { members, .. } => {
                let mut out = String::from("struct packed {");
                for (i, (name, ty)) in members.iter().enumerate() {
                    if i > 0 {
                        out.push(';');
                    }
                    out.push_str(&format!(
                        " {} {}",
                        self.name(*ty, interner),
                        interner.resolve(*name)
                    ));
                }
                out.push_str(" }");
                out
            }
            TypeKind::UnpackedArray { elem, left, right } => {
                format!("{}$[{}:{}]", self.name(*elem, interner), left, right)
            }
            TypeKind::DynamicArray { elem } => format!("{}$[]", self.name(*elem, interner)),
            TypeKind::Queue { elem } => format!("{}$[$]", self.name(*elem, interner)),
            TypeKind::Associative { elem, index } => format!(
                "{}$[{}]",
                self.name(*elem, interner),
                self.name(*index, interner)
            ),
            TypeKind::Alias { name, .. } => interner.resolve(*name).to_string(),
            TypeKind::Error => "<error>".into(),
        }
    }
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_canonical() {
        let mut arena = TypeArena::new();
        let int_again = arena.integral(32, IntegralFlags::new(true, false));
        assert_eq!(int_again, arena.builtins.int);

        let logic4 = arena.integral(4, IntegralFlags::new(false, true));
        let logic4_again = arena.integral(4, IntegralFlags::new(false, true));
        assert_eq!(logic4, logic4_again);

        let bit4 = arena.integral(4, IntegralFlags::new(false, false));
        assert_ne!(logic4, bit4);
    }

    #[test]
    fn error_is_index_zero() {
        let arena = TypeArena::new();
        assert!(arena.is_error(arena.builtins.error));
        assert!(!arena.is_error(arena.builtins.int));
    }

    #[test]
    fn enums_are_nominal() {
        let mut arena = TypeArena::new();
        let base = arena.builtins.int;
        let a = arena.make_enum(base);
        let b = arena.make_enum(base);
        assert_ne!(a, b);
    }

    #[test]
    fn packed_structs_canonicalize_by_members() {
        let mut arena = TypeArena::new();
        let logic8 = arena.integral(8, IntegralFlags::new(false, true));
        let name = NameId(0);
        let a = arena.intern(TypeKind::PackedStruct {
            members: vec![(name, logic8)],
            width: 8,
            signed: false,
            four_state: true,
        });
        let b = arena.intern(TypeKind::PackedStruct {
            members: vec![(name, logic8)],
            width: 8,
            signed: false,
            four_state: true,
        });
        assert_eq!(a, b);
    }

    #[test]
    fn alias_resolves_to_canonical() {
        let mut arena = TypeArena::new();
        let target = arena.builtins.int;
        let alias = arena.intern(TypeKind::Alias {
            name: NameId(7),
            target,
        });
        assert_eq!(arena.canonical(alias), target);
        assert_eq!(arena.bit_width(alias), Some(32));
        assert!(arena.is_signed(alias));
    }

    #[test]
    fn display_names() {
        let mut arena = TypeArena::new();
        let interner = Interner::new();
        assert_eq!(arena.name(arena.builtins.int, &interner), "int");
        assert_eq!(arena.name(arena.builtins.logic, &interner), "logic");
        let logic4 = arena.integral(4, IntegralFlags::new(false, true));
        assert_eq!(arena.name(logic4, &interner), "logic[3:0]");
        let sbit8 = arena.integral(8, IntegralFlags::new(true, false));
        assert_eq!(arena.name(sbit8, &interner), "byte");
    }
}
