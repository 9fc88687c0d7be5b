// src/sema/serialize.rs
//! JSON serialization of the elaborated design, for tests and tooling.

use serde_json::{json, Value};

use crate::sema::compilation::Compilation;
use crate::sema::symbol::{SymbolId, SymbolKind};

impl Compilation {
    /// Serialize the elaborated design tree. Forces elaboration.
    pub fn serialize_design(&mut self) -> Value {
        let root = self.get_root();
        self.serialize_symbol(root)
    }

    fn serialize_symbol(&mut self, id: SymbolId) -> Value {
        let symbol = self.symbol(id);
        let name = self.interner.resolve(symbol.name).to_string();
        let kind = symbol.kind_name().to_string();
        let mut out = json!({
            "name": name,
            "kind": kind,
        });

        let obj = out.as_object_mut().unwrap();
        match self.symbol(id).kind.clone() {
            SymbolKind::Parameter {
                ty,
                value,
                is_local,
                ..
            } => {
                obj.insert(
                    "type".into(),
                    Value::String(self.types.name(ty, &self.interner)),
                );
                obj.insert("value".into(), Value::String(value.to_string()));
                obj.insert("local".into(), Value::Bool(is_local));
            }
            SymbolKind::Variable { ty, .. }
            | SymbolKind::Net { ty, .. }
            | SymbolKind::FormalArg { ty, .. }
            | SymbolKind::EnumValue { ty, .. } => {
                obj.insert(
                    "type".into(),
                    Value::String(self.types.name(ty, &self.interner)),
                );
            }
            SymbolKind::Port { ty, direction, .. } => {
                obj.insert(
                    "type".into(),
                    Value::String(self.types.name(ty, &self.interner)),
                );
                obj.insert(
                    "direction".into(),
                    Value::String(direction.as_str().to_string()),
                );
            }
            SymbolKind::Instance { definition, .. } => {
                let def_name = self.definition(definition).name;
                obj.insert(
                    "module".into(),
                    Value::String(self.interner.resolve(def_name).to_string()),
                );
            }
            SymbolKind::TypeAlias { target } => {
                let canonical = self.types.canonical(target);
                obj.insert(
                    "target".into(),
                    Value::String(self.types.name(canonical, &self.interner)),
                );
            }
            SymbolKind::Subroutine { return_type, .. } => {
                obj.insert(
                    "returns".into(),
                    Value::String(self.types.name(return_type, &self.interner)),
                );
            }
            _ => {}
        }

        if let Some(scope) = self.symbol(id).owned_scope() {
            self.ensure_members(scope);
            let members = self.scope(scope).members.clone();
            let serialized: Vec<Value> = members
                .into_iter()
                .map(|m| self.serialize_symbol(m))
                .collect();
            if !serialized.is_empty() {
                out.as_object_mut()
                    .unwrap()
                    .insert("members".into(), Value::Array(serialized));
            }
        }
        out
    }
}
