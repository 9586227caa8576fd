//! Equipment catalog: built-in brewers plus user-defined custom equipment.
//! Pure lookup; custom equipment is authored elsewhere and loaded at session
//! start.

use crate::types::{AnimationType, Equipment};
use log::debug;

pub struct EquipmentCatalog {
    builtins: Vec<Equipment>,
    custom: Vec<Equipment>,
}

impl EquipmentCatalog {
    pub fn new() -> Self {
        Self {
            builtins: builtin_equipments(),
            custom: Vec::new(),
        }
    }

    pub fn with_custom(custom: Vec<Equipment>) -> Self {
        Self {
            builtins: builtin_equipments(),
            custom,
        }
    }

    pub fn set_custom(&mut self, custom: Vec<Equipment>) {
        self.custom = custom;
    }

    pub fn builtins(&self) -> &[Equipment] {
        &self.builtins
    }

    pub fn custom(&self) -> &[Equipment] {
        &self.custom
    }

    /// Resolve an equipment id to its display name. Builtins win, then custom
    /// equipment; an unknown id degrades to the raw id string so display never
    /// blocks on a missing record.
    pub fn resolve_name(&self, id: &str) -> String {
        if let Some(eq) = self.builtins.iter().find(|e| e.id == id) {
            return eq.name.clone();
        }
        if let Some(eq) = self.custom.iter().find(|e| e.id == id) {
            return eq.name.clone();
        }
        debug!("Unknown equipment id {}, falling back to raw id", id);
        id.to_string()
    }

    /// Reverse lookup from display name to id, used by equipment selection.
    pub fn resolve_id(&self, name: &str) -> Option<String> {
        self.builtins
            .iter()
            .chain(self.custom.iter())
            .find(|e| e.name == name)
            .map(|e| e.id.clone())
    }

    pub fn find(&self, id: &str) -> Option<&Equipment> {
        self.builtins
            .iter()
            .chain(self.custom.iter())
            .find(|e| e.id == id)
    }

    /// Animation type declared for an equipment id. Unknown ids behave like a
    /// custom preset so no common recipes are offered for them.
    pub fn animation_type(&self, id: &str) -> AnimationType {
        self.find(id)
            .map(|e| e.animation_type)
            .unwrap_or(AnimationType::Custom)
    }
}

impl Default for EquipmentCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin(id: &str, name: &str, description: &str, animation_type: AnimationType, has_valve: bool) -> Equipment {
    Equipment {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        is_custom: false,
        animation_type,
        has_valve,
    }
}

pub fn builtin_equipments() -> Vec<Equipment> {
    vec![
        builtin("V60", "V60", "锥形滤杯，流速快，风味层次分明", AnimationType::V60, false),
        builtin("CleverDripper", "聪明杯", "带阀门的浸泡式滤杯，容错性高", AnimationType::Clever, true),
        builtin("Kalita", "蛋糕滤杯", "平底滤杯，萃取均匀", AnimationType::Kalita, false),
        builtin("Origami", "折纸滤杯", "兼容锥形与蛋糕滤纸", AnimationType::Origami, false),
        builtin("Espresso", "意式咖啡机", "高压萃取浓缩咖啡", AnimationType::Espresso, false),
    ]
}
