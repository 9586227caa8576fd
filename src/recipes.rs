//! Recipe catalog: built-in common methods per brewer plus user-authored
//! custom recipes scoped to an equipment id.

use crate::equipment::EquipmentCatalog;
use crate::storage::{SessionStorage, KEY_CUSTOM_METHODS};
use crate::types::{AnimationType, BrewingParams, Recipe, Stage, ValveStatus};
use chrono::Utc;
use log::{info, warn};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("方案名称不能为空")]
    EmptyName,
    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Entry in the merged recipe list shown to the user.
#[derive(Debug, Clone)]
pub enum RecipeListEntry {
    Custom(Recipe),
    Divider,
    Common(Recipe),
}

type CustomMethodMap = HashMap<String, Vec<Recipe>>;

/// Built-in recipes for an equipment id. Custom equipment resolves to the
/// recipe set of its declared base animation type; espresso and custom
/// presets have no common recipes.
pub fn get_common(catalog: &EquipmentCatalog, equipment_id: &str) -> Vec<Recipe> {
    match catalog.animation_type(equipment_id) {
        AnimationType::V60 => v60_methods(),
        AnimationType::Kalita => kalita_methods(),
        AnimationType::Origami => origami_methods(),
        AnimationType::Clever => clever_methods(),
        AnimationType::Espresso | AnimationType::Custom => Vec::new(),
    }
}

/// User-authored recipes scoped to the equipment id. Empty if none saved.
pub fn get_custom(storage: &SessionStorage, equipment_id: &str) -> Vec<Recipe> {
    let map: CustomMethodMap = storage.load_json(KEY_CUSTOM_METHODS);
    map.get(equipment_id).cloned().unwrap_or_default()
}

/// Insert or update-by-id a custom recipe. The whole per-equipment collection
/// is rewritten on every save.
pub fn save(
    storage: &mut SessionStorage,
    mut recipe: Recipe,
    equipment_id: &str,
    existing: Option<&Recipe>,
) -> Result<Recipe, CatalogError> {
    if recipe.name.trim().is_empty() {
        return Err(CatalogError::EmptyName);
    }

    recipe.timestamp = Some(Utc::now().timestamp_millis());
    if recipe.id.is_none() {
        recipe.id = existing
            .and_then(|e| e.id.clone())
            .or_else(|| Some(Uuid::new_v4().to_string()));
    }

    let mut map: CustomMethodMap = storage.load_json(KEY_CUSTOM_METHODS);
    let list = map.entry(equipment_id.to_string()).or_default();

    match list.iter_mut().find(|r| r.id == recipe.id) {
        Some(slot) => {
            *slot = recipe.clone();
            info!("Updated custom recipe {} for {}", recipe.name, equipment_id);
        }
        None => {
            list.push(recipe.clone());
            info!("Saved custom recipe {} for {}", recipe.name, equipment_id);
        }
    }

    storage.save_json(KEY_CUSTOM_METHODS, &map)?;
    Ok(recipe)
}

/// Remove a custom recipe by id; no-op if not found.
pub fn delete(storage: &mut SessionStorage, recipe: &Recipe, equipment_id: &str) -> Result<(), CatalogError> {
    let mut map: CustomMethodMap = storage.load_json(KEY_CUSTOM_METHODS);
    let Some(list) = map.get_mut(equipment_id) else {
        warn!("No custom recipes for {}, nothing to delete", equipment_id);
        return Ok(());
    };

    let before = list.len();
    list.retain(|r| r.id != recipe.id || recipe.id.is_none());
    if list.len() == before {
        warn!("Recipe {:?} not found for {}, nothing deleted", recipe.id, equipment_id);
        return Ok(());
    }

    storage.save_json(KEY_CUSTOM_METHODS, &map)?;
    info!("Deleted custom recipe {} for {}", recipe.name, equipment_id);
    Ok(())
}

/// Merged view for the method list: custom recipes first, then a divider,
/// then common recipes. Custom presets and espresso show custom recipes only.
pub fn merged_view(
    catalog: &EquipmentCatalog,
    storage: &SessionStorage,
    equipment_id: &str,
) -> Vec<RecipeListEntry> {
    let custom = get_custom(storage, equipment_id);
    let animation = catalog.animation_type(equipment_id);

    let mut entries: Vec<RecipeListEntry> = custom.into_iter().map(RecipeListEntry::Custom).collect();

    if matches!(animation, AnimationType::Custom | AnimationType::Espresso) {
        return entries;
    }

    let common = get_common(catalog, equipment_id);
    if !entries.is_empty() && !common.is_empty() {
        entries.push(RecipeListEntry::Divider);
    }
    entries.extend(common.into_iter().map(RecipeListEntry::Common));
    entries
}

// === BUILT-IN METHODS ===

fn stage(
    time: u32,
    label: &str,
    water: &str,
    detail: &str,
    pour_time: Option<u32>,
    pour_type: &str,
) -> Stage {
    Stage {
        time,
        label: label.to_string(),
        water: water.to_string(),
        detail: detail.to_string(),
        pour_time,
        pour_type: pour_type.to_string(),
        valve_status: None,
    }
}

fn method(name: &str, coffee: &str, water: &str, ratio: &str, grind_size: &str, temp: &str, stages: Vec<Stage>) -> Recipe {
    Recipe {
        id: None,
        name: name.to_string(),
        params: BrewingParams {
            coffee: coffee.to_string(),
            water: water.to_string(),
            ratio: ratio.to_string(),
            grind_size: grind_size.to_string(),
            temp: temp.to_string(),
            stages,
        },
        timestamp: None,
    }
}

fn v60_methods() -> Vec<Recipe> {
    vec![
        method(
            "三段式(兼容性强)",
            "15g",
            "225g",
            "1:15",
            "中细",
            "92°C",
            vec![
                stage(25, "焖蒸(绕圈注水)", "30g", "中心向外绕圈，均匀浸润粉层", Some(10), "circle"),
                stage(120, "绕圈注水", "140g", "保持匀速，中心向外绕圈", Some(65), "circle"),
                stage(145, "中心注水", "225g", "中心定点注水，控制流速", Some(20), "center"),
            ],
        ),
        method(
            "一刀流(新手友好)",
            "15g",
            "225g",
            "1:15",
            "中细",
            "92°C",
            vec![
                stage(30, "焖蒸(绕圈注水)", "30g", "中心向外绕圈，均匀浸润粉层", Some(10), "circle"),
                stage(120, "绕圈注水", "225g", "一次性缓慢注满到目标水量", Some(60), "circle"),
            ],
        ),
    ]
}

fn kalita_methods() -> Vec<Recipe> {
    vec![method(
        "平底三段式",
        "16g",
        "240g",
        "1:15",
        "中细",
        "91°C",
        vec![
            stage(30, "焖蒸", "40g", "均匀浸润粉层", Some(10), "circle"),
            stage(90, "第一段注水", "140g", "小水流绕圈", Some(30), "circle"),
            stage(150, "第二段注水", "240g", "小水流绕圈注满", Some(30), "circle"),
        ],
    )]
}

fn origami_methods() -> Vec<Recipe> {
    vec![method(
        "折纸快冲",
        "15g",
        "225g",
        "1:15",
        "中细",
        "93°C",
        vec![
            stage(25, "焖蒸", "30g", "均匀浸润粉层", Some(10), "circle"),
            stage(110, "绕圈注水", "225g", "大水流快速注满", Some(45), "circle"),
        ],
    )]
}

fn clever_methods() -> Vec<Recipe> {
    vec![method(
        "聪明杯浸泡法",
        "20g",
        "300g",
        "1:15",
        "中粗",
        "90°C",
        vec![
            Stage {
                time: 30,
                label: "注水(关阀)".to_string(),
                water: "300g".to_string(),
                detail: "关闭阀门，一次性注满".to_string(),
                pour_time: Some(30),
                pour_type: "circle".to_string(),
                valve_status: Some(ValveStatus::Closed),
            },
            Stage {
                time: 120,
                label: "浸泡".to_string(),
                water: "300g".to_string(),
                detail: "保持阀门关闭，静置浸泡".to_string(),
                pour_time: Some(0),
                pour_type: "none".to_string(),
                valve_status: Some(ValveStatus::Closed),
            },
            Stage {
                time: 180,
                label: "开阀滤出".to_string(),
                water: "300g".to_string(),
                detail: "打开阀门，等待滤完".to_string(),
                pour_time: Some(0),
                pour_type: "none".to_string(),
                valve_status: Some(ValveStatus::Open),
            },
        ],
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_recipe(name: &str) -> Recipe {
        method(name, "15g", "225g", "1:15", "中细", "92°C", vec![
            stage(30, "焖蒸", "30g", "", Some(10), "circle"),
            stage(120, "注水", "225g", "", Some(60), "circle"),
        ])
    }

    #[test]
    fn test_common_methods_resolve_by_animation_type() {
        let catalog = EquipmentCatalog::new();
        assert!(!get_common(&catalog, "V60").is_empty());
        assert!(!get_common(&catalog, "CleverDripper").is_empty());
        assert!(get_common(&catalog, "Espresso").is_empty());
    }

    #[test]
    fn test_custom_equipment_inherits_base_recipes() {
        let mut catalog = EquipmentCatalog::new();
        catalog.set_custom(vec![crate::types::Equipment {
            id: "custom-1".to_string(),
            name: "我的滤杯".to_string(),
            description: String::new(),
            is_custom: true,
            animation_type: AnimationType::V60,
            has_valve: false,
        }]);
        assert_eq!(get_common(&catalog, "custom-1").len(), v60_methods().len());
    }

    #[test]
    fn test_save_rejects_empty_name() {
        let mut storage = SessionStorage::in_memory();
        let recipe = sample_recipe("   ");
        let result = save(&mut storage, recipe, "V60", None);
        assert!(matches!(result, Err(CatalogError::EmptyName)));
    }

    #[test]
    fn test_save_assigns_id_and_persists() {
        let mut storage = SessionStorage::in_memory();
        let saved = save(&mut storage, sample_recipe("我的方案"), "V60", None).unwrap();
        assert!(saved.id.is_some());
        assert!(saved.timestamp.is_some());

        let list = get_custom(&storage, "V60");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "我的方案");
    }

    #[test]
    fn test_save_updates_by_id() {
        let mut storage = SessionStorage::in_memory();
        let saved = save(&mut storage, sample_recipe("原名"), "V60", None).unwrap();

        let mut edited = saved.clone();
        edited.name = "改名".to_string();
        save(&mut storage, edited, "V60", Some(&saved)).unwrap();

        let list = get_custom(&storage, "V60");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "改名");
    }

    #[test]
    fn test_delete_is_noop_when_missing() {
        let mut storage = SessionStorage::in_memory();
        let saved = save(&mut storage, sample_recipe("留着"), "V60", None).unwrap();

        let ghost = sample_recipe("不存在");
        delete(&mut storage, &ghost, "V60").unwrap();
        assert_eq!(get_custom(&storage, "V60").len(), 1);

        delete(&mut storage, &saved, "V60").unwrap();
        assert!(get_custom(&storage, "V60").is_empty());
    }

    #[test]
    fn test_merged_view_orders_custom_divider_common() {
        let catalog = EquipmentCatalog::new();
        let mut storage = SessionStorage::in_memory();
        save(&mut storage, sample_recipe("我的方案"), "V60", None).unwrap();

        let entries = merged_view(&catalog, &storage, "V60");
        assert!(matches!(entries[0], RecipeListEntry::Custom(_)));
        assert!(matches!(entries[1], RecipeListEntry::Divider));
        assert!(matches!(entries[2], RecipeListEntry::Common(_)));
    }

    #[test]
    fn test_merged_view_espresso_shows_custom_only() {
        let catalog = EquipmentCatalog::new();
        let mut storage = SessionStorage::in_memory();
        save(&mut storage, sample_recipe("浓缩方案"), "Espresso", None).unwrap();

        let entries = merged_view(&catalog, &storage, "Espresso");
        assert_eq!(entries.len(), 1);
        assert!(matches!(entries[0], RecipeListEntry::Custom(_)));
    }
}
