//! Display-only projection of the session state for the parameter bar.

use crate::equipment::EquipmentCatalog;
use crate::types::{BrewStep, EditableParams, ParameterInfo, Recipe};

/// Project the current step, equipment and recipe into the parameter-bar
/// snapshot. Pure; publication happens on the session event bus after the
/// mutation that triggered it has committed.
pub fn snapshot(
    step: BrewStep,
    equipment_id: Option<&str>,
    recipe: Option<&Recipe>,
    catalog: &EquipmentCatalog,
) -> ParameterInfo {
    let equipment = equipment_id.map(|id| catalog.resolve_name(id));

    match step {
        // nothing chosen yet, conceptually
        BrewStep::CoffeeBean => ParameterInfo::empty(),
        // recipe not locked in for display purposes
        BrewStep::Method => ParameterInfo {
            equipment,
            method: None,
            params: None,
        },
        BrewStep::Brewing | BrewStep::Notes => match recipe {
            Some(recipe) => ParameterInfo {
                equipment,
                method: Some(recipe.name.clone()),
                params: Some(EditableParams::from(&recipe.params)),
            },
            None => ParameterInfo {
                equipment,
                method: None,
                params: None,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BrewingParams;

    fn recipe() -> Recipe {
        Recipe {
            id: None,
            name: "三段式".to_string(),
            params: BrewingParams {
                coffee: "15g".to_string(),
                water: "225g".to_string(),
                ratio: "1:15".to_string(),
                grind_size: "中细".to_string(),
                temp: "92°C".to_string(),
                stages: Vec::new(),
            },
            timestamp: None,
        }
    }

    #[test]
    fn test_coffee_bean_step_is_empty() {
        let catalog = EquipmentCatalog::new();
        let info = snapshot(BrewStep::CoffeeBean, Some("V60"), Some(&recipe()), &catalog);
        assert_eq!(info, ParameterInfo::empty());
    }

    #[test]
    fn test_method_step_shows_equipment_only() {
        let catalog = EquipmentCatalog::new();
        let info = snapshot(BrewStep::Method, Some("V60"), Some(&recipe()), &catalog);
        assert_eq!(info.equipment, Some("V60".to_string()));
        assert_eq!(info.method, None);
        assert_eq!(info.params, None);
    }

    #[test]
    fn test_brewing_step_shows_full_params() {
        let catalog = EquipmentCatalog::new();
        let info = snapshot(BrewStep::Brewing, Some("CleverDripper"), Some(&recipe()), &catalog);
        assert_eq!(info.equipment, Some("聪明杯".to_string()));
        assert_eq!(info.method, Some("三段式".to_string()));
        assert_eq!(info.params.unwrap().ratio, "1:15");
    }

    #[test]
    fn test_brewing_step_without_recipe_degrades_to_equipment() {
        let catalog = EquipmentCatalog::new();
        let info = snapshot(BrewStep::Notes, Some("V60"), None, &catalog);
        assert_eq!(info.equipment, Some("V60".to_string()));
        assert_eq!(info.method, None);
        assert_eq!(info.params, None);
    }
}
