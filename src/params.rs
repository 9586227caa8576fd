//! Pure brewing-parameter derivation. Editing one scalar recomputes its
//! dependents and proportionally rescales the working recipe's pour stages.
//!
//! Rescaling is always relative to the recipe's *current* (already rounded)
//! water values, so repeated edits compound rounding gram-by-gram. That
//! mirrors the product behavior and is kept deliberately.

use crate::types::{EditableParams, Recipe};

/// First numeric substring of `s`, or 0 if absent.
pub fn extract_number(s: &str) -> f64 {
    let Some(start) = s.find(|c: char| c.is_ascii_digit() || c == '.') else {
        return 0.0;
    };
    let rest = &s[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(rest.len());
    rest[..end].parse().unwrap_or(0.0)
}

/// Parse the `<N>` of a `"1:<N>"` ratio string, or 0 if absent.
pub fn extract_ratio(s: &str) -> f64 {
    match s.find(':') {
        Some(pos) => extract_number(&s[pos + 1..]),
        None => 0.0,
    }
}

/// Integers render without decimals, everything else to one decimal place.
pub fn format_number(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{:.1}", value)
    }
}

fn format_grams(value: f64) -> String {
    format!("{}g", value.round() as i64)
}

/// Rescale every stage's water by `scale`, rounding to the nearest gram.
fn rescale_stages(recipe: &mut Recipe, scale: f64) {
    for stage in &mut recipe.params.stages {
        let water = extract_number(&stage.water);
        stage.water = format_grams(water * scale);
    }
}

fn apply_water_change(params: &EditableParams, recipe: &Recipe, new_water: f64) -> (EditableParams, Recipe) {
    let mut recipe = recipe.clone();
    let old_water = extract_number(&recipe.params.water);
    if old_water > 0.0 {
        rescale_stages(&mut recipe, new_water / old_water);
    }
    recipe.params.water = format_grams(new_water);

    let mut params = params.clone();
    params.water = recipe.params.water.clone();
    (params, recipe)
}

/// Recompute water from a new coffee mass at the current ratio and rescale
/// stages. Invalid input (non-finite or <= 0) is a no-op, signalled as `None`.
pub fn on_coffee_change(
    new_coffee: f64,
    params: &EditableParams,
    recipe: &Recipe,
) -> Option<(EditableParams, Recipe)> {
    if !new_coffee.is_finite() || new_coffee <= 0.0 {
        return None;
    }
    let ratio = extract_ratio(&params.ratio);
    if ratio <= 0.0 {
        return None;
    }

    let new_water = (new_coffee * ratio).round();
    let (mut params, mut recipe) = apply_water_change(params, recipe, new_water);
    let coffee_str = format!("{}g", format_number(new_coffee));
    params.coffee = coffee_str.clone();
    recipe.params.coffee = coffee_str;
    Some((params, recipe))
}

/// Recompute water from a new ratio at the current coffee mass and rescale
/// stages. Invalid input is a no-op.
pub fn on_ratio_change(
    new_ratio: f64,
    params: &EditableParams,
    recipe: &Recipe,
) -> Option<(EditableParams, Recipe)> {
    if !new_ratio.is_finite() || new_ratio <= 0.0 {
        return None;
    }
    let coffee = extract_number(&params.coffee);
    if coffee <= 0.0 {
        return None;
    }

    let new_water = (coffee * new_ratio).round();
    let (mut params, mut recipe) = apply_water_change(params, recipe, new_water);
    let ratio_str = format!("1:{}", format_number(new_ratio));
    params.ratio = ratio_str.clone();
    recipe.params.ratio = ratio_str;
    Some((params, recipe))
}

/// Pass-through scalar replacement, no stage rescaling.
pub fn on_grind_size_change(
    value: &str,
    params: &EditableParams,
    recipe: &Recipe,
) -> (EditableParams, Recipe) {
    let mut params = params.clone();
    let mut recipe = recipe.clone();
    params.grind_size = value.to_string();
    recipe.params.grind_size = value.to_string();
    (params, recipe)
}

/// Pass-through scalar replacement; appends the °C suffix when omitted.
pub fn on_temp_change(
    value: &str,
    params: &EditableParams,
    recipe: &Recipe,
) -> (EditableParams, Recipe) {
    let temp = if value.contains("°C") {
        value.to_string()
    } else {
        format!("{}°C", value)
    };
    let mut params = params.clone();
    let mut recipe = recipe.clone();
    params.temp = temp.clone();
    recipe.params.temp = temp;
    (params, recipe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BrewingParams, Stage};

    fn stage(time: u32, water: &str, pour_time: Option<u32>) -> Stage {
        Stage {
            time,
            label: "注水".to_string(),
            water: water.to_string(),
            detail: String::new(),
            pour_time,
            pour_type: "circle".to_string(),
            valve_status: None,
        }
    }

    fn recipe(coffee: &str, water: &str, ratio: &str, stages: Vec<Stage>) -> Recipe {
        Recipe {
            id: None,
            name: "测试方案".to_string(),
            params: BrewingParams {
                coffee: coffee.to_string(),
                water: water.to_string(),
                ratio: ratio.to_string(),
                grind_size: "中细".to_string(),
                temp: "92°C".to_string(),
                stages,
            },
            timestamp: None,
        }
    }

    fn editable(recipe: &Recipe) -> EditableParams {
        EditableParams::from(&recipe.params)
    }

    #[test]
    fn test_extract_number() {
        assert_eq!(extract_number("15g"), 15.0);
        assert_eq!(extract_number("约 92.5°C"), 92.5);
        assert_eq!(extract_number("中细"), 0.0);
        assert_eq!(extract_number(""), 0.0);
    }

    #[test]
    fn test_extract_ratio() {
        assert_eq!(extract_ratio("1:15"), 15.0);
        assert_eq!(extract_ratio("1:16.5"), 16.5);
        assert_eq!(extract_ratio("15"), 0.0);
    }

    #[test]
    fn test_format_number_strips_trailing_zero() {
        assert_eq!(format_number(15.0), "15");
        assert_eq!(format_number(16.5), "16.5");
    }

    #[test]
    fn test_coffee_change_recomputes_water_and_stages() {
        let r = recipe(
            "15g",
            "225g",
            "1:15",
            vec![stage(25, "30g", Some(10)), stage(120, "225g", Some(65))],
        );
        let (p, r2) = on_coffee_change(20.0, &editable(&r), &r).unwrap();

        assert_eq!(p.coffee, "20g");
        assert_eq!(p.water, "300g");
        assert_eq!(p.ratio, "1:15");
        assert_eq!(r2.params.stages[0].water, "40g");
        assert_eq!(r2.params.stages[1].water, "300g");
    }

    #[test]
    fn test_coffee_change_round_trip_within_a_gram() {
        let r = recipe(
            "15g",
            "225g",
            "1:15",
            vec![stage(25, "30g", Some(10)), stage(120, "225g", Some(65))],
        );
        let (p1, r1) = on_coffee_change(17.0, &editable(&r), &r).unwrap();
        let (p2, r2) = on_coffee_change(15.0, &p1, &r1).unwrap();

        assert!((extract_number(&p2.water) - 225.0).abs() <= 1.0);
        for (orig, back) in r.params.stages.iter().zip(r2.params.stages.iter()) {
            assert!((extract_number(&orig.water) - extract_number(&back.water)).abs() <= 1.0);
        }
    }

    #[test]
    fn test_ratio_change_is_exact_against_coffee() {
        let r = recipe("15g", "225g", "1:15", vec![stage(120, "225g", Some(60))]);
        let (p, r2) = on_ratio_change(16.5, &editable(&r), &r).unwrap();

        assert_eq!(extract_number(&p.water), (15.0f64 * 16.5).round());
        assert_eq!(p.ratio, "1:16.5");
        // stage scaled from the recipe's prior total, not the original default
        assert_eq!(r2.params.stages[0].water, p.water);
    }

    #[test]
    fn test_invalid_input_is_noop() {
        let r = recipe("15g", "225g", "1:15", vec![stage(120, "225g", Some(60))]);
        assert!(on_coffee_change(0.0, &editable(&r), &r).is_none());
        assert!(on_coffee_change(-3.0, &editable(&r), &r).is_none());
        assert!(on_coffee_change(f64::NAN, &editable(&r), &r).is_none());
        assert!(on_ratio_change(0.0, &editable(&r), &r).is_none());
    }

    #[test]
    fn test_temp_change_appends_suffix_once() {
        let r = recipe("15g", "225g", "1:15", vec![stage(120, "225g", Some(60))]);
        let (p, _) = on_temp_change("88", &editable(&r), &r);
        assert_eq!(p.temp, "88°C");
        let (p, _) = on_temp_change("88°C", &editable(&r), &r);
        assert_eq!(p.temp, "88°C");
    }

    #[test]
    fn test_grind_size_change_leaves_stages_alone() {
        let r = recipe("15g", "225g", "1:15", vec![stage(120, "225g", Some(60))]);
        let (p, r2) = on_grind_size_change("粗", &editable(&r), &r);
        assert_eq!(p.grind_size, "粗");
        assert_eq!(r2.params.stages[0].water, "225g");
    }
}
