//! Best-effort coercion of extracted payloads into the allowed vocabulary.
//!
//! Nothing here fails: values that cannot be interpreted fall back to a
//! default (`0` for numbers, `Amount` for units) so that the structural
//! validator only ever sees shapes it can judge.

use serde_json::{Map, Value};

use crate::config::RangePolicy;
use crate::model::{Difficulty, MetricUnit, NutritionalValues, VariantCategory};

/// Informal units that all mean "a countable amount".
const UNIT_ALIASES: [(&str, MetricUnit); 8] = [
    ("piece", MetricUnit::Amount),
    ("pieces", MetricUnit::Amount),
    ("sprig", MetricUnit::Amount),
    ("sprigs", MetricUnit::Amount),
    ("clove", MetricUnit::Amount),
    ("cloves", MetricUnit::Amount),
    ("pinch", MetricUnit::Amount),
    ("pinches", MetricUnit::Amount),
];

/// Keys tried, in order, when a shopping list entry is an object.
const SHOPPING_NAME_KEYS: [&str; 5] = ["Ingredient", "ingredient", "en", "name", "item"];

/// Resolve any unit string into the closed enumeration.
pub fn canonical_unit(raw: &str) -> MetricUnit {
    if let Some(unit) = MetricUnit::from_label(raw) {
        return unit;
    }
    let key = raw.trim().to_lowercase();
    if let Some((_, unit)) = UNIT_ALIASES.iter().find(|(alias, _)| *alias == key) {
        return *unit;
    }
    MetricUnit::from_label_ignore_case(&key).unwrap_or(MetricUnit::Amount)
}

fn unit_value(raw: Option<&Value>) -> Value {
    let unit = match raw {
        Some(Value::String(s)) => canonical_unit(s),
        _ => MetricUnit::Amount,
    };
    Value::String(unit.as_str().to_string())
}

/// Split "250-300" style ranges; a leading minus is a sign, not a separator.
fn split_range(text: &str) -> Option<(&str, &str)> {
    let body = text.strip_prefix('-').unwrap_or(text);
    let offset = text.len() - body.len();
    ['-', '–']
        .iter()
        .find_map(|sep| body.find(*sep).map(|pos| (pos, sep.len_utf8())))
        .map(|(pos, width)| {
            let split = offset + pos;
            (&text[..split], &text[split + width..])
        })
}

fn parse_number(text: &str, policy: RangePolicy) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some((low, high)) = split_range(text) {
        if !low.trim().is_empty() {
            let low = parse_fraction(low);
            let high = parse_fraction(high);
            return match policy {
                RangePolicy::Lower => low,
                RangePolicy::Upper => high.or(low),
                RangePolicy::Midpoint => match (low, high) {
                    (Some(l), Some(h)) => Some((l + h) / 2.0),
                    (l, h) => l.or(h),
                },
            };
        }
    }
    parse_fraction(text)
}

/// Parses "2", "0.5", "1/2" and "1 1/2".
fn parse_fraction(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Ok(value) = text.parse::<f64>() {
        return value.is_finite().then_some(value);
    }

    let mut total = 0.0;
    let mut parts = 0;
    for part in text.split_whitespace() {
        let value = match part.split_once('/') {
            Some((num, den)) => {
                let num: f64 = num.parse().ok()?;
                let den: f64 = den.parse().ok()?;
                if den == 0.0 {
                    return None;
                }
                num / den
            }
            None => part.parse().ok()?,
        };
        total += value;
        parts += 1;
    }
    (parts > 0 && total.is_finite()).then_some(total)
}

/// Collapse a nutrition value to a non-negative integer.
///
/// Ranges resolve through `policy`, decimals are truncated and anything
/// unparsable becomes zero.
pub fn coerce_integer(value: &Value, policy: RangePolicy) -> u32 {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s, policy),
        _ => None,
    };
    match number {
        Some(n) if n > 0.0 => n.trunc().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

/// Step durations keep their sign so the quality check can report them.
pub fn coerce_duration(value: Option<&Value>) -> i64 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_number(s, RangePolicy::Lower),
        _ => None,
    };
    number.map(|n| n.trunc() as i64).unwrap_or(0)
}

/// Ingredient amounts are non-negative floats; unreadable amounts become zero.
pub fn coerce_amount(value: Option<&Value>) -> f64 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_number(s, RangePolicy::Lower),
        _ => None,
    };
    number.filter(|n| *n > 0.0).unwrap_or(0.0)
}

/// Coerce the eight nutrition fields to integers, filling missing ones with zero.
pub fn normalize_nutrition(values: &mut Map<String, Value>, policy: RangePolicy) {
    for field in NutritionalValues::FIELDS {
        let coerced = values
            .get(field)
            .map(|value| coerce_integer(value, policy))
            .unwrap_or(0);
        values.insert(field.to_string(), Value::from(coerced));
    }
}

/// Reduce a shopping list entry to a plain ingredient name.
pub fn shopping_list_entry(item: &Value) -> Option<String> {
    match item {
        Value::Object(map) => SHOPPING_NAME_KEYS.iter().find_map(|key| match map.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        }),
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn normalize_shopping_list(list: &mut Value) {
    if let Value::Array(items) = list {
        let normalized: Vec<Value> = items
            .iter()
            .filter_map(shopping_list_entry)
            .map(Value::String)
            .collect();
        *items = normalized;
    }
}

fn plain_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Render a countdown entry as `"<label> (<seconds>s)"`.
pub fn countdown_entry(item: &Value) -> String {
    match item {
        Value::Object(map) => {
            let label = ["Trigger", "trigger", "name", "Name"]
                .iter()
                .find_map(|key| map.get(*key).and_then(plain_text))
                .unwrap_or_else(|| "Timer".to_string());
            let duration = ["Duration", "duration"]
                .iter()
                .find_map(|key| map.get(*key).and_then(plain_text));
            match duration {
                Some(seconds) => format!("{label} ({seconds}s)"),
                None => label,
            }
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn canonical_label<T: Copy>(
    value: &mut Value,
    choices: &[T],
    label: fn(&T) -> &'static str,
    fallback: Option<T>,
) {
    let Value::String(raw) = value else {
        if let Some(fallback) = fallback {
            *value = Value::String(label(&fallback).to_string());
        }
        return;
    };
    let found = choices
        .iter()
        .find(|choice| label(choice).eq_ignore_ascii_case(raw.trim()))
        .copied()
        .or(fallback);
    if let Some(choice) = found {
        *raw = label(&choice).to_string();
    }
}

/// Normalize the raw metadata object produced by the metadata call.
pub fn normalize_metadata(mut metadata: Map<String, Value>, policy: RangePolicy) -> Map<String, Value> {
    if let Some(Value::Object(values)) = metadata.get_mut("nutritional_values") {
        normalize_nutrition(values, policy);
    }
    if let Some(list) = metadata.get_mut("shopping_list") {
        normalize_shopping_list(list);
    }
    metadata
}

/// Resolve units of a raw step object (`ingredients[].metric_unit`).
pub fn normalize_step_units(mut step: Map<String, Value>) -> Map<String, Value> {
    if let Some(Value::Array(ingredients)) = step.get_mut("ingredients") {
        for ingredient in ingredients.iter_mut() {
            if let Value::Object(fields) = ingredient {
                let unit = unit_value(fields.get("metric_unit"));
                fields.insert("metric_unit".to_string(), unit);
            }
        }
    }
    step
}

/// Normalize a full labelled recipe payload in place and return it.
///
/// Covers variant content (nutrition, shopping list, variant category,
/// difficulty) and every step (ingredient units and amounts, durations,
/// countdown entries).
pub fn normalize_recipe_payload(mut payload: Value, policy: RangePolicy) -> Value {
    if let Some(Value::Array(variants)) = payload.get_mut("Recipe Variant Content") {
        for variant in variants.iter_mut().filter_map(Value::as_object_mut) {
            if let Some(list) = variant.get_mut("Shopping List") {
                normalize_shopping_list(list);
            }
            if let Some(Value::Object(values)) = variant.get_mut("Nutritional Values") {
                normalize_nutrition(values, policy);
            }
            if let Some(category) = variant.get_mut("Recipe Variant") {
                canonical_label(
                    category,
                    &VariantCategory::ALL,
                    VariantCategory::as_str,
                    Some(VariantCategory::Other),
                );
            }
            if let Some(difficulty) = variant.get_mut("Difficulty") {
                canonical_label(difficulty, &Difficulty::ALL, Difficulty::as_str, None);
            }
        }
    }

    if let Some(Value::Array(steps)) = payload.get_mut("Steps Part 1") {
        for step in steps.iter_mut().filter_map(Value::as_object_mut) {
            normalize_step(step);
        }
    }

    payload
}

/// Collapse every run of whitespace, line breaks included, to a single space.
pub fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_step(step: &mut Map<String, Value>) {
    for field in ["Display Name", "Action", "Instructions"] {
        if let Some(Value::Object(locales)) = step.get_mut(field) {
            for text in locales.values_mut() {
                if let Value::String(s) = text {
                    if s.contains(|c: char| c == '\n' || c == '\r') {
                        *s = single_line(s);
                    }
                }
            }
        }
    }

    if let Some(Value::Array(ingredients)) = step.get_mut("Ingredient") {
        for ingredient in ingredients.iter_mut().filter_map(Value::as_object_mut) {
            let unit = unit_value(ingredient.get("Metric Unit"));
            ingredient.insert("Metric Unit".to_string(), unit);
            if !matches!(ingredient.get("Amount"), Some(Value::Number(n)) if n.as_f64().is_some_and(|a| a >= 0.0))
            {
                let amount = coerce_amount(ingredient.get("Amount"));
                ingredient.insert("Amount".to_string(), Value::from(amount));
            }
        }
    }

    if !matches!(step.get("Duration"), Some(Value::Number(n)) if n.is_i64()) {
        let duration = coerce_duration(step.get("Duration"));
        step.insert("Duration".to_string(), Value::from(duration));
    }

    if let Some(Value::Array(items)) = step.get_mut("Count Down") {
        let normalized: Vec<Value> = items
            .iter()
            .map(|item| Value::String(countdown_entry(item)))
            .collect();
        *items = normalized;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_units_pass_through() {
        for unit in MetricUnit::ALL {
            assert_eq!(canonical_unit(unit.as_str()), unit);
        }
    }

    #[test]
    fn test_unit_aliases_and_case() {
        assert_eq!(canonical_unit("cloves"), MetricUnit::Amount);
        assert_eq!(canonical_unit(" Pinch "), MetricUnit::Amount);
        assert_eq!(canonical_unit("gram"), MetricUnit::Gram);
        assert_eq!(canonical_unit("TEASPOON"), MetricUnit::Teaspoon);
    }

    #[test]
    fn test_unknown_unit_defaults_to_amount() {
        assert_eq!(canonical_unit("handful"), MetricUnit::Amount);
        assert_eq!(canonical_unit("g"), MetricUnit::Amount);
        assert_eq!(canonical_unit(""), MetricUnit::Amount);
    }

    #[test]
    fn test_coerce_integer_ranges_and_decimals() {
        let lower = RangePolicy::Lower;
        assert_eq!(coerce_integer(&json!("250-300"), lower), 250);
        assert_eq!(coerce_integer(&json!("250 - 300"), lower), 250);
        assert_eq!(coerce_integer(&json!("12.7"), lower), 12);
        assert_eq!(coerce_integer(&json!(12.7), lower), 12);
        assert_eq!(coerce_integer(&json!(40), lower), 40);
        assert_eq!(coerce_integer(&json!("lots"), lower), 0);
        assert_eq!(coerce_integer(&json!(null), lower), 0);
        assert_eq!(coerce_integer(&json!("-5"), lower), 0);
    }

    #[test]
    fn test_coerce_integer_range_policies() {
        assert_eq!(coerce_integer(&json!("250-300"), RangePolicy::Upper), 300);
        assert_eq!(coerce_integer(&json!("250-301"), RangePolicy::Midpoint), 275);
    }

    #[test]
    fn test_coerce_amount_fractions() {
        assert_eq!(coerce_amount(Some(&json!("1/2"))), 0.5);
        assert_eq!(coerce_amount(Some(&json!("1 1/2"))), 1.5);
        assert_eq!(coerce_amount(Some(&json!("to taste"))), 0.0);
        assert_eq!(coerce_amount(Some(&json!(-2))), 0.0);
        assert_eq!(coerce_amount(None), 0.0);
    }

    #[test]
    fn test_coerce_duration() {
        assert_eq!(coerce_duration(Some(&json!("10"))), 10);
        assert_eq!(coerce_duration(Some(&json!(7.9))), 7);
        assert_eq!(coerce_duration(Some(&json!(-3))), -3);
        assert_eq!(coerce_duration(None), 0);
    }

    #[test]
    fn test_normalize_metadata() {
        let metadata = json!({
            "generic_name_en": "Soup",
            "nutritional_values": {
                "Energie (kCal)": "250-300",
                "Protein (grams)": 15.6,
                "Carbohydrates (grams)": "n/a"
            },
            "shopping_list": ["leek", {"ingredient": "potato", "amount": 2}, 3]
        });
        let Value::Object(map) = metadata else { unreachable!() };
        let normalized = normalize_metadata(map, RangePolicy::Lower);

        let values = &normalized["nutritional_values"];
        assert_eq!(values["Energie (kCal)"], 250);
        assert_eq!(values["Protein (grams)"], 15);
        assert_eq!(values["Carbohydrates (grams)"], 0);
        assert_eq!(values["Fibers (grams)"], 0);
        assert_eq!(normalized["shopping_list"], json!(["leek", "potato", "3"]));
    }

    #[test]
    fn test_normalize_step_units() {
        let step = json!({
            "ingredients": [
                {"ingredient": "garlic", "amount": 2, "metric_unit": "cloves"},
                {"ingredient": "flour", "amount": 200, "metric_unit": "gram"},
                {"ingredient": "salt", "amount": 1}
            ]
        });
        let Value::Object(map) = step else { unreachable!() };
        let normalized = normalize_step_units(map);
        let units: Vec<&str> = normalized["ingredients"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["metric_unit"].as_str().unwrap())
            .collect();
        assert_eq!(units, vec!["Amount", "Gram", "Amount"]);
    }

    #[test]
    fn test_countdown_entries() {
        assert_eq!(
            countdown_entry(&json!({"Trigger": "Boil eggs", "Duration": 300})),
            "Boil eggs (300s)"
        );
        assert_eq!(countdown_entry(&json!({"duration": "60"})), "Timer (60s)");
        assert_eq!(countdown_entry(&json!({"name": "Rest"})), "Rest");
        assert_eq!(countdown_entry(&json!("Simmer (600s)")), "Simmer (600s)");
        assert_eq!(countdown_entry(&json!(90)), "90");
    }

    #[test]
    fn test_normalize_recipe_payload() {
        let payload = json!({
            "Order": 1,
            "Recipe Variant Content": [{
                "Recipe Variant": "vegetarian",
                "Difficulty": "easy",
                "Nutritional Values": {"Energie (kCal)": "100-200"},
                "Shopping List": [{"Ingredient": "Leek"}, {"en": "Carrot"}]
            }],
            "Steps Part 1": [{
                "Duration": "15",
                "Ingredient": [
                    {"Ingredient": "leek", "Amount": "1/2", "Metric Unit": "sprigs"},
                    {"Ingredient": "water", "Amount": 1, "Metric Unit": "liter"},
                    {"Ingredient": "oil", "Amount": 2, "Metric Unit": "Tablespoon"}
                ],
                "Count Down": [{"Trigger": "Simmer", "Duration": 600}]
            }]
        });
        let normalized = normalize_recipe_payload(payload, RangePolicy::Lower);

        let variant = &normalized["Recipe Variant Content"][0];
        assert_eq!(variant["Recipe Variant"], "Vegetarian");
        assert_eq!(variant["Difficulty"], "Easy");
        assert_eq!(variant["Nutritional Values"]["Energie (kCal)"], 100);
        assert_eq!(variant["Shopping List"], json!(["Leek", "Carrot"]));

        let step = &normalized["Steps Part 1"][0];
        assert_eq!(step["Duration"], 15);
        assert_eq!(step["Ingredient"][0]["Metric Unit"], "Amount");
        assert_eq!(step["Ingredient"][0]["Amount"], 0.5);
        assert_eq!(step["Ingredient"][1]["Metric Unit"], "Liter");
        assert_eq!(step["Ingredient"][2]["Metric Unit"], "Tablespoon");
        assert_eq!(step["Count Down"], json!(["Simmer (600s)"]));
    }

    #[test]
    fn test_unknown_variant_becomes_other() {
        let payload = json!({
            "Recipe Variant Content": [{"Recipe Variant": "Pescatarian", "Difficulty": "Hard"}]
        });
        let normalized = normalize_recipe_payload(payload, RangePolicy::Lower);
        assert_eq!(normalized["Recipe Variant Content"][0]["Recipe Variant"], "Other");
        assert_eq!(normalized["Recipe Variant Content"][0]["Difficulty"], "Hard");
    }

    #[test]
    fn test_step_text_is_single_line() {
        let payload = json!({
            "Steps Part 1": [{
                "Display Name": {"en": "Mix\nwell", "nl_NL": "Goed"},
                "Action": {"en": "Mix", "nl_NL": "Meng\r\n"},
                "Instructions": {"en": "Stir.\nThen  serve.", "nl_NL": "Roer.\n\nServeer."},
                "Duration": 5
            }]
        });
        let normalized = normalize_recipe_payload(payload, RangePolicy::Lower);
        let step = &normalized["Steps Part 1"][0];
        assert_eq!(step["Display Name"]["en"], "Mix well");
        assert_eq!(step["Action"]["nl_NL"], "Meng");
        assert_eq!(step["Instructions"]["en"], "Stir. Then serve.");
        assert_eq!(step["Instructions"]["nl_NL"], "Roer. Serveer.");
    }

    #[test]
    fn test_normalize_recipe_payload_is_idempotent() {
        let payload = json!({
            "Steps Part 1": [{
                "Duration": 12.5,
                "Ingredient": [{"Ingredient": "egg", "Amount": "2", "Metric Unit": "pieces"}],
                "Count Down": [{"name": "Rest", "duration": 30}]
            }]
        });
        let once = normalize_recipe_payload(payload, RangePolicy::Lower);
        let twice = normalize_recipe_payload(once.clone(), RangePolicy::Lower);
        assert_eq!(once, twice);
    }
}
