//! Merging metadata and per-step payloads into one labelled recipe payload.

use serde_json::{json, Map, Value};

use crate::config::RangePolicy;
use crate::model::VariantCategory;
use crate::normalize::{coerce_amount, coerce_duration, normalize_recipe_payload, single_line};

const DEFAULT_DIFFICULTY: &str = "Medium";
const DEFAULT_WORKPLACE: &str = "1";
const DEFAULT_STEP_ICON: &str = "prep";

/// A string field of a raw payload; numbers are rendered, anything else is empty.
fn text(map: &Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn localized(map: &Map<String, Value>, en_key: &str, nl_key: &str) -> Value {
    json!({
        "en": single_line(&text(map, en_key)),
        "nl_NL": single_line(&text(map, nl_key)),
    })
}

/// Descriptions keep their paragraph breaks; only the lines inside a paragraph are joined.
fn paragraphs(text: &str) -> String {
    text.split("\n\n")
        .map(single_line)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn string_list(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(Value::String(s.clone())),
                Value::Number(n) => Some(Value::String(n.to_string())),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// The recipe variant named by the metadata, `Other` when absent or unknown.
pub fn metadata_variant(metadata: &Map<String, Value>) -> &'static str {
    let raw = text(metadata, "variant");
    VariantCategory::ALL
        .iter()
        .find(|category| category.as_str().eq_ignore_ascii_case(&raw))
        .copied()
        .unwrap_or(VariantCategory::Other)
        .as_str()
}

fn variant_content(metadata: &Map<String, Value>) -> Value {
    let difficulty = match text(metadata, "difficulty") {
        d if d.is_empty() => DEFAULT_DIFFICULTY.to_string(),
        d => d,
    };
    let nutrition = match metadata.get("nutritional_values") {
        Some(Value::Object(values)) => Value::Object(values.clone()),
        _ => json!({}),
    };
    let shopping_list = metadata
        .get("shopping_list")
        .cloned()
        .unwrap_or_else(|| json!([]));

    json!({
        "Recipe Variant": metadata_variant(metadata),
        "Recipe Name": localized(metadata, "recipe_name_en", "recipe_name_nl"),
        "Description": {
            "en": paragraphs(&text(metadata, "description_en")),
            "nl_NL": paragraphs(&text(metadata, "description_nl")),
        },
        "Difficulty": difficulty,
        "Nutritional Values": nutrition,
        "Shopping List": shopping_list,
    })
}

fn ingredient(raw: &Map<String, Value>) -> Value {
    json!({
        "Ingredient": text(raw, "ingredient"),
        "Amount": coerce_amount(raw.get("amount")),
        "Metric Unit": raw.get("metric_unit").cloned().unwrap_or_else(|| json!("Amount")),
    })
}

fn step(raw: &Map<String, Value>, ordinal: usize, title: &str, variant: &str) -> Value {
    let ingredients: Vec<Value> = match raw.get("ingredients") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .map(ingredient)
            .collect(),
        _ => Vec::new(),
    };

    let editor_name = match text(raw, "step_name_editor") {
        name if name.is_empty() => title.to_string(),
        name => name,
    };
    let workplace = match text(raw, "workplace") {
        w if w.is_empty() => DEFAULT_WORKPLACE.to_string(),
        w => w,
    };
    let icon = match text(raw, "step_icon") {
        i if i.is_empty() => DEFAULT_STEP_ICON.to_string(),
        i => i,
    };
    let mut variants = string_list(raw.get("recipe_variant"));
    if variants.is_empty() {
        variants.push(Value::String(variant.to_string()));
    }
    let trigger = match text(raw, "trigger_countdown_step") {
        t if t.is_empty() => Value::Null,
        t => Value::String(t),
    };

    json!({
        "Step Number": ordinal.to_string(),
        "Display Name": localized(raw, "display_name_en", "display_name_nl"),
        "Action": localized(raw, "action_en", "action_nl"),
        "Step Name (Editor)": editor_name,
        "Workplace": workplace,
        "Step Icon": icon,
        "Instructions": localized(raw, "instructions_en", "instructions_nl"),
        "Ingredient": ingredients,
        "Duration": coerce_duration(raw.get("duration")),
        "Count Down": raw.get("count_down").cloned().unwrap_or_else(|| json!([])),
        "Trigger Countdown Step": trigger,
        "RecipeVariant": variants,
    })
}

/// Build the labelled recipe payload from raw metadata and raw steps.
///
/// `steps` pairs each unit-normalized raw step with its outline title. The
/// metadata becomes the single variant, steps are numbered from one, and the
/// result goes through full-payload normalization before it is returned.
pub fn assemble_recipe(
    metadata: &Map<String, Value>,
    steps: &[(String, Map<String, Value>)],
    policy: RangePolicy,
) -> Value {
    let variant = metadata_variant(metadata);
    let steps: Vec<Value> = steps
        .iter()
        .enumerate()
        .map(|(index, (title, raw))| step(raw, index + 1, title, variant))
        .collect();

    let payload = json!({
        "Order": 1,
        "Generic Name": localized(metadata, "generic_name_en", "generic_name_nl"),
        "Highlighted?": false,
        "Recipe Variant Content": [variant_content(metadata)],
        "Steps Part 1": steps,
    });

    normalize_recipe_payload(payload, policy)
}
