//! JSON and CSV renditions of validated recipes.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::TransformError;
use crate::model::{Ingredient, Recipe, Step};

/// Fixed CSV header, one row per step follows.
pub const CSV_COLUMNS: [&str; 8] = [
    "step_number",
    "display_name_en",
    "action_en",
    "instructions_en",
    "duration_seconds",
    "recipe_variant",
    "ingredients",
    "recipe_name",
];

/// Pretty-printed JSON with the schema's human-readable labels.
pub fn recipe_to_json(recipe: &Recipe) -> Result<String, TransformError> {
    Ok(serde_json::to_string_pretty(recipe)?)
}

/// One recipe is exported as-is; several become an array with `Order` renumbered from 1.
pub fn recipes_to_json(recipes: &[Recipe]) -> Result<String, TransformError> {
    if let [recipe] = recipes {
        return recipe_to_json(recipe);
    }
    let renumbered: Vec<Recipe> = recipes
        .iter()
        .zip(1u32..)
        .map(|(recipe, order)| Recipe {
            order,
            ..recipe.clone()
        })
        .collect();
    Ok(serde_json::to_string_pretty(&renumbered)?)
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{}", amount as i64)
    } else {
        amount.to_string()
    }
}

fn ingredient_cell(ingredients: &[Ingredient]) -> String {
    ingredients
        .iter()
        .map(|item| {
            format!(
                "{} {} {}",
                format_amount(item.amount),
                item.metric_unit,
                item.ingredient
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Quote a CSV field when it contains a separator, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(fields: &[String]) -> String {
    let mut row = fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",");
    row.push_str("\r\n");
    row
}

fn step_row(step: &Step, recipe_name: &str) -> String {
    csv_row(&[
        step.step_number.clone().unwrap_or_default(),
        step.display_name
            .as_ref()
            .map(|name| name.en.clone())
            .unwrap_or_default(),
        step.action
            .as_ref()
            .map(|action| action.en.clone())
            .unwrap_or_default(),
        step.instructions.en.clone(),
        step.duration.to_string(),
        step.recipe_variant.join(", "),
        ingredient_cell(&step.ingredient),
        recipe_name.to_string(),
    ])
}

/// CSV projection of every step of every recipe.
pub fn recipes_to_csv(recipes: &[Recipe]) -> String {
    let header: Vec<String> = CSV_COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut out = csv_row(&header);
    for recipe in recipes {
        let name = match recipe.generic_name.en.trim() {
            "" => "Recipe",
            name => name,
        };
        for step in &recipe.steps_part_1 {
            out.push_str(&step_row(step, name));
        }
    }
    out
}

/// File-name stem derived from the English generic name.
pub fn recipe_slug(recipe: &Recipe) -> String {
    let mut slug = String::new();
    for c in recipe.generic_name.en.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "recipe".to_string()
    } else {
        slug.to_string()
    }
}

/// Write `<slug>.json` and `<slug>.csv` into `dir`, creating it if needed.
pub fn write_outputs(recipe: &Recipe, dir: &Path) -> Result<(PathBuf, PathBuf), TransformError> {
    fs::create_dir_all(dir)?;
    let slug = recipe_slug(recipe);

    let json_path = dir.join(format!("{}.json", slug));
    fs::write(&json_path, recipe_to_json(recipe)?)?;
    let csv_path = dir.join(format!("{}.csv", slug));
    fs::write(&csv_path, recipes_to_csv(std::slice::from_ref(recipe)))?;

    info!(
        "Exported recipe to {} and {}",
        json_path.display(),
        csv_path.display()
    );
    Ok((json_path, csv_path))
}
