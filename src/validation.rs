//! Structural and quality checks on recipe payloads.

use serde::Deserialize;
use serde_json::Value;

use crate::error::TransformError;
use crate::model::{LocalizedText, Recipe, MAX_STEPS};

/// Structural pass: coerce a normalized payload into the typed model.
///
/// Units outside the closed enumeration fail here, as do unknown variants and
/// difficulties.
pub fn parse_recipe(payload: &Value) -> Result<Recipe, TransformError> {
    Recipe::deserialize(payload).map_err(|e| TransformError::Schema(e.to_string()))
}

/// Number of non-blank, blank-line-separated paragraphs.
fn paragraph_count(text: &str) -> usize {
    text.split("\n\n").filter(|p| !p.trim().is_empty()).count()
}

fn check_description(description: &LocalizedText, issues: &mut Vec<String>) {
    if paragraph_count(&description.en) != 2 {
        issues.push("Description must have exactly 2 paragraphs (en).".to_string());
    }
    if paragraph_count(&description.nl) != 2 {
        issues.push("Description must have exactly 2 paragraphs (nl_NL).".to_string());
    }
}

/// Domain rules on a structurally valid recipe; an empty list means it passes.
pub fn quality_issues(recipe: &Recipe) -> Vec<String> {
    let mut issues = Vec::new();

    if recipe.steps_part_1.len() > MAX_STEPS {
        issues.push(format!("Steps Part 1 exceeds {} steps.", MAX_STEPS));
    }
    if recipe.steps_part_1.is_empty() {
        issues.push("Steps Part 1 must include at least one step.".to_string());
    }
    if recipe.recipe_variant_content.is_empty() {
        issues.push("Recipe Variant Content must include at least one variant.".to_string());
    }
    for variant in &recipe.recipe_variant_content {
        if let Some(description) = &variant.description {
            check_description(description, &mut issues);
        }
    }

    for (index, step) in recipe.steps_part_1.iter().enumerate() {
        let label = format!("Step {}", index + 1);
        if !step.instructions.is_complete() {
            issues.push(format!(
                "{} is missing instructions in English or Dutch.",
                label
            ));
        }
        if step.duration <= 0 {
            issues.push(format!("{} is missing a duration.", label));
        }
    }

    issues
}
