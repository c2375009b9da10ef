//! Multi-stage generation of a recipe payload from raw recipe text.
//!
//! "Write a full recipe" is split into small oracle calls: condense, analyze,
//! metadata, outline and one call per outlined step. Each call's output goes
//! through the extractor and normalizer before the pieces are assembled.

mod assemble;
mod condense;
pub mod prompts;

pub use assemble::{assemble_recipe, metadata_variant};
pub use condense::truncate_to_budget;

use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::config::{LimitsConfig, RangePolicy};
use crate::error::TransformError;
use crate::extraction::{extract_json_object, extract_json_payload};
use crate::model::{Analysis, MetricUnit};
use crate::normalize::{normalize_metadata, normalize_step_units};
use crate::providers::OracleClient;
use prompts::render;

/// Bounds on the number of outlined steps.
pub const MIN_OUTLINE_STEPS: usize = 3;
pub const MAX_OUTLINE_STEPS: usize = 15;

/// Fail when a formatted prompt is longer than `limit` characters.
pub fn ensure_prompt_within_limit(prompt: &str, limit: usize) -> Result<(), TransformError> {
    let length = prompt.chars().count();
    if length > limit {
        return Err(TransformError::PromptTooLarge { length, limit });
    }
    Ok(())
}

/// Fail when recipe text is longer than `limit` characters.
pub fn ensure_recipe_within_limit(recipe_text: &str, limit: usize) -> Result<(), TransformError> {
    let length = recipe_text.chars().count();
    if length > limit {
        return Err(TransformError::RecipeTooLarge { length, limit });
    }
    Ok(())
}

/// Runs the generation stages for one recipe text.
pub struct RecipeGenerator<'a> {
    oracle: &'a OracleClient,
    limits: &'a LimitsConfig,
    policy: RangePolicy,
}

impl<'a> RecipeGenerator<'a> {
    pub fn new(oracle: &'a OracleClient, limits: &'a LimitsConfig, policy: RangePolicy) -> Self {
        Self {
            oracle,
            limits,
            policy,
        }
    }

    /// Shrink recipe text to the recipe limit.
    ///
    /// Text already within the limit is returned unchanged. Otherwise the
    /// oracle rewrites it; a rewrite that is still too long is cut line by
    /// line with [`truncate_to_budget`].
    pub async fn condense(&self, recipe_text: &str) -> Result<String, TransformError> {
        let limit = self.limits.recipe_chars;
        let length = recipe_text.chars().count();
        if length <= limit {
            return Ok(recipe_text.to_string());
        }

        info!("Condensing recipe text ({} chars, limit {})", length, limit);
        let limit_text = limit.to_string();
        let prompt = render(
            prompts::CONDENSE_PROMPT,
            &[("RECIPE", recipe_text), ("LIMIT", &limit_text)],
        );
        let condensed = self.oracle.invoke(&prompt).await?;

        if condensed.chars().count() > limit {
            warn!(
                "Condensed text still exceeds {} chars, truncating by lines",
                limit
            );
            return Ok(truncate_to_budget(&condensed, limit));
        }
        Ok(condensed)
    }

    /// First-pass analysis in JSON mode, strictly checked against [`Analysis`].
    pub async fn analyze(&self, recipe_text: &str) -> Result<Analysis, TransformError> {
        ensure_recipe_within_limit(recipe_text, self.limits.recipe_chars)?;
        let prompt = render(prompts::ANALYZE_PROMPT, &[("RECIPE", recipe_text)]);
        ensure_prompt_within_limit(&prompt, self.limits.prompt_chars)?;

        let content = self.oracle.invoke_json(&prompt).await?;
        let payload = extract_json_payload(&content, &[])
            .map_err(|e| TransformError::Analysis(e.to_string()))?;
        let analysis: Analysis =
            serde_json::from_value(payload).map_err(|e| TransformError::Analysis(e.to_string()))?;
        debug!(
            "Analysis: {} ingredients, {} tools, complexity {:?}",
            analysis.ingredients.len(),
            analysis.tools.len(),
            analysis.complexity
        );
        Ok(analysis)
    }

    /// Names, descriptions, difficulty, nutrition and shopping list.
    pub async fn generate_metadata(
        &self,
        recipe_text: &str,
        analysis: &Analysis,
    ) -> Result<Map<String, Value>, TransformError> {
        let ingredients = analysis.ingredients.join(", ");
        let tools = analysis.tools.join(", ");
        let complexity = serde_json::to_value(analysis.complexity)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let prompt = render(
            prompts::METADATA_PROMPT,
            &[
                ("RECIPE", recipe_text),
                ("INGREDIENTS", &ingredients),
                ("TOOLS", &tools),
                ("COOKING_TIME", &analysis.cooking_time),
                ("COMPLEXITY", &complexity),
            ],
        );
        ensure_prompt_within_limit(&prompt, self.limits.prompt_chars)?;

        let content = self.oracle.stream(&prompt).await?;
        let metadata = extract_json_object(&content, &[])?;
        Ok(normalize_metadata(metadata, self.policy))
    }

    /// Ordered step titles.
    ///
    /// A response that is not a JSON array yields an empty outline; outlines
    /// longer than [`MAX_OUTLINE_STEPS`] are cut to that length.
    pub async fn outline(
        &self,
        recipe_text: &str,
        analysis: &Analysis,
    ) -> Result<Vec<String>, TransformError> {
        let ingredients = analysis.ingredients.join(", ");
        let prompt = render(
            prompts::OUTLINE_PROMPT,
            &[
                ("RECIPE", recipe_text),
                ("INGREDIENTS", &ingredients),
                ("COOKING_TIME", &analysis.cooking_time),
            ],
        );
        ensure_prompt_within_limit(&prompt, self.limits.prompt_chars)?;

        let content = self.oracle.invoke(&prompt).await?;
        let mut titles: Vec<String> = match extract_json_payload(&content, &[])? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(title) if !title.trim().is_empty() => {
                        Some(title.trim().to_string())
                    }
                    _ => None,
                })
                .collect(),
            other => {
                warn!(
                    "Step outline was not a list ({}), continuing without steps",
                    other
                );
                Vec::new()
            }
        };

        if titles.len() > MAX_OUTLINE_STEPS {
            warn!(
                "Step outline has {} titles, keeping the first {}",
                titles.len(),
                MAX_OUTLINE_STEPS
            );
            titles.truncate(MAX_OUTLINE_STEPS);
        } else if titles.len() < MIN_OUTLINE_STEPS {
            warn!("Step outline has only {} titles", titles.len());
        }
        Ok(titles)
    }

    /// One raw step payload, with ingredient units already resolved.
    pub async fn generate_step(
        &self,
        recipe_text: &str,
        analysis: &Analysis,
        step_number: usize,
        step_title: &str,
        variant: &str,
    ) -> Result<Map<String, Value>, TransformError> {
        let number = step_number.to_string();
        let tools = analysis.tools.join(", ");
        let units = MetricUnit::ALL
            .iter()
            .map(MetricUnit::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = render(
            prompts::STEP_PROMPT,
            &[
                ("RECIPE", recipe_text),
                ("STEP_NUMBER", &number),
                ("STEP_TITLE", step_title),
                ("VARIANT", variant),
                ("TOOLS", &tools),
                ("UNITS", &units),
            ],
        );
        ensure_prompt_within_limit(&prompt, self.limits.prompt_chars)?;

        let content = self.oracle.stream(&prompt).await?;
        let step = extract_json_object(&content, &[])?;
        Ok(normalize_step_units(step))
    }

    /// Metadata, outline and every step, assembled into one labelled payload.
    pub async fn generate(
        &self,
        recipe_text: &str,
        analysis: &Analysis,
    ) -> Result<Value, TransformError> {
        let metadata = self.generate_metadata(recipe_text, analysis).await?;
        let variant = metadata_variant(&metadata);

        let titles = self.outline(recipe_text, analysis).await?;
        let mut steps = Vec::with_capacity(titles.len());
        for (index, title) in titles.into_iter().enumerate() {
            debug!("Generating step {}: {}", index + 1, title);
            let step = self
                .generate_step(recipe_text, analysis, index + 1, &title, variant)
                .await?;
            steps.push((title, step));
        }

        info!("Assembling recipe from {} steps", steps.len());
        Ok(assemble_recipe(&metadata, &steps, self.policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Complexity;
    use crate::providers::{FakeProvider, RateLimiter, RetryPolicy};
    use std::sync::Arc;
    use std::time::Duration;

    fn oracle(provider: Arc<FakeProvider>) -> OracleClient {
        OracleClient::new(
            provider,
            Arc::new(RateLimiter::new(Duration::ZERO)),
            RetryPolicy::default(),
        )
    }

    fn analysis() -> Analysis {
        Analysis {
            ingredients: vec!["2 eggs".to_string()],
            tools: vec!["pan".to_string()],
            cooking_time: "10 minutes".to_string(),
            complexity: Complexity::Low,
        }
    }

    #[test]
    fn test_prompt_guard_names_both_lengths() {
        let err = ensure_prompt_within_limit("abcdef", 5).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Length: 6 chars"));
        assert!(message.contains("limit: 5 chars"));
        assert!(ensure_prompt_within_limit("abcde", 5).is_ok());
    }

    #[test]
    fn test_recipe_guard() {
        let err = ensure_recipe_within_limit("abcdef", 3).unwrap_err();
        assert!(matches!(
            err,
            TransformError::RecipeTooLarge {
                length: 6,
                limit: 3
            }
        ));
    }

    #[tokio::test]
    async fn test_condense_is_identity_within_limit() {
        let provider = Arc::new(FakeProvider::new());
        let client = oracle(provider.clone());
        let limits = LimitsConfig::default();
        let generator = RecipeGenerator::new(&client, &limits, RangePolicy::Lower);

        let text = "Boil pasta. Add sauce.";
        assert_eq!(generator.condense(text).await.unwrap(), text);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_condense_falls_back_to_truncation() {
        let long_answer = (0..200)
            .map(|i| format!("line {i} of the condensed recipe"))
            .collect::<Vec<_>>()
            .join("\n");
        let provider = Arc::new(FakeProvider::with_response("condensation", &long_answer));
        let client = oracle(provider.clone());
        let limits = LimitsConfig {
            recipe_chars: 500,
            ..LimitsConfig::default()
        };
        let generator = RecipeGenerator::new(&client, &limits, RangePolicy::Lower);

        let condensed = generator.condense(&"word ".repeat(200)).await.unwrap();
        assert!(condensed.chars().count() <= 500);
        assert!(condensed.starts_with("line 0"));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_analyze_rejects_invalid_complexity() {
        let provider = Arc::new(FakeProvider::with_response(
            "experienced recipe guide",
            r#"{"ingredients": [], "tools": [], "cooking_time": "1h", "complexity": "extreme"}"#,
        ));
        let client = oracle(provider);
        let limits = LimitsConfig::default();
        let generator = RecipeGenerator::new(&client, &limits, RangePolicy::Lower);

        let err = generator.analyze("Make toast.").await.unwrap_err();
        assert!(matches!(err, TransformError::Analysis(_)));
    }

    #[tokio::test]
    async fn test_analyze_rejects_oversized_recipe() {
        let provider = Arc::new(FakeProvider::new());
        let client = oracle(provider.clone());
        let limits = LimitsConfig {
            recipe_chars: 10,
            ..LimitsConfig::default()
        };
        let generator = RecipeGenerator::new(&client, &limits, RangePolicy::Lower);

        let err = generator.analyze("far too long for the limit").await.unwrap_err();
        assert!(err.is_input_error());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_outline_non_list_is_empty() {
        let provider = Arc::new(FakeProvider::with_response(
            "break this recipe",
            r#"{"steps": ["Chop", "Fry"]}"#,
        ));
        let client = oracle(provider);
        let limits = LimitsConfig::default();
        let generator = RecipeGenerator::new(&client, &limits, RangePolicy::Lower);

        let titles = generator.outline("Fry an egg.", &analysis()).await.unwrap();
        assert!(titles.is_empty());
    }

    #[tokio::test]
    async fn test_outline_is_capped() {
        let many: Vec<String> = (1..=20).map(|i| format!("Step {i}")).collect();
        let provider = Arc::new(FakeProvider::with_response(
            "break this recipe",
            &serde_json::to_string(&many).unwrap(),
        ));
        let client = oracle(provider);
        let limits = LimitsConfig::default();
        let generator = RecipeGenerator::new(&client, &limits, RangePolicy::Lower);

        let titles = generator.outline("Fry an egg.", &analysis()).await.unwrap();
        assert_eq!(titles.len(), MAX_OUTLINE_STEPS);
        assert_eq!(titles[0], "Step 1");
    }

    #[tokio::test]
    async fn test_step_prompt_guard_stops_before_calling() {
        let provider = Arc::new(FakeProvider::new());
        let client = oracle(provider.clone());
        let limits = LimitsConfig {
            prompt_chars: 100,
            ..LimitsConfig::default()
        };
        let generator = RecipeGenerator::new(&client, &limits, RangePolicy::Lower);

        let err = generator
            .generate_step("Fry an egg.", &analysis(), 1, "Fry", "Vegetarian")
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::PromptTooLarge { limit: 100, .. }));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_truncated_step_aborts_generation() {
        let provider = Arc::new(FakeProvider::new());
        provider.push_response("recipe metadata expert", r#"{"variant": "Vegetarian"}"#);
        provider.push_response("break this recipe", r#"["Crack eggs", "Fry eggs", "Serve"]"#);
        provider.push_response("one detailed cooking step", r#"{"instructions_en": "Crack the } eggs into"#);
        let client = oracle(provider);
        let limits = LimitsConfig::default();
        let generator = RecipeGenerator::new(&client, &limits, RangePolicy::Lower);

        let err = generator.generate("Fry an egg.", &analysis()).await.unwrap_err();
        assert!(matches!(
            err,
            TransformError::Extraction(crate::extraction::ExtractError::Truncated)
        ));
    }
}
