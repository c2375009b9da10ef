//! Bounded generate/validate/repair state machine.
//!
//! A run walks explicit [`WorkflowNode`]s:
//!
//! ```text
//! condense -> generate -> validate -> quality -> export
//!                            ^           |
//!                            |           v
//!                            +------- repair
//! ```
//!
//! Validate ends the run with `schema_failed` on a structural error. Repair
//! increments a counter and ends the run with `repair_exhausted` once the
//! configured budget is used up, so the loop always terminates.

use std::fmt;

use log::{error, info, warn};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::{AppConfig, LimitsConfig, RangePolicy};
use crate::error::TransformError;
use crate::export::{recipe_to_json, recipes_to_csv};
use crate::extraction::extract_json_payload;
use crate::generation::prompts::{render, REPAIR_PROMPT};
use crate::generation::RecipeGenerator;
use crate::model::{Analysis, Recipe, RECIPE_KEYS};
use crate::normalize::normalize_recipe_payload;
use crate::pipelines::text::read_text_input;
use crate::providers::OracleClient;
use crate::validation::{parse_recipe, quality_issues};

/// Duration forced onto steps without a positive one by deterministic repair.
pub const REPAIR_DEFAULT_DURATION: i64 = 60;
pub const FALLBACK_INSTRUCTIONS_EN: &str =
    "Follow the recipe text step by step. Tick off this step when you finish it.";
pub const FALLBACK_INSTRUCTIONS_NL: &str =
    "Volg de recepttekst stap voor stap. Vink deze stap af als je klaar bent.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowNode {
    Condense,
    Generate,
    Validate,
    Quality,
    Repair,
    Export,
    End,
}

impl fmt::Display for WorkflowNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowNode::Condense => "condense",
            WorkflowNode::Generate => "generate",
            WorkflowNode::Validate => "validate",
            WorkflowNode::Quality => "quality",
            WorkflowNode::Repair => "repair",
            WorkflowNode::Export => "export",
            WorkflowNode::End => "end",
        };
        f.write_str(name)
    }
}

/// Terminal status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Success,
    /// Input or generation error
    Failed,
    /// The payload did not fit the recipe model
    SchemaFailed,
    /// Quality issues remained after every allowed repair attempt
    RepairExhausted,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Success => "success",
            WorkflowStatus::Failed => "failed",
            WorkflowStatus::SchemaFailed => "schema_failed",
            WorkflowStatus::RepairExhausted => "repair_exhausted",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a finished run produced, successful or not.
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    pub status: WorkflowStatus,
    pub error_message: Option<String>,
    /// The validated recipe, present on success
    pub recipe: Option<Recipe>,
    /// The last candidate payload, kept for inspection on failure
    pub payload: Option<Value>,
    pub analysis: Option<Analysis>,
    pub validation_errors: Vec<String>,
    pub quality_issues: Vec<String>,
    pub repair_iterations: u32,
    pub json: Option<String>,
    pub csv: Option<String>,
}

impl WorkflowOutcome {
    pub fn is_success(&self) -> bool {
        self.status == WorkflowStatus::Success
    }
}

#[derive(Debug, Default)]
struct WorkflowState {
    recipe_text: String,
    payload: Option<Value>,
    recipe: Option<Recipe>,
    analysis: Option<Analysis>,
    validation_errors: Vec<String>,
    quality_issues: Vec<String>,
    iteration: u32,
    status: Option<WorkflowStatus>,
    error_message: Option<String>,
    json: Option<String>,
    csv: Option<String>,
}

impl WorkflowState {
    fn fail(&mut self, status: WorkflowStatus, message: impl Into<String>) -> WorkflowNode {
        self.status = Some(status);
        self.error_message = Some(message.into());
        WorkflowNode::End
    }

    fn into_outcome(self) -> WorkflowOutcome {
        WorkflowOutcome {
            status: self.status.unwrap_or(WorkflowStatus::Failed),
            error_message: self.error_message,
            recipe: self.recipe,
            payload: self.payload,
            analysis: self.analysis,
            validation_errors: self.validation_errors,
            quality_issues: self.quality_issues,
            repair_iterations: self.iteration,
            json: self.json,
            csv: self.csv,
        }
    }
}

/// Drives one recipe from raw text (or an existing payload) to an exported recipe.
pub struct RecipeWorkflow {
    oracle: Option<OracleClient>,
    limits: LimitsConfig,
    policy: RangePolicy,
    max_repair_iterations: u32,
}

impl RecipeWorkflow {
    /// Create a workflow; without an oracle only [`run_from_payload`](Self::run_from_payload) is usable.
    pub fn new(oracle: Option<OracleClient>, config: &AppConfig) -> Self {
        Self {
            oracle,
            limits: config.limits.clone(),
            policy: config.workflow.nutrition_range_policy,
            max_repair_iterations: config.workflow.max_repair_iterations,
        }
    }

    pub fn with_max_repair_iterations(mut self, max: u32) -> Self {
        self.max_repair_iterations = max;
        self
    }

    pub fn max_repair_iterations(&self) -> u32 {
        self.max_repair_iterations
    }

    /// Generate, validate, repair and export a recipe from raw text.
    ///
    /// Every data failure is reported through [`WorkflowOutcome::status`]; the
    /// only error returned is [`TransformError::OracleNotConfigured`].
    pub async fn run(&self, recipe_text: &str) -> Result<WorkflowOutcome, TransformError> {
        let text = match read_text_input(recipe_text) {
            Ok(text) => text,
            Err(e) => {
                let mut state = WorkflowState::default();
                state.fail(WorkflowStatus::Failed, e.to_string());
                state
                    .validation_errors
                    .push("recipe text is required".to_string());
                return Ok(state.into_outcome());
            }
        };
        if self.oracle.is_none() {
            return Err(TransformError::OracleNotConfigured);
        }

        let mut state = WorkflowState {
            recipe_text: text,
            ..WorkflowState::default()
        };
        self.drive(WorkflowNode::Condense, &mut state).await;
        Ok(state.into_outcome())
    }

    /// Validate, repair and export an existing labelled payload.
    pub async fn run_from_payload(&self, payload: Value) -> WorkflowOutcome {
        let mut state = WorkflowState {
            payload: Some(normalize_recipe_payload(payload, self.policy)),
            ..WorkflowState::default()
        };
        self.drive(WorkflowNode::Validate, &mut state).await;
        state.into_outcome()
    }

    async fn drive(&self, start: WorkflowNode, state: &mut WorkflowState) {
        let mut node = start;
        while node != WorkflowNode::End {
            let next = match node {
                WorkflowNode::Condense => self.condense(state).await,
                WorkflowNode::Generate => self.generate(state).await,
                WorkflowNode::Validate => self.validate(state),
                WorkflowNode::Quality => self.quality(state),
                WorkflowNode::Repair => self.repair(state).await,
                WorkflowNode::Export => self.export(state),
                WorkflowNode::End => WorkflowNode::End,
            };
            info!(
                "Workflow {} -> {} (repair iteration {}/{})",
                node, next, state.iteration, self.max_repair_iterations
            );
            node = next;
        }
    }

    fn generator(&self) -> Option<RecipeGenerator<'_>> {
        self.oracle
            .as_ref()
            .map(|oracle| RecipeGenerator::new(oracle, &self.limits, self.policy))
    }

    async fn condense(&self, state: &mut WorkflowState) -> WorkflowNode {
        let Some(generator) = self.generator() else {
            return state.fail(
                WorkflowStatus::Failed,
                TransformError::OracleNotConfigured.to_string(),
            );
        };
        match generator.condense(&state.recipe_text).await {
            Ok(condensed) => {
                state.recipe_text = condensed;
                WorkflowNode::Generate
            }
            Err(e) => {
                state.validation_errors.push(e.to_string());
                state.fail(WorkflowStatus::Failed, format!("Condensing failed: {}", e))
            }
        }
    }

    async fn generate(&self, state: &mut WorkflowState) -> WorkflowNode {
        let Some(generator) = self.generator() else {
            return state.fail(
                WorkflowStatus::Failed,
                TransformError::OracleNotConfigured.to_string(),
            );
        };

        let analysis = match state.analysis.take() {
            Some(analysis) => Ok(analysis),
            None => generator.analyze(&state.recipe_text).await,
        };
        let result = match analysis {
            Ok(analysis) => {
                let generated = generator.generate(&state.recipe_text, &analysis).await;
                state.analysis = Some(analysis);
                generated
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(payload) => {
                state.payload = Some(payload);
                WorkflowNode::Validate
            }
            Err(e) => {
                if e.is_input_error() {
                    warn!("Recipe text rejected before generation: {}", e);
                } else {
                    error!("Generation failed: {}", e);
                }
                state.validation_errors.push(e.to_string());
                state.fail(WorkflowStatus::Failed, format!("Generation failed: {}", e))
            }
        }
    }

    fn validate(&self, state: &mut WorkflowState) -> WorkflowNode {
        let parsed = match &state.payload {
            Some(payload) => parse_recipe(payload),
            None => Err(TransformError::Schema("no payload to validate".to_string())),
        };
        match parsed {
            Ok(recipe) => {
                state.recipe = Some(recipe);
                state.validation_errors.clear();
                WorkflowNode::Quality
            }
            Err(e) => {
                state.recipe = None;
                state.validation_errors = vec![e.to_string()];
                state.fail(WorkflowStatus::SchemaFailed, "Schema validation failed.")
            }
        }
    }

    fn quality(&self, state: &mut WorkflowState) -> WorkflowNode {
        state.quality_issues = match &state.recipe {
            Some(recipe) => quality_issues(recipe),
            None => vec!["Missing parsed recipe for quality checks.".to_string()],
        };
        if state.quality_issues.is_empty() {
            return WorkflowNode::Export;
        }
        warn!(
            "Quality check found {} issue(s): {}",
            state.quality_issues.len(),
            state.quality_issues.join("; ")
        );
        WorkflowNode::Repair
    }

    async fn repair(&self, state: &mut WorkflowState) -> WorkflowNode {
        if state.iteration >= self.max_repair_iterations {
            return state.fail(WorkflowStatus::RepairExhausted, "Repair attempts exhausted.");
        }

        let payload = state.payload.take().unwrap_or_else(|| json!({}));
        let repaired = match &self.oracle {
            Some(oracle) => {
                self.llm_repair(oracle, payload, &state.quality_issues)
                    .await
            }
            None => auto_repair(payload, self.policy),
        };

        state.payload = Some(repaired);
        state.recipe = None;
        state.quality_issues.clear();
        state.iteration += 1;
        WorkflowNode::Validate
    }

    /// Ask the oracle to rewrite the payload; fall back to [`auto_repair`] on any failure.
    async fn llm_repair(&self, oracle: &OracleClient, payload: Value, issues: &[String]) -> Value {
        let issue_text = if issues.is_empty() {
            "- No issues provided".to_string()
        } else {
            issues
                .iter()
                .map(|issue| format!("- {}", issue))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let payload_text =
            serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
        let prompt = render(
            REPAIR_PROMPT,
            &[("ISSUES", &issue_text), ("PAYLOAD", &payload_text)],
        );

        let repaired = match oracle.invoke(&prompt).await {
            Ok(content) => extract_json_payload(&content, &RECIPE_KEYS).map_err(TransformError::from),
            Err(e) => Err(e),
        };
        match repaired {
            Ok(value) => normalize_recipe_payload(value, self.policy),
            Err(e) => {
                warn!("LLM repair failed ({}), using deterministic repair", e);
                auto_repair(payload, self.policy)
            }
        }
    }

    fn export(&self, state: &mut WorkflowState) -> WorkflowNode {
        let exported = state.recipe.as_ref().map(|recipe| {
            (
                recipe_to_json(recipe),
                recipes_to_csv(std::slice::from_ref(recipe)),
            )
        });
        match exported {
            Some((Ok(json), csv)) => {
                state.json = Some(json);
                state.csv = Some(csv);
                state.status = Some(WorkflowStatus::Success);
                state.error_message = None;
                WorkflowNode::End
            }
            Some((Err(e), _)) => state.fail(WorkflowStatus::Failed, format!("Export failed: {}", e)),
            None => state.fail(WorkflowStatus::Failed, "Missing parsed recipe for export."),
        }
    }
}

fn fill_if_blank(map: &mut Map<String, Value>, key: &str, text: &str) {
    let blank = map
        .get(key)
        .and_then(Value::as_str)
        .map_or(true, |s| s.trim().is_empty());
    if blank {
        map.insert(key.to_string(), Value::String(text.to_string()));
    }
}

/// Split a one-paragraph description after its first sentence.
fn split_description(text: &str) -> Option<String> {
    let paragraphs: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let [single] = paragraphs.as_slice() else {
        return None;
    };
    let (end, _) = single.char_indices().find(|&(i, c)| {
        matches!(c, '.' | '!' | '?') && single[i + 1..].starts_with(' ')
    })?;
    let (first, rest) = single.split_at(end + 1);
    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }
    Some(format!("{}\n\n{}", first.trim(), rest))
}

/// Deterministic fixes used when no oracle is available or the oracle repair failed.
///
/// Re-runs full normalization, forces a duration of
/// [`REPAIR_DEFAULT_DURATION`] onto steps without a positive one, fills blank
/// instructions in both locales and splits single-paragraph descriptions.
pub fn auto_repair(payload: Value, policy: RangePolicy) -> Value {
    let mut repaired = normalize_recipe_payload(payload, policy);

    if let Some(Value::Array(steps)) = repaired.get_mut("Steps Part 1") {
        for step in steps.iter_mut().filter_map(Value::as_object_mut) {
            let has_duration = matches!(
                step.get("Duration"),
                Some(Value::Number(n)) if n.as_i64().is_some_and(|d| d > 0)
            );
            if !has_duration {
                step.insert("Duration".to_string(), json!(REPAIR_DEFAULT_DURATION));
            }

            let instructions = step
                .entry("Instructions")
                .or_insert_with(|| json!({}));
            if !instructions.is_object() {
                *instructions = json!({});
            }
            if let Some(map) = instructions.as_object_mut() {
                fill_if_blank(map, "en", FALLBACK_INSTRUCTIONS_EN);
                fill_if_blank(map, "nl_NL", FALLBACK_INSTRUCTIONS_NL);
            }
        }
    }

    if let Some(Value::Array(variants)) = repaired.get_mut("Recipe Variant Content") {
        for description in variants
            .iter_mut()
            .filter_map(|variant| variant.get_mut("Description"))
            .filter_map(Value::as_object_mut)
        {
            for locale in ["en", "nl_NL"] {
                if let Some(Value::String(text)) = description.get_mut(locale) {
                    if let Some(split) = split_description(text) {
                        *text = split;
                    }
                }
            }
        }
    }

    repaired
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{FakeProvider, RateLimiter, RetryPolicy};
    use std::sync::Arc;
    use std::time::Duration;

    const ANALYSIS: &str = r#"{"ingredients": ["3 eggs", "butter"], "tools": ["pan"], "cooking_time": "10 minutes", "complexity": "low"}"#;
    const METADATA: &str = r#"{
        "generic_name_en": "Scrambled Eggs",
        "generic_name_nl": "Roerei",
        "variant": "Vegetarian",
        "recipe_name_en": "Creamy Scrambled Eggs",
        "recipe_name_nl": "Romig Roerei",
        "description_en": "Soft and creamy eggs.\n\nReady in minutes.",
        "description_nl": "Zachte romige eieren.\n\nKlaar in een paar minuten.",
        "difficulty": "Easy",
        "nutritional_values": {"Energie (kCal)": "200-250", "Protein (grams)": 12},
        "shopping_list": ["eggs", "butter"]
    }"#;
    const OUTLINE: &str = r#"["Beat the eggs", "Cook the eggs"]"#;

    fn step_response(duration: i64) -> String {
        format!(
            r#"{{"display_name_en": "Beat", "display_name_nl": "Kloppen", "action_en": "Beat", "action_nl": "Klop",
                "instructions_en": "Beat the eggs.", "instructions_nl": "Klop de eieren.", "duration": {},
                "ingredients": [{{"ingredient": "eggs", "amount": "3", "metric_unit": "pieces"}}]}}"#,
            duration
        )
    }

    fn scripted(step_duration: i64) -> Arc<FakeProvider> {
        let fake = FakeProvider::new();
        fake.push_response("experienced recipe guide", ANALYSIS);
        fake.push_response("recipe metadata expert", METADATA);
        fake.push_response("break this recipe", OUTLINE);
        fake.push_response("one detailed cooking step", &step_response(step_duration));
        Arc::new(fake)
    }

    fn oracle(fake: Arc<FakeProvider>) -> OracleClient {
        OracleClient::new(
            fake,
            Arc::new(RateLimiter::new(Duration::ZERO)),
            RetryPolicy::default(),
        )
    }

    fn workflow(fake: Arc<FakeProvider>) -> RecipeWorkflow {
        RecipeWorkflow::new(Some(oracle(fake)), &AppConfig::default())
    }

    const RECIPE_TEXT: &str = "Beat 3 eggs. Melt butter in a pan and cook the eggs gently.";

    #[tokio::test]
    async fn test_run_success() {
        let fake = scripted(3);
        let outcome = workflow(fake.clone()).run(RECIPE_TEXT).await.unwrap();

        assert_eq!(outcome.status, WorkflowStatus::Success);
        assert!(outcome.error_message.is_none());
        assert_eq!(outcome.repair_iterations, 0);
        let recipe = outcome.recipe.unwrap();
        assert_eq!(recipe.generic_name.nl, "Roerei");
        assert_eq!(recipe.steps_part_1.len(), 2);
        assert_eq!(
            recipe.recipe_variant_content[0].nutritional_values.energy_kcal,
            200
        );
        assert!(outcome.json.unwrap().contains("\"Steps Part 1\""));
        assert!(outcome.csv.unwrap().starts_with("step_number,"));
        // analyze + metadata + outline + two steps
        assert_eq!(fake.call_count(), 5);
    }

    #[tokio::test]
    async fn test_empty_text_fails_without_calls() {
        let fake = scripted(3);
        let outcome = workflow(fake.clone()).run("   ").await.unwrap();
        assert_eq!(outcome.status, WorkflowStatus::Failed);
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("Missing recipe text input.")
        );
        assert_eq!(fake.call_count(), 0);
    }

    #[tokio::test]
    async fn test_run_without_oracle_is_an_error() {
        let workflow = RecipeWorkflow::new(None, &AppConfig::default());
        let err = workflow.run(RECIPE_TEXT).await.unwrap_err();
        assert!(matches!(err, TransformError::OracleNotConfigured));
    }

    #[tokio::test]
    async fn test_generation_failure_is_tagged() {
        let fake = FakeProvider::new();
        fake.push_response("experienced recipe guide", r#"{"ingredients": []}"#);
        let outcome = workflow(Arc::new(fake)).run(RECIPE_TEXT).await.unwrap();
        assert_eq!(outcome.status, WorkflowStatus::Failed);
        assert!(outcome
            .error_message
            .unwrap()
            .starts_with("Generation failed: Recipe analysis failed"));
    }

    #[tokio::test]
    async fn test_failed_llm_repair_falls_back() {
        let fake = scripted(0);
        let outcome = workflow(fake.clone()).run(RECIPE_TEXT).await.unwrap();
        // The repair call fails (no script), so the deterministic fallback applies.
        assert_eq!(outcome.status, WorkflowStatus::Success);
        assert_eq!(outcome.repair_iterations, 1);
        let recipe = outcome.recipe.unwrap();
        assert!(recipe
            .steps_part_1
            .iter()
            .all(|step| step.duration == REPAIR_DEFAULT_DURATION));
        let repair_prompts: Vec<String> = fake
            .prompts()
            .into_iter()
            .filter(|p| p.contains("You are repairing a SousChef JSON payload."))
            .collect();
        assert_eq!(repair_prompts.len(), 1);
        assert!(repair_prompts[0].contains("- Step 1 is missing a duration."));
    }

    #[tokio::test]
    async fn test_repair_exhausted_after_budget() {
        let fake = scripted(3);
        let bad = json!({
            "Order": 1,
            "Generic Name": {"en": "Eggs", "nl_NL": "Eieren"},
            "Recipe Variant Content": [],
            "Steps Part 1": []
        });
        fake.push_response("repairing a souschef", &bad.to_string());
        let workflow = workflow(fake.clone()).with_max_repair_iterations(2);

        let outcome = workflow.run_from_payload(bad).await;
        assert_eq!(outcome.status, WorkflowStatus::RepairExhausted);
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("Repair attempts exhausted.")
        );
        assert_eq!(outcome.repair_iterations, 2);
        assert_eq!(fake.call_count(), 2);
        assert!(outcome
            .quality_issues
            .contains(&"Recipe Variant Content must include at least one variant.".to_string()));
    }

    #[tokio::test]
    async fn test_llm_repair_output_is_single_line() {
        let step = |duration: i64, instructions: &str| {
            json!({
                "Display Name": {"en": "Cook", "nl_NL": "Koken"},
                "Action": {"en": "Cook", "nl_NL": "Kook"},
                "Workplace": "1",
                "Step Icon": "cook",
                "Instructions": {"en": instructions, "nl_NL": "Bak de eieren."},
                "Ingredient": [],
                "Duration": duration,
                "RecipeVariant": ["Vegetarian"]
            })
        };
        let recipe = |step: Value| {
            json!({
                "Order": 1,
                "Generic Name": {"en": "Eggs", "nl_NL": "Eieren"},
                "Recipe Variant Content": [{
                    "Recipe Variant": "Vegetarian",
                    "Recipe Name": {"en": "Eggs", "nl_NL": "Eieren"},
                    "Difficulty": "Easy",
                    "Nutritional Values": {}
                }],
                "Steps Part 1": [step]
            })
        };
        let fake = FakeProvider::new();
        fake.push_response(
            "repairing a souschef",
            &recipe(step(120, "Cook the eggs.\nServe warm.")).to_string(),
        );
        let fake = Arc::new(fake);

        let outcome = workflow(fake.clone())
            .run_from_payload(recipe(step(0, "Cook the eggs.")))
            .await;

        assert_eq!(outcome.status, WorkflowStatus::Success);
        assert_eq!(fake.call_count(), 1);
        let recipe = outcome.recipe.unwrap();
        assert_eq!(recipe.steps_part_1[0].duration, 120);
        assert_eq!(
            recipe.steps_part_1[0].instructions.en,
            "Cook the eggs. Serve warm."
        );
        assert!(outcome.csv.unwrap().contains("Cook the eggs. Serve warm."));
    }

    #[tokio::test]
    async fn test_structural_failure_is_schema_failed() {
        let workflow = RecipeWorkflow::new(None, &AppConfig::default());
        let outcome = workflow.run_from_payload(json!({"Order": "first"})).await;
        assert_eq!(outcome.status, WorkflowStatus::SchemaFailed);
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("Schema validation failed.")
        );
        assert_eq!(outcome.validation_errors.len(), 1);
    }

    #[tokio::test]
    async fn test_deterministic_repair_without_oracle() {
        let payload = json!({
            "Order": 1,
            "Generic Name": {"en": "Eggs", "nl_NL": "Eieren"},
            "Recipe Variant Content": [{
                "Recipe Variant": "vegetarian",
                "Recipe Name": {"en": "Eggs", "nl_NL": "Eieren"},
                "Description": {"en": "Soft eggs. Ready fast.", "nl_NL": "Zacht.\n\nSnel."},
                "Difficulty": "easy",
                "Nutritional Values": {}
            }],
            "Steps Part 1": [{
                "Workplace": "1",
                "Step Icon": "cook",
                "Instructions": {"en": "Cook the eggs.", "nl_NL": ""},
                "Ingredient": [{"Ingredient": "eggs", "Amount": 3, "Metric Unit": "sprigs"}],
                "Duration": -5,
                "RecipeVariant": ["Vegetarian"]
            }]
        });
        let workflow = RecipeWorkflow::new(None, &AppConfig::default());
        let outcome = workflow.run_from_payload(payload).await;

        assert_eq!(outcome.status, WorkflowStatus::Success);
        assert_eq!(outcome.repair_iterations, 1);
        let recipe = outcome.recipe.unwrap();
        let step = &recipe.steps_part_1[0];
        assert_eq!(step.duration, 60);
        assert_eq!(step.instructions.nl, FALLBACK_INSTRUCTIONS_NL);
        assert_eq!(step.instructions.en, "Cook the eggs.");
        assert_eq!(
            recipe.recipe_variant_content[0].description.as_ref().unwrap().en,
            "Soft eggs.\n\nReady fast."
        );
    }

    #[test]
    fn test_split_description() {
        assert_eq!(
            split_description("One. Two three."),
            Some("One.\n\nTwo three.".to_string())
        );
        assert_eq!(split_description("Only one sentence."), None);
        assert_eq!(split_description("A.\n\nB."), None);
    }

    #[test]
    fn test_status_names() {
        assert_eq!(WorkflowStatus::SchemaFailed.to_string(), "schema_failed");
        assert_eq!(
            serde_json::to_value(WorkflowStatus::RepairExhausted).unwrap(),
            "repair_exhausted"
        );
        assert_eq!(WorkflowNode::Repair.to_string(), "repair");
    }
}
