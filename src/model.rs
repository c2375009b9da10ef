//! Strongly typed SousChef recipe records.
//!
//! Field names on the wire are the fixed human-readable labels of the SousChef
//! schema ("Generic Name", "Steps Part 1", "Metric Unit", ...). Oracle output is
//! kept as a `serde_json::Value` until it has been extracted and normalized, then
//! converted once into these types.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Upper bound on the number of steps in one recipe.
pub const MAX_STEPS: usize = 50;

/// Top-level keys every full recipe payload must carry.
pub const RECIPE_KEYS: [&str; 4] = [
    "Order",
    "Generic Name",
    "Recipe Variant Content",
    "Steps Part 1",
];

/// Treats an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A string in English and Dutch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub en: String,
    #[serde(rename = "nl_NL")]
    pub nl: String,
}

impl LocalizedText {
    pub fn new(en: impl Into<String>, nl: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            nl: nl.into(),
        }
    }

    /// Both locales carry non-whitespace text.
    pub fn is_complete(&self) -> bool {
        !self.en.trim().is_empty() && !self.nl.trim().is_empty()
    }
}

/// The closed set of measurement units an ingredient may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricUnit {
    Amount,
    Can,
    Cup,
    Degrees,
    Gram,
    Kilogram,
    Liter,
    Milligram,
    Milliliter,
    Tablespoon,
    Teaspoon,
}

impl MetricUnit {
    pub const ALL: [MetricUnit; 11] = [
        MetricUnit::Amount,
        MetricUnit::Can,
        MetricUnit::Cup,
        MetricUnit::Degrees,
        MetricUnit::Gram,
        MetricUnit::Kilogram,
        MetricUnit::Liter,
        MetricUnit::Milligram,
        MetricUnit::Milliliter,
        MetricUnit::Tablespoon,
        MetricUnit::Teaspoon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricUnit::Amount => "Amount",
            MetricUnit::Can => "Can",
            MetricUnit::Cup => "Cup",
            MetricUnit::Degrees => "Degrees",
            MetricUnit::Gram => "Gram",
            MetricUnit::Kilogram => "Kilogram",
            MetricUnit::Liter => "Liter",
            MetricUnit::Milligram => "Milligram",
            MetricUnit::Milliliter => "Milliliter",
            MetricUnit::Tablespoon => "Tablespoon",
            MetricUnit::Teaspoon => "Teaspoon",
        }
    }

    /// Exact, case-sensitive match against the canonical labels.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|unit| unit.as_str() == label)
    }

    /// Case-insensitive match against the canonical labels.
    pub fn from_label_ignore_case(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|unit| unit.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Intermediate,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Intermediate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Intermediate => "Intermediate",
        }
    }
}

/// A named preparation style of the same dish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariantCategory {
    Meat,
    Vegetarian,
    Vegan,
    Fish,
    Other,
}

impl VariantCategory {
    pub const ALL: [VariantCategory; 5] = [
        VariantCategory::Meat,
        VariantCategory::Vegetarian,
        VariantCategory::Vegan,
        VariantCategory::Fish,
        VariantCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantCategory::Meat => "Meat",
            VariantCategory::Vegetarian => "Vegetarian",
            VariantCategory::Vegan => "Vegan",
            VariantCategory::Fish => "Fish",
            VariantCategory::Other => "Other",
        }
    }
}

impl fmt::Display for VariantCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-serving nutrition, always whole non-negative numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutritionalValues {
    #[serde(rename = "Energie (kCal)")]
    pub energy_kcal: u32,
    #[serde(rename = "Protein (grams)")]
    pub protein_grams: u32,
    #[serde(rename = "Carbohydrates (grams)")]
    pub carbohydrates_grams: u32,
    #[serde(rename = "Sugar (grams)")]
    pub sugar_grams: u32,
    #[serde(rename = "Fat (grams)")]
    pub fat_grams: u32,
    #[serde(rename = "Saturated Fat (grams)")]
    pub saturated_fat_grams: u32,
    #[serde(rename = "Natrium (milligrams)")]
    pub sodium_milligrams: u32,
    #[serde(rename = "Fibers (grams)")]
    pub fiber_grams: u32,
}

impl NutritionalValues {
    /// Wire labels of the eight nutrition fields, in schema order.
    pub const FIELDS: [&'static str; 8] = [
        "Energie (kCal)",
        "Protein (grams)",
        "Carbohydrates (grams)",
        "Sugar (grams)",
        "Fat (grams)",
        "Saturated Fat (grams)",
        "Natrium (milligrams)",
        "Fibers (grams)",
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantContent {
    #[serde(rename = "Recipe Variant")]
    pub recipe_variant: VariantCategory,
    #[serde(rename = "Recipe Image", default)]
    pub recipe_image: Option<String>,
    #[serde(rename = "Recipe Name")]
    pub recipe_name: LocalizedText,
    #[serde(rename = "Description", default)]
    pub description: Option<LocalizedText>,
    #[serde(rename = "Diet/Allergen 01", default)]
    pub diet_allergen_01: Option<String>,
    #[serde(rename = "Diet/Allergen 02", default)]
    pub diet_allergen_02: Option<String>,
    #[serde(rename = "Tag", default)]
    pub tag: Option<String>,
    #[serde(rename = "Difficulty")]
    pub difficulty: Difficulty,
    #[serde(rename = "Nutritional Values")]
    pub nutritional_values: NutritionalValues,
    #[serde(rename = "Shopping List", default, deserialize_with = "nullable")]
    pub shopping_list: Vec<String>,
    #[serde(rename = "Sponsor", default)]
    pub sponsor: Option<String>,
    #[serde(rename = "Preview Video", default)]
    pub preview_video: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(rename = "Ingredient")]
    pub ingredient: String,
    #[serde(rename = "Amount")]
    pub amount: f64,
    #[serde(rename = "Metric Unit")]
    pub metric_unit: MetricUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "Display Name", default)]
    pub display_name: Option<LocalizedText>,
    #[serde(rename = "Action", default)]
    pub action: Option<LocalizedText>,
    #[serde(rename = "Step Number", default)]
    pub step_number: Option<String>,
    #[serde(rename = "Step Name (Editor)", default)]
    pub step_name_editor: Option<String>,
    #[serde(rename = "Workplace")]
    pub workplace: String,
    #[serde(rename = "Step Icon")]
    pub step_icon: String,
    #[serde(rename = "Instructions")]
    pub instructions: LocalizedText,
    #[serde(rename = "Instructions Markdown", default)]
    pub instructions_markdown: Option<LocalizedText>,
    #[serde(rename = "Appliances", default, deserialize_with = "nullable")]
    pub appliances: Vec<String>,
    #[serde(rename = "Ingredient", default, deserialize_with = "nullable")]
    pub ingredient: Vec<Ingredient>,
    /// Step duration; zero or negative values are reported by the quality check.
    #[serde(rename = "Duration")]
    pub duration: i64,
    #[serde(rename = "Count Down", default, deserialize_with = "nullable")]
    pub count_down: Vec<String>,
    #[serde(rename = "Trigger Countdown Step", default)]
    pub trigger_countdown_step: Option<String>,
    #[serde(rename = "Video", default)]
    pub video: Option<String>,
    #[serde(rename = "Thumbnail", default)]
    pub thumbnail: Option<String>,
    #[serde(rename = "RecipeVariant")]
    pub recipe_variant: Vec<String>,
}

/// The terminal artifact: one validated SousChef recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(rename = "Order")]
    pub order: u32,
    #[serde(rename = "Generic Name")]
    pub generic_name: LocalizedText,
    #[serde(rename = "Highlighted?", default, deserialize_with = "nullable")]
    pub highlighted: bool,
    #[serde(rename = "Recipe Variant Content")]
    pub recipe_variant_content: Vec<VariantContent>,
    #[serde(rename = "Steps Part 1")]
    pub steps_part_1: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// First-pass reading of a recipe, used as context by every later stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub ingredients: Vec<String>,
    pub tools: Vec<String>,
    pub cooking_time: String,
    pub complexity: Complexity,
}

/// Where a piece of recipe text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Upload,
    Url,
    Text,
}

/// Raw recipe text as supplied by a caller, with a display name.
#[derive(Debug, Clone)]
pub struct RecipeInput {
    pub name: String,
    pub text: String,
    pub source: InputKind,
}

impl RecipeInput {
    pub fn new(name: impl Into<String>, text: impl Into<String>, source: InputKind) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            source,
        }
    }
}
