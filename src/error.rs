use thiserror::Error;

use crate::extraction::ExtractError;

/// Errors that can occur while transforming a recipe
#[derive(Error, Debug)]
pub enum TransformError {
    /// No recipe text was supplied
    #[error("Missing recipe text input.")]
    EmptyInput,

    /// Recipe text is larger than the configured ceiling
    #[error(
        "Recipe text exceeds configured limit. Length: {length} chars, limit: {limit} chars. \
         Trim the input or split the recipe into smaller parts."
    )]
    RecipeTooLarge { length: usize, limit: usize },

    /// A formatted prompt is larger than the configured ceiling
    #[error(
        "Prompt size exceeds configured limit. Length: {length} chars, limit: {limit} chars. \
         Reduce the recipe text or simplify the request."
    )]
    PromptTooLarge { length: usize, limit: usize },

    /// The provider kept throttling after every retry
    #[error("Rate limit reached. Please retry shortly.")]
    RateLimited,

    /// A streamed response grew past the configured ceiling
    #[error(
        "LLM response exceeded the configured size limit. Length: {length} chars, limit: {limit} chars. \
         Reduce output size (lower max tokens) or simplify the request."
    )]
    ResponseTooLarge { length: usize, limit: usize },

    /// The provider failed with a non-throttling error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Model output could not be turned into a JSON payload
    #[error(transparent)]
    Extraction(#[from] ExtractError),

    /// The analysis response did not match its schema
    #[error("Recipe analysis failed: {0}")]
    Analysis(String),

    /// A payload could not be coerced into the recipe model
    #[error("Schema validation failed: {0}")]
    Schema(String),

    /// Failed to fetch a recipe page
    #[error("Failed to fetch URL: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Could not find recipe text on a fetched page
    #[error("Could not extract recipe text from this URL.")]
    NoRecipeText,

    /// A recipe could not be rendered as JSON
    #[error("Failed to serialize recipe: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing a file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Only plain text documents are read directly
    #[error("Unsupported file type: {0}")]
    UnsupportedDocument(String),

    /// Builder configuration error
    #[error("Builder error: {0}")]
    BuilderError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    /// The workflow was started without an oracle to generate with
    #[error("LLM configuration is required for condensing recipe text.")]
    OracleNotConfigured,
}

impl TransformError {
    /// Whether the error came from the caller's input rather than the oracle.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            TransformError::EmptyInput
                | TransformError::RecipeTooLarge { .. }
                | TransformError::PromptTooLarge { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_too_large_names_both_lengths() {
        let err = TransformError::PromptTooLarge {
            length: 6,
            limit: 5,
        };
        let message = err.to_string();
        assert!(message.contains("Prompt size exceeds configured limit"));
        assert!(message.contains("Length: 6 chars"));
        assert!(message.contains("limit: 5 chars"));
    }

    #[test]
    fn test_input_error_classification() {
        assert!(TransformError::EmptyInput.is_input_error());
        assert!(TransformError::RecipeTooLarge {
            length: 10,
            limit: 1
        }
        .is_input_error());
        assert!(!TransformError::RateLimited.is_input_error());
        assert!(!TransformError::Schema("bad".to_string()).is_input_error());
    }
}
