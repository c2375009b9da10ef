//! Recipe text from pasted input and local documents.

use std::path::Path;

use log::debug;

use crate::error::TransformError;
use crate::model::{InputKind, RecipeInput};

/// Trimmed pasted text; blank input is rejected.
pub fn read_text_input(text: &str) -> Result<String, TransformError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TransformError::EmptyInput);
    }
    Ok(trimmed.to_string())
}

/// Read a recipe document from disk.
///
/// Only `.txt` files are read here, decoded as UTF-8 with invalid bytes
/// replaced. Other formats fail with [`TransformError::UnsupportedDocument`].
pub async fn load_document(path: &Path) -> Result<RecipeInput, TransformError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if extension != "txt" {
        let shown = if extension.is_empty() {
            path.display().to_string()
        } else {
            format!(".{}", extension)
        };
        return Err(TransformError::UnsupportedDocument(shown));
    }

    let bytes = tokio::fs::read(path).await?;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    debug!("Read {} chars from {}", text.chars().count(), path.display());

    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("Recipe")
        .to_string();
    Ok(RecipeInput::new(name, text, InputKind::Upload))
}
