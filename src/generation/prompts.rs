//! Prompt templates for every oracle call.
//!
//! The templates live in `prompts/*.txt` and are embedded at compile time with
//! `include_str!`. Placeholders are written `{{NAME}}` and filled by [`render`].

pub const CONDENSE_PROMPT: &str = include_str!("prompts/condense.txt");
pub const ANALYZE_PROMPT: &str = include_str!("prompts/analyze.txt");
pub const METADATA_PROMPT: &str = include_str!("prompts/metadata.txt");
pub const OUTLINE_PROMPT: &str = include_str!("prompts/outline.txt");
pub const STEP_PROMPT: &str = include_str!("prompts/step.txt");
pub const REPAIR_PROMPT: &str = include_str!("prompts/repair.txt");

/// Fill `{{NAME}}` placeholders in a single pass.
///
/// Substituted values are never scanned again, so recipe text that happens to
/// contain `{{...}}` is passed through verbatim. Unknown placeholders are kept.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match vars.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}
