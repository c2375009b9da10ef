//! Recovery of JSON payloads from raw model output.
//!
//! Models wrap JSON in markdown fences, prepend chatter, leave raw line breaks
//! inside string values and add trailing commas. [`extract_json_payload`] undoes
//! those defects in a fixed order and fails fast on output that was cut off.

use log::debug;
use serde_json::Value;
use thiserror::Error;

const SNIPPET_CHARS: usize = 1000;

/// Errors raised when no usable payload can be recovered
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    /// No JSON object or array could be located
    #[error("Model output did not contain valid JSON.")]
    NoJson,

    /// Unbalanced braces or an unterminated string
    #[error("Model output appears truncated or malformed.")]
    Truncated,

    /// JSON was located but could not be parsed even after repairs
    #[error(
        "JSON parsing failed at line {line}, column {column}: {message}\n\n\
         Problematic JSON (first 1000 chars):\n{snippet}"
    )]
    Malformed {
        line: usize,
        column: usize,
        message: String,
        snippet: String,
    },

    /// The payload parsed but has the wrong top-level keys
    #[error(
        "Wrong JSON structure returned. Expected fields: {expected:?}\n\
         But got: {actual:?}\n\
         The model may have generated a different recipe format instead of SousChef format."
    )]
    WrongStructure {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// The payload parsed but is not the JSON type the caller needs
    #[error("Expected a JSON {expected} but the model returned {found}.")]
    UnexpectedShape {
        expected: &'static str,
        found: &'static str,
    },
}

/// Extract a JSON payload from model output.
///
/// Tries, in order: the text verbatim, the contents of a markdown code fence,
/// and the outermost `{...}` span. The outermost `[...]` span is only used
/// when there is no object span or the object span does not parse. A span is
/// rejected outright when it looks truncated; otherwise raw control characters
/// inside strings are escaped and, failing that, trailing commas are removed.
///
/// When `required_keys` is non-empty the payload must be an object containing
/// every one of them.
pub fn extract_json_payload(text: &str, required_keys: &[&str]) -> Result<Value, ExtractError> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return check_required_keys(value, required_keys);
    }

    let unfenced = strip_code_fence(text);
    let object = json_span(unfenced, '{', '}');
    let array = json_span(unfenced, '[', ']');

    let parsed = match (object, array) {
        (None, None) => return Err(ExtractError::NoJson),
        (Some(span), None) | (None, Some(span)) => parse_span(span),
        (Some(object), Some(array)) => match parse_span(object) {
            Err(err @ ExtractError::Malformed { .. }) => {
                debug!("Object span did not parse, trying the array span: {}", err);
                parse_span(array).map_err(|_| err)
            }
            other => other,
        },
    };
    check_required_keys(parsed?, required_keys)
}

/// Parse one candidate span: fail fast on truncation, escape raw control
/// characters, then retry once without trailing commas.
fn parse_span(candidate: &str) -> Result<Value, ExtractError> {
    if is_truncated_json(candidate) {
        return Err(ExtractError::Truncated);
    }

    let sanitized = sanitize_json_string(candidate);
    match serde_json::from_str::<Value>(&sanitized) {
        Ok(value) => Ok(value),
        Err(err) => {
            debug!("Retrying JSON parse without trailing commas: {}", err);
            let fixed = strip_trailing_commas(&sanitized);
            serde_json::from_str::<Value>(&fixed).map_err(|_| ExtractError::Malformed {
                line: err.line(),
                column: err.column(),
                message: err.to_string(),
                snippet: sanitized.chars().take(SNIPPET_CHARS).collect(),
            })
        }
    }
}

/// Extract a payload that must be a JSON object.
pub fn extract_json_object(
    text: &str,
    required_keys: &[&str],
) -> Result<serde_json::Map<String, Value>, ExtractError> {
    match extract_json_payload(text, required_keys)? {
        Value::Object(map) => Ok(map),
        other => Err(ExtractError::UnexpectedShape {
            expected: "object",
            found: json_type_name(&other),
        }),
    }
}

fn check_required_keys(value: Value, required_keys: &[&str]) -> Result<Value, ExtractError> {
    if required_keys.is_empty() {
        return Ok(value);
    }

    let actual: Vec<String> = match &value {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    };
    let missing = required_keys
        .iter()
        .any(|key| !actual.iter().any(|actual_key| actual_key == key));

    if missing {
        return Err(ExtractError::WrongStructure {
            expected: required_keys.iter().map(|key| key.to_string()).collect(),
            actual,
        });
    }
    Ok(value)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Return the body of the first markdown code fence, or the text unchanged.
pub fn strip_code_fence(text: &str) -> &str {
    let start = if let Some(pos) = text.find("```json") {
        pos + "```json".len()
    } else if let Some(pos) = text.find("```") {
        pos + "```".len()
    } else {
        return text;
    };

    match text[start..].find("```") {
        Some(end) => {
            debug!("Stripped markdown code fence from model output");
            text[start..start + end].trim()
        }
        None => text,
    }
}

/// Slice from the first `open` to the last `close`.
fn json_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Detect JSON that was cut off mid-generation.
///
/// Scans the text tracking string and escape state; any string left open, or
/// a brace or bracket count that does not return to zero, marks it truncated.
pub fn is_truncated_json(text: &str) -> bool {
    let stripped = text.trim();
    if stripped.is_empty() {
        return false;
    }
    if !stripped.ends_with('}') && !stripped.ends_with(']') {
        return true;
    }

    let mut brace: i64 = 0;
    let mut bracket: i64 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for ch in stripped.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            '{' => brace += 1,
            '}' => brace -= 1,
            '[' => bracket += 1,
            ']' => bracket -= 1,
            _ => {}
        }
    }

    in_string || brace != 0 || bracket != 0
}

/// Escape raw newlines, carriage returns, tabs and other control characters
/// that appear inside string values.
///
/// Existing escape sequences, escaped backslashes included, pass through
/// untouched, and nothing outside string values is rewritten.
pub fn sanitize_json_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut rewritten = 0usize;

    for ch in text.chars() {
        if !in_string {
            if ch == '"' {
                in_string = true;
            }
            out.push(ch);
            continue;
        }

        if escaped {
            escaped = false;
            out.push(ch);
            continue;
        }

        match ch {
            '\\' => {
                escaped = true;
                out.push(ch);
            }
            '"' => {
                in_string = false;
                out.push(ch);
            }
            '\n' => {
                rewritten += 1;
                out.push_str("\\n");
            }
            '\r' => {
                rewritten += 1;
                out.push_str("\\r");
            }
            '\t' => {
                rewritten += 1;
                out.push_str("\\t");
            }
            c if (c as u32) < 0x20 => {
                rewritten += 1;
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }

    if rewritten > 0 {
        debug!("Escaped {} raw control characters inside JSON strings", rewritten);
    }
    out
}

/// Drop commas that directly precede a closing brace or bracket.
pub fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (index, &ch) in chars.iter().enumerate() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
            out.push(ch);
            continue;
        }

        if ch == ',' {
            let next = chars[index + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(ch);
    }

    out
}
