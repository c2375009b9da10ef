//! Deterministic fallback for recipe text that is still too long after condensing.

/// Share of the budget that must be used before a line is cut instead of dropped.
const MIN_FILL_RATIO: f64 = 0.8;
/// Characters kept free when a line is cut.
const CUT_MARGIN: usize = 10;
/// A cut line shorter than this is dropped instead.
const MIN_CUT_CHARS: usize = 20;

/// Shorten `text` to at most `limit` characters without another oracle call.
///
/// Whole lines are kept while they fit. If less than 80% of the budget is used
/// when a line no longer fits, that line is cut and marked with `...`; either
/// way nothing after it is kept.
pub fn truncate_to_budget(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }

    let mut kept: Vec<String> = Vec::new();
    let mut used = 0usize;

    for line in text.split('\n') {
        let cost = line.chars().count() + 1;
        if used + cost <= limit {
            kept.push(line.to_string());
            used += cost;
            continue;
        }
        if (used as f64) < limit as f64 * MIN_FILL_RATIO {
            let remaining = limit.saturating_sub(used).saturating_sub(CUT_MARGIN);
            if remaining > MIN_CUT_CHARS {
                let cut: String = line.chars().take(remaining).collect();
                kept.push(format!("{}...", cut));
            }
        }
        break;
    }

    kept.join("\n")
}
