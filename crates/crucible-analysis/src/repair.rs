//! Best-effort repair of observer grading output.
//!
//! LLM grading text is frequently almost-JSON: fenced in markdown, wrapped in
//! prose, carrying trailing commas or single quotes. The chain here tries a
//! strict parse first and degrades through progressively more permissive
//! passes. It never panics and never produces a non-numeric score; a total
//! failure returns `None` and the caller records a parse-error evaluation
//! carrying the raw text.

use crucible_core::evaluation::GENERAL_CATEGORY;
use once_cell::sync::Lazy;
use regex::Regex;

/// A grade successfully extracted from observer output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEvaluation {
    /// Rubric category; the synthetic default when the rubric gave none.
    pub category: String,
    /// Score clamped to the canonical 0-10 scale.
    pub score: f64,
    /// The observer's reasoning.
    pub reasoning: String,
    /// The observer's confidence in its own grade, clamped to 0.0-1.0.
    pub confidence: f64,
}

static JSON_BLOCK: Lazy<Regex> = Lazy::new(|| {
    // Greedy: grabs the outermost top-level object after newline flattening.
    Regex::new(r"\{.*\}").unwrap_or_else(|_| unreachable!("static regex is valid"))
});

static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r",\s*([}\]])").unwrap_or_else(|_| unreachable!("static regex is valid"))
});

/// Runs the repair chain over raw grading text.
pub fn repair_and_parse(raw: &str) -> Option<ParsedEvaluation> {
    let cleaned = strip_fences(raw);

    for candidate in candidates(&cleaned) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&candidate) {
            if let Some(parsed) = fields_from(&value) {
                return Some(parsed);
            }
        }
    }

    None
}

/// Progressively more permissive rewrites of the cleaned text, strictest
/// first.
fn candidates(cleaned: &str) -> Vec<String> {
    let mut out = vec![cleaned.to_string()];

    let flattened = cleaned.replace('\n', " ");
    if let Some(m) = JSON_BLOCK.find(&flattened) {
        out.push(m.as_str().to_string());
    }

    let mut repaired: Vec<String> = out
        .iter()
        .map(|c| TRAILING_COMMA.replace_all(c, "$1").into_owned())
        .collect();
    out.append(&mut repaired);

    // Last resort: single-quoted pseudo-JSON.
    let requoted: Vec<String> = out.iter().map(|c| c.replace('\'', "\"")).collect();
    out.extend(requoted);

    out
}

/// Strips markdown code fences, keeping only the fenced body when present.
fn strip_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.contains("```") {
        return trimmed.to_string();
    }

    let after_open = match trimmed.split_once("```") {
        Some((_, rest)) => rest,
        None => trimmed,
    };
    // Drop an optional language tag on the fence line.
    let body = after_open
        .strip_prefix("json")
        .unwrap_or(after_open)
        .trim_start_matches(['\r', '\n']);
    match body.split_once("```") {
        Some((inner, _)) => inner.trim().to_string(),
        None => body.trim().to_string(),
    }
}

fn fields_from(value: &serde_json::Value) -> Option<ParsedEvaluation> {
    let object = value.as_object()?;

    let score = number_field(object, "score").or_else(|| number_field(object, "rating"))?;

    let reasoning = ["reasoning", "notes", "reason"]
        .iter()
        .find_map(|key| object.get(*key).and_then(|v| v.as_str()))
        .unwrap_or("No reasoning provided.")
        .to_string();

    let category = object
        .get("category")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(GENERAL_CATEGORY)
        .to_string();

    let confidence = number_field(object, "confidence")
        .unwrap_or(1.0)
        .clamp(0.0, 1.0);

    Some(ParsedEvaluation {
        category,
        score: score.clamp(0.0, 10.0),
        reasoning,
        confidence,
    })
}

/// Reads a numeric field, tolerating numbers quoted as strings.
fn number_field(object: &serde_json::Map<String, serde_json::Value>, key: &str) -> Option<f64> {
    match object.get(key)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
