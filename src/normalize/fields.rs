//! Field-name synonyms and value coercion for AI-authored output.

use crate::models::MAX_SCORE;
use serde_json::Value;

/// Canonical slot a page-level key maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageField {
    Url,
    Title,
    Scores,
    Score(&'static str),
    Feedback,
    CriticalIssues,
    Recommendations,
    PositiveAspects,
    Review,
    Degraded,
    Partial,
    Error,
    Extra,
}

/// Canonical slot a site-narrative key maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrativeField {
    Strengths,
    CriticalIssues,
    Recommendations,
    Assessment,
}

/// Lowercase snake_case form of a key: `overallScore`, `Overall Score` and
/// `overall-score` all become `overall_score`.
pub fn canonical_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for ch in key.trim().chars() {
        if ch.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else if ch == ' ' || ch == '-' {
            if !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

pub fn page_field(key: &str) -> Option<PageField> {
    if let Some(score) = score_key(key) {
        return Some(PageField::Score(score));
    }
    let field = match canonical_key(key).as_str() {
        "url" | "page_url" | "link" | "href" => PageField::Url,
        "title" | "page_title" | "name" => PageField::Title,
        "scores" => PageField::Scores,
        "feedback" | "summary" | "comments" | "assessment" => PageField::Feedback,
        "critical_issues" | "issues" | "problems" => PageField::CriticalIssues,
        "recommendations" | "suggestions" | "improvements" => PageField::Recommendations,
        "positive_aspects" | "strengths" | "positives" => PageField::PositiveAspects,
        "review" => PageField::Review,
        "degraded" => PageField::Degraded,
        "partial" | "partial_result" => PageField::Partial,
        "error" => PageField::Error,
        "extra" => PageField::Extra,
        _ => return None,
    };
    Some(field)
}

/// Canonical score key for a synonym, if any.
pub fn score_key(key: &str) -> Option<&'static str> {
    let key = match canonical_key(key).as_str() {
        "overall" | "score" | "overall_score" | "rating" => "overall",
        "content_quality" | "content" => "content_quality",
        "structure_organization"
        | "structure"
        | "organization"
        | "structure_and_organization" => "structure_organization",
        "user_experience" | "ux" => "user_experience",
        "technical_accuracy" | "technical" | "accuracy" => "technical_accuracy",
        _ => return None,
    };
    Some(key)
}

pub fn narrative_field(key: &str) -> Option<NarrativeField> {
    let field = match canonical_key(key).as_str() {
        "site_strengths" | "strengths" => NarrativeField::Strengths,
        "critical_site_issues" | "critical_issues" => NarrativeField::CriticalIssues,
        "priority_recommendations" | "recommendations" | "strategic_recommendations" => {
            NarrativeField::Recommendations
        }
        "overall_assessment" | "assessment" | "summary" => NarrativeField::Assessment,
        _ => return None,
    };
    Some(field)
}

/// Result of reading one score value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreValue {
    Valid(u8),
    Absent,
    /// Present but not a usable score on the 0-10 scale.
    Rejected,
}

/// Read a score from a number or a numeric string such as `"7"`, `"7.5"` or `"7/10"`.
pub fn coerce_score(value: &Value) -> ScoreValue {
    let number = match value {
        Value::Null => return ScoreValue::Absent,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return ScoreValue::Absent;
            }
            let head = s.split('/').next().unwrap_or(s).trim();
            head.parse::<f64>().ok()
        }
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() && n >= 0.0 && n <= MAX_SCORE as f64 => {
            ScoreValue::Valid(n.round() as u8)
        }
        _ => ScoreValue::Rejected,
    }
}

/// A list of non-empty strings from an array, a single string, or an object of lists.
pub fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => non_empty(s).into_iter().collect(),
        Value::Array(items) => items.iter().filter_map(item_text).collect(),
        Value::Object(map) => map.values().flat_map(string_list).collect(),
        _ => Vec::new(),
    }
}

fn item_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Null => None,
        Value::Object(map) => ["issue", "text", "description", "title"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .and_then(non_empty)
            .or_else(|| Some(value.to_string())),
        other => Some(other.to_string()),
    }
}

/// Free text from a string, a per-dimension object, or a list.
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Array(_) => {
            let lines = string_list(value);
            (!lines.is_empty()).then(|| lines.join("\n"))
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by_key(|key| {
                let rank = score_key(key)
                    .and_then(|canonical| {
                        crate::models::PageScores::KEYS
                            .iter()
                            .position(|k| *k == canonical)
                    })
                    .unwrap_or(usize::MAX);
                (rank, (*key).clone())
            });
            let lines: Vec<String> = keys
                .into_iter()
                .filter_map(|key| text(&map[key]).map(|t| format!("{}: {}", key, t)))
                .collect();
            (!lines.is_empty()).then(|| lines.join("\n"))
        }
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Append items not already present, preserving order.
pub fn extend_unique(target: &mut Vec<String>, items: Vec<String>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}
