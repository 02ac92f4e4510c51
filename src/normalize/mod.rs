//! Coercion of loosely-structured agent output into the canonical schema.
//!
//! Decoding order is strict JSON first, then the first embedded block in
//! the text. Individual pages never fail: they degrade to a flagged record
//! with a diagnostic note. Only site, discovery and synthesis responses that
//! cannot be decoded at all are errors.

pub mod extract;
pub mod fields;

use crate::error::{Result, ReviewError};
use crate::models::{Narrative, PageReview};
use crate::remote::{RawOutput, RawResult};
use fields::{NarrativeField, PageField, ScoreValue};
use serde_json::{Map, Value};
use tracing::debug;

const EXCERPT_CHARS: usize = 200;

/// How a raw result was decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Strict(Value),
    Embedded(Value),
    Undecodable(String),
}

impl Decoded {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Decoded::Strict(v) | Decoded::Embedded(v) => Some(v),
            Decoded::Undecodable(_) => None,
        }
    }
}

pub fn decode(raw: &RawResult) -> Decoded {
    match &raw.output {
        RawOutput::Json(Value::String(text)) => decode_text(text),
        RawOutput::Json(value) => Decoded::Strict(value.clone()),
        RawOutput::Text(text) => decode_text(text),
    }
}

fn decode_text(text: &str) -> Decoded {
    if text.trim().is_empty() {
        return Decoded::Undecodable("empty output".to_string());
    }
    if let Some(value) = extract::strict(text) {
        // A JSON string holding JSON, as some agents double-encode.
        if let Value::String(inner) = &value {
            return decode_text(inner);
        }
        return Decoded::Strict(value);
    }
    match extract::first_embedded(text) {
        Some(value) => Decoded::Embedded(value),
        None => Decoded::Undecodable(extract::excerpt(text, EXCERPT_CHARS)),
    }
}

/// Normalize the result of a single-page review task. The record always
/// carries `url`, even when the remote reported a different one.
pub fn normalize_page(raw: &RawResult, url: &str) -> PageReview {
    let mut review = match decode(raw) {
        Decoded::Undecodable(excerpt) => {
            debug!(url, task_id = %raw.task_id, "Page output could not be decoded");
            PageReview::degraded(url, format!("could not parse review output: {}", excerpt))
        }
        Decoded::Strict(value) | Decoded::Embedded(value) => match single_object(value) {
            Some(value) => page_from_value(&value, url),
            None => PageReview::degraded(url, "review output was not an object"),
        },
    };

    if review.url != url {
        let reported = std::mem::replace(&mut review.url, url.to_string());
        if !reported.is_empty() {
            review.extra.insert("reported_url".to_string(), Value::String(reported));
        }
    }
    review.partial |= raw.partial;
    review
}

fn single_object(value: Value) -> Option<Value> {
    match value {
        Value::Object(_) => Some(value),
        Value::Array(mut items) if items.len() == 1 && items[0].is_object() => items.pop(),
        _ => None,
    }
}

/// Normalize one page object. `fallback_url` is used when the object has no URL.
/// Canonical output fed back in yields the same record.
pub fn page_from_value(value: &Value, fallback_url: &str) -> PageReview {
    let Value::Object(map) = value else {
        return PageReview::degraded(fallback_url, "page entry was not an object");
    };

    let mut builder = PageBuilder::default();
    builder.absorb(map, true);

    let mut review = builder.review;
    if review.url.is_empty() {
        review.url = fallback_url.to_string();
    }

    if review.degraded {
        if !review.scores.is_empty() {
            let discarded = serde_json::to_value(&review.scores).unwrap_or(Value::Null);
            review.extra.insert("discarded_scores".to_string(), discarded);
            review.scores = Default::default();
        }
    } else if review.scores.is_empty() {
        review.degraded = true;
        let note = "no scores found in review output".to_string();
        if review.feedback.is_none() {
            review.feedback = Some(format!("Review unavailable: {}", note));
        }
        review.error.get_or_insert(note);
    }

    if review.degraded && review.feedback.is_none() {
        let note = review.error.clone().unwrap_or_else(|| "unknown error".to_string());
        review.feedback = Some(format!("Review unavailable: {}", note));
    }

    review
}

#[derive(Default)]
struct PageBuilder {
    review: PageReview,
    rejected: Map<String, Value>,
    other_scores: Map<String, Value>,
}

impl PageBuilder {
    fn absorb(&mut self, map: &Map<String, Value>, top_level: bool) {
        // Nested scores take precedence over top-level synonyms.
        if let Some(scores) = map.iter().find(|(k, _)| page_field(k) == Some(PageField::Scores)) {
            self.absorb_scores(scores.1);
        }

        let mut nested_review = None;
        for (key, value) in map {
            match page_field(key) {
                Some(PageField::Scores) => {}
                Some(PageField::Score(canonical)) => self.score(key, canonical, value),
                Some(PageField::Url) => match value.as_str().map(str::trim) {
                    Some(url) if !url.is_empty() && self.review.url.is_empty() => {
                        self.review.url = url.to_string();
                    }
                    _ if value.is_null() => {}
                    _ => self.keep(key, value),
                },
                Some(PageField::Title) => match fields::text(value) {
                    Some(title) if self.review.title.is_none() => self.review.title = Some(title),
                    None if value.is_null() => {}
                    _ => self.keep(key, value),
                },
                Some(PageField::Feedback) => match fields::text(value) {
                    Some(text) if self.review.feedback.is_none() => {
                        self.review.feedback = Some(text)
                    }
                    None if value.is_null() => {}
                    _ => self.keep(key, value),
                },
                Some(PageField::CriticalIssues) => {
                    fields::extend_unique(&mut self.review.critical_issues, fields::string_list(value))
                }
                Some(PageField::Recommendations) => {
                    fields::extend_unique(&mut self.review.recommendations, fields::string_list(value))
                }
                Some(PageField::PositiveAspects) => {
                    fields::extend_unique(&mut self.review.positive_aspects, fields::string_list(value))
                }
                Some(PageField::Review) if top_level && value.is_object() => {
                    nested_review = value.as_object();
                }
                Some(PageField::Degraded) => {
                    self.review.degraded |= value.as_bool().unwrap_or(false)
                }
                Some(PageField::Partial) => self.review.partial |= value.as_bool().unwrap_or(false),
                // Only a non-empty message marks the page as failed.
                Some(PageField::Error) => match value {
                    Value::String(error) if !error.trim().is_empty() => {
                        self.review.degraded = true;
                        self.review.error.get_or_insert_with(|| error.trim().to_string());
                    }
                    Value::Null | Value::Bool(false) => {}
                    _ => self.keep(key, value),
                },
                Some(PageField::Extra) => match value {
                    Value::Object(extra) => {
                        for (k, v) in extra {
                            self.review.extra.entry(k.clone()).or_insert_with(|| v.clone());
                        }
                    }
                    _ => self.keep(key, value),
                },
                _ => self.keep(key, value),
            }
        }

        if let Some(nested) = nested_review {
            self.absorb(nested, false);
        }

        if top_level {
            if !self.other_scores.is_empty() {
                let other = std::mem::take(&mut self.other_scores);
                merge_object(&mut self.review.extra, "other_scores", other);
            }
            if !self.rejected.is_empty() {
                let rejected = std::mem::take(&mut self.rejected);
                merge_object(&mut self.review.extra, "rejected_scores", rejected);
            }
        }
    }

    fn absorb_scores(&mut self, value: &Value) {
        match value {
            Value::Object(scores) => {
                for (key, score) in scores {
                    match fields::score_key(key) {
                        Some(canonical) => self.score(key, canonical, score),
                        None => {
                            self.other_scores.insert(key.clone(), score.clone());
                        }
                    }
                }
            }
            other => self.score("scores", "overall", other),
        }
    }

    fn score(&mut self, key: &str, canonical: &'static str, value: &Value) {
        match fields::coerce_score(value) {
            ScoreValue::Valid(score) => {
                if self.review.scores.get(canonical).is_some() {
                    self.keep(key, value);
                } else {
                    self.review.scores.set(canonical, score);
                }
            }
            ScoreValue::Absent => {}
            ScoreValue::Rejected => {
                self.rejected.insert(key.to_string(), value.clone());
            }
        }
    }

    fn keep(&mut self, key: &str, value: &Value) {
        self.review
            .extra
            .entry(key.to_string())
            .or_insert_with(|| value.clone());
    }
}

fn page_field(key: &str) -> Option<PageField> {
    fields::page_field(key)
}

fn merge_object(target: &mut Map<String, Value>, key: &str, entries: Map<String, Value>) {
    let slot = target
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(existing) = slot {
        for (k, v) in entries {
            existing.entry(k).or_insert(v);
        }
    }
}

/// Decoded output of a one-shot site review task.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteOutcome {
    /// Normalized pages, in the order the remote listed them.
    pub pages: Vec<PageReview>,
    /// Page count the remote claims to have discovered, if it said.
    pub reported_discovered: Option<usize>,
    pub narrative: Option<Narrative>,
    /// Top-level fields with no canonical slot.
    pub extra: Map<String, Value>,
}

/// Normalize an aggregate site response. Fails only when nothing structured
/// can be decoded.
pub fn normalize_site(raw: &RawResult) -> Result<SiteOutcome> {
    let value = match decode(raw) {
        Decoded::Undecodable(excerpt) => {
            return Err(ReviewError::normalization("site review", excerpt));
        }
        Decoded::Strict(v) | Decoded::Embedded(v) => v,
    };

    let map = match value {
        Value::Object(map) => map,
        // A bare list of pages.
        Value::Array(items) => {
            let mut map = Map::new();
            map.insert("page_reviews".to_string(), Value::Array(items));
            map
        }
        other => {
            return Err(ReviewError::normalization(
                "site review",
                format!("expected an object, got {}", json_kind(&other)),
            ))
        }
    };

    let mut outcome = SiteOutcome {
        pages: Vec::new(),
        reported_discovered: None,
        narrative: None,
        extra: Map::new(),
    };

    for (key, value) in &map {
        match fields::canonical_key(key).as_str() {
            "page_reviews" | "pages" | "reviews" if value.is_array() => {
                let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
                for (index, item) in items.iter().enumerate() {
                    let fallback = format!("unknown page {}", index + 1);
                    outcome.pages.push(page_from_value(item, &fallback));
                }
            }
            "site_analysis" | "overall_review" | "analysis" if value.is_object() => {
                if outcome.narrative.is_none() {
                    outcome.narrative = Some(narrative_from_value(value));
                }
            }
            "total_pages_discovered" => {
                outcome.reported_discovered = value.as_u64().map(|n| n as usize);
            }
            // Recomputed locally from the page list.
            "total_pages_reviewed" => {}
            _ => {
                outcome.extra.insert(key.clone(), value.clone());
            }
        }
    }

    Ok(outcome)
}

/// Normalize a synthesis task's narrative.
pub fn normalize_narrative(raw: &RawResult) -> Result<Narrative> {
    match decode(raw) {
        Decoded::Undecodable(excerpt) => Err(ReviewError::normalization("synthesis", excerpt)),
        Decoded::Strict(value) | Decoded::Embedded(value) => match single_object(value) {
            Some(value) => Ok(narrative_from_value(&value)),
            None => Err(ReviewError::normalization(
                "synthesis",
                "expected a JSON object",
            )),
        },
    }
}

pub fn narrative_from_value(value: &Value) -> Narrative {
    let mut narrative = Narrative::default();
    let Value::Object(map) = value else {
        return narrative;
    };

    for (key, value) in map {
        match fields::narrative_field(key) {
            Some(NarrativeField::Strengths) => {
                fields::extend_unique(&mut narrative.strengths, fields::string_list(value))
            }
            Some(NarrativeField::CriticalIssues) => {
                fields::extend_unique(&mut narrative.critical_issues, fields::string_list(value))
            }
            Some(NarrativeField::Recommendations) => {
                fields::extend_unique(&mut narrative.recommendations, fields::string_list(value))
            }
            Some(NarrativeField::Assessment) if narrative.overall_assessment.is_none() => {
                narrative.overall_assessment = fields::text(value);
            }
            _ => {
                narrative.extra.insert(key.clone(), value.clone());
            }
        }
    }
    narrative
}

/// Normalize a discovery or crawl response into raw candidate URLs.
pub fn normalize_links(raw: &RawResult) -> Result<Vec<String>> {
    let value = decode(raw)
        .into_value()
        .ok_or_else(|| ReviewError::normalization("discovery", "no structured link list in output"))?;

    let items = match &value {
        Value::Array(items) => items.clone(),
        Value::Object(map) => map
            .iter()
            .find(|(key, value)| {
                value.is_array()
                    && matches!(
                        fields::canonical_key(key).as_str(),
                        "links" | "urls" | "pages" | "discovered_urls" | "discovered_pages"
                    )
            })
            .and_then(|(_, value)| value.as_array().cloned())
            .ok_or_else(|| {
                ReviewError::normalization("discovery", "object has no links array")
            })?,
        other => {
            return Err(ReviewError::normalization(
                "discovery",
                format!("expected a list of links, got {}", json_kind(other)),
            ))
        }
    };

    Ok(items
        .iter()
        .filter_map(|item| match item {
            Value::String(url) => Some(url.trim().to_string()),
            Value::Object(map) => map
                .iter()
                .find(|(key, _)| page_field(key) == Some(PageField::Url))
                .and_then(|(_, url)| url.as_str())
                .map(|url| url.trim().to_string()),
            _ => None,
        })
        .filter(|url| !url.is_empty())
        .collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
