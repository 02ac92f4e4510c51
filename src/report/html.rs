//! HTML rendering of persisted reports.
//!
//! Rendering works on `serde_json::Value` rather than `SiteReport` so that
//! older files with different field names still display. Every piece of
//! text taken from a report is escaped.

use crate::models::{PageReview, PageScores, ScoreBand};
use crate::normalize::{narrative_from_value, page_from_value};
use serde_json::Value;

const STYLE: &str = "\
body{font-family:-apple-system,Segoe UI,Helvetica,Arial,sans-serif;margin:0;background:#f5f6f8;color:#222}
header{background:#1f2937;color:#fff;padding:16px 32px}
header a{color:#93c5fd}
main{max-width:1100px;margin:0 auto;padding:24px}
.cards{display:flex;flex-wrap:wrap;gap:12px;margin-bottom:24px}
.card{background:#fff;border-radius:8px;padding:12px 16px;min-width:150px;box-shadow:0 1px 2px rgba(0,0,0,.08)}
.card .label{font-size:12px;color:#666;text-transform:uppercase}
.card .value{font-size:22px;font-weight:600}
section{background:#fff;border-radius:8px;padding:16px 24px;margin-bottom:16px;box-shadow:0 1px 2px rgba(0,0,0,.08)}
table{border-collapse:collapse;width:100%}
td,th{text-align:left;padding:6px 8px;border-bottom:1px solid #eee}
.badge{display:inline-block;padding:2px 8px;border-radius:10px;font-size:12px;background:#e5e7eb}
.badge.degraded{background:#fde68a}
.badge.error{background:#fecaca}
.score{font-weight:600}
pre{background:#111827;color:#e5e7eb;padding:16px;border-radius:8px;overflow:auto;white-space:pre-wrap}
.feedback{white-space:pre-wrap}";

/// Escape text for use in HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Wrap a body fragment in the shared page chrome. `title` is escaped here.
pub fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
<header><a href=\"/\">Documentation reviews</a> / {title}</header>\n<main>\n{body}\n</main>\n</body>\n</html>\n",
        title = escape(title)
    )
}

/// Site-level analysis block, under either its current or legacy key.
pub fn site_analysis(data: &Value) -> Option<&Value> {
    data.get("site_analysis")
        .filter(|v| v.is_object())
        .or_else(|| data.get("overall_review").filter(|v| v.is_object()))
}

/// Human-readable view of one report.
pub fn render_report(file_name: &str, data: &Value) -> String {
    let mut body = String::new();

    body.push_str(&generate_summary_cards(data));
    if let Some(error) = data.get("error").and_then(Value::as_str) {
        body.push_str(&format!(
            "<section><span class=\"badge error\">run failed</span> {}</section>\n",
            escape(error)
        ));
    }
    if let Some(analysis) = site_analysis(data) {
        body.push_str(&generate_distribution_section(analysis));
        body.push_str(&generate_narrative_section(analysis));
    }
    body.push_str(&generate_pages_section(data));
    body.push_str(&format!(
        "<p><a href=\"/raw/{}\">View raw JSON</a></p>\n",
        escape(file_name)
    ));

    layout(file_name, &body)
}

/// Shown when a report file cannot be parsed.
pub fn render_error(file_name: &str, error: &str) -> String {
    let body = format!(
        "<section><h2>Could not read this report</h2>\n\
<p><span class=\"badge error\">parse error</span> {}</p>\n\
<p><a href=\"/raw/{}\">View the raw file instead</a></p></section>",
        escape(error),
        escape(file_name)
    );
    layout(file_name, &body)
}

/// Raw file contents in a `<pre>` block.
pub fn render_raw(file_name: &str, content: &str) -> String {
    let body = format!(
        "<p><a href=\"/view/{}\">Formatted view</a></p>\n<pre>{}</pre>",
        escape(file_name),
        escape(content)
    );
    layout(file_name, &body)
}

fn generate_summary_cards(data: &Value) -> String {
    let text = |key: &str| {
        data.get(key)
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "unknown".to_string())
    };
    let average = site_analysis(data)
        .and_then(|a| a.get("average_score"))
        .and_then(Value::as_f64)
        .map(|avg| format!("{:.1}/10", avg))
        .unwrap_or_else(|| "n/a".to_string());

    let cards = [
        ("Start URL", text("start_url")),
        ("Approach", text("review_approach")),
        ("Pages reviewed", text("total_pages_reviewed")),
        ("Pages discovered", text("total_pages_discovered")),
        ("Average score", average),
        ("Run state", text("run_state")),
    ];

    let mut section = String::from("<div class=\"cards\">\n");
    for (label, value) in cards {
        section.push_str(&format!(
            "<div class=\"card\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>\n",
            label,
            escape(&value)
        ));
    }
    section.push_str("</div>\n");
    section
}

fn generate_distribution_section(analysis: &Value) -> String {
    let Some(Value::Object(dist)) = analysis.get("score_distribution") else {
        return String::new();
    };

    let mut section = String::from("<section><h2>Score distribution</h2>\n<table>\n");
    // Current files use band names; order them by band. Legacy keys follow.
    let mut rows: Vec<(String, String)> = ScoreBand::ALL
        .iter()
        .filter_map(|band| {
            dist.get(band.name())
                .map(|count| (format!("{} ({})", band.name(), band.range()), count.to_string()))
        })
        .collect();
    for (key, count) in dist {
        if !ScoreBand::ALL.iter().any(|band| band.name() == key) {
            rows.push((key.clone(), count.to_string()));
        }
    }
    for (label, count) in rows {
        section.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>\n",
            escape(&label),
            escape(&count)
        ));
    }
    section.push_str("</table></section>\n");
    section
}

fn generate_narrative_section(analysis: &Value) -> String {
    let narrative = narrative_from_value(analysis);
    let mut section = String::from("<section><h2>Site analysis</h2>\n");

    if let Some(ref assessment) = narrative.overall_assessment {
        section.push_str(&format!("<p class=\"feedback\">{}</p>\n", escape(assessment)));
    }
    section.push_str(&generate_list("Strengths", &narrative.strengths));
    section.push_str(&generate_list("Critical issues", &narrative.critical_issues));
    section.push_str(&generate_list("Recommendations", &narrative.recommendations));
    section.push_str("</section>\n");
    section
}

fn generate_pages_section(data: &Value) -> String {
    let pages: Vec<PageReview> = data
        .get("page_reviews")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .map(|(i, item)| page_from_value(item, &format!("unknown page {}", i + 1)))
                .collect()
        })
        .unwrap_or_default();

    if pages.is_empty() {
        return "<section><h2>Pages</h2><p>No page reviews in this report.</p></section>\n"
            .to_string();
    }

    let mut section = format!("<h2>Pages ({})</h2>\n", pages.len());
    for page in &pages {
        section.push_str(&generate_page_block(page));
    }
    section
}

fn generate_page_block(page: &PageReview) -> String {
    let mut block = String::from("<section>\n");

    block.push_str(&format!("<h3>{}", escape(page.display_title())));
    match page.overall() {
        Some(score) => block.push_str(&format!(" <span class=\"score\">{}/10</span>", score)),
        None => block.push_str(" <span class=\"score\">unscored</span>"),
    }
    if page.degraded {
        block.push_str(" <span class=\"badge degraded\">degraded</span>");
    }
    if page.partial {
        block.push_str(" <span class=\"badge\">partial</span>");
    }
    block.push_str("</h3>\n");
    block.push_str(&format!(
        "<p><a href=\"{url}\">{url}</a></p>\n",
        url = escape(&page.url)
    ));

    block.push_str(&generate_scores_table(&page.scores));
    if let Some(ref feedback) = page.feedback {
        block.push_str(&format!("<p class=\"feedback\">{}</p>\n", escape(feedback)));
    }
    block.push_str(&generate_list("Critical issues", &page.critical_issues));
    block.push_str(&generate_list("Recommendations", &page.recommendations));
    block.push_str(&generate_list("What works well", &page.positive_aspects));
    block.push_str("</section>\n");
    block
}

fn generate_scores_table(scores: &PageScores) -> String {
    if scores.is_empty() {
        return String::new();
    }
    let mut table = String::from("<table>\n");
    for (key, score) in scores.iter() {
        let value = score.map(|s| s.to_string()).unwrap_or_else(|| "n/a".into());
        table.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>\n",
            key.replace('_', " "),
            value
        ));
    }
    table.push_str("</table>\n");
    table
}

fn generate_list(heading: &str, items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let mut list = format!("<h4>{}</h4>\n<ul>\n", heading);
    for item in items {
        list.push_str(&format!("<li>{}</li>\n", escape(item)));
    }
    list.push_str("</ul>\n");
    list
}
