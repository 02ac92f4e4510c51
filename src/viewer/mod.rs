//! Local web viewer over persisted reports.
//!
//! GET /             list of report files, newest first
//! GET /view/:file   formatted report, or an error view if it does not parse
//! GET /raw/:file    raw file contents

use crate::report::html;
use crate::report::{LEGACY_REPORT_NAME, REPORT_PREFIX};
use anyhow::{Context, Result};
use axum::{
    extract::{Path as UrlPath, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct ViewerState {
    dir: Arc<PathBuf>,
}

impl ViewerState {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Arc::new(dir.into()),
        }
    }
}

/// Summary stats shown in the index for one parsed report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub start_url: String,
    pub approach: String,
    pub pages_reviewed: u64,
    pub pages_discovered: u64,
    pub average_score: Option<f64>,
    pub error: Option<String>,
}

/// One file in the report directory.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub file_name: String,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
    /// Parse error text when the file is not valid JSON.
    pub summary: std::result::Result<ReportSummary, String>,
}

/// A bare file name with a `.json` extension: no separators, no `..`.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
        && name.ends_with(".json")
}

fn is_report_name(name: &str) -> bool {
    (name.starts_with(REPORT_PREFIX) && name.ends_with(".json")) || name == LEGACY_REPORT_NAME
}

pub fn summarize(data: &Value) -> ReportSummary {
    let text = |key: &str| {
        data.get(key)
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string()
    };
    let count = |key: &str| data.get(key).and_then(Value::as_u64).unwrap_or(0);

    ReportSummary {
        start_url: text("start_url"),
        approach: text("review_approach"),
        pages_reviewed: count("total_pages_reviewed"),
        pages_discovered: count("total_pages_discovered"),
        average_score: html::site_analysis(data)
            .and_then(|a| a.get("average_score"))
            .and_then(Value::as_f64),
        error: data.get("error").and_then(Value::as_str).map(str::to_string),
    }
}

/// Report files in `dir`, newest first.
pub fn list_reports(dir: &Path) -> Result<Vec<ReportEntry>> {
    let mut entries = Vec::new();

    let read_dir = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read report directory {}", dir.display()))?;
    for entry in read_dir {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !is_report_name(&file_name) {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }

        let summary = std::fs::read_to_string(entry.path())
            .map_err(|e| e.to_string())
            .and_then(|content| {
                serde_json::from_str::<Value>(&content).map_err(|e| e.to_string())
            })
            .map(|data| summarize(&data));
        if let Err(ref e) = summary {
            debug!(file = %file_name, "Report does not parse: {}", e);
        }

        entries.push(ReportEntry {
            file_name,
            size_bytes: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            summary,
        });
    }

    entries.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.file_name.cmp(&a.file_name))
    });
    Ok(entries)
}

pub fn render_index(dir: &Path, entries: &[ReportEntry]) -> String {
    let mut body = format!(
        "<section><h2>Review reports</h2><p>{} file(s) in <code>{}</code></p>\n",
        entries.len(),
        html::escape(&dir.display().to_string())
    );

    if entries.is_empty() {
        body.push_str("<p>No reports yet. Run <code>docaudit review</code> first.</p></section>");
        return html::layout("Reports", &body);
    }

    body.push_str(
        "<table>\n<tr><th>File</th><th>Start URL</th><th>Approach</th><th>Reviewed</th>\
<th>Discovered</th><th>Average</th><th>Size</th><th>Modified</th></tr>\n",
    );
    for entry in entries {
        let name = html::escape(&entry.file_name);
        let modified = entry
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_default();
        let size = format!("{:.1} KB", entry.size_bytes as f64 / 1024.0);

        match &entry.summary {
            Ok(summary) => {
                let average = summary
                    .average_score
                    .map(|a| format!("{:.1}/10", a))
                    .unwrap_or_else(|| "n/a".to_string());
                let marker = if summary.error.is_some() {
                    " <span class=\"badge error\">failed</span>"
                } else {
                    ""
                };
                body.push_str(&format!(
                    "<tr><td><a href=\"/view/{name}\">{name}</a>{marker}</td><td>{}</td><td>{}</td>\
<td>{}</td><td>{}</td><td>{}</td><td>{size}</td><td>{modified}</td></tr>\n",
                    html::escape(&summary.start_url),
                    html::escape(&summary.approach),
                    summary.pages_reviewed,
                    summary.pages_discovered,
                    average,
                ));
            }
            Err(error) => {
                body.push_str(&format!(
                    "<tr><td><a href=\"/raw/{name}\">{name}</a> <span class=\"badge error\">unreadable</span></td>\
<td colspan=\"5\">{}</td><td>{size}</td><td>{modified}</td></tr>\n",
                    html::escape(error),
                ));
            }
        }
    }
    body.push_str("</table></section>");

    html::layout("Reports", &body)
}

fn not_found() -> (StatusCode, Html<String>) {
    (
        StatusCode::NOT_FOUND,
        Html(html::layout("Not found", "<section><p>Report not found.</p></section>")),
    )
}

/// Read a report by name, or `None` when the name is unsafe or the file is missing.
fn read_report(state: &ViewerState, name: &str) -> Option<String> {
    if !is_safe_name(name) {
        warn!(file = %name, "Rejected report file name");
        return None;
    }
    std::fs::read_to_string(state.dir.join(name)).ok()
}

pub async fn index(State(state): State<ViewerState>) -> (StatusCode, Html<String>) {
    match list_reports(&state.dir) {
        Ok(entries) => (StatusCode::OK, Html(render_index(&state.dir, &entries))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(html::render_error("index", &format!("{:#}", e))),
        ),
    }
}

pub async fn view(
    State(state): State<ViewerState>,
    UrlPath(file): UrlPath<String>,
) -> (StatusCode, Html<String>) {
    let Some(content) = read_report(&state, &file) else {
        return not_found();
    };
    match serde_json::from_str::<Value>(&content) {
        Ok(data) => (StatusCode::OK, Html(html::render_report(&file, &data))),
        Err(e) => (StatusCode::OK, Html(html::render_error(&file, &e.to_string()))),
    }
}

pub async fn raw(
    State(state): State<ViewerState>,
    UrlPath(file): UrlPath<String>,
) -> (StatusCode, Html<String>) {
    match read_report(&state, &file) {
        Some(content) => (StatusCode::OK, Html(html::render_raw(&file, &content))),
        None => not_found(),
    }
}

pub fn router(state: ViewerState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/view/:file", get(view))
        .route("/raw/:file", get(raw))
        .with_state(state)
}

/// Serve the viewer until the process is stopped.
pub async fn serve(dir: PathBuf, host: &str, port: u16) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind viewer to {}", addr))?;

    info!(dir = %dir.display(), "Serving reports on http://{}", addr);
    println!("🌐 Report viewer running at http://{}", addr);
    println!("   Serving reports from {}", dir.display());
    println!("   Press Ctrl+C to stop.");

    axum::serve(listener, router(ViewerState::new(dir)))
        .await
        .context("Viewer server failed")?;
    Ok(())
}
