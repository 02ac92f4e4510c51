//! JSON persistence of finished reports.
//!
//! Each run produces one file named after its strategy and generation time.
//! Files are created, never overwritten.

use crate::models::SiteReport;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name prefix shared by every persisted report.
pub const REPORT_PREFIX: &str = "documentation_review_";

/// Older single-file output name, still picked up by the viewer.
pub const LEGACY_REPORT_NAME: &str = "review_results.json";

/// `documentation_review_{approach}_{limited|exhaustive}_{unix_ts}.json`
pub fn report_filename(report: &SiteReport) -> String {
    format!(
        "{}{}_{}.json",
        REPORT_PREFIX,
        report.review_approach.file_stem(),
        report.generated_at.timestamp()
    )
}

/// Generate a JSON report.
pub fn generate_json_report(report: &SiteReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write the report into `dir` and return the path written.
pub fn write_report(report: &SiteReport, dir: &Path) -> Result<PathBuf> {
    let content = generate_json_report(report)?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = dir.join(report_filename(report));

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .with_context(|| format!("Failed to create report file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    file.write_all(b"\n")?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PageReview, ReviewMode, RunState};
    use chrono::{TimeZone, Utc};

    fn create_test_report(mode: ReviewMode) -> SiteReport {
        let mut report = SiteReport::new("https://docs.example.com/intro", mode, 5);
        report.generated_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        report.run_state = RunState::Done;
        report.total_pages_discovered = 2;
        report.push_page(PageReview::degraded("https://docs.example.com/b", "timed out"));
        report
    }

    #[test]
    fn test_report_filename() {
        assert_eq!(
            report_filename(&create_test_report(ReviewMode::MultiStep)),
            "documentation_review_multi-step_limited_1700000000.json"
        );
        assert_eq!(
            report_filename(&create_test_report(ReviewMode::Exhaustive)),
            "documentation_review_multi-step_exhaustive_1700000000.json"
        );
        assert_eq!(
            report_filename(&create_test_report(ReviewMode::OneShot)),
            "documentation_review_one-shot_limited_1700000000.json"
        );
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_report(ReviewMode::MultiStep)).unwrap();
        assert!(json.contains("\"start_url\""));
        assert!(json.contains("\"total_pages_reviewed\": 1"));
        assert!(json.contains("\"review_approach\": \"multi-step\""));
        assert!(json.contains("\"overall\": null"));
    }

    #[test]
    fn test_write_report_round_trips_and_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let report = create_test_report(ReviewMode::MultiStep);

        let path = write_report(&report, dir.path()).unwrap();
        assert!(path.starts_with(dir.path()));

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: SiteReport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, report);

        assert!(write_report(&report, dir.path()).is_err());
    }
}
