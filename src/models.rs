//! Data models for the documentation reviewer.
//!
//! This module contains the canonical page and site review structures
//! shared by the normalizer, the aggregator, the report writer and the viewer.

use crate::remote::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Highest valid score on the review scale.
pub const MAX_SCORE: u8 = 10;

/// Orchestration strategy for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewMode {
    /// One remote task discovers and reviews everything.
    OneShot,
    /// Discovery task, one task per page, synthesis task.
    MultiStep,
    /// Like multi-step, but discovery is a recursive in-domain crawl.
    Exhaustive,
}

impl fmt::Display for ReviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewMode::OneShot => write!(f, "one-shot"),
            ReviewMode::MultiStep => write!(f, "multi-step"),
            ReviewMode::Exhaustive => write!(f, "exhaustive"),
        }
    }
}

impl ReviewMode {
    /// Fragment used in persisted report file names.
    pub fn file_stem(&self) -> &'static str {
        match self {
            ReviewMode::OneShot => "one-shot_limited",
            ReviewMode::MultiStep => "multi-step_limited",
            ReviewMode::Exhaustive => "multi-step_exhaustive",
        }
    }

    /// Whether the run has a separate discovery phase.
    pub fn has_discovery(&self) -> bool {
        !matches!(self, ReviewMode::OneShot)
    }
}

/// Scores for one page. Absent means "unscored", which is distinct from 0 ("failed").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageScores {
    #[serde(default)]
    pub overall: Option<u8>,
    #[serde(default)]
    pub content_quality: Option<u8>,
    #[serde(default)]
    pub structure_organization: Option<u8>,
    #[serde(default)]
    pub user_experience: Option<u8>,
    #[serde(default)]
    pub technical_accuracy: Option<u8>,
}

impl PageScores {
    /// Canonical score keys, in display order.
    pub const KEYS: [&'static str; 5] = [
        "overall",
        "content_quality",
        "structure_organization",
        "user_experience",
        "technical_accuracy",
    ];

    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, score)| score.is_none())
    }

    pub fn get(&self, key: &str) -> Option<u8> {
        match key {
            "overall" => self.overall,
            "content_quality" => self.content_quality,
            "structure_organization" => self.structure_organization,
            "user_experience" => self.user_experience,
            "technical_accuracy" => self.technical_accuracy,
            _ => None,
        }
    }

    /// Set a score by canonical key. Returns false for unknown keys.
    pub fn set(&mut self, key: &str, value: u8) -> bool {
        let slot = match key {
            "overall" => &mut self.overall,
            "content_quality" => &mut self.content_quality,
            "structure_organization" => &mut self.structure_organization,
            "user_experience" => &mut self.user_experience,
            "technical_accuracy" => &mut self.technical_accuracy,
            _ => return false,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<u8>)> + '_ {
        Self::KEYS.iter().map(move |key| (*key, self.get(key)))
    }
}

/// Canonical review of a single documentation page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageReview {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub scores: PageScores,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub critical_issues: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub positive_aspects: Vec<String>,
    /// Set when the page could not be decoded or reviewed.
    #[serde(default)]
    pub degraded: bool,
    /// Set when the remote task was stopped before it finished.
    #[serde(default, skip_serializing_if = "is_false")]
    pub partial: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Fields the upstream output carried that have no canonical slot.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl PageReview {
    /// A flagged record with every score absent and a diagnostic note.
    pub fn degraded(url: impl Into<String>, note: impl Into<String>) -> Self {
        let note = note.into();
        Self {
            url: url.into(),
            feedback: Some(format!("Review unavailable: {}", note)),
            degraded: true,
            error: Some(note),
            ..Default::default()
        }
    }

    pub fn overall(&self) -> Option<u8> {
        self.scores.overall
    }

    /// Display title, falling back to the URL.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }
}

/// Fixed bands used for the site-wide histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreBand {
    Excellent,
    Good,
    NeedsImprovement,
    Poor,
    Failed,
}

impl ScoreBand {
    pub const ALL: [ScoreBand; 5] = [
        ScoreBand::Excellent,
        ScoreBand::Good,
        ScoreBand::NeedsImprovement,
        ScoreBand::Poor,
        ScoreBand::Failed,
    ];

    pub fn for_score(score: u8) -> Self {
        match score {
            8..=u8::MAX => ScoreBand::Excellent,
            6..=7 => ScoreBand::Good,
            4..=5 => ScoreBand::NeedsImprovement,
            1..=3 => ScoreBand::Poor,
            0 => ScoreBand::Failed,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "excellent",
            ScoreBand::Good => "good",
            ScoreBand::NeedsImprovement => "needs_improvement",
            ScoreBand::Poor => "poor",
            ScoreBand::Failed => "failed",
        }
    }

    pub fn range(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "8-10",
            ScoreBand::Good => "6-7",
            ScoreBand::NeedsImprovement => "4-5",
            ScoreBand::Poor => "1-3",
            ScoreBand::Failed => "0",
        }
    }
}

/// Count of scored pages per band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    #[serde(default)]
    pub excellent: usize,
    #[serde(default)]
    pub good: usize,
    #[serde(default)]
    pub needs_improvement: usize,
    #[serde(default)]
    pub poor: usize,
    #[serde(default)]
    pub failed: usize,
}

impl ScoreDistribution {
    pub fn record(&mut self, score: u8) {
        *self.slot(ScoreBand::for_score(score)) += 1;
    }

    pub fn get(&self, band: ScoreBand) -> usize {
        match band {
            ScoreBand::Excellent => self.excellent,
            ScoreBand::Good => self.good,
            ScoreBand::NeedsImprovement => self.needs_improvement,
            ScoreBand::Poor => self.poor,
            ScoreBand::Failed => self.failed,
        }
    }

    pub fn total(&self) -> usize {
        ScoreBand::ALL.iter().map(|band| self.get(*band)).sum()
    }

    fn slot(&mut self, band: ScoreBand) -> &mut usize {
        match band {
            ScoreBand::Excellent => &mut self.excellent,
            ScoreBand::Good => &mut self.good,
            ScoreBand::NeedsImprovement => &mut self.needs_improvement,
            ScoreBand::Poor => &mut self.poor,
            ScoreBand::Failed => &mut self.failed,
        }
    }
}

/// Site-level narrative produced by a synthesis or one-shot task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub critical_issues: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub overall_assessment: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// Computed statistics and narrative for the whole site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteAnalysis {
    /// Mean of present overall scores; absent when no page was scored.
    pub average_score: Option<f64>,
    pub score_distribution: ScoreDistribution,
    pub pages_scored: usize,
    pub pages_degraded: usize,
    pub strengths: Vec<String>,
    pub critical_issues: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub overall_assessment: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// Orchestration run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Discovering,
    Reviewing,
    Synthesizing,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            RunState::NotStarted => 0,
            RunState::Discovering => 1,
            RunState::Reviewing => 2,
            RunState::Synthesizing => 3,
            RunState::Done | RunState::Failed => 4,
        }
    }

    /// Forward-only transitions; `Failed` is reachable from any non-terminal state.
    pub fn can_advance_to(&self, next: RunState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            RunState::Failed => true,
            RunState::NotStarted => false,
            _ => next.rank() > self.rank(),
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::NotStarted => "not started",
            RunState::Discovering => "discovering",
            RunState::Reviewing => "reviewing",
            RunState::Synthesizing => "synthesizing",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// What a remote task was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    OneShot,
    Discovery,
    Crawl,
    PageReview,
    Synthesis,
}

/// Diagnostic trace of one remote task, kept in the persisted report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub phase: TaskPhase,
    #[serde(default)]
    pub task_id: Option<String>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The complete documentation review report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteReport {
    pub start_url: String,
    pub review_approach: ReviewMode,
    pub max_pages: usize,
    pub generated_at: DateTime<Utc>,
    pub run_state: RunState,
    pub total_pages_discovered: usize,
    pub total_pages_reviewed: usize,
    /// In discovery/crawl order.
    pub page_reviews: Vec<PageReview>,
    pub site_analysis: SiteAnalysis,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
    /// Top-level fatal error, when the run reached `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SiteReport {
    pub fn new(start_url: impl Into<String>, mode: ReviewMode, max_pages: usize) -> Self {
        Self {
            start_url: start_url.into(),
            review_approach: mode,
            max_pages,
            generated_at: Utc::now(),
            run_state: RunState::NotStarted,
            total_pages_discovered: 0,
            total_pages_reviewed: 0,
            page_reviews: Vec::new(),
            site_analysis: SiteAnalysis::default(),
            tasks: Vec::new(),
            error: None,
        }
    }

    /// Append a page review, keeping the reviewed count in sync.
    pub fn push_page(&mut self, review: PageReview) {
        self.page_reviews.push(review);
        self.total_pages_reviewed = self.page_reviews.len();
    }

    pub fn succeeded(&self) -> bool {
        self.run_state == RunState::Done
    }
}
