//! Review orchestration.
//!
//! A run walks `NotStarted → Discovering → Reviewing → Synthesizing → Done`,
//! skipping discovery in one-shot mode. Discovery, crawl and synthesis
//! failures move the run to `Failed`; a failed page review only degrades
//! that page. Either way a complete `SiteReport` comes back so the caller
//! can persist it.

pub mod discovery;
pub mod prompts;

use crate::analysis;
use crate::error::{Result, ReviewError};
use crate::models::{
    Narrative, PageReview, ReviewMode, RunState, SiteReport, TaskPhase, TaskRecord,
};
use crate::normalize;
use crate::remote::{RawResult, RemoteTaskClient, TaskOptions, TaskStatus};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// Agent step budgets per kind of task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepBudgets {
    pub one_shot: u32,
    pub discovery: u32,
    pub crawl: u32,
    pub page_review: u32,
    pub synthesis: u32,
}

impl Default for StepBudgets {
    fn default() -> Self {
        Self {
            one_shot: 150,
            discovery: 30,
            crawl: 250,
            page_review: 20,
            synthesis: 25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub mode: ReviewMode,
    /// Page cap for this run; already the exhaustive cap in exhaustive mode.
    pub max_pages: usize,
    pub steps: StepBudgets,
    pub enable_public_share: bool,
    /// Pause between sequential page reviews.
    pub inter_task_delay: Duration,
}

/// Per-run context shared by every task of the run.
struct RunContext {
    start: Url,
    start_url: String,
    domain: String,
}

/// Drives one of the three review strategies over a `RemoteTaskClient`.
pub struct ModeOrchestrator {
    client: RemoteTaskClient,
    config: OrchestratorConfig,
}

impl ModeOrchestrator {
    pub fn new(client: RemoteTaskClient, config: OrchestratorConfig) -> Self {
        Self { client, config }
    }

    /// Review the site at `start_url`. Only an unusable start URL is an
    /// error; remote failures end up in the returned report.
    pub async fn run(&self, start_url: &str) -> Result<SiteReport> {
        let start = discovery::parse_start_url(start_url)?;
        let domain = start.host_str().unwrap_or_default().to_string();
        let ctx = RunContext {
            start_url: start.to_string(),
            start,
            domain,
        };

        let mut report = SiteReport::new(
            ctx.start_url.clone(),
            self.config.mode,
            self.config.max_pages,
        );
        info!(
            start_url = %ctx.start_url,
            mode = %self.config.mode,
            max_pages = self.config.max_pages,
            "Starting documentation review"
        );

        let outcome = if self.config.mode.has_discovery() {
            self.run_multi_step(&ctx, &mut report).await
        } else {
            self.run_one_shot(&ctx, &mut report).await
        };

        match outcome {
            Ok(narrative) => {
                report.site_analysis = analysis::aggregate(
                    &report.page_reviews,
                    report.total_pages_discovered,
                    narrative.as_ref(),
                    self.config.mode,
                );
                advance(&mut report, RunState::Done);
            }
            Err(e) => {
                error!(state = %report.run_state, "Review failed: {}", e);
                println!("❌ Review failed while {}: {}", report.run_state, e);
                advance(&mut report, RunState::Failed);
                report.error = Some(e.to_string());
                report.site_analysis = analysis::aggregate(
                    &report.page_reviews,
                    report.total_pages_discovered,
                    None,
                    self.config.mode,
                );
            }
        }

        report.total_pages_reviewed = report.page_reviews.len();
        Ok(report)
    }

    /// One task discovers and reviews everything.
    async fn run_one_shot(
        &self,
        ctx: &RunContext,
        report: &mut SiteReport,
    ) -> Result<Option<Narrative>> {
        advance(report, RunState::Reviewing);
        println!(
            "🔍 One-shot review of {} (up to {} pages)",
            ctx.start_url, self.config.max_pages
        );

        let instruction = prompts::one_shot(&ctx.start_url, &ctx.domain, self.config.max_pages);
        let raw = self
            .execute(ctx, report, TaskPhase::OneShot, None, instruction, self.config.steps.one_shot)
            .await?;

        let outcome = normalize::normalize_site(&raw)?;
        let returned = outcome.pages.len();
        if returned > self.config.max_pages {
            warn!(
                returned,
                cap = self.config.max_pages,
                "Remote reviewed more pages than requested; truncating"
            );
        }
        for page in outcome.pages.into_iter().take(self.config.max_pages) {
            report.push_page(mark_partial(page, raw.partial));
        }
        report.total_pages_discovered = outcome.reported_discovered.unwrap_or(0).max(returned);

        advance(report, RunState::Synthesizing);
        let mut narrative = outcome.narrative;
        if !outcome.extra.is_empty() {
            let target = narrative.get_or_insert_with(Narrative::default);
            for (key, value) in outcome.extra {
                target.extra.entry(key).or_insert(value);
            }
        }
        Ok(narrative)
    }

    /// Discovery (or crawl), one review task per page, then synthesis.
    async fn run_multi_step(
        &self,
        ctx: &RunContext,
        report: &mut SiteReport,
    ) -> Result<Option<Narrative>> {
        let mode = self.config.mode;
        let cap = self.config.max_pages;

        // Phase 1
        advance(report, RunState::Discovering);
        let (phase, instruction, steps) = if mode == ReviewMode::Exhaustive {
            println!("🕸️  Crawling {} (safety cap {} pages)", ctx.start_url, cap);
            (
                TaskPhase::Crawl,
                prompts::crawl(&ctx.start_url, &ctx.domain, cap),
                self.config.steps.crawl,
            )
        } else {
            println!("🔍 Discovering documentation pages from {}", ctx.start_url);
            (
                TaskPhase::Discovery,
                prompts::discovery(&ctx.start_url, &ctx.domain, cap),
                self.config.steps.discovery,
            )
        };
        let raw = self.execute(ctx, report, phase, None, instruction, steps).await?;
        let candidates = normalize::normalize_links(&raw)?;
        let found = discovery::validate(&ctx.start, &candidates, cap);
        report.total_pages_discovered = found.total_valid;

        if found.total_valid > found.urls.len() {
            warn!(
                discovered = found.total_valid,
                cap, "Discovered more pages than the cap; keeping the first {}", cap
            );
        }
        println!(
            "   Found {} pages, reviewing {}",
            found.total_valid,
            found.urls.len()
        );
        debug!(urls = ?found.urls, "Pages selected for review");

        // Phase 2
        advance(report, RunState::Reviewing);
        let total = found.urls.len();
        for (index, url) in found.urls.iter().enumerate() {
            println!("📄 Reviewing page {}/{}: {}", index + 1, total, url);
            let instruction = prompts::page_review(url);
            let review = match self
                .execute(
                    ctx,
                    report,
                    TaskPhase::PageReview,
                    Some(url.as_str()),
                    instruction,
                    self.config.steps.page_review,
                )
                .await
            {
                Ok(raw) => normalize::normalize_page(&raw, url),
                Err(e) => PageReview::degraded(url.as_str(), e.to_string()),
            };

            if review.degraded {
                warn!(url = %url, "Page review degraded: {}", review.error.as_deref().unwrap_or("unknown"));
                println!("    ⚠️  Review unavailable for {}", url);
            } else if let Some(score) = review.overall() {
                println!("    ✅ Score: {}/10", score);
            }
            report.push_page(review);

            if index + 1 < total && !self.config.inter_task_delay.is_zero() {
                tokio::time::sleep(self.config.inter_task_delay).await;
            }
        }

        // Phase 3
        advance(report, RunState::Synthesizing);
        println!("🧠 Synthesizing site-level analysis...");
        let input = prompts::SynthesisInput::from_pages(
            &ctx.start_url,
            &report.page_reviews,
            report.total_pages_discovered,
            mode,
        );
        let raw = self
            .execute(
                ctx,
                report,
                TaskPhase::Synthesis,
                None,
                prompts::synthesis(&input),
                self.config.steps.synthesis,
            )
            .await?;
        let mut narrative = normalize::normalize_narrative(&raw)?;
        if raw.partial {
            narrative.extra.insert(
                "note".to_string(),
                Value::String("analysis was stopped before completion".to_string()),
            );
        }
        Ok(Some(narrative))
    }

    /// Submit one task and wait for it, recording it in the report.
    async fn execute(
        &self,
        ctx: &RunContext,
        report: &mut SiteReport,
        phase: TaskPhase,
        page_url: Option<&str>,
        instruction: String,
        max_steps: u32,
    ) -> Result<RawResult> {
        let options = TaskOptions {
            allowed_domains: discovery::allowed_domain(&ctx.start),
            max_steps,
            enable_public_share: self.config.enable_public_share,
        };

        let mut record = TaskRecord {
            phase,
            task_id: None,
            status: TaskStatus::Pending,
            submitted_at: None,
            page_url: page_url.map(str::to_string),
            share_url: None,
            live_url: None,
            error: None,
        };

        let mut task = match self.client.submit(&instruction, &options).await {
            Ok(task) => task,
            Err(e) => {
                record.status = TaskStatus::Failed;
                record.error = Some(e.to_string());
                report.tasks.push(record);
                return Err(e);
            }
        };

        let result = self.client.wait(&mut task).await;

        record.task_id = Some(task.id.clone());
        record.submitted_at = Some(task.created_at);
        record.share_url = task.share_url.clone();
        record.live_url = task.live_url.clone();
        record.status = match &result {
            Ok(_) => TaskStatus::Completed,
            Err(ReviewError::PollTimeout { .. }) => TaskStatus::Timeout,
            Err(_) => TaskStatus::Failed,
        };
        if let Err(ref e) = result {
            record.error = Some(e.to_string());
        }
        report.tasks.push(record);

        result
    }
}

fn advance(report: &mut SiteReport, next: RunState) {
    let current = report.run_state;
    if current.can_advance_to(next) {
        debug!(from = %current, to = %next, "Run state transition");
        report.run_state = next;
    } else {
        warn!(from = %current, to = %next, "Ignoring invalid run state transition");
    }
}

fn mark_partial(mut page: PageReview, partial: bool) -> PageReview {
    page.partial |= partial;
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::testing::{Plan, ScriptedApi};
    use crate::remote::ClientSettings;
    use serde_json::json;
    use std::sync::Arc;

    const A: &str = "https://docs.example.com/intro";
    const B: &str = "https://docs.example.com/guide";
    const C: &str = "https://docs.example.com/api";

    fn orchestrator(api: Arc<ScriptedApi>, mode: ReviewMode, max_pages: usize) -> ModeOrchestrator {
        let settings = ClientSettings {
            poll_interval: Duration::from_millis(1),
            max_wait: Duration::from_millis(30),
            retry_backoff: Duration::from_millis(1),
            show_progress: false,
            ..Default::default()
        };
        ModeOrchestrator::new(
            RemoteTaskClient::new(api, settings),
            OrchestratorConfig {
                mode,
                max_pages,
                steps: StepBudgets::default(),
                enable_public_share: true,
                inter_task_delay: Duration::ZERO,
            },
        )
    }

    fn scored_page(url: &str, score: u8) -> Plan {
        Plan::Complete(json!({
            "url": url,
            "title": format!("Page {}", url),
            "scores": {"overall": score, "content_quality": score},
            "critical_issues": [format!("issue on {}", url)],
        }))
    }

    fn narrative() -> Plan {
        Plan::Complete(json!({
            "site_strengths": ["Consistent tone"],
            "critical_site_issues": ["No search"],
            "priority_recommendations": ["Add search"],
            "overall_assessment": "Good foundation."
        }))
    }

    #[tokio::test]
    async fn test_one_shot_single_submission() {
        let pages: Vec<Value> = (0..8)
            .map(|i| json!({"url": format!("{}/{}", A, i), "score": 7}))
            .collect();
        let api = Arc::new(ScriptedApi::new(vec![Plan::Complete(json!({
            "total_pages_discovered": 12,
            "page_reviews": pages,
            "site_analysis": {"site_strengths": ["Clear"], "overall_assessment": "Fine."},
            "model_notes": "extra"
        }))]));
        let report = orchestrator(api.clone(), ReviewMode::OneShot, 5)
            .run(A)
            .await
            .unwrap();

        let requests = api.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_agent_steps, 150);
        assert_eq!(requests[0].allowed_domains, vec!["docs.example.com"]);
        assert!(requests[0].enable_public_share);

        assert_eq!(report.run_state, RunState::Done);
        assert_eq!(report.page_reviews.len(), 5);
        assert_eq!(report.total_pages_reviewed, report.page_reviews.len());
        assert_eq!(report.total_pages_discovered, 12);
        assert_eq!(report.site_analysis.strengths, vec!["Clear"]);
        assert_eq!(report.site_analysis.average_score, Some(7.0));
        assert_eq!(report.site_analysis.extra.get("model_notes"), Some(&json!("extra")));
        assert_eq!(report.tasks.len(), 1);
        assert_eq!(report.tasks[0].phase, TaskPhase::OneShot);
    }

    #[tokio::test]
    async fn test_one_shot_failure_yields_no_pages() {
        let api = Arc::new(ScriptedApi::new(vec![Plan::Fail("site unreachable".into())]));
        let report = orchestrator(api.clone(), ReviewMode::OneShot, 5)
            .run(A)
            .await
            .unwrap();

        assert_eq!(report.run_state, RunState::Failed);
        assert!(report.error.as_deref().unwrap().contains("site unreachable"));
        assert!(report.page_reviews.is_empty());
        assert_eq!(report.total_pages_reviewed, 0);
        assert_eq!(api.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_multi_step_degrades_timed_out_page() {
        let api = Arc::new(ScriptedApi::new(vec![
            Plan::Complete(json!({"links": [A, B, C]})),
            scored_page(A, 8),
            Plan::NeverFinish,
            scored_page(C, 6),
            narrative(),
        ]));
        let report = orchestrator(api.clone(), ReviewMode::MultiStep, 20)
            .run(A)
            .await
            .unwrap();

        let requests = api.requests();
        assert_eq!(requests.len(), 5);
        assert_eq!(requests[0].max_agent_steps, 30);
        for (request, url) in requests[1..4].iter().zip([A, B, C]) {
            assert!(request.task.contains(url));
            assert_eq!(request.max_agent_steps, 20);
        }

        assert_eq!(report.run_state, RunState::Done);
        let urls: Vec<&str> = report.page_reviews.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec![A, B, C]);
        assert_eq!(report.total_pages_reviewed, 3);
        assert_eq!(report.total_pages_discovered, 3);

        let b = &report.page_reviews[1];
        assert!(b.degraded);
        assert!(b.scores.is_empty());
        assert!(b.feedback.as_deref().unwrap().contains("did not finish"));
        assert_eq!(report.page_reviews[0].overall(), Some(8));
        assert_eq!(report.page_reviews[2].overall(), Some(6));

        let analysis = &report.site_analysis;
        assert_eq!(analysis.average_score, Some(7.0));
        assert_eq!(analysis.pages_scored, 2);
        assert_eq!(analysis.pages_degraded, 1);
        assert_eq!(analysis.strengths, vec!["Consistent tone"]);
        assert_eq!(analysis.overall_assessment.as_deref(), Some("Good foundation."));

        assert_eq!(report.tasks.len(), 5);
        assert_eq!(report.tasks[2].status, TaskStatus::Timeout);
        assert_eq!(report.tasks[2].page_url.as_deref(), Some(B));
        assert!(report.tasks[1].share_url.is_some());
    }

    #[tokio::test]
    async fn test_exhaustive_truncates_in_discovery_order() {
        let links: Vec<String> = (0..30)
            .map(|i| format!("https://docs.example.com/page-{}", i))
            .collect();
        let mut plans = vec![Plan::Complete(json!({"links": links}))];
        plans.extend((0..10).map(|i| scored_page(&format!("p{}", i), 7)));
        plans.push(narrative());
        let api = Arc::new(ScriptedApi::new(plans));

        let report = orchestrator(api.clone(), ReviewMode::Exhaustive, 10)
            .run(A)
            .await
            .unwrap();

        assert_eq!(api.requests()[0].max_agent_steps, 250);
        assert_eq!(report.run_state, RunState::Done);
        assert_eq!(report.total_pages_discovered, 31);
        assert_eq!(report.page_reviews.len(), 10);
        assert_eq!(report.total_pages_reviewed, 10);
        assert_eq!(report.page_reviews[0].url, A);
        for (i, page) in report.page_reviews.iter().skip(1).enumerate() {
            assert_eq!(page.url, format!("https://docs.example.com/page-{}", i));
        }
        // Every page keeps the URL it was asked to review.
        assert!(report.page_reviews[1].extra.contains_key("reported_url"));
    }

    #[tokio::test]
    async fn test_discovery_failure_is_fatal_but_reported() {
        let api = Arc::new(ScriptedApi::new(vec![Plan::Fail("blocked by captcha".into())]));
        let report = orchestrator(api.clone(), ReviewMode::MultiStep, 20)
            .run(A)
            .await
            .unwrap();

        assert_eq!(api.requests().len(), 1);
        assert_eq!(report.run_state, RunState::Failed);
        assert!(report.error.as_deref().unwrap().contains("blocked by captcha"));
        assert!(report.page_reviews.is_empty());
        assert_eq!(report.total_pages_reviewed, 0);
        assert_eq!(report.site_analysis.average_score, None);
        assert!(report.site_analysis.overall_assessment.is_some());
        assert_eq!(report.tasks[0].status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_undecodable_discovery_is_fatal() {
        let api = Arc::new(ScriptedApi::new(vec![Plan::Complete(json!(
            "I looked around but found nothing useful."
        ))]));
        let report = orchestrator(api, ReviewMode::MultiStep, 20)
            .run(A)
            .await
            .unwrap();
        assert_eq!(report.run_state, RunState::Failed);
        assert!(report.error.as_deref().unwrap().contains("discovery"));
    }

    #[tokio::test]
    async fn test_synthesis_failure_keeps_pages() {
        let api = Arc::new(ScriptedApi::new(vec![
            Plan::Complete(json!({"links": [A]})),
            scored_page(A, 8),
            Plan::Fail("out of steps".into()),
        ]));
        let report = orchestrator(api, ReviewMode::MultiStep, 20)
            .run(A)
            .await
            .unwrap();

        assert_eq!(report.run_state, RunState::Failed);
        assert_eq!(report.page_reviews.len(), 1);
        assert_eq!(report.total_pages_reviewed, 1);
        assert_eq!(report.site_analysis.average_score, Some(8.0));
        assert_eq!(
            report.site_analysis.critical_issues,
            vec![format!("issue on {}", A)]
        );
    }

    #[tokio::test]
    async fn test_invalid_start_url_is_rejected() {
        let api = Arc::new(ScriptedApi::new(vec![]));
        let result = orchestrator(api.clone(), ReviewMode::MultiStep, 20)
            .run("ftp://docs.example.com")
            .await;
        assert!(matches!(result, Err(ReviewError::Config(_))));
        assert!(api.requests().is_empty());
    }
}
