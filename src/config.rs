//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.docaudit.toml` files.

use crate::cli::{Approach, ReviewArgs};
use crate::models::ReviewMode;
use crate::orchestrator::StepBudgets;
use crate::remote::client::MAX_SUBMIT_RETRIES;
use crate::remote::ClientSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".docaudit.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Polling and retry settings.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Review scope settings.
    #[serde(default)]
    pub review: ReviewConfig,

    /// Agent step budgets per task kind.
    #[serde(default)]
    pub steps: StepsConfig,
}

/// Browser Use Cloud API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// LLM the remote agent runs with.
    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    #[serde(default = "default_true")]
    pub use_adblock: bool,

    #[serde(default = "default_true")]
    pub use_proxy: bool,

    #[serde(default)]
    pub highlight_elements: bool,

    /// Tasks are publicly viewable through their share URL when enabled.
    #[serde(default = "default_true")]
    pub enable_public_share: bool,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            llm_model: default_llm_model(),
            use_adblock: true,
            use_proxy: true,
            highlight_elements: false,
            enable_public_share: true,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.browser-use.com/api/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Poll loop and submission retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    /// Wall-clock ceiling per task.
    #[serde(default = "default_max_wait")]
    pub max_wait_seconds: u64,

    /// Retries on submission failure only. Capped at 3.
    #[serde(default = "default_submit_retries")]
    pub submit_retries: u32,

    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_seconds: u64,

    /// Pause between sequential page review tasks, in milliseconds.
    #[serde(default = "default_inter_task_delay")]
    pub inter_task_delay_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            max_wait_seconds: default_max_wait(),
            submit_retries: default_submit_retries(),
            retry_backoff_seconds: default_retry_backoff(),
            inter_task_delay_ms: default_inter_task_delay(),
        }
    }
}

fn default_poll_interval() -> u64 {
    15
}

fn default_max_wait() -> u64 {
    900 // 15 min per task
}

fn default_submit_retries() -> u32 {
    1
}

fn default_retry_backoff() -> u64 {
    5
}

fn default_inter_task_delay() -> u64 {
    1000
}

/// Review scope settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Page cap for one-shot and multi-step runs.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Page cap for exhaustive crawls.
    #[serde(default = "default_exhaustive_max_pages")]
    pub exhaustive_max_pages: usize,

    #[serde(default = "default_approach")]
    pub approach: Approach,

    /// Directory reports are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Whether to crawl exhaustively.
    #[serde(default)]
    pub exhaustive: bool,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            exhaustive_max_pages: default_exhaustive_max_pages(),
            approach: default_approach(),
            output_dir: default_output_dir(),
            exhaustive: false,
        }
    }
}

fn default_max_pages() -> usize {
    20
}

fn default_exhaustive_max_pages() -> usize {
    100
}

fn default_approach() -> Approach {
    Approach::MultiStep
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Agent step budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepsConfig {
    #[serde(default = "default_one_shot_steps")]
    pub one_shot: u32,
    #[serde(default = "default_discovery_steps")]
    pub discovery: u32,
    #[serde(default = "default_crawl_steps")]
    pub crawl: u32,
    #[serde(default = "default_page_review_steps")]
    pub page_review: u32,
    #[serde(default = "default_synthesis_steps")]
    pub synthesis: u32,
}

impl Default for StepsConfig {
    fn default() -> Self {
        Self {
            one_shot: default_one_shot_steps(),
            discovery: default_discovery_steps(),
            crawl: default_crawl_steps(),
            page_review: default_page_review_steps(),
            synthesis: default_synthesis_steps(),
        }
    }
}

fn default_one_shot_steps() -> u32 {
    150
}

fn default_discovery_steps() -> u32 {
    30
}

fn default_crawl_steps() -> u32 {
    250
}

fn default_page_review_steps() -> u32 {
    20
}

fn default_synthesis_steps() -> u32 {
    25
}

impl From<&StepsConfig> for StepBudgets {
    fn from(steps: &StepsConfig) -> Self {
        Self {
            one_shot: steps.one_shot,
            discovery: steps.discovery,
            crawl: steps.crawl,
            page_review: steps.page_review,
            synthesis: steps.synthesis,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only explicitly provided CLI values override config file settings.
    pub fn merge_with_args(&mut self, args: &ReviewArgs) {
        if let Some(max_pages) = args.max_pages {
            if self.effective_exhaustive(args) {
                self.review.exhaustive_max_pages = max_pages;
            } else {
                self.review.max_pages = max_pages;
            }
        }
        if let Some(approach) = args.approach {
            self.review.approach = approach;
        }
        if args.exhaustive {
            self.review.exhaustive = true;
        }
        if let Some(ref dir) = args.output_dir {
            self.review.output_dir = dir.clone();
        }
        if let Some(interval) = args.poll_interval {
            self.polling.poll_interval_seconds = interval;
        }
        if let Some(max_wait) = args.max_wait {
            self.polling.max_wait_seconds = max_wait;
        }
        if args.no_public_share {
            self.api.enable_public_share = false;
        }
    }

    fn effective_exhaustive(&self, args: &ReviewArgs) -> bool {
        args.exhaustive || self.review.exhaustive
    }

    /// Strategy for this run. Exhaustive wins over the approach setting.
    pub fn review_mode(&self) -> ReviewMode {
        if self.review.exhaustive {
            ReviewMode::Exhaustive
        } else {
            self.review.approach.into()
        }
    }

    /// Page cap for the selected strategy.
    pub fn page_cap(&self) -> usize {
        match self.review_mode() {
            ReviewMode::Exhaustive => self.review.exhaustive_max_pages,
            _ => self.review.max_pages,
        }
    }

    /// Remote client settings. `show_progress` drives the poll spinner.
    pub fn client_settings(&self, show_progress: bool) -> ClientSettings {
        ClientSettings {
            llm_model: self.api.llm_model.clone(),
            use_adblock: self.api.use_adblock,
            use_proxy: self.api.use_proxy,
            highlight_elements: self.api.highlight_elements,
            poll_interval: Duration::from_secs(self.polling.poll_interval_seconds.max(1)),
            max_wait: Duration::from_secs(self.polling.max_wait_seconds),
            submit_retries: self.polling.submit_retries.min(MAX_SUBMIT_RETRIES),
            retry_backoff: Duration::from_secs(self.polling.retry_backoff_seconds),
            show_progress,
        }
    }

    /// Check values that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.page_cap() == 0 {
            anyhow::bail!("Page cap must be at least 1");
        }
        if self.polling.max_wait_seconds == 0 {
            anyhow::bail!("max_wait_seconds must be at least 1");
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            anyhow::bail!("API base URL must start with 'http://' or 'https://'");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review_args() -> ReviewArgs {
        ReviewArgs {
            url: "https://docs.example.com".to_string(),
            max_pages: None,
            approach: None,
            exhaustive: false,
            output_dir: None,
            poll_interval: None,
            max_wait: None,
            no_public_share: false,
            config: None,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.llm_model, "gpt-4.1-mini");
        assert!(config.api.enable_public_share);
        assert_eq!(config.polling.max_wait_seconds, 900);
        assert_eq!(config.review.max_pages, 20);
        assert_eq!(config.review.exhaustive_max_pages, 100);
        assert_eq!(config.review_mode(), ReviewMode::MultiStep);
        assert_eq!(config.steps.crawl, 250);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[api]
llm_model = "gpt-4o"
enable_public_share = false

[polling]
poll_interval_seconds = 5
submit_retries = 9

[review]
max_pages = 8
approach = "one-shot"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.api.llm_model, "gpt-4o");
        assert!(!config.api.enable_public_share);
        assert_eq!(config.api.base_url, "https://api.browser-use.com/api/v1");
        assert_eq!(config.polling.poll_interval_seconds, 5);
        assert_eq!(config.polling.max_wait_seconds, 900);
        assert_eq!(config.review_mode(), ReviewMode::OneShot);
        assert_eq!(config.page_cap(), 8);

        let settings = config.client_settings(false);
        assert_eq!(settings.submit_retries, MAX_SUBMIT_RETRIES);
        assert_eq!(settings.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_merge_only_explicit_args() {
        let mut config = Config::default();
        config.review.max_pages = 7;

        config.merge_with_args(&review_args());
        assert_eq!(config.review.max_pages, 7);
        assert!(config.api.enable_public_share);

        let mut args = review_args();
        args.max_pages = Some(3);
        args.approach = Some(Approach::OneShot);
        args.no_public_share = true;
        config.merge_with_args(&args);
        assert_eq!(config.review.max_pages, 3);
        assert_eq!(config.review_mode(), ReviewMode::OneShot);
        assert!(!config.api.enable_public_share);
    }

    #[test]
    fn test_exhaustive_overrides_approach() {
        let mut config = Config::default();
        let mut args = review_args();
        args.approach = Some(Approach::OneShot);
        args.exhaustive = true;
        args.max_pages = Some(40);
        config.merge_with_args(&args);

        assert_eq!(config.review_mode(), ReviewMode::Exhaustive);
        assert_eq!(config.page_cap(), 40);
        assert_eq!(config.review.max_pages, 20);
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());
        config.review.max_pages = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[polling]"));
        assert!(toml_str.contains("[review]"));
        assert!(toml_str.contains("[steps]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.review.approach, Approach::MultiStep);
    }
}
