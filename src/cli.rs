//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::ReviewMode;
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default review target.
pub const DEFAULT_URL: &str = "https://docs.browser-use.com/introduction";

/// DocAudit - AI-powered documentation site reviewer
///
/// Drives a cloud browser agent to discover, read and score the pages of a
/// documentation site, then writes a JSON report you can browse locally.
///
/// Examples:
///   docaudit review https://docs.example.com/intro
///   docaudit review https://docs.example.com --approach one-shot --max-pages 5
///   docaudit review https://docs.example.com --exhaustive
///   docaudit view --port 5002
///   docaudit init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Review a documentation site
    Review(ReviewArgs),

    /// Browse persisted reports in a local web viewer
    View(ViewArgs),

    /// Generate a default .docaudit.toml configuration file
    InitConfig,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ReviewArgs {
    /// Documentation page to start from
    #[arg(value_name = "URL", default_value = DEFAULT_URL)]
    pub url: String,

    /// Maximum number of pages to review
    ///
    /// Defaults to 20, or 100 with --exhaustive.
    #[arg(long, value_name = "COUNT")]
    pub max_pages: Option<usize>,

    /// Review strategy (one-shot, multi-step)
    #[arg(long, value_name = "APPROACH")]
    pub approach: Option<Approach>,

    /// Crawl every in-domain page, up to the page cap
    ///
    /// Uses the multi-step strategy with a crawl as discovery, whatever
    /// --approach says.
    #[arg(long)]
    pub exhaustive: bool,

    /// Directory to write the report to
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Seconds between task status polls
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Maximum seconds to wait for each remote task
    #[arg(long, value_name = "SECS")]
    pub max_wait: Option<u64>,

    /// Do not make remote tasks publicly viewable
    #[arg(long)]
    pub no_public_share: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .docaudit.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ViewArgs {
    /// Directory containing report files
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    pub dir: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value = "5002")]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
}

/// Review strategy selectable with --approach.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Approach {
    /// One remote task discovers and reviews everything
    OneShot,
    /// Discovery, one task per page, then synthesis (default)
    #[default]
    MultiStep,
}

impl From<Approach> for ReviewMode {
    fn from(approach: Approach) -> Self {
        match approach {
            Approach::OneShot => ReviewMode::OneShot,
            Approach::MultiStep => ReviewMode::MultiStep,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Review(review) => review.validate(),
            Command::View(view) => {
                if view.port == 0 {
                    return Err("Port must be at least 1".to_string());
                }
                Ok(())
            }
            Command::InitConfig => Ok(()),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

impl ReviewArgs {
    /// True when --approach was given but --exhaustive takes precedence.
    pub fn approach_overridden(&self) -> bool {
        self.exhaustive && self.approach.is_some()
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err("URL must start with 'http://' or 'https://'".to_string());
        }

        if self.max_pages == Some(0) {
            return Err("Max pages must be at least 1".to_string());
        }

        if self.poll_interval == Some(0) {
            return Err("Poll interval must be at least 1 second".to_string());
        }

        if self.max_wait == Some(0) {
            return Err("Max wait must be at least 1 second".to_string());
        }

        if let Some(ref config) = self.config {
            if !config.exists() {
                return Err(format!("Config file does not exist: {}", config.display()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(command: Command) -> Args {
        Args {
            command,
            verbose: false,
            quiet: false,
        }
    }

    fn review() -> ReviewArgs {
        ReviewArgs {
            url: "https://docs.example.com/intro".to_string(),
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
    fn test_parse_review_defaults() {
        let args = Args::try_parse_from(["docaudit", "review"]).unwrap();
        match args.command {
            Command::Review(review) => {
                assert_eq!(review.url, DEFAULT_URL);
                assert_eq!(review.max_pages, None);
                assert!(!review.exhaustive);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_review_flags() {
        let args = Args::try_parse_from([
            "docaudit",
            "review",
            "https://docs.example.com",
            "--approach",
            "one-shot",
            "--max-pages",
            "5",
            "--no-public-share",
            "-v",
        ])
        .unwrap();
        assert!(args.verbose);
        let Command::Review(review) = args.command else {
            panic!("expected review");
        };
        assert_eq!(review.approach, Some(Approach::OneShot));
        assert_eq!(review.max_pages, Some(5));
        assert!(review.no_public_share);
    }

    #[test]
    fn test_parse_view() {
        let args = Args::try_parse_from(["docaudit", "view", "--port", "8080"]).unwrap();
        let Command::View(view) = args.command else {
            panic!("expected view");
        };
        assert_eq!(view.port, 8080);
        assert_eq!(view.host, "127.0.0.1");
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut review = review();
        review.url = "docs.example.com".to_string();
        assert!(make_args(Command::Review(review)).validate().is_err());
    }

    #[test]
    fn test_validation_zero_pages() {
        let mut review = review();
        review.max_pages = Some(0);
        assert!(review.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(Command::InitConfig);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(Command::InitConfig);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_exhaustive_overrides_any_approach() {
        let mut review = review();
        assert!(!review.approach_overridden());

        review.exhaustive = true;
        assert!(!review.approach_overridden());

        review.approach = Some(Approach::MultiStep);
        assert!(review.approach_overridden());

        review.approach = Some(Approach::OneShot);
        assert!(review.approach_overridden());
    }

    #[test]
    fn test_approach_maps_to_mode() {
        assert_eq!(ReviewMode::from(Approach::OneShot), ReviewMode::OneShot);
        assert_eq!(ReviewMode::from(Approach::MultiStep), ReviewMode::MultiStep);
    }
}
