//! DocAudit - AI-powered documentation site reviewer
//!
//! A CLI tool that drives the Browser Use cloud agent to review the pages
//! of a documentation site and writes a scored JSON report.
//!
//! Exit codes:
//!   0 - Review completed
//!   1 - Runtime error (configuration, credentials, I/O, etc.)
//!   2 - Review failed in a fatal phase (a report was still written)

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod normalize;
mod orchestrator;
mod remote;
mod report;
mod viewer;

use anyhow::{Context, Result};
use cli::{Args, Command, ReviewArgs, ViewArgs};
use config::{Config, CONFIG_FILE};
use error::ReviewError;
use models::{ReviewMode, ScoreBand, SiteReport};
use orchestrator::{ModeOrchestrator, OrchestratorConfig, StepBudgets};
use remote::{BrowserUseApi, RemoteTaskClient};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Bearer credential for the remote API.
const TOKEN_ENV: &str = "BROWSER_USE_API_TOKEN";
/// Optional API base URL override.
const BASE_URL_ENV: &str = "BROWSER_USE_API_URL";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    dotenvy::dotenv().ok();

    // Initialize logging
    init_logging(&args);

    info!("DocAudit v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let outcome = match args.command {
        Command::Review(ref review) => run_review(review, args.quiet).await,
        Command::View(ref view) => run_viewer(view).await.map(|_| 0),
        Command::InitConfig => Ok(0),
    };

    match outcome {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .docaudit.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the model, page caps, polling and step budgets.");
    Ok(())
}

/// Initialize logging based on verbosity settings. `RUST_LOG` wins when set.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run one review and persist its report. Returns exit code (0 or 2).
async fn run_review(args: &ReviewArgs, quiet: bool) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(args)?;
    config.merge_with_args(args);
    if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
        config.api.base_url = base_url;
    }
    config.validate()?;

    if args.approach_overridden() {
        warn!("--exhaustive overrides --approach");
    }

    let token = std::env::var(TOKEN_ENV).map_err(|_| {
        ReviewError::Config(format!(
            "{} is not set (export it or add it to a .env file)",
            TOKEN_ENV
        ))
    })?;

    let mode = config.review_mode();
    let max_pages = config.page_cap();

    println!("🤖 Starting documentation review...");
    println!("   URL: {}", args.url);
    println!("   Approach: {}", mode);
    println!("   Max pages: {}", max_pages);
    println!("   Model: {}", config.api.llm_model);
    println!("   Max wait per task: {}s", config.polling.max_wait_seconds);
    if config.api.enable_public_share {
        println!("   ⚠️  Public sharing is on: task instructions and results are viewable via share links.");
    }

    let api = BrowserUseApi::new(
        &config.api.base_url,
        token,
        Duration::from_secs(config.api.request_timeout_seconds),
    )?;
    let client = RemoteTaskClient::new(Arc::new(api), config.client_settings(!quiet));

    let orchestrator = ModeOrchestrator::new(
        client,
        OrchestratorConfig {
            mode,
            max_pages,
            steps: StepBudgets::from(&config.steps),
            enable_public_share: config.api.enable_public_share,
            inter_task_delay: Duration::from_millis(config.polling.inter_task_delay_ms),
        },
    );

    let report = orchestrator.run(&args.url).await?;

    // Persist once, whatever the outcome
    println!("\n📝 Writing report...");
    let path = report::write_report(&report, &config.review.output_dir)?;

    print_summary(&report, start_time.elapsed());
    println!("\n📁 Report saved to: {}", path.display());
    println!("   Browse it with: docaudit view --dir {}", config.review.output_dir.display());

    if report.succeeded() {
        println!("\n✅ Review complete!");
        Ok(0)
    } else {
        eprintln!(
            "\n⛔ Review failed: {}. Partial results were saved (exit code 2).",
            report.error.as_deref().unwrap_or("unknown error")
        );
        Ok(2)
    }
}

fn print_summary(report: &SiteReport, elapsed: Duration) {
    let analysis = &report.site_analysis;

    println!("\n📊 Review Summary:");
    println!("   Pages discovered: {}", report.total_pages_discovered);
    println!("   Pages reviewed: {}", report.total_pages_reviewed);
    if analysis.pages_degraded > 0 {
        println!("   Pages without a review: {}", analysis.pages_degraded);
    }
    match analysis.average_score {
        Some(avg) => println!("   Average score: {:.1}/10", avg),
        None => println!("   Average score: n/a (no scored pages)"),
    }
    let bands: Vec<String> = ScoreBand::ALL
        .iter()
        .map(|band| format!("{} {}", band.name(), analysis.score_distribution.get(*band)))
        .collect();
    println!("   Distribution: {}", bands.join(" | "));
    if report.review_approach == ReviewMode::Exhaustive && report.total_pages_discovered > 0 {
        println!(
            "   Coverage: {:.1}%",
            report.total_pages_reviewed as f64 / report.total_pages_discovered as f64 * 100.0
        );
    }
    println!("   Duration: {:.1}s", elapsed.as_secs_f64());

    if !report.page_reviews.is_empty() {
        println!("\n   First pages:");
        for page in report.page_reviews.iter().take(5) {
            let score = page
                .overall()
                .map(|s| format!("{}/10", s))
                .unwrap_or_else(|| "n/a".to_string());
            println!("     📄 {} ({})", page.display_title(), score);
        }
    }
}

async fn run_viewer(args: &ViewArgs) -> Result<()> {
    if !args.dir.is_dir() {
        anyhow::bail!("Report directory does not exist: {}", args.dir.display());
    }
    viewer::serve(args.dir.clone(), &args.host, args.port).await
}

/// Load configuration from file or use defaults.
fn load_config(args: &ReviewArgs) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
