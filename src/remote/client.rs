//! Task submission and completion polling.

use super::api::TaskApi;
use super::types::{RawResult, ReviewTask, TaskDetails, TaskOptions, TaskRequest, TaskStatus};
use crate::error::{Result, ReviewError};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Upper bound on submission retries, whatever the configuration says.
pub const MAX_SUBMIT_RETRIES: u32 = 3;

/// Settings shared by every task the client submits.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub llm_model: String,
    pub use_adblock: bool,
    pub use_proxy: bool,
    pub highlight_elements: bool,
    pub poll_interval: Duration,
    pub max_wait: Duration,
    pub submit_retries: u32,
    pub retry_backoff: Duration,
    pub show_progress: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            llm_model: "gpt-4.1-mini".to_string(),
            use_adblock: true,
            use_proxy: true,
            highlight_elements: false,
            poll_interval: Duration::from_secs(15),
            max_wait: Duration::from_secs(900),
            submit_retries: 1,
            retry_backoff: Duration::from_secs(5),
            show_progress: true,
        }
    }
}

pub struct RemoteTaskClient {
    api: Arc<dyn TaskApi>,
    settings: ClientSettings,
}

impl RemoteTaskClient {
    pub fn new(api: Arc<dyn TaskApi>, settings: ClientSettings) -> Self {
        Self { api, settings }
    }

    /// Submit an instruction. Share identifiers are surfaced as soon as the
    /// remote reports them. Only `Submission` failures are retried.
    pub async fn submit(&self, instruction: &str, options: &TaskOptions) -> Result<ReviewTask> {
        let request = TaskRequest {
            task: instruction.to_string(),
            llm_model: self.settings.llm_model.clone(),
            max_agent_steps: options.max_steps,
            use_adblock: self.settings.use_adblock,
            use_proxy: self.settings.use_proxy,
            highlight_elements: self.settings.highlight_elements,
            enable_public_share: options.enable_public_share,
            allowed_domains: options.allowed_domains.clone(),
        };

        let retries = self.settings.submit_retries.min(MAX_SUBMIT_RETRIES);
        let mut attempt = 0;
        let task_id = loop {
            match self.api.create_task(&request).await {
                Ok(id) => break id,
                Err(e) if e.is_retryable() && attempt < retries => {
                    attempt += 1;
                    let backoff = self.settings.retry_backoff * attempt;
                    warn!(
                        "Submission failed ({}), retrying in {:?} ({}/{})",
                        e, backoff, attempt, retries
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        };

        let mut task = ReviewTask::new(task_id, instruction);
        info!(task_id = %task.id, max_steps = options.max_steps, "Task created");
        println!("    Task created: {}", task.id);

        match self.api.task_details(&task.id).await {
            Ok(details) => {
                task.absorb(&details);
                announce_share_urls(&task);
            }
            Err(e) => debug!(task_id = %task.id, "Share URLs not available yet: {}", e),
        }

        Ok(task)
    }

    /// Poll with the configured interval and ceiling.
    pub async fn wait(&self, task: &mut ReviewTask) -> Result<RawResult> {
        self.await_completion(task, self.settings.poll_interval, self.settings.max_wait)
            .await
    }

    /// Poll until the task is terminal or `max_wait` elapses. The remote task
    /// is not cancelled on local timeout.
    pub async fn await_completion(
        &self,
        task: &mut ReviewTask,
        poll_interval: Duration,
        max_wait: Duration,
    ) -> Result<RawResult> {
        let started = Instant::now();
        debug!(task_id = %task.id, instruction = %task.submitted_instruction, "Waiting for task");
        let spinner = self.spinner(&task.id);
        let mut share_shown = task.share_url.is_some() || task.live_url.is_some();

        loop {
            match self.api.task_status(&task.id).await {
                Ok(remote) => {
                    task.status = TaskStatus::from_remote(&remote);
                    spinner.set_message(format!("task {} {}", task.id, remote));
                    debug!(task_id = %task.id, status = %remote, "Polled task");

                    match task.status {
                        TaskStatus::Running if !share_shown => {
                            if let Ok(details) = self.api.task_details(&task.id).await {
                                task.absorb(&details);
                                if task.share_url.is_some() || task.live_url.is_some() {
                                    spinner.suspend(|| announce_share_urls(&*task));
                                    share_shown = true;
                                }
                            }
                        }
                        TaskStatus::Completed => match self.api.task_details(&task.id).await {
                            Ok(details) => {
                                spinner.finish_and_clear();
                                task.absorb(&details);
                                task.status = TaskStatus::Completed;
                                return self.completed_result(task, details).await;
                            }
                            Err(e) => warn!(task_id = %task.id, "Could not fetch finished task: {}", e),
                        },
                        TaskStatus::Failed => {
                            spinner.finish_and_clear();
                            let reason = match self.api.task_details(&task.id).await {
                                Ok(details) => details.error.unwrap_or_else(|| "unknown error".to_string()),
                                Err(_) => "unknown error".to_string(),
                            };
                            return Err(ReviewError::RemoteTaskFailed {
                                task_id: task.id.clone(),
                                reason,
                            });
                        }
                        _ => {}
                    }
                }
                Err(e) => warn!(task_id = %task.id, "Status poll failed: {}", e),
            }

            let remaining = max_wait.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                spinner.finish_and_clear();
                task.status = TaskStatus::Timeout;
                warn!(task_id = %task.id, "Task timed out locally; remote task left running");
                return Err(ReviewError::PollTimeout {
                    task_id: task.id.clone(),
                    waited_secs: max_wait.as_secs(),
                });
            }
            tokio::time::sleep(poll_interval.min(remaining)).await;
        }
    }

    /// Result of a finished task. An empty `output` falls back to the task's
    /// output file before the task counts as having produced nothing.
    async fn completed_result(
        &self,
        task: &ReviewTask,
        mut details: TaskDetails,
    ) -> Result<RawResult> {
        if details.output_is_empty() {
            match self.api.task_output_file(&task.id).await {
                Ok(Some(file)) => {
                    debug!(task_id = %task.id, "Using task output file");
                    details.output = Some(file);
                }
                Ok(None) => debug!(task_id = %task.id, "Task finished without output"),
                Err(e) => warn!(task_id = %task.id, "Could not fetch task output file: {}", e),
            }
        }

        let stopped = details.was_stopped();
        if stopped && details.output_is_empty() {
            return Err(ReviewError::RemoteTaskFailed {
                task_id: task.id.clone(),
                reason: "task was stopped before producing output".to_string(),
            });
        }
        if stopped {
            warn!(task_id = %task.id, "Task was stopped; result may be partial");
        }
        Ok(RawResult::from_output(task.id.clone(), details.output, stopped))
    }

    fn spinner(&self, task_id: &str) -> ProgressBar {
        if !self.settings.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("    {spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("task {} submitted", task_id));
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }
}

fn announce_share_urls(task: &ReviewTask) {
    if let Some(ref url) = task.share_url {
        println!("    🔗 Public share: {}", url);
        info!(task_id = %task.id, share_url = %url, "Public share available");
    }
    if let Some(ref url) = task.live_url {
        println!("    📺 Live view: {}", url);
        info!(task_id = %task.id, live_url = %url, "Live view available");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::testing::{Plan, ScriptedApi};
    use crate::remote::RawOutput;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn fast_settings() -> ClientSettings {
        ClientSettings {
            poll_interval: Duration::from_millis(1),
            max_wait: Duration::from_millis(50),
            retry_backoff: Duration::from_millis(1),
            show_progress: false,
            ..Default::default()
        }
    }

    fn options() -> TaskOptions {
        TaskOptions {
            allowed_domains: vec!["docs.example.com".into()],
            max_steps: 20,
            enable_public_share: true,
        }
    }

    #[tokio::test]
    async fn test_submit_and_complete() {
        let api = Arc::new(ScriptedApi::new(vec![Plan::Complete(json!({"links": []}))]));
        let client = RemoteTaskClient::new(api.clone(), fast_settings());

        let mut task = assert_ok!(client.submit("find links", &options()).await);
        assert_eq!(task.share_url.as_deref(), Some("https://share.example/task-1"));

        let raw = assert_ok!(client.wait(&mut task).await);
        assert_eq!(raw.output, RawOutput::Json(json!({"links": []})));
        assert_eq!(task.status, TaskStatus::Completed);

        let requests = api.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].enable_public_share);
        assert_eq!(requests[0].allowed_domains, vec!["docs.example.com"]);
    }

    #[tokio::test]
    async fn test_remote_failure_is_not_retried() {
        let api = Arc::new(ScriptedApi::new(vec![Plan::Fail("captcha".into())]));
        let client = RemoteTaskClient::new(api.clone(), fast_settings());

        let mut task = client.submit("review", &options()).await.unwrap();
        let err = assert_err!(client.wait(&mut task).await);
        match err {
            ReviewError::RemoteTaskFailed { reason, .. } => assert_eq!(reason, "captcha"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(api.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_poll_timeout() {
        let api = Arc::new(ScriptedApi::new(vec![Plan::NeverFinish]));
        let client = RemoteTaskClient::new(api, fast_settings());

        let mut task = client.submit("review", &options()).await.unwrap();
        let err = client
            .await_completion(&mut task, Duration::from_millis(2), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::PollTimeout { .. }));
        assert_eq!(task.status, TaskStatus::Timeout);
    }

    #[tokio::test]
    async fn test_submission_retry_is_gated() {
        let api = Arc::new(
            ScriptedApi::new(vec![Plan::Complete(json!({}))]).failing_submissions(1),
        );
        let client = RemoteTaskClient::new(api.clone(), fast_settings());
        assert_ok!(client.submit("review", &options()).await);
        assert_eq!(api.create_attempts(), 2);

        let api = Arc::new(
            ScriptedApi::new(vec![Plan::Complete(json!({}))]).failing_submissions(1),
        );
        let settings = ClientSettings {
            submit_retries: 0,
            ..fast_settings()
        };
        let client = RemoteTaskClient::new(api.clone(), settings);
        let err = assert_err!(client.submit("review", &options()).await);
        assert!(matches!(err, ReviewError::Submission(_)));
        assert_eq!(api.create_attempts(), 1);
    }

    #[tokio::test]
    async fn test_retry_count_is_capped() {
        let api = Arc::new(ScriptedApi::new(vec![]).failing_submissions(10));
        let settings = ClientSettings {
            submit_retries: 50,
            ..fast_settings()
        };
        let client = RemoteTaskClient::new(api.clone(), settings);
        assert!(client.submit("review", &options()).await.is_err());
        assert_eq!(api.create_attempts(), 1 + MAX_SUBMIT_RETRIES as usize);
    }

    #[tokio::test]
    async fn test_stopped_task_is_partial() {
        let api = Arc::new(ScriptedApi::new(vec![
            Plan::Stop(Some(json!("{\"url\": \"u\"}"))),
            Plan::Stop(None),
        ]));
        let client = RemoteTaskClient::new(api, fast_settings());

        let mut task = client.submit("review", &options()).await.unwrap();
        let raw = client.wait(&mut task).await.unwrap();
        assert!(raw.partial);

        let mut task = client.submit("review", &options()).await.unwrap();
        let err = client.wait(&mut task).await.unwrap_err();
        assert!(matches!(err, ReviewError::RemoteTaskFailed { .. }));
    }

    #[tokio::test]
    async fn test_empty_output_falls_back_to_output_file() {
        let api = Arc::new(ScriptedApi::new(vec![Plan::CompleteWithFile(json!({
            "links": ["https://docs.example.com/a"]
        }))]));
        let client = RemoteTaskClient::new(api, fast_settings());

        let mut task = client.submit("find links", &options()).await.unwrap();
        let raw = assert_ok!(client.wait(&mut task).await);
        assert_eq!(
            raw.output,
            RawOutput::Json(json!({"links": ["https://docs.example.com/a"]}))
        );
        assert!(!raw.partial);
    }

    #[tokio::test]
    async fn test_transient_status_errors_keep_polling() {
        let api = Arc::new(ScriptedApi::new(vec![Plan::FlakyStatus {
            failures: 2,
            output: json!({"score": 7}),
        }]));
        let settings = ClientSettings {
            max_wait: Duration::from_secs(5),
            ..fast_settings()
        };
        let client = RemoteTaskClient::new(api, settings);

        let mut task = client.submit("review", &options()).await.unwrap();
        let raw = assert_ok!(client.wait(&mut task).await);
        assert_eq!(raw.output, RawOutput::Json(json!({"score": 7})));
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_share_url_picked_up_once_running() {
        let api = Arc::new(ScriptedApi::new(vec![Plan::LateShare(json!({"score": 5}))]));
        let settings = ClientSettings {
            max_wait: Duration::from_secs(5),
            ..fast_settings()
        };
        let client = RemoteTaskClient::new(api, settings);

        let mut task = client.submit("review", &options()).await.unwrap();
        assert_eq!(task.share_url, None);

        let raw = assert_ok!(client.wait(&mut task).await);
        assert_eq!(raw.output, RawOutput::Json(json!({"score": 5})));
        assert_eq!(task.share_url.as_deref(), Some("https://share.example/task-1"));
    }
}
