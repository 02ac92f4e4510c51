//! Transport seam for the remote automation service.
//!
//! `TaskApi` is the narrow capability the rest of the crate depends on;
//! `BrowserUseApi` implements it over the Browser Use Cloud REST API.

use super::types::{CreatedTask, TaskDetails, TaskRequest};
use crate::error::{Result, ReviewError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Create a task and return its id.
    async fn create_task(&self, request: &TaskRequest) -> Result<String>;

    /// Full task details, including output and share identifiers.
    async fn task_details(&self, task_id: &str) -> Result<TaskDetails>;

    /// Raw remote status string.
    async fn task_status(&self, task_id: &str) -> Result<String> {
        Ok(self.task_details(task_id).await?.status)
    }

    /// Output file of a finished task, for tasks whose `output` field is empty.
    /// `None` when the task has no output file.
    async fn task_output_file(&self, task_id: &str) -> Result<Option<Value>>;
}

pub struct BrowserUseApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl BrowserUseApi {
    pub fn new(base_url: &str, token: String, request_timeout: Duration) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(ReviewError::Config(
                "Browser Use API token is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ReviewError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn error_for(response: reqwest::Response) -> ReviewError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ReviewError::Submission(format!(
                "authentication rejected ({}): check BROWSER_USE_API_TOKEN",
                status
            )),
            _ => ReviewError::Submission(format!("API error {}: {}", status, body)),
        }
    }
}

#[async_trait]
impl TaskApi for BrowserUseApi {
    async fn create_task(&self, request: &TaskRequest) -> Result<String> {
        let response = self
            .client
            .post(self.url("run-task"))
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let created: CreatedTask = response
            .json()
            .await
            .map_err(|e| ReviewError::Submission(format!("malformed create response: {}", e)))?;

        created
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ReviewError::Submission("no task id returned from API".to_string()))
    }

    async fn task_details(&self, task_id: &str) -> Result<TaskDetails> {
        let response = self
            .client
            .get(self.url(&format!("task/{}", task_id)))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ReviewError::Submission(format!("malformed task details: {}", e)))
    }

    async fn task_status(&self, task_id: &str) -> Result<String> {
        let response = self
            .client
            .get(self.url(&format!("task/{}/status", task_id)))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        // The endpoint returns a bare JSON string.
        let body = response.text().await?;
        let status = serde_json::from_str::<String>(&body)
            .unwrap_or_else(|_| body.trim().trim_matches('"').to_string());
        debug!(task_id, status = %status, "Fetched task status");
        Ok(status)
    }

    async fn task_output_file(&self, task_id: &str) -> Result<Option<Value>> {
        let response = self
            .client
            .get(self.url(&format!("get-task-output-file/{}", task_id)))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body = response.text().await?;
        Ok(parse_output_file(&body))
    }
}

/// JSON bodies are taken as structured output; anything else is kept as text
/// for the embedded-block scan.
fn parse_output_file(body: &str) -> Option<Value> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    Some(serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_output_file() {
        assert_eq!(parse_output_file("  "), None);
        assert_eq!(
            parse_output_file("{\"links\": [\"a\"]}"),
            Some(json!({"links": ["a"]}))
        );
        assert_eq!(
            parse_output_file("Done. {\"score\": 7}"),
            Some(json!("Done. {\"score\": 7}"))
        );
    }

    #[test]
    fn test_rejects_empty_token() {
        let result = BrowserUseApi::new(
            "https://api.browser-use.com/api/v1",
            "  ".to_string(),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(ReviewError::Config(_))));
    }

    #[test]
    fn test_url_joining() {
        let api = BrowserUseApi::new(
            "https://api.browser-use.com/api/v1/",
            "token".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            api.url("task/abc/status"),
            "https://api.browser-use.com/api/v1/task/abc/status"
        );
    }
}
