//! Wire and task types for the Browser Use Cloud API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Local view of a remote task's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    /// Set locally when the poll loop gives up.
    Timeout,
}

impl TaskStatus {
    /// Map a remote status string. Unknown strings are treated as still running.
    pub fn from_remote(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "created" | "queued" | "pending" => TaskStatus::Pending,
            "finished" | "completed" | "stopped" => TaskStatus::Completed,
            "failed" | "error" => TaskStatus::Failed,
            _ => TaskStatus::Running,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Timeout => "timeout",
        };
        write!(f, "{}", name)
    }
}

/// Per-task submission options.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOptions {
    pub allowed_domains: Vec<String>,
    pub max_steps: u32,
    pub enable_public_share: bool,
}

/// `POST /run-task` request body.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRequest {
    pub task: String,
    pub llm_model: String,
    pub max_agent_steps: u32,
    pub use_adblock: bool,
    pub use_proxy: bool,
    pub highlight_elements: bool,
    pub enable_public_share: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_domains: Vec<String>,
}

/// `POST /run-task` response.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedTask {
    #[serde(default)]
    pub id: Option<String>,
}

/// `GET /task/{id}` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskDetails {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub public_share_url: Option<String>,
    #[serde(default)]
    pub live_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TaskDetails {
    pub fn was_stopped(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("stopped")
    }

    /// True when the output is missing, null or an empty string.
    pub fn output_is_empty(&self) -> bool {
        match &self.output {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        }
    }
}

/// A submitted remote task, owned by the client until its result is normalized.
#[derive(Debug, Clone)]
pub struct ReviewTask {
    pub id: String,
    pub submitted_instruction: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub share_url: Option<String>,
    pub live_url: Option<String>,
}

impl ReviewTask {
    pub fn new(id: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            submitted_instruction: instruction.into(),
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            share_url: None,
            live_url: None,
        }
    }

    /// Pick up share identifiers and status from a details response.
    pub fn absorb(&mut self, details: &TaskDetails) {
        if self.share_url.is_none() {
            self.share_url = details.public_share_url.clone().filter(|s| !s.is_empty());
        }
        if self.live_url.is_none() {
            self.live_url = details.live_url.clone().filter(|s| !s.is_empty());
        }
        if !details.status.is_empty() {
            self.status = TaskStatus::from_remote(&details.status);
        }
    }
}

/// Output of a completed task, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutput {
    /// The remote already returned structured JSON.
    Json(Value),
    /// Free text, possibly with embedded JSON.
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    pub task_id: String,
    pub output: RawOutput,
    /// The task was stopped before finishing.
    pub partial: bool,
}

impl RawResult {
    pub fn from_output(task_id: impl Into<String>, output: Option<Value>, partial: bool) -> Self {
        let output = match output {
            None | Some(Value::Null) => RawOutput::Text(String::new()),
            Some(Value::String(text)) => RawOutput::Text(text),
            Some(value) => RawOutput::Json(value),
        };
        Self {
            task_id: task_id.into(),
            output,
            partial,
        }
    }

    #[cfg(test)]
    pub fn text(task_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            output: RawOutput::Text(text.into()),
            partial: false,
        }
    }

    #[cfg(test)]
    pub fn json(task_id: impl Into<String>, value: Value) -> Self {
        Self {
            task_id: task_id.into(),
            output: RawOutput::Json(value),
            partial: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_mapping() {
        assert_eq!(TaskStatus::from_remote("created"), TaskStatus::Pending);
        assert_eq!(TaskStatus::from_remote("in_progress"), TaskStatus::Running);
        assert_eq!(TaskStatus::from_remote("paused"), TaskStatus::Running);
        assert_eq!(TaskStatus::from_remote("FINISHED"), TaskStatus::Completed);
        assert_eq!(TaskStatus::from_remote("stopped"), TaskStatus::Completed);
        assert_eq!(TaskStatus::from_remote("failed"), TaskStatus::Failed);
        assert_eq!(TaskStatus::from_remote("something-new"), TaskStatus::Running);
    }

    #[test]
    fn test_request_omits_empty_domains() {
        let request = TaskRequest {
            task: "review".into(),
            llm_model: "gpt-4.1-mini".into(),
            max_agent_steps: 20,
            use_adblock: true,
            use_proxy: true,
            highlight_elements: false,
            enable_public_share: true,
            allowed_domains: vec![],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("allowed_domains").is_none());
        assert_eq!(json["enable_public_share"], json!(true));
        assert_eq!(json["max_agent_steps"], json!(20));
    }

    #[test]
    fn test_raw_result_from_output() {
        let raw = RawResult::from_output("t", Some(json!("{\"a\":1}")), false);
        assert_eq!(raw.output, RawOutput::Text("{\"a\":1}".into()));

        let raw = RawResult::from_output("t", Some(json!({"a": 1})), true);
        assert!(matches!(raw.output, RawOutput::Json(_)));
        assert!(raw.partial);

        let raw = RawResult::from_output("t", None, false);
        assert_eq!(raw.output, RawOutput::Text(String::new()));
    }

    #[test]
    fn test_task_absorbs_share_urls() {
        let mut task = ReviewTask::new("t1", "do it");
        let details: TaskDetails = serde_json::from_value(json!({
            "id": "t1",
            "status": "running",
            "public_share_url": "https://share.example/t1",
            "live_url": ""
        }))
        .unwrap();
        task.absorb(&details);
        assert_eq!(task.share_url.as_deref(), Some("https://share.example/t1"));
        assert_eq!(task.live_url, None);
        assert_eq!(task.status, TaskStatus::Running);
    }
}
