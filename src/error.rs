//! Error taxonomy for a review run.
//!
//! Page-level decode problems never surface here: they degrade the page
//! record instead. Only transport, polling, remote failure and
//! aggregate-level decode failures are errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    /// Transport or authentication failure while creating a task.
    #[error("task submission failed: {0}")]
    Submission(String),

    /// The local wall-clock ceiling elapsed while the task was still pending or running.
    #[error("task {task_id} did not finish within {waited_secs}s")]
    PollTimeout { task_id: String, waited_secs: u64 },

    /// The remote service reported the task as failed.
    #[error("task {task_id} failed remotely: {reason}")]
    RemoteTaskFailed { task_id: String, reason: String },

    /// An aggregate (site, discovery or synthesis) response could not be decoded.
    #[error("could not decode {shape} output: {reason}")]
    Normalization { shape: &'static str, reason: String },

    /// Missing credential or invalid settings.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ReviewError {
    /// Only submission failures may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReviewError::Submission(_))
    }

    pub fn normalization(shape: &'static str, reason: impl Into<String>) -> Self {
        ReviewError::Normalization {
            shape,
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for ReviewError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ReviewError::Submission(format!("request timed out: {}", e))
        } else if e.is_connect() {
            ReviewError::Submission(format!("cannot reach remote API: {}", e))
        } else {
            ReviewError::Submission(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_submission_is_retryable() {
        assert!(ReviewError::Submission("boom".into()).is_retryable());
        assert!(!ReviewError::PollTimeout {
            task_id: "t".into(),
            waited_secs: 1
        }
        .is_retryable());
        assert!(!ReviewError::RemoteTaskFailed {
            task_id: "t".into(),
            reason: "x".into()
        }
        .is_retryable());
        assert!(!ReviewError::normalization("site", "bad").is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = ReviewError::PollTimeout {
            task_id: "abc".into(),
            waited_secs: 900,
        };
        assert_eq!(err.to_string(), "task abc did not finish within 900s");

        let err = ReviewError::normalization("discovery", "no links");
        assert!(err.to_string().contains("discovery"));
    }
}
