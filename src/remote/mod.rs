//! Remote automation service client.
//!
//! Submits natural-language instructions to the cloud browser agent and
//! polls them to completion.

pub mod api;
pub mod client;
pub mod types;

pub use api::{BrowserUseApi, TaskApi};
pub use client::{ClientSettings, RemoteTaskClient};
pub use types::{RawOutput, RawResult, TaskOptions, TaskStatus};
