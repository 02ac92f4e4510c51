//! Report output.
//!
//! `writer` persists a finished `SiteReport` as JSON; `html` renders
//! persisted files for the viewer.

pub mod html;
pub mod writer;

pub use writer::{write_report, LEGACY_REPORT_NAME, REPORT_PREFIX};
