//! Run summary and failure taxonomy
//!
//! Every run ends with a `release_summary.json` and a stable exit code.

mod failure;
mod run_summary;

pub use failure::{ExitCode, FailureKind, Status};
pub use run_summary::{RunSummary, RUN_SUMMARY_SCHEMA_ID, RUN_SUMMARY_SCHEMA_VERSION};
