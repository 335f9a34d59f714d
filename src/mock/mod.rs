//! In-process fakes for the external collaborators
//!
//! Each fake implements one capability trait, records what it was asked to
//! do, and supports failure injection so error paths can be exercised
//! without a packager, a git remote or a release host.
//!
//! - [`MockPackager`]: writes artifact files into the job's output directory
//! - [`MockGateway`]: in-memory local and remote tag namespaces
//! - [`MockReleaseHost`]: records releases, one per tag

mod failure;
mod gateway;
mod host;
mod packager;

pub use failure::{FailureConfig, FailureInjector, MockOperation};
pub use gateway::{MockGateway, MockTag};
pub use host::MockReleaseHost;
pub use packager::MockPackager;
