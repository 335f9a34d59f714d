//! Lane configuration
//!
//! Built-in defaults, an optional repo file and CLI overrides are merged
//! into one [`EffectiveConfig`], which carries the typed [`LaneConfig`].

mod effective;
mod lane;
mod merge;

pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use lane::{
    BuildSettings, HostSettings, LaneConfig, PackagerSettings, PublishSettings, ResolvedPaths,
    VcsSettings, REPO_CONFIG_PATH,
};
pub use merge::{deep_merge, merge_layers};
