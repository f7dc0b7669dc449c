//! Capability plugin registry for envkit.
//!
//! Plugins are discovered from a directory tree of `plugin.toml` manifests,
//! keyed by their namespace (the manifest directory relative to the
//! discovery root, e.g. `myorg/git`). The registry resolves a requested
//! set of plugins into its transitive closure in a deterministic build
//! order and reports dependency cycles with the offending chain.

pub mod dependency;
pub mod error;
pub mod manifest;
pub mod plugin;
pub mod registry;

/// The canonical filename for plugin manifest files.
///
/// Every directory below the discovery root that contains a file with this
/// name is one plugin.
pub const MANIFEST_FILENAME: &str = "plugin.toml";

pub use dependency::DependencyGraph;
pub use error::{Error, Result};
pub use manifest::PluginManifest;
pub use plugin::Plugin;
pub use registry::PluginRegistry;
