//! Shared test fixtures for the envkit workspace.
//!
//! - [`plugins`]: write plugin manifest trees to a scratch directory.
//! - [`provider`]: an in-memory [`Provider`](envkit_services::Provider) that
//!   records every call and fails on demand.
//! - [`probe`]: a [`HealthProbe`](envkit_services::HealthProbe) with scripted
//!   per-port answers.

pub mod plugins;
pub mod probe;
pub mod provider;

pub use plugins::{PluginSpec, write_manifest, write_plugin_tree};
pub use probe::ScriptedProbe;
pub use provider::{ProviderCall, RecordingProvider};
