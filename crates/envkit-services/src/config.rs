//! Orchestrator settings

use std::path::Path;
use std::time::Duration;

use envkit_fs::{NormalizedPath, config};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for the [`Orchestrator`](crate::Orchestrator).
///
/// Every field has a default, so an empty document deserializes to
/// [`OrchestratorConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Delay between health probes of one service, in milliseconds
    pub health_interval_ms: u64,
    /// Upper bound on a single probe, in milliseconds
    pub probe_timeout_ms: u64,
    /// Prepended to the service name to form its session id
    pub session_prefix: String,
    /// Host the health probe connects to
    pub probe_host: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            health_interval_ms: 30_000,
            probe_timeout_ms: 5_000,
            session_prefix: "service-".to_string(),
            probe_host: "127.0.0.1".to_string(),
        }
    }
}

/// The part of a project config file the orchestrator reads
#[derive(Debug, Default, Deserialize)]
struct ProjectDocument {
    #[serde(default)]
    orchestrator: OrchestratorConfig,
}

impl OrchestratorConfig {
    /// Read the `orchestrator` table of a project config file.
    ///
    /// A missing file or a file without that table yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let document: ProjectDocument = config::load_or_default(&NormalizedPath::new(path))?;
        Ok(document.orchestrator)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms.max(1))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms.max(1))
    }

    /// Session id used for the service called `name`.
    pub fn session_id(&self, name: &str) -> String {
        format!("{}{}", self.session_prefix, name)
    }
}
