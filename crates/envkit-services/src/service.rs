//! Service definitions and health records

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use envkit_fs::{NormalizedPath, config};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A runnable unit with a command, an optional port and startup dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Filled from the definition map key when the orchestrator takes ownership
    #[serde(default)]
    pub name: String,
    pub command: String,
    /// `0` means the service is not health-probed
    #[serde(default)]
    pub port: u16,
    #[serde(default, alias = "dependsOn")]
    pub depends_on: Vec<String>,
}

impl Service {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            port: 0,
            depends_on: Vec::new(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Address the health probe targets, if the service declares a port.
    pub fn url(&self) -> Option<String> {
        (self.port > 0).then(|| format!("http://localhost:{}", self.port))
    }
}

/// A `[services.<name>]` document as produced by config loading
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinitions {
    #[serde(default)]
    pub services: BTreeMap<String, Service>,
}

impl ServiceDefinitions {
    /// Read the `services` table of a TOML, JSON or YAML config file.
    ///
    /// Other top-level keys are ignored, so the definitions can live in the
    /// project file next to other settings. A file without a `services`
    /// table yields no services; a missing file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = NormalizedPath::new(path);
        let definitions: Self = config::load(&path)?;
        tracing::debug!(path = %path, services = definitions.services.len(), "loaded service definitions");
        Ok(definitions)
    }

    /// The definition map with every service named after its key.
    pub fn into_services(self) -> BTreeMap<String, Service> {
        self.services
            .into_iter()
            .map(|(name, mut service)| {
                service.name = name.clone();
                (name, service)
            })
            .collect()
    }
}

/// Lifecycle state of a tracked service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Stopped,
    Starting,
    Running,
    Error,
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Point-in-time health of one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub name: String,
    pub status: ServiceStatus,
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ServiceHealth {
    /// Initial record for a freshly tracked service.
    pub fn stopped(service: &Service) -> Self {
        Self {
            name: service.name.clone(),
            status: ServiceStatus::Stopped,
            healthy: false,
            message: None,
            last_check: Utc::now(),
            url: service.url(),
        }
    }
}
