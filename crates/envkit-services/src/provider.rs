//! Provider trait and session types
//!
//! A provider is the isolation backend (container runtime, lightweight VM,
//! SSH host) that the orchestrator drives. The orchestrator treats it as
//! opaque and only ever addresses sessions by id.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::service::Service;

/// Errors reported by a provider backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("{operation} failed: {message}")]
    Failed { operation: String, message: String },
}

impl ProviderError {
    pub fn failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Lifecycle state of a provider session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Created,
    Running,
    Stopped,
}

/// An isolated execution context managed by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Name of the backend that owns the session
    pub provider: String,
    pub status: SessionStatus,
    pub workspace: PathBuf,
}

/// Settings for creating a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Ports the session must expose to the host
    #[serde(default)]
    pub ports: Vec<u16>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl SessionConfig {
    /// Session settings for running `service`.
    pub fn for_service(service: &Service) -> Self {
        let mut config = Self::default();
        if service.port > 0 {
            config.ports.push(service.port);
        }
        config
            .labels
            .insert("envkit.service".to_string(), service.name.clone());
        config
    }
}

/// A command to run inside a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOptions {
    /// Shell command line
    pub command: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Return once the command is launched instead of waiting for it to exit
    #[serde(default)]
    pub detach: bool,
}

impl ExecOptions {
    /// A long-running command that keeps going after `exec` returns.
    pub fn detached(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            env: BTreeMap::new(),
            detach: true,
        }
    }
}

/// Isolation backend capability consumed by the orchestrator
#[async_trait]
pub trait Provider: Send + Sync {
    /// Backend name, e.g. `docker`
    fn name(&self) -> &str;

    async fn create(
        &self,
        session_id: &str,
        workspace: &Path,
        config: &SessionConfig,
    ) -> ProviderResult<Session>;

    async fn start(&self, session_id: &str) -> ProviderResult<()>;

    async fn stop(&self, session_id: &str) -> ProviderResult<()>;

    async fn exec(&self, session_id: &str, options: &ExecOptions) -> ProviderResult<()>;

    async fn list(&self) -> ProviderResult<Vec<Session>>;
}
