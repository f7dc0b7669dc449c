//! Service orchestration for envkit.
//!
//! The [`Orchestrator`] starts a set of interdependent services through a
//! [`Provider`] (container, VM or remote host backend), one isolated session
//! per service. Services start in dependency stages: siblings in a stage
//! launch concurrently, and a stage begins only after every member of the
//! previous stage is running or has failed. Services that declare a port
//! are then watched by a periodic [`HealthProbe`].

pub mod config;
pub mod error;
pub mod health;
pub mod order;
pub mod orchestrator;
pub mod provider;
pub mod service;

pub use config::OrchestratorConfig;
pub use error::{Error, Result};
pub use health::{HealthProbe, TcpProbe};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use provider::{
    ExecOptions, Provider, ProviderError, ProviderResult, Session, SessionConfig, SessionStatus,
};
pub use service::{Service, ServiceDefinitions, ServiceHealth, ServiceStatus};
pub use tokio_util::sync::CancellationToken;
