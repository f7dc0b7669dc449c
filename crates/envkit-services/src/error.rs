//! Error types for service orchestration

use crate::provider::ProviderError;

/// Result type for orchestrator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while orchestrating services
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No tracked service has this name
    #[error("service not found: {name}")]
    ServiceNotFound { name: String },

    /// The provider failed to create, start or launch the service session
    #[error("failed to start service '{name}': {source}")]
    ServiceStart {
        name: String,
        #[source]
        source: ProviderError,
    },

    /// Skipped because a dependency failed to start
    #[error("service '{name}' not started: dependency '{dependency}' failed")]
    DependencyFailed { name: String, dependency: String },

    /// The provider failed to stop the service session
    #[error("failed to stop service '{name}': {source}")]
    ServiceStop {
        name: String,
        #[source]
        source: ProviderError,
    },

    /// `depends_on` references a service that is not in the definition map
    #[error("service '{service}' depends on unknown service '{dependency}'")]
    UnknownDependency { service: String, dependency: String },

    /// Services depend on each other in a loop
    #[error("service dependency cycle detected: {}", .cycle.join(" -> "))]
    DependencyCycle { cycle: Vec<String> },

    /// The caller's cancellation token fired
    #[error("operation cancelled")]
    Cancelled,

    /// One or more services could not be stopped
    #[error("failed to stop {} service(s): {}", .failures.len(), .failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    StopAll { failures: Vec<Error> },

    /// Listing sessions through the provider failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A service or orchestrator config file could not be read
    #[error(transparent)]
    Config(#[from] envkit_fs::Error),
}
