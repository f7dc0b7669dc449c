//! Staged service startup, shutdown and health tracking

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::RwLock;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::OrchestratorConfig;
use crate::error::{Error, Result};
use crate::health::{HealthProbe, TcpProbe};
use crate::order;
use crate::provider::{ExecOptions, Provider, ProviderError, ProviderResult, Session, SessionConfig};
use crate::service::{Service, ServiceHealth, ServiceStatus};

/// Starts, stops and watches a set of services through a [`Provider`].
///
/// Cloning is cheap; clones share the same tracked state. All service and
/// status state sits behind one reader/writer lock: transitions and probe
/// results take it exclusively, snapshot reads take it shared.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Arc<dyn Provider>,
    probe: Arc<dyn HealthProbe>,
    workspace: PathBuf,
    config: OrchestratorConfig,
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    services: BTreeMap<String, Service>,
    health: BTreeMap<String, ServiceHealth>,
    /// Bumped by every `start`; monitors from older generations stop writing.
    generation: u64,
}

/// Builder for [`Orchestrator`]
pub struct OrchestratorBuilder {
    provider: Arc<dyn Provider>,
    probe: Arc<dyn HealthProbe>,
    workspace: PathBuf,
    config: OrchestratorConfig,
}

impl OrchestratorBuilder {
    /// Directory handed to the provider when creating sessions.
    pub fn workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = workspace.into();
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default [`TcpProbe`].
    pub fn probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator {
            inner: Arc::new(Inner {
                provider: self.provider,
                probe: self.probe,
                workspace: self.workspace,
                config: self.config,
                state: RwLock::new(State::default()),
            }),
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.inner.provider.name())
            .field("workspace", &self.inner.workspace)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn builder(provider: Arc<dyn Provider>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            provider,
            probe: Arc::new(TcpProbe),
            workspace: PathBuf::from("."),
            config: OrchestratorConfig::default(),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// Replace the tracked services and start them in dependency stages.
    ///
    /// Sessions of previously tracked services that were not `stopped` are
    /// stopped first, so a reused name never meets its old session. All
    /// services are then reset to `stopped`. Each stage launches its members
    /// concurrently and completes before the next stage begins. A service
    /// whose dependency ended in `error` is marked `error` without being
    /// launched. Ported services get a health monitor that runs until `ctx`
    /// is cancelled.
    ///
    /// Returns the first failure in stage order; every service's outcome is
    /// available from [`list_services`](Self::list_services).
    pub async fn start(
        &self,
        ctx: &CancellationToken,
        services: BTreeMap<String, Service>,
    ) -> Result<()> {
        let services: BTreeMap<String, Service> = services
            .into_iter()
            .map(|(name, mut service)| {
                service.name = name.clone();
                (name, service)
            })
            .collect();

        let (generation, previous) = {
            let mut state = self.inner.state.write().await;
            let previous: Vec<String> = state
                .health
                .values()
                .filter(|health| health.status != ServiceStatus::Stopped)
                .map(|health| health.name.clone())
                .collect();
            state.generation += 1;
            state.health = services
                .iter()
                .map(|(name, service)| (name.clone(), ServiceHealth::stopped(service)))
                .collect();
            state.services = services.clone();
            (state.generation, previous)
        };

        if !previous.is_empty() {
            tracing::debug!(sessions = previous.len(), "stopping sessions of replaced services");
            join_all(previous.iter().map(|name| self.release(name))).await;
        }

        let stages = order::startup_stages(&services)?;
        tracing::info!(services = services.len(), stages = stages.len(), "starting services");

        let mut failed: HashSet<String> = HashSet::new();
        let mut first_error: Option<Error> = None;

        for (depth, stage) in stages.iter().enumerate() {
            if ctx.is_cancelled() {
                first_error.get_or_insert(Error::Cancelled);
                break;
            }

            let mut skipped = Vec::new();
            let mut launches = Vec::new();
            for name in stage {
                let Some(service) = services.get(name) else {
                    continue;
                };
                let failed_dep = service
                    .depends_on
                    .iter()
                    .find(|dep| failed.contains(dep.as_str()));
                match failed_dep {
                    Some(dep) => skipped.push(Error::DependencyFailed {
                        name: name.clone(),
                        dependency: dep.clone(),
                    }),
                    None => launches.push(self.launch(ctx, service, generation)),
                }
            }

            for err in &skipped {
                if let Error::DependencyFailed { name, dependency } = err {
                    tracing::warn!(service = %name, dependency = %dependency, "skipping service");
                    self.update(name, generation, |health| {
                        health.status = ServiceStatus::Error;
                        health.healthy = false;
                        health.message = Some(format!("dependency '{dependency}' failed to start"));
                    })
                    .await;
                    failed.insert(name.clone());
                }
            }

            let mut stage_errors: Vec<(String, Error)> = join_all(launches)
                .await
                .into_iter()
                .filter_map(|(name, result)| result.err().map(|e| (name, e)))
                .collect();
            stage_errors.sort_by(|a, b| a.0.cmp(&b.0));

            tracing::debug!(stage = depth, members = stage.len(), failures = stage_errors.len(), "stage finished");

            for (name, err) in stage_errors {
                failed.insert(name);
                first_error.get_or_insert(err);
            }
            for err in skipped {
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Launch one service and record the outcome. Returns the service name
    /// alongside the result so a stage can attribute failures.
    ///
    /// The outcome is only recorded while the service is still `starting`.
    /// If it was stopped in the meantime, the freshly booted session is
    /// stopped again and no monitor is spawned.
    async fn launch(
        &self,
        ctx: &CancellationToken,
        service: &Service,
        generation: u64,
    ) -> (String, Result<()>) {
        self.update(&service.name, generation, |health| {
            health.status = ServiceStatus::Starting;
            health.healthy = false;
            health.message = None;
        })
        .await;

        let session_id = self.inner.config.session_id(&service.name);
        let mut created = false;
        let result = tokio::select! {
            _ = ctx.cancelled() => Err(Error::Cancelled),
            booted = self.boot(&session_id, service, &mut created) => booted.map_err(|source| Error::ServiceStart {
                name: service.name.clone(),
                source,
            }),
        };

        match &result {
            Ok(()) => {
                let settled = self
                    .settle(&service.name, generation, |health| {
                        health.status = ServiceStatus::Running;
                        health.healthy = true;
                        health.message = None;
                    })
                    .await;
                if settled {
                    tracing::info!(service = %service.name, session = %session_id, "service running");
                    if service.port > 0 {
                        tokio::spawn(self.clone().monitor(ctx.clone(), service.clone(), generation));
                    }
                } else if self.inner.state.read().await.generation == generation {
                    tracing::info!(service = %service.name, session = %session_id, "service stopped while starting");
                    self.release(&service.name).await;
                }
            }
            Err(err) => {
                tracing::warn!(service = %service.name, error = %err, "service failed to start");
                if created {
                    self.release(&service.name).await;
                }
                let message = match err {
                    Error::ServiceStart { source, .. } => source.to_string(),
                    other => other.to_string(),
                };
                self.settle(&service.name, generation, |health| {
                    health.status = ServiceStatus::Error;
                    health.healthy = false;
                    health.message = Some(message);
                })
                .await;
            }
        }

        (service.name.clone(), result)
    }

    /// Create and start the session, then launch the service command in it.
    /// `created` is set once the provider has allocated the session.
    async fn boot(
        &self,
        session_id: &str,
        service: &Service,
        created: &mut bool,
    ) -> ProviderResult<()> {
        let provider = &self.inner.provider;
        let config = SessionConfig::for_service(service);

        tracing::debug!(service = %service.name, session = %session_id, provider = provider.name(), "creating session");
        provider
            .create(session_id, &self.inner.workspace, &config)
            .await?;
        *created = true;
        provider.start(session_id).await?;
        provider
            .exec(session_id, &ExecOptions::detached(&service.command))
            .await
    }

    /// Best-effort stop of the session behind `name`. Failures are logged.
    async fn release(&self, name: &str) {
        let session_id = self.inner.config.session_id(name);
        match self.inner.provider.stop(&session_id).await {
            Ok(()) | Err(ProviderError::SessionNotFound(_)) => {}
            Err(e) => {
                tracing::warn!(service = %name, session = %session_id, error = %e, "failed to release session");
            }
        }
    }

    /// Probe one service on a fixed interval until `ctx` is cancelled, the
    /// service is stopped, or a newer `start` replaced it.
    async fn monitor(self, ctx: CancellationToken, service: Service, generation: u64) {
        let interval = self.inner.config.health_interval();
        let timeout = self.inner.config.probe_timeout();
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ctx.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let probe = self
                .inner
                .probe
                .check(&self.inner.config.probe_host, service.port);
            let outcome = match tokio::time::timeout(timeout, probe).await {
                Ok(outcome) => outcome,
                Err(_) => Err(format!("health probe timed out after {timeout:?}")),
            };

            if let Err(message) = &outcome {
                tracing::warn!(service = %service.name, %message, "health check failed");
            }
            if !self.record_probe(&service.name, generation, outcome).await {
                break;
            }
        }
        tracing::debug!(service = %service.name, "health monitor exiting");
    }

    /// Apply a probe result. Returns `false` when the monitor should exit.
    async fn record_probe(
        &self,
        name: &str,
        generation: u64,
        outcome: std::result::Result<(), String>,
    ) -> bool {
        let mut state = self.inner.state.write().await;
        if state.generation != generation {
            return false;
        }
        let Some(health) = state.health.get_mut(name) else {
            return false;
        };
        if health.status == ServiceStatus::Stopped {
            return false;
        }

        match outcome {
            Ok(()) => {
                health.status = ServiceStatus::Running;
                health.healthy = true;
                health.message = None;
            }
            Err(message) => {
                health.status = ServiceStatus::Error;
                health.healthy = false;
                health.message = Some(message);
            }
        }
        health.last_check = Utc::now();
        true
    }

    /// Finish a launch: apply `apply` only if the record still belongs to
    /// `generation` and is `starting`. Returns whether it was applied.
    async fn settle(
        &self,
        name: &str,
        generation: u64,
        apply: impl FnOnce(&mut ServiceHealth),
    ) -> bool {
        let mut state = self.inner.state.write().await;
        if state.generation != generation {
            return false;
        }
        match state.health.get_mut(name) {
            Some(health) if health.status == ServiceStatus::Starting => {
                apply(health);
                health.last_check = Utc::now();
                true
            }
            _ => false,
        }
    }

    /// Mutate a service record if it still belongs to `generation`.
    async fn update(&self, name: &str, generation: u64, apply: impl FnOnce(&mut ServiceHealth)) {
        let mut state = self.inner.state.write().await;
        if state.generation != generation {
            return;
        }
        if let Some(health) = state.health.get_mut(name) {
            apply(health);
            health.last_check = Utc::now();
        }
    }

    /// Mark a service stopped and ask the provider to stop its session.
    ///
    /// A session the provider no longer knows about counts as stopped.
    pub async fn stop(&self, ctx: &CancellationToken, name: &str) -> Result<()> {
        {
            let mut state = self.inner.state.write().await;
            let health = state
                .health
                .get_mut(name)
                .ok_or_else(|| Error::ServiceNotFound {
                    name: name.to_string(),
                })?;
            health.status = ServiceStatus::Stopped;
            health.healthy = false;
            health.message = None;
            health.last_check = Utc::now();
        }

        let session_id = self.inner.config.session_id(name);
        let stopped = tokio::select! {
            _ = ctx.cancelled() => return Err(Error::Cancelled),
            stopped = self.inner.provider.stop(&session_id) => stopped,
        };

        match stopped {
            Ok(()) => {
                tracing::info!(service = %name, "service stopped");
                Ok(())
            }
            Err(ProviderError::SessionNotFound(_)) => {
                tracing::debug!(service = %name, "no session to stop");
                Ok(())
            }
            Err(source) => {
                tracing::warn!(service = %name, error = %source, "failed to stop service");
                Err(Error::ServiceStop {
                    name: name.to_string(),
                    source,
                })
            }
        }
    }

    /// Stop every tracked service concurrently.
    ///
    /// Every stop is attempted even if others fail; failures are collected
    /// into [`Error::StopAll`].
    pub async fn stop_all(&self, ctx: &CancellationToken) -> Result<()> {
        let names: Vec<String> = self.inner.state.read().await.health.keys().cloned().collect();
        let results = join_all(names.iter().map(|name| self.stop(ctx, name))).await;

        let failures: Vec<Error> = results.into_iter().filter_map(|r| r.err()).collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::StopAll { failures })
        }
    }

    /// Current health of one service.
    pub async fn status(&self, name: &str) -> Result<ServiceHealth> {
        self.inner
            .state
            .read()
            .await
            .health
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ServiceNotFound {
                name: name.to_string(),
            })
    }

    /// Health of every tracked service, sorted by name.
    pub async fn list_services(&self) -> Vec<ServiceHealth> {
        self.inner.state.read().await.health.values().cloned().collect()
    }

    /// Definition of a tracked service.
    pub async fn service(&self, name: &str) -> Option<Service> {
        self.inner.state.read().await.services.get(name).cloned()
    }

    /// Provider sessions that belong to this orchestrator.
    pub async fn sessions(&self) -> Result<Vec<Session>> {
        let prefix = &self.inner.config.session_prefix;
        let sessions = self.inner.provider.list().await?;
        Ok(sessions
            .into_iter()
            .filter(|session| session.id.starts_with(prefix.as_str()))
            .collect())
    }
}
