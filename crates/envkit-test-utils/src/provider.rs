//! In-memory recording provider.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use envkit_services::{
    ExecOptions, Provider, ProviderError, ProviderResult, Session, SessionConfig, SessionStatus,
};

/// One call made against a [`RecordingProvider`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Create(String),
    Start(String),
    Stop(String),
    Exec { session: String, command: String },
    List,
}

/// Provider that keeps sessions in memory and records every call.
///
/// Failures are scripted per operation (`"create"`, `"start"`, `"stop"`,
/// `"exec"`) and session id. An optional delay is applied to every `create`
/// so overlapping launches become observable in the call log.
#[derive(Debug, Default)]
pub struct RecordingProvider {
    calls: Mutex<Vec<ProviderCall>>,
    sessions: Mutex<BTreeMap<String, Session>>,
    failures: Mutex<HashMap<(String, String), String>>,
    create_delay: Option<Duration>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every `create`.
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    /// Make `operation` on `session_id` fail with `message`.
    pub fn fail_on(&self, operation: &str, session_id: &str, message: &str) {
        lock(&self.failures).insert(
            (operation.to_string(), session_id.to_string()),
            message.to_string(),
        );
    }

    /// Snapshot of the call log.
    pub fn calls(&self) -> Vec<ProviderCall> {
        lock(&self.calls).clone()
    }

    /// Index of the first matching call in the log.
    pub fn position(&self, call: &ProviderCall) -> Option<usize> {
        lock(&self.calls).iter().position(|c| c == call)
    }

    /// Whether any call addressed `session_id`.
    pub fn touched(&self, session_id: &str) -> bool {
        lock(&self.calls).iter().any(|call| match call {
            ProviderCall::Create(id) | ProviderCall::Start(id) | ProviderCall::Stop(id) => {
                id == session_id
            }
            ProviderCall::Exec { session, .. } => session == session_id,
            ProviderCall::List => false,
        })
    }

    pub fn session_status(&self, session_id: &str) -> Option<SessionStatus> {
        lock(&self.sessions).get(session_id).map(|s| s.status)
    }

    fn record(&self, call: ProviderCall) {
        lock(&self.calls).push(call);
    }

    fn scripted_failure(&self, operation: &str, session_id: &str) -> ProviderResult<()> {
        match lock(&self.failures).get(&(operation.to_string(), session_id.to_string())) {
            Some(message) => Err(ProviderError::failed(operation, message.clone())),
            None => Ok(()),
        }
    }

    fn set_status(&self, session_id: &str, status: SessionStatus) -> ProviderResult<()> {
        let mut sessions = lock(&self.sessions);
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| ProviderError::SessionNotFound(session_id.to_string()))?;
        session.status = status;
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl Provider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    async fn create(
        &self,
        session_id: &str,
        workspace: &Path,
        _config: &SessionConfig,
    ) -> ProviderResult<Session> {
        self.record(ProviderCall::Create(session_id.to_string()));
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        self.scripted_failure("create", session_id)?;

        let session = Session {
            id: session_id.to_string(),
            provider: self.name().to_string(),
            status: SessionStatus::Created,
            workspace: workspace.to_path_buf(),
        };
        lock(&self.sessions).insert(session_id.to_string(), session.clone());
        Ok(session)
    }

    async fn start(&self, session_id: &str) -> ProviderResult<()> {
        self.record(ProviderCall::Start(session_id.to_string()));
        self.scripted_failure("start", session_id)?;
        self.set_status(session_id, SessionStatus::Running)
    }

    async fn stop(&self, session_id: &str) -> ProviderResult<()> {
        self.record(ProviderCall::Stop(session_id.to_string()));
        self.scripted_failure("stop", session_id)?;
        self.set_status(session_id, SessionStatus::Stopped)
    }

    async fn exec(&self, session_id: &str, options: &ExecOptions) -> ProviderResult<()> {
        self.record(ProviderCall::Exec {
            session: session_id.to_string(),
            command: options.command.clone(),
        });
        self.scripted_failure("exec", session_id)?;
        if lock(&self.sessions).contains_key(session_id) {
            Ok(())
        } else {
            Err(ProviderError::SessionNotFound(session_id.to_string()))
        }
    }

    async fn list(&self) -> ProviderResult<Vec<Session>> {
        self.record(ProviderCall::List);
        Ok(lock(&self.sessions).values().cloned().collect())
    }
}
