//! Scripted health probe.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use envkit_services::HealthProbe;

/// Health probe whose answer per port is set by the test.
///
/// Ports without a scripted answer are reported healthy.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    failures: Mutex<HashMap<u16, String>>,
    checks: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make checks against `port` fail with `message`.
    pub fn fail(&self, port: u16, message: &str) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(port, message.to_string());
    }

    /// Make checks against `port` succeed again.
    pub fn heal(&self, port: u16) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&port);
    }

    /// Number of checks performed so far.
    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn check(&self, _host: &str, port: u16) -> Result<(), String> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        match self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&port)
        {
            Some(message) => Err(message.clone()),
            None => Ok(()),
        }
    }
}
