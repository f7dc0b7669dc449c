//! Error types for envkit-lock

use std::path::PathBuf;

/// Result type for lock manager operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating or checking lockfiles
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Plugin resolution failed; passed through unchanged
    #[error(transparent)]
    Plugins(#[from] envkit_plugins::Error),

    #[error("lockfile not found at {path}")]
    LockfileMissing { path: PathBuf },

    /// The lockfile exists but is not a valid lockfile document
    #[error("failed to parse lockfile at {path}: {message}")]
    LockfileParse { path: PathBuf, message: String },

    /// Stored content hash differs from the one recomputed from `plugins`
    #[error("lockfile integrity check failed: stored content hash {expected} does not match computed {actual}")]
    Integrity { expected: String, actual: String },

    /// A plugin entry's fingerprint differs from the one recomputed from its fields
    #[error("lockfile entry '{key}' fingerprint mismatch: stored {expected}, computed {actual}")]
    EntryIntegrity {
        key: String,
        expected: String,
        actual: String,
    },

    #[error("failed to serialize lockfile: {0}")]
    Serialize(String),

    #[error(transparent)]
    Fs(#[from] envkit_fs::Error),
}
