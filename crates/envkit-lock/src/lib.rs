//! Lock manager for envkit.
//!
//! Freezes a resolved plugin set into a content-addressed [`Lockfile`] and
//! checks persisted lockfiles for tampering and drift. Resolving the same
//! active plugin set against identical registry contents always yields the
//! same `content_hash`, regardless of machine or time.

pub mod diff;
pub mod error;
pub mod fingerprint;
pub mod lockfile;
pub mod manager;

pub use diff::LockDiff;
pub use error::{Error, Result};
pub use lockfile::{LockEntry, LockMetadata, Lockfile, SCHEMA_VERSION};
pub use manager::{LockConfig, LockManager, LockStatus, verify_integrity};
