//! Generating, persisting and checking lockfiles

use std::path::{Path, PathBuf};

use envkit_fs::{NormalizedPath, config, io};
use envkit_plugins::PluginRegistry;
use serde::{Deserialize, Serialize};

use crate::diff::LockDiff;
use crate::error::{Error, Result};
use crate::lockfile::{LockEntry, Lockfile};

/// Default lockfile name, relative to the project root.
pub const DEFAULT_LOCKFILE: &str = "envkit.lock";

/// Lock manager settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Lockfile location; relative paths are resolved against the project root
    pub path: PathBuf,
    /// Recorded in `metadata.generator`
    pub generator: String,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LOCKFILE),
            generator: default_generator(),
        }
    }
}

/// The part of a project config file the lock manager reads
#[derive(Debug, Default, Deserialize)]
struct ProjectDocument {
    #[serde(default)]
    lock: LockConfig,
}

impl LockConfig {
    /// Read the `lock` table of a TOML, JSON or YAML project config file.
    ///
    /// A missing file or a file without that table yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let document: ProjectDocument = config::load_or_default(&NormalizedPath::new(path))?;
        Ok(document.lock)
    }
}

fn default_generator() -> String {
    format!("envkit {}", env!("CARGO_PKG_VERSION"))
}

/// Where a persisted lockfile stands relative to the current registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockStatus {
    /// No lockfile has been written yet
    Missing,
    UpToDate,
    /// The lockfile no longer matches; the diff says which plugins moved
    Stale(LockDiff),
}

/// Generates, saves, loads and checks the lockfile at one fixed path.
///
/// There is no cross-process locking: run at most one lockfile-mutating
/// operation per project at a time.
#[derive(Debug, Clone)]
pub struct LockManager {
    path: NormalizedPath,
    generator: String,
}

impl LockManager {
    /// Manage the lockfile at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: NormalizedPath::new(path),
            generator: default_generator(),
        }
    }

    /// Manage the lockfile described by `config` for the project at `root`.
    pub fn from_config(root: &Path, config: &LockConfig) -> Self {
        let path = if config.path.is_absolute() {
            config.path.clone()
        } else {
            root.join(&config.path)
        };
        Self {
            path: NormalizedPath::new(path),
            generator: config.generator.clone(),
        }
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    /// Resolve `active` against `registry` and lock the closure.
    ///
    /// Resolution errors are returned unchanged and no lockfile is produced.
    pub fn generate<S: AsRef<str>>(&self, registry: &PluginRegistry, active: &[S]) -> Result<Lockfile> {
        let plugins = registry
            .resolve_plugins(active)?
            .into_iter()
            .map(|(key, plugin)| (key.to_string(), LockEntry::from_plugin(plugin)))
            .collect();

        let lockfile = Lockfile::new(plugins, self.generator.clone());
        tracing::debug!(
            plugins = lockfile.plugins.len(),
            content_hash = %lockfile.metadata.content_hash,
            "generated lockfile"
        );
        Ok(lockfile)
    }

    /// Write `lockfile` atomically.
    pub fn save(&self, lockfile: &Lockfile) -> Result<()> {
        let content = lockfile.to_toml()?;
        io::write_text(&self.path, &content)?;
        tracing::info!(path = %self.path, plugins = lockfile.plugins.len(), "saved lockfile");
        Ok(())
    }

    /// Read the persisted lockfile.
    ///
    /// # Errors
    ///
    /// [`Error::LockfileMissing`] if there is none, [`Error::LockfileParse`]
    /// if it is corrupt.
    pub fn load(&self) -> Result<Lockfile> {
        let content = match io::read_text(&self.path) {
            Ok(content) => content,
            Err(e) if e.is_not_found() => {
                return Err(Error::LockfileMissing {
                    path: self.path.to_native(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        Lockfile::from_toml(&content).map_err(|e| Error::LockfileParse {
            path: self.path.to_native(),
            message: e.to_string(),
        })
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Whether the persisted lockfile matches a fresh generation.
    ///
    /// Returns `Ok(false)` when no lockfile exists. Errors only when the
    /// lockfile is unreadable or generation itself fails, e.g. a locked
    /// plugin was removed from the registry.
    pub fn is_up_to_date<S: AsRef<str>>(&self, registry: &PluginRegistry, active: &[S]) -> Result<bool> {
        Ok(matches!(self.check(registry, active)?, LockStatus::UpToDate))
    }

    /// Like [`is_up_to_date`](Self::is_up_to_date), explaining what drifted.
    pub fn check<S: AsRef<str>>(&self, registry: &PluginRegistry, active: &[S]) -> Result<LockStatus> {
        let existing = match self.load() {
            Ok(lockfile) => lockfile,
            Err(Error::LockfileMissing { .. }) => return Ok(LockStatus::Missing),
            Err(e) => return Err(e),
        };
        let fresh = self.generate(registry, active)?;

        if fresh.metadata.content_hash == existing.metadata.content_hash {
            Ok(LockStatus::UpToDate)
        } else {
            let diff = LockDiff::between(&existing, &fresh);
            tracing::debug!(path = %self.path, %diff, "lockfile is stale");
            Ok(LockStatus::Stale(diff))
        }
    }
}

/// Verify a lockfile's stored hashes against its own content.
pub fn verify_integrity(lockfile: &Lockfile) -> Result<()> {
    lockfile.verify_integrity()
}
