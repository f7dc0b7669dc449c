//! The persisted lockfile model
//!
//! ```toml
//! version = "1.0"
//!
//! [plugins."core/base"]
//! name = "base"
//! version = "1.0.0"
//! sha = "5d41402abc4b2a76b9719d911017c592..."
//! dependencies = []
//!
//! [plugins."core/base".metadata]
//!
//! [metadata]
//! content_hash = "9f86d081884c7d659a2feaa0c55ad015..."
//! timestamp = "2026-01-01T00:00:00Z"
//! generator = "envkit 0.1.0"
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use envkit_plugins::Plugin;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fingerprint::{self, PluginFields};

/// Lockfile schema version written by this crate.
pub const SCHEMA_VERSION: &str = "1.0";

/// A frozen, hash-verified snapshot of a resolved plugin set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockfile {
    /// Schema version
    pub version: String,
    /// Namespace key -> entry, in key order
    pub plugins: BTreeMap<String, LockEntry>,
    pub metadata: LockMetadata,
}

/// One locked plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    pub name: String,
    pub version: String,
    /// Content fingerprint of the plugin's identifying fields
    pub sha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Lockfile provenance. Only `content_hash` takes part in verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockMetadata {
    /// Opaque; never edit by hand
    pub content_hash: String,
    pub timestamp: DateTime<Utc>,
    pub generator: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl LockEntry {
    /// Lock a plugin, fingerprinting its current fields.
    pub fn from_plugin(plugin: &Plugin) -> Self {
        let mut entry = Self {
            name: plugin.name.clone(),
            version: plugin.version.clone(),
            sha: String::new(),
            repository: plugin.repository.clone(),
            path: plugin.path.clone(),
            dependencies: plugin.dependencies.clone(),
            metadata: plugin.metadata.clone(),
        };
        entry.sha = entry.compute_sha();
        entry
    }

    /// Fingerprint recomputed from this entry's fields.
    pub fn compute_sha(&self) -> String {
        fingerprint::plugin_fingerprint(PluginFields {
            name: &self.name,
            version: &self.version,
            repository: self.repository.as_deref(),
            path: self.path.as_deref(),
            dependencies: &self.dependencies,
            metadata: &self.metadata,
        })
    }

    #[cfg(test)]
    pub(crate) fn test_entry(name: &str, version: &str, sha: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            sha: sha.to_string(),
            repository: None,
            path: None,
            dependencies: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }
}

impl Lockfile {
    /// Assemble a lockfile and seal it with its content hash.
    pub fn new(plugins: BTreeMap<String, LockEntry>, generator: impl Into<String>) -> Self {
        let mut lockfile = Self {
            version: SCHEMA_VERSION.to_string(),
            plugins,
            metadata: LockMetadata {
                content_hash: String::new(),
                timestamp: Utc::now(),
                generator: generator.into(),
                extra: BTreeMap::new(),
            },
        };
        lockfile.metadata.content_hash = lockfile.compute_content_hash();
        lockfile
    }

    /// Content hash recomputed from `version` and `plugins`.
    pub fn compute_content_hash(&self) -> String {
        fingerprint::content_hash(&self.version, &self.plugins)
    }

    /// Check the stored content hash, then every entry's fingerprint.
    ///
    /// Uses only the lockfile's own content, so it detects on-disk tampering
    /// or corruption but not drift against a registry.
    pub fn verify_integrity(&self) -> Result<()> {
        let actual = self.compute_content_hash();
        if actual != self.metadata.content_hash {
            return Err(Error::Integrity {
                expected: self.metadata.content_hash.clone(),
                actual,
            });
        }

        for (key, entry) in &self.plugins {
            let actual = entry.compute_sha();
            if actual != entry.sha {
                return Err(Error::EntryIntegrity {
                    key: key.clone(),
                    expected: entry.sha.clone(),
                    actual,
                });
            }
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Serialize(e.to_string()))
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Lockfile {
        let base = Plugin::new("base", "1.0.0");
        let git = Plugin::new("git", "2.0.0")
            .with_dependencies(["core/base"])
            .with_metadata("category", "vcs")
            .with_repository("https://example.com/plugins", Some("git"));
        Lockfile::new(
            BTreeMap::from([
                ("core/base".to_string(), LockEntry::from_plugin(&base)),
                ("myorg/git".to_string(), LockEntry::from_plugin(&git)),
            ]),
            "envkit test",
        )
    }

    #[test]
    fn fresh_lockfile_verifies() {
        sample().verify_integrity().unwrap();
    }

    #[test]
    fn corrupted_content_hash_is_detected() {
        let mut lockfile = sample();
        let original = lockfile.metadata.content_hash.clone();
        lockfile.metadata.content_hash = "0".repeat(64);

        match lockfile.verify_integrity() {
            Err(Error::Integrity { expected, actual }) => {
                assert_eq!(expected, "0".repeat(64));
                assert_eq!(actual, original);
            }
            other => panic!("expected integrity error, got {other:?}"),
        }
    }

    #[test]
    fn edited_version_is_detected() {
        let mut lockfile = sample();
        if let Some(entry) = lockfile.plugins.get_mut("core/base") {
            entry.version = "9.9.9".to_string();
        }
        assert!(matches!(lockfile.verify_integrity(), Err(Error::Integrity { .. })));
    }

    #[test]
    fn edited_dependencies_are_detected() {
        let mut lockfile = sample();
        if let Some(entry) = lockfile.plugins.get_mut("myorg/git") {
            entry.dependencies.clear();
        }
        assert!(matches!(
            lockfile.verify_integrity(),
            Err(Error::EntryIntegrity { ref key, .. }) if key == "myorg/git"
        ));
    }

    #[test]
    fn timestamp_and_generator_do_not_affect_hash() {
        let mut lockfile = sample();
        let hash = lockfile.compute_content_hash();
        lockfile.metadata.generator = "someone else".to_string();
        lockfile.metadata.extra.insert("ci".to_string(), "true".to_string());
        assert_eq!(lockfile.compute_content_hash(), hash);
        lockfile.verify_integrity().unwrap();
    }

    #[test]
    fn toml_round_trip_preserves_hash() {
        let lockfile = sample();
        let text = lockfile.to_toml().unwrap();
        assert!(text.starts_with("version = \"1.0\""), "{text}");
        assert!(text.contains("core/base"), "{text}");

        let parsed = Lockfile::from_toml(&text).unwrap();
        assert_eq!(parsed, lockfile);
        parsed.verify_integrity().unwrap();
    }
}
