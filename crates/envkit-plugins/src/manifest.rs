//! Plugin manifest parsing for `plugin.toml` files.
//!
//! # Example TOML
//!
//! ```toml
//! name = "git"
//! version = "1.2.0"
//! description = "Git conventions and commit rules"
//! repository = "https://github.com/myorg/plugins"
//! path = "git"
//! dependencies = ["core/base"]
//!
//! [metadata]
//! category = "vcs"
//! ```

use std::collections::BTreeMap;

use envkit_fs::{NormalizedPath, io};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A plugin manifest as written on disk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Source repository URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Subdirectory of `repository` holding the plugin content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Namespace keys of the plugins this one builds on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl PluginManifest {
    /// Parse a manifest from TOML content.
    pub fn from_toml(content: &str) -> std::result::Result<Self, String> {
        let manifest: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        if manifest.name.trim().is_empty() {
            return Err("`name` must not be empty".to_string());
        }
        if manifest.version.trim().is_empty() {
            return Err("`version` must not be empty".to_string());
        }
        Ok(manifest)
    }

    /// Read and parse the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fs`] if the file cannot be read and
    /// [`Error::ManifestParse`] (carrying the path) if it is malformed.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        let content = io::read_text(path)?;
        Self::from_toml(&content).map_err(|message| Error::ManifestParse {
            path: path.to_native(),
            message,
        })
    }
}
