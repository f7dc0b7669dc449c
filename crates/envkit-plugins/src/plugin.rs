//! The in-memory plugin record.

use std::collections::BTreeMap;

use crate::manifest::PluginManifest;

/// A discovered capability plugin.
///
/// Identified in a [`PluginRegistry`](crate::PluginRegistry) by its namespace
/// key rather than by `name`; two plugins in different namespaces may share
/// a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plugin {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub repository: Option<String>,
    pub path: Option<String>,
    /// Namespace keys, in declaration order.
    pub dependencies: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl Plugin {
    /// Create a plugin with no dependencies or metadata.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: None,
            repository: None,
            path: None,
            dependencies: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Replace the dependency list.
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_repository(mut self, repository: impl Into<String>, path: Option<&str>) -> Self {
        self.repository = Some(repository.into());
        self.path = path.map(str::to_string);
        self
    }
}

impl From<PluginManifest> for Plugin {
    fn from(manifest: PluginManifest) -> Self {
        Self {
            name: manifest.name,
            version: manifest.version,
            description: manifest.description,
            repository: manifest.repository,
            path: manifest.path,
            dependencies: manifest.dependencies,
            metadata: manifest.metadata,
        }
    }
}
