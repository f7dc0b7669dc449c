//! Plugin registry: discovery, lookup and dependency resolution.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::Path;

use envkit_fs::NormalizedPath;
use walkdir::{DirEntry, WalkDir};

use crate::MANIFEST_FILENAME;
use crate::dependency::DependencyGraph;
use crate::error::{Error, Result};
use crate::manifest::PluginManifest;
use crate::plugin::Plugin;

/// Mapping from namespace key to plugin.
///
/// The registry performs no internal locking. Share it behind a lock if
/// discovery and resolution may run concurrently.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, Plugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discover every `plugin.toml` below `root` and add it to the registry.
    ///
    /// The namespace key is the manifest's directory relative to `root`,
    /// `/`-separated. Hidden directories are not descended into, and a
    /// manifest directly in `root` is skipped because it has no key.
    ///
    /// Discovery is all-or-nothing: if any manifest fails to parse, no plugin
    /// from this call is added. Plugins from earlier calls are kept; a key
    /// discovered again replaces the earlier entry.
    ///
    /// Returns the number of plugins discovered.
    pub fn discover(&mut self, root: impl AsRef<Path>) -> Result<usize> {
        let root = root.as_ref();
        let root_path = NormalizedPath::new(root);
        let mut staged = BTreeMap::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

        for entry in walker {
            let entry = entry.map_err(|e| Error::Discovery {
                path: e.path().unwrap_or(root).to_path_buf(),
                message: e.to_string(),
            })?;

            if !entry.file_type().is_file() || entry.file_name() != MANIFEST_FILENAME {
                continue;
            }

            let manifest_path = NormalizedPath::new(entry.path());
            let key = manifest_path
                .parent()
                .and_then(|dir| dir.strip_prefix(&root_path))
                .unwrap_or_default();
            if key.is_empty() {
                tracing::warn!(path = %manifest_path, "skipping manifest at discovery root");
                continue;
            }

            let manifest = PluginManifest::load(&manifest_path)?;
            tracing::debug!(key = %key, version = %manifest.version, "discovered plugin");
            staged.insert(key, Plugin::from(manifest));
        }

        let count = staged.len();
        self.plugins.extend(staged);
        tracing::info!(root = %root_path, count, total = self.plugins.len(), "plugin discovery complete");
        Ok(count)
    }

    /// Insert a plugin under an explicit key, replacing any existing entry.
    pub fn insert(&mut self, key: impl Into<String>, plugin: Plugin) {
        self.plugins.insert(key.into(), plugin);
    }

    /// Look up a plugin by namespace key.
    pub fn get(&self, key: &str) -> Option<&Plugin> {
        self.plugins.get(key)
    }

    /// Snapshot of every plugin. Mutating the result does not affect the registry.
    pub fn list(&self) -> BTreeMap<String, Plugin> {
        self.plugins.clone()
    }

    /// All namespace keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.plugins.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Resolve `requested` into its transitive closure in build order.
    ///
    /// Every dependency precedes its dependents. Plugins that become ready
    /// in the same round are emitted in lexicographic order, so the result
    /// depends only on registry contents and never on iteration order.
    ///
    /// # Errors
    ///
    /// - [`Error::PluginNotFound`] if a requested or referenced key is missing.
    /// - [`Error::DependencyCycle`] with the offending chain.
    pub fn resolve<S: AsRef<str>>(&self, requested: &[S]) -> Result<Vec<String>> {
        let graph = self.closure_graph(requested)?;
        let order = graph.topological_sort()?;
        tracing::debug!(requested = requested.len(), resolved = order.len(), "resolved plugin closure");
        Ok(order)
    }

    /// Like [`resolve`](Self::resolve), paired with the plugin records.
    pub fn resolve_plugins<S: AsRef<str>>(&self, requested: &[S]) -> Result<Vec<(&str, &Plugin)>> {
        self.resolve(requested)?
            .into_iter()
            .map(|key| {
                self.plugins
                    .get_key_value(&key)
                    .map(|(k, p)| (k.as_str(), p))
                    .ok_or(Error::PluginNotFound {
                        name: key,
                        required_by: None,
                    })
            })
            .collect()
    }

    /// Walk outward from `requested`, collecting every referenced plugin.
    fn closure_graph<S: AsRef<str>>(&self, requested: &[S]) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::new();
        let mut seen = HashSet::new();
        let mut queue: VecDeque<(String, Option<String>)> = requested
            .iter()
            .map(|name| (name.as_ref().to_string(), None))
            .collect();

        while let Some((key, required_by)) = queue.pop_front() {
            if !seen.insert(key.clone()) {
                continue;
            }
            let plugin = self.plugins.get(&key).ok_or_else(|| Error::PluginNotFound {
                name: key.clone(),
                required_by,
            })?;

            graph.add_node(&key);
            for dep in &plugin.dependencies {
                graph.add_edge(&key, dep);
                if !seen.contains(dep) {
                    queue.push_back((dep.clone(), Some(key.clone())));
                }
            }
        }

        Ok(graph)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}
