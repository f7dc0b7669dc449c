//! Plugin manifest tree fixtures.

use std::fs;
use std::path::Path;

/// One plugin to write: namespace key, version and dependency keys.
#[derive(Debug, Clone, Copy)]
pub struct PluginSpec<'a> {
    pub key: &'a str,
    pub version: &'a str,
    pub dependencies: &'a [&'a str],
}

impl<'a> PluginSpec<'a> {
    pub fn new(key: &'a str, version: &'a str, dependencies: &'a [&'a str]) -> Self {
        Self {
            key,
            version,
            dependencies,
        }
    }
}

/// Writes `<root>/<key>/plugin.toml` for a single plugin.
///
/// The plugin name is the last segment of the key.
///
/// # Panics
/// Panics if the filesystem operations fail.
pub fn write_manifest(root: &Path, spec: PluginSpec<'_>) {
    let dir = root.join(spec.key);
    fs::create_dir_all(&dir)
        .unwrap_or_else(|e| panic!("write_manifest: failed to create {}: {e}", dir.display()));

    let name = spec.key.rsplit('/').next().unwrap_or(spec.key);
    let deps = spec
        .dependencies
        .iter()
        .map(|d| format!("\"{d}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let content = format!(
        "name = \"{name}\"\nversion = \"{}\"\ndependencies = [{deps}]\n\n[metadata]\nnamespace = \"{}\"\n",
        spec.version, spec.key
    );

    fs::write(dir.join("plugin.toml"), content)
        .unwrap_or_else(|e| panic!("write_manifest: failed to write manifest for {}: {e}", spec.key));
}

/// Writes a manifest for every spec under `root`.
///
/// # Panics
/// Panics if the filesystem operations fail.
pub fn write_plugin_tree(root: &Path, specs: &[PluginSpec<'_>]) {
    for spec in specs {
        write_manifest(root, *spec);
    }
}
