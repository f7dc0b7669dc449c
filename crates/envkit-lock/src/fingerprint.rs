//! Canonical strings and hashes behind plugin fingerprints and content hashes.
//!
//! The exact byte layout here is the reproducibility contract: changing it
//! changes every lockfile's hashes.

use std::collections::BTreeMap;

use envkit_fs::checksum::sha256_hex;

use crate::lockfile::LockEntry;

/// The fields that identify one plugin's content.
#[derive(Debug, Clone, Copy)]
pub struct PluginFields<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub repository: Option<&'a str>,
    pub path: Option<&'a str>,
    pub dependencies: &'a [String],
    pub metadata: &'a BTreeMap<String, String>,
}

/// `key=value` pairs in key order, joined with `;`.
pub fn canonical_metadata(metadata: &BTreeMap<String, String>) -> String {
    metadata
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// `name|version|repository|path|deps|metadata` with dependencies sorted and
/// joined by `,`; absent optional fields are empty.
pub fn canonical_plugin(fields: PluginFields<'_>) -> String {
    let mut deps: Vec<&str> = fields.dependencies.iter().map(String::as_str).collect();
    deps.sort_unstable();
    format!(
        "{}|{}|{}|{}|{}|{}",
        fields.name,
        fields.version,
        fields.repository.unwrap_or(""),
        fields.path.unwrap_or(""),
        deps.join(","),
        canonical_metadata(fields.metadata)
    )
}

/// Hex SHA-256 of the canonical plugin string.
pub fn plugin_fingerprint(fields: PluginFields<'_>) -> String {
    sha256_hex(canonical_plugin(fields))
}

/// `version:<schema>\n` followed by `plugin:<key>|<version>|<sha>\n` per
/// plugin in key order.
pub fn canonical_content(schema_version: &str, plugins: &BTreeMap<String, LockEntry>) -> String {
    let mut content = format!("version:{schema_version}\n");
    for (key, entry) in plugins {
        content.push_str(&format!("plugin:{key}|{}|{}\n", entry.version, entry.sha));
    }
    content
}

/// Hex SHA-256 of the canonical lockfile content.
pub fn content_hash(schema_version: &str, plugins: &BTreeMap<String, LockEntry>) -> String {
    sha256_hex(canonical_content(schema_version, plugins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fields<'a>(deps: &'a [String], metadata: &'a BTreeMap<String, String>) -> PluginFields<'a> {
        PluginFields {
            name: "git",
            version: "1.0.0",
            repository: Some("https://example.com/plugins"),
            path: None,
            dependencies: deps,
            metadata,
        }
    }

    #[test]
    fn canonical_plugin_layout() {
        let deps = vec!["core/shell".to_string(), "core/base".to_string()];
        let metadata = BTreeMap::from([
            ("tier".to_string(), "2".to_string()),
            ("category".to_string(), "vcs".to_string()),
        ]);

        assert_eq!(
            canonical_plugin(fields(&deps, &metadata)),
            "git|1.0.0|https://example.com/plugins||core/base,core/shell|category=vcs;tier=2"
        );
    }

    #[test]
    fn dependency_order_does_not_change_fingerprint() {
        let metadata = BTreeMap::new();
        let a = vec!["x".to_string(), "y".to_string()];
        let b = vec!["y".to_string(), "x".to_string()];
        assert_eq!(
            plugin_fingerprint(fields(&a, &metadata)),
            plugin_fingerprint(fields(&b, &metadata))
        );
    }

    #[test]
    fn metadata_changes_fingerprint() {
        let deps = Vec::new();
        let empty = BTreeMap::new();
        let tagged = BTreeMap::from([("k".to_string(), "v".to_string())]);
        assert_ne!(
            plugin_fingerprint(fields(&deps, &empty)),
            plugin_fingerprint(fields(&deps, &tagged))
        );
    }

    #[test]
    fn canonical_content_layout() {
        let plugins = BTreeMap::from([
            ("myorg/git".to_string(), LockEntry::test_entry("git", "1.1", "bbb")),
            ("core/base".to_string(), LockEntry::test_entry("base", "1.0", "aaa")),
        ]);
        assert_eq!(
            canonical_content("1.0", &plugins),
            "version:1.0\nplugin:core/base|1.0|aaa\nplugin:myorg/git|1.1|bbb\n"
        );
    }
}
