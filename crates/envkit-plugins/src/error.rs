use std::path::PathBuf;

/// Errors that can occur in the plugin registry.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A requested or transitively referenced plugin is not in the registry.
    #[error("plugin not found: {name} (required by {})", .required_by.as_deref().unwrap_or("request"))]
    PluginNotFound {
        name: String,
        /// The plugin whose dependency list referenced `name`, if any.
        required_by: Option<String>,
    },

    /// The plugin graph contains a cycle; `cycle` starts and ends on the same key.
    #[error("dependency cycle detected: {}", .cycle.join(" -> "))]
    DependencyCycle { cycle: Vec<String> },

    /// Malformed plugin manifest.
    #[error("failed to parse plugin manifest at {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    /// The discovery tree could not be walked.
    #[error("failed to walk plugin directory {path}: {message}")]
    Discovery { path: PathBuf, message: String },

    #[error(transparent)]
    Fs(#[from] envkit_fs::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_display_joins_chain() {
        let err = Error::DependencyCycle {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle detected: a -> b -> a");
    }

    #[test]
    fn not_found_display_names_referrer() {
        let err = Error::PluginNotFound {
            name: "core/base".into(),
            required_by: Some("myorg/git".into()),
        };
        assert_eq!(
            err.to_string(),
            "plugin not found: core/base (required by myorg/git)"
        );

        let err = Error::PluginNotFound {
            name: "ghost".into(),
            required_by: None,
        };
        assert!(err.to_string().contains("ghost"));
    }
}
