//! Differences between two lockfiles.

use std::fmt;

use crate::lockfile::Lockfile;

/// Plugin keys that differ between an old and a new lockfile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Present in both with a different fingerprint
    pub changed: Vec<String>,
}

impl LockDiff {
    pub fn between(old: &Lockfile, new: &Lockfile) -> Self {
        let mut diff = Self::default();
        for (key, entry) in &new.plugins {
            match old.plugins.get(key) {
                None => diff.added.push(key.clone()),
                Some(previous) if previous.sha != entry.sha => diff.changed.push(key.clone()),
                Some(_) => {}
            }
        }
        diff.removed = old
            .plugins
            .keys()
            .filter(|key| !new.plugins.contains_key(*key))
            .cloned()
            .collect();
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl fmt::Display for LockDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for key in &self.added {
            writeln!(f, "+ {key}")?;
        }
        for key in &self.removed {
            writeln!(f, "- {key}")?;
        }
        for key in &self.changed {
            writeln!(f, "~ {key}")?;
        }
        Ok(())
    }
}
