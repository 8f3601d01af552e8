//! EnvSnapshot - environment forwarded into every job
//!
//! Batch and distributed jobs run in a different shell context than the
//! dispatcher, so the variables the toolkit binaries depend on are captured
//! once and passed along explicitly.

use serde::{Deserialize, Serialize};

use crate::command::shell_quote;

/// Variables forwarded into jobs when present
pub const PROPAGATED_VARS: [&str; 4] = [
    "TMPDIR",
    "TMPDIR_SPEC",
    "LD_LIBRARY_PATH",
    "DYLD_LIBRARY_PATH",
];

/// Captured environment variables, in `PROPAGATED_VARS` order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvSnapshot {
    vars: Vec<(String, String)>,
}

impl EnvSnapshot {
    /// Snapshot with nothing captured
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture `PROPAGATED_VARS` from the current process environment
    pub fn capture() -> Self {
        let vars = PROPAGATED_VARS
            .iter()
            .filter_map(|name| {
                std::env::var(name)
                    .ok()
                    .map(|value| (name.to_string(), value))
            })
            .collect();
        Self { vars }
    }

    /// Build from explicit pairs
    ///
    /// Later duplicates replace earlier ones.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut snapshot = Self::empty();
        for (k, v) in pairs {
            snapshot.set(k.into(), v.into());
        }
        snapshot
    }

    fn set(&mut self, name: String, value: String) {
        match self.vars.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.vars.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// `export NAME=value` lines for a batch script
    pub fn export_lines(&self) -> Vec<String> {
        self.vars
            .iter()
            .map(|(k, v)| format!("export {}={}", k, shell_quote(v)))
            .collect()
    }
}
