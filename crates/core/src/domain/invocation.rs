// Probe invocation request

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Variable that tells the probe which target triple to inspect.
/// Empty value means "no explicit target".
pub const TARGET_ENV_VAR: &str = "TARGET";

/// One probe execution request
///
/// Environment policy: the child inherits the ambient environment of the
/// calling process, and `env_overrides` take precedence over it. No arguments
/// are passed and stdin is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeInvocation {
    program: PathBuf,
    env_overrides: BTreeMap<String, String>,
}

impl ProbeInvocation {
    /// Invocation with no overrides at all
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            env_overrides: BTreeMap::new(),
        }
    }

    /// Invocation with `TARGET` set to the empty string
    pub fn untargeted(program: impl Into<PathBuf>) -> Self {
        Self::new(program).with_env(TARGET_ENV_VAR, "")
    }

    /// Add or replace one override
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_overrides.insert(key.into(), value.into());
        self
    }

    /// Add or replace several overrides; later entries win
    pub fn with_envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in vars {
            self.env_overrides.insert(key.into(), value.into());
        }
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Overrides in sorted key order
    pub fn env_overrides(&self) -> &BTreeMap<String, String> {
        &self.env_overrides
    }
}
