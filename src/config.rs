//!
//! Campaign configuration.
//!
//! Operators set object policy once, at the global level: per-kind capacities and
//! whether tracked resources are released through the OS destructors. Every worker
//! copies that policy into its local store when it starts.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::RegistryError;
use crate::types::ObjectKind;

/// Default number of worker slots.
pub const DEFAULT_MAX_WORKERS: u32 = 4;

/// Per-kind object policy for the global store.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ObjectPolicy {
    /// Soft capacity per kind. Kinds that are not listed are unbounded (0).
    pub max_entries: BTreeMap<ObjectKind, u32>,
    /// Install `os::default_destructor` for every kind that has one.
    pub os_destructors: bool,
}

impl ObjectPolicy {
    /// Capacity configured for `kind`, 0 when unbounded.
    pub fn limit(&self, kind: ObjectKind) -> u32 {
        self.max_entries.get(&kind).copied().unwrap_or(0)
    }

    pub fn with_limit(mut self, kind: ObjectKind, max_entries: u32) -> Self {
        self.max_entries.insert(kind, max_entries);
        self
    }
}

/// Top-level configuration of a fuzz campaign's object registry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    /// Campaign seed. Drawn from the OS when absent.
    pub seed: Option<u64>,
    /// Number of worker slots.
    pub max_workers: u32,
    pub policy: ObjectPolicy,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        CampaignConfig { seed: None, max_workers: DEFAULT_MAX_WORKERS, policy: ObjectPolicy::default() }
    }
}

impl CampaignConfig {
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let config: CampaignConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "loading campaign configuration");
        Self::from_json_str(&text)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if self.max_workers == 0 {
            return Err(RegistryError::Config("max_workers must be at least 1".into()));
        }
        Ok(())
    }
}
