//! Loader configuration.

use std::path::PathBuf;

use acl_engine::AclConfig;
use serde::{Deserialize, Serialize};

/// Configuration for [`PolicyLoader::load_from_config`](crate::PolicyLoader::load_from_config).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Path of the JSON policy file
    #[serde(default)]
    pub policy_path: Option<PathBuf>,

    /// Configuration for the engine built from the policy
    #[serde(default)]
    pub engine: AclConfig,
}

impl LoaderConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ACL_POLICY_PATH`: policy file to load (no default)
    /// - `ACL_LOG_DECISIONS`: see [`AclConfig::from_env`]
    pub fn from_env() -> Self {
        Self {
            policy_path: std::env::var("ACL_POLICY_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            engine: AclConfig::from_env(),
        }
    }

    /// Set the policy path.
    pub fn with_policy_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.policy_path = Some(path.into());
        self
    }

    /// Set the engine configuration.
    pub fn with_engine(mut self, engine: AclConfig) -> Self {
        self.engine = engine;
        self
    }
}
