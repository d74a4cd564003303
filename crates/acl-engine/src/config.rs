//! Engine configuration.
//!
//! The engine has very little to configure: rule semantics are fixed, so
//! configuration only covers observability. Values are loaded from
//! environment variables with defaults suitable for production use.

use serde::{Deserialize, Serialize};

/// Configuration for an [`Acl`](crate::Acl) instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclConfig {
    /// Log every final allow/deny decision at debug level.
    #[serde(default)]
    pub log_decisions: bool,
}

impl AclConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ACL_LOG_DECISIONS`: log each decision (`1`, `true`, `yes` or `on`, default: off)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            log_decisions: std::env::var("ACL_LOG_DECISIONS")
                .map(|s| parse_flag(&s))
                .unwrap_or(default.log_decisions),
        }
    }

    /// Enable or disable decision logging.
    pub fn with_log_decisions(mut self, enabled: bool) -> Self {
        self.log_decisions = enabled;
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
