//! Error types for policy loading
//!
//! Engine failures surface unchanged inside [`PolicyError::Acl`], so a caller
//! can still tell a missing role from a malformed document.

use std::path::PathBuf;

use acl_engine::AclError;
use thiserror::Error;

/// Policy loading error types.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The engine rejected a declaration
    #[error(transparent)]
    Acl(#[from] AclError),

    /// The document is not valid JSON or does not match the schema
    #[error("Invalid policy document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The policy file could not be read or written
    #[error("Failed to access policy file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A rule names an assertion missing from the registry
    #[error("Unknown assertion '{0}'")]
    UnknownAssertion(String),

    /// A stored rule carries an assertion with no registered name
    #[error("Rule {0} has an assertion that is not registered under any name")]
    UnnamedAssertion(String),

    /// A role or resource declaration has an unsupported shape
    #[error("Invalid declaration: {0}")]
    InvalidDeclaration(String),

    /// No policy path was configured
    #[error("No policy path configured (set ACL_POLICY_PATH)")]
    MissingPolicyPath,
}

/// Result type for policy loading.
pub type PolicyResult<T> = Result<T, PolicyError>;

impl PolicyError {
    /// Get a stable error code for logs and API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            PolicyError::Acl(err) => err.error_code(),
            PolicyError::Parse(_) => "INVALID_DOCUMENT",
            PolicyError::Io { .. } => "IO_ERROR",
            PolicyError::UnknownAssertion(_) => "UNKNOWN_ASSERTION",
            PolicyError::UnnamedAssertion(_) => "UNNAMED_ASSERTION",
            PolicyError::InvalidDeclaration(_) => "INVALID_DECLARATION",
            PolicyError::MissingPolicyPath => "MISSING_POLICY_PATH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_errors_keep_their_code() {
        let err = PolicyError::from(AclError::RoleNotFound("guest".into()));
        assert_eq!(err.error_code(), "ROLE_NOT_FOUND");
        assert_eq!(err.to_string(), "Role 'guest' not found");
    }

    #[test]
    fn test_io_error_names_path() {
        let err = PolicyError::Io {
            path: PathBuf::from("/etc/acl/policy.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(err.error_code(), "IO_ERROR");
        assert!(err.to_string().contains("/etc/acl/policy.json"));
    }
}
