//! Error types for access-control operations
//!
//! Every identifier lookup in the engine fails fast: an unknown role or
//! resource is an error, never an implicit "no access". Only an absent
//! (`None`) role or resource means "applies to all".

use thiserror::Error;

/// Access-control error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AclError {
    /// A role with this id is already registered
    #[error("Role '{0}' already exists")]
    DuplicateRole(String),

    /// No role with this id is registered
    #[error("Role '{0}' not found")]
    RoleNotFound(String),

    /// A resource with this id is already registered
    #[error("Resource '{0}' already exists")]
    DuplicateResource(String),

    /// No resource with this id is registered
    #[error("Resource '{0}' not found")]
    ResourceNotFound(String),

    /// Rule type is neither allow nor deny
    #[error("Unsupported rule type '{0}', expected 'allow' or 'deny'")]
    InvalidRuleType(String),

    /// Malformed mutator or query argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for access-control operations.
pub type AclResult<T> = Result<T, AclError>;

impl AclError {
    /// Check if this error reports an unknown role or resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AclError::RoleNotFound(_) | AclError::ResourceNotFound(_))
    }

    /// Get a stable error code for logs and API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AclError::DuplicateRole(_) => "DUPLICATE_ROLE",
            AclError::RoleNotFound(_) => "ROLE_NOT_FOUND",
            AclError::DuplicateResource(_) => "DUPLICATE_RESOURCE",
            AclError::ResourceNotFound(_) => "RESOURCE_NOT_FOUND",
            AclError::InvalidRuleType(_) => "INVALID_RULE_TYPE",
            AclError::InvalidArgument(_) => "INVALID_ARGUMENT",
        }
    }
}

/// Reject empty identifiers before they reach any table.
pub(crate) fn ensure_id(kind: &str, id: &str) -> AclResult<()> {
    if id.is_empty() {
        return Err(AclError::InvalidArgument(format!("{} id must not be empty", kind)));
    }
    Ok(())
}
