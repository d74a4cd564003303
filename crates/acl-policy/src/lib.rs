//! # ACL Policy
//!
//! Declarative policy documents for [`acl_engine`].
//!
//! ## Overview
//!
//! The acl-policy crate handles:
//! - **Documents**: a JSON schema for roles, resources and rules
//! - **Assertions**: a registry binding assertion names to predicates
//! - **Loading**: building or updating an engine from a string, a file or
//!   the environment, all-or-nothing
//! - **Export**: writing a live engine back out as a document or file
//!
//! ## Document format
//!
//! ```text
//! roles:      "id" | {"id": parent-or-parents} | {"id": .., "parents": ..}
//! resources:  "id" | {"id": parent}            | {"id": .., "parent": ..}
//! rules:      {"op"?: "add" | "remove", "type": "allow" | "deny",
//!              "roles"?, "resources"?, "privileges"?, "assertion"?}
//! ```
//!
//! `roles`, `resources` and `privileges` in a rule take one id or a list;
//! leaving one out means "all".
//!
//! ## Usage
//!
//! ```rust,no_run
//! use acl_policy::{LoaderConfig, PolicyLoader};
//!
//! let mut loader = PolicyLoader::new();
//! loader
//!     .registry_mut()
//!     .register_fn("read_only", |_acl, _role, _resource, privilege| privilege == Some("read"));
//!
//! // Reads ACL_POLICY_PATH and ACL_LOG_DECISIONS
//! let acl = loader.load_from_config(&LoaderConfig::from_env()).unwrap();
//! let _ = acl.is_allowed(Some("guest"), None, Some("read"));
//! ```

pub mod config;
pub mod document;
pub mod error;
mod export;
pub mod loader;
pub mod registry;

// Re-export main types for convenience
pub use config::LoaderConfig;
pub use document::{ExplicitResource, ExplicitRole, OneOrMany, PolicyDocument, ResourceDecl, RoleDecl, RuleDecl};
pub use error::{PolicyError, PolicyResult};
pub use loader::PolicyLoader;
pub use registry::AssertionRegistry;
