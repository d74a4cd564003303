//! # ACL Engine
//!
//! In-memory access control lists: roles inherit from roles, resources
//! inherit from resources, and rules grant or refuse privileges on
//! (resource, role) pairs.
//!
//! ## Overview
//!
//! - **Roles**: a DAG; a role may have several ordered parents
//! - **Resources**: a tree; a resource has at most one parent
//! - **Rules**: allow/deny entries keyed by resource, role and privilege,
//!   optionally gated by an [`Assertion`]
//! - **Evaluation**: [`Acl::is_allowed`] walks the resource chain upward and,
//!   at each level, searches the role's ancestry depth-first
//!
//! ## Architecture
//!
//! ```text
//! is_allowed(role, resource, privilege)
//!
//!   resource -> parent -> ... -> (all resources)
//!       |
//!       +-- role DFS: role, last parent's ancestry, ..., first parent's ancestry
//!       +-- rules for all roles
//! ```
//!
//! Everything is denied until a rule says otherwise. A `None` role, resource
//! or privilege means "all".
//!
//! ## Usage
//!
//! ```rust
//! use acl_engine::{Acl, Rule};
//!
//! let mut acl = Acl::new();
//! acl.add_role("guest", &[])?
//!     .add_role("staff", &["guest"])?
//!     .add_role("editor", &["staff"])?
//!     .add_role("administrator", &[])?;
//!
//! acl.allow(Rule::new().role("guest").privilege("view"))?
//!     .allow(Rule::new().role("staff").privileges(["edit", "submit", "revise"]))?
//!     .allow(Rule::new().role("editor").privileges(["publish", "archive", "delete"]))?
//!     .allow(Rule::new().role("administrator"))?;
//!
//! assert!(acl.is_allowed(Some("guest"), None, Some("view"))?);
//! assert!(!acl.is_allowed(Some("staff"), None, Some("publish"))?);
//! assert!(acl.is_allowed(Some("editor"), None, Some("view"))?);
//! assert!(acl.is_allowed(Some("administrator"), None, None)?);
//! # Ok::<(), acl_engine::AclError>(())
//! ```
//!
//! ## Sharing across threads
//!
//! [`Acl`] is a plain value. Wrap it in a [`SharedAcl`] to query it from many
//! threads while mutations are serialized behind a write lock.

pub mod acl;
pub mod assertion;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod resources;
pub mod roles;
pub mod rules;
pub mod shared;
pub mod snapshot;

// Re-export main types for convenience
pub use acl::Acl;
pub use assertion::{Assertion, SharedAssertion};
pub use config::AclConfig;
pub use error::{AclError, AclResult};
pub use resources::{ResourceNode, ResourceTree};
pub use roles::{RoleGraph, RoleNode};
pub use rules::{Operation, Rule, RuleBucket, RuleEntry, RuleTable, RuleType, Scope};
pub use shared::SharedAcl;
pub use snapshot::AclSnapshot;
