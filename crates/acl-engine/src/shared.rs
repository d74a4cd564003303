//! # Shared ACL Handle
//!
//! [`SharedAcl`] is a cheaply cloneable, thread-safe handle to one [`Acl`].
//! Queries take a read lock and run concurrently; mutations take the write
//! lock. Multi-step changes go through [`SharedAcl::update`], which works on
//! a draft copy and publishes it only when every step succeeds.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::acl::Acl;
use crate::error::AclResult;
use crate::rules::{Operation, Rule, RuleType};
use crate::snapshot::AclSnapshot;

/// Thread-safe handle to a shared ACL.
///
/// Assertions run while the read lock is held. They receive the engine
/// directly and must not call back into the handle.
///
/// # Example
///
/// ```
/// use acl_engine::{Acl, Rule, SharedAcl};
///
/// let shared = SharedAcl::new(Acl::new());
/// shared.add_role("guest", &[]).unwrap();
/// shared.allow(Rule::new().role("guest").privilege("view")).unwrap();
///
/// let reader = shared.clone();
/// assert!(reader.is_allowed(Some("guest"), None, Some("view")).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SharedAcl {
    inner: Arc<RwLock<Acl>>,
}

impl SharedAcl {
    /// Wrap an engine in a shared handle.
    pub fn new(acl: Acl) -> Self {
        Self {
            inner: Arc::new(RwLock::new(acl)),
        }
    }

    /// See [`Acl::is_allowed`].
    pub fn is_allowed(&self, role: Option<&str>, resource: Option<&str>, privilege: Option<&str>) -> AclResult<bool> {
        self.inner.read().is_allowed(role, resource, privilege)
    }

    /// See [`Acl::is_denied`].
    pub fn is_denied(&self, role: Option<&str>, resource: Option<&str>, privilege: Option<&str>) -> AclResult<bool> {
        self.inner.read().is_denied(role, resource, privilege)
    }

    /// Run a read-only closure against the engine.
    pub fn read<T>(&self, f: impl FnOnce(&Acl) -> T) -> T {
        f(&*self.inner.read())
    }

    /// Capture a snapshot of the current state.
    pub fn snapshot(&self) -> AclSnapshot {
        self.inner.read().snapshot()
    }

    /// Replace the current state with a snapshot.
    pub fn restore(&self, snapshot: AclSnapshot) {
        self.inner.write().restore(snapshot);
    }

    /// See [`Acl::add_role`].
    pub fn add_role(&self, id: &str, parents: &[&str]) -> AclResult<()> {
        self.inner.write().add_role(id, parents).map(|_| ())
    }

    /// See [`Acl::remove_role`].
    pub fn remove_role(&self, id: &str) -> AclResult<()> {
        self.inner.write().remove_role(id).map(|_| ())
    }

    /// See [`Acl::remove_all_roles`].
    pub fn remove_all_roles(&self) {
        self.inner.write().remove_all_roles();
    }

    /// See [`Acl::add_resource`].
    pub fn add_resource(&self, id: &str, parent: Option<&str>) -> AclResult<()> {
        self.inner.write().add_resource(id, parent).map(|_| ())
    }

    /// See [`Acl::remove_resource`].
    pub fn remove_resource(&self, id: &str) -> AclResult<()> {
        self.inner.write().remove_resource(id).map(|_| ())
    }

    /// See [`Acl::remove_all_resources`].
    pub fn remove_all_resources(&self) {
        self.inner.write().remove_all_resources();
    }

    /// See [`Acl::set_rule`].
    pub fn set_rule(&self, op: Operation, kind: RuleType, rule: Rule) -> AclResult<()> {
        self.inner.write().set_rule(op, kind, rule).map(|_| ())
    }

    /// Add an allow rule.
    pub fn allow(&self, rule: Rule) -> AclResult<()> {
        self.set_rule(Operation::Add, RuleType::Allow, rule)
    }

    /// Add a deny rule.
    pub fn deny(&self, rule: Rule) -> AclResult<()> {
        self.set_rule(Operation::Add, RuleType::Deny, rule)
    }

    /// Remove matching allow rules.
    pub fn remove_allow(&self, rule: Rule) -> AclResult<()> {
        self.set_rule(Operation::Remove, RuleType::Allow, rule)
    }

    /// Remove matching deny rules.
    pub fn remove_deny(&self, rule: Rule) -> AclResult<()> {
        self.set_rule(Operation::Remove, RuleType::Deny, rule)
    }

    /// Apply several mutations atomically.
    ///
    /// The closure runs against a draft copy while the write lock is held.
    /// If it returns `Err`, the draft is discarded and readers never observe
    /// the partial change.
    pub fn update<T, E>(&self, f: impl FnOnce(&mut Acl) -> Result<T, E>) -> Result<T, E> {
        let mut guard = self.inner.write();
        let mut draft = guard.clone();
        match f(&mut draft) {
            Ok(value) => {
                *guard = draft;
                Ok(value)
            }
            Err(err) => {
                debug!("ACL update rolled back");
                Err(err)
            }
        }
    }
}
