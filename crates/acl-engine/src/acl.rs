//! # Access Control List
//!
//! [`Acl`] owns the role graph, the resource tree and the rule table, and
//! exposes every mutator. Queries live in [`crate::evaluator`].
//!
//! Mutators are all-or-nothing: all ids are validated before anything is
//! written, so a failed call leaves the engine unchanged.

use tracing::{debug, trace};

use crate::config::AclConfig;
use crate::error::{ensure_id, AclResult};
use crate::resources::ResourceTree;
use crate::roles::RoleGraph;
use crate::rules::{Operation, Rule, RuleEntry, RuleTable, RuleType, Scope};

/// In-memory access control list.
///
/// # Example
///
/// ```
/// use acl_engine::{Acl, Rule};
///
/// let mut acl = Acl::new();
/// acl.add_role("guest", &[]).unwrap();
/// acl.add_role("staff", &["guest"]).unwrap();
/// acl.add_resource("newsletter", None).unwrap();
///
/// acl.allow(Rule::new().role("guest").privilege("view")).unwrap();
///
/// assert!(acl.is_allowed(Some("staff"), Some("newsletter"), Some("view")).unwrap());
/// assert!(!acl.is_allowed(Some("staff"), Some("newsletter"), Some("edit")).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Acl {
    pub(crate) roles: RoleGraph,
    pub(crate) resources: ResourceTree,
    pub(crate) rules: RuleTable,
    pub(crate) config: AclConfig,
}

impl Acl {
    /// Create an empty ACL that denies everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty ACL with explicit configuration.
    pub fn with_config(config: AclConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &AclConfig {
        &self.config
    }

    // Roles

    /// Register a role inheriting from `parents`.
    ///
    /// When parents carry conflicting rules, the parent listed last wins.
    pub fn add_role(&mut self, id: &str, parents: &[&str]) -> AclResult<&mut Self> {
        self.roles.add(id, parents)?;
        debug!(role = %id, parents = ?parents, "Role added");
        Ok(self)
    }

    /// Check if a role is registered.
    pub fn has_role(&self, id: &str) -> bool {
        self.roles.has(id)
    }

    /// Parent ids of a role, lowest priority first.
    pub fn role_parents(&self, id: &str) -> AclResult<&[String]> {
        self.roles.parents_of(id)
    }

    /// Check whether `role` inherits from `ancestor`.
    pub fn role_inherits_from(&self, role: &str, ancestor: &str, direct_only: bool) -> AclResult<bool> {
        self.roles.inherits_from(role, ancestor, direct_only)
    }

    /// Remove a role and every rule keyed to it.
    pub fn remove_role(&mut self, id: &str) -> AclResult<&mut Self> {
        self.roles.remove(id)?;
        self.rules.purge_role(id);
        debug!(role = %id, "Role removed");
        Ok(self)
    }

    /// Remove every role and every role-specific rule.
    pub fn remove_all_roles(&mut self) -> &mut Self {
        self.roles.remove_all();
        self.rules.purge_all_roles();
        debug!("All roles removed");
        self
    }

    /// Registered role ids in insertion order.
    pub fn roles(&self) -> &[String] {
        self.roles.ids()
    }

    // Resources

    /// Register a resource under an optional parent.
    pub fn add_resource(&mut self, id: &str, parent: Option<&str>) -> AclResult<&mut Self> {
        self.resources.add(id, parent)?;
        debug!(resource = %id, parent = ?parent, "Resource added");
        Ok(self)
    }

    /// Check if a resource is registered.
    pub fn has_resource(&self, id: &str) -> bool {
        self.resources.has(id)
    }

    /// Parent id of a resource.
    pub fn resource_parent(&self, id: &str) -> AclResult<Option<&str>> {
        self.resources.get(id).map(|node| node.parent())
    }

    /// Ancestors of a resource, nearest first.
    pub fn resource_ancestors(&self, id: &str) -> AclResult<Vec<&str>> {
        self.resources.ancestors(id)
    }

    /// Check whether `resource` inherits from `ancestor`.
    pub fn resource_inherits_from(&self, resource: &str, ancestor: &str, direct_only: bool) -> AclResult<bool> {
        self.resources.inherits_from(resource, ancestor, direct_only)
    }

    /// Remove a resource, its descendants, and every rule keyed to them.
    pub fn remove_resource(&mut self, id: &str) -> AclResult<&mut Self> {
        let removed = self.resources.remove(id)?;
        for resource in &removed {
            self.rules.purge_resource(resource);
        }
        debug!(resource = %id, removed = removed.len(), "Resource subtree removed");
        Ok(self)
    }

    /// Remove every resource and every resource-specific rule.
    pub fn remove_all_resources(&mut self) -> &mut Self {
        let removed = self.resources.remove_all();
        self.rules.purge_all_resources();
        debug!(removed = removed.len(), "All resources removed");
        self
    }

    /// Registered resource ids in insertion order.
    pub fn resources(&self) -> &[String] {
        self.resources.ids()
    }

    // Rules

    /// The stored rules.
    pub fn rule_table(&self) -> &RuleTable {
        &self.rules
    }

    /// Add an allow rule.
    pub fn allow(&mut self, rule: Rule) -> AclResult<&mut Self> {
        self.set_rule(Operation::Add, RuleType::Allow, rule)
    }

    /// Add a deny rule.
    pub fn deny(&mut self, rule: Rule) -> AclResult<&mut Self> {
        self.set_rule(Operation::Add, RuleType::Deny, rule)
    }

    /// Remove matching allow rules.
    pub fn remove_allow(&mut self, rule: Rule) -> AclResult<&mut Self> {
        self.set_rule(Operation::Remove, RuleType::Allow, rule)
    }

    /// Remove matching deny rules.
    pub fn remove_deny(&mut self, rule: Rule) -> AclResult<&mut Self> {
        self.set_rule(Operation::Remove, RuleType::Deny, rule)
    }

    /// Add or remove rules of one type.
    ///
    /// Adding overwrites whatever is stored for every (resource, role,
    /// privilege) combination the rule names. Removing only deletes stored
    /// entries whose type matches `kind`. A removal that names no resource
    /// also reaches every registered resource's buckets for the named roles.
    pub fn set_rule(&mut self, op: Operation, kind: RuleType, rule: Rule) -> AclResult<&mut Self> {
        for role in &rule.roles {
            ensure_id("role", role)?;
        }
        for resource in &rule.resources {
            ensure_id("resource", resource)?;
        }
        for privilege in &rule.privileges {
            ensure_id("privilege", privilege)?;
        }
        for role in &rule.roles {
            self.roles.get(role)?;
        }
        for resource in &rule.resources {
            self.resources.get(resource)?;
        }

        let roles = scopes(&rule.roles);
        debug!(
            op = op.as_str(),
            kind = kind.as_str(),
            roles = ?rule.roles,
            resources = ?rule.resources,
            privileges = ?rule.privileges,
            conditional = rule.assertion.is_some(),
            "Setting rule"
        );

        match op {
            Operation::Add => {
                for resource in scopes(&rule.resources) {
                    for role in &roles {
                        self.add_entries(resource, *role, kind, &rule);
                    }
                }
            }
            Operation::Remove if !rule.resources.is_empty() => {
                for resource in scopes(&rule.resources) {
                    for role in &roles {
                        self.remove_entries(resource, *role, kind, &rule.privileges);
                    }
                }
            }
            Operation::Remove => {
                let mut targets: Vec<Option<String>> = vec![None];
                targets.extend(self.resources.ids().iter().cloned().map(Some));
                for role in &roles {
                    for resource in &targets {
                        self.remove_entries(resource.as_deref(), *role, kind, &rule.privileges);
                    }
                }
            }
        }
        Ok(self)
    }

    fn add_entries(&mut self, resource: Option<&str>, role: Option<&str>, kind: RuleType, rule: &Rule) {
        let Some(bucket) = self
            .rules
            .bucket_for_mut(Scope::from(resource), Scope::from(role), true)
        else {
            return;
        };
        let entry = RuleEntry::with_assertion(kind, rule.assertion.clone());
        if rule.privileges.is_empty() {
            bucket.all_privileges = Some(entry);
        } else {
            for privilege in &rule.privileges {
                bucket.by_privilege.insert(privilege.clone(), entry.clone());
            }
        }
    }

    fn remove_entries(&mut self, resource: Option<&str>, role: Option<&str>, kind: RuleType, privileges: &[String]) {
        if privileges.is_empty() && resource.is_none() && role.is_none() {
            let current = self
                .rules
                .default_bucket()
                .all_privileges
                .as_ref()
                .map(|entry| entry.kind);
            if current == Some(kind) {
                self.rules.reset_default();
            }
            return;
        }

        let Some(bucket) = self
            .rules
            .bucket_for_mut(Scope::from(resource), Scope::from(role), false)
        else {
            trace!(resource = ?resource, role = ?role, "No rules to remove");
            return;
        };

        if privileges.is_empty() {
            if bucket.all_privileges.as_ref().is_some_and(|entry| entry.kind == kind) {
                bucket.all_privileges = None;
            }
        } else {
            for privilege in privileges {
                if bucket.by_privilege.get(privilege).is_some_and(|entry| entry.kind == kind) {
                    bucket.by_privilege.remove(privilege);
                }
            }
        }
    }
}

/// Expand a role or resource list into scopes; empty means "all".
fn scopes(ids: &[String]) -> Vec<Option<&str>> {
    if ids.is_empty() {
        vec![None]
    } else {
        ids.iter().map(|id| Some(id.as_str())).collect()
    }
}
