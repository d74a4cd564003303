//! # Snapshots
//!
//! A snapshot is a detached copy of the three tables backing an [`Acl`].
//! Restoring one yields an engine that answers every query exactly as the
//! source did when the snapshot was taken. Assertions are shared, not
//! duplicated.

use crate::acl::Acl;
use crate::config::AclConfig;
use crate::resources::ResourceTree;
use crate::roles::RoleGraph;
use crate::rules::RuleTable;

/// Point-in-time copy of an ACL's roles, resources and rules.
#[derive(Debug, Clone, Default)]
pub struct AclSnapshot {
    roles: RoleGraph,
    resources: ResourceTree,
    rules: RuleTable,
}

impl AclSnapshot {
    /// The captured role graph.
    pub fn roles(&self) -> &RoleGraph {
        &self.roles
    }

    /// The captured resource tree.
    pub fn resources(&self) -> &ResourceTree {
        &self.resources
    }

    /// The captured rule table.
    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }
}

impl Acl {
    /// Capture the current roles, resources and rules.
    pub fn snapshot(&self) -> AclSnapshot {
        AclSnapshot {
            roles: self.roles.clone(),
            resources: self.resources.clone(),
            rules: self.rules.clone(),
        }
    }

    /// Build an engine from a snapshot.
    pub fn from_snapshot(snapshot: AclSnapshot, config: AclConfig) -> Self {
        Self {
            roles: snapshot.roles,
            resources: snapshot.resources,
            rules: snapshot.rules,
            config,
        }
    }

    /// Replace this engine's tables with a snapshot, keeping the config.
    pub fn restore(&mut self, snapshot: AclSnapshot) -> &mut Self {
        self.roles = snapshot.roles;
        self.resources = snapshot.resources;
        self.rules = snapshot.rules;
        self
    }
}
