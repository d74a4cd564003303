//! Policy export
//!
//! Writes a live engine back out as a [`PolicyDocument`]. Loading the
//! exported document into a fresh engine, with the same registry, gives the
//! same answers as the engine it came from.
//!
//! Assertions are written by their registry name. A rule whose assertion
//! was never registered cannot be exported.

use std::collections::BTreeMap;
use std::path::Path;

use acl_engine::{Acl, RuleEntry, RuleType, Scope};
use tracing::{debug, info};

use crate::document::{ExplicitResource, ExplicitRole, OneOrMany, PolicyDocument, ResourceDecl, RoleDecl, RuleDecl};
use crate::error::{PolicyError, PolicyResult};
use crate::loader::PolicyLoader;

impl PolicyLoader {
    /// Describe an engine as a policy document.
    pub fn export(&self, acl: &Acl) -> PolicyResult<PolicyDocument> {
        let mut document = PolicyDocument::default();

        for id in acl.roles() {
            let parents = acl.role_parents(id)?;
            document.roles.push(if parents.is_empty() {
                RoleDecl::Id(id.clone())
            } else {
                RoleDecl::Explicit(ExplicitRole {
                    id: id.clone(),
                    parents: OneOrMany::Many(parents.to_vec()),
                })
            });
        }

        for id in acl.resources() {
            document.resources.push(match acl.resource_parent(id)? {
                None => ResourceDecl::Id(id.clone()),
                Some(parent) => ResourceDecl::Explicit(ExplicitResource {
                    id: id.clone(),
                    parent: Some(parent.to_string()),
                }),
            });
        }

        for (resource, role, bucket) in acl.rule_table().buckets() {
            if let Some(entry) = &bucket.all_privileges {
                let is_absolute_default = resource == Scope::All && role == Scope::All;
                if !(is_absolute_default && entry.kind == RuleType::Deny && entry.assertion.is_none()) {
                    let assertion = self.assertion_name(entry, resource, role)?;
                    document
                        .rules
                        .push(rule_decl(entry.kind, resource, role, Vec::new(), assertion));
                }
            }

            // Privileges sharing a type and assertion collapse into one rule
            let mut groups: BTreeMap<(RuleType, Option<String>), Vec<String>> = BTreeMap::new();
            for (privilege, entry) in &bucket.by_privilege {
                let assertion = self.assertion_name(entry, resource, role)?;
                groups.entry((entry.kind, assertion)).or_default().push(privilege.clone());
            }
            for ((kind, assertion), privileges) in groups {
                document.rules.push(rule_decl(kind, resource, role, privileges, assertion));
            }
        }

        debug!(
            roles = document.roles.len(),
            resources = document.resources.len(),
            rules = document.rules.len(),
            "Policy exported"
        );
        Ok(document)
    }

    /// Export an engine to a JSON file.
    pub fn save_file(&self, acl: &Acl, path: impl AsRef<Path>) -> PolicyResult<()> {
        let path = path.as_ref();
        let json = self.export(acl)?.to_json_pretty()?;

        std::fs::write(path, json).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Policy saved");
        Ok(())
    }

    fn assertion_name(&self, entry: &RuleEntry, resource: Scope<'_>, role: Scope<'_>) -> PolicyResult<Option<String>> {
        let Some(assertion) = &entry.assertion else {
            return Ok(None);
        };
        match self.registry().name_of(assertion) {
            Some(name) => Ok(Some(name.to_string())),
            None => Err(PolicyError::UnnamedAssertion(format!(
                "on resource '{}' for role '{}'",
                resource.id().unwrap_or("*"),
                role.id().unwrap_or("*")
            ))),
        }
    }
}

fn rule_decl(
    kind: RuleType,
    resource: Scope<'_>,
    role: Scope<'_>,
    privileges: Vec<String>,
    assertion: Option<String>,
) -> RuleDecl {
    RuleDecl {
        op: None,
        kind: kind.as_str().to_string(),
        roles: scope_ids(role),
        resources: scope_ids(resource),
        privileges: OneOrMany::Many(privileges),
        assertion,
    }
}

fn scope_ids(scope: Scope<'_>) -> OneOrMany {
    match scope.id() {
        Some(id) => OneOrMany::One(id.to_string()),
        None => OneOrMany::default(),
    }
}
