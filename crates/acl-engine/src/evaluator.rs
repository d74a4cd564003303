//! # Rule Evaluation
//!
//! Answers `is_allowed(role, resource, privilege)`.
//!
//! ## Algorithm
//!
//! The query ascends the resource chain, from the queried resource through
//! its ancestors to a final "all resources" step that always resolves
//! because the default rule always exists. At each level:
//!
//! 1. If a role was given, a depth-first search over the role and its
//!    ancestors looks for a matching rule. Parents are visited highest
//!    priority first (the most recently listed parent wins).
//! 2. Otherwise, or if the search found nothing, the level's "all roles"
//!    rules are consulted.
//!
//! For an all-privileges query (no privilege given), a single denied
//! privilege on a bucket is enough to refuse access.
//!
//! ## Assertions
//!
//! A rule gated by an assertion applies only if the assertion passes. A
//! failing assertion makes the rule invisible, except on the absolute
//! default rule, where it inverts the rule type.
//!
//! The assertion context (original role, resource and privilege) is
//! carried in a [`QueryContext`] passed down every call; nothing about an
//! in-flight query is stored on the engine.

use std::collections::HashSet;

use tracing::{debug, instrument, trace};

use crate::acl::Acl;
use crate::error::{ensure_id, AclResult};
use crate::rules::{RuleType, Scope};

/// The original query, as seen by assertions.
#[derive(Debug, Clone, Copy)]
struct QueryContext<'q> {
    role: Option<&'q str>,
    resource: Option<&'q str>,
    privilege: Option<&'q str>,
}

impl Acl {
    /// Check whether `role` may exercise `privilege` on `resource`.
    ///
    /// `None` for the role or resource means the query applies to all
    /// roles or all resources. Without a privilege, the result is `true`
    /// only if every privilege on the resource is allowed.
    ///
    /// Empty ids and unknown role or resource ids are errors.
    #[instrument(level = "trace", skip(self))]
    pub fn is_allowed(&self, role: Option<&str>, resource: Option<&str>, privilege: Option<&str>) -> AclResult<bool> {
        for (kind, id) in [("role", role), ("resource", resource), ("privilege", privilege)] {
            if let Some(id) = id {
                ensure_id(kind, id)?;
            }
        }

        let role = match role {
            Some(id) => Some(self.roles.get(id)?.id()),
            None => None,
        };
        let resource = match resource {
            Some(id) => Some(self.resources.get(id)?.id()),
            None => None,
        };
        let ctx = QueryContext { role, resource, privilege };

        let allowed = match privilege {
            None => self.all_privileges_allowed(ctx, role, resource),
            Some(privilege) => self.privilege_allowed(ctx, role, resource, privilege),
        };

        if self.config.log_decisions {
            debug!(role = ?role, resource = ?resource, privilege = ?privilege, allowed, "ACL decision");
        }
        Ok(allowed)
    }

    /// The exact complement of [`Acl::is_allowed`], errors included.
    pub fn is_denied(&self, role: Option<&str>, resource: Option<&str>, privilege: Option<&str>) -> AclResult<bool> {
        self.is_allowed(role, resource, privilege).map(|allowed| !allowed)
    }

    fn all_privileges_allowed<'a>(&'a self, ctx: QueryContext<'_>, role: Option<&str>, mut resource: Option<&'a str>) -> bool {
        loop {
            if let Some(role) = role {
                if let Some(result) = self.role_dfs(ctx, role, resource, None) {
                    return result;
                }
            }

            if self.rules.bucket_for(Scope::from(resource), Scope::All).is_some() {
                if self.denies_any_privilege(ctx, resource, None) {
                    return false;
                }
                if let Some(kind) = self.rule_type(ctx, resource, None, None) {
                    return kind.is_allow();
                }
            }

            match resource {
                Some(id) => resource = self.resources.parent_of(id),
                // The default bucket always resolves; reaching here means it was emptied
                None => return false,
            }
        }
    }

    fn privilege_allowed<'a>(
        &'a self,
        ctx: QueryContext<'_>,
        role: Option<&str>,
        mut resource: Option<&'a str>,
        privilege: &str,
    ) -> bool {
        loop {
            if let Some(role) = role {
                if let Some(result) = self.role_dfs(ctx, role, resource, Some(privilege)) {
                    return result;
                }
            }

            let kind = self
                .rule_type(ctx, resource, None, Some(privilege))
                .or_else(|| self.rule_type(ctx, resource, None, None));
            if let Some(kind) = kind {
                return kind.is_allow();
            }

            match resource {
                Some(id) => resource = self.resources.parent_of(id),
                None => return false,
            }
        }
    }

    /// Prioritized depth-first search over `role` and its ancestors.
    ///
    /// Parents are pushed in stored order, so the highest-priority parent
    /// is popped first. Each role is visited at most once.
    fn role_dfs(&self, ctx: QueryContext<'_>, role: &str, resource: Option<&str>, privilege: Option<&str>) -> Option<bool> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = vec![role];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            trace!(role = current, resource = ?resource, privilege = ?privilege, "DFS visit");

            let result = match privilege {
                Some(privilege) => self.visit_one_privilege(ctx, current, resource, privilege),
                None => self.visit_all_privileges(ctx, current, resource),
            };
            if result.is_some() {
                return result;
            }

            if let Ok(parents) = self.roles.parents_of(current) {
                stack.extend(parents.iter().map(String::as_str));
            }
        }
        None
    }

    fn visit_one_privilege(&self, ctx: QueryContext<'_>, role: &str, resource: Option<&str>, privilege: &str) -> Option<bool> {
        self.rule_type(ctx, resource, Some(role), Some(privilege))
            .or_else(|| self.rule_type(ctx, resource, Some(role), None))
            .map(RuleType::is_allow)
    }

    fn visit_all_privileges(&self, ctx: QueryContext<'_>, role: &str, resource: Option<&str>) -> Option<bool> {
        self.rules.bucket_for(Scope::from(resource), Scope::Id(role))?;
        if self.denies_any_privilege(ctx, resource, Some(role)) {
            return Some(false);
        }
        self.rule_type(ctx, resource, Some(role), None).map(RuleType::is_allow)
    }

    /// Check if any privilege-specific entry in a bucket resolves to deny.
    fn denies_any_privilege(&self, ctx: QueryContext<'_>, resource: Option<&str>, role: Option<&str>) -> bool {
        let Some(bucket) = self.rules.bucket_for(Scope::from(resource), Scope::from(role)) else {
            return false;
        };
        bucket
            .by_privilege
            .keys()
            .any(|privilege| self.rule_type(ctx, resource, role, Some(privilege.as_str())) == Some(RuleType::Deny))
    }

    /// Resolve the rule stored for one (resource, role, privilege) key.
    ///
    /// Returns `None` when no rule applies. A failing assertion hides the
    /// rule, except on the absolute default rule, which is inverted instead.
    fn rule_type(
        &self,
        ctx: QueryContext<'_>,
        resource: Option<&str>,
        role: Option<&str>,
        privilege: Option<&str>,
    ) -> Option<RuleType> {
        let bucket = self.rules.bucket_for(Scope::from(resource), Scope::from(role))?;
        let entry = match privilege {
            Some(privilege) => bucket.by_privilege.get(privilege)?,
            None => bucket.all_privileges.as_ref()?,
        };

        let Some(assertion) = &entry.assertion else {
            return Some(entry.kind);
        };

        let passed = assertion.pass(
            self,
            ctx.role.or(role),
            ctx.resource.or(resource),
            ctx.privilege,
        );
        if passed {
            Some(entry.kind)
        } else if resource.is_some() || role.is_some() || privilege.is_some() {
            None
        } else {
            Some(entry.kind.opposite())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::assertion::{from_fn, Constant};
    use crate::error::AclError;
    use crate::rules::Rule;

    use super::*;

    fn allowed(acl: &Acl, role: Option<&str>, resource: Option<&str>, privilege: Option<&str>) -> bool {
        acl.is_allowed(role, resource, privilege).unwrap()
    }

    #[test]
    fn test_default_deny() {
        let mut acl = Acl::new();
        acl.add_role("guest", &[]).unwrap();
        assert!(!allowed(&acl, None, None, None));
        assert!(!allowed(&acl, Some("guest"), None, None));
        assert!(!allowed(&acl, None, None, Some("some_privilege")));
    }

    #[test]
    fn test_empty_query_ids_are_errors() {
        let mut acl = Acl::new();
        acl.add_role("guest", &[]).unwrap();
        acl.allow(Rule::all()).unwrap();

        assert!(matches!(acl.is_allowed(Some(""), None, None), Err(AclError::InvalidArgument(_))));
        assert!(matches!(acl.is_allowed(None, Some(""), None), Err(AclError::InvalidArgument(_))));
        assert!(matches!(
            acl.is_allowed(Some("guest"), None, Some("")),
            Err(AclError::InvalidArgument(_))
        ));
        assert!(matches!(acl.is_denied(None, None, Some("")), Err(AclError::InvalidArgument(_))));
    }

    #[test]
    fn test_unknown_ids_are_errors() {
        let acl = Acl::new();
        assert_eq!(
            acl.is_allowed(Some("nonexistent"), None, None),
            Err(AclError::RoleNotFound("nonexistent".into()))
        );
        assert_eq!(
            acl.is_allowed(None, Some("nonexistent"), None),
            Err(AclError::ResourceNotFound("nonexistent".into()))
        );
        assert_eq!(
            acl.is_denied(None, Some("nonexistent"), None),
            Err(AclError::ResourceNotFound("nonexistent".into()))
        );
    }

    #[test]
    fn test_privilege_rules() {
        let mut acl = Acl::new();
        acl.allow(Rule::new().privileges(["p1", "p2", "p3"])).unwrap();
        assert!(allowed(&acl, None, None, Some("p1")));
        assert!(allowed(&acl, None, None, Some("p3")));
        assert!(!allowed(&acl, None, None, Some("p4")));
        assert!(!allowed(&acl, None, None, None));

        acl.deny(Rule::new().privilege("p1")).unwrap();
        assert!(!allowed(&acl, None, None, Some("p1")));
    }

    #[test]
    fn test_one_denied_privilege_blocks_all_privileges() {
        let mut acl = Acl::new();
        acl.allow(Rule::all()).unwrap();
        assert!(allowed(&acl, None, None, None));
        acl.deny(Rule::new().privilege("delete")).unwrap();
        assert!(!allowed(&acl, None, None, None));
        assert!(allowed(&acl, None, None, Some("read")));
    }

    #[test]
    fn test_inherited_role_rules() {
        let mut acl = Acl::new();
        acl.add_role("r1", &[]).unwrap();
        acl.add_role("r2", &["r1"]).unwrap();
        acl.deny(Rule::new().role("r1")).unwrap();
        acl.allow(Rule::new().role("r2").privilege("read")).unwrap();
        assert!(allowed(&acl, Some("r2"), None, Some("read")));
        assert!(!allowed(&acl, Some("r2"), None, Some("write")));
    }

    #[test]
    fn test_most_recent_parent_wins() {
        let mut acl = Acl::new();
        acl.add_role("guest", &[]).unwrap();
        acl.add_role("member", &[]).unwrap();
        acl.add_role("admin", &[]).unwrap();
        acl.add_role("someUser", &["guest", "member", "admin"]).unwrap();
        acl.add_resource("someResource", None).unwrap();

        acl.deny(Rule::new().role("guest").resource("someResource")).unwrap();
        acl.allow(Rule::new().role("member").resource("someResource")).unwrap();
        assert!(allowed(&acl, Some("someUser"), Some("someResource"), None));

        acl.deny(Rule::new().role("admin").resource("someResource")).unwrap();
        assert!(!allowed(&acl, Some("someUser"), Some("someResource"), None));
    }

    #[test]
    fn test_priority_searches_high_parent_ancestry_first() {
        let mut acl = Acl::new();
        acl.add_role("base", &[]).unwrap();
        acl.add_role("low", &[]).unwrap();
        acl.add_role("high", &["base"]).unwrap();
        acl.add_role("user", &["low", "high"]).unwrap();

        acl.allow(Rule::new().role("low").privilege("read")).unwrap();
        acl.deny(Rule::new().role("base").privilege("read")).unwrap();
        assert!(!allowed(&acl, Some("user"), None, Some("read")));
    }

    #[test]
    fn test_diamond_inheritance() {
        let mut acl = Acl::new();
        acl.add_role("root", &[]).unwrap();
        acl.add_role("left", &["root"]).unwrap();
        acl.add_role("right", &["root"]).unwrap();
        acl.add_role("leaf", &["left", "right"]).unwrap();
        acl.allow(Rule::new().role("root").privilege("read")).unwrap();
        assert!(allowed(&acl, Some("leaf"), None, Some("read")));
        assert!(!allowed(&acl, Some("leaf"), None, Some("write")));
    }

    #[test]
    fn test_resource_inheritance() {
        let mut acl = Acl::new();
        acl.add_role("guest", &[]).unwrap();
        acl.add_resource("city", None).unwrap();
        acl.add_resource("building", Some("city")).unwrap();
        acl.allow(Rule::new().role("guest").resource("city")).unwrap();

        assert!(allowed(&acl, Some("guest"), Some("building"), None));
        acl.add_resource("room", Some("building")).unwrap();
        assert!(allowed(&acl, Some("guest"), Some("room"), Some("enter")));

        acl.deny(Rule::new().role("guest").resource("room")).unwrap();
        assert!(!allowed(&acl, Some("guest"), Some("room"), Some("enter")));
        assert!(allowed(&acl, Some("guest"), Some("building"), Some("enter")));
    }

    #[test]
    fn test_resource_deny_beats_global_role_allow() {
        let mut acl = Acl::new();
        acl.add_role("guest", &[]).unwrap();
        acl.add_role("staff", &["guest"]).unwrap();
        acl.add_resource("area1", None).unwrap();
        acl.add_resource("area2", None).unwrap();
        acl.deny(Rule::all()).unwrap();
        acl.allow(Rule::new().role("staff")).unwrap();
        acl.deny(Rule::new().role("staff").resources(["area1", "area2"])).unwrap();
        assert!(!allowed(&acl, Some("staff"), Some("area1"), None));
        assert!(allowed(&acl, Some("staff"), None, None));
    }

    #[test]
    fn test_failing_assertion_on_default_inverts() {
        let mut acl = Acl::new();
        acl.deny(Rule::all().assert(Constant(false))).unwrap();
        assert!(allowed(&acl, None, None, None));
        assert!(allowed(&acl, None, None, Some("some_privilege")));

        acl.remove_deny(Rule::all()).unwrap();
        assert!(!allowed(&acl, None, None, None));
    }

    #[test]
    fn test_failing_assertion_elsewhere_falls_through() {
        let mut acl = Acl::new();
        acl.add_role("guest", &[]).unwrap();
        acl.add_resource("news", None).unwrap();
        acl.allow(
            Rule::new()
                .role("guest")
                .resource("news")
                .privilege("read")
                .assert(Constant(false)),
        )
        .unwrap();
        assert!(!allowed(&acl, Some("guest"), Some("news"), Some("read")));

        acl.allow(Rule::new().privilege("read").assert(Constant(false))).unwrap();
        assert!(!allowed(&acl, None, None, Some("read")));
        acl.allow(Rule::new().privilege("read").assert(Constant(true))).unwrap();
        assert!(allowed(&acl, None, None, Some("read")));
    }

    #[test]
    fn test_assertion_receives_original_query() {
        let seen: Arc<Mutex<Vec<(Option<String>, Option<String>, Option<String>)>>> = Arc::default();
        let record = seen.clone();
        let recorder = from_fn(move |_acl, role, resource, privilege| {
            record.lock().unwrap().push((
                role.map(str::to_string),
                resource.map(str::to_string),
                privilege.map(str::to_string),
            ));
            true
        });

        let mut acl = Acl::new();
        acl.add_role("guest", &[]).unwrap();
        acl.add_role("contributor", &["guest"]).unwrap();
        acl.add_role("publisher", &["contributor"]).unwrap();
        acl.add_resource("blog", None).unwrap();
        acl.add_resource("post", Some("blog")).unwrap();
        acl.allow(Rule::new().role("contributor").resource("blog").privilege("modify").assertion(recorder))
            .unwrap();

        assert!(allowed(&acl, Some("publisher"), Some("post"), Some("modify")));
        let calls = seen.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            (Some("publisher".into()), Some("post".into()), Some("modify".into()))
        );
    }

    #[test]
    fn test_assertion_on_all_privileges_entry_sees_queried_privilege() {
        let mut acl = Acl::new();
        acl.add_role("guest", &[]).unwrap();
        acl.add_resource("blog_post", None).unwrap();
        acl.allow(
            Rule::new()
                .role("guest")
                .assertion(from_fn(|_acl, _role, _resource, privilege| privilege == Some("read"))),
        )
        .unwrap();

        assert!(allowed(&acl, Some("guest"), Some("blog_post"), Some("read")));
        assert!(!allowed(&acl, Some("guest"), Some("blog_post"), Some("write")));
    }

    #[test]
    fn test_conditional_deny_in_all_privileges_scan() {
        let mut acl = Acl::new();
        acl.add_role("guest", &[]).unwrap();
        acl.allow(Rule::new().role("guest")).unwrap();
        acl.deny(Rule::new().role("guest").privilege("delete").assert(Constant(false))).unwrap();
        assert!(allowed(&acl, Some("guest"), None, None));

        acl.deny(Rule::new().role("guest").privilege("delete").assert(Constant(true))).unwrap();
        assert!(!allowed(&acl, Some("guest"), None, None));
    }

    #[test]
    fn test_denied_is_complement() {
        let mut acl = Acl::new();
        acl.add_role("guest", &[]).unwrap();
        acl.allow(Rule::new().role("guest").privilege("view")).unwrap();
        for privilege in [None, Some("view"), Some("edit")] {
            for role in [None, Some("guest")] {
                assert_eq!(
                    acl.is_denied(role, None, privilege).unwrap(),
                    !acl.is_allowed(role, None, privilege).unwrap()
                );
            }
        }
    }
}
