//! # Rules
//!
//! Rule storage for the engine. Rules are kept in buckets, one bucket per
//! (resource scope, role scope) pair, where either scope may be "all".
//! Each bucket holds an optional catch-all entry plus entries keyed by
//! privilege.
//!
//! ```text
//! RuleTable
//!   default            (all resources, all roles)   -- always present
//!   global_roles[role] (all resources, role)
//!   by_resource[res]
//!     all_roles        (res, all roles)
//!     by_role[role]    (res, role)
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assertion::{Assertion, Opaque, SharedAssertion};
use crate::error::{AclError, AclResult};

/// Whether a rule grants or refuses access.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Grant access
    Allow,
    /// Refuse access
    Deny,
}

impl RuleType {
    /// Get the string representation of the rule type.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Allow => "allow",
            RuleType::Deny => "deny",
        }
    }

    /// The inverse rule type.
    pub fn opposite(self) -> Self {
        match self {
            RuleType::Allow => RuleType::Deny,
            RuleType::Deny => RuleType::Allow,
        }
    }

    /// Check if this rule type grants access.
    pub fn is_allow(self) -> bool {
        self == RuleType::Allow
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleType {
    type Err = AclError;

    fn from_str(s: &str) -> AclResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "allow" | "type_allow" => Ok(RuleType::Allow),
            "deny" | "type_deny" => Ok(RuleType::Deny),
            _ => Err(AclError::InvalidRuleType(s.to_string())),
        }
    }
}

/// Rule mutation to perform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Add or overwrite rules
    #[default]
    Add,
    /// Remove matching rules
    Remove,
}

impl Operation {
    /// Get the string representation of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Remove => "remove",
        }
    }
}

impl FromStr for Operation {
    type Err = AclError;

    fn from_str(s: &str) -> AclResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "add" | "op_add" => Ok(Operation::Add),
            "remove" | "op_remove" => Ok(Operation::Remove),
            _ => Err(AclError::InvalidArgument(format!(
                "unsupported operation '{}', expected 'add' or 'remove'",
                s
            ))),
        }
    }
}

/// A stored rule: its type and optional gating assertion.
#[derive(Clone)]
pub struct RuleEntry {
    /// Allow or deny
    pub kind: RuleType,
    /// Condition that must pass for the rule to apply
    pub assertion: Option<SharedAssertion>,
}

impl RuleEntry {
    /// Create an unconditional rule entry.
    pub fn new(kind: RuleType) -> Self {
        Self { kind, assertion: None }
    }

    /// Create a rule entry gated by an assertion.
    pub fn with_assertion(kind: RuleType, assertion: Option<SharedAssertion>) -> Self {
        Self { kind, assertion }
    }

    fn default_deny() -> Self {
        Self::new(RuleType::Deny)
    }
}

impl fmt::Debug for RuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEntry")
            .field("kind", &self.kind)
            .field("assertion", &Opaque(&self.assertion))
            .finish()
    }
}

/// Rules for one (resource scope, role scope) pair.
#[derive(Debug, Clone, Default)]
pub struct RuleBucket {
    /// Entry covering every privilege
    pub all_privileges: Option<RuleEntry>,
    /// Entries for named privileges
    pub by_privilege: BTreeMap<String, RuleEntry>,
}

impl RuleBucket {
    /// Check if the bucket holds no entries.
    pub fn is_empty(&self) -> bool {
        self.all_privileges.is_none() && self.by_privilege.is_empty()
    }

    fn absolute_default() -> Self {
        Self {
            all_privileges: Some(RuleEntry::default_deny()),
            by_privilege: BTreeMap::new(),
        }
    }
}

/// Role or resource scope of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope<'a> {
    /// Applies to every role or resource
    All,
    /// Applies to one role or resource
    Id(&'a str),
}

impl<'a> Scope<'a> {
    /// The scoped id, or `None` for "all".
    pub fn id(self) -> Option<&'a str> {
        match self {
            Scope::All => None,
            Scope::Id(id) => Some(id),
        }
    }
}

impl<'a> From<Option<&'a str>> for Scope<'a> {
    fn from(id: Option<&'a str>) -> Self {
        match id {
            Some(id) => Scope::Id(id),
            None => Scope::All,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ResourceRules {
    all_roles: Option<RuleBucket>,
    by_role: HashMap<String, RuleBucket>,
}

/// Nested rule storage keyed by resource scope, then role scope.
///
/// The (all resources, all roles) bucket always exists and defaults to an
/// unconditional deny.
#[derive(Debug, Clone)]
pub struct RuleTable {
    default: RuleBucket,
    global_roles: HashMap<String, RuleBucket>,
    by_resource: HashMap<String, ResourceRules>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self {
            default: RuleBucket::absolute_default(),
            global_roles: HashMap::new(),
            by_resource: HashMap::new(),
        }
    }
}

impl RuleTable {
    /// Create a table holding only the default deny rule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a bucket without creating it.
    pub fn bucket_for(&self, resource: Scope<'_>, role: Scope<'_>) -> Option<&RuleBucket> {
        match (resource, role) {
            (Scope::All, Scope::All) => Some(&self.default),
            (Scope::All, Scope::Id(role)) => self.global_roles.get(role),
            (Scope::Id(resource), Scope::All) => self.by_resource.get(resource)?.all_roles.as_ref(),
            (Scope::Id(resource), Scope::Id(role)) => self.by_resource.get(resource)?.by_role.get(role),
        }
    }

    /// Look up a bucket for writing, creating an empty one if asked to.
    pub fn bucket_for_mut(
        &mut self,
        resource: Scope<'_>,
        role: Scope<'_>,
        create: bool,
    ) -> Option<&mut RuleBucket> {
        if create {
            return Some(match (resource, role) {
                (Scope::All, Scope::All) => &mut self.default,
                (Scope::All, Scope::Id(role)) => self.global_roles.entry(role.to_string()).or_default(),
                (Scope::Id(resource), role) => {
                    let rules = self.by_resource.entry(resource.to_string()).or_default();
                    match role {
                        Scope::All => rules.all_roles.get_or_insert_with(RuleBucket::default),
                        Scope::Id(role) => rules.by_role.entry(role.to_string()).or_default(),
                    }
                }
            });
        }

        match (resource, role) {
            (Scope::All, Scope::All) => Some(&mut self.default),
            (Scope::All, Scope::Id(role)) => self.global_roles.get_mut(role),
            (Scope::Id(resource), Scope::All) => self.by_resource.get_mut(resource)?.all_roles.as_mut(),
            (Scope::Id(resource), Scope::Id(role)) => self.by_resource.get_mut(resource)?.by_role.get_mut(role),
        }
    }

    /// The permanent (all resources, all roles) bucket.
    pub fn default_bucket(&self) -> &RuleBucket {
        &self.default
    }

    /// Reset the default bucket to an unconditional deny.
    pub fn reset_default(&mut self) {
        self.default = RuleBucket::absolute_default();
    }

    /// Every bucket with its (resource, role) scopes.
    ///
    /// The default bucket comes first, then role buckets for all resources,
    /// then resource buckets; ids are sorted within each group.
    pub fn buckets(&self) -> Vec<(Scope<'_>, Scope<'_>, &RuleBucket)> {
        let mut buckets = vec![(Scope::All, Scope::All, &self.default)];

        let mut roles: Vec<_> = self.global_roles.iter().collect();
        roles.sort_by(|a, b| a.0.cmp(b.0));
        buckets.extend(
            roles
                .into_iter()
                .map(|(role, bucket)| (Scope::All, Scope::Id(role.as_str()), bucket)),
        );

        let mut resources: Vec<_> = self.by_resource.iter().collect();
        resources.sort_by(|a, b| a.0.cmp(b.0));
        for (resource, rules) in resources {
            if let Some(bucket) = &rules.all_roles {
                buckets.push((Scope::Id(resource.as_str()), Scope::All, bucket));
            }
            let mut roles: Vec<_> = rules.by_role.iter().collect();
            roles.sort_by(|a, b| a.0.cmp(b.0));
            buckets.extend(
                roles
                    .into_iter()
                    .map(|(role, bucket)| (Scope::Id(resource.as_str()), Scope::Id(role.as_str()), bucket)),
            );
        }
        buckets
    }

    /// Drop every bucket keyed to a role.
    pub fn purge_role(&mut self, role: &str) {
        self.global_roles.remove(role);
        for rules in self.by_resource.values_mut() {
            rules.by_role.remove(role);
        }
    }

    /// Drop every role-specific bucket.
    pub fn purge_all_roles(&mut self) {
        self.global_roles.clear();
        for rules in self.by_resource.values_mut() {
            rules.by_role.clear();
        }
    }

    /// Drop every bucket keyed to a resource.
    pub fn purge_resource(&mut self, resource: &str) {
        self.by_resource.remove(resource);
    }

    /// Drop every resource-specific bucket.
    pub fn purge_all_resources(&mut self) {
        self.by_resource.clear();
    }
}

/// Arguments of a rule mutation.
///
/// Empty role or resource lists mean "all roles" / "all resources"; an
/// empty privilege list means "all privileges".
///
/// # Example
///
/// ```
/// use acl_engine::Rule;
///
/// // Everyone may view the news
/// let rule = Rule::new().resource("news").privilege("view");
/// # let _ = rule;
///
/// // The absolute default rule
/// let rule = Rule::all();
/// # let _ = rule;
/// ```
#[derive(Clone, Default)]
pub struct Rule {
    pub(crate) roles: Vec<String>,
    pub(crate) resources: Vec<String>,
    pub(crate) privileges: Vec<String>,
    pub(crate) assertion: Option<SharedAssertion>,
}

impl Rule {
    /// Create a rule covering all roles, resources and privileges.
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias of [`Rule::new`] that reads better for global rules.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict the rule to a role (may be repeated).
    pub fn role(mut self, id: impl Into<String>) -> Self {
        self.roles.push(id.into());
        self
    }

    /// Restrict the rule to several roles.
    pub fn roles<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Restrict the rule to a resource (may be repeated).
    pub fn resource(mut self, id: impl Into<String>) -> Self {
        self.resources.push(id.into());
        self
    }

    /// Restrict the rule to several resources.
    pub fn resources<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Restrict the rule to a privilege (may be repeated).
    pub fn privilege(mut self, privilege: impl Into<String>) -> Self {
        self.privileges.push(privilege.into());
        self
    }

    /// Restrict the rule to several privileges.
    pub fn privileges<I, S>(mut self, privileges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.privileges.extend(privileges.into_iter().map(Into::into));
        self
    }

    /// Gate the rule behind an assertion.
    pub fn assert<A: Assertion + 'static>(self, assertion: A) -> Self {
        self.assertion(Arc::new(assertion))
    }

    /// Gate the rule behind an already shared assertion.
    pub fn assertion(mut self, assertion: SharedAssertion) -> Self {
        self.assertion = Some(assertion);
        self
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("roles", &self.roles)
            .field("resources", &self.resources)
            .field("privileges", &self.privileges)
            .field("assertion", &Opaque(&self.assertion))
            .finish()
    }
}
