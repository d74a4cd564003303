//! Policy document schema
//!
//! A policy document lists roles, resources and rules as JSON. Roles and
//! resources accept several shapes so that small policies stay terse:
//!
//! ```json
//! {
//!   "roles": ["guest", {"staff": "guest"}, {"id": "editor", "parents": ["staff"]}],
//!   "resources": ["news", {"latest": "news"}, {"id": "archive", "parent": "news"}],
//!   "rules": [
//!     {"type": "allow", "roles": "guest", "privileges": "view"},
//!     {"op": "remove", "type": "allow", "roles": "guest", "privileges": "view"}
//!   ]
//! }
//! ```
//!
//! An object with an `id` key is always read as the explicit form.

use std::collections::BTreeMap;

use acl_engine::{Operation, RuleType};
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, PolicyResult};

/// A whole policy document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyDocument {
    /// Roles, in registration order
    #[serde(default)]
    pub roles: Vec<RoleDecl>,

    /// Resources, in registration order
    #[serde(default)]
    pub resources: Vec<ResourceDecl>,

    /// Rule mutations, applied in order
    #[serde(default)]
    pub rules: Vec<RuleDecl>,
}

impl PolicyDocument {
    /// Parse a document from JSON.
    pub fn from_json(json: &str) -> PolicyResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the document as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> PolicyResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check if the document declares nothing.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.resources.is_empty() && self.rules.is_empty()
    }
}

/// One id or a list of ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl OneOrMany {
    /// Borrow the ids as a list.
    pub fn as_slice(&self) -> &[String] {
        match self {
            OneOrMany::One(id) => std::slice::from_ref(id),
            OneOrMany::Many(ids) => ids,
        }
    }

    /// Check if no id is given.
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

/// Role declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleDecl {
    /// `"guest"`
    Id(String),
    /// `{"id": "editor", "parents": ["staff"]}`
    Explicit(ExplicitRole),
    /// `{"staff": "guest"}` or `{"staff": ["guest", "member"]}`
    Shorthand(BTreeMap<String, OneOrMany>),
}

/// Explicit role declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExplicitRole {
    pub id: String,
    #[serde(default, skip_serializing_if = "OneOrMany::is_empty")]
    pub parents: OneOrMany,
}

impl RoleDecl {
    /// The declared role id and its parents, lowest priority first.
    pub fn normalize(&self) -> PolicyResult<(&str, Vec<&str>)> {
        match self {
            RoleDecl::Id(id) => Ok((id.as_str(), Vec::new())),
            RoleDecl::Explicit(role) => Ok((role.id.as_str(), as_strs(&role.parents))),
            RoleDecl::Shorthand(map) => {
                let (id, parents) = single_entry("role", map)?;
                Ok((id, as_strs(parents)))
            }
        }
    }
}

/// Resource declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceDecl {
    /// `"news"`
    Id(String),
    /// `{"id": "archive", "parent": "news"}`
    Explicit(ExplicitResource),
    /// `{"latest": "news"}`
    Shorthand(BTreeMap<String, Option<String>>),
}

/// Explicit resource declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExplicitResource {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl ResourceDecl {
    /// The declared resource id and its parent.
    pub fn normalize(&self) -> PolicyResult<(&str, Option<&str>)> {
        match self {
            ResourceDecl::Id(id) => Ok((id.as_str(), None)),
            ResourceDecl::Explicit(resource) => Ok((resource.id.as_str(), resource.parent.as_deref())),
            ResourceDecl::Shorthand(map) => {
                let (id, parent) = single_entry("resource", map)?;
                Ok((id, parent.as_deref()))
            }
        }
    }
}

/// Rule declaration.
///
/// `op` and `type` are kept as text and parsed when the rule is applied, so
/// that an unsupported value is reported with the engine's error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDecl {
    /// `add` (default) or `remove`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,

    /// `allow` or `deny`
    #[serde(rename = "type")]
    pub kind: String,

    /// Roles the rule applies to; empty means all
    #[serde(default, skip_serializing_if = "OneOrMany::is_empty")]
    pub roles: OneOrMany,

    /// Resources the rule applies to; empty means all
    #[serde(default, skip_serializing_if = "OneOrMany::is_empty")]
    pub resources: OneOrMany,

    /// Privileges the rule applies to; empty means all
    #[serde(default, skip_serializing_if = "OneOrMany::is_empty")]
    pub privileges: OneOrMany,

    /// Name of a registered assertion gating the rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion: Option<String>,
}

impl RuleDecl {
    /// Parse the declared operation.
    pub fn operation(&self) -> PolicyResult<Operation> {
        match &self.op {
            Some(op) => Ok(op.parse::<Operation>()?),
            None => Ok(Operation::default()),
        }
    }

    /// Parse the declared rule type.
    pub fn rule_type(&self) -> PolicyResult<RuleType> {
        Ok(self.kind.parse::<RuleType>()?)
    }
}

fn as_strs(ids: &OneOrMany) -> Vec<&str> {
    ids.as_slice().iter().map(String::as_str).collect()
}

fn single_entry<'a, V>(kind: &str, map: &'a BTreeMap<String, V>) -> PolicyResult<(&'a str, &'a V)> {
    let mut entries = map.iter();
    match (entries.next(), entries.next()) {
        (Some((id, value)), None) => Ok((id.as_str(), value)),
        _ => Err(PolicyError::InvalidDeclaration(format!(
            "{} shorthand must name exactly one {}, found {}",
            kind,
            kind,
            map.len()
        ))),
    }
}
