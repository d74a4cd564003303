//! Policy loader
//!
//! Turns a [`PolicyDocument`] into engine calls. Declarations are applied
//! in document order: roles, then resources, then rules. Application is
//! all-or-nothing; a document that fails halfway leaves the target engine
//! as it was.

use std::path::Path;

use acl_engine::{Acl, AclConfig, Rule, SharedAcl};
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::document::{PolicyDocument, RuleDecl};
use crate::error::{PolicyError, PolicyResult};
use crate::registry::AssertionRegistry;

/// Builds and updates engines from policy documents.
///
/// # Example
///
/// ```
/// use acl_engine::AclConfig;
/// use acl_policy::PolicyLoader;
///
/// let loader = PolicyLoader::new();
/// let acl = loader
///     .load_str(
///         r#"{
///             "roles": ["guest", {"staff": "guest"}],
///             "resources": ["news"],
///             "rules": [{"type": "allow", "roles": "guest", "privileges": "view"}]
///         }"#,
///         AclConfig::default(),
///     )
///     .unwrap();
///
/// assert!(acl.is_allowed(Some("staff"), Some("news"), Some("view")).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PolicyLoader {
    registry: AssertionRegistry,
}

impl PolicyLoader {
    /// Create a loader with no named assertions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader resolving assertion names against `registry`.
    pub fn with_registry(registry: AssertionRegistry) -> Self {
        Self { registry }
    }

    /// The assertion registry.
    pub fn registry(&self) -> &AssertionRegistry {
        &self.registry
    }

    /// Mutable access to the assertion registry.
    pub fn registry_mut(&mut self) -> &mut AssertionRegistry {
        &mut self.registry
    }

    /// Build a new engine from a JSON document.
    pub fn load_str(&self, json: &str, config: AclConfig) -> PolicyResult<Acl> {
        let document = PolicyDocument::from_json(json)?;
        let mut acl = Acl::with_config(config);
        self.apply(&mut acl, &document)?;
        Ok(acl)
    }

    /// Build a new engine from a JSON file.
    pub fn load_file(&self, path: impl AsRef<Path>, config: AclConfig) -> PolicyResult<Acl> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading policy file");

        let json = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&json, config)
    }

    /// Build a new engine from the configured policy file.
    pub fn load_from_config(&self, config: &LoaderConfig) -> PolicyResult<Acl> {
        let path = config
            .policy_path
            .as_deref()
            .ok_or(PolicyError::MissingPolicyPath)?;
        self.load_file(path, config.engine.clone())
    }

    /// Apply a document to an existing engine.
    ///
    /// The document is applied to a copy that replaces `acl` only once every
    /// declaration has succeeded.
    pub fn apply(&self, acl: &mut Acl, document: &PolicyDocument) -> PolicyResult<()> {
        let mut draft = acl.clone();
        self.apply_in_place(&mut draft, document)?;
        *acl = draft;
        Ok(())
    }

    /// Apply a document to a shared engine under its write lock.
    pub fn apply_shared(&self, acl: &SharedAcl, document: &PolicyDocument) -> PolicyResult<()> {
        acl.update(|draft| self.apply_in_place(draft, document))
    }

    fn apply_in_place(&self, acl: &mut Acl, document: &PolicyDocument) -> PolicyResult<()> {
        if document.is_empty() {
            warn!("Policy document is empty");
            return Ok(());
        }

        for decl in &document.roles {
            let (id, parents) = decl.normalize()?;
            acl.add_role(id, &parents)?;
        }
        for decl in &document.resources {
            let (id, parent) = decl.normalize()?;
            acl.add_resource(id, parent)?;
        }
        for (index, decl) in document.rules.iter().enumerate() {
            let op = decl.operation()?;
            let kind = decl.rule_type()?;
            let rule = self.build_rule(decl)?;
            debug!(index, op = op.as_str(), kind = kind.as_str(), "Applying policy rule");
            acl.set_rule(op, kind, rule)?;
        }

        info!(
            roles = document.roles.len(),
            resources = document.resources.len(),
            rules = document.rules.len(),
            "Policy applied"
        );
        Ok(())
    }

    fn build_rule(&self, decl: &RuleDecl) -> PolicyResult<Rule> {
        let mut rule = Rule::new()
            .roles(decl.roles.as_slice().iter().cloned())
            .resources(decl.resources.as_slice().iter().cloned())
            .privileges(decl.privileges.as_slice().iter().cloned());
        if let Some(name) = &decl.assertion {
            rule = rule.assertion(self.registry.resolve(name)?);
        }
        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use acl_engine::assertion::Constant;
    use acl_engine::AclError;

    use super::*;

    const NEWSROOM: &str = r#"{
        "roles": ["guest", {"staff": "guest"}, {"id": "editor", "parents": ["staff"]}],
        "resources": ["news", {"latest": "news"}, {"id": "archive", "parent": "news"}],
        "rules": [
            {"type": "allow", "roles": "guest", "privileges": "view"},
            {"type": "allow", "roles": "staff", "privileges": ["edit", "submit"]},
            {"type": "allow", "roles": "editor", "resources": "news"},
            {"type": "deny", "resources": "archive", "privileges": "edit"}
        ]
    }"#;

    fn allowed(acl: &Acl, role: &str, resource: &str, privilege: &str) -> bool {
        acl.is_allowed(Some(role), Some(resource), Some(privilege)).unwrap()
    }

    #[test]
    fn test_load_str() {
        let acl = PolicyLoader::new().load_str(NEWSROOM, AclConfig::default()).unwrap();

        assert_eq!(acl.roles(), ["guest", "staff", "editor"]);
        assert_eq!(acl.resources(), ["news", "latest", "archive"]);
        assert!(allowed(&acl, "guest", "latest", "view"));
        assert!(!allowed(&acl, "guest", "latest", "edit"));
        assert!(allowed(&acl, "staff", "latest", "edit"));
        assert!(allowed(&acl, "editor", "latest", "publish"));
        assert!(!allowed(&acl, "staff", "archive", "edit"));
        assert!(!allowed(&acl, "editor", "archive", "edit"));
    }

    #[test]
    fn test_config_reaches_engine() {
        let config = AclConfig::default().with_log_decisions(true);
        let acl = PolicyLoader::new().load_str("{}", config.clone()).unwrap();
        assert_eq!(acl.config(), &config);
    }

    #[test]
    fn test_remove_rules() {
        let acl = PolicyLoader::new()
            .load_str(
                r#"{
                    "roles": ["guest"],
                    "rules": [
                        {"type": "allow", "roles": "guest", "privileges": ["view", "comment"]},
                        {"op": "remove", "type": "allow", "roles": "guest", "privileges": "comment"}
                    ]
                }"#,
                AclConfig::default(),
            )
            .unwrap();
        assert!(acl.is_allowed(Some("guest"), None, Some("view")).unwrap());
        assert!(!acl.is_allowed(Some("guest"), None, Some("comment")).unwrap());
    }

    #[test]
    fn test_named_assertions() {
        let mut loader = PolicyLoader::new();
        loader
            .registry_mut()
            .register("closed", Constant(false))
            .register("open", Constant(true));

        let acl = loader
            .load_str(
                r#"{
                    "roles": ["guest"],
                    "rules": [
                        {"type": "allow", "roles": "guest", "privileges": "view", "assertion": "open"},
                        {"type": "allow", "roles": "guest", "privileges": "edit", "assertion": "closed"}
                    ]
                }"#,
                AclConfig::default(),
            )
            .unwrap();
        assert!(acl.is_allowed(Some("guest"), None, Some("view")).unwrap());
        assert!(!acl.is_allowed(Some("guest"), None, Some("edit")).unwrap());
    }

    #[test]
    fn test_unknown_assertion() {
        let result = PolicyLoader::new().load_str(
            r#"{"rules": [{"type": "allow", "assertion": "office_hours"}]}"#,
            AclConfig::default(),
        );
        assert!(matches!(result, Err(PolicyError::UnknownAssertion(name)) if name == "office_hours"));
    }

    #[test]
    fn test_failed_apply_leaves_engine_unchanged() {
        let mut acl = Acl::new();
        acl.add_role("guest", &[]).unwrap();

        let document = PolicyDocument::from_json(
            r#"{"roles": ["staff", {"editor": "nobody"}], "rules": [{"type": "allow"}]}"#,
        )
        .unwrap();
        let result = PolicyLoader::new().apply(&mut acl, &document);

        assert!(matches!(result, Err(PolicyError::Acl(AclError::RoleNotFound(id))) if id == "nobody"));
        assert_eq!(acl.roles(), ["guest"]);
        assert!(!acl.is_allowed(None, None, None).unwrap());
    }

    #[test]
    fn test_bad_rule_type() {
        let result = PolicyLoader::new().load_str(r#"{"rules": [{"type": "permit"}]}"#, AclConfig::default());
        assert!(matches!(result, Err(PolicyError::Acl(AclError::InvalidRuleType(_)))));
    }

    #[test]
    fn test_missing_policy_path() {
        let result = PolicyLoader::new().load_from_config(&LoaderConfig::default());
        assert!(matches!(result, Err(PolicyError::MissingPolicyPath)));
    }

    #[test]
    fn test_apply_shared_rolls_back() {
        let shared = SharedAcl::default();
        let loader = PolicyLoader::new();

        let good = PolicyDocument::from_json(r#"{"roles": ["guest"]}"#).unwrap();
        loader.apply_shared(&shared, &good).unwrap();

        let bad = PolicyDocument::from_json(r#"{"roles": ["staff", "guest"]}"#).unwrap();
        assert!(matches!(
            loader.apply_shared(&shared, &bad),
            Err(PolicyError::Acl(AclError::DuplicateRole(_)))
        ));
        assert_eq!(shared.read(|acl| acl.roles().to_vec()), vec!["guest".to_string()]);
    }
}
