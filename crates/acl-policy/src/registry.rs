//! Named assertions
//!
//! Policy documents refer to assertions by name. The registry binds those
//! names to predicates supplied by the embedding application.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use acl_engine::{Acl, Assertion, SharedAssertion};

use crate::error::{PolicyError, PolicyResult};

/// Name-to-assertion bindings used while applying a document.
///
/// # Example
///
/// ```
/// use acl_policy::AssertionRegistry;
///
/// let mut registry = AssertionRegistry::new();
/// registry.register_fn("read_only", |_acl, _role, _resource, privilege| privilege == Some("read"));
/// assert!(registry.contains("read_only"));
/// ```
#[derive(Clone, Default)]
pub struct AssertionRegistry {
    entries: BTreeMap<String, SharedAssertion>,
}

impl AssertionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name to an assertion, replacing any previous binding.
    pub fn register<A: Assertion + 'static>(&mut self, name: impl Into<String>, assertion: A) -> &mut Self {
        self.register_shared(name, Arc::new(assertion))
    }

    /// Bind a name to an already shared assertion.
    pub fn register_shared(&mut self, name: impl Into<String>, assertion: SharedAssertion) -> &mut Self {
        self.entries.insert(name.into(), assertion);
        self
    }

    /// Bind a name to a closure.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&Acl, Option<&str>, Option<&str>, Option<&str>) -> bool + Send + Sync + 'static,
    {
        self.register_shared(name, acl_engine::assertion::from_fn(f))
    }

    /// Check if a name is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Look up an assertion by name.
    pub fn get(&self, name: &str) -> Option<SharedAssertion> {
        self.entries.get(name).cloned()
    }

    /// Look up an assertion, failing on an unknown name.
    pub fn resolve(&self, name: &str) -> PolicyResult<SharedAssertion> {
        self.get(name)
            .ok_or_else(|| PolicyError::UnknownAssertion(name.to_string()))
    }

    /// The name an assertion is registered under.
    ///
    /// Matches by identity: only the shared handle handed out by the registry
    /// (or passed to [`AssertionRegistry::register_shared`]) is recognized.
    pub fn name_of(&self, assertion: &SharedAssertion) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, registered)| Arc::ptr_eq(registered, assertion))
            .map(|(name, _)| name.as_str())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of registered assertions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no assertion is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for AssertionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertionRegistry")
            .field("names", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use acl_engine::assertion::Constant;

    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let mut registry = AssertionRegistry::new();
        registry
            .register("never", Constant(false))
            .register_fn("read_only", |_acl, _role, _resource, privilege| privilege == Some("read"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["never", "read_only"]);

        let acl = Acl::new();
        let read_only = registry.resolve("read_only").unwrap();
        assert!(read_only.pass(&acl, None, None, Some("read")));
        assert!(!registry.resolve("never").unwrap().pass(&acl, None, None, None));
    }

    #[test]
    fn test_unknown_name() {
        let registry = AssertionRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.resolve("office_hours"),
            Err(PolicyError::UnknownAssertion(name)) if name == "office_hours"
        ));
    }

    #[test]
    fn test_name_of_matches_identity() {
        let mut registry = AssertionRegistry::new();
        registry.register("never", Constant(false)).register("always", Constant(true));

        let always = registry.resolve("always").unwrap();
        assert_eq!(registry.name_of(&always), Some("always"));

        let lookalike: SharedAssertion = Arc::new(Constant(true));
        assert_eq!(registry.name_of(&lookalike), None);
    }

    #[test]
    fn test_rebinding_replaces() {
        let mut registry = AssertionRegistry::new();
        registry.register("gate", Constant(false));
        registry.register("gate", Constant(true));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("gate").unwrap().pass(&Acl::new(), None, None, None));
    }
}
