//! # Assertions
//!
//! An assertion is a caller-supplied predicate attached to a rule. A rule
//! carrying an assertion only applies when the assertion passes; it is
//! consulted afresh on every resolution and its result is never cached.

use std::fmt;
use std::sync::Arc;

use crate::acl::Acl;

/// Dynamic condition gating a rule.
///
/// `role`, `resource` and `privilege` describe the query being answered:
/// the originally queried role and resource when one was given, otherwise
/// the scope currently being inspected. `None` means "all".
///
/// # Example
///
/// ```
/// use acl_engine::{Acl, Assertion};
///
/// struct ReadOnly;
///
/// impl Assertion for ReadOnly {
///     fn pass(&self, _acl: &Acl, _role: Option<&str>, _resource: Option<&str>, privilege: Option<&str>) -> bool {
///         privilege == Some("read")
///     }
/// }
/// ```
pub trait Assertion: Send + Sync {
    /// Return `true` if the rule should apply.
    fn pass(&self, acl: &Acl, role: Option<&str>, resource: Option<&str>, privilege: Option<&str>) -> bool;
}

impl<F> Assertion for F
where
    F: Fn(&Acl, Option<&str>, Option<&str>, Option<&str>) -> bool + Send + Sync,
{
    fn pass(&self, acl: &Acl, role: Option<&str>, resource: Option<&str>, privilege: Option<&str>) -> bool {
        self(acl, role, resource, privilege)
    }
}

/// Shared handle to an assertion, as stored in the rule table.
pub type SharedAssertion = Arc<dyn Assertion>;

/// Wrap a closure as a shared assertion.
///
/// # Example
///
/// ```
/// use acl_engine::assertion;
///
/// let weekdays_only = assertion::from_fn(|_acl, _role, _resource, _privilege| true);
/// # let _ = weekdays_only;
/// ```
pub fn from_fn<F>(f: F) -> SharedAssertion
where
    F: Fn(&Acl, Option<&str>, Option<&str>, Option<&str>) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Assertion with a fixed outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constant(pub bool);

impl Assertion for Constant {
    fn pass(&self, _acl: &Acl, _role: Option<&str>, _resource: Option<&str>, _privilege: Option<&str>) -> bool {
        self.0
    }
}

pub(crate) struct Opaque<'a>(pub &'a Option<SharedAssertion>);

impl fmt::Debug for Opaque<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("Some(<assertion>)"),
            None => f.write_str("None"),
        }
    }
}
