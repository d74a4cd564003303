//! # Role Graph
//!
//! Roles form a directed acyclic graph through ordered multi-parent
//! inheritance. Nodes live in an id-keyed table and refer to each other by
//! id only. A role may only name parents that are already registered, so
//! a cycle can never be constructed.
//!
//! Parent order encodes priority: the first parent has the lowest priority
//! and the most recently listed parent the highest.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{ensure_id, AclError, AclResult};

/// A registered role and its inheritance edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleNode {
    id: String,
    /// Parent ids in ascending priority.
    parents: Vec<String>,
    children: BTreeSet<String>,
}

impl RoleNode {
    /// The role id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parent ids, lowest priority first.
    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    /// Ids of roles that directly inherit from this one.
    pub fn children(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(String::as_str)
    }
}

/// Id-keyed DAG of roles.
#[derive(Debug, Clone, Default)]
pub struct RoleGraph {
    nodes: HashMap<String, RoleNode>,
    /// Registration order, kept explicitly for listing.
    order: Vec<String>,
}

impl RoleGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a role with the given parents.
    ///
    /// Fails with `DuplicateRole` if the id is taken and `RoleNotFound` if
    /// any parent is unknown. On failure the graph is left untouched.
    /// Repeated parent ids collapse to their first occurrence.
    pub fn add<S: AsRef<str>>(&mut self, id: &str, parents: &[S]) -> AclResult<()> {
        ensure_id("role", id)?;
        if self.has(id) {
            return Err(AclError::DuplicateRole(id.to_string()));
        }

        let mut ordered: Vec<String> = Vec::with_capacity(parents.len());
        for parent in parents {
            let parent = parent.as_ref();
            if !self.has(parent) {
                return Err(AclError::RoleNotFound(parent.to_string()));
            }
            if !ordered.iter().any(|p| p == parent) {
                ordered.push(parent.to_string());
            }
        }

        for parent in &ordered {
            if let Some(node) = self.nodes.get_mut(parent) {
                node.children.insert(id.to_string());
            }
        }

        self.nodes.insert(
            id.to_string(),
            RoleNode {
                id: id.to_string(),
                parents: ordered,
                children: BTreeSet::new(),
            },
        );
        self.order.push(id.to_string());
        Ok(())
    }

    /// Check if a role is registered.
    pub fn has(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Get a registered role.
    pub fn get(&self, id: &str) -> AclResult<&RoleNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| AclError::RoleNotFound(id.to_string()))
    }

    /// Parent ids of a role, lowest priority first.
    pub fn parents_of(&self, id: &str) -> AclResult<&[String]> {
        self.get(id).map(RoleNode::parents)
    }

    /// Check whether `role` inherits from `ancestor`.
    ///
    /// With `direct_only` only immediate parents count; otherwise the whole
    /// ancestry is searched.
    pub fn inherits_from(&self, role: &str, ancestor: &str, direct_only: bool) -> AclResult<bool> {
        let node = self.get(role)?;
        self.get(ancestor)?;

        if node.parents.iter().any(|p| p == ancestor) {
            return Ok(true);
        }
        if direct_only {
            return Ok(false);
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut pending: Vec<&str> = node.parents.iter().map(String::as_str).collect();
        while let Some(current) = pending.pop() {
            if !seen.insert(current) {
                continue;
            }
            if current == ancestor {
                return Ok(true);
            }
            if let Some(parent) = self.nodes.get(current) {
                pending.extend(parent.parents.iter().map(String::as_str));
            }
        }
        Ok(false)
    }

    /// Remove a role, detaching it from its parents and children.
    pub fn remove(&mut self, id: &str) -> AclResult<RoleNode> {
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| AclError::RoleNotFound(id.to_string()))?;

        for child in &node.children {
            if let Some(child) = self.nodes.get_mut(child) {
                child.parents.retain(|p| p != id);
            }
        }
        for parent in &node.parents {
            if let Some(parent) = self.nodes.get_mut(parent) {
                parent.children.remove(id);
            }
        }
        self.order.retain(|r| r != id);
        Ok(node)
    }

    /// Remove every role.
    pub fn remove_all(&mut self) {
        self.nodes.clear();
        self.order.clear();
    }

    /// Role ids in registration order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Number of registered roles.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if no roles are registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family() -> RoleGraph {
        let mut graph = RoleGraph::new();
        graph.add::<&str>("grandparent", &[]).unwrap();
        graph.add("parent", &["grandparent"]).unwrap();
        graph.add("child", &["parent"]).unwrap();
        graph
    }

    #[test]
    fn test_add_and_get() {
        let mut graph = RoleGraph::new();
        graph.add::<&str>("guest", &[]).unwrap();
        assert!(graph.has("guest"));
        assert_eq!(graph.get("guest").unwrap().id(), "guest");
        assert!(matches!(graph.get("admin"), Err(AclError::RoleNotFound(_))));
    }

    #[test]
    fn test_duplicate_role() {
        let mut graph = RoleGraph::new();
        graph.add::<&str>("guest", &[]).unwrap();
        assert_eq!(
            graph.add::<&str>("guest", &[]),
            Err(AclError::DuplicateRole("guest".into()))
        );
    }

    #[test]
    fn test_unknown_parent_leaves_graph_untouched() {
        let mut graph = RoleGraph::new();
        graph.add::<&str>("guest", &[]).unwrap();
        let err = graph.add("editor", &["guest", "missing"]).unwrap_err();
        assert_eq!(err, AclError::RoleNotFound("missing".into()));
        assert!(!graph.has("editor"));
        assert_eq!(graph.get("guest").unwrap().children().count(), 0);
        assert_eq!(graph.ids(), ["guest"]);
    }

    #[test]
    fn test_parent_order_is_priority_order() {
        let mut graph = RoleGraph::new();
        graph.add::<&str>("guest", &[]).unwrap();
        graph.add::<&str>("member", &[]).unwrap();
        graph.add::<&str>("admin", &[]).unwrap();
        graph.add("someone", &["guest", "member", "admin", "guest"]).unwrap();
        assert_eq!(graph.parents_of("someone").unwrap(), ["guest", "member", "admin"]);
    }

    #[test]
    fn test_inherits_from() {
        let graph = family();
        assert!(graph.inherits_from("child", "parent", true).unwrap());
        assert!(!graph.inherits_from("child", "grandparent", true).unwrap());
        assert!(graph.inherits_from("child", "grandparent", false).unwrap());
        assert!(!graph.inherits_from("grandparent", "child", false).unwrap());
        assert!(matches!(
            graph.inherits_from("child", "missing", false),
            Err(AclError::RoleNotFound(_))
        ));
    }

    #[test]
    fn test_remove_unlinks_edges() {
        let mut graph = family();
        graph.remove("parent").unwrap();
        assert!(!graph.has("parent"));
        assert!(graph.parents_of("child").unwrap().is_empty());
        assert_eq!(graph.get("grandparent").unwrap().children().count(), 0);
        assert!(!graph.inherits_from("child", "grandparent", false).unwrap());
        assert_eq!(graph.ids(), ["grandparent", "child"]);
    }

    #[test]
    fn test_remove_missing() {
        let mut graph = RoleGraph::new();
        assert!(matches!(graph.remove("ghost"), Err(AclError::RoleNotFound(_))));
    }

    #[test]
    fn test_remove_all() {
        let mut graph = family();
        graph.remove_all();
        assert!(graph.is_empty());
        assert!(!graph.has("child"));
    }
}
