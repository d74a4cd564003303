//! # Resource Tree
//!
//! Resources form a tree through single-parent inheritance. As with roles,
//! a parent must already be registered when a child is added, which keeps
//! the structure acyclic. Removing a resource removes its whole subtree.

use std::collections::{BTreeSet, HashMap};

use crate::error::{ensure_id, AclError, AclResult};

/// A registered resource and its tree edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    id: String,
    parent: Option<String>,
    children: BTreeSet<String>,
}

impl ResourceNode {
    /// The resource id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The parent id, if any.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Ids of direct children.
    pub fn children(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(String::as_str)
    }
}

/// Id-keyed tree of resources.
#[derive(Debug, Clone, Default)]
pub struct ResourceTree {
    nodes: HashMap<String, ResourceNode>,
    order: Vec<String>,
}

impl ResourceTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource under an optional parent.
    pub fn add(&mut self, id: &str, parent: Option<&str>) -> AclResult<()> {
        ensure_id("resource", id)?;
        if self.has(id) {
            return Err(AclError::DuplicateResource(id.to_string()));
        }
        if let Some(parent) = parent {
            let node = self
                .nodes
                .get_mut(parent)
                .ok_or_else(|| AclError::ResourceNotFound(parent.to_string()))?;
            node.children.insert(id.to_string());
        }

        self.nodes.insert(
            id.to_string(),
            ResourceNode {
                id: id.to_string(),
                parent: parent.map(str::to_string),
                children: BTreeSet::new(),
            },
        );
        self.order.push(id.to_string());
        Ok(())
    }

    /// Check if a resource is registered.
    pub fn has(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Get a registered resource.
    pub fn get(&self, id: &str) -> AclResult<&ResourceNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| AclError::ResourceNotFound(id.to_string()))
    }

    /// Parent of a registered resource. Unknown ids have no parent.
    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).and_then(ResourceNode::parent)
    }

    /// Ancestors of a resource, nearest first.
    pub fn ancestors(&self, id: &str) -> AclResult<Vec<&str>> {
        let mut chain = Vec::new();
        let mut current = self.get(id)?.parent();
        while let Some(parent) = current {
            chain.push(parent);
            current = self.parent_of(parent);
        }
        Ok(chain)
    }

    /// Check whether `resource` inherits from `ancestor`.
    pub fn inherits_from(&self, resource: &str, ancestor: &str, direct_only: bool) -> AclResult<bool> {
        let node = self.get(resource)?;
        self.get(ancestor)?;

        let Some(parent) = node.parent() else {
            return Ok(false);
        };
        if parent == ancestor {
            return Ok(true);
        }
        if direct_only {
            return Ok(false);
        }
        Ok(self.ancestors(resource)?.iter().any(|a| *a == ancestor))
    }

    /// Remove a resource and all of its descendants.
    ///
    /// Returns every removed id, descendants first, so that callers can
    /// purge state keyed to them.
    pub fn remove(&mut self, id: &str) -> AclResult<Vec<String>> {
        let parent = self.get(id)?.parent.clone();
        if let Some(parent) = parent {
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.children.remove(id);
            }
        }

        let mut removed = Vec::new();
        self.remove_subtree(id, &mut removed);
        let gone: BTreeSet<&str> = removed.iter().map(String::as_str).collect();
        self.order.retain(|r| !gone.contains(r.as_str()));
        Ok(removed)
    }

    fn remove_subtree(&mut self, id: &str, removed: &mut Vec<String>) {
        let Some(node) = self.nodes.remove(id) else {
            return;
        };
        for child in &node.children {
            self.remove_subtree(child, removed);
        }
        removed.push(node.id);
    }

    /// Remove every resource, returning the removed ids.
    pub fn remove_all(&mut self) -> Vec<String> {
        self.nodes.clear();
        std::mem::take(&mut self.order)
    }

    /// Resource ids in registration order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if no resources are registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
