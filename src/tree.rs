//! Arena-backed path tree
//!
//! Every indexed filesystem entry gets one node holding its basename, a
//! parent link and a map of named children. Nodes are addressed by
//! integer handles (`NodeId`) into a slot arena, so other structures can
//! reference them without owning them. A node's absolute path is
//! reconstructed on demand by walking parent links, which keeps memory
//! proportional to the number of basenames rather than full paths.

use std::collections::HashMap;

use thiserror::Error;

/// Errors returned by path tree lookups and mutations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    /// The path is not absolute or contains an empty component
    #[error("invalid path: {0:?}")]
    InvalidPath(String),
    /// No node exists for the path
    #[error("path not found: {0}")]
    NotFound(String),
}

/// Handle to a node in the arena
///
/// Handles stay valid until the node is deleted. The index never holds a
/// handle past the node's deletion: trie entries are removed before the
/// tree node they point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

struct PathNode {
    name: String,
    parent: Option<NodeId>,
    children: HashMap<String, NodeId>,
}

/// Hierarchical representation of every indexed path
///
/// There is exactly one root (`/`). Basenames are unique within a
/// parent's child set, and deleting a directory node cascades to all
/// descendants.
pub struct PathTree {
    slots: Vec<Option<PathNode>>,
    free: Vec<u32>,
}

const ROOT: NodeId = NodeId(0);

impl PathTree {
    pub fn new() -> Self {
        let root = PathNode {
            name: "/".to_string(),
            parent: None,
            children: HashMap::new(),
        };
        Self {
            slots: vec![Some(root)],
            free: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    /// Number of live nodes, including the root
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    fn node(&self, id: NodeId) -> Option<&PathNode> {
        self.slots.get(id.0 as usize).and_then(|s| s.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut PathNode> {
        self.slots.get_mut(id.0 as usize).and_then(|s| s.as_mut())
    }

    fn alloc(&mut self, node: PathNode) -> NodeId {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(node);
                NodeId(slot)
            }
            None => {
                self.slots.push(Some(node));
                NodeId((self.slots.len() - 1) as u32)
            }
        }
    }

    /// Split an absolute path into components
    ///
    /// Rejects relative paths and paths with empty components other than
    /// the leading separator. The root path `/` yields no components.
    pub(crate) fn components(path: &str) -> Result<Vec<&str>, TreeError> {
        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| TreeError::InvalidPath(path.to_string()))?;
        if rest.is_empty() {
            return Ok(Vec::new());
        }
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(TreeError::InvalidPath(path.to_string()));
        }
        Ok(parts)
    }

    /// Look up the child of `parent` with the given basename
    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.node(parent)?.children.get(name).copied()
    }

    /// Insert a child under `parent`, or return the existing one
    pub fn add_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        if let Some(existing) = self.child(parent, name) {
            return existing;
        }
        let id = self.alloc(PathNode {
            name: name.to_string(),
            parent: Some(parent),
            children: HashMap::new(),
        });
        self.node_mut(parent)
            .expect("parent node is live")
            .children
            .insert(name.to_string(), id);
        id
    }

    /// Ensure a node exists for every component of `path`; return the leaf
    ///
    /// Idempotent: repeated calls with the same path return the same node.
    pub fn add(&mut self, path: &str) -> Result<NodeId, TreeError> {
        let mut current = ROOT;
        for comp in Self::components(path)? {
            current = self.add_child(current, comp);
        }
        Ok(current)
    }

    /// Find the node for an absolute path, if indexed
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        let comps = Self::components(path).ok()?;
        let mut current = ROOT;
        for comp in comps {
            current = self.child(current, comp)?;
        }
        Some(current)
    }

    /// Basenames of the direct children of `path`
    pub fn children_of(&self, path: &str) -> Result<Vec<&str>, TreeError> {
        let id = self
            .lookup(path)
            .ok_or_else(|| TreeError::NotFound(path.to_string()))?;
        Ok(self
            .node(id)
            .expect("looked-up node is live")
            .children
            .keys()
            .map(String::as_str)
            .collect())
    }

    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.name.as_str())
    }

    /// Reconstruct the absolute path of a node by walking parent links
    pub fn path_of(&self, id: NodeId) -> String {
        let mut names: Vec<&str> = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = match self.node(cur) {
                Some(n) => n,
                None => break,
            };
            if node.parent.is_some() {
                names.push(&node.name);
            }
            current = node.parent;
        }
        if names.is_empty() {
            return "/".to_string();
        }
        let mut path = String::new();
        for name in names.iter().rev() {
            path.push('/');
            path.push_str(name);
        }
        path
    }

    /// All nodes of the subtree rooted at `id`, children before parents
    ///
    /// The returned order is safe for teardown: every node appears after
    /// its descendants.
    pub fn subtree_post_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_post_order(id, &mut out);
        out
    }

    fn collect_post_order(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if let Some(node) = self.node(id) {
            for &child in node.children.values() {
                self.collect_post_order(child, out);
            }
            out.push(id);
        }
    }

    /// Remove the node at `path` and every descendant
    ///
    /// Unlinks from the parent's child map and recycles the slots. No-op
    /// if the path is absent. The root itself cannot be deleted; deleting
    /// `/` clears its children instead.
    pub fn delete_at(&mut self, path: &str) {
        let id = match self.lookup(path) {
            Some(id) => id,
            None => return,
        };
        if id == ROOT {
            let children: Vec<NodeId> = self
                .node(ROOT)
                .map(|n| n.children.values().copied().collect())
                .unwrap_or_default();
            for child in children {
                self.delete_subtree(child);
            }
            if let Some(root) = self.node_mut(ROOT) {
                root.children.clear();
            }
            return;
        }
        let (parent, name) = {
            let node = self.node(id).expect("looked-up node is live");
            (node.parent, node.name.clone())
        };
        if let Some(parent) = parent {
            if let Some(parent_node) = self.node_mut(parent) {
                parent_node.children.remove(&name);
            }
        }
        self.delete_subtree(id);
    }

    fn delete_subtree(&mut self, id: NodeId) {
        for node in self.subtree_post_order(id) {
            self.slots[node.0 as usize] = None;
            self.free.push(node.0);
        }
    }
}

impl Default for PathTree {
    fn default() -> Self {
        Self::new()
    }
}
