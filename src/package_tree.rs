use std::collections::BTreeMap;

use crate::level::LogLevel;

pub(crate) type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Debug)]
struct PackageNode {
    /// `None` only for the root.
    name: Option<String>,
    parent: Option<NodeId>,
    children: BTreeMap<String, NodeId>,
    /// `None` means "inherit from the nearest configured ancestor".
    level: Option<LogLevel>,
}

/// A mutable tree of dotted-name segments carrying optional log-level
/// overrides.
///
/// Nodes are stored in an arena and addressed by index; the parent index is
/// the back-reference from a node to its owner. The tree is created empty and
/// grows lazily: a chain of nodes comes into existence the first time a path
/// through it is configured or merged in. Nodes are only ever removed by
/// [`clear`](PackageTree::clear).
#[derive(Debug)]
pub struct PackageTree {
    nodes: Vec<PackageNode>,
}

impl Default for PackageTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![PackageNode {
                name: None,
                parent: None,
                children: BTreeMap::new(),
                level: None,
            }],
        }
    }

    /// Builds a standalone tree holding a single configured chain, suitable
    /// for [`merge`](PackageTree::merge)-ing into another tree.
    pub fn from_path<'a>(path: impl IntoIterator<Item = &'a str>, level: LogLevel) -> Self {
        let mut tree = Self::new();
        tree.set_level(path, level);
        tree
    }

    /// Ensures every segment of `path` exists as a chain from the root and
    /// sets `level` on the final node only. Intermediate nodes created along
    /// the way carry no explicit level. An already-configured final node is
    /// overwritten: direct configuration is an update, unlike `merge`.
    pub fn set_level<'a>(&mut self, path: impl IntoIterator<Item = &'a str>, level: LogLevel) {
        let mut node = ROOT;
        for segment in path {
            node = self.ensure_child(node, segment);
        }
        self.nodes[node].level = Some(level);
    }

    fn ensure_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        if let Some(&child) = self.nodes[parent].children.get(name) {
            return child;
        }
        let id = self.nodes.len();
        self.nodes.push(PackageNode {
            name: Some(name.to_string()),
            parent: Some(parent),
            children: BTreeMap::new(),
            level: None,
        });
        self.nodes[parent].children.insert(name.to_string(), id);
        id
    }

    /// Read-only descent from the root. Returns `None` as soon as a segment
    /// has no matching child; never creates nodes. Matching is segment-exact,
    /// a configured name that is merely a string prefix does not match.
    pub(crate) fn get<'a>(&self, path: impl IntoIterator<Item = &'a str>) -> Option<NodeId> {
        let mut node = ROOT;
        for segment in path {
            node = self.child(node, segment)?;
        }
        Some(node)
    }

    pub(crate) fn root(&self) -> NodeId {
        ROOT
    }

    pub(crate) fn child(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[node].children.get(name).copied()
    }

    pub(crate) fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node].parent
    }

    pub(crate) fn level(&self, node: NodeId) -> Option<LogLevel> {
        self.nodes[node].level
    }

    /// Merges `source` into this tree. For each top-level child of the source
    /// root: a same-named existing child is merged recursively, adopting the
    /// incoming level only where no level is set yet (an existing explicit
    /// level is never overwritten); a child with no counterpart is grafted
    /// whole, moving its subtree into this arena. Merging is idempotent and
    /// order-insensitive up to that tie-break.
    ///
    /// Merging trees whose roots are named differently is a usage-contract
    /// violation: a diagnostic is written to stderr and the call is a no-op.
    pub fn merge(&mut self, mut source: PackageTree) {
        if self.nodes[ROOT].name != source.nodes[ROOT].name {
            eprintln!("pkglog: attempted to merge unrelated package trees; ignoring");
            return;
        }
        if self.nodes[ROOT].level.is_none() {
            self.nodes[ROOT].level = source.nodes[ROOT].level;
        }
        let top_level: Vec<NodeId> = source.nodes[ROOT].children.values().copied().collect();
        for child in top_level {
            self.attach(ROOT, &mut source, child);
        }
    }

    fn attach(&mut self, anchor: NodeId, source: &mut PackageTree, src_id: NodeId) {
        let name = match &source.nodes[src_id].name {
            Some(name) => name.clone(),
            // Non-root nodes always carry a name; an unnamed one is orphaned.
            None => return,
        };
        match self.child(anchor, &name) {
            Some(existing) => {
                if self.nodes[existing].level.is_none() {
                    self.nodes[existing].level = source.nodes[src_id].level;
                }
                let children: Vec<NodeId> =
                    source.nodes[src_id].children.values().copied().collect();
                for child in children {
                    self.attach(existing, source, child);
                }
            }
            None => {
                self.graft(anchor, source, src_id);
            }
        }
    }

    /// Moves the subtree rooted at `src_id` under `parent`, re-homing its
    /// nodes into this arena.
    fn graft(&mut self, parent: NodeId, source: &mut PackageTree, src_id: NodeId) -> NodeId {
        let name = source.nodes[src_id].name.take();
        let level = source.nodes[src_id].level;
        let children = std::mem::take(&mut source.nodes[src_id].children);

        let id = self.nodes.len();
        self.nodes.push(PackageNode {
            name: name.clone(),
            parent: Some(parent),
            children: BTreeMap::new(),
            level,
        });
        if let Some(name) = name {
            self.nodes[parent].children.insert(name, id);
        }
        for (_, child) in children {
            self.graft(id, source, child);
        }
        id
    }

    /// Resets to the empty state: all children and any root-level override
    /// are dropped. Node ids handed out before the call are orphaned and must
    /// not be used again.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[ROOT].children.clear();
        self.nodes[ROOT].level = None;
    }
}
