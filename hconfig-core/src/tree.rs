use std::collections::BTreeSet;

use serde::Serialize;

/// Emission weight used for lines without an ordering rule.
pub const DEFAULT_ORDER_WEIGHT: i32 = 500;

/// Index of a node inside a [`Tree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One semantic configuration statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigLine {
    /// Platform-normalized command text.
    pub text: String,
    /// Tags attached by tag rules.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    /// Whether the line explicitly un-configures something.
    pub negated: bool,
    /// Emission weight among siblings. Lower weights are emitted first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_weight: Option<i32>,
}

impl ConfigLine {
    /// Create a line with no tags and no ordering weight.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tags: BTreeSet::new(),
            negated: false,
            order_weight: None,
        }
    }

    /// Effective emission weight.
    pub fn weight(&self) -> i32 {
        self.order_weight.unwrap_or(DEFAULT_ORDER_WEIGHT)
    }

    /// True when any of `tags` is attached to this line.
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|tag| self.tags.contains(tag))
    }
}

/// Node payloads that carry a [`ConfigLine`].
pub trait LineValue {
    fn line(&self) -> &ConfigLine;
    fn line_mut(&mut self) -> &mut ConfigLine;
}

impl LineValue for ConfigLine {
    fn line(&self) -> &ConfigLine {
        self
    }

    fn line_mut(&mut self) -> &mut ConfigLine {
        self
    }
}

/// A node stored in a [`Tree`] arena.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node<T> {
    /// Node payload.
    pub value: T,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl<T> Node<T> {
    /// Parent node, absent for top-level nodes.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Ordered child ids.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// An owned subtree that has not been placed in an arena yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft<T> {
    pub value: T,
    pub children: Vec<Draft<T>>,
}

impl<T> Draft<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            children: Vec::new(),
        }
    }
}

/// Ordered arena tree with any number of top-level nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tree<T> {
    nodes: Vec<Node<T>>,
    roots: Vec<NodeId>,
    indent_width: usize,
}

/// Tree of parsed configuration lines.
pub type ConfigTree = Tree<ConfigLine>;

impl<T> Tree<T> {
    /// Create an empty tree rendered with `indent_width` spaces per level.
    pub fn new(indent_width: usize) -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            indent_width,
        }
    }

    /// Spaces per nesting level when the tree is written out.
    pub fn indent_width(&self) -> usize {
        self.indent_width
    }

    /// Append a top-level node.
    pub fn add_root(&mut self, value: T) -> NodeId {
        let id = self.push(value, None);
        self.roots.push(id);
        id
    }

    /// Append a child under `parent`.
    pub fn add_child(&mut self, parent: NodeId, value: T) -> NodeId {
        let id = self.push(value, Some(parent));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Place an owned subtree under `parent` (or at the top level).
    pub fn graft(&mut self, parent: Option<NodeId>, draft: Draft<T>) -> NodeId {
        let id = match parent {
            Some(parent) => self.add_child(parent, draft.value),
            None => self.add_root(draft.value),
        };
        for child in draft.children {
            self.graft(Some(id), child);
        }
        id
    }

    /// Build a tree from owned top-level subtrees.
    pub fn from_drafts(indent_width: usize, drafts: Vec<Draft<T>>) -> Self {
        let mut tree = Self::new(indent_width);
        for draft in drafts {
            tree.graft(None, draft);
        }
        tree
    }

    fn push(&mut self, value: T, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            value,
            parent,
            children: Vec::new(),
        });
        id
    }

    pub fn get(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id.0]
    }

    pub fn value(&self, id: NodeId) -> &T {
        &self.nodes[id.0].value
    }

    pub fn value_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.nodes[id.0].value
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Top-level node ids in order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Children of `parent`, or the top-level nodes when `parent` is `None`.
    pub fn siblings(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(parent) => self.children(parent),
            None => self.roots(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of ancestors above `id`.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    /// Depth-first pre-order traversal in sibling order.
    pub fn walk(&self) -> Walk<'_, T> {
        Walk {
            tree: self,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    /// Clone the subtree rooted at `id`, converting each payload.
    pub fn to_draft<U>(&self, id: NodeId, convert: &impl Fn(&T) -> U) -> Draft<U> {
        Draft {
            value: convert(self.value(id)),
            children: self
                .children(id)
                .iter()
                .map(|&child| self.to_draft(child, convert))
                .collect(),
        }
    }
}

impl<T: LineValue> Tree<T> {
    /// Line text of `id`.
    pub fn text(&self, id: NodeId) -> &str {
        &self.value(id).line().text
    }

    /// Texts from the top level down to `id`.
    pub fn path(&self, id: NodeId) -> Vec<&str> {
        let mut path = vec![self.text(id)];
        let mut current = self.parent(id);
        while let Some(parent) = current {
            path.push(self.text(parent));
            current = self.parent(parent);
        }
        path.reverse();
        path
    }

    /// Look up a node by its path of texts.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeId> {
        let mut parent = None;
        for segment in path {
            let id = self
                .siblings(parent)
                .iter()
                .copied()
                .find(|&id| self.text(id) == segment.as_ref())?;
            parent = Some(id);
        }
        parent
    }

    /// Compare sibling sets and texts recursively, ignoring sibling order.
    pub fn structurally_eq<U: LineValue>(&self, other: &Tree<U>) -> bool {
        signature(self, self.roots()) == signature(other, other.roots())
    }
}

/// Order-insensitive shape of a sibling list.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Shape<'a> {
    text: &'a str,
    children: Vec<Shape<'a>>,
}

fn signature<'a, T: LineValue>(tree: &'a Tree<T>, ids: &[NodeId]) -> Vec<Shape<'a>> {
    let mut out: Vec<Shape<'a>> = ids
        .iter()
        .map(|&id| Shape {
            text: tree.text(id),
            children: signature(tree, tree.children(id)),
        })
        .collect();
    out.sort();
    out
}

/// Iterator returned by [`Tree::walk`].
pub struct Walk<'a, T> {
    tree: &'a Tree<T>,
    stack: Vec<NodeId>,
}

impl<T> Iterator for Walk<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack.extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigLine, ConfigTree};

    fn sample() -> ConfigTree {
        let mut tree = ConfigTree::new(1);
        let iface = tree.add_root(ConfigLine::new("interface Gi0/1"));
        tree.add_child(iface, ConfigLine::new("description uplink"));
        tree.add_child(iface, ConfigLine::new("shutdown"));
        tree.add_root(ConfigLine::new("hostname r1"));
        tree
    }

    #[test]
    fn path_and_find_agree() {
        let tree = sample();
        let id = tree
            .find(&["interface Gi0/1", "shutdown"])
            .expect("node should exist");
        assert_eq!(tree.path(id), vec!["interface Gi0/1", "shutdown"]);
        assert_eq!(tree.depth(id), 1);
        assert!(tree.find(&["interface Gi0/2"]).is_none());
    }

    #[test]
    fn walk_is_preorder() {
        let tree = sample();
        let texts: Vec<&str> = tree.walk().map(|id| tree.text(id)).collect();
        assert_eq!(
            texts,
            vec![
                "interface Gi0/1",
                "description uplink",
                "shutdown",
                "hostname r1"
            ]
        );
    }

    #[test]
    fn structural_equality_ignores_sibling_order() {
        let left = sample();
        let mut right = ConfigTree::new(1);
        right.add_root(ConfigLine::new("hostname r1"));
        let iface = right.add_root(ConfigLine::new("interface Gi0/1"));
        right.add_child(iface, ConfigLine::new("shutdown"));
        right.add_child(iface, ConfigLine::new("description uplink"));

        assert!(left.structurally_eq(&right));

        right.add_child(iface, ConfigLine::new("mtu 9000"));
        assert!(!left.structurally_eq(&right));
    }

    #[test]
    fn structural_equality_does_not_confuse_text_with_nesting() {
        let mut flat = ConfigTree::new(1);
        flat.add_root(ConfigLine::new("a{b}"));

        let mut nested = ConfigTree::new(1);
        let a = nested.add_root(ConfigLine::new("a"));
        nested.add_child(a, ConfigLine::new("b"));

        assert!(!flat.structurally_eq(&nested));

        let mut joined = ConfigTree::new(1);
        let a = joined.add_root(ConfigLine::new("a"));
        joined.add_child(a, ConfigLine::new("b;c"));
        let mut split = ConfigTree::new(1);
        let a = split.add_root(ConfigLine::new("a"));
        split.add_child(a, ConfigLine::new("b"));
        split.add_child(a, ConfigLine::new("c"));
        assert!(!joined.structurally_eq(&split));
    }
}
