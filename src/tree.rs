//! Constituency tree data structures
//!
//! A [`Tree`] is an arena of [`Node`]s addressed by [`NodeId`]. Parent links are
//! plain indices, so the tree owns every node exactly once and relation searches
//! can share it freely. One `Tree` holds one sentence; a parse of several
//! sentences is a forest (`Vec<Tree>`), see [`crate::bracket`].

use std::cell::OnceCell;
use std::fmt;

/// Index of a node inside its tree's arena
pub type NodeId = usize;

/// A node in a constituency tree
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub label: Option<String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    fn new(id: NodeId, label: Option<&str>, parent: Option<NodeId>) -> Self {
        Self {
            id,
            label: label.map(str::to_string),
            parent,
            children: Vec::new(),
        }
    }
}

/// Leaf span of a node: `left` leaves precede it, it covers `left..right`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    left: usize,
    right: usize,
}

/// A constituency tree (sentence)
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
    spans: OnceCell<Vec<Span>>,
}

impl Tree {
    /// Create a tree consisting of a single root node
    pub fn new(label: Option<&str>) -> Self {
        Self {
            nodes: vec![Node::new(0, label, None)],
            root: 0,
            spans: OnceCell::new(),
        }
    }

    /// Append a child to `parent`, returning the new node's id
    pub fn add_child(&mut self, parent: NodeId, label: Option<&str>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(id, label, Some(parent)));
        self.nodes[parent].children.push(id);
        self.spans.take();
        id
    }

    /// Replace a node's label
    pub fn set_label(&mut self, id: NodeId, label: Option<&str>) {
        self.nodes[id].label = label.map(str::to_string);
    }

    /// Copy the subtree rooted at `id` into a fresh tree
    pub fn subtree(&self, id: NodeId) -> Tree {
        let mut tree = Tree::new(self.label(id));
        let mut stack = vec![(id, tree.root)];
        while let Some((old, new)) = stack.pop() {
            let mut pending = Vec::with_capacity(self.num_children(old));
            for &child in self.children(old) {
                let copy = tree.add_child(new, self.label(child));
                pending.push((child, copy));
            }
            // reversed so the leftmost child is expanded first and ids stay in pre-order
            stack.extend(pending.into_iter().rev());
        }
        tree
    }

    /// Remove unlabeled single-child wrapper levels above the real root
    pub fn strip_empty_root(self) -> Tree {
        let mut top = self.root;
        while self.nodes[top].label.is_none() && self.nodes[top].children.len() == 1 {
            top = self.nodes[top].children[0];
        }
        if top == self.root { self } else { self.subtree(top) }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes, leaves included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.nodes[id].label.as_deref()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn num_children(&self, id: NodeId) -> usize {
        self.nodes[id].children.len()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].children.last().copied()
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id].children.is_empty()
    }

    /// Exactly one child, and that child is a leaf
    pub fn is_preterminal(&self, id: NodeId) -> bool {
        matches!(self.children(id), [only] if self.is_leaf(*only))
    }

    /// Every child is a preterminal
    pub fn is_prepreterminal(&self, id: NodeId) -> bool {
        !self.is_leaf(id) && self.children(id).iter().all(|&c| self.is_preterminal(c))
    }

    pub fn is_phrasal(&self, id: NodeId) -> bool {
        !self.is_leaf(id) && !self.is_preterminal(id)
    }

    /// Every phrasal node below (and including) `id` has exactly two children
    pub fn is_binary(&self, id: NodeId) -> bool {
        self.preorder(id)
            .all(|n| self.is_leaf(n) || self.is_preterminal(n) || self.num_children(n) == 2)
    }

    pub fn is_unary_rewrite(&self, id: NodeId) -> bool {
        self.num_children(id) == 1
    }

    /// Walk parent links up to the root
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Proper ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |&n| self.parent(n))
    }

    /// Position of `id` among its parent's children; `None` for the root
    pub fn sister_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Sisters to the left of `id`, `None` for the root or a leftmost child
    pub fn left_sisters(&self, id: NodeId) -> Option<&[NodeId]> {
        let parent = self.parent(id)?;
        let index = self.sister_index(id)?;
        (index > 0).then(|| &self.children(parent)[..index])
    }

    /// Sisters to the right of `id`, `None` for the root or a rightmost child
    pub fn right_sisters(&self, id: NodeId) -> Option<&[NodeId]> {
        let parent = self.parent(id)?;
        let index = self.sister_index(id)?;
        let kids = self.children(parent);
        (index + 1 < kids.len()).then(|| &kids[index + 1..])
    }

    /// Number of leaves preceding `id` in the whole tree
    pub fn left_edge(&self, id: NodeId) -> usize {
        self.spans()[id].left
    }

    /// `left_edge` plus the number of leaves `id` dominates (exclusive end)
    pub fn right_edge(&self, id: NodeId) -> usize {
        self.spans()[id].right
    }

    fn spans(&self) -> &[Span] {
        self.spans.get_or_init(|| {
            let mut spans = vec![Span { left: 0, right: 0 }; self.nodes.len()];
            let mut count = 0;
            let mut stack = vec![(self.root, false)];
            while let Some((id, closing)) = stack.pop() {
                if closing {
                    spans[id].right = count;
                    continue;
                }
                spans[id].left = count;
                if self.is_leaf(id) {
                    count += 1;
                    spans[id].right = count;
                } else {
                    stack.push((id, true));
                    stack.extend(self.children(id).iter().rev().map(|&c| (c, false)));
                }
            }
            spans
        })
    }

    /// Leaves under `id` in surface order
    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        self.preorder(id).filter(|&n| self.is_leaf(n)).collect()
    }

    /// Space-joined leaf labels under `id`
    pub fn span_string(&self, id: NodeId) -> String {
        self.leaves(id)
            .into_iter()
            .filter_map(|leaf| self.label(leaf))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Depth-first, parent before children, siblings left to right
    pub fn preorder(&self, id: NodeId) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![id],
        }
    }

    /// Structural equality of the subtree at `a` with the subtree at `b` in `other`
    pub fn subtree_eq(&self, a: NodeId, other: &Tree, b: NodeId) -> bool {
        let mut stack = vec![(a, b)];
        while let Some((x, y)) = stack.pop() {
            if self.label(x) != other.label(y) || self.num_children(x) != other.num_children(y) {
                return false;
            }
            stack.extend(
                self.children(x)
                    .iter()
                    .copied()
                    .zip(other.children(y).iter().copied()),
            );
        }
        true
    }

    fn fmt_subtree(&self, id: NodeId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        enum Step {
            Open(NodeId),
            Close,
        }
        if self.is_leaf(id) && id == self.root {
            return write!(f, "({})", self.label(id).map(escape_leaf).unwrap_or_default());
        }
        let mut stack = vec![Step::Open(id)];
        let mut first = true;
        while let Some(step) = stack.pop() {
            match step {
                Step::Close => f.write_str(")")?,
                Step::Open(n) => {
                    if !first {
                        f.write_str(" ")?;
                    }
                    first = false;
                    if self.is_leaf(n) {
                        match self.label(n) {
                            Some(label) => f.write_str(&escape_leaf(label))?,
                            None => f.write_str("()")?,
                        }
                        continue;
                    }
                    f.write_str("(")?;
                    if let Some(label) = self.label(n) {
                        f.write_str(label)?;
                    } else {
                        // the next child must not be glued to the paren as a label
                        first = true;
                    }
                    stack.push(Step::Close);
                    stack.extend(self.children(n).iter().rev().map(|&c| Step::Open(c)));
                }
            }
        }
        Ok(())
    }
}

fn escape_leaf(label: &str) -> String {
    match label {
        "(" => "-LRB-".to_string(),
        ")" => "-RRB-".to_string(),
        _ => label.to_string(),
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.subtree_eq(self.root, other, other.root)
    }
}

impl Eq for Tree {}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_subtree(self.root, f)
    }
}

/// Pre-order iterator over a subtree, driven by an explicit stack
pub struct Preorder<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Preorder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}
