//! Pattern matching over trees
//!
//! A [`Matcher`] tries the pattern's root description at every node of a tree
//! in pre-order and, for each candidate, enumerates every assignment of the
//! pattern's named nodes that satisfies all relations:
//! 1. Test the candidate's label (or identity, for a back-reference)
//! 2. Bind its name, if any
//! 3. Expand the relation expression: each relation searches from the
//!    candidate and recursively matches its target description
//!
//! Everything is lazy, so asking only for the first match does only the work
//! needed to find it.

use crate::pattern::{NodeLabel, NodePattern, RelationExpr, TregexPattern};
use crate::tree::{NodeId, Tree};
use rustc_hash::FxHashMap;
use std::iter;

/// Node bound to each name, indexed by [`crate::pattern::NameId`]
type Bindings = Vec<Option<NodeId>>;

type Assignments<'a> = Box<dyn Iterator<Item = Bindings> + 'a>;

/// One way a pattern matches: the node matched by the root description plus
/// the nodes bound to named descriptions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub node: NodeId,
    pub bindings: FxHashMap<String, NodeId>,
}

/// Matches one pattern against one tree
#[derive(Clone, Copy)]
pub struct Matcher<'a> {
    pattern: &'a TregexPattern,
    tree: &'a Tree,
}

impl<'a> Matcher<'a> {
    pub fn new(pattern: &'a TregexPattern, tree: &'a Tree) -> Self {
        Self { pattern, tree }
    }

    /// Does the pattern match with its root description at `node`?
    pub fn matches_at(&self, node: NodeId) -> bool {
        self.assignments_at(node).next().is_some()
    }

    fn assignments_at(&self, node: NodeId) -> Assignments<'a> {
        let empty = vec![None; self.pattern.names().len()];
        match_node(self.pattern.root(), self.tree, node, empty)
    }

    /// Every match, candidate roots in pre-order
    pub fn matches(self) -> impl Iterator<Item = Match> + 'a {
        let pattern = self.pattern;
        self.tree.preorder(self.tree.root()).flat_map(move |node| {
            self.assignments_at(node).map(move |bindings| Match {
                node,
                bindings: pattern
                    .names()
                    .iter()
                    .zip(bindings)
                    .filter_map(|(name, bound)| bound.map(|id| (name.clone(), id)))
                    .collect(),
            })
        })
    }

    /// Matched root nodes; a node equal to the one just yielded is skipped
    pub fn find_nodes(self) -> impl Iterator<Item = NodeId> + 'a {
        skip_repeats(self.matches().map(|m| m.node))
    }
}

/// Drop items identical to their immediate predecessor, keeping later repeats
pub fn skip_repeats<I>(iter: I) -> impl Iterator<Item = NodeId>
where
    I: Iterator<Item = NodeId>,
{
    let mut previous = None;
    iter.filter(move |&node| previous.replace(node) != Some(node))
}

/// Search a tree with a compiled pattern
pub fn search<'a>(tree: &'a Tree, pattern: &'a TregexPattern) -> impl Iterator<Item = Match> + 'a {
    Matcher::new(pattern, tree).matches()
}

impl TregexPattern {
    pub fn matcher<'a>(&'a self, tree: &'a Tree) -> Matcher<'a> {
        Matcher::new(self, tree)
    }

    /// Span strings of the matched nodes across a forest
    pub fn find_spans(&self, forest: &[Tree]) -> Vec<String> {
        forest
            .iter()
            .flat_map(|tree| {
                self.matcher(tree)
                    .find_nodes()
                    .map(move |node| tree.span_string(node))
            })
            .collect()
    }

    /// Number of matched nodes across a forest
    pub fn count_forest(&self, forest: &[Tree]) -> usize {
        forest
            .iter()
            .map(|tree| self.matcher(tree).find_nodes().count())
            .sum()
    }
}

fn match_node<'a>(
    pattern: &'a NodePattern,
    tree: &'a Tree,
    node: NodeId,
    mut bindings: Bindings,
) -> Assignments<'a> {
    let label_ok = match &pattern.label {
        NodeLabel::Test(test) => test.matches(tree.label(node)),
        NodeLabel::BackRef(name) => bindings[*name] == Some(node),
    };
    if !label_ok {
        return Box::new(iter::empty());
    }

    if let Some(name) = pattern.name {
        match bindings[name] {
            Some(bound) if bound != node => return Box::new(iter::empty()),
            _ => bindings[name] = Some(node),
        }
    }

    match &pattern.relations {
        None => Box::new(iter::once(bindings)),
        Some(expr) => match_expr(expr, tree, node, bindings),
    }
}

fn match_expr<'a>(
    expr: &'a RelationExpr,
    tree: &'a Tree,
    node: NodeId,
    bindings: Bindings,
) -> Assignments<'a> {
    match expr {
        RelationExpr::Rel { relation, target } => match relation.search(tree, node) {
            Ok(candidates) => Box::new(
                candidates.flat_map(move |t| match_node(target, tree, t, bindings.clone())),
            ),
            // relations are checked when the pattern is compiled
            Err(_) => Box::new(iter::empty()),
        },
        RelationExpr::And(items) => match_all(items, tree, node, bindings),
        RelationExpr::Or(alternatives) => Box::new(
            alternatives
                .iter()
                .flat_map(move |alt| match_expr(alt, tree, node, bindings.clone())),
        ),
        RelationExpr::Not(inner) => {
            if match_expr(inner, tree, node, bindings.clone()).next().is_none() {
                Box::new(iter::once(bindings))
            } else {
                Box::new(iter::empty())
            }
        }
        RelationExpr::Optional(inner) => {
            let mut found = match_expr(inner, tree, node, bindings.clone()).peekable();
            if found.peek().is_some() {
                Box::new(found)
            } else {
                Box::new(iter::once(bindings))
            }
        }
    }
}

fn match_all<'a>(
    items: &'a [RelationExpr],
    tree: &'a Tree,
    node: NodeId,
    bindings: Bindings,
) -> Assignments<'a> {
    match items.split_first() {
        None => Box::new(iter::once(bindings)),
        Some((first, rest)) => Box::new(
            match_expr(first, tree, node, bindings)
                .flat_map(move |b| match_all(rest, tree, node, b)),
        ),
    }
}
