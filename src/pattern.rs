//! Tree pattern representation
//!
//! A compiled [`TregexPattern`] is a tree of [`NodePattern`]s. Each node
//! pattern tests a node's label (or refers back to a node bound earlier) and
//! carries a [`RelationExpr`] over relations to further node patterns.

use crate::head_finder::{HeadFinder, default_head_finder};
use crate::label::LabelTest;
use crate::query::{PatternError, parse_pattern};
use crate::relation::Relation;
use std::fmt;
use std::sync::Arc;

/// Index into [`TregexPattern::names`]
pub type NameId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeLabel {
    Test(LabelTest),
    /// `=name`: the node bound to `name` earlier in the match
    BackRef(NameId),
}

#[derive(Debug, Clone)]
pub struct NodePattern {
    pub label: NodeLabel,
    /// `=name` binding
    pub name: Option<NameId>,
    pub relations: Option<RelationExpr>,
}

impl NodePattern {
    pub fn new(label: NodeLabel) -> Self {
        Self {
            label,
            name: None,
            relations: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RelationExpr {
    /// `op target`
    Rel {
        relation: Relation,
        target: Box<NodePattern>,
    },
    And(Vec<RelationExpr>),
    Or(Vec<RelationExpr>),
    /// `!`: holds when the inner expression has no match; binds nothing
    Not(Box<RelationExpr>),
    /// `?`: the inner expression's matches, or the unchanged bindings if there are none
    Optional(Box<RelationExpr>),
}

impl RelationExpr {
    /// Collapse a single-element conjunction or disjunction
    pub fn and(mut items: Vec<RelationExpr>) -> Self {
        if items.len() == 1 {
            items.remove(0)
        } else {
            RelationExpr::And(items)
        }
    }

    pub fn or(mut items: Vec<RelationExpr>) -> Self {
        if items.len() == 1 {
            items.remove(0)
        } else {
            RelationExpr::Or(items)
        }
    }
}

/// A compiled tree pattern
#[derive(Debug, Clone)]
pub struct TregexPattern {
    source: String,
    root: NodePattern,
    names: Vec<String>,
}

impl TregexPattern {
    pub(crate) fn new(source: &str, root: NodePattern, names: Vec<String>) -> Self {
        Self {
            source: source.to_string(),
            root,
            names,
        }
    }

    /// Compile with the bundled Collins head rules
    pub fn compile(source: &str) -> Result<Self, PatternError> {
        Self::with_head_finder(source, default_head_finder())
    }

    /// Compile with a caller-supplied head finder for the head relations
    pub fn with_head_finder(
        source: &str,
        head_finder: Arc<dyn HeadFinder>,
    ) -> Result<Self, PatternError> {
        parse_pattern(source, head_finder)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &NodePattern {
        &self.root
    }

    /// Binding names in order of first appearance
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl fmt::Display for TregexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
