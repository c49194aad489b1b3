//! Structural relations between tree nodes
//!
//! Every [`Relation`] answers two questions about a tree: does the relation
//! hold from node `a` to node `b` ([`Relation::satisfies`]), and which nodes
//! stand in the relation to a pivot ([`Relation::search`]). `search` yields
//! exactly the nodes `n` for which `satisfies(pivot, n)` holds, lazily and in a
//! fixed order.

use crate::head_finder::HeadFinder;
use crate::label::LabelTest;
use crate::tree::{NodeId, Tree};
use rustc_hash::FxHashSet;
use std::iter;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelationError {
    /// Child and leaf positions are 1-based; `-1` is the last one
    #[error("Relation error: invalid index {0}, positions start at 1 (or -1 from the end)")]
    InvalidIndex(i32),
}

/// Lazily enumerated relation targets
pub type Targets<'a> = Box<dyn Iterator<Item = NodeId> + 'a>;

/// A structural relation, `A op B`
#[derive(Debug, Clone)]
pub enum Relation {
    /// `<<` A dominates B
    Dominates,
    /// `>>` A is dominated by B
    DominatedBy,
    /// `<` A is the parent of B
    ParentOf,
    /// `>` A is a child of B
    ChildOf,
    /// `<:` B is the only child of A
    HasOnlyChild,
    /// `>:` A is the only child of B
    OnlyChildOf,
    /// `<,` B is the first child of A
    HasLeftmostChild,
    /// `>,` A is the first child of B
    LeftmostChildOf,
    /// `<-` B is the last child of A
    HasRightmostChild,
    /// `>-` A is the last child of B
    RightmostChildOf,
    /// `<<,` B is a leftmost descendant of A
    HasLeftmostDescendant,
    /// `>>,` A is a leftmost descendant of B
    LeftmostDescendantOf,
    /// `<<-` B is a rightmost descendant of A
    HasRightmostDescendant,
    /// `>>-` A is a rightmost descendant of B
    RightmostDescendantOf,
    /// `$++` A is a left sister of B
    LeftSisterOf,
    /// `$--` A is a right sister of B
    RightSisterOf,
    /// `$+` A is the immediate left sister of B
    ImmediateLeftSisterOf,
    /// `$-` A is the immediate right sister of B
    ImmediateRightSisterOf,
    /// `$` A and B are distinct sisters
    SisterOf,
    /// `==` A is B
    Equals,
    /// `<=` A is B or the parent of B
    ParentEquals,
    /// `<<:` A dominates B through a chain of unary nodes
    UnaryPathAncestorOf,
    /// `>>:` A is below B on a chain of unary nodes
    UnaryPathDescendantOf,
    /// `>>#` A is a head of B, possibly through intermediate heads
    Heads(Arc<dyn HeadFinder>),
    /// `<<#` B is a head of A, possibly through intermediate heads
    HeadedBy(Arc<dyn HeadFinder>),
    /// `>#` A is the head daughter of B
    ImmediatelyHeads(Arc<dyn HeadFinder>),
    /// `<#` B is the head daughter of A
    ImmediatelyHeadedBy(Arc<dyn HeadFinder>),
    /// `..` A ends before B starts
    Precedes,
    /// `,,` A starts after B ends
    Follows,
    /// `.` A ends where B starts
    ImmediatelyPrecedes,
    /// `,` A starts where B ends
    ImmediatelyFollows,
    /// `<<<` B is a leaf under A
    AncestorOfLeaf,
    /// `<<<i` B is the i-th leaf under A
    AncestorOfIthLeaf(i32),
    /// `<i` B is the i-th child of A
    HasIthChild(i32),
    /// `>i` A is the i-th child of B
    IthChildOf(i32),
    /// `<+(C)` A dominates B and every node strictly between matches C
    UnbrokenCategoryDominates(LabelTest),
    /// `>+(C)` inverse of `<+(C)`
    UnbrokenCategoryIsDominatedBy(LabelTest),
    /// `.+(C)` B follows A through a chain of immediately adjacent C nodes
    UnbrokenCategoryPrecedes(LabelTest),
    /// `,+(C)` inverse of `.+(C)`
    UnbrokenCategoryFollows(LabelTest),
    /// `:` always holds; joins independent sub-patterns over the same tree
    PatternSplitter,
}

/// Resolve a 1-based (or negative, from the end) position
fn resolve_index(index: i32, len: usize) -> Option<usize> {
    if index > 0 {
        let i = index as usize - 1;
        (i < len).then_some(i)
    } else {
        len.checked_sub(index.unsigned_abs() as usize)
    }
}

/// Sister immediately to the right of the highest node ending where `id` ends
fn next_adjacent(tree: &Tree, id: NodeId) -> Option<NodeId> {
    let mut current = id;
    loop {
        let parent = tree.parent(current)?;
        if tree.last_child(parent) != Some(current) {
            let index = tree.sister_index(current)?;
            return tree.children(parent).get(index + 1).copied();
        }
        current = parent;
    }
}

/// Sister immediately to the left of the highest node starting where `id` starts
fn previous_adjacent(tree: &Tree, id: NodeId) -> Option<NodeId> {
    let mut current = id;
    loop {
        let parent = tree.parent(current)?;
        if tree.first_child(parent) != Some(current) {
            let index = tree.sister_index(current)?;
            return index.checked_sub(1).map(|i| tree.children(parent)[i]);
        }
        current = parent;
    }
}

/// Every node starting exactly where `id` ends, outermost first
fn immediately_after(tree: &Tree, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    iter::successors(next_adjacent(tree, id), move |&n| tree.first_child(n))
}

/// Every node ending exactly where `id` starts, outermost first
fn immediately_before(tree: &Tree, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    iter::successors(previous_adjacent(tree, id), move |&n| tree.last_child(n))
}

/// Descendants reachable through nodes that pass a category test
struct GuardedDescent<'a> {
    tree: &'a Tree,
    test: &'a LabelTest,
    stack: Vec<NodeId>,
}

impl Iterator for GuardedDescent<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        if self.test.matches(self.tree.label(id)) {
            self.stack
                .extend(self.tree.children(id).iter().rev().copied());
        }
        Some(id)
    }
}

/// Nodes reachable through chains of adjacent nodes that pass a category test
struct AdjacentChain<'a> {
    tree: &'a Tree,
    test: &'a LabelTest,
    forward: bool,
    stack: Vec<NodeId>,
    seen: FxHashSet<NodeId>,
}

impl<'a> AdjacentChain<'a> {
    fn new(tree: &'a Tree, test: &'a LabelTest, forward: bool, pivot: NodeId) -> Self {
        let mut chain = Self {
            tree,
            test,
            forward,
            stack: Vec::new(),
            seen: FxHashSet::default(),
        };
        chain.push_neighbours(pivot);
        chain
    }

    fn push_neighbours(&mut self, id: NodeId) {
        let neighbours: Vec<NodeId> = if self.forward {
            immediately_after(self.tree, id).collect()
        } else {
            immediately_before(self.tree, id).collect()
        };
        self.stack.extend(neighbours.into_iter().rev());
    }
}

impl Iterator for AdjacentChain<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        loop {
            let id = self.stack.pop()?;
            if !self.seen.insert(id) {
                continue;
            }
            if self.test.matches(self.tree.label(id)) {
                self.push_neighbours(id);
            }
            return Some(id);
        }
    }
}

impl Relation {
    /// Reject parameters no tree could satisfy
    pub fn check(&self) -> Result<(), RelationError> {
        match self {
            Relation::AncestorOfIthLeaf(0) | Relation::HasIthChild(0) | Relation::IthChildOf(0) => {
                Err(RelationError::InvalidIndex(0))
            }
            _ => Ok(()),
        }
    }

    /// Operator as written in patterns
    pub fn symbol(&self) -> String {
        let fixed = match self {
            Relation::Dominates => "<<",
            Relation::DominatedBy => ">>",
            Relation::ParentOf => "<",
            Relation::ChildOf => ">",
            Relation::HasOnlyChild => "<:",
            Relation::OnlyChildOf => ">:",
            Relation::HasLeftmostChild => "<,",
            Relation::LeftmostChildOf => ">,",
            Relation::HasRightmostChild => "<-",
            Relation::RightmostChildOf => ">-",
            Relation::HasLeftmostDescendant => "<<,",
            Relation::LeftmostDescendantOf => ">>,",
            Relation::HasRightmostDescendant => "<<-",
            Relation::RightmostDescendantOf => ">>-",
            Relation::LeftSisterOf => "$++",
            Relation::RightSisterOf => "$--",
            Relation::ImmediateLeftSisterOf => "$+",
            Relation::ImmediateRightSisterOf => "$-",
            Relation::SisterOf => "$",
            Relation::Equals => "==",
            Relation::ParentEquals => "<=",
            Relation::UnaryPathAncestorOf => "<<:",
            Relation::UnaryPathDescendantOf => ">>:",
            Relation::Heads(_) => ">>#",
            Relation::HeadedBy(_) => "<<#",
            Relation::ImmediatelyHeads(_) => ">#",
            Relation::ImmediatelyHeadedBy(_) => "<#",
            Relation::Precedes => "..",
            Relation::Follows => ",,",
            Relation::ImmediatelyPrecedes => ".",
            Relation::ImmediatelyFollows => ",",
            Relation::AncestorOfLeaf => "<<<",
            Relation::PatternSplitter => ":",
            Relation::AncestorOfIthLeaf(i) => return format!("<<<{i}"),
            Relation::HasIthChild(i) => return format!("<{i}"),
            Relation::IthChildOf(i) => return format!(">{i}"),
            Relation::UnbrokenCategoryDominates(test) => return format!("<+({test})"),
            Relation::UnbrokenCategoryIsDominatedBy(test) => return format!(">+({test})"),
            Relation::UnbrokenCategoryPrecedes(test) => return format!(".+({test})"),
            Relation::UnbrokenCategoryFollows(test) => return format!(",+({test})"),
        };
        fixed.to_string()
    }

    /// The relation with its arguments swapped, where one exists
    pub fn inverse(&self) -> Option<Relation> {
        use Relation::*;
        let inverse = match self {
            Dominates => DominatedBy,
            DominatedBy => Dominates,
            ParentOf => ChildOf,
            ChildOf => ParentOf,
            HasOnlyChild => OnlyChildOf,
            OnlyChildOf => HasOnlyChild,
            HasLeftmostChild => LeftmostChildOf,
            LeftmostChildOf => HasLeftmostChild,
            HasRightmostChild => RightmostChildOf,
            RightmostChildOf => HasRightmostChild,
            HasLeftmostDescendant => LeftmostDescendantOf,
            LeftmostDescendantOf => HasLeftmostDescendant,
            HasRightmostDescendant => RightmostDescendantOf,
            RightmostDescendantOf => HasRightmostDescendant,
            LeftSisterOf => RightSisterOf,
            RightSisterOf => LeftSisterOf,
            ImmediateLeftSisterOf => ImmediateRightSisterOf,
            ImmediateRightSisterOf => ImmediateLeftSisterOf,
            SisterOf => SisterOf,
            Equals => Equals,
            UnaryPathAncestorOf => UnaryPathDescendantOf,
            UnaryPathDescendantOf => UnaryPathAncestorOf,
            Heads(hf) => HeadedBy(hf.clone()),
            HeadedBy(hf) => Heads(hf.clone()),
            ImmediatelyHeads(hf) => ImmediatelyHeadedBy(hf.clone()),
            ImmediatelyHeadedBy(hf) => ImmediatelyHeads(hf.clone()),
            Precedes => Follows,
            Follows => Precedes,
            ImmediatelyPrecedes => ImmediatelyFollows,
            ImmediatelyFollows => ImmediatelyPrecedes,
            HasIthChild(i) => IthChildOf(*i),
            IthChildOf(i) => HasIthChild(*i),
            UnbrokenCategoryDominates(test) => UnbrokenCategoryIsDominatedBy(test.clone()),
            UnbrokenCategoryIsDominatedBy(test) => UnbrokenCategoryDominates(test.clone()),
            UnbrokenCategoryPrecedes(test) => UnbrokenCategoryFollows(test.clone()),
            UnbrokenCategoryFollows(test) => UnbrokenCategoryPrecedes(test.clone()),
            PatternSplitter => PatternSplitter,
            ParentEquals | AncestorOfLeaf | AncestorOfIthLeaf(_) => return None,
        };
        Some(inverse)
    }

    /// Does `a op b` hold?
    pub fn satisfies(&self, tree: &Tree, a: NodeId, b: NodeId) -> Result<bool, RelationError> {
        self.check()?;
        let parent_of = |x: NodeId, y: NodeId| tree.parent(y) == Some(x);
        let dominates = |x: NodeId, y: NodeId| tree.ancestors(y).any(|n| n == x);

        let holds = match self {
            Relation::Dominates => dominates(a, b),
            Relation::DominatedBy => dominates(b, a),
            Relation::ParentOf => parent_of(a, b),
            Relation::ChildOf => parent_of(b, a),
            Relation::HasOnlyChild => tree.children(a) == [b],
            Relation::OnlyChildOf => tree.children(b) == [a],
            Relation::HasLeftmostChild => tree.first_child(a) == Some(b),
            Relation::LeftmostChildOf => tree.first_child(b) == Some(a),
            Relation::HasRightmostChild => tree.last_child(a) == Some(b),
            Relation::RightmostChildOf => tree.last_child(b) == Some(a),
            Relation::HasLeftmostDescendant => self.search(tree, a)?.any(|n| n == b),
            Relation::LeftmostDescendantOf => {
                iter::successors(tree.first_child(b), |&n| tree.first_child(n)).any(|n| n == a)
            }
            Relation::HasRightmostDescendant => self.search(tree, a)?.any(|n| n == b),
            Relation::RightmostDescendantOf => {
                iter::successors(tree.last_child(b), |&n| tree.last_child(n)).any(|n| n == a)
            }
            Relation::LeftSisterOf | Relation::RightSisterOf | Relation::SisterOf => {
                match (tree.parent(a), tree.sister_index(a), tree.sister_index(b)) {
                    (Some(pa), Some(ia), Some(ib)) if tree.parent(b) == Some(pa) => match self {
                        Relation::LeftSisterOf => ia < ib,
                        Relation::RightSisterOf => ia > ib,
                        _ => ia != ib,
                    },
                    _ => false,
                }
            }
            Relation::ImmediateLeftSisterOf => {
                tree.parent(a).is_some()
                    && tree.parent(a) == tree.parent(b)
                    && tree.sister_index(a).map(|i| i + 1) == tree.sister_index(b)
            }
            Relation::ImmediateRightSisterOf => {
                tree.parent(a).is_some()
                    && tree.parent(a) == tree.parent(b)
                    && tree.sister_index(b).map(|i| i + 1) == tree.sister_index(a)
            }
            Relation::Equals => a == b,
            Relation::ParentEquals => a == b || parent_of(a, b),
            Relation::UnaryPathAncestorOf => self.search(tree, a)?.any(|n| n == b),
            Relation::UnaryPathDescendantOf => Relation::UnaryPathAncestorOf.satisfies(tree, b, a)?,
            Relation::Heads(hf) => {
                iter::successors(hf.determine_head(tree, b), |&n| hf.determine_head(tree, n))
                    .any(|n| n == a)
            }
            Relation::HeadedBy(hf) => Relation::Heads(hf.clone()).satisfies(tree, b, a)?,
            Relation::ImmediatelyHeads(hf) => hf.determine_head(tree, b) == Some(a),
            Relation::ImmediatelyHeadedBy(hf) => hf.determine_head(tree, a) == Some(b),
            Relation::Precedes => tree.right_edge(a) <= tree.left_edge(b),
            Relation::Follows => tree.right_edge(b) <= tree.left_edge(a),
            Relation::ImmediatelyPrecedes => tree.right_edge(a) == tree.left_edge(b),
            Relation::ImmediatelyFollows => tree.right_edge(b) == tree.left_edge(a),
            Relation::AncestorOfLeaf => a != b && tree.is_leaf(b) && dominates(a, b),
            Relation::AncestorOfIthLeaf(i) => {
                a != b && tree.is_leaf(b) && {
                    let leaves = tree.leaves(a);
                    resolve_index(*i, leaves.len()).map(|k| leaves[k]) == Some(b)
                }
            }
            Relation::HasIthChild(i) => {
                let kids = tree.children(a);
                resolve_index(*i, kids.len()).map(|k| kids[k]) == Some(b)
            }
            Relation::IthChildOf(i) => Relation::HasIthChild(*i).satisfies(tree, b, a)?,
            Relation::UnbrokenCategoryDominates(test) => {
                let mut current = tree.parent(b);
                loop {
                    match current {
                        None => break false,
                        Some(n) if n == a => break true,
                        Some(n) if !test.matches(tree.label(n)) => break false,
                        Some(n) => current = tree.parent(n),
                    }
                }
            }
            Relation::UnbrokenCategoryIsDominatedBy(test) => {
                Relation::UnbrokenCategoryDominates(test.clone()).satisfies(tree, b, a)?
            }
            Relation::UnbrokenCategoryPrecedes(test) => {
                AdjacentChain::new(tree, test, true, a).any(|n| n == b)
            }
            Relation::UnbrokenCategoryFollows(test) => {
                AdjacentChain::new(tree, test, false, a).any(|n| n == b)
            }
            Relation::PatternSplitter => true,
        };
        Ok(holds)
    }

    /// Every `n` with `pivot op n`, lazily
    pub fn search<'a>(&'a self, tree: &'a Tree, pivot: NodeId) -> Result<Targets<'a>, RelationError> {
        self.check()?;
        let none = || -> Targets<'a> { Box::new(iter::empty()) };

        let targets: Targets<'a> = match self {
            Relation::Dominates => Box::new(tree.preorder(pivot).skip(1)),
            Relation::DominatedBy => Box::new(tree.ancestors(pivot)),
            Relation::ParentOf => Box::new(tree.children(pivot).iter().copied()),
            Relation::ChildOf => Box::new(tree.parent(pivot).into_iter()),
            Relation::HasOnlyChild => match tree.children(pivot) {
                [only] => Box::new(iter::once(*only)),
                _ => none(),
            },
            Relation::OnlyChildOf => Box::new(
                tree.parent(pivot)
                    .filter(|&p| tree.num_children(p) == 1)
                    .into_iter(),
            ),
            Relation::HasLeftmostChild => Box::new(tree.first_child(pivot).into_iter()),
            Relation::LeftmostChildOf => Box::new(
                tree.parent(pivot)
                    .filter(|&p| tree.first_child(p) == Some(pivot))
                    .into_iter(),
            ),
            Relation::HasRightmostChild => Box::new(tree.last_child(pivot).into_iter()),
            Relation::RightmostChildOf => Box::new(
                tree.parent(pivot)
                    .filter(|&p| tree.last_child(p) == Some(pivot))
                    .into_iter(),
            ),
            Relation::HasLeftmostDescendant => Box::new(iter::successors(
                tree.first_child(pivot),
                move |&n| tree.first_child(n),
            )),
            Relation::LeftmostDescendantOf => Box::new(
                iter::successors(Some(pivot), move |&n| {
                    tree.parent(n).filter(|&p| tree.first_child(p) == Some(n))
                })
                .skip(1),
            ),
            Relation::HasRightmostDescendant => Box::new(iter::successors(
                tree.last_child(pivot),
                move |&n| tree.last_child(n),
            )),
            Relation::RightmostDescendantOf => Box::new(
                iter::successors(Some(pivot), move |&n| {
                    tree.parent(n).filter(|&p| tree.last_child(p) == Some(n))
                })
                .skip(1),
            ),
            Relation::LeftSisterOf => {
                Box::new(tree.right_sisters(pivot).unwrap_or(&[]).iter().copied())
            }
            Relation::RightSisterOf => {
                Box::new(tree.left_sisters(pivot).unwrap_or(&[]).iter().copied())
            }
            Relation::ImmediateLeftSisterOf => Box::new(
                tree.right_sisters(pivot)
                    .and_then(|s| s.first())
                    .copied()
                    .into_iter(),
            ),
            Relation::ImmediateRightSisterOf => Box::new(
                tree.left_sisters(pivot)
                    .and_then(|s| s.last())
                    .copied()
                    .into_iter(),
            ),
            Relation::SisterOf => match tree.parent(pivot) {
                Some(parent) => Box::new(
                    tree.children(parent)
                        .iter()
                        .copied()
                        .filter(move |&n| n != pivot),
                ),
                None => none(),
            },
            Relation::Equals => Box::new(iter::once(pivot)),
            Relation::ParentEquals => {
                Box::new(iter::once(pivot).chain(tree.children(pivot).iter().copied()))
            }
            Relation::UnaryPathAncestorOf => Box::new(iter::successors(
                match tree.children(pivot) {
                    [only] => Some(*only),
                    _ => None,
                },
                move |&n| match tree.children(n) {
                    [only] => Some(*only),
                    _ => None,
                },
            )),
            Relation::UnaryPathDescendantOf => Box::new(
                iter::successors(Some(pivot), move |&n| {
                    tree.parent(n).filter(|&p| tree.num_children(p) == 1)
                })
                .skip(1),
            ),
            Relation::Heads(hf) => Box::new(
                iter::successors(Some(pivot), move |&n| {
                    tree.parent(n)
                        .filter(|&p| hf.determine_head(tree, p) == Some(n))
                })
                .skip(1),
            ),
            Relation::HeadedBy(hf) => Box::new(iter::successors(
                hf.determine_head(tree, pivot),
                move |&n| hf.determine_head(tree, n),
            )),
            Relation::ImmediatelyHeads(hf) => Box::new(
                tree.parent(pivot)
                    .filter(|&p| hf.determine_head(tree, p) == Some(pivot))
                    .into_iter(),
            ),
            Relation::ImmediatelyHeadedBy(hf) => {
                Box::new(hf.determine_head(tree, pivot).into_iter())
            }
            // right-hand sisters of each ancestor level, bottom up, each in pre-order
            Relation::Precedes => Box::new(
                iter::successors(Some(pivot), move |&n| tree.parent(n))
                    .flat_map(move |n| tree.right_sisters(n).unwrap_or(&[]).iter().copied())
                    .flat_map(move |s| tree.preorder(s)),
            ),
            // left-hand sisters of each ancestor level, top down, so in document order
            Relation::Follows => {
                let mut path: Vec<_> = iter::successors(Some(pivot), |&n| tree.parent(n)).collect();
                path.reverse();
                Box::new(
                    path.into_iter()
                        .flat_map(move |n| tree.left_sisters(n).unwrap_or(&[]).iter().copied())
                        .flat_map(move |s| tree.preorder(s)),
                )
            }
            Relation::ImmediatelyPrecedes => Box::new(immediately_after(tree, pivot)),
            Relation::ImmediatelyFollows => Box::new(immediately_before(tree, pivot)),
            Relation::AncestorOfLeaf => {
                Box::new(tree.preorder(pivot).skip(1).filter(move |&n| tree.is_leaf(n)))
            }
            Relation::AncestorOfIthLeaf(i) => {
                if tree.is_leaf(pivot) {
                    none()
                } else {
                    let leaves = tree.leaves(pivot);
                    Box::new(resolve_index(*i, leaves.len()).map(|k| leaves[k]).into_iter())
                }
            }
            Relation::HasIthChild(i) => {
                let kids = tree.children(pivot);
                Box::new(resolve_index(*i, kids.len()).map(|k| kids[k]).into_iter())
            }
            Relation::IthChildOf(i) => {
                let i = *i;
                Box::new(
                    tree.parent(pivot)
                        .filter(move |&p| {
                            let kids = tree.children(p);
                            resolve_index(i, kids.len()).map(|k| kids[k]) == Some(pivot)
                        })
                        .into_iter(),
                )
            }
            Relation::UnbrokenCategoryDominates(test) => Box::new(GuardedDescent {
                tree,
                test,
                stack: tree.children(pivot).iter().rev().copied().collect(),
            }),
            Relation::UnbrokenCategoryIsDominatedBy(test) => {
                let mut blocked = false;
                Box::new(tree.ancestors(pivot).take_while(move |&n| {
                    let open = !blocked;
                    blocked = !test.matches(tree.label(n));
                    open
                }))
            }
            Relation::UnbrokenCategoryPrecedes(test) => {
                Box::new(AdjacentChain::new(tree, test, true, pivot))
            }
            Relation::UnbrokenCategoryFollows(test) => {
                Box::new(AdjacentChain::new(tree, test, false, pivot))
            }
            Relation::PatternSplitter => Box::new(tree.preorder(tree.root_of(pivot))),
        };
        Ok(targets)
    }
}
