//! Head finding for phrasal nodes
//!
//! Head rules are keyed by the mother's basic category. Each category has an
//! ordered list of [`HeadRule`]s; the first rule that picks a daughter wins. If
//! none does, the last rule falls back to the first (or last) daughter that is
//! not punctuation.

use crate::label::basic_category;
use crate::tree::{NodeId, Tree};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Picks the head daughter of a node
pub trait HeadFinder: Send + Sync {
    /// `None` for leaves; the sole child for unary nodes
    fn determine_head(&self, tree: &Tree, node: NodeId) -> Option<NodeId>;
}

impl fmt::Debug for dyn HeadFinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HeadFinder")
    }
}

/// Scan direction and matching discipline of one rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Try each category in order across all daughters, scanning left to right
    Left,
    /// First daughter (from the left) whose category is any of the listed ones
    LeftDis,
    /// First daughter (from the left) whose category is not listed
    LeftExcept,
    Right,
    RightDis,
    RightExcept,
}

impl Direction {
    fn from_left(self) -> bool {
        matches!(self, Direction::Left | Direction::LeftDis | Direction::LeftExcept)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadRule {
    pub direction: Direction,
    pub categories: Vec<String>,
}

impl HeadRule {
    pub fn new(direction: Direction, categories: &[&str]) -> Self {
        Self {
            direction,
            categories: categories.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Table-driven head finder
#[derive(Debug, Clone)]
pub struct RuleHeadFinder {
    rules: FxHashMap<String, Vec<HeadRule>>,
    /// Rule used for categories missing from the table
    default_rule: HeadRule,
    /// Categories the last-resort fallback skips over
    avoid: Vec<String>,
    /// Step back over a conjunction preceding the chosen head
    coordination_fix: bool,
}

const PUNCTUATION_TAGS: &[&str] = &["''", "``", "-LRB-", "-RRB-", ".", ":", ","];

impl RuleHeadFinder {
    pub fn new(default_rule: HeadRule, avoid: &[&str]) -> Self {
        Self {
            rules: FxHashMap::default(),
            default_rule,
            avoid: avoid.iter().map(|c| c.to_string()).collect(),
            coordination_fix: false,
        }
    }

    /// Register the rules for a mother category
    pub fn with_rules(mut self, category: &str, rules: Vec<HeadRule>) -> Self {
        self.rules.insert(category.to_string(), rules);
        self
    }

    pub fn with_coordination_fix(mut self, enabled: bool) -> Self {
        self.coordination_fix = enabled;
        self
    }

    /// Collins (1999) English head rules
    pub fn collins() -> Self {
        use Direction::*;
        let r = HeadRule::new;

        let mut finder = Self::new(r(Left, &[]), PUNCTUATION_TAGS).with_coordination_fix(true);
        // several mother categories may share one rule list
        let table: Vec<(&str, Vec<HeadRule>)> = vec![
            (
                "ADJP",
                vec![r(
                    Left,
                    &[
                        "NNS", "QP", "NN", "$", "ADVP", "JJ", "VBN", "VBG", "ADJP", "JJR", "NP",
                        "JJS", "DT", "FW", "RBR", "RBS", "SBAR", "RB",
                    ],
                )],
            ),
            (
                "ADVP",
                vec![r(
                    Right,
                    &[
                        "RB", "RBR", "RBS", "FW", "ADVP", "TO", "CD", "JJR", "JJ", "IN", "NP",
                        "JJS", "NN",
                    ],
                )],
            ),
            ("CONJP", vec![r(Right, &["CC", "RB", "IN"])]),
            ("FRAG", vec![r(Right, &[])]),
            ("INTJ", vec![r(Left, &[])]),
            ("LST", vec![r(Right, &["LS", ":"])]),
            (
                "NAC",
                vec![r(
                    Left,
                    &[
                        "NN", "NNS", "NNP", "NNPS", "NP", "NAC", "EX", "$", "CD", "QP", "PRP",
                        "VBG", "JJ", "JJS", "JJR", "ADJP", "FW",
                    ],
                )],
            ),
            ("PP", vec![r(Right, &["IN", "TO", "VBG", "VBN", "RP", "FW"])]),
            ("PRN", vec![r(Left, &[])]),
            ("PRT", vec![r(Right, &["RP"])]),
            (
                "QP",
                vec![r(
                    Left,
                    &[
                        "$", "IN", "NNS", "NN", "JJ", "RB", "DT", "CD", "NCD", "QP", "JJR", "JJS",
                    ],
                )],
            ),
            ("RRC", vec![r(Right, &["VP", "NP", "ADVP", "ADJP", "PP"])]),
            (
                "S",
                vec![r(Left, &["TO", "IN", "VP", "S", "SBAR", "ADJP", "UCP", "NP"])],
            ),
            (
                "SBAR",
                vec![r(
                    Left,
                    &[
                        "WHNP", "WHPP", "WHADVP", "WHADJP", "IN", "DT", "S", "SQ", "SINV", "SBAR",
                        "FRAG",
                    ],
                )],
            ),
            (
                "SBARQ",
                vec![r(Left, &["SQ", "S", "SINV", "SBARQ", "FRAG"])],
            ),
            (
                "SINV",
                vec![r(
                    Left,
                    &["VBZ", "VBD", "VBP", "VB", "MD", "VP", "S", "SINV", "ADJP", "NP"],
                )],
            ),
            (
                "SQ",
                vec![r(Left, &["VBZ", "VBD", "VBP", "VB", "MD", "VP", "SQ"])],
            ),
            ("UCP", vec![r(Right, &[])]),
            (
                "VP",
                vec![r(
                    Left,
                    &[
                        "TO", "VBD", "VBN", "MD", "VBZ", "VB", "VBG", "VBP", "VP", "ADJP", "NN",
                        "NNS", "NP",
                    ],
                )],
            ),
            ("WHADJP", vec![r(Left, &["CC", "WRB", "JJ", "ADJP"])]),
            ("WHADVP", vec![r(Right, &["CC", "WRB"])]),
            (
                "WHNP",
                vec![r(Left, &["WDT", "WP", "WP$", "WHADJP", "WHPP", "WHNP"])],
            ),
            ("WHPP", vec![r(Right, &["IN", "TO", "FW"])]),
            ("NX", vec![r(Left, &[])]),
            ("X", vec![r(Right, &[])]),
            (
                "NP",
                vec![
                    r(RightDis, &["NN", "NNP", "NNPS", "NNS", "NX", "POS", "JJR"]),
                    r(Left, &["NP"]),
                    r(RightDis, &["$", "ADJP", "PRN"]),
                    r(Right, &["CD"]),
                    r(RightDis, &["JJ", "JJS", "RB", "QP"]),
                ],
            ),
            ("TYPO EDITED", vec![r(Left, &[])]),
            (
                "ROOT TOP",
                vec![r(Left, &["S", "SQ", "SINV", "SBARQ", "FRAG"])],
            ),
        ];

        for (categories, rules) in table {
            for category in categories.split_whitespace() {
                finder = finder.with_rules(category, rules.clone());
            }
        }
        finder
    }

    fn category<'t>(&self, tree: &'t Tree, id: NodeId) -> &'t str {
        tree.label(id).map(basic_category).unwrap_or("")
    }

    fn is_avoided(&self, category: &str) -> bool {
        self.avoid.iter().any(|c| c == category)
    }

    /// Index of the daughter picked by `rule`, if any
    fn locate(&self, tree: &Tree, kids: &[NodeId], rule: &HeadRule, last_resort: bool) -> Option<usize> {
        let cats = &rule.categories;
        let listed = |i: usize| cats.iter().any(|c| c == self.category(tree, kids[i]));
        let forward = 0..kids.len();
        let backward = (0..kids.len()).rev();

        let found = match rule.direction {
            Direction::Left => cats
                .iter()
                .find_map(|c| forward.clone().find(|&i| self.category(tree, kids[i]) == c)),
            Direction::Right => cats
                .iter()
                .find_map(|c| backward.clone().find(|&i| self.category(tree, kids[i]) == c)),
            Direction::LeftDis => forward.clone().find(|&i| listed(i)),
            Direction::RightDis => backward.clone().find(|&i| listed(i)),
            Direction::LeftExcept => forward.clone().find(|&i| !listed(i)),
            Direction::RightExcept => backward.clone().find(|&i| !listed(i)),
        };

        match found {
            Some(index) => Some(self.post_fix(tree, kids, index)),
            None if last_resort => {
                let (direction, fallback) = if rule.direction.from_left() {
                    (Direction::LeftExcept, 0)
                } else {
                    (Direction::RightExcept, kids.len() - 1)
                };
                let avoid = HeadRule {
                    direction,
                    categories: self.avoid.clone(),
                };
                Some(self.locate(tree, kids, &avoid, false).unwrap_or(fallback))
            }
            None => None,
        }
    }

    /// A head right after `CC`/`CONJP` moves to the conjunct before it
    fn post_fix(&self, tree: &Tree, kids: &[NodeId], index: usize) -> usize {
        if !self.coordination_fix || index < 2 {
            return index;
        }
        if !matches!(self.category(tree, kids[index - 1]), "CC" | "CONJP") {
            return index;
        }
        (0..=index - 2)
            .rev()
            .find(|&i| !(tree.is_preterminal(kids[i]) && self.is_avoided(self.category(tree, kids[i]))))
            .unwrap_or(index)
    }
}

impl Default for RuleHeadFinder {
    fn default() -> Self {
        Self::collins()
    }
}

static COLLINS: LazyLock<Arc<dyn HeadFinder>> = LazyLock::new(|| Arc::new(RuleHeadFinder::collins()));

/// Shared Collins head finder used when patterns are compiled without one
pub fn default_head_finder() -> Arc<dyn HeadFinder> {
    COLLINS.clone()
}

impl HeadFinder for RuleHeadFinder {
    fn determine_head(&self, tree: &Tree, node: NodeId) -> Option<NodeId> {
        let kids = tree.children(node);
        match kids {
            [] => None,
            [only] => Some(*only),
            _ => {
                let mother = self.category(tree, node);
                let rules = match self.rules.get(mother) {
                    Some(rules) => rules.as_slice(),
                    None => std::slice::from_ref(&self.default_rule),
                };
                let last = rules.len().saturating_sub(1);
                rules
                    .iter()
                    .enumerate()
                    .find_map(|(i, rule)| self.locate(tree, kids, rule, i == last))
                    .map(|index| kids[index])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::parse_trees;

    fn head_label(finder: &RuleHeadFinder, text: &str) -> Option<String> {
        let tree = parse_trees(text).unwrap().remove(0);
        finder
            .determine_head(&tree, tree.root())
            .and_then(|h| tree.label(h).map(str::to_string))
    }

    #[test]
    fn test_leaf_and_unary() {
        let finder = RuleHeadFinder::collins();
        let tree = parse_trees("(NP (NN dog))").unwrap().remove(0);

        assert_eq!(finder.determine_head(&tree, 0), Some(1));
        assert_eq!(finder.determine_head(&tree, 2), None);
    }

    #[test]
    fn test_left_rule_tries_categories_in_order() {
        let finder = RuleHeadFinder::collins();
        assert_eq!(
            head_label(&finder, "(S (NP (PRP I)) (VP (VBD ran)) (. .))").as_deref(),
            Some("VP")
        );
        // VBD comes before VB in the VP list, whatever the daughter order
        assert_eq!(
            head_label(&finder, "(VP (VB go) (VBD went))").as_deref(),
            Some("VBD")
        );
    }

    #[test]
    fn test_np_rightdis() {
        let finder = RuleHeadFinder::collins();
        assert_eq!(
            head_label(&finder, "(NP (DT the) (JJ big) (NN dog))").as_deref(),
            Some("NN")
        );
        assert_eq!(
            head_label(&finder, "(NP (NP (DT a) (NN walk)) (PP (IN of) (NP (NN day))))").as_deref(),
            Some("NP")
        );
    }

    #[test]
    fn test_last_resort_skips_punctuation() {
        let finder = RuleHeadFinder::collins();
        let tree = parse_trees("(FRAG (NP (NN yes)) (. .))").unwrap().remove(0);
        // FRAG has an empty right rule; the rightmost non-punctuation daughter wins
        assert_eq!(finder.determine_head(&tree, 0), Some(1));
    }

    #[test]
    fn test_unknown_category_uses_default() {
        let finder = RuleHeadFinder::collins();
        let tree = parse_trees("(FOO (, ,) (NN x) (NN y))").unwrap().remove(0);
        assert_eq!(tree.label(finder.determine_head(&tree, 0).unwrap()), Some("NN"));
        assert_eq!(finder.determine_head(&tree, 0), Some(3));
    }

    #[test]
    fn test_coordination_fix() {
        let finder = RuleHeadFinder::collins();
        let tree = parse_trees("(UCP (NN x) (, ,) (CC and) (JJ y))").unwrap().remove(0);
        let first = tree.children(0)[0];
        assert_eq!(finder.determine_head(&tree, 0), Some(first));

        let plain = RuleHeadFinder::collins().with_coordination_fix(false);
        let last = tree.children(0)[3];
        assert_eq!(plain.determine_head(&tree, 0), Some(last));
    }

    #[test]
    fn test_functional_tags_are_ignored() {
        let finder = RuleHeadFinder::collins();
        assert_eq!(
            head_label(&finder, "(S-TPC (NP-SBJ (PRP it)) (VP (VBZ is)))").as_deref(),
            Some("VP")
        );
    }
}
