//! Tree pattern parser
//!
//! Parses Tregex-style pattern strings into a [`TregexPattern`] using the pest
//! grammar in `tregex.pest`.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use std::num::ParseIntError;
use std::sync::Arc;
use thiserror::Error;

use crate::head_finder::HeadFinder;
use crate::label::LabelTest;
use crate::pattern::{NameId, NodeLabel, NodePattern, RelationExpr, TregexPattern};
use crate::relation::{Relation, RelationError};

#[derive(Parser)]
#[grammar = "tregex.pest"]
struct TregexParser;

/// Error type for pattern compilation failures
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Pattern error: {0}")]
    ParseError(#[from] pest::error::Error<Rule>),

    #[error("Pattern error: {0}")]
    Relation(#[from] RelationError),

    #[error("Pattern error: invalid regular expression: {0}")]
    Regex(#[from] regex::Error),

    #[error("Pattern error: invalid index: {0}")]
    Index(#[from] ParseIntError),

    #[error("Pattern error: ={0} is used before it is bound")]
    UnknownBackReference(String),
}

/// Parse a pattern string into a compiled pattern
pub fn parse_pattern(
    source: &str,
    head_finder: Arc<dyn HeadFinder>,
) -> Result<TregexPattern, PatternError> {
    let pairs = TregexParser::parse(Rule::pattern, source)?;
    let mut builder = PatternBuilder {
        head_finder,
        names: Vec::new(),
    };

    let mut segments = Vec::new();
    for pair in pairs.flat_map(|p| p.into_inner()) {
        if pair.as_rule() == Rule::node {
            segments.push(builder.node(pair)?);
        }
    }
    let mut segments = segments.into_iter();
    let Some(mut root) = segments.next() else {
        unreachable!("pattern rule always contains a node")
    };

    // Each `: segment` is matched anywhere in the tree, after everything before it
    let splits: Vec<_> = segments
        .map(|target| RelationExpr::Rel {
            relation: Relation::PatternSplitter,
            target: Box::new(target),
        })
        .collect();
    if !splits.is_empty() {
        let mut items: Vec<_> = root.relations.take().into_iter().collect();
        items.extend(splits);
        root.relations = Some(RelationExpr::and(items));
    }

    Ok(TregexPattern::new(source, root, builder.names))
}

struct PatternBuilder {
    head_finder: Arc<dyn HeadFinder>,
    names: Vec<String>,
}

impl PatternBuilder {
    fn declare(&mut self, name: &str) -> NameId {
        match self.names.iter().position(|n| n == name) {
            Some(id) => id,
            None => {
                self.names.push(name.to_string());
                self.names.len() - 1
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<NameId, PatternError> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| PatternError::UnknownBackReference(name.to_string()))
    }

    /// node = node_desc rel_disj?
    fn node(&mut self, pair: Pair<Rule>) -> Result<NodePattern, PatternError> {
        let mut node = NodePattern::new(NodeLabel::Test(LabelTest::any()));
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::node_desc => node = self.node_desc(part)?,
                Rule::rel_disj => node.relations = Some(self.rel_disj(part)?),
                rule => unreachable!("unexpected {rule:?} in node"),
            }
        }
        Ok(node)
    }

    /// Label test or back-reference, with an optional binding
    fn node_desc(&mut self, pair: Pair<Rule>) -> Result<NodePattern, PatternError> {
        let mut node = NodePattern::new(NodeLabel::Test(LabelTest::any()));
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::label_test => node.label = NodeLabel::Test(LabelTest::parse(part.as_str())?),
                Rule::backref => node.label = NodeLabel::BackRef(self.lookup(&part.as_str()[1..])?),
                Rule::binding => node.name = Some(self.declare(&part.as_str()[1..])),
                rule => unreachable!("unexpected {rule:?} in node description"),
            }
        }
        Ok(node)
    }

    fn rel_disj(&mut self, pair: Pair<Rule>) -> Result<RelationExpr, PatternError> {
        let alternatives = pair
            .into_inner()
            .map(|conj| self.rel_conj(conj))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RelationExpr::or(alternatives))
    }

    fn rel_conj(&mut self, pair: Pair<Rule>) -> Result<RelationExpr, PatternError> {
        let items = pair
            .into_inner()
            .map(|item| self.rel_item(item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RelationExpr::and(items))
    }

    /// A relation or bracketed group, possibly negated or optional
    fn rel_item(&mut self, pair: Pair<Rule>) -> Result<RelationExpr, PatternError> {
        let mut negated = false;
        let mut optional = false;
        let mut body = None;

        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::rel_modifier => match part.as_str() {
                    "!" => negated = true,
                    _ => optional = true,
                },
                Rule::rel_group => {
                    for inner in part.into_inner() {
                        body = Some(self.rel_disj(inner)?);
                    }
                }
                Rule::relation => body = Some(self.relation(part)?),
                rule => unreachable!("unexpected {rule:?} in relation item"),
            }
        }

        let Some(mut expr) = body else {
            unreachable!("relation item without a body")
        };
        if optional {
            expr = RelationExpr::Optional(Box::new(expr));
        }
        if negated {
            expr = RelationExpr::Not(Box::new(expr));
        }
        Ok(expr)
    }

    /// relation = rel_op rel_target
    fn relation(&mut self, pair: Pair<Rule>) -> Result<RelationExpr, PatternError> {
        let mut relation = None;
        let mut target = None;

        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::ith_leaf => relation = Some(Relation::AncestorOfIthLeaf(parse_index(&part)?)),
                Rule::ith_child => relation = Some(Relation::HasIthChild(parse_index(&part)?)),
                Rule::ith_child_of => relation = Some(Relation::IthChildOf(parse_index(&part)?)),
                Rule::unbroken => relation = Some(parse_unbroken(part)?),
                Rule::simple_op => relation = Some(self.simple_relation(part.as_str())),
                Rule::rel_target => target = Some(self.rel_target(part)?),
                rule => unreachable!("unexpected {rule:?} in relation"),
            }
        }

        let (Some(relation), Some(target)) = (relation, target) else {
            unreachable!("relation without operator or target")
        };
        relation.check()?;
        Ok(RelationExpr::Rel {
            relation,
            target: Box::new(target),
        })
    }

    fn rel_target(&mut self, pair: Pair<Rule>) -> Result<NodePattern, PatternError> {
        let mut target = NodePattern::new(NodeLabel::Test(LabelTest::any()));
        for part in pair.into_inner() {
            target = match part.as_rule() {
                Rule::node => self.node(part)?,
                Rule::node_desc => self.node_desc(part)?,
                rule => unreachable!("unexpected {rule:?} in relation target"),
            };
        }
        Ok(target)
    }

    fn simple_relation(&self, op: &str) -> Relation {
        let hf = || self.head_finder.clone();
        match op {
            "<<" => Relation::Dominates,
            ">>" => Relation::DominatedBy,
            "<" => Relation::ParentOf,
            ">" => Relation::ChildOf,
            "<:" => Relation::HasOnlyChild,
            ">:" => Relation::OnlyChildOf,
            "<," => Relation::HasLeftmostChild,
            ">," => Relation::LeftmostChildOf,
            "<-" => Relation::HasRightmostChild,
            ">-" => Relation::RightmostChildOf,
            "<<," => Relation::HasLeftmostDescendant,
            ">>," => Relation::LeftmostDescendantOf,
            "<<-" => Relation::HasRightmostDescendant,
            ">>-" => Relation::RightmostDescendantOf,
            "$++" | "$.." => Relation::LeftSisterOf,
            "$--" | "$,," => Relation::RightSisterOf,
            "$+" | "$." => Relation::ImmediateLeftSisterOf,
            "$-" | "$," => Relation::ImmediateRightSisterOf,
            "$" => Relation::SisterOf,
            "==" => Relation::Equals,
            "<=" => Relation::ParentEquals,
            "<<:" => Relation::UnaryPathAncestorOf,
            ">>:" => Relation::UnaryPathDescendantOf,
            ">>#" => Relation::Heads(hf()),
            "<<#" => Relation::HeadedBy(hf()),
            ">#" => Relation::ImmediatelyHeads(hf()),
            "<#" => Relation::ImmediatelyHeadedBy(hf()),
            ".." => Relation::Precedes,
            ",," => Relation::Follows,
            "." => Relation::ImmediatelyPrecedes,
            "," => Relation::ImmediatelyFollows,
            "<<<" => Relation::AncestorOfLeaf,
            _ => unreachable!("operator {op:?} is not in the grammar"),
        }
    }
}

/// `<2`, `>-1`, `<<<3`: the signed number after the operator
fn parse_index(pair: &Pair<Rule>) -> Result<i32, PatternError> {
    let digits = pair.as_str().trim_start_matches(['<', '>']);
    Ok(digits.parse()?)
}

/// `<+(VP)` and friends
fn parse_unbroken(pair: Pair<Rule>) -> Result<Relation, PatternError> {
    let mut op = "";
    let mut test = LabelTest::any();
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::unbroken_op => op = part.as_str(),
            Rule::label_test => test = LabelTest::parse(part.as_str())?,
            rule => unreachable!("unexpected {rule:?} in unbroken relation"),
        }
    }
    Ok(match op {
        "<+" => Relation::UnbrokenCategoryDominates(test),
        ">+" => Relation::UnbrokenCategoryIsDominatedBy(test),
        ".+" => Relation::UnbrokenCategoryPrecedes(test),
        _ => Relation::UnbrokenCategoryFollows(test),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::parse_trees;
    use crate::head_finder::default_head_finder;

    fn parse(source: &str) -> TregexPattern {
        parse_pattern(source, default_head_finder()).unwrap()
    }

    fn single_relation(expr: &RelationExpr) -> (&Relation, &NodePattern) {
        match expr {
            RelationExpr::Rel { relation, target } => (relation, target),
            other => panic!("Expected a single relation, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_bare_label() {
        let pattern = parse("ROOT");
        let root = pattern.root();

        assert_eq!(root.label, NodeLabel::Test(LabelTest::one_of(["ROOT"])));
        assert!(root.relations.is_none());
    }

    #[test]
    fn test_parse_alternation_and_relation() {
        let pattern = parse("VP > S|SINV|SQ");
        let (relation, target) = single_relation(pattern.root().relations.as_ref().unwrap());

        assert_eq!(relation.symbol(), ">");
        assert_eq!(target.label, NodeLabel::Test(LabelTest::one_of(["S", "SINV", "SQ"])));
    }

    #[test]
    fn test_juxtaposition_attaches_to_head_node() {
        // both relations belong to S, not to NP
        let pattern = parse("S < NP < VP");
        match pattern.root().relations.as_ref().unwrap() {
            RelationExpr::And(items) => {
                assert_eq!(items.len(), 2);
                let (_, second) = single_relation(&items[1]);
                assert_eq!(second.label, NodeLabel::Test(LabelTest::one_of(["VP"])));
            }
            other => panic!("Expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_disjunction_binds_loosest() {
        let pattern = parse("S > ROOT <, VP | <# MD");
        match pattern.root().relations.as_ref().unwrap() {
            RelationExpr::Or(alts) => {
                assert_eq!(alts.len(), 2);
                assert!(matches!(&alts[0], RelationExpr::And(items) if items.len() == 2));
                assert!(matches!(&alts[1], RelationExpr::Rel { .. }));
            }
            other => panic!("Expected Or, got {other:?}"),
        }
    }

    #[test]
    fn test_colon_starts_an_independent_segment() {
        let pattern = parse("S < NP : VP < VB");
        match pattern.root().relations.as_ref().unwrap() {
            RelationExpr::And(items) => {
                assert_eq!(items.len(), 2);
                let (relation, segment) = single_relation(&items[1]);
                assert_eq!(relation.symbol(), ":");
                assert_eq!(segment.label, NodeLabel::Test(LabelTest::one_of(["VP"])));
                let (inner, _) = single_relation(segment.relations.as_ref().unwrap());
                assert_eq!(inner.symbol(), "<");
            }
            other => panic!("Expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_colon_segments_match_anywhere() {
        let forest = parse_trees("(S (NP (NN a)) (VP (VB b)))").unwrap();
        let count = |source: &str| parse(source).count_forest(&forest);

        assert_eq!(count("S < NP : VP < VB"), 1);
        assert_eq!(count("S < NP : (VP < VB)"), 1);
        assert_eq!(count("S < NP : VP < ADJP"), 0);
        assert_eq!(count("S < NP=subj : =subj < NN"), 1);
        assert_eq!(count("S : NP : VP"), 1);
    }

    #[test]
    fn test_negation_and_groups() {
        let pattern = parse("NP !> NP [<< JJ | << (NP $++ NP !$+ CC)]");
        match pattern.root().relations.as_ref().unwrap() {
            RelationExpr::And(items) => {
                assert!(matches!(&items[0], RelationExpr::Not(_)));
                assert!(matches!(&items[1], RelationExpr::Or(alts) if alts.len() == 2));
            }
            other => panic!("Expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_target_owns_its_relations() {
        let pattern = parse("SBAR < (S <# VBD)");
        let (_, target) = single_relation(pattern.root().relations.as_ref().unwrap());
        let (inner, _) = single_relation(target.relations.as_ref().unwrap());
        assert_eq!(inner.symbol(), "<#");
    }

    #[test]
    fn test_operators_with_arguments() {
        let cases = [
            ("NP <2 NN", "<2"),
            ("NP <-1 NN", "<-1"),
            ("NP <- NN", "<-"),
            ("NN >-2 NP", ">-2"),
            ("S <<<1 __", "<<<1"),
            ("S <<< __", "<<<"),
            ("VP <+(VP) VB", "<+(VP)"),
            ("DT .+(JJ|ADJP) NN", ".+(JJ|ADJP)"),
            ("NP $.. PP", "$++"),
            ("NP $, PP", "$-"),
        ];
        for (source, symbol) in cases {
            let pattern = parse(source);
            let (relation, _) = single_relation(pattern.root().relations.as_ref().unwrap());
            assert_eq!(relation.symbol(), symbol, "{source}");
        }
    }

    #[test]
    fn test_bindings_and_backrefs() {
        let pattern = parse("NP=np < (DT $+ =np)");
        assert_eq!(pattern.names(), &["np".to_string()]);
        assert_eq!(pattern.root().name, Some(0));

        let (_, target) = single_relation(pattern.root().relations.as_ref().unwrap());
        let (_, back) = single_relation(target.relations.as_ref().unwrap());
        assert_eq!(back.label, NodeLabel::BackRef(0));
    }

    #[test]
    fn test_unknown_backref() {
        let result = parse_pattern("NP < =missing", default_head_finder());
        assert!(matches!(result, Err(PatternError::UnknownBackReference(name)) if name == "missing"));
    }

    #[test]
    fn test_zero_index_rejected() {
        let result = parse_pattern("NP <0 NN", default_head_finder());
        assert!(matches!(
            result,
            Err(PatternError::Relation(RelationError::InvalidIndex(0)))
        ));
    }

    #[test]
    fn test_bad_regex_and_syntax() {
        assert!(matches!(
            parse_pattern("/(/ < NP", default_head_finder()),
            Err(PatternError::Regex(_))
        ));
        assert!(matches!(
            parse_pattern("NP < ", default_head_finder()),
            Err(PatternError::ParseError(_))
        ));
        assert!(matches!(
            parse_pattern("NP [< DT", default_head_finder()),
            Err(PatternError::ParseError(_))
        ));
    }

    #[test]
    fn test_builtin_patterns_parse() {
        let sources = [
            "MD|VBZ|VBP|VBD > (SQ !< VP)",
            "S|SINV|SQ [> ROOT <, (VP <# VB) | <# MD|VBZ|VBP|VBD | < (VP [<# MD|VBP|VBZ|VBD | < CC < (VP <# MD|VBP|VBZ|VBD)])]",
            "S|SBARQ|SINV|SQ > ROOT | [$-- S|SBARQ|SINV|SQ !>> SBAR|VP]",
            "SBAR [<# WHNP | <# (IN < That|that|For|for) | <, S] & [$+ VP | > VP]",
            "S < (VP <# VBG|TO) $+ VP",
            "ADJP|ADVP|NP|VP < CC",
        ];
        for source in sources {
            assert!(parse_pattern(source, default_head_finder()).is_ok(), "{source}");
        }
    }

    #[test]
    fn test_labels_with_punctuation_characters() {
        let pattern = parse("WHNP < WP$|-NONE-");
        let (_, target) = single_relation(pattern.root().relations.as_ref().unwrap());
        assert_eq!(target.label, NodeLabel::Test(LabelTest::one_of(["WP$", "-NONE-"])));
    }
}
