use proptest::prelude::*;
use std::sync::Arc;
use synmetrics::expression::Expression;
use synmetrics::head_finder::default_head_finder;
use synmetrics::label::LabelTest;
use synmetrics::structure::UserDefinition;
use synmetrics::{Counter, CounterError, NodeId, Relation, Tree, parse_trees};

#[derive(Debug, Clone)]
enum Shape {
    Leaf(String),
    Node(&'static str, Vec<Shape>),
}

const LABELS: [&str; 10] = ["S", "NP", "VP", "PP", "SBAR", "DT", "NN", "VBD", "CC", "ROOT"];

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = "[a-z]{1,5}".prop_map(Shape::Leaf);
    leaf.prop_recursive(3, 16, 3, |inner| {
        (
            prop::sample::select(LABELS.to_vec()),
            prop::collection::vec(inner, 1..4),
        )
            .prop_map(|(label, children)| Shape::Node(label, children))
    })
}

fn tree() -> impl Strategy<Value = Tree> {
    (
        prop::sample::select(LABELS.to_vec()),
        prop::collection::vec(shape(), 1..4),
    )
        .prop_map(|(label, children)| {
            let mut tree = Tree::new(Some(label));
            let root = tree.root();
            attach(&mut tree, root, &children);
            tree
        })
}

fn attach(tree: &mut Tree, parent: NodeId, shapes: &[Shape]) {
    for shape in shapes {
        match shape {
            Shape::Leaf(word) => {
                tree.add_child(parent, Some(word));
            }
            Shape::Node(label, children) => {
                let id = tree.add_child(parent, Some(label));
                attach(tree, id, children);
            }
        }
    }
}

fn relations() -> Vec<Relation> {
    let hf = default_head_finder();
    let test = LabelTest::parse("NP|VP|S").unwrap();
    vec![
        Relation::Dominates,
        Relation::DominatedBy,
        Relation::ParentOf,
        Relation::ChildOf,
        Relation::HasOnlyChild,
        Relation::OnlyChildOf,
        Relation::HasLeftmostChild,
        Relation::LeftmostChildOf,
        Relation::HasRightmostChild,
        Relation::RightmostChildOf,
        Relation::HasLeftmostDescendant,
        Relation::LeftmostDescendantOf,
        Relation::HasRightmostDescendant,
        Relation::RightmostDescendantOf,
        Relation::LeftSisterOf,
        Relation::RightSisterOf,
        Relation::ImmediateLeftSisterOf,
        Relation::ImmediateRightSisterOf,
        Relation::SisterOf,
        Relation::Equals,
        Relation::ParentEquals,
        Relation::UnaryPathAncestorOf,
        Relation::UnaryPathDescendantOf,
        Relation::Heads(Arc::clone(&hf)),
        Relation::HeadedBy(Arc::clone(&hf)),
        Relation::ImmediatelyHeads(Arc::clone(&hf)),
        Relation::ImmediatelyHeadedBy(hf),
        Relation::Precedes,
        Relation::Follows,
        Relation::ImmediatelyPrecedes,
        Relation::ImmediatelyFollows,
        Relation::AncestorOfLeaf,
        Relation::AncestorOfIthLeaf(1),
        Relation::AncestorOfIthLeaf(-2),
        Relation::HasIthChild(2),
        Relation::IthChildOf(-1),
        Relation::UnbrokenCategoryDominates(test.clone()),
        Relation::UnbrokenCategoryIsDominatedBy(test.clone()),
        Relation::UnbrokenCategoryPrecedes(test.clone()),
        Relation::UnbrokenCategoryFollows(test),
        Relation::PatternSplitter,
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn inverse_relations_agree(tree in tree()) {
        for relation in relations() {
            let Some(inverse) = relation.inverse() else { continue };
            for a in 0..tree.len() {
                for b in 0..tree.len() {
                    prop_assert_eq!(
                        relation.satisfies(&tree, a, b).unwrap(),
                        inverse.satisfies(&tree, b, a).unwrap(),
                        "{} between {} and {}", relation.symbol(), a, b
                    );
                }
            }
        }
    }

    #[test]
    fn search_finds_exactly_the_satisfying_nodes(tree in tree()) {
        for relation in relations() {
            for pivot in 0..tree.len() {
                let mut found: Vec<_> = relation.search(&tree, pivot).unwrap().collect();
                found.sort_unstable();
                found.dedup();
                let expected: Vec<_> = (0..tree.len())
                    .filter(|&n| relation.satisfies(&tree, pivot, n).unwrap())
                    .collect();
                prop_assert_eq!(found, expected, "{} from {}", relation.symbol(), pivot);
            }
        }
    }

    #[test]
    fn precedence_searches_follow_document_order(tree in tree()) {
        let mut rank = vec![0; tree.len()];
        for (i, node) in tree.preorder(tree.root()).enumerate() {
            rank[node] = i;
        }
        for relation in [Relation::Precedes, Relation::Follows] {
            for pivot in 0..tree.len() {
                let ranks: Vec<_> = relation.search(&tree, pivot).unwrap().map(|n| rank[n]).collect();
                prop_assert!(
                    ranks.windows(2).all(|w| w[0] < w[1]),
                    "{} from {}: {:?}", relation.symbol(), pivot, ranks
                );
            }
        }
    }

    #[test]
    fn brackets_round_trip(tree in tree()) {
        let text = tree.to_string();
        let parsed = parse_trees(&text).unwrap();
        prop_assert_eq!(parsed.len(), 1);
        prop_assert_eq!(&parsed[0], &tree);
        prop_assert_eq!(parsed[0].to_string(), text);
    }

    #[test]
    fn second_evaluation_is_memoized(forest in prop::collection::vec(tree(), 1..4)) {
        let mut counter = Counter::new("random", None, &[]).unwrap();
        counter.determine_all_values(&forest).unwrap();
        let values = counter.all_values(4);
        let searches = counter.pattern_searches();

        counter.determine_all_values(&forest).unwrap();
        prop_assert_eq!(counter.all_values(4), values);
        prop_assert_eq!(counter.pattern_searches(), searches);
    }

    #[test]
    fn final_values_ignore_selection_order(
        forest in prop::collection::vec(tree(), 1..3),
        order in Just(default_measures()).prop_shuffle(),
    ) {
        let mut ordered = Counter::new("x", None, &[]).unwrap();
        let mut shuffled = Counter::new("x", Some(order), &[]).unwrap();
        ordered.determine_all_values(&forest).unwrap();
        shuffled.determine_all_values(&forest).unwrap();

        for name in default_measures() {
            prop_assert_eq!(
                ordered.value(&name, None).unwrap(),
                shuffled.value(&name, None).unwrap()
            );
        }
    }

    #[test]
    fn combining_sums_terminals_and_reevaluates_expressions(
        a in prop::array::uniform4(0u16..50),
        b in prop::array::uniform4(0u16..50),
    ) {
        let definitions = vec![
            pattern_definition("A", "NP"),
            pattern_definition("B", "VP"),
            UserDefinition {
                name: "P".to_string(),
                description: None,
                tregex_pattern: None,
                value_source: Some("A * B".to_string()),
            },
        ];
        let selected = Some(vec!["W".to_string(), "S".to_string(), "P".to_string(), "MLS".to_string()]);
        let counter = |id: &str, values: [u16; 4]| {
            let mut counter = Counter::new(id, selected.clone(), &definitions).unwrap();
            for (name, value) in ["W", "S", "A", "B"].iter().zip(values) {
                counter.set_value(name, f64::from(value)).unwrap();
            }
            counter.determine_all_values(&[]).unwrap();
            counter
        };
        let (left, right) = (counter("l", a), counter("r", b));
        let merged = left.combine(&right).unwrap();

        for (i, name) in ["W", "S", "A", "B"].iter().enumerate() {
            prop_assert_eq!(merged.value(name, None).unwrap(), Some(f64::from(a[i]) + f64::from(b[i])));
        }
        let sum = |i: usize| f64::from(a[i]) + f64::from(b[i]);
        prop_assert_eq!(merged.value("P", None).unwrap(), Some(sum(2) * sum(3)));
        let mls = if sum(1) == 0.0 { 0.0 } else { sum(0) / sum(1) };
        prop_assert_eq!(merged.value("MLS", None).unwrap(), Some(mls));
    }

    #[test]
    fn division_by_zero_is_zero(x in -1.0e6f64..1.0e6, y in -100i32..100) {
        let lookup = |name: &str| match name {
            "X" => Ok::<_, ()>(x),
            _ => Ok(f64::from(y)),
        };
        prop_assert_eq!(Expression::parse("X / 0").unwrap().evaluate(lookup), Ok(0.0));
        prop_assert_eq!(Expression::parse("X / (Y - Y)").unwrap().evaluate(lookup), Ok(0.0));
        prop_assert_eq!(Expression::parse("1 + X / 0.0").unwrap().evaluate(lookup), Ok(1.0));
    }

    #[test]
    fn cycles_of_any_length_are_detected(length in 1usize..6) {
        let names: Vec<String> = (0..length).map(|i| format!("N{i}")).collect();
        let definitions: Vec<UserDefinition> = (0..length)
            .map(|i| UserDefinition {
                name: names[i].clone(),
                description: None,
                tregex_pattern: None,
                value_source: Some(format!("{} + 1", names[(i + 1) % length])),
            })
            .collect();

        let mut counter = Counter::new("cycle", Some(vec!["N0".to_string()]), &definitions).unwrap();
        match counter.determine_all_values(&[]) {
            Err(CounterError::CircularDefinition { chain }) => {
                prop_assert_eq!(chain.len(), length);
                prop_assert_eq!(&chain[0], &format!("N0 = N{} + 1", 1 % length));
            }
            other => prop_assert!(false, "expected a cycle, got {:?}", other),
        }
        for name in &names {
            prop_assert_eq!(counter.value(name, None).unwrap(), None);
        }
    }
}

fn default_measures() -> Vec<String> {
    Counter::new("", None, &[]).unwrap().selected().to_vec()
}

fn pattern_definition(name: &str, pattern: &str) -> UserDefinition {
    UserDefinition {
        name: name.to_string(),
        description: None,
        tregex_pattern: Some(pattern.to_string()),
        value_source: None,
    }
}
