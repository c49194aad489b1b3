use std::fs;
use synmetrics::inputs::{expand_globs, units_from_paths};
use synmetrics::output::{OutputFormat, write_counters};
use synmetrics::relation::RelationError;
use synmetrics::structure::parse_user_definitions;
use synmetrics::{
    BracketedInput, Counter, CounterError, PatternError, Relation, ScaAnalyzer, ScaConfig,
    TracingReporter, TregexPattern, parse_trees,
};

const THERE_WAS: &str = "(ROOT (S (NP (EX There)) (VP (VBD was) (NP (NP (DT no) (NN possibility)) (PP (IN of) (S (VP (VBG taking) (NP (DT a) (NN walk)) (NP (DT that) (NN day)))))))) (. .))";

#[test]
fn canonical_sentence_counts() {
    let forest = parse_trees(THERE_WAS).unwrap();
    let mut counter = Counter::new("there_was", None, &[]).unwrap();
    counter.determine_all_values(&forest).unwrap();

    let expected = [
        ("S", 1.0),
        ("VP", 2.0),
        ("C", 1.0),
        ("T", 1.0),
        ("DC", 0.0),
        ("CT", 0.0),
        ("CP", 0.0),
        ("CN", 1.0),
        ("W", 10.0),
        ("MLT", 10.0),
        ("DC/C", 0.0),
    ];
    for (name, value) in expected {
        assert_eq!(counter.value(name, None).unwrap(), Some(value), "{name}");
    }
}

#[test]
fn verb_phrase_under_clause() {
    let pattern = TregexPattern::compile("VP > S|SINV|SQ").unwrap();
    for (text, count) in [("(S VP)", 1), ("(SINV VP)", 1), ("(SQ VP)", 1), ("(NULL VP)", 0)] {
        let forest = parse_trees(text).unwrap();
        assert_eq!(pattern.count_forest(&forest), count, "{text}");
    }
}

#[test]
fn subtraction_clears_matches() {
    let definitions = parse_user_definitions(
        r#"[{"name": "A", "tregex_pattern": "NP"},
            {"name": "B", "tregex_pattern": "VP"},
            {"name": "D", "value_source": "A - B"},
            {"name": "E", "value_source": "A + B"}]"#,
    )
    .unwrap();
    let mut counter = Counter::new("x", Some(vec!["D".into(), "E".into()]), &definitions).unwrap();
    counter.set_value("A", 2.0).unwrap();
    counter.set_matches("A", vec!["x".into(), "y".into()]).unwrap();
    counter.set_value("B", 1.0).unwrap();
    counter.set_matches("B", vec!["z".into()]).unwrap();
    counter.determine_all_values(&[]).unwrap();

    assert_eq!(counter.value("D", None).unwrap(), Some(1.0));
    assert!(counter.matches("D").unwrap().is_empty());
    assert_eq!(counter.value("E", None).unwrap(), Some(3.0));
    assert_eq!(counter.matches("E").unwrap(), ["x", "y", "z"]);
}

#[test]
fn combined_counters_keep_every_match() {
    let template = Counter::new("", None, &[]).unwrap();
    let mut first = template.empty_like("first");
    let mut second = template.empty_like("second");
    first.set_value("VP1", 5.0).unwrap();
    first.set_matches("VP1", vec!["a".into(); 5]).unwrap();
    second.set_value("VP1", 4.0).unwrap();
    second.set_matches("VP1", vec!["a".into(); 4]).unwrap();

    let merged = first.combine(&second).unwrap();
    assert_eq!(merged.value("VP1", None).unwrap(), Some(9.0));
    assert_eq!(merged.matches("VP1").unwrap().len(), 9);
    assert_eq!(merged.identifier(), "first+second");
}

#[test]
fn zeroth_child_is_an_error() {
    let tree = parse_trees("(S (NP (NN a)) (VP (VB b)))").unwrap().remove(0);
    let relation = Relation::IthChildOf(0);

    assert_eq!(relation.satisfies(&tree, 1, 0), Err(RelationError::InvalidIndex(0)));
    assert!(matches!(relation.search(&tree, 1), Err(RelationError::InvalidIndex(0))));
    assert!(matches!(
        TregexPattern::compile("NP >0 S"),
        Err(PatternError::Relation(RelationError::InvalidIndex(0)))
    ));
}

#[test]
fn three_structure_cycle() {
    let definitions = parse_user_definitions(
        r#"[{"name": "A", "value_source": "B"},
            {"name": "B", "value_source": "C"},
            {"name": "C", "value_source": "A"}]"#,
    )
    .unwrap();
    let mut counter = Counter::new("x", Some(vec!["A".into()]), &definitions).unwrap();
    let error = counter.determine_all_values(&[]).unwrap_err();

    assert!(matches!(error, CounterError::CircularDefinition { .. }));
    let message = error.to_string();
    let positions: Vec<_> = ["A = B", "B = C", "C = A"]
        .iter()
        .map(|pair| message.find(pair).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{message}");
}

#[test]
fn batch_to_csv() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("one.txt"), THERE_WAS).unwrap();
    fs::write(dir.path().join("two.txt"), format!("{THERE_WAS}\n\n{THERE_WAS}")).unwrap();
    fs::write(dir.path().join("broken.txt"), "(ROOT (S").unwrap();

    let pattern = format!("{}/*.txt", dir.path().display());
    let units = units_from_paths(expand_globs(&[pattern]).unwrap(), false);
    assert_eq!(units.len(), 3);

    let config = ScaConfig {
        selected_measures: Some(vec!["W".into(), "S".into(), "MLS".into()]),
        ..ScaConfig::default()
    };
    let analyzer = ScaAnalyzer::new(config, BracketedInput, TracingReporter).unwrap();
    let report = analyzer.analyze_batch(&units, None);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].unit.ends_with("broken.txt"));

    let mut out = Vec::new();
    write_counters(&mut out, &report.counters, OutputFormat::Csv, 4).unwrap();
    let csv = String::from_utf8(out).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines[0], "Filepath,W,S,MLS");
    assert!(lines[1].ends_with("one.txt,10.0000,1.0000,10.0000"));
    assert!(lines[2].ends_with("two.txt,20.0000,2.0000,10.0000"));
}

#[test]
fn combined_batch_is_one_row() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, THERE_WAS).unwrap();
    fs::write(&b, "(ROOT (S (NP (PRP It)) (VP (VBD rained)) (. .)))").unwrap();

    let analyzer = ScaAnalyzer::new(ScaConfig::default(), BracketedInput, TracingReporter).unwrap();
    let report = analyzer.analyze_batch(&units_from_paths(vec![a, b], true), None);

    assert!(report.is_success());
    assert_eq!(report.counters.len(), 1);
    let counter = &report.counters[0];
    assert_eq!(counter.value("S", None).unwrap(), Some(2.0));
    assert_eq!(counter.value("MLS", None).unwrap(), Some(6.0));
    assert_eq!(counter.value("C/S", Some(4)).unwrap(), Some(1.0));
}
