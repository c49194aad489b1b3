//! Count the L2SCA measures for a few parsed sentences and print them as CSV
//!
//! Run with `cargo run --example sca_counts`.

use std::io;
use synmetrics::output::{OutputFormat, write_counters};
use synmetrics::{BracketedInput, ScaAnalyzer, ScaConfig, TracingReporter, TregexPattern, parse_trees};

const TEXT: &str = "
(ROOT (S (NP (EX There)) (VP (VBD was) (NP (NP (DT no) (NN possibility)) (PP (IN of) (S (VP (VBG taking) (NP (DT a) (NN walk)) (NP (DT that) (NN day)))))))) (. .))

(ROOT (S (NP (PRP I)) (VP (VBD knew) (SBAR (IN that) (S (NP (PRP he)) (VP (MD would) (VP (VB come))))))) (. .))
";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    // A single pattern over the forest
    let forest = parse_trees(TEXT)?;
    let pattern = TregexPattern::compile("NP < (DT $+ NN)")?;
    for span in pattern.find_spans(&forest) {
        println!("NP: {span}");
    }
    println!();

    // The full measure set
    let analyzer = ScaAnalyzer::new(ScaConfig::default(), BracketedInput, TracingReporter)?;
    let counter = analyzer.analyze_text(TEXT)?;
    write_counters(io::stdout().lock(), &[counter], OutputFormat::Csv, 4)?;
    Ok(())
}
