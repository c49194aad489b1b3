use anyhow::{Context, bail};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use synmetrics::inputs::{expand_globs, units_from_paths};
use synmetrics::output::{OutputFormat, write_counters};
use synmetrics::sca::{MatchDump, NewlinePolicy, ParseOptions};
use synmetrics::{BracketedInput, Catalog, ScaAnalyzer, ScaConfig, TracingReporter};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Exit code when some inputs failed and the rest were reported
const PARTIAL_SUCCESS: u8 = 10;

#[derive(Parser, Debug)]
#[command(
    name = "synmetrics",
    version,
    about = "Count syntactic structures and complexity measures in parsed text"
)]
struct Cli {
    /// Input files or glob patterns of bracketed parses
    inputs: Vec<String>,

    /// Analyse this text instead of files
    #[arg(short, long, conflicts_with = "inputs")]
    text: Option<String>,

    /// Measures to report, comma separated
    #[arg(short, long, value_delimiter = ',')]
    measures: Option<Vec<String>>,

    /// JSON file with extra structure definitions
    #[arg(long)]
    definitions: Option<PathBuf>,

    /// Report all inputs as a single combined row
    #[arg(short, long)]
    combine: bool,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Decimal places in reported values
    #[arg(long, default_value_t = synmetrics::counter::DEFAULT_PRECISION)]
    precision: u32,

    /// Save matched spans under this directory
    #[arg(long, conflicts_with = "print_matches")]
    matches_dir: Option<PathBuf>,

    /// Print matched spans to stdout; the report then goes to --output
    #[arg(long, requires = "output")]
    print_matches: bool,

    /// Directory for cached parses
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Ignore cached parses
    #[arg(long)]
    no_cache: bool,

    /// Write parses to the cache
    #[arg(long)]
    keep_parsed: bool,

    /// Longest sentence passed to the parser
    #[arg(long)]
    max_length: Option<usize>,

    #[arg(long, value_enum, default_value_t = NewlinePolicy::Never)]
    newline_break: NewlinePolicy,

    /// List the available structures and exit
    #[arg(long)]
    list: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn config(&self) -> ScaConfig {
        let match_dump = match (&self.matches_dir, self.print_matches) {
            (Some(dir), _) => MatchDump::Directory(dir.clone()),
            (None, true) => MatchDump::Stdout,
            (None, false) => MatchDump::None,
        };
        ScaConfig {
            precision: self.precision,
            selected_measures: self.measures.clone(),
            user_definitions: self.definitions.clone(),
            cache_dir: self.cache_dir.clone(),
            reuse_cache: !self.no_cache,
            write_cache: self.keep_parsed,
            combine: self.combine,
            parse_options: ParseOptions {
                max_sentence_length: self.max_length,
                newline_policy: self.newline_break,
            },
            output_format: self.format,
            match_dump,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let config = cli.config();
    if cli.list {
        let analyzer = ScaAnalyzer::new(config, BracketedInput, TracingReporter)?;
        list_structures(analyzer.catalog())?;
        return Ok(ExitCode::SUCCESS);
    }

    let (precision, format, combine) = (config.precision, config.output_format, config.combine);
    let analyzer = ScaAnalyzer::new(config, BracketedInput, TracingReporter)
        .context("Invalid configuration")?;

    let (counters, failed) = match &cli.text {
        Some(text) => (vec![analyzer.analyze_text(text)?], false),
        None => {
            let paths = expand_globs(cli.inputs.as_slice()).context("Invalid input pattern")?;
            if paths.is_empty() {
                bail!("No input files found");
            }
            let units = units_from_paths(paths, combine);
            tracing::info!(units = units.len(), "Analysing");

            let report = analyzer.analyze_batch(&units, None);
            for failure in &report.failures {
                tracing::error!(unit = %failure.unit, error = %failure.error, "Failed");
            }
            let failed = !report.failures.is_empty();
            (report.counters, failed)
        }
    };

    match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Cannot create {}", path.display()))?;
            write_counters(BufWriter::new(file), &counters, format, precision)?;
            tracing::info!(path = %path.display(), rows = counters.len(), "Saved");
        }
        None => write_counters(io::stdout().lock(), &counters, format, precision)?,
    }

    Ok(if failed {
        ExitCode::from(PARTIAL_SUCCESS)
    } else {
        ExitCode::SUCCESS
    })
}

fn list_structures(catalog: &Catalog) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for structure in catalog.structures() {
        let description = structure.description.as_deref().unwrap_or("");
        writeln!(out, "{}\t{}\t{}", structure.name, description, structure.source())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printed_matches_need_an_output_file() {
        let error = Cli::try_parse_from(["synmetrics", "--print-matches", "a.txt"]).unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let cli =
            Cli::try_parse_from(["synmetrics", "--print-matches", "-o", "out.csv", "a.txt"]).unwrap();
        assert!(matches!(cli.config().match_dump, MatchDump::Stdout));
    }

    #[test]
    fn test_match_directory_and_printing_conflict() {
        let error = Cli::try_parse_from([
            "synmetrics",
            "--print-matches",
            "--matches-dir",
            "m",
            "-o",
            "out.csv",
        ])
        .unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_measures_are_comma_separated() {
        let cli = Cli::try_parse_from(["synmetrics", "-m", "W,MLS,C/S", "a.txt"]).unwrap();
        assert_eq!(
            cli.config().selected_measures,
            Some(vec!["W".to_string(), "MLS".to_string(), "C/S".to_string()])
        );
    }
}
