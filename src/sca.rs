//! Syntactic complexity analysis driver
//!
//! Takes each input unit through parsing, querying and export:
//!
//! ```text
//! Unparsed -> Parsed -> Queried -> Exported
//! ```
//!
//! Parsing goes through a [`TreeParser`]; the bundled [`BracketedInput`]
//! accepts text that is already bracketed. A file's parse can be cached as
//! `<stem>.parsed` and is reused while it is non-empty and newer than the
//! input. A unit that fails is recorded and the batch moves on.

use crate::bracket::{MalformedTreeError, parse_trees};
use crate::counter::{Counter, CounterError, DEFAULT_PRECISION};
use crate::inputs::{InputUnit, read_file};
use crate::output::OutputFormat;
use crate::structure::{Catalog, StructureError, load_user_definitions};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Identifier of text given directly rather than read from a file
pub const TEXT_IDENTIFIER: &str = "cmdline_text";

const CACHE_EXTENSION: &str = "parsed";

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("Parser failed: {0}")]
    Failed(String),

    #[error("Parser I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ScaError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write parse cache {}: {source}", .path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    MalformedTree(#[from] MalformedTreeError),

    #[error(transparent)]
    Counter(#[from] CounterError),

    #[error(transparent)]
    Structure(#[from] StructureError),
}

/// How the parser treats line breaks when splitting sentences
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum NewlinePolicy {
    /// Line breaks are ordinary whitespace
    #[default]
    Never,
    /// Every line break ends a sentence
    Always,
    /// Two or more consecutive line breaks end a sentence
    TwoOrMore,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Sentences longer than this are not parsed
    pub max_sentence_length: Option<usize>,
    pub newline_policy: NewlinePolicy,
}

/// Turns raw text into bracketed trees
pub trait TreeParser {
    fn parse(&self, text: &str, options: &ParseOptions) -> Result<String, ParserError>;
}

/// Input that is already in bracket notation
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketedInput;

impl TreeParser for BracketedInput {
    fn parse(&self, text: &str, _options: &ParseOptions) -> Result<String, ParserError> {
        Ok(text.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Unparsed,
    Parsed,
    Queried,
    Exported,
}

#[derive(Debug)]
pub enum Event<'a> {
    State { unit: &'a str, state: UnitState },
    CacheHit { unit: &'a str, cache: &'a Path },
    Failed { unit: &'a str, error: &'a ScaError },
    Cancelled { remaining: usize },
}

/// Receives progress and diagnostics from the driver
pub trait Reporter {
    fn report(&self, event: Event<'_>);
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn report(&self, event: Event<'_>) {
        (**self).report(event)
    }
}

/// Forwards driver events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: Event<'_>) {
        match event {
            Event::State { unit, state } => tracing::debug!(unit, ?state, "Unit state changed"),
            Event::CacheHit { unit, cache } => {
                tracing::info!(unit, cache = %cache.display(), "Reusing cached parse")
            }
            Event::Failed { unit, error } => tracing::warn!(unit, error = %error, "Unit failed"),
            Event::Cancelled { remaining } => tracing::warn!(remaining, "Batch cancelled"),
        }
    }
}

/// Where matched spans are written after querying
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MatchDump {
    #[default]
    None,
    Stdout,
    Directory(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ScaConfig {
    /// Decimal places in reported values
    pub precision: u32,
    /// Measures to report; the catalog's defaults when `None`
    pub selected_measures: Option<Vec<String>>,
    /// JSON file of extra structure definitions
    pub user_definitions: Option<PathBuf>,
    /// Directory for `.parsed` files; next to each input when `None`
    pub cache_dir: Option<PathBuf>,
    pub reuse_cache: bool,
    pub write_cache: bool,
    /// Count all inputs together as one unit
    pub combine: bool,
    pub parse_options: ParseOptions,
    pub output_format: OutputFormat,
    pub match_dump: MatchDump,
}

impl Default for ScaConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            selected_measures: None,
            user_definitions: None,
            cache_dir: None,
            reuse_cache: true,
            write_cache: false,
            combine: false,
            parse_options: ParseOptions::default(),
            output_format: OutputFormat::default(),
            match_dump: MatchDump::None,
        }
    }
}

#[derive(Debug)]
pub struct UnitFailure {
    pub unit: String,
    pub error: ScaError,
}

/// Outcome of a batch: counters for units that succeeded, failures for the rest
#[derive(Debug, Default)]
pub struct BatchReport {
    pub counters: Vec<Counter>,
    pub failures: Vec<UnitFailure>,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

pub struct ScaAnalyzer<P, R> {
    config: ScaConfig,
    catalog: Arc<Catalog>,
    parser: P,
    reporter: R,
}

impl<P: TreeParser, R: Reporter> ScaAnalyzer<P, R> {
    /// Load the catalog and check the selected measures before any input is read
    pub fn new(config: ScaConfig, parser: P, reporter: R) -> Result<Self, ScaError> {
        let builtin = Catalog::builtin()?;
        let catalog = match &config.user_definitions {
            Some(path) => {
                let definitions = load_user_definitions(path)?;
                Arc::new(builtin.with_user_definitions(&definitions)?)
            }
            None => builtin,
        };
        Counter::with_catalog("", Arc::clone(&catalog), config.selected_measures.clone())?;

        Ok(Self {
            config,
            catalog,
            parser,
            reporter,
        })
    }

    pub fn config(&self) -> &ScaConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    fn counter(&self, identifier: &str) -> Result<Counter, ScaError> {
        Ok(Counter::with_catalog(
            identifier,
            Arc::clone(&self.catalog),
            self.config.selected_measures.clone(),
        )?)
    }

    fn state(&self, unit: &str, state: UnitState) {
        self.reporter.report(Event::State { unit, state });
    }

    /// Analyse text given directly; the first error is returned
    pub fn analyze_text(&self, text: &str) -> Result<Counter, ScaError> {
        self.state(TEXT_IDENTIFIER, UnitState::Unparsed);
        let trees = self.parser.parse(text, &self.config.parse_options)?;
        self.state(TEXT_IDENTIFIER, UnitState::Parsed);

        let counter = self.query(TEXT_IDENTIFIER, &trees)?;
        self.export(&counter)?;
        Ok(counter)
    }

    pub fn analyze_file(&self, path: &Path) -> Result<Counter, ScaError> {
        let counter = self.query_file(path)?;
        self.export(&counter)?;
        Ok(counter)
    }

    /// Analyse each file on its own, then fold the counters left to right
    pub fn analyze_combined(&self, paths: &[PathBuf]) -> Result<Counter, ScaError> {
        let mut total = self.counter("")?;
        for path in paths {
            let counter = self.query_file(path)?;
            total = total.combine(&counter)?;
        }
        self.export(&total)?;
        Ok(total)
    }

    pub fn analyze_unit(&self, unit: &InputUnit) -> Result<Counter, ScaError> {
        match unit {
            InputUnit::File(path) => self.analyze_file(path),
            InputUnit::Combined(paths) => self.analyze_combined(paths),
            InputUnit::Text(text) => self.analyze_text(text),
        }
    }

    /// Analyse every unit, recording failures instead of stopping
    ///
    /// `cancel` is checked before each unit.
    pub fn analyze_batch(&self, units: &[InputUnit], cancel: Option<&AtomicBool>) -> BatchReport {
        let mut report = BatchReport::default();
        for (i, unit) in units.iter().enumerate() {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                self.reporter.report(Event::Cancelled {
                    remaining: units.len() - i,
                });
                report.cancelled = true;
                break;
            }

            match self.analyze_unit(unit) {
                Ok(counter) => report.counters.push(counter),
                Err(error) => {
                    let unit = unit.identifier();
                    self.reporter.report(Event::Failed {
                        unit: &unit,
                        error: &error,
                    });
                    report.failures.push(UnitFailure { unit, error });
                }
            }
        }
        report
    }

    fn query_file(&self, path: &Path) -> Result<Counter, ScaError> {
        let identifier = path.display().to_string();
        self.state(&identifier, UnitState::Unparsed);
        let trees = self.parsed_text(&identifier, path)?;
        self.state(&identifier, UnitState::Parsed);
        self.query(&identifier, &trees)
    }

    fn query(&self, identifier: &str, trees: &str) -> Result<Counter, ScaError> {
        let forest = parse_trees(trees)?;
        let mut counter = self.counter(identifier)?;
        counter.determine_all_values(&forest)?;
        self.state(identifier, UnitState::Queried);
        Ok(counter)
    }

    fn export(&self, counter: &Counter) -> Result<(), ScaError> {
        match &self.config.match_dump {
            MatchDump::None => return Ok(()),
            MatchDump::Stdout => counter.dump_matches(None)?,
            MatchDump::Directory(dir) => counter.dump_matches(Some(dir))?,
        }
        self.state(counter.identifier(), UnitState::Exported);
        Ok(())
    }

    /// `<stem>.parsed` in the cache directory, or next to the input
    pub fn cache_path(&self, input: &Path) -> PathBuf {
        let stem = input.file_stem().unwrap_or(input.as_os_str());
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(CACHE_EXTENSION);
        match &self.config.cache_dir {
            Some(dir) => dir.join(name),
            None => input.with_file_name(name),
        }
    }

    fn parsed_text(&self, identifier: &str, path: &Path) -> Result<String, ScaError> {
        let cache = self.cache_path(path);
        if self.config.reuse_cache && is_fresh(&cache, path) {
            self.reporter.report(Event::CacheHit {
                unit: identifier,
                cache: &cache,
            });
            return read_file(&cache).map_err(|source| ScaError::Read {
                path: cache.clone(),
                source,
            });
        }

        let text = read_file(path).map_err(|source| ScaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let trees = self.parser.parse(&text, &self.config.parse_options)?;

        if self.config.write_cache {
            let write = || -> io::Result<()> {
                if let Some(dir) = cache.parent() {
                    fs::create_dir_all(dir)?;
                }
                fs::write(&cache, &trees)
            };
            write().map_err(|source| ScaError::Cache {
                path: cache.clone(),
                source,
            })?;
        }
        Ok(trees)
    }
}

/// A cache is usable when it is non-empty and modified after the input
fn is_fresh(cache: &Path, input: &Path) -> bool {
    let (Ok(cached), Ok(source)) = (fs::metadata(cache), fs::metadata(input)) else {
        return false;
    };
    if !cached.is_file() || cached.len() == 0 {
        return false;
    }
    match (cached.modified(), source.modified()) {
        (Ok(cached), Ok(source)) => cached > source,
        _ => false,
    }
}
