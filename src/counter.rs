//! Per-text structure counts
//!
//! A [`Counter`] holds the values and matched spans of the structures selected
//! for one input (a file, a combined group of files, or a piece of text).
//! Values are computed on demand and memoised: pattern structures search the
//! forest once, expression structures resolve their names recursively and
//! then evaluate. Counters for separate inputs can be combined by summing
//! their pattern counts and re-evaluating the expressions.

use crate::expression::ExpressionError;
use crate::structure::{Catalog, Definition, Structure, StructureError, UserDefinition};
use crate::tree::Tree;
use rustc_hash::FxHashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_PRECISION: u32 = 4;

/// Column holding the counter's identifier in [`Counter::all_values`]
pub const IDENTIFIER_FIELD: &str = "Filepath";

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("Structure not found: {0}")]
    StructureNotFound(String),

    #[error("Circular definition: {}", .chain.join(", "))]
    CircularDefinition { chain: Vec<String> },

    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error("Failed to write matches: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Default)]
struct Slot {
    value: Option<f64>,
    matches: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Counter {
    identifier: String,
    catalog: Arc<Catalog>,
    selected: Vec<String>,
    slots: FxHashMap<String, Slot>,
    searches: usize,
}

impl Counter {
    /// Counter over the built-in catalog, optionally extended by user
    /// definitions; `selected` defaults to the catalog's default measures
    pub fn new(
        identifier: &str,
        selected: Option<Vec<String>>,
        user_definitions: &[UserDefinition],
    ) -> Result<Self, CounterError> {
        let builtin = Catalog::builtin()?;
        let catalog = if user_definitions.is_empty() {
            builtin
        } else {
            Arc::new(builtin.with_user_definitions(user_definitions)?)
        };
        Self::with_catalog(identifier, catalog, selected)
    }

    /// Counter sharing an already loaded catalog
    pub fn with_catalog(
        identifier: &str,
        catalog: Arc<Catalog>,
        selected: Option<Vec<String>>,
    ) -> Result<Self, CounterError> {
        let selected = selected.unwrap_or_else(|| catalog.default_measures().to_vec());
        if let Some(missing) = selected.iter().find(|name| !catalog.contains(name)) {
            return Err(CounterError::StructureNotFound(missing.clone()));
        }
        Ok(Self {
            identifier: identifier.to_string(),
            catalog,
            selected,
            slots: FxHashMap::default(),
            searches: 0,
        })
    }

    /// A counter with the same catalog and selection but no values
    pub fn empty_like(&self, identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            catalog: Arc::clone(&self.catalog),
            selected: self.selected.clone(),
            slots: FxHashMap::default(),
            searches: 0,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    /// Number of pattern searches run so far
    pub fn pattern_searches(&self) -> usize {
        self.searches
    }

    pub fn structure(&self, name: &str) -> Result<&Structure, CounterError> {
        self.catalog
            .get(name)
            .ok_or_else(|| CounterError::StructureNotFound(name.to_string()))
    }

    pub fn set_value(&mut self, name: &str, value: f64) -> Result<(), CounterError> {
        self.structure(name)?;
        self.slots.entry(name.to_string()).or_default().value = Some(value);
        Ok(())
    }

    /// Stored value, rounded half away from zero when `precision` is given
    pub fn value(&self, name: &str, precision: Option<u32>) -> Result<Option<f64>, CounterError> {
        self.structure(name)?;
        let value = self.slots.get(name).and_then(|slot| slot.value);
        Ok(match precision {
            Some(digits) => value.map(|v| round(v, digits)),
            None => value,
        })
    }

    pub fn set_matches(&mut self, name: &str, matches: Vec<String>) -> Result<(), CounterError> {
        self.structure(name)?;
        self.slots.entry(name.to_string()).or_default().matches = matches;
        Ok(())
    }

    pub fn matches(&self, name: &str) -> Result<&[String], CounterError> {
        self.structure(name)?;
        Ok(self.slots.get(name).map_or(&[][..], |slot| &slot.matches))
    }

    /// Compute every selected measure over `forest`
    pub fn determine_all_values(&mut self, forest: &[Tree]) -> Result<(), CounterError> {
        for name in self.selected.clone() {
            self.determine_value(&name, forest)?;
        }
        Ok(())
    }

    /// Value of one structure, computing it and its dependencies if needed
    pub fn determine_value(&mut self, name: &str, forest: &[Tree]) -> Result<f64, CounterError> {
        let mut ancestors = Vec::new();
        self.determine(name, forest, &mut ancestors)
    }

    fn determine(
        &mut self,
        name: &str,
        forest: &[Tree],
        ancestors: &mut Vec<(String, String)>,
    ) -> Result<f64, CounterError> {
        if let Some(value) = self.slots.get(name).and_then(|slot| slot.value) {
            return Ok(value);
        }

        let catalog = Arc::clone(&self.catalog);
        let structure = catalog
            .get(name)
            .ok_or_else(|| CounterError::StructureNotFound(name.to_string()))?;

        let slot = match &structure.definition {
            Definition::Pattern(pattern) => {
                self.searches += 1;
                let matches = pattern.find_spans(forest);
                Slot {
                    value: Some(matches.len() as f64),
                    matches,
                }
            }
            Definition::Scan(regex) => {
                let words = forest
                    .iter()
                    .map(|tree| regex.find_iter(&tree.to_string()).count())
                    .sum::<usize>();
                Slot {
                    value: Some(words as f64),
                    matches: Vec::new(),
                }
            }
            Definition::Expression(expression) => {
                if let Some(start) = ancestors.iter().position(|(n, _)| n == name) {
                    let chain = ancestors[start..]
                        .iter()
                        .map(|(n, source)| format!("{n} = {source}"))
                        .collect();
                    return Err(CounterError::CircularDefinition { chain });
                }

                ancestors.push((name.to_string(), expression.source().to_string()));
                for dependency in expression.names() {
                    self.determine(dependency, forest, ancestors)?;
                }
                ancestors.pop();

                let value = expression.evaluate(|dependency| {
                    self.slots
                        .get(dependency)
                        .and_then(|slot| slot.value)
                        .ok_or_else(|| CounterError::StructureNotFound(dependency.to_string()))
                })?;
                let matches = if expression.is_additive() {
                    expression
                        .names()
                        .into_iter()
                        .flat_map(|dependency| self.slots.get(dependency))
                        .flat_map(|slot| slot.matches.iter().cloned())
                        .collect()
                } else {
                    Vec::new()
                };
                Slot {
                    value: Some(value),
                    matches,
                }
            }
        };

        let value = slot.value.unwrap_or_default();
        self.slots.insert(name.to_string(), slot);
        Ok(value)
    }

    /// Sum of two counters over the same catalog
    ///
    /// Terminal values are added (a missing value counts as 0) and their
    /// matches concatenated; expressions are then evaluated again over the
    /// summed values.
    pub fn combine(&self, other: &Counter) -> Result<Counter, CounterError> {
        let identifier = if self.identifier.is_empty() {
            other.identifier.clone()
        } else {
            format!("{}+{}", self.identifier, other.identifier)
        };
        let mut combined = self.empty_like(&identifier);
        combined.searches = self.searches + other.searches;

        let mut derived = Vec::new();
        for structure in self.catalog.structures() {
            let name = structure.name.as_str();
            let (a, b) = (self.slots.get(name), other.slots.get(name));
            if a.is_none() && b.is_none() {
                continue;
            }
            if !structure.is_terminal() {
                derived.push(name);
                continue;
            }

            let value = |slot: Option<&Slot>| slot.and_then(|s| s.value).unwrap_or_default();
            let matches = a
                .into_iter()
                .chain(b)
                .flat_map(|slot| slot.matches.iter().cloned())
                .collect();
            combined.slots.insert(
                name.to_string(),
                Slot {
                    value: Some(value(a) + value(b)),
                    matches,
                },
            );
        }

        for name in derived {
            combined.determine_value(name, &[])?;
        }
        combined.determine_all_values(&[])?;
        Ok(combined)
    }

    /// Fold counters left to right onto `accumulator`
    pub fn merge_all(
        accumulator: Counter,
        counters: impl IntoIterator<Item = Counter>,
    ) -> Result<Counter, CounterError> {
        counters
            .into_iter()
            .try_fold(accumulator, |total, counter| total.combine(&counter))
    }

    /// Selected measures as `(field, value)` pairs, identifier first
    ///
    /// Values carry exactly `precision` decimals; missing values are empty strings.
    pub fn all_values(&self, precision: u32) -> Vec<(String, String)> {
        let mut fields = Vec::with_capacity(self.selected.len() + 1);
        fields.push((IDENTIFIER_FIELD.to_string(), self.identifier.clone()));
        for name in &self.selected {
            let value = self
                .slots
                .get(name)
                .and_then(|slot| slot.value)
                .map(|v| format_value(v, precision))
                .unwrap_or_default();
            fields.push((name.clone(), value));
        }
        fields
    }

    /// Write one block per structure with matches
    pub fn write_matches(&self, out: &mut impl Write) -> io::Result<()> {
        for structure in self.catalog.structures() {
            let matches = match self.slots.get(&structure.name) {
                Some(slot) if !slot.matches.is_empty() => &slot.matches,
                _ => continue,
            };
            write_block(out, structure, matches)?;
        }
        Ok(())
    }

    /// Save matches as `<dir>/<stem>/<stem>-<structure>.txt`, or print them
    /// to stdout when `dir` is `None`
    pub fn dump_matches(&self, dir: Option<&Path>) -> Result<(), CounterError> {
        let Some(dir) = dir else {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            self.write_matches(&mut out)?;
            return Ok(());
        };

        let stem = self.stem();
        let subdir = dir.join(&stem);
        fs::create_dir_all(&subdir)?;
        for structure in self.catalog.structures() {
            let matches = match self.slots.get(&structure.name) {
                Some(slot) if !slot.matches.is_empty() => &slot.matches,
                _ => continue,
            };
            let path = subdir.join(match_file_name(&stem, &structure.name));
            let mut file = io::BufWriter::new(fs::File::create(path)?);
            write_block(&mut file, structure, matches)?;
            file.flush()?;
        }
        Ok(())
    }

    /// File stem of the identifier; combined identifiers keep every part, `a+b`
    fn stem(&self) -> String {
        self.identifier
            .split('+')
            .map(|part| {
                Path::new(part)
                    .file_stem()
                    .map_or_else(|| part.to_string(), |s| s.to_string_lossy().into_owned())
            })
            .collect::<Vec<_>>()
            .join("+")
    }
}

fn write_block(out: &mut impl Write, structure: &Structure, matches: &[String]) -> io::Result<()> {
    writeln!(out, "# {}", structure.name)?;
    if let Some(description) = &structure.description {
        writeln!(out, "# {description}")?;
    }
    writeln!(out, "# {}", structure.source())?;
    for span in matches {
        writeln!(out)?;
        writeln!(out, "{span}")?;
    }
    writeln!(out)
}

/// `<stem>-<name>.txt` with `/` spelled `-per-` and other unsafe characters dropped
pub fn match_file_name(stem: &str, structure: &str) -> PathBuf {
    let escaped: String = structure
        .replace('/', "-per-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    PathBuf::from(format!("{stem}-{escaped}.txt"))
}

/// Round half away from zero
fn round(value: f64, digits: u32) -> f64 {
    let scale = 10f64.powi(digits as i32);
    // already integral at this scale
    if (value * scale).abs() >= 2f64.powi(52) {
        return value;
    }
    (value * scale).round() / scale
}

/// Fixed-point rendering of a rounded value; `-0` prints as `0`
fn format_value(value: f64, digits: u32) -> String {
    let rounded = round(value, digits);
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:.prec$}", prec = digits as usize)
}
