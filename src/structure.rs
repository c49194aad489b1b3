//! Syntactic structures and the catalog that names them
//!
//! A [`Structure`] is counted either by a tree pattern (terminal structures
//! such as clauses or T-units) or by an arithmetic [`Expression`] over other
//! structures (sums such as `VP1 + VP2` and ratios such as `W / T`). Words
//! are the one exception: they are counted by scanning the bracketed text of
//! each tree for preterminals.
//!
//! The built-in catalog is compiled once and shared. User definitions loaded
//! from JSON produce a new catalog layered over it.

use crate::expression::{Expression, ExpressionError};
use crate::pattern::TregexPattern;
use crate::query::PatternError;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

/// Preterminal whose word is not a bracket or a dash
pub const WORD_REGEX: &str = r"\([A-Z]+\$? [^()—–-]+\)";

const CLAUSE: &str = "S|SINV|SQ [> ROOT <, (VP <# VB) | <# MD|VBZ|VBP|VBD | < (VP [<# MD|VBP|VBZ|VBD | < CC < (VP <# MD|VBP|VBZ|VBD)])]";
const T_UNIT: &str = "S|SBARQ|SINV|SQ > ROOT | [$-- S|SBARQ|SINV|SQ !>> SBAR|VP]";

#[derive(Debug, Error)]
pub enum StructureError {
    #[error("Invalid definition of {name:?}: {reason}")]
    InvalidDefinition { name: String, reason: String },

    #[error("Structure {0:?} is defined more than once")]
    DuplicateName(String),

    #[error("Structure not found: {0}")]
    NotFound(String),

    #[error("Invalid pattern for {name:?}: {source}")]
    Pattern {
        name: String,
        #[source]
        source: PatternError,
    },

    #[error("Invalid expression for {name:?}: {source}")]
    Expression {
        name: String,
        #[source]
        source: ExpressionError,
    },

    #[error("Invalid word regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("Failed to read structure definitions: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse structure definitions: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Built-in catalog failed to load: {0}")]
    Builtin(String),
}

/// How a structure's value is obtained
#[derive(Debug, Clone)]
pub enum Definition {
    Pattern(TregexPattern),
    Expression(Expression),
    /// Count regex matches over each tree's bracketed text
    Scan(Regex),
}

#[derive(Debug, Clone)]
pub struct Structure {
    pub name: String,
    pub description: Option<String>,
    pub definition: Definition,
}

impl Structure {
    pub fn pattern(name: &str, description: Option<&str>, source: &str) -> Result<Self, StructureError> {
        let pattern = TregexPattern::compile(source).map_err(|source| StructureError::Pattern {
            name: name.to_string(),
            source,
        })?;
        Ok(Self::new(name, description, Definition::Pattern(pattern)))
    }

    pub fn expression(name: &str, description: Option<&str>, source: &str) -> Result<Self, StructureError> {
        let expression = Expression::parse(source).map_err(|source| StructureError::Expression {
            name: name.to_string(),
            source,
        })?;
        Ok(Self::new(name, description, Definition::Expression(expression)))
    }

    fn new(name: &str, description: Option<&str>, definition: Definition) -> Self {
        Self {
            name: name.to_string(),
            description: description.map(str::to_string),
            definition,
        }
    }

    /// Counted directly from trees rather than derived from other structures
    pub fn is_terminal(&self) -> bool {
        !matches!(self.definition, Definition::Expression(_))
    }

    /// Pattern, expression or regex source
    pub fn source(&self) -> &str {
        match &self.definition {
            Definition::Pattern(p) => p.source(),
            Definition::Expression(e) => e.source(),
            Definition::Scan(r) => r.as_str(),
        }
    }
}

/// A structure supplied by the user, as read from JSON
///
/// ```json
/// [{"name": "NP", "tregex_pattern": "NP", "description": "noun phrases"},
///  {"name": "NP/S", "value_source": "NP / S"}]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tregex_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_source: Option<String>,
}

impl UserDefinition {
    fn to_structure(&self) -> Result<Structure, StructureError> {
        let invalid = |reason: &str| StructureError::InvalidDefinition {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        let blank = |field: &Option<String>| field.as_deref().is_some_and(|s| s.trim().is_empty());

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if blank(&self.description) || blank(&self.tregex_pattern) || blank(&self.value_source) {
            return Err(invalid("fields must not be empty"));
        }

        let description = self.description.as_deref();
        match (&self.tregex_pattern, &self.value_source) {
            (Some(pattern), None) => Structure::pattern(&self.name, description, pattern),
            (None, Some(expression)) => Structure::expression(&self.name, description, expression),
            (Some(_), Some(_)) => Err(invalid("give either tregex_pattern or value_source, not both")),
            (None, None) => Err(invalid("one of tregex_pattern or value_source is required")),
        }
    }
}

pub fn parse_user_definitions(json: &str) -> Result<Vec<UserDefinition>, StructureError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_user_definitions(path: impl AsRef<Path>) -> Result<Vec<UserDefinition>, StructureError> {
    parse_user_definitions(&fs::read_to_string(path)?)
}

/// Named structures plus the measures reported by default
#[derive(Debug, Clone)]
pub struct Catalog {
    structures: Vec<Structure>,
    index: FxHashMap<String, usize>,
    default_measures: Vec<String>,
}

static BUILTIN: LazyLock<Result<Arc<Catalog>, String>> =
    LazyLock::new(|| Catalog::load_builtin().map(Arc::new).map_err(|e| e.to_string()));

impl Catalog {
    /// The shared built-in catalog
    pub fn builtin() -> Result<Arc<Catalog>, StructureError> {
        (*BUILTIN).clone().map_err(StructureError::Builtin)
    }

    fn load_builtin() -> Result<Catalog, StructureError> {
        let p = Structure::pattern;
        let e = Structure::expression;

        let clause_fragment = format!("FRAG > ROOT !<< ({CLAUSE})");
        let t_unit_fragment = format!("FRAG > ROOT !<< ({T_UNIT})");
        let dependent_clause = format!("SBAR < ({CLAUSE})");
        let complex_t_unit = format!(
            "S|SBARQ|SINV|SQ [> ROOT | [$-- S|SBARQ|SINV|SQ !>> SBAR|VP]] << (SBAR < ({CLAUSE}))"
        );

        let structures = vec![
            Structure::new(
                "W",
                Some("words"),
                Definition::Scan(Regex::new(WORD_REGEX)?),
            ),
            p("S", Some("sentences"), "ROOT")?,
            p("VP1", Some("regular verb phrases"), "VP > S|SINV|SQ")?,
            p("VP2", Some("verb phrases in inverted yes/no questions or wh-questions"), "MD|VBZ|VBP|VBD > (SQ !< VP)")?,
            e("VP", Some("verb phrases"), "VP1 + VP2")?,
            p("C1", Some("regular clauses"), CLAUSE)?,
            p("C2", Some("fragment clauses"), &clause_fragment)?,
            e("C", Some("clauses"), "C1 + C2")?,
            p("T1", Some("regular T-units"), T_UNIT)?,
            p("T2", Some("fragment T-units"), &t_unit_fragment)?,
            e("T", Some("T-units"), "T1 + T2")?,
            p("CN1", Some("complex nominals, type 1"), "NP !> NP [<< JJ|POS|PP|S|VBG | << (NP $++ NP !$+ CC)]")?,
            p("CN2", Some("complex nominals, type 2"), "SBAR [<# WHNP | <# (IN < That|that|For|for) | <, S] & [$+ VP | > VP]")?,
            p("CN3", Some("complex nominals, type 3"), "S < (VP <# VBG|TO) $+ VP")?,
            e("CN", Some("complex nominals"), "CN1 + CN2 + CN3")?,
            p("DC", Some("dependent clauses"), &dependent_clause)?,
            p("CT", Some("complex T-units"), &complex_t_unit)?,
            p("CP", Some("coordinate phrases"), "ADJP|ADVP|NP|VP < CC")?,
            e("MLS", Some("mean length of sentence"), "W / S")?,
            e("MLT", Some("mean length of T-unit"), "W / T")?,
            e("MLC", Some("mean length of clause"), "W / C")?,
            e("C/S", Some("clauses per sentence"), "C / S")?,
            e("VP/T", Some("verb phrases per T-unit"), "VP / T")?,
            e("C/T", Some("clauses per T-unit"), "C / T")?,
            e("DC/C", Some("dependent clauses per clause"), "DC / C")?,
            e("DC/T", Some("dependent clauses per T-unit"), "DC / T")?,
            e("T/S", Some("T-units per sentence"), "T / S")?,
            e("CT/T", Some("complex T-unit ratio"), "CT / T")?,
            e("CP/T", Some("coordinate phrases per T-unit"), "CP / T")?,
            e("CP/C", Some("coordinate phrases per clause"), "CP / C")?,
            e("CN/T", Some("complex nominals per T-unit"), "CN / T")?,
            e("CN/C", Some("complex nominals per clause"), "CN / C")?,
        ];

        let default_measures = [
            "W", "S", "VP", "C", "T", "DC", "CT", "CP", "CN", "MLS", "MLT", "MLC", "C/S", "VP/T",
            "C/T", "DC/C", "DC/T", "T/S", "CT/T", "CP/T", "CP/C", "CN/T", "CN/C",
        ]
        .map(str::to_string)
        .to_vec();

        let mut catalog = Catalog {
            structures: Vec::with_capacity(structures.len()),
            index: FxHashMap::default(),
            default_measures,
        };
        for structure in structures {
            catalog.insert(structure);
        }
        Ok(catalog)
    }

    /// Add or replace a structure, keeping the position of a replaced one
    fn insert(&mut self, structure: Structure) {
        match self.index.get(&structure.name) {
            Some(&i) => self.structures[i] = structure,
            None => {
                self.index.insert(structure.name.clone(), self.structures.len());
                self.structures.push(structure);
            }
        }
    }

    /// A copy of this catalog extended (or overridden) by user definitions
    ///
    /// User-defined names not already reported by default are appended to the
    /// default measures.
    pub fn with_user_definitions(&self, definitions: &[UserDefinition]) -> Result<Catalog, StructureError> {
        let mut seen = Vec::with_capacity(definitions.len());
        let mut catalog = self.clone();
        for definition in definitions {
            if seen.contains(&definition.name.as_str()) {
                return Err(StructureError::DuplicateName(definition.name.clone()));
            }
            seen.push(definition.name.as_str());

            catalog.insert(definition.to_structure()?);
            if !catalog.default_measures.contains(&definition.name) {
                catalog.default_measures.push(definition.name.clone());
            }
        }
        Ok(catalog)
    }

    pub fn get(&self, name: &str) -> Option<&Structure> {
        self.index.get(name).map(|&i| &self.structures[i])
    }

    pub fn structure(&self, name: &str) -> Result<&Structure, StructureError> {
        self.get(name).ok_or_else(|| StructureError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Structures in definition order
    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    pub fn default_measures(&self) -> &[String] {
        &self.default_measures
    }
}
