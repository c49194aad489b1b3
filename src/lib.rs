//! Synmetrics: constituency tree matching and syntactic complexity measures
//!
//! Tregex-style patterns are matched against Penn-Treebank parses, and the
//! matches are counted into the L2SCA measures (clauses, T-units, mean
//! lengths and ratios) or user-defined structures.

// Trees
pub mod bracket; // Bracketed tree reader
pub mod head_finder; // Head rules
pub mod tree; // Arena tree with cached leaf edges

// Patterns
pub mod label; // Node label tests
pub mod pattern; // Pattern AST
pub mod query; // Pattern parser
pub mod relation; // Structural relations between nodes
pub mod searcher; // Matching a pattern against a tree

// Counting
pub mod counter; // Per-input structure values
pub mod expression; // Arithmetic over structure names
pub mod structure; // Built-in and user-defined structures

// Running analyses
pub mod inputs;
pub mod output;
pub mod sca;

pub use bracket::{BracketReader, MalformedTreeError, parse_trees};
pub use counter::{Counter, CounterError};
pub use expression::{Expression, ExpressionError};
pub use head_finder::{HeadFinder, RuleHeadFinder};
pub use inputs::InputUnit;
pub use output::OutputFormat;
pub use pattern::TregexPattern;
pub use query::PatternError;
pub use relation::{Relation, RelationError};
pub use sca::{
    BatchReport, BracketedInput, ScaAnalyzer, ScaConfig, ScaError, TracingReporter, TreeParser,
};
pub use searcher::{Match, search};
pub use structure::{Catalog, Structure, StructureError, UserDefinition};
pub use tree::{NodeId, Tree};
