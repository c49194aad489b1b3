//! Node category tests
//!
//! A [`LabelTest`] decides whether a node label belongs to a category. It is
//! the node description of the pattern language and the category predicate of
//! the unbroken-chain relations.

use regex::Regex;
use std::fmt;

/// Characters that start a functional annotation on a Penn Treebank category
const ANNOTATION_CHARS: &[char] = &['-', '=', '|', '#', '^', '~', '_'];

/// Strip functional annotations: `NP-SBJ=2` becomes `NP`
///
/// A label that opens and closes with the same annotation character, such as
/// `-LRB-` or `-NONE-`, is kept whole.
pub fn basic_category(label: &str) -> &str {
    let mut opened_with: Option<char> = None;
    for (i, ch) in label.char_indices() {
        if !ANNOTATION_CHARS.contains(&ch) {
            continue;
        }
        if i == 0 {
            opened_with = Some(ch);
        } else if opened_with == Some(ch) {
            opened_with = None;
        } else {
            return &label[..i];
        }
    }
    label
}

/// What a test compares the label against
#[derive(Clone)]
pub enum LabelMatcher {
    /// `__`
    Any,
    /// `A|B|C`
    Alternatives(Vec<String>),
    /// `/regex/`, unanchored
    Regex(String, Regex),
}

// Manual Debug implementation
impl fmt::Debug for LabelMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelMatcher::Any => f.write_str("Any"),
            LabelMatcher::Alternatives(alts) => f.debug_tuple("Alternatives").field(alts).finish(),
            LabelMatcher::Regex(source, _) => f.debug_tuple("Regex").field(source).finish(),
        }
    }
}

// Regexes compare by source
impl PartialEq for LabelMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LabelMatcher::Any, LabelMatcher::Any) => true,
            (LabelMatcher::Alternatives(a), LabelMatcher::Alternatives(b)) => a == b,
            (LabelMatcher::Regex(a, _), LabelMatcher::Regex(b, _)) => a == b,
            _ => false,
        }
    }
}

/// A category predicate over node labels
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTest {
    pub matcher: LabelMatcher,
    /// `!` prefix
    pub negated: bool,
    /// `@` prefix: compare the basic category instead of the full label
    pub basic: bool,
}

impl LabelTest {
    pub fn any() -> Self {
        Self {
            matcher: LabelMatcher::Any,
            negated: false,
            basic: false,
        }
    }

    /// Exact match against any of the given categories
    pub fn one_of<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            matcher: LabelMatcher::Alternatives(categories.into_iter().map(Into::into).collect()),
            negated: false,
            basic: false,
        }
    }

    /// Parse the textual form: `[!][@](__ | /regex/ | A|B|C)`
    pub fn parse(source: &str) -> Result<Self, regex::Error> {
        let mut rest = source;
        let negated = rest.starts_with('!');
        if negated {
            rest = &rest[1..];
        }
        let basic = rest.starts_with('@');
        if basic {
            rest = &rest[1..];
        }

        let matcher = if rest == "__" {
            LabelMatcher::Any
        } else if let Some(body) = rest
            .strip_prefix('/')
            .and_then(|r| r.strip_suffix('/'))
            .filter(|_| rest.len() >= 2)
        {
            LabelMatcher::Regex(body.to_string(), Regex::new(body)?)
        } else {
            LabelMatcher::Alternatives(rest.split('|').map(str::to_string).collect())
        };

        Ok(Self {
            matcher,
            negated,
            basic,
        })
    }

    /// Test a node label; unlabeled nodes only satisfy `__`
    pub fn matches(&self, label: Option<&str>) -> bool {
        let hit = match (&self.matcher, label) {
            (LabelMatcher::Any, _) => true,
            (_, None) => false,
            (matcher, Some(label)) => {
                let label = if self.basic { basic_category(label) } else { label };
                match matcher {
                    LabelMatcher::Alternatives(alts) => alts.iter().any(|alt| alt == label),
                    LabelMatcher::Regex(_, re) => re.is_match(label),
                    LabelMatcher::Any => true,
                }
            }
        };
        hit != self.negated
    }
}

impl fmt::Display for LabelTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("!")?;
        }
        if self.basic {
            f.write_str("@")?;
        }
        match &self.matcher {
            LabelMatcher::Any => f.write_str("__"),
            LabelMatcher::Alternatives(alts) => f.write_str(&alts.join("|")),
            LabelMatcher::Regex(source, _) => write!(f, "/{source}/"),
        }
    }
}
