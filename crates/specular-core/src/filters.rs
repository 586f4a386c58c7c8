//! Include/exclude glob rules for choosing which files to mirror.
//!
//! Rules serialize as `"+ GLOB"` and `"- GLOB"` strings and are evaluated
//! first-match-wins, defaulting to include.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A rule string that could not be parsed.
#[derive(Error, Debug)]
pub enum FilterError {
    /// The discriminator prefix was neither `+` nor `-`.
    #[error("unknown filter kind: {0:?}")]
    UnknownKind(String),
    /// The glob pattern itself was malformed.
    #[error("invalid glob: {0}")]
    BadGlob(#[from] glob::PatternError),
}

/// A shell-style glob matched against file base names.
#[derive(Debug, Clone, PartialEq)]
pub struct Glob(glob::Pattern);

impl Glob {
    /// Compile `pattern`, rejecting malformed globs.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::BadGlob`] when the pattern has invalid syntax.
    pub fn new(pattern: &str) -> Result<Self, FilterError> {
        Ok(Self(glob::Pattern::new(pattern)?))
    }

    /// Whether `name` matches the pattern.
    pub fn matches(&self, name: &str) -> bool {
        self.0.matches(name)
    }

    /// The original pattern text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// One filter rule: include or exclude names matching a glob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Filter {
    /// Include names matching the glob.
    Include(Glob),
    /// Exclude names matching the glob.
    Exclude(Glob),
}

impl Filter {
    /// The rule's verdict for `name`, or `None` when the glob does not match.
    fn apply(&self, name: &str) -> Option<bool> {
        match self {
            Self::Include(glob) => glob.matches(name).then_some(true),
            Self::Exclude(glob) => glob.matches(name).then_some(false),
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Include(glob) => write!(f, "+ {}", glob.as_str()),
            Self::Exclude(glob) => write!(f, "- {}", glob.as_str()),
        }
    }
}

impl std::str::FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = match s.find(char::is_whitespace) {
            Some(at) => (&s[..at], s[at..].trim_start()),
            None => (s, ""),
        };
        match kind {
            "+" => Ok(Self::Include(Glob::new(rest)?)),
            "-" => Ok(Self::Exclude(Glob::new(rest)?)),
            _ => Err(FilterError::UnknownKind(kind.to_string())),
        }
    }
}

impl TryFrom<String> for Filter {
    type Error = FilterError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Filter> for String {
    fn from(filter: Filter) -> Self {
        filter.to_string()
    }
}

/// An ordered, first-match-wins list of filter rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet(Vec<Filter>);

impl FilterSet {
    /// Build a set from rules in evaluation order.
    pub fn new(rules: Vec<Filter>) -> Self {
        Self(rules)
    }

    /// Whether `name` should be mirrored.
    ///
    /// The first rule whose glob matches decides; with no match (or no rules
    /// at all) everything is included.
    pub fn matches(&self, name: &str) -> bool {
        self.0
            .iter()
            .find_map(|rule| rule.apply(name))
            .unwrap_or(true)
    }
}
