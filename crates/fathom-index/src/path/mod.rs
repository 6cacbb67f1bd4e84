//! Module: path
//! Responsibility: parse and represent dotted/bracketed field paths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error as ThisError;

///
/// PathError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path contains an empty step")]
    EmptyStep,

    #[error("invalid path token '{0}'")]
    InvalidToken(String),
}

///
/// PathStep
///
/// One step of a table path. `Element` is the "values of array/map" marker,
/// spelled `[]` or `values()`; `Keys` is the "keys of map" marker, spelled
/// `keys()`.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PathStep {
    Field(String),
    Element,
    Keys,
}

impl PathStep {
    #[must_use]
    pub const fn is_marker(&self) -> bool {
        matches!(self, Self::Element | Self::Keys)
    }

    // Lower-cased spelling used for case-insensitive comparison and hashing.
    fn canonical(&self) -> String {
        match self {
            Self::Field(name) => name.to_ascii_lowercase(),
            Self::Element => "[]".to_string(),
            Self::Keys => "keys()".to_string(),
        }
    }
}

///
/// TablePath
///
/// Ordered steps addressing a (possibly nested) field. Paths compare and
/// hash case-insensitively over their lower-cased steps; display is the
/// canonical external spelling (`a.b[].c`, `tags.keys()`).
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TablePath {
    steps: Vec<PathStep>,
}

impl TablePath {
    pub fn new(steps: Vec<PathStep>) -> Result<Self, PathError> {
        if steps.is_empty() {
            return Err(PathError::Empty);
        }
        for step in &steps {
            if let PathStep::Field(name) = step {
                if name.is_empty() {
                    return Err(PathError::EmptyStep);
                }
            }
        }
        Ok(Self { steps })
    }

    #[must_use]
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// True when any step is an array/map marker.
    #[must_use]
    pub fn has_marker(&self) -> bool {
        self.steps.iter().any(PathStep::is_marker)
    }

    /// The sub-path covering the first `len` steps.
    #[must_use]
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            steps: self.steps[..len].to_vec(),
        }
    }
}

impl PartialEq for TablePath {
    fn eq(&self, other: &Self) -> bool {
        self.steps.len() == other.steps.len()
            && self
                .steps
                .iter()
                .zip(&other.steps)
                .all(|(a, b)| match (a, b) {
                    (PathStep::Field(x), PathStep::Field(y)) => x.eq_ignore_ascii_case(y),
                    _ => a == b,
                })
    }
}

impl Eq for TablePath {}

impl Hash for TablePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for step in &self.steps {
            step.canonical().hash(state);
        }
    }
}

impl FromStr for TablePath {
    type Err = PathError;

    /// Parse the external spelling. Dots separate steps; a step may carry
    /// trailing `[]` suffixes (`addresses[].city`); `keys()` and `values()`
    /// are accepted as standalone steps.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }

        let mut steps = Vec::new();
        for token in s.split('.') {
            if token.is_empty() {
                return Err(PathError::EmptyStep);
            }
            match token {
                "keys()" => steps.push(PathStep::Keys),
                "values()" | "[]" => steps.push(PathStep::Element),
                _ => {
                    let mut rest = token;
                    let mut markers = 0;
                    while let Some(stripped) = rest.strip_suffix("[]") {
                        rest = stripped;
                        markers += 1;
                    }
                    if rest.is_empty() {
                        return Err(PathError::InvalidToken(token.to_string()));
                    }
                    if rest.contains(['[', ']', '(', ')']) {
                        return Err(PathError::InvalidToken(token.to_string()));
                    }
                    steps.push(PathStep::Field(rest.to_string()));
                    for _ in 0..markers {
                        steps.push(PathStep::Element);
                    }
                }
            }
        }

        Self::new(steps)
    }
}

impl fmt::Display for TablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for step in &self.steps {
            match step {
                PathStep::Field(name) => {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "{name}")?;
                }
                // Element attaches to the preceding step without a dot.
                PathStep::Element => {
                    if first {
                        write!(f, "values()")?;
                    } else {
                        write!(f, "[]")?;
                    }
                }
                PathStep::Keys => {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "keys()")?;
                }
            }
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> TablePath {
        s.parse().unwrap()
    }

    #[test]
    fn parses_plain_dotted_path() {
        let p = path("address.city");
        assert_eq!(
            p.steps(),
            &[
                PathStep::Field("address".to_string()),
                PathStep::Field("city".to_string()),
            ]
        );
        assert_eq!(p.to_string(), "address.city");
    }

    #[test]
    fn parses_bracket_suffix_as_element_marker() {
        let p = path("addresses[].city");
        assert_eq!(
            p.steps(),
            &[
                PathStep::Field("addresses".to_string()),
                PathStep::Element,
                PathStep::Field("city".to_string()),
            ]
        );
        assert_eq!(p.to_string(), "addresses[].city");
    }

    #[test]
    fn parses_values_and_keys_markers() {
        assert_eq!(path("tags.values()"), path("tags[]"));

        let p = path("tags.keys()");
        assert_eq!(
            p.steps(),
            &[PathStep::Field("tags".to_string()), PathStep::Keys]
        );
        assert_eq!(p.to_string(), "tags.keys()");
    }

    #[test]
    fn parses_nested_bracket_suffixes() {
        let p = path("matrix[][]");
        assert_eq!(
            p.steps(),
            &[
                PathStep::Field("matrix".to_string()),
                PathStep::Element,
                PathStep::Element,
            ]
        );
        assert_eq!(p.to_string(), "matrix[][]");
    }

    #[test]
    fn comparison_is_case_insensitive() {
        use std::collections::HashSet;

        assert_eq!(path("Address.City"), path("address.city"));
        assert_ne!(path("address.city"), path("address.town"));

        let mut set = HashSet::new();
        set.insert(path("Tags.Keys()"));
        assert!(set.contains(&path("tags.keys()")));
    }

    #[test]
    fn rejects_malformed_paths() {
        assert_eq!("".parse::<TablePath>(), Err(PathError::Empty));
        assert_eq!("a..b".parse::<TablePath>(), Err(PathError::EmptyStep));
        assert!(matches!(
            "a[".parse::<TablePath>(),
            Err(PathError::InvalidToken(_))
        ));
        assert!(matches!(
            "a(b)".parse::<TablePath>(),
            Err(PathError::InvalidToken(_))
        ));
    }
}
