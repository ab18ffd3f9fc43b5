use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// A single string or a list of strings in a definition file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.clone().into_vec()
    }
}

impl From<&str> for OneOrMany {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

/// Predicate for one path level. Exactly one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineMatch {
    #[serde(default, rename = "startswith")]
    pub starts_with: Option<OneOrMany>,
    #[serde(default, rename = "endswith")]
    pub ends_with: Option<OneOrMany>,
    #[serde(default)]
    pub contains: Option<OneOrMany>,
    #[serde(default)]
    pub equals: Option<OneOrMany>,
    #[serde(default)]
    pub re: Option<String>,
}

impl LineMatch {
    pub fn starts_with(prefix: impl Into<OneOrMany>) -> Self {
        Self {
            starts_with: Some(prefix.into()),
            ..Self::default()
        }
    }

    pub fn equals(text: impl Into<OneOrMany>) -> Self {
        Self {
            equals: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn re(pattern: impl Into<String>) -> Self {
        Self {
            re: Some(pattern.into()),
            ..Self::default()
        }
    }
}

/// Errors produced while compiling a lineage.
#[derive(Debug, Error)]
pub enum LineageError {
    #[error("lineage is empty")]
    Empty,
    #[error("level {level}: expected exactly one of startswith/endswith/contains/equals/re, found {found}")]
    Ambiguous { level: usize, found: usize },
    #[error("level {level}: pattern is empty")]
    EmptyPattern { level: usize },
    #[error("level {level}: invalid regex '{pattern}': {source}")]
    Regex {
        level: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone)]
enum CompiledMatch {
    StartsWith(Vec<String>),
    EndsWith(Vec<String>),
    Contains(Vec<String>),
    Equals(Vec<String>),
    Re(Regex),
}

impl CompiledMatch {
    fn compile(level: usize, def: &LineMatch) -> Result<Self, LineageError> {
        let found = [
            def.starts_with.is_some(),
            def.ends_with.is_some(),
            def.contains.is_some(),
            def.equals.is_some(),
            def.re.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if found != 1 {
            return Err(LineageError::Ambiguous { level, found });
        }

        let literals = |values: &OneOrMany| {
            let values = values.to_vec();
            if values.is_empty() || values.iter().any(|v| v.trim().is_empty()) {
                Err(LineageError::EmptyPattern { level })
            } else {
                Ok(values)
            }
        };

        if let Some(values) = &def.starts_with {
            return Ok(Self::StartsWith(literals(values)?));
        }
        if let Some(values) = &def.ends_with {
            return Ok(Self::EndsWith(literals(values)?));
        }
        if let Some(values) = &def.contains {
            return Ok(Self::Contains(literals(values)?));
        }
        if let Some(values) = &def.equals {
            return Ok(Self::Equals(literals(values)?));
        }

        let pattern = def.re.as_deref().unwrap_or_default();
        if pattern.is_empty() {
            return Err(LineageError::EmptyPattern { level });
        }
        Regex::new(pattern)
            .map(Self::Re)
            .map_err(|source| LineageError::Regex {
                level,
                pattern: pattern.to_string(),
                source,
            })
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            Self::StartsWith(prefixes) => prefixes.iter().any(|p| text.starts_with(p.as_str())),
            Self::EndsWith(suffixes) => suffixes.iter().any(|s| text.ends_with(s.as_str())),
            Self::Contains(needles) => needles.iter().any(|n| text.contains(n.as_str())),
            Self::Equals(values) => values.iter().any(|v| v == text),
            Self::Re(regex) => regex.is_match(text),
        }
    }
}

/// A lineage compiled once and evaluated against node paths.
#[derive(Debug, Clone)]
pub struct CompiledLineage {
    levels: Vec<CompiledMatch>,
}

impl CompiledLineage {
    pub fn compile(lineage: &[LineMatch]) -> Result<Self, LineageError> {
        if lineage.is_empty() {
            return Err(LineageError::Empty);
        }
        let levels = lineage
            .iter()
            .enumerate()
            .map(|(level, def)| CompiledMatch::compile(level, def))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { levels })
    }

    /// Lineage of literal prefixes, one list per level. Never fails.
    pub fn from_prefixes(levels: &[&[&str]]) -> Self {
        Self {
            levels: levels
                .iter()
                .map(|prefixes| {
                    CompiledMatch::StartsWith(prefixes.iter().map(ToString::to_string).collect())
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// True when the path has exactly as many levels as the lineage and each matches.
    pub fn matches<S: AsRef<str>>(&self, path: &[S]) -> bool {
        path.len() == self.levels.len() && self.matches_prefix(path)
    }

    /// True when the leading levels of the path match the lineage.
    pub fn matches_prefix<S: AsRef<str>>(&self, path: &[S]) -> bool {
        path.len() >= self.levels.len()
            && self
                .levels
                .iter()
                .zip(path)
                .all(|(level, text)| level.is_match(text.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::{CompiledLineage, LineMatch, LineageError};

    #[test]
    fn exact_and_prefix_matching() {
        let lineage = CompiledLineage::compile(&[
            LineMatch::starts_with("interface"),
            LineMatch::re(r"^ip address \S+ \S+$"),
        ])
        .expect("lineage should compile");

        assert!(lineage.matches(&["interface Gi0/1", "ip address 10.0.0.1 255.255.255.0"]));
        assert!(!lineage.matches(&["interface Gi0/1"]));
        assert!(!lineage.matches(&["interface Gi0/1", "ip address 10.0.0.1 255.0.0.0 secondary"]));
        assert!(lineage.matches_prefix(&[
            "interface Gi0/1",
            "ip address 10.0.0.1 255.255.255.0",
            "anything"
        ]));
    }

    #[test]
    fn rejects_empty_and_ambiguous_definitions() {
        assert!(matches!(
            CompiledLineage::compile(&[]),
            Err(LineageError::Empty)
        ));
        assert!(matches!(
            CompiledLineage::compile(&[LineMatch::default()]),
            Err(LineageError::Ambiguous { found: 0, .. })
        ));
        assert!(matches!(
            CompiledLineage::compile(&[LineMatch::starts_with("")]),
            Err(LineageError::EmptyPattern { level: 0 })
        ));
        assert!(matches!(
            CompiledLineage::compile(&[LineMatch::re("(")]),
            Err(LineageError::Regex { .. })
        ));
    }
}
