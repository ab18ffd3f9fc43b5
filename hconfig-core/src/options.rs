//! Platform rules consumed by the parser and the differ.

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::trace;

use crate::matcher::{CompiledLineage, LineMatch, LineageError};

/// Placeholder replaced by the original command in negation templates.
pub const LINE_PLACEHOLDER: &str = "{line}";

/// Banner lines of IOS `show running-config` output.
const IOS_IGNORE_LINES: &[&str] = &[
    "^end$",
    "^Building configuration",
    "^Current configuration",
];

/// Errors raised while compiling or applying platform options.
#[derive(Debug, Error)]
pub enum OptionsError {
    /// A rule lineage failed to compile.
    #[error("invalid {rule} rule #{index}: {source}")]
    InvalidRule {
        rule: &'static str,
        index: usize,
        #[source]
        source: LineageError,
    },
    /// A free-standing regex (ignore or substitution) failed to compile.
    #[error("invalid {field} pattern '{pattern}': {source}")]
    InvalidPattern {
        field: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("indent_width must be greater than zero")]
    ZeroIndent,
    /// A negation rule matched but does not say how to negate.
    #[error("no negation template for '{path}'")]
    MissingNegationTemplate { path: String },
    /// Two ordering rules with different weights matched one path.
    #[error("conflicting ordering weights {first} and {second} for '{path}'")]
    ConflictingOrder {
        path: String,
        first: i32,
        second: i32,
    },
}

/// A rule that only needs a lineage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineageRule {
    pub lineage: Vec<LineMatch>,
}

/// How to negate a command family.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NegateWithRule {
    pub lineage: Vec<LineMatch>,
    /// Replacement negation text; `{line}` expands to the command.
    #[serde(default)]
    pub template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderingRule {
    pub lineage: Vec<LineMatch>,
    pub weight: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubstitutionRule {
    pub search: String,
    #[serde(default)]
    pub replace: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionalExitRule {
    pub lineage: Vec<LineMatch>,
    pub exit_text: String,
}

/// Declarative platform options as loaded from YAML or TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsDefinition {
    pub indent_width: usize,
    pub comment_prefixes: Vec<String>,
    pub ignore_lines: Vec<String>,
    pub line_substitutions: Vec<SubstitutionRule>,
    pub collapse_whitespace: bool,
    pub case_insensitive_idempotency: bool,
    pub negation_prefix: String,
    pub negate_with: Vec<NegateWithRule>,
    pub per_child_removal: Vec<LineageRule>,
    pub ordering: Vec<OrderingRule>,
    pub create_before_destroy: Vec<LineageRule>,
    pub idempotent: Vec<LineageRule>,
    pub sectional_exiting: Vec<SectionalExitRule>,
}

impl Default for OptionsDefinition {
    fn default() -> Self {
        Self {
            indent_width: 1,
            comment_prefixes: vec!["!".to_string()],
            ignore_lines: Vec::new(),
            line_substitutions: Vec::new(),
            collapse_whitespace: true,
            case_insensitive_idempotency: true,
            negation_prefix: "no ".to_string(),
            negate_with: Vec::new(),
            per_child_removal: Vec::new(),
            ordering: Vec::new(),
            create_before_destroy: Vec::new(),
            idempotent: Vec::new(),
            sectional_exiting: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledNegation {
    lineage: CompiledLineage,
    template: Option<String>,
}

#[derive(Debug, Clone)]
struct CompiledOrdering {
    lineage: CompiledLineage,
    weight: i32,
}

#[derive(Debug, Clone)]
struct CompiledExit {
    lineage: CompiledLineage,
    exit_text: String,
}

/// Compiled, immutable platform options.
#[derive(Debug, Clone)]
pub struct Options {
    indent_width: usize,
    comment_prefixes: Vec<String>,
    ignore_lines: Vec<Regex>,
    substitutions: Vec<(Regex, String)>,
    collapse_whitespace: bool,
    case_insensitive_idempotency: bool,
    negation_prefix: String,
    negate_with: Vec<CompiledNegation>,
    per_child_removal: Vec<CompiledLineage>,
    ordering: Vec<CompiledOrdering>,
    create_before_destroy: Vec<CompiledLineage>,
    idempotent: Vec<CompiledLineage>,
    sectional_exiting: Vec<CompiledExit>,
}

impl Default for Options {
    fn default() -> Self {
        let def = OptionsDefinition::default();
        Self {
            indent_width: def.indent_width,
            comment_prefixes: def.comment_prefixes,
            ignore_lines: Vec::new(),
            substitutions: Vec::new(),
            collapse_whitespace: def.collapse_whitespace,
            case_insensitive_idempotency: def.case_insensitive_idempotency,
            negation_prefix: def.negation_prefix,
            negate_with: Vec::new(),
            per_child_removal: Vec::new(),
            ordering: Vec::new(),
            create_before_destroy: Vec::new(),
            idempotent: Vec::new(),
            sectional_exiting: Vec::new(),
        }
    }
}

impl Options {
    /// Compile a definition, validating every pattern up front.
    pub fn compile(def: &OptionsDefinition) -> Result<Self, OptionsError> {
        if def.indent_width == 0 {
            return Err(OptionsError::ZeroIndent);
        }

        let ignore_lines = def
            .ignore_lines
            .iter()
            .map(|pattern| compile_regex("ignore_lines", pattern))
            .collect::<Result<Vec<_>, _>>()?;
        let substitutions = def
            .line_substitutions
            .iter()
            .map(|sub| {
                compile_regex("line_substitutions", &sub.search)
                    .map(|regex| (regex, sub.replace.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let negate_with = def
            .negate_with
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                Ok(CompiledNegation {
                    lineage: compile_lineage("negate_with", index, &rule.lineage)?,
                    template: rule.template.clone(),
                })
            })
            .collect::<Result<Vec<_>, OptionsError>>()?;
        let ordering = def
            .ordering
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                Ok(CompiledOrdering {
                    lineage: compile_lineage("ordering", index, &rule.lineage)?,
                    weight: rule.weight,
                })
            })
            .collect::<Result<Vec<_>, OptionsError>>()?;
        let sectional_exiting = def
            .sectional_exiting
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                Ok(CompiledExit {
                    lineage: compile_lineage("sectional_exiting", index, &rule.lineage)?,
                    exit_text: rule.exit_text.clone(),
                })
            })
            .collect::<Result<Vec<_>, OptionsError>>()?;

        Ok(Self {
            indent_width: def.indent_width,
            comment_prefixes: def.comment_prefixes.clone(),
            ignore_lines,
            substitutions,
            collapse_whitespace: def.collapse_whitespace,
            case_insensitive_idempotency: def.case_insensitive_idempotency,
            negation_prefix: def.negation_prefix.clone(),
            negate_with,
            per_child_removal: compile_lineages("per_child_removal", &def.per_child_removal)?,
            ordering,
            create_before_destroy: compile_lineages(
                "create_before_destroy",
                &def.create_before_destroy,
            )?,
            idempotent: compile_lineages("idempotent", &def.idempotent)?,
            sectional_exiting,
        })
    }

    /// Cisco IOS style defaults.
    pub fn ios() -> Self {
        let mut options = Self::default();
        options.ignore_lines = IOS_IGNORE_LINES
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect();
        options.idempotent = vec![
            CompiledLineage::from_prefixes(&[&["hostname"]]),
            CompiledLineage::from_prefixes(&[&["interface"], &["description"]]),
            CompiledLineage::from_prefixes(&[&["interface"], &["mtu"]]),
            CompiledLineage::from_prefixes(&[&["snmp-server location"]]),
            CompiledLineage::from_prefixes(&[&["snmp-server contact"]]),
            CompiledLineage::from_prefixes(&[&["router bgp"], &["bgp router-id"]]),
            CompiledLineage::from_prefixes(&[&["router ospf"], &["router-id"]]),
        ];
        options.ordering = vec![
            CompiledOrdering {
                lineage: CompiledLineage::from_prefixes(&[&["interface"], &["shutdown"]]),
                weight: 600,
            },
            CompiledOrdering {
                lineage: CompiledLineage::from_prefixes(&[&["interface"], &["no shutdown"]]),
                weight: 600,
            },
            CompiledOrdering {
                lineage: CompiledLineage::from_prefixes(&[&["no vlan"]]),
                weight: 700,
            },
        ];
        options.negate_with = vec![CompiledNegation {
            lineage: CompiledLineage::from_prefixes(&[&["logging console"]]),
            template: Some("logging console debugging".to_string()),
        }];
        options.sectional_exiting = vec![CompiledExit {
            lineage: CompiledLineage::from_prefixes(&[&["router bgp"], &["address-family"]]),
            exit_text: "exit-address-family".to_string(),
        }];
        options
    }

    pub fn indent_width(&self) -> usize {
        self.indent_width
    }

    pub fn negation_prefix(&self) -> &str {
        &self.negation_prefix
    }

    /// True for comment lines and lines matching an ignore pattern.
    pub fn is_ignored(&self, trimmed: &str) -> bool {
        self.comment_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && trimmed.starts_with(prefix.as_str()))
            || self.ignore_lines.iter().any(|re| re.is_match(trimmed))
    }

    /// Normalize one raw line into command text.
    pub fn normalize(&self, raw: &str) -> String {
        let mut text = raw.to_string();
        for (search, replace) in &self.substitutions {
            text = search.replace_all(&text, replace.as_str()).into_owned();
        }
        let text: String = text
            .chars()
            .filter(|c| !c.is_control() || *c == '\t')
            .collect();
        if self.collapse_whitespace {
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        } else {
            text.trim().to_string()
        }
    }

    /// Whether a normalized command starts with the negation prefix.
    pub fn is_negation(&self, text: &str) -> bool {
        !self.negation_prefix.is_empty() && text.starts_with(self.negation_prefix.as_str())
    }

    /// Text that un-configures the node at `path`.
    pub fn negation_for<S: AsRef<str>>(&self, path: &[S]) -> Result<String, OptionsError> {
        let Some(text) = path.last().map(|s| s.as_ref()) else {
            return Ok(String::new());
        };

        if let Some(rule) = self.negate_with.iter().find(|r| r.lineage.matches(path)) {
            trace!(line = text, "negate_with rule matched");
            return match &rule.template {
                Some(template) => Ok(template.replace(LINE_PLACEHOLDER, text)),
                None => Err(OptionsError::MissingNegationTemplate {
                    path: display_path(path),
                }),
            };
        }

        if self.is_negation(text) {
            Ok(text[self.negation_prefix.len()..].to_string())
        } else {
            Ok(format!("{}{}", self.negation_prefix, text))
        }
    }

    /// Ordering weight for `path`, if any rule matches.
    pub fn order_weight<S: AsRef<str>>(&self, path: &[S]) -> Result<Option<i32>, OptionsError> {
        let mut found: Option<i32> = None;
        for rule in self.ordering.iter().filter(|r| r.lineage.matches(path)) {
            match found {
                Some(first) if first != rule.weight => {
                    return Err(OptionsError::ConflictingOrder {
                        path: display_path(path),
                        first,
                        second: rule.weight,
                    });
                }
                _ => found = Some(rule.weight),
            }
        }
        Ok(found)
    }

    pub fn is_per_child_removal<S: AsRef<str>>(&self, path: &[S]) -> bool {
        self.per_child_removal.iter().any(|l| l.matches(path))
    }

    pub fn is_create_before_destroy<S: AsRef<str>>(&self, path: &[S]) -> bool {
        self.create_before_destroy.iter().any(|l| l.matches(path))
    }

    /// Index of the idempotent family `path` belongs to.
    pub fn idempotent_family<S: AsRef<str>>(&self, path: &[S]) -> Option<usize> {
        self.idempotent.iter().position(|l| l.matches(path))
    }

    /// Command that closes the block at `path`.
    pub fn sectional_exit<S: AsRef<str>>(&self, path: &[S]) -> Option<&str> {
        self.sectional_exiting
            .iter()
            .find(|rule| rule.lineage.matches(path))
            .map(|rule| rule.exit_text.as_str())
    }

    /// Key under which two commands of an idempotent family are equivalent.
    pub fn equivalence_key(&self, text: &str) -> String {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if self.case_insensitive_idempotency {
            collapsed.to_lowercase()
        } else {
            collapsed
        }
    }
}

fn compile_regex(field: &'static str, pattern: &str) -> Result<Regex, OptionsError> {
    Regex::new(pattern).map_err(|source| OptionsError::InvalidPattern {
        field,
        pattern: pattern.to_string(),
        source,
    })
}

fn compile_lineage(
    rule: &'static str,
    index: usize,
    lineage: &[LineMatch],
) -> Result<CompiledLineage, OptionsError> {
    CompiledLineage::compile(lineage).map_err(|source| OptionsError::InvalidRule {
        rule,
        index,
        source,
    })
}

fn compile_lineages(
    rule: &'static str,
    rules: &[LineageRule],
) -> Result<Vec<CompiledLineage>, OptionsError> {
    rules
        .iter()
        .enumerate()
        .map(|(index, r)| compile_lineage(rule, index, &r.lineage))
        .collect()
}

pub(crate) fn display_path<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" > ")
}

#[cfg(test)]
mod tests {
    use super::{
        LineageRule, NegateWithRule, Options, OptionsDefinition, OptionsError, OrderingRule,
        SubstitutionRule,
    };
    use crate::matcher::LineMatch;

    #[test]
    fn default_negation_adds_and_strips_prefix() {
        let options = Options::default();
        assert_eq!(
            options.negation_for(&["router bgp 100"]).expect("negation"),
            "no router bgp 100"
        );
        assert_eq!(
            options
                .negation_for(&["interface Gi0/1", "no shutdown"])
                .expect("negation"),
            "shutdown"
        );
    }

    #[test]
    fn negate_with_template_and_missing_template() {
        let def = OptionsDefinition {
            negate_with: vec![
                NegateWithRule {
                    lineage: vec![LineMatch::starts_with("banner")],
                    template: Some("default {line}".to_string()),
                },
                NegateWithRule {
                    lineage: vec![LineMatch::starts_with("crypto key")],
                    template: None,
                },
            ],
            ..OptionsDefinition::default()
        };
        let options = Options::compile(&def).expect("options compile");

        assert_eq!(
            options.negation_for(&["banner motd x"]).expect("template"),
            "default banner motd x"
        );
        assert!(matches!(
            options.negation_for(&["crypto key generate rsa"]),
            Err(OptionsError::MissingNegationTemplate { .. })
        ));
    }

    #[test]
    fn conflicting_ordering_is_reported() {
        let def = OptionsDefinition {
            ordering: vec![
                OrderingRule {
                    lineage: vec![LineMatch::starts_with("ip route")],
                    weight: 100,
                },
                OrderingRule {
                    lineage: vec![LineMatch { contains: Some("0.0.0.0".into()), ..LineMatch::default() }],
                    weight: 900,
                },
            ],
            ..OptionsDefinition::default()
        };
        let options = Options::compile(&def).expect("options compile");

        assert_eq!(
            options.order_weight(&["ip route 10.0.0.0 255.0.0.0 null0"]).expect("weight"),
            Some(100)
        );
        assert!(matches!(
            options.order_weight(&["ip route 0.0.0.0 0.0.0.0 10.0.0.1"]),
            Err(OptionsError::ConflictingOrder {
                first: 100,
                second: 900,
                ..
            })
        ));
    }

    #[test]
    fn compile_rejects_bad_patterns() {
        let bad_regex = OptionsDefinition {
            ignore_lines: vec!["(".to_string()],
            ..OptionsDefinition::default()
        };
        assert!(matches!(
            Options::compile(&bad_regex),
            Err(OptionsError::InvalidPattern { field: "ignore_lines", .. })
        ));

        let empty_lineage = OptionsDefinition {
            idempotent: vec![LineageRule { lineage: vec![] }],
            ..OptionsDefinition::default()
        };
        assert!(matches!(
            Options::compile(&empty_lineage),
            Err(OptionsError::InvalidRule { rule: "idempotent", index: 0, .. })
        ));

        let zero_indent = OptionsDefinition {
            indent_width: 0,
            ..OptionsDefinition::default()
        };
        assert!(matches!(
            Options::compile(&zero_indent),
            Err(OptionsError::ZeroIndent)
        ));
    }

    #[test]
    fn normalize_applies_substitutions_and_collapses_whitespace() {
        let def = OptionsDefinition {
            line_substitutions: vec![SubstitutionRule {
                search: r"\s+secret 5 \S+".to_string(),
                replace: " secret <removed>".to_string(),
            }],
            ..OptionsDefinition::default()
        };
        let options = Options::compile(&def).expect("options compile");

        assert_eq!(
            options.normalize("  enable   secret 5 $1$abc  "),
            "enable secret <removed>"
        );
        assert_eq!(options.equivalence_key("Description  Uplink"), "description uplink");
    }

    #[test]
    fn ios_skips_show_run_banner() {
        let options = Options::ios();
        assert_eq!(options.ignore_lines.len(), 3);
        assert!(options.is_ignored("Building configuration..."));
        assert!(options.is_ignored("Current configuration : 1024 bytes"));
        assert!(options.is_ignored("end"));
        assert!(!options.is_ignored("end-policy"));
        assert_eq!(
            options.sectional_exit(&["router bgp 1", "address-family ipv4"]),
            Some("exit-address-family")
        );
    }
}
