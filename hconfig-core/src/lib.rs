//! Hierarchical configuration engine: parse indented device configuration
//! into trees, diff a running tree against a compiled one, and render an
//! ordered remediation plan, optionally filtered by tags.

pub mod diff;
pub mod format;
pub mod future;
pub mod host;
pub mod matcher;
pub mod options;
pub mod parser;
pub mod tags;
pub mod tree;
pub mod writer;

pub use diff::{diff, Action, RemediationLine, RemediationTree};
pub use format::{format_json, format_summary, render, render_lines, render_text, RenderedLine};
pub use future::future;
pub use host::{Host, HostError};
pub use matcher::{CompiledLineage, LineMatch, LineageError, OneOrMany};
pub use options::{Options, OptionsDefinition, OptionsError};
pub use parser::{parse, parse_file, ParseError};
pub use tags::{apply_tags, compile_rules, filter, TagRule, TagRuleDefinition, TagRuleError};
pub use tree::{ConfigLine, ConfigTree, Draft, LineValue, NodeId, Tree};
pub use writer::{write, write_file, WriteError};
