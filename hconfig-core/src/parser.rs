use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::options::Options;
use crate::tree::{ConfigLine, ConfigTree, NodeId};

/// Errors that can occur while parsing configuration text into a [`ConfigTree`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// A line is nested more than one level below its predecessor.
    #[error("line {line}: indentation skips a nesting level: '{text}'")]
    IndentJump { line: usize, text: String },
    /// Leading whitespace is not a whole number of indent steps.
    #[error("line {line}: indentation of {indent} is not a multiple of {width}: '{text}'")]
    UnevenIndent {
        line: usize,
        indent: usize,
        width: usize,
        text: String,
    },
    /// Normalization left nothing of a non-blank line.
    #[error("line {line}: normalized text is empty: '{raw}'")]
    EmptyLine { line: usize, raw: String },
    /// Failed to read input file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse indented configuration text into a [`ConfigTree`].
pub fn parse(raw: &str, options: &Options) -> Result<ConfigTree, ParseError> {
    let width = options.indent_width();
    let mut tree = ConfigTree::new(width);
    // stack[d] is the open node at depth d
    let mut stack: Vec<NodeId> = Vec::new();
    let mut skipped = 0usize;

    for (idx, raw_line) in raw.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || options.is_ignored(trimmed) {
            skipped += 1;
            continue;
        }

        let indent = indentation(raw_line, width);
        if indent % width != 0 {
            return Err(ParseError::UnevenIndent {
                line: line_no,
                indent,
                width,
                text: trimmed.to_string(),
            });
        }
        let depth = indent / width;
        if depth > stack.len() {
            return Err(ParseError::IndentJump {
                line: line_no,
                text: trimmed.to_string(),
            });
        }

        let text = options.normalize(raw_line);
        if text.is_empty() {
            return Err(ParseError::EmptyLine {
                line: line_no,
                raw: raw_line.to_string(),
            });
        }

        if closes_section(&tree, &stack, depth, &text, options) {
            skipped += 1;
            continue;
        }

        let mut line = ConfigLine::new(text);
        line.negated = options.is_negation(&line.text);

        stack.truncate(depth);
        let id = match stack.last() {
            Some(&parent) => tree.add_child(parent, line),
            None => tree.add_root(line),
        };
        stack.push(id);
    }

    debug!(nodes = tree.len(), skipped, "parsed configuration");
    Ok(tree)
}

/// Parse a configuration file into a [`ConfigTree`].
pub fn parse_file(path: &Path, options: &Options) -> Result<ConfigTree, ParseError> {
    let raw = fs::read_to_string(path)?;
    parse(&raw, options)
}

/// True when `text` is the configured exit of the block it follows or sits in.
fn closes_section(
    tree: &ConfigTree,
    stack: &[NodeId],
    depth: usize,
    text: &str,
    options: &Options,
) -> bool {
    let open: Vec<&str> = stack.iter().map(|&id| tree.text(id)).collect();
    [depth + 1, depth]
        .into_iter()
        .filter(|&len| len > 0 && len <= open.len())
        .any(|len| options.sectional_exit(&open[..len]) == Some(text))
}

fn indentation(line: &str, width: usize) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { width } else { 1 })
        .sum()
}
