use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::tree::{ConfigTree, NodeId};

/// Errors that can occur while writing a [`ConfigTree`].
#[derive(Debug, Error)]
pub enum WriteError {
    /// Failed to write output file.
    #[error("failed to write config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialize a [`ConfigTree`] as indented configuration text.
pub fn write(tree: &ConfigTree) -> String {
    let mut out = String::new();
    for &root in tree.roots() {
        write_node(tree, root, 0, &mut out);
    }
    out
}

/// Serialize a [`ConfigTree`] and write it to `path`.
pub fn write_file(tree: &ConfigTree, path: &Path) -> Result<(), WriteError> {
    fs::write(path, write(tree))?;
    Ok(())
}

fn write_node(tree: &ConfigTree, id: NodeId, depth: usize, out: &mut String) {
    out.push_str(&" ".repeat(depth * tree.indent_width()));
    out.push_str(tree.text(id));
    out.push('\n');
    for &child in tree.children(id) {
        write_node(tree, child, depth + 1, out);
    }
}
