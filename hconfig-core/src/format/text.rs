use crate::diff::result::{Action, RemediationTree};
use crate::tree::NodeId;

/// One emitted line together with the action of the node that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub action: Action,
    pub text: String,
}

/// Render a remediation tree as ordered, indented command lines.
///
/// Nodes are emitted parent-first. An unchanged node is emitted only as
/// context for changed descendants. Command text is never altered.
pub fn render(tree: &RemediationTree) -> Vec<String> {
    render_lines(tree)
        .into_iter()
        .map(|line| line.text)
        .collect()
}

/// Like [`render`], keeping the action behind every line.
pub fn render_lines(tree: &RemediationTree) -> Vec<RenderedLine> {
    let mut lines = Vec::new();
    for &root in tree.roots() {
        render_node(tree, root, 0, &mut lines);
    }
    lines
}

/// Render a remediation tree as a single newline-separated string.
pub fn render_text(tree: &RemediationTree) -> String {
    render(tree).join("\n")
}

/// Format a simple summary of action counts.
pub fn format_summary(tree: &RemediationTree) -> String {
    let (add, remove, context) = tree.action_counts();
    format!("add={add} remove={remove} context={context}")
}

fn render_node(tree: &RemediationTree, id: NodeId, depth: usize, out: &mut Vec<RenderedLine>) {
    let value = tree.value(id);
    let mut nested = Vec::new();
    for &child in tree.children(id) {
        render_node(tree, child, depth + 1, &mut nested);
    }
    if !value.is_change() && nested.is_empty() {
        return;
    }

    let indent = " ".repeat(depth * tree.indent_width());
    out.push(RenderedLine {
        action: value.action,
        text: format!("{indent}{}", value.line.text),
    });
    let closes_block = !nested.is_empty();
    out.extend(nested);

    if let Some(exit) = value.exit_text.as_deref().filter(|_| closes_block) {
        out.push(RenderedLine {
            action: value.action,
            text: format!("{indent}{exit}"),
        });
    }
}
