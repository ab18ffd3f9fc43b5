use colored::Colorize;
use hconfig_core::{format_summary, render_lines, Action, ConfigTree, NodeId, RemediationTree};

/// Render remediation commands for terminal output.
pub fn render_remediation(tree: &RemediationTree) -> String {
    render_lines(tree)
        .into_iter()
        .map(|line| match line.action {
            Action::Add => line.text.green().to_string(),
            Action::Remove => line.text.red().to_string(),
            Action::Unchanged => line.text,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render summary counts for terminal output.
pub fn render_summary(tree: &RemediationTree) -> String {
    format_summary(tree).cyan().to_string()
}

/// Render a parsed configuration tree down to `max_depth`, with tags.
pub fn render_tree(tree: &ConfigTree, max_depth: Option<usize>) -> String {
    let mut out = String::new();
    for &root in tree.roots() {
        render_node(tree, root, 0, max_depth, &mut out);
    }
    out
}

fn render_node(
    tree: &ConfigTree,
    id: NodeId,
    depth: usize,
    max_depth: Option<usize>,
    out: &mut String,
) {
    let line = tree.value(id);
    out.push_str(&"  ".repeat(depth));
    out.push_str(&line.text);
    if !line.tags.is_empty() {
        let tags: Vec<&str> = line.tags.iter().map(String::as_str).collect();
        out.push_str(&format!(" [{}]", tags.join(",")).yellow().to_string());
    }
    out.push('\n');

    if max_depth.is_some_and(|max| depth >= max) {
        return;
    }
    for &child in tree.children(id) {
        render_node(tree, child, depth + 1, max_depth, out);
    }
}
