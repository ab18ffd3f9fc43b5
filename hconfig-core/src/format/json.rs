use serde::Serialize;

use crate::diff::result::{Action, RemediationTree};
use crate::tree::NodeId;

#[derive(Serialize)]
struct JsonNode<'a> {
    text: &'a str,
    action: Action,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<JsonNode<'a>>,
}

/// Format a remediation tree as nested JSON.
pub fn format_json(tree: &RemediationTree) -> String {
    let nodes: Vec<JsonNode<'_>> = tree.roots().iter().map(|&id| to_json(tree, id)).collect();
    serde_json::to_string_pretty(&nodes).unwrap_or_else(|_| "[]".to_string())
}

fn to_json(tree: &RemediationTree, id: NodeId) -> JsonNode<'_> {
    let value = tree.value(id);
    JsonNode {
        text: &value.line.text,
        action: value.action,
        tags: value.line.tags.iter().map(String::as_str).collect(),
        children: tree
            .children(id)
            .iter()
            .map(|&child| to_json(tree, child))
            .collect(),
    }
}
