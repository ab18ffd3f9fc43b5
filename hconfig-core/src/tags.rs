//! Declarative tagging and tag-based filtering of remediation trees.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::diff::result::{Action, RemediationLine, RemediationTree};
use crate::matcher::{CompiledLineage, LineMatch, LineageError, OneOrMany};
use crate::tree::{Draft, LineValue, NodeId, Tree};

/// Errors raised while compiling tag rules.
#[derive(Debug, Error)]
pub enum TagRuleError {
    #[error("tag rule #{index}: {source}")]
    InvalidLineage {
        index: usize,
        #[source]
        source: LineageError,
    },
    #[error("tag rule #{index} adds no tags")]
    NoTags { index: usize },
    #[error("tag rule #{index} has an empty tag name")]
    EmptyTag { index: usize },
}

/// A tag rule as loaded from a definition file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagRuleDefinition {
    pub lineage: Vec<LineMatch>,
    pub add_tags: OneOrMany,
}

/// A compiled tag rule. Matches a node when the lineage matches a prefix of
/// its path, so a tagged block tags everything nested in it.
#[derive(Debug, Clone)]
pub struct TagRule {
    lineage: CompiledLineage,
    tags: Vec<String>,
}

impl TagRule {
    pub fn new(lineage: CompiledLineage, tags: Vec<String>) -> Self {
        Self { lineage, tags }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn matches<S: AsRef<str>>(&self, path: &[S]) -> bool {
        self.lineage.matches_prefix(path)
    }

    fn compile(index: usize, def: &TagRuleDefinition) -> Result<Self, TagRuleError> {
        let lineage = CompiledLineage::compile(&def.lineage)
            .map_err(|source| TagRuleError::InvalidLineage { index, source })?;
        let tags = def.add_tags.to_vec();
        if tags.is_empty() {
            return Err(TagRuleError::NoTags { index });
        }
        if tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(TagRuleError::EmptyTag { index });
        }
        Ok(Self { lineage, tags })
    }
}

/// Compile tag rule definitions, failing on the first invalid rule.
pub fn compile_rules(defs: &[TagRuleDefinition]) -> Result<Vec<TagRule>, TagRuleError> {
    defs.iter()
        .enumerate()
        .map(|(index, def)| TagRule::compile(index, def))
        .collect()
}

/// Add the tags of every matching rule to each node. Existing tags are kept.
pub fn apply_tags<T: LineValue>(tree: &mut Tree<T>, rules: &[TagRule]) {
    let ids: Vec<NodeId> = tree.walk().collect();
    let mut tagged = 0usize;
    for id in ids {
        let matched: Vec<String> = {
            let path = tree.path(id);
            rules
                .iter()
                .filter(|rule| rule.matches(&path))
                .flat_map(|rule| rule.tags.iter().cloned())
                .collect()
        };
        if !matched.is_empty() {
            tagged += 1;
            tree.value_mut(id).line_mut().tags.extend(matched);
        }
    }
    debug!(tagged, rules = rules.len(), "applied tag rules");
}

/// Return a copy of `tree` restricted to nodes selected by tags.
///
/// A changed node is selected when it carries one of `include` (or `include`
/// is empty) and none of `exclude`. Ancestors of selected nodes are kept as
/// unchanged placeholders so no command loses its parent context.
pub fn filter(tree: &RemediationTree, include: &[String], exclude: &[String]) -> RemediationTree {
    let drafts = tree
        .roots()
        .iter()
        .filter_map(|&id| filter_node(tree, id, include, exclude))
        .collect();
    let filtered = RemediationTree::from_drafts(tree.indent_width(), drafts);
    debug!(
        before = tree.len(),
        after = filtered.len(),
        "filtered remediation"
    );
    filtered
}

fn filter_node(
    tree: &RemediationTree,
    id: NodeId,
    include: &[String],
    exclude: &[String],
) -> Option<Draft<RemediationLine>> {
    let value = tree.value(id);
    let children: Vec<_> = tree
        .children(id)
        .iter()
        .filter_map(|&child| filter_node(tree, child, include, exclude))
        .collect();

    let selected = value.is_change()
        && (include.is_empty() || value.line.has_any_tag(include))
        && !value.line.has_any_tag(exclude);
    if !selected && children.is_empty() {
        return None;
    }

    let mut value = value.clone();
    if !selected {
        value.action = Action::Unchanged;
    }
    Some(Draft { value, children })
}
