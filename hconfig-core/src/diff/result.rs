use serde::Serialize;

use crate::tree::{ConfigLine, LineValue, Tree};

/// What a remediation node does to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Configure the line.
    Add,
    /// Un-configure the line (the emitted text is the negation).
    Remove,
    /// Context for changed descendants; never a change itself.
    Unchanged,
}

/// One node of a remediation tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemediationLine {
    /// Text to emit.
    #[serde(flatten)]
    pub line: ConfigLine,
    pub action: Action,
    /// Running or compiled text the action was derived from.
    pub origin: String,
    /// Running lines this addition overwrites in place.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replaces: Vec<String>,
    /// Command closing the block after its children.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_text: Option<String>,
}

impl RemediationLine {
    pub fn new(line: ConfigLine, action: Action, origin: impl Into<String>) -> Self {
        Self {
            line,
            action,
            origin: origin.into(),
            replaces: Vec::new(),
            exit_text: None,
        }
    }

    /// True for additions and removals.
    pub fn is_change(&self) -> bool {
        self.action != Action::Unchanged
    }
}

impl LineValue for RemediationLine {
    fn line(&self) -> &ConfigLine {
        &self.line
    }

    fn line_mut(&mut self) -> &mut ConfigLine {
        &mut self.line
    }
}

/// Tree of remediation actions, same shape as a config tree.
pub type RemediationTree = Tree<RemediationLine>;

impl RemediationTree {
    /// Count of (additions, removals, context nodes).
    pub fn action_counts(&self) -> (usize, usize, usize) {
        self.walk().fold((0, 0, 0), |(add, remove, context), id| {
            match self.value(id).action {
                Action::Add => (add + 1, remove, context),
                Action::Remove => (add, remove + 1, context),
                Action::Unchanged => (add, remove, context + 1),
            }
        })
    }

    /// True when at least one node adds or removes configuration.
    pub fn has_changes(&self) -> bool {
        self.walk().any(|id| self.value(id).is_change())
    }
}
