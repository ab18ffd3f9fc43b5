//! Predict the configuration a device ends up with after remediation.

use crate::diff::result::{Action, RemediationLine, RemediationTree};
use crate::tree::{ConfigLine, ConfigTree, Draft, NodeId};

/// Apply `remediation` to a copy of `running`.
///
/// Removals delete the running node named by their origin. Additions insert
/// their subtree in place of any running lines listed in `replaces`.
pub fn future(running: &ConfigTree, remediation: &RemediationTree) -> ConfigTree {
    let mut level: Vec<Draft<ConfigLine>> = running
        .roots()
        .iter()
        .map(|&id| running.to_draft(id, &|line: &ConfigLine| line.clone()))
        .collect();
    apply_level(&mut level, remediation, remediation.roots());
    ConfigTree::from_drafts(running.indent_width(), level)
}

fn apply_level(level: &mut Vec<Draft<ConfigLine>>, remediation: &RemediationTree, ids: &[NodeId]) {
    for &id in ids {
        let value = remediation.value(id);
        match value.action {
            Action::Remove => {
                if let Some(pos) = position(level, &value.origin) {
                    level.remove(pos);
                }
            }
            Action::Add => {
                level.retain(|draft| !value.replaces.contains(&draft.value.text));
                if position(level, &value.line.text).is_none() {
                    level.push(remediation.to_draft(id, &added_line));
                }
            }
            Action::Unchanged => {
                let pos = match position(level, &value.origin) {
                    Some(pos) => pos,
                    None => {
                        level.push(Draft::new(ConfigLine::new(value.origin.clone())));
                        level.len() - 1
                    }
                };
                apply_level(&mut level[pos].children, remediation, remediation.children(id));
            }
        }
    }
}

fn position(level: &[Draft<ConfigLine>], text: &str) -> Option<usize> {
    level.iter().position(|draft| draft.value.text == text)
}

fn added_line(value: &RemediationLine) -> ConfigLine {
    let mut line = value.line.clone();
    line.order_weight = None;
    line
}
