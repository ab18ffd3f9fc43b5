use tracing::debug;

use crate::diff::result::{Action, RemediationLine, RemediationTree};
use crate::options::{Options, OptionsError};
use crate::tree::{ConfigLine, ConfigTree, Draft, NodeId};

/// Diff a running tree against a compiled tree.
///
/// The inputs are never mutated. Siblings are matched by normalized text;
/// unmatched compiled nodes become additions (with every descendant) and
/// unmatched running nodes become a single negation covering their subtree.
pub fn diff(
    running: &ConfigTree,
    compiled: &ConfigTree,
    options: &Options,
) -> Result<RemediationTree, OptionsError> {
    let differ = Differ {
        running,
        compiled,
        options,
    };
    let drafts = differ.diff_level(running.roots(), compiled.roots(), &[])?;
    let tree = RemediationTree::from_drafts(options.indent_width(), drafts);

    let (add, remove, context) = tree.action_counts();
    debug!(add, remove, context, "computed remediation");
    Ok(tree)
}

/// Emission phase among siblings with equal weight. Context blocks and
/// additions share a phase so they keep compiled order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Remove,
    Build,
    LateRemove,
}

struct Pending {
    phase: Phase,
    draft: Draft<RemediationLine>,
}

struct Differ<'a> {
    running: &'a ConfigTree,
    compiled: &'a ConfigTree,
    options: &'a Options,
}

impl<'a> Differ<'a> {
    fn diff_level(
        &self,
        running_ids: &[NodeId],
        compiled_ids: &[NodeId],
        parent: &[&'a str],
    ) -> Result<Vec<Draft<RemediationLine>>, OptionsError> {
        let mut running_used = vec![false; running_ids.len()];
        let mut matches: Vec<Option<usize>> = vec![None; compiled_ids.len()];

        for (ci, &cid) in compiled_ids.iter().enumerate() {
            let text = self.compiled.text(cid);
            let hit = (0..running_ids.len())
                .find(|&ri| !running_used[ri] && self.running.text(running_ids[ri]) == text);
            if let Some(ri) = hit {
                running_used[ri] = true;
                matches[ci] = Some(ri);
            }
        }

        let compiled_family: Vec<Option<usize>> = compiled_ids
            .iter()
            .map(|&cid| {
                self.options
                    .idempotent_family(&child_path(parent, self.compiled.text(cid)))
            })
            .collect();
        let running_family: Vec<Option<usize>> = running_ids
            .iter()
            .map(|&rid| {
                self.options
                    .idempotent_family(&child_path(parent, self.running.text(rid)))
            })
            .collect();

        // An equivalent running command satisfies an idempotent compiled one.
        for ci in 0..compiled_ids.len() {
            if matches[ci].is_some() {
                continue;
            }
            let Some(family) = compiled_family[ci] else {
                continue;
            };
            let key = self
                .options
                .equivalence_key(self.compiled.text(compiled_ids[ci]));
            let hit = (0..running_ids.len()).find(|&ri| {
                !running_used[ri]
                    && running_family[ri] == Some(family)
                    && self
                        .options
                        .equivalence_key(self.running.text(running_ids[ri]))
                        == key
            });
            if let Some(ri) = hit {
                running_used[ri] = true;
                matches[ci] = Some(ri);
            }
        }

        let mut pending = Vec::new();
        let mut add_slot: Vec<Option<usize>> = vec![None; compiled_ids.len()];

        for (ci, &cid) in compiled_ids.iter().enumerate() {
            match matches[ci] {
                Some(ri) => {
                    if let Some(draft) = self.diff_matched(running_ids[ri], cid, parent)? {
                        pending.push(Pending {
                            phase: Phase::Build,
                            draft,
                        });
                    }
                }
                None => {
                    add_slot[ci] = Some(pending.len());
                    pending.push(Pending {
                        phase: Phase::Build,
                        draft: self.build_add(cid, parent)?,
                    });
                }
            }
        }

        for (ri, &rid) in running_ids.iter().enumerate() {
            if running_used[ri] {
                continue;
            }
            let text = self.running.text(rid);

            // Idempotent families are overwritten in place by the new command.
            if let Some(family) = running_family[ri] {
                let slot = (0..compiled_ids.len()).find_map(|ci| match add_slot[ci] {
                    Some(slot) if compiled_family[ci] == Some(family) => Some(slot),
                    _ => None,
                });
                if let Some(slot) = slot {
                    pending[slot].draft.value.replaces.push(text.to_string());
                    continue;
                }
            }

            let removal = self.build_remove(rid, parent)?;
            if removal.draft.value.action == Action::Remove {
                let negation = removal.draft.value.line.text.as_str();
                let slot = (0..compiled_ids.len()).find_map(|ci| match add_slot[ci] {
                    Some(slot) if self.compiled.text(compiled_ids[ci]) == negation => Some(slot),
                    _ => None,
                });
                if let Some(slot) = slot {
                    pending[slot].draft.value.replaces.push(text.to_string());
                    continue;
                }
            }
            pending.push(removal);
        }

        Ok(into_ordered(pending))
    }

    fn diff_matched(
        &self,
        rid: NodeId,
        cid: NodeId,
        parent: &[&'a str],
    ) -> Result<Option<Draft<RemediationLine>>, OptionsError> {
        let path = child_path(parent, self.compiled.text(cid));
        let children =
            self.diff_level(self.running.children(rid), self.compiled.children(cid), &path)?;
        if children.is_empty() {
            return Ok(None);
        }

        let mut line = self.compiled.value(cid).clone();
        line.tags.extend(self.running.value(rid).tags.iter().cloned());
        line.order_weight = self.options.order_weight(&path)?;

        let mut value = RemediationLine::new(line, Action::Unchanged, self.running.text(rid));
        value.exit_text = self.options.sectional_exit(&path).map(ToString::to_string);
        Ok(Some(Draft { value, children }))
    }

    fn build_add(
        &self,
        cid: NodeId,
        parent: &[&'a str],
    ) -> Result<Draft<RemediationLine>, OptionsError> {
        let text = self.compiled.text(cid);
        let path = child_path(parent, text);

        let mut line = self.compiled.value(cid).clone();
        line.order_weight = self.options.order_weight(&path)?;
        let mut value = RemediationLine::new(line, Action::Add, text);
        value.exit_text = self.options.sectional_exit(&path).map(ToString::to_string);

        let mut children = self
            .compiled
            .children(cid)
            .iter()
            .map(|&child| self.build_add(child, &path))
            .collect::<Result<Vec<_>, _>>()?;
        children.sort_by_key(|child| child.value.line.weight());

        Ok(Draft { value, children })
    }

    fn build_remove(&self, rid: NodeId, parent: &[&'a str]) -> Result<Pending, OptionsError> {
        let text = self.running.text(rid);
        let path = child_path(parent, text);
        let source = self.running.value(rid);
        let order_weight = self.options.order_weight(&path)?;

        let children = self.running.children(rid);
        if !children.is_empty() && self.options.is_per_child_removal(&path) {
            let removals = children
                .iter()
                .map(|&child| self.build_remove(child, &path))
                .collect::<Result<Vec<_>, _>>()?;

            let mut line = source.clone();
            line.order_weight = order_weight;
            let mut value = RemediationLine::new(line, Action::Unchanged, text);
            value.exit_text = self.options.sectional_exit(&path).map(ToString::to_string);
            return Ok(Pending {
                phase: Phase::Remove,
                draft: Draft {
                    value,
                    children: into_ordered(removals),
                },
            });
        }

        let line = ConfigLine {
            text: self.options.negation_for(&path)?,
            tags: source.tags.clone(),
            negated: true,
            order_weight,
        };
        let phase = if self.options.is_create_before_destroy(&path) {
            Phase::LateRemove
        } else {
            Phase::Remove
        };
        Ok(Pending {
            phase,
            draft: Draft::new(RemediationLine::new(line, Action::Remove, text)),
        })
    }
}

fn child_path<'a>(parent: &[&'a str], text: &'a str) -> Vec<&'a str> {
    let mut path = Vec::with_capacity(parent.len() + 1);
    path.extend_from_slice(parent);
    path.push(text);
    path
}

fn into_ordered(mut pending: Vec<Pending>) -> Vec<Draft<RemediationLine>> {
    pending.sort_by_key(|p| (p.draft.value.line.weight(), p.phase));
    pending.into_iter().map(|p| p.draft).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::diff;
    use crate::diff::result::Action;
    use crate::format::render;
    use crate::matcher::LineMatch;
    use crate::options::{LineageRule, NegateWithRule, Options, OptionsDefinition, OptionsError};
    use crate::parser::parse;

    fn remediate(running: &str, compiled: &str, options: &Options) -> Vec<String> {
        let running = parse(running, options).expect("running parse");
        let compiled = parse(compiled, options).expect("compiled parse");
        render(&diff(&running, &compiled, options).expect("diff"))
    }

    #[test]
    fn removals_come_before_additions() {
        let lines = remediate(
            "ip route 10.0.0.0 255.0.0.0 192.0.2.1\n",
            "ip route 10.0.0.0 255.0.0.0 192.0.2.2\n",
            &Options::default(),
        );
        assert_eq!(
            lines,
            vec![
                "no ip route 10.0.0.0 255.0.0.0 192.0.2.1",
                "ip route 10.0.0.0 255.0.0.0 192.0.2.2",
            ]
        );
    }

    #[test]
    fn create_before_destroy_defers_removal() {
        let def = OptionsDefinition {
            create_before_destroy: vec![LineageRule {
                lineage: vec![
                    LineMatch::starts_with("interface"),
                    LineMatch::starts_with("ip address"),
                ],
            }],
            ..OptionsDefinition::default()
        };
        let options = Options::compile(&def).expect("options");
        let lines = remediate(
            "interface Vlan10\n ip address 10.0.0.1 255.255.255.0\n",
            "interface Vlan10\n ip address 10.0.0.2 255.255.255.0\n",
            &options,
        );
        assert_eq!(
            lines,
            vec![
                "interface Vlan10",
                " ip address 10.0.0.2 255.255.255.0",
                " no ip address 10.0.0.1 255.255.255.0",
            ]
        );
    }

    #[test]
    fn idempotent_family_wins_over_create_before_destroy() {
        let def = OptionsDefinition {
            create_before_destroy: vec![LineageRule {
                lineage: vec![LineMatch::starts_with("hostname")],
            }],
            idempotent: vec![LineageRule {
                lineage: vec![LineMatch::starts_with("hostname")],
            }],
            ..OptionsDefinition::default()
        };
        let options = Options::compile(&def).expect("options");
        let lines = remediate("hostname old\n", "hostname new\n", &options);
        assert_eq!(lines, vec!["hostname new"]);
    }

    #[test]
    fn equivalent_idempotent_command_is_not_re_added() {
        let options = Options::ios();
        let lines = remediate(
            "interface Gi0/1\n description Uplink\n",
            "interface Gi0/1\n description UPLINK\n",
            &options,
        );
        assert!(lines.is_empty());
    }

    #[test]
    fn per_child_removal_negates_children_in_context() {
        let def = OptionsDefinition {
            per_child_removal: vec![LineageRule {
                lineage: vec![LineMatch::starts_with("line vty")],
            }],
            ..OptionsDefinition::default()
        };
        let options = Options::compile(&def).expect("options");
        let running = parse(
            "line vty 0 4\n transport input ssh\n exec-timeout 5 0\n",
            &options,
        )
        .expect("parse");
        let compiled = parse("", &options).expect("parse");
        let tree = diff(&running, &compiled, &options).expect("diff");

        let root = tree.roots()[0];
        assert_eq!(tree.value(root).action, Action::Unchanged);
        assert_eq!(
            render(&tree),
            vec![
                "line vty 0 4",
                " no transport input ssh",
                " no exec-timeout 5 0",
            ]
        );
    }

    #[test]
    fn negated_replacement_is_emitted_once() {
        let lines = remediate(
            "interface Gi0/1\n shutdown\n",
            "interface Gi0/1\n no shutdown\n",
            &Options::default(),
        );
        assert_eq!(lines, vec!["interface Gi0/1", " no shutdown"]);
    }

    #[test]
    fn diff_reports_negation_rule_without_template() {
        let def = OptionsDefinition {
            negate_with: vec![NegateWithRule {
                lineage: vec![LineMatch::starts_with("crypto key")],
                template: None,
            }],
            ..OptionsDefinition::default()
        };
        let options = Options::compile(&def).expect("options");
        let running = parse("hostname r1\ncrypto key generate rsa\n", &options).expect("parse");
        let compiled = parse("hostname r1\n", &options).expect("parse");

        let err = diff(&running, &compiled, &options).expect_err("no template");
        assert!(matches!(
            err,
            OptionsError::MissingNegationTemplate { ref path } if path == "crypto key generate rsa"
        ));
    }

    #[test]
    fn ordering_weight_reorders_siblings() {
        let lines = remediate(
            "",
            "interface Gi0/1\n no shutdown\n description new\n",
            &Options::ios(),
        );
        assert_eq!(
            lines,
            vec!["interface Gi0/1", " description new", " no shutdown"]
        );
    }

    #[test]
    fn sectional_exit_closes_changed_block() {
        let lines = remediate(
            "router bgp 100\n address-family ipv4\n  neighbor 10.0.0.1 activate\n",
            "router bgp 100\n address-family ipv4\n  neighbor 10.0.0.2 activate\n",
            &Options::ios(),
        );
        assert_eq!(
            lines,
            vec![
                "router bgp 100",
                " address-family ipv4",
                "  no neighbor 10.0.0.1 activate",
                "  neighbor 10.0.0.2 activate",
                " exit-address-family",
            ]
        );
    }
}
