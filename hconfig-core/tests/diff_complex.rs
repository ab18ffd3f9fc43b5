use std::fs;
use std::path::PathBuf;

use hconfig_core::{
    apply_tags, compile_rules, diff, filter, parse_file, render, Action, Options,
    OptionsDefinition, RemediationTree, TagRuleDefinition,
};
use pretty_assertions::assert_eq;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn ios_options() -> Options {
    let raw = fs::read_to_string(fixture(
        "fixtures/roles/os_ios/vars/hierarchical_configuration_options.yml",
    ))
    .expect("options fixture");
    let def: OptionsDefinition = serde_yaml::from_str(&raw).expect("options yaml");
    Options::compile(&def).expect("options compile")
}

fn ios_remediation(options: &Options) -> RemediationTree {
    let running = parse_file(&fixture("fixtures/ios/running.conf"), options).expect("running");
    let compiled = parse_file(&fixture("fixtures/ios/compiled.conf"), options).expect("compiled");
    let mut remediation = diff(&running, &compiled, options).expect("diff");

    let raw = fs::read_to_string(fixture(
        "fixtures/roles/os_ios/vars/hierarchical_configuration_tags.yml",
    ))
    .expect("tags fixture");
    let defs: Vec<TagRuleDefinition> = serde_yaml::from_str(&raw).expect("tags yaml");
    apply_tags(&mut remediation, &compile_rules(&defs).expect("tag rules"));
    remediation
}

#[test]
fn ios_fixture_matches_expected_remediation() {
    let options = ios_options();
    let remediation = ios_remediation(&options);

    let expected = fs::read_to_string(fixture("fixtures/ios/remediation.conf")).expect("expected");
    let expected: Vec<&str> = expected.lines().collect();
    assert_eq!(render(&remediation), expected);
}

#[test]
fn emitted_children_always_follow_their_parent() {
    let options = ios_options();
    let remediation = ios_remediation(&options);
    let lines = render(&remediation);

    for id in remediation.walk() {
        let Some(parent) = remediation.parent(id) else {
            continue;
        };
        // removals cover their whole subtree
        assert_ne!(remediation.value(parent).action, Action::Remove);

        let depth = remediation.depth(id);
        let child_line = format!("{}{}", " ".repeat(depth), remediation.text(id));
        let parent_line = format!("{}{}", " ".repeat(depth - 1), remediation.text(parent));
        let child_pos = lines.iter().position(|l| *l == child_line);
        let parent_pos = lines.iter().position(|l| *l == parent_line);
        if let Some(child_pos) = child_pos {
            let parent_pos = parent_pos.expect("parent must be emitted");
            assert!(parent_pos < child_pos);
        }
    }
}

#[test]
fn safe_filter_keeps_parent_context() {
    let options = ios_options();
    let remediation = ios_remediation(&options);

    let safe = filter(&remediation, &["safe".to_string()], &[]);
    assert_eq!(
        render(&safe),
        vec![
            "hostname edge-new",
            "interface GigabitEthernet0/1",
            " description new uplink",
            "vlan 20",
            " name TEST",
        ]
    );

    let no_routing = filter(&remediation, &[], &["routing".to_string()]);
    let rendered = render(&no_routing);
    assert!(!rendered.iter().any(|l| l.contains("ip route")));
    assert!(!rendered.iter().any(|l| l.contains("router bgp")));
    assert!(rendered.contains(&"logging console debugging".to_string()));

    // filtering twice from the same base gives the same answer
    assert_eq!(
        render(&filter(&remediation, &["safe".to_string()], &[])),
        render(&safe)
    );
}

#[test]
fn every_filtered_node_has_its_parent_chain() {
    let options = ios_options();
    let remediation = ios_remediation(&options);

    let cases: [&[&str]; 4] = [&["safe"], &["interface"], &["routing"], &["system"]];
    for include in cases {
        let include: Vec<String> = include.iter().map(ToString::to_string).collect();
        let filtered = filter(&remediation, &include, &[]);
        for id in filtered.walk() {
            let path = filtered.path(id);
            assert!(
                remediation.find(&path).is_some(),
                "path {path:?} missing from base remediation"
            );
            assert_eq!(filtered.find(&path), Some(id));
        }
    }
}
