use std::fs;

use hconfig_core::{diff, future, parse, parse_file, write, write_file, Options};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

const RUNNING: &str = "\
hostname r1
interface Gi0/1
 description uplink
 ip address 10.0.0.1 255.255.255.0
router bgp 100
 address-family ipv4
  neighbor 10.0.0.2 activate
";

#[test]
fn written_tree_parses_back_to_the_same_structure() {
    let options = Options::ios();
    let tree = parse(RUNNING, &options).expect("parse");
    let text = write(&tree);
    assert_eq!(text, RUNNING);

    let reparsed = parse(&text, &options).expect("reparse");
    assert!(tree.structurally_eq(&reparsed));
}

#[test]
fn future_configuration_is_written_to_disk() {
    let options = Options::ios();
    let running = parse(RUNNING, &options).expect("running");
    let compiled = parse(
        "hostname r2\ninterface Gi0/1\n description core\n ip address 10.0.0.1 255.255.255.0\n",
        &options,
    )
    .expect("compiled");

    let remediation = diff(&running, &compiled, &options).expect("diff");
    let projected = future(&running, &remediation);

    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("future.conf");
    write_file(&projected, &path).expect("write");

    let written = fs::read_to_string(&path).expect("read back");
    assert!(written.contains("hostname r2\n"));
    assert!(!written.contains("router bgp"));

    let reparsed = parse_file(&path, &options).expect("parse written file");
    assert!(reparsed.structurally_eq(&compiled));
}
