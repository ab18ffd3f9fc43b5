//! Command-line front end for the hierarchical configuration engine.
//!
//! Mirrors the remediation workflow of an automation run: load the platform
//! definitions of an OS role, read the running and compiled configuration of
//! one host, write the remediation commands and report whether anything
//! changed.
//!
//! - [`platform`] loads options and tag rules from a role directory,
//!   explicit YAML/TOML files or the embedded platform definitions.
//! - [`report`] renders remediation plans and parsed trees for the terminal.

pub mod platform;
pub mod report;
