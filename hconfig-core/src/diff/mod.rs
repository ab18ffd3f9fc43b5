//! Structural diffing of configuration trees into remediation trees.

pub mod engine;
pub mod result;

pub use engine::diff;
pub use result::{Action, RemediationLine, RemediationTree};
