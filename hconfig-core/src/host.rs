//! Per-device remediation workflow.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::diff::{diff, RemediationTree};
use crate::format::render;
use crate::future::future;
use crate::options::{Options, OptionsError};
use crate::parser::{parse, ParseError};
use crate::tags::{apply_tags, filter, TagRule, TagRuleError};
use crate::tree::ConfigTree;

/// Errors surfaced by [`Host`].
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Options(#[from] OptionsError),
    #[error(transparent)]
    TagRule(#[from] TagRuleError),
    #[error("{0} configuration has not been loaded")]
    MissingConfig(&'static str),
}

/// One device: its platform options, tag rules, both configurations and the
/// cached remediation.
#[derive(Debug, Clone)]
pub struct Host {
    hostname: String,
    options: Arc<Options>,
    tag_rules: Arc<[TagRule]>,
    running: Option<ConfigTree>,
    compiled: Option<ConfigTree>,
    remediation: Option<RemediationTree>,
}

impl Host {
    pub fn new(hostname: impl Into<String>, options: impl Into<Arc<Options>>) -> Self {
        Self {
            hostname: hostname.into(),
            options: options.into(),
            tag_rules: Arc::from(Vec::new()),
            running: None,
            compiled: None,
            remediation: None,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn running(&self) -> Option<&ConfigTree> {
        self.running.as_ref()
    }

    pub fn compiled(&self) -> Option<&ConfigTree> {
        self.compiled.as_ref()
    }

    pub fn load_running(&mut self, raw: &str) -> Result<(), HostError> {
        self.running = Some(parse(raw, &self.options)?);
        self.remediation = None;
        Ok(())
    }

    pub fn load_compiled(&mut self, raw: &str) -> Result<(), HostError> {
        self.compiled = Some(parse(raw, &self.options)?);
        self.remediation = None;
        Ok(())
    }

    /// Replace the tag rules applied to the remediation.
    pub fn load_tags(&mut self, rules: impl Into<Arc<[TagRule]>>) {
        self.tag_rules = rules.into();
        self.remediation = None;
    }

    /// Diff running against compiled and tag the result. Cached until an
    /// input changes.
    pub fn load_remediation(&mut self) -> Result<&RemediationTree, HostError> {
        if self.remediation.is_none() {
            let running = self.running.as_ref().ok_or(HostError::MissingConfig("running"))?;
            let compiled = self
                .compiled
                .as_ref()
                .ok_or(HostError::MissingConfig("compiled"))?;

            let mut remediation = diff(running, compiled, &self.options)?;
            apply_tags(&mut remediation, &self.tag_rules);
            let (add, remove, _) = remediation.action_counts();
            info!(hostname = %self.hostname, add, remove, "generated remediation");
            self.remediation = Some(remediation);
        }
        self.remediation
            .as_ref()
            .ok_or(HostError::MissingConfig("remediation"))
    }

    /// Remediation restricted by tags. The cached remediation is not modified.
    pub fn filter_remediation(
        &mut self,
        include: &[String],
        exclude: &[String],
    ) -> Result<RemediationTree, HostError> {
        let remediation = self.load_remediation()?;
        Ok(filter(remediation, include, exclude))
    }

    /// Rendered remediation commands, filtered when any tags are given.
    pub fn remediation_lines(
        &mut self,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<String>, HostError> {
        if include.is_empty() && exclude.is_empty() {
            return Ok(render(self.load_remediation()?));
        }
        Ok(render(&self.filter_remediation(include, exclude)?))
    }

    /// Configuration expected on the device after the full remediation.
    pub fn future_config(&mut self) -> Result<ConfigTree, HostError> {
        self.load_remediation()?;
        match (&self.running, &self.remediation) {
            (Some(running), Some(remediation)) => Ok(future(running, remediation)),
            _ => Err(HostError::MissingConfig("running")),
        }
    }
}
