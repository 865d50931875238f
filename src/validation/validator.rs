use crate::dockerfile::Dockerfile;
use crate::validation::report::{Report, Severity};
use crate::validation::rules::{
    BaseImageFirstRule, CompileInputStagedRule, CopyDestinationRule, DefaultCommandArgsRule,
    EntryClassCompiledRule, ExecFormShellOperatorsRule, PinnedBaseImageRule,
    RequiredInstructionsRule, SingleDefaultCommandRule, StageReferenceRule, ValidationRule,
    WorkdirAbsoluteRule,
};
use anyhow::Result;
use tracing::debug;

pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run every rule and collect all findings
    pub fn lint(&self, dockerfile: &Dockerfile) -> Report {
        let mut diagnostics = Vec::new();
        for rule in &self.rules {
            let found = rule.check(dockerfile);
            debug!(rule = rule.name(), findings = found.len(), "Rule checked");
            diagnostics.extend(found);
        }
        Report::new(diagnostics)
    }

    /// Fail on the first error-severity finding
    pub fn validate(&self, dockerfile: &Dockerfile) -> Result<()> {
        for rule in &self.rules {
            if let Some(d) = rule
                .check(dockerfile)
                .into_iter()
                .find(|d| d.severity == Severity::Error)
            {
                anyhow::bail!("[{}] {}", rule.name(), d.message);
            }
        }
        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(RequiredInstructionsRule),
                Box::new(BaseImageFirstRule),
                Box::new(StageReferenceRule),
                Box::new(CompileInputStagedRule),
                Box::new(DefaultCommandArgsRule),
                Box::new(EntryClassCompiledRule),
                Box::new(ExecFormShellOperatorsRule),
                Box::new(WorkdirAbsoluteRule),
                Box::new(PinnedBaseImageRule),
                Box::new(SingleDefaultCommandRule),
                Box::new(CopyDestinationRule),
            ],
        }
    }
}
