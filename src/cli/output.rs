//! Output formatting for multiple formats
//!
//! Every command result can be rendered as JSON, YAML or human-readable text.
//! Machine formats serialize the same structures the library returns, so they
//! stay stable across releases.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::RunboxConfig;
use crate::dockerfile::{Dockerfile, Line};
use crate::runtime::Language;
use crate::sandbox::ExecutionOutcome;
use crate::validation::{Report, Severity};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// Lint findings for one file, or the reason it could not be linted
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LintResult {
    pub fn linted(path: impl Into<String>, report: Report) -> Self {
        Self {
            path: path.into(),
            report: Some(report),
            error: None,
        }
    }

    pub fn failed(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            report: None,
            error: Some(error.into()),
        }
    }
}

/// Catalog row for the `languages` command
#[derive(Debug, Clone, Serialize)]
pub struct LanguageInfo {
    pub id: &'static str,
    pub name: String,
    pub extension: &'static str,
    pub base_image: String,
    pub image_tag: String,
    pub compiled: bool,
}

impl From<Language> for LanguageInfo {
    fn from(language: Language) -> Self {
        let runtime = language.runtime();
        Self {
            id: language.id(),
            name: runtime.name().to_string(),
            extension: language.extension(),
            base_image: runtime.base_image().to_string(),
            image_tag: language.image_tag(),
            compiled: runtime.compile_command("a", "a").is_some(),
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn serialize<T: Serialize + ?Sized>(&self, value: &T, what: &str) -> Result<Option<String>> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(value)
                .map(Some)
                .with_context(|| format!("Failed to serialize {} to JSON", what)),
            OutputFormat::Yaml => serde_yaml::to_string(value)
                .map(Some)
                .with_context(|| format!("Failed to serialize {} to YAML", what)),
            OutputFormat::Human => Ok(None),
        }
    }

    pub fn format_dockerfile(&self, dockerfile: &Dockerfile) -> Result<String> {
        if let Some(out) = self.serialize(dockerfile, "Dockerfile model")? {
            return Ok(out);
        }

        let mut output = String::new();
        for line in &dockerfile.lines {
            if let Line::Instruction(il) = line {
                output.push_str(&format!("{:>4}  {:<11} {}\n", il.line, il.instruction.keyword().as_str(), describe(il)));
            }
        }
        if let Some(cmd) = dockerfile.default_command() {
            output.push_str(&format!("\nProcess: {:?}\n", cmd.process_argv()));
        }
        Ok(output)
    }

    pub fn format_lint(&self, results: &[LintResult]) -> Result<String> {
        if let Some(out) = self.serialize(results, "lint results")? {
            return Ok(out);
        }

        let mut output = String::new();
        let mut errors = 0;
        let mut warnings = 0;
        for result in results {
            match (&result.report, &result.error) {
                (_, Some(error)) => {
                    errors += 1;
                    output.push_str(&format!("\u{2717} {}\n  {}\n", result.path, error));
                }
                (Some(report), None) if report.diagnostics.is_empty() => {
                    output.push_str(&format!("\u{2713} {}\n", result.path));
                }
                (Some(report), None) => {
                    let symbol = if report.has_errors() { "\u{2717}" } else { "\u{26A0}" };
                    output.push_str(&format!("{} {}\n", symbol, result.path));
                    for d in &report.diagnostics {
                        output.push_str(&format!("  {}\n", d));
                        match d.severity {
                            Severity::Error => errors += 1,
                            Severity::Warning => warnings += 1,
                            Severity::Info => {}
                        }
                    }
                }
                (None, None) => {}
            }
        }
        output.push_str(&format!(
            "\n{} file(s) checked: {} error(s), {} warning(s)\n",
            results.len(),
            errors,
            warnings
        ));
        Ok(output)
    }

    pub fn format_languages(&self, languages: &[LanguageInfo]) -> Result<String> {
        if let Some(out) = self.serialize(languages, "language catalog")? {
            return Ok(out);
        }

        let mut output = String::new();
        output.push_str(&format!(
            "{:<12} {:<10} {:<6} {:<22} {:<16} {}\n",
            "ID", "NAME", "EXT", "BASE IMAGE", "TAG", "COMPILED"
        ));
        for l in languages {
            output.push_str(&format!(
                "{:<12} {:<10} {:<6} {:<22} {:<16} {}\n",
                l.id,
                l.name,
                l.extension,
                l.base_image,
                l.image_tag,
                if l.compiled { "yes" } else { "no" }
            ));
        }
        Ok(output)
    }

    pub fn format_outcome(&self, outcome: &ExecutionOutcome) -> Result<String> {
        if let Some(out) = self.serialize(outcome, "execution outcome")? {
            return Ok(out);
        }

        let mut output = String::new();
        if let Some(stdout) = &outcome.stdout {
            output.push_str(stdout);
            if !stdout.is_empty() && !stdout.ends_with('\n') {
                output.push('\n');
            }
        }
        let stderr = outcome.stderr.as_deref().unwrap_or("").trim_end();
        if !stderr.is_empty() {
            output.push_str(&format!("{}\nstderr:\n{}\n", RULE, stderr));
        }
        if outcome.killed {
            output.push_str("\u{26A0} Killed: time or memory limit exceeded\n");
        }
        if let Some(error) = &outcome.server_error {
            output.push_str(&format!("\u{2717} Server error: {}\n", error));
        }
        Ok(output)
    }

    pub fn format_config(&self, config: &RunboxConfig) -> Result<String> {
        let map = config.to_display_map();
        if let Some(out) = self.serialize(&map, "config")? {
            return Ok(out);
        }

        let mut output = String::new();
        output.push_str("runbox Configuration\n");
        output.push_str(RULE);
        output.push_str("\n\n");
        for (key, value) in &map {
            output.push_str(&format!("  {:<18} {}\n", key, value));
        }
        Ok(output)
    }
}

fn describe(il: &crate::dockerfile::InstructionLine) -> String {
    let rendered = il.instruction.to_string();
    let keyword = il.instruction.keyword();
    rendered
        .strip_prefix(keyword.as_str())
        .map(|rest| rest.trim_start().to_string())
        .unwrap_or(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{java_variant_a, java_variant_b};
    use crate::validation::Validator;

    #[test]
    fn test_human_dockerfile() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let output = formatter.format_dockerfile(&java_variant_a()).unwrap();

        assert!(output.contains("FROM"));
        assert!(output.contains("openjdk:17"));
        assert!(output.contains("javac Main.java"));
        assert!(output.contains(r#"Process: ["java", "Main"]"#));
    }

    #[test]
    fn test_json_dockerfile_round_trips() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let output = formatter.format_dockerfile(&java_variant_b()).unwrap();
        let parsed: Dockerfile = serde_json::from_str(&output).unwrap();
        assert!(parsed.is_equivalent(&java_variant_b()));
    }

    #[test]
    fn test_human_lint_summary() {
        let report = Validator::default().lint(&java_variant_b());
        let results = vec![
            LintResult::linted("Dockerfile.a", Validator::default().lint(&java_variant_a())),
            LintResult::linted("Dockerfile.b", report),
            LintResult::failed("Dockerfile.c", "line 1: unknown instruction 'FORM'"),
        ];

        let output = OutputFormatter::new(OutputFormat::Human).format_lint(&results).unwrap();
        assert!(output.contains("\u{2713} Dockerfile.a"));
        assert!(output.contains("\u{2717} Dockerfile.b"));
        assert!(output.contains("line 3: error[DefaultCommandArgs]"));
        assert!(output.contains("unknown instruction 'FORM'"));
        assert!(output.contains("3 file(s) checked"));
    }

    #[test]
    fn test_yaml_lint() {
        let results = vec![LintResult::linted("Dockerfile", Validator::default().lint(&java_variant_b()))];
        let output = OutputFormatter::new(OutputFormat::Yaml).format_lint(&results).unwrap();
        assert!(output.contains("path: Dockerfile"));
        assert!(output.contains("severity: error"));
    }

    #[test]
    fn test_languages_table() {
        let languages: Vec<LanguageInfo> = Language::all().iter().copied().map(LanguageInfo::from).collect();
        let output = OutputFormatter::new(OutputFormat::Human).format_languages(&languages).unwrap();
        assert!(output.contains("openjdk:17"));
        assert!(output.contains("rocker/r-ver:4.1.0"));

        let java = LanguageInfo::from(Language::Java);
        assert!(java.compiled);
        assert!(!LanguageInfo::from(Language::Python).compiled);
    }

    #[test]
    fn test_human_outcome() {
        let outcome = ExecutionOutcome {
            stdout: Some("42".to_string()),
            stderr: Some("warning: unused\n".to_string()),
            killed: true,
            ..Default::default()
        };
        let output = OutputFormatter::new(OutputFormat::Human).format_outcome(&outcome).unwrap();
        assert!(output.starts_with("42\n"));
        assert!(output.contains("warning: unused"));
        assert!(output.contains("Killed"));
    }

    #[test]
    fn test_json_outcome_omits_missing_streams() {
        let outcome = ExecutionOutcome {
            server_error: Some("daemon unavailable".to_string()),
            ..Default::default()
        };
        let output = OutputFormatter::new(OutputFormat::Json).format_outcome(&outcome).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert!(value.get("stdout").is_none());
        assert_eq!(value["server_error"], "daemon unavailable");
        assert_eq!(value["killed"], false);
    }
}
