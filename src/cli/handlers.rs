//! Subcommand handlers; each returns the process exit code

use crate::cli::commands::{
    BuildImagesArgs, EmitArgs, FmtArgs, FormatArgs, GenerateArgs, LintArgs, ParseArgs, RunArgs,
};
use crate::cli::output::{LanguageInfo, LintResult, OutputFormat, OutputFormatter};
use crate::config::RunboxConfig;
use crate::dockerfile::{parse, Dockerfile};
use crate::fs::{FileSystem, RealFileSystem};
use crate::progress::{BarHandler, LoggingHandler, ProgressHandler};
use crate::runtime::{Language, UnsupportedLanguage};
use crate::sandbox::{DockerCli, ExecutionRequest, Sandbox};
use crate::templates::{self, TemplateKind, DEFAULT_WORKDIR};
use crate::validation::Validator;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

pub const EXIT_OK: i32 = 0;
/// Lint findings, a formatting mismatch or a failed program
pub const EXIT_FAILURE: i32 = 1;
/// I/O, parse or configuration errors
pub const EXIT_ERROR: i32 = 2;

fn read_dockerfile(fs: &dyn FileSystem, path: &Path) -> Result<(String, Dockerfile)> {
    let text = fs
        .read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let dockerfile = parse(&text).with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok((text, dockerfile))
}

fn write_output(fs: &dyn FileSystem, output: Option<&PathBuf>, text: &str, quiet: bool) -> i32 {
    match output {
        Some(path) => match fs.write(path, text) {
            Ok(()) => {
                info!("Output written to: {}", path.display());
                if !quiet {
                    eprintln!("Output written to: {}", path.display());
                }
                EXIT_OK
            }
            Err(e) => {
                error!("Failed to write output to file: {:#}", e);
                EXIT_ERROR
            }
        },
        None => {
            print!("{}", text);
            EXIT_OK
        }
    }
}

fn print_formatted(result: Result<String>) -> i32 {
    match result {
        Ok(out) => {
            print!("{}", out);
            if !out.ends_with('\n') {
                println!();
            }
            EXIT_OK
        }
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            EXIT_ERROR
        }
    }
}

fn resolve_language(name: &str) -> Result<Language, UnsupportedLanguage> {
    name.parse::<Language>()
}

pub fn handle_parse(args: &ParseArgs) -> i32 {
    let fs = RealFileSystem::new();
    let dockerfile = match read_dockerfile(&fs, &args.file) {
        Ok((_, dockerfile)) => dockerfile,
        Err(e) => {
            error!("{:#}", e);
            return EXIT_ERROR;
        }
    };
    debug!(instructions = dockerfile.instructions().count(), "Parsed Dockerfile");

    print_formatted(OutputFormatter::new(args.format.into()).format_dockerfile(&dockerfile))
}

/// Files to lint for `paths`: directories contribute their `Dockerfile*` entries
pub fn expand_lint_paths(fs: &dyn FileSystem, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !fs.is_dir(path) {
            files.push(path.clone());
            continue;
        }
        let found: Vec<PathBuf> = fs
            .read_dir(path)
            .with_context(|| format!("Failed to list {}", path.display()))?
            .into_iter()
            .filter(|e| e.is_file() && e.file_name().starts_with("Dockerfile"))
            .map(|e| e.path)
            .collect();
        if found.is_empty() {
            anyhow::bail!("No Dockerfile* files in {}", path.display());
        }
        files.extend(found);
    }
    Ok(files)
}

/// Exit code for a set of lint results
pub fn lint_exit_code(results: &[LintResult], deny_warnings: bool) -> i32 {
    if results.iter().any(|r| r.error.is_some()) {
        return EXIT_ERROR;
    }
    let reports = results.iter().filter_map(|r| r.report.as_ref());
    let mut failing = false;
    for report in reports {
        failing |= report.has_errors() || (deny_warnings && report.has_warnings());
    }
    if failing {
        EXIT_FAILURE
    } else {
        EXIT_OK
    }
}

pub fn lint_files(fs: &dyn FileSystem, files: &[PathBuf]) -> Vec<LintResult> {
    let validator = Validator::default();
    files
        .iter()
        .map(|path| {
            let label = path.display().to_string();
            match read_dockerfile(fs, path) {
                Ok((_, dockerfile)) => {
                    let report = validator.lint(&dockerfile);
                    debug!(file = %label, findings = report.diagnostics.len(), "Linted");
                    LintResult::linted(label, report)
                }
                Err(e) => LintResult::failed(label, format!("{:#}", e)),
            }
        })
        .collect()
}

pub fn handle_lint(args: &LintArgs) -> i32 {
    let fs = RealFileSystem::new();
    let files = match expand_lint_paths(&fs, &args.paths) {
        Ok(files) => files,
        Err(e) => {
            error!("{:#}", e);
            return EXIT_ERROR;
        }
    };
    info!(files = files.len(), "Linting Dockerfiles");

    let results = lint_files(&fs, &files);
    let printed = print_formatted(OutputFormatter::new(args.format.into()).format_lint(&results));
    if printed != EXIT_OK {
        return printed;
    }
    lint_exit_code(&results, args.deny_warnings)
}

pub fn handle_fmt(args: &FmtArgs, quiet: bool) -> i32 {
    let fs = RealFileSystem::new();
    let (text, dockerfile) = match read_dockerfile(&fs, &args.file) {
        Ok(read) => read,
        Err(e) => {
            error!("{:#}", e);
            return EXIT_ERROR;
        }
    };
    let canonical = dockerfile.emit();

    if args.check {
        if canonical == text {
            return EXIT_OK;
        }
        if !quiet {
            eprintln!("{} is not in canonical form", args.file.display());
        }
        return EXIT_FAILURE;
    }

    write_output(&fs, args.output.as_ref(), &canonical, quiet)
}

/// Deserialize a Dockerfile model, choosing the format from the extension
pub fn load_model(text: &str, path: &Path) -> Result<Dockerfile> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match extension {
        "json" => serde_json::from_str(text).context("Invalid JSON Dockerfile model"),
        "yaml" | "yml" => serde_yaml::from_str(text).context("Invalid YAML Dockerfile model"),
        _ => serde_json::from_str(text)
            .or_else(|_| serde_yaml::from_str(text))
            .context("Model is neither JSON nor YAML"),
    }
}

pub fn handle_emit(args: &EmitArgs, quiet: bool) -> i32 {
    let fs = RealFileSystem::new();
    let model = fs
        .read_to_string(&args.model)
        .with_context(|| format!("Failed to read {}", args.model.display()))
        .and_then(|text| load_model(&text, &args.model));

    match model {
        Ok(dockerfile) => write_output(&fs, args.output.as_ref(), &dockerfile.emit(), quiet),
        Err(e) => {
            error!("{:#}", e);
            EXIT_ERROR
        }
    }
}

pub fn handle_generate(args: &GenerateArgs, quiet: bool) -> i32 {
    let language = match resolve_language(&args.language) {
        Ok(language) => language,
        Err(e) => {
            error!("{}", e);
            return EXIT_ERROR;
        }
    };
    let kind = if args.standalone {
        TemplateKind::Standalone {
            entry: args.entry.clone(),
        }
    } else {
        TemplateKind::Sandbox
    };
    let workdir = args.workdir.as_deref().unwrap_or(DEFAULT_WORKDIR);

    match templates::generate(language, &kind, workdir) {
        Ok(dockerfile) => {
            let fs = RealFileSystem::new();
            write_output(&fs, args.output.as_ref(), &dockerfile.emit(), quiet)
        }
        Err(e) => {
            error!("Failed to generate Dockerfile: {}", e);
            EXIT_ERROR
        }
    }
}

pub fn handle_languages(args: &FormatArgs) -> i32 {
    let languages: Vec<LanguageInfo> = Language::all().iter().copied().map(LanguageInfo::from).collect();
    print_formatted(OutputFormatter::new(args.format.into()).format_languages(&languages))
}

pub fn handle_config(args: &FormatArgs) -> i32 {
    let config = RunboxConfig::default();
    let code = print_formatted(OutputFormatter::new(args.format.into()).format_config(&config));
    if let Err(e) = config.validate() {
        error!("{}", e);
        return EXIT_ERROR;
    }
    code
}

fn sandbox(config: RunboxConfig) -> Sandbox {
    let engine = Arc::new(DockerCli::from_config(&config));
    Sandbox::new(engine, Arc::new(RealFileSystem::new()), config).with_progress(Arc::new(LoggingHandler))
}

pub async fn handle_build_images(args: &BuildImagesArgs, quiet: bool) -> i32 {
    let config = RunboxConfig::default();
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return EXIT_ERROR;
    }

    let languages = if args.languages.is_empty() {
        Language::all().to_vec()
    } else {
        match args
            .languages
            .iter()
            .map(|name| resolve_language(name))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(languages) => languages,
            Err(e) => {
                error!("{}", e);
                return EXIT_ERROR;
            }
        }
    };

    let handler: Box<dyn ProgressHandler> = if !quiet && atty::is(atty::Stream::Stderr) {
        Box::new(BarHandler::new())
    } else {
        Box::new(LoggingHandler)
    };

    let summary = sandbox(config).prebuild(&languages, handler.as_ref()).await;
    for (language, reason) in &summary.failed {
        error!(language = %language, "Image build failed: {}", reason);
    }
    if summary.is_success() {
        EXIT_OK
    } else {
        EXIT_FAILURE
    }
}

pub async fn handle_run(args: &RunArgs) -> i32 {
    let mut config = RunboxConfig::default();
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(memory) = &args.memory {
        config.memory_limit = memory.to_lowercase();
    }
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return EXIT_ERROR;
    }

    let fs = RealFileSystem::new();
    let request = ExecutionRequest::from_name(&args.language, String::new())
        .map_err(anyhow::Error::from)
        .and_then(|request| {
            let code = fs
                .read_to_string(&args.source)
                .with_context(|| format!("Failed to read {}", args.source.display()))?;
            let mut request = ExecutionRequest { code, ..request };
            if let Some(stdin) = &args.stdin {
                let input = fs
                    .read_to_string(stdin)
                    .with_context(|| format!("Failed to read {}", stdin.display()))?;
                request = request.with_stdin(input);
            }
            Ok(request)
        });
    let request = match request {
        Ok(request) => request,
        Err(e) => {
            error!("{:#}", e);
            return EXIT_ERROR;
        }
    };

    let outcome = match sandbox(config).execute(request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Execution failed: {}", e);
            return EXIT_FAILURE;
        }
    };

    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    let printed = print_formatted(formatter.format_outcome(&outcome));
    if printed != EXIT_OK {
        return printed;
    }
    if outcome.succeeded() {
        EXIT_OK
    } else {
        EXIT_FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use crate::templates::{java_variant_a, java_variant_b};

    #[test]
    fn test_expand_directory_to_dockerfiles() {
        let fs = MockFileSystem::new();
        fs.add_file("/mock/docker/Dockerfile.java", "FROM openjdk:17\n");
        fs.add_file("/mock/docker/Dockerfile.c", "FROM gcc:latest\n");
        fs.add_file("/mock/docker/README.md", "# images\n");
        fs.add_file("/mock/other/Containerfile", "FROM scratch\n");

        let files = expand_lint_paths(
            &fs,
            &[PathBuf::from("/mock/docker"), PathBuf::from("/mock/other/Containerfile")],
        )
        .unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/mock/docker/Dockerfile.c"),
                PathBuf::from("/mock/docker/Dockerfile.java"),
                PathBuf::from("/mock/other/Containerfile"),
            ]
        );
    }

    #[test]
    fn test_expand_empty_directory_fails() {
        let fs = MockFileSystem::new();
        fs.add_dir("/mock/empty");
        assert!(expand_lint_paths(&fs, &[PathBuf::from("/mock/empty")]).is_err());
    }

    #[test]
    fn test_lint_exit_codes() {
        let fs = MockFileSystem::new();
        fs.add_file("/mock/a/Dockerfile", &java_variant_a().emit());
        fs.add_file("/mock/b/Dockerfile", &java_variant_b().emit());
        fs.add_file("/mock/c/Dockerfile", "FORM openjdk:17\n");
        fs.add_file("/mock/d/Dockerfile", "FROM openjdk:latest\nWORKDIR /app\nCMD [\"java\", \"-version\"]\n");

        let lint = |path: &str| lint_files(&fs, &[PathBuf::from(path)]);

        assert_eq!(lint_exit_code(&lint("/mock/a/Dockerfile"), false), EXIT_OK);
        assert_eq!(lint_exit_code(&lint("/mock/b/Dockerfile"), false), EXIT_FAILURE);
        assert_eq!(lint_exit_code(&lint("/mock/c/Dockerfile"), false), EXIT_ERROR);
        assert_eq!(lint_exit_code(&lint("/mock/missing"), false), EXIT_ERROR);

        let floating = lint("/mock/d/Dockerfile");
        assert_eq!(lint_exit_code(&floating, false), EXIT_OK);
        assert_eq!(lint_exit_code(&floating, true), EXIT_FAILURE);
    }

    #[test]
    fn test_load_model_by_extension() {
        let model = java_variant_a();
        let json = serde_json::to_string(&model).unwrap();
        let yaml = serde_yaml::to_string(&model).unwrap();

        assert_eq!(load_model(&json, Path::new("model.json")).unwrap(), model);
        assert_eq!(load_model(&yaml, Path::new("model.yml")).unwrap(), model);
        assert_eq!(load_model(&yaml, Path::new("model")).unwrap(), model);
        assert!(load_model(&yaml, Path::new("model.json")).is_err());
    }

    #[test]
    fn test_resolve_language_aliases() {
        assert_eq!(resolve_language("c++").unwrap(), Language::Cpp);
        assert!(resolve_language("cobol")
            .unwrap_err()
            .to_string()
            .contains("Valid options"));
    }
}
