use super::report::Diagnostic;
use crate::dockerfile::{lineage, CommandForm, Dockerfile, Instruction, Keyword, Stage};
use crate::runtime::{inspect_launch, java_main_class, shell_segments, LaunchCheck};

pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, dockerfile: &Dockerfile) -> Vec<Diagnostic>;
}

const COMPILERS: &[&str] = &[
    "javac", "gcc", "g++", "cc", "c++", "clang", "clang++", "rustc", "swiftc", "ghc", "go",
];

const SOURCE_EXTENSIONS: &[&str] = &[
    ".java", ".c", ".cc", ".cpp", ".cxx", ".rs", ".swift", ".hs", ".go",
];

const EXEC_OPERATORS: &[&str] = &["&&", "||", "|", ";", ">", ">>", "<", "2>", "2>&1", "&"];

fn basename(program: &str) -> &str {
    program.rsplit('/').next().unwrap_or(program)
}

/// A stage followed by the stages it builds on, nearest first
fn stages_any_files(stage: &Stage<'_>) -> bool {
    stage
        .instructions
        .iter()
        .any(|i| i.instruction.as_staging().is_some())
}

fn is_absolute_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    let windows_drive = bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/');
    path.starts_with('/') || path.starts_with('$') || windows_drive
}

pub struct RequiredInstructionsRule;

impl ValidationRule for RequiredInstructionsRule {
    fn name(&self) -> &'static str {
        "RequiredInstructions"
    }

    fn check(&self, dockerfile: &Dockerfile) -> Vec<Diagnostic> {
        if dockerfile.is_empty() {
            return vec![Diagnostic::error(self.name(), None, "Dockerfile has no instructions")];
        }

        let stages = dockerfile.stages();
        let Some(last) = stages.last() else {
            return vec![Diagnostic::error(
                self.name(),
                None,
                "Dockerfile has no FROM instruction",
            )];
        };

        let has_command = lineage(&stages, last.index).iter().any(|stage| {
            stage.instructions.iter().any(|i| {
                matches!(i.instruction.keyword(), Keyword::Cmd | Keyword::Entrypoint)
            })
        });
        if has_command {
            return Vec::new();
        }

        vec![Diagnostic::warning(
            self.name(),
            Some(last.from_line),
            format!(
                "final stage has no CMD or ENTRYPOINT and inherits the default command of {}",
                last.base
            ),
        )]
    }
}

pub struct BaseImageFirstRule;

impl ValidationRule for BaseImageFirstRule {
    fn name(&self) -> &'static str {
        "BaseImageFirst"
    }

    fn check(&self, dockerfile: &Dockerfile) -> Vec<Diagnostic> {
        let first = dockerfile
            .instructions()
            .find(|i| i.instruction.keyword() != Keyword::Arg);

        match first {
            Some(line) if line.instruction.keyword() != Keyword::From => vec![Diagnostic::error(
                self.name(),
                Some(line.line),
                format!(
                    "{} appears before the first FROM; only ARG may precede it",
                    line.instruction.keyword()
                ),
            )],
            _ => Vec::new(),
        }
    }
}

pub struct StageReferenceRule;

impl StageReferenceRule {
    fn names_earlier_stage(stages: &[Stage<'_>], index: usize, name: &str) -> bool {
        if let Ok(n) = name.parse::<usize>() {
            return n < index;
        }
        stages[..index]
            .iter()
            .any(|s| s.alias.is_some_and(|alias| alias.eq_ignore_ascii_case(name)))
    }

    /// `--from` also accepts an image reference or a build argument
    fn names_external(name: &str) -> bool {
        name.contains(':') || name.contains('/') || name.contains('@') || name.contains('$')
    }
}

impl ValidationRule for StageReferenceRule {
    fn name(&self) -> &'static str {
        "StageReference"
    }

    fn check(&self, dockerfile: &Dockerfile) -> Vec<Diagnostic> {
        let stages = dockerfile.stages();
        let mut diagnostics = Vec::new();

        for stage in &stages {
            for line in &stage.instructions {
                let Some(from) = line.instruction.as_staging().and_then(|c| c.from.as_deref()) else {
                    continue;
                };
                if Self::names_earlier_stage(&stages, stage.index, from) || Self::names_external(from) {
                    continue;
                }
                diagnostics.push(Diagnostic::error(
                    self.name(),
                    Some(line.line),
                    format!("--from={} does not name an earlier build stage", from),
                ));
            }
        }

        diagnostics
    }
}

pub struct CompileInputStagedRule;

impl CompileInputStagedRule {
    /// Relative source files named on a compiler command line
    fn relative_sources(segment: &[String]) -> Vec<&str> {
        let mut sources = Vec::new();
        let mut skip_next = false;
        for arg in &segment[1..] {
            if skip_next {
                skip_next = false;
                continue;
            }
            if arg == "-o" || arg == "-d" {
                skip_next = true;
                continue;
            }
            if arg.starts_with('-') || is_absolute_path(arg) {
                continue;
            }
            if SOURCE_EXTENSIONS.iter().any(|ext| arg.ends_with(ext)) {
                sources.push(arg.as_str());
            }
        }
        sources
    }
}

impl ValidationRule for CompileInputStagedRule {
    fn name(&self) -> &'static str {
        "CompileInputStaged"
    }

    fn check(&self, dockerfile: &Dockerfile) -> Vec<Diagnostic> {
        let stages = dockerfile.stages();
        let mut diagnostics = Vec::new();

        for stage in &stages {
            let parents_stage_files = lineage(&stages, stage.index)
                .iter()
                .skip(1)
                .any(|s| stages_any_files(s));

            for line in &stage.instructions {
                let Instruction::Run(form) = &line.instruction else {
                    continue;
                };
                if parents_stage_files || stage.stages_files_before(line.line) {
                    continue;
                }

                for segment in shell_segments(&form.argv()) {
                    if !COMPILERS.contains(&basename(&segment[0])) {
                        continue;
                    }
                    let sources = Self::relative_sources(&segment);
                    if sources.is_empty() {
                        continue;
                    }
                    diagnostics.push(Diagnostic::error(
                        self.name(),
                        Some(line.line),
                        format!(
                            "`{}` compiles {}, but no earlier COPY or ADD puts source files into this stage",
                            basename(&segment[0]),
                            sources.join(", ")
                        ),
                    ));
                }
            }
        }

        diagnostics
    }
}

pub struct DefaultCommandArgsRule;

impl ValidationRule for DefaultCommandArgsRule {
    fn name(&self) -> &'static str {
        "DefaultCommandArgs"
    }

    fn check(&self, dockerfile: &Dockerfile) -> Vec<Diagnostic> {
        let Some(command) = dockerfile.default_command() else {
            return Vec::new();
        };
        let line = Some(command.line);

        match inspect_launch(&command.process_argv()) {
            LaunchCheck::MissingEntry { program, expected } => vec![Diagnostic::error(
                self.name(),
                line,
                format!(
                    "default command starts `{}` without {}; it exits with a usage error",
                    program, expected
                ),
            )],
            LaunchCheck::Interactive { program } => vec![Diagnostic::warning(
                self.name(),
                line,
                format!(
                    "default command starts `{}` without a script, so it waits for input on stdin",
                    program
                ),
            )],
            LaunchCheck::Empty => vec![Diagnostic::error(self.name(), line, "default command is empty")],
            LaunchCheck::Satisfied { .. } | LaunchCheck::Unknown { .. } => Vec::new(),
        }
    }
}

pub struct EntryClassCompiledRule;

impl EntryClassCompiledRule {
    fn compiles(form: &CommandForm, source: &str) -> bool {
        shell_segments(&form.argv()).iter().any(|segment| {
            basename(&segment[0]) == "javac"
                && segment[1..]
                    .iter()
                    .any(|arg| basename(arg) == source || basename(arg) == "*.java")
        })
    }
}

impl ValidationRule for EntryClassCompiledRule {
    fn name(&self) -> &'static str {
        "EntryClassCompiled"
    }

    fn check(&self, dockerfile: &Dockerfile) -> Vec<Diagnostic> {
        let Some(command) = dockerfile.default_command() else {
            return Vec::new();
        };
        let Some(class) = java_main_class(&command.process_argv()) else {
            return Vec::new();
        };

        let stages = dockerfile.stages();
        let Some(last) = stages.last() else {
            return Vec::new();
        };
        let chain = lineage(&stages, last.index);
        if chain.iter().any(|s| stages_any_files(s)) {
            return Vec::new();
        }

        // source-file launch: `java Main.java`
        let source = if class.ends_with(".java") {
            None
        } else {
            let simple = class.rsplit('.').next().unwrap_or(&class);
            Some(format!("{}.java", simple))
        };
        let compiled = source.as_deref().is_some_and(|source| {
            chain.iter().any(|stage| {
                stage.instructions.iter().any(|i| match &i.instruction {
                    Instruction::Run(form) => Self::compiles(form, source),
                    _ => false,
                })
            })
        });
        if compiled {
            return Vec::new();
        }

        vec![Diagnostic::warning(
            self.name(),
            Some(command.line),
            format!(
                "`java {}` runs a class that nothing in the image compiles or copies in",
                class
            ),
        )]
    }
}

pub struct ExecFormShellOperatorsRule;

impl ValidationRule for ExecFormShellOperatorsRule {
    fn name(&self) -> &'static str {
        "ExecFormShellOperators"
    }

    fn check(&self, dockerfile: &Dockerfile) -> Vec<Diagnostic> {
        dockerfile
            .instructions()
            .filter_map(|line| {
                let form = match &line.instruction {
                    Instruction::Run(form) | Instruction::Cmd(form) | Instruction::Entrypoint(form) => form,
                    _ => return None,
                };
                let CommandForm::Exec(args) = form else {
                    return None;
                };
                let operator = args.iter().find(|a| EXEC_OPERATORS.contains(&a.as_str()))?;
                Some(Diagnostic::error(
                    self.name(),
                    Some(line.line),
                    format!(
                        "exec-form {} passes `{}` to {} as a literal argument; use shell form or [\"/bin/sh\", \"-c\", \"...\"]",
                        line.instruction.keyword(),
                        operator,
                        args.first().map(String::as_str).unwrap_or("the program")
                    ),
                ))
            })
            .collect()
    }
}

pub struct WorkdirAbsoluteRule;

impl ValidationRule for WorkdirAbsoluteRule {
    fn name(&self) -> &'static str {
        "WorkdirAbsolute"
    }

    fn check(&self, dockerfile: &Dockerfile) -> Vec<Diagnostic> {
        dockerfile
            .instructions()
            .filter_map(|line| match &line.instruction {
                Instruction::Workdir(path) if !is_absolute_path(path) => Some(Diagnostic::warning(
                    self.name(),
                    Some(line.line),
                    format!(
                        "WORKDIR {} is relative and resolves against the previous working directory",
                        path
                    ),
                )),
                _ => None,
            })
            .collect()
    }
}

pub struct PinnedBaseImageRule;

impl ValidationRule for PinnedBaseImageRule {
    fn name(&self) -> &'static str {
        "PinnedBaseImage"
    }

    fn check(&self, dockerfile: &Dockerfile) -> Vec<Diagnostic> {
        dockerfile
            .stages()
            .iter()
            .filter(|s| s.parent.is_none() && !s.base.is_scratch() && !s.base.is_templated())
            .filter(|s| s.base.is_floating())
            .map(|s| {
                Diagnostic::warning(
                    self.name(),
                    Some(s.from_line),
                    format!(
                        "base image {} is not pinned to a version tag or digest",
                        s.base
                    ),
                )
            })
            .collect()
    }
}

pub struct SingleDefaultCommandRule;

impl ValidationRule for SingleDefaultCommandRule {
    fn name(&self) -> &'static str {
        "SingleDefaultCommand"
    }

    fn check(&self, dockerfile: &Dockerfile) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for stage in dockerfile.stages() {
            for keyword in [Keyword::Cmd, Keyword::Entrypoint] {
                let lines: Vec<usize> = stage
                    .instructions
                    .iter()
                    .filter(|i| i.instruction.keyword() == keyword)
                    .map(|i| i.line)
                    .collect();
                let Some((&last, earlier)) = lines.split_last() else {
                    continue;
                };
                for &line in earlier {
                    diagnostics.push(Diagnostic::warning(
                        self.name(),
                        Some(line),
                        format!(
                            "{} is overridden by the {} on line {}",
                            keyword, keyword, last
                        ),
                    ));
                }
            }
        }

        diagnostics
    }
}

pub struct CopyDestinationRule;

impl ValidationRule for CopyDestinationRule {
    fn name(&self) -> &'static str {
        "CopyDestination"
    }

    fn check(&self, dockerfile: &Dockerfile) -> Vec<Diagnostic> {
        dockerfile
            .instructions()
            .filter_map(|line| {
                let copy = line.instruction.as_staging()?;
                if copy.sources.len() < 2 || copy.destination.ends_with('/') {
                    return None;
                }
                Some(Diagnostic::error(
                    self.name(),
                    Some(line.line),
                    format!(
                        "{} with {} sources needs a directory destination ending in `/`, got `{}`",
                        line.instruction.keyword(),
                        copy.sources.len(),
                        copy.destination
                    ),
                ))
            })
            .collect()
    }
}
