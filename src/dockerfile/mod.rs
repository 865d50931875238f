//! In-memory Dockerfile model
//!
//! A [`Dockerfile`] is the ordered sequence of lines of a container build
//! file: instructions, comments and blank lines. [`parse`] reads one from text
//! and [`Dockerfile::emit`] writes it back in canonical form, so
//! `parse(df.emit())` is always equivalent to `df`.
//!
//! # Example
//!
//! ```
//! use runbox::dockerfile::parse;
//!
//! let df = parse("FROM openjdk:17\nWORKDIR /usr/src/app\nCMD [\"java\", \"Main\"]\n").unwrap();
//! assert_eq!(df.base_image().unwrap().to_string(), "openjdk:17");
//! assert_eq!(df.default_command().unwrap().argv(), vec!["java", "Main"]);
//! ```

mod emitter;
pub mod error;
pub mod image;
pub mod instruction;
pub mod parser;

pub use error::{ParseError, ParseErrorKind};
pub use image::{ImageRef, ImageRefError};
pub use instruction::{CommandForm, CopyInstruction, Instruction, InstructionLine, Keyword, Line};
pub use parser::{parse, split_words, DEFAULT_ESCAPE};

use serde::{Deserialize, Serialize};

fn default_escape() -> char {
    DEFAULT_ESCAPE
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dockerfile {
    /// Escape character declared by the `# escape=` parser directive
    #[serde(default = "default_escape")]
    pub escape: char,
    pub lines: Vec<Line>,
}

impl Default for Dockerfile {
    fn default() -> Self {
        Self {
            escape: DEFAULT_ESCAPE,
            lines: Vec::new(),
        }
    }
}

/// One build stage: a `FROM` and the instructions up to the next one
#[derive(Debug, Clone)]
pub struct Stage<'a> {
    pub index: usize,
    pub base: &'a ImageRef,
    pub alias: Option<&'a str>,
    /// Earlier stage this one builds on (`FROM <alias>`)
    pub parent: Option<usize>,
    pub from_line: usize,
    pub instructions: Vec<&'a InstructionLine>,
}

impl<'a> Stage<'a> {
    pub fn name(&self) -> String {
        self.alias
            .map(str::to_string)
            .unwrap_or_else(|| self.index.to_string())
    }

    /// Whether COPY or ADD puts files into this stage before `line`
    pub fn stages_files_before(&self, line: usize) -> bool {
        self.instructions
            .iter()
            .any(|i| i.line < line && i.instruction.as_staging().is_some())
    }
}

/// ENTRYPOINT and CMD in effect for a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultCommand {
    pub entrypoint: Option<CommandForm>,
    pub cmd: Option<CommandForm>,
    /// Line of the instruction that determines the command
    pub line: usize,
}

impl DefaultCommand {
    /// Program and arguments as written, shell form split into words
    ///
    /// A shell-form ENTRYPOINT ignores CMD entirely.
    pub fn argv(&self) -> Vec<String> {
        match (&self.entrypoint, &self.cmd) {
            (Some(entry @ CommandForm::Shell(_)), _) => entry.argv(),
            (Some(entry), Some(cmd)) => {
                let mut argv = entry.argv();
                argv.extend(cmd.argv());
                argv
            }
            (Some(entry), None) => entry.argv(),
            (None, Some(cmd)) => cmd.argv(),
            (None, None) => Vec::new(),
        }
    }

    /// Argv the container starts with, shell forms wrapped in `/bin/sh -c`
    pub fn process_argv(&self) -> Vec<String> {
        match (&self.entrypoint, &self.cmd) {
            (Some(entry @ CommandForm::Shell(_)), _) => entry.process_argv(),
            (Some(entry), Some(cmd)) => {
                let mut argv = entry.process_argv();
                argv.extend(cmd.process_argv());
                argv
            }
            (Some(entry), None) => entry.process_argv(),
            (None, Some(cmd)) => cmd.process_argv(),
            (None, None) => Vec::new(),
        }
    }

    /// Exec form throughout, so shell operators would reach the program literally
    pub fn is_exec(&self) -> bool {
        self.entrypoint
            .iter()
            .chain(self.cmd.iter())
            .all(CommandForm::is_exec)
    }
}

impl Dockerfile {
    pub fn new(lines: Vec<Line>) -> Self {
        Self {
            escape: DEFAULT_ESCAPE,
            lines,
        }
    }

    pub fn instructions(&self) -> impl Iterator<Item = &InstructionLine> {
        self.lines.iter().filter_map(|line| match line {
            Line::Instruction(instruction) => Some(instruction),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.instructions().next().is_none()
    }

    /// Instructions that appear before the first `FROM`
    pub fn preamble(&self) -> Vec<&InstructionLine> {
        self.instructions()
            .take_while(|i| i.instruction.keyword() != Keyword::From)
            .collect()
    }

    pub fn stages(&self) -> Vec<Stage<'_>> {
        let mut stages: Vec<Stage<'_>> = Vec::new();

        for line in self.instructions() {
            if let Instruction::From { image, alias, .. } = &line.instruction {
                let parent = if image.registry.is_none() && image.tag.is_none() {
                    stages.iter().rposition(|s| {
                        s.alias
                            .map(|a| a.eq_ignore_ascii_case(&image.name))
                            .unwrap_or(false)
                    })
                } else {
                    None
                };
                stages.push(Stage {
                    index: stages.len(),
                    base: image,
                    alias: alias.as_deref(),
                    parent,
                    from_line: line.line,
                    instructions: Vec::new(),
                });
            } else if let Some(stage) = stages.last_mut() {
                stage.instructions.push(line);
            }
        }

        stages
    }

    pub fn final_stage(&self) -> Option<Stage<'_>> {
        self.stages().pop()
    }

    /// Base image of the final stage
    pub fn base_image(&self) -> Option<&ImageRef> {
        self.instructions()
            .filter_map(|i| match &i.instruction {
                Instruction::From { image, .. } => Some(image),
                _ => None,
            })
            .last()
    }

    /// Working directory in effect at the end of the final stage
    pub fn working_dir(&self) -> Option<String> {
        let stage = self.final_stage()?;
        let mut dir: Option<String> = None;
        for line in &stage.instructions {
            if let Instruction::Workdir(path) = &line.instruction {
                dir = Some(match dir {
                    Some(current) if !path.starts_with('/') && !path.starts_with('$') => {
                        format!("{}/{}", current.trim_end_matches('/'), path)
                    }
                    _ => path.clone(),
                });
            }
        }
        dir
    }

    /// ENTRYPOINT and CMD the final image starts with
    ///
    /// A stage built `FROM <alias>` inherits both from its parent. Setting
    /// ENTRYPOINT drops an inherited CMD unless the same stage sets CMD too.
    pub fn default_command(&self) -> Option<DefaultCommand> {
        let stages = self.stages();
        let last = stages.last()?;
        let mut entrypoint: Option<&InstructionLine> = None;
        let mut cmd: Option<&InstructionLine> = None;

        for stage in lineage(&stages, last.index).into_iter().rev() {
            let mut stage_cmd = None;
            let mut stage_entrypoint = None;
            for line in &stage.instructions {
                match line.instruction.keyword() {
                    Keyword::Cmd => stage_cmd = Some(*line),
                    Keyword::Entrypoint => stage_entrypoint = Some(*line),
                    _ => {}
                }
            }
            if stage_entrypoint.is_some() {
                entrypoint = stage_entrypoint;
                cmd = None;
            }
            if stage_cmd.is_some() {
                cmd = stage_cmd;
            }
        }

        let form = |line: Option<&InstructionLine>| {
            line.and_then(|l| match &l.instruction {
                Instruction::Entrypoint(form) | Instruction::Cmd(form) => Some(form.clone()),
                _ => None,
            })
        };
        let line = entrypoint.iter().chain(cmd.iter()).map(|l| l.line).max()?;
        Some(DefaultCommand {
            entrypoint: form(entrypoint),
            cmd: form(cmd),
            line,
        })
    }

    /// Same directives in the same order, ignoring comments, blanks and line numbers
    pub fn is_equivalent(&self, other: &Dockerfile) -> bool {
        self.instructions()
            .map(|i| &i.instruction)
            .eq(other.instructions().map(|i| &i.instruction))
    }
}

/// A stage followed by the stages it builds on, nearest first
pub fn lineage<'s, 'a>(stages: &'s [Stage<'a>], index: usize) -> Vec<&'s Stage<'a>> {
    let mut chain = Vec::new();
    let mut current = stages.get(index);
    while let Some(stage) = current {
        chain.push(stage);
        current = stage.parent.and_then(|p| stages.get(p));
    }
    chain
}

impl std::str::FromStr for Dockerfile {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MULTI_STAGE: &str = r#"ARG JDK=21
FROM maven:3.9-eclipse-temurin-21 AS build
WORKDIR /app
COPY . .
RUN mvn clean package -DskipTests

FROM build AS test
RUN mvn test

FROM eclipse-temurin:21-jre
WORKDIR /app
WORKDIR lib
COPY --from=build /app/target/app.jar app.jar
ENTRYPOINT ["java", "-jar"]
CMD ["app.jar"]
"#;

    #[test]
    fn test_stages_split_at_from() {
        let df = parse(MULTI_STAGE).unwrap();
        let stages = df.stages();

        assert_eq!(stages.len(), 3);
        assert_eq!(stages[0].name(), "build");
        assert_eq!(stages[0].instructions.len(), 3);
        assert_eq!(stages[1].parent, Some(0));
        assert_eq!(stages[2].name(), "2");
        assert_eq!(stages[2].parent, None);
        assert_eq!(df.preamble().len(), 1);
    }

    #[test]
    fn test_final_stage_accessors() {
        let df = parse(MULTI_STAGE).unwrap();
        assert_eq!(df.base_image().unwrap().to_string(), "eclipse-temurin:21-jre");
        assert_eq!(df.working_dir().as_deref(), Some("/app/lib"));

        let command = df.default_command().unwrap();
        assert_eq!(command.argv(), vec!["java", "-jar", "app.jar"]);
        assert!(command.is_exec());
        assert_eq!(command.line, 15);
    }

    #[test]
    fn test_default_command_inherited_from_parent() {
        let df = parse("FROM openjdk:17 AS base\nENTRYPOINT [\"java\"]\nCMD [\"Main\"]\nFROM base\nCMD [\"Other\"]\n").unwrap();
        let command = df.default_command().unwrap();
        assert_eq!(command.argv(), vec!["java", "Other"]);
        assert_eq!(command.line, 5);

        let df = parse("FROM openjdk:17 AS base\nCMD [\"Main\"]\nFROM base\nENTRYPOINT [\"java\", \"-jar\", \"app.jar\"]\n").unwrap();
        let command = df.default_command().unwrap();
        assert_eq!(command.cmd, None);
        assert_eq!(command.line, 4);

        let df = parse("FROM openjdk:17 AS base\nCMD [\"java\"]\nFROM alpine:3.19\n").unwrap();
        assert!(df.default_command().is_none());
    }

    #[test]
    fn test_shell_entrypoint_ignores_cmd() {
        let df = parse("FROM openjdk:17\nENTRYPOINT java Main\nCMD [\"ignored\"]\n").unwrap();
        let command = df.default_command().unwrap();
        assert_eq!(command.argv(), vec!["java", "Main"]);
        assert!(!command.is_exec());
        assert_eq!(command.process_argv(), vec!["/bin/sh", "-c", "java Main"]);
    }

    #[test]
    fn test_exec_entrypoint_with_cmd_arguments() {
        let df = parse("FROM openjdk:17\nENTRYPOINT [\"java\"]\nCMD [\"-jar\", \"app.jar\"]\n").unwrap();
        let command = df.default_command().unwrap();
        assert_eq!(command.process_argv(), vec!["java", "-jar", "app.jar"]);
        assert_eq!(command.line, 3);
    }

    #[test]
    fn test_no_default_command() {
        let df = parse("FROM openjdk:17\nWORKDIR /usr/src/app\n").unwrap();
        assert!(df.default_command().is_none());
    }

    #[test]
    fn test_stage_staging_before_line() {
        let df = parse(MULTI_STAGE).unwrap();
        let stages = df.stages();
        assert!(stages[0].stages_files_before(5));
        assert!(!stages[0].stages_files_before(3));
    }

    #[test]
    fn test_equivalence_ignores_comments() {
        let a = parse("# base\nFROM openjdk:17\n\nCMD [\"java\", \"Main\"]\n").unwrap();
        let b = parse("from openjdk:17\ncmd [\"java\",\"Main\"]").unwrap();
        let c = parse("FROM openjdk:17\nCMD [\"java\"]\n").unwrap();
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&c));
    }

    #[test]
    fn test_empty_file() {
        let df: Dockerfile = "\n# nothing here\n".parse().unwrap();
        assert!(df.is_empty());
        assert!(df.stages().is_empty());
        assert!(df.base_image().is_none());
    }
}
