//! Per-language Dockerfile templates
//!
//! Two shapes are generated:
//!
//! - [`TemplateKind::Sandbox`]: an image whose working directory receives a
//!   mounted source file at run time. Its `CMD` only prints the toolchain
//!   version.
//! - [`TemplateKind::Standalone`]: a self-contained image that copies the
//!   build context, compiles if the language needs it and runs the entry.

use crate::dockerfile::{
    CommandForm, CopyInstruction, Dockerfile, ImageRef, ImageRefError, Instruction, InstructionLine,
    Line,
};
use crate::runtime::jvm::DEFAULT_ENTRY_CLASS;
use crate::runtime::Language;
use thiserror::Error;

pub const DEFAULT_WORKDIR: &str = "/usr/src/app";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateKind {
    Sandbox,
    Standalone { entry: Option<String> },
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Invalid entry name '{0}': expected letters, digits and underscores")]
    InvalidEntry(String),

    #[error("Invalid base image: {0}")]
    InvalidImage(#[from] ImageRefError),
}

#[derive(Default)]
struct TemplateBuilder {
    lines: Vec<Line>,
}

impl TemplateBuilder {
    fn comment(mut self, text: impl AsRef<str>) -> Self {
        self.lines.push(Line::Comment {
            text: format!(" {}", text.as_ref()),
        });
        self
    }

    fn blank(mut self) -> Self {
        self.lines.push(Line::Blank);
        self
    }

    fn instruction(mut self, instruction: Instruction) -> Self {
        let line = self.lines.len() + 1;
        self.lines
            .push(Line::Instruction(InstructionLine { line, instruction }));
        self
    }

    fn build(self) -> Dockerfile {
        Dockerfile::new(self.lines)
    }
}

fn from(image: ImageRef) -> Instruction {
    Instruction::From {
        image,
        alias: None,
        platform: None,
    }
}

fn copy_context() -> Instruction {
    Instruction::Copy(CopyInstruction {
        sources: vec![".".to_string()],
        destination: ".".to_string(),
        ..Default::default()
    })
}

fn default_entry(language: Language) -> &'static str {
    match language {
        Language::Java => DEFAULT_ENTRY_CLASS,
        _ => "main",
    }
}

fn is_valid_entry(entry: &str) -> bool {
    let mut chars = entry.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Generate a commented Dockerfile model for `language`
pub fn generate(language: Language, kind: &TemplateKind, workdir: &str) -> Result<Dockerfile, TemplateError> {
    let runtime = language.runtime();
    let image: ImageRef = runtime.base_image().parse()?;

    let builder = TemplateBuilder::default()
        .comment(format!("Base image with the {} toolchain", runtime.name()))
        .instruction(from(image))
        .blank()
        .comment("Set working directory")
        .instruction(Instruction::Workdir(workdir.to_string()))
        .blank();

    let builder = match kind {
        TemplateKind::Sandbox => builder
            .comment("Source files are mounted here at run time")
            .comment("Print the toolchain version when started without a command")
            .instruction(Instruction::Cmd(CommandForm::Exec(runtime.version_command()))),
        TemplateKind::Standalone { entry } => {
            let entry = entry.as_deref().unwrap_or(default_entry(language));
            if !is_valid_entry(entry) {
                return Err(TemplateError::InvalidEntry(entry.to_string()));
            }
            let source = format!("{}{}", entry, language.extension());

            let mut builder = builder
                .comment(format!("Copy {} source files into the container", runtime.name()))
                .instruction(copy_context())
                .blank();
            if let Some(compile) = runtime.compile_command(&source, entry) {
                builder = builder
                    .comment(format!("Compile {} code", runtime.name()))
                    .instruction(Instruction::Run(CommandForm::Shell(compile)))
                    .blank();
            }
            let execute = runtime.execute_command(&source, entry);
            builder
                .comment(format!("Default command to run the {} program", runtime.name()))
                .instruction(Instruction::Cmd(CommandForm::exec(execute.split_whitespace())))
        }
    };

    Ok(builder.build())
}

fn openjdk17() -> ImageRef {
    ImageRef::new("openjdk", Some("17"))
}

/// Java image that copies, compiles and runs `Main`
pub fn java_variant_a() -> Dockerfile {
    TemplateBuilder::default()
        .instruction(from(openjdk17()))
        .instruction(Instruction::Workdir(DEFAULT_WORKDIR.to_string()))
        .instruction(copy_context())
        .instruction(Instruction::Run(CommandForm::Shell("javac Main.java".to_string())))
        .instruction(Instruction::Cmd(CommandForm::exec(["java", "Main"])))
        .build()
}

/// Java image whose default command is a bare `java`
pub fn java_variant_b() -> Dockerfile {
    TemplateBuilder::default()
        .instruction(from(openjdk17()))
        .instruction(Instruction::Workdir(DEFAULT_WORKDIR.to_string()))
        .instruction(Instruction::Cmd(CommandForm::exec(["java"])))
        .build()
}
