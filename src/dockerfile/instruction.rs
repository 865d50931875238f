//! Dockerfile directive types

use super::image::ImageRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Recognized instruction keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Keyword {
    From,
    Workdir,
    Copy,
    Add,
    Run,
    Cmd,
    Entrypoint,
    Env,
    Arg,
    Label,
    Expose,
    User,
    Volume,
    Healthcheck,
    Shell,
    Stopsignal,
    Onbuild,
    Maintainer,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::From => "FROM",
            Keyword::Workdir => "WORKDIR",
            Keyword::Copy => "COPY",
            Keyword::Add => "ADD",
            Keyword::Run => "RUN",
            Keyword::Cmd => "CMD",
            Keyword::Entrypoint => "ENTRYPOINT",
            Keyword::Env => "ENV",
            Keyword::Arg => "ARG",
            Keyword::Label => "LABEL",
            Keyword::Expose => "EXPOSE",
            Keyword::User => "USER",
            Keyword::Volume => "VOLUME",
            Keyword::Healthcheck => "HEALTHCHECK",
            Keyword::Shell => "SHELL",
            Keyword::Stopsignal => "STOPSIGNAL",
            Keyword::Onbuild => "ONBUILD",
            Keyword::Maintainer => "MAINTAINER",
        }
    }

    /// Case-insensitive lookup
    pub fn from_name(name: &str) -> Option<Self> {
        let keyword = match name.to_ascii_uppercase().as_str() {
            "FROM" => Keyword::From,
            "WORKDIR" => Keyword::Workdir,
            "COPY" => Keyword::Copy,
            "ADD" => Keyword::Add,
            "RUN" => Keyword::Run,
            "CMD" => Keyword::Cmd,
            "ENTRYPOINT" => Keyword::Entrypoint,
            "ENV" => Keyword::Env,
            "ARG" => Keyword::Arg,
            "LABEL" => Keyword::Label,
            "EXPOSE" => Keyword::Expose,
            "USER" => Keyword::User,
            "VOLUME" => Keyword::Volume,
            "HEALTHCHECK" => Keyword::Healthcheck,
            "SHELL" => Keyword::Shell,
            "STOPSIGNAL" => Keyword::Stopsignal,
            "ONBUILD" => Keyword::Onbuild,
            "MAINTAINER" => Keyword::Maintainer,
            _ => return None,
        };
        Some(keyword)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How RUN, CMD and ENTRYPOINT arguments were written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", content = "value", rename_all = "lowercase")]
pub enum CommandForm {
    /// `["executable", "arg"]`, run without a shell
    Exec(Vec<String>),
    /// `executable arg`, run through `/bin/sh -c`
    Shell(String),
}

impl CommandForm {
    pub fn exec<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandForm::Exec(argv.into_iter().map(Into::into).collect())
    }

    /// Best-effort argv: exec form verbatim, shell form split on unquoted whitespace
    pub fn argv(&self) -> Vec<String> {
        match self {
            CommandForm::Exec(args) => args.clone(),
            CommandForm::Shell(line) => super::parser::split_words(line)
                .unwrap_or_else(|_| line.split_whitespace().map(str::to_string).collect()),
        }
    }

    /// Argv the container actually starts: shell form goes through `/bin/sh -c`
    pub fn process_argv(&self) -> Vec<String> {
        match self {
            CommandForm::Exec(args) => args.clone(),
            CommandForm::Shell(line) => vec!["/bin/sh".to_string(), "-c".to_string(), line.clone()],
        }
    }

    pub fn is_exec(&self) -> bool {
        matches!(self, CommandForm::Exec(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CommandForm::Exec(args) => args.is_empty(),
            CommandForm::Shell(line) => line.trim().is_empty(),
        }
    }
}

/// Arguments shared by COPY and ADD
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CopyInstruction {
    pub sources: Vec<String>,
    pub destination: String,
    /// `--from=<stage|image>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// `--chown=<user[:group]>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chmod: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub link: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "instruction", content = "args", rename_all = "lowercase")]
pub enum Instruction {
    From {
        image: ImageRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        platform: Option<String>,
    },
    Workdir(String),
    Copy(CopyInstruction),
    Add(CopyInstruction),
    Run(CommandForm),
    Cmd(CommandForm),
    Entrypoint(CommandForm),
    Env(Vec<(String, String)>),
    Arg {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
    Label(Vec<(String, String)>),
    Expose(Vec<String>),
    User(String),
    Volume(Vec<String>),
    /// Recognized but kept as written
    Raw { keyword: Keyword, arguments: String },
}

impl Instruction {
    pub fn keyword(&self) -> Keyword {
        match self {
            Instruction::From { .. } => Keyword::From,
            Instruction::Workdir(_) => Keyword::Workdir,
            Instruction::Copy(_) => Keyword::Copy,
            Instruction::Add(_) => Keyword::Add,
            Instruction::Run(_) => Keyword::Run,
            Instruction::Cmd(_) => Keyword::Cmd,
            Instruction::Entrypoint(_) => Keyword::Entrypoint,
            Instruction::Env(_) => Keyword::Env,
            Instruction::Arg { .. } => Keyword::Arg,
            Instruction::Label(_) => Keyword::Label,
            Instruction::Expose(_) => Keyword::Expose,
            Instruction::User(_) => Keyword::User,
            Instruction::Volume(_) => Keyword::Volume,
            Instruction::Raw { keyword, .. } => *keyword,
        }
    }

    /// COPY or ADD that stages files into the image
    pub fn as_staging(&self) -> Option<&CopyInstruction> {
        match self {
            Instruction::Copy(copy) | Instruction::Add(copy) => Some(copy),
            _ => None,
        }
    }
}

/// An instruction together with the line it started on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionLine {
    #[serde(default)]
    pub line: usize,
    #[serde(flatten)]
    pub instruction: Instruction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Line {
    Blank,
    Comment { text: String },
    Instruction(InstructionLine),
}
