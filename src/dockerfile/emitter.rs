//! Canonical Dockerfile rendering

use super::instruction::{CommandForm, CopyInstruction, Instruction, Line};
use super::parser::escape_directive;
use super::{Dockerfile, DEFAULT_ESCAPE};
use std::fmt;

impl Dockerfile {
    /// Renders the file with uppercase keywords and one instruction per line
    pub fn emit(&self) -> String {
        let mut out = String::new();

        let declares_escape = self.lines.iter().take_while(|l| matches!(l, Line::Comment { .. })).any(
            |l| matches!(l, Line::Comment { text } if escape_directive(&format!("#{}", text)).is_some()),
        );
        if self.escape != DEFAULT_ESCAPE && !declares_escape {
            out.push_str(&format!("# escape={}\n", self.escape));
        }

        for line in &self.lines {
            match line {
                Line::Blank => {}
                Line::Comment { text } => {
                    out.push('#');
                    out.push_str(text);
                }
                Line::Instruction(line) => {
                    out.push_str(&render_instruction(&line.instruction, self.escape));
                }
            }
            out.push('\n');
        }

        out
    }
}

impl fmt::Display for Dockerfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.emit())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_instruction(self, DEFAULT_ESCAPE))
    }
}

pub(crate) fn render_instruction(instruction: &Instruction, escape: char) -> String {
    let keyword = instruction.keyword();
    let args = match instruction {
        Instruction::From {
            image,
            alias,
            platform,
        } => {
            let mut args = String::new();
            if let Some(platform) = platform {
                args.push_str(&format!("--platform={} ", platform));
            }
            args.push_str(&image.to_string());
            if let Some(alias) = alias {
                args.push_str(&format!(" AS {}", alias));
            }
            args
        }
        Instruction::Workdir(path) | Instruction::User(path) => path.clone(),
        Instruction::Copy(copy) | Instruction::Add(copy) => render_copy(copy, escape),
        Instruction::Run(form) | Instruction::Cmd(form) | Instruction::Entrypoint(form) => {
            render_command(form)
        }
        Instruction::Env(pairs) | Instruction::Label(pairs) => pairs
            .iter()
            .map(|(key, value)| format!("{}={}", quote_word(key, escape), quote_word(value, escape)))
            .collect::<Vec<_>>()
            .join(" "),
        Instruction::Arg { name, default } => match default {
            Some(default) => format!("{}={}", quote_word(name, escape), quote_word(default, escape)),
            None => quote_word(name, escape),
        },
        Instruction::Expose(ports) => ports.join(" "),
        Instruction::Volume(paths) => {
            if paths.iter().any(|p| p.chars().any(char::is_whitespace)) {
                render_json_array(paths)
            } else {
                paths.join(" ")
            }
        }
        Instruction::Raw { arguments, .. } => arguments.clone(),
    };

    format!("{} {}", keyword, args)
}

fn render_copy(copy: &CopyInstruction, escape: char) -> String {
    let mut parts = Vec::new();
    if let Some(ref from) = copy.from {
        parts.push(format!("--from={}", from));
    }
    if let Some(ref chown) = copy.chown {
        parts.push(format!("--chown={}", chown));
    }
    if let Some(ref chmod) = copy.chmod {
        parts.push(format!("--chmod={}", chmod));
    }
    if copy.link {
        parts.push("--link".to_string());
    }

    let mut paths: Vec<String> = copy.sources.clone();
    paths.push(copy.destination.clone());

    if paths.iter().any(|p| p.chars().any(char::is_whitespace)) {
        parts.push(render_json_array(&paths));
    } else {
        parts.extend(paths.iter().map(|p| quote_word(p, escape)));
    }
    parts.join(" ")
}

fn render_command(form: &CommandForm) -> String {
    match form {
        CommandForm::Exec(argv) => render_json_array(argv),
        CommandForm::Shell(line) => line.clone(),
    }
}

/// `["a", "b"]` with JSON string escaping
fn render_json_array(items: &[String]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|item| serde_json::Value::String(item.clone()).to_string())
        .collect();
    format!("[{}]", quoted.join(", "))
}

/// Quotes a word so the parser's word splitting reads it back unchanged
fn quote_word(word: &str, escape: char) -> String {
    let needs_quotes = word.is_empty()
        || word
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\'' || c == escape);
    if !needs_quotes {
        return word.to_string();
    }

    let mut quoted = String::with_capacity(word.len() + 2);
    quoted.push('"');
    for c in word.chars() {
        if c == '"' || c == escape {
            quoted.push(escape);
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
