//! Dockerfile text parser
//!
//! Turns Dockerfile source into a [`Dockerfile`], keeping comments and blank
//! lines so the file can be emitted again in the same order.

use super::error::{ParseError, ParseErrorKind};
use super::image::ImageRef;
use super::instruction::{CommandForm, CopyInstruction, Instruction, InstructionLine, Keyword, Line};
use super::Dockerfile;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, trace};

pub const DEFAULT_ESCAPE: char = '\\';

fn directive_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^#\s*([A-Za-z][A-Za-z0-9_-]*)\s*=\s*(\S+)\s*$").expect("valid regex")
    })
}

/// Returns the escape character declared by a `# escape=` directive, if `line` is one
pub fn escape_directive(line: &str) -> Option<char> {
    let caps = directive_regex().captures(line.trim())?;
    if !caps[1].eq_ignore_ascii_case("escape") {
        return None;
    }
    match &caps[2] {
        "\\" => Some('\\'),
        "`" => Some('`'),
        _ => None,
    }
}

/// Parses Dockerfile source text
pub fn parse(text: &str) -> Result<Dockerfile, ParseError> {
    let escape = detect_escape(text);
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = raw.trim();

        if pending.is_none() {
            if trimmed.is_empty() {
                lines.push(Line::Blank);
                continue;
            }
            if let Some(text) = trimmed.strip_prefix('#') {
                lines.push(Line::Comment {
                    text: text.to_string(),
                });
                continue;
            }
        } else if trimmed.is_empty() || trimmed.starts_with('#') {
            trace!(line = line_no, "Skipping line inside continuation");
            continue;
        }

        let chunk = raw.trim_end();
        let (start, mut buffer) = pending.take().unwrap_or((line_no, String::new()));

        if let Some(continued) = chunk.strip_suffix(escape) {
            buffer.push_str(continued);
            pending = Some((start, buffer));
            continue;
        }

        buffer.push_str(chunk);
        let instruction = parse_instruction(start, buffer.trim(), escape)?;
        lines.push(Line::Instruction(InstructionLine {
            line: start,
            instruction,
        }));
    }

    if let Some((start, _)) = pending {
        return Err(ParseError::new(
            start,
            ParseErrorKind::UnterminatedContinuation,
        ));
    }

    debug!(
        lines = lines.len(),
        escape = %escape,
        "Parsed Dockerfile"
    );

    Ok(Dockerfile { escape, lines })
}

/// Parser directives must precede every other line, including blank ones
fn detect_escape(text: &str) -> char {
    for line in text.lines() {
        let trimmed = line.trim();
        if !trimmed.starts_with('#') || !directive_regex().is_match(trimmed) {
            break;
        }
        if let Some(escape) = escape_directive(trimmed) {
            return escape;
        }
    }
    DEFAULT_ESCAPE
}

fn parse_instruction(line: usize, content: &str, escape: char) -> Result<Instruction, ParseError> {
    let (word, rest) = match content.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (content, ""),
    };

    let keyword = Keyword::from_name(word)
        .ok_or_else(|| ParseError::new(line, ParseErrorKind::UnknownInstruction(word.to_string())))?;

    trace!(line, keyword = %keyword, "Parsing instruction");

    let err = |kind| ParseError::new(line, kind);
    let missing = |expected: &'static str| {
        ParseError::new(
            line,
            ParseErrorKind::MissingArguments {
                keyword: keyword.to_string(),
                expected,
            },
        )
    };
    let invalid = |message: String| {
        ParseError::new(
            line,
            ParseErrorKind::InvalidArgument {
                keyword: keyword.to_string(),
                message,
            },
        )
    };

    if rest.is_empty() {
        return Err(missing(expected_arguments(keyword)));
    }

    let instruction = match keyword {
        Keyword::From => {
            let (flags, remainder) = strip_raw_flags(rest);
            let words = split_words_with(remainder, escape).map_err(err)?;
            let mut platform = None;
            for (name, value) in flags {
                match name.as_str() {
                    "platform" => platform = Some(value),
                    other => return Err(invalid(format!("unsupported flag --{}", other))),
                }
            }
            let (image, alias) = match words.as_slice() {
                [image] => (image, None),
                [image, as_word, alias] if as_word.eq_ignore_ascii_case("as") => {
                    (image, Some(alias.clone()))
                }
                [] => return Err(missing(expected_arguments(keyword))),
                _ => return Err(invalid(format!("expected 'image [AS name]', got '{}'", rest))),
            };
            let image: ImageRef = image.parse().map_err(|e| invalid(format!("{}", e)))?;
            Instruction::From {
                image,
                alias,
                platform,
            }
        }
        Keyword::Workdir => Instruction::Workdir(rest.to_string()),
        Keyword::Copy | Keyword::Add => {
            let copy = parse_copy(rest, escape).map_err(|kind| match kind {
                ParseErrorKind::MissingArguments { .. } => missing(expected_arguments(keyword)),
                ParseErrorKind::InvalidArgument { message, .. } => invalid(message),
                other => err(other),
            })?;
            if keyword == Keyword::Copy {
                Instruction::Copy(copy)
            } else {
                Instruction::Add(copy)
            }
        }
        Keyword::Run => Instruction::Run(parse_command_form(rest)),
        Keyword::Cmd => Instruction::Cmd(parse_command_form(rest)),
        Keyword::Entrypoint => Instruction::Entrypoint(parse_command_form(rest)),
        Keyword::Env => Instruction::Env(parse_env(rest, escape).map_err(|kind| match kind {
            ParseErrorKind::InvalidArgument { message, .. } => invalid(message),
            other => err(other),
        })?),
        Keyword::Label => {
            let words = split_words_with(rest, escape).map_err(err)?;
            let pairs = words
                .into_iter()
                .map(|word| split_pair(&word).ok_or_else(|| invalid(format!("expected key=value, got '{}'", word))))
                .collect::<Result<Vec<_>, _>>()?;
            Instruction::Label(pairs)
        }
        Keyword::Arg => {
            let words = split_words_with(rest, escape).map_err(err)?;
            match words.as_slice() {
                [word] => match word.split_once('=') {
                    Some((name, default)) => Instruction::Arg {
                        name: name.to_string(),
                        default: Some(default.to_string()),
                    },
                    None => Instruction::Arg {
                        name: word.clone(),
                        default: None,
                    },
                },
                _ => return Err(invalid(format!("expected a single 'name[=default]', got '{}'", rest))),
            }
        }
        Keyword::Expose => Instruction::Expose(rest.split_whitespace().map(str::to_string).collect()),
        Keyword::User => Instruction::User(rest.to_string()),
        Keyword::Volume => match parse_json_array(rest) {
            Some(paths) => Instruction::Volume(paths),
            None => Instruction::Volume(rest.split_whitespace().map(str::to_string).collect()),
        },
        Keyword::Healthcheck
        | Keyword::Shell
        | Keyword::Stopsignal
        | Keyword::Onbuild
        | Keyword::Maintainer => Instruction::Raw {
            keyword,
            arguments: rest.to_string(),
        },
    };

    Ok(instruction)
}

fn expected_arguments(keyword: Keyword) -> &'static str {
    match keyword {
        Keyword::From => "an image reference",
        Keyword::Copy | Keyword::Add => "at least one source and a destination",
        Keyword::Workdir => "a path",
        Keyword::Env | Keyword::Label => "at least one key and value",
        Keyword::Arg => "a name",
        Keyword::Expose => "at least one port",
        Keyword::User => "a user name or id",
        Keyword::Volume => "at least one path",
        Keyword::Run | Keyword::Cmd | Keyword::Entrypoint => "a command",
        _ => "arguments",
    }
}

fn parse_json_array(rest: &str) -> Option<Vec<String>> {
    if !rest.starts_with('[') {
        return None;
    }
    serde_json::from_str::<Vec<String>>(rest).ok()
}

/// JSON arrays are exec form; anything else, including malformed JSON, is shell form
pub fn parse_command_form(rest: &str) -> CommandForm {
    match parse_json_array(rest) {
        Some(argv) => CommandForm::Exec(argv),
        None => CommandForm::Shell(rest.to_string()),
    }
}

/// Splits leading `--flag[=value]` words off raw argument text
fn strip_raw_flags(rest: &str) -> (Vec<(String, String)>, &str) {
    let mut flags = Vec::new();
    let mut remainder = rest.trim_start();
    while let Some(flag) = remainder.strip_prefix("--") {
        let end = flag.find(char::is_whitespace).unwrap_or(flag.len());
        let (name, value) = flag[..end].split_once('=').unwrap_or((&flag[..end], ""));
        flags.push((name.to_string(), value.to_string()));
        remainder = flag[end..].trim_start();
    }
    (flags, remainder)
}

fn parse_copy(rest: &str, escape: char) -> Result<CopyInstruction, ParseErrorKind> {
    let (flags, remainder) = strip_raw_flags(rest);

    let mut copy = CopyInstruction::default();
    for (name, value) in flags {
        match name.as_str() {
            "from" => copy.from = Some(value),
            "chown" => copy.chown = Some(value),
            "chmod" => copy.chmod = Some(value),
            "link" => copy.link = value.is_empty() || value == "true",
            other => {
                return Err(ParseErrorKind::InvalidArgument {
                    keyword: String::new(),
                    message: format!("unsupported flag --{}", other),
                })
            }
        }
    }

    // JSON form `COPY ["src", "dest"]` allows paths with spaces
    let paths = match parse_json_array(remainder) {
        Some(paths) => paths,
        None => split_words_with(remainder, escape)?,
    };

    match paths.split_last() {
        Some((destination, sources)) if !sources.is_empty() => {
            copy.sources = sources.to_vec();
            copy.destination = destination.clone();
            Ok(copy)
        }
        _ => Err(ParseErrorKind::MissingArguments {
            keyword: String::new(),
            expected: "at least one source and a destination",
        }),
    }
}

fn split_pair(word: &str) -> Option<(String, String)> {
    let (key, value) = word.split_once('=')?;
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

fn parse_env(rest: &str, escape: char) -> Result<Vec<(String, String)>, ParseErrorKind> {
    let words = split_words_with(rest, escape)?;
    let first_is_pair = words.first().map(|w| w.contains('=')).unwrap_or(false);

    if first_is_pair {
        return words
            .iter()
            .map(|word| {
                split_pair(word).ok_or_else(|| ParseErrorKind::InvalidArgument {
                    keyword: String::new(),
                    message: format!("expected key=value, got '{}'", word),
                })
            })
            .collect();
    }

    // Legacy `ENV key value with spaces`
    match rest.split_once(char::is_whitespace) {
        Some((key, value)) if !value.trim().is_empty() => {
            Ok(vec![(key.to_string(), value.trim().to_string())])
        }
        _ => Err(ParseErrorKind::InvalidArgument {
            keyword: String::new(),
            message: format!("'{}' has no value", rest),
        }),
    }
}

/// Splits on unquoted whitespace using backslash as the escape character
pub fn split_words(input: &str) -> Result<Vec<String>, ParseErrorKind> {
    split_words_with(input, DEFAULT_ESCAPE)
}

/// Splits on unquoted whitespace, removing quotes and escapes
pub fn split_words_with(input: &str, escape: char) -> Result<Vec<String>, ParseErrorKind> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some('\'') => {
                if c == '\'' {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            Some(_) => {
                if c == '"' {
                    quote = None;
                } else if c == escape {
                    match chars.next() {
                        Some(next) if next == '"' || next == escape => current.push(next),
                        Some(next) => {
                            current.push(c);
                            current.push(next);
                        }
                        None => return Err(ParseErrorKind::UnterminatedQuote),
                    }
                } else {
                    current.push(c);
                }
            }
            None => {
                if c.is_whitespace() {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                    continue;
                }
                in_word = true;
                if c == '\'' || c == '"' {
                    quote = Some(c);
                } else if c == escape {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                } else {
                    current.push(c);
                }
            }
        }
    }

    if quote.is_some() {
        return Err(ParseErrorKind::UnterminatedQuote);
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARIANT_A: &str = r#"# Use the official OpenJDK image
FROM openjdk:17

# Set working directory
WORKDIR /usr/src/app

# Copy Java source files into the container
COPY . .

# Compile Java code
RUN javac Main.java

# Default command to run the Java program
CMD ["java", "Main"]
"#;

    fn instructions(df: &Dockerfile) -> Vec<Instruction> {
        df.instructions().map(|i| i.instruction.clone()).collect()
    }

    #[test]
    fn test_parse_variant_a_sequence() {
        let df = parse(VARIANT_A).unwrap();
        let seq = instructions(&df);

        assert_eq!(seq.len(), 5);
        assert_eq!(
            seq[0],
            Instruction::From {
                image: "openjdk:17".parse().unwrap(),
                alias: None,
                platform: None,
            }
        );
        assert_eq!(seq[1], Instruction::Workdir("/usr/src/app".to_string()));
        assert_eq!(
            seq[2],
            Instruction::Copy(CopyInstruction {
                sources: vec![".".to_string()],
                destination: ".".to_string(),
                ..Default::default()
            })
        );
        assert_eq!(seq[3], Instruction::Run(CommandForm::Shell("javac Main.java".to_string())));
        assert_eq!(seq[4], Instruction::Cmd(CommandForm::exec(["java", "Main"])));
    }

    #[test]
    fn test_parse_keeps_comments_and_line_numbers() {
        let df = parse(VARIANT_A).unwrap();
        assert!(matches!(&df.lines[0], Line::Comment { text } if text == " Use the official OpenJDK image"));
        assert_eq!(df.lines[2], Line::Blank);

        let lines: Vec<usize> = df.instructions().map(|i| i.line).collect();
        assert_eq!(lines, vec![2, 5, 8, 11, 14]);
    }

    #[test]
    fn test_lowercase_keywords() {
        let df = parse("from alpine:3.19\nrun echo hi\n").unwrap();
        assert_eq!(df.instructions().count(), 2);
    }

    #[test]
    fn test_unknown_instruction_reports_line() {
        let err = parse("FROM openjdk:17\nCOMPILE Main.java\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.kind, ParseErrorKind::UnknownInstruction("COMPILE".to_string()));
    }

    #[test]
    fn test_line_continuation_joins_and_skips_comments() {
        let text = "FROM gcc:13\nRUN apt-get update && \\\n# inline note\n    apt-get install -y make\n";
        let df = parse(text).unwrap();
        let run = df.instructions().nth(1).unwrap();
        assert_eq!(run.line, 2);
        assert_eq!(
            run.instruction,
            Instruction::Run(CommandForm::Shell(
                "apt-get update &&     apt-get install -y make".to_string()
            ))
        );
    }

    #[test]
    fn test_unterminated_continuation() {
        let err = parse("FROM gcc:13\nRUN make \\\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.kind, ParseErrorKind::UnterminatedContinuation);
    }

    #[test]
    fn test_escape_directive_backtick() {
        let text = "# escape=`\nFROM mcr.microsoft.com/windows/servercore:ltsc2022\nCOPY C:\\src\\app C:\\app\nRUN dir `\n  C:\\app\n";
        let df = parse(text).unwrap();
        assert_eq!(df.escape, '`');
        let seq = instructions(&df);
        assert_eq!(
            seq[1],
            Instruction::Copy(CopyInstruction {
                sources: vec!["C:\\src\\app".to_string()],
                destination: "C:\\app".to_string(),
                ..Default::default()
            })
        );
        assert_eq!(seq[2], Instruction::Run(CommandForm::Shell("dir   C:\\app".to_string())));
    }

    #[test]
    fn test_malformed_json_falls_back_to_shell() {
        let df = parse("FROM openjdk:17\nCMD [\"java\", Main]\n").unwrap();
        let cmd = df.instructions().nth(1).unwrap();
        assert_eq!(
            cmd.instruction,
            Instruction::Cmd(CommandForm::Shell("[\"java\", Main]".to_string()))
        );
    }

    #[test]
    fn test_from_with_alias_and_platform() {
        let df = parse("FROM --platform=linux/amd64 maven:3.9 AS build\n").unwrap();
        assert_eq!(
            instructions(&df)[0],
            Instruction::From {
                image: "maven:3.9".parse().unwrap(),
                alias: Some("build".to_string()),
                platform: Some("linux/amd64".to_string()),
            }
        );
    }

    #[test]
    fn test_from_rejects_extra_words() {
        let err = parse("FROM openjdk:17 extra\n").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidArgument { .. }));
    }

    #[test]
    fn test_copy_flags_and_json_form() {
        let df = parse(
            "FROM eclipse-temurin:21-jre\nCOPY --from=build --chown=app:app /app/target/app.jar app.jar\nCOPY [\"my dir\", \"/opt/my dir/\"]\n",
        )
        .unwrap();
        let seq = instructions(&df);
        assert_eq!(
            seq[1],
            Instruction::Copy(CopyInstruction {
                sources: vec!["/app/target/app.jar".to_string()],
                destination: "app.jar".to_string(),
                from: Some("build".to_string()),
                chown: Some("app:app".to_string()),
                ..Default::default()
            })
        );
        let Instruction::Copy(copy) = &seq[2] else {
            panic!("expected COPY");
        };
        assert_eq!(copy.sources, vec!["my dir"]);
        assert_eq!(copy.destination, "/opt/my dir/");
    }

    #[test]
    fn test_copy_requires_destination() {
        let err = parse("FROM openjdk:17\nCOPY Main.java\n").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::MissingArguments { .. }));
    }

    #[test]
    fn test_env_forms() {
        let df = parse(
            "FROM openjdk:17\nENV JAVA_OPTS=\"-Xmx256m -Xss1m\" LANG=C.UTF-8\nENV JAVA_HOME /opt/java home\n",
        )
        .unwrap();
        let seq = instructions(&df);
        assert_eq!(
            seq[1],
            Instruction::Env(vec![
                ("JAVA_OPTS".to_string(), "-Xmx256m -Xss1m".to_string()),
                ("LANG".to_string(), "C.UTF-8".to_string()),
            ])
        );
        assert_eq!(
            seq[2],
            Instruction::Env(vec![("JAVA_HOME".to_string(), "/opt/java home".to_string())])
        );
    }

    #[test]
    fn test_arg_and_cmd_missing() {
        let df = parse("ARG VERSION=17\nFROM openjdk:${VERSION}\n").unwrap();
        assert_eq!(
            instructions(&df)[0],
            Instruction::Arg {
                name: "VERSION".to_string(),
                default: Some("17".to_string()),
            }
        );

        let err = parse("FROM openjdk:17\nCMD\n").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::MissingArguments { .. }));
    }

    #[test]
    fn test_raw_instructions_kept() {
        let df = parse("FROM nginx:1.25\nHEALTHCHECK --interval=30s CMD curl -f http://localhost/ || exit 1\n").unwrap();
        assert_eq!(
            instructions(&df)[1],
            Instruction::Raw {
                keyword: Keyword::Healthcheck,
                arguments: "--interval=30s CMD curl -f http://localhost/ || exit 1".to_string(),
            }
        );
    }

    #[test]
    fn test_split_words_quotes() {
        assert_eq!(
            split_words(r#"a "b c" 'd e' f\ g "h\"i""#).unwrap(),
            vec!["a", "b c", "d e", "f g", "h\"i"]
        );
        assert_eq!(split_words("\"open").unwrap_err(), ParseErrorKind::UnterminatedQuote);
        assert_eq!(split_words(r#"key="""#).unwrap(), vec!["key="]);
    }
}
