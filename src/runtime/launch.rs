//! Static inspection of container launch commands
//!
//! Knows enough about common launchers (the JVM, compilers, script
//! interpreters) to tell whether a default command names what it should run.

use crate::dockerfile::parser::split_words;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchCheck {
    /// The launcher has what it needs to start
    Satisfied { program: String },
    /// The launcher exits with a usage error because its entry argument is missing
    MissingEntry {
        program: String,
        expected: &'static str,
    },
    /// The launcher starts a REPL waiting on stdin
    Interactive { program: String },
    /// Nothing is known about this launcher
    Unknown { program: String },
    Empty,
}

impl LaunchCheck {
    pub fn program(&self) -> Option<&str> {
        match self {
            LaunchCheck::Satisfied { program }
            | LaunchCheck::MissingEntry { program, .. }
            | LaunchCheck::Interactive { program }
            | LaunchCheck::Unknown { program } => Some(program),
            LaunchCheck::Empty => None,
        }
    }
}

struct Launcher {
    programs: &'static [&'static str],
    /// Options whose value is the next argument
    value_options: &'static [&'static str],
    /// Options followed by the thing to run
    entry_options: &'static [&'static str],
    /// Options that make the launcher print and exit
    info_options: &'static [&'static str],
    /// Whether the launcher falls back to a REPL without an entry
    interactive: bool,
    expected: &'static str,
}

const LAUNCHERS: &[Launcher] = &[
    Launcher {
        programs: &["java"],
        value_options: &[
            "-cp",
            "-classpath",
            "--class-path",
            "-p",
            "--module-path",
            "--upgrade-module-path",
            "--add-modules",
            "--add-opens",
            "--add-exports",
            "--add-reads",
            "--enable-native-access",
        ],
        entry_options: &["-jar", "-m", "--module"],
        info_options: &[
            "-version",
            "--version",
            "-help",
            "--help",
            "-h",
            "-?",
            "--list-modules",
            "--dry-run",
        ],
        interactive: false,
        expected: "a main class, -jar <file>, or --module <name>",
    },
    Launcher {
        programs: &["javac", "gcc", "g++", "cc", "c++", "clang", "clang++", "rustc", "swiftc", "ghc"],
        value_options: &[
            "-o",
            "-d",
            "-cp",
            "-classpath",
            "--class-path",
            "-sourcepath",
            "--source-path",
            "--release",
            "-source",
            "-target",
            "-I",
            "-L",
            "-l",
            "-x",
            "--edition",
            "--crate-type",
            "--crate-name",
        ],
        entry_options: &[],
        info_options: &["--version", "-version", "--help", "-help"],
        interactive: false,
        expected: "source files to compile",
    },
    Launcher {
        programs: &["python", "python3", "python2"],
        value_options: &["-W", "-X", "-Q"],
        entry_options: &["-c", "-m"],
        info_options: &["--version", "-V", "--help", "-h"],
        interactive: true,
        expected: "a script, -c <command>, or -m <module>",
    },
    Launcher {
        programs: &["node", "nodejs"],
        value_options: &["-r", "--require", "--import", "--loader"],
        entry_options: &["-e", "--eval", "-p", "--print"],
        info_options: &["--version", "-v", "--help", "-h"],
        interactive: true,
        expected: "a script or -e <code>",
    },
    Launcher {
        programs: &["ruby", "perl", "php", "irb", "ghci", "R", "swift"],
        value_options: &["-I"],
        entry_options: &["-e", "-E", "-r"],
        info_options: &["--version", "-v", "-version", "--help", "-h"],
        interactive: true,
        expected: "a script or -e <code>",
    },
    Launcher {
        programs: &["Rscript"],
        value_options: &[],
        entry_options: &["-e"],
        info_options: &["--version", "--help"],
        interactive: false,
        expected: "a script file or -e <expression>",
    },
];

const SHELLS: &[&str] = &["sh", "bash", "dash", "ash", "zsh"];
const SHELL_OPERATORS: &[&str] = &["&&", "||", ";", "|", "&"];

fn basename(program: &str) -> &str {
    program.rsplit('/').next().unwrap_or(program)
}

/// Inspect the argv a container starts with.
pub fn inspect_launch(argv: &[String]) -> LaunchCheck {
    let argv = strip_wrappers(argv);
    let Some(first) = argv.first() else {
        return LaunchCheck::Empty;
    };
    let program = basename(first);

    if SHELLS.contains(&program) {
        if let Some(pos) = argv.iter().position(|a| a == "-c") {
            return match argv.get(pos + 1) {
                Some(script) => inspect_script(script),
                None => LaunchCheck::MissingEntry {
                    program: program.to_string(),
                    expected: "a command string after -c",
                },
            };
        }
        return if argv.len() > 1 {
            LaunchCheck::Satisfied {
                program: program.to_string(),
            }
        } else {
            LaunchCheck::Interactive {
                program: program.to_string(),
            }
        };
    }

    if program == "go" {
        return inspect_go(argv);
    }

    match LAUNCHERS.iter().find(|l| l.programs.contains(&program)) {
        Some(launcher) => inspect_with(launcher, program, &argv[1..]),
        None => LaunchCheck::Unknown {
            program: program.to_string(),
        },
    }
}

fn inspect_with(launcher: &Launcher, program: &str, args: &[String]) -> LaunchCheck {
    let program = program.to_string();
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if launcher.info_options.contains(&arg) {
            return LaunchCheck::Satisfied { program };
        }
        if launcher.entry_options.contains(&arg) {
            return if i + 1 < args.len() {
                LaunchCheck::Satisfied { program }
            } else {
                LaunchCheck::MissingEntry {
                    program,
                    expected: launcher.expected,
                }
            };
        }
        if let Some((name, value)) = arg.split_once('=') {
            if launcher.entry_options.contains(&name) && !value.is_empty() {
                return LaunchCheck::Satisfied { program };
            }
        }
        if arg.starts_with('-') && arg.len() > 1 {
            i += if launcher.value_options.contains(&arg) { 2 } else { 1 };
            continue;
        }
        return LaunchCheck::Satisfied { program };
    }

    if launcher.interactive {
        LaunchCheck::Interactive { program }
    } else {
        LaunchCheck::MissingEntry {
            program,
            expected: launcher.expected,
        }
    }
}

fn inspect_go(argv: &[String]) -> LaunchCheck {
    let program = "go".to_string();
    let positional: Vec<&String> = argv[1..].iter().filter(|a| !a.starts_with('-')).collect();
    match positional.first().map(|s| s.as_str()) {
        None => LaunchCheck::MissingEntry {
            program,
            expected: "a subcommand",
        },
        Some("run") if positional.len() < 2 => LaunchCheck::MissingEntry {
            program,
            expected: "a package or .go file to run",
        },
        Some(_) => LaunchCheck::Satisfied { program },
    }
}

/// Skip launchers that only wrap another command.
fn strip_wrappers(argv: &[String]) -> &[String] {
    let Some(first) = argv.first() else {
        return argv;
    };
    let rest = &argv[1..];
    let skip = match basename(first) {
        "exec" | "tini" | "dumb-init" | "nohup" => leading_options(rest, &[]),
        "env" => rest
            .iter()
            .take_while(|a| a.starts_with('-') || a.contains('='))
            .count(),
        "nice" => leading_options(rest, &["-n"]),
        "timeout" => {
            let options = leading_options(rest, &["-s", "-k", "--signal", "--kill-after"]);
            // the duration
            (options + 1).min(rest.len())
        }
        _ => return argv,
    };
    strip_wrappers(&rest[skip..])
}

fn leading_options(args: &[String], value_options: &[&str]) -> usize {
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "--" {
            return i + 1;
        }
        if !arg.starts_with('-') {
            break;
        }
        i += if value_options.contains(&arg) { 2 } else { 1 };
    }
    i.min(args.len())
}

/// Inspect a `sh -c` script, one pipeline segment at a time.
fn inspect_script(script: &str) -> LaunchCheck {
    let Ok(words) = split_words(script) else {
        return LaunchCheck::Unknown {
            program: "sh".to_string(),
        };
    };

    let checks: Vec<LaunchCheck> = shell_segments(&words)
        .iter()
        .map(|s| inspect_launch(s))
        .collect();

    if let Some(missing) = checks
        .iter()
        .find(|c| matches!(c, LaunchCheck::MissingEntry { .. }))
    {
        return missing.clone();
    }
    checks.last().cloned().unwrap_or(LaunchCheck::Empty)
}

/// Split shell words into simple commands at `&&`, `||`, `;`, `|` and `&`,
/// dropping redirections and their targets.
pub fn shell_segments(words: &[String]) -> Vec<Vec<String>> {
    let mut segments: Vec<Vec<String>> = vec![Vec::new()];
    let mut skip_next = false;
    for word in words {
        if skip_next {
            skip_next = false;
            continue;
        }
        if SHELL_OPERATORS.contains(&word.as_str()) {
            segments.push(Vec::new());
            continue;
        }
        if is_redirect(word) {
            let operator = word.trim_start_matches(|c: char| c.is_ascii_digit());
            skip_next = matches!(operator, ">" | ">>" | "<" | ">|");
            continue;
        }
        if let Some(current) = segments.last_mut() {
            current.push(word.clone());
        }
    }
    segments.retain(|s| !s.is_empty());
    segments
}

/// Main class a `java` launch names, if it starts one by class name
pub fn java_main_class(argv: &[String]) -> Option<String> {
    let argv = strip_wrappers(argv);
    let program = basename(argv.first()?);

    if SHELLS.contains(&program) {
        let pos = argv.iter().position(|a| a == "-c")?;
        let words = split_words(argv.get(pos + 1)?).ok()?;
        return shell_segments(&words)
            .iter()
            .find_map(|segment| java_main_class(segment));
    }
    if program != "java" {
        return None;
    }

    let jvm = &LAUNCHERS[0];
    let mut i = 1;
    while i < argv.len() {
        let arg = argv[i].as_str();
        if jvm.entry_options.contains(&arg) || jvm.info_options.contains(&arg) {
            return None;
        }
        if arg.starts_with('-') {
            i += if jvm.value_options.contains(&arg) { 2 } else { 1 };
            continue;
        }
        return Some(arg.to_string());
    }
    None
}

/// `>`, `>>`, `2>` and friends, with the target either attached or next
fn is_redirect(word: &str) -> bool {
    let trimmed = word.trim_start_matches(|c: char| c.is_ascii_digit());
    trimmed.starts_with('>') || trimmed.starts_with('<')
}
