use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Dockerfile toolkit for sandboxed code-runner images
#[derive(Parser, Debug)]
#[command(
    name = "runbox",
    about = "Dockerfile toolkit for sandboxed code-runner images",
    version,
    author,
    long_about = "runbox parses, lints and generates the per-language Dockerfiles used by a \
                  code-execution service, builds their images and runs programs inside them \
                  with time and memory limits."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Print the parsed instruction sequence of a Dockerfile")]
    Parse(ParseArgs),

    #[command(
        about = "Check Dockerfiles for launch and staging mistakes",
        long_about = "Runs every lint rule over the given Dockerfiles. Directories are expanded \
                      to the Dockerfile* files they contain.\n\n\
                      Examples:\n  \
                      runbox lint docker/\n  \
                      runbox lint Dockerfile.java --format json\n  \
                      runbox lint docker/ --deny-warnings"
    )]
    Lint(LintArgs),

    #[command(about = "Rewrite a Dockerfile in canonical form")]
    Fmt(FmtArgs),

    #[command(about = "Render a Dockerfile from a JSON or YAML model")]
    Emit(EmitArgs),

    #[command(
        about = "Generate a Dockerfile for a language",
        long_about = "Generates the sandbox image Dockerfile for a language, or with --standalone \
                      an image that copies, compiles and runs the program itself.\n\n\
                      Examples:\n  \
                      runbox generate java\n  \
                      runbox generate java --standalone --entry Main\n  \
                      runbox generate python -o docker/Dockerfile.python"
    )]
    Generate(GenerateArgs),

    #[command(about = "List supported languages and their images")]
    Languages(FormatArgs),

    #[command(about = "Build the sandbox images that are missing")]
    BuildImages(BuildImagesArgs),

    #[command(
        about = "Run a program inside its language sandbox",
        long_about = "Writes the program into the workspace, ensures the language image exists \
                      and runs it in a throwaway container.\n\n\
                      Examples:\n  \
                      runbox run python hello.py\n  \
                      runbox run java Main.java --stdin input.txt --format json"
    )]
    Run(RunArgs),

    #[command(about = "Show the effective configuration")]
    Config(FormatArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ParseArgs {
    #[arg(value_name = "FILE", help = "Dockerfile to parse")]
    pub file: PathBuf,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct LintArgs {
    #[arg(value_name = "PATH", required = true, help = "Dockerfiles or directories")]
    pub paths: Vec<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,

    #[arg(long, help = "Exit with failure on warnings too")]
    pub deny_warnings: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct FmtArgs {
    #[arg(value_name = "FILE", help = "Dockerfile to format")]
    pub file: PathBuf,

    #[arg(long, help = "Only check whether the file is already canonical")]
    pub check: bool,

    #[arg(short = 'o', long, value_name = "FILE", help = "Write output to file instead of stdout")]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct EmitArgs {
    #[arg(value_name = "MODEL", help = "Dockerfile model as .json, .yaml or .yml")]
    pub model: PathBuf,

    #[arg(short = 'o', long, value_name = "FILE", help = "Write output to file instead of stdout")]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(value_name = "LANG", help = "Language name, e.g. java, python, c++")]
    pub language: String,

    #[arg(long, help = "Copy, compile and run the program inside the image")]
    pub standalone: bool,

    #[arg(
        long,
        value_name = "NAME",
        requires = "standalone",
        help = "Entry class or artifact name (defaults to Main for Java, main otherwise)"
    )]
    pub entry: Option<String>,

    #[arg(long, value_name = "DIR", help = "Working directory inside the image")]
    pub workdir: Option<String>,

    #[arg(short = 'o', long, value_name = "FILE", help = "Write output to file instead of stdout")]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct FormatArgs {
    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct BuildImagesArgs {
    #[arg(value_name = "LANG", help = "Languages to build (omit for all)")]
    pub languages: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[arg(value_name = "LANG", help = "Language of the program")]
    pub language: String,

    #[arg(value_name = "SOURCE", help = "Program source file")]
    pub source: PathBuf,

    #[arg(long, value_name = "FILE", help = "File fed to the program's standard input")]
    pub stdin: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,

    #[arg(long, value_name = "SECONDS", help = "Override the execution time limit")]
    pub timeout: Option<u64>,

    #[arg(long, value_name = "SIZE", help = "Override the memory limit, e.g. 256m")]
    pub memory: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
