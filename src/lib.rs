//! runbox - Dockerfile toolkit for sandboxed code-runner images
//!
//! A code-execution service keeps one container image per language and runs
//! every submitted program in a throwaway container built from it. runbox
//! models the Dockerfiles behind those images, checks that they launch what
//! they claim to, generates them from a language catalog and drives docker to
//! build the images and run programs with time and memory limits.
//!
//! # Core Concepts
//!
//! - **Dockerfile model**: an ordered list of instructions, comments and blank
//!   lines that parses from text and emits back in canonical form
//! - **Lint rules**: checks over the model, such as a default command that
//!   starts `java` without a class to run
//! - **Runtimes**: per-language base image, compile and run commands
//! - **Sandbox**: writes source into a mounted workspace, runs it under
//!   `timeout --signal=SIGKILL` and collects the redirected streams
//!
//! # Example Usage
//!
//! ```
//! use runbox::{parse, Validator};
//!
//! let df = parse("FROM openjdk:17\nWORKDIR /usr/src/app\nCMD [\"java\"]\n").unwrap();
//! let report = Validator::default().lint(&df);
//! assert!(report.has_errors());
//! ```
//!
//! # Project Structure
//!
//! - [`dockerfile`]: parsing, the instruction model and emission
//! - [`validation`]: lint rules and reports
//! - [`runtime`]: language catalog and launch-command inspection
//! - [`templates`]: Dockerfile generation
//! - [`sandbox`]: image preparation and program execution

pub mod cli;
pub mod config;
pub mod dockerfile;
pub mod fs;
pub mod progress;
pub mod runtime;
pub mod sandbox;
pub mod templates;
pub mod util;
pub mod validation;

pub use config::{ConfigError, RunboxConfig};
pub use dockerfile::{parse, Dockerfile, Instruction, ParseError};
pub use runtime::{Language, Runtime};
pub use sandbox::{ExecutionOutcome, ExecutionRequest, Sandbox, SandboxError};
pub use templates::{generate, TemplateKind};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};
pub use validation::{Diagnostic, Report, Severity, Validator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
