use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed with exit code {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("`{command}` did not finish within {deadline:?}")]
    DeadlineExceeded { command: String, deadline: Duration },

    #[error("Failed to build image {tag}: {message}")]
    ImageBuild { tag: String, message: String },

    #[error("Generated Dockerfile for {language} is invalid: {message}")]
    InvalidTemplate { language: String, message: String },

    #[error("Workspace error: {0:#}")]
    Workspace(anyhow::Error),
}
