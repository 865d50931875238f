//! Container engine seam and its docker CLI implementation

use super::SandboxError;
use crate::config::RunboxConfig;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Exit status and captured streams of one engine invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl EngineOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    async fn image_exists(&self, tag: &str) -> Result<bool, SandboxError>;

    async fn build_image(&self, tag: &str, dockerfile: &Path, context: &Path) -> Result<(), SandboxError>;

    /// Run the engine with `args`; a non-zero exit is returned, not raised
    async fn run(&self, args: Vec<String>, deadline: Duration) -> Result<EngineOutput, SandboxError>;
}

/// Drives the `docker` binary, optionally through `sudo`
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
    use_sudo: bool,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>, use_sudo: bool) -> Self {
        Self {
            binary: binary.into(),
            use_sudo,
        }
    }

    pub fn from_config(config: &RunboxConfig) -> Self {
        Self::new(config.docker_bin.clone(), config.use_sudo)
    }

    /// Program and leading arguments, before the docker subcommand
    fn program(&self) -> (String, Vec<String>) {
        if self.use_sudo {
            ("sudo".to_string(), vec![self.binary.clone()])
        } else {
            (self.binary.clone(), Vec::new())
        }
    }

    fn describe(&self, args: &[String]) -> String {
        let (program, mut prefix) = self.program();
        prefix.extend(args.iter().take(3).cloned());
        format!("{} {}", program, prefix.join(" "))
    }

    async fn output(&self, args: Vec<String>, deadline: Option<Duration>) -> Result<EngineOutput, SandboxError> {
        let (program, prefix) = self.program();
        let command_line = self.describe(&args);
        debug!(command = %command_line, "Invoking container engine");

        let child = Command::new(&program)
            .args(&prefix)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SandboxError::Spawn {
                program: program.clone(),
                source,
            })?;

        let waited = match deadline {
            Some(deadline) => tokio::time::timeout(deadline, child.wait_with_output())
                .await
                .map_err(|_| SandboxError::DeadlineExceeded {
                    command: command_line.clone(),
                    deadline,
                })?,
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|source| SandboxError::Spawn { program, source })?;

        Ok(EngineOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker", false)
    }
}

#[async_trait]
impl ContainerEngine for DockerCli {
    async fn image_exists(&self, tag: &str) -> Result<bool, SandboxError> {
        let args = vec!["images".to_string(), "-q".to_string(), tag.to_string()];
        let output = self.output(args.clone(), None).await?;
        if !output.success() {
            return Err(SandboxError::CommandFailed {
                command: self.describe(&args),
                code: output.status,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(!output.stdout.trim().is_empty())
    }

    async fn build_image(&self, tag: &str, dockerfile: &Path, context: &Path) -> Result<(), SandboxError> {
        let args = vec![
            "build".to_string(),
            "-t".to_string(),
            tag.to_string(),
            "-f".to_string(),
            dockerfile.display().to_string(),
            context.display().to_string(),
        ];
        let output = self.output(args, None).await?;
        if output.success() {
            return Ok(());
        }

        let message = output
            .stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("docker build failed")
            .trim()
            .to_string();
        Err(SandboxError::ImageBuild {
            tag: tag.to_string(),
            message,
        })
    }

    async fn run(&self, args: Vec<String>, deadline: Duration) -> Result<EngineOutput, SandboxError> {
        self.output(args, Some(deadline)).await
    }
}
