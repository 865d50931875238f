//! Run untrusted programs inside per-language docker images
//!
//! Every execution writes its source (and optional stdin) into a host
//! workspace that is bind-mounted into a throwaway container. The container
//! compiles and runs the program under `timeout --signal=SIGKILL`, redirecting
//! the streams into files that are read back and then deleted along with any
//! compiler output.

mod engine;
mod error;
mod plan;

pub use engine::{ContainerEngine, DockerCli, EngineOutput};
pub use error::SandboxError;
pub use plan::{ExecutionPlan, ExecutionRequest};

#[cfg(test)]
pub use engine::MockContainerEngine;

use crate::config::RunboxConfig;
use crate::fs::FileSystem;
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::runtime::Language;
use crate::templates::{self, TemplateKind};
use crate::validation::Validator;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Exit status reported when the container's process was SIGKILLed
pub const KILLED_EXIT_CODE: i32 = 137;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    /// Failure of the engine itself rather than of the program
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_error: Option<String>,
    pub killed: bool,
    pub exit_code: Option<i32>,
}

impl ExecutionOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0) && self.server_error.is_none() && !self.killed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrebuildSummary {
    pub built: Vec<Language>,
    pub cached: Vec<Language>,
    pub failed: Vec<(Language, String)>,
}

impl PrebuildSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Sandbox {
    engine: Arc<dyn ContainerEngine>,
    fs: Arc<dyn FileSystem>,
    config: RunboxConfig,
    progress: Option<Arc<dyn ProgressHandler>>,
}

impl Sandbox {
    pub fn new(engine: Arc<dyn ContainerEngine>, fs: Arc<dyn FileSystem>, config: RunboxConfig) -> Self {
        Self {
            engine,
            fs,
            config,
            progress: None,
        }
    }

    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress = Some(handler);
        self
    }

    pub fn config(&self) -> &RunboxConfig {
        &self.config
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress {
            handler.on_progress(&event);
        }
    }

    fn workspace(&self) -> Result<PathBuf, SandboxError> {
        let workspace = &self.config.workspace;
        if workspace.is_absolute() {
            return Ok(workspace.clone());
        }
        // docker only accepts absolute bind-mount sources
        std::env::current_dir()
            .map(|cwd| cwd.join(workspace))
            .map_err(|e| SandboxError::Workspace(anyhow::Error::new(e).context("resolving workspace")))
    }

    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionOutcome, SandboxError> {
        let workspace = self.workspace()?;
        let plan = ExecutionPlan::new(&request, self.config.timeout_secs);
        info!(language = %plan.language, container = %plan.stem, "Executing program");

        self.fs
            .create_dir_all(&workspace)
            .map_err(SandboxError::Workspace)?;

        let result = self.execute_plan(&request, &plan, &workspace).await;
        self.cleanup(&plan, &workspace);
        result
    }

    async fn execute_plan(
        &self,
        request: &ExecutionRequest,
        plan: &ExecutionPlan,
        workspace: &Path,
    ) -> Result<ExecutionOutcome, SandboxError> {
        self.fs
            .write(&workspace.join(&plan.source_file), &request.code)
            .map_err(SandboxError::Workspace)?;
        if let (Some(file), Some(stdin)) = (&plan.input_file, &request.stdin) {
            self.fs
                .write(&workspace.join(file), stdin)
                .map_err(SandboxError::Workspace)?;
        }

        self.ensure_image(plan.language).await?;

        let args = plan.docker_args(workspace, &self.config.container_workdir, &self.config.memory_limit);
        self.emit(ProgressEvent::ExecutionStarted {
            language: plan.language,
            container: plan.stem.clone(),
        });
        let started = Instant::now();
        let run = self.engine.run(args, self.config.engine_deadline()).await;

        let mut outcome = ExecutionOutcome {
            stdout: self.read_workspace_file(workspace, &plan.output_file),
            stderr: self.read_workspace_file(workspace, &plan.error_file),
            ..Default::default()
        };

        match run {
            Ok(output) => {
                outcome.exit_code = output.status;
                outcome.killed = output.status == Some(KILLED_EXIT_CODE);
                // 125-127 come from docker itself, not from the script
                if matches!(output.status, Some(125..=127)) || output.status.is_none() {
                    let message = output.stderr.trim();
                    outcome.server_error = Some(if message.is_empty() {
                        format!("container exited with {:?}", output.status)
                    } else {
                        message.to_string()
                    });
                }
            }
            Err(err) => {
                if matches!(err, SandboxError::DeadlineExceeded { .. }) {
                    outcome.killed = true;
                    self.remove_container(&plan.stem).await;
                }
                outcome.server_error = Some(err.to_string());
            }
        }

        self.emit(ProgressEvent::ExecutionComplete {
            language: plan.language,
            container: plan.stem.clone(),
            duration: started.elapsed(),
            killed: outcome.killed,
        });
        debug!(
            container = %plan.stem,
            exit_code = ?outcome.exit_code,
            killed = outcome.killed,
            "Execution finished"
        );
        Ok(outcome)
    }

    async fn remove_container(&self, name: &str) {
        let args = vec!["rm".to_string(), "-f".to_string(), name.to_string()];
        if let Err(e) = self.engine.run(args, Duration::from_secs(30)).await {
            warn!(container = name, error = %e, "Failed to remove container");
        }
    }

    fn read_workspace_file(&self, workspace: &Path, name: &str) -> Option<String> {
        let path = workspace.join(name);
        if !self.fs.is_file(&path) {
            return None;
        }
        match self.fs.read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to read execution output");
                None
            }
        }
    }

    fn cleanup(&self, plan: &ExecutionPlan, workspace: &Path) {
        for name in plan.workspace_files() {
            let path = workspace.join(&name);
            match self.fs.remove_file(&path) {
                Ok(true) => debug!(file = %path.display(), "Removed"),
                Ok(false) => {}
                Err(e) => warn!(file = %path.display(), error = %e, "Failed to remove workspace file"),
            }
        }
    }

    /// Make sure `<lang>_image` exists; returns whether it had to be built
    pub async fn ensure_image(&self, language: Language) -> Result<bool, SandboxError> {
        let tag = language.image_tag();
        match self.engine.image_exists(&tag).await {
            Ok(true) => {
                debug!(tag = %tag, "Image present");
                return Ok(false);
            }
            Ok(false) => {}
            Err(e) => warn!(tag = %tag, error = %e, "Could not query image; building it"),
        }

        let shipped = self.config.dockerfile_dir.join(language.dockerfile_name());
        if self.fs.is_file(&shipped) {
            self.lint_shipped(&shipped);
            let context = shipped
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            info!(tag = %tag, dockerfile = %shipped.display(), "Building image");
            self.engine.build_image(&tag, &shipped, &context).await?;
            return Ok(true);
        }

        let workspace = self.workspace()?;
        let generated = templates::generate(language, &TemplateKind::Sandbox, &self.config.container_workdir)
            .map_err(|e| SandboxError::InvalidTemplate {
                language: language.to_string(),
                message: e.to_string(),
            })?;
        Validator::default()
            .validate(&generated)
            .map_err(|e| SandboxError::InvalidTemplate {
                language: language.to_string(),
                message: e.to_string(),
            })?;

        let path = workspace.join(language.dockerfile_name());
        self.fs
            .create_dir_all(&workspace)
            .and_then(|_| self.fs.write(&path, &generated.emit()))
            .map_err(SandboxError::Workspace)?;

        info!(tag = %tag, "Building image from generated Dockerfile");
        let built = self.engine.build_image(&tag, &path, &workspace).await;
        if let Err(e) = self.fs.remove_file(&path) {
            warn!(file = %path.display(), error = %e, "Failed to remove generated Dockerfile");
        }
        built.map(|_| true)
    }

    fn lint_shipped(&self, path: &Path) {
        let text = match self.fs.read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to read Dockerfile");
                return;
            }
        };
        match crate::dockerfile::parse(&text) {
            Ok(dockerfile) => {
                for diagnostic in Validator::default().lint(&dockerfile).diagnostics {
                    warn!(file = %path.display(), "{}", diagnostic);
                }
            }
            Err(e) => warn!(file = %path.display(), error = %e, "Dockerfile does not parse"),
        }
    }

    /// Ensure every image in `languages` exists, continuing past failures
    pub async fn prebuild(&self, languages: &[Language], progress: &dyn ProgressHandler) -> PrebuildSummary {
        let total = languages.len();
        let started = Instant::now();
        let mut summary = PrebuildSummary::default();
        progress.on_progress(&ProgressEvent::PrebuildStarted { total });

        for (i, &language) in languages.iter().enumerate() {
            let index = i + 1;
            let tag = language.image_tag();
            let image_started = Instant::now();
            progress.on_progress(&ProgressEvent::ImageBuildStarted {
                language,
                tag: tag.clone(),
                index,
                total,
            });

            match self.ensure_image(language).await {
                Ok(built) => {
                    progress.on_progress(&ProgressEvent::ImageReady {
                        language,
                        tag,
                        index,
                        total,
                        built,
                        duration: image_started.elapsed(),
                    });
                    if built {
                        summary.built.push(language);
                    } else {
                        summary.cached.push(language);
                    }
                }
                Err(e) => {
                    progress.on_progress(&ProgressEvent::ImageBuildFailed {
                        language,
                        tag,
                        error: e.to_string(),
                    });
                    summary.failed.push((language, e.to_string()));
                }
            }
        }

        progress.on_progress(&ProgressEvent::PrebuildComplete {
            built: summary.built.len(),
            cached: summary.cached.len(),
            failed: summary.failed.len(),
            total_time: started.elapsed(),
        });
        summary
    }
}
