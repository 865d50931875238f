//! Configuration management for runbox
//!
//! Settings are loaded from environment variables with sensible defaults.
//!
//! # Environment Variables
//!
//! - `RUNBOX_DOCKER_BIN`: Docker CLI binary - default: "docker"
//! - `RUNBOX_USE_SUDO`: Prefix docker invocations with sudo (true|false) - default: "false"
//! - `RUNBOX_DOCKERFILE_DIR`: Directory holding `Dockerfile.<lang>` files - default: "docker"
//! - `RUNBOX_WORKSPACE`: Host directory mounted into sandbox containers - default: system temp dir + "runbox-workspace"
//! - `RUNBOX_CONTAINER_WORKDIR`: Mount point inside the container - default: "/usr/src/app"
//! - `RUNBOX_MEMORY_LIMIT`: Container memory and memory+swap limit - default: "512m"
//! - `RUNBOX_TIMEOUT_SECS`: Per-step execution time limit - default: "30"
//! - `RUNBOX_LOG_LEVEL`: Logging level - default: "info"
//! - `RUNBOX_LOG_JSON`: Emit JSON logs (true|false) - default: "false"
//!
//! # Example
//!
//! ```
//! use runbox::RunboxConfig;
//!
//! let config = RunboxConfig::default();
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use regex::Regex;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_DOCKER_BIN: &str = "docker";
const DEFAULT_USE_SUDO: bool = false;
const DEFAULT_DOCKERFILE_DIR: &str = "docker";
const DEFAULT_WORKSPACE_DIR: &str = "runbox-workspace";
const DEFAULT_CONTAINER_WORKDIR: &str = "/usr/src/app";
const DEFAULT_MEMORY_LIMIT: &str = "512m";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Slack given to docker on top of the in-container time limit
const ENGINE_GRACE_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

#[derive(Debug, Clone)]
pub struct RunboxConfig {
    pub docker_bin: String,

    pub use_sudo: bool,

    /// Where prebuilt `Dockerfile.<lang>` files are looked up
    pub dockerfile_dir: PathBuf,

    /// Host directory bind-mounted into every sandbox container
    pub workspace: PathBuf,

    pub container_workdir: String,

    /// Docker memory limit, also used as the memory+swap limit
    pub memory_limit: String,

    pub timeout_secs: u64,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    pub log_json: bool,
}

fn env_bool(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|v| match v.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

fn memory_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+[bkmg]?$").expect("valid regex"))
}

impl Default for RunboxConfig {
    /// Loads configuration from RUNBOX_* environment variables, falling back to defaults
    fn default() -> Self {
        let docker_bin =
            env::var("RUNBOX_DOCKER_BIN").unwrap_or_else(|_| DEFAULT_DOCKER_BIN.to_string());

        let use_sudo = env_bool("RUNBOX_USE_SUDO").unwrap_or(DEFAULT_USE_SUDO);

        let dockerfile_dir = env::var("RUNBOX_DOCKERFILE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DOCKERFILE_DIR));

        let workspace = env::var("RUNBOX_WORKSPACE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join(DEFAULT_WORKSPACE_DIR));

        let container_workdir = env::var("RUNBOX_CONTAINER_WORKDIR")
            .unwrap_or_else(|_| DEFAULT_CONTAINER_WORKDIR.to_string());

        let memory_limit = env::var("RUNBOX_MEMORY_LIMIT")
            .unwrap_or_else(|_| DEFAULT_MEMORY_LIMIT.to_string())
            .to_lowercase();

        let timeout_secs = env::var("RUNBOX_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let log_level = env::var("RUNBOX_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let log_json = env_bool("RUNBOX_LOG_JSON").unwrap_or(false);

        Self {
            docker_bin,
            use_sudo,
            dockerfile_dir,
            workspace,
            container_workdir,
            memory_limit,
            timeout_secs,
            log_level,
            log_json,
        }
    }
}

impl RunboxConfig {
    /// Validates the configuration
    ///
    /// Checks that:
    /// - The timeout is between 1 second and 10 minutes
    /// - The memory limit is a docker size such as `512m`
    /// - The container working directory is absolute
    /// - The log level is valid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Timeout must be at least 1 second".to_string(),
            ));
        }
        if self.timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        if !memory_regex().is_match(&self.memory_limit) {
            return Err(ConfigError::ParseError {
                field: "memory_limit".to_string(),
                error: format!(
                    "'{}' is not a size like 512m or 2g",
                    self.memory_limit
                ),
            });
        }

        if !self.container_workdir.starts_with('/') {
            return Err(ConfigError::ValidationFailed(format!(
                "Container workdir must be absolute: {}",
                self.container_workdir
            )));
        }

        if self.docker_bin.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Docker binary cannot be empty".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Upper bound on a whole `docker run`, covering container startup
    pub fn engine_deadline(&self) -> Duration {
        Duration::from_secs(self.timeout_secs + ENGINE_GRACE_SECS)
    }

    pub fn to_display_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();

        map.insert("docker_bin".to_string(), self.docker_bin.clone());
        map.insert("use_sudo".to_string(), self.use_sudo.to_string());
        map.insert(
            "dockerfile_dir".to_string(),
            self.dockerfile_dir.display().to_string(),
        );
        map.insert("workspace".to_string(), self.workspace.display().to_string());
        map.insert(
            "container_workdir".to_string(),
            self.container_workdir.clone(),
        );
        map.insert("memory_limit".to_string(), self.memory_limit.clone());
        map.insert("timeout_secs".to_string(), self.timeout_secs.to_string());
        map.insert("log_level".to_string(), self.log_level.clone());
        map.insert("log_json".to_string(), self.log_json.to_string());

        map
    }
}

impl fmt::Display for RunboxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Runbox Configuration:")?;
        writeln!(f, "  Docker Binary: {}", self.docker_bin)?;
        writeln!(f, "  Use Sudo: {}", self.use_sudo)?;
        writeln!(f, "  Dockerfile Dir: {}", self.dockerfile_dir.display())?;
        writeln!(f, "  Workspace: {}", self.workspace.display())?;
        writeln!(f, "  Container Workdir: {}", self.container_workdir)?;
        writeln!(f, "  Memory Limit: {}", self.memory_limit)?;
        writeln!(f, "  Timeout: {}s", self.timeout_secs)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        writeln!(f, "  JSON Logs: {}", self.log_json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    fn sample() -> RunboxConfig {
        RunboxConfig {
            docker_bin: "docker".to_string(),
            use_sudo: false,
            dockerfile_dir: PathBuf::from("docker"),
            workspace: PathBuf::from("/tmp/runbox"),
            container_workdir: "/usr/src/app".to_string(),
            memory_limit: "512m".to_string(),
            timeout_secs: 30,
            log_level: "info".to_string(),
            log_json: false,
        }
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = vec![
            EnvGuard::unset("RUNBOX_DOCKER_BIN"),
            EnvGuard::unset("RUNBOX_USE_SUDO"),
            EnvGuard::unset("RUNBOX_WORKSPACE"),
            EnvGuard::unset("RUNBOX_MEMORY_LIMIT"),
            EnvGuard::unset("RUNBOX_TIMEOUT_SECS"),
            EnvGuard::unset("RUNBOX_LOG_LEVEL"),
        ];

        let config = RunboxConfig::default();

        assert_eq!(config.docker_bin, DEFAULT_DOCKER_BIN);
        assert!(!config.use_sudo);
        assert_eq!(config.workspace, env::temp_dir().join(DEFAULT_WORKSPACE_DIR));
        assert_eq!(config.memory_limit, DEFAULT_MEMORY_LIMIT);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _guards = vec![
            EnvGuard::set("RUNBOX_DOCKER_BIN", "podman"),
            EnvGuard::set("RUNBOX_USE_SUDO", "yes"),
            EnvGuard::set("RUNBOX_MEMORY_LIMIT", "1G"),
            EnvGuard::set("RUNBOX_TIMEOUT_SECS", "5"),
            EnvGuard::set("RUNBOX_LOG_LEVEL", "DEBUG"),
            EnvGuard::set("RUNBOX_WORKSPACE", "/var/lib/runbox"),
        ];

        let config = RunboxConfig::default();

        assert_eq!(config.docker_bin, "podman");
        assert!(config.use_sudo);
        assert_eq!(config.memory_limit, "1g");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.workspace, PathBuf::from("/var/lib/runbox"));
    }

    #[test]
    #[serial]
    fn test_unparseable_values_fall_back() {
        let _guards = vec![
            EnvGuard::set("RUNBOX_TIMEOUT_SECS", "soon"),
            EnvGuard::set("RUNBOX_USE_SUDO", "maybe"),
        ];

        let config = RunboxConfig::default();
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(!config.use_sudo);
    }

    #[test]
    fn test_validation_timeout_bounds() {
        let mut config = sample();
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
        config.timeout_secs = 601;
        assert!(config.validate().is_err());
        config.timeout_secs = 600;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_memory_limit() {
        let mut config = sample();
        config.memory_limit = "lots".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("memory_limit"));

        config.memory_limit = "2048".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_relative_workdir() {
        let mut config = sample();
        config.container_workdir = "app".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = sample();
        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deadlines() {
        let config = sample();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.engine_deadline(), Duration::from_secs(90));
    }

    #[test]
    fn test_config_display() {
        let config = sample();
        let display = format!("{}", config);
        assert!(display.contains("Runbox Configuration:"));
        assert!(display.contains("Memory Limit: 512m"));
        assert_eq!(config.to_display_map()["timeout_secs"], "30");
    }
}
