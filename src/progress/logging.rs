//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::PrebuildStarted { total } => {
                info!(images = total, "Preparing sandbox images");
            }
            ProgressEvent::ImageBuildStarted {
                language,
                tag,
                index,
                total,
            } => {
                info!(
                    language = %language,
                    tag = %tag,
                    progress = format!("{}/{}", index, total),
                    "Building image"
                );
            }
            ProgressEvent::ImageReady {
                language,
                tag,
                index,
                total,
                built,
                duration,
            } => {
                if *built {
                    info!(
                        language = %language,
                        tag = %tag,
                        progress = format!("{}/{}", index, total),
                        duration_ms = duration.as_millis(),
                        "Image built"
                    );
                } else {
                    debug!(language = %language, tag = %tag, "Image already present");
                }
            }
            ProgressEvent::ImageBuildFailed {
                language,
                tag,
                error,
            } => {
                warn!(language = %language, tag = %tag, error = %error, "Image build failed");
            }
            ProgressEvent::PrebuildComplete {
                built,
                cached,
                failed,
                total_time,
            } => {
                if *failed > 0 {
                    warn!(built, cached, failed, "Image preparation finished with failures");
                } else {
                    info!(
                        built,
                        cached,
                        total_time_ms = total_time.as_millis(),
                        "Image preparation complete"
                    );
                }
            }
            ProgressEvent::ExecutionStarted {
                language,
                container,
            } => {
                debug!(language = %language, container = %container, "Starting container");
            }
            ProgressEvent::ExecutionComplete {
                language,
                container,
                duration,
                killed,
            } => {
                if *killed {
                    warn!(
                        language = %language,
                        container = %container,
                        duration_ms = duration.as_millis(),
                        "Execution killed"
                    );
                } else {
                    info!(
                        language = %language,
                        container = %container,
                        duration_ms = duration.as_millis(),
                        "Execution finished"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Language;
    use std::time::Duration;

    #[test]
    fn test_logging_all_events() {
        let handler = LoggingHandler;

        let events = vec![
            ProgressEvent::PrebuildStarted { total: 2 },
            ProgressEvent::ImageBuildStarted {
                language: Language::Java,
                tag: "java_image".to_string(),
                index: 1,
                total: 2,
            },
            ProgressEvent::ImageReady {
                language: Language::Java,
                tag: "java_image".to_string(),
                index: 1,
                total: 2,
                built: true,
                duration: Duration::from_secs(12),
            },
            ProgressEvent::ImageReady {
                language: Language::C,
                tag: "c_image".to_string(),
                index: 2,
                total: 2,
                built: false,
                duration: Duration::from_millis(3),
            },
            ProgressEvent::ImageBuildFailed {
                language: Language::Swift,
                tag: "swift_image".to_string(),
                error: "pull access denied".to_string(),
            },
            ProgressEvent::PrebuildComplete {
                built: 1,
                cached: 1,
                failed: 1,
                total_time: Duration::from_secs(13),
            },
            ProgressEvent::ExecutionStarted {
                language: Language::Python,
                container: "temp_python_x".to_string(),
            },
            ProgressEvent::ExecutionComplete {
                language: Language::Python,
                container: "temp_python_x".to_string(),
                duration: Duration::from_millis(800),
                killed: true,
            },
        ];

        for event in events {
            handler.on_progress(&event);
        }
    }
}
