//! Terminal progress bar for image preparation

use super::{ProgressEvent, ProgressHandler};
use indicatif::{ProgressBar, ProgressStyle};

pub struct BarHandler {
    bar: ProgressBar,
}

impl BarHandler {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}") {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Default for BarHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressHandler for BarHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::PrebuildStarted { total } => {
                self.bar.set_length(*total as u64);
                self.bar.set_message("checking images");
            }
            ProgressEvent::ImageBuildStarted { tag, .. } => {
                self.bar.set_message(format!("{}...", tag));
            }
            ProgressEvent::ImageReady { tag, built, .. } => {
                let state = if *built { "built" } else { "present" };
                self.bar.set_message(format!("{} {}", tag, state));
                self.bar.inc(1);
            }
            ProgressEvent::ImageBuildFailed { tag, error, .. } => {
                self.bar.println(format!("\u{2717} {}: {}", tag, error));
                self.bar.inc(1);
            }
            ProgressEvent::PrebuildComplete {
                built,
                cached,
                failed,
                ..
            } => {
                self.bar.finish_with_message(format!(
                    "{} built, {} present, {} failed",
                    built, cached, failed
                ));
            }
            ProgressEvent::ExecutionStarted { .. } | ProgressEvent::ExecutionComplete { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Language;
    use std::time::Duration;

    #[test]
    fn test_bar_counts_finished_images() {
        let handler = BarHandler::hidden();
        handler.on_progress(&ProgressEvent::PrebuildStarted { total: 2 });
        handler.on_progress(&ProgressEvent::ImageReady {
            language: Language::C,
            tag: "c_image".to_string(),
            index: 1,
            total: 2,
            built: false,
            duration: Duration::from_millis(4),
        });
        handler.on_progress(&ProgressEvent::ImageBuildFailed {
            language: Language::Go,
            tag: "go_image".to_string(),
            error: "network unreachable".to_string(),
        });
        assert_eq!(handler.position(), 2);
    }
}
