//! Progress handler trait and events

use crate::runtime::Language;
use std::time::Duration;

/// Events emitted while preparing images and running sandboxed programs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    PrebuildStarted { total: usize },

    /// An image is missing and is being built
    ImageBuildStarted {
        language: Language,
        tag: String,
        index: usize,
        total: usize,
    },

    /// An image is ready; `built` is false when it already existed
    ImageReady {
        language: Language,
        tag: String,
        index: usize,
        total: usize,
        built: bool,
        duration: Duration,
    },

    ImageBuildFailed {
        language: Language,
        tag: String,
        error: String,
    },

    PrebuildComplete {
        built: usize,
        cached: usize,
        failed: usize,
        total_time: Duration,
    },

    ExecutionStarted { language: Language, container: String },

    ExecutionComplete {
        language: Language,
        container: String,
        duration: Duration,
        killed: bool,
    },
}

pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    impl ProgressHandler for CountingHandler {
        fn on_progress(&self, _event: &ProgressEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_noop_handler() {
        NoOpHandler.on_progress(&ProgressEvent::PrebuildStarted { total: 3 });
    }

    #[test]
    fn test_progress_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler {
            count: count.clone(),
        };

        handler.on_progress(&ProgressEvent::PrebuildStarted { total: 1 });
        handler.on_progress(&ProgressEvent::ImageBuildStarted {
            language: Language::Java,
            tag: "java_image".to_string(),
            index: 1,
            total: 1,
        });
        handler.on_progress(&ProgressEvent::PrebuildComplete {
            built: 1,
            cached: 0,
            failed: 0,
            total_time: Duration::from_secs(5),
        });

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_event_debug() {
        let event = ProgressEvent::ExecutionStarted {
            language: Language::Go,
            container: "temp_go_1".to_string(),
        };
        let debug_str = format!("{:?}", event);
        assert!(debug_str.contains("ExecutionStarted"));
        assert!(debug_str.contains("temp_go_1"));
    }
}
