//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while the pipeline runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Pipeline started
    Started {
        work_dir: String,
        platform: String,
        planned: usize,
    },

    /// Action deselected by `--skip`/`--do`
    ActionSkipped { action: String },

    ActionStarted { action: String },

    ActionComplete { action: String, duration: Duration },

    /// Action failed; the pipeline stops here
    ActionFailed { action: String, error: String },

    /// Every planned action ran or was skipped
    Completed {
        executed: usize,
        skipped: usize,
        total_time: Duration,
    },
}

/// Trait for handling progress events during a build
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
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
        NoOpHandler.on_progress(&ProgressEvent::ActionSkipped {
            action: "gitclone".to_string(),
        });
    }

    #[test]
    fn test_progress_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler {
            count: count.clone(),
        };

        handler.on_progress(&ProgressEvent::Started {
            work_dir: "/tmp/w".to_string(),
            platform: "linux".to_string(),
            planned: 10,
        });
        handler.on_progress(&ProgressEvent::ActionStarted {
            action: "gitclone".to_string(),
        });
        handler.on_progress(&ProgressEvent::Completed {
            executed: 9,
            skipped: 1,
            total_time: Duration::from_secs(5),
        });

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_event_debug() {
        let event = ProgressEvent::ActionSkipped {
            action: "codesign".to_string(),
        };
        let debug_str = format!("{:?}", event);
        assert!(debug_str.contains("ActionSkipped"));
        assert!(debug_str.contains("codesign"));
    }
}
