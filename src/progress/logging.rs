//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{error, info};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started {
                work_dir,
                platform,
                planned,
            } => {
                info!(work_dir = %work_dir, platform = %platform, planned, "Starting build");
            }
            ProgressEvent::ActionSkipped { action } => {
                info!(action = %action, "Skipping action");
            }
            ProgressEvent::ActionStarted { action } => {
                info!(action = %action, "Running action");
            }
            ProgressEvent::ActionComplete { action, duration } => {
                info!(
                    action = %action,
                    duration_ms = duration.as_millis(),
                    "Action complete"
                );
            }
            ProgressEvent::ActionFailed { action, error } => {
                error!(action = %action, error = %error, "Action failed");
            }
            ProgressEvent::Completed {
                executed,
                skipped,
                total_time,
            } => {
                info!(
                    executed,
                    skipped,
                    total_time_ms = total_time.as_millis(),
                    "Build complete"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_logging_all_events() {
        let handler = LoggingHandler;

        let events = vec![
            ProgressEvent::Started {
                work_dir: "/tmp/w".to_string(),
                platform: "linux".to_string(),
                planned: 11,
            },
            ProgressEvent::ActionSkipped {
                action: "gitclone".to_string(),
            },
            ProgressEvent::ActionStarted {
                action: "setup".to_string(),
            },
            ProgressEvent::ActionComplete {
                action: "setup".to_string(),
                duration: Duration::from_millis(10),
            },
            ProgressEvent::ActionFailed {
                action: "tarball".to_string(),
                error: "disk full".to_string(),
            },
            ProgressEvent::Completed {
                executed: 10,
                skipped: 1,
                total_time: Duration::from_secs(5),
            },
        ];

        for event in events {
            handler.on_progress(&event);
        }
    }
}
