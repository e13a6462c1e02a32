//! Build progress events.
//!
//! Progress is purely observational: events give live feedback to UIs while
//! a build runs, and losing them never affects the build's outcome.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Severity of a progress event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressLevel {
    Info,
    Warn,
    Error,
}

/// An immutable progress record emitted at a phase boundary of a build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Job the event belongs to.
    pub job_id: String,
    /// Human-readable progress message.
    pub message: String,
    /// Severity level.
    pub level: ProgressLevel,
}

/// Handle for emitting progress events.
///
/// Cheaply cloneable and shareable across tasks. Emission is fire-and-forget:
/// with no subscribers attached the event is dropped, and a lagging
/// subscriber only loses its own backlog. Per job, events are delivered in
/// emission order.
#[derive(Clone)]
pub struct ProgressHandle {
    tx: broadcast::Sender<ProgressEvent>,
}

impl ProgressHandle {
    /// Create a new handle with the given subscriber buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to progress events. Each receiver sees every event emitted
    /// after the point of subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Emit an info-level event.
    pub fn info(&self, job_id: &str, message: impl Into<String>) {
        self.emit(job_id, message, ProgressLevel::Info);
    }

    /// Emit a warn-level event.
    pub fn warn(&self, job_id: &str, message: impl Into<String>) {
        self.emit(job_id, message, ProgressLevel::Warn);
    }

    /// Emit an error-level event.
    pub fn error(&self, job_id: &str, message: impl Into<String>) {
        self.emit(job_id, message, ProgressLevel::Error);
    }

    /// Emit a progress event. Never blocks and never fails the caller.
    pub fn emit(&self, job_id: &str, message: impl Into<String>, level: ProgressLevel) {
        let event = ProgressEvent {
            job_id: job_id.to_string(),
            message: message.into(),
            level,
        };
        // send() errors only when there are no receivers, which is fine.
        let _ = self.tx.send(event);
    }
}

impl Default for ProgressHandle {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let handle = ProgressHandle::new(16);
        let mut rx = handle.subscribe();

        handle.info("job-1", "creating workspace");
        handle.warn("job-1", "retrying with safe-url proxy");
        handle.error("job-1", "error: builder exploded");

        let first = rx.recv().await.unwrap();
        assert_eq!(first.message, "creating workspace");
        assert_eq!(first.level, ProgressLevel::Info);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.level, ProgressLevel::Warn);

        let third = rx.recv().await.unwrap();
        assert_eq!(third.level, ProgressLevel::Error);
        assert_eq!(third.job_id, "job-1");
    }

    #[test]
    fn test_emit_without_subscribers_is_harmless() {
        let handle = ProgressHandle::new(4);
        handle.info("job-1", "nobody is listening");
    }

    #[tokio::test]
    async fn test_multiple_subscribers_see_same_events() {
        let handle = ProgressHandle::new(16);
        let mut a = handle.subscribe();
        let mut b = handle.subscribe();

        handle.info("job-2", "invoking builder");

        assert_eq!(a.recv().await.unwrap().message, "invoking builder");
        assert_eq!(b.recv().await.unwrap().message, "invoking builder");
    }

    #[test]
    fn test_event_serialization() {
        let event = ProgressEvent {
            job_id: "job-3".to_string(),
            message: "assembling archive".to_string(),
            level: ProgressLevel::Info,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""level":"info""#));

        let parsed: ProgressEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
