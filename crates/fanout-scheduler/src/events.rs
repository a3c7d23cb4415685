//! Job lifecycle events.
//!
//! Runs happen on background tasks, so their outcomes are published on a
//! broadcast bus. Each subscriber has an independent buffer; a slow
//! subscriber loses the oldest events rather than blocking a job.

use fanout_types::{JobId, RunStatus, ScheduleJob};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default per-subscriber buffer.
pub const DEFAULT_CAPACITY: usize = 256;

/// Something that happened to a scheduled job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScheduleEvent {
    /// A job was registered.
    JobCreated { job: ScheduleJob },
    /// A run started; `run` is 1-based.
    RunStarted { id: JobId, run: u64 },
    /// A run reached the report stage.
    RunFinished {
        id: JobId,
        run: u64,
        status: RunStatus,
        recipients_paid: usize,
        units_transferred: u64,
        failed_batches: usize,
    },
    /// A run was skipped because the snapshot had no holders.
    RunSkipped { id: JobId, run: u64, reason: String },
    /// A run aborted before submitting anything.
    RunFailed { id: JobId, run: u64, error: String },
    /// A job was stopped.
    JobStopped { id: JobId },
}

impl ScheduleEvent {
    /// The job the event concerns.
    pub fn job_id(&self) -> &JobId {
        match self {
            ScheduleEvent::JobCreated { job } => &job.id,
            ScheduleEvent::RunStarted { id, .. }
            | ScheduleEvent::RunFinished { id, .. }
            | ScheduleEvent::RunSkipped { id, .. }
            | ScheduleEvent::RunFailed { id, .. }
            | ScheduleEvent::JobStopped { id } => id,
        }
    }
}

/// Broadcast bus for [`ScheduleEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ScheduleEvent>,
}

impl EventBus {
    /// Create a bus with the given per-subscriber capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn emit(&self, event: ScheduleEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScheduleEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_and_receive() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.emit(ScheduleEvent::JobStopped {
            id: JobId::from("abc"),
        });

        let event = rx.recv().await.expect("recv");
        assert_eq!(event.job_id().as_str(), "abc");
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::default();
        bus.emit(ScheduleEvent::RunStarted {
            id: JobId::from("abc"),
            run: 1,
        });
        let mut late = bus.subscribe();
        assert!(late.try_recv().is_err());
    }

    #[test]
    fn test_event_serialization() {
        let event = ScheduleEvent::RunSkipped {
            id: JobId::from("abc"),
            run: 2,
            reason: "no holders".into(),
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["event"], "run_skipped");
        assert_eq!(json["id"], "abc");
    }
}
