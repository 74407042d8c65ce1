use crate::event::AuditEvent;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Best-effort, non-blocking audit emission. `record` must never make the
/// caller wait on the underlying persistence layer — that layer (a
/// relational store, typically) is external to this workspace.
#[async_trait]
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Production sink: pushes onto an unbounded channel drained by a
/// background task, mirroring the diagnostic `TraceEvent::emit()` pattern
/// but for the audit trail. A full backing store or a dropped receiver
/// degrades to a logged error, never a blocked request.
pub struct ChannelAuditSink {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl ChannelAuditSink {
    /// Spawns the background drain task and returns the sink. `drain` is
    /// called once per event as it comes off the channel; a real
    /// deployment wires this to the relational audit store's insert path.
    pub fn spawn<F>(drain: F) -> Self
    where
        F: Fn(AuditEvent) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEvent>();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                drain(event);
            }
        });
        Self { tx }
    }
}

#[async_trait]
impl AuditSink for ChannelAuditSink {
    fn record(&self, event: AuditEvent) {
        if self.tx.send(event).is_err() {
            tracing::error!("audit channel receiver dropped; event lost");
        }
    }
}

/// Records events in memory for assertion in tests.
#[derive(Default)]
pub struct InMemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}
