use serde::{Deserialize, Serialize};

/// Audit sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// Bound on the in-process queue between the request path and the
    /// background drain task. A full queue drops the oldest event and
    /// logs a warning rather than blocking the caller.
    #[serde(default = "d_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_capacity: d_queue_capacity(),
        }
    }
}

fn d_true() -> bool {
    true
}
fn d_queue_capacity() -> usize {
    10_000
}
