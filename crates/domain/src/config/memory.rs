use serde::{Deserialize, Serialize};

/// Primary semantic-memory service connection, and the backoff schedule
/// used when it degrades and writes fall back to the key-value store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "d_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
    /// Milliseconds, so the first retry can honor a sub-second step.
    #[serde(default = "d_backoff")]
    pub backoff_schedule_ms: Vec<u64>,
    /// Fallback entries are kept at most this long before the next drain
    /// attempt considers them stale and drops them with a warning.
    #[serde(default = "d_fallback_ttl")]
    pub fallback_ttl_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            base_url: d_url(),
            api_key: None,
            timeout_ms: d_timeout_ms(),
            backoff_schedule_ms: d_backoff(),
            fallback_ttl_secs: d_fallback_ttl(),
        }
    }
}

fn d_url() -> String {
    "http://localhost:5000".into()
}
fn d_timeout_ms() -> u64 {
    8000
}
fn d_backoff() -> Vec<u64> {
    vec![500, 1000, 2000, 4000]
}
fn d_fallback_ttl() -> u64 {
    86_400
}
