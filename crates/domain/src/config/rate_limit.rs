use serde::{Deserialize, Serialize};

/// Per-tenant sliding-window rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    #[serde(default = "d_limit")]
    pub requests_per_window: u64,
    #[serde(default = "d_window")]
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: d_limit(),
            window_seconds: d_window(),
        }
    }
}

fn d_true() -> bool {
    true
}
fn d_limit() -> u64 {
    1000
}
fn d_window() -> u64 {
    60
}
