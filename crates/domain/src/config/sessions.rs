use serde::{Deserialize, Serialize};

/// Session continuity envelope lifetime and cleanup cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default = "d_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "d_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: d_ttl(),
            cleanup_interval_secs: d_cleanup_interval(),
        }
    }
}

fn d_ttl() -> u64 {
    3600
}
fn d_cleanup_interval() -> u64 {
    300
}
