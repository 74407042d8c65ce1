use serde::{Deserialize, Serialize};

/// Fallback key-value store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvConfig {
    #[serde(default = "d_url")]
    pub url: String,
    #[serde(default = "d_pool_size")]
    pub pool_size: u32,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            url: d_url(),
            pool_size: d_pool_size(),
            timeout_ms: d_timeout_ms(),
        }
    }
}

fn d_url() -> String {
    "redis://127.0.0.1:6379".into()
}
fn d_pool_size() -> u32 {
    10
}
fn d_timeout_ms() -> u64 {
    2000
}
