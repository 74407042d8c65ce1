use serde::{Deserialize, Serialize};

/// Tenant isolation enforcement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    /// When true, every key-value and memory operation has its tenant
    /// prefix checked against the ambient request context before the
    /// operation is allowed to proceed.
    #[serde(default = "d_true")]
    pub strict_isolation: bool,
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            strict_isolation: true,
        }
    }
}

fn d_true() -> bool {
    true
}
