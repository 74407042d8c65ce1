use serde::{Deserialize, Serialize};

/// Authorization policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RbacConfig {
    /// Strict mode denies any tool name absent from the registry. The
    /// alternative (implicit allow for unmapped tools) is never safe
    /// enough to be the default.
    #[serde(default = "d_true")]
    pub strict_mode: bool,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self { strict_mode: true }
    }
}

fn d_true() -> bool {
    true
}
