use serde::{Deserialize, Serialize};

/// Opaque API key verification settings — the fallback auth path when
/// OAuth is disabled or absent from the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpaqueKeyConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// Slow-hash family used to verify a presented key against its stored
    /// digest, after the fast SHA-256 pre-digest narrows the candidate set.
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
    /// Hard cap on how many active keys are scanned per verification
    /// attempt. Protects against an unbounded linear scan as the tenant's
    /// key count grows; exceeding it only logs a warning, it never errors.
    #[serde(default = "d_scan_cap")]
    pub scan_cap: usize,
}

impl Default for OpaqueKeyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hash_algorithm: HashAlgorithm::Argon2,
            scan_cap: d_scan_cap(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    Argon2,
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Argon2
    }
}

fn d_true() -> bool {
    true
}
fn d_scan_cap() -> usize {
    100
}
