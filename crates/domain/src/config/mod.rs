mod audit;
mod kv;
mod logging;
mod memory;
mod oauth;
mod opaque_key;
mod rate_limit;
mod rbac;
mod server;
mod sessions;
mod tenant;

pub use audit::*;
pub use kv::*;
pub use logging::*;
pub use memory::*;
pub use oauth::*;
pub use opaque_key::*;
pub use rate_limit::*;
pub use rbac::*;
pub use server::*;
pub use sessions::*;
pub use tenant::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub opaque_key: OpaqueKeyConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub tenant: TenantConfig,
    #[serde(default)]
    pub rbac: RbacConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub kv: KvConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// An empty vec means everything looks good. A single `Error`-severity
    /// issue is grounds for aborting startup; `Warning` issues are logged
    /// and startup continues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.server.port == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }

        if self.server.host.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }

        if self.server.cors.allowed_origins.iter().any(|o| o == "*") {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                field: "server.cors.allowed_origins".into(),
                message: "wildcard CORS origin allows any site to call this gateway".into(),
            });
        }

        if self.oauth.enabled {
            if self.oauth.issuer.is_empty() {
                issues.push(ConfigIssue {
                    severity: ConfigSeverity::Error,
                    field: "oauth.issuer".into(),
                    message: "issuer must not be empty when oauth is enabled".into(),
                });
            }
            if self.oauth.jwks_url.is_empty() {
                issues.push(ConfigIssue {
                    severity: ConfigSeverity::Error,
                    field: "oauth.jwks_url".into(),
                    message: "jwks_url must not be empty when oauth is enabled".into(),
                });
            } else if !self.oauth.jwks_url.starts_with("http://")
                && !self.oauth.jwks_url.starts_with("https://")
            {
                issues.push(ConfigIssue {
                    severity: ConfigSeverity::Error,
                    field: "oauth.jwks_url".into(),
                    message: "jwks_url must start with http:// or https://".into(),
                });
            }
        }

        if !self.oauth.enabled && !self.opaque_key.enabled {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "oauth.enabled".into(),
                message: "at least one authentication method (oauth or opaque_key) must be enabled".into(),
            });
        }

        if self.opaque_key.scan_cap == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "opaque_key.scan_cap".into(),
                message: "scan_cap must be greater than 0".into(),
            });
        }

        if self.rate_limit.enabled && self.rate_limit.requests_per_window == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "rate_limit.requests_per_window".into(),
                message: "requests_per_window must be greater than 0 when rate limiting is enabled".into(),
            });
        }

        if self.memory.base_url.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "memory.base_url".into(),
                message: "base_url must not be empty".into(),
            });
        } else if !self.memory.base_url.starts_with("http://")
            && !self.memory.base_url.starts_with("https://")
        {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "memory.base_url".into(),
                message: format!(
                    "base_url must start with http:// or https:// (got \"{}\")",
                    self.memory.base_url
                ),
            });
        }

        if self.memory.backoff_schedule_ms.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                field: "memory.backoff_schedule_ms".into(),
                message: "empty backoff schedule; retries will happen with no delay".into(),
            });
        }

        if self.kv.url.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "kv.url".into(),
                message: "url must not be empty".into(),
            });
        }

        if self.sessions.ttl_secs == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "sessions.ttl_secs".into(),
                message: "ttl_secs must be greater than 0".into(),
            });
        }

        issues
    }
}
