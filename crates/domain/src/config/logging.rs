use serde::{Deserialize, Serialize};

/// Structured logging configuration, initialized once at startup via
/// `tracing_subscriber`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive string, e.g. `"info,rag_gateway=debug"`.
    #[serde(default = "d_filter")]
    pub filter: String,
    #[serde(default = "d_true")]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: d_filter(),
            json: true,
        }
    }
}

fn d_filter() -> String {
    "info".into()
}
fn d_true() -> bool {
    true
}
