use clap::{Parser, Subcommand};
use rag_domain::config::{Config, ConfigSeverity};

#[derive(Debug, Parser)]
#[command(name = "rag-gateway", version, about = "Multi-tenant tool-invocation gateway")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server (default when no subcommand is given).
    Serve,
    /// Probe dependency health without starting the server.
    Doctor,
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Load the config and print any `ConfigIssue`s found.
    Validate,
    /// Print the effective config as TOML.
    Show,
}

/// Reads the config path from `RAG_CONFIG` (default `./config.toml`); a
/// missing file falls back to `Config::default()` rather than erroring, so
/// `doctor`/`config validate` are useful before a config file exists.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("RAG_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        Config::from_toml_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        Config::default()
    };

    Ok((config, config_path))
}

pub fn run_config_validate(config: &Config) {
    let issues = config.validate();
    if issues.is_empty() {
        println!("config is valid — no issues found");
        return;
    }
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => println!("WARNING [{}]: {}", issue.field, issue.message),
            ConfigSeverity::Error => println!("ERROR   [{}]: {}", issue.field, issue.message),
        }
    }
}

pub fn run_config_show(config: &Config) -> anyhow::Result<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
