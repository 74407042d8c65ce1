use clap::Parser;
use rag_domain::config::ConfigSeverity;
use rag_gateway::cli::{self, Cli, Command, ConfigCommand};
use rag_gateway::{build, router};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,rag_gateway=debug")))
        .json()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => {
            init_tracing();
            let (config, _path) = cli::load_config()?;
            run_server(config).await
        }
        Some(Command::Doctor) => {
            let (config, path) = cli::load_config()?;
            let ok = rag_gateway::doctor::run(&config, &path).await?;
            if !ok {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, _path) = cli::load_config()?;
            cli::run_config_validate(&config);
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _path) = cli::load_config()?;
            cli::run_config_show(&config)
        }
    }
}

async fn run_server(config: rag_domain::config::Config) -> anyhow::Result<()> {
    let issues = config.validate();
    let mut fatal = false;
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!(field = %issue.field, message = %issue.message, "config warning"),
            ConfigSeverity::Error => {
                tracing::error!(field = %issue.field, message = %issue.message, "config error");
                fatal = true;
            }
        }
    }
    if fatal {
        anyhow::bail!("refusing to start with invalid config");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = build::build_state(config).await?;
    let app = router::build(state);

    tracing::info!(%addr, "rag-gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
