use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ah_gateway::bootstrap;
use ah_gateway::cli::{self, Cli, Command, ConfigCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, config_path) = cli::load_config()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            init_tracing(&config.logging);
            run_server(config).await
        }
        Command::Doctor => {
            let ok = ah_gateway::cli::doctor::run(&config, &config_path).await?;
            std::process::exit(if ok { 0 } else { 1 });
        }
        Command::Config(ConfigCommand::Validate) => {
            let ok = ah_gateway::cli::config::validate(&config, &config_path);
            std::process::exit(if ok { 0 } else { 1 });
        }
        Command::Config(ConfigCommand::Show) => {
            ah_gateway::cli::config::show(&config);
            Ok(())
        }
        Command::Run { message, session, model, json } => {
            init_tracing(&config.logging);
            ah_gateway::cli::run::run(config, message, session, model, json).await
        }
        Command::Version => {
            println!("agentharness {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing(logging: &ah_domain::config::LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn run_server(config: ah_domain::config::Config) -> anyhow::Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;

    let run_log_dir = PathBuf::from("./runs");
    let state = bootstrap::build_app_state(config, run_log_dir).await?;

    let app = ah_gateway::api::router(state);

    let addr = format!("{host}:{port}");
    tracing::info!(%addr, "starting agent-harness gateway");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
