use agora_core::{config::AppConfig, AgoraContext};
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
use commands::{
    handle_config_command, handle_entity_command, print_error, ConfigCommands, EntityCommands,
};

#[derive(Parser)]
#[command(name = "agora-cli")]
#[command(about = "Agora CLI - Inspect Agora records through the client cache")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (defaults to $AGORA_CONFIG or config/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Session token sent as a bearer credential
    #[arg(long, global = true, env = "AGORA_TOKEN")]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration Management
    #[command(subcommand)]
    Config(ConfigCommands),

    #[command(flatten)]
    Entity(EntityCommands),
}

fn init_logging(config: &AppConfig) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(level) if level == "debug" || level == "trace" => {
            EnvFilter::new(format!("warn,agora_core={level},cli={level}"))
        }
        Ok(_) => EnvFilter::try_from_env("RUST_LOG")
            .unwrap_or_else(|_| EnvFilter::new("warn,agora_core=debug,cli=debug")),
        Err(_) => EnvFilter::new(format!(
            "warn,agora_core={level},cli={level}",
            level = config.logging.level
        )),
    };

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

fn load_config(path: Option<&str>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config(config_command) => {
            handle_config_command(config_command)?;
        }

        Commands::Entity(command) => {
            let config = load_config(cli.config.as_deref())?;
            init_logging(&config);

            let mut builder = AgoraContext::builder().with_config(config);
            if let Some(token) = cli.token {
                builder = builder.with_token(token);
            }
            let context = builder.build()?;

            if let Err(error) = handle_entity_command(&context, command).await {
                print_error(&error.to_string());
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
