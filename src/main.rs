use anyhow::Result;
use clap::{Parser, Subcommand};
use folioval::core::config::AppConfig;
use folioval::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the HTTP service (default)
    Serve,
    /// Value a portfolio file and print the result
    Value {
        /// YAML or JSON file with `holdings` and `currency`
        portfolio: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(cli.config_path.as_deref()),
        Some(Commands::Value { portfolio }) => {
            folioval::run_command(
                folioval::AppCommand::Value {
                    portfolio_path: portfolio,
                },
                cli.config_path.as_deref(),
            )
            .await
        }
        Some(Commands::Serve) | None => {
            folioval::run_command(folioval::AppCommand::Serve, cli.config_path.as_deref()).await
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup(config_path: Option<&str>) -> Result<()> {
    use anyhow::Context;

    let path = match config_path {
        Some(path) => std::path::PathBuf::from(path),
        None => AppConfig::default_config_path()?,
    };

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(&path, AppConfig::default_yaml()?)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
