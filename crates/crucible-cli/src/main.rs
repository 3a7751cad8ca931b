use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "crucible")]
#[command(about = "Crucible - Multi-persona incident interview simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interview session on the console
    Run {
        /// Scenario id to load
        #[arg(long, default_value = "devops-redis-latency")]
        scenario: String,
        /// Candidate display name
        #[arg(long)]
        candidate: Option<String>,
        /// Directory holding scenario TOML files
        #[arg(long, default_value = "scenarios")]
        scenarios_dir: PathBuf,
        /// Optional session config TOML file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory for the session artifacts
        #[arg(long, default_value = "interview_data")]
        output: PathBuf,
    },
    /// List loadable scenarios
    Scenarios {
        /// Directory holding scenario TOML files
        #[arg(long, default_value = "scenarios")]
        scenarios_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scenario,
            candidate,
            scenarios_dir,
            config,
            output,
        } => commands::run::execute(scenario, candidate, scenarios_dir, config, output).await?,
        Commands::Scenarios { scenarios_dir } => commands::scenarios::execute(scenarios_dir)?,
    }

    Ok(())
}
