mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pagestream",
    version,
    about = "Windowed page-view delivery pipeline with watermark checkpoints"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a delivery pipeline
    Run {
        /// Path to pipeline YAML file
        pipeline: PathBuf,
        /// Execute a single iteration instead of the full run loop
        #[arg(long)]
        once: bool,
        /// Override the configured wall-clock budget
        #[arg(long)]
        max_run_time_secs: Option<u64>,
    },
    /// Validate pipeline configuration and connectivity
    Check {
        /// Path to pipeline YAML file
        pipeline: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run {
            pipeline,
            once,
            max_run_time_secs,
        } => commands::run::execute(&pipeline, once, max_run_time_secs).await,
        Commands::Check { pipeline } => commands::check::execute(&pipeline).await,
    }
}
