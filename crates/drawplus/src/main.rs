//! drawplus command-line tool.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, handle_generate_command, handle_siliconflow_command, load_config};
use drawplus::drawplus_core::init_tracing;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    init_tracing("info");

    let cli = Cli::parse();
    info!(config_file = ?cli.config, "Loading configuration");
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate {
            prompt,
            images,
            api_key,
        } => handle_generate_command(config, &cli.caller, &prompt, &images, api_key).await,
        Commands::Siliconflow {
            prompt,
            seed,
            api_key,
        } => handle_siliconflow_command(config, &prompt, seed, api_key).await,
    }
}
