//! Command-line argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate images from the command line.
#[derive(Parser, Debug)]
#[command(name = "drawplus")]
#[command(about = "Rate-limited AI image generation with API key rotation")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, env = "DRAWPLUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Caller identity used for rate limiting
    #[arg(long, global = true, default_value = "cli")]
    pub caller: String,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate an image with OpenRouter
    Generate {
        /// Description of the image
        prompt: String,

        /// Reference image to edit (repeatable)
        #[arg(short, long = "image")]
        images: Vec<PathBuf>,

        /// OpenRouter API key, used when the configuration has none
        #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Generate an image with SiliconFlow
    Siliconflow {
        /// Description of the image
        prompt: String,

        /// Sampling seed; random when omitted
        #[arg(long)]
        seed: Option<u64>,

        /// SiliconFlow API key, used when the configuration has none
        #[arg(long, env = "SILICONFLOW_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },
}
