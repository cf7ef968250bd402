//! Command-line interface for the drawplus binary.

mod commands;
mod generate;

pub use commands::{Cli, Commands};
pub use generate::{handle_generate_command, handle_siliconflow_command, load_config};
