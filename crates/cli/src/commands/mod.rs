pub mod config;
pub mod entities;
pub mod utils;

pub use config::{handle_config_command, ConfigCommands};
pub use entities::{handle_entity_command, EntityCommands};
pub use utils::{print_error, CliError, CliResult};
