mod error;
mod loader;
mod lower;
#[cfg(test)]
mod tests;
pub mod types;
pub mod validation;

pub use error::ConfigError;
pub use loader::{CONFIG_FILE_NAME, ValidatedConfig, config_path, load_config, parse_config};
pub use types::RelaywayConfig;
