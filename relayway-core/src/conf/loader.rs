use crate::conf::ConfigError;
use crate::conf::types::RelaywayConfig;
use crate::conf::validation::validate_config;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "relayway.hcl";

/// A parsed config that passed validation, plus any non-fatal findings.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedConfig {
    pub config: RelaywayConfig,
    pub warnings: Vec<String>,
}

/// `root` may be a config directory containing `relayway.hcl` or the file itself.
pub fn config_path(root: &Path) -> PathBuf {
    if root.is_dir() {
        root.join(CONFIG_FILE_NAME)
    } else {
        root.to_path_buf()
    }
}

/// Parse without semantic validation.
pub fn parse_config(root: &Path) -> Result<RelaywayConfig, ConfigError> {
    let path = config_path(root);
    let s = fs::read_to_string(&path).map_err(|e| ConfigError::read_file(&path, e))?;
    hcl::from_str(&s).map_err(|e| ConfigError::parse(&path, e))
}

pub fn load_config(root: &Path) -> Result<ValidatedConfig, ConfigError> {
    let config = parse_config(root)?;

    let warnings = validate_config(&config)
        .map_err(|validation_errors| ConfigError::Validation { validation_errors })?;

    Ok(ValidatedConfig { config, warnings })
}
