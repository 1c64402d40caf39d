//! Configuration file loading.

use std::path::Path;

use figment::providers::{Format, Yaml};
use figment::Figment;

use crate::config::types::NodeConfig;
use crate::config::validation::validate_config;
use crate::errors::ConfigError;

/// Load and validate configuration from a YAML file.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The YAML is invalid
/// - Any configuration value fails validation
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<NodeConfig, ConfigError> {
    let path = path.as_ref();
    let config = extract_config(build_figment(path)?, path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Base figment for a config file: serde defaults under the YAML contents.
///
/// A missing file is an error; `kortanad init` writes one.
pub fn build_figment(path: &Path) -> Result<Figment, ConfigError> {
    std::fs::metadata(path).map_err(|e| ConfigError::FileRead {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Figment::new().merge(Yaml::file(path)))
}

/// Extract a `NodeConfig` from a figment without validating it.
pub(crate) fn extract_config(figment: Figment, path: &Path) -> Result<NodeConfig, ConfigError> {
    figment.extract().map_err(|e| ConfigError::Extract {
        path: path.display().to_string(),
        source: Box::new(e),
    })
}

/// Load and validate configuration from a YAML string.
///
/// Useful for testing or when config is provided via other means.
pub fn load_config_from_str(content: &str, source_name: &str) -> Result<NodeConfig, ConfigError> {
    let config: NodeConfig = serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
        path: source_name.to_string(),
        source: e,
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Write the default configuration to `path`.
///
/// An existing file is left alone unless `overwrite` is set. Returns whether
/// a file was written.
pub fn write_default_config<P: AsRef<Path>>(path: P, overwrite: bool) -> Result<bool, ConfigError> {
    let path = path.as_ref();
    if path.exists() && !overwrite {
        return Ok(false);
    }

    let write_error = |source| ConfigError::FileWrite {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }

    let yaml = serde_yaml::to_string(&NodeConfig::default()).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })?;
    std::fs::write(path, yaml).map_err(write_error)?;
    Ok(true)
}
