// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file parsing for the overlay manager.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::DEFAULT_SPECIAL_PATH;

#[cfg(test)]
#[path = "./config_test.rs"]
mod config_test;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "VENV_OVERLAY_CONFIG";

/// Environment variable disabling `PYTHONPATH` updates when truthy.
pub const NO_PYTHONPATH_ENV_VAR: &str = "VENV_OVERLAY_NO_PYTHONPATH";

/// Name of the configuration file inside the user config directory.
const CONFIG_FILENAME: &str = "venv-overlay/config.yaml";

/// API version for configuration files.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
pub enum ConfigApiVersion {
    #[default]
    #[serde(rename = "venv-overlay/v0")]
    V0,
}

/// Helper for two-stage deserialization to determine API version first.
#[derive(Deserialize)]
struct ApiVersionMapping {
    #[serde(default)]
    api: ConfigApiVersion,
}

/// What to do when an overlay is requested while another one is applied.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReentrancyPolicy {
    /// Fail the request and leave the current overlay in place.
    #[default]
    Reject,
    /// Deactivate the current overlay, then apply the new one.
    Replace,
}

/// Overlay manager configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct OverlayConfig {
    /// API version identifier.
    #[serde(default)]
    pub api: ConfigApiVersion,

    /// Whether activation exports the new search path entries through
    /// `PYTHONPATH` for child interpreters.
    #[serde(default = "default_update_pythonpath")]
    pub update_pythonpath: bool,

    /// Behavior of a second activation.
    #[serde(default)]
    pub reentrancy: ReentrancyPolicy,

    /// Host-injected search path entry kept across synchronization.
    #[serde(default = "default_special_path")]
    pub special_path: String,

    /// Path to the file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

fn default_update_pythonpath() -> bool {
    true
}

fn default_special_path() -> String {
    DEFAULT_SPECIAL_PATH.to_string()
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            api: ConfigApiVersion::default(),
            update_pythonpath: default_update_pythonpath(),
            reentrancy: ReentrancyPolicy::default(),
            special_path: default_special_path(),
            source_path: None,
        }
    }
}

impl OverlayConfig {
    /// Parse configuration from YAML string.
    pub fn from_yaml<S: Into<String>>(yaml: S) -> crate::Result<Self> {
        let yaml = yaml.into();

        // Stage 1: Parse to get API version
        let value: serde_yaml::Value =
            serde_yaml::from_str(&yaml).map_err(|e| crate::Error::InvalidYaml {
                error: e,
                yaml_content: yaml.clone(),
            })?;

        // An empty document is a valid, all-defaults configuration.
        if value.is_null() {
            return Ok(Self::default());
        }

        let with_version: ApiVersionMapping =
            serde_yaml::from_value(value.clone()).map_err(|e| crate::Error::InvalidYaml {
                error: e,
                yaml_content: yaml.clone(),
            })?;

        // Stage 2: Deserialize based on version
        match with_version.api {
            ConfigApiVersion::V0 => {
                serde_yaml::from_value(value).map_err(|e| crate::Error::InvalidYaml {
                    error: e,
                    yaml_content: yaml,
                })
            }
        }
    }

    /// Load configuration from file path.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;

        let mut config = Self::from_yaml(yaml)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Locate and load the configuration for this process.
    ///
    /// An explicit path must exist. Otherwise `$VENV_OVERLAY_CONFIG` is
    /// consulted, then the user config directory; a missing default file
    /// yields the default configuration. Environment overrides are applied
    /// last.
    pub fn discover(explicit: Option<&Path>) -> crate::Result<Self> {
        let from_env = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);

        let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::load(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::load(path)?,
                _ => Self::default(),
            },
        };

        if std::env::var(NO_PYTHONPATH_ENV_VAR)
            .ok()
            .is_some_and(|v| is_truthy(&v))
        {
            config.update_pythonpath = false;
        }

        tracing::debug!(source = ?config.source_path, "loaded overlay configuration");
        Ok(config)
    }
}

/// Default configuration file location in the user config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

fn is_truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "yes" | "on")
}
