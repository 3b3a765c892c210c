//! metricgate.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};
use crate::normalize::is_valid_label_name;
use crate::types::METRIC_NAME_LABEL;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP API binds to.
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:9091".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `metricgate.redb`.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/metricgate"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    /// Remote-write endpoint, including the path. Export is off when unset.
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Seconds between export cycles.
    pub interval_secs: u64,
    /// Labels added to every exported series.
    pub external_labels: BTreeMap<String, String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            interval_secs: 60,
            external_labels: BTreeMap::new(),
        }
    }
}

impl ExportConfig {
    pub fn enabled(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

impl GatewayConfig {
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> CoreResult<Self> {
        let config: GatewayConfig =
            toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values serde cannot.
    pub fn validate(&self) -> CoreResult<()> {
        if self.export.interval_secs == 0 {
            return Err(CoreError::Config(
                "export.interval_secs must be greater than zero".to_string(),
            ));
        }
        for name in self.export.external_labels.keys() {
            if name == METRIC_NAME_LABEL || !is_valid_label_name(name) {
                return Err(CoreError::Config(format!(
                    "invalid external label name {name:?}"
                )));
            }
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> CoreResult<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))
    }
}
