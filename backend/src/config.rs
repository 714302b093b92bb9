use serde::Deserialize;
use shared::RequestSchema;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/churn.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid port override '{0}'")]
    InvalidPort(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub inference_log: Option<InferenceLogConfig>,
    #[serde(default)]
    pub request_schema: RequestSchema,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Forest artifact written by the training job.
    pub artifact: PathBuf,
    /// JSON array of feature names, in training column order.
    pub features: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceLogConfig {
    pub path: PathBuf,
}

/// `CHURN_CONFIG`, falling back to [`DEFAULT_CONFIG_PATH`].
pub fn config_path() -> PathBuf {
    std::env::var("CHURN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

impl AppConfig {
    /// Reads the YAML file, resolves relative paths against its directory and
    /// applies the `HOST` / `PORT` environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut config = Self::from_yaml_str(&config_str, base_dir)?;
        config.apply_overrides(std::env::var("HOST").ok(), std::env::var("PORT").ok())?;
        Ok(config)
    }

    pub fn from_yaml_str(config_str: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: AppConfig = serde_yaml::from_str(config_str)?;
        config.model.artifact = resolve(base_dir, &config.model.artifact);
        config.model.features = resolve(base_dir, &config.model.features);
        if let Some(log) = config.inference_log.as_mut() {
            log.path = resolve(base_dir, &log.path);
        }
        Ok(config)
    }

    pub fn apply_overrides(
        &mut self,
        host: Option<String>,
        port: Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
        }
        Ok(())
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
