use crate::specialization::DEFAULT_M_CP_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_EDGE_WEIGHT_THRESHOLD: f64 = 0.65;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for econci
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EconCiConfig {
    /// Which table columns play the entity / item / value roles
    #[serde(default)]
    pub columns: ColumnsConfig,

    /// Index computation settings
    #[serde(default)]
    pub complexity: ComplexityConfig,

    /// Product space construction settings
    #[serde(default)]
    pub product_space: ProductSpaceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnsConfig {
    #[serde(default = "default_entity_column")]
    pub entity: String,

    #[serde(default = "default_item_column")]
    pub item: String,

    #[serde(default = "default_value_column")]
    pub value: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            entity: default_entity_column(),
            item: default_item_column(),
            value: default_value_column(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityConfig {
    /// RCA values at or above this become 1 in M_cp
    #[serde(default = "default_m_cp_threshold")]
    pub m_cp_threshold: f64,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            m_cp_threshold: default_m_cp_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSpaceConfig {
    /// Extra edges heavier than this are added on top of the maximum spanning tree
    #[serde(default = "default_edge_weight_threshold")]
    pub edge_weight_threshold: f64,
}

impl Default for ProductSpaceConfig {
    fn default() -> Self {
        Self {
            edge_weight_threshold: default_edge_weight_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: pretty, compact
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_entity_column() -> String {
    "country".to_string()
}
fn default_item_column() -> String {
    "product".to_string()
}
fn default_value_column() -> String {
    "export".to_string()
}
fn default_m_cp_threshold() -> f64 {
    DEFAULT_M_CP_THRESHOLD
}
fn default_edge_weight_threshold() -> f64 {
    DEFAULT_EDGE_WEIGHT_THRESHOLD
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

/// Configuration manager with file discovery and environment overrides
pub struct ConfigManager {
    config: EconCiConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (./.econci.toml, then ~/.econci/config.toml)
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        Self::finish(config, config_path)
    }

    /// Load an explicit config file, still applying environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        Self::load_dotenv();

        let config = Self::read_toml_file(path)?;
        Self::finish(config, Some(path.to_path_buf()))
    }

    fn finish(config: EconCiConfig, config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self::apply_env_overrides(config, |key| std::env::var(key).ok());
        Self::validate_config(&config)?;

        match config_path {
            Some(ref path) => info!("Config file: {}", path.display()),
            None => info!("Config file: NONE (using defaults)"),
        }
        info!(
            "Columns: entity={}, item={}, value={}",
            config.columns.entity, config.columns.item, config.columns.value
        );

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load .env file if it exists
    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".econci.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .econci.env: {}", e);
                }
            }
        }
    }

    /// Find and load config file
    fn load_config_file() -> Result<(EconCiConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".econci.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".econci").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        Ok((EconCiConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<EconCiConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply environment variable overrides read through `lookup`.
    pub fn apply_env_overrides<F>(mut config: EconCiConfig, lookup: F) -> EconCiConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(column) = lookup("ECONCI_ENTITY_COLUMN") {
            config.columns.entity = column;
        }
        if let Some(column) = lookup("ECONCI_ITEM_COLUMN") {
            config.columns.item = column;
        }
        if let Some(column) = lookup("ECONCI_VALUE_COLUMN") {
            config.columns.value = column;
        }

        if let Some(threshold) = lookup("ECONCI_M_CP_THRESHOLD") {
            match threshold.parse() {
                Ok(t) => config.complexity.m_cp_threshold = t,
                Err(_) => warn!("Ignoring unparsable ECONCI_M_CP_THRESHOLD={}", threshold),
            }
        }
        if let Some(threshold) = lookup("ECONCI_EDGE_WEIGHT_THRESHOLD") {
            match threshold.parse() {
                Ok(t) => config.product_space.edge_weight_threshold = t,
                Err(_) => warn!("Ignoring unparsable ECONCI_EDGE_WEIGHT_THRESHOLD={}", threshold),
            }
        }

        if let Some(level) = lookup("RUST_LOG") {
            config.logging.level = level;
        }

        config
    }

    /// Validate configuration
    pub fn validate_config(config: &EconCiConfig) -> Result<(), ConfigError> {
        for (role, name) in [
            ("entity", &config.columns.entity),
            ("item", &config.columns.item),
            ("value", &config.columns.value),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "columns.{} cannot be empty",
                    role
                )));
            }
        }

        if !config.complexity.m_cp_threshold.is_finite() {
            return Err(ConfigError::ValidationError(
                "complexity.m_cp_threshold must be finite".to_string(),
            ));
        }
        if !config.product_space.edge_weight_threshold.is_finite() {
            return Err(ConfigError::ValidationError(
                "product_space.edge_weight_threshold must be finite".to_string(),
            ));
        }

        // RUST_LOG may carry directives such as "econci_core=debug"; only bare levels are checked.
        let level = config.logging.level.as_str();
        if !level.contains('=') && !level.contains(',') {
            match level {
                "trace" | "debug" | "info" | "warn" | "error" => {}
                other => {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        other
                    )))
                }
            }
        }

        match config.logging.format.as_str() {
            "pretty" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, compact",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &EconCiConfig {
        &self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Create a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let toml_str = toml::to_string_pretty(&EconCiConfig::default())
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = EconCiConfig::default();
        assert_eq!(config.columns.entity, "country");
        assert_eq!(config.columns.item, "product");
        assert_eq!(config.columns.value, "export");
        assert_eq!(config.complexity.m_cp_threshold, 1.0);
        assert_eq!(config.product_space.edge_weight_threshold, 0.65);
        assert!(ConfigManager::validate_config(&config).is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ECONCI_ENTITY_COLUMN", "exporter"),
            ("ECONCI_M_CP_THRESHOLD", "0.5"),
            ("ECONCI_EDGE_WEIGHT_THRESHOLD", "not-a-number"),
            ("RUST_LOG", "debug"),
        ]
        .into_iter()
        .collect();

        let config = ConfigManager::apply_env_overrides(EconCiConfig::default(), |key| {
            env.get(key).map(|v| v.to_string())
        });
        assert_eq!(config.columns.entity, "exporter");
        assert_eq!(config.columns.item, "product");
        assert_eq!(config.complexity.m_cp_threshold, 0.5);
        assert_eq!(config.product_space.edge_weight_threshold, 0.65);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_config_validation() {
        let mut config = EconCiConfig::default();
        config.columns.value = "  ".to_string();
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = EconCiConfig::default();
        config.complexity.m_cp_threshold = f64::NAN;
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = EconCiConfig::default();
        config.logging.level = "loud".to_string();
        assert!(ConfigManager::validate_config(&config).is_err());

        config.logging.level = "econci_core=debug".to_string();
        assert!(ConfigManager::validate_config(&config).is_ok());
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        ConfigManager::create_default_config(&path).unwrap();

        let manager = ConfigManager::load_from_path(&path).unwrap();
        assert_eq!(manager.config_path(), Some(path.as_path()));
        assert_eq!(manager.config().columns, ColumnsConfig::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: EconCiConfig = toml::from_str(
            r#"
            [complexity]
            m_cp_threshold = 0.8
            "#,
        )
        .unwrap();
        assert_eq!(config.complexity.m_cp_threshold, 0.8);
        assert_eq!(config.product_space.edge_weight_threshold, 0.65);
        assert_eq!(config.columns.value, "export");
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigManager::load_from_path(Path::new("/nonexistent/econci.toml"));
        assert!(matches!(err, Err(ConfigError::NotFound(_))));
    }
}
