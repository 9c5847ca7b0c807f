//! Configuration management for Kin services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`KIN__` prefix, `__` separator, e.g. `KIN__REGISTRY__BACKEND`)
//! 2. Config file (`kin.toml` by default)
//! 3. Defaults

use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "KIN";
pub const DEFAULT_FILE_PREFIX: &str = "kin";

/// Which store backs the registry.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process store persisted to `data_file` as JSON.
    #[default]
    Memory,
    /// Neo4j via the `[neo4j]` section.
    Neo4j,
}

/// The `[registry]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub backend: Backend,

    /// JSON snapshot used by the memory backend.
    #[serde(default = "default_data_file")]
    pub data_file: String,

    /// Upper bound on grandparents returned per query.
    #[serde(default = "default_max_grandparents")]
    pub max_grandparents: usize,

    /// Optional generation limit for the nested children query.
    #[serde(default)]
    pub max_descendant_depth: Option<usize>,
}

fn default_data_file() -> String {
    "./kin-registry.json".to_string()
}

fn default_max_grandparents() -> usize {
    2
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            data_file: default_data_file(),
            max_grandparents: default_max_grandparents(),
            max_descendant_depth: None,
        }
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.max_grandparents == 0 {
            return Err(config::ConfigError::Message(
                "registry.max_grandparents must be at least 1".to_string(),
            ));
        }
        if self.max_descendant_depth == Some(0) {
            return Err(config::ConfigError::Message(
                "registry.max_descendant_depth must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load one section of the layered configuration.
///
/// A missing section yields `T::default()`; a present but malformed one is
/// an error.
pub fn load_section<T>(file_prefix: &str, section: &str) -> Result<T, config::ConfigError>
where
    T: DeserializeOwned + Default,
{
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    match cfg.get::<T>(section) {
        Ok(value) => Ok(value),
        Err(config::ConfigError::NotFound(_)) => {
            tracing::debug!(section, "Config section absent, using defaults");
            Ok(T::default())
        }
        Err(e) => Err(e),
    }
}

/// Load and validate the `[registry]` section.
pub fn load_registry_config(file_prefix: &str) -> Result<RegistryConfig, config::ConfigError> {
    let registry: RegistryConfig = load_section(file_prefix, "registry")?;
    registry.validate()?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.max_grandparents, 2);
        assert_eq!(config.max_descendant_depth, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("kin.toml"),
            "[registry]\nbackend = \"neo4j\"\nmax_grandparents = 4\nmax_descendant_depth = 3\n",
        )
        .unwrap();
        let prefix = dir.path().join("kin");

        let config = load_registry_config(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.backend, Backend::Neo4j);
        assert_eq!(config.max_grandparents, 4);
        assert_eq!(config.max_descendant_depth, Some(3));
        assert_eq!(config.data_file, "./kin-registry.json");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent");
        let config = load_registry_config(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.max_grandparents, 2);
    }

    #[test]
    fn test_zero_grandparent_cap_rejected() {
        let config = RegistryConfig {
            max_grandparents: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
