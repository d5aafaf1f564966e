use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::credentials::Credentials;
use crate::error::{LcoxError, Result};
use crate::pipeline::{ModelLocations, PlantConfig, RunOptions};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "LCOX__";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunOptions,
    /// Model registry file (TOML or YAML) for named external models
    #[serde(default)]
    pub registry: Option<PathBuf>,
    #[serde(default)]
    pub credentials: Credentials,
    /// Downstream plants keyed by a label, run in file order
    #[serde(default)]
    pub plants: IndexMap<String, PlantConfig>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        let config: Self = figment
            .extract()
            .map_err(|e| LcoxError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (label, plant) in &self.plants {
            plant
                .validate()
                .map_err(|e| LcoxError::Validation(format!("plant `{}`: {}", label, e)))?;
        }
        Ok(())
    }

    pub fn model_locations(&self) -> Result<Option<std::sync::Arc<ModelLocations>>> {
        self.registry
            .as_deref()
            .map(ModelLocations::load_cached)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TechnologyKind;
    use std::io::Write;

    const CONFIG_TOML: &str = r#"
[run]
save_plots = false
computed_lcoh = 4.2

[plants.ore]
technology = "iron_ore"

[plants.ore.capacity]
input_capacity_factor_estimate = 0.9
desired_mtpy = 1000000.0

[plants.ore.costs]
operational_year = 2035

[plants.ore.costs.feedstocks.natural_gas_prices]
2035 = 4.0

[plants.ore.finances]
plant_life = 30

[plants.ore.finances.grid_prices]
2035 = 50.0
"#;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_config_file() {
        let file = write_config(CONFIG_TOML);
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.run.computed_lcoh, Some(4.2));
        assert_eq!(config.plants.len(), 1);
        assert_eq!(config.plants["ore"].technology, TechnologyKind::IronOre);
        assert!(config.registry.is_none());
        assert!(config.model_locations().unwrap().is_none());
    }

    #[test]
    fn test_invalid_plant_is_rejected() {
        let text = CONFIG_TOML.replace("plant_life = 30", "plant_life = 0");
        let file = write_config(&text);
        assert!(matches!(
            Config::load_from(file.path()),
            Err(LcoxError::Validation(_))
        ));
    }
}
