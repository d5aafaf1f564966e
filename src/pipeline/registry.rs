//! External model registry.
//!
//! A stage runs its built-in `"placeholder"` model unless its [`ModelSpec`]
//! names another one. Named models are resolved to `{model, inputs,
//! coeffs}` locations (explicit paths on the `ModelSpec` first, registry file
//! second) and dispatched to an implementation registered in
//! [`ModelPlugins`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

use super::{CapacityModelConfig, CapacityModelOutputs, CostModelConfig, CostModelOutputs};
use crate::error::{LcoxError, Result};

pub const PLACEHOLDER_MODEL: &str = "placeholder";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ModelKind {
    Performance,
    Cost,
}

/// Model selection for one stage. Empty paths are looked up in the
/// registry file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSpec {
    pub name: String,
    pub model_fp: String,
    pub inputs_fp: String,
    pub coeffs_fp: String,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self::named(PLACEHOLDER_MODEL)
    }
}

impl ModelSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_fp: String::new(),
            inputs_fp: String::new(),
            coeffs_fp: String::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.name == PLACEHOLDER_MODEL
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPaths {
    pub model: String,
    pub inputs: String,
    pub coeffs: String,
}

/// Contents of a model registry file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelLocations {
    pub performance: IndexMap<String, ModelPaths>,
    pub cost: IndexMap<String, ModelPaths>,
}

static REGISTRY_CACHE: Lazy<Mutex<HashMap<PathBuf, Arc<ModelLocations>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

impl ModelLocations {
    /// Parse a registry file; `.toml` files as TOML, anything else as YAML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(toml::from_str(&text)?),
            _ => Ok(serde_yaml::from_str(&text)?),
        }
    }

    /// Parse a registry file once per path for the life of the process.
    pub fn load_cached(path: &Path) -> Result<Arc<Self>> {
        let mut cache = REGISTRY_CACHE.lock();
        if let Some(locations) = cache.get(path) {
            return Ok(Arc::clone(locations));
        }
        let locations = Arc::new(Self::from_path(path)?);
        debug!(path = %path.display(), "model registry loaded");
        cache.insert(path.to_path_buf(), Arc::clone(&locations));
        Ok(locations)
    }

    pub fn lookup(&self, kind: ModelKind, name: &str) -> Option<&ModelPaths> {
        match kind {
            ModelKind::Performance => self.performance.get(name),
            ModelKind::Cost => self.cost.get(name),
        }
    }
}

/// A named model with every location filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedModel {
    pub name: String,
    pub model: String,
    pub inputs: String,
    pub coeffs: String,
}

/// Fill the empty locations of `spec` from `registry`.
pub fn resolve(
    spec: &ModelSpec,
    kind: ModelKind,
    registry: Option<&ModelLocations>,
) -> Result<ResolvedModel> {
    let entry = registry.and_then(|r| r.lookup(kind, &spec.name));
    let error = |reason: String| LcoxError::Resolution {
        kind: match kind {
            ModelKind::Performance => "performance",
            ModelKind::Cost => "cost",
        },
        name: spec.name.clone(),
        reason,
    };

    let pick = |explicit: &str, field: &str, from_registry: Option<&String>| -> Result<String> {
        if !explicit.is_empty() {
            return Ok(explicit.to_string());
        }
        match (entry, from_registry) {
            (Some(_), Some(path)) if !path.is_empty() => Ok(path.clone()),
            (Some(_), _) => Err(error(format!("registry entry has no `{}` path", field))),
            (None, _) => Err(error(format!(
                "no `{}` path given and no {} registry entry",
                field, kind
            ))),
        }
    };

    Ok(ResolvedModel {
        name: spec.name.clone(),
        model: pick(&spec.model_fp, "model", entry.map(|e| &e.model))?,
        inputs: pick(&spec.inputs_fp, "inputs", entry.map(|e| &e.inputs))?,
        coeffs: pick(&spec.coeffs_fp, "coeffs", entry.map(|e| &e.coeffs))?,
    })
}

/// Capacity sizing supplied from outside the crate.
pub trait PerformanceModel: Send + Sync {
    fn compute(
        &self,
        config: &CapacityModelConfig<'_>,
        model: &ResolvedModel,
    ) -> anyhow::Result<CapacityModelOutputs>;
}

/// Cost estimation supplied from outside the crate.
pub trait CostModel: Send + Sync {
    fn compute(
        &self,
        config: &CostModelConfig<'_>,
        model: &ResolvedModel,
    ) -> anyhow::Result<CostModelOutputs>;
}

/// Explicit table of external model implementations, keyed by the name
/// used in a [`ModelSpec`].
#[derive(Clone, Default)]
pub struct ModelPlugins {
    performance: HashMap<String, Arc<dyn PerformanceModel>>,
    cost: HashMap<String, Arc<dyn CostModel>>,
    locations: Option<Arc<ModelLocations>>,
}

impl fmt::Debug for ModelPlugins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelPlugins")
            .field("performance", &self.performance.keys().collect::<Vec<_>>())
            .field("cost", &self.cost.keys().collect::<Vec<_>>())
            .field("locations", &self.locations)
            .finish()
    }
}

impl ModelPlugins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locations(mut self, locations: Arc<ModelLocations>) -> Self {
        self.locations = Some(locations);
        self
    }

    pub fn register_performance(
        &mut self,
        name: impl Into<String>,
        model: Arc<dyn PerformanceModel>,
    ) {
        self.performance.insert(name.into(), model);
    }

    pub fn register_cost(&mut self, name: impl Into<String>, model: Arc<dyn CostModel>) {
        self.cost.insert(name.into(), model);
    }

    pub fn locations(&self) -> Option<&ModelLocations> {
        self.locations.as_deref()
    }

    pub(crate) fn performance(&self, spec: &ModelSpec) -> Result<(Arc<dyn PerformanceModel>, ResolvedModel)> {
        let resolved = resolve(spec, ModelKind::Performance, self.locations())?;
        let model = self
            .performance
            .get(&spec.name)
            .cloned()
            .ok_or_else(|| LcoxError::Resolution {
                kind: "performance",
                name: spec.name.clone(),
                reason: "no implementation registered".to_string(),
            })?;
        Ok((model, resolved))
    }

    pub(crate) fn cost(&self, spec: &ModelSpec) -> Result<(Arc<dyn CostModel>, ResolvedModel)> {
        let resolved = resolve(spec, ModelKind::Cost, self.locations())?;
        let model = self
            .cost
            .get(&spec.name)
            .cloned()
            .ok_or_else(|| LcoxError::Resolution {
                kind: "cost",
                name: spec.name.clone(),
                reason: "no implementation registered".to_string(),
            })?;
        Ok((model, resolved))
    }
}
