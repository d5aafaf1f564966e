use serde::{Deserialize, Serialize};
use tracing::info;

use super::registry::ModelPlugins;
use super::ModelSpec;
use crate::domain::{Feedstocks, Technology};
use crate::error::{LcoxError, Result};

/// What the plant is sized from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMode {
    /// Hydrogen available, kg/year
    Supply { hydrogen_amount_kgpy: f64 },
    /// Product wanted, tonnes/year
    Demand { desired_mtpy: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapacityModelConfig<'a> {
    pub technology: &'a Technology,
    pub feedstocks: &'a Feedstocks,
    pub capacity_factor_estimate: f64,
    pub mode: SizingMode,
    pub performance_model: ModelSpec,
}

impl<'a> CapacityModelConfig<'a> {
    /// Exactly one of `hydrogen_amount_kgpy` and `desired_mtpy` must be set.
    pub fn new(
        technology: &'a Technology,
        feedstocks: &'a Feedstocks,
        capacity_factor_estimate: f64,
        hydrogen_amount_kgpy: Option<f64>,
        desired_mtpy: Option<f64>,
    ) -> Result<Self> {
        let mode = match (hydrogen_amount_kgpy, desired_mtpy) {
            (Some(hydrogen_amount_kgpy), None) => SizingMode::Supply {
                hydrogen_amount_kgpy,
            },
            (None, Some(desired_mtpy)) => SizingMode::Demand { desired_mtpy },
            (Some(_), Some(_)) => {
                return Err(LcoxError::Config(
                    "can only select one input: `hydrogen_amount_kgpy` or `desired_mtpy`"
                        .to_string(),
                ))
            }
            (None, None) => {
                return Err(LcoxError::Config(
                    "`hydrogen_amount_kgpy` or `desired_mtpy` is a required input".to_string(),
                ))
            }
        };
        Self::with_mode(technology, feedstocks, capacity_factor_estimate, mode)
    }

    pub fn with_mode(
        technology: &'a Technology,
        feedstocks: &'a Feedstocks,
        capacity_factor_estimate: f64,
        mode: SizingMode,
    ) -> Result<Self> {
        if !(capacity_factor_estimate.is_finite() && capacity_factor_estimate > 0.0) {
            return Err(LcoxError::Validation(format!(
                "capacity factor estimate must be positive, got {}",
                capacity_factor_estimate
            )));
        }
        let quantity = match mode {
            SizingMode::Supply { hydrogen_amount_kgpy } => hydrogen_amount_kgpy,
            SizingMode::Demand { desired_mtpy } => desired_mtpy,
        };
        if !(quantity.is_finite() && quantity >= 0.0) {
            return Err(LcoxError::Validation(format!(
                "sizing quantity must be non-negative, got {}",
                quantity
            )));
        }
        Ok(Self {
            technology,
            feedstocks,
            capacity_factor_estimate,
            mode,
            performance_model: ModelSpec::default(),
        })
    }

    pub fn with_performance_model(mut self, spec: ModelSpec) -> Self {
        self.performance_model = spec;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityModelOutputs {
    pub plant_capacity_mtpy: f64,
    pub hydrogen_amount_kgpy: f64,
}

/// Size the plant with the built-in model. Named performance models need
/// [`size_capacity_with`].
pub fn size_capacity(config: &CapacityModelConfig<'_>) -> Result<CapacityModelOutputs> {
    size_capacity_with(config, &ModelPlugins::default())
}

pub fn size_capacity_with(
    config: &CapacityModelConfig<'_>,
    plugins: &ModelPlugins,
) -> Result<CapacityModelOutputs> {
    let outputs = if config.performance_model.is_placeholder() {
        placeholder_capacity(config)
    } else {
        let (model, resolved) = plugins.performance(&config.performance_model)?;
        model
            .compute(config, &resolved)
            .map_err(|source| LcoxError::ExternalModel {
                name: resolved.name.clone(),
                source,
            })?
    };

    info!(
        technology = %config.technology.kind,
        capacity_mtpy = outputs.plant_capacity_mtpy,
        hydrogen_kgpy = outputs.hydrogen_amount_kgpy,
        "plant capacity sized"
    );
    Ok(outputs)
}

fn placeholder_capacity(config: &CapacityModelConfig<'_>) -> CapacityModelOutputs {
    let per_tonne = config.technology.supply_units_per_tonne;
    let consumption = config.feedstocks.hydrogen_consumption;
    let cf = config.capacity_factor_estimate;

    match config.mode {
        SizingMode::Supply {
            hydrogen_amount_kgpy,
        } => CapacityModelOutputs {
            plant_capacity_mtpy: hydrogen_amount_kgpy / per_tonne / consumption * cf,
            hydrogen_amount_kgpy,
        },
        SizingMode::Demand { desired_mtpy } => CapacityModelOutputs {
            plant_capacity_mtpy: desired_mtpy / cf,
            hydrogen_amount_kgpy: desired_mtpy * per_tonne * consumption / cf,
        },
    }
}

/// Annual output of a plant of `plant_capacity_mtpy` running at
/// `capacity_factor`.
pub fn annual_production(plant_capacity_mtpy: f64, capacity_factor: f64) -> f64 {
    plant_capacity_mtpy * capacity_factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TechnologyKind;
    use crate::pipeline::{registry::PerformanceModel, ResolvedModel};
    use rstest::rstest;
    use std::sync::Arc;

    #[test]
    fn test_supply_mode() {
        let tech = Technology::iron_ore();
        let feedstocks = Feedstocks::default();
        let config =
            CapacityModelConfig::new(&tech, &feedstocks, 0.9, Some(1.0e7), None).unwrap();
        let outputs = size_capacity(&config).unwrap();

        let expected = 1.0e7 / 1000.0 / 0.06596 * 0.9;
        assert!((outputs.plant_capacity_mtpy - expected).abs() < 1e-6);
        assert_eq!(outputs.hydrogen_amount_kgpy, 1.0e7);
    }

    #[test]
    fn test_demand_mode() {
        let tech = Technology::iron_ore();
        let feedstocks = Feedstocks::default();
        let config =
            CapacityModelConfig::new(&tech, &feedstocks, 0.9, None, Some(1.0e5)).unwrap();
        let outputs = size_capacity(&config).unwrap();

        assert!((outputs.plant_capacity_mtpy - 1.0e5 / 0.9).abs() < 1e-6);
        assert!((outputs.hydrogen_amount_kgpy - 1.0e5 * 1000.0 * 0.06596 / 0.9).abs() < 1e-6);
    }

    #[rstest]
    #[case(Some(1.0), Some(1.0))]
    #[case(None, None)]
    fn test_sizing_inputs_are_exclusive(#[case] supply: Option<f64>, #[case] demand: Option<f64>) {
        let tech = Technology::builtin(TechnologyKind::IronElectrowinning);
        let feedstocks = Feedstocks::default();
        let err = CapacityModelConfig::new(&tech, &feedstocks, 0.9, supply, demand).unwrap_err();
        assert!(matches!(err, LcoxError::Config(_)));
    }

    #[test]
    fn test_zero_capacity_factor_rejected() {
        let tech = Technology::iron_ore();
        let feedstocks = Feedstocks::default();
        assert!(CapacityModelConfig::new(&tech, &feedstocks, 0.0, None, Some(1.0)).is_err());
    }

    #[test]
    fn test_annual_production() {
        assert_eq!(annual_production(1000.0, 0.5), 500.0);
    }

    struct FixedPerformance;

    impl PerformanceModel for FixedPerformance {
        fn compute(
            &self,
            _config: &CapacityModelConfig<'_>,
            model: &ResolvedModel,
        ) -> anyhow::Result<CapacityModelOutputs> {
            anyhow::ensure!(model.coeffs == "c", "unexpected coefficients");
            Ok(CapacityModelOutputs {
                plant_capacity_mtpy: 42.0,
                hydrogen_amount_kgpy: 7.0,
            })
        }
    }

    #[test]
    fn test_external_performance_model() {
        let tech = Technology::iron_ore();
        let feedstocks = Feedstocks::default();
        let mut plugins = ModelPlugins::new();
        plugins.register_performance("fixed", Arc::new(FixedPerformance));

        let spec = ModelSpec {
            model_fp: "m".to_string(),
            inputs_fp: "i".to_string(),
            coeffs_fp: "c".to_string(),
            ..ModelSpec::named("fixed")
        };
        let config = CapacityModelConfig::new(&tech, &feedstocks, 0.9, Some(1.0), None)
            .unwrap()
            .with_performance_model(spec.clone());
        let outputs = size_capacity_with(&config, &plugins).unwrap();
        assert_eq!(outputs.plant_capacity_mtpy, 42.0);

        let bad = config.with_performance_model(ModelSpec {
            coeffs_fp: "other".to_string(),
            ..spec
        });
        let err = size_capacity_with(&bad, &plugins).unwrap_err();
        assert_eq!(err.kind(), "external_model");

        // Without the plugin table the name cannot be dispatched
        assert_eq!(size_capacity(&bad).unwrap_err().kind(), "resolution");
    }
}
