use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use super::artifacts::ArtifactOptions;
use super::registry::ModelPlugins;
use super::{
    annual_production, estimate_costs_with, size_capacity_with, solve_breakeven,
    CapacityModelConfig, CapacityModelOutputs, CostModelConfig, CostModelOutputs,
    FinanceModelConfig, FinanceModelOutputs, PlantConfig,
};
use crate::breakeven::{BreakevenSolver, CashFlowSolver};
use crate::domain::Technology;
use crate::error::{LcoxError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    #[serde(flatten)]
    pub artifacts: ArtifactOptions,
    /// LCOH ($/kg) from the upstream hydrogen model, used when the plant
    /// config leaves both LCOH values unset
    pub computed_lcoh: Option<f64>,
}

pub type FullModelOutputs = (CapacityModelOutputs, CostModelOutputs, FinanceModelOutputs);

/// Capacity sizing, cost estimation and breakeven solve for one plant.
pub struct Pipeline {
    pub solver: Box<dyn BreakevenSolver>,
    pub plugins: ModelPlugins,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(Box::new(CashFlowSolver::default()))
    }
}

impl Pipeline {
    pub fn new(solver: Box<dyn BreakevenSolver>) -> Self {
        Self {
            solver,
            plugins: ModelPlugins::default(),
        }
    }

    pub fn with_plugins(mut self, plugins: ModelPlugins) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn run_full_model(&self, plant: &PlantConfig, options: &RunOptions) -> Result<FullModelOutputs> {
        // Stages work on a private copy
        let plant = plant.clone();
        let lcoh = check_lcoh(&plant, options)?;
        plant.validate()?;

        let technology = Technology::builtin(plant.technology);
        let feedstocks = &plant.costs.feedstocks;
        let cf = plant.capacity.input_capacity_factor_estimate;
        info!(technology = %technology.kind, lcoh, "running full model");

        let capacity_config = CapacityModelConfig::new(
            &technology,
            feedstocks,
            cf,
            plant.capacity.hydrogen_amount_kgpy,
            plant.capacity.desired_mtpy,
        )?
        .with_performance_model(plant.performance_model.clone());
        let capacity = size_capacity_with(&capacity_config, &self.plugins)?;

        let cost_config = CostModelConfig {
            capex_misc: plant.costs.capex_misc,
            o2_heat_integration: plant.costs.o2_heat_integration,
            co2_fuel_emissions: plant.costs.co2_fuel_emissions,
            co2_carbon_emissions: plant.costs.co2_carbon_emissions,
            surface_water_discharge: plant.costs.surface_water_discharge,
            cost_model: plant.cost_model.clone(),
            cost_index: plant.costs.cost_index,
            ..CostModelConfig::new(
                &technology,
                feedstocks,
                plant.costs.operational_year,
                capacity.plant_capacity_mtpy,
                lcoh,
            )
        };
        let costs = estimate_costs_with(&cost_config, &self.plugins)?;

        let finances = &plant.finances;
        let finance_config = FinanceModelConfig {
            technology: &technology,
            plant_life: finances.plant_life,
            plant_capacity_mtpy: capacity.plant_capacity_mtpy,
            plant_capacity_factor: cf,
            production_mtpy: annual_production(capacity.plant_capacity_mtpy, cf),
            lcoh,
            grid_prices: finances.grid_prices.clone(),
            feedstocks,
            costs: &costs,
            o2_heat_integration: finances.o2_heat_integration,
            financial_assumptions: finances.financial_assumptions.clone(),
            install_years: finances.install_years,
            gen_inflation: finances.gen_inflation,
            artifacts: options.artifacts.clone(),
        };
        let finance = solve_breakeven(&finance_config, self.solver.as_ref())?;

        Ok((capacity, costs, finance))
    }
}

/// The cost and finance stages must price hydrogen identically: both LCOH
/// values set and equal, or both unset (the computed LCOH is used).
fn check_lcoh(plant: &PlantConfig, options: &RunOptions) -> Result<f64> {
    match (plant.costs.lcoh, plant.finances.lcoh) {
        (Some(cost), Some(finance)) if cost == finance => Ok(cost),
        (None, None) => options.computed_lcoh.ok_or_else(|| {
            LcoxError::Config(
                "LCOH not given in costs or finances and no computed LCOH supplied".to_string(),
            )
        }),
        (cost, finance) => {
            warn!(?cost, ?finance, technology = %plant.technology, "LCOH mismatch");
            Err(LcoxError::Consistency(format!(
                "{} cost LCOH and finance LCOH are not equal. You must specify both values or neither.",
                plant.technology
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plant() -> PlantConfig {
        serde_json::from_value(serde_json::json!({
            "technology": "iron_ore",
            "capacity": {"input_capacity_factor_estimate": 0.9, "desired_mtpy": 100000.0},
            "costs": {
                "operational_year": 2035,
                "lcoh": 4.0,
                "feedstocks": {"natural_gas_prices": {"2035": 4.0}}
            },
            "finances": {"plant_life": 25, "lcoh": 4.0, "grid_prices": {"2035": 50.0}}
        }))
        .unwrap()
    }

    #[test]
    fn test_lcoh_gate() {
        let options = RunOptions::default();
        assert_eq!(check_lcoh(&plant(), &options).unwrap(), 4.0);

        let mut mismatched = plant();
        mismatched.finances.lcoh = Some(5.0);
        assert!(matches!(
            check_lcoh(&mismatched, &options),
            Err(LcoxError::Consistency(_))
        ));

        let mut one_sided = plant();
        one_sided.costs.lcoh = None;
        assert!(matches!(
            check_lcoh(&one_sided, &options),
            Err(LcoxError::Consistency(_))
        ));
    }

    #[test]
    fn test_computed_lcoh_fallback() {
        let mut unset = plant();
        unset.costs.lcoh = None;
        unset.finances.lcoh = None;

        assert!(matches!(
            check_lcoh(&unset, &RunOptions::default()),
            Err(LcoxError::Config(_))
        ));
        let options = RunOptions {
            computed_lcoh: Some(3.5),
            ..Default::default()
        };
        assert_eq!(check_lcoh(&unset, &options).unwrap(), 3.5);
    }

    #[test]
    fn test_run_full_model() {
        let (capacity, costs, finance) = Pipeline::default()
            .run_full_model(&plant(), &RunOptions::default())
            .unwrap();
        assert!((capacity.plant_capacity_mtpy - 100000.0 / 0.9).abs() < 1e-6);
        assert!(costs.total_plant_cost > 0.0);
        assert!(finance.price().unwrap() > 0.0);
    }
}
