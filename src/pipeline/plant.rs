use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::ModelSpec;
use crate::domain::{CostIndex, Feedstocks, TechnologyKind, YearSchedule};

/// One downstream plant as read from configuration: the input to
/// [`Pipeline::run_full_model`](super::Pipeline::run_full_model).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PlantConfig {
    pub technology: TechnologyKind,
    #[validate(nested)]
    pub capacity: CapacitySection,
    #[validate(nested)]
    pub costs: CostSection,
    #[validate(nested)]
    pub finances: FinanceSection,
    #[serde(default)]
    pub performance_model: ModelSpec,
    #[serde(default)]
    pub cost_model: ModelSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CapacitySection {
    #[validate(range(exclusive_min = 0.0))]
    pub input_capacity_factor_estimate: f64,
    #[serde(default)]
    pub hydrogen_amount_kgpy: Option<f64>,
    #[serde(default, alias = "desired_iron_ore_mtpy", alias = "desired_iron_mtpy")]
    pub desired_mtpy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CostSection {
    pub operational_year: i32,
    /// $/kg; must match `finances.lcoh`
    #[serde(default)]
    pub lcoh: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub capex_misc: f64,
    #[validate(nested)]
    pub feedstocks: Feedstocks,
    #[serde(default = "default_true")]
    pub o2_heat_integration: bool,
    #[serde(default = "default_co2_fuel_emissions")]
    pub co2_fuel_emissions: f64,
    #[serde(default = "default_co2_carbon_emissions")]
    pub co2_carbon_emissions: f64,
    #[serde(default = "default_surface_water_discharge")]
    pub surface_water_discharge: f64,
    #[serde(default)]
    pub cost_index: Option<CostIndex>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FinanceSection {
    #[validate(range(min = 1))]
    pub plant_life: u32,
    #[serde(default)]
    pub lcoh: Option<f64>,
    pub grid_prices: YearSchedule,
    #[serde(default)]
    pub financial_assumptions: IndexMap<String, Value>,
    #[serde(default = "default_install_years")]
    pub install_years: u32,
    #[serde(default)]
    pub gen_inflation: f64,
    #[serde(default = "default_true")]
    pub o2_heat_integration: bool,
}

fn default_true() -> bool {
    true
}

fn default_co2_fuel_emissions() -> f64 {
    0.03929
}

fn default_co2_carbon_emissions() -> f64 {
    0.17466
}

fn default_surface_water_discharge() -> f64 {
    0.42113
}

fn default_install_years() -> u32 {
    3
}
