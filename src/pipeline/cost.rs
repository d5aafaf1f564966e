use serde::{Deserialize, Serialize};
use tracing::info;

use super::registry::ModelPlugins;
use super::ModelSpec;
use crate::domain::{CapitalLine, CostIndex, Feedstocks, Technology};
use crate::error::{LcoxError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct CostModelConfig<'a> {
    pub technology: &'a Technology,
    pub feedstocks: &'a Feedstocks,
    /// Year whose natural gas price feeds the monthly energy cost
    pub operational_year: i32,
    pub plant_capacity_mtpy: f64,
    /// $/kg hydrogen
    pub lcoh: f64,
    pub capex_misc: f64,
    pub o2_heat_integration: bool,
    pub co2_fuel_emissions: f64,
    pub co2_carbon_emissions: f64,
    pub surface_water_discharge: f64,
    pub cost_model: ModelSpec,
    /// Replaces the technology's cost index pair when set
    pub cost_index: Option<CostIndex>,
}

impl<'a> CostModelConfig<'a> {
    pub fn new(
        technology: &'a Technology,
        feedstocks: &'a Feedstocks,
        operational_year: i32,
        plant_capacity_mtpy: f64,
        lcoh: f64,
    ) -> Self {
        Self {
            technology,
            feedstocks,
            operational_year,
            plant_capacity_mtpy,
            lcoh,
            capex_misc: 0.0,
            o2_heat_integration: true,
            co2_fuel_emissions: 0.03929,
            co2_carbon_emissions: 0.17466,
            surface_water_discharge: 0.42113,
            cost_model: ModelSpec::default(),
            cost_index: None,
        }
    }

    fn index_ratio(&self) -> f64 {
        self.cost_index
            .unwrap_or(self.technology.cost_index)
            .ratio()
    }

    fn validate(&self) -> Result<()> {
        let checks = [
            ("plant_capacity_mtpy", self.plant_capacity_mtpy),
            ("lcoh", self.lcoh),
            ("capex_misc", self.capex_misc),
        ];
        match checks.iter().find(|(_, v)| !(v.is_finite() && *v >= 0.0)) {
            Some((name, v)) => Err(LcoxError::Validation(format!(
                "{} must be finite and non-negative, got {}",
                name, v
            ))),
            None => Ok(()),
        }
    }
}

/// Cost components the finance stage consumes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Costs {
    pub capex_eaf_casting: f64,
    pub capex_shaft_furnace: f64,
    pub capex_oxygen_supply: f64,
    pub capex_h2_preheating: f64,
    pub capex_cooling_tower: f64,
    pub capex_piping: f64,
    pub capex_elec_instr: f64,
    pub capex_buildings_storage_water: f64,
    pub capex_misc: f64,
    pub labor_cost_annual_operation: f64,
    pub labor_cost_maintenance: f64,
    pub labor_cost_admin_support: f64,
    pub property_tax_insurance: f64,
    pub land_cost: f64,
    pub installation_cost: f64,
}

impl Costs {
    fn set_capex(&mut self, line: CapitalLine, value: f64) {
        let slot = match line {
            CapitalLine::EafCasting => &mut self.capex_eaf_casting,
            CapitalLine::ShaftFurnace => &mut self.capex_shaft_furnace,
            CapitalLine::OxygenSupply => &mut self.capex_oxygen_supply,
            CapitalLine::H2Preheating => &mut self.capex_h2_preheating,
            CapitalLine::CoolingTower => &mut self.capex_cooling_tower,
            CapitalLine::Piping => &mut self.capex_piping,
            CapitalLine::ElecInstr => &mut self.capex_elec_instr,
            CapitalLine::BuildingsStorageWater => &mut self.capex_buildings_storage_water,
            CapitalLine::Misc => &mut self.capex_misc,
        };
        *slot = value;
    }
}

/// Everything the finance stage needs from a cost estimate. Implemented by
/// bare [`Costs`] (costs supplied by hand) and by full
/// [`CostModelOutputs`].
pub trait CostComponents {
    fn capex_eaf_casting(&self) -> f64;
    fn capex_shaft_furnace(&self) -> f64;
    fn capex_oxygen_supply(&self) -> f64;
    fn capex_h2_preheating(&self) -> f64;
    fn capex_cooling_tower(&self) -> f64;
    fn capex_piping(&self) -> f64;
    fn capex_elec_instr(&self) -> f64;
    fn capex_buildings_storage_water(&self) -> f64;
    fn capex_misc(&self) -> f64;
    fn labor_cost_annual_operation(&self) -> f64;
    fn labor_cost_maintenance(&self) -> f64;
    fn labor_cost_admin_support(&self) -> f64;
    fn property_tax_insurance(&self) -> f64;
    fn land_cost(&self) -> f64;
    fn installation_cost(&self) -> f64;

    fn capex(&self, line: CapitalLine) -> f64 {
        match line {
            CapitalLine::EafCasting => self.capex_eaf_casting(),
            CapitalLine::ShaftFurnace => self.capex_shaft_furnace(),
            CapitalLine::OxygenSupply => self.capex_oxygen_supply(),
            CapitalLine::H2Preheating => self.capex_h2_preheating(),
            CapitalLine::CoolingTower => self.capex_cooling_tower(),
            CapitalLine::Piping => self.capex_piping(),
            CapitalLine::ElecInstr => self.capex_elec_instr(),
            CapitalLine::BuildingsStorageWater => self.capex_buildings_storage_water(),
            CapitalLine::Misc => self.capex_misc(),
        }
    }

    /// Fixed annual costs in reporting order, with the property-tax flag.
    fn fixed_costs(&self) -> [(&'static str, f64, bool); 4] {
        [
            ("Annual Operating Labor Cost", self.labor_cost_annual_operation(), false),
            ("Maintenance Labor Cost", self.labor_cost_maintenance(), false),
            (
                "Administrative & Support Labor Cost",
                self.labor_cost_admin_support(),
                false,
            ),
            ("Property tax and insurance", self.property_tax_insurance(), true),
        ]
    }
}

impl CostComponents for Costs {
    fn capex_eaf_casting(&self) -> f64 {
        self.capex_eaf_casting
    }
    fn capex_shaft_furnace(&self) -> f64 {
        self.capex_shaft_furnace
    }
    fn capex_oxygen_supply(&self) -> f64 {
        self.capex_oxygen_supply
    }
    fn capex_h2_preheating(&self) -> f64 {
        self.capex_h2_preheating
    }
    fn capex_cooling_tower(&self) -> f64 {
        self.capex_cooling_tower
    }
    fn capex_piping(&self) -> f64 {
        self.capex_piping
    }
    fn capex_elec_instr(&self) -> f64 {
        self.capex_elec_instr
    }
    fn capex_buildings_storage_water(&self) -> f64 {
        self.capex_buildings_storage_water
    }
    fn capex_misc(&self) -> f64 {
        self.capex_misc
    }
    fn labor_cost_annual_operation(&self) -> f64 {
        self.labor_cost_annual_operation
    }
    fn labor_cost_maintenance(&self) -> f64 {
        self.labor_cost_maintenance
    }
    fn labor_cost_admin_support(&self) -> f64 {
        self.labor_cost_admin_support
    }
    fn property_tax_insurance(&self) -> f64 {
        self.property_tax_insurance
    }
    fn land_cost(&self) -> f64 {
        self.land_cost
    }
    fn installation_cost(&self) -> f64 {
        self.installation_cost
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostModelOutputs {
    #[serde(flatten)]
    pub costs: Costs,
    pub total_plant_cost: f64,
    pub total_fixed_operating_cost: f64,
    pub labor_cost_fivemonth: f64,
    pub maintenance_materials_onemonth: f64,
    pub non_fuel_consumables_onemonth: f64,
    pub waste_disposal_onemonth: f64,
    pub monthly_energy_cost: f64,
    pub spare_parts_cost: f64,
    pub misc_owners_costs: f64,
}

impl CostComponents for CostModelOutputs {
    fn capex_eaf_casting(&self) -> f64 {
        self.costs.capex_eaf_casting
    }
    fn capex_shaft_furnace(&self) -> f64 {
        self.costs.capex_shaft_furnace
    }
    fn capex_oxygen_supply(&self) -> f64 {
        self.costs.capex_oxygen_supply
    }
    fn capex_h2_preheating(&self) -> f64 {
        self.costs.capex_h2_preheating
    }
    fn capex_cooling_tower(&self) -> f64 {
        self.costs.capex_cooling_tower
    }
    fn capex_piping(&self) -> f64 {
        self.costs.capex_piping
    }
    fn capex_elec_instr(&self) -> f64 {
        self.costs.capex_elec_instr
    }
    fn capex_buildings_storage_water(&self) -> f64 {
        self.costs.capex_buildings_storage_water
    }
    fn capex_misc(&self) -> f64 {
        self.costs.capex_misc
    }
    fn labor_cost_annual_operation(&self) -> f64 {
        self.costs.labor_cost_annual_operation
    }
    fn labor_cost_maintenance(&self) -> f64 {
        self.costs.labor_cost_maintenance
    }
    fn labor_cost_admin_support(&self) -> f64 {
        self.costs.labor_cost_admin_support
    }
    fn property_tax_insurance(&self) -> f64 {
        self.costs.property_tax_insurance
    }
    fn land_cost(&self) -> f64 {
        self.costs.land_cost
    }
    fn installation_cost(&self) -> f64 {
        self.costs.installation_cost
    }
}

/// Estimate capital, fixed and owner's costs with the built-in model.
/// Named cost models need [`estimate_costs_with`].
pub fn estimate_costs(config: &CostModelConfig<'_>) -> Result<CostModelOutputs> {
    estimate_costs_with(config, &ModelPlugins::default())
}

pub fn estimate_costs_with(
    config: &CostModelConfig<'_>,
    plugins: &ModelPlugins,
) -> Result<CostModelOutputs> {
    config.validate()?;

    let outputs = if config.cost_model.is_placeholder() {
        placeholder_costs(config)?
    } else {
        let (model, resolved) = plugins.cost(&config.cost_model)?;
        model
            .compute(config, &resolved)
            .map_err(|source| LcoxError::ExternalModel {
                name: resolved.name.clone(),
                source,
            })?
    };

    info!(
        technology = %config.technology.kind,
        capacity_mtpy = config.plant_capacity_mtpy,
        total_plant_cost = outputs.total_plant_cost,
        installation_cost = outputs.costs.installation_cost,
        "plant costs estimated"
    );
    Ok(outputs)
}

fn placeholder_costs(config: &CostModelConfig<'_>) -> Result<CostModelOutputs> {
    let tech = config.technology;
    let factors = &tech.owner_costs;
    let feedstocks = config.feedstocks;
    let capacity = config.plant_capacity_mtpy;
    let ratio = config.index_ratio();

    let mut costs = Costs::default();
    for (line, curve) in tech.cost_curves.iter() {
        costs.set_capex(*line, curve.evaluate(capacity, ratio, config.o2_heat_integration));
    }
    costs.set_capex(CapitalLine::Misc, config.capex_misc);
    let total_plant_cost: f64 = CapitalLine::all().map(|line| costs.capex(line)).sum();

    // Fixed O&M
    costs.labor_cost_annual_operation = tech.labor.evaluate(capacity);
    costs.labor_cost_maintenance = factors.maintenance_labor_fraction_of_tpc * total_plant_cost;
    costs.labor_cost_admin_support = factors.admin_support_fraction_of_labor
        * (costs.labor_cost_annual_operation + costs.labor_cost_maintenance);
    costs.property_tax_insurance = factors.property_tax_insurance_fraction_of_tpc * total_plant_cost;
    let total_fixed_operating_cost: f64 = costs.fixed_costs().iter().map(|(_, v, _)| v).sum();

    // Owner's costs
    let labor = costs.labor_cost_annual_operation
        + costs.labor_cost_maintenance
        + costs.labor_cost_admin_support;
    let labor_cost_fivemonth = factors.labor_buffer_months / 12.0 * labor;
    let maintenance_materials_onemonth =
        feedstocks.maintenance_materials_unitcost * capacity / 12.0;
    let non_fuel_per_tonne = feedstocks.non_fuel_consumables_per_tonne();
    let non_fuel_consumables_onemonth = capacity * non_fuel_per_tonne / 12.0;
    let waste_disposal_onemonth = capacity * feedstocks.waste_disposal_per_tonne() / 12.0;

    let gas_price = feedstocks
        .natural_gas_prices
        .get(config.operational_year)
        .ok_or_else(|| LcoxError::MissingScheduleYear {
            schedule: "natural_gas_prices".to_string(),
            year: config.operational_year,
        })?;
    let monthly_energy_cost = capacity
        * (feedstocks.hydrogen_consumption * config.lcoh * tech.supply_units_per_tonne
            + feedstocks.natural_gas_consumption * gas_price
            + feedstocks.electricity_consumption * feedstocks.electricity_cost)
        / 12.0;

    let startup_cost = factors.startup_fraction_of_tpc * total_plant_cost;
    let consumables_supply =
        capacity * non_fuel_per_tonne / 365.0 * factors.consumables_supply_days;
    let spare_parts_cost = factors.spare_parts_fraction_of_tpc * total_plant_cost;
    costs.land_cost = factors.land_cost_per_mtpy * capacity;
    let misc_owners_costs = factors.misc_owners_fraction_of_tpc * total_plant_cost;
    costs.installation_cost = labor_cost_fivemonth
        + startup_cost
        + consumables_supply
        + spare_parts_cost
        + misc_owners_costs;

    Ok(CostModelOutputs {
        costs,
        total_plant_cost,
        total_fixed_operating_cost,
        labor_cost_fivemonth,
        maintenance_materials_onemonth,
        non_fuel_consumables_onemonth,
        waste_disposal_onemonth,
        monthly_energy_cost,
        spare_parts_cost,
        misc_owners_costs,
    })
}
