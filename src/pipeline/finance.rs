use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::artifacts::{write_finance_artifacts, ArtifactOptions};
use super::CostComponents;
use crate::breakeven::{
    BreakevenProblem, BreakevenSolver, CapitalItem, CashFlowTable, Commodity, DebtType,
    DepreciationMethod, EscalatingValue, FeedstockItem, FinancialParameters, FixedCost,
    InstallationCost, PriceBreakdownRow,
};
use crate::domain::{CapitalLine, FeedstockLine, Feedstocks, Technology, YearSchedule, YearlyValue};
use crate::error::{LcoxError, Result};

const DEMAND_RAMPUP_YEARS: f64 = 5.3;
const CAPEX_MACRS_PERIOD: u32 = 7;
const INSTALLATION_DEPRECIATION_PERIOD: u32 = 4;

pub struct FinanceModelConfig<'a> {
    pub technology: &'a Technology,
    pub plant_life: u32,
    pub plant_capacity_mtpy: f64,
    pub plant_capacity_factor: f64,
    pub production_mtpy: f64,
    /// $/kg hydrogen
    pub lcoh: f64,
    /// Electricity price by year ($/MWh); the first year sets the start of
    /// operation
    pub grid_prices: YearSchedule,
    pub feedstocks: &'a Feedstocks,
    pub costs: &'a dyn CostComponents,
    pub o2_heat_integration: bool,
    /// Breakeven parameters applied before the plant-specific ones
    pub financial_assumptions: IndexMap<String, Value>,
    pub install_years: u32,
    pub gen_inflation: f64,
    pub artifacts: ArtifactOptions,
}

impl<'a> FinanceModelConfig<'a> {
    fn validate(&self) -> Result<()> {
        if self.plant_life == 0 {
            return Err(LcoxError::Validation(
                "plant_life must be at least one year".to_string(),
            ));
        }
        if !(self.plant_capacity_factor.is_finite() && self.plant_capacity_factor > 0.0) {
            return Err(LcoxError::Validation(format!(
                "plant_capacity_factor must be positive, got {}",
                self.plant_capacity_factor
            )));
        }
        if !(self.lcoh.is_finite() && self.lcoh >= 0.0) {
            return Err(LcoxError::Validation(format!(
                "lcoh must be finite and non-negative, got {}",
                self.lcoh
            )));
        }
        if self.grid_prices.is_empty() {
            return Err(LcoxError::Config("grid_prices has no years".to_string()));
        }
        Ok(())
    }

    /// Assemble the breakeven problem for this plant.
    pub fn breakeven_problem(&self) -> Result<BreakevenProblem> {
        self.validate()?;
        let tech = self.technology;
        let costs = self.costs;
        let feedstocks = self.feedstocks;
        let inflation = self.gen_inflation;

        let mut params = FinancialParameters::default();
        for (key, value) in &self.financial_assumptions {
            params.set(key, value)?;
        }

        let first_year = self
            .grid_prices
            .first_year()
            .ok_or_else(|| LcoxError::Config("grid_prices has no years".to_string()))?;

        params.commodity = Commodity {
            name: tech.commodity_name.clone(),
            unit: tech.commodity_unit.clone(),
            initial_price: tech.initial_price_guess,
            escalation: inflation,
        };
        params.capacity_per_day = self.plant_capacity_mtpy / 365.0;
        params.maintenance = EscalatingValue::new(0.0, inflation);
        params.analysis_start_year = first_year - self.install_years as i32;
        params.operating_life = self.plant_life;
        params.installation_months = 12 * self.install_years;
        params.installation_cost = InstallationCost {
            value: costs.installation_cost(),
            depreciation: DepreciationMethod::StraightLine,
            depreciation_period: INSTALLATION_DEPRECIATION_PERIOD,
            depreciable: false,
        };
        params.non_depr_assets = costs.land_cost();
        params.end_of_proj_sale_non_depr_assets =
            costs.land_cost() * (1.0 + inflation).powi(self.plant_life as i32);
        params.demand_rampup = DEMAND_RAMPUP_YEARS;
        params.long_term_utilization = YearlyValue::Flat(self.plant_capacity_factor);
        params.credit_card_fees = 0.0;
        params.sales_tax = 0.0;
        params.license_and_permit = EscalatingValue::new(0.0, inflation);
        params.rent = EscalatingValue::new(0.0, inflation);
        params.property_tax_and_insurance = 0.0;
        params.admin_expense = 0.0;
        params.sell_undepreciated_cap = true;
        params.tax_losses_monetized = true;
        params.general_inflation_rate = inflation;
        params.debt_type = DebtType::RevolvingDebt;
        params.cash_onhand_months = 1.0;

        let mut problem = BreakevenProblem::new(params);

        for line in CapitalLine::all() {
            problem.add_capital_item(
                CapitalItem::new(line.to_string(), costs.capex(line))
                    .with_depreciation(DepreciationMethod::Macrs, CAPEX_MACRS_PERIOD)
                    .with_refurbishment(vec![0.0]),
            );
        }

        // Property tax and insurance does not escalate
        for (name, cost, is_property_tax) in costs.fixed_costs() {
            let escalation = if is_property_tax { 0.0 } else { inflation };
            problem.add_fixed_cost(FixedCost::new(name, cost, escalation));
        }

        for line in &tech.feedstock_schema {
            let (usage, cost) = self.feedstock_terms(*line);
            problem.add_feedstock(FeedstockItem::new(
                line.to_string(),
                usage,
                line.unit(&tech.product),
                cost,
                inflation,
            ));
        }

        problem.add_coproduct(FeedstockItem::new(
            "Oxygen sales",
            feedstocks.excess_oxygen,
            format!("kg O2 per metric tonne of {}", tech.product),
            feedstocks.oxygen_market_price,
            inflation,
        ));

        Ok(problem)
    }

    fn feedstock_terms(&self, line: FeedstockLine) -> (f64, YearlyValue) {
        let f = self.feedstocks;
        match line {
            FeedstockLine::MaintenanceMaterials => (1.0, f.maintenance_materials_unitcost.into()),
            FeedstockLine::RawWater => (f.raw_water_consumption, f.raw_water_unitcost.into()),
            FeedstockLine::Lime => (f.lime_consumption, f.lime_unitcost.into()),
            FeedstockLine::Carbon => (f.carbon_consumption, f.carbon_unitcost.into()),
            FeedstockLine::IronOre => (f.iron_ore_consumption, f.iron_ore_pellet_unitcost.into()),
            FeedstockLine::Hydrogen => (
                f.hydrogen_consumption,
                (self.lcoh * self.technology.supply_units_per_tonne).into(),
            ),
            FeedstockLine::NaturalGas => (
                f.natural_gas_consumption,
                f.natural_gas_prices.clone().into(),
            ),
            FeedstockLine::Electricity => {
                (f.electricity_consumption, self.grid_prices.clone().into())
            }
            FeedstockLine::SlagDisposal => (f.slag_production, f.slag_disposal_unitcost.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinanceModelOutputs {
    pub sol: IndexMap<String, f64>,
    pub summary: IndexMap<String, f64>,
    pub price_breakdown: Vec<PriceBreakdownRow>,
    pub cash_flow: CashFlowTable,
}

impl FinanceModelOutputs {
    /// Breakeven commodity price, $/tonne.
    pub fn price(&self) -> Option<f64> {
        self.sol.get("price").copied()
    }
}

/// Solve for the breakeven commodity price and write artifacts when asked.
pub fn solve_breakeven(
    config: &FinanceModelConfig<'_>,
    solver: &dyn BreakevenSolver,
) -> Result<FinanceModelOutputs> {
    let problem = config.breakeven_problem()?;
    let solution = solver.solve(&problem)?;

    if !solution.sol.contains_key("price") {
        warn!(technology = %config.technology.kind, "solver solution has no price");
    }

    if config.artifacts.enabled() {
        write_finance_artifacts(
            &config.artifacts,
            &config.technology.artifact_stem(),
            &problem,
            &solution,
        )?;
    }

    info!(
        technology = %config.technology.kind,
        production_mtpy = config.production_mtpy,
        price = solution.price(),
        "breakeven price solved"
    );

    Ok(FinanceModelOutputs {
        sol: solution.sol,
        summary: solution.summary,
        price_breakdown: solution.price_breakdown,
        cash_flow: solution.cash_flow,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakeven::CashFlowSolver;
    use crate::pipeline::{estimate_costs, CostModelConfig, Costs};
    use serde_json::json;

    fn finance<'a>(
        tech: &'a Technology,
        feedstocks: &'a Feedstocks,
        costs: &'a dyn CostComponents,
    ) -> FinanceModelConfig<'a> {
        FinanceModelConfig {
            technology: tech,
            plant_life: 25,
            plant_capacity_mtpy: 1.0e5 / 0.9,
            plant_capacity_factor: 0.9,
            production_mtpy: 1.0e5,
            lcoh: 4.0,
            grid_prices: YearSchedule::flat(2035, 1, 50.0),
            feedstocks,
            costs,
            o2_heat_integration: true,
            financial_assumptions: IndexMap::new(),
            install_years: 3,
            gen_inflation: 0.0,
            artifacts: ArtifactOptions::default(),
        }
    }

    #[test]
    fn test_problem_layout() {
        let tech = Technology::iron_ore();
        let feedstocks = Feedstocks::new(YearSchedule::flat(2035, 1, 4.0));
        let costs = Costs {
            capex_piping: 1.0e6,
            land_cost: 10.0,
            ..Default::default()
        };
        let problem = finance(&tech, &feedstocks, &costs).breakeven_problem().unwrap();

        assert_eq!(problem.params.analysis_start_year, 2032);
        assert_eq!(problem.params.installation_months, 36);
        assert_eq!(problem.params.commodity.name, "iron ore");
        assert_eq!(problem.capital_items.len(), 9);
        assert_eq!(problem.capital_items[5].name, "Piping");
        assert_eq!(problem.fixed_costs.len(), 4);
        assert_eq!(problem.feedstocks.len(), 9);
        assert_eq!(problem.coproducts.len(), 1);
        assert_eq!(problem.coproducts[0].name, "Oxygen sales");

        let hydrogen = problem.feedstocks.iter().find(|f| f.name == "Hydrogen").unwrap();
        assert_eq!(hydrogen.cost.value_for(2040), Some(4000.0));
    }

    #[test]
    fn test_explicit_parameters_override_assumptions() {
        let tech = Technology::iron_ore();
        let feedstocks = Feedstocks::new(YearSchedule::flat(2035, 1, 4.0));
        let costs = Costs::default();
        let mut config = finance(&tech, &feedstocks, &costs);
        config
            .financial_assumptions
            .insert("total income tax rate".to_string(), json!(0.3));
        config
            .financial_assumptions
            .insert("operating life".to_string(), json!(99));
        let problem = config.breakeven_problem().unwrap();

        assert_eq!(problem.params.total_income_tax_rate, 0.3);
        assert_eq!(problem.params.operating_life, 25);
    }

    #[test]
    fn test_unknown_assumption_fails() {
        let tech = Technology::iron_ore();
        let feedstocks = Feedstocks::new(YearSchedule::flat(2035, 1, 4.0));
        let costs = Costs::default();
        let mut config = finance(&tech, &feedstocks, &costs);
        config
            .financial_assumptions
            .insert("hurdle".to_string(), json!(0.3));
        assert_eq!(config.breakeven_problem().unwrap_err().kind(), "solver");
    }

    #[test]
    fn test_property_tax_not_escalated() {
        let tech = Technology::iron_ore();
        let feedstocks = Feedstocks::new(YearSchedule::flat(2035, 1, 4.0));
        let costs = Costs::default();
        let mut config = finance(&tech, &feedstocks, &costs);
        config.gen_inflation = 0.025;
        let problem = config.breakeven_problem().unwrap();

        for cost in &problem.fixed_costs {
            let expected = if cost.name == "Property tax and insurance" { 0.0 } else { 0.025 };
            assert_eq!(cost.escalation, expected, "{}", cost.name);
        }
    }

    #[test]
    fn test_solve_with_estimated_costs() {
        let tech = Technology::iron_ore();
        let feedstocks = Feedstocks::new(YearSchedule::flat(2035, 1, 4.0));
        let costs = estimate_costs(&CostModelConfig::new(&tech, &feedstocks, 2035, 1.0e5 / 0.9, 4.0))
            .unwrap();
        let outputs = solve_breakeven(&finance(&tech, &feedstocks, &costs), &CashFlowSolver::default())
            .unwrap();

        let price = outputs.price().unwrap();
        assert!(price.is_finite() && price > 0.0);
        assert!(outputs.price_breakdown.iter().any(|r| r.name == "Hydrogen"));
    }
}
