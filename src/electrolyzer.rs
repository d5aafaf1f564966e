//! Hydrogen-plant breakeven inputs derived from pre-computed electrolyzer
//! performance schedules.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::breakeven::{CapitalItem, FeedstockItem, FinancialParameters};
use crate::domain::{YearSchedule, YearlyValue};
use crate::error::{LcoxError, Result};

const HOURS_PER_YEAR: f64 = 8760.0;

/// One operating year of simulated electrolyzer performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceYear {
    #[serde(rename = "Capacity Factor [-]")]
    pub capacity_factor: f64,
    #[serde(rename = "Annual Energy Used [kWh/year]")]
    pub annual_energy_used_kwh: f64,
    #[serde(rename = "Annual Average Efficiency [kWh/kg]")]
    pub efficiency_kwh_per_kg: f64,
    #[serde(rename = "Annual H2 Production [kg/year]")]
    pub h2_production_kg: f64,
    #[serde(rename = "Refurbishment Schedule [MW replaced/year]", default)]
    pub mw_replaced: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectrolyzerPerformance {
    #[serde(rename = "system capacity [kW]")]
    pub system_capacity_kw: f64,
    #[serde(rename = "Rated BOL: H2 Production [kg/hr]")]
    pub rated_h2_kg_per_hour: f64,
    #[serde(rename = "Rated BOL: Gal H2O per kg-H2")]
    pub water_gal_per_kg: f64,
    #[serde(rename = "Time Until Replacement [hrs]")]
    pub hours_until_replacement: f64,
    #[serde(rename = "Performance Schedules")]
    pub schedules: Vec<PerformanceYear>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ElectrolyzerFinanceConfig {
    /// Share of the electrolyzer capex spent per full stack replacement
    #[validate(range(min = 0.0))]
    pub replacement_cost_percent: f64,
    /// Replace stacks as they reach end of life instead of all at once
    #[serde(default)]
    pub complex_refurb: bool,
    /// $/kWh
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub var_om: Option<f64>,
}

/// Calendar years of operation: construction ends `installation_months`
/// after the analysis start year.
pub fn years_of_operation(
    lifetime_years: usize,
    analysis_start_year: i32,
    installation_months: u32,
) -> Vec<i32> {
    let first = analysis_start_year + (installation_months as f64 / 12.0).round() as i32;
    (0..lifetime_years as i32).map(|i| first + i).collect()
}

/// Every stack replaced together once per replacement interval.
pub fn simple_replacement_schedule(
    lifetime_years: usize,
    hours_until_replacement: f64,
) -> Result<Vec<f64>> {
    let period = (hours_until_replacement / HOURS_PER_YEAR).round();
    if !(period.is_finite() && period >= 1.0) {
        return Err(LcoxError::Validation(format!(
            "stack life of {} hours is shorter than half a year",
            hours_until_replacement
        )));
    }
    let period = period as usize;
    let mut schedule = vec![0.0; lifetime_years];
    for year in (period..lifetime_years).step_by(period) {
        schedule[year] = 1.0;
    }
    Ok(schedule)
}

/// Fraction of the system replaced in each year.
pub fn complex_replacement_schedule(performance: &ElectrolyzerPerformance) -> Result<Vec<f64>> {
    let system_mw = performance.system_capacity_kw / 1e3;
    if system_mw <= 0.0 {
        return Err(LcoxError::Validation(
            "electrolyzer system capacity must be positive".to_string(),
        ));
    }
    Ok(performance
        .schedules
        .iter()
        .map(|year| year.mw_replaced / system_mw)
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElectrolyzerLcohInputs {
    pub capacity_kw: f64,
    pub project_lifetime_years: usize,
    pub analysis_start_year: i32,
    pub installation_months: u32,
    /// Capacity factor by year of operation
    pub long_term_utilization: YearSchedule,
    pub rated_capacity_kg_per_day: f64,
    pub water_usage_gal_per_kg: f64,
    pub annual_energy_kwh: Vec<f64>,
    pub efficiency_kwh_per_kg: Vec<f64>,
    pub annual_h2_production_kg: Vec<f64>,
    pub replacement_schedule: Vec<f64>,
    /// Replacement schedule scaled by the replacement cost share
    pub refurb_cost_percent: Vec<f64>,
    /// Variable O&M, $/kg by year of operation
    pub variable_om: YearlyValue,
}

impl ElectrolyzerLcohInputs {
    pub fn new(
        performance: &ElectrolyzerPerformance,
        config: &ElectrolyzerFinanceConfig,
        analysis_start_year: i32,
        installation_months: Option<u32>,
    ) -> Result<Self> {
        config.validate()?;
        let installation_months = installation_months.unwrap_or(36);
        let lifetime = performance.schedules.len();
        if lifetime == 0 {
            return Err(LcoxError::Validation(
                "electrolyzer performance has no operating years".to_string(),
            ));
        }
        let years = years_of_operation(lifetime, analysis_start_year, installation_months);

        let replacement_schedule = if config.complex_refurb {
            complex_replacement_schedule(performance)?
        } else {
            simple_replacement_schedule(lifetime, performance.hours_until_replacement)?
        };
        let refurb_cost_percent = replacement_schedule
            .iter()
            .map(|r| r * config.replacement_cost_percent)
            .collect();

        let column = |f: fn(&PerformanceYear) -> f64| -> Vec<f64> {
            performance.schedules.iter().map(f).collect()
        };
        let efficiency = column(|y| y.efficiency_kwh_per_kg);

        let variable_om = match config.var_om {
            Some(var_om) => YearlyValue::Schedule(
                years
                    .iter()
                    .zip(&efficiency)
                    .map(|(year, eff)| (*year, var_om * eff))
                    .collect(),
            ),
            None => YearlyValue::Flat(0.0),
        };

        Ok(Self {
            capacity_kw: performance.system_capacity_kw,
            project_lifetime_years: lifetime,
            analysis_start_year,
            installation_months,
            long_term_utilization: years
                .iter()
                .copied()
                .zip(column(|y| y.capacity_factor))
                .collect(),
            rated_capacity_kg_per_day: performance.rated_h2_kg_per_hour * 24.0,
            water_usage_gal_per_kg: performance.water_gal_per_kg,
            annual_energy_kwh: column(|y| y.annual_energy_used_kwh),
            efficiency_kwh_per_kg: efficiency,
            annual_h2_production_kg: column(|y| y.h2_production_kg),
            replacement_schedule,
            refurb_cost_percent,
            variable_om,
        })
    }

    /// Set capacity, timeline and utilization on a hydrogen breakeven.
    pub fn apply_to(&self, params: &mut FinancialParameters) {
        params.capacity_per_day = self.rated_capacity_kg_per_day;
        params.analysis_start_year = self.analysis_start_year;
        params.installation_months = self.installation_months;
        params.operating_life = self.project_lifetime_years as u32;
        params.long_term_utilization = YearlyValue::Schedule(self.long_term_utilization.clone());
    }

    /// Electrolyzer system capital with its stack replacement schedule.
    pub fn capital_item(&self, cost: f64) -> CapitalItem {
        CapitalItem::new("Electrolysis system", cost)
            .with_refurbishment(self.refurb_cost_percent.clone())
    }

    pub fn variable_om_feedstock(&self, escalation: f64) -> FeedstockItem {
        FeedstockItem::new("Var O&M", 1.0, "$/kg", self.variable_om.clone(), escalation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakeven::{BreakevenProblem, BreakevenSolver, CashFlowSolver};

    fn performance(years: usize) -> ElectrolyzerPerformance {
        ElectrolyzerPerformance {
            system_capacity_kw: 100_000.0,
            rated_h2_kg_per_hour: 1800.0,
            water_gal_per_kg: 3.8,
            hours_until_replacement: 80_000.0,
            schedules: (0..years)
                .map(|i| PerformanceYear {
                    capacity_factor: 0.5,
                    annual_energy_used_kwh: 4.4e8,
                    efficiency_kwh_per_kg: 54.0 + i as f64 * 0.1,
                    h2_production_kg: 8.0e6,
                    mw_replaced: if i == 10 { 25.0 } else { 0.0 },
                })
                .collect(),
        }
    }

    fn config(complex_refurb: bool) -> ElectrolyzerFinanceConfig {
        ElectrolyzerFinanceConfig {
            replacement_cost_percent: 0.15,
            complex_refurb,
            var_om: Some(0.0013),
        }
    }

    #[test]
    fn test_years_of_operation() {
        assert_eq!(years_of_operation(3, 2030, 36), vec![2033, 2034, 2035]);
        assert_eq!(years_of_operation(2, 2030, 0), vec![2030, 2031]);
    }

    #[test]
    fn test_simple_schedule() {
        // 80,000 h rounds to 9 years
        let schedule = simple_replacement_schedule(30, 80_000.0).unwrap();
        let replaced: Vec<usize> = schedule
            .iter()
            .enumerate()
            .filter(|(_, r)| **r == 1.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(replaced, vec![9, 18, 27]);
        assert!(simple_replacement_schedule(30, 1000.0).is_err());
    }

    #[test]
    fn test_complex_schedule_and_refurb_cost() {
        let inputs =
            ElectrolyzerLcohInputs::new(&performance(30), &config(true), 2030, None).unwrap();
        assert!((inputs.replacement_schedule[10] - 0.25).abs() < 1e-12);
        assert!((inputs.refurb_cost_percent[10] - 0.25 * 0.15).abs() < 1e-12);
        assert_eq!(inputs.refurb_cost_percent[9], 0.0);
    }

    #[test]
    fn test_inputs_from_performance() {
        let inputs =
            ElectrolyzerLcohInputs::new(&performance(20), &config(false), 2030, Some(24)).unwrap();
        assert_eq!(inputs.rated_capacity_kg_per_day, 1800.0 * 24.0);
        assert_eq!(inputs.long_term_utilization.first_year(), Some(2032));
        assert_eq!(inputs.long_term_utilization.len(), 20);
        assert!((inputs.variable_om.value_for(2032).unwrap() - 0.0013 * 54.0).abs() < 1e-12);
    }

    #[test]
    fn test_variable_om_absent_is_zero() {
        let cfg = ElectrolyzerFinanceConfig {
            var_om: None,
            ..config(false)
        };
        let inputs = ElectrolyzerLcohInputs::new(&performance(5), &cfg, 2030, None).unwrap();
        assert_eq!(inputs.variable_om, YearlyValue::Flat(0.0));
    }

    #[test]
    fn test_hydrogen_breakeven_from_inputs() {
        let inputs =
            ElectrolyzerLcohInputs::new(&performance(30), &config(false), 2030, None).unwrap();
        let mut params = FinancialParameters::default();
        inputs.apply_to(&mut params);
        let mut problem = BreakevenProblem::new(params);
        problem.add_capital_item(inputs.capital_item(1.0e8));
        problem.add_feedstock(inputs.variable_om_feedstock(0.0));

        let solution = CashFlowSolver::default().solve(&problem).unwrap();
        assert!(solution.price() > 0.0);
        assert_eq!(problem.capital_items[0].refurbishment_at(9), 0.15);
    }
}
