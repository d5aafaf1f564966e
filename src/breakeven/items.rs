use serde::{Deserialize, Serialize};

use super::{DepreciationMethod, FinancialParameters, SolverError};
use crate::domain::YearlyValue;

/// Depreciable asset bought during construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalItem {
    pub name: String,
    pub cost: f64,
    pub depreciation: DepreciationMethod,
    pub depreciation_period: u32,
    /// Fraction of `cost` spent again in each operating year (index 0 is
    /// the first operating year). Shorter than the life means zero after.
    #[serde(default)]
    pub refurbishment: Vec<f64>,
}

impl CapitalItem {
    pub fn new(name: impl Into<String>, cost: f64) -> Self {
        Self {
            name: name.into(),
            cost,
            depreciation: DepreciationMethod::Macrs,
            depreciation_period: 7,
            refurbishment: Vec::new(),
        }
    }

    pub fn with_depreciation(mut self, method: DepreciationMethod, period: u32) -> Self {
        self.depreciation = method;
        self.depreciation_period = period;
        self
    }

    pub fn with_refurbishment(mut self, refurbishment: Vec<f64>) -> Self {
        self.refurbishment = refurbishment;
        self
    }

    /// Refurbishment fraction for operating year `op_year` (0-based).
    pub fn refurbishment_at(&self, op_year: usize) -> f64 {
        self.refurbishment.get(op_year).copied().unwrap_or(0.0)
    }
}

/// Annual cost independent of output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedCost {
    pub name: String,
    pub usage: f64,
    pub unit: String,
    pub cost: f64,
    pub escalation: f64,
}

impl FixedCost {
    pub fn new(name: impl Into<String>, cost: f64, escalation: f64) -> Self {
        Self {
            name: name.into(),
            usage: 1.0,
            unit: "$/year".to_string(),
            cost,
            escalation,
        }
    }
}

/// Input (or, as a co-product, output) proportional to production.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedstockItem {
    pub name: String,
    /// Units of this item per unit of commodity
    pub usage: f64,
    pub unit: String,
    /// $ per unit, constant or by calendar year
    pub cost: YearlyValue,
    pub escalation: f64,
}

impl FeedstockItem {
    pub fn new(
        name: impl Into<String>,
        usage: f64,
        unit: impl Into<String>,
        cost: impl Into<YearlyValue>,
        escalation: f64,
    ) -> Self {
        Self {
            name: name.into(),
            usage,
            unit: unit.into(),
            cost: cost.into(),
            escalation,
        }
    }

    pub fn unit_cost(&self, year: i32) -> Result<f64, SolverError> {
        self.cost.value_for(year).ok_or_else(|| {
            SolverError::InvalidParameter(format!("`{}` has an empty cost schedule", self.name))
        })
    }
}

/// Everything a breakeven solve needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakevenProblem {
    pub params: FinancialParameters,
    pub capital_items: Vec<CapitalItem>,
    pub fixed_costs: Vec<FixedCost>,
    pub feedstocks: Vec<FeedstockItem>,
    pub coproducts: Vec<FeedstockItem>,
}

impl BreakevenProblem {
    pub fn new(params: FinancialParameters) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    pub fn add_capital_item(&mut self, item: CapitalItem) {
        self.capital_items.push(item);
    }

    pub fn add_fixed_cost(&mut self, cost: FixedCost) {
        self.fixed_costs.push(cost);
    }

    pub fn add_feedstock(&mut self, feedstock: FeedstockItem) {
        self.feedstocks.push(feedstock);
    }

    pub fn add_coproduct(&mut self, coproduct: FeedstockItem) {
        self.coproducts.push(coproduct);
    }

    pub fn validate(&self) -> Result<(), SolverError> {
        self.params.validate()?;

        for item in &self.capital_items {
            if !item.cost.is_finite() || item.refurbishment.iter().any(|f| !f.is_finite()) {
                return Err(SolverError::InvalidParameter(format!(
                    "capital item `{}` has a non-finite cost",
                    item.name
                )));
            }
            item.depreciation.schedule(item.depreciation_period)?;
        }
        for cost in &self.fixed_costs {
            if !(cost.cost * cost.usage).is_finite() {
                return Err(SolverError::InvalidParameter(format!(
                    "fixed cost `{}` is not finite",
                    cost.name
                )));
            }
        }
        for item in self.feedstocks.iter().chain(&self.coproducts) {
            if !item.usage.is_finite() || !item.cost.is_finite() {
                return Err(SolverError::InvalidParameter(format!(
                    "feedstock `{}` has a non-finite usage or cost",
                    item.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::YearSchedule;

    #[test]
    fn test_refurbishment_defaults_to_zero_past_schedule() {
        let item = CapitalItem::new("Stack", 10.0).with_refurbishment(vec![0.0, 0.5]);
        assert_eq!(item.refurbishment_at(1), 0.5);
        assert_eq!(item.refurbishment_at(7), 0.0);
    }

    #[test]
    fn test_feedstock_cost_lookup() {
        let schedule: YearSchedule = [(2030, 40.0), (2035, 50.0)].into_iter().collect();
        let item = FeedstockItem::new("Electricity", 0.55, "MWh", schedule, 0.0);
        assert_eq!(item.unit_cost(2031).unwrap(), 40.0);
        assert_eq!(item.unit_cost(2050).unwrap(), 50.0);

        let empty = FeedstockItem::new("Gas", 1.0, "GJ", YearSchedule::new(), 0.0);
        assert!(empty.unit_cost(2030).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_depreciation_period() {
        let mut problem = BreakevenProblem::new(FinancialParameters::default());
        problem.add_capital_item(
            CapitalItem::new("Furnace", 1.0).with_depreciation(DepreciationMethod::Macrs, 9),
        );
        assert!(problem.validate().is_err());
    }
}
