use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use super::{DepreciationMethod, SolverError};
use crate::domain::YearlyValue;

/// Commodity whose breakeven price is solved for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commodity {
    pub name: String,
    pub unit: String,
    #[serde(rename = "initial price")]
    pub initial_price: f64,
    #[serde(default)]
    pub escalation: f64,
}

impl Default for Commodity {
    fn default() -> Self {
        Self {
            name: "commodity".to_string(),
            unit: "units".to_string(),
            initial_price: 100.0,
            escalation: 0.0,
        }
    }
}

/// Annual amount escalated from the analysis start year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EscalatingValue {
    pub value: f64,
    #[serde(default)]
    pub escalation: f64,
}

impl EscalatingValue {
    pub fn new(value: f64, escalation: f64) -> Self {
        Self { value, escalation }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationCost {
    pub value: f64,
    #[serde(rename = "depr type")]
    pub depreciation: DepreciationMethod,
    #[serde(rename = "depr period")]
    pub depreciation_period: u32,
    pub depreciable: bool,
}

impl Default for InstallationCost {
    fn default() -> Self {
        Self {
            value: 0.0,
            depreciation: DepreciationMethod::StraightLine,
            depreciation_period: 4,
            depreciable: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum DebtType {
    /// Debt held at a fixed share of the undepreciated asset base
    #[strum(serialize = "Revolving debt")]
    #[serde(rename = "Revolving debt")]
    RevolvingDebt,
    /// Single loan drawn during construction and amortized
    #[strum(serialize = "One time loan")]
    #[serde(rename = "One time loan")]
    OneTimeLoan,
}

/// Global inputs of a breakeven problem. Every field can be set by its
/// conventional name through [`FinancialParameters::set`], which is how
/// free-form overrides from configuration are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialParameters {
    pub commodity: Commodity,
    /// Nameplate output, units per day
    pub capacity_per_day: f64,
    pub maintenance: EscalatingValue,
    pub analysis_start_year: i32,
    pub operating_life: u32,
    pub installation_months: u32,
    pub installation_cost: InstallationCost,
    /// Land and other assets that are not depreciated
    pub non_depr_assets: f64,
    pub end_of_proj_sale_non_depr_assets: f64,
    /// Years until demand reaches long-term utilization
    pub demand_rampup: f64,
    pub long_term_utilization: YearlyValue,
    /// Fraction of sales
    pub credit_card_fees: f64,
    /// Fraction of sales
    pub sales_tax: f64,
    pub license_and_permit: EscalatingValue,
    pub rent: EscalatingValue,
    /// Fraction of depreciable capital per year
    pub property_tax_and_insurance: f64,
    /// Fraction of sales
    pub admin_expense: f64,
    pub sell_undepreciated_cap: bool,
    pub tax_losses_monetized: bool,
    pub general_inflation_rate: f64,
    pub debt_type: DebtType,
    /// Months of operating expenses held as working capital
    pub cash_onhand_months: f64,
    pub leverage_after_tax_nominal_discount_rate: f64,
    pub total_income_tax_rate: f64,
    pub capital_gains_tax_rate: f64,
    pub debt_equity_ratio_of_initial_financing: f64,
    pub debt_interest_rate: f64,
    pub loan_period_if_used: u32,
    pub incidental_revenue: EscalatingValue,
}

impl Default for FinancialParameters {
    fn default() -> Self {
        Self {
            commodity: Commodity::default(),
            capacity_per_day: 0.0,
            maintenance: EscalatingValue::default(),
            analysis_start_year: 2030,
            operating_life: 30,
            installation_months: 36,
            installation_cost: InstallationCost::default(),
            non_depr_assets: 0.0,
            end_of_proj_sale_non_depr_assets: 0.0,
            demand_rampup: 0.0,
            long_term_utilization: YearlyValue::Flat(1.0),
            credit_card_fees: 0.0,
            sales_tax: 0.0,
            license_and_permit: EscalatingValue::default(),
            rent: EscalatingValue::default(),
            property_tax_and_insurance: 0.0,
            admin_expense: 0.0,
            sell_undepreciated_cap: true,
            tax_losses_monetized: true,
            general_inflation_rate: 0.0,
            debt_type: DebtType::RevolvingDebt,
            cash_onhand_months: 1.0,
            leverage_after_tax_nominal_discount_rate: 0.10,
            total_income_tax_rate: 0.2574,
            capital_gains_tax_rate: 0.15,
            debt_equity_ratio_of_initial_financing: 1.5,
            debt_interest_rate: 0.037,
            loan_period_if_used: 10,
            incidental_revenue: EscalatingValue::default(),
        }
    }
}

impl FinancialParameters {
    /// Set a parameter by its conventional name.
    pub fn set(&mut self, key: &str, value: &Value) -> Result<(), SolverError> {
        match key {
            "commodity" => self.commodity = parse(key, value)?,
            "capacity" => self.capacity_per_day = number(key, value)?,
            "maintenance" => self.maintenance = parse(key, value)?,
            "analysis start year" => self.analysis_start_year = integer(key, value)? as i32,
            "operating life" => self.operating_life = unsigned(key, value)?,
            "installation months" => self.installation_months = unsigned(key, value)?,
            "installation cost" => self.installation_cost = parse(key, value)?,
            "non depr assets" => self.non_depr_assets = number(key, value)?,
            "end of proj sale non depr assets" => {
                self.end_of_proj_sale_non_depr_assets = number(key, value)?
            }
            "demand rampup" => self.demand_rampup = number(key, value)?,
            "long term utilization" => self.long_term_utilization = parse(key, value)?,
            "credit card fees" => self.credit_card_fees = number(key, value)?,
            "sales tax" => self.sales_tax = number(key, value)?,
            "license and permit" => self.license_and_permit = parse(key, value)?,
            "rent" => self.rent = parse(key, value)?,
            "property tax and insurance" => self.property_tax_and_insurance = number(key, value)?,
            "admin expense" => self.admin_expense = number(key, value)?,
            "sell undepreciated cap" => self.sell_undepreciated_cap = boolean(key, value)?,
            "tax losses monetized" => self.tax_losses_monetized = boolean(key, value)?,
            "general inflation rate" => self.general_inflation_rate = number(key, value)?,
            "debt type" => self.debt_type = parse(key, value)?,
            "cash onhand" => self.cash_onhand_months = number(key, value)?,
            "leverage after tax nominal discount rate" => {
                self.leverage_after_tax_nominal_discount_rate = number(key, value)?
            }
            "total income tax rate" => self.total_income_tax_rate = number(key, value)?,
            "capital gains tax rate" => self.capital_gains_tax_rate = number(key, value)?,
            "debt equity ratio of initial financing" => {
                self.debt_equity_ratio_of_initial_financing = number(key, value)?
            }
            "debt interest rate" => self.debt_interest_rate = number(key, value)?,
            "loan period if used" => self.loan_period_if_used = unsigned(key, value)?,
            "incidental revenue" => self.incidental_revenue = parse(key, value)?,
            other => {
                return Err(SolverError::InvalidParameter(format!(
                    "unknown parameter `{}`",
                    other
                )))
            }
        }
        Ok(())
    }

    /// Share of initial financing carried as debt.
    pub fn debt_fraction(&self) -> f64 {
        let ratio = self.debt_equity_ratio_of_initial_financing;
        ratio / (1.0 + ratio)
    }

    /// Whole construction years implied by the installation period.
    pub fn construction_years(&self) -> usize {
        (self.installation_months as f64 / 12.0).ceil() as usize
    }

    pub fn validate(&self) -> Result<(), SolverError> {
        let finite = [
            ("capacity", self.capacity_per_day),
            ("demand rampup", self.demand_rampup),
            ("general inflation rate", self.general_inflation_rate),
            (
                "leverage after tax nominal discount rate",
                self.leverage_after_tax_nominal_discount_rate,
            ),
            ("total income tax rate", self.total_income_tax_rate),
            ("debt interest rate", self.debt_interest_rate),
            ("non depr assets", self.non_depr_assets),
            ("installation cost", self.installation_cost.value),
        ];
        if let Some((name, v)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SolverError::InvalidParameter(format!(
                "{} is not finite: {}",
                name, v
            )));
        }
        if self.operating_life == 0 {
            return Err(SolverError::InvalidParameter(
                "operating life must be at least one year".to_string(),
            ));
        }
        if self.capacity_per_day < 0.0 {
            return Err(SolverError::InvalidParameter(format!(
                "capacity must be non-negative, got {}",
                self.capacity_per_day
            )));
        }
        if self.leverage_after_tax_nominal_discount_rate <= -1.0 {
            return Err(SolverError::InvalidParameter(
                "discount rate must be greater than -100%".to_string(),
            ));
        }
        if self.debt_equity_ratio_of_initial_financing < 0.0 {
            return Err(SolverError::InvalidParameter(
                "debt equity ratio must be non-negative".to_string(),
            ));
        }
        if !self.long_term_utilization.is_finite() {
            return Err(SolverError::InvalidParameter(
                "long term utilization must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse<T: serde::de::DeserializeOwned>(key: &str, value: &Value) -> Result<T, SolverError> {
    serde_json::from_value(value.clone())
        .map_err(|e| SolverError::InvalidParameter(format!("`{}`: {}", key, e)))
}

fn number(key: &str, value: &Value) -> Result<f64, SolverError> {
    value
        .as_f64()
        .ok_or_else(|| SolverError::InvalidParameter(format!("`{}` expects a number", key)))
}

fn integer(key: &str, value: &Value) -> Result<i64, SolverError> {
    match value.as_i64() {
        Some(v) => Ok(v),
        // Accept 2030.0 from loosely typed config files
        None => match value.as_f64() {
            Some(v) if v.fract() == 0.0 => Ok(v as i64),
            _ => Err(SolverError::InvalidParameter(format!(
                "`{}` expects an integer",
                key
            ))),
        },
    }
}

fn unsigned(key: &str, value: &Value) -> Result<u32, SolverError> {
    let v = integer(key, value)?;
    u32::try_from(v)
        .map_err(|_| SolverError::InvalidParameter(format!("`{}` must be non-negative", key)))
}

fn boolean(key: &str, value: &Value) -> Result<bool, SolverError> {
    value
        .as_bool()
        .ok_or_else(|| SolverError::InvalidParameter(format!("`{}` expects true or false", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_known_parameters() {
        let mut params = FinancialParameters::default();
        params
            .set(
                "commodity",
                &json!({"name": "iron ore", "unit": "metric tonnes", "initial price": 1000, "escalation": 0.02}),
            )
            .unwrap();
        params.set("analysis start year", &json!(2032)).unwrap();
        params.set("debt type", &json!("One time loan")).unwrap();
        params
            .set(
                "installation cost",
                &json!({"value": 5.0, "depr type": "Straight line", "depr period": 4, "depreciable": false}),
            )
            .unwrap();
        params.set("long term utilization", &json!({"2035": 0.8})).unwrap();

        assert_eq!(params.commodity.initial_price, 1000.0);
        assert_eq!(params.analysis_start_year, 2032);
        assert_eq!(params.debt_type, DebtType::OneTimeLoan);
        assert_eq!(params.installation_cost.value, 5.0);
        assert_eq!(params.long_term_utilization.value_for(2040), Some(0.8));
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let mut params = FinancialParameters::default();
        let err = params.set("hurdle rate", &json!(0.1)).unwrap_err();
        assert!(matches!(err, SolverError::InvalidParameter(_)));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut params = FinancialParameters::default();
        assert!(params.set("sell undepreciated cap", &json!(1.0)).is_err());
        assert!(params.set("operating life", &json!(-3)).is_err());
        assert!(params.set("capacity", &json!("lots")).is_err());
    }

    #[test]
    fn test_debt_fraction() {
        let params = FinancialParameters {
            debt_equity_ratio_of_initial_financing: 1.0,
            ..Default::default()
        };
        assert!((params.debt_fraction() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_zero_life() {
        let params = FinancialParameters {
            operating_life: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
