use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::YearSchedule;

/// Consumption rates and unit costs of everything a downstream iron plant
/// consumes or sells, per metric tonne of product.
///
/// Built once per run and shared by reference with the capacity, cost and
/// finance stages so all three price the same inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Feedstocks {
    /// Natural gas cost by year ($/GJ)
    #[validate(custom(function = "validate_schedule"))]
    pub natural_gas_prices: YearSchedule,
    /// Excess oxygen produced (kg O2 per tonne)
    #[validate(range(min = 0.0))]
    pub excess_oxygen: f64,
    /// $/tonne of lime
    #[validate(range(min = 0.0))]
    pub lime_unitcost: f64,
    /// $/tonne of carbon
    #[validate(range(min = 0.0))]
    pub carbon_unitcost: f64,
    /// $/MWh used for the monthly energy owner's cost
    #[validate(range(min = 0.0))]
    pub electricity_cost: f64,
    /// $/tonne of iron ore pellets
    #[validate(range(min = 0.0))]
    pub iron_ore_pellet_unitcost: f64,
    /// $/kg O2
    #[validate(range(min = 0.0))]
    pub oxygen_market_price: f64,
    /// $/tonne of raw water
    #[validate(range(min = 0.0))]
    pub raw_water_unitcost: f64,
    #[validate(range(min = 0.0))]
    pub iron_ore_consumption: f64,
    #[validate(range(min = 0.0))]
    pub raw_water_consumption: f64,
    #[validate(range(min = 0.0))]
    pub lime_consumption: f64,
    #[validate(range(min = 0.0))]
    pub carbon_consumption: f64,
    /// Tonnes of hydrogen per tonne of product; also drives capacity sizing
    #[validate(range(exclusive_min = 0.0))]
    pub hydrogen_consumption: f64,
    /// GJ-LHV per tonne
    #[validate(range(min = 0.0))]
    pub natural_gas_consumption: f64,
    /// MWh per tonne
    #[validate(range(min = 0.0))]
    pub electricity_consumption: f64,
    #[validate(range(min = 0.0))]
    pub slag_disposal_unitcost: f64,
    #[validate(range(min = 0.0))]
    pub slag_production: f64,
    /// $/tonne of annual production at the real capacity factor
    #[validate(range(min = 0.0))]
    pub maintenance_materials_unitcost: f64,
}

impl Default for Feedstocks {
    fn default() -> Self {
        Self {
            natural_gas_prices: YearSchedule::new(),
            excess_oxygen: 395.0,
            lime_unitcost: 122.1,
            carbon_unitcost: 236.97,
            electricity_cost: 48.92,
            iron_ore_pellet_unitcost: 207.35,
            oxygen_market_price: 0.03,
            raw_water_unitcost: 0.59289,
            iron_ore_consumption: 1.62927,
            raw_water_consumption: 0.80367,
            lime_consumption: 0.01812,
            carbon_consumption: 0.0538,
            hydrogen_consumption: 0.06596,
            natural_gas_consumption: 0.71657,
            electricity_consumption: 0.5502,
            slag_disposal_unitcost: 37.63,
            slag_production: 0.17433,
            maintenance_materials_unitcost: 7.72,
        }
    }
}

impl Feedstocks {
    /// Default rates and costs with the given natural gas price schedule.
    pub fn new(natural_gas_prices: YearSchedule) -> Self {
        Self {
            natural_gas_prices,
            ..Default::default()
        }
    }

    /// Per-tonne cost of water, lime, carbon and iron ore.
    pub fn non_fuel_consumables_per_tonne(&self) -> f64 {
        self.raw_water_consumption * self.raw_water_unitcost
            + self.lime_consumption * self.lime_unitcost
            + self.carbon_consumption * self.carbon_unitcost
            + self.iron_ore_consumption * self.iron_ore_pellet_unitcost
    }

    /// Per-tonne slag disposal cost.
    pub fn waste_disposal_per_tonne(&self) -> f64 {
        self.slag_disposal_unitcost * self.slag_production
    }
}

fn validate_schedule(schedule: &YearSchedule) -> Result<(), ValidationError> {
    if schedule.is_finite() && schedule.values().all(|v| v >= 0.0) {
        Ok(())
    } else {
        Err(ValidationError::new("schedule_values_must_be_finite_and_non_negative"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let feedstocks = Feedstocks::new(YearSchedule::flat(2030, 3, 4.0));
        assert!(feedstocks.validate().is_ok());
        assert_eq!(feedstocks.raw_water_consumption, 0.80367);
        assert_eq!(feedstocks.raw_water_unitcost, 0.59289);
    }

    #[test]
    fn test_negative_rate_rejected() {
        let feedstocks = Feedstocks {
            lime_consumption: -1.0,
            ..Default::default()
        };
        assert!(feedstocks.validate().is_err());
    }

    #[test]
    fn test_zero_hydrogen_consumption_rejected() {
        let feedstocks = Feedstocks {
            hydrogen_consumption: 0.0,
            ..Default::default()
        };
        assert!(feedstocks.validate().is_err());
    }

    #[test]
    fn test_non_fuel_consumables_per_tonne() {
        let f = Feedstocks::default();
        let expected = 0.80367 * 0.59289 + 0.01812 * 122.1 + 0.0538 * 236.97 + 1.62927 * 207.35;
        assert!((f.non_fuel_consumables_per_tonne() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let f: Feedstocks =
            serde_json::from_str(r#"{"natural_gas_prices": {"2035": 4.0}, "lime_unitcost": 100.0}"#)
                .unwrap();
        assert_eq!(f.lime_unitcost, 100.0);
        assert_eq!(f.carbon_unitcost, 236.97);
        assert_eq!(f.natural_gas_prices.get(2035), Some(4.0));
    }
}
