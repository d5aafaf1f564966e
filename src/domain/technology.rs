//! Technology descriptors.
//!
//! Every downstream plant (iron ore, electrowon iron, and the steel/ammonia
//! modules built the same way) runs the same capacity → cost → finance
//! pipeline. What differs is captured here: the commodity being priced, the
//! capex curve table, the labor anchor and the feedstock schema.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use super::{CostCurveTable, CostIndex, LaborCurve, OwnerCostFactors};

/// Built-in technologies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TechnologyKind {
    IronOre,
    #[strum(to_string = "iron_win", serialize = "iron_electrowinning")]
    #[serde(alias = "iron_win")]
    IronElectrowinning,
}

/// Inputs priced per tonne of product in the finance stage, in the order
/// they are handed to the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum FeedstockLine {
    #[strum(to_string = "Maintenance Materials")]
    MaintenanceMaterials,
    #[strum(to_string = "Raw Water Withdrawal")]
    RawWater,
    #[strum(to_string = "Lime")]
    Lime,
    #[strum(to_string = "Carbon")]
    Carbon,
    #[strum(to_string = "Iron Ore")]
    IronOre,
    #[strum(to_string = "Hydrogen")]
    Hydrogen,
    #[strum(to_string = "Natural Gas")]
    NaturalGas,
    #[strum(to_string = "Electricity")]
    Electricity,
    #[strum(to_string = "Slag Disposal")]
    SlagDisposal,
}

impl FeedstockLine {
    /// Usage unit, phrased per tonne of `product`.
    pub fn unit(&self, product: &str) -> String {
        match self {
            FeedstockLine::MaintenanceMaterials => format!("Units per metric tonne of {}", product),
            FeedstockLine::RawWater => {
                format!("metric tonnes of water per metric tonne of {}", product)
            }
            FeedstockLine::Lime => format!("metric tonnes of lime per metric tonne of {}", product),
            FeedstockLine::Carbon => {
                format!("metric tonnes of carbon per metric tonne of {}", product)
            }
            FeedstockLine::IronOre => "metric tonnes of iron ore per metric tonne of iron".to_string(),
            FeedstockLine::Hydrogen => {
                format!("metric tonnes of hydrogen per metric tonne of {}", product)
            }
            FeedstockLine::NaturalGas => format!("GJ-LHV per metric tonne of {}", product),
            FeedstockLine::Electricity => format!("MWh per metric tonne of {}", product),
            FeedstockLine::SlagDisposal => {
                format!("metric tonnes of slag per metric tonne of {}", product)
            }
        }
    }
}

/// Everything the generic pipeline needs to know about one technology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technology {
    pub kind: TechnologyKind,
    /// Commodity name reported by the breakeven solver
    pub commodity_name: String,
    pub commodity_unit: String,
    /// Product noun used in feedstock units
    pub product: String,
    /// Supply units (kg H2) per tonne of hydrogen consumption rate
    pub supply_units_per_tonne: f64,
    pub cost_index: CostIndex,
    pub cost_curves: CostCurveTable,
    pub labor: LaborCurve,
    pub owner_costs: OwnerCostFactors,
    pub feedstock_schema: Vec<FeedstockLine>,
    /// First-guess commodity price for the solver ($/unit)
    pub initial_price_guess: f64,
}

impl Technology {
    pub fn builtin(kind: TechnologyKind) -> Self {
        match kind {
            TechnologyKind::IronOre => Self::iron_ore(),
            TechnologyKind::IronElectrowinning => Self::iron_electrowinning(),
        }
    }

    pub fn iron_ore() -> Self {
        Self {
            kind: TechnologyKind::IronOre,
            commodity_name: "iron ore".to_string(),
            commodity_unit: "metric tonnes".to_string(),
            product: "iron ore".to_string(),
            supply_units_per_tonne: 1000.0,
            cost_index: CostIndex::default(),
            cost_curves: CostCurveTable::hydrogen_dri(),
            labor: LaborCurve::default(),
            owner_costs: OwnerCostFactors::default(),
            feedstock_schema: FeedstockLine::iter().collect(),
            initial_price_guess: 1000.0,
        }
    }

    pub fn iron_electrowinning() -> Self {
        Self {
            kind: TechnologyKind::IronElectrowinning,
            commodity_name: "iron".to_string(),
            product: "iron".to_string(),
            ..Self::iron_ore()
        }
    }

    /// File-name stem for artifacts (`iron_ore_cash_flow_0.csv`).
    pub fn artifact_stem(&self) -> String {
        self.kind.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_kind_parsing() {
        assert_eq!(TechnologyKind::from_str("iron_ore").unwrap(), TechnologyKind::IronOre);
        assert_eq!(
            TechnologyKind::from_str("iron_win").unwrap(),
            TechnologyKind::IronElectrowinning
        );
        assert!(TechnologyKind::from_str("steel").is_err());
    }

    #[test]
    fn test_builtin_descriptors_share_pipeline_shape() {
        let ore = Technology::builtin(TechnologyKind::IronOre);
        let win = Technology::builtin(TechnologyKind::IronElectrowinning);

        assert_eq!(ore.cost_curves, win.cost_curves);
        assert_eq!(ore.feedstock_schema.len(), 9);
        assert_eq!(win.commodity_name, "iron");
        assert_eq!(ore.commodity_name, "iron ore");
    }

    #[test]
    fn test_feedstock_units_name_the_product() {
        assert_eq!(
            FeedstockLine::Lime.unit("iron ore"),
            "metric tonnes of lime per metric tonne of iron ore"
        );
        assert_eq!(FeedstockLine::Electricity.unit("iron"), "MWh per metric tonne of iron");
    }
}
