//! Invariants of the capacity and cost stages across the input space.

use hydrogen_lcox::domain::{CapitalLine, Feedstocks, Technology, TechnologyKind, YearSchedule};
use hydrogen_lcox::pipeline::{
    estimate_costs, size_capacity, CapacityModelConfig, CostComponents, CostModelConfig,
    SizingMode,
};
use hydrogen_lcox::LcoxError;
use proptest::prelude::*;
use rstest::rstest;

fn feedstocks() -> Feedstocks {
    Feedstocks::new(YearSchedule::flat(2030, 20, 4.0))
}

fn technology(kind: TechnologyKind) -> Technology {
    Technology::builtin(kind)
}

proptest! {
    #[test]
    fn prop_supply_then_demand_recovers_hydrogen(
        hydrogen in 1.0e5f64..1.0e10,
        cf in 0.05f64..1.0,
    ) {
        let tech = technology(TechnologyKind::IronOre);
        let feedstocks = feedstocks();

        let supply = CapacityModelConfig::new(&tech, &feedstocks, cf, Some(hydrogen), None).unwrap();
        let sized = size_capacity(&supply).unwrap();

        let demand = CapacityModelConfig::with_mode(
            &tech,
            &feedstocks,
            cf,
            SizingMode::Demand { desired_mtpy: sized.plant_capacity_mtpy },
        )
        .unwrap();
        let back = size_capacity(&demand).unwrap();

        prop_assert!((back.hydrogen_amount_kgpy - hydrogen).abs() <= 1e-9 * hydrogen);
    }

    #[test]
    fn prop_total_plant_cost_is_sum_of_lines(
        capacity in 1.0e3f64..1.0e7,
        misc in 0.0f64..1.0e8,
        integrated in any::<bool>(),
    ) {
        let tech = technology(TechnologyKind::IronOre);
        let feedstocks = feedstocks();
        let config = CostModelConfig {
            capex_misc: misc,
            o2_heat_integration: integrated,
            ..CostModelConfig::new(&tech, &feedstocks, 2035, capacity, 4.0)
        };
        let outputs = estimate_costs(&config).unwrap();

        let sum: f64 = CapitalLine::all().map(|line| outputs.capex(line)).sum();
        prop_assert!((outputs.total_plant_cost - sum).abs() <= 1e-9 * sum.max(1.0));
        let fixed: f64 = outputs.fixed_costs().iter().map(|(_, v, _)| v).sum();
        prop_assert!((outputs.total_fixed_operating_cost - fixed).abs() <= 1e-9 * fixed.max(1.0));
    }

    #[test]
    fn prop_heat_integration_never_raises_capex(capacity in 1.0e3f64..1.0e7) {
        let tech = technology(TechnologyKind::IronOre);
        let feedstocks = feedstocks();
        let base = CostModelConfig::new(&tech, &feedstocks, 2035, capacity, 4.0);
        let integrated = estimate_costs(&CostModelConfig {
            o2_heat_integration: true,
            ..base.clone()
        })
        .unwrap();
        let standalone = estimate_costs(&CostModelConfig {
            o2_heat_integration: false,
            ..base
        })
        .unwrap();

        for line in CapitalLine::all() {
            match line {
                CapitalLine::H2Preheating | CapitalLine::CoolingTower => {
                    prop_assert!(integrated.capex(line) < standalone.capex(line))
                }
                _ => prop_assert_eq!(integrated.capex(line), standalone.capex(line)),
            }
        }
    }
}

#[rstest]
#[case(TechnologyKind::IronOre, Some(1.0e7), Some(1.0e5))]
#[case(TechnologyKind::IronOre, None, None)]
#[case(TechnologyKind::IronElectrowinning, Some(1.0e7), Some(1.0e5))]
#[case(TechnologyKind::IronElectrowinning, None, None)]
fn test_sizing_inputs_are_exclusive(
    #[case] kind: TechnologyKind,
    #[case] hydrogen: Option<f64>,
    #[case] desired: Option<f64>,
) {
    let tech = technology(kind);
    let feedstocks = feedstocks();
    let result = CapacityModelConfig::new(&tech, &feedstocks, 0.9, hydrogen, desired);
    assert!(matches!(result, Err(LcoxError::Config(_))));
}

#[rstest]
#[case(2030)]
#[case(2049)]
fn test_gas_price_needs_exact_year(#[case] year: i32) {
    let tech = technology(TechnologyKind::IronOre);
    let feedstocks = feedstocks();
    assert!(estimate_costs(&CostModelConfig::new(&tech, &feedstocks, year, 1.0e5, 4.0)).is_ok());

    let missing = estimate_costs(&CostModelConfig::new(&tech, &feedstocks, year + 100, 1.0e5, 4.0));
    assert!(matches!(missing, Err(LcoxError::MissingScheduleYear { .. })));
}
