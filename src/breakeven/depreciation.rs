use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::SolverError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum DepreciationMethod {
    /// Modified accelerated cost recovery, half-year convention
    #[strum(serialize = "MACRS")]
    #[serde(rename = "MACRS")]
    Macrs,
    #[strum(serialize = "Straight line")]
    #[serde(rename = "Straight line")]
    StraightLine,
}

// IRS Publication 946, table A-1 (percent of basis)
const MACRS_3: [f64; 4] = [33.33, 44.45, 14.81, 7.41];
const MACRS_5: [f64; 6] = [20.00, 32.00, 19.20, 11.52, 11.52, 5.76];
const MACRS_7: [f64; 8] = [14.29, 24.49, 17.49, 12.49, 8.93, 8.92, 8.93, 4.46];
const MACRS_10: [f64; 11] = [
    10.00, 18.00, 14.40, 11.52, 9.22, 7.37, 6.55, 6.55, 6.56, 6.55, 3.28,
];
const MACRS_15: [f64; 16] = [
    5.00, 9.50, 8.55, 7.70, 6.93, 6.23, 5.90, 5.90, 5.91, 5.90, 5.91, 5.90, 5.91, 5.90, 5.91, 2.95,
];
const MACRS_20: [f64; 21] = [
    3.750, 7.219, 6.677, 6.177, 5.713, 5.285, 4.888, 4.522, 4.462, 4.461, 4.462, 4.461, 4.462,
    4.461, 4.462, 4.461, 4.462, 4.461, 4.462, 4.461, 2.231,
];

impl DepreciationMethod {
    /// Fraction of the basis written off in each year after the asset is
    /// placed in service. Always sums to one.
    pub fn schedule(&self, period: u32) -> Result<Vec<f64>, SolverError> {
        match self {
            DepreciationMethod::Macrs => {
                let table: &[f64] = match period {
                    3 => &MACRS_3,
                    5 => &MACRS_5,
                    7 => &MACRS_7,
                    10 => &MACRS_10,
                    15 => &MACRS_15,
                    20 => &MACRS_20,
                    other => {
                        return Err(SolverError::InvalidParameter(format!(
                            "no MACRS table for a {}-year recovery period",
                            other
                        )))
                    }
                };
                Ok(table.iter().map(|pct| pct / 100.0).collect())
            }
            DepreciationMethod::StraightLine => {
                if period == 0 {
                    return Err(SolverError::InvalidParameter(
                        "straight-line depreciation needs a period of at least one year"
                            .to_string(),
                    ));
                }
                Ok(vec![1.0 / period as f64; period as usize])
            }
        }
    }
}
