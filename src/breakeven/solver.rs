use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::cashflow::{npv, SALES_LINE};
use super::{BreakevenProblem, CashFlowModel, CashFlowTable, LineCategory};

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Nothing is sold over the plant life; no price can break even")]
    NoProduction,

    #[error("Could not bracket a breakeven price starting from {guess}")]
    NoBracket { guess: f64 },

    #[error("No convergence after {iterations} iterations (NPV residual {residual})")]
    NonConvergence { iterations: usize, residual: f64 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Share of the breakeven price attributable to one cash-flow line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdownRow {
    pub name: String,
    pub category: LineCategory,
    /// Present value of the line, as a cost (positive = outflow)
    pub npv: f64,
    /// $ per unit of commodity
    pub price_contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakevenSolution {
    /// Always contains `"price"`
    pub sol: IndexMap<String, f64>,
    pub summary: IndexMap<String, f64>,
    pub price_breakdown: Vec<PriceBreakdownRow>,
    pub cash_flow: CashFlowTable,
}

impl BreakevenSolution {
    pub fn price(&self) -> f64 {
        self.sol.get("price").copied().unwrap_or(f64::NAN)
    }
}

/// Engine that finds the commodity price at which a project breaks even.
pub trait BreakevenSolver {
    fn solve(&self, problem: &BreakevenProblem) -> Result<BreakevenSolution, SolverError>;
}

/// Discounted cash-flow breakeven: the price at which the equity NPV at
/// the after-tax nominal discount rate is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CashFlowSolver {
    /// Relative price tolerance
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for CashFlowSolver {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 200,
        }
    }
}

const MAX_BRACKET_DOUBLINGS: usize = 64;

impl CashFlowSolver {
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Price giving zero NPV. NPV is increasing in price, so the bracket is
    /// grown on the side the first guess points to.
    fn find_price(&self, model: &CashFlowModel, guess: f64) -> Result<f64, SolverError> {
        let f_guess = model.npv_at(guess);
        if f_guess == 0.0 {
            return Ok(guess);
        }

        let mut step = guess.abs().max(1.0);
        let direction = if f_guess < 0.0 { 1.0 } else { -1.0 };
        let mut bracket = None;
        for _ in 0..MAX_BRACKET_DOUBLINGS {
            let candidate = guess + direction * step;
            let f_candidate = model.npv_at(candidate);
            if !f_candidate.is_finite() {
                break;
            }
            if f_candidate.signum() != f_guess.signum() {
                bracket = Some(if direction > 0.0 {
                    (guess, f_guess, candidate, f_candidate)
                } else {
                    (candidate, f_candidate, guess, f_guess)
                });
                break;
            }
            step *= 2.0;
        }
        let (mut a, mut fa, mut b, mut fb) = bracket.ok_or(SolverError::NoBracket { guess })?;

        // Illinois variant of regula falsi
        let npv_tolerance = 1e-11 * model.magnitude_at(guess).max(1.0);
        let mut side = 0i8;
        let mut previous = f64::NAN;
        let mut residual = fa.abs().min(fb.abs());
        for iteration in 0..self.max_iterations {
            let c = (a * fb - b * fa) / (fb - fa);
            let fc = model.npv_at(c);
            residual = fc.abs();
            if residual <= npv_tolerance
                || (b - a).abs() <= self.tolerance * c.abs().max(1.0)
                || c == previous
            {
                debug!(iteration, price = c, residual, "breakeven price converged");
                return Ok(c);
            }
            previous = c;
            if fc.signum() == fb.signum() {
                b = c;
                fb = fc;
                if side == -1 {
                    fa /= 2.0;
                }
                side = -1;
            } else {
                a = c;
                fa = fc;
                if side == 1 {
                    fb /= 2.0;
                }
                side = 1;
            }
        }

        Err(SolverError::NonConvergence {
            iterations: self.max_iterations,
            residual,
        })
    }
}

impl BreakevenSolver for CashFlowSolver {
    fn solve(&self, problem: &BreakevenProblem) -> Result<BreakevenSolution, SolverError> {
        let model = CashFlowModel::new(problem)?;
        let discounted_units = model.discounted_units();
        if discounted_units <= 0.0 || !discounted_units.is_finite() {
            return Err(SolverError::NoProduction);
        }

        let params = &problem.params;
        let guess = if params.commodity.initial_price.is_finite() {
            params.commodity.initial_price
        } else {
            1.0
        };
        let price = self.find_price(&model, guess)?;
        let table = model.evaluate(price);
        let rate = params.leverage_after_tax_nominal_discount_rate;
        let discount = model.discount_factors();

        let price_breakdown: Vec<PriceBreakdownRow> = table
            .lines
            .iter()
            .filter(|line| line.name != SALES_LINE)
            .map(|line| {
                let cost = -line.present_value(discount);
                PriceBreakdownRow {
                    name: line.name.clone(),
                    category: line.category,
                    npv: cost,
                    price_contribution: cost / discounted_units,
                }
            })
            .collect();

        let equity_npv = table.net_present_value(rate);
        let (inflows, outflows) = table
            .equity_cash_flow
            .iter()
            .zip(discount)
            .fold((0.0, 0.0), |(i, o), (v, d)| {
                if *v >= 0.0 {
                    (i + v * d, o)
                } else {
                    (i, o - v * d)
                }
            });

        let mut sol = IndexMap::new();
        sol.insert("price".to_string(), price);
        sol.insert("NPV".to_string(), equity_npv);
        if let Some(irr) = internal_rate_of_return(&table.equity_cash_flow) {
            sol.insert("irr".to_string(), irr);
        }
        if outflows > 0.0 {
            sol.insert("profit index".to_string(), inflows / outflows);
        }
        let construction = params.construction_years();
        if let Some(payback) = payback_period(&table.cumulative_cash_flow(), construction) {
            sol.insert("investor payback period".to_string(), payback as f64);
        }
        sol.insert("lco".to_string(), price);

        let lifetime_units: f64 = model.units().iter().sum();
        let mut summary = IndexMap::new();
        summary.insert("Depreciable capital".to_string(), model.depreciable_capital);
        summary.insert(
            "Installation cost".to_string(),
            params.installation_cost.value,
        );
        summary.insert("Non-depreciable assets".to_string(), params.non_depr_assets);
        summary.insert(
            "Debt fraction of initial financing".to_string(),
            params.debt_fraction(),
        );
        summary.insert("Construction years".to_string(), construction as f64);
        summary.insert("Operating life".to_string(), params.operating_life as f64);
        summary.insert("Lifetime units sold".to_string(), lifetime_units);
        summary.insert(
            "Average annual units sold".to_string(),
            lifetime_units / params.operating_life as f64,
        );
        summary.insert("Discounted units sold".to_string(), discounted_units);
        summary.insert("First year operating expenses".to_string(), model.first_year_opex);
        summary.insert("Total depreciation".to_string(), model.total_depreciation);
        summary.insert("After-tax nominal discount rate".to_string(), rate);

        debug!(price, npv = equity_npv, "breakeven solved");

        Ok(BreakevenSolution {
            sol,
            summary,
            price_breakdown,
            cash_flow: table,
        })
    }
}

/// Rate at which the flows have zero NPV, by bisection; `None` when the
/// flows never change sign over (-99%, 1000%).
pub fn internal_rate_of_return(flows: &[f64]) -> Option<f64> {
    let (mut lo, mut hi) = (-0.99, 10.0);
    let (mut f_lo, f_hi) = (npv(flows, lo), npv(flows, hi));
    if !f_lo.is_finite() || !f_hi.is_finite() || f_lo.signum() == f_hi.signum() {
        return None;
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        let f_mid = npv(flows, mid);
        if f_mid == 0.0 || (hi - lo) < 1e-12 {
            return Some(mid);
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    Some(0.5 * (lo + hi))
}

/// Operating years until cumulative equity cash flow turns non-negative.
fn payback_period(cumulative: &[f64], construction: usize) -> Option<usize> {
    cumulative
        .iter()
        .enumerate()
        .skip(construction)
        .find(|(_, c)| **c >= 0.0)
        .map(|(p, _)| p - construction + 1)
}
