//! Discounted cash-flow breakeven engine.
//!
//! A [`BreakevenProblem`] collects global financial parameters, capital
//! items, fixed costs, feedstocks and co-products. A [`BreakevenSolver`]
//! turns it into the commodity price at which the equity NPV is zero,
//! together with a summary, a per-line price breakdown and the annual
//! cash-flow table.

pub mod cashflow;
pub mod depreciation;
pub mod items;
pub mod params;
pub mod solver;

pub use cashflow::*;
pub use depreciation::*;
pub use items::*;
pub use params::*;
pub use solver::*;
