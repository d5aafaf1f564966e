//! Levelized cost of hydrogen-derived commodities: size a downstream plant
//! from a hydrogen supply or a product demand, estimate its costs and solve
//! the breakeven commodity price.

pub mod breakeven;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod electrolyzer;
pub mod error;
pub mod pipeline;
pub mod telemetry;

pub use error::{LcoxError, Result};
