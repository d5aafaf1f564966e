//! Capacity sizing → cost estimation → breakeven solve.

pub mod artifacts;
pub mod capacity;
pub mod cost;
pub mod finance;
pub mod plant;
pub mod registry;
pub mod runner;

pub use artifacts::{ArtifactOptions, ArtifactPaths};
pub use capacity::*;
pub use cost::*;
pub use finance::*;
pub use plant::*;
pub use registry::{
    CostModel, ModelKind, ModelLocations, ModelPaths, ModelPlugins, ModelSpec, PerformanceModel,
    ResolvedModel,
};
pub use runner::*;
