pub mod cost_curve;
pub mod feedstocks;
pub mod schedule;
pub mod technology;

pub use cost_curve::*;
pub use feedstocks::*;
pub use schedule::*;
pub use technology::*;
