//! Pack sizing logic lives here.

pub mod entities;
pub mod optimizer;
pub mod registry;

pub use entities::{OptimizationResult, PackSize, MAX_ITEMS_ORDERED};
pub use optimizer::{PackOptimizer, Reload};
pub use registry::{RegistryError, SizeRegistry};
