pub mod allocator;
pub mod classifier;
pub mod config;
pub mod covariance;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod normalizer;
pub mod result;
pub mod types;
pub mod universe;
pub mod weighting;

mod linalg;

pub use config::AllocationConfig;
pub use engine::{compute_portfolio, AllocationEngine, AllocationRequest};
pub use error::AllocationError;
pub use result::{AllocationLine, PortfolioResult, ResultCondition};
pub use types::*;
pub use weighting::WeightingMethod;

/// Standard result type for all allocation operations
pub type AllocationResult<T> = Result<T, AllocationError>;
