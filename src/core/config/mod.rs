//! Configuration management.
//!
//! This module provides the validation trait shared by every configuration
//! struct in the crate, its error type, and the parallel processing policy.

pub mod errors;
pub mod parallel;

// Re-export commonly used types
pub use errors::{ConfigError, ConfigValidator, ConfigValidatorExt};
pub use parallel::ParallelPolicy;
