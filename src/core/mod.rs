//! The core module of the crate.
//!
//! This module contains the fundamental components shared by synthesis and
//! recognition:
//! - Configuration validation and the parallel policy
//! - Constants used throughout the crate
//! - Error handling
//! - Traits for external recognizers
//!
//! It also provides re-exports of commonly used types and functions for convenience.

pub mod config;
pub mod constants;
pub mod errors;
pub mod traits;

pub use crate::utils::dynamic_to_rgb;
pub use config::{ConfigError, ConfigValidator, ConfigValidatorExt, ParallelPolicy};
pub use constants::*;
pub use errors::{MethodFailure, OCRError, OcrResult, OpaqueError};
pub use traits::{DigitClassifier, DigitRecognizer, OcrReading, TraditionalOcr};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// It's typically called at the start of an application to enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
