//! Synthetic training data.
//!
//! Clean digits are rendered from the segment geometry, degraded by a
//! randomized sensor pipeline, and packaged as labeled samples with
//! serializable metadata. The crate writes no files; callers decide where
//! samples go.

pub mod config;
pub mod dataset;
pub mod degrade;
pub mod render;
pub mod validation;

pub use config::{Bounds, DegradationConfig, RenderConfig, SynthesisConfig};
pub use dataset::{
    DatasetPlan, DatasetSummary, ImageDimensions, Sample, SampleGenerator, SampleMetadata,
    sample_file_name, seed_for_index,
};
pub use degrade::{
    AppliedEffect, DegradationPipeline, DegradationStep, Degraded, LightingDirection,
};
pub use render::ImageSynthesizer;
pub use validation::{DatasetReport, ImageStatistics, SeriesStats};
