//! Shared parallel processing configuration types.

use super::{ConfigError, ConfigValidator};
use serde::{Deserialize, Serialize};

/// Configuration for parallel batch generation.
///
/// Sample generation fans out over rayon when the batch is larger than
/// `sample_threshold`; smaller batches are generated on the calling thread.
/// Output never depends on these settings since every sample owns its RNG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelPolicy {
    /// Maximum number of threads to use for parallel processing.
    /// If None, rayon will use the global thread pool.
    /// Default: None (use rayon's default)
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Threshold for number of samples to generate sequentially (<= this uses sequential)
    /// Default: 8
    #[serde(default = "ParallelPolicy::default_sample_threshold")]
    pub sample_threshold: usize,
}

impl ParallelPolicy {
    /// Create a new ParallelPolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of threads.
    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set the sequential sample threshold.
    pub fn with_sample_threshold(mut self, threshold: usize) -> Self {
        self.sample_threshold = threshold;
        self
    }

    /// Returns true when a batch of `count` items should run in parallel.
    pub fn should_parallelize(&self, count: usize) -> bool {
        count > self.sample_threshold && self.max_threads != Some(1)
    }

    /// Default value for sample threshold.
    fn default_sample_threshold() -> usize {
        8
    }
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self {
            max_threads: None,
            sample_threshold: Self::default_sample_threshold(),
        }
    }
}

impl ConfigValidator for ParallelPolicy {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(threads) = self.max_threads {
            self.validate_thread_count(threads)?;
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}
