//! Domain-level structures shared across synthesis and recognition.
//!
//! This module groups the segment and digit types, the fixed cell geometry
//! with its truth table, and the tagged recognition result produced by every
//! recognition method.

pub mod geometry;
pub mod result;
pub mod segment;

pub use geometry::SegmentGeometry;
pub use result::{Diagnostics, RecognitionMethod, RecognitionResult};
pub use segment::{ActivationVector, Digit, Segment, SegmentSet};
