//! Segment, digit and activation types.
//!
//! A seven-segment cell has segments `A` (top) through `G` (middle) in a
//! fixed order. Everything that is indexed by segment in this crate (polygons,
//! regions of interest, activation vectors, scores) uses that order.

use crate::core::{OCRError, OcrResult, SEGMENT_COUNT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the seven segments of a display cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Segment {
    /// Top.
    A,
    /// Upper right.
    B,
    /// Lower right.
    C,
    /// Bottom.
    D,
    /// Lower left.
    E,
    /// Upper left.
    F,
    /// Middle.
    G,
}

impl Segment {
    /// All segments in index order.
    pub const ALL: [Segment; SEGMENT_COUNT] = [
        Segment::A,
        Segment::B,
        Segment::C,
        Segment::D,
        Segment::E,
        Segment::F,
        Segment::G,
    ];

    /// Position of the segment in `A..G` order.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The segment's letter.
    pub const fn letter(self) -> char {
        match self {
            Segment::A => 'A',
            Segment::B => 'B',
            Segment::C => 'C',
            Segment::D => 'D',
            Segment::E => 'E',
            Segment::F => 'F',
            Segment::G => 'G',
        }
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A decimal digit, guaranteed to be in `0..=9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Digit(u8);

impl Digit {
    /// All ten digits in ascending order.
    pub const ALL: [Digit; 10] = [
        Digit(0),
        Digit(1),
        Digit(2),
        Digit(3),
        Digit(4),
        Digit(5),
        Digit(6),
        Digit(7),
        Digit(8),
        Digit(9),
    ];

    /// Creates a digit, failing with `InvalidDigit` outside `0..=9`.
    pub fn new(value: u8) -> OcrResult<Self> {
        if value <= 9 {
            Ok(Self(value))
        } else {
            Err(OCRError::invalid_digit(value))
        }
    }

    /// The numeric value.
    pub const fn value(self) -> u8 {
        self.0
    }

    /// The digit as an index into per-class arrays.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for Digit {
    type Error = OCRError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Digit::new(value)
    }
}

impl From<Digit> for u8 {
    fn from(digit: Digit) -> Self {
        digit.0
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A set of segments, stored as a bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SegmentSet(u8);

impl SegmentSet {
    /// The empty set.
    pub const EMPTY: SegmentSet = SegmentSet(0);

    /// Builds a set from a list of segments.
    pub const fn from_segments(segments: &[Segment]) -> Self {
        let mut bits = 0u8;
        let mut i = 0;
        while i < segments.len() {
            bits |= segments[i].bit();
            i += 1;
        }
        SegmentSet(bits)
    }

    /// Returns true if `segment` is in the set.
    pub const fn contains(self, segment: Segment) -> bool {
        self.0 & segment.bit() != 0
    }

    /// Adds `segment` to the set.
    pub fn insert(&mut self, segment: Segment) {
        self.0 |= segment.bit();
    }

    /// Number of segments in the set.
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns true if the set has no segments.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Segments present in both sets.
    pub const fn intersection(self, other: SegmentSet) -> SegmentSet {
        SegmentSet(self.0 & other.0)
    }

    /// Segments in `self` that are not in `other`.
    pub const fn difference(self, other: SegmentSet) -> SegmentSet {
        SegmentSet(self.0 & !other.0)
    }

    /// Iterates over the segments in `A..G` order.
    pub fn iter(self) -> impl Iterator<Item = Segment> {
        Segment::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

impl FromIterator<Segment> for SegmentSet {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        let mut set = SegmentSet::EMPTY;
        for segment in iter {
            set.insert(segment);
        }
        set
    }
}

impl fmt::Display for SegmentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, segment) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", segment)?;
        }
        write!(f, "}}")
    }
}

/// Per-segment on/off evidence, indexed `A..G`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivationVector([bool; SEGMENT_COUNT]);

impl ActivationVector {
    /// Wraps an array of seven activations.
    pub const fn new(states: [bool; SEGMENT_COUNT]) -> Self {
        Self(states)
    }

    /// Builds a vector from a slice, failing with `InvalidActivationVector`
    /// unless it has exactly seven entries.
    pub fn from_slice(states: &[bool]) -> OcrResult<Self> {
        let states: [bool; SEGMENT_COUNT] = states
            .try_into()
            .map_err(|_| OCRError::invalid_activation_vector(states.len()))?;
        Ok(Self(states))
    }

    /// Thresholds continuous scores: a segment is on when its score is
    /// strictly greater than `threshold`.
    pub fn from_scores(scores: &[f32; SEGMENT_COUNT], threshold: f32) -> Self {
        let mut states = [false; SEGMENT_COUNT];
        for (state, score) in states.iter_mut().zip(scores) {
            *state = *score > threshold;
        }
        Self(states)
    }

    /// Returns true if `segment` is on.
    pub const fn is_active(&self, segment: Segment) -> bool {
        self.0[segment.index()]
    }

    /// The activations as a slice in `A..G` order.
    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    /// The active segments as a set.
    pub fn active_segments(&self) -> SegmentSet {
        Segment::ALL
            .into_iter()
            .filter(|s| self.is_active(*s))
            .collect()
    }
}

impl From<SegmentSet> for ActivationVector {
    fn from(set: SegmentSet) -> Self {
        let mut states = [false; SEGMENT_COUNT];
        for segment in set.iter() {
            states[segment.index()] = true;
        }
        Self(states)
    }
}

impl fmt::Display for ActivationVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for state in self.0 {
            write!(f, "{}", if state { '1' } else { '0' })?;
        }
        Ok(())
    }
}
