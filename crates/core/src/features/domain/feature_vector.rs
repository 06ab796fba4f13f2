use serde::{Deserialize, Serialize};

use crate::shared::constants::{CANONICAL_HEIGHT, CANONICAL_WIDTH};

/// Fixed resolution every face is normalised to before classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalSize {
    pub width: u32,
    pub height: u32,
}

impl CanonicalSize {
    pub const DEFAULT: CanonicalSize = CanonicalSize {
        width: CANONICAL_WIDTH,
        height: CANONICAL_HEIGHT,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of elements in a feature vector of this size.
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CanonicalSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// How a `[0.0, 1.0]` intensity becomes a `[0, 255]` integer.
///
/// Must match the rule used when the training set was built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RescaleRule {
    /// Multiply by 255 and truncate toward zero.
    #[default]
    Truncate,
    /// Multiply by 255 and round half away from zero.
    Round,
}

impl RescaleRule {
    pub fn apply(self, intensity: f32) -> u8 {
        let scaled = intensity.clamp(0.0, 1.0) * 255.0;
        match self {
            RescaleRule::Truncate => scaled.trunc() as u8,
            RescaleRule::Round => scaled.round() as u8,
        }
    }
}

impl std::str::FromStr for RescaleRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "truncate" => Ok(RescaleRule::Truncate),
            "round" => Ok(RescaleRule::Round),
            other => Err(format!(
                "rescale rule must be 'truncate' or 'round', got '{other}'"
            )),
        }
    }
}

/// Row-major grayscale intensities of a canonical-size face, one byte each.
///
/// `u8` storage makes the `[0, 255]` range a type-level guarantee; only the
/// length has to be checked against the classifier's expected input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureVector {
    values: Vec<u8>,
}

impl FeatureVector {
    pub fn new(values: Vec<u8>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Intensities mapped back to `[0.0, 1.0]`, the scale models consume.
    pub fn to_unit_f32(&self) -> Vec<f32> {
        self.values.iter().map(|&v| v as f32 / 255.0).collect()
    }
}
