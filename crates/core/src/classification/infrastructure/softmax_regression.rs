//! Multinomial logistic regression over unit-scaled pixel intensities.
//!
//! Small enough to serialize as plain JSON and fast enough to evaluate per
//! face on the CPU without a runtime.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::classification::domain::attribute_classifier::{AttributeClassifier, ClassifyError};
use crate::classification::domain::labels::RawPrediction;
use crate::features::domain::feature_vector::FeatureVector;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxRegression {
    input_len: usize,
    num_classes: usize,
    /// `num_classes × input_len`, row-major.
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl SoftmaxRegression {
    pub fn zeros(input_len: usize, num_classes: usize) -> Self {
        Self {
            input_len,
            num_classes,
            weights: vec![0.0; input_len * num_classes],
            bias: vec![0.0; num_classes],
        }
    }

    pub fn from_arrays(weights: Array2<f32>, bias: Array1<f32>) -> Self {
        let (num_classes, input_len) = weights.dim();
        Self {
            input_len,
            num_classes,
            weights: weights.iter().copied().collect(),
            bias: bias.to_vec(),
        }
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Checks internal consistency after deserialization.
    pub fn validate(&self) -> Result<(), String> {
        if self.num_classes == 0 || self.input_len == 0 {
            return Err("model has no classes or no inputs".into());
        }
        if self.weights.len() != self.num_classes * self.input_len {
            return Err(format!(
                "weight count {} does not match {} classes x {} inputs",
                self.weights.len(),
                self.num_classes,
                self.input_len
            ));
        }
        if self.bias.len() != self.num_classes {
            return Err(format!(
                "bias count {} does not match {} classes",
                self.bias.len(),
                self.num_classes
            ));
        }
        if !self.weights.iter().chain(&self.bias).all(|w| w.is_finite()) {
            return Err("model contains non-finite parameters".into());
        }
        Ok(())
    }

    pub fn weight_matrix(&self) -> ArrayView2<'_, f32> {
        ArrayView2::from_shape((self.num_classes, self.input_len), &self.weights)
            .expect("weights length is checked by validate()")
    }

    pub fn logits(&self, x: ArrayView1<'_, f32>) -> Array1<f32> {
        self.weight_matrix().dot(&x) + &ArrayView1::from(&self.bias[..])
    }

    pub fn probabilities(&self, x: ArrayView1<'_, f32>) -> Array1<f32> {
        softmax(self.logits(x).view())
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: ArrayView1<'_, f32>) -> Array1<f32> {
    let max = logits.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    let exp = logits.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    exp / sum
}

impl AttributeClassifier for SoftmaxRegression {
    fn input_len(&self) -> usize {
        self.input_len
    }

    fn classify(&self, features: &FeatureVector) -> Result<RawPrediction, ClassifyError> {
        let x = Array1::from(features.to_unit_f32());
        let logits = self.logits(x.view());

        let mut best: Option<(usize, f32)> = None;
        for (i, &v) in logits.iter().enumerate() {
            if !v.is_finite() {
                return Err(ClassifyError::Inference(format!(
                    "non-finite logit for class {i}"
                )));
            }
            if best.map_or(true, |(_, b)| v > b) {
                best = Some((i, v));
            }
        }

        best.map(|(i, _)| RawPrediction::Class(i as i64))
            .ok_or_else(|| ClassifyError::Inference("model has no classes".into()))
    }
}
