use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classification::domain::age_bucketer::AgeBucketer;
use crate::classification::domain::labels::{AgeRange, Gender, RawPrediction};
use crate::features::domain::feature_vector::FeatureVector;

/// Which face attribute a model predicts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    Gender,
    Age,
}

impl AttributeKind {
    pub const ALL: &[AttributeKind] = &[AttributeKind::Gender, AttributeKind::Age];
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeKind::Gender => write!(f, "gender"),
            AttributeKind::Age => write!(f, "age"),
        }
    }
}

impl std::str::FromStr for AttributeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gender" => Ok(AttributeKind::Gender),
            "age" => Ok(AttributeKind::Age),
            other => Err(format!("attribute must be 'gender' or 'age', got '{other}'")),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("inference failed: {0}")]
    Inference(String),
}

/// A trained model behind a vector-in, label-out contract.
///
/// Implementations are immutable once loaded and shared across threads.
pub trait AttributeClassifier: Send + Sync {
    /// Feature-vector length the model was trained on.
    fn input_len(&self) -> usize;

    fn classify(&self, features: &FeatureVector) -> Result<RawPrediction, ClassifyError>;
}

fn check_input_len(model: &dyn AttributeClassifier, features: &FeatureVector) {
    assert_eq!(
        features.len(),
        model.input_len(),
        "feature vector length must match the classifier's training shape"
    );
}

/// Gender view over a model: class 0 is male, 1 is female.
#[derive(Clone)]
pub struct GenderClassifier {
    model: Arc<dyn AttributeClassifier>,
}

impl GenderClassifier {
    pub fn new(model: Arc<dyn AttributeClassifier>) -> Self {
        Self { model }
    }

    pub fn classify(&self, features: &FeatureVector) -> Result<Gender, ClassifyError> {
        check_input_len(self.model.as_ref(), features);
        self.model.classify(features).map(Gender::from_prediction)
    }
}

/// Age view over a model; raw output is always routed through the bucketer.
#[derive(Clone)]
pub struct AgeClassifier {
    model: Arc<dyn AttributeClassifier>,
    bucketer: AgeBucketer,
}

impl AgeClassifier {
    pub fn new(model: Arc<dyn AttributeClassifier>, bucketer: AgeBucketer) -> Self {
        Self { model, bucketer }
    }

    pub fn classify(&self, features: &FeatureVector) -> Result<AgeRange, ClassifyError> {
        check_input_len(self.model.as_ref(), features);
        self.model
            .classify(features)
            .map(|raw| self.bucketer.bucket(raw))
    }
}

/// The classifiers available to a pipeline. Gender is mandatory, age is an
/// optional capability.
#[derive(Clone)]
pub struct ClassifierSet {
    gender: GenderClassifier,
    age: Option<AgeClassifier>,
}

impl ClassifierSet {
    pub fn new(gender: GenderClassifier, age: Option<AgeClassifier>) -> Self {
        Self { gender, age }
    }

    pub fn gender(&self) -> &GenderClassifier {
        &self.gender
    }

    pub fn age(&self) -> Option<&AgeClassifier> {
        self.age.as_ref()
    }
}
