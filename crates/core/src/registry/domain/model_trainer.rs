use std::path::PathBuf;

use thiserror::Error;

use crate::classification::domain::attribute_classifier::AttributeKind;
use crate::registry::domain::model_artifact::{ArtifactError, ModelArtifact};

#[derive(Error, Debug)]
pub enum TrainError {
    #[error("failed to read dataset {path}: {source}")]
    Dataset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dataset line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("dataset line {line}: expected {expected} pixels, found {actual}")]
    ShapeMismatch {
        line: usize,
        expected: usize,
        actual: usize,
    },
    #[error("dataset has no usable {kind} samples")]
    EmptyDataset { kind: AttributeKind },
    #[error("trainer produced an unusable artifact: {0}")]
    InvalidArtifact(#[source] ArtifactError),
    #[error("no trainer configured")]
    NoTrainer,
}

/// Produces a fresh artifact for one attribute when none can be loaded.
pub trait ModelTrainer: Send + Sync {
    fn train(&self, kind: AttributeKind) -> Result<Box<dyn ModelArtifact>, TrainError>;
}
