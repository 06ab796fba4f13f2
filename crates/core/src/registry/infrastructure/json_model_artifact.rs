use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::classification::domain::attribute_classifier::{AttributeClassifier, AttributeKind};
use crate::classification::infrastructure::softmax_regression::SoftmaxRegression;
use crate::registry::domain::model_artifact::{
    ArtifactDecoder, ArtifactError, ArtifactExpectation, ModelArtifact,
};

/// Bumped whenever the envelope layout changes incompatibly.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Model parameters, tagged by family so new families can be added
/// without breaking existing artifacts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ModelPayload {
    SoftmaxRegression(SoftmaxRegression),
}

/// JSON envelope: the classifier plus the feature shape it was trained on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonModelArtifact {
    pub format_version: u32,
    pub kind: AttributeKind,
    pub input_len: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_table_version: Option<u32>,
    pub model: ModelPayload,
}

impl JsonModelArtifact {
    pub fn new(
        kind: AttributeKind,
        input_len: usize,
        bucket_table_version: Option<u32>,
        model: ModelPayload,
    ) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            kind,
            input_len,
            bucket_table_version,
            model,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArtifactError> {
        serde_json::from_slice(bytes).map_err(|e| ArtifactError::Corrupt(e.to_string()))
    }
}

impl ModelArtifact for JsonModelArtifact {
    fn validate(&self, expected: &ArtifactExpectation) -> Result<(), ArtifactError> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactError::Incompatible(format!(
                "format version {} (expected {ARTIFACT_FORMAT_VERSION})",
                self.format_version
            )));
        }
        if self.kind != expected.kind {
            return Err(ArtifactError::Incompatible(format!(
                "artifact is for {}, expected {}",
                self.kind, expected.kind
            )));
        }
        if self.input_len != expected.input_len {
            return Err(ArtifactError::Incompatible(format!(
                "input length {} (expected {})",
                self.input_len, expected.input_len
            )));
        }
        if self.bucket_table_version != expected.bucket_table_version {
            return Err(ArtifactError::Incompatible(format!(
                "bucket table version {:?} (expected {:?})",
                self.bucket_table_version, expected.bucket_table_version
            )));
        }

        match &self.model {
            ModelPayload::SoftmaxRegression(m) => {
                m.validate().map_err(ArtifactError::Corrupt)?;
                if m.input_len() != self.input_len {
                    return Err(ArtifactError::Corrupt(format!(
                        "model input length {} disagrees with envelope {}",
                        m.input_len(),
                        self.input_len
                    )));
                }
            }
        }
        Ok(())
    }

    fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        serde_json::to_vec(self).map_err(|e| ArtifactError::Corrupt(e.to_string()))
    }

    fn into_classifier(self: Box<Self>) -> Arc<dyn AttributeClassifier> {
        match self.model {
            ModelPayload::SoftmaxRegression(m) => Arc::new(m),
        }
    }
}

/// Decodes [`JsonModelArtifact`] envelopes.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonArtifactDecoder;

impl ArtifactDecoder for JsonArtifactDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn ModelArtifact>, ArtifactError> {
        Ok(Box::new(JsonModelArtifact::from_bytes(bytes)?))
    }
}
