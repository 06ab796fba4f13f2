use std::sync::Arc;

use thiserror::Error;

use crate::classification::domain::attribute_classifier::{AttributeClassifier, AttributeKind};

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("no {0} artifact found")]
    Missing(AttributeKind),
    #[error("artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact is corrupt: {0}")]
    Corrupt(String),
    #[error("artifact is incompatible: {0}")]
    Incompatible(String),
}

/// What a loaded artifact must agree with to be usable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArtifactExpectation {
    pub kind: AttributeKind,
    pub input_len: usize,
    /// Required for age artifacts: the bucket table the labels index into.
    pub bucket_table_version: Option<u32>,
}

/// A trained classifier in its persistable form.
pub trait ModelArtifact: Send {
    /// Rejects artifacts that would feed the wrong shape or label scheme.
    fn validate(&self, expected: &ArtifactExpectation) -> Result<(), ArtifactError>;

    fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError>;

    fn into_classifier(self: Box<Self>) -> Arc<dyn AttributeClassifier>;
}

/// Turns bytes read from an [`ArtifactStore`](super::artifact_store::ArtifactStore)
/// back into an artifact. Unreadable bytes are [`ArtifactError::Corrupt`].
pub trait ArtifactDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn ModelArtifact>, ArtifactError>;
}
