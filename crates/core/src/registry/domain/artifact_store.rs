use crate::classification::domain::attribute_classifier::AttributeKind;
use crate::registry::domain::model_artifact::ArtifactError;

/// Persistence for serialized model artifacts, keyed by attribute.
///
/// `read` returns [`ArtifactError::Missing`] when nothing has been stored yet
/// so callers can tell "never trained" from "unreadable".
pub trait ArtifactStore: Send + Sync {
    fn read(&self, kind: AttributeKind) -> Result<Vec<u8>, ArtifactError>;

    fn write(&self, kind: AttributeKind, bytes: &[u8]) -> Result<(), ArtifactError>;
}
