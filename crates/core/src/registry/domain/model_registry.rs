use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::classification::domain::age_bucketer::AgeBucketer;
use crate::classification::domain::attribute_classifier::{
    AgeClassifier, AttributeClassifier, AttributeKind, ClassifierSet, GenderClassifier,
};
use crate::features::domain::feature_vector::CanonicalSize;
use crate::registry::domain::artifact_store::ArtifactStore;
use crate::registry::domain::model_artifact::{
    ArtifactDecoder, ArtifactError, ArtifactExpectation, ModelArtifact,
};
use crate::registry::domain::model_trainer::{ModelTrainer, TrainError};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("{kind} classifier unavailable: {load}; retraining failed: {train}")]
    ClassifierUnavailable {
        kind: AttributeKind,
        load: ArtifactError,
        #[source]
        train: TrainError,
    },
    #[error("retraining {kind} classifier failed: {train}")]
    RetrainFailed {
        kind: AttributeKind,
        #[source]
        train: TrainError,
    },
}

impl RegistryError {
    pub fn kind(&self) -> AttributeKind {
        match self {
            RegistryError::ClassifierUnavailable { kind, .. }
            | RegistryError::RetrainFailed { kind, .. } => *kind,
        }
    }
}

/// Lifecycle of one attribute's model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelStatus {
    Unloaded,
    Training,
    Loaded,
    /// Load and retraining both failed; the capability is disabled.
    Unavailable,
}

enum Slot {
    Unloaded,
    Training,
    Loaded(Arc<dyn AttributeClassifier>),
    Unavailable,
}

impl Slot {
    fn status(&self) -> ModelStatus {
        match self {
            Slot::Unloaded => ModelStatus::Unloaded,
            Slot::Training => ModelStatus::Training,
            Slot::Loaded(_) => ModelStatus::Loaded,
            Slot::Unavailable => ModelStatus::Unavailable,
        }
    }
}

/// Loads classifier artifacts once at startup, retraining when an artifact
/// is missing or unusable.
///
/// The registry is mutated only while the process starts. Once a
/// [`ClassifierSet`] has been built, the classifiers it hands out are
/// immutable and can be shared freely across threads.
pub struct ModelRegistry {
    store: Box<dyn ArtifactStore>,
    decoder: Box<dyn ArtifactDecoder>,
    trainer: Option<Box<dyn ModelTrainer>>,
    input_len: usize,
    bucketer: AgeBucketer,
    slots: HashMap<AttributeKind, Slot>,
}

impl ModelRegistry {
    pub fn new(
        store: Box<dyn ArtifactStore>,
        decoder: Box<dyn ArtifactDecoder>,
        trainer: Option<Box<dyn ModelTrainer>>,
        size: CanonicalSize,
        bucketer: AgeBucketer,
    ) -> Self {
        Self {
            store,
            decoder,
            trainer,
            input_len: size.len(),
            bucketer,
            slots: HashMap::new(),
        }
    }

    pub fn status(&self, kind: AttributeKind) -> ModelStatus {
        self.slots.get(&kind).map_or(ModelStatus::Unloaded, Slot::status)
    }

    fn expectation(&self, kind: AttributeKind) -> ArtifactExpectation {
        ArtifactExpectation {
            kind,
            input_len: self.input_len,
            bucket_table_version: match kind {
                AttributeKind::Gender => None,
                AttributeKind::Age => Some(self.bucketer.table().version),
            },
        }
    }

    /// Reads and validates the stored artifact without ever training.
    ///
    /// Returns the cached classifier when the model is already loaded.
    pub fn load(
        &mut self,
        kind: AttributeKind,
    ) -> Result<Arc<dyn AttributeClassifier>, ArtifactError> {
        if let Some(Slot::Loaded(model)) = self.slots.get(&kind) {
            return Ok(model.clone());
        }

        let bytes = self.store.read(kind)?;
        let artifact = self.decoder.decode(&bytes)?;
        artifact.validate(&self.expectation(kind))?;

        let model = artifact.into_classifier();
        self.slots.insert(kind, Slot::Loaded(model.clone()));
        log::info!("Loaded {kind} classifier");
        Ok(model)
    }

    /// Loads the artifact, falling back to train-and-persist when it is
    /// missing or unreadable.
    pub fn ensure(
        &mut self,
        kind: AttributeKind,
    ) -> Result<Arc<dyn AttributeClassifier>, RegistryError> {
        match self.load(kind) {
            Ok(model) => Ok(model),
            Err(load) => {
                log::warn!("Could not load {kind} classifier ({load}), retraining");
                self.train_and_persist(kind)
                    .map_err(|train| RegistryError::ClassifierUnavailable { kind, load, train })
            }
        }
    }

    /// Trains a fresh model even if one is loaded, replacing it.
    ///
    /// A model that was already loaded stays in service if training fails.
    pub fn retrain(
        &mut self,
        kind: AttributeKind,
    ) -> Result<Arc<dyn AttributeClassifier>, RegistryError> {
        self.train_and_persist(kind)
            .map_err(|train| RegistryError::RetrainFailed { kind, train })
    }

    fn train_and_persist(
        &mut self,
        kind: AttributeKind,
    ) -> Result<Arc<dyn AttributeClassifier>, TrainError> {
        let previous = self.slots.insert(kind, Slot::Training);

        let artifact = match self.train_validated(kind) {
            Ok(artifact) => artifact,
            Err(e) => {
                let restored = match previous {
                    Some(Slot::Loaded(model)) => Slot::Loaded(model),
                    _ => Slot::Unavailable,
                };
                self.slots.insert(kind, restored);
                return Err(e);
            }
        };

        match artifact.to_bytes() {
            Ok(bytes) => {
                if let Err(e) = self.store.write(kind, &bytes) {
                    log::warn!("Trained {kind} classifier could not be persisted: {e}");
                }
            }
            Err(e) => log::warn!("Trained {kind} classifier could not be serialized: {e}"),
        }

        let model = artifact.into_classifier();
        self.slots.insert(kind, Slot::Loaded(model.clone()));
        log::info!("Trained {kind} classifier");
        Ok(model)
    }

    fn train_validated(&self, kind: AttributeKind) -> Result<Box<dyn ModelArtifact>, TrainError> {
        let trainer = self.trainer.as_ref().ok_or(TrainError::NoTrainer)?;
        let artifact = trainer.train(kind)?;
        artifact
            .validate(&self.expectation(kind))
            .map_err(TrainError::InvalidArtifact)?;
        Ok(artifact)
    }

    /// Builds the classifiers a pipeline runs with.
    ///
    /// Gender is mandatory and its failure is returned. Age is optional: when
    /// disabled or unavailable the set simply has no age classifier.
    pub fn classifier_set(&mut self, age_enabled: bool) -> Result<ClassifierSet, RegistryError> {
        let gender = GenderClassifier::new(self.ensure(AttributeKind::Gender)?);

        let age = if age_enabled {
            match self.ensure(AttributeKind::Age) {
                Ok(model) => Some(AgeClassifier::new(model, self.bucketer.clone())),
                Err(e) => {
                    log::warn!("Continuing without age prediction: {e}");
                    None
                }
            }
        } else {
            None
        };

        Ok(ClassifierSet::new(gender, age))
    }
}
