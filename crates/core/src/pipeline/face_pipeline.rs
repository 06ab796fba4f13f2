use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::classification::domain::attribute_classifier::{AttributeKind, ClassifierSet};
use crate::classification::domain::labels::{AgeRange, Gender};
use crate::detection::domain::face_detector::{DetectError, FaceDetector};
use crate::detection::domain::face_region::FaceRegion;
use crate::features::domain::feature_extractor::{ExtractError, FeatureExtractor};
use crate::pipeline::infrastructure::ordered_worker_pool::OrderedWorkerPool;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The detector itself failed; distinct from finding no faces.
    #[error("face detection failed: {0}")]
    DetectionFailure(#[source] DetectError),
}

/// Why one face's labels are less than complete.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FaceFailure {
    InvalidRegion { width: u32, height: u32 },
    ClassificationFailed {
        attribute: AttributeKind,
        message: String,
    },
}

impl fmt::Display for FaceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaceFailure::InvalidRegion { width, height } => {
                write!(f, "invalid face region ({width}x{height})")
            }
            FaceFailure::ClassificationFailed { attribute, message } => {
                write!(f, "{attribute} classification failed: {message}")
            }
        }
    }
}

impl From<ExtractError> for FaceFailure {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::InvalidRegion { width, height } => {
                FaceFailure::InvalidRegion { width, height }
            }
        }
    }
}

/// Labels for one detected face.
///
/// `age` is `None` when no age classifier is registered, and
/// `Some(AgeRange::Unknown)` when one is but it could not answer.
#[derive(Clone, Debug, Serialize)]
pub struct FaceResult {
    #[serde(flatten)]
    pub region: FaceRegion,
    pub gender: Gender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<AgeRange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FaceFailure>,
}

impl FaceResult {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

struct FaceLabels {
    gender: Gender,
    age: Option<AgeRange>,
    failures: Vec<FaceFailure>,
}

/// detect → per face extract → classify → results in detector order.
///
/// A face that cannot be extracted or classified is reported with unknown
/// labels and a failure record; it never affects the other faces.
pub struct FacePipeline {
    detector: Box<dyn FaceDetector>,
    extractor: FeatureExtractor,
    classifiers: Arc<ClassifierSet>,
    pool: OrderedWorkerPool,
    logger: Arc<dyn PipelineLogger>,
    artifact_dir: Option<PathBuf>,
}

impl FacePipeline {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        extractor: FeatureExtractor,
        classifiers: Arc<ClassifierSet>,
    ) -> Self {
        Self {
            detector,
            extractor,
            classifiers,
            pool: OrderedWorkerPool::sequential(),
            logger: Arc::new(NullPipelineLogger),
            artifact_dir: None,
        }
    }

    pub fn with_pool(mut self, pool: OrderedWorkerPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Directory for downscaled debug images. Without it they go next to
    /// each stored face crop, if any.
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    pub fn classifiers(&self) -> &ClassifierSet {
        &self.classifiers
    }

    /// Runs detection once and crops every region, in detector order.
    pub fn locate(&self, frame: &Frame) -> Result<Vec<FaceRegion>, PipelineError> {
        let t0 = Instant::now();
        let regions = self
            .detector
            .detect(frame)
            .map_err(PipelineError::DetectionFailure)?;
        self.logger
            .timing("detect", t0.elapsed().as_secs_f64() * 1000.0);
        self.logger.metric("faces", regions.len() as f64);

        Ok(regions
            .into_iter()
            .map(|r| FaceRegion::from_detection(frame, r))
            .collect())
    }

    /// Labels already-located faces. Output order equals input order.
    pub fn classify_faces(&self, faces: Vec<FaceRegion>) -> Vec<FaceResult> {
        let total = faces.len();
        let done = Mutex::new(0usize);
        let labels = self.pool.map(&faces, |i, face| {
            let labels = self.label_face(i, face);
            // Held while reporting so counts arrive in order.
            if let Ok(mut done) = done.lock() {
                *done += 1;
                self.logger.progress(*done, total);
            }
            labels
        });

        faces
            .into_iter()
            .zip(labels)
            .map(|(region, labels)| FaceResult {
                region,
                gender: labels.gender,
                age: labels.age,
                failures: labels.failures,
            })
            .collect()
    }

    /// Detects and labels every face in `frame`.
    ///
    /// No faces is `Ok(vec![])`; only a detector failure is an error.
    pub fn process(&self, frame: &Frame) -> Result<Vec<FaceResult>, PipelineError> {
        let faces = self.locate(frame)?;
        if faces.is_empty() {
            self.logger.info("No faces found");
            return Ok(Vec::new());
        }
        Ok(self.classify_faces(faces))
    }

    fn label_face(&self, index: usize, face: &FaceRegion) -> FaceLabels {
        let has_age = self.classifiers.age().is_some();
        let unknown_age = || has_age.then_some(AgeRange::Unknown);

        let t0 = Instant::now();
        let artifact = face.artifact_path(self.artifact_dir.as_deref(), index);
        let features = match self
            .extractor
            .extract_with_artifact(face.crop(), artifact.as_deref())
        {
            Ok(features) => features,
            Err(e) => {
                log::warn!("Skipping face {index}: {e}");
                return FaceLabels {
                    gender: Gender::Unknown,
                    age: unknown_age(),
                    failures: vec![e.into()],
                };
            }
        };
        self.logger
            .timing("extract", t0.elapsed().as_secs_f64() * 1000.0);

        let t1 = Instant::now();
        let mut failures = Vec::new();
        let gender = match self.classifiers.gender().classify(&features) {
            Ok(gender) => gender,
            Err(e) => {
                log::warn!("Gender classification failed for face {index}: {e}");
                failures.push(FaceFailure::ClassificationFailed {
                    attribute: AttributeKind::Gender,
                    message: e.to_string(),
                });
                Gender::Unknown
            }
        };

        let age = self.classifiers.age().map(|age| match age.classify(&features) {
            Ok(range) => range,
            Err(e) => {
                log::warn!("Age classification failed for face {index}: {e}");
                failures.push(FaceFailure::ClassificationFailed {
                    attribute: AttributeKind::Age,
                    message: e.to_string(),
                });
                AgeRange::Unknown
            }
        });
        self.logger
            .timing("classify", t1.elapsed().as_secs_f64() * 1000.0);

        FaceLabels {
            gender,
            age,
            failures,
        }
    }
}
