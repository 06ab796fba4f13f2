use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::detection::domain::face_region::FaceRegion;
use crate::imaging::domain::image_reader::ImageReader;
use crate::imaging::domain::image_writer::ImageWriter;
use crate::pipeline::face_pipeline::{FacePipeline, FaceResult, PipelineError};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum ClassifyImageError {
    #[error("failed to read image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// What one image produced.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClassifyOutcome {
    #[serde(rename = "face_not_found")]
    NoFaces,
    Faces { faces: Vec<FaceResult> },
}

impl ClassifyOutcome {
    pub fn faces(&self) -> &[FaceResult] {
        match self {
            ClassifyOutcome::NoFaces => &[],
            ClassifyOutcome::Faces { faces } => faces,
        }
    }
}

/// Single-image flow: read → detect → store crops → classify.
pub struct ClassifyImageUseCase {
    reader: Box<dyn ImageReader>,
    pipeline: FacePipeline,
    crop_store: Option<(Box<dyn ImageWriter>, PathBuf)>,
}

impl ClassifyImageUseCase {
    pub fn new(reader: Box<dyn ImageReader>, pipeline: FacePipeline) -> Self {
        Self {
            reader,
            pipeline,
            crop_store: None,
        }
    }

    /// Saves every detected face as `<dir>/<stem>_face<N>.png`.
    pub fn with_crop_store(mut self, writer: Box<dyn ImageWriter>, dir: impl Into<PathBuf>) -> Self {
        self.crop_store = Some((writer, dir.into()));
        self
    }

    pub fn execute(&self, input_path: &Path) -> Result<ClassifyOutcome, ClassifyImageError> {
        let frame = self
            .reader
            .read(input_path)
            .map_err(|source| ClassifyImageError::Read {
                path: input_path.to_path_buf(),
                source,
            })?;
        let stem = input_path
            .file_stem()
            .map_or_else(|| "image".to_string(), |s| s.to_string_lossy().into_owned());
        Ok(self.classify(&frame, &stem)?)
    }

    /// Classifies an in-memory image. `stem` names any stored crops.
    pub fn classify(&self, frame: &Frame, stem: &str) -> Result<ClassifyOutcome, PipelineError> {
        let faces = self.pipeline.locate(frame)?;
        if faces.is_empty() {
            log::info!("No faces found in {stem}");
            return Ok(ClassifyOutcome::NoFaces);
        }

        let faces = match &self.crop_store {
            Some((writer, dir)) => store_crops(writer.as_ref(), dir, stem, faces),
            None => faces,
        };
        Ok(ClassifyOutcome::Faces {
            faces: self.pipeline.classify_faces(faces),
        })
    }
}

/// A crop that fails to save is still classified, just without a path.
fn store_crops(
    writer: &dyn ImageWriter,
    dir: &Path,
    stem: &str,
    faces: Vec<FaceRegion>,
) -> Vec<FaceRegion> {
    faces
        .into_iter()
        .enumerate()
        .map(|(i, face)| {
            if face.crop().is_empty() {
                return face;
            }
            let path = dir.join(format!("{stem}_face{i}.png"));
            match writer.write(&path, face.crop()) {
                Ok(()) => face.with_stored_path(path),
                Err(e) => {
                    log::warn!("Failed to save face crop {}: {e}", path.display());
                    face
                }
            }
        })
        .collect()
}
