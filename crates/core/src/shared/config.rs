use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classification::infrastructure::softmax_trainer::TrainingParams;
use crate::detection::infrastructure::onnx_yolo_detector::DEFAULT_CONFIDENCE;
use crate::features::domain::feature_vector::{CanonicalSize, RescaleRule};
use crate::shared::constants::{APP_DIR_NAME, DEFAULT_DATASET_NAME};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// User settings, persisted as JSON under the platform config directory.
///
/// Missing fields fall back to their defaults so older files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub canonical_size: CanonicalSize,
    pub rescale: RescaleRule,
    /// Face workers per image; 0 uses every available core.
    pub workers: usize,
    pub confidence: f64,
    /// Where classifier artifacts live. Defaults to the model cache.
    pub models_dir: Option<PathBuf>,
    /// Training CSV used when an artifact has to be rebuilt.
    pub dataset_path: Option<PathBuf>,
    pub age_model_enabled: bool,
    pub training: TrainingParams,
    pub faces_dir: Option<PathBuf>,
    pub debug_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            canonical_size: CanonicalSize::default(),
            rescale: RescaleRule::default(),
            workers: 0,
            confidence: DEFAULT_CONFIDENCE,
            models_dir: None,
            dataset_path: None,
            age_model_enabled: true,
            training: TrainingParams::default(),
            faces_dir: None,
            debug_dir: None,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("settings.json"))
    }

    /// Loads the user's settings, or defaults if there are none or they
    /// cannot be read.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(SettingsError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Self::default()
            }
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.canonical_size.is_empty() {
            return Err(SettingsError::Invalid(
                "canonical size must be at least 1x1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(SettingsError::Invalid(format!(
                "confidence must be between 0 and 1, got {}",
                self.confidence
            )));
        }
        if self.training.epochs == 0 {
            return Err(SettingsError::Invalid("training epochs must be positive".into()));
        }
        if !(self.training.learning_rate > 0.0 && self.training.learning_rate.is_finite()) {
            return Err(SettingsError::Invalid(
                "learning rate must be a positive number".into(),
            ));
        }
        if !(self.training.l2 >= 0.0 && self.training.l2.is_finite()) {
            return Err(SettingsError::Invalid("l2 penalty must be non-negative".into()));
        }
        Ok(())
    }

    /// The configured dataset, or `age_gender.csv` in the working directory.
    pub fn dataset_path(&self) -> PathBuf {
        self.dataset_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_NAME))
    }

    /// Worker count with 0 resolved to the available parallelism.
    pub fn effective_workers(&self) -> usize {
        match self.workers {
            0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        }
    }
}
