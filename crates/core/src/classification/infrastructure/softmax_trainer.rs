use std::path::PathBuf;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::classification::domain::age_bucketer::AgeBucketTable;
use crate::classification::domain::attribute_classifier::AttributeKind;
use crate::classification::infrastructure::face_dataset::{FaceDataset, FaceSample};
use crate::classification::infrastructure::softmax_regression::{softmax, SoftmaxRegression};
use crate::features::domain::feature_vector::CanonicalSize;
use crate::registry::domain::model_artifact::ModelArtifact;
use crate::registry::domain::model_trainer::{ModelTrainer, TrainError};
use crate::registry::infrastructure::json_model_artifact::{JsonModelArtifact, ModelPayload};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    pub epochs: usize,
    pub learning_rate: f32,
    /// L2 penalty on the weights (not the bias).
    pub l2: f32,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: 300,
            learning_rate: 1.0,
            l2: 1e-4,
        }
    }
}

/// Full-batch gradient descent on the cross-entropy loss.
///
/// `x` is `samples × features` in `[0, 1]`, `labels` are class indices below
/// `num_classes`. Parameters start at zero so training is deterministic.
pub fn fit(
    x: &Array2<f32>,
    labels: &[usize],
    num_classes: usize,
    params: &TrainingParams,
) -> SoftmaxRegression {
    let (n, d) = x.dim();
    let mut weights = Array2::<f32>::zeros((num_classes, d));
    let mut bias = Array1::<f32>::zeros(num_classes);
    if n == 0 {
        return SoftmaxRegression::from_arrays(weights, bias);
    }

    let mut targets = Array2::<f32>::zeros((n, num_classes));
    for (row, &label) in labels.iter().enumerate() {
        targets[[row, label]] = 1.0;
    }
    let scale = 1.0 / n as f32;

    for epoch in 0..params.epochs {
        let logits = x.dot(&weights.t()) + &bias;
        let mut probs = logits;
        for mut row in probs.axis_iter_mut(Axis(0)) {
            let p = softmax(row.view());
            row.assign(&p);
        }

        let error = probs - &targets;
        let grad_w = error.t().dot(x) * scale + &weights * params.l2;
        let grad_b = error.sum_axis(Axis(0)) * scale;

        weights.scaled_add(-params.learning_rate, &grad_w);
        bias.scaled_add(-params.learning_rate, &grad_b);

        if epoch % 50 == 0 {
            log::debug!("epoch {epoch}: |grad| = {:.5}", grad_w.mapv(f32::abs).sum());
        }
    }

    SoftmaxRegression::from_arrays(weights, bias)
}

/// Trains gender and age models from the face CSV on disk.
pub struct DatasetTrainer {
    dataset_path: PathBuf,
    size: CanonicalSize,
    table: AgeBucketTable,
    params: TrainingParams,
}

impl DatasetTrainer {
    pub fn new(
        dataset_path: impl Into<PathBuf>,
        size: CanonicalSize,
        table: AgeBucketTable,
        params: TrainingParams,
    ) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            size,
            table,
            params,
        }
    }

    pub fn train_on(
        &self,
        dataset: &FaceDataset,
        kind: AttributeKind,
    ) -> Result<JsonModelArtifact, TrainError> {
        let (samples, labels, num_classes, table_version) = match kind {
            AttributeKind::Gender => {
                let (samples, labels) = labelled(dataset, kind, |s| match s.gender {
                    0 | 1 => Some(s.gender as usize),
                    _ => None,
                });
                (samples, labels, 2, None)
            }
            AttributeKind::Age => {
                let (samples, labels) =
                    labelled(dataset, kind, |s| self.table.index_for_years(s.age));
                (samples, labels, self.table.len(), Some(self.table.version))
            }
        };

        if samples.is_empty() {
            return Err(TrainError::EmptyDataset { kind });
        }

        log::info!(
            "Training {kind} classifier on {} samples ({} classes)",
            samples.len(),
            num_classes
        );
        let x = FaceDataset::features(samples);
        let model = fit(&x, &labels, num_classes, &self.params);

        Ok(JsonModelArtifact::new(
            kind,
            self.size.len(),
            table_version,
            ModelPayload::SoftmaxRegression(model),
        ))
    }
}

fn labelled<'a>(
    dataset: &'a FaceDataset,
    kind: AttributeKind,
    label: impl Fn(&FaceSample) -> Option<usize>,
) -> (Vec<&'a FaceSample>, Vec<usize>) {
    let mut samples = Vec::new();
    let mut labels = Vec::new();
    let mut skipped = 0usize;
    for sample in dataset.samples() {
        match label(sample) {
            Some(l) => {
                samples.push(sample);
                labels.push(l);
            }
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        log::warn!("Skipped {skipped} samples with unusable {kind} labels");
    }
    (samples, labels)
}

impl ModelTrainer for DatasetTrainer {
    fn train(&self, kind: AttributeKind) -> Result<Box<dyn ModelArtifact>, TrainError> {
        let dataset = FaceDataset::load(&self.dataset_path, self.size.len())?;
        Ok(Box::new(self.train_on(&dataset, kind)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::domain::attribute_classifier::AttributeClassifier;
    use crate::classification::domain::labels::RawPrediction;
    use crate::features::domain::feature_vector::FeatureVector;
    use ndarray::array;
    use std::io::Cursor;
    use tempfile::TempDir;

    const SIZE: CanonicalSize = CanonicalSize {
        width: 2,
        height: 1,
    };

    fn dataset(rows: &str) -> FaceDataset {
        let csv = format!("age,ethnicity,gender,img_name,pixels\n{rows}");
        FaceDataset::parse(Cursor::new(csv), SIZE.len()).unwrap()
    }

    fn trainer() -> DatasetTrainer {
        DatasetTrainer::new(
            "unused.csv",
            SIZE,
            AgeBucketTable::standard(),
            TrainingParams::default(),
        )
    }

    #[test]
    fn test_fit_separates_toy_classes() {
        let x = array![[1.0, 0.0], [0.9, 0.1], [0.0, 1.0], [0.1, 0.9]];
        let model = fit(&x, &[0, 0, 1, 1], 2, &TrainingParams::default());

        let left = model.probabilities(array![1.0, 0.0].view());
        let right = model.probabilities(array![0.0, 1.0].view());
        assert!(left[0] > 0.9);
        assert!(right[1] > 0.9);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let x = array![[1.0, 0.0], [0.0, 1.0]];
        let params = TrainingParams {
            epochs: 20,
            ..Default::default()
        };
        assert_eq!(fit(&x, &[0, 1], 2, &params), fit(&x, &[0, 1], 2, &params));
    }

    #[test]
    fn test_fit_without_samples_returns_zero_model() {
        let x = Array2::<f32>::zeros((0, 3));
        let model = fit(&x, &[], 4, &TrainingParams::default());
        assert_eq!(model, SoftmaxRegression::zeros(3, 4));
    }

    #[test]
    fn test_gender_model_learns_dataset_labels() {
        let ds = dataset("20,0,0,a,250 5\n25,0,0,b,240 10\n30,0,1,c,5 250\n35,0,1,d,10 245\n");
        let artifact = trainer().train_on(&ds, AttributeKind::Gender).unwrap();
        assert_eq!(artifact.kind, AttributeKind::Gender);
        assert_eq!(artifact.input_len, 2);
        assert_eq!(artifact.bucket_table_version, None);

        let model = Box::new(artifact).into_classifier();
        assert_eq!(
            model.classify(&FeatureVector::new(vec![255, 0])),
            Ok(RawPrediction::Class(0))
        );
        assert_eq!(
            model.classify(&FeatureVector::new(vec![0, 255])),
            Ok(RawPrediction::Class(1))
        );
    }

    #[test]
    fn test_age_model_uses_bucket_indices() {
        let ds = dataset("1,0,0,a,250 5\n2,0,1,b,240 10\n70,0,0,c,5 250\n80,0,1,d,10 245\n");
        let table = AgeBucketTable::standard();
        let artifact = trainer().train_on(&ds, AttributeKind::Age).unwrap();
        assert_eq!(artifact.bucket_table_version, Some(table.version));

        let model = Box::new(artifact).into_classifier();
        let young = model.classify(&FeatureVector::new(vec![255, 0])).unwrap();
        let old = model.classify(&FeatureVector::new(vec![0, 255])).unwrap();
        assert_eq!(young, RawPrediction::Class(table.index_for_years(1.0).unwrap() as i64));
        assert_eq!(old, RawPrediction::Class(table.index_for_years(75.0).unwrap() as i64));
    }

    #[test]
    fn test_unusable_gender_labels_are_skipped() {
        let ds = dataset("20,0,3,a,1 2\n");
        assert!(matches!(
            trainer().train_on(&ds, AttributeKind::Gender),
            Err(TrainError::EmptyDataset {
                kind: AttributeKind::Gender
            })
        ));
    }

    #[test]
    fn test_train_reads_dataset_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("faces.csv");
        std::fs::write(
            &path,
            "age,ethnicity,gender,img_name,pixels\n20,0,0,a,250 5\n30,0,1,b,5 250\n",
        )
        .unwrap();
        let trainer = DatasetTrainer::new(
            &path,
            SIZE,
            AgeBucketTable::standard(),
            TrainingParams::default(),
        );
        assert!(trainer.train(AttributeKind::Gender).is_ok());
    }

    #[test]
    fn test_missing_dataset_is_dataset_error() {
        assert!(matches!(
            trainer().train(AttributeKind::Gender),
            Err(TrainError::Dataset { .. })
        ));
    }
}
