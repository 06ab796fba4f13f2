use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use faceprofile_core::classification::domain::age_bucketer::AgeBucketer;
use faceprofile_core::classification::domain::attribute_classifier::AttributeKind;
use faceprofile_core::classification::infrastructure::softmax_trainer::DatasetTrainer;
use faceprofile_core::detection::domain::face_detector::FaceDetector;
use faceprofile_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use faceprofile_core::features::domain::feature_extractor::FeatureExtractor;
use faceprofile_core::features::domain::feature_vector::RescaleRule;
use faceprofile_core::imaging::infrastructure::image_file_reader::ImageFileReader;
use faceprofile_core::imaging::infrastructure::image_file_writer::ImageFileWriter;
use faceprofile_core::pipeline::classify_image_use_case::{ClassifyImageUseCase, ClassifyOutcome};
use faceprofile_core::pipeline::face_pipeline::FacePipeline;
use faceprofile_core::pipeline::infrastructure::ordered_worker_pool::OrderedWorkerPool;
use faceprofile_core::pipeline::pipeline_logger::{PipelineLogger, StdoutPipelineLogger};
use faceprofile_core::registry::domain::model_registry::ModelRegistry;
use faceprofile_core::registry::infrastructure::file_artifact_store::FileArtifactStore;
use faceprofile_core::registry::infrastructure::json_model_artifact::JsonArtifactDecoder;
use faceprofile_core::shared::config::Settings;
use faceprofile_core::shared::constants::{IMAGE_EXTENSIONS, YOLO_MODEL_NAME, YOLO_MODEL_URL};
use faceprofile_core::shared::model_resolver;

/// Face detection with gender and age prediction.
#[derive(Parser)]
#[command(name = "faceprofile", version)]
struct Cli {
    /// Settings file to use instead of the user's settings.json.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find faces in an image and predict their attributes.
    Classify(ClassifyArgs),
    /// Rebuild classifiers from the training dataset.
    Train(TrainArgs),
}

#[derive(Args)]
struct ClassifyArgs {
    /// Input image file.
    image: PathBuf,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    /// Save each detected face crop to this directory.
    #[arg(long)]
    faces_dir: Option<PathBuf>,

    /// Save the downscaled grayscale face images to this directory.
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Faces classified in parallel (0 = all cores).
    #[arg(long)]
    workers: Option<usize>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    #[command(flatten)]
    models: ModelArgs,

    /// Skip age prediction.
    #[arg(long)]
    no_age: bool,

    /// How intensities become integers: truncate or round.
    #[arg(long)]
    rescale: Option<RescaleRule>,
}

#[derive(Args)]
struct TrainArgs {
    /// Attribute to train: gender or age (default: both).
    #[arg(long)]
    kind: Option<AttributeKind>,

    /// Gradient descent epochs.
    #[arg(long)]
    epochs: Option<usize>,

    #[command(flatten)]
    models: ModelArgs,
}

#[derive(Args)]
struct ModelArgs {
    /// Directory holding classifier artifacts.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Training CSV (age,ethnicity,gender,img_name,pixels).
    #[arg(long)]
    dataset: Option<PathBuf>,
}

impl ModelArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(dir) = &self.models_dir {
            settings.models_dir = Some(dir.clone());
        }
        if let Some(path) = &self.dataset {
            settings.dataset_path = Some(path.clone());
        }
    }
}

impl ClassifyArgs {
    fn apply(&self, settings: &mut Settings) {
        self.models.apply(settings);
        if let Some(workers) = self.workers {
            settings.workers = workers;
        }
        if let Some(confidence) = self.confidence {
            settings.confidence = confidence;
        }
        if let Some(rule) = self.rescale {
            settings.rescale = rule;
        }
        if self.no_age {
            settings.age_model_enabled = false;
        }
        if self.faces_dir.is_some() {
            settings.faces_dir = self.faces_dir.clone();
        }
        if self.debug_dir.is_some() {
            settings.debug_dir = self.debug_dir.clone();
        }
    }
}

impl TrainArgs {
    fn apply(&self, settings: &mut Settings) {
        self.models.apply(settings);
        if let Some(epochs) = self.epochs {
            settings.training.epochs = epochs;
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load(),
    };

    match cli.command {
        Command::Classify(args) => {
            args.apply(&mut settings);
            settings.validate()?;
            validate_image(&args.image)?;
            run_classify(&args, &settings)
        }
        Command::Train(args) => {
            args.apply(&mut settings);
            settings.validate()?;
            run_train(args.kind, &settings)
        }
    }
}

fn run_classify(args: &ClassifyArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = build_registry(settings)?;
    let classifiers = Arc::new(registry.classifier_set(settings.age_model_enabled)?);
    let detector = build_detector(settings.confidence)?;

    let mut extractor = FeatureExtractor::new(settings.canonical_size, settings.rescale);
    if settings.debug_dir.is_some() || settings.faces_dir.is_some() {
        extractor = extractor.with_debug_writer(Box::new(ImageFileWriter::new()));
    }

    let logger = Arc::new(StdoutPipelineLogger::new());
    let mut pipeline = FacePipeline::new(detector, extractor, classifiers)
        .with_pool(OrderedWorkerPool::new(settings.effective_workers()))
        .with_logger(logger.clone());
    if let Some(dir) = &settings.debug_dir {
        pipeline = pipeline.with_artifact_dir(dir);
    }

    let mut use_case = ClassifyImageUseCase::new(Box::new(ImageFileReader::new()), pipeline);
    if let Some(dir) = &settings.faces_dir {
        use_case = use_case.with_crop_store(Box::new(ImageFileWriter::new()), dir);
    }

    let outcome = use_case.execute(&args.image)?;
    logger.summary();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&args.image, &outcome);
    }
    Ok(())
}

fn run_train(kind: Option<AttributeKind>, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let kinds: Vec<AttributeKind> = match kind {
        Some(kind) => vec![kind],
        None => AttributeKind::ALL.to_vec(),
    };
    let store = artifact_store(settings)?;
    let paths: Vec<PathBuf> = kinds.iter().map(|k| store.path_for(*k)).collect();

    let mut registry = registry_with_store(store, settings);
    for (kind, path) in kinds.iter().zip(paths) {
        registry.retrain(*kind)?;
        println!("Trained {kind} classifier: {}", path.display());
    }
    Ok(())
}

fn artifact_store(settings: &Settings) -> Result<FileArtifactStore, Box<dyn std::error::Error>> {
    let dir = match &settings.models_dir {
        Some(dir) => dir.clone(),
        None => FileArtifactStore::default_dir()?,
    };
    Ok(FileArtifactStore::new(dir))
}

fn build_registry(settings: &Settings) -> Result<ModelRegistry, Box<dyn std::error::Error>> {
    Ok(registry_with_store(artifact_store(settings)?, settings))
}

fn registry_with_store(store: FileArtifactStore, settings: &Settings) -> ModelRegistry {
    let bucketer = AgeBucketer::default();
    let trainer = DatasetTrainer::new(
        settings.dataset_path(),
        settings.canonical_size,
        bucketer.table().clone(),
        settings.training,
    );
    ModelRegistry::new(
        Box::new(store),
        Box::new(JsonArtifactDecoder),
        Some(Box::new(trainer)),
        settings.canonical_size,
        bucketer,
    )
}

fn build_detector(confidence: f64) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        YOLO_MODEL_NAME,
        YOLO_MODEL_URL,
        None,
        None,
        Some(Box::new(download_progress)),
    )?;

    Ok(Box::new(OnnxYoloDetector::new(&model_path, confidence)?))
}

fn print_outcome(image: &Path, outcome: &ClassifyOutcome) {
    match outcome {
        ClassifyOutcome::NoFaces => println!("{}: no faces found", image.display()),
        ClassifyOutcome::Faces { faces } => {
            println!("{}: {} face(s)", image.display(), faces.len());
            for (i, face) in faces.iter().enumerate() {
                let mut line = format!("  face {i}");
                if let Some(b) = face.region.bounds() {
                    line.push_str(&format!(" at {},{} {}x{}", b.x, b.y, b.width, b.height));
                }
                line.push_str(&format!(": {}", face.gender));
                if let Some(age) = &face.age {
                    line.push_str(&format!(", {age}"));
                }
                if let Some(path) = face.region.stored_path() {
                    line.push_str(&format!(" [{}]", path.display()));
                }
                println!("{line}");
                if !face.is_complete() {
                    for failure in &face.failures {
                        println!("    ! {failure}");
                    }
                }
            }
        }
    }
}

fn validate_image(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("Input file not found: {}", path.display()).into());
    }
    if !is_image(path) {
        return Err(format!(
            "Unsupported image type: {} (expected one of {})",
            path.display(),
            IMAGE_EXTENSIONS.join(", ")
        )
        .into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
