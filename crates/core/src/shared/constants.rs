pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Native resolution of the face dataset the classifiers are trained on.
pub const CANONICAL_WIDTH: u32 = 48;
pub const CANONICAL_HEIGHT: u32 = 48;

pub const GENDER_ARTIFACT_NAME: &str = "gender_model.json";
pub const AGE_ARTIFACT_NAME: &str = "age_model.json";

pub const DEFAULT_DATASET_NAME: &str = "age_gender.csv";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp"];

/// Application directory name under the platform cache/config roots.
pub const APP_DIR_NAME: &str = "FaceProfile";
