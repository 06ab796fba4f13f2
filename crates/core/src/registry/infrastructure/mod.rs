pub mod file_artifact_store;
pub mod json_model_artifact;
