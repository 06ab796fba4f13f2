pub mod face_dataset;
pub mod softmax_regression;
pub mod softmax_trainer;
