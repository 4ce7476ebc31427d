pub mod classifier;
pub mod onnx;
pub mod preprocess;
pub mod result;

pub use classifier::{ClassificationService, LandmarkClassifier, ScoreModel};
pub use result::ClassificationResult;
