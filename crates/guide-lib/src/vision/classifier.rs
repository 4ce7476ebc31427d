use tracing::debug;

use super::preprocess::image_to_tensor;
use super::result::ClassificationResult;
use crate::error::GuideError;
use crate::labels::LabelSet;

/// Turns image bytes into a labeled score distribution.
///
/// Implemented locally by [`LandmarkClassifier`] and remotely by
/// [`crate::transport::client::VisionClient`].
pub trait ClassificationService {
    fn classify(&mut self, image: &[u8]) -> Result<ClassificationResult, GuideError>;
}

/// A vision model: one forward pass from an input tensor to per-label scores.
pub trait ScoreModel {
    fn scores(&mut self, tensor: &[f32]) -> anyhow::Result<Vec<f32>>;
}

/// Local classification service backed by a [`ScoreModel`].
pub struct LandmarkClassifier<M> {
    labels: LabelSet,
    model: M,
}

impl<M: ScoreModel> LandmarkClassifier<M> {
    pub fn new(labels: LabelSet, model: M) -> Self {
        Self { labels, model }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }
}

impl<M: ScoreModel> ClassificationService for LandmarkClassifier<M> {
    fn classify(&mut self, image: &[u8]) -> Result<ClassificationResult, GuideError> {
        let tensor = image_to_tensor(image)?;
        let raw = self
            .model
            .scores(&tensor)
            .map_err(|e| GuideError::Classification(format!("{e:#}")))?;
        let result = ClassificationResult::from_scores(&self.labels, &raw)?;
        debug!(
            label = result.label(),
            confidence = result.confidence(),
            bytes = image.len(),
            "Classified image"
        );
        Ok(result)
    }
}
