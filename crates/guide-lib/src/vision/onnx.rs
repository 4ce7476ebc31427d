use std::path::Path;

use anyhow::anyhow;
use ort::session::Session;
use ort::value::Tensor;

use super::classifier::ScoreModel;
use super::preprocess::input_shape;
use crate::context::Device;
use crate::error::GuideError;
use crate::onnx::open_session;

/// File name of the exported vision model under `model_dir/vision/`.
pub const VISION_MODEL_FILE: &str = "model.onnx";

/// EfficientNet-style landmark classifier exported to ONNX.
///
/// Takes a `[1, 224, 224, 3]` float tensor in `[0, 255]` and returns one
/// probability per label.
pub struct OnnxScoreModel {
    session: Session,
    input_name: String,
}

impl OnnxScoreModel {
    /// Load the vision model from `vision_dir/model.onnx`.
    ///
    /// Any failure is reported as [`GuideError::ModelLoad`]; callers treat it
    /// as fatal.
    pub fn load(vision_dir: &Path, device: Device) -> Result<Self, GuideError> {
        let path = vision_dir.join(VISION_MODEL_FILE);
        if !path.exists() {
            return Err(GuideError::ModelLoad(format!(
                "Vision model not found at {}. Export the classifier to ONNX and place it there.",
                path.display()
            )));
        }

        let session =
            open_session(&path, device).map_err(|e| GuideError::ModelLoad(format!("{e:#}")))?;
        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| GuideError::ModelLoad("vision model declares no inputs".into()))?;

        Ok(Self {
            session,
            input_name,
        })
    }
}

impl ScoreModel for OnnxScoreModel {
    fn scores(&mut self, tensor: &[f32]) -> anyhow::Result<Vec<f32>> {
        let input = Tensor::from_array((input_shape(), tensor.to_vec()))
            .map_err(|e| anyhow!("Failed to build input tensor: {e}"))?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| anyhow!("Vision inference failed: {e}"))?;
        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| anyhow!("Expected a float score tensor: {e}"))?;
        Ok(scores.to_vec())
    }
}
