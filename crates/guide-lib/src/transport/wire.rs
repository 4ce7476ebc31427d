use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::GuideError;
use crate::vision::ClassificationResult;

/// Body of a successful `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub landmark: String,
    pub confidence: f64,
    pub scores: BTreeMap<String, f64>,
}

impl From<ClassificationResult> for PredictResponse {
    fn from(result: ClassificationResult) -> Self {
        let (landmark, confidence, scores) = result.into_parts();
        Self {
            landmark,
            confidence,
            scores,
        }
    }
}

impl PredictResponse {
    /// Validate the response and turn it back into a result.
    pub fn into_result(self) -> Result<ClassificationResult, GuideError> {
        ClassificationResult::from_parts(self.landmark, self.confidence, self.scores)
    }
}

/// Body of a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
