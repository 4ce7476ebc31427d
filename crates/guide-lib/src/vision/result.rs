use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{CONFIDENCE_TOLERANCE, SCORE_SUM_TOLERANCE};
use crate::error::GuideError;
use crate::labels::LabelSet;

/// Labeled, confidence-scored output of one classification.
///
/// Invariants: `scores` covers the whole label set, each score lies in
/// `[0, 1]` and they sum to one; `label` is the argmax and `confidence` is
/// `100 * scores[label]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    label: String,
    confidence: f64,
    scores: BTreeMap<String, f64>,
}

impl ClassificationResult {
    /// Build a result from raw model output aligned with `labels`.
    ///
    /// Non-negative scores are rescaled to sum to one. A vector with a
    /// negative entry, or one that sums to zero, is treated as logits and
    /// passed through a softmax instead. Ties on the maximum resolve to the
    /// earliest label.
    pub fn from_scores(labels: &LabelSet, raw: &[f32]) -> Result<Self, GuideError> {
        if raw.len() != labels.len() {
            return Err(GuideError::Classification(format!(
                "model produced {} scores for {} labels",
                raw.len(),
                labels.len()
            )));
        }
        if raw.iter().any(|s| !s.is_finite()) {
            return Err(GuideError::Classification(
                "model produced a non-finite score".into(),
            ));
        }

        let probs = normalize(raw.iter().map(|&s| f64::from(s)).collect());

        let mut top = 0;
        for (i, &p) in probs.iter().enumerate() {
            if p > probs[top] {
                top = i;
            }
        }

        let scores = labels
            .iter()
            .zip(&probs)
            .map(|(label, &p)| (label.to_string(), p))
            .collect();
        let label = labels.get(top).unwrap_or_default().to_string();

        Ok(Self {
            label,
            confidence: probs[top] * 100.0,
            scores,
        })
    }

    /// Reassemble a result received over the wire, checking its invariants.
    pub fn from_parts(
        label: String,
        confidence: f64,
        scores: BTreeMap<String, f64>,
    ) -> Result<Self, GuideError> {
        if !(0.0..=100.0).contains(&confidence) {
            return Err(GuideError::Classification(format!(
                "confidence {confidence} is outside [0, 100]"
            )));
        }
        if scores.values().any(|s| !(0.0..=1.0).contains(s)) {
            return Err(GuideError::Classification(
                "score outside [0, 1] in response".into(),
            ));
        }
        let Some(&top) = scores.get(&label) else {
            return Err(GuideError::Classification(format!(
                "label {label:?} is missing from the score map"
            )));
        };

        let sum: f64 = scores.values().sum();
        if (sum - 1.0).abs() > SCORE_SUM_TOLERANCE {
            return Err(GuideError::Classification(format!(
                "scores sum to {sum}, not 1"
            )));
        }
        if let Some((other, _)) = scores.iter().find(|&(_, &s)| s > top) {
            return Err(GuideError::Classification(format!(
                "label {label:?} is not the top score ({other:?} is higher)"
            )));
        }
        if (confidence - top * 100.0).abs() > CONFIDENCE_TOLERANCE {
            return Err(GuideError::Classification(format!(
                "confidence {confidence} does not match score {top} of {label:?}"
            )));
        }

        Ok(Self {
            label,
            confidence,
            scores,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Top label's probability as a percentage.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn scores(&self) -> &BTreeMap<String, f64> {
        &self.scores
    }

    pub fn score(&self, label: &str) -> Option<f64> {
        self.scores.get(label).copied()
    }

    /// The `k` highest-scoring labels, best first.
    pub fn top_k(&self, k: usize) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .scores
            .iter()
            .map(|(label, &score)| (label.as_str(), score))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);
        ranked
    }

    pub fn into_parts(self) -> (String, f64, BTreeMap<String, f64>) {
        (self.label, self.confidence, self.scores)
    }
}

fn normalize(values: Vec<f64>) -> Vec<f64> {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 && values.iter().all(|&v| v >= 0.0) {
        values.into_iter().map(|v| v / sum).collect()
    } else {
        softmax(&values)
    }
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
