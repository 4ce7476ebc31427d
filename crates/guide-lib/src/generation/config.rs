use crate::config::{
    DEFAULT_MAX_TOKENS, DEFAULT_NO_REPEAT_NGRAM_SIZE, DEFAULT_NUCLEUS_THRESHOLD,
    DEFAULT_REPETITION_PENALTY, DEFAULT_TEMPERATURE,
};
use crate::error::GuideError;

/// Decoding knobs applied to every generated answer.
///
/// Constructed once at startup and never mutated. [`GenerationConfig::new`]
/// enforces `temperature > 0`, `0 < nucleus_threshold <= 1`,
/// `repetition_penalty >= 1`, `no_repeat_ngram_size >= 1` and
/// `max_tokens > 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    max_tokens: usize,
    temperature: f32,
    nucleus_threshold: f32,
    repetition_penalty: f32,
    no_repeat_ngram_size: usize,
}

impl GenerationConfig {
    pub fn new(
        max_tokens: usize,
        temperature: f32,
        nucleus_threshold: f32,
        repetition_penalty: f32,
        no_repeat_ngram_size: usize,
    ) -> Result<Self, GuideError> {
        if max_tokens == 0 {
            return Err(invalid("max_tokens must be greater than 0"));
        }
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(invalid("temperature must be a positive number"));
        }
        if !(nucleus_threshold > 0.0 && nucleus_threshold <= 1.0) {
            return Err(invalid("nucleus_threshold must be in (0, 1]"));
        }
        if !(repetition_penalty.is_finite() && repetition_penalty >= 1.0) {
            return Err(invalid("repetition_penalty must be at least 1"));
        }
        if no_repeat_ngram_size == 0 {
            return Err(invalid("no_repeat_ngram_size must be at least 1"));
        }

        Ok(Self {
            max_tokens,
            temperature,
            nucleus_threshold,
            repetition_penalty,
            no_repeat_ngram_size,
        })
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn nucleus_threshold(&self) -> f32 {
        self.nucleus_threshold
    }

    pub fn repetition_penalty(&self) -> f32 {
        self.repetition_penalty
    }

    pub fn no_repeat_ngram_size(&self) -> usize {
        self.no_repeat_ngram_size
    }
}

impl Default for GenerationConfig {
    /// Concise, focused answers with strong anti-repetition settings.
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            nucleus_threshold: DEFAULT_NUCLEUS_THRESHOLD,
            repetition_penalty: DEFAULT_REPETITION_PENALTY,
            no_repeat_ngram_size: DEFAULT_NO_REPEAT_NGRAM_SIZE,
        }
    }
}

fn invalid(msg: &str) -> GuideError {
    GuideError::InvalidConfig(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_constants() {
        let config = GenerationConfig::default();
        assert_eq!(config.max_tokens(), 150);
        assert!((config.temperature() - 0.6).abs() < f32::EPSILON);
        assert!((config.nucleus_threshold() - 0.9).abs() < f32::EPSILON);
        assert!((config.repetition_penalty() - 2.5).abs() < f32::EPSILON);
        assert_eq!(config.no_repeat_ngram_size(), 3);
        assert_eq!(
            GenerationConfig::new(150, 0.6, 0.9, 2.5, 3).unwrap(),
            config
        );
    }

    #[test]
    fn accepts_boundary_values() {
        assert!(GenerationConfig::new(1, 0.01, 1.0, 1.0, 1).is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(GenerationConfig::new(0, 0.6, 0.9, 2.5, 3).is_err());
        assert!(GenerationConfig::new(150, 0.0, 0.9, 2.5, 3).is_err());
        assert!(GenerationConfig::new(150, -1.0, 0.9, 2.5, 3).is_err());
        assert!(GenerationConfig::new(150, f32::NAN, 0.9, 2.5, 3).is_err());
        assert!(GenerationConfig::new(150, 0.6, 0.0, 2.5, 3).is_err());
        assert!(GenerationConfig::new(150, 0.6, 1.1, 2.5, 3).is_err());
        assert!(GenerationConfig::new(150, 0.6, 0.9, 0.5, 3).is_err());
        assert!(GenerationConfig::new(150, 0.6, 0.9, 2.5, 0).is_err());
    }
}
