use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use super::config::GenerationConfig;
use super::decoding::sample_sequence;
use super::model::{LanguageModel, TokenCodec};
use crate::config::MAX_INPUT_TOKENS;
use crate::error::GuideError;

/// Turns a conditioned prompt into answer text.
pub trait TextGenerator {
    fn generate(&mut self, prompt: &str) -> Result<String, GuideError>;
}

/// Generation engine: tokenizer, language model and a fixed decoding policy.
pub struct GenerationEngine<M, T> {
    model: M,
    codec: T,
    config: GenerationConfig,
    rng: StdRng,
}

impl<M: LanguageModel, T: TokenCodec> GenerationEngine<M, T> {
    /// Create an engine sampling from OS entropy.
    pub fn new(model: M, codec: T, config: GenerationConfig) -> Self {
        Self {
            model,
            codec,
            config,
            rng: StdRng::from_entropy(),
        }
    }

    /// Use a fixed seed so the same prompt yields the same answer.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    fn run(&mut self, prompt: &str) -> anyhow::Result<String> {
        let eos = self.model.special_tokens().eos;
        let mut prompt_ids = self.codec.encode(prompt)?;
        truncate_prompt(&mut prompt_ids, MAX_INPUT_TOKENS, eos);

        let output_ids =
            sample_sequence(&mut self.model, &prompt_ids, &self.config, &mut self.rng)?;
        debug!(
            prompt_tokens = prompt_ids.len(),
            output_tokens = output_ids.len(),
            "Generated answer"
        );

        let text = self.codec.decode(&output_ids)?;
        Ok(text.trim().to_string())
    }
}

impl<M: LanguageModel, T: TokenCodec> TextGenerator for GenerationEngine<M, T> {
    fn generate(&mut self, prompt: &str) -> Result<String, GuideError> {
        self.run(prompt).map_err(|e| GuideError::Generation(format!("{e:#}")))
    }
}

/// Cut `ids` to at most `max` tokens, keeping a trailing `eos` marker.
fn truncate_prompt(ids: &mut Vec<u32>, max: usize, eos: u32) {
    if ids.len() <= max {
        return;
    }
    let ends_with_eos = ids.last() == Some(&eos);
    ids.truncate(max);
    if ends_with_eos {
        if let Some(last) = ids.last_mut() {
            *last = eos;
        }
    }
}
