/// Control token ids of an encoder-decoder language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    /// First token fed to the decoder.
    pub decoder_start: u32,
    /// Token that ends a sequence.
    pub eos: u32,
}

/// Encoder-decoder language model driven one token at a time.
///
/// The prompt is encoded once; the decoder is then queried with the growing
/// decoded prefix (starting with [`SpecialTokens::decoder_start`]) and returns
/// unnormalized logits for the next position over the whole vocabulary.
pub trait LanguageModel {
    type Context;

    fn special_tokens(&self) -> SpecialTokens;

    fn encode(&mut self, prompt_ids: &[u32]) -> anyhow::Result<Self::Context>;

    fn next_token_logits(
        &mut self,
        context: &Self::Context,
        decoded: &[u32],
    ) -> anyhow::Result<Vec<f32>>;
}

/// Text to token ids and back.
pub trait TokenCodec {
    /// Encode `text`, appending the model's end-of-sequence marker.
    fn encode(&self, text: &str) -> anyhow::Result<Vec<u32>>;

    /// Decode `ids`, dropping special and control tokens.
    fn decode(&self, ids: &[u32]) -> anyhow::Result<String>;
}

impl TokenCodec for tokenizers::Tokenizer {
    fn encode(&self, text: &str) -> anyhow::Result<Vec<u32>> {
        let encoding = (**self).encode(text, true)
            .map_err(|e| anyhow::anyhow!("Failed to tokenize prompt: {e}"))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> anyhow::Result<String> {
        (**self).decode(ids, true)
            .map_err(|e| anyhow::anyhow!("Failed to decode tokens: {e}"))
    }
}
