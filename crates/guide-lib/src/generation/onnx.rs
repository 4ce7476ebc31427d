use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use ort::session::Session;
use ort::value::Tensor;
use serde::Deserialize;
use tokenizers::Tokenizer;

use super::config::GenerationConfig;
use super::engine::GenerationEngine;
use super::model::{LanguageModel, SpecialTokens};
use crate::context::Device;
use crate::error::GuideError;
use crate::onnx::open_session;

/// Files expected in `model_dir/generator/`.
///
/// The ONNX pair is a T5 export with the domain adapter already merged into
/// the base weights.
pub const ENCODER_FILE: &str = "encoder_model.onnx";
pub const DECODER_FILE: &str = "decoder_model.onnx";
pub const CONFIG_FILE: &str = "config.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Subset of the Hugging Face `config.json` needed for decoding.
#[derive(Debug, Deserialize)]
struct ModelConfig {
    decoder_start_token_id: Option<u32>,
    eos_token_id: u32,
    pad_token_id: u32,
}

impl ModelConfig {
    fn special_tokens(&self) -> SpecialTokens {
        SpecialTokens {
            decoder_start: self.decoder_start_token_id.unwrap_or(self.pad_token_id),
            eos: self.eos_token_id,
        }
    }
}

/// Encoder output kept for the whole decode loop of one prompt.
pub struct EncodedPrompt {
    hidden: Vec<f32>,
    hidden_shape: Vec<usize>,
    attention_mask: Vec<i64>,
}

/// T5-style encoder-decoder running on ONNX Runtime.
///
/// The decoder is re-run over the full prefix at every step (no key/value
/// cache), which keeps the export simple at the cost of quadratic work in the
/// answer length.
pub struct OnnxSeq2Seq {
    encoder: Session,
    decoder: Session,
    special: SpecialTokens,
}

impl OnnxSeq2Seq {
    pub fn load(generator_dir: &Path, device: Device) -> anyhow::Result<Self> {
        let config_path = generator_dir.join(CONFIG_FILE);
        let raw = fs::read_to_string(&config_path).with_context(|| {
            format!(
                "Generator config not found at {}. Run 'guide model download' first.",
                config_path.display()
            )
        })?;
        let config: ModelConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid {}", config_path.display()))?;

        let encoder = open_session(&generator_dir.join(ENCODER_FILE), device)?;
        let decoder = open_session(&generator_dir.join(DECODER_FILE), device)?;

        Ok(Self {
            encoder,
            decoder,
            special: config.special_tokens(),
        })
    }
}

impl LanguageModel for OnnxSeq2Seq {
    type Context = EncodedPrompt;

    fn special_tokens(&self) -> SpecialTokens {
        self.special
    }

    fn encode(&mut self, prompt_ids: &[u32]) -> anyhow::Result<EncodedPrompt> {
        let len = prompt_ids.len();
        let input_ids: Vec<i64> = prompt_ids.iter().map(|&id| i64::from(id)).collect();
        let attention_mask = vec![1_i64; len];

        let ids_tensor = Tensor::from_array(([1, len], input_ids))
            .map_err(|e| anyhow!("Failed to build input_ids: {e}"))?;
        let mask_tensor = Tensor::from_array(([1, len], attention_mask.clone()))
            .map_err(|e| anyhow!("Failed to build attention_mask: {e}"))?;

        let outputs = self
            .encoder
            .run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor
            ])
            .map_err(|e| anyhow!("Encoder run failed: {e}"))?;
        let (shape, hidden) = outputs["last_hidden_state"]
            .try_extract_tensor::<f32>()
            .map_err(|e| anyhow!("Unexpected encoder output: {e}"))?;
        let hidden_shape = shape
            .iter()
            .map(|&d| usize::try_from(d))
            .collect::<Result<Vec<_>, _>>()
            .context("Encoder output has a dynamic dimension")?;

        Ok(EncodedPrompt {
            hidden: hidden.to_vec(),
            hidden_shape,
            attention_mask,
        })
    }

    fn next_token_logits(
        &mut self,
        context: &EncodedPrompt,
        decoded: &[u32],
    ) -> anyhow::Result<Vec<f32>> {
        let len = decoded.len();
        let decoder_ids: Vec<i64> = decoded.iter().map(|&id| i64::from(id)).collect();

        let ids_tensor = Tensor::from_array(([1, len], decoder_ids))
            .map_err(|e| anyhow!("Failed to build decoder input_ids: {e}"))?;
        let mask_tensor = Tensor::from_array((
            [1, context.attention_mask.len()],
            context.attention_mask.clone(),
        ))
        .map_err(|e| anyhow!("Failed to build encoder_attention_mask: {e}"))?;
        let hidden_tensor =
            Tensor::from_array((context.hidden_shape.clone(), context.hidden.clone()))
                .map_err(|e| anyhow!("Failed to build encoder_hidden_states: {e}"))?;

        let outputs = self
            .decoder
            .run(ort::inputs![
                "input_ids" => ids_tensor,
                "encoder_attention_mask" => mask_tensor,
                "encoder_hidden_states" => hidden_tensor
            ])
            .map_err(|e| anyhow!("Decoder run failed: {e}"))?;
        let (shape, logits) = outputs["logits"]
            .try_extract_tensor::<f32>()
            .map_err(|e| anyhow!("Unexpected decoder output: {e}"))?;

        let vocab = shape
            .last()
            .and_then(|&d| usize::try_from(d).ok())
            .filter(|&v| v > 0 && v <= logits.len())
            .ok_or_else(|| anyhow!("Decoder logits have an invalid shape"))?;
        Ok(logits[logits.len() - vocab..].to_vec())
    }
}

/// Load the tokenizer and language model from `generator_dir` and assemble
/// an engine.
pub fn load_engine(
    generator_dir: &Path,
    device: Device,
    config: GenerationConfig,
) -> Result<GenerationEngine<OnnxSeq2Seq, Tokenizer>, GuideError> {
    let tokenizer_path = generator_dir.join(TOKENIZER_FILE);
    let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
        GuideError::ModelLoad(format!(
            "Failed to load {}: {e}. Run 'guide model download' first.",
            tokenizer_path.display()
        ))
    })?;
    let model = OnnxSeq2Seq::load(generator_dir, device)
        .map_err(|e| GuideError::ModelLoad(format!("{e:#}")))?;
    Ok(GenerationEngine::new(model, tokenizer, config))
}
