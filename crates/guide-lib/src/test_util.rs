use std::collections::VecDeque;
use std::net::TcpListener;

use anyhow::anyhow;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::PREDICT_PATH;
use crate::error::GuideError;
use crate::generation::{LanguageModel, SpecialTokens, TextGenerator, TokenCodec};
use crate::vision::{ClassificationResult, ClassificationService, ScoreModel};

const DECODER_START: u32 = 0;
const EOS: u32 = 1;
const UNK: u32 = 2;

// --- vision ---

/// Score model returning the same vector for every input.
pub struct FixedScoreModel {
    scores: Result<Vec<f32>, String>,
    pub calls: usize,
    pub last_input_len: usize,
}

impl FixedScoreModel {
    pub fn new(scores: Vec<f32>) -> Self {
        Self {
            scores: Ok(scores),
            calls: 0,
            last_input_len: 0,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            scores: Err(message.to_string()),
            calls: 0,
            last_input_len: 0,
        }
    }
}

impl ScoreModel for FixedScoreModel {
    fn scores(&mut self, tensor: &[f32]) -> anyhow::Result<Vec<f32>> {
        self.calls += 1;
        self.last_input_len = tensor.len();
        self.scores.clone().map_err(|msg| anyhow!(msg))
    }
}

/// Classification service replaying a fixed list of outcomes.
pub struct ScriptedClassifier {
    outcomes: VecDeque<Result<ClassificationResult, GuideError>>,
}

impl ScriptedClassifier {
    pub fn new(outcomes: Vec<Result<ClassificationResult, GuideError>>) -> Self {
        Self {
            outcomes: outcomes.into(),
        }
    }
}

impl ClassificationService for ScriptedClassifier {
    fn classify(&mut self, _image: &[u8]) -> Result<ClassificationResult, GuideError> {
        self.outcomes
            .pop_front()
            .unwrap_or_else(|| Err(GuideError::Classification("script exhausted".into())))
    }
}

// --- generation ---

/// Text generator that records prompts and answers with a canned reply.
pub struct RecordingGenerator {
    reply: Result<String, String>,
    pub prompts: Vec<String>,
}

impl RecordingGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Vec::new(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            prompts: Vec::new(),
        }
    }
}

impl TextGenerator for RecordingGenerator {
    fn generate(&mut self, prompt: &str) -> Result<String, GuideError> {
        self.prompts.push(prompt.to_string());
        self.reply.clone().map_err(GuideError::Generation)
    }
}

/// Language model that always strongly prefers one token.
pub struct FixedLogitsModel {
    vocab: usize,
    preferred: u32,
    failure: Option<String>,
    pub encode_calls: usize,
    pub last_prompt: Vec<u32>,
}

impl FixedLogitsModel {
    pub fn always(vocab: usize, preferred: u32) -> Self {
        Self {
            vocab,
            preferred,
            failure: None,
            encode_calls: 0,
            last_prompt: Vec::new(),
        }
    }

    /// A model whose encoder fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::always(4, EOS)
        }
    }
}

impl LanguageModel for FixedLogitsModel {
    type Context = ();

    fn special_tokens(&self) -> SpecialTokens {
        SpecialTokens {
            decoder_start: DECODER_START,
            eos: EOS,
        }
    }

    fn encode(&mut self, prompt_ids: &[u32]) -> anyhow::Result<()> {
        self.encode_calls += 1;
        self.last_prompt = prompt_ids.to_vec();
        match &self.failure {
            Some(msg) => Err(anyhow!(msg.clone())),
            None => Ok(()),
        }
    }

    fn next_token_logits(&mut self, _context: &(), _decoded: &[u32]) -> anyhow::Result<Vec<f32>> {
        let mut logits = vec![0.0; self.vocab];
        if let Some(slot) = logits.get_mut(self.preferred as usize) {
            *slot = 10.0;
        }
        Ok(logits)
    }
}

/// Language model emitting seeded random logits.
pub struct RandomLogitsModel {
    vocab: usize,
    rng: StdRng,
    pub prefixes: Vec<Vec<u32>>,
}

impl RandomLogitsModel {
    pub fn new(vocab: usize, seed: u64) -> Self {
        Self {
            vocab,
            rng: StdRng::seed_from_u64(seed),
            prefixes: Vec::new(),
        }
    }
}

impl LanguageModel for RandomLogitsModel {
    type Context = ();

    fn special_tokens(&self) -> SpecialTokens {
        SpecialTokens {
            decoder_start: DECODER_START,
            eos: EOS,
        }
    }

    fn encode(&mut self, _prompt_ids: &[u32]) -> anyhow::Result<()> {
        Ok(())
    }

    fn next_token_logits(&mut self, _context: &(), decoded: &[u32]) -> anyhow::Result<Vec<f32>> {
        self.prefixes.push(decoded.to_vec());
        Ok((0..self.vocab)
            .map(|_| self.rng.gen_range(-3.0..3.0))
            .collect())
    }
}

/// Whitespace tokenizer over a fixed word list.
///
/// Ids 0..3 are pad, eos and unknown; words start at 3.
pub struct WordCodec {
    words: Vec<String>,
}

impl WordCodec {
    pub fn new(words: &[&str]) -> Self {
        Self {
            words: words.iter().map(ToString::to_string).collect(),
        }
    }
}

impl TokenCodec for WordCodec {
    fn encode(&self, text: &str) -> anyhow::Result<Vec<u32>> {
        let mut ids: Vec<u32> = text
            .split_whitespace()
            .map(|w| {
                self.words
                    .iter()
                    .position(|known| known == w)
                    .map_or(UNK, |i| u32::try_from(i).unwrap() + 3)
            })
            .collect();
        ids.push(EOS);
        Ok(ids)
    }

    fn decode(&self, ids: &[u32]) -> anyhow::Result<String> {
        let words: Vec<&str> = ids
            .iter()
            .filter(|&&id| id >= 3)
            .filter_map(|&id| self.words.get(id as usize - 3).map(String::as_str))
            .collect();
        Ok(words.join(" "))
    }
}

// --- transport ---

/// Serve `classifier` on an ephemeral port from a background thread.
///
/// Returns the full `/predict` URL.
pub fn spawn_service<S>(classifier: S) -> String
where
    S: ClassificationService + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, crate::transport::router(classifier, 10))
                .await
                .unwrap();
        });
    });

    format!("http://{addr}{PREDICT_PATH}")
}

/// A `/predict` URL on a port nothing listens on.
pub fn unused_endpoint() -> String {
    let addr = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    format!("http://{addr}{PREDICT_PATH}")
}

/// Hand-built `multipart/form-data` body with a single file field.
///
/// Returns the content type header value and the body.
pub fn multipart_body(field: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    const BOUNDARY: &str = "guide-test-boundary";
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"upload.bin\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}
