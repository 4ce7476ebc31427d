/// Side length, in pixels, of the square input the vision model expects.
pub const IMAGE_SIZE: u32 = 224;

/// Number of colour channels fed to the vision model (RGB).
pub const IMAGE_CHANNELS: usize = 3;

/// Tolerance used when checking that a score vector sums to one.
pub const SCORE_SUM_TOLERANCE: f64 = 1e-3;

/// Allowed gap, in percentage points, between a reported confidence and the
/// top score it is derived from.
pub const CONFIDENCE_TOLERANCE: f64 = 1e-3;

/// Number of labels shown by default when rendering a classification.
pub const DEFAULT_TOP_K: usize = 3;

/// Topic used when a question arrives before any image was identified.
pub const FALLBACK_TOPIC: &str = "Egypt";

/// Maximum number of generated tokens per answer.
pub const DEFAULT_MAX_TOKENS: usize = 150;

/// Sampling temperature. Values below 1 sharpen the distribution.
pub const DEFAULT_TEMPERATURE: f32 = 0.6;

/// Cumulative probability mass kept by nucleus (top-p) truncation.
pub const DEFAULT_NUCLEUS_THRESHOLD: f32 = 0.9;

/// Divisor applied to logits of already-emitted tokens.
pub const DEFAULT_REPETITION_PENALTY: f32 = 2.5;

/// Size of the n-grams that may never be generated twice.
pub const DEFAULT_NO_REPEAT_NGRAM_SIZE: usize = 3;

/// Prompts longer than this many tokens are truncated before encoding.
pub const MAX_INPUT_TOKENS: usize = 512;

/// Route served by the vision service.
pub const PREDICT_PATH: &str = "/predict";

/// Multipart field carrying the uploaded image.
pub const FILE_FIELD: &str = "file";

/// Default endpoint of the vision service.
pub const DEFAULT_VISION_URL: &str = "http://127.0.0.1:5000/predict";

/// Default bind address of the vision service.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

/// Upper bound for uploaded image payloads (16 MiB).
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Seconds the client waits for a TCP connection to the vision service.
pub const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Seconds the client waits for a full classification response.
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Subdirectory of the model dir holding the vision model.
pub const VISION_SUBDIR: &str = "vision";

/// Subdirectory of the model dir holding the generator model.
pub const GENERATOR_SUBDIR: &str = "generator";
