pub mod config;
pub mod decoding;
pub mod engine;
pub mod model;
pub mod onnx;

pub use config::GenerationConfig;
pub use engine::{GenerationEngine, TextGenerator};
pub use model::{LanguageModel, SpecialTokens, TokenCodec};
