use crate::context::GuideContext;
use crate::generation::GenerationConfig;

/// Everything a command needs, resolved once at startup.
pub struct Runtime {
    pub context: GuideContext,
    pub generation: GenerationConfig,
}

impl Runtime {
    /// Runtime with the default decoding policy.
    pub fn new(context: GuideContext) -> Self {
        Self {
            context,
            generation: GenerationConfig::default(),
        }
    }
}
