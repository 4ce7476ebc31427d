use std::path::PathBuf;

/// Return the model directory for tests that need real model files.
///
/// Checks `GUIDE_MODEL_DIR` first, falling back to `~/.guide/models/`.
pub fn model_dir() -> PathBuf {
    std::env::var("GUIDE_MODEL_DIR").map_or_else(
        |_| {
            dirs::home_dir()
                .expect("home dir")
                .join(".guide")
                .join("models")
        },
        PathBuf::from,
    )
}
