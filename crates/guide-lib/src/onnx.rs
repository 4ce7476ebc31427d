use std::path::Path;

use anyhow::anyhow;
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use tracing::info;

use crate::context::Device;

/// Open an ONNX Runtime session for the model at `path`.
///
/// [`Device::Accelerator`] registers the CUDA execution provider ahead of the
/// CPU one; if CUDA is unavailable at runtime ONNX Runtime falls back to CPU.
pub fn open_session(path: &Path, device: Device) -> anyhow::Result<Session> {
    let providers = match device {
        Device::Cpu => vec![CPUExecutionProvider::default().build()],
        Device::Accelerator => vec![
            CUDAExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ],
    };

    let session = Session::builder()
        .map_err(|e| anyhow!("Failed to create session builder: {e}"))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| anyhow!("Failed to set optimization level: {e}"))?
        .with_execution_providers(providers)
        .map_err(|e| anyhow!("Failed to register execution providers: {e}"))?
        .commit_from_file(path)
        .map_err(|e| anyhow!("Failed to load {}: {e}", path.display()))?;

    info!(model = %path.display(), device = device.as_str(), "Loaded ONNX model");
    Ok(session)
}
