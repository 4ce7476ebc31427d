use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::{DEFAULT_BIND_ADDR, DEFAULT_VISION_URL, GENERATOR_SUBDIR, VISION_SUBDIR};
use crate::error::GuideError;

/// Compute target for model inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    /// General-purpose CPU execution.
    #[default]
    Cpu,
    /// GPU execution when available, CPU otherwise.
    Accelerator,
}

impl Device {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Accelerator => "accelerator",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = GuideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "accelerator" | "gpu" | "cuda" => Ok(Self::Accelerator),
            other => Err(GuideError::InvalidConfig(format!(
                "unknown device {other:?} (expected cpu or accelerator)"
            ))),
        }
    }
}

/// Process-wide settings resolved once at startup.
#[derive(Debug, Clone)]
pub struct GuideContext {
    model_dir: PathBuf,
    vision_url: String,
    bind_addr: String,
    device: Device,
}

impl GuideContext {
    pub fn new(model_dir: PathBuf) -> Self {
        Self {
            model_dir,
            vision_url: DEFAULT_VISION_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            device: Device::default(),
        }
    }

    /// Default model directory: `~/.guide/models`.
    pub fn default_model_dir() -> anyhow::Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine the home directory"))?;
        Ok(home.join(".guide").join("models"))
    }

    #[must_use]
    pub fn with_vision_url(mut self, url: impl Into<String>) -> Self {
        self.vision_url = url.into();
        self
    }

    #[must_use]
    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Directory holding `model.onnx` and an optional `labels.txt`.
    pub fn vision_model_dir(&self) -> PathBuf {
        self.model_dir.join(VISION_SUBDIR)
    }

    /// Directory holding the generator's ONNX files, tokenizer and config.
    pub fn generator_model_dir(&self) -> PathBuf {
        self.model_dir.join(GENERATOR_SUBDIR)
    }

    pub fn vision_url(&self) -> &str {
        &self.vision_url
    }

    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    pub fn device(&self) -> Device {
        self.device
    }
}
