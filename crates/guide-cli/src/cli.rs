use std::path::PathBuf;

use clap::{Parser, Subcommand};

use guide_lib::config::DEFAULT_TOP_K;
use guide_lib::context::{Device, GuideContext};
use guide_lib::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "guide", about = "Identify Egyptian landmarks and chat about them")]
pub struct Cli {
    /// Directory holding the `vision/` and `generator/` model files.
    #[arg(long, global = true, env = "GUIDE_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Full URL of the vision service's predict endpoint.
    #[arg(long, global = true, env = "GUIDE_VISION_URL")]
    pub vision_url: Option<String>,

    /// Inference device: `cpu` or `accelerator`.
    #[arg(long, global = true, env = "GUIDE_DEVICE")]
    pub device: Option<Device>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Resolve the startup configuration from flags, environment and defaults.
    pub fn runtime(&self) -> anyhow::Result<Runtime> {
        let model_dir = match &self.model_dir {
            Some(dir) => dir.clone(),
            None => GuideContext::default_model_dir()?,
        };
        let mut context = GuideContext::new(model_dir);
        if let Some(url) = &self.vision_url {
            context = context.with_vision_url(url.clone());
        }
        if let Some(device) = self.device {
            context = context.with_device(device);
        }
        if let Command::Serve { addr: Some(addr) } = &self.command {
            context = context.with_bind_addr(addr.clone());
        }
        Ok(Runtime::new(context))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the vision model and serve `POST /predict`.
    Serve {
        /// Address to bind, e.g. `127.0.0.1:5000`.
        #[arg(long, env = "GUIDE_BIND_ADDR")]
        addr: Option<String>,
    },

    /// Classify an image through the vision service and print the top labels.
    Identify {
        /// Path to the image file.
        image: PathBuf,
        /// Number of labels to print.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top: usize,
        /// Print the raw service response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive conversation.
    Chat {
        /// Identify this image before the first question.
        #[arg(long)]
        image: Option<PathBuf>,
        /// Seed the sampler for reproducible answers.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Answer a single question and exit.
    Ask {
        /// Landmark to ask about. Defaults to the fallback topic.
        #[arg(long)]
        topic: Option<String>,
        /// Seed the sampler for reproducible answers.
        #[arg(long)]
        seed: Option<u64>,
        /// The question.
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Manage model files.
    Model {
        #[command(subcommand)]
        model_command: ModelCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ModelCommand {
    /// Download the generator's tokenizer and config from Hugging Face.
    Download {
        /// Force re-download even if files already exist.
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use guide_lib::config::DEFAULT_BIND_ADDR;

    use super::*;

    #[test]
    fn serve_addr_flows_into_context() {
        let cli = Cli::try_parse_from([
            "guide",
            "serve",
            "--model-dir",
            "/models",
            "--addr",
            "0.0.0.0:9000",
        ])
        .unwrap();

        let runtime = cli.runtime().unwrap();

        assert_eq!(runtime.context.bind_addr(), "0.0.0.0:9000");
    }

    #[test]
    fn other_commands_keep_default_bind_addr() {
        let cli = Cli::try_parse_from(["guide", "ask", "--model-dir", "/models", "Why?"]).unwrap();

        let runtime = cli.runtime().unwrap();

        assert_eq!(runtime.context.bind_addr(), DEFAULT_BIND_ADDR);
    }
}
