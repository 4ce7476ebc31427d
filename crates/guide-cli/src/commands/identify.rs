use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::Context;

use guide_lib::error::GuideError;
use guide_lib::output::ConsoleIO;
use guide_lib::runtime::Runtime;
use guide_lib::transport::{PredictResponse, VisionClient};
use guide_lib::vision::ClassificationService;

/// Run the `guide identify` command against the configured vision service.
pub fn run_identify<IN, OUT, ERR>(
    image: &Path,
    top: usize,
    json: bool,
    runtime: &Runtime,
    io: &mut dyn ConsoleIO<IN, OUT, ERR>,
) -> anyhow::Result<()>
where
    IN: BufRead,
    OUT: Write,
    ERR: Write,
{
    let bytes =
        std::fs::read(image).with_context(|| format!("Failed to read {}", image.display()))?;
    let mut client = VisionClient::new(runtime.context.vision_url())?;
    identify_with(&mut client, &bytes, top, json, io)
}

/// Classify `bytes` with `classifier` and print the `top` best labels.
pub fn identify_with<C, IN, OUT, ERR>(
    classifier: &mut C,
    bytes: &[u8],
    top: usize,
    json: bool,
    io: &mut dyn ConsoleIO<IN, OUT, ERR>,
) -> anyhow::Result<()>
where
    C: ClassificationService,
    IN: BufRead,
    OUT: Write,
    ERR: Write,
{
    let result = classifier.classify(bytes).map_err(|err| match err {
        GuideError::ServiceUnavailable(_) => {
            anyhow::Error::new(err)
                .context("Vision service is not running. Start it with 'guide serve'.")
        }
        other => other.into(),
    })?;

    if json {
        let body = serde_json::to_string_pretty(&PredictResponse::from(result))?;
        writeln!(io.stdout(), "{body}")?;
        return Ok(());
    }

    for (rank, (label, score)) in result.top_k(top).into_iter().enumerate() {
        writeln!(io.stdout(), "{:>2}. {label} ({:.1}%)", rank + 1, score * 100.0)?;
    }
    Ok(())
}
