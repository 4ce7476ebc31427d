use std::io::{BufRead, Write};

use anyhow::Context;

use guide_lib::config::PREDICT_PATH;
use guide_lib::labels::LabelSet;
use guide_lib::output::ConsoleIO;
use guide_lib::runtime::Runtime;
use guide_lib::transport;
use guide_lib::vision::LandmarkClassifier;
use guide_lib::vision::onnx::OnnxScoreModel;

/// Run the `guide serve` command.
///
/// Loads the vision model once and serves it until Ctrl-C. A model that fails
/// to load stops the command before anything is bound.
pub fn run_serve<IN, OUT, ERR>(
    runtime: &Runtime,
    io: &mut dyn ConsoleIO<IN, OUT, ERR>,
) -> anyhow::Result<()>
where
    IN: BufRead,
    OUT: Write,
    ERR: Write,
{
    let context = &runtime.context;
    let vision_dir = context.vision_model_dir();

    let labels = LabelSet::load_or_default(&vision_dir)?;
    let model = OnnxScoreModel::load(&vision_dir, context.device())?;
    let classifier = LandmarkClassifier::new(labels, model);
    let label_count = classifier.labels().len();

    let addr = context.bind_addr();
    writeln!(
        io.stderr(),
        "Serving {label_count} labels at http://{addr}{PREDICT_PATH} (Ctrl-C to stop)"
    )?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    rt.block_on(transport::serve(addr, classifier, label_count))
}
