use std::io::{BufRead, Write};
use std::path::Path;

use guide_lib::generation::onnx::{CONFIG_FILE, DECODER_FILE, ENCODER_FILE, TOKENIZER_FILE};
use guide_lib::output::ConsoleIO;
use guide_lib::runtime::Runtime;

/// Hugging Face repository of the base model the generator was tuned from.
const HF_REPO: &str = "google-t5/t5-base";

/// Files to download from the Hugging Face repository.
const MODEL_FILES: &[(&str, &str)] = &[
    (TOKENIZER_FILE, TOKENIZER_FILE),
    (CONFIG_FILE, CONFIG_FILE),
];

/// Run the `guide model download` command.
///
/// Fetches the tokenizer and config shared with the base model. The fine-tuned
/// encoder/decoder export is produced offline and must be copied next to them.
pub fn run_model_download<IN, OUT, ERR>(
    force: bool,
    runtime: &Runtime,
    io: &mut dyn ConsoleIO<IN, OUT, ERR>,
) -> anyhow::Result<()>
where
    IN: BufRead,
    OUT: Write,
    ERR: Write,
{
    let model_dir = runtime.context.generator_model_dir();

    if force {
        for (_, local) in MODEL_FILES {
            let path = model_dir.join(local);
            if path.exists() {
                writeln!(io.stderr(), "Removing {local}...")?;
                std::fs::remove_file(&path)?;
            }
        }
    }

    if files_present(&model_dir) {
        writeln!(
            io.stdout(),
            "Tokenizer already downloaded at {}",
            model_dir.display()
        )?;
        report_missing_weights(&model_dir, io)?;
        return Ok(());
    }

    std::fs::create_dir_all(&model_dir)?;

    writeln!(io.stderr(), "Downloading {HF_REPO} tokenizer...")?;
    let api = hf_hub::api::sync::Api::new()?;
    let repo = api.model(HF_REPO.to_string());

    for (remote_path, local_name) in MODEL_FILES {
        let dest = model_dir.join(local_name);
        if dest.exists() {
            writeln!(io.stderr(), "  {local_name} (cached)")?;
            continue;
        }
        writeln!(io.stderr(), "  {local_name}...")?;
        let cached = repo.get(remote_path)?;
        std::fs::copy(&cached, &dest)?;
    }

    writeln!(io.stdout(), "Tokenizer downloaded to {}", model_dir.display())?;
    report_missing_weights(&model_dir, io)?;
    Ok(())
}

fn files_present(model_dir: &Path) -> bool {
    MODEL_FILES
        .iter()
        .all(|(_, local)| model_dir.join(local).exists())
}

fn report_missing_weights<IN, OUT, ERR>(
    model_dir: &Path,
    io: &mut dyn ConsoleIO<IN, OUT, ERR>,
) -> anyhow::Result<()>
where
    IN: BufRead,
    OUT: Write,
    ERR: Write,
{
    for file in [ENCODER_FILE, DECODER_FILE] {
        if !model_dir.join(file).exists() {
            writeln!(
                io.stderr(),
                "Note: {file} is missing. Export the fine-tuned generator to ONNX and place it in {}.",
                model_dir.display()
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use guide_lib::output::BufferedIO;

    #[test]
    fn try_run_model_download_skips_when_present() {
        let tmp = tempfile::tempdir().unwrap();
        let generator = tmp.path().join("generator");
        std::fs::create_dir_all(&generator).unwrap();
        for file in ["tokenizer.json", "config.json", "encoder_model.onnx", "decoder_model.onnx"] {
            std::fs::write(generator.join(file), "{}").unwrap();
        }

        let mut io = BufferedIO::new();
        crate::try_run(
            &["guide", "model", "download", "--model-dir", tmp.path().to_str().unwrap()],
            &mut io,
        )
        .unwrap();

        assert_eq!(
            io.stdout_to_string(),
            format!("Tokenizer already downloaded at {}\n", generator.display())
        );
        assert_eq!(io.stderr_to_string(), "");
    }

    #[test]
    fn try_run_model_download_reports_missing_export() {
        let tmp = tempfile::tempdir().unwrap();
        let generator = tmp.path().join("generator");
        std::fs::create_dir_all(&generator).unwrap();
        std::fs::write(generator.join("tokenizer.json"), "{}").unwrap();
        std::fs::write(generator.join("config.json"), "{}").unwrap();

        let mut io = BufferedIO::new();
        crate::try_run(
            &["guide", "model", "download", "--model-dir", tmp.path().to_str().unwrap()],
            &mut io,
        )
        .unwrap();

        let stderr = io.stderr_to_string();
        assert!(stderr.contains("encoder_model.onnx is missing"));
        assert!(stderr.contains("decoder_model.onnx is missing"));
    }

    #[test]
    #[ignore = "downloads from Hugging Face"]
    fn try_run_model_download_fetches_tokenizer() {
        let tmp = tempfile::tempdir().unwrap();
        let mut io = BufferedIO::new();
        crate::try_run(
            &["guide", "model", "download", "--model-dir", tmp.path().to_str().unwrap()],
            &mut io,
        )
        .unwrap();
        assert!(tmp.path().join("generator").join("tokenizer.json").exists());
    }
}
