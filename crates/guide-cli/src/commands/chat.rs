use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::Context;

use guide_lib::generation::TextGenerator;
use guide_lib::generation::onnx::load_engine;
use guide_lib::output::ConsoleIO;
use guide_lib::runtime::Runtime;
use guide_lib::session::{AskOutcome, Orchestrator, StartOutcome};
use guide_lib::session::orchestrator::welcome_message;
use guide_lib::transport::VisionClient;
use guide_lib::vision::ClassificationService;

const BANNER: &str = "AI Tourist Guide. Identify ancient landmarks and chat about them.";
const USAGE: &str = "Type a question, '/image <path>' to identify a photo, or '/quit' to leave.";
const PROMPT: &str = "> ";

/// One line of chat input.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Quit,
    Image(&'a str),
    Question(&'a str),
}

impl<'a> ChatInput<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line == "/quit" || line == "/exit" {
            return Self::Quit;
        }
        match line.strip_prefix("/image") {
            Some(path) if path.is_empty() || path.starts_with(char::is_whitespace) => {
                Self::Image(path.trim())
            }
            _ => Self::Question(line),
        }
    }
}

/// Run the `guide chat` command.
///
/// The generator is loaded before the first prompt; the vision service is
/// only contacted when an image is submitted.
pub fn run_chat<IN, OUT, ERR>(
    image: Option<&Path>,
    seed: Option<u64>,
    runtime: &Runtime,
    io: &mut dyn ConsoleIO<IN, OUT, ERR>,
) -> anyhow::Result<()>
where
    IN: BufRead,
    OUT: Write,
    ERR: Write,
{
    let context = &runtime.context;
    let initial = image
        .map(|path| {
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
        })
        .transpose()?;

    let mut engine = load_engine(
        &context.generator_model_dir(),
        context.device(),
        runtime.generation,
    )?;
    if let Some(seed) = seed {
        engine = engine.with_seed(seed);
    }
    let classifier = VisionClient::new(context.vision_url())?;

    let mut orchestrator = Orchestrator::new(classifier, engine);
    chat_loop(&mut orchestrator, initial.as_deref(), io)
}

/// Read lines from `io` until end of input or `/quit`, driving `orchestrator`.
pub fn chat_loop<C, G, IN, OUT, ERR>(
    orchestrator: &mut Orchestrator<C, G>,
    initial_image: Option<&[u8]>,
    io: &mut dyn ConsoleIO<IN, OUT, ERR>,
) -> anyhow::Result<()>
where
    C: ClassificationService,
    G: TextGenerator,
    IN: BufRead,
    OUT: Write,
    ERR: Write,
{
    writeln!(io.stdout(), "{BANNER}")?;
    writeln!(io.stdout(), "{USAGE}")?;

    if let Some(bytes) = initial_image {
        submit_image(orchestrator, bytes, io)?;
    }

    loop {
        write!(io.stdout(), "{PROMPT}")?;
        io.stdout().flush()?;
        let Some(line) = io.read_line()? else {
            break;
        };

        match ChatInput::parse(&line) {
            ChatInput::Quit => break,
            ChatInput::Image("") => writeln!(io.stdout(), "Usage: /image <path>")?,
            ChatInput::Image(path) => match std::fs::read(path) {
                Ok(bytes) => submit_image(orchestrator, &bytes, io)?,
                Err(err) => writeln!(io.stdout(), "Error: could not read {path}: {err}")?,
            },
            ChatInput::Question(question) => match orchestrator.ask(question) {
                AskOutcome::Ignored => {}
                AskOutcome::Answered(turn) | AskOutcome::Failed(turn) => {
                    writeln!(io.stdout(), "{}", turn.content())?;
                }
            },
        }
    }

    writeln!(io.stdout())?;
    Ok(())
}

fn submit_image<C, G, IN, OUT, ERR>(
    orchestrator: &mut Orchestrator<C, G>,
    bytes: &[u8],
    io: &mut dyn ConsoleIO<IN, OUT, ERR>,
) -> anyhow::Result<()>
where
    C: ClassificationService,
    G: TextGenerator,
    IN: BufRead,
    OUT: Write,
    ERR: Write,
{
    match orchestrator.start_session(bytes) {
        StartOutcome::Identified(result) => {
            writeln!(io.stdout(), "{}", welcome_message(&result))?;
        }
        StartOutcome::Failed(notice) => writeln!(io.stdout(), "{}", notice.content())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use guide_lib::error::GuideError;
    use guide_lib::output::BufferedIO;
    use guide_lib::session::Role;
    use guide_test_util::image::solid_png;

    use super::*;
    use crate::test_util::{RecordingGenerator, ScriptedClassifier, sphinx_result};

    fn orchestrator(
        outcomes: Vec<Result<guide_lib::vision::ClassificationResult, GuideError>>,
        reply: &str,
    ) -> Orchestrator<ScriptedClassifier, RecordingGenerator> {
        Orchestrator::new(
            ScriptedClassifier::new(outcomes),
            RecordingGenerator::replying(reply),
        )
    }

    // --- input parsing ---

    #[test]
    fn parses_commands_and_questions() {
        assert_eq!(ChatInput::parse("/quit"), ChatInput::Quit);
        assert_eq!(ChatInput::parse("  /exit "), ChatInput::Quit);
        assert_eq!(
            ChatInput::parse("/image photos/sphinx.jpg"),
            ChatInput::Image("photos/sphinx.jpg")
        );
        assert_eq!(ChatInput::parse("/image"), ChatInput::Image(""));
        assert_eq!(
            ChatInput::parse("/images are nice"),
            ChatInput::Question("/images are nice")
        );
        assert_eq!(ChatInput::parse(" Who built it? "), ChatInput::Question("Who built it?"));
    }

    // --- loop ---

    #[test]
    fn initial_image_then_question() {
        let mut orch = orchestrator(vec![Ok(sphinx_result())], "Khafre built it.");
        let mut io = BufferedIO::with_lines(&["Who built it?", "/quit"]);

        chat_loop(&mut orch, Some(b"img".as_slice()), &mut io).unwrap();

        let stdout = io.stdout_to_string();
        assert!(stdout.contains("I identified this artifact as **sphinx** (92.0% confidence)."));
        assert!(stdout.contains("Khafre built it."));
        assert_eq!(orch.history().len(), 3);
        assert_eq!(orch.history().last().unwrap().role(), Role::Assistant);
    }

    #[test]
    fn image_command_reads_file_and_resets_session() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sphinx.png");
        std::fs::write(&path, solid_png(8, 8, [1, 1, 1])).unwrap();

        let mut orch = orchestrator(vec![Ok(sphinx_result())], "ok");
        let image_line = format!("/image {}", path.display());
        let mut io = BufferedIO::with_lines(&["Anything?", &image_line, "/quit"]);

        chat_loop(&mut orch, None, &mut io).unwrap();

        assert_eq!(orch.current_topic(), Some("sphinx"));
        assert_eq!(orch.history().len(), 1);
    }

    #[test]
    fn blank_lines_are_ignored_and_eof_ends_loop() {
        let mut orch = orchestrator(vec![], "ok");
        let mut io = BufferedIO::with_lines(&["", "   "]);

        chat_loop(&mut orch, None, &mut io).unwrap();

        assert!(orch.history().is_empty());
    }

    #[test]
    fn service_down_notice_is_printed() {
        let mut orch = orchestrator(
            vec![Err(GuideError::ServiceUnavailable("refused".into()))],
            "ok",
        );
        let mut io = BufferedIO::with_lines(&["/quit"]);

        chat_loop(&mut orch, Some(b"img".as_slice()), &mut io).unwrap();

        assert!(io.stdout_to_string().contains("Vision Service is not running"));
        assert!(orch.history().is_empty());
    }

    #[test]
    fn unreadable_image_path_is_reported() {
        let mut orch = orchestrator(vec![], "ok");
        let mut io = BufferedIO::with_lines(&["/image /definitely/missing.jpg", "/quit"]);

        chat_loop(&mut orch, None, &mut io).unwrap();

        assert!(
            io.stdout_to_string()
                .contains("Error: could not read /definitely/missing.jpg")
        );
    }
}
