use std::io::{BufRead, Write};

use guide_lib::config::FALLBACK_TOPIC;
use guide_lib::generation::TextGenerator;
use guide_lib::generation::onnx::load_engine;
use guide_lib::output::ConsoleIO;
use guide_lib::runtime::Runtime;
use guide_lib::session::build_prompt;

/// Run the `guide ask` command: one question, one answer, no session.
pub fn run_ask<IN, OUT, ERR>(
    topic: Option<&str>,
    question: &str,
    seed: Option<u64>,
    runtime: &Runtime,
    io: &mut dyn ConsoleIO<IN, OUT, ERR>,
) -> anyhow::Result<()>
where
    IN: BufRead,
    OUT: Write,
    ERR: Write,
{
    if question.trim().is_empty() {
        anyhow::bail!("The question is empty.");
    }

    let context = &runtime.context;
    let mut engine = load_engine(
        &context.generator_model_dir(),
        context.device(),
        runtime.generation,
    )?;
    if let Some(seed) = seed {
        engine = engine.with_seed(seed);
    }

    answer_with(&mut engine, topic, question, io)
}

/// Generate an answer about `topic` (or the fallback topic) and print it.
pub fn answer_with<G, IN, OUT, ERR>(
    generator: &mut G,
    topic: Option<&str>,
    question: &str,
    io: &mut dyn ConsoleIO<IN, OUT, ERR>,
) -> anyhow::Result<()>
where
    G: TextGenerator,
    IN: BufRead,
    OUT: Write,
    ERR: Write,
{
    let prompt = build_prompt(topic.unwrap_or(FALLBACK_TOPIC), question);
    let answer = generator.generate(&prompt)?;
    writeln!(io.stdout(), "{answer}")?;
    Ok(())
}
