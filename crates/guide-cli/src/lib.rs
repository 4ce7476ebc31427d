pub mod cli;
pub mod commands;
pub mod logging;

#[cfg(test)]
pub mod test_util;

use std::io::{BufRead, Write};

use clap::Parser;

use guide_lib::output::ConsoleIO;

use cli::{Cli, Command, ModelCommand};

/// Main CLI entry point. Parses args and dispatches to the appropriate command.
pub fn try_run<IN, OUT, ERR>(
    args: &[&str],
    io: &mut dyn ConsoleIO<IN, OUT, ERR>,
) -> anyhow::Result<()>
where
    IN: BufRead,
    OUT: Write,
    ERR: Write,
{
    let cli = Cli::try_parse_from(args)?;
    let runtime = cli.runtime()?;

    match cli.command {
        Command::Serve { .. } => commands::serve::run_serve(&runtime, io),
        Command::Identify { image, top, json } => {
            commands::identify::run_identify(&image, top, json, &runtime, io)
        }
        Command::Chat { image, seed } => {
            commands::chat::run_chat(image.as_deref(), seed, &runtime, io)
        }
        Command::Ask {
            topic,
            seed,
            question,
        } => commands::ask::run_ask(topic.as_deref(), &question.join(" "), seed, &runtime, io),
        Command::Model { model_command } => match model_command {
            ModelCommand::Download { force } => {
                commands::model::run_model_download(force, &runtime, io)
            }
        },
    }
}
