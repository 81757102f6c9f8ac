//! Line-oriented interactive session.
//!
//! Plain lines are analyzed; lines starting with `:` are commands.

use anyhow::Result;
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tonegate::GateError;
use tonegate::session::{InteractionMode, Orchestrator, Tone};

use crate::app::status::render_snapshot;

const HELP: &str = "\
Type text to analyze it. Commands:
  :mode <draft|respond|analyze>   switch interaction mode
  :tone <name>                    generate a tone variant of the last analysis
  :tones                          list tones available in the current mode
  :quota                          show remaining text quota
  :show                           print the current session
  :help                           this message
  :quit                           leave the shell";

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Analyze(String),
    Mode(InteractionMode),
    Tone(Tone),
    Tones,
    Quota,
    Show,
    Help,
    Quit,
    Invalid(String),
}

fn parse_line(line: &str) -> Option<ShellCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(command) = line.strip_prefix(':') else {
        return Some(ShellCommand::Analyze(line.to_string()));
    };
    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, arg)| (name, arg.trim()));
    let parsed = match name {
        "mode" => InteractionMode::from_str(arg)
            .map(ShellCommand::Mode)
            .unwrap_or_else(|_| ShellCommand::Invalid(format!("unknown mode '{arg}'"))),
        "tone" => Tone::from_str(arg)
            .map(ShellCommand::Tone)
            .unwrap_or_else(|_| ShellCommand::Invalid(format!("unknown tone '{arg}'"))),
        "tones" => ShellCommand::Tones,
        "quota" => ShellCommand::Quota,
        "show" => ShellCommand::Show,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => ShellCommand::Invalid(format!("unknown command ':{other}'")),
    };
    Some(parsed)
}

/// Print the outcome of one request. Rejections are shown, not propagated.
fn report(result: Result<(), GateError>, orchestrator: &Orchestrator) {
    if let Err(err) = result {
        tracing::debug!("Shell request ended with: {err}");
    }
    println!("{}\n", render_snapshot(&orchestrator.snapshot()));
}

pub async fn run(orchestrator: &Orchestrator) -> Result<()> {
    println!("tonegate shell ({} mode). Type :help for commands.\n", orchestrator.mode());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_line(&line) else {
            continue;
        };
        match command {
            ShellCommand::Analyze(text) => {
                let result = match orchestrator.run_analysis(&text) {
                    Ok(ticket) => ticket.wait().await,
                    Err(err) => Err(err),
                };
                report(result, orchestrator);
            }
            ShellCommand::Tone(tone) => {
                let result = match orchestrator.run_variant(tone) {
                    Ok(Some(ticket)) => ticket.wait().await,
                    Ok(None) => Ok(()),
                    Err(err) => Err(err),
                };
                report(result, orchestrator);
            }
            ShellCommand::Mode(mode) => {
                orchestrator.set_mode(mode);
                println!("Mode set to {mode}.\n");
            }
            ShellCommand::Tones => {
                let tones: Vec<String> = orchestrator.mode().tones().map(|t| t.to_string()).collect();
                println!("{}\n", tones.join(", "));
            }
            ShellCommand::Quota => {
                let admission = orchestrator.admission();
                let quota = orchestrator.remaining_quota(admission.client())?;
                println!(
                    "{}/{} text requests left today (resets {}).\n",
                    quota.remaining,
                    quota.limit,
                    quota.reset_at.format("%H:%M UTC")
                );
            }
            ShellCommand::Show => println!("{}\n", render_snapshot(&orchestrator.snapshot())),
            ShellCommand::Help => println!("{HELP}\n"),
            ShellCommand::Quit => break,
            ShellCommand::Invalid(message) => println!("{message}. Type :help for commands.\n"),
        }
    }
    Ok(())
}
