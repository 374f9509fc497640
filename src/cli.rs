//! Command-line interface and REPL
//!
//! Line-based operator surface: drive keys, velocity bound editors, invert
//! toggles, zero, connection control, and the record/play/stop/clear
//! controls. Runs on its own thread; parsed commands are handed to the main
//! loop over a channel.

use crate::control::command::LegacyCommand;
use crate::input::keys::{self, KeyCommand};
use anyhow::Result;
use colored::*;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use tracing::debug;

/// A parsed operator command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatorCommand {
    Key(KeyCommand),
    Zero,
    SetMaxLinear(f64),
    SetMaxAngular(f64),
    InvertLinear,
    InvertAngular,
    Reconnect,
    Status,
    Record,
    Play,
    StopPlayback,
    Clear,
    Legacy(LegacyCommand),
    Help,
    Quit,
}

/// Parse one REPL line into an operator command.
pub fn parse_line(line: &str) -> Result<OperatorCommand, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.as_slice() {
        [] => Err(String::new()),
        [key] if key.len() == 1 => {
            let ch = key.chars().next().unwrap_or_default();
            keys::parse_key(ch)
                .map(OperatorCommand::Key)
                .ok_or_else(|| format!("Unknown key '{}' (try w/a/s/d/e)", ch))
        }
        ["zero"] => Ok(OperatorCommand::Zero),
        ["max", "linear", value] => parse_value(value).map(OperatorCommand::SetMaxLinear),
        ["max", "angular", value] => parse_value(value).map(OperatorCommand::SetMaxAngular),
        ["invert"] | ["invert", "linear"] => Ok(OperatorCommand::InvertLinear),
        ["invert", "angular"] => Ok(OperatorCommand::InvertAngular),
        ["connect"] | ["reconnect"] => Ok(OperatorCommand::Reconnect),
        ["status"] => Ok(OperatorCommand::Status),
        ["record"] => Ok(OperatorCommand::Record),
        ["play"] => Ok(OperatorCommand::Play),
        ["stop"] => Ok(OperatorCommand::StopPlayback),
        ["clear"] => Ok(OperatorCommand::Clear),
        ["legacy", command] => command
            .parse::<LegacyCommand>()
            .map(OperatorCommand::Legacy)
            .map_err(|_| format!("Unknown legacy command '{}'", command)),
        ["help"] | ["?"] => Ok(OperatorCommand::Help),
        ["quit"] | ["exit"] => Ok(OperatorCommand::Quit),
        _ => Err(format!("Unknown command: {}", line.trim())),
    }
}

fn parse_value(token: &str) -> Result<f64, String> {
    token
        .parse::<f64>()
        .map_err(|_| format!("Not a number: {}", token))
}

/// Run the REPL, forwarding parsed commands to the main loop.
///
/// Blocks its thread on readline; call from a dedicated thread.
pub fn run_repl(tx: mpsc::Sender<OperatorCommand>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    print_help();

    loop {
        let readline = rl.readline("teleop> ");
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match parse_line(&line) {
                    Ok(OperatorCommand::Help) => print_help(),
                    Ok(OperatorCommand::Quit) => {
                        let _ = tx.blocking_send(OperatorCommand::Quit);
                        break;
                    }
                    Ok(command) => {
                        debug!("REPL command: {:?}", command);
                        if tx.blocking_send(command).is_err() {
                            break;
                        }
                    }
                    Err(message) if message.is_empty() => {}
                    Err(message) => eprintln!("{}", message.red()),
                }
            }
            Err(_) => {
                let _ = tx.blocking_send(OperatorCommand::Quit);
                break;
            }
        }
    }

    Ok(())
}

fn print_help() {
    println!("\n{}", "=== Teleop GW ===".bold().cyan());
    println!("  {}              nudge linear velocity up/down", "w / s".green());
    println!("  {}              nudge angular velocity up/down", "a / d".green());
    println!("  {}                  emergency stop (both axes)", "e".green());
    println!("  {}   set velocity bounds", "max linear|angular <v>".green());
    println!("  {}   toggle axis inversion", "invert [linear|angular]".green());
    println!("  {}            reconnect to the broker", "connect".green());
    println!("  {}             session and link status", "status".green());
    println!(
        "  {}  recording controls",
        "record / play / stop / clear".green()
    );
    println!("  {}     publish a discrete command", "legacy <forward|..>".green());
    println!("  {}               exit\n", "quit".green());
}
