//! Interactive console: type switch presses and analog moves

use anyhow::Result;
use crossbeam::channel::Sender;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::oneshot;
use tracing::warn;

use midi_captain::drivers::{Edge, EdgeKind, ScriptedAnalog};

const HELP: &str = "\
Commands:
  press N | release N | tap N   footswitch N (1-based)
  enc +N | enc -N               turn the encoder
  push | push down | push up    encoder push switch
  exp1 RAW | exp2 RAW           expression pedal sample (0-65535)
  help                          this text
  quit                          exit";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Switch(usize, Option<EdgeKind>),
    Encoder(i32),
    Push(Option<EdgeKind>),
    Expression(usize, u16),
    Help,
    Quit,
}

fn parse_switch(arg: Option<&str>) -> Result<usize, String> {
    let n: usize = arg
        .ok_or("missing switch number")?
        .parse()
        .map_err(|_| "switch number must be a positive integer".to_string())?;
    n.checked_sub(1).ok_or_else(|| "switches are numbered from 1".to_string())
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Err("empty command".into());
    };
    let arg = words.next();

    match cmd.to_ascii_lowercase().as_str() {
        "press" => Ok(Command::Switch(parse_switch(arg)?, Some(EdgeKind::Press))),
        "release" => Ok(Command::Switch(parse_switch(arg)?, Some(EdgeKind::Release))),
        "tap" => Ok(Command::Switch(parse_switch(arg)?, None)),
        "enc" => {
            let delta = arg
                .ok_or("missing encoder delta")?
                .trim_start_matches('+')
                .parse()
                .map_err(|_| "encoder delta must be an integer".to_string())?;
            Ok(Command::Encoder(delta))
        }
        "push" => match arg {
            None => Ok(Command::Push(None)),
            Some("down") => Ok(Command::Push(Some(EdgeKind::Press))),
            Some("up") => Ok(Command::Push(Some(EdgeKind::Release))),
            Some(other) => Err(format!("unknown push action '{}'", other)),
        },
        "exp1" | "exp2" => {
            let pedal = if cmd.eq_ignore_ascii_case("exp1") { 0 } else { 1 };
            let raw = arg
                .ok_or("missing pedal value")?
                .parse()
                .map_err(|_| "pedal value must be 0-65535".to_string())?;
            Ok(Command::Expression(pedal, raw))
        }
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command '{}' (try 'help')", other)),
    }
}

/// Blocking REPL; run it on its own thread
///
/// `quit` is signalled when the user exits or input closes.
pub fn run_repl(edges: Sender<Edge>, analog: ScriptedAnalog, quit: oneshot::Sender<()>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    println!("{}", HELP);

    loop {
        let line = match rl.readline("captain> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                warn!("Console read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line.as_str());

        let sent = match parse_command(&line) {
            Ok(Command::Switch(index, Some(kind))) => edges.send(Edge { button_index: index, kind }),
            Ok(Command::Switch(index, None)) => edges
                .send(Edge::press(index))
                .and_then(|_| edges.send(Edge::release(index))),
            Ok(Command::Encoder(delta)) => {
                analog.turn_encoder(delta);
                Ok(())
            }
            Ok(Command::Push(Some(kind))) => {
                analog.push_encoder(kind);
                Ok(())
            }
            Ok(Command::Push(None)) => {
                analog.push_encoder(EdgeKind::Press);
                analog.push_encoder(EdgeKind::Release);
                Ok(())
            }
            Ok(Command::Expression(pedal, raw)) => {
                analog.set_expression(pedal, raw);
                Ok(())
            }
            Ok(Command::Help) => {
                println!("{}", HELP);
                Ok(())
            }
            Ok(Command::Quit) => break,
            Err(msg) => {
                println!("{}", msg);
                Ok(())
            }
        };

        // Engine side gone: nothing left to drive
        if sent.is_err() {
            break;
        }
    }

    let _ = quit.send(());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_switch_commands() {
        assert_eq!(parse_command("press 1"), Ok(Command::Switch(0, Some(EdgeKind::Press))));
        assert_eq!(parse_command("RELEASE 10"), Ok(Command::Switch(9, Some(EdgeKind::Release))));
        assert_eq!(parse_command("tap 3"), Ok(Command::Switch(2, None)));
        assert!(parse_command("press 0").is_err());
        assert!(parse_command("press").is_err());
        assert!(parse_command("press x").is_err());
    }

    #[test]
    fn test_parse_analog_commands() {
        assert_eq!(parse_command("enc +5"), Ok(Command::Encoder(5)));
        assert_eq!(parse_command("enc -2"), Ok(Command::Encoder(-2)));
        assert_eq!(parse_command("push"), Ok(Command::Push(None)));
        assert_eq!(parse_command("push down"), Ok(Command::Push(Some(EdgeKind::Press))));
        assert_eq!(parse_command("exp2 40000"), Ok(Command::Expression(1, 40000)));
        assert!(parse_command("exp1 70000").is_err());
    }

    #[test]
    fn test_parse_misc() {
        assert_eq!(parse_command("quit"), Ok(Command::Quit));
        assert_eq!(parse_command("  help "), Ok(Command::Help));
        assert!(parse_command("bank up").is_err());
        assert!(parse_command("").is_err());
    }
}
