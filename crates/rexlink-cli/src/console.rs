//! Line-oriented console commands

use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use rexlink_core::codec::parse_request;
use rexlink_core::{ControlRequest, Direction, Region, Selection, SubPart};

/// One parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Select(Selection),
    Press(Direction),
    Release,
    /// Press, wait, release
    Hold(Direction, Duration),
    /// Explicit request, sent as given
    Request(ControlRequest),
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  select <region> [part]   choose what to move (part defaults to full)
  press <direction>        start a gesture (up, down, left, right, center)
  release                  end the gesture
  hold <direction> <ms>    press, wait, release
  {json}                   send a control request as-is
  status                   show link and gesture state
  quit";

/// Parse one line; `Ok(None)` for blank lines
pub fn parse_line(line: &str) -> anyhow::Result<Option<ConsoleCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line.starts_with('{') {
        let request = parse_request(line).context("invalid control request")?;
        return Ok(Some(ConsoleCommand::Request(request)));
    }

    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<&str> = words.collect();

    let command = match (verb.as_str(), args.as_slice()) {
        ("select", [region]) => ConsoleCommand::Select(Selection::full(region.parse::<Region>()?)),
        ("select", [region, part]) => {
            ConsoleCommand::Select(Selection::new(region.parse()?, part.parse::<SubPart>()?)?)
        }
        ("press", [direction]) => ConsoleCommand::Press(direction.parse()?),
        ("release", []) => ConsoleCommand::Release,
        ("hold", [direction, ms]) => {
            let ms: u64 = ms
                .parse()
                .map_err(|_| anyhow!("hold duration must be milliseconds, got {}", ms))?;
            ConsoleCommand::Hold(direction.parse()?, Duration::from_millis(ms))
        }
        ("status", []) => ConsoleCommand::Status,
        ("help" | "?", []) => ConsoleCommand::Help,
        ("quit" | "exit", []) => ConsoleCommand::Quit,
        ("select" | "press" | "release" | "hold" | "status" | "quit", _) => {
            bail!("wrong arguments for {}, try help", verb)
        }
        _ => bail!("unknown command: {}", verb),
    };
    Ok(Some(command))
}
