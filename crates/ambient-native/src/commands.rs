use anyhow::{bail, Context};

/// Ramp used by `vol` when none is given.
pub const DEFAULT_VOLUME_RAMP_SEC: f64 = 0.5;

pub const HELP: &str = "commands: play | stop | vol <0..1> [ramp_sec] | say <text> | status | quit";

/// One line typed at the player prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Stop,
    Volume { level: f32, ramp_sec: f64 },
    Say(String),
    Status,
    Help,
    Quit,
}

/// Parse a prompt line. Blank lines yield `None`.
pub fn parse(line: &str) -> anyhow::Result<Option<Command>> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let cmd = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "play" | "start" => Command::Play,
        "stop" => Command::Stop,
        "vol" | "volume" => {
            let mut args = rest.split_whitespace();
            let level = args
                .next()
                .context("usage: vol <0..1> [ramp_sec]")?
                .parse::<f32>()
                .context("volume level must be a number")?;
            let ramp_sec = match args.next() {
                Some(r) => r.parse::<f64>().context("ramp must be a number of seconds")?,
                None => DEFAULT_VOLUME_RAMP_SEC,
            };
            Command::Volume { level, ramp_sec }
        }
        "say" => {
            if rest.is_empty() {
                bail!("usage: say <text>");
            }
            Command::Say(rest.to_string())
        }
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("unknown command '{other}' ({HELP})"),
    };
    Ok(Some(cmd))
}
