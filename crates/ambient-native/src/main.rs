mod audio;
mod commands;

use ambient_core::{AmbientConfig, AmbientEngine, AudioDevice};
use anyhow::Context;
use audio::CpalHost;
use clap::Parser;
use commands::Command;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::io::BufRead;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "ambient-native")]
#[command(about = "Play the generative ambient soundscape on the default output device")]
struct Args {
    /// TOML file overriding any engine settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fixed seed for a reproducible soundscape
    #[arg(long)]
    seed: Option<u64>,

    /// Default master volume (0..1)
    #[arg(long)]
    volume: Option<f32>,

    /// Start playing right away instead of waiting for `play`
    #[arg(long)]
    autoplay: bool,
}

fn load_config(args: &Args) -> anyhow::Result<AmbientConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => AmbientConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(volume) = args.volume {
        config.master.default_volume = volume;
    }
    config.validate()?;
    Ok(config)
}

fn spawn_stdin_reader() -> anyhow::Result<Receiver<String>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::warn!("stdin read error: {e}");
                        break;
                    }
                }
            }
        })
        .context("spawning stdin reader")?;
    Ok(rx)
}

fn run_command(engine: &mut AmbientEngine<CpalHost>, cmd: Command) {
    match cmd {
        Command::Play => {
            if let Err(e) = pollster::block_on(engine.start()) {
                log::error!("start failed: {e}");
            }
        }
        Command::Stop => engine.stop(),
        Command::Volume { level, ramp_sec } => engine.set_volume(level, ramp_sec),
        Command::Say(text) => {
            if engine.soothe_if_anxious(&text) {
                println!("(easing the music down)");
            }
        }
        Command::Status => {
            let device_time = engine.device().map(|d| d.current_time());
            println!(
                "playing={} volume={} device_time={} next_note={:.2}s",
                engine.is_playing(),
                engine
                    .master_value()
                    .map_or("-".to_string(), |v| format!("{v:.3}")),
                device_time.map_or("-".to_string(), |t| format!("{t:.2}s")),
                engine.next_note_time()
            );
        }
        Command::Help => println!("{}", commands::HELP),
        Command::Quit => {}
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let mut engine = AmbientEngine::new(CpalHost, config)?;
    let mut lines = spawn_stdin_reader()?;

    if args.autoplay {
        run_command(&mut engine, Command::Play);
    }
    println!("{}", commands::HELP);

    // Single control thread: wait for input until the scheduler is next due.
    loop {
        let received = match engine.next_deadline() {
            Some(deadline) => lines.recv_deadline(deadline),
            None => lines.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(line) => match commands::parse(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(cmd)) => run_command(&mut engine, cmd),
                Ok(None) => {}
                Err(e) => println!("{e:#}"),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                if !engine.is_playing() {
                    break;
                }
                // Input closed mid-playback: keep the soundscape going until killed.
                log::info!("stdin closed; playing until interrupted");
                lines = crossbeam_channel::never();
            }
        }
        engine.poll(Instant::now());
    }

    engine.stop();
    log::info!("bye");
    Ok(())
}
