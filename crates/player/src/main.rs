mod cli;

use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use common::EngineEvent;
use generation::ProceduralProvider;
use log::{error, info};
use playback::{
    config_path, load_config, render_session, save_config, EngineConfig, PlaybackController,
};

use crate::cli::Cli;

const TEMPO_STEP: u32 = 5;

// Configure logging; the interactive prompt owns stdout so logs go to a file
fn setup_logging(log_file: Option<&Path>) {
    let log_path = log_file
        .map(Path::to_path_buf)
        .unwrap_or_else(|| std::env::temp_dir().join("helix.log"));

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(buf, "[{}] [{}] {}", timestamp, record.level(), record.args())
    });

    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => {
            println!("Logging to file: {}", log_path.display());
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => {
            eprintln!("Warning: Could not open log file {}: {}", log_path.display(), e);
        }
    }

    builder.init();
}

fn status_line(controller: &PlaybackController, pattern_length: usize) -> String {
    let state = if controller.is_active() { "PLAYING" } else { "PAUSED" };
    format!(
        "{} | BPM:{} STEP:{:02}/{} SEC:{} | {} | {} | LVL:{:.2}",
        state,
        controller.tempo(),
        controller.current_step(),
        pattern_length,
        controller.current_section(),
        controller.active_dna().label(),
        controller.status(),
        controller.audio_level(),
    )
}

fn print_help() {
    println!("\nAvailable commands:");
    println!("  s: Start/stop playback");
    println!("  +/-: Tempo up/down by {} BPM", TEMPO_STEP);
    println!("  t <bpm>: Set tempo");
    println!("  ?: Show status");
    println!("  l <path>: Load a DNA preset");
    println!("  w <path>: Write the active DNA to a preset");
    println!("  q: Quit");
}

fn run_interactive(
    controller: &mut PlaybackController,
    config: &EngineConfig,
) -> Result<(), Box<dyn Error>> {
    println!("Helix");
    println!("=====");
    if !controller.has_audio_device() {
        println!("(audio device opens on first start)");
    }
    print_help();

    controller.subscribe(|event| match event {
        EngineEvent::DnaPublished { label, recalled } => {
            let origin = if *recalled { "recalled" } else { "new" };
            println!("\n~ DNA {}: {}", origin, label);
        }
        EngineEvent::GenerationFailed(reason) => println!("\n~ generation failed: {}", reason),
        _ => {}
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut input = String::new();
    let pattern_length = config.scheduler.pattern_length;

    loop {
        print!("> ");
        io::stdout().flush()?;
        input.clear();
        if reader.read_line(&mut input)? == 0 {
            break;
        }
        let command = input.trim();
        let (verb, arg) = match command.split_once(' ') {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (command, ""),
        };

        match verb {
            "q" => break,
            "" => {}
            "s" => {
                let playing = controller.toggle();
                println!("{}", if playing { "Playing" } else { "Paused" });
                if playing && !controller.has_audio_device() {
                    println!("No audio device, scheduling silently");
                }
            }
            "+" => {
                let bpm = controller.set_tempo(controller.tempo().saturating_add(TEMPO_STEP));
                println!("BPM: {}", bpm);
            }
            "-" => {
                let bpm = controller.set_tempo(controller.tempo().saturating_sub(TEMPO_STEP));
                println!("BPM: {}", bpm);
            }
            "t" => match arg.parse::<u32>() {
                Ok(bpm) => println!("BPM: {}", controller.set_tempo(bpm)),
                Err(_) => println!("Usage: t <bpm>"),
            },
            "?" => println!("{}", status_line(controller, pattern_length)),
            "l" if !arg.is_empty() => match controller.load_preset(arg) {
                Ok(()) => println!("Loaded {}", arg),
                Err(e) => println!("Could not load preset: {}", e),
            },
            "w" if !arg.is_empty() => match controller.export_dna(arg) {
                Ok(()) => println!("Wrote {}", arg),
                Err(e) => println!("Could not write preset: {}", e),
            },
            "h" | "help" => print_help(),
            _ => println!("Unknown command: {}", command),
        }
    }

    controller.stop();
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let path: PathBuf = cli.config.clone().unwrap_or_else(config_path);
    let mut config = load_config(&path)?;
    if let Some(bpm) = cli.bpm {
        config.bpm = bpm;
    }
    if let Some(seed) = cli.seed {
        config.scheduler.seed = Some(seed);
    }

    if cli.write_config {
        save_config(&path, &config)?;
        println!("Wrote config to {}", path.display());
        return Ok(());
    }

    let start_dna = match &cli.dna {
        Some(preset) => Some(dna::load_preset(preset)?),
        None => None,
    };

    if let Some(out) = &cli.render {
        let dna = start_dna.unwrap_or_default();
        let summary = render_session(&config, dna, cli.seconds, out)?;
        println!(
            "Rendered {:.1}s ({} steps) to {}",
            summary.seconds(),
            summary.steps,
            out.display()
        );
        return Ok(());
    }

    let provider = match cli.seed {
        Some(seed) => ProceduralProvider::with_seed(seed),
        None => ProceduralProvider::new(),
    }
    .with_latency(Duration::from_millis(cli.latency_ms));

    let mut controller = PlaybackController::new(&config, Arc::new(provider));
    if let Some(dna) = start_dna {
        controller = controller.with_dna(dna);
    }

    run_interactive(&mut controller, &config)
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    setup_logging(cli.log_file.as_deref());
    info!("Starting helix");

    if let Err(e) = run(cli) {
        error!("{}", e);
        return Err(e);
    }

    info!("Helix exited");
    Ok(())
}
