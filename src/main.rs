//! MIDI Captain - foot controller runtime
//!
//! Drives the dispatch engine from a fixed-period timer, with host MIDI on
//! system ports and switches typed at an interactive console.

use anyhow::Result;
use clap::Parser;
use colored::*;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use midi_captain::config::{watcher::ConfigWatcher, DeviceConfig, DeviceKind, MessageConfig, ResolvedConfig};
use midi_captain::drivers::{midi_port, ConsoleSwitches, MidiPortTransport, PixelStrip, ScriptedAnalog};
use midi_captain::router::DispatchEngine;

/// MIDI Captain - configurable MIDI foot controller core
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (.json or .yaml)
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Host MIDI input port (substring match)
    #[arg(long, env = "MIDI_INPUT_PORT")]
    input_port: Option<String>,

    /// Host MIDI output port (substring match)
    #[arg(long, env = "MIDI_OUTPUT_PORT")]
    output_port: Option<String>,

    /// Loop period in milliseconds
    #[arg(long, default_value = "2")]
    tick_ms: u64,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Print the resolved configuration and exit
    #[arg(long)]
    dump_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    if args.list_ports {
        print_ports()?;
        return Ok(());
    }

    info!("Starting MIDI Captain...");
    info!("Configuration file: {}", args.config);

    let resolved = DeviceConfig::load_or_default(&args.config).await.resolve();

    if args.dump_config {
        print_config(&resolved);
        return Ok(());
    }

    run_app(args, resolved).await?;

    info!("MIDI Captain shutdown complete");
    Ok(())
}

async fn run_app(args: Args, config: ResolvedConfig) -> Result<()> {
    let transport = MidiPortTransport::connect(args.input_port.as_deref(), args.output_port.as_deref())?;
    if args.input_port.is_none() || args.output_port.is_none() {
        warn!("Running without a full host MIDI connection (use --input-port/--output-port)");
    }

    let (edge_tx, switches) = ConsoleSwitches::channel();
    let analog = ScriptedAnalog::new();
    // Sized for the largest device so a reload can switch devices
    let strip = PixelStrip::new(DeviceKind::Std10.button_count(), config.device.pixels_per_button());

    info!(
        "Device {} with {} buttons, loop period {} ms",
        config.device.as_str(),
        config.buttons.len(),
        args.tick_ms
    );

    let mut engine = DispatchEngine::new(
        config,
        Box::new(switches),
        Box::new(transport),
        Box::new(strip.clone()),
    )
    .with_analog(Box::new(analog.clone()));

    let mut config_watcher = match ConfigWatcher::new(args.config.clone()) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            warn!("Hot reload disabled: {:#}", e);
            None
        }
    };

    let (quit_tx, mut quit_rx) = oneshot::channel();
    std::thread::spawn(move || {
        if let Err(e) = cli::run_repl(edge_tx, analog, quit_tx) {
            warn!("Console stopped: {}", e);
        }
    });

    let mut interval = tokio::time::interval(Duration::from_millis(args.tick_ms.max(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut last_frame = strip.shown();

    info!("Ready to process MIDI events!");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                engine.tick();

                let frame = strip.shown();
                if frame != last_frame {
                    for (i, button) in engine.buttons().iter().enumerate() {
                        if let Some(color) = strip.button_color(i) {
                            debug!("LED {} '{}' {}", i + 1, button.label(), color);
                        }
                    }
                    last_frame = frame;
                }
            }

            Some(new_config) = next_config(&mut config_watcher) => {
                info!("Configuration file changed, reloading...");
                engine.reload(new_config.resolve());
            }

            _ = &mut quit_rx => {
                info!("Console closed, stopping");
                break;
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
    }

    info!("Processed {} ticks", engine.ticks());
    Ok(())
}

/// Next reloaded config, or never when hot reload is off
async fn next_config(watcher: &mut Option<ConfigWatcher>) -> Option<DeviceConfig> {
    match watcher {
        Some(w) => w.next_config().await,
        None => std::future::pending().await,
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to install CTRL+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

fn print_ports() -> Result<()> {
    let (inputs, outputs) = midi_port::list_ports()?;

    println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());
    for (title, ports) in [("Input Ports:", inputs), ("Output Ports:", outputs)] {
        println!("\n{}", title.bold());
        if ports.is_empty() {
            println!("  {}", "(none)".dimmed());
        }
        for (i, name) in ports.iter().enumerate() {
            println!("  {}: {}", i.to_string().yellow(), name.green());
        }
    }
    println!();
    Ok(())
}

fn print_config(config: &ResolvedConfig) {
    println!("\n{} {}", "=== Device:".bold().cyan(), config.device.as_str().bold().cyan());

    println!("\n{}", "Buttons:".bold());
    for (i, btn) in config.buttons.iter().enumerate() {
        let message = match btn.message {
            MessageConfig::Cc { cc, cc_on, cc_off } => format!("CC{} {}/{}", cc, cc_on, cc_off),
            MessageConfig::Note { note, velocity_on, velocity_off } => {
                format!("Note{} {}/{}", note, velocity_on, velocity_off)
            }
            MessageConfig::ProgramChange { program } => format!("PC {}", program),
            MessageConfig::ProgramChangeInc { pc_step } => format!("PC +{}", pc_step),
            MessageConfig::ProgramChangeDec { pc_step } => format!("PC -{}", pc_step),
        };
        let keytimes = if btn.keytimes > 1 {
            format!(" x{} ({} states)", btn.keytimes, btn.states.len())
        } else {
            String::new()
        };
        println!(
            "  {:>2}: {:<8} {} ch{} {} {}{}",
            i + 1,
            btn.label.yellow(),
            message.green(),
            btn.channel + 1,
            btn.mode.as_str(),
            btn.color.as_str().cyan(),
            keytimes
        );
    }

    if let Some(enc) = &config.encoder {
        let steps = enc.steps.map(|s| format!(" {} steps", s)).unwrap_or_default();
        println!(
            "\n{} {} CC{} {}-{} start {}{}",
            "Encoder:".bold(),
            enc.label.yellow(),
            enc.cc.to_string().green(),
            enc.min,
            enc.max,
            enc.initial,
            steps
        );
    }
    if let Some(push) = &config.encoder_push {
        println!("{} {} {}", "Encoder push:".bold(), push.label.yellow(), push.mode.as_str());
    }
    for exp in &config.expression {
        println!(
            "{} {} CC{} {}-{} {:?}",
            "Expression:".bold(),
            exp.label.yellow(),
            exp.cc.to_string().green(),
            exp.min,
            exp.max,
            exp.polarity
        );
    }
    println!();
}
