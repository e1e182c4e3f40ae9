use std::io::Write;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use loopback_bands::{meter, AnalyzerConfig, DeviceSelector, Normalization};

const METER_WIDTH: usize = 12;

#[derive(Parser)]
#[command(name = "audio-probe")]
#[command(version)]
#[command(about = "List loopback devices and print live volume/bass/mid/treble meters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every device usable for loopback capture
    List,
    /// Capture from a device and print meters in place
    Run {
        /// Device index from `list`, or part of its name. Omit for the default output.
        #[arg(short, long)]
        device: Option<String>,

        /// Stop after this many seconds, 0 runs until interrupted
        #[arg(short, long, default_value_t = 10)]
        seconds: u64,

        /// fixed or adaptive
        #[arg(short, long, default_value = "fixed", value_parser = parse_normalization)]
        normalization: Normalization,

        /// Refresh period of the printed meters in milliseconds
        #[arg(long, default_value_t = 50)]
        interval_ms: u64,
    },
}

fn parse_normalization(value: &str) -> Result<Normalization, String> {
    Normalization::parse(value).ok_or_else(|| format!("'{}' is not one of: fixed, adaptive", value))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::List => list(),
        Command::Run {
            device,
            seconds,
            normalization,
            interval_ms,
        } => run(device, seconds, normalization, interval_ms),
    }
}

fn list() -> ExitCode {
    match loopback_bands::list_devices() {
        Ok(devices) if devices.is_empty() => {
            println!("No loopback devices found");
            ExitCode::SUCCESS
        }
        Ok(devices) => {
            for device in devices {
                let marker = if device.is_default { "*" } else { " " };
                println!("{}{:>3}  {:<16} {}", marker, device.index, device.backend.to_string(), device.name);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to list devices: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(device: Option<String>, seconds: u64, normalization: Normalization, interval_ms: u64) -> ExitCode {
    let config = AnalyzerConfig {
        normalization,
        ..AnalyzerConfig::default()
    };
    let opened = match device {
        Some(selector) => loopback_bands::open(&DeviceSelector::parse(&selector), config),
        None => loopback_bands::open_default(config),
    };
    let capture = match opened {
        Ok(capture) => capture,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    println!("Capturing '{}' ({})", capture.device_name(), capture.backend());
    let deadline = (seconds > 0).then(|| Instant::now() + Duration::from_secs(seconds));
    let interval = Duration::from_millis(interval_ms.max(1));
    let mut stdout = std::io::stdout();

    while deadline.map_or(true, |d| Instant::now() < d) {
        let Some(levels) = capture.levels() else {
            eprintln!("\nCapture stream failed");
            return ExitCode::FAILURE;
        };
        let line = format!(
            "\rvol {} bass {} mid {} treble {}",
            meter(levels.volume, METER_WIDTH),
            meter(levels.bass, METER_WIDTH),
            meter(levels.mid, METER_WIDTH),
            meter(levels.treble, METER_WIDTH)
        );
        if stdout.write_all(line.as_bytes()).and_then(|_| stdout.flush()).is_err() {
            break;
        }
        thread::sleep(interval);
    }
    println!();
    ExitCode::SUCCESS
}
