//! Headless sonometer.
//!
//! Samples the default input (or a configured one), refreshes the live plot
//! in the background and reads operator commands from stdin, one per line.
//!
//! Usage: `sonometer [config.json]`

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;

use sonometer_core::{CommandStatus, Sonometer, SonometerConfig, SvgSurface};
use sonometer_cpal::CpalDriver;

const HELP: &str = "commands: start | stop | clear-points | clear-streaks | interval <secs> | \
save on|off | max-points <n> | capture | devices | device <index>|default | help | quit";

#[derive(Debug, Clone, PartialEq)]
enum Command {
    StartStreak,
    StopStreak,
    ClearPoints,
    ClearStreaks,
    Interval(f64),
    Save(bool),
    MaxPoints(usize),
    Capture,
    Devices,
    Device(Option<usize>),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let name = words.next().unwrap_or_default();
    let arg = words.next();

    let command = match (name, arg) {
        ("start", None) => Command::StartStreak,
        ("stop", None) => Command::StopStreak,
        ("clear-points", None) => Command::ClearPoints,
        ("clear-streaks", None) => Command::ClearStreaks,
        ("interval", Some(secs)) => Command::Interval(
            secs.parse()
                .map_err(|_| format!("'{}' is not a number of seconds", secs))?,
        ),
        ("save", Some("on")) => Command::Save(true),
        ("save", Some("off")) => Command::Save(false),
        ("max-points", Some(n)) => Command::MaxPoints(
            n.parse()
                .map_err(|_| format!("'{}' is not a point count", n))?,
        ),
        ("capture", None) => Command::Capture,
        ("devices", None) => Command::Devices,
        ("device", Some("default")) => Command::Device(None),
        ("device", Some(index)) => Command::Device(Some(
            index
                .parse()
                .map_err(|_| format!("'{}' is not a device index", index))?,
        )),
        ("help", None) => Command::Help,
        ("quit", None) | ("exit", None) => Command::Quit,
        _ => return Err(format!("unknown command '{}'", line.trim())),
    };

    if words.next().is_some() {
        return Err(format!("too many arguments in '{}'", line.trim()));
    }
    Ok(command)
}

fn print_status(status: &CommandStatus) {
    if status.ok {
        println!("{}", status.message);
    } else {
        println!("error: {}", status.message);
    }
}

fn print_devices(sonometer: &Sonometer<CpalDriver>) {
    match sonometer.list_host_apis() {
        Ok(apis) => {
            for api in apis {
                let marker = if api.is_default { " (default)" } else { "" };
                println!("api {}: {}{}, {} devices", api.index, api.name, marker, api.device_count);
            }
        }
        Err(e) => println!("error: {}", e),
    }
    match sonometer.list_input_devices(None) {
        Ok(devices) => {
            for device in devices {
                println!(
                    "  device {}: {} ({} input channels)",
                    device.device_index, device.name, device.max_input_channels
                );
            }
        }
        Err(e) => println!("error: {}", e),
    }
}

fn select_device(sonometer: &mut Sonometer<CpalDriver>, index: Option<usize>) -> CommandStatus {
    let Some(index) = index else {
        return sonometer.select_device(None);
    };
    match sonometer.list_input_devices(None) {
        Ok(devices) => match devices.into_iter().find(|d| d.device_index == index) {
            Some(device) => sonometer.select_device(Some(device)),
            None => CommandStatus::failed(format!("No input device with index {}", index)),
        },
        Err(e) => CommandStatus::failed(e.to_string()),
    }
}

fn load_config() -> Result<SonometerConfig, String> {
    match std::env::args().nth(1) {
        Some(path) => SonometerConfig::from_json_file(Path::new(&path)).map_err(|e| e.to_string()),
        None => Ok(SonometerConfig::default()),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut sonometer = match Sonometer::new(CpalDriver::new(), config, Box::new(SvgSurface::default())) {
        Ok(sonometer) => sonometer,
        Err(e) => {
            log::error!("failed to create sonometer: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = sonometer.start_display() {
        log::error!("failed to start display loop: {}", e);
        return ExitCode::FAILURE;
    }

    let status = sonometer.start();
    print_status(&status);
    if !status.ok {
        sonometer.shutdown();
        return ExitCode::FAILURE;
    }
    println!("{}", HELP);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::error!("failed to read stdin: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let status = match parse_command(&line) {
            Ok(Command::StartStreak) => sonometer.start_streak(),
            Ok(Command::StopStreak) => sonometer.stop_streak(),
            Ok(Command::ClearPoints) => sonometer.clear_points(),
            Ok(Command::ClearStreaks) => sonometer.clear_streaks(),
            Ok(Command::Interval(secs)) => sonometer.change_interval(secs),
            Ok(Command::Save(enabled)) => sonometer.set_save_streaks(enabled),
            Ok(Command::MaxPoints(n)) => sonometer.set_streak_max_points(n),
            Ok(Command::Capture) => sonometer.capture_plot(),
            Ok(Command::Devices) => {
                print_devices(&sonometer);
                continue;
            }
            Ok(Command::Device(index)) => select_device(&mut sonometer, index),
            Ok(Command::Help) => {
                println!("{}", HELP);
                continue;
            }
            Ok(Command::Quit) => break,
            Err(e) => CommandStatus::failed(e),
        };
        print_status(&status);
        io::stdout().flush().ok();
    }

    print_status(&sonometer.shutdown());
    ExitCode::SUCCESS
}
