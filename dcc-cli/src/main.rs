//! Command-line entry point: loads a locomotive roster, brings up a
//! signal driver, and starts the run loop, then hands off to a small
//! line-oriented REPL for live control.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use dcc_core::{Direction, Packet, SignalDriver};
use dcc_driver::DummyDriver;
use dcc_station::{Controller, Locomotive};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DriverKind {
    Dummy,
    Gpio,
}

/// A DCC command station: encodes and streams packets to a track booster.
#[derive(Debug, Parser)]
#[command(name = "dcc-rs", version, about)]
struct Args {
    /// Path to a JSON locomotive roster. Missing or invalid files leave
    /// the registry empty rather than aborting startup.
    #[arg(long, default_value_t = dcc_config::DEFAULT_CONFIG_PATH.to_string())]
    config: String,

    /// Which signal driver to bring up.
    #[arg(long, value_enum, default_value = "dummy")]
    driver: DriverKind,

    /// GPIO pin carrying the DCC signal (gpio driver only).
    #[cfg(feature = "gpio")]
    #[arg(long, default_value_t = dcc_driver::gpio::DEFAULT_SIGNAL_PIN)]
    signal_pin: u8,

    /// GPIO pin gating the booster (gpio driver only).
    #[cfg(feature = "gpio")]
    #[arg(long, default_value_t = dcc_driver::gpio::DEFAULT_BRAKE_PIN)]
    brake_pin: u8,

    /// Print the loaded roster and exit without starting the run loop.
    #[arg(long)]
    list: bool,
}

/// Expands a leading `~` to `$HOME`, the way a shell would before handing
/// the path to us. `std::fs` never does this on its own.
fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/").or_else(|| (path == "~").then_some("")) {
        Some(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}

fn build_driver(args: &Args) -> Result<Arc<dyn SignalDriver + Send + Sync>, String> {
    match args.driver {
        DriverKind::Dummy => Ok(Arc::new(DummyDriver::default())),
        #[cfg(feature = "gpio")]
        DriverKind::Gpio => dcc_driver::GpioDriver::new(args.signal_pin, args.brake_pin)
            .map(|d| Arc::new(d) as Arc<dyn SignalDriver + Send + Sync>)
            .map_err(|e| e.to_string()),
        #[cfg(not(feature = "gpio"))]
        DriverKind::Gpio => Err("this build was compiled without the gpio feature".to_string()),
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let config_path = expand_tilde(&args.config);
    let config = match dcc_config::load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(err) => {
            log::error!("failed to load config from {}: {err}", config_path.display());
            dcc_config::Config::default()
        }
    };

    if args.list {
        for loco in &config.locomotives {
            println!("{}:{} speed={}", loco.name, loco.address, loco.speed);
        }
        return ExitCode::SUCCESS;
    }

    let driver = match build_driver(&args) {
        Ok(driver) => driver,
        Err(err) => {
            log::error!("failed to initialize driver: {err}");
            return ExitCode::FAILURE;
        }
    };

    let controller = Controller::new(driver);
    for loco in &config.locomotives {
        controller.add(Locomotive::from(loco));
    }

    controller.start();
    log::info!("run loop started, entering REPL (type 'help' for commands)");
    repl(&controller);
    controller.stop();

    ExitCode::SUCCESS
}

fn repl(controller: &Controller) {
    let stdin = io::stdin();
    print_prompt();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            print_prompt();
            continue;
        }
        if !dispatch(controller, line) {
            break;
        }
        print_prompt();
    }
}

fn print_prompt() {
    print!("dcc> ");
    let _ = io::stdout().flush();
}

/// Runs one REPL command. Returns `false` when the REPL should exit.
fn dispatch(controller: &Controller, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    let Some(cmd) = parts.next() else { return true };
    let rest: Vec<&str> = parts.collect();

    match cmd {
        "help" => print_help(),
        "quit" | "exit" => return false,
        "list" => {
            for loco in controller.list() {
                println!("{loco}");
            }
        }
        "add" => match rest.as_slice() {
            [name, address] => match address.parse::<u8>() {
                Ok(address) if address != 0 && address != 0xFF => {
                    controller.add(Locomotive::new(
                        *name,
                        address,
                        0,
                        Direction::Forward,
                        false,
                        false,
                        false,
                        false,
                        false,
                    ));
                }
                _ => eprintln!("address must be 1..=254"),
            },
            _ => eprintln!("usage: add <name> <address>"),
        },
        "remove" => match rest.as_slice() {
            [name] => controller.remove(name),
            _ => eprintln!("usage: remove <name>"),
        },
        "speed" => match rest.as_slice() {
            [name, speed] => {
                let max_speed = if dcc_core::timing::current().headlight_compat { 15 } else { 31 };
                match speed.parse::<u8>() {
                    Ok(speed) if speed <= max_speed => match controller.get(name) {
                        Some(mut loco) => {
                            loco.set_speed(speed);
                            controller.add(loco);
                        }
                        None => eprintln!("no such locomotive: {name}"),
                    },
                    _ => eprintln!("speed must be 0..={max_speed}"),
                }
            }
            _ => eprintln!("usage: speed <name> <speed>"),
        },
        "direction" => match rest.as_slice() {
            [name, dir] => {
                let direction = match *dir {
                    "forward" | "fwd" => Some(Direction::Forward),
                    "backward" | "bwd" => Some(Direction::Backward),
                    _ => None,
                };
                match (direction, controller.get(name)) {
                    (Some(direction), Some(mut loco)) => {
                        loco.set_direction(direction);
                        controller.add(loco);
                    }
                    (None, _) => eprintln!("direction must be forward or backward"),
                    (_, None) => eprintln!("no such locomotive: {name}"),
                }
            }
            _ => eprintln!("usage: direction <name> <forward|backward>"),
        },
        "functions" => match rest.as_slice() {
            [name, fl, f1, f2, f3, f4] => match (
                parse_bool(fl),
                parse_bool(f1),
                parse_bool(f2),
                parse_bool(f3),
                parse_bool(f4),
            ) {
                (Some(fl), Some(f1), Some(f2), Some(f3), Some(f4)) => match controller.get(name) {
                    Some(mut loco) => {
                        loco.set_functions(fl, f1, f2, f3, f4);
                        controller.add(loco);
                    }
                    None => eprintln!("no such locomotive: {name}"),
                },
                _ => eprintln!("function flags must be on/off"),
            },
            _ => eprintln!("usage: functions <name> <fl> <f1> <f2> <f3> <f4> (on/off each)"),
        },
        "estop" => {
            let packet = Packet::broadcast_stop(Some(controller.driver()), Direction::Forward, false, true);
            controller.command(packet);
            println!("emergency stop issued");
        }
        other => eprintln!("unknown command: {other} (type 'help' for a list)"),
    }
    true
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    }
}

fn print_help() {
    println!(
        "commands:\n\
         \u{20}  list\n\
         \u{20}  add <name> <address>\n\
         \u{20}  remove <name>\n\
         \u{20}  speed <name> <speed>  (0-31, or 0-15 in headlight-compat mode)\n\
         \u{20}  direction <name> <forward|backward>\n\
         \u{20}  functions <name> <fl> <f1> <f2> <f3> <f4>  (each on/off)\n\
         \u{20}  estop\n\
         \u{20}  quit"
    );
}
