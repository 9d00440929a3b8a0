//! Zube mailbox testbench binary.
//!
//! Runs one reference scenario headless and exits non-zero on the first
//! failure. Log verbosity follows `RUST_LOG`.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use log::{error, info};
use serde_json::{Map, json};
use sim_core::{Observable, Value};
use zube_testbench::{Scenario, TbConfig, TbResult, Testbench};

#[derive(Parser)]
#[command(name = "zube-testbench", version, about = "Z80 mailbox handshake testbench")]
struct Cli {
    /// JSON configuration file; defaults are used when omitted.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a scenario: startup, ping, reset-contents or silent.
    Run {
        scenario: Scenario,

        /// Round trips for the ping scenarios.
        #[arg(long, default_value_t = 10)]
        count: u8,

        /// Print the peripheral's state as JSON afterwards.
        #[arg(long)]
        dump: bool,
    },
    /// Print the effective configuration as JSON.
    PrintConfig,
}

fn load_config(path: Option<&PathBuf>) -> TbResult<TbConfig> {
    let config = match path {
        Some(path) => TbConfig::from_file(path)?,
        None => TbConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn dump(tb: &Testbench) -> serde_json::Value {
    let mailbox = tb.mailbox();
    let mut state = Map::new();
    for &path in mailbox.query_paths() {
        let value = match mailbox.query(path) {
            Some(Value::Bool(v)) => json!(v),
            Some(Value::U8(v)) => json!(format!("{v:#04X}")),
            Some(Value::U64(v)) => json!(v),
            Some(Value::String(v)) => json!(v),
            None => continue,
        };
        state.insert(path.to_string(), value);
    }
    json!({
        "cycles": tb.cycle().get(),
        "elapsed_ns": tb.elapsed_ns(),
        "firmware": tb.firmware().name(),
        "mailbox": state,
        "strobe_overlaps": tb.monitor().overlaps().len(),
    })
}

fn run(cli: &Cli) -> TbResult<()> {
    let config = load_config(cli.config.as_ref())?;
    match cli.command {
        Command::Run {
            scenario,
            count,
            dump: want_dump,
        } => {
            let mut tb = scenario.testbench(config)?;
            let outcome = scenario.run_on(&mut tb, count);
            if want_dump {
                println!("{:#}", dump(&tb));
            }
            let report = outcome?;
            for (i, ex) in report.exchanges.iter().enumerate() {
                info!(
                    "round trip {}: response {:#04X}, status {:#04X}, {} polls",
                    i + 1,
                    ex.response,
                    ex.status,
                    ex.polls
                );
            }
            println!(
                "{}: PASS ({} round trips, {} cycles, {} ns)",
                report.scenario,
                report.exchanges.len(),
                report.cycles,
                report.elapsed_ns
            );
        }
        Command::PrintConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        error!("{e}");
        eprintln!("FAIL: {e}");
        process::exit(1);
    }
}
