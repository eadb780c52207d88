// LOADSLOT v1.0.0 -- CPU LOAD ADMISSION CONTROL
// SMOOTHED SYSTEM LOAD IN, "HOW MANY MORE JOBS MAY START" OUT
//
// THE ESTIMATOR LIVES IN THE LIBRARY (ZERO OS DEPENDENCIES IN THE MATH).
// THIS BINARY HANDLES: CONFIGURATION, THE POLLING LOOP, REPORTING.

mod cli;
mod monitor;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use loadslot::event::EventLog;
use loadslot::{source, EstimatorConfig, LoadEstimator, DEFAULT_TIME_CONSTANT};

use cli::check::run_check;
use cli::probe::run_probe;
use monitor::MonitorSettings;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

#[derive(Parser)]
#[command(name = "loadslot")]
#[command(about = "LOADSLOT -- CPU LOAD ESTIMATE TO ADMISSION SLOTS")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    // SMOOTHING TIME CONSTANT IN SECONDS (ALSO MIN GAP BETWEEN ADJUSTMENTS)
    #[arg(long, default_value_t = DEFAULT_TIME_CONSTANT)]
    time_constant: f64,

    // TARGET BUSY CORES AND SLOT CEILING (DEFAULT: LOGICAL CPU COUNT)
    #[arg(long)]
    threshold: Option<f64>,

    // POLL INTERVAL IN MILLISECONDS (DEFAULT: TIME CONSTANT / 3)
    #[arg(long)]
    interval_ms: Option<u64>,

    // STOP AFTER N POLLS (DEFAULT: RUN UNTIL CTRL+C)
    #[arg(long)]
    ticks: Option<u64>,

    // PRINT VERBOSE OUTPUT
    #[arg(long)]
    verbose: bool,

    // DUMP FULL EVENT LOG ON EXIT
    #[arg(long)]
    dump_log: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Verify the platform CPU counter source
    Check,
    /// Print raw counter samples at a fixed cadence
    Probe {
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Check) => return run_check(),
        Some(Command::Probe { interval_ms }) => {
            return run_probe(Duration::from_millis(interval_ms));
        }
        None => {}
    }

    ctrlc::set_handler(move || {
        SHUTDOWN.store(true, Ordering::Relaxed);
    })?;

    let config = EstimatorConfig::with_time_constant(cli.time_constant);
    config.validate()?;

    let interval = match cli.interval_ms {
        Some(0) => bail!("--interval-ms must be at least 1"),
        Some(ms) => Duration::from_millis(ms),
        None => config.poll_interval(),
    };

    let mut estimator = LoadEstimator::new(config, source::platform_source()?)?;
    let threshold = cli
        .threshold
        .unwrap_or(estimator.core_count() as f64);

    println!("LOADSLOT v1.0.0");
    println!("CPUS:            {}", estimator.core_count());
    println!("TIME CONSTANT:   {} s", estimator.time_constant());
    println!("THRESHOLD:       {}{}", threshold,
             if cli.threshold.is_none() { " (auto: cpu count)" } else { "" });
    println!("INTERVAL:        {} ms", interval.as_millis());
    println!("VERBOSE:         {}", cli.verbose);
    println!();
    println!("LOADSLOT IS ACTIVE (CTRL+C TO EXIT)");

    let settings = MonitorSettings {
        threshold,
        interval,
        max_ticks: cli.ticks,
        verbose: cli.verbose,
    };
    let mut log = EventLog::new();
    monitor::monitor_loop(&mut estimator, &settings, &mut log, &SHUTDOWN);

    if cli.dump_log {
        log.dump();
    }
    log.summary();

    println!("LOADSLOT OUT.");
    Ok(())
}
