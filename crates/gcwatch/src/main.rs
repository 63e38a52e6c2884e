//! gcwatch - GC telemetry inspector.
//!
//! Runs the snapshot aggregator and the GC profilers against a simulated
//! managed runtime. `stat` prints one statistics tree, `profile` arms a
//! profiler around a synthetic workload, `watch` snapshots periodically
//! until interrupted.

mod render;

use std::collections::BTreeMap;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::EnvFilter;

use gcwatch_core::error::exit_code;
use gcwatch_core::profiler::{GcEvent, report};
use gcwatch_core::telemetry::{MemoryUsage, MockRuntime, TelemetryProvider};
use gcwatch_core::{
    Aggregator, CapabilityDetector, GcProfiler, Profiler, ProfilerKind, ReportConfig,
};

/// GC telemetry inspector.
#[derive(Parser)]
#[command(name = "gcwatch", about = "GC telemetry inspector", version)]
struct Cli {
    /// Simulated runtime layout.
    #[arg(long, value_enum, default_value_t = Scenario::Generational, global = true)]
    scenario: Scenario,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print one statistics snapshot.
    Stat {
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Profile GC activity around a synthetic workload.
    Profile {
        /// Profiler strategy; `auto` probes the runtime.
        #[arg(long, value_enum, default_value_t = Strategy::Auto)]
        strategy: Strategy,

        /// Collections per worker thread.
        #[arg(long, default_value = "30")]
        cycles: u64,

        /// Worker threads driving collections concurrently.
        #[arg(long, default_value = "2")]
        threads: usize,

        /// Rows between repeated report headers (0 disables headers).
        #[arg(long, default_value = "20")]
        header_interval: usize,

        /// Emit JSON instead of the text report.
        #[arg(long)]
        json: bool,
    },
    /// Take a snapshot every interval and log counter growth.
    Watch {
        /// Interval between snapshots in seconds.
        #[arg(short, long, default_value = "1")]
        interval: u64,

        /// Stop after this many snapshots (0 runs until Ctrl-C).
        #[arg(long, default_value = "0")]
        count: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Scenario {
    Generational,
    NoNotifications,
    BrokenProbe,
    Single,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Strategy {
    Auto,
    Event,
    Polling,
}

impl Scenario {
    fn runtime(self) -> MockRuntime {
        match self {
            Scenario::Generational => MockRuntime::typical_generational(),
            Scenario::NoNotifications => MockRuntime::without_notifications(),
            Scenario::BrokenProbe => MockRuntime::broken_probe(),
            Scenario::Single => MockRuntime::single_young_eden(),
        }
    }
}

#[derive(Serialize)]
struct ProfileOutput {
    strategy: ProfilerKind,
    total_time_secs: f64,
    /// Buffered events per collector; absent for the polling strategy.
    collections: Option<BTreeMap<String, usize>>,
    events: Option<Vec<GcEvent>>,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) -> anyhow::Result<()> {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("gcwatch={}", level).parse()?)
        .add_directive(format!("gcwatch_core={}", level).parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS as u8),
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(err) = e.downcast_ref::<gcwatch_core::Error>() {
                ExitCode::from(err.exit_code() as u8)
            } else {
                ExitCode::from(exit_code::GENERAL_ERROR as u8)
            }
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet)?;

    let runtime = cli.scenario.runtime();
    debug!("Runtime: {:?}", runtime);

    match cli.command {
        Command::Stat { json } => run_stat(runtime, json),
        Command::Profile {
            strategy,
            cycles,
            threads,
            header_interval,
            json,
        } => {
            let config = ReportConfig { header_interval };
            run_profile(runtime, strategy, cycles, threads, config, json)
        }
        Command::Watch { interval, count } => run_watch(runtime, interval, count),
    }
}

fn run_stat(runtime: MockRuntime, json: bool) -> anyhow::Result<()> {
    let tree = Aggregator::new(runtime).snapshot();
    if json {
        let text = serde_json::to_string_pretty(&tree).context("Failed to serialize snapshot")?;
        println!("{}", text);
    } else {
        println!("{}", render::render_tree(&tree));
    }
    Ok(())
}

fn run_profile(
    runtime: MockRuntime,
    strategy: Strategy,
    cycles: u64,
    threads: usize,
    config: ReportConfig,
    json: bool,
) -> anyhow::Result<()> {
    let mut profiler = match strategy {
        Strategy::Auto => {
            let detector = CapabilityDetector::new();
            GcProfiler::detect(&detector, runtime.clone(), config)
                .context("Failed to select GC profiler")?
        }
        Strategy::Event => GcProfiler::new(ProfilerKind::EventDriven, runtime.clone(), config),
        Strategy::Polling => GcProfiler::new(ProfilerKind::Polling, runtime.clone(), config),
    };

    profiler.enable().context("Failed to enable GC profiler")?;
    info!(
        "Running workload: {} threads x {} collections",
        threads, cycles
    );
    run_workload(&runtime, cycles, threads);

    let total = profiler.total_time();
    if json {
        let events = profiler.events();
        let output = ProfileOutput {
            strategy: profiler.kind(),
            total_time_secs: total,
            collections: events.as_deref().map(report::counts_by_collector),
            events,
        };
        let text =
            serde_json::to_string_pretty(&output).context("Failed to serialize profile")?;
        println!("{}", text);
    } else {
        let mut stdout = std::io::stdout().lock();
        profiler
            .report(&mut stdout)
            .context("Failed to write report")?;
        if profiler.result().is_none() {
            info!("Per-collection detail unavailable ({} profiler)", profiler.kind());
        }
        println!("GC time: {}", gcwatch_core::fmt::format_secs(total));
    }

    profiler.disable();
    Ok(())
}

/// Drives collections from several threads, alternating young and old
/// collectors the way a generational runtime would.
fn run_workload(runtime: &MockRuntime, cycles: u64, threads: usize) {
    let collectors: Vec<_> = runtime
        .list_collectors()
        .into_iter()
        .map(|c| (c.name, c.pool_names))
        .collect();
    if collectors.is_empty() {
        warn!("Runtime has no collectors, nothing to run");
        return;
    }

    std::thread::scope(|s| {
        for t in 0..threads {
            let collectors = &collectors;
            s.spawn(move || {
                for i in 0..cycles {
                    // Every eighth cycle runs the last (oldest) collector.
                    let idx = if i % 8 == 7 { collectors.len() - 1 } else { 0 };
                    let (name, pools) = &collectors[idx];
                    let used = ((t as i64) + 1) * 64 * 1024;
                    let after: Vec<(&str, MemoryUsage)> = pools
                        .iter()
                        .map(|p| (p.as_str(), MemoryUsage::with_used(used)))
                        .collect();
                    let duration = Duration::from_micros(500 + (i % 5) * 750);
                    if let Err(e) = runtime.record_collection(name, duration, &after) {
                        warn!("Simulated collection failed: {}", e);
                    }
                }
            });
        }
    });
}

fn run_watch(runtime: MockRuntime, interval: u64, count: u64) -> anyhow::Result<()> {
    let aggregator = Aggregator::new(runtime.clone());
    let interval = Duration::from_secs(interval.max(1));

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let mut previous = aggregator.snapshot();
    let mut taken: u64 = 1;
    info!(
        "Watching {} collectors every {:?}",
        previous.collectors.len(),
        interval
    );

    while running.load(Ordering::SeqCst) && (count == 0 || taken < count) {
        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
        if !running.load(Ordering::SeqCst) {
            break;
        }

        // Keep the simulated runtime busy between snapshots.
        run_workload(&runtime, 4, 1);

        let current = aggregator.snapshot();
        taken += 1;
        println!(
            "[{}] {}",
            Local::now().format("%H:%M:%S"),
            render::describe_delta(&current.delta(&previous))
        );
        previous = current;
    }

    info!("Watch stopped after {} snapshots", taken);
    Ok(())
}
