//! Hazard Console - replay a scenario and print the console table.

use anyhow::{Context, Result};
use clap::Parser;
use hazard_console::data::TimeRange;
use hazard_console::scenario::{Scenario, ScenarioReplay};
use hazard_console::ui;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "hazard-console")]
#[command(about = "Replay hazard event changes and print the console table", long_about = None)]
struct Args {
    /// Path to the JSON scenario file
    scenario: PathBuf,

    /// Show persisted versions as child rows
    #[arg(long)]
    show_history: bool,

    /// Print the view operations caused by each step
    #[arg(long)]
    trace_view: bool,

    /// Enable logging to specified file
    #[arg(long)]
    log: Option<PathBuf>,

    /// Log at debug level instead of info
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging if --log option is provided
    if let Some(log_path) = &args.log {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_path)
            .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
        let level = if args.verbose { Level::DEBUG } else { Level::INFO };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.as_str()));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(log_file))
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
        tracing::info!("Starting Hazard Console");
    }

    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("Failed to load scenario {}", args.scenario.display()))?;
    let show_history = if args.show_history { Some(true) } else { None };
    let mut replay = ScenarioReplay::new(&scenario, show_history)?;

    if args.trace_view {
        println!("initial: {} rows", replay.row_identifiers().len());
    }
    for (number, step) in scenario.steps.iter().enumerate() {
        let operations = replay
            .run_step(step)
            .with_context(|| format!("Step {} ({}) failed", number + 1, step.name()))?;
        if args.trace_view {
            println!("step {} ({}):", number + 1, step.name());
            for operation in &operations {
                println!("  {}", operation);
            }
        }
    }
    if args.trace_view {
        println!();
    }

    if let Some(TimeRange { start, end }) = replay.visible_time_range() {
        println!(
            "Visible: {} to {}",
            ui::format_date(start),
            ui::format_date(end)
        );
    }
    let manager = replay.manager();
    print!(
        "{}",
        ui::render_table(
            manager.root_entities(),
            manager.columns(),
            manager.countdown_timers(),
            replay.now(),
        )
    );

    if args.log.is_some() {
        tracing::info!("Hazard Console exited");
    }

    Ok(())
}
