//! Sequencer Demo
//!
//! Emits a handful of events whose handlers sleep for different durations,
//! one of which fails, then prints the emission and completion orders.
//!
//! ```text
//! emit:      fetch ──▶ parse ──▶ store ──▶ notify
//! complete:  parse ──▶ notify ──▶ fetch ──▶ store   (by latency)
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package sequencer-demo -- --fail store --json
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::time::sleep;
use tracing::{error, info, warn};
use warden::prelude::*;

#[derive(Debug, Parser)]
#[command(about = "Run an event table through a Warden sequencer")]
struct Args {
    /// Configuration file (defaults to warden.toml in the current directory).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Event whose handler should fail.
    #[arg(long, default_value = "store")]
    fail: String,

    /// Reject unknown event names.
    #[arg(long)]
    strict: bool,

    /// Print the final report as JSON.
    #[arg(long)]
    json: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Sleeps for `ms` milliseconds, failing if `fail` is set.
async fn step(name: String, ms: u64, fail: bool) -> Result<(), BoxError> {
    sleep(Duration::from_millis(ms)).await;
    if fail {
        return Err(format!("{name} gave up after {ms}ms").into());
    }
    info!(event = %name, ms, "Step finished");
    Ok(())
}

fn build_table(fail: &str) -> HandlerTable {
    [("fetch", 60), ("parse", 10), ("store", 80), ("notify", 30)]
        .into_iter()
        .fold(HandlerTable::new(), |table, (name, ms)| {
            let failing = name == fail;
            table.on(name, move || step(name.to_string(), ms, failing))
        })
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = WardenRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if args.strict {
        let mut overrides = WardenConfig::default();
        overrides.sequencer.strict = true;
        builder = builder.merge(overrides);
    }
    let runtime = builder.build()?;

    let domain = runtime.create_domain("demo");
    domain.on_error(|err| error!(origin = %err.origin(), "{err}"));

    let sequencer = runtime.sequencer(&domain, build_table(&args.fail))?;
    sequencer.emit_events(["fetch", "parse"])?;
    sequencer.emit_events(["store", "notify"])?;
    if let Err(e) = sequencer.emit_events(["archive"]) {
        warn!(error = %e, "Skipped unknown event");
    }

    let report = sequencer.wait_for_completion().await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("emitted:   {}", report.emission_order.join(" -> "));
        println!("completed: {}", report.completion_order.join(" -> "));
    }

    info!(stats = %runtime.stats(), "Demo finished");
    Ok(())
}
