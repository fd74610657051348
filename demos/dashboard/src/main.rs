//! Dashboard - uniflow example
//!
//! Runs a scripted session against the dashboard store:
//! 1. Counter actions are dispatched directly
//! 2. The stopwatch starts a repeating timer effect
//! 3. Timer ticks flow back into the store through its inbox
//! 4. Stopping the stopwatch cancels the timer; no further ticks arrive
//!
//! Every reduced action is logged with the resulting state, either through
//! `tracing` or as JSON lines.
//!
//! # Usage
//!
//! ```sh
//! # Run for 5 seconds with tracing output
//! RUST_LOG=debug cargo run -p dashboard-demo -- --seconds 5
//!
//! # Faster ticks, logging to a file
//! cargo run -p dashboard-demo -- --tick-ms 250 --log-json dashboard.jsonl
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use uniflow::{JsonSink, LogSink, ReducerExt, Store, StoreConfig, TokioClock, TracingSink};

use dashboard_demo::{
    dashboard_reducer, CounterAction, DashboardAction, DashboardState, StopwatchAction,
    StopwatchEnv,
};

/// One day.
const MAX_SECONDS: u64 = 86_400;
/// One hour.
const MAX_TICK_MS: u64 = 3_600_000;

/// Dashboard - uniflow framework example
#[derive(Parser, Debug)]
#[command(name = "dashboard")]
#[command(about = "A counter + stopwatch dashboard demonstrating uniflow patterns")]
struct Args {
    /// How long the stopwatch runs before it is stopped
    #[arg(
        long,
        short,
        default_value = "5",
        value_parser = clap::value_parser!(u64).range(..=MAX_SECONDS)
    )]
    seconds: u64,

    /// Stopwatch tick period in milliseconds
    #[arg(
        long,
        default_value = "1000",
        value_parser = clap::value_parser!(u64).range(1..=MAX_TICK_MS)
    )]
    tick_ms: u64,

    /// Store configuration (JSON)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Write reducer log records as JSON lines to this file
    #[arg(long)]
    log_json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match &args.config {
        Some(path) => StoreConfig::from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => StoreConfig::named("dashboard"),
    };

    let sink: Box<dyn LogSink<DashboardState, DashboardAction>> = match &args.log_json {
        Some(path) => Box::new(
            JsonSink::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?,
        ),
        None => Box::new(TracingSink),
    };

    let env = StopwatchEnv {
        clock: TokioClock::shared(),
        tick: Duration::from_millis(args.tick_ms),
    };
    let reducer = dashboard_reducer(env)
        .logged(config.name.clone(), sink)
        .with_filter(config.log.filter());

    let mut store = Store::with_config(DashboardState::default(), reducer, config);

    store.dispatch(DashboardAction::Counter(CounterAction::Increment))?;
    store.dispatch(DashboardAction::Counter(CounterAction::Increment))?;
    store.dispatch(DashboardAction::Stopwatch(StopwatchAction::StartTapped))?;

    let ticks = store.run_for(Duration::from_secs(args.seconds)).await?;
    tracing::info!(ticks = ticks.len(), "stopwatch running");

    store.dispatch(DashboardAction::Counter(CounterAction::Decrement))?;
    store.dispatch(DashboardAction::Stopwatch(StopwatchAction::StopTapped))?;

    // Anything arriving now would be a tick from the cancelled timer
    let late = store
        .run_for(Duration::from_millis(args.tick_ms.saturating_mul(2)))
        .await?;
    if !late.is_empty() {
        tracing::warn!(count = late.len(), "actions arrived after stop");
    }

    let state = store.snapshot();
    store.teardown();

    tracing::info!(
        count = state.counter.count,
        elapsed = state.stopwatch.elapsed,
        interactions = state.interactions,
        "session finished"
    );
    println!(
        "counter = {}, stopwatch = {} ticks, interactions = {}",
        state.counter.count, state.stopwatch.elapsed, state.interactions
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["dashboard"]).unwrap();
        assert_eq!(args.seconds, 5);
        assert_eq!(args.tick_ms, 1000);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_tick_ms_bounds() {
        assert!(Args::try_parse_from(["dashboard", "--tick-ms", "0"]).is_err());
        assert!(Args::try_parse_from(["dashboard", "--tick-ms", "18446744073709551615"]).is_err());

        let args = Args::try_parse_from(["dashboard", "--tick-ms", "3600000"]).unwrap();
        assert_eq!(args.tick_ms, MAX_TICK_MS);
    }

    #[test]
    fn test_seconds_bounds() {
        assert!(Args::try_parse_from(["dashboard", "--seconds", "86401"]).is_err());
        assert_eq!(Args::try_parse_from(["dashboard", "-s", "0"]).unwrap().seconds, 0);
    }
}
