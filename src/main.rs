//! DeskFocus - desktop focus helper.
//!
//! Running with no arguments starts the activity monitor and logs a
//! status line once a minute; `deskfocus alert [path]` and
//! `deskfocus cheer [path]` play a single cue and exit.

use deskfocus::audio::CuePlayer;
use deskfocus::config::MonitorConfig;
use deskfocus::monitor::ActivityMonitor;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Environment variable overriding the sampling cadence (float seconds).
const POLL_INTERVAL_ENV: &str = "DESK_FOCUS_POLL_INTERVAL";

/// Environment variable overriding the start-acknowledgement timeout.
const START_TIMEOUT_ENV: &str = "DESK_FOCUS_START_TIMEOUT";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("deskfocus=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("alert") => {
            let player = CuePlayer::new();
            match args.next() {
                Some(path) => player.alert_with(path),
                None => player.alert(),
            }
            Ok(())
        }
        Some("cheer") => {
            let player = CuePlayer::new();
            match args.next() {
                Some(path) => player.cheer_with(path),
                None => player.cheer(),
            }
            Ok(())
        }
        Some(other) => {
            eprintln!("Unknown command: {other}");
            eprintln!("Usage: deskfocus [alert [path] | cheer [path]]");
            std::process::exit(2);
        }
        None => run_monitor(),
    }
}

fn run_monitor() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config_from_env()?;
    let mut monitor = ActivityMonitor::new(cfg);

    // Shutdown signal
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        tracing::info!("Shutdown signal received");
        shutdown_ctrlc.store(true, Ordering::SeqCst);
    })?;

    monitor.start();
    tracing::info!("DeskFocus is running; press Ctrl+C to quit");

    // Periodic status display.
    let mut ticks = 0u32;
    while !shutdown.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_secs(1));
        ticks += 1;
        if ticks % 60 == 0 {
            let snap = monitor.snapshot();
            tracing::info!(
                keystrokes = snap.keystrokes,
                mouse_moves = snap.mouse_moves,
                window = snap.active_window.as_deref().unwrap_or("-"),
                "Activity update"
            );
        }
    }

    monitor.stop();

    let summary = monitor.snapshot();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Builds the monitor configuration from `DESK_FOCUS_*` environment
/// variables, failing fast on unparsable values.
fn config_from_env() -> Result<MonitorConfig, Box<dyn std::error::Error>> {
    let mut options = HashMap::new();
    if let Ok(v) = std::env::var(POLL_INTERVAL_ENV) {
        options.insert("poll_interval".to_string(), v);
    }
    if let Ok(v) = std::env::var(START_TIMEOUT_ENV) {
        options.insert("start_timeout".to_string(), v);
    }
    Ok(MonitorConfig::from_options(&options)?)
}
