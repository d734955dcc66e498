//! Activity monitoring.
//!
//! [`ActivityMonitor`] owns a background sampling loop that drives an
//! [`ActivityProbe`](probe::ActivityProbe) once per cadence period and
//! accumulates keystroke/mouse-move counters behind a single lock. The
//! lifecycle is `created -> starting -> running -> stopping -> stopped`
//! with idempotent `start()`/`stop()`; a stopped monitor is terminal and
//! cannot be restarted.

pub mod probe;

pub use probe::{ActivityProbe, NullProbe, ProbeSample};

use crate::config::MonitorConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Extra time `stop()` waits beyond one cadence period before giving up
/// on the loop and detaching it.
const STOP_GRACE: Duration = Duration::from_secs(1);

/// Lifecycle phase of the monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Phase {
    #[default]
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Counters and control flags owned by one monitor instance.
///
/// The sampling loop is the only writer; every other thread reads
/// through the same lock.
#[derive(Debug, Default)]
struct MonitorState {
    keystroke_count: u64,
    mouse_move_count: u64,
    active_window: Option<String>,
    phase: Phase,
    started_at: Option<DateTime<Utc>>,
    last_sample: Option<DateTime<Utc>>,
}

/// Point-in-time view of the monitor's counters.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Keystrokes observed since construction.
    pub keystrokes: u64,

    /// Mouse movements observed since construction.
    pub mouse_moves: u64,

    /// Last foreground window reported by the probe, if any.
    pub active_window: Option<String>,

    /// Whether the sampling loop has signaled start and not yet exited.
    pub running: bool,

    /// When the sampling loop acknowledged start.
    pub started_at: Option<DateTime<Utc>>,

    /// When the loop last collected a sample.
    pub last_sample: Option<DateTime<Utc>>,
}

/// One-shot event, the analog of a `threading.Event` acknowledgement.
#[derive(Default)]
struct Signal {
    fired: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    fn set(&self) {
        *lock(&self.fired) = true;
        self.cond.notify_all();
    }

    fn is_set(&self) -> bool {
        *lock(&self.fired)
    }

    /// Waits until the signal fires or `timeout` elapses.
    /// Returns `true` if the signal fired.
    fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut fired = lock(&self.fired);
        while !*fired {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .cond
                .wait_timeout(fired, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            fired = guard;
        }
        true
    }
}

/// Locks a mutex, recovering the guard if a panicking thread poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Monitors desktop activity on a background thread.
///
/// An external scheduler constructs the monitor, calls [`start`](Self::start),
/// reads [`snapshot`](Self::snapshot) while it runs, and calls
/// [`stop`](Self::stop) at shutdown.
pub struct ActivityMonitor {
    cfg: MonitorConfig,
    state: Arc<Mutex<MonitorState>>,
    stop: Arc<Signal>,
    started: Arc<Signal>,
    stopped: Arc<Signal>,
    /// Taken by the sampling loop at start.
    probe: Option<Box<dyn ActivityProbe>>,
    handle: Option<JoinHandle<()>>,
}

impl ActivityMonitor {
    /// Creates a monitor with no platform probe wired in.
    pub fn new(cfg: MonitorConfig) -> Self {
        Self::with_probe(cfg, Box::new(NullProbe))
    }

    /// Creates a monitor that samples activity through `probe`.
    pub fn with_probe(cfg: MonitorConfig, probe: Box<dyn ActivityProbe>) -> Self {
        tracing::info!(
            poll_interval_ms = cfg.poll_interval.as_millis() as u64,
            start_timeout_ms = cfg.start_timeout.as_millis() as u64,
            "ActivityMonitor created"
        );
        Self {
            cfg,
            state: Arc::new(Mutex::new(MonitorState::default())),
            stop: Arc::new(Signal::default()),
            started: Arc::new(Signal::default()),
            stopped: Arc::new(Signal::default()),
            probe: Some(probe),
            handle: None,
        }
    }

    /// The configuration this monitor was built with.
    pub fn config(&self) -> &MonitorConfig {
        &self.cfg
    }

    /// Launches the sampling loop on a background thread.
    ///
    /// Blocks until the loop acknowledges start or `start_timeout`
    /// elapses. A timeout is logged as an error, not raised; the loop
    /// keeps running and will still signal started. Calling `start()`
    /// on an already started or stopped monitor is a logged no-op.
    pub fn start(&mut self) {
        {
            let mut state = lock(&self.state);
            match state.phase {
                Phase::Created => state.phase = Phase::Starting,
                Phase::Stopped => {
                    tracing::warn!(
                        "start() called on a stopped monitor; create a new instance instead"
                    );
                    return;
                }
                _ => {
                    tracing::warn!("start() called on a monitor that is already running; ignored");
                    return;
                }
            }
        }

        let worker = Worker {
            state: Arc::clone(&self.state),
            stop: Arc::clone(&self.stop),
            started: Arc::clone(&self.started),
            stopped: Arc::clone(&self.stopped),
            probe: self.probe.take().unwrap_or_else(|| Box::new(NullProbe)),
            poll_interval: self.cfg.poll_interval,
        };

        let spawned = thread::Builder::new()
            .name("activity-monitor".into())
            .spawn(move || worker.run());
        match spawned {
            Ok(handle) => self.handle = Some(handle),
            Err(e) => {
                tracing::error!(error = %e, "Failed to spawn sampling thread");
                lock(&self.state).phase = Phase::Stopped;
                return;
            }
        }

        if self.started.wait_timeout(self.cfg.start_timeout) {
            tracing::info!("ActivityMonitor running");
        } else {
            tracing::error!(
                timeout_ms = self.cfg.start_timeout.as_millis() as u64,
                "Sampling loop did not acknowledge start within timeout; state unconfirmed"
            );
        }
    }

    /// Signals the sampling loop to exit and waits for it.
    ///
    /// The loop observes the stop signal within one cadence period, so
    /// the wait is bounded by `poll_interval` plus a fixed grace. If
    /// the loop still has not exited by then the thread is detached and
    /// an error logged. Calling `stop()` before `start()` or after a
    /// previous `stop()` is a no-op. Terminal: the monitor cannot be
    /// restarted afterwards.
    pub fn stop(&mut self) {
        {
            let mut state = lock(&self.state);
            match state.phase {
                Phase::Created => {
                    tracing::debug!("stop() called before start(); nothing to do");
                    return;
                }
                Phase::Stopped => {
                    tracing::debug!("stop() called on an already stopped monitor");
                    return;
                }
                Phase::Starting | Phase::Running => state.phase = Phase::Stopping,
                Phase::Stopping => {}
            }
        }

        self.stop.set();

        let wait = self.cfg.poll_interval + STOP_GRACE;
        if self.stopped.wait_timeout(wait) {
            if let Some(handle) = self.handle.take() {
                if handle.join().is_err() {
                    tracing::error!("Sampling thread panicked");
                }
            }
            tracing::info!("ActivityMonitor stopped");
        } else {
            // Leave the thread detached; it exits at its next stop check.
            self.handle.take();
            tracing::error!(
                waited_ms = wait.as_millis() as u64,
                "Sampling loop did not exit within the stop wait; detaching"
            );
        }

        lock(&self.state).phase = Phase::Stopped;
    }

    /// Thread-safe read of the current counters and lifecycle state.
    pub fn snapshot(&self) -> Snapshot {
        let state = lock(&self.state);
        Snapshot {
            keystrokes: state.keystroke_count,
            mouse_moves: state.mouse_move_count,
            active_window: state.active_window.clone(),
            // Derived from the loop's own acknowledgements, not the
            // phase: a stop request that races in before the loop has
            // signaled started must not read as running.
            running: self.started.is_set() && !self.stopped.is_set(),
            started_at: state.started_at,
            last_sample: state.last_sample,
        }
    }
}

impl Drop for ActivityMonitor {
    fn drop(&mut self) {
        // Best effort: an abandoned monitor's loop winds down on its own.
        self.stop.set();
    }
}

/// State moved onto the sampling thread.
struct Worker {
    state: Arc<Mutex<MonitorState>>,
    stop: Arc<Signal>,
    started: Arc<Signal>,
    stopped: Arc<Signal>,
    probe: Box<dyn ActivityProbe>,
    poll_interval: Duration,
}

impl Worker {
    /// The sampling loop. Sole writer of the counters.
    fn run(mut self) {
        self.probe.begin();
        {
            let mut state = lock(&self.state);
            // A stop request may already have raced in; don't mask it.
            if state.phase == Phase::Starting {
                state.phase = Phase::Running;
            }
            state.started_at = Some(Utc::now());
        }
        self.started.set();
        tracing::debug!("Sampling loop started");

        while !self.stop.is_set() {
            {
                let mut state = lock(&self.state);
                let sample = self.probe.sample();
                state.keystroke_count += sample.keystrokes;
                state.mouse_move_count += sample.mouse_moves;
                if let Some(window) = sample.active_window {
                    state.active_window = Some(window);
                }
                state.last_sample = Some(Utc::now());
            }

            // Waiting on the stop signal instead of a plain sleep keeps
            // worst-case stop latency at one cadence period.
            if self.stop.wait_timeout(self.poll_interval) {
                break;
            }
        }

        lock(&self.state).phase = Phase::Stopped;
        self.stopped.set();
        tracing::debug!("Sampling loop exiting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Probe reporting fixed deltas each sample, with begin-call counting.
    struct CountingProbe {
        begins: Arc<AtomicUsize>,
        window: Option<String>,
        begin_delay: Duration,
    }

    impl CountingProbe {
        fn new(begins: Arc<AtomicUsize>) -> Self {
            Self {
                begins,
                window: Some("editor".to_string()),
                begin_delay: Duration::ZERO,
            }
        }
    }

    impl ActivityProbe for CountingProbe {
        fn begin(&mut self) {
            if !self.begin_delay.is_zero() {
                thread::sleep(self.begin_delay);
            }
            self.begins.fetch_add(1, Ordering::SeqCst);
        }

        fn sample(&mut self) -> ProbeSample {
            ProbeSample {
                keystrokes: 1,
                mouse_moves: 2,
                active_window: self.window.clone(),
            }
        }
    }

    fn fast_config() -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_millis(5),
            start_timeout: Duration::from_secs(5),
            ..MonitorConfig::default()
        }
    }

    /// Polls `snapshot()` until `pred` holds or a deadline passes.
    fn wait_for(monitor: &ActivityMonitor, pred: impl Fn(&Snapshot) -> bool) -> Snapshot {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let snap = monitor.snapshot();
            if pred(&snap) || Instant::now() >= deadline {
                return snap;
            }
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_fresh_monitor_snapshot_is_zeroed() {
        let monitor = ActivityMonitor::new(MonitorConfig::default());
        let snap = monitor.snapshot();
        assert_eq!(snap.keystrokes, 0);
        assert_eq!(snap.mouse_moves, 0);
        assert_eq!(snap.active_window, None);
        assert!(!snap.running);
        assert!(snap.started_at.is_none());
    }

    #[test]
    fn test_loop_accumulates_probe_deltas() {
        let begins = Arc::new(AtomicUsize::new(0));
        let mut monitor = ActivityMonitor::with_probe(
            fast_config(),
            Box::new(CountingProbe::new(Arc::clone(&begins))),
        );

        monitor.start();
        let snap = wait_for(&monitor, |s| s.keystrokes >= 3);
        monitor.stop();

        assert!(snap.running);
        assert!(snap.keystrokes >= 3);
        // Each sample adds twice as many mouse moves as keystrokes.
        assert!(snap.mouse_moves >= snap.keystrokes);
        assert_eq!(snap.active_window.as_deref(), Some("editor"));
        assert!(snap.last_sample.is_some());
    }

    #[test]
    fn test_counters_are_monotonic_while_running() {
        let begins = Arc::new(AtomicUsize::new(0));
        let mut monitor = ActivityMonitor::with_probe(
            fast_config(),
            Box::new(CountingProbe::new(Arc::clone(&begins))),
        );

        monitor.start();
        let first = wait_for(&monitor, |s| s.keystrokes >= 1);
        let second = wait_for(&monitor, |s| s.keystrokes > first.keystrokes);
        monitor.stop();

        assert!(second.keystrokes >= first.keystrokes);
        assert!(second.mouse_moves >= first.mouse_moves);
    }

    #[test]
    fn test_start_is_idempotent() {
        let begins = Arc::new(AtomicUsize::new(0));
        let mut monitor = ActivityMonitor::with_probe(
            fast_config(),
            Box::new(CountingProbe::new(Arc::clone(&begins))),
        );

        monitor.start();
        monitor.start();
        wait_for(&monitor, |s| s.running);
        monitor.stop();

        // Exactly one sampling loop ever began.
        assert_eq!(begins.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_before_start_is_a_noop() {
        let mut monitor = ActivityMonitor::new(MonitorConfig::default());
        monitor.stop();
        assert!(!monitor.snapshot().running);
    }

    #[test]
    fn test_stopped_monitor_cannot_be_restarted() {
        let begins = Arc::new(AtomicUsize::new(0));
        let mut monitor = ActivityMonitor::with_probe(
            fast_config(),
            Box::new(CountingProbe::new(Arc::clone(&begins))),
        );

        monitor.start();
        wait_for(&monitor, |s| s.running);
        monitor.stop();
        assert!(!monitor.snapshot().running);

        monitor.start();
        monitor.stop();

        assert!(!monitor.snapshot().running);
        assert_eq!(begins.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_returns_within_bounded_margin() {
        let mut cfg = fast_config();
        cfg.poll_interval = Duration::from_millis(10);
        let mut monitor = ActivityMonitor::new(cfg);

        monitor.start();
        thread::sleep(Duration::from_millis(50));

        let begun = Instant::now();
        monitor.stop();
        let elapsed = begun.elapsed();

        assert!(!monitor.snapshot().running);
        assert!(elapsed < Duration::from_millis(500), "stop took {elapsed:?}");
    }

    #[test]
    fn test_start_timeout_logs_but_loop_still_starts() {
        let begins = Arc::new(AtomicUsize::new(0));
        let mut probe = CountingProbe::new(Arc::clone(&begins));
        probe.begin_delay = Duration::from_millis(50);

        let mut cfg = fast_config();
        cfg.start_timeout = Duration::ZERO;
        let mut monitor = ActivityMonitor::with_probe(cfg, Box::new(probe));

        // Returns immediately despite the slow-starting loop.
        let begun = Instant::now();
        monitor.start();
        assert!(begun.elapsed() < Duration::from_millis(40));

        // The loop still eventually signals started.
        let snap = wait_for(&monitor, |s| s.running);
        assert!(snap.running);
        assert_eq!(begins.load(Ordering::SeqCst), 1);

        monitor.stop();
    }

    #[test]
    fn test_monitor_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ActivityMonitor>();
    }

    #[test]
    fn test_running_is_false_until_loop_signals_started() {
        let begins = Arc::new(AtomicUsize::new(0));
        let mut probe = CountingProbe::new(Arc::clone(&begins));
        probe.begin_delay = Duration::from_millis(100);

        let mut cfg = fast_config();
        cfg.start_timeout = Duration::ZERO;
        let mut monitor = ActivityMonitor::with_probe(cfg, Box::new(probe));
        monitor.start();

        // A stop request can race in before the loop acknowledges
        // start; until the loop signals started the monitor must not
        // read as running, whatever the lifecycle phase says.
        lock(&monitor.state).phase = Phase::Stopping;
        assert!(!monitor.started.is_set());
        assert!(!monitor.snapshot().running);

        let snap = wait_for(&monitor, |s| s.running);
        assert!(snap.running);
        monitor.stop();
        assert!(!monitor.snapshot().running);
    }

    #[test]
    fn test_snapshot_readable_from_other_threads() {
        let begins = Arc::new(AtomicUsize::new(0));
        let mut monitor = ActivityMonitor::with_probe(
            fast_config(),
            Box::new(CountingProbe::new(Arc::clone(&begins))),
        );
        monitor.start();
        wait_for(&monitor, |s| s.keystrokes >= 1);

        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..20 {
                        let snap = monitor.snapshot();
                        assert!(snap.mouse_moves >= snap.keystrokes);
                    }
                });
            }
        });

        monitor.stop();
    }

    #[test]
    fn test_signal_wait_timeout() {
        let signal = Arc::new(Signal::default());
        assert!(!signal.wait_timeout(Duration::from_millis(5)));

        let remote = Arc::clone(&signal);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            remote.set();
        });

        assert!(signal.wait_timeout(Duration::from_secs(2)));
        assert!(signal.is_set());
        handle.join().unwrap();
    }
}
