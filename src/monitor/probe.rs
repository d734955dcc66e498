//! Activity probes.
//!
//! A probe is one unit of platform-specific activity collection. The
//! sampling loop owns exactly one probe and calls it once per cadence
//! period; real keyboard/mouse/window probes are platform code outside
//! this crate, so the trait is the seam where they plug in and where
//! tests inject fakes.

/// Deltas observed during one sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeSample {
    /// Keystrokes observed since the previous sample.
    pub keystrokes: u64,

    /// Mouse movements observed since the previous sample.
    pub mouse_moves: u64,

    /// Foreground window identifier, if the probe can name one.
    /// `None` leaves the previously reported window in place.
    pub active_window: Option<String>,
}

/// A source of activity signals, driven by the sampling loop.
///
/// `Send + Sync` so a monitor holding a boxed probe can be shared by
/// reference with snapshot readers on other threads.
pub trait ActivityProbe: Send + Sync {
    /// Called exactly once when the sampling loop begins, before the
    /// first sample. Platform probes install hooks here.
    fn begin(&mut self) {}

    /// Collects one unit of activity.
    fn sample(&mut self) -> ProbeSample;
}

/// Probe that observes nothing. Used when no platform probe is wired in.
#[derive(Debug, Default)]
pub struct NullProbe;

impl ActivityProbe for NullProbe {
    fn sample(&mut self) -> ProbeSample {
        ProbeSample::default()
    }
}
