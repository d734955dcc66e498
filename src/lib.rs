//! DeskFocus - desktop focus helper.
//!
//! Plays short audio cues on a best-effort basis and monitors user
//! activity (keystrokes, mouse movement, foreground window) through a
//! background sampling loop with thread-safe counters.
//!
//! The two halves are loosely coupled: [`audio::CuePlayer`] is a
//! fire-and-forget collaborator that never fails observably, and
//! [`monitor::ActivityMonitor`] owns the sampling lifecycle. Deciding
//! *when* an activity level should trigger a cue is left to the host
//! application.

pub mod audio;
pub mod config;
pub mod monitor;

pub use audio::CuePlayer;
pub use config::MonitorConfig;
pub use monitor::ActivityMonitor;
