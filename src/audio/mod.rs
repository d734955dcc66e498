//! Audio cue playback.
//!
//! Best-effort playback of short cues. Any failure (missing file, no
//! audio device, decode error) degrades to a deterministic stub marker
//! `[AUDIO: <path>]` on stdout, so a host application never crashes or
//! blocks because of audio. The marker format is part of the observable
//! surface; log text is not.

pub mod backend;

pub use backend::{PlaybackBackend, PlaybackError, RodioBackend};

use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Environment variable overriding the alert cue path.
pub const ALERT_SOUND_ENV: &str = "DESK_FOCUS_ALERT_SOUND";

/// Environment variable overriding the cheer cue path.
pub const CHEER_SOUND_ENV: &str = "DESK_FOCUS_CHEER_SOUND";

const DEFAULT_ALERT_SOUND: &str = "assets/alert.wav";
const DEFAULT_CHEER_SOUND: &str = "assets/cheer.wav";

/// Plays the alert and cheer cues, falling back to a printed stub when
/// real playback is impossible.
///
/// Cue paths are resolved once at construction: the `DESK_FOCUS_*_SOUND`
/// environment variables win over the built-in `assets/` defaults, and a
/// per-call override wins over both.
pub struct CuePlayer {
    backend: Box<dyn PlaybackBackend>,
    alert_path: PathBuf,
    cheer_path: PathBuf,
    stub_out: Mutex<Box<dyn Write + Send>>,
}

impl CuePlayer {
    /// Creates a player using the default rodio backend.
    pub fn new() -> Self {
        Self::with_backend(Box::new(RodioBackend))
    }

    /// Creates a player with an explicit backend.
    pub fn with_backend(backend: Box<dyn PlaybackBackend>) -> Self {
        Self {
            backend,
            alert_path: path_from_env(ALERT_SOUND_ENV, DEFAULT_ALERT_SOUND),
            cheer_path: path_from_env(CHEER_SOUND_ENV, DEFAULT_CHEER_SOUND),
            stub_out: Mutex::new(Box::new(io::stdout())),
        }
    }

    /// Redirects the fallback marker away from stdout.
    pub fn set_stub_output(&mut self, out: Box<dyn Write + Send>) {
        self.stub_out = Mutex::new(out);
    }

    /// The resolved alert cue path.
    pub fn alert_path(&self) -> &Path {
        &self.alert_path
    }

    /// The resolved cheer cue path.
    pub fn cheer_path(&self) -> &Path {
        &self.cheer_path
    }

    /// Attempts to play `path`, never failing observably.
    ///
    /// Either the backend plays the cue, or exactly one fallback marker
    /// `[AUDIO: <path>]` is written to the stub output. Never both,
    /// never neither.
    pub fn play_cue(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        match self.try_play(path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Played cue");
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Cue playback failed, falling back to stub"
                );
                self.print_stub(path);
            }
        }
    }

    /// Plays the configured alert cue.
    pub fn alert(&self) {
        self.play_cue(&self.alert_path);
    }

    /// Plays the alert cue from an explicit path, ignoring the configured default.
    pub fn alert_with(&self, path: impl AsRef<Path>) {
        self.play_cue(path);
    }

    /// Plays the configured cheer cue.
    pub fn cheer(&self) {
        self.play_cue(&self.cheer_path);
    }

    /// Plays the cheer cue from an explicit path, ignoring the configured default.
    pub fn cheer_with(&self, path: impl AsRef<Path>) {
        self.play_cue(path);
    }

    /// Validates the path and hands it to the backend.
    fn try_play(&self, path: &Path) -> Result<(), PlaybackError> {
        if path.as_os_str().is_empty() {
            return Err(PlaybackError::EmptyPath);
        }
        if !path.is_file() {
            return Err(PlaybackError::FileMissing(path.to_path_buf()));
        }
        self.backend.play(path)
    }

    /// Writes the deterministic fallback marker.
    fn print_stub(&self, path: &Path) {
        let mut out = self
            .stub_out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // Marker format is load-bearing for tests and operators.
        let _ = writeln!(out, "[AUDIO: {}]", path.display());
        let _ = out.flush();
    }
}

impl Default for CuePlayer {
    fn default() -> Self {
        Self::new()
    }
}

fn path_from_env(var: &str, default: &str) -> PathBuf {
    env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}
