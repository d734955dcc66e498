//! Playback backends.
//!
//! The cue player talks to audio hardware through the [`PlaybackBackend`]
//! trait so that tests can substitute a fake and headless machines can
//! fail gracefully into the stub marker.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rodio::{Decoder, OutputStream, Sink};
use thiserror::Error;

/// Errors from a single playback attempt.
///
/// These never escape the cue player; they are funnelled into the
/// fallback marker and a warning log.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The cue path was empty.
    #[error("cue path is empty")]
    EmptyPath,

    /// The cue file does not exist or is not a regular file.
    #[error("cue file not found: {}", .0.display())]
    FileMissing(PathBuf),

    /// No audio output device could be opened.
    #[error("no audio output device available: {0}")]
    NoOutputDevice(String),

    /// The output sink could not be created.
    #[error("failed to create audio sink: {0}")]
    Sink(String),

    /// The cue file could not be opened.
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The cue file could not be decoded.
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: rodio::decoder::DecoderError,
    },
}

/// A sound-playing capability.
///
/// `play` blocks until the cue has finished; cues are short by design.
pub trait PlaybackBackend: Send + Sync {
    fn play(&self, path: &Path) -> Result<(), PlaybackError>;
}

/// Backend backed by the default rodio output device.
///
/// The device is opened per call: keeping an `OutputStream` alive for the
/// lifetime of the player would pin the audio device even though cues are
/// rare, and a device that appears after startup (e.g. headphones plugged
/// in) is picked up automatically.
#[derive(Debug, Default)]
pub struct RodioBackend;

impl PlaybackBackend for RodioBackend {
    fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        let (_stream, handle) = OutputStream::try_default()
            .map_err(|e| PlaybackError::NoOutputDevice(e.to_string()))?;
        let sink = Sink::try_new(&handle).map_err(|e| PlaybackError::Sink(e.to_string()))?;

        let file = File::open(path).map_err(|source| PlaybackError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let source = Decoder::new(BufReader::new(file)).map_err(|source| PlaybackError::Decode {
            path: path.display().to_string(),
            source,
        })?;

        sink.append(source);
        sink.sleep_until_end();
        Ok(())
    }
}
