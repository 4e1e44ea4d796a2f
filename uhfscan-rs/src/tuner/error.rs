use std::time::Duration;

use thiserror::Error;

/// Errors reported by a tuning device.
#[derive(Debug, Error)]
pub enum TunerError {
    /// The device could not be opened.
    #[error("Failed to open tuner {name}: {source}")]
    Open {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The frontend rejected the tuning parameters.
    #[error("Tune to {frequency} Hz failed: {reason}")]
    TuneFailed { frequency: u64, reason: String },

    /// Acquisition was started before any successful tune.
    #[error("Tuner is not tuned")]
    NotTuned,

    /// No signal within the lock timeout.
    #[error("No signal after {0:?}")]
    LockTimeout(Duration),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised while collecting PSI/SI tables.
#[derive(Debug, Error)]
pub enum InspectError {
    /// No transport stream is being received.
    #[error("No transport stream")]
    NoStream,

    /// The tables did not arrive in time.
    #[error("PSI/SI collection timed out after {0:?}")]
    Timeout(Duration),

    /// Inspection is not available on this device.
    #[error("Stream inspection is not supported by {0}")]
    Unsupported(String),
}
