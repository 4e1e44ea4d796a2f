//! UHF-band offset scanning.
//!
//! - [`probe`]: one tune/measure/release cycle at a channel and offset
//! - [`selector`]: bidirectional offset search and best offset selection
//! - [`sweep`]: iteration over a channel range

pub mod probe;
pub mod selector;
pub mod sweep;

use thiserror::Error;
use uhfscan_types::TunerType;

use crate::config::ConfigError;

pub use probe::{Probe, RejectReason};
pub use selector::{OffsetSelector, OFFSET_EXTEND};
pub use sweep::ChannelSweep;

/// Errors that abort a scan before any channel is probed.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The device cannot receive the band being scanned.
    #[error("UHF scanning needs DVB-T, tuner {device} is {actual}")]
    TunerTypeMismatch { device: String, actual: TunerType },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
