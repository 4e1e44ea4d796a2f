//! Error types for band plan lookups.

use thiserror::Error;

/// Errors raised when a channel or offset does not fit the band plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BandError {
    /// Channel number is outside the band.
    #[error("Channel {channel} is outside the UHF band ({first}-{last})")]
    ChannelOutOfBand { channel: u8, first: u8, last: u8 },

    /// Offset is outside the supported offset range.
    #[error("Offset {offset:+} is outside the supported range ({min:+} to {max:+})")]
    OffsetOutOfRange { offset: i32, min: i32, max: i32 },
}
