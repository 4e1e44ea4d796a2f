//! UHF band plan for DVB-T channels.
//!
//! This module maps UHF channel numbers and offsets to carrier frequencies
//! according to the European 8 MHz raster (channels 21 to 69).
//!
//! # Frequency Formula
//!
//! ```text
//! frequency = 306 000 000 + 8 000 000 × channel + 166 666 × offset   (Hz)
//! ```
//!
//! An offset is a signed step of 1/6 MHz around the channel center. Some
//! transmitters are slightly shifted from the nominal center, which is why
//! the scanner probes a few offsets on each side.

use serde::{Deserialize, Serialize};

use crate::error::BandError;

/// First UHF channel.
pub const FIRST_CHANNEL: u8 = 21;

/// Last UHF channel.
pub const LAST_CHANNEL: u8 = 69;

/// Largest offset, in either direction, a caller may configure.
pub const MAX_OFFSET: i32 = 40;

/// Frequency of the virtual channel 0 (Hz).
const BASE_FREQUENCY: u64 = 306_000_000;

/// Channel raster (Hz).
const CHANNEL_WIDTH: u64 = 8_000_000;

/// One offset step, 1/6 MHz rounded down (Hz).
const OFFSET_STEP: i64 = 166_666;

/// UHF band plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UhfBand {
    /// First channel of the band.
    pub first_channel: u8,
    /// Last channel of the band.
    pub last_channel: u8,
}

impl Default for UhfBand {
    fn default() -> Self {
        Self {
            first_channel: FIRST_CHANNEL,
            last_channel: LAST_CHANNEL,
        }
    }
}

impl UhfBand {
    /// Check whether a channel belongs to the band.
    pub fn contains(&self, channel: u8) -> bool {
        (self.first_channel..=self.last_channel).contains(&channel)
    }

    /// Carrier frequency of a channel shifted by `offset` steps (Hz).
    ///
    /// The channel is not checked against the band; see
    /// [`checked_frequency`](Self::checked_frequency).
    ///
    /// # Example
    /// ```
    /// use uhfscan_types::uhf::UhfBand;
    ///
    /// let band = UhfBand::default();
    /// assert_eq!(band.frequency(35, 0), 586_000_000);
    /// assert_eq!(band.frequency(35, 1), 586_166_666);
    /// assert_eq!(band.frequency(35, -1), 585_833_334);
    /// ```
    pub fn frequency(&self, channel: u8, offset: i32) -> u64 {
        let center = BASE_FREQUENCY + u64::from(channel) * CHANNEL_WIDTH;
        (center as i64 + i64::from(offset) * OFFSET_STEP) as u64
    }

    /// Carrier frequency of a channel and offset, validated against the band.
    pub fn checked_frequency(&self, channel: u8, offset: i32) -> Result<u64, BandError> {
        if !self.contains(channel) {
            return Err(BandError::ChannelOutOfBand {
                channel,
                first: self.first_channel,
                last: self.last_channel,
            });
        }
        if !(-MAX_OFFSET..=MAX_OFFSET).contains(&offset) {
            return Err(BandError::OffsetOutOfRange {
                offset,
                min: -MAX_OFFSET,
                max: MAX_OFFSET,
            });
        }
        Ok(self.frequency(channel, offset))
    }

    /// Human readable description of a channel, offset and signal metrics.
    ///
    /// Metrics the device does not support are left out.
    ///
    /// # Example
    /// ```
    /// use uhfscan_types::uhf::UhfBand;
    ///
    /// let band = UhfBand::default();
    /// assert_eq!(
    ///     band.description(35, 1, Some(70), Some(60)),
    ///     "channel 35 (offset +1), 586.166 MHz, strength: 70%, quality: 60%"
    /// );
    /// assert_eq!(band.description(21, 0, None, None), "channel 21, 474 MHz");
    /// ```
    pub fn description(
        &self,
        channel: u8,
        offset: i32,
        strength: Option<u8>,
        quality: Option<u8>,
    ) -> String {
        let freq = self.frequency(channel, offset);
        let mhz = freq / 1_000_000;
        let khz = (freq % 1_000_000) / 1_000;

        let mut desc = format!("channel {}", channel);
        if offset != 0 {
            desc.push_str(&format!(" (offset {:+})", offset));
        }
        desc.push_str(&format!(", {}", mhz));
        if khz > 0 {
            desc.push_str(&format!(".{:03}", khz));
        }
        desc.push_str(" MHz");
        if let Some(strength) = strength {
            desc.push_str(&format!(", strength: {}%", strength));
        }
        if let Some(quality) = quality {
            desc.push_str(&format!(", quality: {}%", quality));
        }
        desc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_edges() {
        let band = UhfBand::default();
        assert_eq!(band.frequency(FIRST_CHANNEL, 0), 474_000_000);
        assert_eq!(band.frequency(LAST_CHANNEL, 0), 858_000_000);
        assert!(band.contains(21));
        assert!(band.contains(69));
        assert!(!band.contains(20));
        assert!(!band.contains(70));
    }

    #[test]
    fn test_offset_steps() {
        let band = UhfBand::default();
        let center = band.frequency(40, 0);
        assert_eq!(band.frequency(40, 6), center + 999_996);
        assert_eq!(band.frequency(40, -6), center - 999_996);
    }

    #[test]
    fn test_checked_frequency() {
        let band = UhfBand::default();
        assert_eq!(band.checked_frequency(21, -2), Ok(473_666_668));
        assert_eq!(
            band.checked_frequency(5, 0),
            Err(BandError::ChannelOutOfBand {
                channel: 5,
                first: 21,
                last: 69
            })
        );
        assert!(matches!(
            band.checked_frequency(30, 41),
            Err(BandError::OffsetOutOfRange { offset: 41, .. })
        ));
    }

    #[test]
    fn test_description_negative_offset() {
        let band = UhfBand::default();
        assert_eq!(
            band.description(21, -1, Some(40), None),
            "channel 21 (offset -1), 473.833 MHz, strength: 40%"
        );
    }
}
