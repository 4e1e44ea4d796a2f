//! Single offset probe: tune, start acquisition, measure, stop.

use std::fmt;

use log::{debug, trace};
use uhfscan_types::{Measurement, TuningParameters, UhfBand};

use crate::config::SearchConfig;
use crate::tuner::{TunerError, TuningDevice};

/// Why a probe did not yield a usable signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The frontend refused the frequency.
    TuneFailed,
    /// Acquisition did not lock within the timeout.
    NoLock,
    /// Acquisition started but the lock status reads "not locked".
    NotLocked,
    /// Strength is supported and at or below the threshold.
    WeakStrength(u8),
    /// Quality is supported and at or below the threshold.
    LowQuality(u8),
    /// Both strength and quality are at or below their thresholds.
    WeakSignal { strength: u8, quality: u8 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::TuneFailed => write!(f, "tune failed"),
            RejectReason::NoLock => write!(f, "no lock"),
            RejectReason::NotLocked => write!(f, "signal not locked"),
            RejectReason::WeakStrength(s) => write!(f, "strength {}% too low", s),
            RejectReason::LowQuality(q) => write!(f, "quality {}% too low", q),
            RejectReason::WeakSignal { strength, quality } => {
                write!(f, "strength {}% and quality {}% too low", strength, quality)
            }
        }
    }
}

/// Result of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub offset: i32,
    /// Metrics read from the device, if acquisition got that far.
    pub measurement: Option<Measurement>,
    pub rejection: Option<RejectReason>,
}

impl Probe {
    fn rejected(offset: i32, measurement: Option<Measurement>, reason: RejectReason) -> Self {
        Self {
            offset,
            measurement,
            rejection: Some(reason),
        }
    }

    /// The offset carries a usable signal.
    pub fn accepted(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Stops acquisition when dropped.
struct Acquisition<'a, D: TuningDevice + ?Sized> {
    device: &'a mut D,
}

impl<D: TuningDevice + ?Sized> Drop for Acquisition<'_, D> {
    fn drop(&mut self) {
        self.device.stop();
    }
}

/// Tune the device on a channel shifted by `offset`, with the default
/// DVB-T scanning profile.
pub fn tune_offset<D: TuningDevice + ?Sized>(
    device: &mut D,
    band: &UhfBand,
    channel: u8,
    offset: i32,
) -> Result<(), TunerError> {
    let params = TuningParameters::dvbt_auto(band.frequency(channel, offset));
    device.tune(&params)
}

/// Test the signal at one offset of a channel.
///
/// Acquisition is always stopped before returning once a start was attempted,
/// whether or not it succeeded.
pub fn probe<D: TuningDevice + ?Sized>(
    device: &mut D,
    band: &UhfBand,
    channel: u8,
    offset: i32,
    config: &SearchConfig,
) -> Probe {
    trace!("trying offset {}", offset);

    if let Err(e) = tune_offset(device, band, channel, offset) {
        debug!("channel {} offset {:+}: {}", channel, offset, e);
        return Probe::rejected(offset, None, RejectReason::TuneFailed);
    }

    // A failed start may leave the demux half started, so the guard is
    // armed first. The lock timeout is applied by start().
    let acquisition = Acquisition { device };
    if let Err(e) = acquisition.device.start(config.lock_timeout) {
        debug!("channel {} offset {:+}: {}", channel, offset, e);
        return Probe::rejected(offset, None, RejectReason::NoLock);
    }

    // start() only succeeds with a non-zero timeout once data flows, so the
    // lock status is an extra check where the driver reports it reliably.
    if config.verify_lock && !acquisition.device.signal_locked() {
        debug!("channel {} offset {:+}: signal not locked", channel, offset);
        return Probe::rejected(offset, None, RejectReason::NotLocked);
    }

    let measurement = Measurement::locked(
        acquisition.device.signal_strength(),
        acquisition.device.signal_quality(),
    );
    debug!(
        "{}",
        band.description(channel, offset, measurement.strength, measurement.quality)
    );

    let weak = measurement.strength.filter(|&s| s <= config.min_strength);
    let noisy = measurement.quality.filter(|&q| q <= config.min_quality);
    let rejection = match (weak, noisy) {
        (Some(strength), Some(quality)) => Some(RejectReason::WeakSignal { strength, quality }),
        (Some(s), None) => Some(RejectReason::WeakStrength(s)),
        (None, Some(q)) => Some(RejectReason::LowQuality(q)),
        (None, None) => None,
    };
    if let Some(reason) = rejection {
        debug!("channel {} offset {:+}: {}", channel, offset, reason);
    }

    Probe {
        offset,
        measurement: Some(measurement),
        rejection,
    }
}
