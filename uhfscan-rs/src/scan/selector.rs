//! Offset search on one channel.
//!
//! Offsets are probed in two independent sweeps, downward from the center
//! then upward from the center. A sweep normally stops at the configured
//! bound but keeps going, up to [`OFFSET_EXTEND`] steps past it, as long as
//! the last offset it tried was accepted. Among accepted offsets one is
//! selected by policy, and the tuner is left tuned on it.

use log::{debug, info, warn};
use uhfscan_types::{Hull, Measurement, ScanOutcome, UhfBand};

use crate::config::SearchConfig;
use crate::scan::probe::{probe, tune_offset};
use crate::tuner::TuningDevice;

/// Maximum number of steps a sweep may run past its configured bound.
pub const OFFSET_EXTEND: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Descending,
    Ascending,
}

/// State machine for one sweep direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DirectionalSweep {
    direction: Direction,
    next: i32,
    bound: i32,
    last_accepted: bool,
}

impl DirectionalSweep {
    /// Downward sweep from the center, if the range reaches zero or below.
    pub(crate) fn descending(config: &SearchConfig) -> Option<Self> {
        (config.first_offset <= 0).then(|| Self {
            direction: Direction::Descending,
            next: config.last_offset.min(0),
            bound: config.first_offset,
            last_accepted: false,
        })
    }

    /// Upward sweep after the center, if the range reaches above zero.
    pub(crate) fn ascending(config: &SearchConfig) -> Option<Self> {
        (config.last_offset > 0).then(|| Self {
            direction: Direction::Ascending,
            next: config.first_offset.max(1),
            bound: config.last_offset,
            last_accepted: false,
        })
    }

    /// Furthest offset currently allowed.
    fn limit(&self) -> i32 {
        let extend = if self.last_accepted { OFFSET_EXTEND } else { 0 };
        match self.direction {
            Direction::Descending => self.bound - extend,
            Direction::Ascending => self.bound + extend,
        }
    }

    /// Next offset to probe, or `None` once the sweep is over.
    pub(crate) fn next_offset(&self) -> Option<i32> {
        let in_range = match self.direction {
            Direction::Descending => self.next >= self.limit(),
            Direction::Ascending => self.next <= self.limit(),
        };
        in_range.then_some(self.next)
    }

    /// Record the result of the offset returned by `next_offset`.
    pub(crate) fn advance(&mut self, accepted: bool) {
        self.last_accepted = accepted;
        match self.direction {
            Direction::Descending => self.next -= 1,
            Direction::Ascending => self.next += 1,
        }
    }
}

/// Best offsets seen among accepted probes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Candidates {
    best_quality: u8,
    best_quality_offset: i32,
    best_strength: u8,
    best_strength_offset: i32,
    hull: Option<Hull>,
}

impl Candidates {
    fn record(&mut self, offset: i32, measurement: &Measurement) {
        if let Some(quality) = measurement.quality {
            if quality > self.best_quality {
                self.best_quality = quality;
                self.best_quality_offset = offset;
            }
        }
        if let Some(strength) = measurement.strength {
            if strength > self.best_strength {
                self.best_strength = strength;
                self.best_strength_offset = offset;
            }
        }
        match self.hull.as_mut() {
            Some(hull) => hull.extend(offset),
            None => self.hull = Some(Hull::new(offset)),
        }
    }

    /// Pick the offset to lock onto, if any offset was accepted.
    fn choose(&self, config: &SearchConfig) -> Option<i32> {
        let hull = self.hull?;
        let offset = if config.prefer_quality && self.best_quality > 0 {
            self.best_quality_offset
        } else if config.prefer_strength && self.best_strength > 0 {
            self.best_strength_offset
        } else {
            hull.center()
        };
        Some(offset)
    }
}

/// Offset search for the channels of one band.
#[derive(Debug, Clone, Copy)]
pub struct OffsetSelector<'a> {
    band: &'a UhfBand,
    config: &'a SearchConfig,
}

impl<'a> OffsetSelector<'a> {
    pub fn new(band: &'a UhfBand, config: &'a SearchConfig) -> Self {
        Self { band, config }
    }

    /// Scan the offsets of a channel and leave the device tuned on the
    /// selected one.
    pub fn select<D: TuningDevice + ?Sized>(&self, device: &mut D, channel: u8) -> ScanOutcome {
        debug!(
            "scanning channel {}, {} Hz",
            channel,
            self.band.frequency(channel, 0)
        );

        let mut candidates = Candidates::default();

        if self.config.no_offset {
            self.try_offset(device, channel, 0, &mut candidates);
        } else {
            let sweeps = [
                DirectionalSweep::descending(self.config),
                DirectionalSweep::ascending(self.config),
            ];
            for mut sweep in sweeps.into_iter().flatten() {
                while let Some(offset) = sweep.next_offset() {
                    let accepted = self.try_offset(device, channel, offset, &mut candidates);
                    sweep.advance(accepted);
                }
            }
        }

        let mut outcome = ScanOutcome::new(channel);
        outcome.best_quality = candidates.best_quality;
        outcome.best_strength = candidates.best_strength;
        outcome.hull = candidates.hull;

        let selected = match candidates.choose(self.config) {
            Some(offset) => offset,
            None => {
                debug!("channel {}: no signal", channel);
                return outcome;
            }
        };
        outcome.best_offset = selected;

        // The channel only counts as found if the chosen offset tunes again.
        match tune_offset(device, self.band, channel, selected) {
            Ok(()) => {
                outcome.signal_found = true;
                info!(
                    "channel {}: selected offset {:+} (accepted {:+}..{:+})",
                    channel,
                    selected,
                    candidates.hull.map_or(0, |h| h.lowest),
                    candidates.hull.map_or(0, |h| h.highest)
                );
            }
            Err(e) => {
                warn!(
                    "channel {}: cannot tune back to offset {:+}: {}",
                    channel, selected, e
                );
            }
        }
        outcome
    }

    fn try_offset<D: TuningDevice + ?Sized>(
        &self,
        device: &mut D,
        channel: u8,
        offset: i32,
        candidates: &mut Candidates,
    ) -> bool {
        let result = probe(device, self.band, channel, offset, self.config);
        match result.measurement {
            Some(measurement) if result.accepted() => {
                candidates.record(offset, &measurement);
                true
            }
            _ => false,
        }
    }
}
