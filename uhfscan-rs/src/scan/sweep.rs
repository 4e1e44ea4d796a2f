//! Channel range iteration.

use log::debug;
use uhfscan_types::{ScanOutcome, TunerType};

use crate::config::ScanConfig;
use crate::scan::selector::OffsetSelector;
use crate::scan::ScanError;
use crate::tuner::TuningDevice;

/// Lazy scan of a channel range.
///
/// Each call to `next()` runs the offset search on one channel, in
/// ascending order, and leaves the device tuned on the selected offset of
/// that channel until the next call. The device is borrowed for the whole
/// sweep; use [`device_mut`](Self::device_mut) between items.
pub struct ChannelSweep<'a, D: TuningDevice + ?Sized> {
    device: &'a mut D,
    config: &'a ScanConfig,
    next_channel: Option<u8>,
}

impl<'a, D: TuningDevice + ?Sized> ChannelSweep<'a, D> {
    /// Prepare a sweep.
    ///
    /// Fails without touching the device if the configuration is invalid or
    /// the device is not a DVB-T frontend.
    pub fn new(device: &'a mut D, config: &'a ScanConfig) -> Result<Self, ScanError> {
        config.validate()?;

        // UHF means DVB-T.
        let actual = device.tuner_type();
        if actual != TunerType::DvbT {
            return Err(ScanError::TunerTypeMismatch {
                device: device.device_name().to_string(),
                actual,
            });
        }

        Ok(Self {
            device,
            config,
            next_channel: Some(config.first_channel),
        })
    }

    /// Restart from the first channel.
    pub fn rewind(&mut self) {
        self.next_channel = Some(self.config.first_channel);
    }

    /// The device, tuned on the last yielded channel's selected offset.
    pub fn device_mut(&mut self) -> &mut D {
        &mut *self.device
    }

    pub fn config(&self) -> &ScanConfig {
        self.config
    }

    /// End the sweep and give the device back.
    pub fn into_device(self) -> &'a mut D {
        self.device
    }
}

impl<D: TuningDevice + ?Sized> Iterator for ChannelSweep<'_, D> {
    type Item = ScanOutcome;

    fn next(&mut self) -> Option<ScanOutcome> {
        let channel = self.next_channel?;
        self.next_channel = if channel < self.config.last_channel {
            Some(channel + 1)
        } else {
            None
        };

        let selector = OffsetSelector::new(&self.config.band, &self.config.search);
        let outcome = selector.select(&mut *self.device, channel);
        debug!(
            "channel {}: signal_found={} best_offset={:+}",
            outcome.channel, outcome.signal_found, outcome.best_offset
        );
        Some(outcome)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.next_channel.map_or(0, |ch| {
            usize::from(self.config.last_channel - ch) + 1
        });
        (remaining, Some(remaining))
    }
}

impl<D: TuningDevice + ?Sized> ExactSizeIterator for ChannelSweep<'_, D> {}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::SearchConfig;
    use crate::tuner::{SignalMap, SimulatedSignal, SimulatedTuner};
    use uhfscan_types::{Hull, UhfBand};

    fn scan_config(first_channel: u8, last_channel: u8) -> ScanConfig {
        ScanConfig {
            band: UhfBand::default(),
            first_channel,
            last_channel,
            search: SearchConfig {
                first_offset: -2,
                last_offset: 2,
                min_strength: 10,
                min_quality: 10,
                lock_timeout: Duration::from_millis(800),
                verify_lock: true,
                ..Default::default()
            },
        }
    }

    fn scenario_tuner() -> SimulatedTuner {
        [(-2, 5), (-1, 20), (0, 30), (1, 25), (2, 8)].iter().fold(
            SimulatedTuner::new(TunerType::DvbT),
            |tuner, &(offset, quality)| {
                tuner.with_signal(21, offset, SimulatedSignal::new(50, quality))
            },
        )
    }

    #[test]
    fn test_single_channel_scenario() {
        let config = scan_config(21, 21);
        let mut tuner = scenario_tuner();

        let outcomes: Vec<_> = ChannelSweep::new(&mut tuner, &config).unwrap().collect();
        assert_eq!(outcomes.len(), 1);
        let outcome = &outcomes[0];
        assert_eq!(outcome.channel, 21);
        assert!(outcome.signal_found);
        assert_eq!(outcome.hull, Some(Hull { lowest: -1, highest: 1 }));
        assert_eq!(outcome.best_offset, 0);
    }

    #[test]
    fn test_quality_preference_scenario() {
        let mut config = scan_config(21, 21);
        config.search.prefer_quality = true;
        let mut tuner = scenario_tuner();

        let outcome = ChannelSweep::new(&mut tuner, &config)
            .unwrap()
            .next()
            .unwrap();
        assert_eq!(outcome.best_offset, 0);
        assert_eq!(outcome.best_quality, 30);
    }

    #[test]
    fn test_channels_without_lock_do_not_abort() {
        let config = scan_config(21, 23);
        let mut tuner = SimulatedTuner::new(TunerType::DvbT)
            .with_signal(21, 0, SimulatedSignal::no_lock())
            .with_signal(23, 1, SimulatedSignal::new(60, 60));

        let outcomes: Vec<_> = ChannelSweep::new(&mut tuner, &config).unwrap().collect();
        let channels: Vec<_> = outcomes.iter().map(|o| o.channel).collect();
        assert_eq!(channels, vec![21, 22, 23]);
        assert!(!outcomes[0].signal_found);
        assert!(!outcomes[1].signal_found);
        assert_eq!(outcomes[2].locked_offset(), Some(1));
    }

    #[test]
    fn test_tuner_type_mismatch_aborts_before_probing() {
        let config = scan_config(21, 69);
        let mut tuner = SimulatedTuner::new(TunerType::DvbS)
            .with_signal(21, 0, SimulatedSignal::new(60, 60));

        match ChannelSweep::new(&mut tuner, &config) {
            Err(ScanError::TunerTypeMismatch { actual, .. }) => {
                assert_eq!(actual, TunerType::DvbS)
            }
            _ => panic!("expected a tuner type mismatch"),
        }
        assert!(tuner.calls().is_empty());
    }

    #[test]
    fn test_invalid_config_aborts_before_probing() {
        let mut config = scan_config(21, 22);
        config.search.lock_timeout = Duration::ZERO;
        let mut tuner = scenario_tuner();

        assert!(matches!(
            ChannelSweep::new(&mut tuner, &config),
            Err(ScanError::Config(_))
        ));
        assert!(tuner.calls().is_empty());
    }

    #[test]
    fn test_sweep_is_lazy_and_restartable() {
        let config = scan_config(21, 22);
        let mut tuner = scenario_tuner();

        let mut sweep = ChannelSweep::new(&mut tuner, &config).unwrap();
        assert_eq!(sweep.len(), 2);

        let first = sweep.next().unwrap();
        assert!(first.signal_found);
        let band = UhfBand::default();
        assert_eq!(
            sweep.device_mut().tuned_frequency(),
            Some(band.frequency(21, 0))
        );
        assert_eq!(sweep.len(), 1);

        assert_eq!(sweep.next().map(|o| o.channel), Some(22));
        assert!(sweep.next().is_none());
        assert!(sweep.next().is_none());

        sweep.rewind();
        let again: Vec<_> = sweep.by_ref().collect();
        assert_eq!(again.len(), 2);
        assert_eq!(again[0], first);

        let device = sweep.into_device();
        assert_eq!(device.tuned_offsets(22).len(), 10);
    }

    #[test]
    fn test_last_band_channel_terminates() {
        let config = scan_config(69, 69);
        let mut tuner = SimulatedTuner::new(TunerType::DvbT);

        let outcomes: Vec<_> = ChannelSweep::new(&mut tuner, &config).unwrap().collect();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].channel, 69);
    }

    #[test]
    fn test_works_through_trait_object() {
        let config = scan_config(21, 21);
        let mut tuner = scenario_tuner();
        let device: &mut dyn TuningDevice = &mut tuner;

        let outcomes: Vec<_> = ChannelSweep::new(device, &config).unwrap().collect();
        assert!(outcomes[0].signal_found);
    }

    #[test]
    fn test_demo_signal_map() {
        let map = SignalMap::parse(include_str!("../../../demos/sample-band.toml")).unwrap();
        let mut tuner = map.into_tuner(UhfBand::default());
        let config = scan_config(21, 69);

        let found: Vec<_> = ChannelSweep::new(&mut tuner, &config)
            .unwrap()
            .filter_map(|o| o.locked_offset().map(|offset| (o.channel, offset)))
            .collect();
        // 44 is too weak, 52 never reports a lock, 60 fails its confirmation tune.
        assert_eq!(found, vec![(27, 0), (35, 2)]);
    }
}
