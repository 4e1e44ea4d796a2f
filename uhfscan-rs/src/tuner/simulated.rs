//! Scripted tuning device.
//!
//! [`SimulatedTuner`] answers tune/start/measure requests from a signal map
//! keyed by channel and offset, and records every call it receives. It is
//! used by the unit tests and by `uhfscan --simulate <FILE>`.
//!
//! # Signal map file
//!
//! ```toml
//! tuner_type = "dvb-t"
//! device_name = "sim0"
//!
//! [[signal]]
//! channel = 35
//! offset = 0
//! strength = 70
//! quality = 60
//!
//! [[tune_failure]]
//! channel = 35
//! offset = 1
//! after = 1      # the first tune succeeds, later ones fail
//!
//! [[transport]]
//! channel = 35
//! ts_id = 4
//! services = [{ id = 0x0101, name = "Channel One", service_type = 1 }]
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use log::trace;
use serde::Deserialize;
use uhfscan_types::{ServiceInfo, TransportInfo, TunerType, TuningParameters, UhfBand};

use crate::config::ConfigError;
use crate::tuner::{InspectError, StreamInspector, TunerError, TuningDevice};

/// Behaviour of the simulated frontend on one frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedSignal {
    /// Strength reported when tuned on this frequency.
    pub strength: u8,
    /// Quality reported when tuned on this frequency.
    pub quality: u8,
    /// Acquisition succeeds within the timeout.
    pub locks: bool,
    /// The lock status query answers `true`.
    pub reports_lock: bool,
}

fn default_true() -> bool {
    true
}

impl SimulatedSignal {
    /// A signal that locks with the given metrics.
    pub fn new(strength: u8, quality: u8) -> Self {
        Self {
            strength,
            quality,
            locks: true,
            reports_lock: true,
        }
    }

    /// A carrier that never locks.
    pub fn no_lock() -> Self {
        Self {
            strength: 0,
            quality: 0,
            locks: false,
            reports_lock: false,
        }
    }
}

/// One call received by a [`SimulatedTuner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCall {
    Tune { frequency: u64, ok: bool },
    Start { ok: bool },
    Stop,
}

#[derive(Debug, Deserialize)]
struct SignalEntry {
    channel: u8,
    #[serde(default)]
    offset: i32,
    #[serde(default)]
    strength: u8,
    #[serde(default)]
    quality: u8,
    #[serde(default = "default_true")]
    locks: bool,
    #[serde(default = "default_true")]
    reports_lock: bool,
}

impl SignalEntry {
    fn signal(&self) -> SimulatedSignal {
        SimulatedSignal {
            strength: self.strength,
            quality: self.quality,
            locks: self.locks,
            reports_lock: self.reports_lock,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TuneFailureEntry {
    channel: u8,
    #[serde(default)]
    offset: i32,
    #[serde(default)]
    after: u32,
}

#[derive(Debug, Deserialize)]
struct TransportEntry {
    channel: u8,
    #[serde(default)]
    ts_id: Option<u16>,
    #[serde(default)]
    services: Vec<ServiceInfo>,
}

/// Signal map file format.
#[derive(Debug, Deserialize)]
pub struct SignalMap {
    #[serde(default = "default_tuner_type")]
    tuner_type: TunerType,
    #[serde(default)]
    device_name: Option<String>,
    #[serde(default)]
    strength_supported: Option<bool>,
    #[serde(default)]
    quality_supported: Option<bool>,
    #[serde(default, rename = "signal")]
    signals: Vec<SignalEntry>,
    #[serde(default, rename = "tune_failure")]
    tune_failures: Vec<TuneFailureEntry>,
    #[serde(default, rename = "transport")]
    transports: Vec<TransportEntry>,
}

fn default_tuner_type() -> TunerType {
    TunerType::DvbT
}

impl SignalMap {
    /// Parse a signal map from TOML text.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load a signal map file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Build the device described by this map.
    pub fn into_tuner(self, band: UhfBand) -> SimulatedTuner {
        let mut tuner = SimulatedTuner::with_band(self.tuner_type, band);
        if let Some(name) = self.device_name {
            tuner.name = name;
        }
        tuner.strength_supported = self.strength_supported.unwrap_or(true);
        tuner.quality_supported = self.quality_supported.unwrap_or(true);
        for entry in self.signals {
            tuner = tuner.with_signal(entry.channel, entry.offset, entry.signal());
        }
        for entry in self.tune_failures {
            tuner = tuner.with_tune_budget(entry.channel, entry.offset, entry.after);
        }
        for entry in self.transports {
            tuner = tuner.with_transport(
                entry.channel,
                TransportInfo {
                    ts_id: entry.ts_id,
                    services: entry.services,
                    parameters: None,
                },
            );
        }
        tuner
    }
}

/// Scripted tuning device.
#[derive(Debug)]
pub struct SimulatedTuner {
    name: String,
    tuner_type: TunerType,
    band: UhfBand,
    strength_supported: bool,
    quality_supported: bool,
    signals: HashMap<u64, SimulatedSignal>,
    transports: HashMap<u8, TransportInfo>,
    /// Remaining successful tunes per frequency.
    tune_budget: HashMap<u64, u32>,
    tuned: Option<TuningParameters>,
    acquiring: bool,
    calls: Vec<DeviceCall>,
}

impl SimulatedTuner {
    /// Empty device on the default UHF band: no frequency carries a signal.
    pub fn new(tuner_type: TunerType) -> Self {
        Self::with_band(tuner_type, UhfBand::default())
    }

    /// Empty device on a specific band plan.
    pub fn with_band(tuner_type: TunerType, band: UhfBand) -> Self {
        Self {
            name: "simulated".to_string(),
            tuner_type,
            band,
            strength_supported: true,
            quality_supported: true,
            signals: HashMap::new(),
            transports: HashMap::new(),
            tune_budget: HashMap::new(),
            tuned: None,
            acquiring: false,
            calls: Vec::new(),
        }
    }

    /// Put a signal on a channel and offset.
    pub fn with_signal(mut self, channel: u8, offset: i32, signal: SimulatedSignal) -> Self {
        self.signals
            .insert(self.band.frequency(channel, offset), signal);
        self
    }

    /// Allow only `successes` tunes on a channel and offset; later tunes fail.
    pub fn with_tune_budget(mut self, channel: u8, offset: i32, successes: u32) -> Self {
        self.tune_budget
            .insert(self.band.frequency(channel, offset), successes);
        self
    }

    /// Attach transport stream information to a channel.
    pub fn with_transport(mut self, channel: u8, info: TransportInfo) -> Self {
        self.transports.insert(channel, info);
        self
    }

    /// Report strength as unsupported.
    pub fn without_strength(mut self) -> Self {
        self.strength_supported = false;
        self
    }

    /// Report quality as unsupported.
    pub fn without_quality(mut self) -> Self {
        self.quality_supported = false;
        self
    }

    /// Every call received so far.
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Offsets of `channel` the device was asked to tune to, in call order.
    pub fn tuned_offsets(&self, channel: u8) -> Vec<i32> {
        let center = self.band.frequency(channel, 0) as i64;
        let step = self.band.frequency(channel, 1) as i64 - center;
        self.calls
            .iter()
            .filter_map(|call| match call {
                DeviceCall::Tune { frequency, .. } => {
                    // The 8 MHz raster is never a multiple of the offset step.
                    let diff = *frequency as i64 - center;
                    if diff % step == 0 {
                        Some((diff / step) as i32)
                    } else {
                        None
                    }
                }
                _ => None,
            })
            .collect()
    }

    /// Number of `start` calls, successful or not.
    pub fn starts(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, DeviceCall::Start { .. }))
            .count()
    }

    /// Number of `start` calls that succeeded.
    pub fn successful_starts(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, DeviceCall::Start { ok: true }))
            .count()
    }

    /// Number of `stop` calls.
    pub fn stops(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, DeviceCall::Stop))
            .count()
    }

    /// Whether acquisition is currently running.
    pub fn is_acquiring(&self) -> bool {
        self.acquiring
    }

    /// Frequency of the last successful tune.
    pub fn tuned_frequency(&self) -> Option<u64> {
        self.tuned.map(|p| p.frequency)
    }

    fn current_signal(&self) -> Option<SimulatedSignal> {
        self.tuned
            .and_then(|p| self.signals.get(&p.frequency).copied())
    }

    fn nearest_channel(&self, frequency: u64) -> u8 {
        (self.band.first_channel..=self.band.last_channel)
            .min_by_key(|ch| (self.band.frequency(*ch, 0) as i64 - frequency as i64).abs())
            .unwrap_or(self.band.first_channel)
    }
}

impl TuningDevice for SimulatedTuner {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn tuner_type(&self) -> TunerType {
        self.tuner_type
    }

    fn tune(&mut self, params: &TuningParameters) -> Result<(), TunerError> {
        self.acquiring = false;
        let ok = match self.tune_budget.get_mut(&params.frequency) {
            Some(0) => false,
            Some(remaining) => {
                *remaining -= 1;
                true
            }
            None => true,
        };
        trace!("sim: tune {} Hz -> {}", params.frequency, ok);
        self.calls.push(DeviceCall::Tune {
            frequency: params.frequency,
            ok,
        });

        if ok {
            self.tuned = Some(*params);
            Ok(())
        } else {
            self.tuned = None;
            Err(TunerError::TuneFailed {
                frequency: params.frequency,
                reason: "simulated tune failure".to_string(),
            })
        }
    }

    fn start(&mut self, timeout: Duration) -> Result<(), TunerError> {
        if self.tuned.is_none() {
            self.calls.push(DeviceCall::Start { ok: false });
            return Err(TunerError::NotTuned);
        }
        let ok = self.current_signal().map_or(false, |s| s.locks);
        self.calls.push(DeviceCall::Start { ok });
        if ok {
            self.acquiring = true;
            Ok(())
        } else {
            Err(TunerError::LockTimeout(timeout))
        }
    }

    fn stop(&mut self) {
        self.acquiring = false;
        self.calls.push(DeviceCall::Stop);
    }

    fn signal_locked(&mut self) -> bool {
        self.current_signal()
            .map_or(false, |s| s.locks && s.reports_lock)
    }

    fn signal_strength(&mut self) -> Option<u8> {
        if !self.strength_supported {
            return None;
        }
        Some(self.current_signal().map_or(0, |s| s.strength))
    }

    fn signal_quality(&mut self) -> Option<u8> {
        if !self.quality_supported {
            return None;
        }
        Some(self.current_signal().map_or(0, |s| s.quality))
    }
}

impl StreamInspector for SimulatedTuner {
    fn inspect(&mut self, timeout: Duration) -> Result<TransportInfo, InspectError> {
        let params = self.tuned.ok_or(InspectError::NoStream)?;
        if !self.current_signal().map_or(false, |s| s.locks) {
            return Err(InspectError::Timeout(timeout));
        }

        let channel = self.nearest_channel(params.frequency);
        let mut info = self.transports.get(&channel).cloned().unwrap_or_default();
        if info.parameters.is_none() {
            info.parameters = Some(params);
        }
        Ok(info)
    }
}
