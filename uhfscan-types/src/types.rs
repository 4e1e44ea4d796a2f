//! Core value types shared by the scanner, the tuning devices and the
//! reporting layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Delivery system implemented by a tuner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TunerType {
    /// Satellite (DVB-S/S2)
    DvbS,
    /// Cable (DVB-C)
    DvbC,
    /// Terrestrial (DVB-T/T2)
    DvbT,
    /// ATSC terrestrial
    Atsc,
}

impl TunerType {
    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            TunerType::DvbS => "DVB-S",
            TunerType::DvbC => "DVB-C",
            TunerType::DvbT => "DVB-T",
            TunerType::Atsc => "ATSC",
        }
    }
}

impl fmt::Display for TunerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Spectral inversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpectralInversion {
    Off,
    On,
    Auto,
}

/// Channel bandwidth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bandwidth {
    Auto,
    Mhz6,
    Mhz7,
    Mhz8,
}

/// Inner forward error correction rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InnerFec {
    None,
    Fec1_2,
    Fec2_3,
    Fec3_4,
    Fec5_6,
    Fec7_8,
    Auto,
}

/// Constellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Modulation {
    Qpsk,
    Qam16,
    Qam64,
    Auto,
}

/// OFDM transmission mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransmissionMode {
    Auto,
    Mode2k,
    Mode8k,
}

/// Guard interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GuardInterval {
    Auto,
    Guard1_32,
    Guard1_16,
    Guard1_8,
    Guard1_4,
}

/// Hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Hierarchy {
    Auto,
    None,
    Alpha1,
    Alpha2,
    Alpha4,
}

/// DVB-T tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuningParameters {
    /// Carrier frequency (Hz).
    pub frequency: u64,
    pub inversion: SpectralInversion,
    pub bandwidth: Bandwidth,
    pub fec_hp: InnerFec,
    pub fec_lp: InnerFec,
    pub modulation: Modulation,
    pub transmission_mode: TransmissionMode,
    pub guard_interval: GuardInterval,
    pub hierarchy: Hierarchy,
}

impl TuningParameters {
    /// Default scanning profile: everything the demodulator can detect is
    /// left to automatic detection.
    ///
    /// Windows BDA drivers reject an automatic bandwidth, so 8 MHz is forced
    /// there.
    pub fn dvbt_auto(frequency: u64) -> Self {
        let bandwidth = if cfg!(windows) {
            Bandwidth::Mhz8
        } else {
            Bandwidth::Auto
        };
        Self {
            frequency,
            inversion: SpectralInversion::Auto,
            bandwidth,
            fec_hp: InnerFec::Auto,
            fec_lp: InnerFec::Auto,
            modulation: Modulation::Auto,
            transmission_mode: TransmissionMode::Auto,
            guard_interval: GuardInterval::Auto,
            hierarchy: Hierarchy::Auto,
        }
    }

    /// Render the parameters as `name: value` lines for display.
    pub fn display_lines(&self) -> Vec<String> {
        vec![
            format!("Carrier frequency: {} Hz", self.frequency),
            format!("Spectral inversion: {:?}", self.inversion),
            format!("Bandwidth: {:?}", self.bandwidth),
            format!("FEC (high priority): {:?}", self.fec_hp),
            format!("FEC (low priority): {:?}", self.fec_lp),
            format!("Constellation: {:?}", self.modulation),
            format!("Transmission mode: {:?}", self.transmission_mode),
            format!("Guard interval: {:?}", self.guard_interval),
            format!("Hierarchy: {:?}", self.hierarchy),
        ]
    }
}

/// Signal measurement taken after a successful acquisition start.
///
/// A metric is `None` when the device does not support it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    /// Signal strength (0-100).
    pub strength: Option<u8>,
    /// Signal quality (0-100).
    pub quality: Option<u8>,
    /// Whether the demodulator reported a lock.
    pub locked: bool,
}

impl Measurement {
    /// Measurement of a locked signal.
    pub fn locked(strength: Option<u8>, quality: Option<u8>) -> Self {
        Self {
            strength,
            quality,
            locked: true,
        }
    }
}

/// Contiguous inclusive range of offsets that yielded a usable signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hull {
    pub lowest: i32,
    pub highest: i32,
}

impl Hull {
    /// Hull made of a single accepted offset.
    pub fn new(offset: i32) -> Self {
        Self {
            lowest: offset,
            highest: offset,
        }
    }

    /// Record another accepted offset.
    ///
    /// Only an offset below `lowest`, or else above `highest`, moves an end.
    pub fn extend(&mut self, offset: i32) {
        if offset < self.lowest {
            self.lowest = offset;
        } else if offset > self.highest {
            self.highest = offset;
        }
    }

    /// Middle of the hull, truncated toward zero.
    pub fn center(&self) -> i32 {
        (self.lowest + self.highest) / 2
    }
}

/// Result of the offset search on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// UHF channel number.
    pub channel: u8,
    /// A usable offset was found and the tuner is tuned on it.
    pub signal_found: bool,
    /// Selected offset; only meaningful when `signal_found` is true.
    pub best_offset: i32,
    /// Best strength among accepted offsets (0 if none or unsupported).
    pub best_strength: u8,
    /// Best quality among accepted offsets (0 if none or unsupported).
    pub best_quality: u8,
    /// Accepted offset range, if any offset was accepted.
    pub hull: Option<Hull>,
}

impl ScanOutcome {
    /// Fresh outcome for a channel, before any probe.
    pub fn new(channel: u8) -> Self {
        Self {
            channel,
            signal_found: false,
            best_offset: 0,
            best_strength: 0,
            best_quality: 0,
            hull: None,
        }
    }

    /// Offset the tuner is locked on, if the search succeeded.
    pub fn locked_offset(&self) -> Option<i32> {
        if self.signal_found {
            Some(self.best_offset)
        } else {
            None
        }
    }
}

/// A service announced in a transport stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Service ID
    pub id: u16,
    /// Service name (from SDT)
    #[serde(default)]
    pub name: Option<String>,
    /// Provider name (from SDT)
    #[serde(default)]
    pub provider: Option<String>,
    /// Service type (0x01=TV, etc.)
    #[serde(default)]
    pub service_type: Option<u8>,
}

impl ServiceInfo {
    /// Short label for the service type.
    pub fn type_label(&self) -> String {
        match self.service_type {
            Some(0x01) => "TV".to_string(),
            Some(0x02) => "Radio".to_string(),
            Some(0x0C) => "Data".to_string(),
            Some(0x16) => "SD TV".to_string(),
            Some(0x19) => "HD TV".to_string(),
            Some(t) => format!("0x{:02X}", t),
            None => "Unknown".to_string(),
        }
    }
}

/// Information collected from a locked transport stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportInfo {
    /// Transport Stream ID (from PAT)
    #[serde(default)]
    pub ts_id: Option<u16>,
    /// Services found on this transport
    #[serde(default)]
    pub services: Vec<ServiceInfo>,
    /// Modulation parameters reported by the demodulator
    #[serde(default)]
    pub parameters: Option<TuningParameters>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hull_single_offset() {
        let hull = Hull::new(-1);
        assert_eq!(hull.lowest, -1);
        assert_eq!(hull.highest, -1);
        assert_eq!(hull.center(), -1);
    }

    #[test]
    fn test_hull_inside_offset_is_ignored() {
        let mut hull = Hull::new(0);
        hull.extend(-3);
        hull.extend(3);
        hull.extend(1);
        assert_eq!(hull, Hull { lowest: -3, highest: 3 });
    }

    #[test]
    fn test_hull_center_truncates_toward_zero() {
        assert_eq!(Hull { lowest: -3, highest: 0 }.center(), -1);
        assert_eq!(Hull { lowest: 0, highest: 3 }.center(), 1);
        assert_eq!(Hull { lowest: -1, highest: 0 }.center(), 0);
    }

    #[test]
    fn test_outcome_locked_offset() {
        let mut outcome = ScanOutcome::new(30);
        outcome.best_offset = 2;
        assert_eq!(outcome.locked_offset(), None);
        outcome.signal_found = true;
        assert_eq!(outcome.locked_offset(), Some(2));
    }

    #[test]
    fn test_tuner_type_serde_name() {
        let t: TunerType = serde_json::from_str("\"dvb-t\"").unwrap();
        assert_eq!(t, TunerType::DvbT);
        assert_eq!(t.to_string(), "DVB-T");
    }

    #[test]
    fn test_dvbt_auto_profile() {
        let params = TuningParameters::dvbt_auto(586_000_000);
        assert_eq!(params.inversion, SpectralInversion::Auto);
        assert_eq!(params.guard_interval, GuardInterval::Auto);
        assert_eq!(params.hierarchy, Hierarchy::Auto);
        assert_eq!(params.display_lines().len(), 9);
    }
}
