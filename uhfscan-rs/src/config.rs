//! Scan configuration.
//!
//! [`SearchConfig`] and [`ScanConfig`] are validated value objects handed by
//! reference to the scanner. [`ConfigFile`] is the optional TOML file whose
//! values sit under the command line ones.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use uhfscan_types::uhf::MAX_OFFSET;
use uhfscan_types::UhfBand;

/// Shortest accepted lock timeout.
pub const MIN_LOCK_TIMEOUT: Duration = Duration::from_millis(100);

/// Default lock timeout.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(800);

/// Default PSI/SI collection timeout.
pub const DEFAULT_PSI_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default minimum signal strength (%).
pub const DEFAULT_MIN_STRENGTH: u8 = 10;

/// Default minimum signal quality (%).
pub const DEFAULT_MIN_QUALITY: u8 = 10;

/// Default first offset on each channel.
pub const DEFAULT_FIRST_OFFSET: i32 = -2;

/// Default last offset on each channel.
pub const DEFAULT_LAST_OFFSET: i32 = 2;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Offset {0:+} is outside -{max}..+{max}", max = MAX_OFFSET)]
    OffsetOutOfRange(i32),

    #[error("First offset {first:+} is after last offset {last:+}")]
    OffsetOrder { first: i32, last: i32 },

    #[error("Channel {channel} is outside the band ({first}-{last})")]
    ChannelOutOfBand { channel: u8, first: u8, last: u8 },

    #[error("First channel {first} is after last channel {last}")]
    ChannelOrder { first: u8, last: u8 },

    #[error("Lock timeout {0:?} is shorter than the {min:?} minimum", min = MIN_LOCK_TIMEOUT)]
    LockTimeoutTooShort(Duration),

    #[error("Threshold {0}% is above 100%")]
    ThresholdOutOfRange(u8),

    #[error("--adapter cannot be used with --device-name")]
    AdapterWithDeviceName,

    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Offset search parameters for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// First offset to scan (may be negative).
    pub first_offset: i32,
    /// Last offset to scan (may be negative).
    pub last_offset: i32,
    /// Probe the central frequency only.
    pub no_offset: bool,
    /// Select the offset with the best quality.
    pub prefer_quality: bool,
    /// Select the offset with the best strength.
    pub prefer_strength: bool,
    /// A supported strength must be above this to accept an offset.
    pub min_strength: u8,
    /// A supported quality must be above this to accept an offset.
    pub min_quality: u8,
    /// Signal lock timeout, applied by each acquisition start.
    pub lock_timeout: Duration,
    /// Reject offsets whose lock status reads "not locked".
    ///
    /// Only Linux frontends report the lock status reliably.
    pub verify_lock: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            first_offset: DEFAULT_FIRST_OFFSET,
            last_offset: DEFAULT_LAST_OFFSET,
            no_offset: false,
            prefer_quality: false,
            prefer_strength: false,
            min_strength: DEFAULT_MIN_STRENGTH,
            min_quality: DEFAULT_MIN_QUALITY,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            verify_lock: cfg!(target_os = "linux"),
        }
    }
}

impl SearchConfig {
    /// Check the configuration.
    ///
    /// The offset range is not checked in no-offset mode, where it is unused.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.no_offset {
            self.validate_offsets()?;
        }
        for threshold in [self.min_strength, self.min_quality] {
            if threshold > 100 {
                return Err(ConfigError::ThresholdOutOfRange(threshold));
            }
        }
        // A zero timeout may block forever on some drivers.
        if self.lock_timeout < MIN_LOCK_TIMEOUT {
            return Err(ConfigError::LockTimeoutTooShort(self.lock_timeout));
        }
        Ok(())
    }

    fn validate_offsets(&self) -> Result<(), ConfigError> {
        for offset in [self.first_offset, self.last_offset] {
            if !(-MAX_OFFSET..=MAX_OFFSET).contains(&offset) {
                return Err(ConfigError::OffsetOutOfRange(offset));
            }
        }
        if self.first_offset > self.last_offset {
            return Err(ConfigError::OffsetOrder {
                first: self.first_offset,
                last: self.last_offset,
            });
        }
        Ok(())
    }
}

/// Full scan parameters: channel range and per-channel search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub band: UhfBand,
    pub first_channel: u8,
    pub last_channel: u8,
    pub search: SearchConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let band = UhfBand::default();
        Self {
            band,
            first_channel: band.first_channel,
            last_channel: band.last_channel,
            search: SearchConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Check the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for channel in [self.first_channel, self.last_channel] {
            if !self.band.contains(channel) {
                return Err(ConfigError::ChannelOutOfBand {
                    channel,
                    first: self.band.first_channel,
                    last: self.band.last_channel,
                });
            }
        }
        if self.first_channel > self.last_channel {
            return Err(ConfigError::ChannelOrder {
                first: self.first_channel,
                last: self.last_channel,
            });
        }
        self.search.validate()
    }

    /// Number of channels in the range.
    pub fn channel_count(&self) -> usize {
        usize::from(self.last_channel.saturating_sub(self.first_channel)) + 1
    }
}

/// Configuration file format.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub device: DeviceSection,
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Deserialize, Default)]
pub struct DeviceSection {
    pub name: Option<String>,
    pub adapter: Option<u32>,
    pub simulate: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ScanSection {
    pub first_channel: Option<u8>,
    pub last_channel: Option<u8>,
    pub first_offset: Option<i32>,
    pub last_offset: Option<i32>,
    pub no_offset: Option<bool>,
    pub best_quality: Option<bool>,
    pub best_strength: Option<bool>,
    pub min_quality: Option<u8>,
    pub min_strength: Option<u8>,
    pub timeout_ms: Option<u64>,
    pub verify_lock: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
pub struct OutputSection {
    pub format: Option<String>,
    pub service_list: Option<bool>,
    pub global_service_list: Option<bool>,
    pub modulation: Option<bool>,
    pub psi_timeout_ms: Option<u64>,
}

impl ConfigFile {
    /// Parse a configuration file from TOML text.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScanConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.channel_count(), 49);
        assert_eq!(config.search.first_offset, -2);
        assert_eq!(config.search.last_offset, 2);
        assert_eq!(config.search.lock_timeout, Duration::from_millis(800));
    }

    #[test]
    fn test_rejects_short_timeout() {
        let search = SearchConfig {
            lock_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            search.validate(),
            Err(ConfigError::LockTimeoutTooShort(_))
        ));
    }

    #[test]
    fn test_rejects_bad_offsets() {
        let reversed = SearchConfig {
            first_offset: 2,
            last_offset: -2,
            ..Default::default()
        };
        assert!(matches!(
            reversed.validate(),
            Err(ConfigError::OffsetOrder { first: 2, last: -2 })
        ));

        let wide = SearchConfig {
            first_offset: -41,
            ..Default::default()
        };
        assert!(matches!(
            wide.validate(),
            Err(ConfigError::OffsetOutOfRange(-41))
        ));
    }

    #[test]
    fn test_no_offset_ignores_offset_range() {
        let config = SearchConfig {
            no_offset: true,
            first_offset: 3,
            last_offset: -3,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = SearchConfig {
            no_offset: true,
            first_offset: -50,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        // Other checks still apply.
        let config = SearchConfig {
            no_offset: true,
            first_offset: 3,
            last_offset: -3,
            lock_timeout: Duration::from_millis(10),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::LockTimeoutTooShort(_))
        ));
    }

    #[test]
    fn test_rejects_bad_channels() {
        let config = ScanConfig {
            first_channel: 70,
            last_channel: 70,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ChannelOutOfBand { channel: 70, .. })
        ));

        let config = ScanConfig {
            first_channel: 40,
            last_channel: 30,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ChannelOrder { first: 40, last: 30 })
        ));
    }

    #[test]
    fn test_config_file_sections() {
        let file = ConfigFile::parse(
            r#"
            [device]
            simulate = "band.toml"

            [scan]
            first_channel = 30
            last_channel = 40
            no_offset = true
            timeout_ms = 1200

            [output]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(file.device.simulate, Some(PathBuf::from("band.toml")));
        assert_eq!(file.scan.first_channel, Some(30));
        assert_eq!(file.scan.no_offset, Some(true));
        assert_eq!(file.scan.timeout_ms, Some(1200));
        assert_eq!(file.output.format.as_deref(), Some("json"));
        assert!(file.output.service_list.is_none());
    }

    #[test]
    fn test_config_file_rejects_bad_toml() {
        assert!(matches!(
            ConfigFile::parse("[scan\nfirst_channel = 1"),
            Err(ConfigError::Parse(_))
        ));
    }
}
