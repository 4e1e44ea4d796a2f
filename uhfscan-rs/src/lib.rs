//! uhfscan library - DVB-T UHF band offset scanning
//!
//! For each UHF channel, the scanner probes the offsets around the central
//! frequency, keeps those with a usable signal and leaves the tuner on the
//! best one. Devices are abstracted behind [`tuner::TuningDevice`].

pub mod config;
pub mod report;
pub mod scan;
pub mod tuner;

// Re-export commonly used types
pub use config::{ConfigError, ScanConfig, SearchConfig};
pub use report::{OutputFormat, ReportOptions, Reporter};
pub use scan::{ChannelSweep, OffsetSelector, ScanError};
pub use tuner::{Frontend, SimulatedTuner, StreamInspector, TunerError, TuningDevice};
pub use uhfscan_types::{ScanOutcome, UhfBand};
