//! Shared type definitions for the uhfscan DVB-T offset scanner.
//!
//! This crate defines the values exchanged between the scanning core, the
//! tuning devices it drives and the reporting layer that consumes its
//! results.
//!
//! # Band plan
//!
//! ```text
//! center(channel)         = 306 MHz + channel × 8 MHz
//! frequency(channel, off) = center(channel) + off × 166 666 Hz
//! ```
//!
//! # Example
//!
//! ```rust
//! use uhfscan_types::uhf::UhfBand;
//! use uhfscan_types::{Hull, Measurement};
//!
//! let band = UhfBand::default();
//! assert_eq!(band.frequency(21, 0), 474_000_000);
//!
//! let mut hull = Hull::new(0);
//! hull.extend(-1);
//! hull.extend(2);
//! assert_eq!((hull.lowest, hull.highest), (-1, 2));
//! assert_eq!(hull.center(), 0);
//!
//! let m = Measurement::locked(Some(70), None);
//! assert!(m.quality.is_none());
//! ```

pub mod error;
pub mod types;
pub mod uhf;

pub use error::BandError;
pub use types::{
    Bandwidth, GuardInterval, Hierarchy, Hull, InnerFec, Measurement, Modulation, ScanOutcome,
    ServiceInfo, SpectralInversion, TransmissionMode, TransportInfo, TunerType,
    TuningParameters,
};
pub use uhf::UhfBand;
