//! Tuning device abstraction.
//!
//! The scanner never talks to hardware directly. It drives a
//! [`TuningDevice`], which is owned by the caller for the whole scan and
//! lent to each probe, so a [`SimulatedTuner`] can stand in for a real
//! frontend.

use std::time::Duration;

use uhfscan_types::{TransportInfo, TunerType, TuningParameters};

pub use self::error::{InspectError, TunerError};
pub use self::simulated::{SignalMap, SimulatedSignal, SimulatedTuner};
pub use self::unsupported::open_device;

mod error;
pub mod simulated;
mod unsupported;

/// A stateful tuning/demodulation device.
pub trait TuningDevice {
    /// Name the device was opened with.
    fn device_name(&self) -> &str;

    /// Delivery system implemented by the frontend.
    fn tuner_type(&self) -> TunerType;

    /// Set the frontend on a frequency and modulation profile.
    fn tune(&mut self, params: &TuningParameters) -> Result<(), TunerError>;

    /// Start signal acquisition, waiting at most `timeout` for the signal.
    fn start(&mut self, timeout: Duration) -> Result<(), TunerError>;

    /// Stop signal acquisition.
    fn stop(&mut self);

    /// Lock status. Reliability depends on the platform driver.
    fn signal_locked(&mut self) -> bool;

    /// Signal strength (0-100), `None` if unsupported.
    fn signal_strength(&mut self) -> Option<u8>;

    /// Signal quality (0-100), `None` if unsupported.
    fn signal_quality(&mut self) -> Option<u8>;
}

/// Collects PSI/SI information from the transport the device is tuned on.
pub trait StreamInspector {
    /// Read the PAT/SDT of the current transport, waiting at most `timeout`.
    fn inspect(&mut self, timeout: Duration) -> Result<TransportInfo, InspectError>;
}

/// A device that can both be tuned and inspected.
pub trait Frontend: TuningDevice + StreamInspector {}

impl<T: TuningDevice + StreamInspector> Frontend for T {}
