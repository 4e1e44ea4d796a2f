use std::io;
use std::io::ErrorKind;

use crate::tuner::{Frontend, TunerError};

const UNSUPPORTED_MSG: &str =
    "DVB frontend access is not available in this build (use --simulate with a signal map)";

/// Open a DVB frontend by name.
///
/// `None` selects the first frontend of the system.
pub fn open_device(name: Option<&str>) -> Result<Box<dyn Frontend>, TunerError> {
    Err(TunerError::Open {
        name: name.unwrap_or("(default)").to_string(),
        source: io::Error::new(ErrorKind::Unsupported, UNSUPPORTED_MSG),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_device_reports_unsupported() {
        match open_device(Some("/dev/dvb/adapter0")) {
            Err(TunerError::Open { name, source }) => {
                assert_eq!(name, "/dev/dvb/adapter0");
                assert_eq!(source.kind(), ErrorKind::Unsupported);
            }
            _ => panic!("expected an open error"),
        }
    }
}
