use std::io::{self, Write};

use log::error;
use uhfscan::UhfBand;
use uhfscan_types::BandError;

/// Write the band plan between two channels, at one offset.
fn write_band_plan<W: Write>(
    out: &mut W,
    band: &UhfBand,
    first_channel: u8,
    last_channel: u8,
    offset: i32,
) -> Result<(), BandPlanError> {
    writeln!(out, "{:<4} {:<14} {}", "Ch", "Frequency (Hz)", "Description")?;
    writeln!(out, "{}", "-".repeat(50))?;
    for channel in first_channel..=last_channel {
        let frequency = band.checked_frequency(channel, offset)?;
        writeln!(
            out,
            "{:<4} {:<14} {}",
            channel,
            frequency,
            band.description(channel, offset, None, None)
        )?;
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum BandPlanError {
    #[error(transparent)]
    Band(#[from] BandError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub(crate) fn cmd_frequencies(first_channel: u8, last_channel: u8, offset: i32) -> i32 {
    let band = UhfBand::default();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match write_band_plan(&mut out, &band, first_channel, last_channel, offset) {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e);
            1
        }
    }
}
