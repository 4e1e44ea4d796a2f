use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_num::number_range;
use uhfscan::OutputFormat;
use uhfscan_types::uhf::{FIRST_CHANNEL, LAST_CHANNEL, MAX_OFFSET};

#[derive(Debug, Parser)]
#[clap(name = "uhfscan")]
#[clap(about = "uhfscan scans the UHF band of a DVB-T tuner and locks onto the best offset of each channel.", long_about = None)]
#[clap(author = "maleicacid")]
#[clap(version)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Display the scan trail (probed offsets, measurements).
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Display debug traces, including device calls.
    #[clap(long, global = true)]
    pub debug: bool,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// UHF band scan.{n}
    /// For each channel, the offsets around the central frequency are
    /// probed and the tuner is left on the offset with the best signal.{n}
    /// Each channel where a signal is found is reported with its
    /// transport stream id.
    #[clap(name = "scan")]
    Scan(ScanArgs),

    /// Print the UHF band plan.{n}
    /// This subcommand lists the carrier frequency of each channel
    /// at a given offset, without opening any device.
    #[clap(name = "frequencies")]
    Frequencies {
        /// First channel to list.
        #[clap(short, long, value_parser = uhf_channel, default_value_t = FIRST_CHANNEL)]
        first_uhf_channel: u8,

        /// Last channel to list.
        #[clap(short, long, value_parser = uhf_channel, default_value_t = LAST_CHANNEL)]
        last_uhf_channel: u8,

        /// Offset from the central frequency, in 1/6 MHz steps.
        #[clap(long, value_parser = uhf_offset, default_value_t = 0, allow_negative_numbers = true)]
        offset: i32,
    },
}

#[derive(Debug, Args)]
pub(crate) struct ScanArgs {
    /// The device name.{n}
    /// On Linux, the canonical path of the frontend adapter,
    /// e.g. `/dev/dvb/adapter0`.{n}
    /// By default, the first DVB-T device is used.
    #[clap(short, long, value_name = "NAME")]
    pub device_name: Option<String>,

    /// Adapter number.{n}
    /// Shortcut for `--device-name /dev/dvb/adapterN` on Linux
    /// and `--device-name :N` on Windows.
    #[clap(short, long, value_name = "N", conflicts_with = "device_name")]
    pub adapter: Option<u32>,

    /// Scan a simulated device described by a signal map file.
    #[clap(long, value_name = "FILE", conflicts_with_all = ["device_name", "adapter"])]
    pub simulate: Option<PathBuf>,

    /// Configuration file.{n}
    /// Defaults to `uhfscan.toml` in the current directory, if present.{n}
    /// Command line options take precedence over the file.
    #[clap(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Perform DVB-T UHF-band scanning.{n}
    /// Currently the only supported mode, accepted for compatibility.
    #[clap(short, long, hide = true)]
    pub uhf_band: bool,

    /// First channel to scan (default: 21).
    #[clap(short, long, value_parser = uhf_channel)]
    pub first_uhf_channel: Option<u8>,

    /// Last channel to scan (default: 69).
    #[clap(short, long, value_parser = uhf_channel)]
    pub last_uhf_channel: Option<u8>,

    /// First offset to scan on each channel (default: -2).
    #[clap(long, value_parser = uhf_offset, allow_negative_numbers = true)]
    pub first_offset: Option<i32>,

    /// Last offset to scan on each channel (default: +2).
    #[clap(long, value_parser = uhf_offset, allow_negative_numbers = true)]
    pub last_offset: Option<i32>,

    /// Scan only the central frequency of each channel.
    #[clap(short, long)]
    pub no_offset: bool,

    /// Use the offset with the best signal quality.{n}
    /// By default, the average of the lowest and highest
    /// offsets with a signal is used.
    #[clap(long)]
    pub best_quality: bool,

    /// Use the offset with the best signal strength.{n}
    /// By default, the average of the lowest and highest
    /// offsets with a signal is used.
    #[clap(long)]
    pub best_strength: bool,

    /// Minimum signal quality percentage (default: 10).{n}
    /// Frequencies with a lower quality are ignored.
    #[clap(long, value_parser = percentage)]
    pub min_quality: Option<u8>,

    /// Minimum signal strength percentage (default: 10).{n}
    /// Frequencies with a lower strength are ignored.
    #[clap(long, value_parser = percentage)]
    pub min_strength: Option<u8>,

    /// Signal lock timeout in milliseconds (default: 800).{n}
    /// Must be at least 100.
    #[clap(short, long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// PSI/SI collection timeout in milliseconds (default: 5000).
    #[clap(long, value_name = "MS")]
    pub psi_timeout: Option<u64>,

    /// List the services of each transport stream.
    #[clap(short, long)]
    pub service_list: bool,

    /// List all services of all transport streams at the end.
    #[clap(short, long)]
    pub global_service_list: bool,

    /// Display the modulation parameters of each transport stream.
    #[clap(short, long)]
    pub modulation: bool,

    /// Output format.
    #[clap(value_enum, long)]
    pub format: Option<OutputFormat>,
}

fn uhf_channel(s: &str) -> Result<u8, String> {
    number_range(s, FIRST_CHANNEL, LAST_CHANNEL)
}

fn uhf_offset(s: &str) -> Result<i32, String> {
    number_range(s, -MAX_OFFSET, MAX_OFFSET)
}

fn percentage(s: &str) -> Result<u8, String> {
    number_range(s, 0, 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan_options() {
        let cli = Cli::try_parse_from([
            "uhfscan",
            "scan",
            "-f",
            "30",
            "-l",
            "40",
            "--first-offset",
            "-3",
            "--best-quality",
            "--format",
            "json",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.first_uhf_channel, Some(30));
                assert_eq!(args.last_uhf_channel, Some(40));
                assert_eq!(args.first_offset, Some(-3));
                assert_eq!(args.last_offset, None);
                assert!(args.best_quality);
                assert_eq!(args.format, Some(OutputFormat::Json));
            }
            _ => panic!("expected the scan subcommand"),
        }
    }

    #[test]
    fn test_rejects_out_of_band_channel() {
        assert!(Cli::try_parse_from(["uhfscan", "scan", "-f", "20"]).is_err());
        assert!(Cli::try_parse_from(["uhfscan", "scan", "--last-offset", "41"]).is_err());
        assert!(Cli::try_parse_from(["uhfscan", "scan", "--min-quality", "101"]).is_err());
    }

    #[test]
    fn test_uhf_band_flag_is_hidden_but_accepted() {
        let cli = Cli::try_parse_from(["uhfscan", "scan", "-u"]).unwrap();
        match cli.command {
            Commands::Scan(args) => assert!(args.uhf_band),
            _ => panic!("expected the scan subcommand"),
        }

        let command = Cli::command();
        let scan = command.find_subcommand("scan").unwrap();
        let flag = scan
            .get_arguments()
            .find(|arg| arg.get_id() == "uhf_band")
            .unwrap();
        assert!(flag.is_hide_set());
    }

    #[test]
    fn test_adapter_conflicts_with_device_name() {
        assert!(Cli::try_parse_from(["uhfscan", "scan", "-a", "0", "-d", "/dev/dvb/adapter1"]).is_err());
    }
}
