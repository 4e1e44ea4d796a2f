use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use uhfscan::config::{ConfigError, ConfigFile, DeviceSection, SearchConfig, DEFAULT_PSI_TIMEOUT};
use uhfscan::tuner::{open_device, Frontend, SignalMap, TunerError};
use uhfscan::{ChannelSweep, OutputFormat, ReportOptions, Reporter, ScanConfig};

use crate::context::ScanArgs;

/// Configuration file read when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "uhfscan.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
enum DeviceChoice {
    Simulated(PathBuf),
    /// A platform device; `None` selects the first DVB-T device.
    Named(Option<String>),
}

#[derive(Debug)]
struct Settings {
    device: DeviceChoice,
    scan: ScanConfig,
    report: ReportOptions,
}

fn load_config_file(path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(path) = path {
        return ConfigFile::load(path);
    }
    let default = Path::new(DEFAULT_CONFIG_FILE);
    if default.is_file() {
        info!("Using configuration file {}", default.display());
        ConfigFile::load(default)
    } else {
        Ok(ConfigFile::default())
    }
}

fn adapter_device(adapter: u32) -> String {
    if cfg!(windows) {
        format!(":{}", adapter)
    } else {
        format!("/dev/dvb/adapter{}", adapter)
    }
}

fn resolve_device(args: &ScanArgs, file: &DeviceSection) -> Result<DeviceChoice, ConfigError> {
    // Any device option on the command line overrides the whole [device] section.
    if let Some(path) = &args.simulate {
        return Ok(DeviceChoice::Simulated(path.clone()));
    }
    if let Some(name) = &args.device_name {
        return Ok(DeviceChoice::Named(Some(name.clone())));
    }
    if let Some(adapter) = args.adapter {
        return Ok(DeviceChoice::Named(Some(adapter_device(adapter))));
    }

    if file.name.is_some() && file.adapter.is_some() {
        return Err(ConfigError::AdapterWithDeviceName);
    }
    if let Some(path) = &file.simulate {
        return Ok(DeviceChoice::Simulated(path.clone()));
    }
    Ok(DeviceChoice::Named(
        file.name.clone().or_else(|| file.adapter.map(adapter_device)),
    ))
}

fn build_settings(args: &ScanArgs, file: &ConfigFile) -> Result<Settings, ConfigError> {
    let defaults = ScanConfig::default();
    let scan = &file.scan;
    let output = &file.output;

    let search = SearchConfig {
        first_offset: args
            .first_offset
            .or(scan.first_offset)
            .unwrap_or(defaults.search.first_offset),
        last_offset: args
            .last_offset
            .or(scan.last_offset)
            .unwrap_or(defaults.search.last_offset),
        no_offset: args.no_offset || scan.no_offset.unwrap_or(false),
        prefer_quality: args.best_quality || scan.best_quality.unwrap_or(false),
        prefer_strength: args.best_strength || scan.best_strength.unwrap_or(false),
        min_strength: args
            .min_strength
            .or(scan.min_strength)
            .unwrap_or(defaults.search.min_strength),
        min_quality: args
            .min_quality
            .or(scan.min_quality)
            .unwrap_or(defaults.search.min_quality),
        lock_timeout: args
            .timeout
            .or(scan.timeout_ms)
            .map(Duration::from_millis)
            .unwrap_or(defaults.search.lock_timeout),
        verify_lock: scan.verify_lock.unwrap_or(defaults.search.verify_lock),
    };
    let config = ScanConfig {
        first_channel: args
            .first_uhf_channel
            .or(scan.first_channel)
            .unwrap_or(defaults.first_channel),
        last_channel: args
            .last_uhf_channel
            .or(scan.last_channel)
            .unwrap_or(defaults.last_channel),
        search,
        ..defaults
    };
    config.validate()?;

    let format = match (args.format, output.format.as_deref()) {
        (Some(format), _) => format,
        (None, Some(value)) => {
            OutputFormat::from_str(value, true).map_err(|_| ConfigError::InvalidValue {
                key: "output.format",
                value: value.to_string(),
            })?
        }
        (None, None) => OutputFormat::default(),
    };
    let report = ReportOptions {
        format,
        service_list: args.service_list || output.service_list.unwrap_or(false),
        global_service_list: args.global_service_list
            || output.global_service_list.unwrap_or(false),
        modulation: args.modulation || output.modulation.unwrap_or(false),
        psi_timeout: args
            .psi_timeout
            .or(output.psi_timeout_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_PSI_TIMEOUT),
        color: format == OutputFormat::Table
            && colored::control::SHOULD_COLORIZE.should_colorize(),
    };

    Ok(Settings {
        device: resolve_device(args, &file.device)?,
        scan: config,
        report,
    })
}

fn open(choice: &DeviceChoice, config: &ScanConfig) -> Result<Box<dyn Frontend>, String> {
    match choice {
        DeviceChoice::Simulated(path) => {
            let map = SignalMap::load(path).map_err(|e| e.to_string())?;
            Ok(Box::new(map.into_tuner(config.band)))
        }
        DeviceChoice::Named(name) => {
            open_device(name.as_deref()).map_err(|e: TunerError| e.to_string())
        }
    }
}

fn progress_bar(len: usize, verbose: bool) -> ProgressBar {
    // Log lines would tear the bar apart.
    if verbose {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    pb.set_style(style);
    pb
}

pub(crate) fn cmd_scan(args: ScanArgs, verbose: bool) -> i32 {
    if args.uhf_band {
        debug!("UHF band scanning is the only mode, -u has no effect");
    }
    let file = match load_config_file(args.config.as_deref()) {
        Ok(file) => file,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };
    let settings = match build_settings(&args, &file) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };

    let mut device = match open(&settings.device, &settings.scan) {
        Ok(device) => device,
        Err(e) => {
            error!("Cannot open tuner: {}", e);
            return 1;
        }
    };
    let device_name = device.device_name().to_string();
    info!("Using tuner {} ({})", device_name, device.tuner_type());

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        if let Err(e) = ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst)) {
            warn!("Cannot install the interrupt handler: {}", e);
        }
    }

    let mut sweep = match ChannelSweep::new(device.as_mut(), &settings.scan) {
        Ok(sweep) => sweep,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };

    let pb = progress_bar(sweep.len(), verbose);
    let mut reporter = Reporter::new(
        io::stdout(),
        settings.scan.band,
        &device_name,
        settings.report.clone(),
    );
    let mut found = 0usize;

    // Interruption is honored between channels.
    while let Some(outcome) = sweep.next() {
        pb.inc(1);
        if outcome.signal_found {
            found += 1;
            let result = pb.suspend(|| {
                reporter
                    .channel(sweep.device_mut(), &outcome)
                    .map(|_| ())
            });
            if let Err(e) = result {
                error!("Cannot write the report: {}", e);
                return 1;
            }
        }
        pb.set_message(format!("{} found", found));

        if interrupted.load(Ordering::SeqCst) {
            warn!("Interrupted after channel {}", outcome.channel);
            break;
        }
    }
    pb.finish_and_clear();

    if let Err(e) = reporter.finish() {
        error!("Cannot write the report: {}", e);
        return 1;
    }
    info!("{} channel(s) with signal", found);

    if interrupted.load(Ordering::SeqCst) {
        130
    } else {
        0
    }
}
