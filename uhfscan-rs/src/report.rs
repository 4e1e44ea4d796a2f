//! Scan result reporting.
//!
//! [`Reporter`] receives each [`ScanOutcome`] while the device is still tuned
//! on the selected offset, reads the live signal state and the transport
//! description, and renders them either as text as it goes or as a single
//! JSON document at the end.

use std::io::{self, Write};
use std::time::Duration;

use chrono::{DateTime, Local};
use colored::Colorize;
use log::{debug, warn};
use serde::Serialize;
use uhfscan_types::{Hull, ScanOutcome, ServiceInfo, TransportInfo, UhfBand};

use crate::config::DEFAULT_PSI_TIMEOUT;
use crate::tuner::Frontend;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human readable lines, printed while scanning
    #[default]
    Table,
    /// One JSON document, printed when the scan completes
    Json,
}

/// What to report for each channel where a signal was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub format: OutputFormat,
    /// List the services of each transport.
    pub service_list: bool,
    /// List all services of all transports at the end.
    pub global_service_list: bool,
    /// Show the modulation parameters of each transport.
    pub modulation: bool,
    /// PSI/SI collection timeout.
    pub psi_timeout: Duration,
    /// Colorize text output.
    pub color: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Table,
            service_list: false,
            global_service_list: false,
            modulation: false,
            psi_timeout: DEFAULT_PSI_TIMEOUT,
            color: false,
        }
    }
}

impl ReportOptions {
    fn wants_services(&self) -> bool {
        self.service_list || self.global_service_list
    }
}

/// Report on one channel where a signal was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelReport {
    pub channel: u8,
    pub offset: i32,
    pub frequency: u64,
    /// Strength read after the device settled on the offset.
    pub strength: Option<u8>,
    /// Quality read after the device settled on the offset.
    pub quality: Option<u8>,
    pub hull: Option<Hull>,
    /// Transport description, if PSI/SI collection succeeded.
    pub transport: Option<TransportInfo>,
}

#[derive(Debug, Serialize)]
struct ScanSummary<'a> {
    started_at: DateTime<Local>,
    finished_at: DateTime<Local>,
    device: &'a str,
    channels: &'a [ChannelReport],
    #[serde(skip_serializing_if = "Option::is_none")]
    services: Option<&'a [ServiceInfo]>,
}

/// Sort services by name (unnamed last), then by id.
pub fn sort_services(services: &mut [ServiceInfo]) {
    services.sort_by(|a, b| {
        (a.name.is_none(), &a.name, a.id).cmp(&(b.name.is_none(), &b.name, b.id))
    });
}

/// Collects and renders scan results.
pub struct Reporter<W: Write> {
    out: W,
    band: UhfBand,
    options: ReportOptions,
    device: String,
    started_at: DateTime<Local>,
    channels: Vec<ChannelReport>,
    services: Vec<ServiceInfo>,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, band: UhfBand, device: &str, options: ReportOptions) -> Self {
        Self {
            out,
            band,
            options,
            device: device.to_string(),
            started_at: Local::now(),
            channels: Vec::new(),
            services: Vec::new(),
        }
    }

    /// Reports produced so far.
    pub fn channels(&self) -> &[ChannelReport] {
        &self.channels
    }

    /// Report a channel.
    ///
    /// The device must still be tuned on the outcome's selected offset.
    /// Returns `None` for channels without signal, which are not reported.
    pub fn channel<D: Frontend + ?Sized>(
        &mut self,
        device: &mut D,
        outcome: &ScanOutcome,
    ) -> io::Result<Option<&ChannelReport>> {
        let offset = match outcome.locked_offset() {
            Some(offset) => offset,
            None => return Ok(None),
        };

        let report = ChannelReport {
            channel: outcome.channel,
            offset,
            frequency: self.band.frequency(outcome.channel, offset),
            strength: device.signal_strength(),
            quality: device.signal_quality(),
            hull: outcome.hull,
            transport: self.collect_transport(device, outcome.channel),
        };

        if let Some(transport) = &report.transport {
            if self.options.global_service_list {
                self.services.extend(transport.services.iter().cloned());
            }
        }
        if self.options.format == OutputFormat::Table {
            self.write_channel(&report)?;
        }

        self.channels.push(report);
        Ok(self.channels.last())
    }

    fn collect_transport<D: Frontend + ?Sized>(
        &mut self,
        device: &mut D,
        channel: u8,
    ) -> Option<TransportInfo> {
        let timeout = self.options.psi_timeout;
        let result = device.start(timeout);
        let result = match result {
            Ok(()) => device.inspect(timeout),
            Err(e) => {
                device.stop();
                warn!("channel {}: cannot restart acquisition: {}", channel, e);
                return None;
            }
        };
        device.stop();

        match result {
            Ok(mut info) => {
                debug!(
                    "channel {}: ts id {:?}, {} services",
                    channel,
                    info.ts_id,
                    info.services.len()
                );
                if !self.options.wants_services() {
                    info.services.clear();
                }
                Some(info)
            }
            Err(e) => {
                warn!("channel {}: {}", channel, e);
                None
            }
        }
    }

    fn write_channel(&mut self, report: &ChannelReport) -> io::Result<()> {
        let description = self.band.description(
            report.channel,
            report.offset,
            report.strength,
            report.quality,
        );
        let marker = if self.options.color {
            "* UHF".green().bold().to_string()
        } else {
            "* UHF".to_string()
        };
        writeln!(self.out, "{} {}", marker, description)?;

        let transport = match &report.transport {
            Some(transport) => transport,
            None => return Ok(()),
        };
        if let Some(ts_id) = transport.ts_id {
            writeln!(self.out, "  Transport stream id: {}, 0x{:04X}", ts_id, ts_id)?;
        }
        if self.options.modulation {
            if let Some(params) = &transport.parameters {
                for line in params.display_lines() {
                    writeln!(self.out, "  {}", line)?;
                }
            }
        }
        if self.options.service_list {
            let mut services = transport.services.clone();
            sort_services(&mut services);
            writeln!(self.out)?;
            write_services(&mut self.out, "  ", &services)?;
            writeln!(self.out)?;
        }
        Ok(())
    }

    /// Write the end of the report and hand back the writer.
    pub fn finish(mut self) -> io::Result<W> {
        sort_services(&mut self.services);

        match self.options.format {
            OutputFormat::Table => {
                if self.options.global_service_list {
                    writeln!(self.out)?;
                    write_services(&mut self.out, "", &self.services)?;
                }
            }
            OutputFormat::Json => {
                let summary = ScanSummary {
                    started_at: self.started_at,
                    finished_at: Local::now(),
                    device: &self.device,
                    channels: &self.channels,
                    services: if self.options.global_service_list {
                        Some(&self.services)
                    } else {
                        None
                    },
                };
                serde_json::to_writer_pretty(&mut self.out, &summary)?;
                writeln!(self.out)?;
            }
        }

        self.out.flush()?;
        Ok(self.out)
    }
}

fn write_services<W: Write>(out: &mut W, margin: &str, services: &[ServiceInfo]) -> io::Result<()> {
    if services.is_empty() {
        return writeln!(out, "{}No services found.", margin);
    }

    writeln!(
        out,
        "{}{:<24} {:<16} {:<14} {}",
        margin, "Name", "Provider", "Id", "Type"
    )?;
    writeln!(out, "{}{}", margin, "-".repeat(64))?;
    for service in services {
        writeln!(
            out,
            "{}{:<24} {:<16} {:<14} {}",
            margin,
            service.name.as_deref().unwrap_or("-"),
            service.provider.as_deref().unwrap_or("-"),
            format!("{} (0x{:04X})", service.id, service.id),
            service.type_label()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::probe::tune_offset;
    use crate::tuner::{SimulatedSignal, SimulatedTuner};
    use uhfscan_types::TunerType;

    fn service(id: u16, name: Option<&str>) -> ServiceInfo {
        ServiceInfo {
            id,
            name: name.map(str::to_string),
            provider: Some("Net".to_string()),
            service_type: Some(0x01),
        }
    }

    fn tuner() -> SimulatedTuner {
        SimulatedTuner::new(TunerType::DvbT)
            .with_signal(35, 1, SimulatedSignal::new(70, 60))
            .with_transport(
                35,
                TransportInfo {
                    ts_id: Some(4),
                    services: vec![service(0x0102, Some("Zeta")), service(0x0101, Some("Alpha"))],
                    parameters: None,
                },
            )
    }

    fn found(channel: u8, offset: i32) -> ScanOutcome {
        ScanOutcome {
            signal_found: true,
            best_offset: offset,
            best_strength: 70,
            best_quality: 60,
            hull: Some(Hull::new(offset)),
            ..ScanOutcome::new(channel)
        }
    }

    fn tuned_tuner() -> SimulatedTuner {
        let mut tuner = tuner();
        tune_offset(&mut tuner, &UhfBand::default(), 35, 1).unwrap();
        tuner
    }

    #[test]
    fn test_text_report_line() {
        let mut tuner = tuned_tuner();
        let mut reporter = Reporter::new(
            Vec::new(),
            UhfBand::default(),
            "sim0",
            ReportOptions::default(),
        );

        let report = reporter.channel(&mut tuner, &found(35, 1)).unwrap().unwrap();
        assert_eq!(report.strength, Some(70));
        assert_eq!(report.frequency, 586_166_666);

        let text = String::from_utf8(reporter.finish().unwrap()).unwrap();
        assert_eq!(
            text,
            "* UHF channel 35 (offset +1), 586.166 MHz, strength: 70%, quality: 60%\n  \
             Transport stream id: 4, 0x0004\n"
        );
        assert!(!tuner.is_acquiring());
    }

    #[test]
    fn test_channel_without_signal_is_skipped() {
        let mut tuner = tuner();
        let mut reporter = Reporter::new(
            Vec::new(),
            UhfBand::default(),
            "sim0",
            ReportOptions::default(),
        );

        assert!(reporter
            .channel(&mut tuner, &ScanOutcome::new(36))
            .unwrap()
            .is_none());
        assert!(tuner.calls().is_empty());
        assert!(reporter.finish().unwrap().is_empty());
    }

    #[test]
    fn test_service_list_is_sorted() {
        let mut tuner = tuned_tuner();
        let options = ReportOptions {
            service_list: true,
            ..Default::default()
        };
        let mut reporter = Reporter::new(Vec::new(), UhfBand::default(), "sim0", options);
        reporter.channel(&mut tuner, &found(35, 1)).unwrap();

        let text = String::from_utf8(reporter.finish().unwrap()).unwrap();
        let alpha = text.find("Alpha").unwrap();
        let zeta = text.find("Zeta").unwrap();
        assert!(alpha < zeta);
        assert!(text.contains("257 (0x0101)"));
    }

    #[test]
    fn test_services_dropped_when_not_requested() {
        let mut tuner = tuned_tuner();
        let mut reporter = Reporter::new(
            Vec::new(),
            UhfBand::default(),
            "sim0",
            ReportOptions::default(),
        );
        let report = reporter.channel(&mut tuner, &found(35, 1)).unwrap().unwrap();
        assert!(report.transport.as_ref().unwrap().services.is_empty());
    }

    #[test]
    fn test_modulation_lines() {
        let mut tuner = tuned_tuner();
        let options = ReportOptions {
            modulation: true,
            ..Default::default()
        };
        let mut reporter = Reporter::new(Vec::new(), UhfBand::default(), "sim0", options);
        reporter.channel(&mut tuner, &found(35, 1)).unwrap();

        let text = String::from_utf8(reporter.finish().unwrap()).unwrap();
        assert!(text.contains("  Carrier frequency: 586166666 Hz\n"));
        assert!(text.contains("  Hierarchy: "));
    }

    #[test]
    fn test_global_service_list_at_end() {
        let mut tuner = tuned_tuner();
        let options = ReportOptions {
            global_service_list: true,
            ..Default::default()
        };
        let mut reporter = Reporter::new(Vec::new(), UhfBand::default(), "sim0", options);
        reporter.channel(&mut tuner, &found(35, 1)).unwrap();

        let text = String::from_utf8(reporter.finish().unwrap()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[2], "");
        assert!(lines[3].starts_with("Name"));
        assert!(lines[5].starts_with("Alpha"));
        assert!(lines[6].starts_with("Zeta"));
    }

    #[test]
    fn test_inspection_failure_still_reports_channel() {
        // Nothing on the frequency, so acquisition cannot restart.
        let mut tuner = SimulatedTuner::new(TunerType::DvbT);
        tune_offset(&mut tuner, &UhfBand::default(), 40, 0).unwrap();
        let mut reporter = Reporter::new(
            Vec::new(),
            UhfBand::default(),
            "sim0",
            ReportOptions::default(),
        );

        let report = reporter.channel(&mut tuner, &found(40, 0)).unwrap().unwrap();
        assert!(report.transport.is_none());
        assert_eq!(tuner.stops(), tuner.starts());
        let text = String::from_utf8(reporter.finish().unwrap()).unwrap();
        assert_eq!(text, "* UHF channel 40, 626 MHz, strength: 0%, quality: 0%\n");
    }

    #[test]
    fn test_json_summary() {
        let mut tuner = tuned_tuner();
        let options = ReportOptions {
            format: OutputFormat::Json,
            global_service_list: true,
            ..Default::default()
        };
        let mut reporter = Reporter::new(Vec::new(), UhfBand::default(), "sim0", options);
        reporter.channel(&mut tuner, &found(35, 1)).unwrap();

        let out = reporter.finish().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["device"], "sim0");
        assert_eq!(value["channels"][0]["channel"], 35);
        assert_eq!(value["channels"][0]["offset"], 1);
        assert_eq!(value["channels"][0]["transport"]["ts_id"], 4);
        assert_eq!(value["services"][0]["name"], "Alpha");
        assert!(value["started_at"].is_string());
    }

    #[test]
    fn test_sort_services_unnamed_last() {
        let mut services = vec![
            service(3, None),
            service(2, Some("B")),
            service(1, None),
            service(9, Some("A")),
        ];
        sort_services(&mut services);
        let ids: Vec<_> = services.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![9, 2, 1, 3]);
    }
}
