//! Log sinks for the telemetry and repair streams.
//!
//! Rows are pipe-delimited with no header:
//!
//! ```text
//! telemetry: time|deviceID|sensor|value
//! repairs:   time|deviceID|issue|technicianID|temperature|pressure|load|production_rate
//! ```
//!
//! Fleet-wide telemetry uses device id `-1`.

use crate::error::Result;
use pdm_core::{RepairRecord, TelemetryRecord};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Device id written for fleet-wide aggregates.
pub const FLEET_DEVICE_ID: i64 = -1;

/// Receives the ordered, append-only record streams of a run.
pub trait LogSink {
    fn write_telemetry(&mut self, records: &[TelemetryRecord]) -> Result<()>;

    fn write_repairs(&mut self, records: &[RepairRecord]) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: LogSink + ?Sized> LogSink for &mut S {
    fn write_telemetry(&mut self, records: &[TelemetryRecord]) -> Result<()> {
        (**self).write_telemetry(records)
    }

    fn write_repairs(&mut self, records: &[RepairRecord]) -> Result<()> {
        (**self).write_repairs(records)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Hands every record to both sinks, first `A` then `B`.
pub struct Tee<A, B>(pub A, pub B);

impl<A: LogSink, B: LogSink> LogSink for Tee<A, B> {
    fn write_telemetry(&mut self, records: &[TelemetryRecord]) -> Result<()> {
        self.0.write_telemetry(records)?;
        self.1.write_telemetry(records)
    }

    fn write_repairs(&mut self, records: &[RepairRecord]) -> Result<()> {
        self.0.write_repairs(records)?;
        self.1.write_repairs(records)
    }

    fn flush(&mut self) -> Result<()> {
        self.0.flush()?;
        self.1.flush()
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub telemetry: Vec<TelemetryRecord>,
    pub repairs: Vec<RepairRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogSink for MemorySink {
    fn write_telemetry(&mut self, records: &[TelemetryRecord]) -> Result<()> {
        self.telemetry.extend_from_slice(records);
        Ok(())
    }

    fn write_repairs(&mut self, records: &[RepairRecord]) -> Result<()> {
        self.repairs.extend_from_slice(records);
        Ok(())
    }
}

/// Writes both streams as pipe-delimited rows.
pub struct DelimitedSink<T: Write, R: Write> {
    telemetry: T,
    repairs: R,
    rows_written: u64,
}

impl<T: Write, R: Write> DelimitedSink<T, R> {
    pub fn new(telemetry: T, repairs: R) -> Self {
        Self {
            telemetry,
            repairs,
            rows_written: 0,
        }
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush and hand back the underlying writers.
    pub fn into_inner(mut self) -> Result<(T, R)> {
        self.flush()?;
        Ok((self.telemetry, self.repairs))
    }
}

impl DelimitedSink<BufWriter<File>, BufWriter<File>> {
    /// Create (or truncate) the two output files.
    pub fn create(telemetry: impl AsRef<Path>, repairs: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(
            BufWriter::new(File::create(telemetry)?),
            BufWriter::new(File::create(repairs)?),
        ))
    }
}

impl<T: Write, R: Write> LogSink for DelimitedSink<T, R> {
    fn write_telemetry(&mut self, records: &[TelemetryRecord]) -> Result<()> {
        for record in records {
            writeln!(self.telemetry, "{}", format_telemetry(record))?;
        }
        self.rows_written += records.len() as u64;
        Ok(())
    }

    fn write_repairs(&mut self, records: &[RepairRecord]) -> Result<()> {
        for record in records {
            writeln!(self.repairs, "{}", format_repair(record))?;
        }
        self.rows_written += records.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.telemetry.flush()?;
        self.repairs.flush()?;
        Ok(())
    }
}

/// Formats a telemetry record as `time|deviceID|sensor|value`.
pub fn format_telemetry(record: &TelemetryRecord) -> String {
    let device = record.device.map_or(FLEET_DEVICE_ID, |d| d as i64);
    format!("{}|{}|{}|{}", record.time, device, record.metric, record.value)
}

/// Formats a repair record as
/// `time|deviceID|issue|technicianID|temperature|pressure|load|production_rate`.
pub fn format_repair(record: &RepairRecord) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}|{}|{}",
        record.time,
        record.device,
        record.issue,
        record.technician,
        record.sensors.temperature,
        record.sensors.pressure,
        record.sensors.load,
        record.production_rate
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdm_core::{Issue, Metric, Sensor, SensorReading, ServiceKind};
    use tempfile::TempDir;

    fn repair() -> RepairRecord {
        RepairRecord {
            time: 120,
            device: 7,
            issue: Issue::JammedRotor,
            technician: 3,
            kind: ServiceKind::Repair,
            sensors: SensorReading::new(0.5, -0.25, 1.0),
            production_rate: 0.75,
        }
    }

    #[test]
    fn test_format_telemetry() {
        let record = TelemetryRecord::device(40, 12, Metric::Sensor(Sensor::Pressure), 0.125);
        assert_eq!(format_telemetry(&record), "40|12|pressure|0.125");

        let record = TelemetryRecord::fleet(40, Metric::Technicians, 3.0);
        assert_eq!(format_telemetry(&record), "40|-1|N_technicians|3");
    }

    #[test]
    fn test_format_repair() {
        assert_eq!(
            format_repair(&repair()),
            "120|7|jammed_rotor|3|0.5|-0.25|1|0.75"
        );
    }

    #[test]
    fn test_delimited_sink_in_memory() {
        let mut sink = DelimitedSink::new(Vec::<u8>::new(), Vec::<u8>::new());
        sink.write_telemetry(&[
            TelemetryRecord::device(1, 0, Metric::ProductionRate, 1.0),
            TelemetryRecord::fleet(1, Metric::Devices(pdm_core::DeviceState::Failed), 0.0),
        ])
        .unwrap();
        sink.write_repairs(&[repair()]).unwrap();
        assert_eq!(sink.rows_written(), 3);

        let (telemetry, repairs) = sink.into_inner().unwrap();
        assert_eq!(
            String::from_utf8(telemetry).unwrap(),
            "1|0|production_rate|1\n1|-1|N_failed|0\n"
        );
        assert_eq!(
            String::from_utf8(repairs).unwrap(),
            "120|7|jammed_rotor|3|0.5|-0.25|1|0.75\n"
        );
    }

    #[test]
    fn test_delimited_sink_files() {
        let dir = TempDir::new().unwrap();
        let telemetry = dir.path().join("telemetry.psv");
        let repairs = dir.path().join("repairs.psv");

        let mut sink = DelimitedSink::create(&telemetry, &repairs).unwrap();
        sink.write_repairs(&[repair(), repair()]).unwrap();
        sink.flush().unwrap();
        drop(sink);

        assert_eq!(std::fs::read_to_string(&telemetry).unwrap(), "");
        assert_eq!(std::fs::read_to_string(&repairs).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_tee_feeds_both_sinks() {
        let mut memory = MemorySink::new();
        let mut delimited = DelimitedSink::new(Vec::<u8>::new(), Vec::<u8>::new());
        {
            let mut tee = Tee(&mut delimited, &mut memory);
            tee.write_repairs(&[repair()]).unwrap();
            tee.flush().unwrap();
        }
        assert_eq!(memory.repairs, vec![repair()]);
        assert_eq!(delimited.rows_written(), 1);
    }

    #[test]
    fn test_memory_sink_appends() {
        let mut sink = MemorySink::new();
        sink.write_repairs(&[repair()]).unwrap();
        sink.write_repairs(&[repair()]).unwrap();
        sink.write_telemetry(&[]).unwrap();
        assert_eq!(sink.repairs.len(), 2);
        assert!(sink.telemetry.is_empty());
    }
}
