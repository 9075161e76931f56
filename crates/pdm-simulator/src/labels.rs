//! Training labels built from recorded telemetry and repairs.
//!
//! Device telemetry is averaged per (device, time bucket) and left-joined
//! with the repairs dispatched in that bucket. Each row then gets, per fatal
//! issue, the time until that device's next row carrying the issue and the
//! time since its latest one. Fleet-wide aggregates are dropped.

use crate::error::{Result, SimError};
use crate::writer::LogSink;
use pdm_core::{
    DeviceId, Issue, IssueCatalog, Metric, RepairRecord, Sensor, SensorReading, TechnicianId,
    TelemetryRecord, Tick,
};
use std::collections::BTreeMap;
use std::io::Write;

/// Per-metric averages for one (device, bucket). Missing metrics are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRow {
    pub device: DeviceId,
    pub time_bucket: i64,
    /// Start time of the bucket
    pub time: Tick,
    pub sensors: [Option<f64>; Sensor::COUNT],
    pub production_rate: Option<f64>,
    pub issue: Option<Issue>,
    pub technician: Option<TechnicianId>,
    /// Sensor snapshot from the joined repair
    pub sensors_fail: Option<SensorReading>,
    pub production_rate_fail: Option<f64>,
    /// Indexed like `LabelSet::fatal`
    pub time_til: Vec<Option<Tick>>,
    pub time_since: Vec<Option<Tick>>,
}

/// Label rows ordered by device, then time.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSet {
    pub fatal: Vec<Issue>,
    pub rows: Vec<LabelRow>,
}

#[derive(Debug, Clone, Default)]
struct Accum {
    sums: [f64; Sensor::COUNT + 1],
    counts: [u32; Sensor::COUNT + 1],
}

impl Accum {
    fn add(&mut self, slot: usize, value: f64) {
        self.sums[slot] += value;
        self.counts[slot] += 1;
    }

    fn mean(&self, slot: usize) -> Option<f64> {
        (self.counts[slot] > 0).then(|| self.sums[slot] / self.counts[slot] as f64)
    }
}

const PRODUCTION_SLOT: usize = Sensor::COUNT;

/// Accumulates label buckets incrementally.
///
/// Only the per-(device, bucket) means and the first repair of each bucket
/// are kept, so it can sit behind a [`LogSink`] for a whole run without
/// holding the raw telemetry.
#[derive(Debug, Clone)]
pub struct LabelBuilder {
    bucket_size: Tick,
    fatal: Vec<Issue>,
    buckets: BTreeMap<(DeviceId, i64), Accum>,
    joined: BTreeMap<(DeviceId, i64), RepairRecord>,
}

impl LabelBuilder {
    pub fn new(catalog: &IssueCatalog, bucket_size: Tick) -> Result<Self> {
        if bucket_size <= 0 {
            return Err(SimError::config("label bucket size must be positive"));
        }
        Ok(Self {
            bucket_size,
            fatal: catalog.fatal().map(|spec| spec.issue).collect(),
            buckets: BTreeMap::new(),
            joined: BTreeMap::new(),
        })
    }

    /// Fold one telemetry record into its bucket. Fleet-wide records are dropped.
    pub fn add_telemetry(&mut self, record: &TelemetryRecord) {
        let Some(device) = record.device else {
            return;
        };
        let slot = match record.metric {
            Metric::Sensor(sensor) => sensor.index(),
            Metric::ProductionRate => PRODUCTION_SLOT,
            _ => return,
        };
        self.buckets
            .entry((device, record.time.div_euclid(self.bucket_size)))
            .or_default()
            .add(slot, record.value);
    }

    /// Join a repair onto its bucket unless an earlier one already claimed it.
    pub fn add_repair(&mut self, record: &RepairRecord) {
        self.joined
            .entry((record.device, record.time.div_euclid(self.bucket_size)))
            .or_insert_with(|| record.clone());
    }

    pub fn finish(self) -> LabelSet {
        let Self {
            bucket_size,
            fatal,
            buckets,
            joined,
        } = self;

        let mut rows: Vec<LabelRow> = buckets
            .iter()
            .map(|(&(device, bucket), accum)| {
                let repair = joined.get(&(device, bucket));
                LabelRow {
                    device,
                    time_bucket: bucket,
                    time: bucket * bucket_size,
                    sensors: [accum.mean(0), accum.mean(1), accum.mean(2)],
                    production_rate: accum.mean(PRODUCTION_SLOT),
                    issue: repair.map(|r| r.issue),
                    technician: repair.map(|r| r.technician),
                    sensors_fail: repair.map(|r| r.sensors),
                    production_rate_fail: repair.map(|r| r.production_rate),
                    time_til: vec![None; fatal.len()],
                    time_since: vec![None; fatal.len()],
                }
            })
            .collect();

        let mut start = 0;
        while start < rows.len() {
            let device = rows[start].device;
            let end = rows[start..]
                .iter()
                .position(|r| r.device != device)
                .map_or(rows.len(), |n| start + n);
            label_device(&mut rows[start..end], &fatal);
            start = end;
        }

        LabelSet { fatal, rows }
    }
}

impl LogSink for LabelBuilder {
    fn write_telemetry(&mut self, records: &[TelemetryRecord]) -> Result<()> {
        for record in records {
            self.add_telemetry(record);
        }
        Ok(())
    }

    fn write_repairs(&mut self, records: &[RepairRecord]) -> Result<()> {
        for record in records {
            self.add_repair(record);
        }
        Ok(())
    }
}

/// Build label rows with buckets `bucket_size` ticks wide.
pub fn build_labels(
    telemetry: &[TelemetryRecord],
    repairs: &[RepairRecord],
    catalog: &IssueCatalog,
    bucket_size: Tick,
) -> Result<LabelSet> {
    let mut builder = LabelBuilder::new(catalog, bucket_size)?;
    builder.write_telemetry(telemetry)?;
    builder.write_repairs(repairs)?;
    Ok(builder.finish())
}

/// Fill the time-until and time-since columns for one device's rows.
fn label_device(rows: &mut [LabelRow], fatal: &[Issue]) {
    for (k, issue) in fatal.iter().enumerate() {
        let mut last = None;
        for row in rows.iter_mut() {
            if row.issue == Some(*issue) {
                last = Some(row.time);
            }
            row.time_since[k] = last.map(|t| row.time - t);
        }

        let mut next = None;
        for row in rows.iter_mut().rev() {
            if row.issue == Some(*issue) {
                next = Some(row.time);
            }
            row.time_til[k] = next.map(|t| t - row.time);
        }
    }
}

impl LabelSet {
    pub fn header(&self) -> String {
        let mut cols: Vec<String> = vec!["deviceID".into(), "time_bucket".into(), "time".into()];
        cols.extend(Sensor::all().iter().map(|s| s.as_str().to_string()));
        cols.push("production_rate".into());
        cols.push("technicianID".into());
        cols.push("issue".into());
        cols.extend(Sensor::all().iter().map(|s| format!("{}_fail", s)));
        cols.push("production_rate_fail".into());
        cols.extend(self.fatal.iter().map(|i| format!("time_til_{}", i)));
        cols.extend(self.fatal.iter().map(|i| format!("time_since_{}", i)));
        cols.join("|")
    }

    /// Write a header and one pipe-delimited line per row. Absent values are
    /// empty, except technician (`-1`) and issue (`none`).
    pub fn write_to<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "{}", self.header())?;
        for row in &self.rows {
            let mut cols: Vec<String> = vec![
                row.device.to_string(),
                row.time_bucket.to_string(),
                row.time.to_string(),
            ];
            cols.extend(row.sensors.iter().map(|v| opt(*v)));
            cols.push(opt(row.production_rate));
            cols.push(row.technician.map_or("-1".to_string(), |t| t.to_string()));
            cols.push(row.issue.map_or("none".to_string(), |i| i.to_string()));
            match row.sensors_fail {
                Some(s) => cols.extend(s.as_array().iter().map(|v| v.to_string())),
                None => cols.extend(std::iter::repeat(String::new()).take(Sensor::COUNT)),
            }
            cols.push(opt(row.production_rate_fail));
            cols.extend(row.time_til.iter().map(|v| opt(*v)));
            cols.extend(row.time_since.iter().map(|v| opt(*v)));
            writeln!(out, "{}", cols.join("|"))?;
        }
        out.flush()?;
        Ok(())
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
