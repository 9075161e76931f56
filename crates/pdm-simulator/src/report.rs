//! Run report generation.

use crate::config::{SimulationConfig, Strategy};
use crate::engine::TickOutput;
use crate::fleet::FleetCounts;
use pdm_core::ServiceKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Summary of a finished (or interrupted) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    // Configuration
    pub strategy: Strategy,
    pub device_count: usize,
    pub technician_count: usize,
    pub seed: u64,
    pub ticks: u64,

    // Events
    pub failures: u64,
    pub repairs: u64,
    pub maintenances: u64,
    pub completions: u64,
    pub predictor_errors: u64,

    // Output volume
    pub telemetry_records: u64,
    pub repair_records: u64,

    // Fleet health
    pub production_sum: f64,
    pub operating_sum: u64,
    pub final_counts: FleetCounts,

    pub duration: Duration,
}

impl RunReport {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            strategy: config.strategy,
            device_count: config.device_count,
            technician_count: config.technician_count,
            seed: config.seed,
            ticks: 0,
            failures: 0,
            repairs: 0,
            maintenances: 0,
            completions: 0,
            predictor_errors: 0,
            telemetry_records: 0,
            repair_records: 0,
            production_sum: 0.0,
            operating_sum: 0,
            final_counts: FleetCounts::default(),
            duration: Duration::ZERO,
        }
    }

    /// Folds one tick's output and end-of-tick fleet state into the totals.
    pub fn record_tick(&mut self, output: &TickOutput, counts: FleetCounts, production: f64) {
        self.ticks += 1;
        self.failures += output.failures.len() as u64;
        for repair in &output.repairs {
            match repair.kind {
                ServiceKind::Repair => self.repairs += 1,
                ServiceKind::Maintenance => self.maintenances += 1,
            }
        }
        self.completions += output.completions.len() as u64;
        self.predictor_errors += output.predictor_failures.len() as u64;
        self.telemetry_records += output.telemetry.len() as u64;
        self.repair_records += output.repairs.len() as u64;
        self.production_sum += production;
        self.operating_sum += counts.operating as u64;
        self.final_counts = counts;
    }

    /// Mean production rate per device-tick.
    pub fn mean_production(&self) -> f64 {
        let device_ticks = self.ticks as f64 * self.device_count as f64;
        if device_ticks > 0.0 {
            self.production_sum / device_ticks
        } else {
            0.0
        }
    }

    /// Mean fraction of the fleet that was operating at the end of a tick.
    pub fn mean_operating_fraction(&self) -> f64 {
        let device_ticks = self.ticks as f64 * self.device_count as f64;
        if device_ticks > 0.0 {
            self.operating_sum as f64 / device_ticks
        } else {
            0.0
        }
    }

    pub fn ticks_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ticks as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Generates a markdown report.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str("# Fleet Simulation Report\n\n");

        md.push_str("## Configuration\n\n");
        md.push_str("| Setting | Value |\n");
        md.push_str("|---------|-------|\n");
        md.push_str(&format!("| Strategy | {} |\n", self.strategy));
        md.push_str(&format!("| Devices | {} |\n", format_number(self.device_count as u64)));
        md.push_str(&format!("| Technicians | {} |\n", self.technician_count));
        md.push_str(&format!("| Seed | {} |\n", self.seed));
        md.push_str(&format!("| Ticks | {} |\n", format_number(self.ticks)));
        md.push('\n');

        md.push_str("## Events\n\n");
        md.push_str("| Event | Count |\n");
        md.push_str("|-------|-------|\n");
        md.push_str(&format!("| Failures | {} |\n", format_number(self.failures)));
        md.push_str(&format!("| Repairs | {} |\n", format_number(self.repairs)));
        md.push_str(&format!(
            "| Preventive maintenance | {} |\n",
            format_number(self.maintenances)
        ));
        md.push_str(&format!("| Completions | {} |\n", format_number(self.completions)));
        if self.strategy == Strategy::Predictive {
            md.push_str(&format!(
                "| Predictor errors | {} |\n",
                format_number(self.predictor_errors)
            ));
        }
        md.push('\n');

        md.push_str("## Fleet\n\n");
        md.push_str("| Metric | Value |\n");
        md.push_str("|--------|-------|\n");
        md.push_str(&format!("| Mean production rate | {:.4} |\n", self.mean_production()));
        md.push_str(&format!(
            "| Mean operating fraction | {:.4} |\n",
            self.mean_operating_fraction()
        ));
        md.push_str(&format!(
            "| Final operating / failed / repair / maintenance | {} / {} / {} / {} |\n",
            self.final_counts.operating,
            self.final_counts.failed,
            self.final_counts.in_repair,
            self.final_counts.in_maintenance
        ));
        md.push_str(&format!(
            "| Telemetry records | {} |\n",
            format_number(self.telemetry_records)
        ));
        md.push_str(&format!(
            "| Repair records | {} |\n",
            format_number(self.repair_records)
        ));
        md.push('\n');

        md.push_str("## Summary\n\n");
        md.push_str(&format!(
            "Total runtime: {:.1}s ({:.0} ticks/s)\n",
            self.duration.as_secs_f64(),
            self.ticks_per_second()
        ));

        md
    }

    /// Generates a JSON report.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Prints a summary to stdout.
    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(60));
        println!("SIMULATION RESULTS");
        println!("{}", "=".repeat(60));

        println!(
            "\nStrategy: {} | Devices: {} | Technicians: {} | Ticks: {}",
            self.strategy,
            format_number(self.device_count as u64),
            self.technician_count,
            format_number(self.ticks)
        );

        println!("\nEVENTS:");
        println!("   Failures: {}", format_number(self.failures));
        println!("   Repairs: {}", format_number(self.repairs));
        println!("   Maintenance: {}", format_number(self.maintenances));
        println!("   Completions: {}", format_number(self.completions));
        if self.predictor_errors > 0 {
            println!("   Predictor errors: {}", format_number(self.predictor_errors));
        }

        println!("\nFLEET:");
        println!("   Mean production rate: {:.4}", self.mean_production());
        println!(
            "   Mean operating fraction: {:.4}",
            self.mean_operating_fraction()
        );
        println!(
            "   Runtime: {:.1}s ({:.0} ticks/s)",
            self.duration.as_secs_f64(),
            self.ticks_per_second()
        );

        println!("\n{}", "=".repeat(60));
    }
}

/// Formats a number with thousand separators.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
