//! CLI entry point for the fleet simulator.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdm_simulator::{
    labels::LabelBuilder, DelimitedSink, FailurePredictor, LogisticPredictor,
    RunReport, Simulation, SimulationConfig, Strategy, Tee,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdm-simulator")]
#[command(about = "Fleet wear, failure and maintenance simulator")]
#[command(version)]
struct Cli {
    /// Log per-event debug records
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation and write telemetry and repair logs
    Run {
        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of devices
        #[arg(short, long)]
        devices: Option<usize>,

        /// Number of technicians
        #[arg(short, long)]
        technicians: Option<usize>,

        /// Number of ticks to simulate
        #[arg(short = 'n', long)]
        ticks: Option<u64>,

        /// Random seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Maintenance strategy (rtf or pdm)
        #[arg(long)]
        strategy: Option<Strategy>,

        /// Directory for telemetry.psv and repairs.psv
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Also write training labels to this file. Labels are aggregated
        /// while the run progresses, keeping one entry per (device, bucket)
        /// in memory until the run ends.
        #[arg(long)]
        labels: Option<PathBuf>,

        /// Ticks per label bucket
        #[arg(long, default_value = "10")]
        label_bucket: i64,

        /// Output file for report (markdown, plus a .json next to it)
        #[arg(short, long)]
        report: Option<String>,
    },

    /// Write the default configuration as YAML
    GenerateConfig {
        /// Destination file
        #[arg(short, long, default_value = "pdm.yml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(log_filter(EnvFilter::from_default_env(), cli.debug)?)
        .init();

    match cli.command {
        Commands::GenerateConfig { output } => {
            SimulationConfig::write_default(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Default configuration written to: {}", output.display());
            Ok(())
        }

        Commands::Run {
            config,
            devices,
            technicians,
            ticks,
            seed,
            strategy,
            output_dir,
            labels,
            label_bucket,
            report,
        } => {
            let mut cfg = match &config {
                Some(path) => SimulationConfig::from_file(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => SimulationConfig::default(),
            };
            if let Some(n) = devices {
                cfg.device_count = n;
            }
            if let Some(n) = technicians {
                cfg.technician_count = n;
            }
            if let Some(n) = ticks {
                cfg.ticks = n;
            }
            if let Some(s) = seed {
                cfg.seed = s;
            }
            if let Some(s) = strategy {
                cfg.strategy = s;
            }

            let summary = run(cfg, &output_dir, labels.as_deref(), label_bucket)?;
            summary.print_summary();

            if let Some(output_path) = report {
                save_report(&summary, &output_path)?;
            }
            Ok(())
        }
    }
}

fn run(
    config: SimulationConfig,
    output_dir: &Path,
    labels: Option<&Path>,
    label_bucket: i64,
) -> Result<RunReport> {
    let catalog = config.validate()?;

    let predictor: Option<Box<dyn FailurePredictor>> = match config.strategy {
        Strategy::Predictive => {
            if config.pdm.models.is_empty() {
                warn!("Predictive strategy selected but pdm.models is empty");
            }
            let predictor = LogisticPredictor::new(&catalog, &config.pdm.models)
                .context("Invalid pdm.models")?;
            Some(Box::new(predictor))
        }
        Strategy::RunToFail => None,
    };

    let mut sim = Simulation::new(config, predictor)?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let telemetry_path = output_dir.join("telemetry.psv");
    let repairs_path = output_dir.join("repairs.psv");
    let mut files = DelimitedSink::create(&telemetry_path, &repairs_path)?;

    let summary = match labels {
        Some(labels_path) => {
            let mut builder = LabelBuilder::new(sim.catalog(), label_bucket)?;
            let summary = sim.run(&mut Tee(&mut files, &mut builder))?;

            let set = builder.finish();
            let out = File::create(labels_path)
                .with_context(|| format!("Failed to create {}", labels_path.display()))?;
            set.write_to(BufWriter::new(out))?;
            info!(
                rows = set.rows.len(),
                "Training labels saved to: {}",
                labels_path.display()
            );
            summary
        }
        None => sim.run(&mut files)?,
    };

    info!(
        "Telemetry saved to: {}, repairs saved to: {}",
        telemetry_path.display(),
        repairs_path.display()
    );
    Ok(summary)
}

/// The `RUST_LOG` filter with the default level raised by `--debug`.
fn log_filter(base: EnvFilter, debug: bool) -> Result<EnvFilter> {
    let level = if debug { "debug" } else { "info" };
    Ok(base.add_directive(level.parse()?))
}

fn save_report(report: &RunReport, output_path: &str) -> Result<()> {
    let md_path = if output_path.ends_with(".md") {
        output_path.to_string()
    } else {
        format!("{}.md", output_path)
    };
    std::fs::write(&md_path, report.to_markdown())?;
    info!("Markdown report saved to: {}", md_path);

    let json_path = md_path.replace(".md", ".json");
    std::fs::write(&json_path, report.to_json())?;
    info!("JSON report saved to: {}", json_path);
    Ok(())
}
