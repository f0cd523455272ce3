//! Command-line front end for the sweep library.
//!
//! Loads settings, opens the instrument session, runs the sweep, and
//! persists the result table. `--dry-run` swaps the live socket for the
//! scripted mock endpoint so a sweep can be exercised end-to-end
//! without hardware.

use anyhow::Context;
use clap::Parser;
use lte_sweep::config::Settings;
use lte_sweep::error::SweepError;
use lte_sweep::instrument::{MockEndpoint, ScpiEndpoint, SocketInstrument};
use lte_sweep::storage::CsvResultStore;
use lte_sweep::sweep::{scpi, SweepController, SweepReport};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lte-sweep", version, about = "LTE band/power sweep characterization")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<String>,

    /// Instrument address (host or host:port), overrides the config file.
    #[arg(short, long)]
    device: Option<String>,

    /// Result file destination, overrides the config file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run against a simulated instrument instead of a live session.
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::new(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(device) = cli.device {
        settings.device_address = device;
    }
    if let Some(output) = cli.output {
        settings.output_path = output;
    }

    log::info!(
        "Sweep: {} band(s) x {} power level(s) = {} point(s)",
        settings.bands.len(),
        settings.power_levels.len(),
        settings.point_count()
    );

    let report = if cli.dry_run {
        run_sweep(settings.clone(), simulated_endpoint())
    } else {
        let session = SocketInstrument::open(&settings.device_address)?;
        run_sweep(settings.clone(), session)
    };

    for failure in &report.failures {
        log::warn!(
            "Point {} failed during {}: {}",
            failure.point,
            failure.step,
            failure.cause
        );
    }
    log::info!(
        "Sweep finished: {} completed, {} failed",
        report.records.len(),
        report.failures.len()
    );

    let store = CsvResultStore::new(&settings.output_path);
    match store.write_all(&report.records) {
        Ok(()) => Ok(()),
        Err(SweepError::EmptyResult) => {
            anyhow::bail!("no measurements were completed; nothing was written")
        }
        Err(e) => Err(e).with_context(|| {
            format!("failed to write results to {}", settings.output_path.display())
        }),
    }
}

fn run_sweep<E: ScpiEndpoint>(settings: Settings, endpoint: E) -> SweepReport {
    let mut controller = SweepController::new(settings, endpoint);
    controller.run()
}

/// Mock endpoint with plausible canned readings for `--dry-run`.
fn simulated_endpoint() -> MockEndpoint {
    let mut mock = MockEndpoint::new();
    mock.set_response("*IDN?", "Simulated,CMW,0,0.0")
        .set_response(scpi::SYSTEM_ERROR, "0,\"No error\"")
        .enqueue_responses(scpi::UE_IPV4, ["NAV", "192.168.5.2"])
        .enqueue_responses(scpi::UE_IPV6, ["NAV", "fc01::2"])
        .set_response(scpi::UE_IMEI, "004999010640000")
        .set_response(scpi::UE_IMSI, "001010123456789")
        .enqueue_responses(scpi::RSRP, ["NAV", "-85.5"])
        .enqueue_responses(scpi::RSRQ, ["NAV", "-10.3"])
        .set_response(scpi::DL_THROUGHPUT, "12345")
        .set_response(scpi::UL_THROUGHPUT, "6789");
    mock
}
