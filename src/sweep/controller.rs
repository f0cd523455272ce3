//! The sweep controller: drives every (band, power) point through its
//! configure → attach → report → measure → teardown cycle.
//!
//! Failure isolation is the controller's reason to exist. A transport
//! error fails only the current point; the unavailable-marker responses
//! handled by [`crate::poller`] degrade the point (warning or sentinel
//! values) without failing it; teardown directives are issued
//! unconditionally so a failed point never leaves the cell or report
//! enabled for the next one. Only session-open failure aborts the whole
//! sweep, and that happens before a controller is ever constructed.
//!
//! The instrument session is exclusively owned by the controller for
//! the sweep's duration; commands and queries are strictly sequential
//! because the instrument is one stateful hardware resource.

use crate::config::{ErrorCheckPolicy, Settings};
use crate::error::{AppResult, SweepError};
use crate::instrument::ScpiEndpoint;
use crate::poller::{both_available, poll_pair, PollOutcome, RetryPolicy};
use crate::sweep::record::{
    MeasurementRecord, PointFailure, StepPolicy, SweepPoint, SweepStep,
};
use crate::sweep::scpi;
use log::{error, info, warn};
use std::time::Duration;

/// UE attach can take tens of seconds after cell enable.
const ATTACH_QUERY_TIMEOUT: Duration = Duration::from_secs(50);
/// Error-queue reads after configuration directives are quick.
const ERROR_QUERY_TIMEOUT: Duration = Duration::from_secs(1);
/// Report reads once the report interval is running.
const REPORT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of a whole sweep: completed records in iteration order plus
/// the points that failed, with step and cause.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub records: Vec<MeasurementRecord>,
    pub failures: Vec<PointFailure>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A failure local to one sweep point, tagged with the step it
/// occurred in.
#[derive(Debug)]
struct PointError {
    step: SweepStep,
    source: SweepError,
}

impl PointError {
    fn at(step: SweepStep, source: SweepError) -> Self {
        Self { step, source }
    }
}

pub struct SweepController<E: ScpiEndpoint> {
    settings: Settings,
    retry: RetryPolicy,
    endpoint: E,
}

impl<E: ScpiEndpoint> SweepController<E> {
    /// Takes exclusive ownership of an already-open session for the
    /// sweep's duration. Settings are read here once and are immutable
    /// for the run.
    pub fn new(settings: Settings, endpoint: E) -> Self {
        let retry = RetryPolicy {
            max_attempts: settings.max_retries,
            delay: settings.retry_delay(),
        };
        Self {
            settings,
            retry,
            endpoint,
        }
    }

    /// Runs the full sweep: bands outer loop, power levels inner loop,
    /// both in configuration order, no reordering or deduplication.
    /// The session is closed before returning.
    pub fn run(&mut self) -> SweepReport {
        self.endpoint.set_timeout(self.settings.timeout());

        match self.endpoint.identify() {
            Ok(idn) => info!("Connected instrument: {}", idn),
            Err(e) => warn!("Identity query failed: {}", e),
        }

        let bands = self.settings.bands.clone();
        let powers = self.settings.power_levels.clone();
        let mut report = SweepReport::default();

        for band in &bands {
            for &power in &powers {
                let point = SweepPoint::new(band.clone(), power);
                info!("Sweep point {} starting", point);
                match self.run_point(&point) {
                    Ok(record) => {
                        info!(
                            "Sweep point {} done: RSRP {} dBm, RSRQ {} dB, DL {:.2} Mbps, UL {:.2} Mbps",
                            point, record.rsrp_dbm, record.rsrq_db, record.dl_mbps, record.ul_mbps
                        );
                        report.records.push(record);
                    }
                    Err(e) => {
                        error!(
                            "Sweep point {} failed during {}: {}",
                            point, e.step, e.source
                        );
                        report.failures.push(PointFailure {
                            point,
                            step: e.step,
                            cause: e.source.to_string(),
                        });
                    }
                }
            }
        }

        if let Err(e) = self.endpoint.close() {
            warn!("Failed to close instrument session: {}", e);
        }
        report
    }

    /// Access to the owned endpoint, mainly for post-run inspection in
    /// tests and the dry-run summary.
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// One point through the state machine. Teardown runs whether or
    /// not the measurement phase succeeded.
    fn run_point(&mut self, point: &SweepPoint) -> Result<MeasurementRecord, PointError> {
        let result = self.measure_point(point);
        self.teardown(point);
        result
    }

    fn measure_point(&mut self, point: &SweepPoint) -> Result<MeasurementRecord, PointError> {
        // Reset
        self.endpoint
            .write(scpi::RESET)
            .map_err(|e| PointError::at(SweepStep::Reset, e))?;

        // Configure. No readback gate here: the instrument reports
        // configuration errors through its error queue, sampled below
        // according to the configured policy.
        self.endpoint
            .write(&scpi::configure_band(&point.band))
            .map_err(|e| PointError::at(SweepStep::Configure, e))?;
        self.endpoint
            .write(&scpi::configure_power(point.power_dbm))
            .map_err(|e| PointError::at(SweepStep::Configure, e))?;
        self.check_instrument_errors(point, "configure")
            .map_err(|e| PointError::at(SweepStep::Configure, e))?;

        // Cell enable
        self.endpoint
            .write(scpi::CELL_ON)
            .map_err(|e| PointError::at(SweepStep::CellEnable, e))?;

        // Await attach: readiness needs both UE addresses free of the
        // unavailable marker. Exhaustion degrades, it does not fail the
        // point: the addresses are diagnostic only.
        let attach = self
            .await_attach()
            .map_err(|e| PointError::at(SweepStep::AwaitAttach, e))?;
        if attach.ready {
            info!(
                "{}: UE attached, IPv4 {}, IPv6 {}",
                point, attach.first, attach.second
            );
        } else {
            warn!(
                "{}: UE addresses still unavailable after {} attempts, continuing",
                point, attach.attempts
            );
        }

        // UE identity, informational only.
        match self.query_ue_identity() {
            Ok((imei, imsi)) => info!("{}: UE IMEI {}, IMSI {}", point, imei, imsi),
            Err(e) if SweepStep::UeInfo.policy() == StepPolicy::Tolerate => {
                warn!("{}: UE identity query failed: {}", point, e)
            }
            Err(e) => return Err(PointError::at(SweepStep::UeInfo, e)),
        }

        // Report enable: four directives, issued unconditionally.
        for cmd in [
            scpi::REPORT_INTERVAL,
            scpi::REPORT_GAP_ENABLE,
            scpi::REPORT_GAP_PERIOD,
            scpi::REPORT_ON,
        ] {
            self.endpoint
                .write(cmd)
                .map_err(|e| PointError::at(SweepStep::ReportEnable, e))?;
            self.check_instrument_errors(point, cmd)
                .map_err(|e| PointError::at(SweepStep::ReportEnable, e))?;
        }

        // Await report, then measure. Exhausted retries substitute the
        // sentinel value 0 for both metrics rather than failing the
        // point: mark and continue, not silent data loss.
        let outcome = self
            .await_report()
            .map_err(|e| PointError::at(SweepStep::AwaitReport, e))?;
        let (rsrp, rsrq) = if outcome.ready {
            let rsrp = parse_numeric(scpi::RSRP, &outcome.first)
                .map_err(|e| PointError::at(SweepStep::Measure, e))?;
            let rsrq = parse_numeric(scpi::RSRQ, &outcome.second)
                .map_err(|e| PointError::at(SweepStep::Measure, e))?;
            (rsrp, rsrq)
        } else {
            warn!(
                "{}: RSRP/RSRQ unavailable after {} attempts, recording sentinel 0",
                point, outcome.attempts
            );
            (0.0, 0.0)
        };

        let dl_kbps = self
            .query_numeric(scpi::DL_THROUGHPUT)
            .map_err(|e| PointError::at(SweepStep::Measure, e))?;
        let ul_kbps = self
            .query_numeric(scpi::UL_THROUGHPUT)
            .map_err(|e| PointError::at(SweepStep::Measure, e))?;

        Ok(MeasurementRecord::capture(point, rsrp, rsrq, dl_kbps, ul_kbps))
    }

    /// Disable the cell and the UE report regardless of how the
    /// measurement phase ended, so the instrument is never left
    /// enabled for the next point. Teardown failures are logged, never
    /// escalated.
    fn teardown(&mut self, point: &SweepPoint) {
        for cmd in [scpi::CELL_OFF, scpi::REPORT_OFF] {
            if let Err(e) = self.endpoint.write(cmd) {
                warn!("{}: teardown directive '{}' failed: {}", point, cmd, e);
            }
        }
    }

    fn await_attach(&mut self) -> AppResult<PollOutcome> {
        let retry = self.retry.clone();
        poll_pair(
            &retry,
            || {
                let v4 = self
                    .endpoint
                    .query_with_timeout(scpi::UE_IPV4, ATTACH_QUERY_TIMEOUT)?;
                let v6 = self
                    .endpoint
                    .query_with_timeout(scpi::UE_IPV6, ATTACH_QUERY_TIMEOUT)?;
                Ok((v4, v6))
            },
            both_available,
        )
    }

    fn await_report(&mut self) -> AppResult<PollOutcome> {
        let retry = self.retry.clone();
        poll_pair(
            &retry,
            || {
                let rsrp = self
                    .endpoint
                    .query_with_timeout(scpi::RSRP, REPORT_QUERY_TIMEOUT)?;
                let rsrq = self
                    .endpoint
                    .query_with_timeout(scpi::RSRQ, REPORT_QUERY_TIMEOUT)?;
                Ok((rsrp, rsrq))
            },
            both_available,
        )
    }

    fn query_ue_identity(&mut self) -> AppResult<(String, String)> {
        let imei = self.endpoint.query(scpi::UE_IMEI)?;
        let imsi = self.endpoint.query(scpi::UE_IMSI)?;
        Ok((imei, imsi))
    }

    fn query_numeric(&mut self, cmd: &str) -> AppResult<f64> {
        let response = self.endpoint.query(cmd)?;
        parse_numeric(cmd, &response)
    }

    /// Samples the instrument error queue according to the configured
    /// policy. `context` names the directive(s) the check follows.
    fn check_instrument_errors(&mut self, point: &SweepPoint, context: &str) -> AppResult<()> {
        if self.settings.error_check == ErrorCheckPolicy::Off {
            return Ok(());
        }
        let response = self
            .endpoint
            .query_with_timeout(scpi::SYSTEM_ERROR, ERROR_QUERY_TIMEOUT)?;
        if is_no_error(&response) {
            return Ok(());
        }
        match self.settings.error_check {
            ErrorCheckPolicy::Off => Ok(()),
            ErrorCheckPolicy::Log => {
                warn!(
                    "{}: instrument reported after {}: {}",
                    point, context, response
                );
                Ok(())
            }
            ErrorCheckPolicy::AbortPoint => Err(SweepError::Instrument(format!(
                "error queue after {}: {}",
                context, response
            ))),
        }
    }
}

/// SCPI error-queue replies start with a numeric code; `0` means empty.
fn is_no_error(response: &str) -> bool {
    matches!(
        response.trim().split(',').next().map(str::trim),
        Some("0") | Some("+0")
    )
}

fn parse_numeric(command: &str, response: &str) -> AppResult<f64> {
    response
        .trim()
        .parse::<f64>()
        .map_err(|e| SweepError::Parse {
            command: command.to_string(),
            response: response.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::MockEndpoint;

    fn fast_settings(bands: &[&str], powers: &[f64]) -> Settings {
        Settings {
            bands: bands.iter().map(|b| b.to_string()).collect(),
            power_levels: powers.to_vec(),
            retry_delay_ms: 1,
            max_retries: 3,
            ..Settings::default()
        }
    }

    #[test]
    fn test_single_point_happy_path() {
        let mut mock = MockEndpoint::new();
        mock.set_response(scpi::UE_IPV4, "10.1.2.3")
            .set_response(scpi::UE_IPV6, "fe80::1")
            .set_response(scpi::RSRP, "-85.5")
            .set_response(scpi::RSRQ, "-10.3")
            .set_response(scpi::DL_THROUGHPUT, "12345")
            .set_response(scpi::UL_THROUGHPUT, "6789")
            .set_response(scpi::SYSTEM_ERROR, "0,\"No error\"");

        let mut controller = SweepController::new(fast_settings(&["OB3"], &[-20.0]), mock);
        let report = controller.run();

        assert_eq!(report.records.len(), 1);
        assert!(report.failures.is_empty());
        let record = &report.records[0];
        assert_eq!(record.rsrp_dbm, -85.5);
        assert_eq!(record.rsrq_db, -10.3);
        assert!((record.dl_mbps - 12.345).abs() < 1e-9);
        assert!((record.ul_mbps - 6.789).abs() < 1e-9);
    }

    #[test]
    fn test_error_check_off_never_queries_error_queue() {
        let mut mock = MockEndpoint::new();
        mock.set_response(scpi::SYSTEM_ERROR, "-113,\"Undefined header\"");

        let mut settings = fast_settings(&["OB1"], &[-50.0]);
        settings.error_check = ErrorCheckPolicy::Off;
        let mut controller = SweepController::new(settings, mock);
        let report = controller.run();

        assert_eq!(report.records.len(), 1);
        assert!(!controller.endpoint().was_sent(scpi::SYSTEM_ERROR));
    }

    #[test]
    fn test_error_check_log_tolerates_reported_error() {
        let mut mock = MockEndpoint::new();
        mock.set_response(scpi::SYSTEM_ERROR, "-113,\"Undefined header\"");

        let mut controller = SweepController::new(fast_settings(&["OB1"], &[-50.0]), mock);
        let report = controller.run();

        assert_eq!(report.records.len(), 1);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_error_check_abort_point_fails_the_point() {
        let mut mock = MockEndpoint::new();
        mock.set_response(scpi::SYSTEM_ERROR, "-113,\"Undefined header\"");

        let mut settings = fast_settings(&["OB1"], &[-50.0]);
        settings.error_check = ErrorCheckPolicy::AbortPoint;
        let mut controller = SweepController::new(settings, mock);
        let report = controller.run();

        assert!(report.records.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].step, SweepStep::Configure);
        // Teardown still ran for the aborted point.
        assert!(controller.endpoint().was_sent(scpi::CELL_OFF));
        assert!(controller.endpoint().was_sent(scpi::REPORT_OFF));
    }

    #[test]
    fn test_attach_exhaustion_degrades_but_completes() {
        let mut mock = MockEndpoint::new();
        mock.set_response(scpi::UE_IPV4, "NAV")
            .set_response(scpi::UE_IPV6, "NAV")
            .set_response(scpi::RSRP, "-90.0")
            .set_response(scpi::RSRQ, "-12.0")
            .set_response(scpi::DL_THROUGHPUT, "1000")
            .set_response(scpi::UL_THROUGHPUT, "500");

        let mut controller = SweepController::new(fast_settings(&["OB7"], &[-70.0]), mock);
        let report = controller.run();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].rsrp_dbm, -90.0);
        // max_retries = 3 → exactly three IPv4 attempts.
        assert_eq!(controller.endpoint().count_of(scpi::UE_IPV4), 3);
    }

    #[test]
    fn test_ue_identity_failure_is_tolerated() {
        let mut mock = MockEndpoint::new();
        mock.fail_on(scpi::UE_IMEI, 1);

        let mut controller = SweepController::new(fast_settings(&["OB1"], &[-50.0]), mock);
        let report = controller.run();

        assert_eq!(report.records.len(), 1);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_is_no_error() {
        assert!(is_no_error("0,\"No error\""));
        assert!(is_no_error("+0,\"No error\""));
        assert!(is_no_error("0"));
        assert!(!is_no_error("-113,\"Undefined header\""));
    }

    #[test]
    fn test_parse_numeric_failure_names_command() {
        let err = parse_numeric(scpi::RSRP, "garbage").unwrap_err();
        match err {
            SweepError::Parse { command, .. } => assert_eq!(command, scpi::RSRP),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
