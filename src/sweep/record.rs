//! Sweep data model: points, completed measurements, failures, and the
//! per-step failure-handling classification.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// One (band, power level) configuration exercised end-to-end. The
/// pair is the natural key; duplicates in configuration simply re-run.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPoint {
    pub band: String,
    pub power_dbm: f64,
}

impl SweepPoint {
    pub fn new(band: impl Into<String>, power_dbm: f64) -> Self {
        Self {
            band: band.into(),
            power_dbm,
        }
    }
}

impl fmt::Display for SweepPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} dBm", self.band, self.power_dbm)
    }
}

/// A completed measurement for one sweep point.
///
/// RSRP/RSRQ are stored sign-normalized: both metrics are reported in
/// (negative) dBm/dB by convention, and some instrument firmware
/// revisions omit the sign, so the stored value is forced non-positive.
/// Throughputs are stored in Mbps, derived from the instrument's raw
/// kbps readings.
#[derive(Debug, Clone, Serialize)]
pub struct MeasurementRecord {
    pub timestamp: DateTime<Utc>,
    pub band: String,
    pub power_dbm: f64,
    pub rsrp_dbm: f64,
    pub rsrq_db: f64,
    pub dl_mbps: f64,
    pub ul_mbps: f64,
}

impl MeasurementRecord {
    /// Assembles a record at the capture instant, applying the sign
    /// normalization to RSRP/RSRQ and the kbps→Mbps conversion to the
    /// raw throughput readings.
    pub fn capture(point: &SweepPoint, rsrp: f64, rsrq: f64, dl_kbps: f64, ul_kbps: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            band: point.band.clone(),
            power_dbm: point.power_dbm,
            rsrp_dbm: normalize_signal_level(rsrp),
            rsrq_db: normalize_signal_level(rsrq),
            dl_mbps: kbps_to_mbps(dl_kbps),
            ul_mbps: kbps_to_mbps(ul_kbps),
        }
    }
}

/// Forces a signal-level reading non-positive. Idempotent: already
/// negative values pass through unchanged.
pub fn normalize_signal_level(value: f64) -> f64 {
    if value > 0.0 {
        -value
    } else {
        value
    }
}

/// Converts a raw kbps reading to Mbps.
pub fn kbps_to_mbps(kbps: f64) -> f64 {
    kbps * 1e-3
}

/// A sweep point that did not complete, with enough context to
/// reproduce: which point, which step, and the cause.
#[derive(Debug, Clone)]
pub struct PointFailure {
    pub point: SweepPoint,
    pub step: SweepStep,
    pub cause: String,
}

/// Steps of the per-point state machine, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStep {
    Reset,
    Configure,
    CellEnable,
    AwaitAttach,
    UeInfo,
    ReportEnable,
    AwaitReport,
    Measure,
    Teardown,
}

impl fmt::Display for SweepStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SweepStep::Reset => "reset",
            SweepStep::Configure => "configure",
            SweepStep::CellEnable => "cell-enable",
            SweepStep::AwaitAttach => "await-attach",
            SweepStep::UeInfo => "ue-info",
            SweepStep::ReportEnable => "report-enable",
            SweepStep::AwaitReport => "await-report",
            SweepStep::Measure => "measure",
            SweepStep::Teardown => "teardown",
        };
        f.write_str(name)
    }
}

/// How a failure in a given step is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    /// Log and move on; the step is informational only.
    Tolerate,
    /// On retry exhaustion, continue in degraded form (warning or
    /// sentinel values). Transport errors still abort the point.
    Degrade,
    /// A failure here fails the current point; the sweep continues
    /// with the next point.
    AbortPoint,
}

impl SweepStep {
    /// The per-step failure classification. Making this an explicit
    /// table keeps the tolerate/degrade/abort decisions out of the
    /// control flow.
    pub fn policy(self) -> StepPolicy {
        match self {
            SweepStep::Reset => StepPolicy::AbortPoint,
            SweepStep::Configure => StepPolicy::AbortPoint,
            SweepStep::CellEnable => StepPolicy::AbortPoint,
            // Address availability is diagnostic; the measurement steps
            // do not depend on it.
            SweepStep::AwaitAttach => StepPolicy::Degrade,
            SweepStep::UeInfo => StepPolicy::Tolerate,
            SweepStep::ReportEnable => StepPolicy::AbortPoint,
            // Missing signal metrics become sentinel values, never a
            // sweep abort.
            SweepStep::AwaitReport => StepPolicy::Degrade,
            SweepStep::Measure => StepPolicy::AbortPoint,
            // Teardown must never escalate an otherwise-completed point.
            SweepStep::Teardown => StepPolicy::Tolerate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_normalization_flips_positive() {
        assert_eq!(normalize_signal_level(5.0), -5.0);
    }

    #[test]
    fn test_sign_normalization_is_idempotent() {
        assert_eq!(normalize_signal_level(-5.0), -5.0);
        assert_eq!(normalize_signal_level(normalize_signal_level(5.0)), -5.0);
        assert_eq!(normalize_signal_level(0.0), 0.0);
    }

    #[test]
    fn test_kbps_conversion() {
        assert!((kbps_to_mbps(12345.0) - 12.345).abs() < 1e-9);
        assert_eq!(format!("{:.2}", kbps_to_mbps(12345.0)), "12.35");
        assert_eq!(kbps_to_mbps(0.0), 0.0);
    }

    #[test]
    fn test_capture_applies_conversions() {
        let point = SweepPoint::new("OB3", -20.0);
        let record = MeasurementRecord::capture(&point, 85.5, -10.3, 12345.0, 6789.0);
        assert_eq!(record.band, "OB3");
        assert_eq!(record.power_dbm, -20.0);
        assert_eq!(record.rsrp_dbm, -85.5);
        assert_eq!(record.rsrq_db, -10.3);
        assert!((record.dl_mbps - 12.345).abs() < 1e-9);
        assert!((record.ul_mbps - 6.789).abs() < 1e-9);
    }

    #[test]
    fn test_step_policy_table() {
        assert_eq!(SweepStep::Reset.policy(), StepPolicy::AbortPoint);
        assert_eq!(SweepStep::AwaitAttach.policy(), StepPolicy::Degrade);
        assert_eq!(SweepStep::UeInfo.policy(), StepPolicy::Tolerate);
        assert_eq!(SweepStep::AwaitReport.policy(), StepPolicy::Degrade);
        assert_eq!(SweepStep::Teardown.policy(), StepPolicy::Tolerate);
    }

    #[test]
    fn test_point_display() {
        let point = SweepPoint::new("OB7", -70.0);
        assert_eq!(point.to_string(), "OB7 @ -70 dBm");
    }
}
