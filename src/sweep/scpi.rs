//! CMW500 LTE signalling command vocabulary.
//!
//! The exact command strings are instrument-specific and passed
//! through verbatim; the controller does not validate their syntax.
//! Long/short SCPI forms follow the instrument manual's notation
//! (uppercase = mandatory short form).

/// Full preset: reset, operation-complete, clear status.
pub const RESET: &str = "*RST;*OPC;*CLS";

/// Pop one entry from the instrument error queue.
pub const SYSTEM_ERROR: &str = "SYST:ERR?";

/// Downlink LTE cell on/off.
pub const CELL_ON: &str = "SOURce:LTE:SIGN:CELL:STATe ON";
pub const CELL_OFF: &str = "SOURce:LTE:SIGN:CELL:STATe OFF";

/// UE network addresses, populated only once the UE has attached.
pub const UE_IPV4: &str = "SENSe:LTE:SIGN:UESinfo:UEADdress:IPV4?";
pub const UE_IPV6: &str = "SENSe:LTE:SIGN:UESinfo:UEADdress:IPV6?";

/// UE identity, informational.
pub const UE_IMEI: &str = "SENSe:LTE:SIGN1:UESinfo:IMEI?";
pub const UE_IMSI: &str = "SENSe:LTE:SIGN1:UESinfo:IMSI?";

/// UE measurement-report configuration, issued unconditionally before
/// the report wait: 640 ms reporting interval, measurement gaps every
/// 40 ms, then report enable.
pub const REPORT_INTERVAL: &str = "CONFigure:LTE:SIGN1:UEReport:RINTerval I640";
pub const REPORT_GAP_ENABLE: &str = "CONFigure:LTE:SIGN1:UEReport:MGENable ON";
pub const REPORT_GAP_PERIOD: &str = "CONFigure:LTE:SIGN1:UEReport:MGPeriod G040";
pub const REPORT_ON: &str = "CONFigure:LTE:SIGN1:UEReport:ENABle ON";
pub const REPORT_OFF: &str = "CONFigure:LTE:SIGN1:UEReport:ENABle OFF";

/// Reported signal metrics; `NAV` until the report populates.
pub const RSRP: &str = "SENSe:LTE:SIGN1:UEReport:PCC:RSRP?";
pub const RSRQ: &str = "SENSe:LTE:SIGN1:UEReport:PCC:RSRQ?";

/// Extended throughput counters, raw readings in kbps.
pub const DL_THROUGHPUT: &str = "SENSe:LTE:SIGN1:CONNection:ETHRoughput:DL:ALL?";
pub const UL_THROUGHPUT: &str = "SENSe:LTE:SIGN1:CONNection:ETHRoughput:UL:ALL?";

/// Operating-band selection for the primary component carrier.
pub fn configure_band(band: &str) -> String {
    format!("CONFigure:LTE:SIGN:PCC:BAND {}", band)
}

/// Downlink RS EPRE power level in dBm.
pub fn configure_power(level_dbm: f64) -> String {
    format!("CONFigure:LTE:SIGN:DL:PCC:RSEPre:LEVel {}", level_dbm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_command_formatting() {
        assert_eq!(configure_band("OB3"), "CONFigure:LTE:SIGN:PCC:BAND OB3");
    }

    #[test]
    fn test_power_command_formatting() {
        assert_eq!(
            configure_power(-70.0),
            "CONFigure:LTE:SIGN:DL:PCC:RSEPre:LEVel -70"
        );
        assert_eq!(
            configure_power(-20.5),
            "CONFigure:LTE:SIGN:DL:PCC:RSEPre:LEVel -20.5"
        );
    }
}
