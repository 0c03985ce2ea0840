//! Raw device telemetry to user-facing health indicators.
//!
//! Devices report their battery voltage and WiFi RSSI unclamped. Clamping
//! to display ranges happens here and nowhere else.

use crate::{BATTERY_MAX_VOLTS, BATTERY_MIN_VOLTS};

/// Convert battery voltage (in volts) to a percentage.
///
/// Linear between 3.0V (0%) and 4.2V (100%), rounded half away from zero.
/// Values outside the range clamp to 0 or 100.
///
/// # Example
///
/// ```
/// use trmnl_engine::battery_percent;
///
/// assert_eq!(battery_percent(4.2), 100);
/// assert_eq!(battery_percent(3.6), 50);
/// assert_eq!(battery_percent(2.5), 0);
/// ```
pub fn battery_percent(voltage: f64) -> u8 {
    if voltage <= BATTERY_MIN_VOLTS {
        0
    } else if voltage >= BATTERY_MAX_VOLTS {
        100
    } else {
        let percent =
            (voltage - BATTERY_MIN_VOLTS) / (BATTERY_MAX_VOLTS - BATTERY_MIN_VOLTS) * 100.0;
        // NaN falls through both comparisons and saturates to 0 here
        percent.round() as u8
    }
}

/// Convert WiFi RSSI (dBm) to a bar count in `0..=3`.
///
/// A non-negative RSSI means the radio has no connection and reports 0 bars.
/// Boundary values belong to the weaker bucket.
///
/// # Example
///
/// ```
/// use trmnl_engine::wifi_bars;
///
/// assert_eq!(wifi_bars(0), 0);
/// assert_eq!(wifi_bars(-80), 1);
/// assert_eq!(wifi_bars(-60), 2);
/// assert_eq!(wifi_bars(-59), 3);
/// ```
pub fn wifi_bars(rssi: i32) -> u8 {
    if rssi >= 0 {
        0
    } else if rssi <= -80 {
        1
    } else if rssi <= -60 {
        2
    } else {
        3
    }
}
