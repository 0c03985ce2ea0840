//! Device log entries posted by the firmware.
//!
//! The firmware batches log lines with a status snapshot of the device.
//! These types read that payload and interpret the telemetry in it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::telemetry::{battery_percent, wifi_bars};

/// Severity of a device log line, derived from its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Message mentions an error
    Error,
    /// Message mentions a warning
    Warning,
    /// Everything else
    Info,
}

impl LogLevel {
    /// Classify a log message. "error" wins over "warning".
    pub fn classify(message: &str) -> Self {
        let message = message.to_lowercase();
        if message.contains("error") {
            LogLevel::Error
        } else if message.contains("warning") {
            LogLevel::Warning
        } else {
            LogLevel::Info
        }
    }
}

/// One log entry from the device.
///
/// # Example
///
/// ```
/// use trmnl_engine::{DeviceLogEntry, LogLevel};
///
/// let json = r#"{"creation_timestamp": 1704067200, "log_message": "WiFi connection error"}"#;
/// let entry: DeviceLogEntry = serde_json::from_str(json).unwrap();
///
/// assert_eq!(entry.level(), LogLevel::Error);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceLogEntry {
    /// Unix timestamp on the device clock
    #[serde(default)]
    pub creation_timestamp: Option<i64>,

    /// Log message text
    #[serde(default)]
    pub log_message: String,

    /// Device status snapshot
    #[serde(default)]
    pub device_status_stamp: Option<DeviceStatusStamp>,

    /// Any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl DeviceLogEntry {
    /// Severity of this entry.
    pub fn level(&self) -> LogLevel {
        LogLevel::classify(&self.log_message)
    }

    /// Device time of this entry.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.creation_timestamp
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
    }
}

/// Device status snapshot attached to log entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceStatusStamp {
    /// Battery voltage
    #[serde(default)]
    pub battery_voltage: Option<f64>,

    /// WiFi signal strength
    #[serde(default)]
    pub wifi_rssi_level: Option<i32>,

    /// WiFi connection state (e.g. "connected")
    #[serde(default)]
    pub wifi_status: Option<String>,

    /// Current refresh rate
    #[serde(default)]
    pub refresh_rate: Option<u32>,

    /// Firmware version
    #[serde(default)]
    pub current_fw_version: Option<String>,
}

impl DeviceStatusStamp {
    /// Battery percentage, if the stamp carries a voltage.
    pub fn battery_percent(&self) -> Option<u8> {
        self.battery_voltage.map(battery_percent)
    }

    /// WiFi bars, if the stamp carries an RSSI.
    pub fn wifi_bars(&self) -> Option<u8> {
        self.wifi_rssi_level.map(wifi_bars)
    }
}
