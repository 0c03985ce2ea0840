//! Read-only snapshots of devices, device models and plugins.
//!
//! Snapshots are fetched from the persistence layer once per decision cycle.
//! Nothing in this crate mutates them; derived values are recomputed on demand.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::telemetry::{battery_percent, wifi_bars};
use crate::window::TimeWindow;

/// Device primary key.
pub type DeviceId = u64;

/// Device model primary key.
pub type DeviceModelId = u64;

/// Plugin primary key.
pub type PluginId = u64;

/// A device as last seen by the server.
///
/// # Example
///
/// ```
/// use trmnl_engine::DeviceSnapshot;
///
/// let device = DeviceSnapshot::new(1)
///     .with_battery_voltage(3.6)
///     .with_rssi(-70);
///
/// assert_eq!(device.battery_percent(), 50);
/// assert_eq!(device.wifi_bars(), 2);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Device ID
    pub id: DeviceId,

    /// Friendly name
    #[serde(default)]
    pub name: Option<String>,

    /// Last reported battery voltage in volts (unclamped)
    #[serde(default)]
    pub last_battery_voltage: f64,

    /// Last reported WiFi RSSI in dBm (unclamped)
    #[serde(default)]
    pub last_rssi_level: i32,

    /// Whether the nightly sleep window is honored
    #[serde(default)]
    pub sleep_mode_enabled: bool,

    /// Sleep window start (local time)
    #[serde(default)]
    pub sleep_mode_from: Option<NaiveTime>,

    /// Sleep window end (local time)
    #[serde(default)]
    pub sleep_mode_to: Option<NaiveTime>,

    /// Refresh interval in seconds when no playlist overrides it
    #[serde(default)]
    pub default_refresh_interval: Option<u32>,

    /// Device model this device uses, if any
    #[serde(default)]
    pub device_model_id: Option<DeviceModelId>,

    /// Display width override
    #[serde(default)]
    pub width: Option<u32>,

    /// Display height override
    #[serde(default)]
    pub height: Option<u32>,

    /// Display rotation override in degrees
    #[serde(default)]
    pub rotate: Option<i32>,

    /// Explicit output image format (e.g. "png_8bit_grayscale")
    #[serde(default)]
    pub image_format: Option<String>,

    /// Cache key of the image currently shown
    #[serde(default)]
    pub current_screen_image: Option<String>,

    /// Device whose screen this device mirrors
    #[serde(default)]
    pub mirror_device_id: Option<DeviceId>,

    /// Whether display requests are proxied to the TRMNL cloud
    #[serde(default)]
    pub proxy_cloud: bool,

    /// Last response received when proxying to the TRMNL cloud
    #[serde(default)]
    pub proxy_cloud_response: Option<Value>,

    /// Last log payload the device posted
    #[serde(default)]
    pub last_log_request: Option<Value>,
}

impl DeviceSnapshot {
    /// Create a device snapshot with defaults for every other field.
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Set battery voltage.
    #[must_use]
    pub fn with_battery_voltage(mut self, voltage: f64) -> Self {
        self.last_battery_voltage = voltage;
        self
    }

    /// Set WiFi RSSI.
    #[must_use]
    pub fn with_rssi(mut self, rssi: i32) -> Self {
        self.last_rssi_level = rssi;
        self
    }

    /// Enable sleep mode between `from` and `to`.
    #[must_use]
    pub fn with_sleep_mode(mut self, from: NaiveTime, to: NaiveTime) -> Self {
        self.sleep_mode_enabled = true;
        self.sleep_mode_from = Some(from);
        self.sleep_mode_to = Some(to);
        self
    }

    /// Reference a device model.
    #[must_use]
    pub fn with_device_model(mut self, model: DeviceModelId) -> Self {
        self.device_model_id = Some(model);
        self
    }

    /// Override display dimensions.
    #[must_use]
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Override display rotation.
    #[must_use]
    pub fn with_rotation(mut self, degrees: i32) -> Self {
        self.rotate = Some(degrees);
        self
    }

    /// Set the explicit image format.
    #[must_use]
    pub fn with_image_format(mut self, format: impl Into<String>) -> Self {
        self.image_format = Some(format.into());
        self
    }

    /// Set the currently shown image key.
    #[must_use]
    pub fn with_screen_image(mut self, key: impl Into<String>) -> Self {
        self.current_screen_image = Some(key.into());
        self
    }

    /// Mirror another device's screen.
    #[must_use]
    pub fn with_mirror(mut self, device: DeviceId) -> Self {
        self.mirror_device_id = Some(device);
        self
    }

    /// Proxy display requests to the TRMNL cloud.
    #[must_use]
    pub fn with_proxy_cloud(mut self, enabled: bool) -> Self {
        self.proxy_cloud = enabled;
        self
    }

    /// Battery percentage (0-100).
    pub fn battery_percent(&self) -> u8 {
        battery_percent(self.last_battery_voltage)
    }

    /// WiFi bars (0-3).
    pub fn wifi_bars(&self) -> u8 {
        wifi_bars(self.last_rssi_level)
    }

    /// The configured sleep window, if sleep mode is enabled and complete.
    pub fn sleep_window(&self) -> Option<TimeWindow> {
        if !self.sleep_mode_enabled {
            return None;
        }
        match (self.sleep_mode_from, self.sleep_mode_to) {
            (Some(from), Some(to)) => Some(TimeWindow::new(from, to)),
            _ => None,
        }
    }

    /// Seconds until the sleep window ends, or `None` when not sleeping.
    pub fn sleep_mode_ends_in_seconds(&self, now: NaiveDateTime) -> Option<u32> {
        self.sleep_window()
            .and_then(|window| window.seconds_until_end(now.time()))
    }

    /// Whether the device has display settings other than the system defaults.
    ///
    /// Missing overrides count as defaults.
    pub fn has_custom_display(&self) -> bool {
        self.width.is_some_and(|w| w != crate::DISPLAY_WIDTH)
            || self.height.is_some_and(|h| h != crate::DISPLAY_HEIGHT)
            || self.rotate.is_some_and(|r| r != crate::DEFAULT_ROTATION)
    }

    /// Whether the cloud asked this device to update its firmware.
    pub fn update_firmware(&self) -> bool {
        self.proxy_cloud_response
            .as_ref()
            .and_then(|response| response.get("update_firmware"))
            .is_some_and(is_truthy)
    }

    /// Firmware binary URL from the last cloud response.
    pub fn firmware_url(&self) -> Option<&str> {
        self.proxy_cloud_response
            .as_ref()
            .and_then(|response| response.get("firmware_url"))
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
    }

    /// Cloud response with the firmware update flag cleared.
    ///
    /// Returns `None` when there is no response to update. The caller
    /// persists the returned value.
    pub fn reset_update_firmware_flag(&self) -> Option<Value> {
        let mut response = match self.proxy_cloud_response.clone()? {
            Value::Object(object) => object,
            _ => serde_json::Map::new(),
        };
        response.insert("update_firmware".to_string(), Value::Bool(false));
        Some(Value::Object(response))
    }
}

/// Loose truthiness for JSON flags sent by the cloud.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Authoritative display description for a family of devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceModelSnapshot {
    /// Model ID
    pub id: DeviceModelId,
    /// Model name (e.g. "og_png")
    #[serde(default)]
    pub name: Option<String>,
    /// Display width in pixels
    pub width: u32,
    /// Display height in pixels
    pub height: u32,
    /// Number of colors the panel can show
    pub colors: u32,
    /// Bits per pixel
    pub bit_depth: u8,
    /// Render scale factor
    pub scale_factor: f64,
    /// Rotation in degrees
    pub rotation: i32,
    /// Output MIME type
    pub mime_type: String,
    /// Horizontal offset in pixels
    pub offset_x: i32,
    /// Vertical offset in pixels
    pub offset_y: i32,
}

/// How a plugin gets its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataStrategy {
    /// Server polls `polling_url`
    Polling,
    /// Data is pushed to the server
    Webhook,
}

/// HTTP verb used when polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollingVerb {
    /// GET request
    Get,
    /// POST request
    Post,
}

/// A plugin as last seen by the server.
///
/// The engine only inspects `current_image`; the remaining fields travel
/// along for the renderer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginSnapshot {
    /// Plugin ID
    pub id: PluginId,
    /// Plugin name
    #[serde(default)]
    pub name: Option<String>,
    /// Cache key of the last rendered image
    #[serde(default)]
    pub current_image: Option<String>,
    /// Data source strategy
    #[serde(default)]
    pub data_strategy: Option<DataStrategy>,
    /// Minutes before fetched data is considered stale
    #[serde(default)]
    pub data_stale_minutes: Option<u32>,
    /// URL polled for data
    #[serde(default)]
    pub polling_url: Option<String>,
    /// Verb used for polling
    #[serde(default)]
    pub polling_verb: Option<PollingVerb>,
    /// Extra header sent when polling
    #[serde(default)]
    pub polling_header: Option<String>,
}

impl PluginSnapshot {
    /// Create a plugin snapshot with the given cached image key.
    pub fn new(id: PluginId, current_image: Option<&str>) -> Self {
        Self {
            id,
            current_image: current_image.map(str::to_string),
            ..Default::default()
        }
    }
}
