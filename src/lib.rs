//! # trmnl-engine
//!
//! Rendering decisions for a [TRMNL](https://usetrmnl.com) e-ink dashboard server.
//!
//! Given snapshots of devices, device models, playlists and plugins, this crate
//! decides:
//! - How healthy a device is (battery percentage, WiFi bars)
//! - Whether a device is asleep, and for how long
//! - Which playlist item a device shows next
//! - Which image settings and output format the renderer should use
//! - When a shared rendered image must be thrown away, and which stored
//!   renders are orphaned
//!
//! Persistence, HTTP, and the rasterizer itself live elsewhere. The engine
//! talks to them through the [`SnapshotStore`] and [`CacheStorage`] traits.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use trmnl_engine::{
//!     plan_display, resolve, DeviceSnapshot, PlaylistItemSnapshot, PlaylistSnapshot,
//! };
//!
//! let device = DeviceSnapshot::new(1)
//!     .with_battery_voltage(3.9)
//!     .with_rssi(-65);
//! let playlists = vec![PlaylistSnapshot::new(1).with_item(PlaylistItemSnapshot::new(10, 42))];
//! let now = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
//!
//! let plan = plan_display(&device, &playlists, now, 900);
//! let settings = resolve(&device, None);
//!
//! assert_eq!(plan.item.map(|item| item.plugin_id), Some(42));
//! assert_eq!((settings.width, settings.height), (800, 480));
//! assert_eq!(device.battery_percent(), 75);
//! assert_eq!(device.wifi_bars(), 2);
//! ```
//!
//! ## Image Settings
//!
//! | Source | When | Fields |
//! |--------|------|--------|
//! | Device model | device references one | all, verbatim |
//! | Device | no model | width, height, rotation, image format |
//! | Defaults | field still missing | 800x480, 2 colors, 1-bit PNG |
//!
//! ## Feature Flags
//!
//! - `sweep` (default) - Background cache cleanup daemon on tokio

mod cache;
mod clock;
pub mod config;
mod device_log;
mod display;
mod error;
mod format;
mod model;
mod playlist;
mod settings;
mod sweep;
mod telemetry;
pub mod window;

#[cfg(test)]
mod test_support;

pub use cache::{active_cache_keys, is_cacheable, CacheInvalidator, PluginLocks, SnapshotStore};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{CacheConfig, EngineConfig};
pub use device_log::{DeviceLogEntry, DeviceStatusStamp, LogLevel};
pub use display::{plan_display, screen_image_key, DisplayPlan};
pub use error::Error;
pub use format::{classify, ImageFormat, UnknownImageFormat};
pub use model::{
    DataStrategy, DeviceId, DeviceModelId, DeviceModelSnapshot, DeviceSnapshot, PluginId,
    PluginSnapshot, PollingVerb,
};
pub use playlist::{
    next_item, next_selection, PlaylistId, PlaylistItemId, PlaylistItemSnapshot, PlaylistSnapshot,
    Schedulable, Selection,
};
pub use settings::{resolve, EffectiveImageSettings};
pub use sweep::{
    CacheStorage, CacheSweeper, CachedImage, CleanupReport, FsCacheStorage, DEFAULT_GRACE_PERIOD,
    RENDER_EXTENSIONS,
};
pub use telemetry::{battery_percent, wifi_bars};
pub use window::{ActiveWindow, DaySelector, TimeWindow};

#[cfg(feature = "sweep")]
pub use sweep::run_cleanup_daemon;

/// Default display width in pixels
pub const DISPLAY_WIDTH: u32 = 800;

/// Default display height in pixels
pub const DISPLAY_HEIGHT: u32 = 480;

/// Default display rotation in degrees
pub const DEFAULT_ROTATION: i32 = 0;

/// Default number of colors
pub const DEFAULT_COLORS: u32 = 2;

/// Default bits per pixel
pub const DEFAULT_BIT_DEPTH: u8 = 1;

/// Default render scale factor
pub const DEFAULT_SCALE_FACTOR: f64 = 1.0;

/// Default output MIME type
pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// Li-ion battery minimum voltage (0%)
pub const BATTERY_MIN_VOLTS: f64 = 3.0;

/// Li-ion battery maximum voltage (100%)
pub const BATTERY_MAX_VOLTS: f64 = 4.2;

/// Seconds until the sleep window ends, or `None` when not sleeping.
///
/// `from > to` means the window wraps past midnight. Pass `None` for the
/// window when sleep mode is disabled.
///
/// # Example
///
/// ```
/// use chrono::NaiveTime;
/// use trmnl_engine::{sleep_ends_in_seconds, TimeWindow};
///
/// let window = TimeWindow::new(
///     NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
///     NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
/// );
/// let now = NaiveTime::from_hms_opt(12, 13, 0).unwrap();
///
/// assert_eq!(sleep_ends_in_seconds(now, Some(window)), Some(2820));
/// assert_eq!(sleep_ends_in_seconds(now, None), None);
/// ```
pub fn sleep_ends_in_seconds(now: chrono::NaiveTime, window: Option<TimeWindow>) -> Option<u32> {
    window.and_then(|window| window.seconds_until_end(now))
}
