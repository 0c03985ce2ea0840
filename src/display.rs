//! What a device should do on its next poll.
//!
//! Combines the sleep window, the playlist scheduler and the refresh
//! interval into one decision for the delivery layer.

use chrono::NaiveDateTime;

use crate::model::DeviceSnapshot;
use crate::playlist::{next_selection, PlaylistItemSnapshot, PlaylistSnapshot};

/// Decision for one device poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayPlan {
    /// Item to render, `None` when sleeping or nothing is scheduled
    pub item: Option<PlaylistItemSnapshot>,
    /// Seconds until the device should poll again
    pub refresh_rate: u32,
    /// Whether the device is inside its sleep window
    pub sleeping: bool,
    /// Whether the device should update its firmware
    pub update_firmware: bool,
    /// Firmware binary URL when an update is pending
    pub firmware_url: Option<String>,
}

/// Plan the next display for a device.
///
/// While the sleep window is open no content is selected and the device is
/// told to come back when the window closes. Otherwise the scheduler picks
/// the item and the refresh rate comes from the selected playlist, then the
/// device, then `default_refresh_rate`.
///
/// # Example
///
/// ```
/// use chrono::{NaiveDate, NaiveTime};
/// use trmnl_engine::{plan_display, DeviceSnapshot};
///
/// let device = DeviceSnapshot::new(1).with_sleep_mode(
///     NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
///     NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
/// );
/// let now = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(12, 13, 0).unwrap();
///
/// let plan = plan_display(&device, &[], now, 900);
/// assert!(plan.sleeping);
/// assert_eq!(plan.refresh_rate, 2820);
/// ```
pub fn plan_display(
    device: &DeviceSnapshot,
    playlists: &[PlaylistSnapshot],
    now: NaiveDateTime,
    default_refresh_rate: u32,
) -> DisplayPlan {
    let update_firmware = device.update_firmware();
    let firmware_url = device.firmware_url().map(str::to_string);

    if let Some(wake_in) = device.sleep_mode_ends_in_seconds(now) {
        tracing::debug!(device_id = device.id, wake_in, "Device is sleeping");
        return DisplayPlan {
            item: None,
            refresh_rate: wake_in,
            sleeping: true,
            update_firmware,
            firmware_url,
        };
    }

    let device_rate = device.default_refresh_interval.unwrap_or(default_refresh_rate);
    let (item, refresh_rate) = match next_selection(playlists, now) {
        Some(selection) => (
            Some(selection.item.clone()),
            selection.playlist.refresh_time.unwrap_or(device_rate),
        ),
        None => (None, device_rate),
    };

    tracing::debug!(
        device_id = device.id,
        item_id = item.as_ref().map(|i| i.id),
        refresh_rate,
        "Planned next display"
    );

    DisplayPlan {
        item,
        refresh_rate,
        sleeping: false,
        update_firmware,
        firmware_url,
    }
}

/// Cache key of the image a device should show.
///
/// A mirroring device shows its mirror target's screen. If the target is
/// not among `devices` the device's own key is used.
pub fn screen_image_key<'a>(
    device: &'a DeviceSnapshot,
    devices: &'a [DeviceSnapshot],
) -> Option<&'a str> {
    let source = device
        .mirror_device_id
        .and_then(|mirror| devices.iter().find(|d| d.id == mirror))
        .unwrap_or(device);
    source.current_screen_image.as_deref()
}
