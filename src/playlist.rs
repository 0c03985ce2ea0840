//! Playlist scheduling: which content item a device shows next.
//!
//! The scheduler walks playlists in the order the caller supplies and returns
//! the first item offered by the first playlist that is both enabled and
//! inside its active window. Whether a playlist is "active now" and which of
//! its items comes next is the playlist's business, expressed through the
//! [`Schedulable`] trait.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::model::PluginId;
use crate::window::ActiveWindow;

/// Playlist primary key.
pub type PlaylistId = u64;

/// Playlist item primary key.
pub type PlaylistItemId = u64;

/// A playlist as seen by the scheduler.
pub trait Schedulable {
    /// Content item type handed out by the playlist.
    type Item;

    /// Whether the playlist is enabled at all.
    fn is_active(&self) -> bool;

    /// Whether the playlist's active window is open at `now`.
    fn is_active_now(&self, now: NaiveDateTime) -> bool;

    /// The next eligible item, if any.
    fn next_item(&self) -> Option<&Self::Item>;
}

/// A scheduling decision: the playlist that matched and the item it offered.
pub struct Selection<'a, P: Schedulable> {
    /// Playlist the item came from
    pub playlist: &'a P,
    /// Item to display
    pub item: &'a P::Item,
}

impl<P> fmt::Debug for Selection<'_, P>
where
    P: Schedulable + fmt::Debug,
    P::Item: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("playlist", &self.playlist)
            .field("item", &self.item)
            .finish()
    }
}

/// Select the next item, along with the playlist it came from.
///
/// First match wins; later playlists are not consulted.
pub fn next_selection<P: Schedulable>(
    playlists: &[P],
    now: NaiveDateTime,
) -> Option<Selection<'_, P>> {
    playlists
        .iter()
        .filter(|playlist| playlist.is_active())
        .filter(|playlist| playlist.is_active_now(now))
        .find_map(|playlist| {
            playlist
                .next_item()
                .map(|item| Selection { playlist, item })
        })
}

/// Select the next item to display, or `None` when nothing qualifies.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use trmnl_engine::{next_item, PlaylistItemSnapshot, PlaylistSnapshot};
///
/// let playlists = vec![
///     PlaylistSnapshot::new(1).with_active(false).with_item(PlaylistItemSnapshot::new(10, 1)),
///     PlaylistSnapshot::new(2).with_item(PlaylistItemSnapshot::new(20, 2)),
/// ];
/// let now = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
///
/// assert_eq!(next_item(&playlists, now).map(|item| item.id), Some(20));
/// ```
pub fn next_item<P: Schedulable>(playlists: &[P], now: NaiveDateTime) -> Option<&P::Item> {
    let selection = next_selection(playlists, now)?;
    Some(selection.item)
}

/// A device playlist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaylistSnapshot {
    /// Playlist ID
    pub id: PlaylistId,

    /// Playlist name
    #[serde(default)]
    pub name: Option<String>,

    /// Whether the playlist is enabled
    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Weekly window in which the playlist plays (None = always)
    #[serde(default)]
    pub active_window: Option<ActiveWindow>,

    /// Refresh interval in seconds while this playlist is playing
    #[serde(default)]
    pub refresh_time: Option<u32>,

    /// Items in display order
    #[serde(default)]
    pub items: Vec<PlaylistItemSnapshot>,
}

fn default_true() -> bool {
    true
}

impl PlaylistSnapshot {
    /// Create an enabled, always-active, empty playlist.
    pub fn new(id: PlaylistId) -> Self {
        Self {
            id,
            is_active: true,
            ..Default::default()
        }
    }

    /// Enable or disable the playlist.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    /// Restrict the playlist to a weekly window.
    #[must_use]
    pub fn with_window(mut self, window: ActiveWindow) -> Self {
        self.active_window = Some(window);
        self
    }

    /// Set the refresh interval used while this playlist plays.
    #[must_use]
    pub fn with_refresh_time(mut self, seconds: u32) -> Self {
        self.refresh_time = Some(seconds);
        self
    }

    /// Append an item.
    #[must_use]
    pub fn with_item(mut self, item: PlaylistItemSnapshot) -> Self {
        self.items.push(item);
        self
    }
}

impl Schedulable for PlaylistSnapshot {
    type Item = PlaylistItemSnapshot;

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn is_active_now(&self, now: NaiveDateTime) -> bool {
        match &self.active_window {
            Some(window) => window.is_open_at(now),
            None => true,
        }
    }

    /// Rotates through active items: never-shown items first in display
    /// order, then the least recently shown.
    fn next_item(&self) -> Option<&PlaylistItemSnapshot> {
        self.items
            .iter()
            .filter(|item| item.is_active)
            .min_by_key(|item| {
                (
                    item.last_displayed_at.is_some(),
                    item.last_displayed_at,
                    item.order,
                    item.id,
                )
            })
    }
}

/// A content item inside a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistItemSnapshot {
    /// Item ID
    pub id: PlaylistItemId,

    /// Plugin rendered for this item
    pub plugin_id: PluginId,

    /// Position within the playlist
    #[serde(default)]
    pub order: u32,

    /// Whether the item is eligible for display
    #[serde(default = "default_true")]
    pub is_active: bool,

    /// When the item was last shown
    #[serde(default)]
    pub last_displayed_at: Option<NaiveDateTime>,
}

impl PlaylistItemSnapshot {
    /// Create an active, never-displayed item.
    pub fn new(id: PlaylistItemId, plugin_id: PluginId) -> Self {
        Self {
            id,
            plugin_id,
            order: 0,
            is_active: true,
            last_displayed_at: None,
        }
    }

    /// Set the display order.
    #[must_use]
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    /// Enable or disable the item.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    /// Record when the item was last displayed.
    #[must_use]
    pub fn displayed_at(mut self, at: NaiveDateTime) -> Self {
        self.last_displayed_at = Some(at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{DaySelector, TimeWindow};
    use chrono::{NaiveDate, NaiveTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        // 2024-01-01 is a Monday
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn window(from: (u32, u32), until: (u32, u32)) -> ActiveWindow {
        ActiveWindow {
            days: DaySelector::default(),
            time: TimeWindow::new(
                NaiveTime::from_hms_opt(from.0, from.1, 0).unwrap(),
                NaiveTime::from_hms_opt(until.0, until.1, 0).unwrap(),
            ),
        }
    }

    #[test]
    fn test_first_active_playlist_wins() {
        let playlists = vec![
            PlaylistSnapshot::new(1).with_item(PlaylistItemSnapshot::new(10, 100)),
            PlaylistSnapshot::new(2).with_item(PlaylistItemSnapshot::new(20, 200)),
        ];
        let item = next_item(&playlists, at(9, 0)).unwrap();
        assert_eq!(item.id, 10);
    }

    #[test]
    fn test_skips_disabled_and_closed_playlists() {
        let playlists = vec![
            PlaylistSnapshot::new(1)
                .with_active(false)
                .with_item(PlaylistItemSnapshot::new(10, 100)),
            PlaylistSnapshot::new(2)
                .with_window(window((18, 0), (22, 0)))
                .with_item(PlaylistItemSnapshot::new(20, 200)),
            PlaylistSnapshot::new(3)
                .with_window(window((8, 0), (12, 0)))
                .with_item(PlaylistItemSnapshot::new(30, 300)),
        ];
        let selection = next_selection(&playlists, at(9, 0)).unwrap();
        assert_eq!(selection.playlist.id, 3);
        assert_eq!(selection.item.id, 30);

        let debug = format!("{selection:?}");
        assert!(debug.starts_with("Selection {"));
        assert!(debug.contains("PlaylistItemSnapshot { id: 30"));
    }

    #[test]
    fn test_falls_through_playlist_without_items() {
        let playlists = vec![
            PlaylistSnapshot::new(1),
            PlaylistSnapshot::new(2)
                .with_item(PlaylistItemSnapshot::new(20, 200).with_active(false)),
            PlaylistSnapshot::new(3).with_item(PlaylistItemSnapshot::new(30, 300)),
        ];
        assert_eq!(next_item(&playlists, at(9, 0)).map(|i| i.id), Some(30));
    }

    #[test]
    fn test_no_content() {
        let empty: Vec<PlaylistSnapshot> = vec![];
        assert!(next_item(&empty, at(9, 0)).is_none());

        let closed = vec![PlaylistSnapshot::new(1)
            .with_window(window((18, 0), (22, 0)))
            .with_item(PlaylistItemSnapshot::new(10, 100))];
        assert!(next_item(&closed, at(9, 0)).is_none());
    }

    #[test]
    fn test_overnight_playlist_window() {
        let playlists = vec![PlaylistSnapshot::new(1)
            .with_window(window((22, 0), (6, 0)))
            .with_item(PlaylistItemSnapshot::new(10, 100))];
        assert!(next_item(&playlists, at(23, 30)).is_some());
        assert!(next_item(&playlists, at(5, 59)).is_some());
        assert!(next_item(&playlists, at(6, 0)).is_none());
    }

    #[test]
    fn test_deterministic() {
        let playlists = vec![PlaylistSnapshot::new(1)
            .with_item(PlaylistItemSnapshot::new(10, 100).with_order(2))
            .with_item(PlaylistItemSnapshot::new(11, 101).with_order(1))];
        let first = next_item(&playlists, at(9, 0)).cloned();
        let second = next_item(&playlists, at(9, 0)).cloned();
        assert_eq!(first, second);
        assert_eq!(first.map(|i| i.id), Some(11));
    }

    #[test]
    fn test_item_rotation() {
        let playlist = PlaylistSnapshot::new(1)
            .with_item(
                PlaylistItemSnapshot::new(10, 100)
                    .with_order(0)
                    .displayed_at(at(8, 0)),
            )
            .with_item(
                PlaylistItemSnapshot::new(11, 101)
                    .with_order(1)
                    .displayed_at(at(7, 0)),
            )
            .with_item(
                PlaylistItemSnapshot::new(12, 102)
                    .with_order(2)
                    .displayed_at(at(8, 30)),
            );
        // Least recently displayed
        assert_eq!(playlist.next_item().map(|i| i.id), Some(11));

        let playlist = playlist.with_item(PlaylistItemSnapshot::new(13, 103).with_order(3));
        // Never displayed beats everything
        assert_eq!(playlist.next_item().map(|i| i.id), Some(13));
    }

    #[test]
    fn test_playlist_from_json() {
        let json = r#"{
            "id": 4,
            "active_window": {"days": "weekdays", "from": "09:00", "until": "17:00"},
            "refresh_time": 600,
            "items": [{"id": 1, "plugin_id": 9, "order": 0}]
        }"#;
        let playlist: PlaylistSnapshot = serde_json::from_str(json).unwrap();
        assert!(playlist.is_active);
        assert_eq!(playlist.refresh_time, Some(600));
        assert!(playlist.is_active_now(at(10, 0)));
        assert!(!playlist.is_active_now(at(18, 0)));
        // 2024-01-06 is a Saturday
        let saturday = NaiveDate::from_ymd_opt(2024, 1, 6)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert!(!playlist.is_active_now(saturday));
        assert!(playlist.items[0].is_active);
    }
}
