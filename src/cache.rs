//! Render cache invalidation.
//!
//! Rendered plugin images are shared across devices through a cache key
//! stored on the plugin. Sharing is only safe while every device renders at
//! the standard size: one device with a model or a custom display anywhere
//! in the system makes the shared render unusable, so the key is cleared.
//!
//! # Concurrency
//!
//! Clearing a key is a read (scan devices) followed by a write (clear the
//! plugin's key). Both happen under a per-plugin lock from [`PluginLocks`].
//! Renderers publish new keys through [`CacheInvalidator::store_render`],
//! which takes the same lock, so a fresh render never races a stale
//! invalidation decision. Different plugins never contend.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Error;
use crate::model::{DeviceSnapshot, PluginId, PluginSnapshot};

/// Persistence collaborator for device and plugin rows.
///
/// Implementations are expected to bound their own latency; the engine
/// neither retries nor times out these calls.
pub trait SnapshotStore: Send + Sync {
    /// All devices in the system.
    fn devices(&self) -> Result<Vec<DeviceSnapshot>, Error>;

    /// Current cache key of a plugin.
    fn plugin_cache_key(&self, plugin: PluginId) -> Result<Option<String>, Error>;

    /// Set or clear a plugin's cache key.
    fn set_plugin_cache_key(&self, plugin: PluginId, key: Option<&str>) -> Result<(), Error>;

    /// Every cache key currently referenced by a device screen or a plugin.
    fn list_active_cache_keys(&self) -> Result<HashSet<String>, Error>;
}

/// Collect the cache keys referenced by devices and plugins, ignoring blanks.
pub fn active_cache_keys<'a>(
    devices: impl IntoIterator<Item = &'a DeviceSnapshot>,
    plugins: impl IntoIterator<Item = &'a PluginSnapshot>,
) -> HashSet<String> {
    let device_keys = devices
        .into_iter()
        .filter_map(|device| device.current_screen_image.as_deref());
    let plugin_keys = plugins
        .into_iter()
        .filter_map(|plugin| plugin.current_image.as_deref());

    device_keys
        .chain(plugin_keys)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether a shared plugin render can be reused by every device.
///
/// False as soon as any device references a device model or has
/// non-default display dimensions or rotation.
pub fn is_cacheable(devices: &[DeviceSnapshot]) -> bool {
    !devices
        .iter()
        .any(|device| device.device_model_id.is_some() || device.has_custom_display())
}

/// Per-plugin mutual exclusion for cache key writes.
#[derive(Debug, Default)]
pub struct PluginLocks {
    locks: Mutex<HashMap<PluginId, Arc<Mutex<()>>>>,
}

impl PluginLocks {
    /// Create an empty lock registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding the given plugin's cache key.
    pub fn get(&self, plugin: PluginId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(plugin).or_default())
    }
}

/// Clears shared plugin renders that can no longer be reused.
pub struct CacheInvalidator<S> {
    store: Arc<S>,
    locks: Arc<PluginLocks>,
}

impl<S: SnapshotStore> CacheInvalidator<S> {
    /// Create an invalidator with its own lock registry.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_locks(store, Arc::new(PluginLocks::new()))
    }

    /// Create an invalidator sharing a lock registry with other writers.
    pub fn with_locks(store: Arc<S>, locks: Arc<PluginLocks>) -> Self {
        Self { store, locks }
    }

    /// The lock registry guarding cache key writes.
    pub fn locks(&self) -> &Arc<PluginLocks> {
        &self.locks
    }

    /// Clear the plugin's cache key if the shared render is not reusable.
    ///
    /// A missing plugin is a no-op. Returns whether a key was cleared.
    pub fn reset_if_not_cacheable(&self, plugin: Option<&PluginSnapshot>) -> Result<bool, Error> {
        let Some(plugin) = plugin else {
            return Ok(false);
        };

        let lock = self.locks.get(plugin.id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let devices = self.store.devices()?;
        if is_cacheable(&devices) {
            tracing::debug!(
                plugin_id = plugin.id,
                devices = devices.len(),
                "Plugin render is cacheable, keeping key"
            );
            return Ok(false);
        }

        let Some(key) = self.store.plugin_cache_key(plugin.id)? else {
            return Ok(false);
        };

        self.store.set_plugin_cache_key(plugin.id, None)?;
        tracing::info!(
            plugin_id = plugin.id,
            key = %key,
            "Cleared plugin render cache: non-standard device present"
        );
        Ok(true)
    }

    /// Publish a freshly rendered image for a plugin.
    ///
    /// Takes the same per-plugin lock as invalidation.
    pub fn store_render(&self, plugin: PluginId, key: &str) -> Result<(), Error> {
        let lock = self.locks.get(plugin);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        self.store.set_plugin_cache_key(plugin, Some(key))?;
        tracing::debug!(plugin_id = plugin, key = %key, "Stored plugin render");
        Ok(())
    }
}
