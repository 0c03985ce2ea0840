//! In-memory collaborators for unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Mutex};
use std::time::SystemTime;

use crate::cache::{active_cache_keys, SnapshotStore};
use crate::error::Error;
use crate::model::{DeviceSnapshot, PluginId, PluginSnapshot};
use crate::sweep::{CacheStorage, CachedImage};

#[derive(Default)]
pub(crate) struct MemoryStore {
    devices: Mutex<Vec<DeviceSnapshot>>,
    plugins: Mutex<BTreeMap<PluginId, PluginSnapshot>>,
    fail: AtomicBool,
}

impl MemoryStore {
    pub(crate) fn new(devices: Vec<DeviceSnapshot>) -> Self {
        Self {
            devices: Mutex::new(devices),
            ..Default::default()
        }
    }

    pub(crate) fn insert_plugin(&self, plugin: PluginSnapshot) {
        self.plugins.lock().unwrap().insert(plugin.id, plugin);
    }

    pub(crate) fn plugin(&self, id: PluginId) -> Option<PluginSnapshot> {
        self.plugins.lock().unwrap().get(&id).cloned()
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), Error> {
        if self.fail.load(Ordering::SeqCst) {
            Err(Error::Store("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl SnapshotStore for MemoryStore {
    fn devices(&self) -> Result<Vec<DeviceSnapshot>, Error> {
        self.check()?;
        Ok(self.devices.lock().unwrap().clone())
    }

    fn plugin_cache_key(&self, plugin: PluginId) -> Result<Option<String>, Error> {
        self.check()?;
        Ok(self.plugin(plugin).and_then(|p| p.current_image))
    }

    fn set_plugin_cache_key(&self, plugin: PluginId, key: Option<&str>) -> Result<(), Error> {
        let mut plugins = self.plugins.lock().unwrap();
        let entry = plugins
            .entry(plugin)
            .or_insert_with(|| PluginSnapshot::new(plugin, None));
        entry.current_image = key.map(str::to_string);
        Ok(())
    }

    fn list_active_cache_keys(&self) -> Result<HashSet<String>, Error> {
        self.check()?;
        let devices = self.devices.lock().unwrap();
        let plugins = self.plugins.lock().unwrap();
        Ok(active_cache_keys(devices.iter(), plugins.values()))
    }
}

/// Wraps a [`MemoryStore`] and parks the first `devices()` call until released.
pub(crate) struct GatedStore {
    inner: MemoryStore,
    entered: Mutex<Option<mpsc::Sender<()>>>,
    release: Mutex<mpsc::Receiver<()>>,
}

/// Test-side handles for a [`GatedStore`].
pub(crate) struct Gate {
    pub(crate) entered: mpsc::Receiver<()>,
    pub(crate) release: mpsc::Sender<()>,
}

impl GatedStore {
    pub(crate) fn new(inner: MemoryStore) -> (Self, Gate) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let store = Self {
            inner,
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(release_rx),
        };
        let gate = Gate {
            entered: entered_rx,
            release: release_tx,
        };
        (store, gate)
    }

    pub(crate) fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

impl SnapshotStore for GatedStore {
    fn devices(&self) -> Result<Vec<DeviceSnapshot>, Error> {
        if let Some(entered) = self.entered.lock().unwrap().take() {
            entered.send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
        }
        self.inner.devices()
    }

    fn plugin_cache_key(&self, plugin: PluginId) -> Result<Option<String>, Error> {
        self.inner.plugin_cache_key(plugin)
    }

    fn set_plugin_cache_key(&self, plugin: PluginId, key: Option<&str>) -> Result<(), Error> {
        self.inner.set_plugin_cache_key(plugin, key)
    }

    fn list_active_cache_keys(&self) -> Result<HashSet<String>, Error> {
        self.inner.list_active_cache_keys()
    }
}

#[derive(Default)]
pub(crate) struct MemoryStorage {
    files: Mutex<HashMap<String, SystemTime>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryStorage {
    pub(crate) fn insert(&self, key: &str, modified: SystemTime) {
        self.files.lock().unwrap().insert(key.to_string(), modified);
    }

    pub(crate) fn fail_delete(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl CacheStorage for MemoryStorage {
    fn list_cache_files(&self) -> Result<Vec<CachedImage>, Error> {
        let mut files: Vec<CachedImage> = self
            .files
            .lock()
            .unwrap()
            .iter()
            .map(|(key, modified)| CachedImage {
                key: key.clone(),
                modified: *modified,
            })
            .collect();
        files.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(files)
    }

    fn delete_cache_file(&self, key: &str) -> Result<(), Error> {
        if self.failing.lock().unwrap().contains(key) {
            return Err(Error::Io(format!("permission denied: {}", key)));
        }
        self.files.lock().unwrap().remove(key);
        Ok(())
    }
}
