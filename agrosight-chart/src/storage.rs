//! Best-effort persistence of chart preferences.
//!
//! Series visibility and the selected time window survive restarts through a
//! caller-supplied [`KeyValueStore`]. Nothing here ever fails the caller:
//! read and write problems are logged and the in-memory state stays
//! authoritative.

use std::collections::{BTreeMap, HashMap};

use agrosight_common::{DeviceType, SeriesKey};

use crate::error::Result;
use crate::window::WindowDescriptor;

/// A string key-value store.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Process-local store, lost on exit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Storage namespace for a device selection, `<deviceId|global>_<deviceType|all>`.
pub fn default_namespace(device_id: Option<&str>, device_type: Option<DeviceType>) -> String {
    format!(
        "{}_{}",
        device_id.unwrap_or("global"),
        device_type.map_or("all", |t| t.as_str())
    )
}

/// Chart preferences stored under one namespace.
pub struct ChartStorage {
    store: Box<dyn KeyValueStore>,
    namespace: String,
}

impl std::fmt::Debug for ChartStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartStorage")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl ChartStorage {
    pub fn new(store: impl KeyValueStore + 'static, namespace: impl Into<String>) -> Self {
        Self {
            store: Box::new(store),
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key holding the visibility map.
    pub fn filters_key(&self) -> String {
        format!("chart_filters_{}", self.namespace)
    }

    /// Key holding the time window.
    pub fn time_range_key(&self) -> String {
        format!("chart_time_range_{}", self.namespace)
    }

    /// Stored visibility flags. Empty when missing or unreadable.
    pub fn load_visibility(&self) -> BTreeMap<SeriesKey, bool> {
        let key = self.filters_key();
        let Some(raw) = self.read(&key) else {
            return BTreeMap::new();
        };

        let stored: BTreeMap<String, bool> = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Ignoring unreadable visibility filters");
                return BTreeMap::new();
            }
        };

        stored
            .into_iter()
            .filter_map(|(series, visible)| match series.parse::<SeriesKey>() {
                Ok(series) => Some((series, visible)),
                Err(e) => {
                    tracing::debug!(series = %series, error = %e, "Skipping stored filter");
                    None
                }
            })
            .collect()
    }

    /// Persist visibility flags.
    pub fn save_visibility(&mut self, visibility: &BTreeMap<SeriesKey, bool>) {
        let stored: BTreeMap<String, bool> = visibility
            .iter()
            .map(|(key, visible)| (key.to_string(), *visible))
            .collect();

        match serde_json::to_string(&stored) {
            Ok(raw) => self.write(&self.filters_key(), &raw),
            Err(e) => tracing::warn!(error = %e, "Failed to encode visibility filters"),
        }
    }

    /// Stored time window, if any was saved and it can be read.
    pub fn load_window(&self) -> Option<WindowDescriptor> {
        let key = self.time_range_key();
        let raw = self.read(&key)?;

        match serde_json::from_str(&raw) {
            Ok(window) => Some(window),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Ignoring unreadable time range");
                None
            }
        }
    }

    /// Persist the time window.
    pub fn save_window(&mut self, window: &WindowDescriptor) {
        match serde_json::to_string(window) {
            Ok(raw) => self.write(&self.time_range_key(), &raw),
            Err(e) => tracing::warn!(error = %e, "Failed to encode time range"),
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to read chart preferences");
                None
            }
        }
    }

    fn write(&mut self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            tracing::warn!(key = %key, error = %e, "Failed to save chart preferences");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChartError;
    use crate::window::RelativeWindow;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(ChartError::storage("disk on fire"))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(ChartError::storage("disk on fire"))
        }
    }

    #[test]
    fn test_default_namespace() {
        assert_eq!(default_namespace(None, None), "global_all");
        assert_eq!(
            default_namespace(Some("ep-4"), Some(DeviceType::Endpoint)),
            "ep-4_endpoint"
        );
        assert_eq!(default_namespace(Some("s1"), None), "s1_all");
    }

    #[test]
    fn test_keys() {
        let storage = ChartStorage::new(MemoryStore::new(), "s1_sensor");
        assert_eq!(storage.filters_key(), "chart_filters_s1_sensor");
        assert_eq!(storage.time_range_key(), "chart_time_range_s1_sensor");
    }

    #[test]
    fn test_visibility_round_trip() {
        let mut storage = ChartStorage::new(MemoryStore::new(), "global_all");
        assert!(storage.load_visibility().is_empty());

        let mut flags = BTreeMap::new();
        flags.insert(SeriesKey::temperature("s1"), false);
        flags.insert(SeriesKey::humidity("s1"), true);
        storage.save_visibility(&flags);

        assert_eq!(storage.load_visibility(), flags);
    }

    #[test]
    fn test_visibility_wire_format() {
        let mut store = MemoryStore::new();
        store
            .set("chart_filters_x", r#"{"s1:temp":false,"bogus":true,"s2:hum":true}"#)
            .unwrap();
        let storage = ChartStorage::new(store, "x");

        let flags = storage.load_visibility();
        assert_eq!(flags.len(), 2);
        assert_eq!(flags.get(&SeriesKey::temperature("s1")), Some(&false));
        assert_eq!(flags.get(&SeriesKey::humidity("s2")), Some(&true));
    }

    #[test]
    fn test_window_round_trip() {
        let mut storage = ChartStorage::new(MemoryStore::new(), "global_all");
        assert_eq!(storage.load_window(), None);

        let window = WindowDescriptor::Relative(RelativeWindow::OneWeek);
        storage.save_window(&window);
        assert_eq!(storage.load_window(), Some(window));
    }

    #[test]
    fn test_corrupt_entries_fall_back() {
        let mut store = MemoryStore::new();
        store.set("chart_filters_x", "not json").unwrap();
        store.set("chart_time_range_x", "[1, 2]").unwrap();
        let storage = ChartStorage::new(store, "x");

        assert!(storage.load_visibility().is_empty());
        assert_eq!(storage.load_window(), None);
    }

    #[test]
    fn test_failing_store_is_not_fatal() {
        let mut storage = ChartStorage::new(BrokenStore, "x");

        storage.save_window(&WindowDescriptor::default());
        storage.save_visibility(&BTreeMap::new());

        assert!(storage.load_visibility().is_empty());
        assert_eq!(storage.load_window(), None);
    }
}
