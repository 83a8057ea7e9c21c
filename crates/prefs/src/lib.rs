use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefsError {
    #[error("browser storage unavailable")]
    StorageUnavailable,
    #[error("preference storage error: {0}")]
    Io(String),
}

/// String key/value preferences that outlive the page session.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PrefsError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError>;
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryPreferenceStore {
    values: BTreeMap<String, String>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PrefsError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_storage {
    use super::{PreferenceStore, PrefsError};

    /// `window.localStorage`, looked up on every access so a storage that
    /// becomes unavailable mid-session surfaces as an error.
    #[derive(Debug, Default)]
    pub struct LocalStoragePreferenceStore;

    impl LocalStoragePreferenceStore {
        pub fn new() -> Result<Self, PrefsError> {
            window_local_storage()?;
            Ok(Self)
        }
    }

    impl PreferenceStore for LocalStoragePreferenceStore {
        fn get(&self, key: &str) -> Result<Option<String>, PrefsError> {
            window_local_storage()?
                .get_item(key)
                .map_err(|e| PrefsError::Io(format!("get_item({key}) failed: {:?}", e)))
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
            window_local_storage()?
                .set_item(key, value)
                .map_err(|e| PrefsError::Io(format!("set_item({key}) failed: {:?}", e)))
        }
    }

    fn window_local_storage() -> Result<web_sys::Storage, PrefsError> {
        let win = web_sys::window().ok_or(PrefsError::StorageUnavailable)?;
        win.local_storage()
            .map_err(|e| PrefsError::Io(format!("localStorage error: {:?}", e)))?
            .ok_or(PrefsError::StorageUnavailable)
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_storage::LocalStoragePreferenceStore;

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct LocalStoragePreferenceStore;

#[cfg(not(target_arch = "wasm32"))]
impl LocalStoragePreferenceStore {
    pub fn new() -> Result<Self, PrefsError> {
        Err(PrefsError::StorageUnavailable)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl PreferenceStore for LocalStoragePreferenceStore {
    fn get(&self, _key: &str) -> Result<Option<String>, PrefsError> {
        Err(PrefsError::StorageUnavailable)
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), PrefsError> {
        Err(PrefsError::StorageUnavailable)
    }
}

/// Tile layer shown under the markers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum BaseLayer {
    #[default]
    OpenStreetMap,
    EsriSatellite,
}

impl BaseLayer {
    pub const ALL: [BaseLayer; 2] = [BaseLayer::OpenStreetMap, BaseLayer::EsriSatellite];

    /// Display name, also the persisted value.
    pub fn name(self) -> &'static str {
        match self {
            BaseLayer::OpenStreetMap => "OpenStreetMap",
            BaseLayer::EsriSatellite => "Esri Satellite",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.name() == name)
    }
}

impl fmt::Display for BaseLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub struct BaseLayerPreference;

impl BaseLayerPreference {
    pub const KEY: &'static str = "baseMapSelected";

    /// Stored choice, or the default when nothing usable is stored.
    pub fn load(store: &dyn PreferenceStore) -> BaseLayer {
        match store.get(Self::KEY) {
            Ok(Some(name)) => BaseLayer::from_name(&name).unwrap_or_else(|| {
                warn!(%name, "unknown base layer preference");
                BaseLayer::default()
            }),
            Ok(None) => BaseLayer::default(),
            Err(err) => {
                warn!("base layer preference unreadable: {err}");
                BaseLayer::default()
            }
        }
    }

    pub fn save(store: &mut dyn PreferenceStore, layer: BaseLayer) -> Result<(), PrefsError> {
        store.set(Self::KEY, layer.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_when_nothing_stored() {
        let store = InMemoryPreferenceStore::new();
        assert_eq!(BaseLayerPreference::load(&store), BaseLayer::OpenStreetMap);
    }

    #[test]
    fn save_then_load() {
        let mut store = InMemoryPreferenceStore::new();
        BaseLayerPreference::save(&mut store, BaseLayer::EsriSatellite).unwrap();
        assert_eq!(
            store.get(BaseLayerPreference::KEY).unwrap().as_deref(),
            Some("Esri Satellite")
        );
        assert_eq!(BaseLayerPreference::load(&store), BaseLayer::EsriSatellite);
    }

    #[test]
    fn unknown_name_falls_back() {
        let mut store = InMemoryPreferenceStore::new();
        store.set(BaseLayerPreference::KEY, "Stamen Toner").unwrap();
        assert_eq!(BaseLayerPreference::load(&store), BaseLayer::OpenStreetMap);
    }

    #[test]
    fn storage_errors_fall_back() {
        struct Broken;
        impl PreferenceStore for Broken {
            fn get(&self, _key: &str) -> Result<Option<String>, PrefsError> {
                Err(PrefsError::StorageUnavailable)
            }
            fn set(&mut self, _key: &str, _value: &str) -> Result<(), PrefsError> {
                Err(PrefsError::Io("quota".to_string()))
            }
        }
        let mut broken = Broken;
        assert_eq!(BaseLayerPreference::load(&broken), BaseLayer::OpenStreetMap);
        assert_eq!(
            BaseLayerPreference::save(&mut broken, BaseLayer::EsriSatellite),
            Err(PrefsError::Io("quota".to_string()))
        );
    }

    #[test]
    fn local_storage_is_unavailable_off_wasm() {
        assert_eq!(
            LocalStoragePreferenceStore::new().err(),
            Some(PrefsError::StorageUnavailable)
        );
    }
}
