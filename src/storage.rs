use crate::data::Item;
use gloo_storage::{LocalStorage, Storage};
use log::{debug, warn};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const STORAGE_PREFIX: &str = "tierlist_gen_";

pub fn storage_key(category: &str) -> String {
    format!("{}{}", STORAGE_PREFIX, category)
}

/// Serialized form of a tier board: tier id to ordered items, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedTierList {
    tiers: Vec<(String, Vec<Item>)>,
}

impl SavedTierList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_tier(&mut self, tier_id: impl Into<String>, items: Vec<Item>) {
        let tier_id = tier_id.into();
        match self.tiers.iter_mut().find(|(id, _)| *id == tier_id) {
            Some((_, existing)) => *existing = items,
            None => self.tiers.push((tier_id, items)),
        }
    }

    pub fn tier(&self, tier_id: &str) -> Option<&[Item]> {
        self.tiers
            .iter()
            .find(|(id, _)| id == tier_id)
            .map(|(_, items)| items.as_slice())
    }

    pub fn tiers(&self) -> impl Iterator<Item = (&str, &[Item])> {
        self.tiers
            .iter()
            .map(|(id, items)| (id.as_str(), items.as_slice()))
    }

    pub fn item_count(&self) -> usize {
        self.tiers.iter().map(|(_, items)| items.len()).sum()
    }
}

impl Serialize for SavedTierList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tiers.len()))?;
        for (tier_id, items) in &self.tiers {
            map.serialize_entry(tier_id, items)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SavedTierList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TierMapVisitor;

        impl<'de> Visitor<'de> for TierMapVisitor {
            type Value = SavedTierList;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of tier ids to item lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut list = SavedTierList::new();
                while let Some((tier_id, items)) = access.next_entry::<String, Vec<Item>>()? {
                    list.push_tier(tier_id, items);
                }
                Ok(list)
            }
        }

        deserializer.deserialize_map(TierMapVisitor)
    }
}

#[derive(Debug)]
pub enum StorageError {
    Encode(String),
    Write(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Encode(message) => write!(f, "failed to encode tier list: {}", message),
            StorageError::Write(message) => write!(f, "failed to write storage: {}", message),
        }
    }
}

impl std::error::Error for StorageError {}

/// Key/value backend holding serialized tier lists.
pub trait RawStore {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str);
}

/// The browser's `localStorage`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrowserStore;

impl RawStore for BrowserStore {
    fn read(&self, key: &str) -> Option<String> {
        LocalStorage::raw().get_item(key).ok().flatten()
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        LocalStorage::raw()
            .set_item(key, value)
            .map_err(|err| StorageError::Write(format!("{:?}", err)))
    }

    fn remove(&self, key: &str) {
        LocalStorage::delete(key);
    }
}

/// Local persistence for one category's tier list.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalTierStore<S: RawStore = BrowserStore> {
    backend: S,
    key: String,
}

impl LocalTierStore<BrowserStore> {
    pub fn browser(category: &str) -> Self {
        Self::new(BrowserStore, category)
    }
}

impl<S: RawStore> LocalTierStore<S> {
    pub fn new(backend: S, category: &str) -> Self {
        Self {
            backend,
            key: storage_key(category),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// `None` when nothing is stored or the stored text is not a tier list.
    pub fn load(&self) -> Option<SavedTierList> {
        let raw = self.backend.read(&self.key)?;
        match serde_json::from_str::<SavedTierList>(&raw) {
            Ok(list) => Some(list),
            Err(err) => {
                warn!("Failed to load saved tier list '{}': {}", self.key, err);
                None
            }
        }
    }

    pub fn save(&self, list: &SavedTierList) {
        if let Err(err) = self.try_save(list) {
            warn!("Failed to persist tier list '{}': {}", self.key, err);
        }
    }

    pub fn try_save(&self, list: &SavedTierList) -> Result<(), StorageError> {
        let raw = serde_json::to_string(list).map_err(|err| StorageError::Encode(err.to_string()))?;
        self.backend.write(&self.key, &raw)
    }

    pub fn clear(&self) {
        debug!("Clearing saved tier list '{}'", self.key);
        self.backend.remove(&self.key);
    }

    /// Exact stored text, as pushed to the server.
    pub fn raw(&self) -> Option<String> {
        self.backend.read(&self.key).filter(|raw| !raw.is_empty())
    }

    /// Stores a blob verbatim, e.g. one pulled from the server.
    pub fn hydrate(&self, raw: &str) {
        if let Err(err) = self.backend.write(&self.key, raw) {
            warn!("Failed to hydrate tier list '{}': {}", self.key, err);
        }
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::{RawStore, StorageError};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    /// In-process stand-in for `localStorage`; clones share entries.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct MemoryStore {
        entries: Rc<RefCell<HashMap<String, String>>>,
    }

    impl MemoryStore {
        pub(crate) fn get(&self, key: &str) -> Option<String> {
            self.entries.borrow().get(key).cloned()
        }
    }

    impl RawStore for MemoryStore {
        fn read(&self, key: &str) -> Option<String> {
            self.get(key)
        }

        fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.entries
                .borrow_mut()
                .insert(key.to_owned(), value.to_owned());
            Ok(())
        }

        fn remove(&self, key: &str) {
            self.entries.borrow_mut().remove(key);
        }
    }
}
