//! Identifier cache
//!
//! Maps a VM id from the REST listing to the .vmx path the command-line
//! tools need. Lookups read one entry; refreshes swap the whole mapping.
//! Entries are never expired individually.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct LocatorCache {
    entries: Mutex<HashMap<String, String>>,
}

impl LocatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, vm_id: &str) -> Option<String> {
        self.lock().get(vm_id).cloned()
    }

    /// Replace every entry with `entries`
    pub fn replace_all(&self, entries: HashMap<String, String>) {
        *self.lock() = entries;
    }

    /// Replace every entry from a `GET /vms` body; returns the entry count
    ///
    /// A body that is not a JSON array leaves the mapping untouched and
    /// returns `None`.
    pub fn refresh_from_listing(&self, listing: &Value) -> Option<usize> {
        listing.as_array()?;
        let entries = entries_from_listing(listing);
        let count = entries.len();
        self.replace_all(entries);
        Some(count)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Pull `id -> path` pairs out of a VM listing, skipping malformed items
pub fn entries_from_listing(listing: &Value) -> HashMap<String, String> {
    listing
        .as_array()
        .map(|vms| {
            vms.iter()
                .filter_map(|vm| {
                    let id = vm.get("id")?.as_str()?;
                    let path = vm.get("path")?.as_str()?;
                    Some((id.to_string(), path.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}
