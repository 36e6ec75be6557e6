//! Durable local key-value slots.
//!
//! Small bits of UI state that survive restarts, written fire-and-forget:
//! a failed save is logged and the app carries on with in-memory state.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use dashmap::DashMap;

/// Slot holding the selected conversation id.
pub const CONVERSATION_SLOT: &str = "conversation-storage";

/// Slot holding the UI's language choice.
pub const LANGUAGE_SLOT: &str = "language-storage";

/// Durable key-value slots keyed by namespace string.
pub trait PreferenceStore: Send + Sync {
    /// Read a slot.
    fn get(&self, slot: &str) -> Option<String>;

    /// Write a slot.
    fn set(&self, slot: &str, value: &str);

    /// Remove a slot.
    fn clear(&self, slot: &str);
}

/// In-memory slots. The default when no preference path is configured.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    slots: DashMap<String, String>,
}

impl MemoryPreferences {
    /// Create an empty preference store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, slot: &str) -> Option<String> {
        self.slots.get(slot).map(|value| value.clone())
    }

    fn set(&self, slot: &str, value: &str) {
        self.slots.insert(slot.to_string(), value.to_string());
    }

    fn clear(&self, slot: &str) {
        self.slots.remove(slot);
    }
}

/// Slots persisted to a single JSON file.
///
/// Loading is lenient: a missing or corrupt file reads as empty. Saves are
/// write-through; a failed write is logged, never fatal.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    slots: DashMap<String, String>,
}

impl FilePreferences {
    /// Open the preference file at `path`, creating state from whatever can
    /// be read there.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let slots = DashMap::new();

        match load_slots(&path) {
            Some(loaded) => {
                for (slot, value) in loaded {
                    slots.insert(slot, value);
                }
            }
            None => {
                tracing::debug!(path = %path.display(), "No readable preference file, starting empty");
            }
        }

        Self { path, slots }
    }

    fn save(&self) {
        // Stable field order keeps the file diffable
        let ordered: BTreeMap<String, String> = self
            .slots
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let result = serde_json::to_string_pretty(&ordered)
            .map_err(|err| err.to_string())
            .and_then(|json| fs::write(&self.path, json).map_err(|err| err.to_string()));

        if let Err(err) = result {
            tracing::warn!(path = %self.path.display(), error = %err, "Failed to save preferences");
        }
    }
}

fn load_slots(path: &Path) -> Option<BTreeMap<String, String>> {
    let contents = fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

impl PreferenceStore for FilePreferences {
    fn get(&self, slot: &str) -> Option<String> {
        self.slots.get(slot).map(|value| value.clone())
    }

    fn set(&self, slot: &str, value: &str) {
        self.slots.insert(slot.to_string(), value.to_string());
        self.save();
    }

    fn clear(&self, slot: &str) {
        self.slots.remove(slot);
        self.save();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_roundtrip() {
        let prefs = MemoryPreferences::new();

        assert_eq!(prefs.get(CONVERSATION_SLOT), None);
        prefs.set(CONVERSATION_SLOT, "conv-1");
        assert_eq!(prefs.get(CONVERSATION_SLOT).as_deref(), Some("conv-1"));

        prefs.clear(CONVERSATION_SLOT);
        assert_eq!(prefs.get(CONVERSATION_SLOT), None);
    }

    #[test]
    fn slots_are_namespaced() {
        let prefs = MemoryPreferences::new();

        prefs.set(CONVERSATION_SLOT, "conv-1");
        prefs.set(LANGUAGE_SLOT, "uz");

        assert_eq!(prefs.get(CONVERSATION_SLOT).as_deref(), Some("conv-1"));
        assert_eq!(prefs.get(LANGUAGE_SLOT).as_deref(), Some("uz"));

        prefs.clear(CONVERSATION_SLOT);
        assert_eq!(prefs.get(LANGUAGE_SLOT).as_deref(), Some("uz"));
    }

    #[test]
    fn file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        {
            let prefs = FilePreferences::open(&path);
            prefs.set(CONVERSATION_SLOT, "conv-9");
            prefs.set(LANGUAGE_SLOT, "en");
        }

        let reopened = FilePreferences::open(&path);
        assert_eq!(reopened.get(CONVERSATION_SLOT).as_deref(), Some("conv-9"));
        assert_eq!(reopened.get(LANGUAGE_SLOT).as_deref(), Some("en"));
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "not json at all {{{").unwrap();

        let prefs = FilePreferences::open(&path);
        assert_eq!(prefs.get(CONVERSATION_SLOT), None);

        // And still usable
        prefs.set(CONVERSATION_SLOT, "conv-1");
        assert_eq!(prefs.get(CONVERSATION_SLOT).as_deref(), Some("conv-1"));
    }
}
