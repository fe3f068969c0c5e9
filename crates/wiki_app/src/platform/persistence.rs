use serde::{Deserialize, Serialize};
use wiki_core::HistoryEntry;
use wiki_engine::KeyValueStore;
use wiki_logging::{wiki_error, wiki_info, wiki_warn};

pub(crate) const HISTORY_KEY: &str = "history";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedEntry {
    topic: String,
    timestamp: i64,
}

/// Reads the history log. Missing, unreadable or corrupt data yields an
/// empty history.
pub(crate) fn load_history(store: &dyn KeyValueStore) -> Vec<HistoryEntry> {
    let content = match store.load(HISTORY_KEY) {
        Ok(Some(text)) => text,
        Ok(None) => return Vec::new(),
        Err(err) => {
            wiki_warn!("Failed to read persisted history: {}", err);
            return Vec::new();
        }
    };

    let persisted: Vec<PersistedEntry> = match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(err) => {
            wiki_warn!("Failed to parse persisted history, starting empty: {}", err);
            return Vec::new();
        }
    };

    let entries: Vec<HistoryEntry> = persisted
        .into_iter()
        .map(|entry| HistoryEntry {
            topic: entry.topic,
            timestamp: entry.timestamp,
        })
        .collect();
    wiki_info!("Loaded {} history entries", entries.len());
    entries
}

pub(crate) fn save_history(store: &dyn KeyValueStore, entries: &[HistoryEntry]) {
    let persisted: Vec<PersistedEntry> = entries
        .iter()
        .map(|entry| PersistedEntry {
            topic: entry.topic.clone(),
            timestamp: entry.timestamp,
        })
        .collect();

    let content = match serde_json::to_string(&persisted) {
        Ok(text) => text,
        Err(err) => {
            wiki_error!("Failed to serialize history: {}", err);
            return;
        }
    };

    if let Err(err) = store.save(HISTORY_KEY, &content) {
        wiki_error!("Failed to write history: {}", err);
    }
}
