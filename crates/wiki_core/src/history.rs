use std::collections::VecDeque;

/// Maximum number of entries kept in the log; oldest are evicted first.
pub const HISTORY_CAPACITY: usize = 50;
/// Number of entries shown in the recent-history list.
pub const HISTORY_DISPLAY_LIMIT: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub topic: String,
    /// Creation time as unix milliseconds.
    pub timestamp: i64,
}

/// Append-only, capacity-bounded log of visited topics in chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a log from persisted entries, keeping only the newest
    /// `HISTORY_CAPACITY` of them.
    pub fn from_entries(entries: impl IntoIterator<Item = HistoryEntry>) -> Self {
        let mut log = Self::new();
        for entry in entries {
            log.entries.push_back(entry);
            log.enforce_capacity();
        }
        log
    }

    /// Appends `topic` unless it matches the latest entry (case-insensitive).
    /// Returns whether the log changed.
    pub fn append(&mut self, topic: &str, timestamp: i64) -> bool {
        if let Some(last) = self.entries.back() {
            if last.topic.to_lowercase() == topic.to_lowercase() {
                return false;
            }
        }
        self.entries.push_back(HistoryEntry {
            topic: topic.to_string(),
            timestamp,
        });
        self.enforce_capacity();
        true
    }

    /// Most-recent-first view, capped to `limit`.
    pub fn list(&self, limit: usize) -> Vec<&HistoryEntry> {
        self.entries.iter().rev().take(limit).collect()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Chronological snapshot, suitable for persistence.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn enforce_capacity(&mut self) {
        while self.entries.len() > HISTORY_CAPACITY {
            self.entries.pop_front();
        }
    }
}
