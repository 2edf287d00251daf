//! Console command history, persisted across sessions.

use crate::storage::{self, KeyValueStore, HISTORY_KEY};
use anyhow::Result;
use std::collections::VecDeque;
use std::sync::Arc;

pub const MAX_HISTORY: usize = 50;

/// Console command history, newest first, without duplicates
pub struct CommandHistory {
    entries: VecDeque<String>,
    max_history: usize,
    index: Option<usize>,
    store: Arc<dyn KeyValueStore>,
}

impl CommandHistory {
    /// Load history from the store. A malformed stored value starts empty.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let saved: Vec<String> = storage::load_json_or_default(store.as_ref(), HISTORY_KEY);
        let mut entries: VecDeque<String> = saved.into_iter().collect();
        entries.truncate(MAX_HISTORY);
        tracing::debug!("Loaded {} commands from history", entries.len());

        Self {
            entries,
            max_history: MAX_HISTORY,
            index: None,
            store,
        }
    }

    /// Move `command` to the front, evict past the cap and persist.
    pub fn record(&mut self, command: &str) -> Result<()> {
        let command = command.trim();
        if command.is_empty() {
            return Ok(());
        }

        self.entries.retain(|h| h != command);
        self.entries.push_front(command.to_string());
        self.entries.truncate(self.max_history);
        self.index = None;

        self.save()
    }

    fn save(&self) -> Result<()> {
        storage::save_json(self.store.as_ref(), HISTORY_KEY, &self.entries)?;
        tracing::debug!("Saved {} commands to history", self.entries.len());
        Ok(())
    }

    pub fn entries(&self) -> impl Iterator<Item = &String> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget the navigation position (console opened)
    pub fn reset_navigation(&mut self) {
        self.index = None;
    }

    /// Step to an older entry (Up). Stays on the oldest entry at the end.
    pub fn previous(&mut self) -> Option<&str> {
        let next = self.index.map_or(0, |i| i + 1);
        if next < self.entries.len() {
            self.index = Some(next);
        }
        self.index.and_then(|i| self.entries.get(i)).map(String::as_str)
    }

    /// Step to a newer entry (Down). Past the newest entry the line is empty.
    pub fn next(&mut self) -> Option<&str> {
        match self.index {
            Some(i) if i > 0 => {
                self.index = Some(i - 1);
                self.entries.get(i - 1).map(String::as_str)
            }
            _ => {
                self.index = None;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn history() -> (CommandHistory, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (CommandHistory::load(store.clone()), store)
    }

    #[test]
    fn test_resubmit_moves_to_front() {
        let (mut h, _) = history();
        h.record("config --p 80").unwrap();
        h.record("reset").unwrap();
        h.record("config --p 80").unwrap();

        let entries: Vec<&String> = h.entries().collect();
        assert_eq!(entries, vec!["config --p 80", "reset"]);
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let (mut h, _) = history();
        for i in 0..51 {
            h.record(&format!("config --p {}", i)).unwrap();
        }
        assert_eq!(h.len(), MAX_HISTORY);
        assert_eq!(h.entries().next().unwrap(), "config --p 50");
        assert!(!h.entries().any(|e| e == "config --p 0"));
    }

    #[test]
    fn test_persisted_and_reloaded() {
        let (mut h, store) = history();
        h.record("help").unwrap();
        h.record("export").unwrap();

        let raw = store.get(HISTORY_KEY).unwrap().unwrap();
        assert_eq!(raw, r#"["export","help"]"#);

        let reloaded = CommandHistory::load(store);
        assert_eq!(reloaded.entries().collect::<Vec<_>>(), vec!["export", "help"]);
    }

    #[test]
    fn test_blank_is_ignored() {
        let (mut h, _) = history();
        h.record("   ").unwrap();
        assert!(h.is_empty());
    }

    #[test]
    fn test_navigation() {
        let (mut h, _) = history();
        h.record("one").unwrap();
        h.record("two").unwrap();

        assert_eq!(h.previous(), Some("two"));
        assert_eq!(h.previous(), Some("one"));
        assert_eq!(h.previous(), Some("one"));
        assert_eq!(h.next(), Some("two"));
        assert_eq!(h.next(), None);
        assert_eq!(h.previous(), Some("two"));
    }
}
