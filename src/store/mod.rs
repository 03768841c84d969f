pub mod json_store;
pub mod kv;
pub mod schema;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::engine::metrics::PerformanceSummary;
use crate::error::StoreError;
use crate::store::kv::KeyValueStore;
use crate::store::schema::{
    HISTORY_KEY, NEXT_SENTENCE_KEY, PREFERENCES_KEY, PerformanceHistory, Preferences,
};

/// Typed access to next sentence, rolling history and preferences on top of
/// any key-value store. Reads never fail: missing or unreadable values come
/// back as defaults. Write failures are logged and swallowed.
pub struct PersistenceAdapter<S: KeyValueStore> {
    store: S,
    history_limit: usize,
}

impl<S: KeyValueStore> PersistenceAdapter<S> {
    pub fn new(store: S, history_limit: usize) -> Self {
        Self {
            store,
            history_limit: history_limit.max(1),
        }
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "failed to read stored value");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "stored value is corrupt; using default");
                None
            }
        }
    }

    fn save<T: Serialize>(&mut self, key: &str, value: &T) -> bool {
        let result = serde_json::to_string_pretty(value)
            .map_err(StoreError::from)
            .and_then(|json| self.store.set(key, &json));
        if let Err(e) = &result {
            warn!(key, error = %e, "failed to persist value");
        }
        result.is_ok()
    }

    pub fn load_next_sentence(&self) -> Option<String> {
        self.load::<String>(NEXT_SENTENCE_KEY)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn save_next_sentence(&mut self, sentence: &str) -> bool {
        self.save(NEXT_SENTENCE_KEY, &sentence)
    }

    pub fn load_history(&self) -> PerformanceHistory {
        self.load(HISTORY_KEY).unwrap_or_default()
    }

    /// History for one topic, most recent first.
    pub fn recent_history(&self, topic: &str) -> Vec<PerformanceSummary> {
        self.load_history().recent(topic)
    }

    pub fn record_summary(&mut self, topic: &str, summary: PerformanceSummary) -> bool {
        let mut history = self.load_history();
        history.push(topic, summary, self.history_limit);
        self.save(HISTORY_KEY, &history)
    }

    pub fn load_preferences(&self) -> Preferences {
        self.load(PREFERENCES_KEY).unwrap_or_default()
    }

    pub fn save_preferences(&mut self, preferences: &Preferences) -> bool {
        self.save(PREFERENCES_KEY, preferences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::json_store::JsonStore;
    use crate::store::kv::MemoryStore;
    use crate::store::schema::NO_TOPIC;

    fn summary(wpm: u32) -> PerformanceSummary {
        PerformanceSummary {
            words_per_minute: wpm,
            accuracy_percent: 98,
            consistency_percent: 90,
            notes: format!("round at {wpm}"),
            recorded_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_missing_keys_are_defaults() {
        let adapter = PersistenceAdapter::new(MemoryStore::new(), 5);
        assert_eq!(adapter.load_next_sentence(), None);
        assert_eq!(adapter.load_history(), PerformanceHistory::default());
        assert_eq!(adapter.load_preferences(), Preferences::default());
    }

    #[test]
    fn test_corrupt_values_are_defaults() {
        let mut store = MemoryStore::new();
        store.set(HISTORY_KEY, "{not json").unwrap();
        store.set(PREFERENCES_KEY, "[1,2]").unwrap();
        store.set(NEXT_SENTENCE_KEY, "42").unwrap();
        let adapter = PersistenceAdapter::new(store, 5);
        assert_eq!(adapter.load_history(), PerformanceHistory::default());
        assert_eq!(adapter.load_preferences(), Preferences::default());
        assert_eq!(adapter.load_next_sentence(), None);
    }

    #[test]
    fn test_history_is_bounded_and_most_recent_first() {
        let mut adapter = PersistenceAdapter::new(MemoryStore::new(), 3);
        for wpm in [30, 40, 50, 60] {
            assert!(adapter.record_summary(NO_TOPIC, summary(wpm)));
        }
        let wpms: Vec<u32> = adapter
            .recent_history(NO_TOPIC)
            .iter()
            .map(|s| s.words_per_minute)
            .collect();
        assert_eq!(wpms, vec![60, 50, 40]);
    }

    #[test]
    fn test_round_trip_through_json_files() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
            let mut adapter = PersistenceAdapter::new(store, 5);
            adapter.save_next_sentence("Pack my box with five dozen jugs.");
            adapter.record_summary("ocean", summary(55));
            adapter.save_preferences(&Preferences {
                practice_topic: Some("ocean".into()),
                include_symbols: false,
                include_numbers: true,
            });
        }

        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        let adapter = PersistenceAdapter::new(store, 5);
        assert_eq!(
            adapter.load_next_sentence().as_deref(),
            Some("Pack my box with five dozen jugs.")
        );
        let history = adapter.recent_history("ocean");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].notes, "round at 55");
        let prefs = adapter.load_preferences();
        assert_eq!(prefs.practice_topic.as_deref(), Some("ocean"));
        assert!(!prefs.include_symbols);
    }
}
