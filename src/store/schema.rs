use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::metrics::PerformanceSummary;

pub const NEXT_SENTENCE_KEY: &str = "next_sentence";
pub const HISTORY_KEY: &str = "performance_history";
pub const PREFERENCES_KEY: &str = "preferences";

/// History recorded while no practice topic is set lands under this key.
pub const NO_TOPIC: &str = "";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub practice_topic: Option<String>,
    #[serde(default = "default_true")]
    pub include_symbols: bool,
    #[serde(default = "default_true")]
    pub include_numbers: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            practice_topic: None,
            include_symbols: true,
            include_numbers: true,
        }
    }
}

impl Preferences {
    pub fn topic_key(&self) -> &str {
        self.practice_topic
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(NO_TOPIC)
    }
}

/// Rolling summaries per practice topic, each list oldest first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceHistory {
    #[serde(default)]
    pub by_topic: BTreeMap<String, Vec<PerformanceSummary>>,
}

impl PerformanceHistory {
    /// Append and evict the oldest entries beyond `limit`.
    pub fn push(&mut self, topic: &str, summary: PerformanceSummary, limit: usize) {
        let entries = self.by_topic.entry(topic.to_string()).or_default();
        entries.push(summary);
        if entries.len() > limit {
            let excess = entries.len() - limit;
            entries.drain(..excess);
        }
    }

    /// Most recent first.
    pub fn recent(&self, topic: &str) -> Vec<PerformanceSummary> {
        self.by_topic
            .get(topic)
            .map(|entries| entries.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, topic: &str) -> usize {
        self.by_topic.get(topic).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(wpm: u32) -> PerformanceSummary {
        PerformanceSummary {
            words_per_minute: wpm,
            accuracy_percent: 100,
            consistency_percent: 100,
            notes: String::new(),
            recorded_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_history_evicts_oldest_first() {
        let mut history = PerformanceHistory::default();
        for wpm in 1..=7 {
            history.push(NO_TOPIC, summary(wpm), 5);
        }
        assert_eq!(history.len(NO_TOPIC), 5);
        let wpms: Vec<u32> = history.recent(NO_TOPIC).iter().map(|s| s.words_per_minute).collect();
        assert_eq!(wpms, vec![7, 6, 5, 4, 3]);
    }

    #[test]
    fn test_topics_are_kept_apart() {
        let mut history = PerformanceHistory::default();
        history.push("space", summary(40), 5);
        history.push(NO_TOPIC, summary(60), 5);
        assert_eq!(history.recent("space")[0].words_per_minute, 40);
        assert_eq!(history.recent(NO_TOPIC)[0].words_per_minute, 60);
        assert!(history.recent("cooking").is_empty());
    }

    #[test]
    fn test_preferences_defaults_from_partial_json() {
        let prefs: Preferences = serde_json::from_str(r#"{"practiceTopic":"ocean"}"#).unwrap();
        assert_eq!(prefs.practice_topic.as_deref(), Some("ocean"));
        assert!(prefs.include_symbols);
        assert!(prefs.include_numbers);
        assert_eq!(prefs.topic_key(), "ocean");
        assert_eq!(Preferences::default().topic_key(), NO_TOPIC);
    }
}
