use std::sync::Mutex;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rust_embed::Embed;
use tracing::debug;

use crate::engine::problematic::{ProblematicKeyEntry, SpeedBucket};
use crate::error::OracleError;
use crate::oracle::{OracleRequest, OracleResponse, SentenceOracle};

#[derive(Embed)]
#[folder = "assets/sentences/"]
struct SentenceAssets;

const TOP_CHOICES: usize = 3;
const NOTE_WORD_LIMIT: usize = 40;
const PLAIN_PUNCTUATION: &str = ".,;:'\"!?-";

/// Offline stand-in for the remote coach: picks the bundled sentence that
/// drills the most problematic keys and writes a short note from the summary.
pub struct LocalOracle {
    sentences: Vec<String>,
    rng: Mutex<SmallRng>,
}

impl LocalOracle {
    pub fn new() -> Self {
        Self::with_sentences(bundled_sentences(), SmallRng::from_entropy())
    }

    pub fn with_sentences(sentences: Vec<String>, rng: SmallRng) -> Self {
        Self {
            sentences,
            rng: Mutex::new(rng),
        }
    }

    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    fn pick(&self, request: &OracleRequest) -> Option<String> {
        let allowed = |s: &&String| {
            s.as_str() != request.reference_text
                && (request.include_numbers || !s.chars().any(|c| c.is_ascii_digit()))
                && (request.include_symbols || !s.chars().any(is_symbol))
        };
        let mut candidates: Vec<(u32, &String)> = self
            .sentences
            .iter()
            .filter(allowed)
            .map(|s| (score(s, request), s))
            .collect();
        if candidates.is_empty() {
            candidates = self
                .sentences
                .iter()
                .filter(|s| s.as_str() != request.reference_text)
                .map(|s| (0, s))
                .collect();
        }
        if candidates.is_empty() {
            return None;
        }

        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        let top = candidates[0].0;
        let pool = if top > 0 {
            candidates
                .iter()
                .take_while(|(s, _)| *s > 0)
                .take(TOP_CHOICES)
                .count()
        } else {
            candidates.len()
        };

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let idx = rng.gen_range(0..pool);
        debug!(score = candidates[idx].0, pool, "local oracle picked sentence");
        Some(candidates[idx].1.clone())
    }
}

impl Default for LocalOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl SentenceOracle for LocalOracle {
    fn next_round(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        let next_sentence = self.pick(request).ok_or(OracleError::EmptySentence)?;
        Ok(OracleResponse {
            next_sentence,
            note: compose_note(request),
        })
    }
}

fn bundled_sentences() -> Vec<String> {
    SentenceAssets::iter()
        .filter_map(|name| SentenceAssets::get(&name))
        .filter_map(|file| String::from_utf8(file.data.into_owned()).ok())
        .flat_map(|content| {
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

fn is_symbol(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace() && !PLAIN_PUNCTUATION.contains(c)
}

/// Problem-key hits, doubled for the exact bigram that tripped the typist,
/// plus a bonus for every topic word the sentence mentions.
fn score(sentence: &str, request: &OracleRequest) -> u32 {
    let lower: Vec<char> = sentence.to_lowercase().chars().collect();
    let mut total = 0u32;

    for entry in &request.problematic_keys {
        let key = fold(entry.key);
        total += lower.iter().filter(|&&c| c == key).count() as u32;
        if let Some(&prev) = entry.preceding_keys.last() {
            let prev = fold(prev);
            let bigrams = lower
                .windows(2)
                .filter(|w| w[0] == prev && w[1] == key)
                .count() as u32;
            total += bigrams * 2;
        }
    }

    if let Some(topic) = &request.practice_topic {
        let haystack: String = lower.iter().collect();
        total += topic
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.chars().count() >= 3 && haystack.contains(*w))
            .count() as u32
            * 3;
    }
    total
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn describe(entry: &ProblematicKeyEntry) -> String {
    let context: String = entry.preceding_keys.iter().rev().take(2).rev().collect();
    if context.trim().is_empty() {
        format!("'{}'", entry.key)
    } else {
        format!("'{}' after \"{}\"", entry.key, context)
    }
}

fn compose_note(request: &OracleRequest) -> String {
    let summary = &request.performance_summary;
    let mut note = format!(
        "{} wpm at {}% accuracy.",
        summary.words_per_minute, summary.accuracy_percent
    );

    let slow: Vec<String> = request
        .problematic_keys
        .iter()
        .filter(|p| {
            matches!(
                p.speed_bucket,
                SpeedBucket::Slow | SpeedBucket::Slower | SpeedBucket::Slowest
            )
        })
        .take(3)
        .map(describe)
        .collect();
    let missed: Vec<String> = request
        .problematic_keys
        .iter()
        .filter(|p| p.mistyped)
        .take(3)
        .map(|p| format!("'{}'", p.key))
        .collect();

    if !slow.is_empty() {
        note.push_str(&format!(" Slow on {}.", slow.join(", ")));
    }
    if !missed.is_empty() {
        note.push_str(&format!(" Missed {}.", missed.join(", ")));
    }
    if slow.is_empty() && missed.is_empty() {
        note.push_str(" Clean, even round; keep the rhythm.");
    }

    let words: Vec<&str> = note.split_whitespace().collect();
    if words.len() > NOTE_WORD_LIMIT {
        words[..NOTE_WORD_LIMIT].join(" ")
    } else {
        note
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::metrics::PerformanceSummary;

    fn request(problems: Vec<ProblematicKeyEntry>) -> OracleRequest {
        OracleRequest {
            reference_text: "cat".into(),
            problematic_keys: problems,
            performance_summary: PerformanceSummary {
                words_per_minute: 42,
                accuracy_percent: 95,
                consistency_percent: 80,
                notes: String::new(),
                recorded_at: chrono::Utc::now(),
            },
            practice_topic: None,
            performance_history: vec![],
            include_symbols: true,
            include_numbers: true,
        }
    }

    fn slow(key: char, preceding: &str) -> ProblematicKeyEntry {
        ProblematicKeyEntry {
            key,
            speed_bucket: SpeedBucket::Slowest,
            preceding_keys: preceding.chars().collect(),
            mistyped: false,
            expected_char: None,
        }
    }

    fn oracle(sentences: &[&str]) -> LocalOracle {
        LocalOracle::with_sentences(
            sentences.iter().map(|s| s.to_string()).collect(),
            SmallRng::seed_from_u64(7),
        )
    }

    #[test]
    fn test_bundled_sentences_load() {
        let oracle = LocalOracle::new();
        assert!(oracle.sentence_count() > 20);
        assert!(bundled_sentences().iter().all(|s| !s.starts_with('#')));
    }

    #[test]
    fn test_prefers_sentence_with_problem_keys() {
        let oracle = oracle(&["aaa bbb", "quiet queens quip", "zzz"]);
        let reply = oracle.next_round(&request(vec![slow('q', "th")])).unwrap();
        assert_eq!(reply.next_sentence, "quiet queens quip");
    }

    #[test]
    fn test_never_repeats_reference() {
        let oracle = oracle(&["cat", "dog"]);
        for _ in 0..10 {
            let reply = oracle.next_round(&request(vec![slow('c', "")])).unwrap();
            assert_eq!(reply.next_sentence, "dog");
        }
    }

    #[test]
    fn test_respects_number_and_symbol_preferences() {
        let oracle = oracle(&["pay $5 now", "pay 5 now", "pay now please"]);
        let mut req = request(vec![slow('p', "")]);
        req.include_numbers = false;
        req.include_symbols = false;
        for _ in 0..10 {
            assert_eq!(oracle.next_round(&req).unwrap().next_sentence, "pay now please");
        }
    }

    #[test]
    fn test_topic_words_raise_score() {
        let oracle = oracle(&["the garden is green", "rockets reach orbit"]);
        let mut req = request(vec![]);
        req.practice_topic = Some("rockets".into());
        assert_eq!(oracle.next_round(&req).unwrap().next_sentence, "rockets reach orbit");
    }

    #[test]
    fn test_empty_pool_is_an_error() {
        let oracle = oracle(&["cat"]);
        assert!(matches!(
            oracle.next_round(&request(vec![])),
            Err(OracleError::EmptySentence)
        ));
    }

    #[test]
    fn test_note_mentions_slow_and_missed_keys() {
        let mut missed = slow('e', "th");
        missed.speed_bucket = SpeedBucket::Normal;
        missed.mistyped = true;
        let note = compose_note(&request(vec![slow('q', "xyth"), missed]));
        assert!(note.starts_with("42 wpm at 95% accuracy."));
        assert!(note.contains("'q' after \"th\""));
        assert!(note.contains("Missed 'e'"));
        assert!(note.split_whitespace().count() <= NOTE_WORD_LIMIT);
    }

    #[test]
    fn test_clean_round_note() {
        let note = compose_note(&request(vec![]));
        assert!(note.contains("Clean"));
    }
}
