use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::keystroke::Keystroke;

/// Presses slower than this are treated as thinking pauses.
pub const PAUSE_THRESHOLD_MS: u64 = 3000;
/// Keystrokes per rolling consistency window.
pub const CONSISTENCY_WINDOW: usize = 5;
const CHARS_PER_WORD: f64 = 5.0;
const MS_PER_MINUTE: f64 = 60_000.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub words_per_minute: u32,
    pub accuracy_percent: u32,
    pub consistency_percent: u32,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
}

impl PerformanceSummary {
    /// Reduce a finished round. `chars_typed` is the buffer length at completion.
    pub fn from_round(chars_typed: usize, log: &[Keystroke]) -> Self {
        let mistyped = log.iter().filter(|k| k.mistyped).count();
        Self {
            words_per_minute: words_per_minute(chars_typed, log),
            accuracy_percent: accuracy_percent(chars_typed, mistyped),
            consistency_percent: consistency_percent(log),
            notes: String::new(),
            recorded_at: Utc::now(),
        }
    }
}

pub fn total_elapsed_ms(log: &[Keystroke]) -> u64 {
    log.iter().map(|k| k.delta_ms).sum()
}

pub fn words_per_minute(chars_typed: usize, log: &[Keystroke]) -> u32 {
    let total_ms = total_elapsed_ms(log);
    if total_ms == 0 {
        return 0;
    }
    let minutes = total_ms as f64 / MS_PER_MINUTE;
    ((chars_typed as f64 / CHARS_PER_WORD) / minutes).round() as u32
}

pub fn accuracy_percent(chars_typed: usize, mistyped: usize) -> u32 {
    if chars_typed == 0 {
        return 100;
    }
    let ratio = (chars_typed as f64 - mistyped as f64) / chars_typed as f64 * 100.0;
    ratio.max(0.0).round() as u32
}

/// Keystrokes that carry usable timing: no long pause, typed at the live end
/// of the buffer, and not part of a compound mutation.
pub fn is_timed(k: &Keystroke) -> bool {
    k.delta_ms < PAUSE_THRESHOLD_MS && k.at_live_end() && k.mutation_kind.is_none()
}

pub fn timed_keystrokes(log: &[Keystroke]) -> impl Iterator<Item = &Keystroke> {
    log.iter().filter(|k| is_timed(k))
}

/// Instantaneous WPM of every full rolling window over the timed keystrokes.
pub fn window_speeds(log: &[Keystroke]) -> Vec<f64> {
    let deltas: Vec<u64> = timed_keystrokes(log).map(|k| k.delta_ms).collect();
    deltas
        .windows(CONSISTENCY_WINDOW)
        .filter_map(|w| {
            let ms: u64 = w.iter().sum();
            (ms > 0).then(|| {
                (CONSISTENCY_WINDOW as f64 / CHARS_PER_WORD) / (ms as f64 / MS_PER_MINUTE)
            })
        })
        .collect()
}

/// 100 minus the coefficient of variation of rolling-window speed, in percent.
/// Too little data counts as perfectly steady.
pub fn consistency_percent(log: &[Keystroke]) -> u32 {
    let samples = window_speeds(log);
    if samples.len() < 2 {
        return 100;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return 100;
    }
    let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let cv = variance.sqrt() / mean;
    (100.0 - cv * 100.0).clamp(0.0, 100.0).round() as u32
}
