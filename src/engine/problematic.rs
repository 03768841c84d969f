use serde::{Deserialize, Serialize};

use crate::engine::metrics::is_timed;
use crate::session::keystroke::{ExpectedChar, Keystroke};

/// How many single-char keys of context are attached to each problematic key.
pub const PRECEDING_CONTEXT: usize = 4;
const OUTLIER_SIGMA: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedBucket {
    Slowest,
    Slower,
    Slow,
    Normal,
    Fast,
    Faster,
    Fastest,
}

impl SpeedBucket {
    /// Bucket by signed distance from the mean in standard deviations.
    /// Checked slow side first, then fast side; first match wins.
    pub fn from_deviation(delta_ms: f64, mean: f64, std_dev: f64) -> Self {
        if std_dev <= 0.0 {
            return SpeedBucket::Normal;
        }
        let z = (delta_ms - mean) / std_dev;
        if z > 3.0 {
            SpeedBucket::Slowest
        } else if z > 2.5 {
            SpeedBucket::Slower
        } else if z > 2.0 {
            SpeedBucket::Slow
        } else if z < -3.0 {
            SpeedBucket::Fastest
        } else if z < -2.5 {
            SpeedBucket::Faster
        } else if z < -2.0 {
            SpeedBucket::Fast
        } else {
            SpeedBucket::Normal
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpeedBucket::Slowest => "slowest",
            SpeedBucket::Slower => "slower",
            SpeedBucket::Slow => "slow",
            SpeedBucket::Normal => "normal",
            SpeedBucket::Fast => "fast",
            SpeedBucket::Faster => "faster",
            SpeedBucket::Fastest => "fastest",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblematicKeyEntry {
    pub key: char,
    pub speed_bucket: SpeedBucket,
    pub preceding_keys: Vec<char>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mistyped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_char: Option<ExpectedChar>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeltaStats {
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub count: usize,
}

impl DeltaStats {
    pub fn of(log: &[Keystroke]) -> Self {
        let deltas: Vec<f64> = log
            .iter()
            .filter(|k| is_timed(k))
            .map(|k| k.delta_ms as f64)
            .collect();
        if deltas.is_empty() {
            return Self::default();
        }
        let n = deltas.len() as f64;
        let mean = deltas.iter().sum::<f64>() / n;
        let variance = deltas.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            std_dev: variance.sqrt(),
            count: deltas.len(),
        }
    }

    pub fn is_slow_outlier(&self, delta_ms: f64) -> bool {
        self.count > 0 && delta_ms > self.mean + OUTLIER_SIGMA * self.std_dev
    }
}

/// The last `n` single-char keys logged strictly before `index`, oldest first.
///
/// Walks raw log order. After backward caret navigation this context no
/// longer matches the text around the caret; that drift is accepted.
pub fn preceding_keys(log: &[Keystroke], index: usize, n: usize) -> Vec<char> {
    let end = index.min(log.len());
    let mut keys: Vec<char> = log[..end]
        .iter()
        .rev()
        .filter_map(|k| k.key.as_char())
        .take(n)
        .collect();
    keys.reverse();
    keys
}

/// Keys that were statistical slow outliers or mistyped, most deviant first.
pub fn detect_problematic_keys(log: &[Keystroke]) -> Vec<ProblematicKeyEntry> {
    let stats = DeltaStats::of(log);

    let mut flagged: Vec<(f64, ProblematicKeyEntry)> = log
        .iter()
        .enumerate()
        .filter(|(_, k)| is_timed(k))
        .filter_map(|(idx, k)| {
            let key = k.key.as_char()?;
            let delta = k.delta_ms as f64;
            if !(stats.is_slow_outlier(delta) || k.mistyped) {
                return None;
            }
            let deviation = if stats.std_dev > 0.0 {
                ((delta - stats.mean) / stats.std_dev).abs()
            } else {
                0.0
            };
            let entry = ProblematicKeyEntry {
                key,
                speed_bucket: SpeedBucket::from_deviation(delta, stats.mean, stats.std_dev),
                preceding_keys: preceding_keys(log, idx, PRECEDING_CONTEXT),
                mistyped: k.mistyped,
                expected_char: k.expected_char,
            };
            Some((deviation, entry))
        })
        .collect();

    flagged.sort_by(|a, b| b.0.total_cmp(&a.0));
    flagged.into_iter().map(|(_, entry)| entry).collect()
}
