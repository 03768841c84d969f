use icu_normalizer::ComposingNormalizerBorrowed;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    Rtl,
}

/// The sentence the user has to reproduce. Immutable for the lifetime of a round.
/// Held in NFC so each precomposed letter is one position and one keypress.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceText {
    raw: String,
    chars: Vec<char>,
    direction: Direction,
}

impl ReferenceText {
    pub fn new(text: &str) -> Self {
        let raw = ComposingNormalizerBorrowed::new_nfc().normalize(text).into_owned();
        let chars: Vec<char> = raw.chars().collect();
        let direction = if chars.iter().copied().any(is_rtl_char) {
            Direction::Rtl
        } else {
            Direction::Ltr
        };
        Self {
            raw,
            chars,
            direction,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Length in chars, not bytes.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn char_at(&self, idx: usize) -> Option<char> {
        self.chars.get(idx).copied()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Exact match after NFC, so an input method that emits a base letter
    /// plus a combining accent still completes the round.
    pub fn matches(&self, buffer: &[char]) -> bool {
        if self.chars.as_slice() == buffer {
            return true;
        }
        let typed: String = buffer.iter().collect();
        ComposingNormalizerBorrowed::new_nfc().normalize(&typed) == self.raw.as_str()
    }
}

fn is_rtl_char(ch: char) -> bool {
    matches!(ch as u32,
        0x0590..=0x08FF       // Hebrew, Arabic, Syriac, Thaana, NKo, Samaritan, Mandaic
        | 0xFB1D..=0xFDFF     // Hebrew/Arabic presentation forms A
        | 0xFE70..=0xFEFF     // Arabic presentation forms B
        | 0x10800..=0x10FFF   // historic RTL scripts
        | 0x1E800..=0x1EFFF)
}
