use std::time::Instant;

use tracing::debug;

use crate::session::keystroke::{ExpectedChar, KeyId, Keystroke, MutationKind};
use crate::session::reference::ReferenceText;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationVerdict {
    Accept,
    Reject,
}

/// Captures the per-round keystroke log through three ordered hooks:
/// `on_key_down` (before the edit), `on_before_mutate` (edit described, not
/// applied) and `on_after_mutate` (edit applied).
#[derive(Clone, Debug, Default)]
pub struct KeystrokeRecorder {
    log: Vec<Keystroke>,
    last_press: Option<Instant>,
    /// Index of the keystroke whose mutation has not been observed yet.
    pending: Option<usize>,
}

impl KeystrokeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &[Keystroke] {
        &self.log
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Start a fresh log. The old one is dropped, never edited in place.
    pub fn reset(&mut self) {
        self.log = Vec::new();
        self.last_press = None;
        self.pending = None;
    }

    /// Append a keystroke. `cursor` and `buffer_len` describe the field
    /// before the edit is applied.
    pub fn on_key_down(
        &mut self,
        key: KeyId,
        cursor: usize,
        buffer_len: usize,
        now: Instant,
    ) -> &Keystroke {
        let delta_ms = match self.last_press {
            Some(prev) if !self.log.is_empty() => {
                now.saturating_duration_since(prev).as_millis() as u64
            }
            _ => 0,
        };
        self.last_press = Some(now);
        self.log.push(Keystroke::new(key, delta_ms, cursor, buffer_len));
        self.pending = Some(self.log.len() - 1);
        &self.log[self.log.len() - 1]
    }

    /// A key press that is not logged (navigation, Delete, modifiers). Any
    /// mutation it causes must not be attributed to the previous keystroke's
    /// correctness check.
    pub fn on_unlogged_key(&mut self) {
        self.pending = None;
    }

    pub fn on_before_mutate(&mut self, kind: MutationKind) -> MutationVerdict {
        if kind.is_foreign_insert() {
            debug!(kind = %kind, "rejected non-organic insert");
            return MutationVerdict::Reject;
        }
        if !kind.is_plain() {
            if let Some(last) = self.log.last_mut() {
                last.mutation_kind = Some(kind);
            }
        }
        MutationVerdict::Accept
    }

    /// `caret` is the collapsed caret after the edit; the char just written
    /// sits right before it.
    pub fn on_after_mutate(&mut self, buffer: &[char], caret: usize, reference: &ReferenceText) {
        let Some(mut idx) = self.pending.take() else {
            return;
        };

        let key = self.log[idx].key;
        if buffer.len() == 1 && !key.is_backspace() && self.log.len() > 1 {
            // Whole buffer replaced by one char: a new attempt starts here.
            let mut survivor = self.log[idx].clone();
            survivor.delta_ms = 0;
            survivor.mutation_kind = None;
            debug!(discarded = self.log.len() - 1, "collapsed log after whole-buffer replace");
            self.log = vec![survivor];
            idx = 0;
        }

        if key.is_backspace() || caret == 0 {
            return;
        }
        let written = caret - 1;
        let Some(&actual) = buffer.get(written) else {
            return;
        };
        let expected = reference.char_at(written);
        if expected != Some(actual) {
            let ks = &mut self.log[idx];
            ks.mistyped = true;
            ks.expected_char = Some(match expected {
                Some(ch) => ExpectedChar::Char(ch),
                None => ExpectedChar::Overflow,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    struct Harness {
        recorder: KeystrokeRecorder,
        reference: ReferenceText,
        buffer: Vec<char>,
        caret: usize,
        t0: Instant,
    }

    impl Harness {
        fn new(reference: &str) -> Self {
            Self {
                recorder: KeystrokeRecorder::new(),
                reference: ReferenceText::new(reference),
                buffer: Vec::new(),
                caret: 0,
                t0: Instant::now(),
            }
        }

        fn type_char(&mut self, ch: char, ms: u64) {
            let now = self.t0 + Duration::from_millis(ms);
            self.recorder
                .on_key_down(KeyId::Char(ch), self.caret, self.buffer.len(), now);
            assert_eq!(
                self.recorder.on_before_mutate(MutationKind::InsertText),
                MutationVerdict::Accept
            );
            self.buffer.insert(self.caret, ch);
            self.caret += 1;
            self.recorder
                .on_after_mutate(&self.buffer, self.caret, &self.reference);
        }

        fn backspace(&mut self, ms: u64) {
            let now = self.t0 + Duration::from_millis(ms);
            self.recorder
                .on_key_down(KeyId::Backspace, self.caret, self.buffer.len(), now);
            self.recorder.on_before_mutate(MutationKind::DeleteContentBackward);
            self.caret -= 1;
            self.buffer.remove(self.caret);
            self.recorder
                .on_after_mutate(&self.buffer, self.caret, &self.reference);
        }
    }

    #[test]
    fn test_first_delta_is_zero_then_gaps() {
        let mut h = Harness::new("cat");
        h.type_char('c', 50);
        h.type_char('a', 250);
        h.type_char('t', 450);
        let deltas: Vec<u64> = h.recorder.log().iter().map(|k| k.delta_ms).collect();
        assert_eq!(deltas, vec![0, 200, 200]);
        assert!(h.recorder.log().iter().all(|k| !k.mistyped));
    }

    #[test]
    fn test_mistype_is_tagged_with_expected_char() {
        let mut h = Harness::new("cat");
        h.type_char('c', 0);
        h.type_char('b', 100);
        let b = &h.recorder.log()[1];
        assert!(b.mistyped);
        assert_eq!(b.expected_char, Some(ExpectedChar::Char('a')));
    }

    #[test]
    fn test_backspace_is_never_mistyped() {
        let mut h = Harness::new("cat");
        h.type_char('c', 0);
        h.type_char('b', 100);
        h.backspace(200);
        let bs = &h.recorder.log()[2];
        assert_eq!(bs.key, KeyId::Backspace);
        assert!(!bs.mistyped);
        assert_eq!(bs.cursor_position_at_press, 2);
    }

    #[test]
    fn test_overflow_write_uses_sentinel() {
        let mut h = Harness::new("ab");
        h.type_char('a', 0);
        h.type_char('b', 100);
        h.type_char('c', 200);
        let c = &h.recorder.log()[2];
        assert!(c.mistyped);
        assert_eq!(c.expected_char, Some(ExpectedChar::Overflow));
    }

    #[test]
    fn test_mid_string_edit_checks_written_position() {
        // "ac" -> move caret between a and c -> type b -> "abc"
        let mut h = Harness::new("abc");
        h.type_char('a', 0);
        h.type_char('c', 100);
        h.caret = 1;
        h.type_char('b', 200);
        let c = &h.recorder.log()[1];
        // 'c' landed at index 1 where 'b' was expected
        assert!(c.mistyped);
        let b = &h.recorder.log()[2];
        assert!(!b.mistyped, "insert at index 1 matches reference");
        assert_eq!(b.cursor_position_at_press, 1);
        assert_eq!(b.buffer_length_at_press, 2);
        assert!(!b.at_live_end());
    }

    #[test]
    fn test_paste_is_rejected_without_logging() {
        let mut h = Harness::new("abc");
        h.type_char('a', 0);
        assert_eq!(
            h.recorder.on_before_mutate(MutationKind::InsertFromPaste),
            MutationVerdict::Reject
        );
        assert_eq!(h.recorder.len(), 1);
        assert!(h.recorder.log()[0].mutation_kind.is_none());
    }

    #[test]
    fn test_non_plain_mutation_tags_last_keystroke() {
        let mut h = Harness::new("abc");
        h.type_char('a', 0);
        h.type_char('b', 100);
        let now = h.t0 + Duration::from_millis(300);
        h.recorder.on_key_down(KeyId::Backspace, 2, 2, now);
        h.recorder.on_before_mutate(MutationKind::DeleteWordBackward);
        h.buffer.clear();
        h.caret = 0;
        h.recorder.on_after_mutate(&h.buffer, 0, &h.reference);
        assert_eq!(
            h.recorder.log()[2].mutation_kind,
            Some(MutationKind::DeleteWordBackward)
        );
    }

    #[test]
    fn test_select_all_replace_collapses_log() {
        let mut h = Harness::new("hello");
        for (i, ch) in "hello".chars().enumerate() {
            h.type_char(ch, i as u64 * 100);
        }
        // Select all and type 'x' in one operation.
        let now = h.t0 + Duration::from_millis(900);
        h.recorder.on_key_down(KeyId::Char('x'), 5, 5, now);
        h.recorder.on_before_mutate(MutationKind::InsertReplacementText);
        h.buffer = vec!['x'];
        h.recorder.on_after_mutate(&h.buffer, 1, &h.reference);

        let log = h.recorder.log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].key, KeyId::Char('x'));
        assert_eq!(log[0].delta_ms, 0);
        assert!(log[0].mutation_kind.is_none());
        assert!(log[0].mistyped);
        assert_eq!(log[0].expected_char, Some(ExpectedChar::Char('h')));
    }

    #[test]
    fn test_backspace_down_to_one_char_does_not_collapse() {
        let mut h = Harness::new("ab");
        h.type_char('a', 0);
        h.type_char('x', 100);
        h.backspace(200);
        assert_eq!(h.recorder.len(), 3);
    }

    #[test]
    fn test_unlogged_key_mutation_is_not_checked() {
        let mut h = Harness::new("ab");
        h.type_char('a', 0);
        h.recorder.on_unlogged_key();
        h.recorder.on_before_mutate(MutationKind::DeleteContentForward);
        h.recorder.on_after_mutate(&['a', 'z'], 2, &h.reference);
        assert!(!h.recorder.log()[0].mistyped);
        assert_eq!(
            h.recorder.log()[0].mutation_kind,
            Some(MutationKind::DeleteContentForward)
        );
    }

    #[test]
    fn test_reset_replaces_log() {
        let mut h = Harness::new("ab");
        h.type_char('a', 0);
        h.type_char('b', 500);
        h.recorder.reset();
        assert!(h.recorder.is_empty());
        h.buffer.clear();
        h.caret = 0;
        h.type_char('a', 9000);
        assert_eq!(h.recorder.log()[0].delta_ms, 0);
    }
}
