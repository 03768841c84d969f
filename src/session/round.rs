use std::time::Instant;

use tracing::{debug, info, warn};

use crate::engine::metrics::PerformanceSummary;
use crate::engine::problematic::{ProblematicKeyEntry, detect_problematic_keys};
use crate::session::field::{EditAction, TextField};
use crate::session::keystroke::{KeyId, Keystroke, MutationKind};
use crate::session::recorder::{KeystrokeRecorder, MutationVerdict};
use crate::session::reference::ReferenceText;
use crate::session::render::{RenderFrame, classify};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    Capturing,
    Completing,
    AwaitingOracle,
}

/// Everything one round owns. Only the [`RoundController`] mutates it.
#[derive(Clone, Debug)]
pub struct RoundState {
    reference: ReferenceText,
    field: TextField,
    recorder: KeystrokeRecorder,
    is_complete: bool,
}

impl RoundState {
    fn new(reference: ReferenceText) -> Self {
        Self {
            reference,
            field: TextField::new(),
            recorder: KeystrokeRecorder::new(),
            is_complete: false,
        }
    }

    pub fn reference(&self) -> &ReferenceText {
        &self.reference
    }

    pub fn buffer(&self) -> &[char] {
        self.field.text()
    }

    pub fn caret(&self) -> (usize, usize) {
        self.field.selection()
    }

    pub fn keystroke_log(&self) -> &[Keystroke] {
        self.recorder.log()
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }
}

/// A finished round, ready to be handed to the sentence oracle.
#[derive(Clone, Debug)]
pub struct CompletedRound {
    pub round_id: u64,
    pub reference_text: String,
    pub keystrokes: Vec<Keystroke>,
    pub summary: PerformanceSummary,
    pub problematic_keys: Vec<ProblematicKeyEntry>,
}

#[derive(Clone, Debug)]
pub enum InputOutcome {
    /// Nothing changed (e.g. Backspace with the caret at 0).
    Ignored,
    Navigated,
    /// A paste or drop was refused; buffer and log are untouched.
    Rejected,
    Mutated,
    /// Buffer cleared: the round restarts on the same reference text.
    Abandoned,
    Completed(CompletedRound),
}

pub struct RoundController {
    state: RoundState,
    phase: RoundPhase,
    round_id: u64,
    frame: RenderFrame,
}

impl RoundController {
    pub fn new(reference_text: &str) -> Self {
        let state = RoundState::new(ReferenceText::new(reference_text));
        let mut controller = Self {
            state,
            phase: RoundPhase::Idle,
            round_id: 1,
            frame: RenderFrame::default(),
        };
        controller.refresh_frame();
        info!(round = controller.round_id, chars = controller.state.reference.len(), "round started");
        controller
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn round_id(&self) -> u64 {
        self.round_id
    }

    pub fn frame(&self) -> &RenderFrame {
        &self.frame
    }

    /// Waiting on the oracle; typing is accepted but cannot complete again.
    pub fn is_loading(&self) -> bool {
        self.phase == RoundPhase::AwaitingOracle
    }

    /// Feed one user intent from an input surface through the hook sequence.
    pub fn handle(&mut self, action: &EditAction, now: Instant) -> InputOutcome {
        if action.is_navigation() {
            self.on_key_down(None, now);
            return if self.state.field.navigate(action) {
                self.refresh_frame();
                InputOutcome::Navigated
            } else {
                InputOutcome::Ignored
            };
        }

        let key = match action {
            EditAction::Char(ch) => KeyId::from_key_name(&ch.to_string()),
            EditAction::Backspace | EditAction::DeleteWordBackward => Some(KeyId::Backspace),
            _ => None,
        };
        if !matches!(action, EditAction::Paste(_)) {
            self.on_key_down(key, now);
        }

        match self.state.field.mutation_for(action) {
            Some(mutation) => {
                if self.on_before_mutate(mutation.kind) == MutationVerdict::Reject {
                    return InputOutcome::Rejected;
                }
                self.on_after_mutate(&mutation.text, mutation.caret, mutation.caret)
            }
            None => self.settle(false),
        }
    }

    /// Key-down hook. `None` for keys that are not logged.
    pub fn on_key_down(&mut self, key: Option<KeyId>, now: Instant) {
        let Some(key) = key else {
            self.state.recorder.on_unlogged_key();
            return;
        };
        let (cursor, _) = self.state.field.selection();
        let buffer_len = self.state.field.len();
        self.state.recorder.on_key_down(key, cursor, buffer_len, now);
        if self.phase == RoundPhase::Idle {
            debug!(round = self.round_id, "capturing");
            self.phase = RoundPhase::Capturing;
        }
    }

    pub fn on_before_mutate(&mut self, kind: MutationKind) -> MutationVerdict {
        self.state.recorder.on_before_mutate(kind)
    }

    /// Post-mutation hook: the surface reports the resulting text and caret.
    pub fn on_after_mutate(
        &mut self,
        text: &[char],
        caret_start: usize,
        caret_end: usize,
    ) -> InputOutcome {
        self.state.field.set(text, caret_start, caret_end);
        let (_, caret) = self.state.field.selection();
        self.state
            .recorder
            .on_after_mutate(self.state.field.text(), caret, &self.state.reference);
        self.settle(true)
    }

    /// Caret or selection moved without a text change.
    pub fn on_select(&mut self, caret_start: usize, caret_end: usize) {
        let text = self.state.field.text().to_vec();
        self.state.field.set(&text, caret_start, caret_end);
        self.refresh_frame();
    }

    /// Explicit abandon: clear the buffer and the log, keep the reference.
    pub fn reset(&mut self) {
        if self.phase == RoundPhase::AwaitingOracle {
            debug!(round = self.round_id, "reset while awaiting oracle; reply will be dropped");
            self.round_id += 1;
        }
        self.state.field.clear();
        self.state.recorder.reset();
        self.state.is_complete = false;
        self.phase = RoundPhase::Idle;
        self.refresh_frame();
    }

    /// Install the oracle's next sentence. Replies for a round that is no
    /// longer current are dropped and `false` is returned.
    pub fn install_next_round(&mut self, round_id: u64, next_sentence: &str) -> bool {
        if round_id != self.round_id || self.phase != RoundPhase::AwaitingOracle {
            warn!(
                reply_round = round_id,
                current_round = self.round_id,
                "discarding stale oracle reply"
            );
            return false;
        }
        self.state = RoundState::new(ReferenceText::new(next_sentence));
        self.round_id += 1;
        self.phase = RoundPhase::Idle;
        self.refresh_frame();
        info!(round = self.round_id, chars = self.state.reference.len(), "round started");
        true
    }

    fn settle(&mut self, mutated: bool) -> InputOutcome {
        if self.state.field.is_empty() && self.phase != RoundPhase::Idle {
            self.reset();
            return InputOutcome::Abandoned;
        }
        self.refresh_frame();

        if self.state.is_complete || !self.state.reference.matches(self.state.field.text()) {
            return if mutated {
                InputOutcome::Mutated
            } else {
                InputOutcome::Ignored
            };
        }

        self.state.is_complete = true;
        self.phase = RoundPhase::Completing;
        let completed = self.complete();
        self.phase = RoundPhase::AwaitingOracle;
        InputOutcome::Completed(completed)
    }

    fn complete(&self) -> CompletedRound {
        let log = self.state.recorder.log();
        let summary = PerformanceSummary::from_round(self.state.field.len(), log);
        let problematic_keys = detect_problematic_keys(log);
        info!(
            round = self.round_id,
            wpm = summary.words_per_minute,
            accuracy = summary.accuracy_percent,
            consistency = summary.consistency_percent,
            problems = problematic_keys.len(),
            "round completed"
        );
        debug!(
            keystrokes = %serde_json::to_string(log).unwrap_or_default(),
            "keystroke log"
        );
        CompletedRound {
            round_id: self.round_id,
            reference_text: self.state.reference.as_str().to_string(),
            keystrokes: log.to_vec(),
            summary,
            problematic_keys,
        }
    }

    fn refresh_frame(&mut self) {
        let (start, end) = self.state.field.selection();
        self.frame = classify(&self.state.reference, self.state.field.text(), start, end);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::session::keystroke::ExpectedChar;
    use crate::session::render::{CaretMarker, CellStatus};

    fn type_str(rc: &mut RoundController, s: &str, t0: Instant, start_ms: u64) -> Vec<InputOutcome> {
        s.chars()
            .enumerate()
            .map(|(i, ch)| {
                let now = t0 + Duration::from_millis(start_ms + i as u64 * 200);
                rc.handle(&EditAction::Char(ch), now)
            })
            .collect()
    }

    #[test]
    fn test_new_round_is_idle_with_fresh_frame() {
        let rc = RoundController::new("cat");
        assert_eq!(rc.phase(), RoundPhase::Idle);
        assert_eq!(rc.frame().cells.len(), 4);
        assert!(rc.state().buffer().is_empty());
        assert!(rc.state().keystroke_log().is_empty());
    }

    #[test]
    fn test_select_moves_caret_without_touching_text_or_log() {
        let mut rc = RoundController::new("cat");
        type_str(&mut rc, "ca", Instant::now(), 0);

        rc.on_select(0, 2);
        assert_eq!(rc.state().caret(), (0, 2));
        assert_eq!(rc.state().buffer(), &['c', 'a']);
        assert_eq!(rc.state().keystroke_log().len(), 2);
        assert_eq!(rc.frame().cells[0].marker, Some(CaretMarker::Selection));
        assert_eq!(rc.frame().cells[1].marker, Some(CaretMarker::Selection));
        assert_eq!(rc.frame().cells[2].marker, None);

        // Out-of-range positions clamp to the buffer.
        rc.on_select(9, 9);
        assert_eq!(rc.state().caret(), (2, 2));
        assert_eq!(rc.frame().cells[2].marker, Some(CaretMarker::Cursor));
    }

    #[test]
    fn test_first_key_starts_capture() {
        let mut rc = RoundController::new("cat");
        let outcome = rc.handle(&EditAction::Char('c'), Instant::now());
        assert!(matches!(outcome, InputOutcome::Mutated));
        assert_eq!(rc.phase(), RoundPhase::Capturing);
        assert_eq!(rc.frame().cells[0].status, CellStatus::Correct);
    }

    #[test]
    fn test_exact_match_completes_once() {
        let mut rc = RoundController::new("cat");
        let t0 = Instant::now();
        let outcomes = type_str(&mut rc, "cat", t0, 0);
        let InputOutcome::Completed(done) = &outcomes[2] else {
            panic!("expected completion, got {:?}", outcomes[2]);
        };
        assert_eq!(done.round_id, 1);
        assert_eq!(done.summary.words_per_minute, 90);
        assert_eq!(done.summary.accuracy_percent, 100);
        assert!(done.problematic_keys.is_empty());
        assert_eq!(rc.phase(), RoundPhase::AwaitingOracle);
        assert!(rc.state().is_complete());

        // Retype the last char while loading: never completes twice.
        rc.handle(&EditAction::Backspace, t0 + Duration::from_millis(1000));
        let again = rc.handle(&EditAction::Char('t'), t0 + Duration::from_millis(1200));
        assert!(matches!(again, InputOutcome::Mutated));
        assert!(rc.is_loading());
    }

    #[test]
    fn test_typo_then_fix_scores_one_mistake() {
        let mut rc = RoundController::new("cat");
        let t0 = Instant::now();
        type_str(&mut rc, "cb", t0, 0);
        rc.handle(&EditAction::Backspace, t0 + Duration::from_millis(500));
        let outcomes = type_str(&mut rc, "at", t0, 700);

        let b = &rc.state().keystroke_log()[1];
        assert!(b.mistyped);
        assert_eq!(b.expected_char, Some(ExpectedChar::Char('a')));

        let InputOutcome::Completed(done) = &outcomes[1] else {
            panic!("expected completion");
        };
        assert_eq!(done.keystrokes.len(), 5);
        assert_eq!(done.summary.accuracy_percent, 67);
        assert!(done.problematic_keys.iter().any(|p| p.key == 'b' && p.mistyped));
    }

    #[test]
    fn test_paste_is_rejected() {
        let mut rc = RoundController::new("abc");
        rc.handle(&EditAction::Char('a'), Instant::now());
        let outcome = rc.handle(&EditAction::Paste("bc".into()), Instant::now());
        assert!(matches!(outcome, InputOutcome::Rejected));
        assert_eq!(rc.state().buffer(), &['a']);
        assert_eq!(rc.state().keystroke_log().len(), 1);
    }

    #[test]
    fn test_select_all_replace_restarts_log() {
        let mut rc = RoundController::new("xylophone");
        let t0 = Instant::now();
        type_str(&mut rc, "hello", t0, 0);
        rc.handle(&EditAction::SelectAll, t0 + Duration::from_millis(1500));
        rc.handle(&EditAction::Char('x'), t0 + Duration::from_millis(1700));

        let log = rc.state().keystroke_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].key, KeyId::Char('x'));
        assert_eq!(log[0].delta_ms, 0);
        assert_eq!(rc.state().buffer(), &['x']);
    }

    #[test]
    fn test_clearing_buffer_abandons_round() {
        let mut rc = RoundController::new("abc");
        let t0 = Instant::now();
        type_str(&mut rc, "ab", t0, 0);
        rc.handle(&EditAction::Backspace, t0 + Duration::from_millis(600));
        let outcome = rc.handle(&EditAction::Backspace, t0 + Duration::from_millis(800));
        assert!(matches!(outcome, InputOutcome::Abandoned));
        assert_eq!(rc.phase(), RoundPhase::Idle);
        assert!(rc.state().keystroke_log().is_empty());
        assert!(rc.state().buffer().is_empty());
        assert!(!rc.state().is_complete());
    }

    #[test]
    fn test_oracle_reply_installs_next_round() {
        let mut rc = RoundController::new("ab");
        let t0 = Instant::now();
        let outcomes = type_str(&mut rc, "ab", t0, 0);
        let InputOutcome::Completed(done) = &outcomes[1] else {
            panic!("expected completion");
        };
        assert!(rc.install_next_round(done.round_id, "next one"));
        assert_eq!(rc.phase(), RoundPhase::Idle);
        assert_eq!(rc.state().reference().as_str(), "next one");
        assert!(rc.state().buffer().is_empty());
        assert!(rc.state().keystroke_log().is_empty());
        assert!(!rc.state().is_complete());
        assert_eq!(rc.frame().cells.len(), 9);
    }

    #[test]
    fn test_late_reply_after_local_reset_is_dropped() {
        let mut rc = RoundController::new("ab");
        let t0 = Instant::now();
        let outcomes = type_str(&mut rc, "ab", t0, 0);
        let InputOutcome::Completed(done) = &outcomes[1] else {
            panic!("expected completion");
        };
        rc.reset();
        assert!(!rc.install_next_round(done.round_id, "too late"));
        assert_eq!(rc.state().reference().as_str(), "ab");
        assert_eq!(rc.phase(), RoundPhase::Idle);
    }

    #[test]
    fn test_reply_without_completion_is_dropped() {
        let mut rc = RoundController::new("ab");
        assert!(!rc.install_next_round(rc.round_id(), "unsolicited"));
        assert_eq!(rc.state().reference().as_str(), "ab");
    }

    #[test]
    fn test_arrow_keys_move_caret_without_logging() {
        let mut rc = RoundController::new("abc");
        let t0 = Instant::now();
        type_str(&mut rc, "ac", t0, 0);
        let outcome = rc.handle(&EditAction::Left { extend: false }, t0);
        assert!(matches!(outcome, InputOutcome::Navigated));
        assert_eq!(rc.state().keystroke_log().len(), 2);
        assert_eq!(rc.state().caret(), (1, 1));
        assert_eq!(
            rc.frame().cells[1].marker,
            Some(crate::session::render::CaretMarker::Cursor)
        );
    }

    #[test]
    fn test_raw_hooks_drive_the_same_machine() {
        let mut rc = RoundController::new("hi");
        let t0 = Instant::now();
        rc.on_key_down(Some(KeyId::Char('h')), t0);
        assert_eq!(rc.on_before_mutate(MutationKind::InsertText), MutationVerdict::Accept);
        rc.on_after_mutate(&['h'], 1, 1);
        rc.on_key_down(Some(KeyId::Char('i')), t0 + Duration::from_millis(150));
        rc.on_before_mutate(MutationKind::InsertText);
        let outcome = rc.on_after_mutate(&['h', 'i'], 2, 2);
        assert!(matches!(outcome, InputOutcome::Completed(_)));
        assert_eq!(rc.state().keystroke_log()[1].delta_ms, 150);
    }
}
