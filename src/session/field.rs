use crate::session::keystroke::MutationKind;

/// A user intent coming from an input surface, before it touches the buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditAction {
    Char(char),
    Backspace,
    /// Ctrl+Backspace / Alt+Backspace.
    DeleteWordBackward,
    DeleteForward,
    Paste(String),
    Left { extend: bool },
    Right { extend: bool },
    Home { extend: bool },
    End { extend: bool },
    SelectAll,
}

impl EditAction {
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            EditAction::Left { .. }
                | EditAction::Right { .. }
                | EditAction::Home { .. }
                | EditAction::End { .. }
                | EditAction::SelectAll
        )
    }
}

/// A described, not yet applied, change to the field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mutation {
    pub kind: MutationKind,
    pub text: Vec<char>,
    /// Collapsed caret position after the change.
    pub caret: usize,
}

/// Editing model of the input surface: text plus a caret with an optional
/// selection. Positions are char indices (0 = before the first char).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextField {
    text: Vec<char>,
    anchor: usize,
    caret: usize,
}

impl TextField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &[char] {
        &self.text
    }

    pub fn value(&self) -> String {
        self.text.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns `(start, end)` with `start == end` when nothing is selected.
    pub fn selection(&self) -> (usize, usize) {
        (self.anchor.min(self.caret), self.anchor.max(self.caret))
    }

    pub fn has_selection(&self) -> bool {
        self.anchor != self.caret
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.anchor = 0;
        self.caret = 0;
    }

    /// Overwrite text and selection wholesale, clamping positions into range.
    pub fn set(&mut self, text: &[char], start: usize, end: usize) {
        self.text = text.to_vec();
        let len = self.text.len();
        self.anchor = start.min(len);
        self.caret = end.min(len).max(self.anchor);
    }

    /// Describe what `action` would do to the text. Navigation and edits that
    /// would not change anything return `None`.
    pub fn mutation_for(&self, action: &EditAction) -> Option<Mutation> {
        let (start, end) = self.selection();
        match action {
            EditAction::Char(ch) => {
                let kind = if self.has_selection() {
                    MutationKind::InsertReplacementText
                } else {
                    MutationKind::InsertText
                };
                Some(self.splice(start, end, &[*ch], kind))
            }
            EditAction::Paste(pasted) => {
                let inserted: Vec<char> = pasted.chars().collect();
                Some(self.splice(start, end, &inserted, MutationKind::InsertFromPaste))
            }
            _ if self.has_selection() && !action.is_navigation() => {
                Some(self.splice(start, end, &[], MutationKind::DeleteContent))
            }
            EditAction::Backspace if self.caret > 0 => Some(self.splice(
                self.caret - 1,
                self.caret,
                &[],
                MutationKind::DeleteContentBackward,
            )),
            EditAction::DeleteWordBackward if self.caret > 0 => {
                let from = self.word_start_before(self.caret);
                Some(self.splice(from, self.caret, &[], MutationKind::DeleteWordBackward))
            }
            EditAction::DeleteForward if self.caret < self.text.len() => Some(self.splice(
                self.caret,
                self.caret + 1,
                &[],
                MutationKind::DeleteContentForward,
            )),
            _ => None,
        }
    }

    pub fn apply(&mut self, mutation: Mutation) {
        self.text = mutation.text;
        let caret = mutation.caret.min(self.text.len());
        self.anchor = caret;
        self.caret = caret;
    }

    /// Move the caret for navigation actions. Returns true if anything moved.
    pub fn navigate(&mut self, action: &EditAction) -> bool {
        let before = (self.anchor, self.caret);
        let len = self.text.len();
        let (start, end) = self.selection();
        match *action {
            EditAction::Left { extend } => {
                if !extend && self.has_selection() {
                    self.collapse_to(start);
                } else {
                    self.move_to(self.caret.saturating_sub(1), extend);
                }
            }
            EditAction::Right { extend } => {
                if !extend && self.has_selection() {
                    self.collapse_to(end);
                } else {
                    self.move_to((self.caret + 1).min(len), extend);
                }
            }
            EditAction::Home { extend } => self.move_to(0, extend),
            EditAction::End { extend } => self.move_to(len, extend),
            EditAction::SelectAll => {
                self.anchor = 0;
                self.caret = len;
            }
            _ => return false,
        }
        before != (self.anchor, self.caret)
    }

    fn move_to(&mut self, pos: usize, extend: bool) {
        self.caret = pos;
        if !extend {
            self.anchor = pos;
        }
    }

    fn collapse_to(&mut self, pos: usize) {
        self.anchor = pos;
        self.caret = pos;
    }

    fn splice(&self, from: usize, to: usize, insert: &[char], kind: MutationKind) -> Mutation {
        let mut text = Vec::with_capacity(self.text.len() + insert.len());
        text.extend_from_slice(&self.text[..from]);
        text.extend_from_slice(insert);
        text.extend_from_slice(&self.text[to..]);
        Mutation {
            kind,
            text,
            caret: from + insert.len(),
        }
    }

    /// Unix-word-rubout: skip whitespace, then non-whitespace.
    fn word_start_before(&self, pos: usize) -> usize {
        let mut pos = pos;
        while pos > 0 && self.text[pos - 1].is_whitespace() {
            pos -= 1;
        }
        while pos > 0 && !self.text[pos - 1].is_whitespace() {
            pos -= 1;
        }
        pos
    }
}
