use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseMutationKindError;

/// Symbolic name used for Backspace on the wire and in the log view.
pub const BACKSPACE_NAME: &str = "Backspace";

/// Identity of a logged key press.
///
/// Only single printable characters and Backspace are ever logged. Modifiers,
/// navigation keys, Enter, Tab and Delete never produce a [`Keystroke`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum KeyId {
    Char(char),
    Backspace,
}

impl KeyId {
    /// Map a key name as reported by an input surface to a loggable key.
    /// Returns `None` for keys that are not logged.
    pub fn from_key_name(name: &str) -> Option<Self> {
        if name == BACKSPACE_NAME {
            return Some(KeyId::Backspace);
        }
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if !ch.is_control() => Some(KeyId::Char(ch)),
            _ => None,
        }
    }

    pub fn as_char(self) -> Option<char> {
        match self {
            KeyId::Char(ch) => Some(ch),
            KeyId::Backspace => None,
        }
    }

    pub fn is_backspace(self) -> bool {
        matches!(self, KeyId::Backspace)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyId::Char(ch) => write!(f, "{ch}"),
            KeyId::Backspace => f.write_str(BACKSPACE_NAME),
        }
    }
}

impl From<KeyId> for String {
    fn from(key: KeyId) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for KeyId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        KeyId::from_key_name(&value).ok_or_else(|| format!("not a loggable key: {value:?}"))
    }
}

/// Classification of a text mutation, named after the DOM `inputType` values
/// so browser-backed input surfaces can pass them straight through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationKind {
    InsertText,
    InsertReplacementText,
    InsertCompositionText,
    InsertLineBreak,
    InsertFromPaste,
    InsertFromDrop,
    InsertFromPasteAsQuotation,
    DeleteContent,
    DeleteContentBackward,
    DeleteContentForward,
    DeleteWordBackward,
    DeleteWordForward,
    DeleteByCut,
    HistoryUndo,
    HistoryRedo,
}

const MUTATION_NAMES: &[(MutationKind, &str)] = &[
    (MutationKind::InsertText, "insertText"),
    (MutationKind::InsertReplacementText, "insertReplacementText"),
    (MutationKind::InsertCompositionText, "insertCompositionText"),
    (MutationKind::InsertLineBreak, "insertLineBreak"),
    (MutationKind::InsertFromPaste, "insertFromPaste"),
    (MutationKind::InsertFromDrop, "insertFromDrop"),
    (MutationKind::InsertFromPasteAsQuotation, "insertFromPasteAsQuotation"),
    (MutationKind::DeleteContent, "deleteContent"),
    (MutationKind::DeleteContentBackward, "deleteContentBackward"),
    (MutationKind::DeleteContentForward, "deleteContentForward"),
    (MutationKind::DeleteWordBackward, "deleteWordBackward"),
    (MutationKind::DeleteWordForward, "deleteWordForward"),
    (MutationKind::DeleteByCut, "deleteByCut"),
    (MutationKind::HistoryUndo, "historyUndo"),
    (MutationKind::HistoryRedo, "historyRedo"),
];

impl MutationKind {
    pub fn as_str(self) -> &'static str {
        MUTATION_NAMES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, name)| *name)
            .unwrap_or("unknown")
    }

    /// Pastes and drops never reach the buffer.
    pub fn is_foreign_insert(self) -> bool {
        matches!(
            self,
            MutationKind::InsertFromPaste
                | MutationKind::InsertFromDrop
                | MutationKind::InsertFromPasteAsQuotation
        )
    }

    /// A plain single-character insert or backward delete. Anything else gets
    /// recorded on the keystroke that caused it.
    pub fn is_plain(self) -> bool {
        matches!(
            self,
            MutationKind::InsertText | MutationKind::DeleteContentBackward
        )
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutationKind {
    type Err = ParseMutationKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MUTATION_NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(kind, _)| *kind)
            .ok_or_else(|| ParseMutationKindError(s.to_string()))
    }
}

/// What should have been typed at a mistyped position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ExpectedChar {
    Char(char),
    /// The write landed past the end of the reference text.
    Overflow,
}

const OVERFLOW_NAME: &str = "overflow";

impl From<ExpectedChar> for String {
    fn from(expected: ExpectedChar) -> Self {
        match expected {
            ExpectedChar::Char(ch) => ch.to_string(),
            ExpectedChar::Overflow => OVERFLOW_NAME.to_string(),
        }
    }
}

impl TryFrom<String> for ExpectedChar {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == OVERFLOW_NAME {
            return Ok(ExpectedChar::Overflow);
        }
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Ok(ExpectedChar::Char(ch)),
            _ => Err(format!("invalid expected char: {value:?}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keystroke {
    /// Milliseconds since the previous logged press; 0 for the first press of a round.
    #[serde(rename = "delta")]
    pub delta_ms: u64,
    pub key: KeyId,
    pub cursor_position_at_press: usize,
    pub buffer_length_at_press: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation_kind: Option<MutationKind>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mistyped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_char: Option<ExpectedChar>,
}

impl Keystroke {
    pub fn new(key: KeyId, delta_ms: u64, cursor: usize, buffer_len: usize) -> Self {
        Self {
            delta_ms,
            key,
            cursor_position_at_press: cursor,
            buffer_length_at_press: buffer_len,
            mutation_kind: None,
            mistyped: false,
            expected_char: None,
        }
    }

    /// Typed at the live end of the buffer rather than as an in-place correction.
    pub fn at_live_end(&self) -> bool {
        self.cursor_position_at_press == self.buffer_length_at_press
    }
}
