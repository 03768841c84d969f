use crate::session::reference::ReferenceText;

/// Glyph shown in the slot after the last reference character.
pub const END_MARKER_GLYPH: char = '@';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellStatus {
    EndMarker,
    Untouched,
    Correct,
    Mistyped { pressed: char },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaretMarker {
    Cursor,
    Selection,
}

/// One display unit per reference position, plus the trailing end marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    /// Reference char at this position; `None` for the end marker.
    pub expected: Option<char>,
    pub status: CellStatus,
    pub marker: Option<CaretMarker>,
}

impl Cell {
    /// The char a surface should draw: the pressed char for mistypes.
    pub fn glyph(&self) -> char {
        match (self.status, self.expected) {
            (CellStatus::Mistyped { pressed }, _) => pressed,
            (_, Some(ch)) => ch,
            (_, None) => END_MARKER_GLYPH,
        }
    }
}

/// A char typed beyond the reference length. Always a mistype; rebuilt on
/// every pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverflowCell {
    pub pressed: char,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderFrame {
    pub cells: Vec<Cell>,
    pub overflow: Vec<OverflowCell>,
}

impl RenderFrame {
    pub fn correct_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| c.status == CellStatus::Correct)
            .count()
    }

    pub fn mistyped_count(&self) -> usize {
        let in_reference = self
            .cells
            .iter()
            .filter(|c| matches!(c.status, CellStatus::Mistyped { .. }))
            .count();
        in_reference + self.overflow.len()
    }
}

/// Classify every reference position against the current buffer and caret.
/// Pure: identical inputs always give identical frames.
pub fn classify(
    reference: &ReferenceText,
    buffer: &[char],
    caret_start: usize,
    caret_end: usize,
) -> RenderFrame {
    let target = reference.chars();
    let has_selection = caret_start < caret_end;

    let cells = (0..=target.len())
        .map(|i| {
            let expected = target.get(i).copied();
            let status = match expected {
                None => CellStatus::EndMarker,
                Some(_) if i >= buffer.len() => CellStatus::Untouched,
                Some(ch) if buffer[i] == ch => CellStatus::Correct,
                Some(_) => CellStatus::Mistyped { pressed: buffer[i] },
            };
            let marker = if has_selection {
                (caret_start <= i && i < caret_end).then_some(CaretMarker::Selection)
            } else {
                (i == caret_start).then_some(CaretMarker::Cursor)
            };
            Cell {
                expected,
                status,
                marker,
            }
        })
        .collect();

    let overflow = buffer
        .iter()
        .skip(target.len())
        .map(|&pressed| OverflowCell { pressed })
        .collect();

    RenderFrame { cells, overflow }
}
