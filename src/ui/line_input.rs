use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::session::field::EditAction;

/// What a terminal key press means to the typing surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyCommand {
    Edit(EditAction),
    /// Abandon the attempt and start the same sentence over.
    Reset,
    Quit,
    ToggleSymbols,
    ToggleNumbers,
    Unhandled,
}

pub fn map_key(key: KeyEvent) -> KeyCommand {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let extend = key.modifiers.contains(KeyModifiers::SHIFT);

    match key.code {
        KeyCode::Esc => KeyCommand::Quit,
        KeyCode::Char('c') if ctrl => KeyCommand::Quit,
        KeyCode::Enter => KeyCommand::Reset,
        KeyCode::F(2) => KeyCommand::ToggleSymbols,
        KeyCode::F(3) => KeyCommand::ToggleNumbers,

        KeyCode::Char('a') if ctrl => KeyCommand::Edit(EditAction::SelectAll),
        KeyCode::Char('e') if ctrl => KeyCommand::Edit(EditAction::End { extend: false }),
        KeyCode::Char('w') if ctrl => KeyCommand::Edit(EditAction::DeleteWordBackward),
        KeyCode::Char(_) if ctrl || alt => KeyCommand::Unhandled,
        KeyCode::Char(ch) => KeyCommand::Edit(EditAction::Char(ch)),

        KeyCode::Backspace if ctrl || alt => KeyCommand::Edit(EditAction::DeleteWordBackward),
        KeyCode::Backspace => KeyCommand::Edit(EditAction::Backspace),
        KeyCode::Delete => KeyCommand::Edit(EditAction::DeleteForward),

        KeyCode::Left => KeyCommand::Edit(EditAction::Left { extend }),
        KeyCode::Right => KeyCommand::Edit(EditAction::Right { extend }),
        KeyCode::Home => KeyCommand::Edit(EditAction::Home { extend }),
        KeyCode::End => KeyCommand::Edit(EditAction::End { extend }),

        _ => KeyCommand::Unhandled,
    }
}
