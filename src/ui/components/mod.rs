pub mod keystroke_log;
pub mod summary_panel;
pub mod typing_area;
