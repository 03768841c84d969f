pub mod field;
pub mod keystroke;
pub mod recorder;
pub mod reference;
pub mod render;
pub mod round;
