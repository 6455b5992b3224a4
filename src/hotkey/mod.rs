//! Hotkey module: key canonicalization and the recording state machine
//!
//! On macOS a CGEventTap listener feeds raw key-downs to the recorder while a
//! new toggle hotkey is being captured.

mod capture;
mod keys;
#[cfg(target_os = "macos")]
mod listener;
mod recorder;

pub use capture::{CaptureError, HotkeyCapture};
pub use keys::{
    canonicalize, Capture, Hotkey, KeyDown, KeyToken, Modifier, ModifierState, ParseHotkeyError,
    TerminalKey,
};
#[cfg(target_os = "macos")]
pub use listener::{HotkeyError, KeyListener};
pub use recorder::{Candidate, Phase, RecorderError, Review, Validation};
