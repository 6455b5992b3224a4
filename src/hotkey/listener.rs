//! Key capture listener using macOS CGEventTap
//!
//! While a hotkey is being recorded, every key-down (and every modifier press)
//! is turned into a [`KeyDown`] and swallowed, so the keystroke never reaches
//! the focused application. Runs on a dedicated thread with its own CFRunLoop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventFlags, CGEventTap, CGEventTapLocation, CGEventTapOptions,
    CGEventTapPlacement, CGEventType, EventField,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::keys::{KeyDown, ModifierState};

/// Global key listener feeding raw key-downs to the hotkey recorder
pub struct KeyListener {
    event_tx: mpsc::Sender<KeyDown>,
    running: Arc<AtomicBool>,
}

impl KeyListener {
    /// Create a new key listener
    pub fn new(event_tx: mpsc::Sender<KeyDown>) -> Self {
        Self {
            event_tx,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start capturing.
    ///
    /// Spawns a thread running a CFRunLoop with an event tap inserted at the
    /// head of the session, so captured keys are consumed before anything else
    /// sees them. Capturing continues until `stop()` is called.
    pub fn start(&self) -> Result<(), HotkeyError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(HotkeyError::AlreadyRunning);
        }

        let event_tx = self.event_tx.clone();
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("key-capture".to_string())
            .spawn(move || {
                info!("key capture thread started");

                if let Err(e) = run_event_loop(event_tx, running.clone()) {
                    error!(?e, "key capture error");
                }

                running.store(false, Ordering::SeqCst);
                info!("key capture thread stopped");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                HotkeyError::ThreadSpawn(e.to_string())
            })?;

        Ok(())
    }

    /// Stop capturing; the run loop exits on its next iteration
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the listener is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for KeyListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Errors that can occur in the key listener
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("key listener is already running")]
    AlreadyRunning,

    #[error("failed to create event tap - check Accessibility permissions")]
    EventTapCreation,

    #[error("failed to attach event tap to the run loop")]
    RunLoopSource,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),
}

/// Raw tap payload handed from the callback to the loop
struct TapEvent {
    keycode: u16,
    flags: CGEventFlags,
    is_modifier_change: bool,
}

fn modifiers_from_flags(flags: CGEventFlags) -> ModifierState {
    ModifierState {
        super_key: flags.contains(CGEventFlags::CGEventFlagCommand),
        ctrl: flags.contains(CGEventFlags::CGEventFlagControl),
        alt: flags.contains(CGEventFlags::CGEventFlagAlternate),
        shift: flags.contains(CGEventFlags::CGEventFlagShift),
        capslock: flags.contains(CGEventFlags::CGEventFlagAlphaShift),
    }
}

/// Run the CFRunLoop with the event tap
fn run_event_loop(
    event_tx: mpsc::Sender<KeyDown>,
    running: Arc<AtomicBool>,
) -> Result<(), HotkeyError> {
    let (callback_tx, callback_rx) = std::sync::mpsc::channel::<TapEvent>();

    // CGEventTap callback - must be fast and non-blocking
    let callback = move |_proxy: core_graphics::event::CGEventTapProxy,
                         event_type: CGEventType,
                         event: &CGEvent|
          -> Option<CGEvent> {
        match event_type {
            CGEventType::KeyDown | CGEventType::FlagsChanged => {
                let keycode =
                    event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE) as u16;
                let _ = callback_tx.send(TapEvent {
                    keycode,
                    flags: event.get_flags(),
                    is_modifier_change: matches!(event_type, CGEventType::FlagsChanged),
                });
                // Swallow the keystroke while recording
                None
            }
            CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                warn!("event tap disabled, will re-enable");
                Some(event.clone())
            }
            _ => Some(event.clone()),
        }
    };

    let tap = CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::Default,
        vec![CGEventType::KeyDown, CGEventType::FlagsChanged],
        callback,
    )
    .map_err(|_| {
        error!("failed to create event tap - is Accessibility permission granted?");
        HotkeyError::EventTapCreation
    })?;

    tap.enable();

    let run_loop_source = tap
        .mach_port
        .create_runloop_source(0)
        .map_err(|_| HotkeyError::RunLoopSource)?;
    let run_loop = CFRunLoop::get_current();

    unsafe {
        run_loop.add_source(&run_loop_source, kCFRunLoopCommonModes);
    }

    info!("event tap created and enabled");

    while running.load(Ordering::SeqCst) {
        unsafe {
            CFRunLoop::run_in_mode(
                kCFRunLoopDefaultMode,
                std::time::Duration::from_millis(100),
                true,
            );
        }

        while let Ok(raw) = callback_rx.try_recv() {
            let modifiers = modifiers_from_flags(raw.flags);
            let Some(name) = key_name(raw.keycode) else {
                debug!(keycode = raw.keycode, "unmapped keycode");
                continue;
            };

            // FlagsChanged fires on release too; only presses count
            if raw.is_modifier_change && !is_pressed(name, &modifiers) {
                continue;
            }

            debug!(key = name, ?modifiers, "captured key");
            if event_tx
                .blocking_send(KeyDown::new(name, modifiers))
                .is_err()
            {
                warn!("failed to send key event - channel closed?");
                running.store(false, Ordering::SeqCst);
                break;
            }
        }
    }

    Ok(())
}

fn is_pressed(name: &str, modifiers: &ModifierState) -> bool {
    match name {
        "Meta" => modifiers.super_key,
        "Control" => modifiers.ctrl,
        "Alt" => modifiers.alt,
        "Shift" => modifiers.shift,
        _ => false,
    }
}

/// Map an ANSI virtual keycode to a DOM-style key name
fn key_name(keycode: u16) -> Option<&'static str> {
    let name = match keycode {
        0 => "a",
        1 => "s",
        2 => "d",
        3 => "f",
        4 => "h",
        5 => "g",
        6 => "z",
        7 => "x",
        8 => "c",
        9 => "v",
        11 => "b",
        12 => "q",
        13 => "w",
        14 => "e",
        15 => "r",
        16 => "y",
        17 => "t",
        18 => "1",
        19 => "2",
        20 => "3",
        21 => "4",
        22 => "6",
        23 => "5",
        24 => "=",
        25 => "9",
        26 => "7",
        27 => "-",
        28 => "8",
        29 => "0",
        30 => "]",
        31 => "o",
        32 => "u",
        33 => "[",
        34 => "i",
        35 => "p",
        36 => "Enter",
        37 => "l",
        38 => "j",
        39 => "'",
        40 => "k",
        41 => ";",
        42 => "\\",
        43 => ",",
        44 => "/",
        45 => "n",
        46 => "m",
        47 => ".",
        48 => "Tab",
        49 => " ",
        50 => "`",
        51 => "Backspace",
        53 => "Escape",
        54 | 55 => "Meta",
        56 | 60 => "Shift",
        58 | 61 => "Alt",
        59 | 62 => "Control",
        117 => "Delete",
        123 => "ArrowLeft",
        124 => "ArrowRight",
        125 => "ArrowDown",
        126 => "ArrowUp",
        _ => return None,
    };
    Some(name)
}
