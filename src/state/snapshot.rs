//! Authoritative engine state as mirrored by the control surface
//!
//! The engine owns every value here. The client only ever replaces its copy
//! wholesale with the snapshot carried by a command response.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hotkey::{Hotkey, ModifierState, TerminalKey};

/// Vietnamese typing method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypingMethod {
    #[default]
    Telex,
    Vni,
}

impl fmt::Display for TypingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypingMethod::Telex => write!(f, "telex"),
            TypingMethod::Vni => write!(f, "vni"),
        }
    }
}

/// Window theme preference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::System => write!(f, "system"),
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

/// Interface language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Vi,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::En => write!(f, "en"),
            Language::Vi => write!(f, "vi"),
        }
    }
}

/// The committed toggle hotkey, as reported by the engine.
///
/// `display` is derived from the other fields. Fields are private so that a
/// descriptor can only be built through [`HotkeyDescriptor::from_hotkey`] or
/// deserialized from the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotkeyDescriptor {
    display: String,
    super_key: bool,
    ctrl_key: bool,
    alt_key: bool,
    shift_key: bool,
    capslock_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    letter: Option<String>,
}

impl HotkeyDescriptor {
    pub fn from_hotkey(hotkey: &Hotkey) -> Self {
        let modifiers = hotkey.modifiers();
        Self {
            display: hotkey.display(),
            super_key: modifiers.super_key,
            ctrl_key: modifiers.ctrl,
            alt_key: modifiers.alt,
            shift_key: modifiers.shift,
            capslock_key: modifiers.capslock,
            letter: hotkey.key().map(|k| k.letter()),
        }
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn letter(&self) -> Option<&str> {
        self.letter.as_deref()
    }

    pub fn modifiers(&self) -> ModifierState {
        ModifierState {
            super_key: self.super_key,
            ctrl: self.ctrl_key,
            alt: self.alt_key,
            shift: self.shift_key,
            capslock: self.capslock_key,
        }
    }

    pub fn to_hotkey(&self) -> Hotkey {
        let key = self.letter.as_deref().and_then(TerminalKey::from_letter);
        Hotkey::new(self.modifiers(), key)
    }

    /// Canonical string for comparing against a recorded candidate
    pub fn canonical(&self) -> String {
        self.to_hotkey().to_string()
    }
}

/// A text-expansion macro; `source` is unique within the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroEntry {
    pub source: String,
    pub target: String,
}

impl MacroEntry {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// An installed application; `path` is the unique key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub identifier: String,
    pub name: String,
    pub path: String,
}

/// Result of asking the engine whether a hotkey can be used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotkeyValidation {
    pub is_valid: bool,
    pub has_conflict: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HotkeyValidation {
    /// Usable, no conflict
    pub fn available() -> Self {
        Self {
            is_valid: true,
            has_conflict: false,
            message: None,
        }
    }

    /// Stand-in for a validation round trip that failed in transport
    pub fn unchecked() -> Self {
        Self {
            is_valid: false,
            has_conflict: false,
            message: Some("Unable to check hotkey".to_string()),
        }
    }

    pub fn allows_save(&self) -> bool {
        self.is_valid && !self.has_conflict
    }
}

/// Full engine state snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSnapshot {
    pub is_enabled: bool,
    pub typing_method: TypingMethod,
    pub auto_toggle_enabled: bool,
    pub macro_enabled: bool,
    pub launch_on_login: bool,
    pub show_menubar_icon: bool,
    pub theme: Theme,
    pub language: Language,
    pub open_window_on_launch: bool,
    pub accessibility_ready: bool,
    pub exclude_apps_enabled: bool,
    pub hotkey: HotkeyDescriptor,
    pub macros: Vec<MacroEntry>,
    pub excluded_apps: Vec<AppInfo>,
    pub active_app: String,

    /// Engine version string
    #[serde(default)]
    pub version: String,

    /// Engine is in GõX mode (typing through a custom layout)
    #[serde(default)]
    pub gox_mode_enabled: bool,

    /// Vietnamese composition is active in the focused app
    #[serde(default)]
    pub vietnamese_mode_enabled: bool,
}

impl UiSnapshot {
    /// Paths of excluded apps, for membership tests
    pub fn excluded_paths(&self) -> HashSet<&str> {
        self.excluded_apps.iter().map(|a| a.path.as_str()).collect()
    }
}
