//! Key tokens, modifier tracking and hotkey canonicalization
//!
//! Converts raw key-down events into the canonical hotkey string the engine
//! understands: lowercase tokens joined by `+`, modifiers always ordered
//! `super, ctrl, alt, shift` (then `capslock`), terminal key last.

use std::fmt;
use std::str::FromStr;

/// A modifier key, declared in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    /// Command on macOS, Windows/Super elsewhere
    Super,
    /// Control
    Ctrl,
    /// Option/Alt
    Alt,
    /// Shift
    Shift,
    /// Caps Lock (only ever reported by the engine, never recorded)
    CapsLock,
}

impl Modifier {
    /// Every modifier in canonical order
    pub const ALL: [Modifier; 5] = [
        Modifier::Super,
        Modifier::Ctrl,
        Modifier::Alt,
        Modifier::Shift,
        Modifier::CapsLock,
    ];

    /// Token used in the canonical hotkey string
    pub fn token(self) -> &'static str {
        match self {
            Modifier::Super => "super",
            Modifier::Ctrl => "ctrl",
            Modifier::Alt => "alt",
            Modifier::Shift => "shift",
            Modifier::CapsLock => "capslock",
        }
    }

    /// Symbol used when rendering a hotkey for display
    pub fn symbol(self) -> &'static str {
        match self {
            Modifier::Super => "⌘",
            Modifier::Ctrl => "⌃",
            Modifier::Alt => "⌥",
            Modifier::Shift => "⇧",
            Modifier::CapsLock => "⇪",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.token() == token)
    }

    /// Modifier named by a raw key name, when the pressed key is itself a modifier
    pub fn from_key_name(name: &str) -> Option<Self> {
        match name {
            "Meta" | "Command" | "Super" => Some(Modifier::Super),
            "Control" => Some(Modifier::Ctrl),
            "Alt" | "Option" => Some(Modifier::Alt),
            "Shift" => Some(Modifier::Shift),
            _ => None,
        }
    }
}

/// Tracks which modifier keys are currently pressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModifierState {
    /// Command/Super key is held
    pub super_key: bool,
    /// Control key is held
    pub ctrl: bool,
    /// Option/Alt key is held
    pub alt: bool,
    /// Shift key is held
    pub shift: bool,
    /// Caps Lock is active
    pub capslock: bool,
}

impl ModifierState {
    /// Check if all modifiers are released
    pub fn is_empty(&self) -> bool {
        !self.super_key && !self.ctrl && !self.alt && !self.shift && !self.capslock
    }

    /// Check whether a given modifier is held
    pub fn contains(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Super => self.super_key,
            Modifier::Ctrl => self.ctrl,
            Modifier::Alt => self.alt,
            Modifier::Shift => self.shift,
            Modifier::CapsLock => self.capslock,
        }
    }

    /// Mark a modifier as held
    pub fn insert(&mut self, modifier: Modifier) {
        match modifier {
            Modifier::Super => self.super_key = true,
            Modifier::Ctrl => self.ctrl = true,
            Modifier::Alt => self.alt = true,
            Modifier::Shift => self.shift = true,
            Modifier::CapsLock => self.capslock = true,
        }
    }

    /// Builder-style variant of [`ModifierState::insert`]
    pub fn with(mut self, modifier: Modifier) -> Self {
        self.insert(modifier);
        self
    }

    /// Held modifiers, in canonical order
    pub fn iter(&self) -> impl Iterator<Item = Modifier> + '_ {
        Modifier::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

/// The non-modifier key that ends a combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalKey {
    Space,
    Enter,
    Tab,
    Esc,
    Delete,
    /// A single printable character, stored lowercase
    Char(char),
}

impl TerminalKey {
    /// Map a raw key name (`" "`, `"Enter"`, `"Escape"`, `"k"`, ...) to a key.
    ///
    /// Returns `None` for any other multi-character name such as `"ArrowUp"`.
    pub fn from_key_name(name: &str) -> Option<Self> {
        if name == " " {
            return Some(TerminalKey::Space);
        }
        match name.to_lowercase().as_str() {
            "enter" => Some(TerminalKey::Enter),
            "tab" => Some(TerminalKey::Tab),
            "escape" => Some(TerminalKey::Esc),
            "backspace" | "delete" => Some(TerminalKey::Delete),
            other => single_char(other),
        }
    }

    /// Parse a canonical token (`space`, `esc`, `k`, ...)
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "space" => Some(TerminalKey::Space),
            "enter" => Some(TerminalKey::Enter),
            "tab" => Some(TerminalKey::Tab),
            "esc" => Some(TerminalKey::Esc),
            "delete" => Some(TerminalKey::Delete),
            other => single_char(other),
        }
    }

    /// Parse the `letter` field of an engine hotkey descriptor (`"Space"`, `"K"`)
    pub fn from_letter(letter: &str) -> Option<Self> {
        Self::from_token(&letter.trim().to_lowercase())
    }

    /// Special keys may form a hotkey without any modifier
    pub fn is_special(&self) -> bool {
        !matches!(self, TerminalKey::Char(_))
    }

    /// Value for the descriptor `letter` field
    pub fn letter(&self) -> String {
        match self {
            TerminalKey::Space => "Space".to_string(),
            TerminalKey::Enter => "Enter".to_string(),
            TerminalKey::Tab => "Tab".to_string(),
            TerminalKey::Esc => "Esc".to_string(),
            TerminalKey::Delete => "Delete".to_string(),
            TerminalKey::Char(c) => c.to_uppercase().collect(),
        }
    }

    /// Symbol used when rendering a hotkey for display
    pub fn symbol(&self) -> String {
        match self {
            TerminalKey::Space => "Space".to_string(),
            TerminalKey::Enter => "↵".to_string(),
            TerminalKey::Tab => "⇥".to_string(),
            TerminalKey::Esc => "⎋".to_string(),
            TerminalKey::Delete => "⌫".to_string(),
            TerminalKey::Char(c) => c.to_uppercase().collect(),
        }
    }
}

impl fmt::Display for TerminalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalKey::Space => write!(f, "space"),
            TerminalKey::Enter => write!(f, "enter"),
            TerminalKey::Tab => write!(f, "tab"),
            TerminalKey::Esc => write!(f, "esc"),
            TerminalKey::Delete => write!(f, "delete"),
            TerminalKey::Char(c) => write!(f, "{c}"),
        }
    }
}

// `+` is the token separator and can never be a key of its own.
fn single_char(name: &str) -> Option<TerminalKey> {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c != '+' && !c.is_whitespace() => {
            Some(TerminalKey::Char(c.to_lowercase().next().unwrap_or(c)))
        }
        _ => None,
    }
}

/// One element of a recorded combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyToken {
    Modifier(Modifier),
    Key(TerminalKey),
}

impl KeyToken {
    /// Symbol for the live recording view
    pub fn symbol(&self) -> String {
        match self {
            KeyToken::Modifier(m) => m.symbol().to_string(),
            KeyToken::Key(k) => k.symbol(),
        }
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyToken::Modifier(m) => f.write_str(m.token()),
            KeyToken::Key(k) => fmt::Display::fmt(k, f),
        }
    }
}

/// A modifier set plus an optional terminal key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Hotkey {
    modifiers: ModifierState,
    key: Option<TerminalKey>,
}

impl Hotkey {
    pub fn new(modifiers: ModifierState, key: Option<TerminalKey>) -> Self {
        Self { modifiers, key }
    }

    pub fn modifiers(&self) -> ModifierState {
        self.modifiers
    }

    pub fn key(&self) -> Option<TerminalKey> {
        self.key
    }

    /// Tokens in canonical order, terminal key last
    pub fn tokens(&self) -> Vec<KeyToken> {
        self.modifiers
            .iter()
            .map(KeyToken::Modifier)
            .chain(self.key.map(KeyToken::Key))
            .collect()
    }

    /// At least one modifier plus a terminal key, or a special key on its own
    pub fn is_acceptable(&self) -> bool {
        match self.key {
            Some(key) => !self.modifiers.is_empty() || key.is_special(),
            None => false,
        }
    }

    /// Deterministic human-readable rendering, e.g. `⌃⇧K`
    pub fn display(&self) -> String {
        self.tokens().iter().map(KeyToken::symbol).collect()
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<String> = self.tokens().iter().map(ToString::to_string).collect();
        f.write_str(&tokens.join("+"))
    }
}

/// Errors from parsing a canonical hotkey string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseHotkeyError {
    #[error("hotkey is empty")]
    Empty,

    #[error("unknown key token `{0}`")]
    UnknownToken(String),

    #[error("key `{0}` must be the last token")]
    MisplacedKey(String),
}

impl FromStr for Hotkey {
    type Err = ParseHotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseHotkeyError::Empty);
        }

        let mut modifiers = ModifierState::default();
        let mut key: Option<TerminalKey> = None;
        for raw in s.split('+') {
            let token = raw.trim().to_lowercase();
            if let Some(previous) = key {
                return Err(ParseHotkeyError::MisplacedKey(previous.to_string()));
            }
            if let Some(modifier) = Modifier::from_token(&token) {
                modifiers.insert(modifier);
            } else if let Some(terminal) = TerminalKey::from_token(&token) {
                key = Some(terminal);
            } else {
                return Err(ParseHotkeyError::UnknownToken(token));
            }
        }

        Ok(Self { modifiers, key })
    }
}

/// Raw key-down event as delivered by a keyboard listener.
///
/// `key` follows DOM `KeyboardEvent.key` naming: `"Meta"`, `"Control"`,
/// `"Alt"`, `"Shift"`, `" "`, `"Enter"`, `"Escape"`, `"Backspace"`, `"k"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDown {
    pub key: String,
    pub modifiers: ModifierState,
}

impl KeyDown {
    pub fn new(key: impl Into<String>, modifiers: ModifierState) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }
}

/// Outcome of canonicalizing one key-down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    /// Key name outside the allow-list; the event is dropped
    Ignored,
    /// Only modifiers so far, still waiting for a terminal key
    Partial(Vec<KeyToken>),
    /// Complete combination that can't be a global hotkey (bare printable key)
    Rejected(Vec<KeyToken>),
    /// Acceptable hotkey candidate
    Candidate(Hotkey),
}

/// Canonicalize a key-down event.
///
/// Held modifiers are read from the event flags and from the pressed key
/// itself, then emitted in canonical order regardless of press order. Caps
/// Lock state is never part of a recorded hotkey.
pub fn canonicalize(event: &KeyDown) -> Capture {
    let mut modifiers = event.modifiers;
    modifiers.capslock = false;

    if let Some(pressed) = Modifier::from_key_name(&event.key) {
        modifiers.insert(pressed);
        return Capture::Partial(Hotkey::new(modifiers, None).tokens());
    }

    let Some(key) = TerminalKey::from_key_name(&event.key) else {
        return Capture::Ignored;
    };

    let hotkey = Hotkey::new(modifiers, Some(key));
    if hotkey.is_acceptable() {
        Capture::Candidate(hotkey)
    } else {
        Capture::Rejected(hotkey.tokens())
    }
}
