//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::state::{AppInfo, HotkeyValidation, Language, Theme, TypingMethod, UiSnapshot};

/// Commands understood by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "args", rename_all = "snake_case")]
pub enum Command {
    GetState,
    SetEnabled { enabled: bool },
    SetTypingMethod { method: TypingMethod },
    SetHotkey { hotkey: String },
    CheckHotkey { hotkey: String },
    SetAutoToggle { enabled: bool },
    SetMacroEnabled { enabled: bool },
    SetLaunchOnLogin { enabled: bool },
    SetShowMenubarIcon { enabled: bool },
    SetExcludeAppsEnabled { enabled: bool },
    SetOpenWindowOnLaunch { enabled: bool },
    SetTheme { theme: Theme },
    SetLanguage { language: Language },
    AddMacro { source: String, target: String },
    DeleteMacro { source: String },
    AddExcludedApp { app: AppInfo },
    RemoveExcludedApp { path: String },
    SearchApps { query: Option<String> },
    OpenUrl { url: String },
    RequestAccessibilityPermission,
}

impl Command {
    /// Command name for logs and notices
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetState => "getState",
            Command::SetEnabled { .. } => "setEnabled",
            Command::SetTypingMethod { .. } => "setTypingMethod",
            Command::SetHotkey { .. } => "setHotkey",
            Command::CheckHotkey { .. } => "checkHotkey",
            Command::SetAutoToggle { .. } => "setAutoToggle",
            Command::SetMacroEnabled { .. } => "setMacroEnabled",
            Command::SetLaunchOnLogin { .. } => "setLaunchOnLogin",
            Command::SetShowMenubarIcon { .. } => "setShowMenubarIcon",
            Command::SetExcludeAppsEnabled { .. } => "setExcludeAppsEnabled",
            Command::SetOpenWindowOnLaunch { .. } => "setOpenWindowOnLaunch",
            Command::SetTheme { .. } => "setTheme",
            Command::SetLanguage { .. } => "setLanguage",
            Command::AddMacro { .. } => "addMacro",
            Command::DeleteMacro { .. } => "deleteMacro",
            Command::AddExcludedApp { .. } => "addExcludedApp",
            Command::RemoveExcludedApp { .. } => "removeExcludedApp",
            Command::SearchApps { .. } => "searchApps",
            Command::OpenUrl { .. } => "openUrl",
            Command::RequestAccessibilityPermission => "requestAccessibilityPermission",
        }
    }
}

/// Requests from the control surface to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum Request {
    /// Run one command and reply once
    Invoke(Command),

    /// Keep the connection open and push notifications over it
    Subscribe,
}

/// Responses from the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Response {
    /// Full state snapshot
    State(Box<UiSnapshot>),

    /// Hotkey check result
    Validation(HotkeyValidation),

    /// App catalog lookup result
    Apps(Vec<AppInfo>),

    /// Accessibility permission outcome
    Permission(bool),

    /// Command done, nothing to return
    Ack,

    /// Subscription confirmed
    Subscribed,

    /// Push notification on a subscribed connection
    Notification(Notification),

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    /// Variant name for error reporting
    pub fn kind(&self) -> &'static str {
        match self {
            Response::State(_) => "state",
            Response::Validation(_) => "validation",
            Response::Apps(_) => "apps",
            Response::Permission(_) => "permission",
            Response::Ack => "ack",
            Response::Subscribed => "subscribed",
            Response::Notification(_) => "notification",
            Response::Error { .. } => "error",
        }
    }
}

/// Push notification from the engine to subscribed clients.
///
/// The payload shape is not part of the contract; receivers re-pull state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Notification {
    /// Something in the engine state changed
    StateChanged {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
}
