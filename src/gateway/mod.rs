//! Command gateway: typed request/response calls to the engine
//!
//! Every call is exactly one round trip through a [`Transport`]. Nothing is
//! cached, retried or de-duplicated; toggling twice sends two commands.

mod error;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::ipc::{Command, Notification, Response};
use crate::state::{AppInfo, HotkeyValidation, Language, Theme, TypingMethod, UiSnapshot};

pub use error::GatewayError;

/// The single asynchronous call primitive
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one command and wait for its reply.
    ///
    /// An engine-side `error` response is returned as [`GatewayError::Remote`].
    async fn invoke(&self, command: Command) -> Result<Response, GatewayError>;
}

/// Source of `state-changed` push notifications
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Open a subscription; dropping the stream unsubscribes
    async fn subscribe(&self) -> Result<EventStream, GatewayError>;
}

/// An open push subscription
pub struct EventStream {
    rx: mpsc::Receiver<Notification>,
    reader: Option<JoinHandle<()>>,
}

impl EventStream {
    pub fn new(rx: mpsc::Receiver<Notification>) -> Self {
        Self { rx, reader: None }
    }

    /// Stream backed by a reader task that is aborted when the stream drops
    pub fn with_reader(rx: mpsc::Receiver<Notification>, reader: JoinHandle<()>) -> Self {
        Self {
            rx,
            reader: Some(reader),
        }
    }

    /// Next notification, or `None` once the channel is closed
    pub async fn next(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// Typed wrapper around a [`Transport`]
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
}

impl Gateway {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn call(&self, command: Command) -> Result<Response, GatewayError> {
        debug!(command = command.name(), "invoking engine command");
        self.transport.invoke(command).await
    }

    /// Invoke a state-mutating command and unwrap the returned snapshot
    async fn snapshot(&self, command: Command) -> Result<UiSnapshot, GatewayError> {
        let name = command.name();
        match self.call(command).await? {
            Response::State(snapshot) => Ok(*snapshot),
            other => Err(unexpected(name, &other)),
        }
    }

    pub async fn get_state(&self) -> Result<UiSnapshot, GatewayError> {
        self.snapshot(Command::GetState).await
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<UiSnapshot, GatewayError> {
        self.snapshot(Command::SetEnabled { enabled }).await
    }

    pub async fn set_typing_method(
        &self,
        method: TypingMethod,
    ) -> Result<UiSnapshot, GatewayError> {
        self.snapshot(Command::SetTypingMethod { method }).await
    }

    pub async fn set_hotkey(&self, hotkey: &str) -> Result<UiSnapshot, GatewayError> {
        self.snapshot(Command::SetHotkey {
            hotkey: hotkey.to_string(),
        })
        .await
    }

    pub async fn check_hotkey(&self, hotkey: &str) -> Result<HotkeyValidation, GatewayError> {
        let command = Command::CheckHotkey {
            hotkey: hotkey.to_string(),
        };
        let name = command.name();
        match self.call(command).await? {
            Response::Validation(validation) => Ok(validation),
            other => Err(unexpected(name, &other)),
        }
    }

    pub async fn set_auto_toggle(&self, enabled: bool) -> Result<UiSnapshot, GatewayError> {
        self.snapshot(Command::SetAutoToggle { enabled }).await
    }

    pub async fn set_macro_enabled(&self, enabled: bool) -> Result<UiSnapshot, GatewayError> {
        self.snapshot(Command::SetMacroEnabled { enabled }).await
    }

    pub async fn set_launch_on_login(&self, enabled: bool) -> Result<UiSnapshot, GatewayError> {
        self.snapshot(Command::SetLaunchOnLogin { enabled }).await
    }

    pub async fn set_show_menubar_icon(
        &self,
        enabled: bool,
    ) -> Result<UiSnapshot, GatewayError> {
        self.snapshot(Command::SetShowMenubarIcon { enabled }).await
    }

    pub async fn set_exclude_apps_enabled(
        &self,
        enabled: bool,
    ) -> Result<UiSnapshot, GatewayError> {
        self.snapshot(Command::SetExcludeAppsEnabled { enabled }).await
    }

    pub async fn set_open_window_on_launch(
        &self,
        enabled: bool,
    ) -> Result<UiSnapshot, GatewayError> {
        self.snapshot(Command::SetOpenWindowOnLaunch { enabled }).await
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<UiSnapshot, GatewayError> {
        self.snapshot(Command::SetTheme { theme }).await
    }

    pub async fn set_language(&self, language: Language) -> Result<UiSnapshot, GatewayError> {
        self.snapshot(Command::SetLanguage { language }).await
    }

    pub async fn add_macro(&self, source: &str, target: &str) -> Result<UiSnapshot, GatewayError> {
        self.snapshot(Command::AddMacro {
            source: source.to_string(),
            target: target.to_string(),
        })
        .await
    }

    pub async fn delete_macro(&self, source: &str) -> Result<UiSnapshot, GatewayError> {
        self.snapshot(Command::DeleteMacro {
            source: source.to_string(),
        })
        .await
    }

    pub async fn add_excluded_app(&self, app: AppInfo) -> Result<UiSnapshot, GatewayError> {
        self.snapshot(Command::AddExcludedApp { app }).await
    }

    pub async fn remove_excluded_app(&self, path: &str) -> Result<UiSnapshot, GatewayError> {
        self.snapshot(Command::RemoveExcludedApp {
            path: path.to_string(),
        })
        .await
    }

    pub async fn search_apps(&self, query: Option<&str>) -> Result<Vec<AppInfo>, GatewayError> {
        let command = Command::SearchApps {
            query: query.map(str::to_string),
        };
        let name = command.name();
        match self.call(command).await? {
            Response::Apps(apps) => Ok(apps),
            other => Err(unexpected(name, &other)),
        }
    }

    pub async fn open_url(&self, url: &str) -> Result<(), GatewayError> {
        let command = Command::OpenUrl {
            url: url.to_string(),
        };
        let name = command.name();
        match self.call(command).await? {
            Response::Ack => Ok(()),
            other => Err(unexpected(name, &other)),
        }
    }

    /// Ask the engine to show the accessibility prompt; returns whether access is granted
    pub async fn request_accessibility_permission(&self) -> Result<bool, GatewayError> {
        let command = Command::RequestAccessibilityPermission;
        let name = command.name();
        match self.call(command).await? {
            Response::Permission(granted) => Ok(granted),
            other => Err(unexpected(name, &other)),
        }
    }
}

fn unexpected(command: &'static str, response: &Response) -> GatewayError {
    GatewayError::UnexpectedResponse {
        command,
        got: response.kind(),
    }
}
