//! In-memory engine for unit tests.
//!
//! Implements both [`Transport`] and [`EventSource`] against a local
//! [`UiSnapshot`], records every command, and lets a test inject failures,
//! per-call latency and pushed notifications.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::gateway::{EventSource, EventStream, Gateway, GatewayError, Transport};
use crate::hotkey::Hotkey;
use crate::ipc::{Command, Notification, Response};
use crate::state::{AppInfo, HotkeyDescriptor, HotkeyValidation, MacroEntry, UiSnapshot};

/// Committed hotkey every fake engine starts with
pub const INITIAL_HOTKEY: &str = "super+space";

#[derive(Default)]
struct Inner {
    snapshot: UiSnapshot,
    calls: Vec<Command>,
    failures: Vec<&'static str>,
    overrides: HashMap<&'static str, Response>,
    delays: VecDeque<Duration>,
    validations: HashMap<String, HotkeyValidation>,
    catalog: Vec<AppInfo>,
    subscribers: Vec<mpsc::Sender<Notification>>,
    subscribe_gate: Option<oneshot::Receiver<()>>,
    subscribe_calls: usize,
    grant_permission: bool,
}

#[derive(Clone, Default)]
pub struct FakeEngine {
    inner: Arc<Mutex<Inner>>,
}

pub fn app(name: &str) -> AppInfo {
    AppInfo {
        identifier: format!("com.example.{}", name.to_lowercase()),
        name: name.to_string(),
        path: format!("/Applications/{name}.app"),
    }
}

impl FakeEngine {
    pub fn new() -> Self {
        let hotkey: Hotkey = INITIAL_HOTKEY.parse().unwrap();
        Self::with_snapshot(UiSnapshot {
            accessibility_ready: true,
            hotkey: HotkeyDescriptor::from_hotkey(&hotkey),
            version: "1.0.0".to_string(),
            ..UiSnapshot::default()
        })
    }

    pub fn with_snapshot(snapshot: UiSnapshot) -> Self {
        let engine = Self::default();
        engine.inner.lock().unwrap().snapshot = snapshot;
        engine
    }

    pub fn gateway(&self) -> Gateway {
        Gateway::new(Arc::new(self.clone()))
    }

    pub fn snapshot(&self) -> UiSnapshot {
        self.inner.lock().unwrap().snapshot.clone()
    }

    pub fn calls(&self) -> Vec<Command> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls().iter().map(Command::name).collect()
    }

    pub fn searches(&self) -> Vec<Option<String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Command::SearchApps { query } => Some(query),
                _ => None,
            })
            .collect()
    }

    /// Change engine state out of band, as a physical hotkey press would
    pub fn mutate(&self, f: impl FnOnce(&mut UiSnapshot)) {
        f(&mut self.inner.lock().unwrap().snapshot);
    }

    /// Send `state-changed` to every live subscriber
    pub fn push(&self) {
        let inner = self.inner.lock().unwrap();
        for tx in &inner.subscribers {
            let _ = tx.try_send(Notification::StateChanged { payload: None });
        }
    }

    /// Fail the next call of the named command with a remote error
    pub fn fail_next(&self, command: &'static str) {
        self.inner.lock().unwrap().failures.push(command);
    }

    /// Always answer the named command with `response`
    pub fn respond_with(&self, command: &'static str, response: Response) {
        self.inner
            .lock()
            .unwrap()
            .overrides
            .insert(command, response);
    }

    /// Delay the reply of the next command by `delay`; queued in issue order
    pub fn delay_next(&self, delay: Duration) {
        self.inner.lock().unwrap().delays.push_back(delay);
    }

    pub fn set_validation(&self, hotkey: &str, validation: HotkeyValidation) {
        self.inner
            .lock()
            .unwrap()
            .validations
            .insert(hotkey.to_string(), validation);
    }

    pub fn set_catalog(&self, apps: Vec<AppInfo>) {
        self.inner.lock().unwrap().catalog = apps;
    }

    pub fn grant_permission_on_request(&self) {
        self.inner.lock().unwrap().grant_permission = true;
    }

    /// Make the next `subscribe` wait until the returned sender fires
    pub fn hold_subscribe(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().unwrap().subscribe_gate = Some(rx);
        tx
    }

    pub fn subscribe_calls(&self) -> usize {
        self.inner.lock().unwrap().subscribe_calls
    }

    /// Subscriptions whose stream is still held by a client
    pub fn live_subscribers(&self) -> usize {
        self.inner
            .lock()
            .unwrap()
            .subscribers
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

impl Inner {
    fn state(&self) -> Response {
        Response::State(Box::new(self.snapshot.clone()))
    }

    fn apply(&mut self, command: Command) -> Response {
        match command {
            Command::GetState => {}
            Command::SetEnabled { enabled } => self.snapshot.is_enabled = enabled,
            Command::SetTypingMethod { method } => self.snapshot.typing_method = method,
            Command::SetHotkey { hotkey } => match hotkey.parse::<Hotkey>() {
                Ok(parsed) => self.snapshot.hotkey = HotkeyDescriptor::from_hotkey(&parsed),
                Err(e) => {
                    return Response::Error {
                        code: "invalid_hotkey".to_string(),
                        message: e.to_string(),
                    }
                }
            },
            Command::CheckHotkey { hotkey } => {
                return Response::Validation(
                    self.validations
                        .get(&hotkey)
                        .cloned()
                        .unwrap_or_else(HotkeyValidation::available),
                );
            }
            Command::SetAutoToggle { enabled } => self.snapshot.auto_toggle_enabled = enabled,
            Command::SetMacroEnabled { enabled } => self.snapshot.macro_enabled = enabled,
            Command::SetLaunchOnLogin { enabled } => self.snapshot.launch_on_login = enabled,
            Command::SetShowMenubarIcon { enabled } => self.snapshot.show_menubar_icon = enabled,
            Command::SetExcludeAppsEnabled { enabled } => {
                self.snapshot.exclude_apps_enabled = enabled
            }
            Command::SetOpenWindowOnLaunch { enabled } => {
                self.snapshot.open_window_on_launch = enabled
            }
            Command::SetTheme { theme } => self.snapshot.theme = theme,
            Command::SetLanguage { language } => self.snapshot.language = language,
            Command::AddMacro { source, target } => {
                upsert_macro(
                    &mut self.snapshot.macros,
                    MacroEntry::new(source.trim(), target.trim()),
                );
            }
            Command::DeleteMacro { source } => {
                remove_macro(&mut self.snapshot.macros, &source);
            }
            Command::AddExcludedApp { app } => {
                if !self.snapshot.excluded_paths().contains(app.path.as_str()) {
                    self.snapshot.excluded_apps.push(app);
                }
            }
            Command::RemoveExcludedApp { path } => {
                self.snapshot.excluded_apps.retain(|a| a.path != path);
            }
            Command::SearchApps { query } => {
                let term = query.unwrap_or_default().trim().to_lowercase();
                let apps = self
                    .catalog
                    .iter()
                    .filter(|a| {
                        term.is_empty()
                            || a.name.to_lowercase().contains(&term)
                            || a.identifier.to_lowercase().contains(&term)
                    })
                    .cloned()
                    .collect();
                return Response::Apps(apps);
            }
            Command::OpenUrl { .. } => return Response::Ack,
            Command::RequestAccessibilityPermission => {
                self.snapshot.accessibility_ready = self.grant_permission;
                return Response::Permission(self.grant_permission);
            }
        }
        self.state()
    }
}

/// The engine's macro table: a duplicate `source` replaces the existing
/// target in place, otherwise the entry is appended.
///
/// Returns true when an existing entry was replaced.
fn upsert_macro(macros: &mut Vec<MacroEntry>, entry: MacroEntry) -> bool {
    match macros.iter_mut().find(|m| m.source == entry.source) {
        Some(existing) => {
            existing.target = entry.target;
            true
        }
        None => {
            macros.push(entry);
            false
        }
    }
}

/// Remove exactly the macro with this `source`, keeping the order of the rest
fn remove_macro(macros: &mut Vec<MacroEntry>, source: &str) -> Option<MacroEntry> {
    let index = macros.iter().position(|m| m.source == source)?;
    Some(macros.remove(index))
}

#[async_trait]
impl Transport for FakeEngine {
    async fn invoke(&self, command: Command) -> Result<Response, GatewayError> {
        let name = command.name();
        let (result, delay) = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(command.clone());
            let delay = inner.delays.pop_front();

            let result = if let Some(pos) = inner.failures.iter().position(|f| *f == name) {
                inner.failures.remove(pos);
                Err(GatewayError::Remote {
                    command: name,
                    code: "injected".to_string(),
                    message: "injected failure".to_string(),
                })
            } else if let Some(response) = inner.overrides.get(name) {
                Ok(response.clone())
            } else {
                match inner.apply(command) {
                    Response::Error { code, message } => Err(GatewayError::Remote {
                        command: name,
                        code,
                        message,
                    }),
                    response => Ok(response),
                }
            };
            (result, delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

#[async_trait]
impl EventSource for FakeEngine {
    async fn subscribe(&self) -> Result<EventStream, GatewayError> {
        let gate = {
            let mut inner = self.inner.lock().unwrap();
            inner.subscribe_calls += 1;
            inner.subscribe_gate.take()
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let (tx, rx) = mpsc::channel(16);
        self.inner.lock().unwrap().subscribers.push(tx);
        Ok(EventStream::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_macro_replaces_in_place() {
        let mut macros = Vec::new();
        assert!(!upsert_macro(&mut macros, MacroEntry::new("a", "1")));
        assert!(!upsert_macro(&mut macros, MacroEntry::new("b", "2")));
        assert!(upsert_macro(&mut macros, MacroEntry::new("a", "3")));

        assert_eq!(
            macros,
            vec![MacroEntry::new("a", "3"), MacroEntry::new("b", "2")]
        );
    }

    #[test]
    fn test_remove_macro_keeps_order() {
        let mut macros = vec![
            MacroEntry::new("a", "1"),
            MacroEntry::new("b", "2"),
            MacroEntry::new("c", "3"),
        ];

        assert_eq!(
            remove_macro(&mut macros, "b"),
            Some(MacroEntry::new("b", "2"))
        );
        assert_eq!(remove_macro(&mut macros, "missing"), None);
        assert_eq!(
            macros,
            vec![MacroEntry::new("a", "1"), MacroEntry::new("c", "3")]
        );
    }
}
