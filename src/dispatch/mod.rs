//! One helper per user intent
//!
//! Each helper performs exactly one gateway round trip. On success the
//! returned snapshot replaces the store; on failure the error is logged, a
//! [`Notice`] is broadcast and the store keeps its last good snapshot.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::events::Notice;
use crate::gateway::{Gateway, GatewayError};
use crate::state::{AppInfo, Language, StateStore, SyncTrigger, Theme, TypingMethod, UiSnapshot};

/// Routes user intents through the gateway into the store
#[derive(Clone)]
pub struct Dispatcher {
    gateway: Gateway,
    store: StateStore,
    notices: broadcast::Sender<Notice>,
    in_flight: Arc<AtomicUsize>,
}

/// Counts a dispatch as in flight until dropped
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Dispatcher {
    pub fn new(gateway: Gateway, store: StateStore) -> Self {
        let (notices, _) = broadcast::channel(64);
        Self {
            gateway,
            store,
            notices,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Subscribe to failure notices
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Whether any dispatch is awaiting the engine
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    async fn apply<F>(&self, command: &'static str, call: F) -> Option<UiSnapshot>
    where
        F: Future<Output = Result<UiSnapshot, GatewayError>>,
    {
        let _busy = InFlight::enter(&self.in_flight);
        match call.await {
            Ok(snapshot) => {
                self.store.replace(snapshot.clone());
                Some(snapshot)
            }
            Err(e) => {
                self.command_failed(command, &e);
                None
            }
        }
    }

    fn command_failed(&self, command: &'static str, e: &GatewayError) {
        error!(command, error = %e, "engine command failed");
        let _ = self.notices.send(Notice::CommandFailed {
            command: command.to_string(),
            message: e.to_string(),
        });
    }

    /// Background resync; failures become [`Notice::SyncFailed`]
    pub async fn refresh(&self, trigger: SyncTrigger) -> bool {
        let _busy = InFlight::enter(&self.in_flight);
        match self.store.resync(&self.gateway, trigger).await {
            Ok(()) => true,
            Err(e) => {
                warn!(%trigger, error = %e, "resync failed");
                let _ = self.notices.send(Notice::SyncFailed {
                    trigger: trigger.to_string(),
                    message: e.to_string(),
                });
                false
            }
        }
    }

    /// Send the negation of the mirrored `isEnabled`
    pub async fn toggle_enabled(&self) -> Option<UiSnapshot> {
        let enabled = self
            .store
            .current()
            .map_or(false, |snapshot| snapshot.is_enabled);
        self.set_enabled(!enabled).await
    }

    pub async fn set_enabled(&self, enabled: bool) -> Option<UiSnapshot> {
        self.apply("setEnabled", self.gateway.set_enabled(enabled))
            .await
    }

    pub async fn set_typing_method(&self, method: TypingMethod) -> Option<UiSnapshot> {
        self.apply("setTypingMethod", self.gateway.set_typing_method(method))
            .await
    }

    pub async fn set_hotkey(&self, hotkey: &str) -> Option<UiSnapshot> {
        info!(hotkey, "saving hotkey");
        self.apply("setHotkey", self.gateway.set_hotkey(hotkey))
            .await
    }

    pub async fn set_auto_toggle(&self, enabled: bool) -> Option<UiSnapshot> {
        self.apply("setAutoToggle", self.gateway.set_auto_toggle(enabled))
            .await
    }

    pub async fn set_macro_enabled(&self, enabled: bool) -> Option<UiSnapshot> {
        self.apply("setMacroEnabled", self.gateway.set_macro_enabled(enabled))
            .await
    }

    pub async fn set_launch_on_login(&self, enabled: bool) -> Option<UiSnapshot> {
        self.apply("setLaunchOnLogin", self.gateway.set_launch_on_login(enabled))
            .await
    }

    pub async fn set_show_menubar_icon(&self, enabled: bool) -> Option<UiSnapshot> {
        self.apply(
            "setShowMenubarIcon",
            self.gateway.set_show_menubar_icon(enabled),
        )
        .await
    }

    pub async fn set_exclude_apps_enabled(&self, enabled: bool) -> Option<UiSnapshot> {
        self.apply(
            "setExcludeAppsEnabled",
            self.gateway.set_exclude_apps_enabled(enabled),
        )
        .await
    }

    pub async fn set_open_window_on_launch(&self, enabled: bool) -> Option<UiSnapshot> {
        self.apply(
            "setOpenWindowOnLaunch",
            self.gateway.set_open_window_on_launch(enabled),
        )
        .await
    }

    pub async fn set_theme(&self, theme: Theme) -> Option<UiSnapshot> {
        self.apply("setTheme", self.gateway.set_theme(theme)).await
    }

    pub async fn set_language(&self, language: Language) -> Option<UiSnapshot> {
        self.apply("setLanguage", self.gateway.set_language(language))
            .await
    }

    /// Add or replace a macro. Both sides are trimmed; an empty side sends nothing.
    pub async fn add_macro(&self, source: &str, target: &str) -> Option<UiSnapshot> {
        let (source, target) = (source.trim(), target.trim());
        if source.is_empty() || target.is_empty() {
            return None;
        }
        self.apply("addMacro", self.gateway.add_macro(source, target))
            .await
    }

    pub async fn delete_macro(&self, source: &str) -> Option<UiSnapshot> {
        self.apply("deleteMacro", self.gateway.delete_macro(source))
            .await
    }

    pub async fn add_excluded_app(&self, app: AppInfo) -> Option<UiSnapshot> {
        info!(app = %app.name, path = %app.path, "excluding app");
        self.apply("addExcludedApp", self.gateway.add_excluded_app(app))
            .await
    }

    pub async fn remove_excluded_app(&self, path: &str) -> Option<UiSnapshot> {
        self.apply("removeExcludedApp", self.gateway.remove_excluded_app(path))
            .await
    }

    pub async fn open_url(&self, url: &str) -> bool {
        let _busy = InFlight::enter(&self.in_flight);
        match self.gateway.open_url(url).await {
            Ok(()) => true,
            Err(e) => {
                self.command_failed("openUrl", &e);
                false
            }
        }
    }

    /// Ask the engine to prompt for accessibility access, then re-pull state
    pub async fn request_accessibility_permission(&self) -> Option<bool> {
        let granted = {
            let _busy = InFlight::enter(&self.in_flight);
            match self.gateway.request_accessibility_permission().await {
                Ok(granted) => granted,
                Err(e) => {
                    self.command_failed("requestAccessibilityPermission", &e);
                    return None;
                }
            }
        };
        info!(granted, "accessibility permission requested");
        self.apply("getState", self.gateway.get_state()).await;
        Some(granted)
    }
}
