//! App picker for the excluded-apps list
//!
//! Keystrokes reschedule a debounced `searchApps`; only the last pause in
//! typing reaches the engine. Each lookup takes a generation number and a
//! response is applied only if no newer lookup started in the meantime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, warn};

use crate::dispatch::Dispatcher;
use crate::gateway::Gateway;
use crate::state::{AppInfo, UiSnapshot};

use super::debounce::Debouncer;

#[derive(Debug, Default)]
struct PickerState {
    query: String,
    results: Vec<AppInfo>,
    loading: bool,
    open: bool,
}

/// Shared between the picker and its in-flight lookups
#[derive(Debug, Default)]
struct Shared {
    state: Mutex<PickerState>,
    generation: AtomicU64,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, PickerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn lookup(&self, gateway: &Gateway, query: Option<String>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state().loading = true;

        let result = gateway.search_apps(query.as_deref()).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(?query, "discarding superseded app lookup");
            return;
        }

        let mut state = self.state();
        match result {
            Ok(apps) => {
                debug!(?query, count = apps.len(), "app lookup finished");
                state.results = apps;
            }
            Err(e) => warn!(?query, error = %e, "app lookup failed"),
        }
        state.loading = false;
    }
}

/// Search-as-you-type picker over installed applications
pub struct AppPicker {
    dispatcher: Dispatcher,
    shared: Arc<Shared>,
    search: Debouncer,
    close: Debouncer,
}

impl AppPicker {
    pub fn new(dispatcher: Dispatcher, quiet_period: Duration, blur_grace: Duration) -> Self {
        Self {
            dispatcher,
            shared: Arc::new(Shared::default()),
            search: Debouncer::new(quiet_period),
            close: Debouncer::new(blur_grace),
        }
    }

    /// Unfiltered lookup on first display
    pub async fn mount(&self) {
        self.shared.lookup(self.dispatcher.gateway(), None).await;
    }

    pub fn query(&self) -> String {
        self.shared.state().query.clone()
    }

    /// Record a keystroke and reschedule the lookup
    pub fn set_query(&mut self, query: &str) {
        self.shared.state().query = query.to_string();

        let term = query.trim();
        self.schedule_lookup((!term.is_empty()).then(|| term.to_string()));
    }

    fn schedule_lookup(&mut self, term: Option<String>) {
        let shared = self.shared.clone();
        let gateway = self.dispatcher.gateway().clone();
        self.search.schedule(async move {
            shared.lookup(&gateway, term).await;
        });
    }

    /// Results not already excluded, by path
    pub fn suggestions(&self) -> Vec<AppInfo> {
        let snapshot = self.dispatcher.store().current();
        let results = self.shared.state().results.clone();
        match snapshot {
            Some(snapshot) => {
                let excluded = snapshot.excluded_paths();
                results
                    .into_iter()
                    .filter(|app| !excluded.contains(app.path.as_str()))
                    .collect()
            }
            None => results,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.shared.state().loading
    }

    /// Panel visibility; never open while exclusion is switched off
    pub fn is_open(&self) -> bool {
        self.exclusion_enabled() && self.shared.state().open
    }

    fn exclusion_enabled(&self) -> bool {
        self.dispatcher
            .store()
            .current()
            .is_some_and(|snapshot| snapshot.exclude_apps_enabled)
    }

    pub fn focus(&mut self) {
        self.close.cancel();
        self.shared.state().open = true;
    }

    /// Close after the grace delay so a click on a suggestion still lands
    pub fn blur(&mut self) {
        let shared = self.shared.clone();
        self.close.schedule(async move {
            shared.state().open = false;
        });
    }

    /// Exclude `app`. A no-op while exclusion is switched off.
    pub async fn select(&mut self, app: AppInfo) -> Option<UiSnapshot> {
        if !self.exclusion_enabled() {
            debug!(app = %app.name, "exclusion disabled, ignoring selection");
            return None;
        }

        self.close.cancel();
        {
            let mut state = self.shared.state();
            state.query.clear();
            state.open = false;
        }
        // the cleared query lists everything again
        self.schedule_lookup(None);
        self.dispatcher.add_excluded_app(app).await
    }
}
