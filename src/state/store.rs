//! Last-known authoritative snapshot with change subscription
//!
//! The store has exactly one mutation, [`StateStore::replace`]. Whatever
//! arrives last wins; there is no field-level merging and no request
//! sequencing, so two racing commands land in completion order and the next
//! resync corrects any transient misorder.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::gateway::{Gateway, GatewayError};

use super::snapshot::UiSnapshot;

/// Why a resynchronization was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// First load of the surface
    Mount,
    /// The engine pushed `state-changed`
    PushNotification,
    /// The surface came back to the foreground
    Foreground,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncTrigger::Mount => write!(f, "mount"),
            SyncTrigger::PushNotification => write!(f, "push"),
            SyncTrigger::Foreground => write!(f, "foreground"),
        }
    }
}

/// What the surface should show for the current snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Surface {
    /// No snapshot received yet
    Loading,
    /// Accessibility permission missing; only the remediation panel is shown
    PermissionRequired,
    /// Fully interactive
    Ready(Arc<UiSnapshot>),
}

/// Shared handle to the mirrored snapshot; clones share state
#[derive(Debug, Clone)]
pub struct StateStore {
    tx: Arc<watch::Sender<Option<Arc<UiSnapshot>>>>,
}

impl StateStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Overwrite the snapshot unconditionally and wake subscribers
    pub fn replace(&self, next: UiSnapshot) {
        debug!(
            enabled = next.is_enabled,
            method = %next.typing_method,
            hotkey = next.hotkey.display(),
            "snapshot replaced"
        );
        self.tx.send_replace(Some(Arc::new(next)));
    }

    /// Latest snapshot, if one has arrived
    pub fn current(&self) -> Option<Arc<UiSnapshot>> {
        self.tx.borrow().clone()
    }

    /// Watch for replacements
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<UiSnapshot>>> {
        self.tx.subscribe()
    }

    /// Pull `getState` and replace the local copy with the result
    pub async fn resync(&self, gateway: &Gateway, trigger: SyncTrigger) -> Result<(), GatewayError> {
        let snapshot = gateway.get_state().await?;
        info!(%trigger, "state resynchronized");
        self.replace(snapshot);
        Ok(())
    }

    pub fn surface(&self) -> Surface {
        match self.current() {
            None => Surface::Loading,
            Some(snapshot) if !snapshot.accessibility_ready => Surface::PermissionRequired,
            Some(snapshot) => Surface::Ready(snapshot),
        }
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::FakeEngine;

    #[test]
    fn test_replace_is_wholesale() {
        let store = StateStore::new();
        assert!(store.current().is_none());

        store.replace(UiSnapshot {
            is_enabled: true,
            macro_enabled: true,
            ..UiSnapshot::default()
        });
        store.replace(UiSnapshot {
            is_enabled: false,
            ..UiSnapshot::default()
        });

        let current = store.current().unwrap();
        assert!(!current.is_enabled);
        // nothing from the first snapshot survives
        assert!(!current.macro_enabled);
    }

    #[tokio::test]
    async fn test_subscribers_see_replacement() {
        let store = StateStore::new();
        let mut rx = store.subscribe();

        store.replace(UiSnapshot {
            is_enabled: true,
            ..UiSnapshot::default()
        });

        rx.changed().await.unwrap();
        assert!(rx.borrow().as_ref().unwrap().is_enabled);
    }

    #[test]
    fn test_surface_gating() {
        let store = StateStore::new();
        assert_eq!(store.surface(), Surface::Loading);

        store.replace(UiSnapshot {
            accessibility_ready: false,
            ..UiSnapshot::default()
        });
        assert_eq!(store.surface(), Surface::PermissionRequired);

        store.replace(UiSnapshot {
            accessibility_ready: true,
            ..UiSnapshot::default()
        });
        assert!(matches!(store.surface(), Surface::Ready(_)));
    }

    #[tokio::test]
    async fn test_resync_pulls_state() {
        let engine = FakeEngine::new();
        engine.mutate(|s| s.is_enabled = true);
        let store = StateStore::new();

        store
            .resync(&engine.gateway(), SyncTrigger::Mount)
            .await
            .unwrap();
        assert!(store.current().unwrap().is_enabled);
        assert_eq!(engine.call_names(), vec!["getState"]);
    }

    #[tokio::test]
    async fn test_failed_resync_keeps_last_snapshot() {
        let engine = FakeEngine::new();
        let store = StateStore::new();
        let gateway = engine.gateway();
        store.resync(&gateway, SyncTrigger::Mount).await.unwrap();

        engine.fail_next("getState");
        assert!(store.resync(&gateway, SyncTrigger::Foreground).await.is_err());
        assert!(store.current().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_responses_apply_in_completion_order() {
        let engine = FakeEngine::new();
        let gateway = engine.gateway();
        let store = StateStore::new();

        // first command is slow, second fast
        engine.delay_next(Duration::from_millis(50));
        engine.delay_next(Duration::from_millis(10));

        let slow = {
            let (gateway, store) = (gateway.clone(), store.clone());
            tokio::spawn(async move {
                let snapshot = gateway.set_enabled(true).await.unwrap();
                store.replace(snapshot);
            })
        };
        tokio::task::yield_now().await;
        let fast = {
            let (gateway, store) = (gateway.clone(), store.clone());
            tokio::spawn(async move {
                let snapshot = gateway.set_enabled(false).await.unwrap();
                store.replace(snapshot);
            })
        };
        fast.await.unwrap();
        slow.await.unwrap();

        // the stale echo of the first command arrived last and won
        assert!(store.current().unwrap().is_enabled);
        assert!(!engine.snapshot().is_enabled);

        // a trailing resync heals it
        store
            .resync(&gateway, SyncTrigger::PushNotification)
            .await
            .unwrap();
        assert!(!store.current().unwrap().is_enabled);
    }
}
