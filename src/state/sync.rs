//! Push-channel subscription that keeps the store in step with the engine

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::gateway::{EventSource, Gateway};
use crate::ipc::Notification;

use super::store::{StateStore, SyncTrigger};

/// Handle to a running push subscription
pub struct SyncHandle {
    running: Arc<AtomicBool>,
    stop: Arc<Notify>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Tear the subscription down; await the returned handle to wait for it
    pub fn stop(self) -> JoinHandle<()> {
        self.running.store(false, Ordering::SeqCst);
        self.stop.notify_one();
        self.task
    }
}

impl StateStore {
    /// Open the `state-changed` subscription and re-pull on every notification.
    ///
    /// Inline payloads are ignored; `getState` is the only source of truth.
    pub fn subscribe_to_external_events(
        &self,
        gateway: Gateway,
        source: Arc<dyn EventSource>,
    ) -> SyncHandle {
        let running = Arc::new(AtomicBool::new(true));
        let stop = Arc::new(Notify::new());
        let store = self.clone();

        let task = tokio::spawn({
            let running = running.clone();
            let stop = stop.clone();
            async move {
                let mut stream = tokio::select! {
                    result = source.subscribe() => match result {
                        Ok(stream) => stream,
                        Err(e) => {
                            warn!(error = %e, "failed to subscribe to state changes");
                            running.store(false, Ordering::SeqCst);
                            return;
                        }
                    },
                    _ = stop.notified() => {
                        debug!("subscription cancelled before it opened");
                        return;
                    }
                };

                if !running.load(Ordering::SeqCst) {
                    // torn down while the subscribe was in flight
                    drop(stream);
                    return;
                }
                info!("subscribed to engine state changes");

                loop {
                    tokio::select! {
                        notification = stream.next() => match notification {
                            Some(Notification::StateChanged { .. }) => {
                                if let Err(e) = store.resync(&gateway, SyncTrigger::PushNotification).await {
                                    warn!(error = %e, "resync after push failed");
                                }
                            }
                            None => {
                                warn!("engine closed the state-change stream");
                                break;
                            }
                        },
                        _ = stop.notified() => {
                            debug!("state-change subscription stopped");
                            break;
                        }
                    }
                }
                running.store(false, Ordering::SeqCst);
            }
        });

        SyncHandle {
            running,
            stop,
            task,
        }
    }
}
