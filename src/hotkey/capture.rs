//! Drives a recording session against the engine
//!
//! Owns the recorder [`Phase`] and performs its two round trips:
//! `checkHotkey` when recording stops on a changed candidate, and
//! `setHotkey` on save.

use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::state::HotkeyValidation;

use super::keys::KeyDown;
use super::recorder::{Phase, RecorderError, Review};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error("no validated hotkey to save")]
    NotReady,

    #[error("engine did not accept hotkey `{0}`")]
    SaveFailed(String),
}

/// A hotkey recording session bound to a dispatcher
pub struct HotkeyCapture {
    dispatcher: Dispatcher,
    phase: Phase,
}

impl HotkeyCapture {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn can_save(&self) -> bool {
        self.phase.can_save()
    }

    pub fn review(&self) -> Option<Review> {
        self.phase.review()
    }

    /// Display string of the committed hotkey, from the latest snapshot
    pub fn committed_display(&self) -> String {
        self.dispatcher
            .store()
            .current()
            .map(|snapshot| snapshot.hotkey.display().to_string())
            .unwrap_or_default()
    }

    fn committed_canonical(&self) -> String {
        self.dispatcher
            .store()
            .current()
            .map(|snapshot| snapshot.hotkey.canonical())
            .unwrap_or_default()
    }

    pub fn start_recording(&mut self) -> Result<(), CaptureError> {
        self.phase = self.phase.on_start()?;
        debug!("hotkey recording started");
        Ok(())
    }

    pub fn handle_key_down(&mut self, event: &KeyDown) {
        self.phase = self.phase.on_key_down(event);
    }

    /// Stop recording and validate the candidate if it differs from the committed one.
    ///
    /// A validation round trip that fails in transport counts as invalid.
    pub async fn stop_recording(&mut self) {
        self.phase = self.phase.on_stop(&self.committed_canonical());
        if !self.phase.needs_validation() {
            return;
        }
        let Some(candidate) = self.phase.candidate().copied() else {
            return;
        };

        let result = match self
            .dispatcher
            .gateway()
            .check_hotkey(&candidate.canonical())
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(hotkey = %candidate, error = %e, "hotkey validation failed");
                HotkeyValidation::unchecked()
            }
        };
        debug!(hotkey = %candidate, valid = result.is_valid, conflict = result.has_conflict, "hotkey validated");
        self.phase = self.phase.on_validated(&candidate, result);
    }

    /// Commit the validated candidate. On failure the session stays open for retry.
    pub async fn save(&mut self) -> Result<(), CaptureError> {
        if !self.phase.can_save() {
            return Err(CaptureError::NotReady);
        }
        let Some(candidate) = self.phase.candidate().copied() else {
            return Err(CaptureError::NotReady);
        };

        match self.dispatcher.set_hotkey(&candidate.canonical()).await {
            Some(snapshot) => {
                info!(hotkey = snapshot.hotkey.display(), "hotkey saved");
                self.phase = self.phase.on_saved();
                Ok(())
            }
            None => Err(CaptureError::SaveFailed(candidate.canonical())),
        }
    }

    /// Drop the session without contacting the engine
    pub fn cancel(&mut self) {
        self.phase = self.phase.on_cancel();
    }
}
