//! Hotkey recording state machine
//!
//! Pure transitions over [`Phase`]: `Idle -> Recording -> PendingReview -> Idle`.
//! Nothing here touches the engine; [`super::HotkeyCapture`] drives the
//! phase and performs the round trips.

use std::fmt;

use tracing::debug;

use crate::state::HotkeyValidation;

use super::keys::{canonicalize, Capture, Hotkey, KeyDown, KeyToken};

/// Recorder phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    /// Showing the committed hotkey
    #[default]
    Idle,
    /// Listening for key-downs
    Recording {
        /// Tokens shown in the live view: held modifiers until a combination
        /// is accepted, then the latest accepted combination
        captured: Vec<KeyToken>,
        /// Latest acceptable combination
        candidate: Option<Candidate>,
    },
    /// Recording stopped with a candidate awaiting save or cancel
    PendingReview {
        candidate: Candidate,
        validation: Validation,
    },
}

/// An acceptable combination captured during recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    hotkey: Hotkey,
}

impl Candidate {
    pub fn new(hotkey: Hotkey) -> Self {
        Self { hotkey }
    }

    pub fn hotkey(&self) -> Hotkey {
        self.hotkey
    }

    pub fn tokens(&self) -> Vec<KeyToken> {
        self.hotkey.tokens()
    }

    /// Canonical string sent to the engine, e.g. `ctrl+shift+k`
    pub fn canonical(&self) -> String {
        self.hotkey.to_string()
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.hotkey, f)
    }
}

/// Validation status of a pending candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Candidate equals the committed hotkey; nothing to check or save
    Unchanged,
    /// `checkHotkey` in flight
    Awaiting,
    Resolved(HotkeyValidation),
}

/// What the review panel should say about a resolved candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Review {
    /// Already taken by the system or another application
    Conflict(String),
    /// Rejected by the engine for another reason
    Invalid(String),
    Available,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecorderError {
    #[error("a recorded hotkey is pending review; cancel it first")]
    CancelRequired,
}

impl Phase {
    pub fn is_recording(&self) -> bool {
        matches!(self, Phase::Recording { .. })
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            Phase::Idle => None,
            Phase::Recording { candidate, .. } => candidate.as_ref(),
            Phase::PendingReview { candidate, .. } => Some(candidate),
        }
    }

    /// Tokens for display while recording or reviewing
    pub fn tokens(&self) -> Vec<KeyToken> {
        match self {
            Phase::Idle => Vec::new(),
            Phase::Recording { captured, .. } => captured.clone(),
            Phase::PendingReview { candidate, .. } => candidate.tokens(),
        }
    }

    /// Start (or restart) a recording session
    pub fn on_start(&self) -> Result<Phase, RecorderError> {
        match self {
            Phase::PendingReview { .. } => Err(RecorderError::CancelRequired),
            Phase::Idle | Phase::Recording { .. } => Ok(Phase::Recording {
                captured: Vec::new(),
                candidate: None,
            }),
        }
    }

    /// Feed one key-down; ignored outside recording
    pub fn on_key_down(&self, event: &KeyDown) -> Phase {
        let Phase::Recording { candidate, .. } = self else {
            return self.clone();
        };

        match canonicalize(event) {
            Capture::Ignored | Capture::Rejected(_) => self.clone(),
            // once a combination is accepted the view shows it until the next one
            Capture::Partial(_) if candidate.is_some() => self.clone(),
            Capture::Partial(tokens) => Phase::Recording {
                captured: tokens,
                candidate: None,
            },
            Capture::Candidate(hotkey) => {
                debug!(hotkey = %hotkey, "hotkey candidate captured");
                Phase::Recording {
                    captured: hotkey.tokens(),
                    candidate: Some(Candidate::new(hotkey)),
                }
            }
        }
    }

    /// Stop recording. `committed` is the canonical string of the current hotkey.
    pub fn on_stop(&self, committed: &str) -> Phase {
        match self {
            Phase::Recording {
                candidate: Some(candidate),
                ..
            } => {
                let validation = if candidate.canonical() == committed {
                    Validation::Unchanged
                } else {
                    Validation::Awaiting
                };
                Phase::PendingReview {
                    candidate: *candidate,
                    validation,
                }
            }
            Phase::Recording { candidate: None, .. } => Phase::Idle,
            other => other.clone(),
        }
    }

    /// Apply a `checkHotkey` result; results for another candidate are dropped
    pub fn on_validated(&self, checked: &Candidate, result: HotkeyValidation) -> Phase {
        match self {
            Phase::PendingReview {
                candidate,
                validation: Validation::Awaiting,
            } if candidate == checked => Phase::PendingReview {
                candidate: *candidate,
                validation: Validation::Resolved(result),
            },
            other => {
                debug!(hotkey = %checked, "discarding stale hotkey validation");
                other.clone()
            }
        }
    }

    pub fn on_cancel(&self) -> Phase {
        Phase::Idle
    }

    pub fn on_saved(&self) -> Phase {
        Phase::Idle
    }

    /// Whether a `checkHotkey` call is owed for the pending candidate
    pub fn needs_validation(&self) -> bool {
        matches!(
            self,
            Phase::PendingReview {
                validation: Validation::Awaiting,
                ..
            }
        )
    }

    /// Save is enabled only for a resolved, valid, conflict-free candidate
    pub fn can_save(&self) -> bool {
        match self {
            Phase::PendingReview {
                validation: Validation::Resolved(result),
                ..
            } => result.allows_save(),
            _ => false,
        }
    }

    pub fn review(&self) -> Option<Review> {
        let Phase::PendingReview {
            validation: Validation::Resolved(result),
            ..
        } = self
        else {
            return None;
        };

        let message = result.message.clone().unwrap_or_default();
        Some(if result.has_conflict {
            Review::Conflict(message)
        } else if !result.is_valid {
            Review::Invalid(message)
        } else {
            Review::Available
        })
    }
}
