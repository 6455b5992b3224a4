//! Mirrored engine state
//!
//! The engine owns every setting. This module holds the last snapshot it
//! returned, the wire types that make it up, and the push subscription that
//! keeps the copy fresh.

mod snapshot;
mod store;
mod sync;

pub use snapshot::{
    AppInfo, HotkeyDescriptor, HotkeyValidation, Language, MacroEntry, Theme, TypingMethod,
    UiSnapshot,
};
pub use store::{StateStore, Surface, SyncTrigger};
pub use sync::SyncHandle;
