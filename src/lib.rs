//! gokey-control: control surface client for the GõKey input engine
//!
//! The engine owns every setting. This crate mirrors its state, sends one
//! command per user intent, records new toggle hotkeys and looks up apps to
//! exclude. Components:
//! - Command gateway over a Unix socket ([`gateway`], [`ipc`])
//! - State store with push and pull resync ([`state`])
//! - Hotkey recording state machine ([`hotkey`])
//! - Debounced app picker ([`lookup`])
//! - Dispatch helpers with failure notices ([`dispatch`], [`events`])

pub mod config;
pub mod dispatch;
pub mod events;
pub mod gateway;
pub mod hotkey;
pub mod ipc;
pub mod lifecycle;
pub mod lookup;
pub mod state;

#[cfg(test)]
mod test_support;
