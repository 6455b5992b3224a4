//! IPC with the engine over a Unix domain socket

mod client;
pub mod codec;
mod protocol;

pub use client::UnixTransport;
pub use protocol::{Command, Notification, Request, Response};
