//! Unix domain socket client for the engine
//!
//! Every invocation opens its own connection, sends one request and reads
//! one reply. A subscription keeps its connection open and forwards pushed
//! notifications until the returned stream is dropped.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::gateway::{EventSource, EventStream, GatewayError, Transport};

use super::codec::{read_frame, write_frame};
use super::protocol::{Command, Request, Response};

/// Transport over the engine's Unix socket
#[derive(Debug, Clone)]
pub struct UnixTransport {
    socket_path: PathBuf,
}

impl UnixTransport {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    async fn connect(&self) -> Result<UnixStream, GatewayError> {
        Ok(UnixStream::connect(&self.socket_path).await?)
    }
}

#[async_trait]
impl Transport for UnixTransport {
    async fn invoke(&self, command: Command) -> Result<Response, GatewayError> {
        let name = command.name();
        let mut stream = self.connect().await?;
        write_frame(&mut stream, &Request::Invoke(command)).await?;

        match read_frame::<_, Response>(&mut stream).await? {
            Some(Response::Error { code, message }) => Err(GatewayError::Remote {
                command: name,
                code,
                message,
            }),
            Some(response) => {
                debug!(command = name, response = response.kind(), "engine replied");
                Ok(response)
            }
            None => Err(GatewayError::Closed),
        }
    }
}

#[async_trait]
impl EventSource for UnixTransport {
    async fn subscribe(&self) -> Result<EventStream, GatewayError> {
        let mut stream = self.connect().await?;
        write_frame(&mut stream, &Request::Subscribe).await?;

        match read_frame::<_, Response>(&mut stream).await? {
            Some(Response::Subscribed) => {}
            Some(other) => {
                return Err(GatewayError::UnexpectedResponse {
                    command: "subscribe",
                    got: other.kind(),
                })
            }
            None => return Err(GatewayError::Closed),
        }

        let (tx, rx) = mpsc::channel(16);
        let reader = tokio::spawn(async move {
            loop {
                match read_frame::<_, Response>(&mut stream).await {
                    Ok(Some(Response::Notification(notification))) => {
                        if tx.send(notification).await.is_err() {
                            break;
                        }
                    }
                    Ok(Some(other)) => {
                        debug!(response = other.kind(), "ignoring non-notification on subscription");
                    }
                    Ok(None) => {
                        debug!("engine closed the subscription");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "subscription read failed");
                        break;
                    }
                }
            }
        });

        Ok(EventStream::with_reader(rx, reader))
    }
}
