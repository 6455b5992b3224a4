//! Length-prefixed JSON framing

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::gateway::GatewayError;

/// Largest frame either side will accept
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Send a length-prefixed JSON message
pub async fn write_frame<W, T>(stream: &mut W, msg: &T) -> Result<(), GatewayError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    if msg_bytes.len() > MAX_FRAME_LEN {
        return Err(GatewayError::FrameTooLarge(msg_bytes.len()));
    }
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    stream.write_all(&msg_len).await?;
    stream.write_all(&msg_bytes).await?;
    stream.flush().await?;

    Ok(())
}

/// Read one length-prefixed JSON message.
///
/// Returns `Ok(None)` when the peer closed the connection between frames.
pub async fn read_frame<R, T>(stream: &mut R) -> Result<Option<T>, GatewayError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(GatewayError::FrameTooLarge(len));
    }

    let mut msg_buf = vec![0u8; len];
    stream.read_exact(&mut msg_buf).await?;

    Ok(Some(serde_json::from_slice(&msg_buf)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::{Command, Request};

    #[tokio::test]
    async fn test_frame_roundtrip_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let request = Request::Invoke(Command::DeleteMacro {
            source: "vn".to_string(),
        });

        write_frame(&mut client, &request).await.unwrap();
        let received: Option<Request> = read_frame(&mut server).await.unwrap();
        assert_eq!(received, Some(request));
    }

    #[tokio::test]
    async fn test_clean_eof_is_none() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);
        let received: Option<Request> = read_frame(&mut server).await.unwrap();
        assert!(received.is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let len = (MAX_FRAME_LEN as u32 + 1).to_le_bytes();
        client.write_all(&len).await.unwrap();

        let result: Result<Option<Request>, _> = read_frame(&mut server).await;
        assert!(matches!(result, Err(GatewayError::FrameTooLarge(_))));
    }
}
