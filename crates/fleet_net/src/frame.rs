//! Length-prefixed framing for the vehicle stream.
//!
//! A frame is a big-endian `u32` byte count followed by that many bytes of
//! encoded envelope. One frame carries exactly one message.

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::NetError;

/// Largest payload accepted in a single frame.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Receive buffer size for one rider datagram.
pub const MAX_DATAGRAM_LEN: usize = 64 * 1024;

/// Read one frame.
///
/// Returns `Ok(None)` when the peer closed the stream between frames.
///
/// # Errors
///
/// Returns [`NetError::FrameTooLarge`] for an oversized header,
/// [`NetError::Truncated`] if the stream ends inside a payload, or
/// [`NetError::Io`] on socket failure.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, NetError>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(NetError::Io(e)),
    };
    if len > MAX_FRAME_LEN {
        return Err(NetError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut payload = vec![0u8; len];
    match reader.read_exact(&mut payload).await {
        Ok(_) => Ok(Some(payload)),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(NetError::Truncated),
        Err(e) => Err(NetError::Io(e)),
    }
}

/// Write one frame and flush it.
///
/// # Errors
///
/// Returns [`NetError::FrameTooLarge`] if `payload` exceeds
/// [`MAX_FRAME_LEN`], or [`NetError::Io`] on socket failure.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), NetError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(NetError::FrameTooLarge {
            len: payload.len(),
            max: MAX_FRAME_LEN,
        });
    }
    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::io::duplex;

    use super::*;

    #[tokio::test]
    async fn test_frames_arrive_whole_and_in_order() {
        let (mut client, mut server) = duplex(1024);
        write_frame(&mut client, b"first").await.unwrap();
        write_frame(&mut client, b"second").await.unwrap();
        drop(client);

        assert_eq!(read_frame(&mut server).await.unwrap().unwrap(), b"first");
        assert_eq!(read_frame(&mut server).await.unwrap().unwrap(), b"second");
        assert!(read_frame(&mut server).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_header_is_rejected() {
        let (mut client, mut server) = duplex(64);
        client.write_u32((MAX_FRAME_LEN + 1) as u32).await.unwrap();
        let result = read_frame(&mut server).await;
        assert!(matches!(result, Err(NetError::FrameTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_eof_inside_payload_is_truncation() {
        let (mut client, mut server) = duplex(64);
        client.write_u32(10).await.unwrap();
        client.write_all(b"abc").await.unwrap();
        drop(client);
        let result = read_frame(&mut server).await;
        assert!(matches!(result, Err(NetError::Truncated)));
    }

    #[tokio::test]
    async fn test_write_refuses_oversized_payload() {
        let (mut client, _server) = duplex(64);
        let payload = vec![0u8; MAX_FRAME_LEN + 1];
        let result = write_frame(&mut client, &payload).await;
        assert!(matches!(result, Err(NetError::FrameTooLarge { .. })));
    }
}
