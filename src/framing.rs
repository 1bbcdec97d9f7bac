//! Length-prefixed frame codec shared by peer and coordinator
//!
//! Each frame is `[u32 big-endian length][payload bytes]`. The length counts
//! payload bytes only; a reader consumes exactly that many bytes before
//! interpreting the payload, so no delimiter scanning is ever needed.
//! One call handles exactly one frame.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame's payload (16 MiB).
///
/// Peers are cooperative, so this is a sanity cap against corrupted length
/// prefixes rather than a protocol limit.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Errors that can occur while reading or writing a frame
#[derive(Debug, Error)]
pub enum FrameError {
    /// The stream closed before a full frame was transferred
    #[error("stream closed mid-frame")]
    Incomplete,

    /// The length prefix exceeds [`MAX_FRAME_SIZE`]
    #[error("frame of {0} bytes exceeds the {MAX_FRAME_SIZE}-byte cap")]
    TooLarge(usize),

    /// Any other transport fault
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write one frame: 4-byte big-endian length prefix, then the payload.
///
/// Flushes fully before returning, so a successful return means the whole
/// frame has been handed to the transport. Payloads over [`MAX_FRAME_SIZE`]
/// are rejected before any bytes are written, so the write side can never
/// emit a frame the read side would refuse (or a length prefix truncated by
/// the u32 cast).
pub async fn write_frame<W>(stream: &mut W, payload: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge(payload.len()));
    }
    let len = payload.len() as u32;
    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(payload).await?;
    stream.flush().await?;
    Ok(())
}

/// Read one frame: exactly 4 length bytes, then exactly that many payload bytes.
///
/// Fails with [`FrameError::Incomplete`] if the stream closes before the full
/// frame arrives.
pub async fn read_frame<R>(stream: &mut R) -> Result<Vec<u8>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.map_err(map_read_err)?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge(len));
    }

    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.map_err(map_read_err)?;
    Ok(payload)
}

/// `read_exact` reports early close as `UnexpectedEof`; everything else is a
/// plain transport fault.
fn map_read_err(e: std::io::Error) -> FrameError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        FrameError::Incomplete
    } else {
        FrameError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    async fn round_trip(payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        write_frame(&mut buf, payload).await.unwrap();
        read_frame(&mut buf.as_slice()).await.unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_preserves_payload() {
        let payload = b"Hello World";
        assert_eq!(round_trip(payload).await, payload);
    }

    #[tokio::test]
    async fn test_round_trip_empty_payload() {
        assert_eq!(round_trip(b"").await, b"");
    }

    #[tokio::test]
    async fn test_wire_layout_is_big_endian_length_then_payload() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"abc").await.unwrap();
        assert_eq!(buf, [0, 0, 0, 3, b'a', b'b', b'c']);
    }

    #[tokio::test]
    async fn test_truncated_payload_is_incomplete() {
        // Length prefix promises 10 bytes, only 3 arrive
        let mut data: Vec<u8> = 10u32.to_be_bytes().to_vec();
        data.extend_from_slice(b"abc");

        let err = read_frame(&mut data.as_slice()).await.unwrap_err();
        assert!(matches!(err, FrameError::Incomplete));
    }

    #[tokio::test]
    async fn test_truncated_length_prefix_is_incomplete() {
        let mut data: &[u8] = &[0, 0];
        let err = read_frame(&mut data).await.unwrap_err();
        assert!(matches!(err, FrameError::Incomplete));
    }

    #[tokio::test]
    async fn test_oversized_payload_is_rejected_before_writing() {
        let payload = vec![0u8; MAX_FRAME_SIZE + 1];
        let mut buf = Vec::new();

        let err = write_frame(&mut buf, &payload).await.unwrap_err();
        assert!(matches!(err, FrameError::TooLarge(_)));
        assert!(buf.is_empty(), "no bytes may reach the stream");
    }

    #[tokio::test]
    async fn test_oversized_length_is_rejected() {
        let data = (MAX_FRAME_SIZE as u32 + 1).to_be_bytes();
        let err = read_frame(&mut data.as_slice()).await.unwrap_err();
        assert!(matches!(err, FrameError::TooLarge(_)));
    }

    #[tokio::test]
    async fn test_two_frames_back_to_back() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"first").await.unwrap();
        write_frame(&mut buf, b"second").await.unwrap();

        let mut reader = buf.as_slice();
        assert_eq!(read_frame(&mut reader).await.unwrap(), b"first");
        assert_eq!(read_frame(&mut reader).await.unwrap(), b"second");
    }

    proptest! {
        #[test]
        fn prop_round_trip_any_payload(payload in proptest::collection::vec(any::<u8>(), 0..65536)) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            let decoded = rt.block_on(round_trip(&payload));
            prop_assert_eq!(decoded, payload);
        }
    }
}
