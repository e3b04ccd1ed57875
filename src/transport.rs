//! `FramedTransport` — a symmetric, length-prefixed framing layer over any
//! reliable byte stream.
//!
//! Every frame is a fixed-width 10-byte ASCII decimal header (left-aligned,
//! space-padded) giving the payload length in bytes, immediately followed by
//! the UTF-8 payload itself. There is no trailing delimiter.
//!
//! Unlike record-marking schemes that split one logical message across
//! several wire fragments, a frame here is never split — there is exactly
//! one header per payload.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::TransportError;

/// Width, in bytes, of the fixed decimal length header.
pub const HEADER_BYTES: usize = 10;

/// Maximum chunk size used when draining a payload off the wire.
const PACKET_BYTES: usize = 4096;

/// Writes one frame: a 10-byte left-aligned, space-padded decimal header
/// followed by `payload`. Retries partial writes until all bytes are sent.
pub async fn send_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), TransportError> {
    let header = format!("{:<width$}", payload.len(), width = HEADER_BYTES);
    debug_assert_eq!(header.len(), HEADER_BYTES, "payload too large for a 10-byte header");

    writer.write_all(header.as_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    trace!(bytes = payload.len(), "sent frame");
    Ok(())
}

/// Reads one frame, returning its payload bytes.
///
/// A zero-byte read at the start of the header is reported as
/// [`TransportError::EndOfStream`]; any other short read while filling the
/// header or payload is reported as [`TransportError::Closed`]. A header
/// that does not parse as a decimal integer is
/// [`TransportError::ProtocolError`].
pub async fn recv_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, TransportError> {
    let mut header_buf = [0u8; HEADER_BYTES];
    read_header(reader, &mut header_buf).await?;

    let header_str = std::str::from_utf8(&header_buf)?;
    let len: usize = header_str.trim().parse().map_err(|_| {
        TransportError::ProtocolError(format!("non-numeric frame header {header_str:?}"))
    })?;

    let mut payload = vec![0u8; len];
    let mut received = 0;
    while received < len {
        let end = std::cmp::min(received + PACKET_BYTES, len);
        let n = reader.read(&mut payload[received..end]).await?;
        if n == 0 {
            return Err(TransportError::Closed);
        }
        received += n;
    }
    trace!(bytes = len, "received frame");
    Ok(payload)
}

/// Reads the header, distinguishing a clean EOF (no bytes read at all) from a
/// connection that closed mid-header.
async fn read_header<R: AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut [u8; HEADER_BYTES],
) -> Result<(), TransportError> {
    let mut received = 0;
    while received < HEADER_BYTES {
        let n = reader.read(&mut buf[received..]).await?;
        if n == 0 {
            if received == 0 {
                return Err(TransportError::EndOfStream);
            }
            return Err(TransportError::Closed);
        }
        received += n;
    }
    Ok(())
}

/// Drains every frame currently available without blocking, returning once no
/// further frame is immediately ready.
///
/// The spec describes this as the edge-triggered-poll variant used by some
/// clients; we implement it on top of `recv_frame` guarded by a zero-duration
/// timeout, which is the portable equivalent on a `tokio::net::TcpStream`.
pub async fn recv_all_frames<R: AsyncRead + Unpin>(reader: &mut R) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    loop {
        match tokio::time::timeout(std::time::Duration::from_secs(0), recv_frame(reader)).await {
            Ok(Ok(frame)) => frames.push(frame),
            Ok(Err(_)) | Err(_) => break,
        }
    }
    frames
}
