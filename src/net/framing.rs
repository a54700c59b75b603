//! Message framing over raw byte streams.
//!
//! # Responsibilities
//! - Client direction: accumulate until the buffer ends with a blank line
//! - Origin direction: accumulate until the peer closes the stream
//!
//! # Design Decisions
//! - No Content-Length or chunked handling; HTTP/1.0 close-delimited only
//! - The client buffer is checked for the terminator only at its end, so
//!   bytes sent after the blank line keep the framer reading
//! - Client framing is capped so a peer cannot grow the buffer unbounded
//! - Client text is Latin-1: each byte maps to one `char` and back, so header
//!   bytes outside ASCII reach the origin unchanged

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::ProxyError;

/// Bytes requested per read.
pub const READ_CHUNK: usize = 2048;

/// Marks the end of a client request's header block.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Read a client request up to and including its terminating blank line.
///
/// Fails with [`ProxyError::ClientClosed`] if the stream ends first and
/// with [`ProxyError::RequestTooLarge`] once `max_bytes` have been read
/// without seeing the terminator.
pub async fn read_request<R>(reader: &mut R, max_bytes: usize) -> Result<String, ProxyError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    while !buffer.ends_with(HEADER_TERMINATOR) {
        if buffer.len() >= max_bytes {
            return Err(ProxyError::RequestTooLarge(max_bytes));
        }
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(ProxyError::ClientClosed);
        }
        buffer.extend_from_slice(&chunk[..n]);
    }

    Ok(decode_latin1(&buffer))
}

/// Map each byte to the `char` with the same code point.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`decode_latin1`]. Characters above U+00FF, which decoding
/// never produces, become `?`.
pub fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(c).unwrap_or(b'?'))
        .collect()
}

/// Read an origin response until the origin closes its side.
pub async fn read_response<R>(reader: &mut R) -> Result<Vec<u8>, ProxyError>
where
    R: AsyncRead + Unpin,
{
    let mut response = Vec::new();
    reader.read_to_end(&mut response).await?;
    Ok(response)
}
