//! Frame marker handling.
//!
//! The marker looks like a little-endian length/type header but it is not
//! parsed as one: all eight bytes are matched as a single opaque constant.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::RequestError;
use crate::protocol::response::Response;

/// Fixed marker that precedes the payload in both directions.
pub const MARKER: [u8; 8] = [0x00, 0x00, 0x00, 0x00, b'D', 0x00, 0x00, 0x00];

/// Return everything after the first occurrence of the marker.
///
/// Bytes before the marker are discarded. An empty buffer or a buffer
/// without the marker is a frame error.
pub fn strip_marker(input: &[u8]) -> Result<&[u8], RequestError> {
    let pos = find_marker(input).ok_or(RequestError::Frame)?;
    Ok(&input[pos + MARKER.len()..])
}

/// Prepend the marker to a response token.
pub fn encode(response: Response) -> Bytes {
    let token = response.as_bytes();
    let mut out = BytesMut::with_capacity(MARKER.len() + token.len());
    out.put_slice(&MARKER);
    out.put_slice(token);
    out.freeze()
}

/// Prepend the marker to an arbitrary payload (used by clients).
pub fn wrap(payload: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(MARKER.len() + payload.len());
    out.put_slice(&MARKER);
    out.put_slice(payload);
    out.freeze()
}

/// Find the earliest position of the marker in the buffer.
fn find_marker(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(MARKER.len())
        .position(|window| window == MARKER)
}
