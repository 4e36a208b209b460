//! Length-prefixed framing for the byte stream.
//!
//! Every frame is a 4-byte little-endian unsigned payload length followed
//! by the payload itself. The writer flushes after each frame so no bytes
//! linger in an intermediate buffer.

use std::io::{Read, Write};

use crate::WireError;

/// Default upper bound on a single frame payload.
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Writes one frame and forces it through to the transport.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), WireError> {
    let len = u32::try_from(payload.len()).map_err(|_| WireError::FrameTooLarge {
        len: payload.len() as u64,
        max: u64::from(u32::MAX),
    })?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Reads one frame, rejecting payloads longer than `max_len`.
pub fn read_frame<R: Read>(reader: &mut R, max_len: u32) -> Result<Vec<u8>, WireError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf);
    if len > max_len {
        return Err(WireError::FrameTooLarge {
            len: u64::from(len),
            max: u64::from(max_len),
        });
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}
