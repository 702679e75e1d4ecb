// Copyright 2024
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Encoders for chunk records, raw offsets and the header field.

use bytes::{BufMut, BytesMut};

use crate::constants::{
    HEADER_SLOT_SIZE, LENGTH_PREFIX_SIZE, MAX_CHUNK_PAYLOAD, MAX_OFFSET_VALUE, OFFSET_FRAME_SIZE,
};
use crate::error::{FrameError, Result};

/// Returns the encoded size of a chunk record carrying `payload_len` bytes.
///
/// Fails with [`FrameError::FrameTooLarge`] if the payload does not fit the
/// 32-bit length field.
pub fn chunk_record_len(payload_len: usize) -> Result<usize> {
    checked_payload_len(payload_len)?;
    Ok(LENGTH_PREFIX_SIZE + payload_len)
}

/// Appends a length-prefixed chunk record to `buf`.
///
/// The length check happens before anything is written, so on error `buf` is
/// left untouched.
///
/// # Returns
///
/// The number of bytes appended (`payload.len() + 4`).
pub fn put_chunk_record(buf: &mut BytesMut, payload: &[u8]) -> Result<usize> {
    let len = checked_payload_len(payload.len())?;

    buf.reserve(LENGTH_PREFIX_SIZE + payload.len());
    buf.put_u32_le(len);
    buf.extend_from_slice(payload);

    Ok(LENGTH_PREFIX_SIZE + payload.len())
}

/// Narrows an offset to the 4-byte width of an offset frame.
pub fn validate_offset(offset: u64) -> Result<u32> {
    if offset > MAX_OFFSET_VALUE {
        return Err(FrameError::OffsetTooLarge(offset));
    }
    Ok(offset as u32)
}

/// Appends a raw offset frame (no length prefix) to `buf`.
pub fn put_offset(buf: &mut BytesMut, offset: u32) -> usize {
    buf.put_u32_le(offset);
    OFFSET_FRAME_SIZE
}

/// Encodes a value for the header slot.
pub fn header_field_bytes(value: u32) -> [u8; HEADER_SLOT_SIZE] {
    value.to_le_bytes()
}

fn checked_payload_len(payload_len: usize) -> Result<u32> {
    u32::try_from(payload_len).map_err(|_| FrameError::FrameTooLarge {
        len: payload_len as u64,
        max: MAX_CHUNK_PAYLOAD,
    })
}
