// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Packed identifier lists.
//!
//! Layout (little-endian, no header):
//! ```text
//! ids:    i64 LE || i64 LE || ...   (8 bytes per id)
//! counts: i32 LE || i32 LE || ...   (4 bytes per count)
//! ```
//!
//! An empty list encodes to a zero-length buffer. [`encode_or_absent`] is the
//! variant for optional filters, where "no list" and "empty list" differ on
//! the wire.

use bytes::Bytes;

use crate::NodeId;

const ID_WIDTH: usize = std::mem::size_of::<i64>();
const COUNT_WIDTH: usize = std::mem::size_of::<i32>();

/// Packed buffer decode errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Buffer length is not a whole number of values.
    #[error("malformed encoding: {len} bytes is not a multiple of {width}")]
    MalformedEncoding {
        /// Buffer length in bytes.
        len: usize,
        /// Width of one value in bytes.
        width: usize,
    },
}

/// Pack `ids` as consecutive 8-byte LE blocks. Always returns a buffer.
pub fn encode(ids: &[NodeId]) -> Bytes {
    let mut out = Vec::with_capacity(ids.len() * ID_WIDTH);
    for id in ids {
        out.extend_from_slice(&id.to_le_bytes());
    }
    Bytes::from(out)
}

/// Like [`encode`], but `None` for an empty slice.
pub fn encode_or_absent(ids: &[NodeId]) -> Option<Bytes> {
    if ids.is_empty() {
        None
    } else {
        Some(encode(ids))
    }
}

/// Unpack a buffer produced by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<Vec<NodeId>, CodecError> {
    check_width(bytes, ID_WIDTH)?;
    Ok(bytes
        .chunks_exact(ID_WIDTH)
        .map(|chunk| {
            let mut buf = [0u8; ID_WIDTH];
            buf.copy_from_slice(chunk);
            i64::from_le_bytes(buf)
        })
        .collect())
}

/// Pack counts as consecutive 4-byte LE blocks.
pub fn encode_counts(counts: &[i32]) -> Bytes {
    let mut out = Vec::with_capacity(counts.len() * COUNT_WIDTH);
    for count in counts {
        out.extend_from_slice(&count.to_le_bytes());
    }
    Bytes::from(out)
}

/// Unpack a buffer produced by [`encode_counts`].
pub fn decode_counts(bytes: &[u8]) -> Result<Vec<i32>, CodecError> {
    check_width(bytes, COUNT_WIDTH)?;
    Ok(bytes
        .chunks_exact(COUNT_WIDTH)
        .map(|chunk| {
            let mut buf = [0u8; COUNT_WIDTH];
            buf.copy_from_slice(chunk);
            i32::from_le_bytes(buf)
        })
        .collect())
}

fn check_width(bytes: &[u8], width: usize) -> Result<(), CodecError> {
    if bytes.len() % width == 0 {
        Ok(())
    } else {
        Err(CodecError::MalformedEncoding {
            len: bytes.len(),
            width,
        })
    }
}
