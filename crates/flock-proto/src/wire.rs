// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Request/reply framing for the Flock RPC channel.
//!
//! Packet layout:
//!
//! ``MAGIC(4) || VERSION(2) || FLAGS(2) || LENGTH(4) || PAYLOAD || CHECKSUM(32)``
//!
//! * header integers are big-endian
//! * PAYLOAD is a CBOR [`Envelope`] carrying a [`Call`] or a [`Reply`]
//! * CHECKSUM = blake3-256 over HEADER (first 12 bytes) || PAYLOAD

use blake3::Hasher;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    Edge, EdgeQuery, EdgeResults, ExecuteOperations, FlockError, GraphId, Metadata, NodeId,
    Results, SelectOperation, SelectQuery,
};

/// Protocol magic constant "FLK1".
pub const MAGIC: [u8; 4] = [b'F', b'L', b'K', b'1'];
/// Framing version.
pub const VERSION: u16 = 0x0001;
/// Reserved flags (zero).
pub const FLAGS: u16 = 0x0000;
/// Header size in bytes.
pub const HEADER_LEN: usize = 12;
/// Trailing checksum size in bytes.
pub const CHECKSUM_LEN: usize = 32;
/// Default payload ceiling (8 MiB).
pub const DEFAULT_MAX_PAYLOAD: usize = 8 * 1024 * 1024;

/// Framing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Fewer bytes than the header or declared payload requires.
    #[error("incomplete packet: need {needed} bytes, got {got}")]
    Incomplete {
        /// Bytes needed.
        needed: usize,
        /// Bytes available.
        got: usize,
    },
    /// Magic bytes do not match "FLK1".
    #[error("bad magic: {0:?}")]
    BadMagic([u8; 4]),
    /// Framing version not understood.
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u16),
    /// Declared payload exceeds the configured ceiling.
    #[error("payload too large: {len} bytes exceeds max {max}")]
    PayloadTooLarge {
        /// Declared length.
        len: usize,
        /// Ceiling in force.
        max: usize,
    },
    /// Checksum over header and payload does not match.
    #[error("checksum mismatch")]
    ChecksumMismatch,
    /// CBOR payload could not be produced or parsed.
    #[error("cbor: {0}")]
    Cbor(String),
    /// Envelope op name disagrees with its payload.
    #[error("op mismatch: envelope says {declared}, payload is {actual}")]
    OpMismatch {
        /// Op name in the envelope.
        declared: String,
        /// Op name of the decoded payload.
        actual: &'static str,
    },
}

/// CBOR envelope carried as the packet payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<P> {
    /// Operation name of the payload.
    pub op: String,
    /// Caller-chosen sequence number, echoed by the reply.
    pub seq: u64,
    /// Call or reply body.
    pub payload: P,
}

/// Requests a client can send.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Call {
    /// Edge membership test.
    Contains {
        /// Source node.
        source_id: NodeId,
        /// Graph.
        graph_id: GraphId,
        /// Destination node.
        destination_id: NodeId,
    },
    /// Single edge lookup.
    Get {
        /// Source node.
        source_id: NodeId,
        /// Graph.
        graph_id: GraphId,
        /// Destination node.
        destination_id: NodeId,
    },
    /// Node metadata lookup.
    GetMetadata {
        /// Node.
        source_id: NodeId,
        /// Graph.
        graph_id: GraphId,
    },
    /// Node metadata membership test.
    ContainsMetadata {
        /// Node.
        source_id: NodeId,
        /// Graph.
        graph_id: GraphId,
    },
    /// Batched node-id selection.
    Select2 {
        /// One query per result page.
        queries: Vec<SelectQuery>,
    },
    /// Batched edge selection.
    SelectEdges {
        /// One query per result page.
        queries: Vec<EdgeQuery>,
    },
    /// Batched selection count.
    Count2 {
        /// One postfix program per count.
        queries: Vec<Vec<SelectOperation>>,
    },
    /// Mutation batch.
    Execute {
        /// Operations and priority.
        operations: ExecuteOperations,
    },
}

impl Call {
    /// Canonical op string for this call.
    pub fn op_name(&self) -> &'static str {
        match self {
            Call::Contains { .. } => "contains",
            Call::Get { .. } => "get",
            Call::GetMetadata { .. } => "get_metadata",
            Call::ContainsMetadata { .. } => "contains_metadata",
            Call::Select2 { .. } => "select2",
            Call::SelectEdges { .. } => "select_edges",
            Call::Count2 { .. } => "count2",
            Call::Execute { .. } => "execute",
        }
    }
}

/// Replies a server sends back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Reply {
    /// Answer to `contains` / `contains_metadata`.
    Bool(bool),
    /// Answer to `get`.
    Edge(Edge),
    /// Answer to `get_metadata`.
    Metadata(Metadata),
    /// Answer to `select2`.
    Results(Vec<Results>),
    /// Answer to `select_edges`.
    EdgeResults(Vec<EdgeResults>),
    /// Answer to `count2` (packed LE `i32` list).
    Counts(Bytes),
    /// Answer to `execute`.
    Done,
    /// The call failed on the remote side.
    Error(FlockError),
}

impl Reply {
    /// Canonical op string for this reply.
    pub fn op_name(&self) -> &'static str {
        match self {
            Reply::Bool(_) => "bool",
            Reply::Edge(_) => "edge",
            Reply::Metadata(_) => "metadata",
            Reply::Results(_) => "results",
            Reply::EdgeResults(_) => "edge_results",
            Reply::Counts(_) => "counts",
            Reply::Done => "done",
            Reply::Error(_) => "error",
        }
    }
}

/// A full packet (header + payload + checksum).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Raw header.
    pub header: [u8; HEADER_LEN],
    /// CBOR payload bytes.
    pub payload: Vec<u8>,
    /// blake3 checksum over header||payload.
    pub checksum: [u8; CHECKSUM_LEN],
}

impl Packet {
    /// Build a packet around a CBOR payload.
    pub fn from_payload(payload: Vec<u8>) -> Self {
        let mut header = [0u8; HEADER_LEN];
        header[0..4].copy_from_slice(&MAGIC);
        header[4..6].copy_from_slice(&VERSION.to_be_bytes());
        header[6..8].copy_from_slice(&FLAGS.to_be_bytes());
        // Payloads above u32::MAX are rejected by `encode_envelope` first.
        header[8..12].copy_from_slice(&(payload.len() as u32).to_be_bytes());
        let checksum = checksum(&header, &payload);
        Packet {
            header,
            payload,
            checksum,
        }
    }

    /// Concatenate header, payload and checksum.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len() + CHECKSUM_LEN);
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.payload);
        out.extend_from_slice(&self.checksum);
        out
    }
}

fn checksum(header: &[u8], payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Hasher::new();
    hasher.update(header);
    hasher.update(payload);
    *hasher.finalize().as_bytes()
}

/// Validate a header and return the number of bytes that follow it
/// (payload plus checksum). Stream readers use this to size the second read.
pub fn remaining_len(header: &[u8], max_payload: usize) -> Result<usize, WireError> {
    if header.len() < HEADER_LEN {
        return Err(WireError::Incomplete {
            needed: HEADER_LEN,
            got: header.len(),
        });
    }
    let mut magic = [0u8; 4];
    magic.copy_from_slice(&header[0..4]);
    if magic != MAGIC {
        return Err(WireError::BadMagic(magic));
    }
    let version = u16::from_be_bytes([header[4], header[5]]);
    if version != VERSION {
        return Err(WireError::UnsupportedVersion(version));
    }
    let len = u32::from_be_bytes([header[8], header[9], header[10], header[11]]) as usize;
    if len > max_payload {
        return Err(WireError::PayloadTooLarge {
            len,
            max: max_payload,
        });
    }
    Ok(len + CHECKSUM_LEN)
}

/// Encode an envelope into packet bytes.
pub fn encode_envelope<P: Serialize>(
    env: &Envelope<P>,
    max_payload: usize,
) -> Result<Vec<u8>, WireError> {
    let mut payload = Vec::new();
    ciborium::ser::into_writer(env, &mut payload).map_err(|e| WireError::Cbor(e.to_string()))?;
    if payload.len() > max_payload.min(u32::MAX as usize) {
        return Err(WireError::PayloadTooLarge {
            len: payload.len(),
            max: max_payload,
        });
    }
    Ok(Packet::from_payload(payload).into_bytes())
}

/// Decode packet bytes into an envelope and the number of bytes consumed.
pub fn decode_envelope<P: DeserializeOwned>(
    bytes: &[u8],
    max_payload: usize,
) -> Result<(Envelope<P>, usize), WireError> {
    let rest = remaining_len(bytes, max_payload)?;
    let total = HEADER_LEN + rest;
    if bytes.len() < total {
        return Err(WireError::Incomplete {
            needed: total,
            got: bytes.len(),
        });
    }
    let header = &bytes[..HEADER_LEN];
    let payload = &bytes[HEADER_LEN..total - CHECKSUM_LEN];
    if checksum(header, payload)[..] != bytes[total - CHECKSUM_LEN..total] {
        return Err(WireError::ChecksumMismatch);
    }
    let env = ciborium::de::from_reader(payload).map_err(|e| WireError::Cbor(e.to_string()))?;
    Ok((env, total))
}

/// Encode a call with sequence number `seq`.
pub fn encode_call(call: &Call, seq: u64, max_payload: usize) -> Result<Vec<u8>, WireError> {
    encode_envelope(
        &Envelope {
            op: call.op_name().to_string(),
            seq,
            payload: call,
        },
        max_payload,
    )
}

/// Decode bytes into `(call, seq, bytes_consumed)`.
pub fn decode_call(bytes: &[u8], max_payload: usize) -> Result<(Call, u64, usize), WireError> {
    let (env, used) = decode_envelope::<Call>(bytes, max_payload)?;
    check_op(&env.op, env.payload.op_name())?;
    Ok((env.payload, env.seq, used))
}

/// Encode a reply answering sequence number `seq`.
pub fn encode_reply(reply: &Reply, seq: u64, max_payload: usize) -> Result<Vec<u8>, WireError> {
    encode_envelope(
        &Envelope {
            op: reply.op_name().to_string(),
            seq,
            payload: reply,
        },
        max_payload,
    )
}

/// Decode bytes into `(reply, seq, bytes_consumed)`.
pub fn decode_reply(bytes: &[u8], max_payload: usize) -> Result<(Reply, u64, usize), WireError> {
    let (env, used) = decode_envelope::<Reply>(bytes, max_payload)?;
    check_op(&env.op, env.payload.op_name())?;
    Ok((env.payload, env.seq, used))
}

fn check_op(declared: &str, actual: &'static str) -> Result<(), WireError> {
    if declared == actual {
        Ok(())
    } else {
        Err(WireError::OpMismatch {
            declared: declared.to_string(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ids, Direction, Page, QueryTerm};

    const MAX: usize = DEFAULT_MAX_PAYLOAD;

    fn select_call() -> Call {
        Call::Select2 {
            queries: vec![SelectQuery {
                operations: vec![SelectOperation::simple(
                    QueryTerm::new(1, 2, Direction::Forward).with_destinations(&[4, 3]),
                )],
                page: Page::new(10, -1),
            }],
        }
    }

    #[test]
    fn call_survives_framing() {
        let call = select_call();
        let bytes = encode_call(&call, 7, MAX).unwrap();
        let (decoded, seq, used) = decode_call(&bytes, MAX).unwrap();
        assert_eq!(decoded, call);
        assert_eq!(seq, 7);
        assert_eq!(used, bytes.len());
    }

    #[test]
    fn reply_survives_framing() {
        let reply = Reply::Counts(ids::encode_counts(&[5, 78]));
        let bytes = encode_reply(&reply, 3, MAX).unwrap();
        let (decoded, seq, _) = decode_reply(&bytes, MAX).unwrap();
        assert_eq!(decoded, reply);
        assert_eq!(seq, 3);
    }

    #[test]
    fn header_layout() {
        let bytes = encode_reply(&Reply::Done, 0, MAX).unwrap();
        assert_eq!(&bytes[0..4], b"FLK1");
        assert_eq!(&bytes[4..6], &[0x00, 0x01]);
        assert_eq!(&bytes[6..8], &[0x00, 0x00]);
        let len = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        assert_eq!(bytes.len(), HEADER_LEN + len + CHECKSUM_LEN);
        assert_eq!(remaining_len(&bytes[..HEADER_LEN], MAX).unwrap(), len + CHECKSUM_LEN);
    }

    #[test]
    fn trailing_bytes_are_left_alone() {
        let mut bytes = encode_reply(&Reply::Bool(true), 1, MAX).unwrap();
        let frame_len = bytes.len();
        bytes.extend_from_slice(b"NEXT");
        let (_, _, used) = decode_reply(&bytes, MAX).unwrap();
        assert_eq!(used, frame_len);
    }

    #[test]
    fn reject_bad_magic() {
        let mut bytes = encode_reply(&Reply::Done, 0, MAX).unwrap();
        bytes[0..4].copy_from_slice(b"NOPE");
        let err = decode_reply(&bytes, MAX).unwrap_err();
        assert_eq!(err, WireError::BadMagic(*b"NOPE"));
    }

    #[test]
    fn reject_bad_version() {
        let mut bytes = encode_reply(&Reply::Done, 0, MAX).unwrap();
        bytes[4..6].copy_from_slice(&9u16.to_be_bytes());
        let err = decode_reply(&bytes, MAX).unwrap_err();
        assert_eq!(err, WireError::UnsupportedVersion(9));
    }

    #[test]
    fn reject_corrupted_payload() {
        let mut bytes = encode_call(&select_call(), 0, MAX).unwrap();
        bytes[HEADER_LEN] ^= 0xFF;
        let err = decode_call(&bytes, MAX).unwrap_err();
        assert_eq!(err, WireError::ChecksumMismatch);
    }

    #[test]
    fn reject_truncated_packet() {
        let bytes = encode_call(&select_call(), 0, MAX).unwrap();
        let err = decode_call(&bytes[..bytes.len() - 1], MAX).unwrap_err();
        assert!(matches!(err, WireError::Incomplete { .. }));

        let err = decode_call(&bytes[..5], MAX).unwrap_err();
        assert_eq!(err, WireError::Incomplete { needed: 12, got: 5 });
    }

    #[test]
    fn reject_oversized_payload() {
        let bytes = encode_call(&select_call(), 0, MAX).unwrap();
        let err = decode_call(&bytes, 4).unwrap_err();
        assert!(matches!(err, WireError::PayloadTooLarge { max: 4, .. }));

        let err = encode_call(&select_call(), 0, 4).unwrap_err();
        assert!(matches!(err, WireError::PayloadTooLarge { max: 4, .. }));
    }

    #[test]
    fn reject_op_that_disagrees_with_payload() {
        let bytes = encode_envelope(
            &Envelope {
                op: "select2".to_string(),
                seq: 0,
                payload: Call::GetMetadata {
                    source_id: 1,
                    graph_id: 2,
                },
            },
            MAX,
        )
        .unwrap();
        let err = decode_call(&bytes, MAX).unwrap_err();
        assert_eq!(
            err,
            WireError::OpMismatch {
                declared: "select2".to_string(),
                actual: "get_metadata",
            }
        );
    }
}
