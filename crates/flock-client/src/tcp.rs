// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Blocking TCP endpoint speaking the framed Flock protocol.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Mutex;

use bytes::Bytes;
use flock_config::EndpointConfig;
use flock_proto::wire::{self, Call, Reply, HEADER_LEN};
use flock_proto::{
    Edge, EdgeQuery, EdgeResults, ExecuteOperations, FlockEndpoint, GraphId, Metadata, NodeId,
    Results, RpcError, SelectOperation, SelectQuery, TransportError,
};
use tracing::{debug, info, warn};

struct Connection {
    stream: TcpStream,
    next_seq: u64,
    broken: bool,
}

/// One TCP connection to a Flock service. Calls are serialized.
///
/// A call that fails after its request was sent (a timeout, a short or
/// corrupt reply, a reply to some other call) leaves the stream out of step,
/// so the connection is shut down and every later call fails with
/// [`TransportError::Broken`]. Connect again to recover.
pub struct TcpEndpoint {
    conn: Mutex<Connection>,
    peer: SocketAddr,
    max_frame_bytes: usize,
}

impl TcpEndpoint {
    /// Resolve `config.host:config.port` and connect, trying each address in
    /// turn. The configured timeout bounds the connect and every read/write.
    pub fn connect(config: &EndpointConfig) -> Result<Self, TransportError> {
        let timeout = config.timeout();
        let addrs = (config.host.as_str(), config.port).to_socket_addrs()?;
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    stream.set_nodelay(true)?;
                    info!(peer = %addr, timeout_ms = config.timeout_ms, "connected to flock");
                    return Ok(Self {
                        conn: Mutex::new(Connection {
                            stream,
                            next_seq: 1,
                            broken: false,
                        }),
                        peer: addr,
                        max_frame_bytes: config.max_frame_bytes,
                    });
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(TransportError::Io(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{} resolved to no addresses", config.host),
            )
        })))
    }

    /// Remote address of the connection.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    fn call(&self, call: &Call) -> Result<Reply, RpcError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| TransportError::Other("connection mutex poisoned".into()))?;
        if conn.broken {
            return Err(TransportError::Broken.into());
        }
        let seq = conn.next_seq;
        conn.next_seq = conn.next_seq.wrapping_add(1);

        let packet = wire::encode_call(call, seq, self.max_frame_bytes)?;
        debug!(op = call.op_name(), seq, "flock call");
        match exchange(&mut conn.stream, &packet, seq, self.max_frame_bytes) {
            Ok(Reply::Error(err)) => Err(RpcError::Remote(err)),
            Ok(reply) => Ok(reply),
            Err(err) => {
                warn!(
                    peer = %self.peer,
                    op = call.op_name(),
                    seq,
                    error = %err,
                    "abandoning flock connection"
                );
                conn.broken = true;
                let _ = conn.stream.shutdown(Shutdown::Both);
                Err(err.into())
            }
        }
    }
}

/// Send one request packet and read the reply that answers it.
fn exchange(
    stream: &mut TcpStream,
    packet: &[u8],
    seq: u64,
    max_frame_bytes: usize,
) -> Result<Reply, TransportError> {
    stream.write_all(packet)?;
    stream.flush()?;
    debug!(seq, bytes = packet.len(), "sent flock call");

    let bytes = read_packet(stream, max_frame_bytes)?.ok_or(TransportError::Closed)?;
    let (reply, reply_seq, _) = wire::decode_reply(&bytes, max_frame_bytes)?;
    if reply_seq != seq {
        return Err(TransportError::Other(format!(
            "reply sequence {reply_seq} does not answer call {seq}"
        )));
    }
    Ok(reply)
}

impl std::fmt::Debug for TcpEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpEndpoint")
            .field("peer", &self.peer)
            .field("max_frame_bytes", &self.max_frame_bytes)
            .finish_non_exhaustive()
    }
}

/// Read one whole packet from `reader`.
///
/// Returns `Ok(None)` when the stream ends cleanly before any byte of a new
/// packet; a packet cut off part way is an I/O error.
pub fn read_packet<R: Read + ?Sized>(
    reader: &mut R,
    max_payload: usize,
) -> Result<Option<Vec<u8>>, TransportError> {
    let mut header = [0u8; HEADER_LEN];
    let mut read = 0usize;
    while read < header.len() {
        let n = match reader.read(&mut header[read..]) {
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if n == 0 {
            if read == 0 {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("truncated frame header: read {read} of {HEADER_LEN} bytes"),
            )
            .into());
        }
        read += n;
    }
    let rest_len = wire::remaining_len(&header, max_payload)?;
    let mut packet = vec![0u8; HEADER_LEN + rest_len];
    packet[..HEADER_LEN].copy_from_slice(&header);
    reader.read_exact(&mut packet[HEADER_LEN..])?;
    Ok(Some(packet))
}

fn unexpected(expected: &'static str, got: &Reply) -> RpcError {
    TransportError::UnexpectedReply {
        expected,
        got: got.op_name(),
    }
    .into()
}

impl FlockEndpoint for TcpEndpoint {
    fn contains(
        &self,
        source_id: NodeId,
        graph_id: GraphId,
        destination_id: NodeId,
    ) -> Result<bool, RpcError> {
        match self.call(&Call::Contains {
            source_id,
            graph_id,
            destination_id,
        })? {
            Reply::Bool(found) => Ok(found),
            other => Err(unexpected("bool", &other)),
        }
    }

    fn get(
        &self,
        source_id: NodeId,
        graph_id: GraphId,
        destination_id: NodeId,
    ) -> Result<Edge, RpcError> {
        match self.call(&Call::Get {
            source_id,
            graph_id,
            destination_id,
        })? {
            Reply::Edge(edge) => Ok(edge),
            other => Err(unexpected("edge", &other)),
        }
    }

    fn get_metadata(&self, source_id: NodeId, graph_id: GraphId) -> Result<Metadata, RpcError> {
        match self.call(&Call::GetMetadata {
            source_id,
            graph_id,
        })? {
            Reply::Metadata(metadata) => Ok(metadata),
            other => Err(unexpected("metadata", &other)),
        }
    }

    fn contains_metadata(&self, source_id: NodeId, graph_id: GraphId) -> Result<bool, RpcError> {
        match self.call(&Call::ContainsMetadata {
            source_id,
            graph_id,
        })? {
            Reply::Bool(found) => Ok(found),
            other => Err(unexpected("bool", &other)),
        }
    }

    fn select2(&self, queries: &[SelectQuery]) -> Result<Vec<Results>, RpcError> {
        match self.call(&Call::Select2 {
            queries: queries.to_vec(),
        })? {
            Reply::Results(pages) => Ok(pages),
            other => Err(unexpected("results", &other)),
        }
    }

    fn select_edges(&self, queries: &[EdgeQuery]) -> Result<Vec<EdgeResults>, RpcError> {
        match self.call(&Call::SelectEdges {
            queries: queries.to_vec(),
        })? {
            Reply::EdgeResults(pages) => Ok(pages),
            other => Err(unexpected("edge_results", &other)),
        }
    }

    fn count2(&self, queries: &[Vec<SelectOperation>]) -> Result<Bytes, RpcError> {
        match self.call(&Call::Count2 {
            queries: queries.to_vec(),
        })? {
            Reply::Counts(counts) => Ok(counts),
            other => Err(unexpected("counts", &other)),
        }
    }

    fn execute(&self, operations: &ExecuteOperations) -> Result<(), RpcError> {
        match self.call(&Call::Execute {
            operations: operations.clone(),
        })? {
            Reply::Done => Ok(()),
            other => Err(unexpected("done", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn clean_eof_before_a_header_is_not_an_error() {
        let mut empty = Cursor::new(Vec::<u8>::new());
        assert!(read_packet(&mut empty, wire::DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .is_none());
    }

    #[test]
    fn truncated_header_is_an_io_error() {
        let mut short = Cursor::new(vec![b'F', b'L', b'K']);
        let err = read_packet(&mut short, wire::DEFAULT_MAX_PAYLOAD).unwrap_err();
        assert!(matches!(err, TransportError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn whole_packet_is_read_back() {
        let bytes = wire::encode_reply(&Reply::Done, 4, wire::DEFAULT_MAX_PAYLOAD).unwrap();
        let mut stream = Cursor::new(bytes.clone());
        let packet = read_packet(&mut stream, wire::DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!(packet, bytes);
        let (reply, seq, _) = wire::decode_reply(&packet, wire::DEFAULT_MAX_PAYLOAD).unwrap();
        assert_eq!((reply, seq), (Reply::Done, 4));
    }

    #[test]
    fn oversized_declared_payload_is_refused_before_reading_it() {
        let bytes = wire::encode_reply(&Reply::Bool(true), 1, wire::DEFAULT_MAX_PAYLOAD).unwrap();
        let mut stream = Cursor::new(bytes);
        let err = read_packet(&mut stream, 2).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Wire(wire::WireError::PayloadTooLarge { max: 2, .. })
        ));
    }
}
