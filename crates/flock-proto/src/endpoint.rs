// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! RPC endpoint port.
//!
//! The client core never talks to a socket directly; it hands finished
//! request values to a [`FlockEndpoint`] and gets result values back. Any
//! failure comes back as an [`RpcError`], which keeps remote-reported failures
//! apart from transport trouble.

use bytes::Bytes;

use crate::wire::WireError;
use crate::{
    Edge, EdgeQuery, EdgeResults, ExecuteOperations, FlockError, GraphId, Metadata, NodeId,
    Results, SelectOperation, SelectQuery,
};

/// Communication-layer failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Socket-level I/O error (includes timeouts).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Frame could not be encoded or decoded.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
    /// Peer closed the connection before a reply arrived.
    #[error("connection closed by peer")]
    Closed,
    /// An earlier call failed part way, so replies can no longer be matched
    /// to calls on this connection.
    #[error("connection abandoned after an earlier failure")]
    Broken,
    /// Reply did not answer the call that was sent.
    #[error("unexpected reply: expected {expected}, got {got}")]
    UnexpectedReply {
        /// Reply kind the call requires.
        expected: &'static str,
        /// Reply kind that arrived.
        got: &'static str,
    },
    /// Any other failure of the endpoint implementation.
    #[error("{0}")]
    Other(String),
}

/// Failure of one endpoint call.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The remote service rejected or failed to evaluate the request.
    #[error("remote failure: {0}")]
    Remote(#[from] FlockError),
    /// The request or its reply did not make it across.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
}

impl From<std::io::Error> for RpcError {
    fn from(err: std::io::Error) -> Self {
        RpcError::Transport(TransportError::Io(err))
    }
}

impl From<WireError> for RpcError {
    fn from(err: WireError) -> Self {
        RpcError::Transport(TransportError::Wire(err))
    }
}

/// Remote graph-store operations the client core depends on.
///
/// Calls are synchronous: each blocks for one round trip. Implementations own
/// their connection discipline; the core may call through a shared reference
/// from several builders in turn.
pub trait FlockEndpoint {
    /// Whether the edge `source_id -> destination_id` exists in `graph_id`.
    fn contains(
        &self,
        source_id: NodeId,
        graph_id: GraphId,
        destination_id: NodeId,
    ) -> Result<bool, RpcError>;

    /// Fetch the edge `source_id -> destination_id` in `graph_id`.
    fn get(
        &self,
        source_id: NodeId,
        graph_id: GraphId,
        destination_id: NodeId,
    ) -> Result<Edge, RpcError>;

    /// Fetch node metadata for `source_id` in `graph_id`.
    fn get_metadata(&self, source_id: NodeId, graph_id: GraphId) -> Result<Metadata, RpcError>;

    /// Whether node metadata exists for `source_id` in `graph_id`.
    fn contains_metadata(&self, source_id: NodeId, graph_id: GraphId) -> Result<bool, RpcError>;

    /// Evaluate a batch of node-id selections; one page per query, in order.
    fn select2(&self, queries: &[SelectQuery]) -> Result<Vec<Results>, RpcError>;

    /// Evaluate a batch of edge selections; one page per query, in order.
    fn select_edges(&self, queries: &[EdgeQuery]) -> Result<Vec<EdgeResults>, RpcError>;

    /// Count the results of each selection program. Packed LE `i32` list.
    fn count2(&self, queries: &[Vec<SelectOperation>]) -> Result<Bytes, RpcError>;

    /// Apply a mutation batch.
    fn execute(&self, operations: &ExecuteOperations) -> Result<(), RpcError>;
}
