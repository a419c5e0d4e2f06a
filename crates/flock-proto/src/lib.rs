// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wire schema for the Flock graph-store RPC channel.
//!
//! Everything a client puts on the wire or gets back lives here: query terms,
//! postfix selection operations, page descriptors, result pages, mutation
//! batches and the [`FlockEndpoint`] port that carries them. Identifier lists
//! travel as packed little-endian buffers (see [`ids`]).

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub mod endpoint;
pub mod ids;
pub mod wire;

pub use endpoint::{FlockEndpoint, RpcError, TransportError};
pub use ids::CodecError;

/// Node identifier (edge endpoint).
pub type NodeId = i64;
/// Identifier of a logical edge collection on the remote service.
pub type GraphId = i32;
/// Opaque pagination position handed out by the remote service.
pub type Cursor = i64;

/// Which edges of a source node a term considers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Edges outgoing from the source node.
    Forward,
    /// Edges incoming to the source node.
    Backward,
}

impl Direction {
    /// `true` for [`Direction::Forward`].
    pub fn is_forward(self) -> bool {
        matches!(self, Direction::Forward)
    }
}

/// A single source/graph/direction selection, optionally filtered to a set
/// of destination ids.
///
/// `destination_ids` is `None` when no filter was supplied at all. A present
/// but zero-length buffer is a distinct state the remote side honors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryTerm {
    /// Source node of the selected edges.
    pub source_id: NodeId,
    /// Graph the edges belong to.
    pub graph_id: GraphId,
    /// Outgoing or incoming edges.
    pub direction: Direction,
    /// Packed destination filter (8 LE bytes per id).
    pub destination_ids: Option<Bytes>,
}

impl QueryTerm {
    /// Term without a destination filter.
    pub fn new(source_id: NodeId, graph_id: GraphId, direction: Direction) -> Self {
        Self {
            source_id,
            graph_id,
            direction,
            destination_ids: None,
        }
    }

    /// Replace the destination filter with an already packed buffer.
    pub fn with_destination_ids(mut self, destination_ids: Bytes) -> Self {
        self.destination_ids = Some(destination_ids);
        self
    }

    /// Replace the destination filter, treating an empty id list as "no filter".
    pub fn with_destinations(mut self, destination_ids: &[NodeId]) -> Self {
        self.destination_ids = ids::encode_or_absent(destination_ids);
        self
    }
}

/// Kind of a postfix selection operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SelectOperationType {
    /// Operand: evaluate the attached [`QueryTerm`].
    SimpleQuery,
    /// Pop two operands, push their intersection.
    Intersection,
    /// Pop two operands, push their union.
    Union,
    /// Pop two operands, push first minus second.
    Difference,
}

/// One entry of a postfix selection program.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectOperation {
    /// Operand or operator tag.
    pub operation_type: SelectOperationType,
    /// Present exactly for [`SelectOperationType::SimpleQuery`].
    pub term: Option<QueryTerm>,
}

impl SelectOperation {
    /// Operand entry carrying `term`.
    pub fn simple(term: QueryTerm) -> Self {
        Self {
            operation_type: SelectOperationType::SimpleQuery,
            term: Some(term),
        }
    }

    /// Tag-only operator entry.
    pub fn operator(operation_type: SelectOperationType) -> Self {
        Self {
            operation_type,
            term: None,
        }
    }
}

/// Page descriptor: how many results to return and where to resume.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    /// Maximum number of results.
    pub count: i32,
    /// Resume position; [`Page::START`] for the first page.
    pub cursor: Cursor,
}

impl Page {
    /// Cursor value meaning "from the beginning".
    pub const START: Cursor = -1;
    /// `next_cursor` value meaning "no further page".
    pub const END: Cursor = 0;
    /// Default page size. One below `i32::MAX`, which the remote side reserves.
    pub const UNBOUNDED_COUNT: i32 = i32::MAX - 1;

    /// Descriptor with explicit count and cursor.
    pub fn new(count: i32, cursor: Cursor) -> Self {
        Self { count, cursor }
    }

    /// Copy of this page with a different count.
    pub fn with_count(self, count: i32) -> Self {
        Self { count, ..self }
    }

    /// Copy of this page with a different cursor.
    pub fn with_cursor(self, cursor: Cursor) -> Self {
        Self { cursor, ..self }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(Self::UNBOUNDED_COUNT, Self::START)
    }
}

/// Node-id selection query (one batch slot).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectQuery {
    /// Postfix selection program.
    pub operations: Vec<SelectOperation>,
    /// Page to fetch.
    pub page: Page,
}

/// Edge selection query (one batch slot).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeQuery {
    /// Edge selection term.
    pub term: QueryTerm,
    /// Page to fetch.
    pub page: Page,
}

/// One page of node ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Results {
    /// Packed ids (8 LE bytes each).
    pub ids: Bytes,
    /// Cursor of the following page, [`Page::END`] when there is none.
    pub next_cursor: Cursor,
    /// Cursor of the preceding page, [`Page::START`] when there is none.
    pub prev_cursor: Cursor,
}

/// Lifecycle state of an edge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EdgeState {
    /// Live edge.
    Positive,
    /// Negated (hidden but restorable).
    Negative,
    /// Removed.
    Removed,
    /// Archived.
    Archived,
}

impl EdgeState {
    /// Numeric wire id.
    pub fn id(self) -> i32 {
        match self {
            EdgeState::Positive => 0,
            EdgeState::Negative => 1,
            EdgeState::Removed => 2,
            EdgeState::Archived => 3,
        }
    }

    /// Map a numeric wire id back to a state.
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(EdgeState::Positive),
            1 => Some(EdgeState::Negative),
            2 => Some(EdgeState::Removed),
            3 => Some(EdgeState::Archived),
            _ => None,
        }
    }
}

/// A stored edge as reported by the remote service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Edge {
    /// Source node.
    pub source_id: NodeId,
    /// Destination node.
    pub destination_id: NodeId,
    /// Ordering position within the source's edge list.
    pub position: i64,
    /// Last update time (seconds).
    pub updated_at: i32,
    /// Edge multiplicity.
    pub count: i32,
    /// Numeric [`EdgeState`].
    pub state_id: i32,
}

impl Edge {
    /// Decoded lifecycle state, `None` for ids this client does not know.
    pub fn state(&self) -> Option<EdgeState> {
        EdgeState::from_id(self.state_id)
    }
}

/// One page of edges.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeResults {
    /// Edges in remote order.
    pub edges: Vec<Edge>,
    /// Cursor of the following page, [`Page::END`] when there is none.
    pub next_cursor: Cursor,
    /// Cursor of the preceding page, [`Page::START`] when there is none.
    pub prev_cursor: Cursor,
}

/// Per-node bookkeeping for one graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    /// Node the metadata belongs to.
    pub source_id: NodeId,
    /// Numeric [`EdgeState`] of the node.
    pub state_id: i32,
    /// Number of edges.
    pub count: i32,
    /// Last update time (seconds).
    pub updated_at: i32,
}

/// Scheduling priority for a mutation batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Background work.
    Low,
    /// Default.
    Medium,
    /// Apply ahead of everything else.
    High,
}

impl Priority {
    /// Numeric wire id.
    pub fn id(self) -> i32 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

/// Kind of a mutation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ExecuteOperationType {
    /// Insert or restore edges.
    Add,
    /// Remove edges.
    Remove,
    /// Archive edges.
    Archive,
    /// Negate edges.
    Negate,
}

/// One mutation in a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecuteOperation {
    /// Mutation kind.
    pub operation_type: ExecuteOperationType,
    /// Edges the mutation applies to.
    pub term: QueryTerm,
    /// Ordering hint, only meaningful for [`ExecuteOperationType::Add`].
    pub position: Option<i64>,
}

/// A mutation batch applied atomically by the remote service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecuteOperations {
    /// Mutations in submission order.
    pub operations: Vec<ExecuteOperation>,
    /// Batch-wide priority.
    pub priority: Priority,
}

/// Logical failure reported by the remote service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[error("{description}")]
pub struct FlockError {
    /// Remote-side description.
    pub description: String,
}

impl FlockError {
    /// Build an error from any description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}
