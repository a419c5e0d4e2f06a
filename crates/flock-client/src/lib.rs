// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Client for the Flock graph store.
//!
//! Build selections with [`SelectionQuery`], batch them with
//! [`SelectionBuilder`] / [`EdgeSelectionBuilder`] and page through the
//! results with the returned cursors. Mutations go through
//! [`ExecutionBuilder`]. Everything is synchronous and talks to the service
//! through a [`FlockEndpoint`]; [`TcpEndpoint`] is the bundled transport.
//!
//! ```no_run
//! use flock_client::{FlockClient, SelectionQuery};
//! use flock_config::EndpointConfig;
//! use flock_proto::Direction::Forward;
//!
//! # fn main() -> flock_client::Result<()> {
//! let client = FlockClient::connect(&EndpointConfig::default())?;
//! let friends = SelectionQuery::simple(42, 1, Forward, &[]);
//! for page in client.select(&friends).with_page_size(100).execute()? {
//!     for page in page.pages() {
//!         println!("{:?}", page?.ids());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use flock_config::EndpointConfig;
use flock_proto::{Direction, Edge, GraphId, Metadata, NodeId, Priority};

mod batch;
mod count;
mod cursor;
mod error;
mod execute;
mod selection;
mod tcp;

pub use batch::{EdgeSelectionBuilder, QueryBatch, SelectionBuilder};
pub use count::CountBuilder;
pub use cursor::{
    Edges, NodeIds, PageContents, PageKind, Paged, PagedEdgeList, PagedNodeIdList, Pages,
};
pub use error::{Error, Result};
pub use execute::ExecutionBuilder;
pub use flock_proto::FlockEndpoint;
pub use selection::SelectionQuery;
pub use tcp::{read_packet, TcpEndpoint};

use error::round_trip;

/// Entry point owning an endpoint.
#[derive(Debug)]
pub struct FlockClient<E> {
    endpoint: E,
}

impl FlockClient<TcpEndpoint> {
    /// Connect over TCP using `config`.
    pub fn connect(config: &EndpointConfig) -> Result<Self> {
        Ok(Self::new(TcpEndpoint::connect(config)?))
    }
}

impl<E: FlockEndpoint> FlockClient<E> {
    /// Wrap an existing endpoint.
    pub fn new(endpoint: E) -> Self {
        Self { endpoint }
    }

    /// Underlying endpoint.
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// Whether the edge `source_id -> destination_id` exists in `graph_id`.
    pub fn contains(
        &self,
        source_id: NodeId,
        graph_id: GraphId,
        destination_id: NodeId,
    ) -> Result<bool> {
        round_trip("contains", 1, || {
            self.endpoint.contains(source_id, graph_id, destination_id)
        })
    }

    /// Fetch one edge.
    pub fn get(&self, source_id: NodeId, graph_id: GraphId, destination_id: NodeId) -> Result<Edge> {
        round_trip("get", 1, || {
            self.endpoint.get(source_id, graph_id, destination_id)
        })
    }

    /// Fetch node metadata.
    pub fn get_metadata(&self, source_id: NodeId, graph_id: GraphId) -> Result<Metadata> {
        round_trip("get_metadata", 1, || {
            self.endpoint.get_metadata(source_id, graph_id)
        })
    }

    /// Whether node metadata exists.
    pub fn contains_metadata(&self, source_id: NodeId, graph_id: GraphId) -> Result<bool> {
        round_trip("contains_metadata", 1, || {
            self.endpoint.contains_metadata(source_id, graph_id)
        })
    }

    /// Start a node-id batch with `query` in its first slot.
    pub fn select(&self, query: &SelectionQuery) -> SelectionBuilder<'_, E> {
        SelectionBuilder::new(&self.endpoint).select(query)
    }

    /// Start an edge batch with one slot.
    pub fn select_edges(
        &self,
        source_id: NodeId,
        graph_id: GraphId,
        direction: Direction,
        destination_ids: &[NodeId],
    ) -> EdgeSelectionBuilder<'_, E> {
        EdgeSelectionBuilder::new(&self.endpoint).select_edges(
            source_id,
            graph_id,
            direction,
            destination_ids,
        )
    }

    /// Start a count batch with `query` in its first slot.
    pub fn count(&self, query: &SelectionQuery) -> CountBuilder<'_, E> {
        CountBuilder::new(&self.endpoint).count(query)
    }

    /// Start an empty mutation batch.
    pub fn batch_execution(&self, priority: Priority) -> ExecutionBuilder<'_, E> {
        ExecutionBuilder::new(&self.endpoint, priority)
    }
}
