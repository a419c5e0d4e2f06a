// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Recording endpoint fake.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use flock_proto::wire::Call;
use flock_proto::{
    ids, Edge, EdgeQuery, EdgeResults, ExecuteOperations, FlockEndpoint, FlockError, GraphId,
    Metadata, NodeId, Page, Results, RpcError, SelectOperation, SelectQuery, TransportError,
};

/// In-process [`FlockEndpoint`] that records every call and answers from a
/// script.
///
/// Selection calls pop the next scripted reply; when the script is empty
/// they answer one empty, final page per query (and a zero count per
/// program). Clones share state.
///
/// # Example
///
/// ```
/// use flock_dry_tests::{results, RecordingEndpoint};
/// use flock_proto::FlockEndpoint;
///
/// let endpoint = RecordingEndpoint::new();
/// endpoint.push_select2(vec![results(&[1, 2], 0, -1)]);
///
/// let pages = endpoint.select2(&[]).unwrap();
/// assert_eq!(pages.len(), 1);
/// assert_eq!(endpoint.calls().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct RecordingEndpoint {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    calls: Vec<Call>,
    select2: VecDeque<Vec<Results>>,
    select_edges: VecDeque<Vec<EdgeResults>>,
    count2: VecDeque<Bytes>,
    contains: bool,
    edge: Option<Edge>,
    metadata: Option<Metadata>,
    failure: Option<Failure>,
}

#[derive(Clone)]
enum Failure {
    Remote(String),
    Transport(String),
}

impl RecordingEndpoint {
    /// Endpoint with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the reply to the next `select2` call.
    pub fn push_select2(&self, pages: Vec<Results>) {
        self.lock().select2.push_back(pages);
    }

    /// Queue the reply to the next `select_edges` call.
    pub fn push_select_edges(&self, pages: Vec<EdgeResults>) {
        self.lock().select_edges.push_back(pages);
    }

    /// Queue the packed reply to the next `count2` call.
    pub fn push_count2(&self, counts: Bytes) {
        self.lock().count2.push_back(counts);
    }

    /// Answer to `contains` and `contains_metadata`.
    pub fn set_contains(&self, found: bool) {
        self.lock().contains = found;
    }

    /// Answer to `get`; without one, `get` fails remotely.
    pub fn set_edge(&self, edge: Edge) {
        self.lock().edge = Some(edge);
    }

    /// Answer to `get_metadata`; without one, it fails remotely.
    pub fn set_metadata(&self, metadata: Metadata) {
        self.lock().metadata = Some(metadata);
    }

    /// Fail every following call as if the service rejected it.
    pub fn fail_with_remote(&self, description: &str) {
        self.lock().failure = Some(Failure::Remote(description.to_string()));
    }

    /// Fail every following call with a timed-out transport.
    pub fn fail_with_transport(&self, message: &str) {
        self.lock().failure = Some(Failure::Transport(message.to_string()));
    }

    /// Stop failing.
    pub fn clear_failure(&self) {
        self.lock().failure = None;
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// The most recent call, if any.
    pub fn last_call(&self) -> Option<Call> {
        self.lock().calls.last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: Call) -> Result<std::sync::MutexGuard<'_, Inner>, RpcError> {
        let mut inner = self.lock();
        inner.calls.push(call);
        match inner.failure.clone() {
            None => Ok(inner),
            Some(Failure::Remote(description)) => Err(FlockError::new(description).into()),
            Some(Failure::Transport(message)) => Err(TransportError::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                message,
            ))
            .into()),
        }
    }
}

impl FlockEndpoint for RecordingEndpoint {
    fn contains(
        &self,
        source_id: NodeId,
        graph_id: GraphId,
        destination_id: NodeId,
    ) -> Result<bool, RpcError> {
        let inner = self.record(Call::Contains {
            source_id,
            graph_id,
            destination_id,
        })?;
        Ok(inner.contains)
    }

    fn get(
        &self,
        source_id: NodeId,
        graph_id: GraphId,
        destination_id: NodeId,
    ) -> Result<Edge, RpcError> {
        let inner = self.record(Call::Get {
            source_id,
            graph_id,
            destination_id,
        })?;
        inner
            .edge
            .clone()
            .ok_or_else(|| FlockError::new("edge not found").into())
    }

    fn get_metadata(&self, source_id: NodeId, graph_id: GraphId) -> Result<Metadata, RpcError> {
        let inner = self.record(Call::GetMetadata {
            source_id,
            graph_id,
        })?;
        inner
            .metadata
            .clone()
            .ok_or_else(|| FlockError::new("metadata not found").into())
    }

    fn contains_metadata(&self, source_id: NodeId, graph_id: GraphId) -> Result<bool, RpcError> {
        let inner = self.record(Call::ContainsMetadata {
            source_id,
            graph_id,
        })?;
        Ok(inner.contains)
    }

    fn select2(&self, queries: &[SelectQuery]) -> Result<Vec<Results>, RpcError> {
        let mut inner = self.record(Call::Select2 {
            queries: queries.to_vec(),
        })?;
        Ok(inner.select2.pop_front().unwrap_or_else(|| {
            queries
                .iter()
                .map(|_| Results {
                    ids: Bytes::new(),
                    next_cursor: Page::END,
                    prev_cursor: Page::START,
                })
                .collect()
        }))
    }

    fn select_edges(&self, queries: &[EdgeQuery]) -> Result<Vec<EdgeResults>, RpcError> {
        let mut inner = self.record(Call::SelectEdges {
            queries: queries.to_vec(),
        })?;
        Ok(inner.select_edges.pop_front().unwrap_or_else(|| {
            queries
                .iter()
                .map(|_| EdgeResults {
                    edges: Vec::new(),
                    next_cursor: Page::END,
                    prev_cursor: Page::START,
                })
                .collect()
        }))
    }

    fn count2(&self, queries: &[Vec<SelectOperation>]) -> Result<Bytes, RpcError> {
        let mut inner = self.record(Call::Count2 {
            queries: queries.to_vec(),
        })?;
        Ok(inner
            .count2
            .pop_front()
            .unwrap_or_else(|| ids::encode_counts(&vec![0; queries.len()])))
    }

    fn execute(&self, operations: &ExecuteOperations) -> Result<(), RpcError> {
        let _recorded = self.record(Call::Execute {
            operations: operations.clone(),
        })?;
        Ok(())
    }
}
