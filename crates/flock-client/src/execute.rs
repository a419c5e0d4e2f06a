// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Mutation batches.

use std::fmt;

use flock_proto::{
    Direction, ExecuteOperation, ExecuteOperationType, ExecuteOperations, FlockEndpoint, GraphId,
    NodeId, Priority, QueryTerm,
};

use crate::error::{round_trip, Result};

/// Ordered mutations sharing one priority, applied in one round trip.
///
/// The builder is not consumed by [`execute`](Self::execute); adding more
/// operations afterwards and executing again submits everything
/// accumulated so far.
pub struct ExecutionBuilder<'a, E: ?Sized> {
    endpoint: &'a E,
    priority: Priority,
    operations: Vec<ExecuteOperation>,
}

impl<'a, E: FlockEndpoint + ?Sized> ExecutionBuilder<'a, E> {
    /// Empty batch with `priority`.
    pub fn new(endpoint: &'a E, priority: Priority) -> Self {
        Self {
            endpoint,
            priority,
            operations: Vec::new(),
        }
    }

    /// Add (or restore) edges at `position`.
    pub fn add(
        self,
        source_id: NodeId,
        graph_id: GraphId,
        position: i64,
        direction: Direction,
        destination_ids: &[NodeId],
    ) -> Self {
        self.push(
            ExecuteOperationType::Add,
            Some(position),
            source_id,
            graph_id,
            direction,
            destination_ids,
        )
    }

    /// Remove edges.
    pub fn remove(
        self,
        source_id: NodeId,
        graph_id: GraphId,
        direction: Direction,
        destination_ids: &[NodeId],
    ) -> Self {
        self.push(
            ExecuteOperationType::Remove,
            None,
            source_id,
            graph_id,
            direction,
            destination_ids,
        )
    }

    /// Negate edges.
    pub fn negate(
        self,
        source_id: NodeId,
        graph_id: GraphId,
        direction: Direction,
        destination_ids: &[NodeId],
    ) -> Self {
        self.push(
            ExecuteOperationType::Negate,
            None,
            source_id,
            graph_id,
            direction,
            destination_ids,
        )
    }

    /// Archive edges.
    pub fn archive(
        self,
        source_id: NodeId,
        graph_id: GraphId,
        direction: Direction,
        destination_ids: &[NodeId],
    ) -> Self {
        self.push(
            ExecuteOperationType::Archive,
            None,
            source_id,
            graph_id,
            direction,
            destination_ids,
        )
    }

    /// Batch-wide priority.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Mutations in submission order.
    pub fn operations(&self) -> &[ExecuteOperation] {
        &self.operations
    }

    /// Submit the accumulated mutations. Never retried.
    pub fn execute(&self) -> Result<()> {
        let batch = ExecuteOperations {
            operations: self.operations.clone(),
            priority: self.priority,
        };
        round_trip("execute", batch.operations.len(), || {
            self.endpoint.execute(&batch)
        })
    }

    fn push(
        mut self,
        operation_type: ExecuteOperationType,
        position: Option<i64>,
        source_id: NodeId,
        graph_id: GraphId,
        direction: Direction,
        destination_ids: &[NodeId],
    ) -> Self {
        self.operations.push(ExecuteOperation {
            operation_type,
            term: QueryTerm::new(source_id, graph_id, direction).with_destinations(destination_ids),
            position,
        });
        self
    }
}

impl<'a, E: ?Sized> fmt::Debug for ExecutionBuilder<'a, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionBuilder")
            .field("priority", &self.priority)
            .field("operations", &self.operations)
            .finish_non_exhaustive()
    }
}
