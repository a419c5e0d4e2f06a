// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Set-algebra over edge selections.
//!
//! A [`SelectionQuery`] is a postfix program: operands are simple selections,
//! operators pop two operands and push the combined set. Composition only
//! ever concatenates, so a query can be reused in any number of larger
//! queries or batches.
//!
//! ```
//! use flock_client::SelectionQuery;
//! use flock_proto::Direction::Forward;
//!
//! let follows = SelectionQuery::simple(1, 1, Forward, &[]);
//! let blocks = SelectionQuery::simple(1, 2, Forward, &[]);
//! let visible = SelectionQuery::difference(&follows, &blocks);
//! assert_eq!(visible.operations().len(), 3);
//! ```

use flock_proto::{
    Direction, GraphId, NodeId, QueryTerm, SelectOperation, SelectOperationType,
};

/// Immutable postfix selection program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionQuery {
    operations: Vec<SelectOperation>,
}

impl SelectionQuery {
    /// Edges of `source_id` in `graph_id` going `direction`, optionally
    /// restricted to `destination_ids`. An empty slice means no restriction.
    pub fn simple(
        source_id: NodeId,
        graph_id: GraphId,
        direction: Direction,
        destination_ids: &[NodeId],
    ) -> Self {
        Self::from_term(QueryTerm::new(source_id, graph_id, direction).with_destinations(destination_ids))
    }

    /// Single-operand program around a prepared term. Use this to send a
    /// present-but-empty destination filter.
    pub fn from_term(term: QueryTerm) -> Self {
        Self {
            operations: vec![SelectOperation::simple(term)],
        }
    }

    /// Elements in both `a` and `b`.
    pub fn intersect(a: &Self, b: &Self) -> Self {
        Self::combine(a, b, SelectOperationType::Intersection)
    }

    /// Elements in either `a` or `b`.
    pub fn union(a: &Self, b: &Self) -> Self {
        Self::combine(a, b, SelectOperationType::Union)
    }

    /// Elements in `a` but not in `b`.
    pub fn difference(a: &Self, b: &Self) -> Self {
        Self::combine(a, b, SelectOperationType::Difference)
    }

    /// The postfix program.
    pub fn operations(&self) -> &[SelectOperation] {
        &self.operations
    }

    fn combine(a: &Self, b: &Self, operator: SelectOperationType) -> Self {
        let mut operations = Vec::with_capacity(a.operations.len() + b.operations.len() + 1);
        operations.extend_from_slice(&a.operations);
        operations.extend_from_slice(&b.operations);
        operations.push(SelectOperation::operator(operator));
        Self { operations }
    }
}
