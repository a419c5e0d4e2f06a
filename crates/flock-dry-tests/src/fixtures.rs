// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Result page and edge builders.

use flock_proto::{ids, Cursor, Edge, EdgeResults, EdgeState, NodeId, Results};

/// Node-id page holding `ids` with the given neighbour cursors.
///
/// # Example
///
/// ```
/// use flock_dry_tests::results;
///
/// let page = results(&[123, 5], 0, -1);
/// assert_eq!(page.ids.len(), 16);
/// ```
pub fn results(node_ids: &[NodeId], next_cursor: Cursor, prev_cursor: Cursor) -> Results {
    Results {
        ids: ids::encode(node_ids),
        next_cursor,
        prev_cursor,
    }
}

/// Edge page holding `edges` with the given neighbour cursors.
pub fn edge_results(edges: Vec<Edge>, next_cursor: Cursor, prev_cursor: Cursor) -> EdgeResults {
    EdgeResults {
        edges,
        next_cursor,
        prev_cursor,
    }
}

/// Live edge with multiplicity one.
pub fn edge(source_id: NodeId, destination_id: NodeId, position: i64) -> Edge {
    Edge {
        source_id,
        destination_id,
        position,
        updated_at: 0,
        count: 1,
        state_id: EdgeState::Positive.id(),
    }
}
